use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid geometry for area {area}: {reason}")]
    InvalidGeometry { area: String, reason: String },
    #[error("area {area}: {field}: {reason}")]
    InvalidBlock {
        area: String,
        field: &'static str,
        reason: String,
    },
    #[error("area {area}: unknown biome '{biome}'")]
    UnknownBiome { area: String, biome: String },
}

/// Top-level config file: global settings plus one `[[area]]` table per plot area.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PlotWorldsFile {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default, rename = "area")]
    pub areas: Vec<PlotWorldConfig>,
}

impl PlotWorldsFile {
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let s = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&s)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub schematics: SchematicSettings,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct SchematicSettings {
    #[serde(default = "default_true")]
    pub paste_on_top: bool,
    #[serde(default = "default_true")]
    pub paste_road_on_top: bool,
    #[serde(default = "default_true")]
    pub use_wall_in_road_schem_height: bool,
    #[serde(default = "default_schematic_root")]
    pub root: PathBuf,
}
fn default_true() -> bool {
    true
}
fn default_schematic_root() -> PathBuf {
    PathBuf::from("schematics/GEN_ROAD_SCHEMATIC")
}
impl Default for SchematicSettings {
    fn default() -> Self {
        Self {
            paste_on_top: true,
            paste_road_on_top: true,
            use_wall_in_road_schem_height: true,
            root: default_schematic_root(),
        }
    }
}

/// Inclusive x/z block corners of an area's region.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct RegionConfig {
    pub min: [i32; 2],
    pub max: [i32; 2],
}

#[derive(Clone, Debug, Deserialize)]
pub struct PlotWorldConfig {
    pub world: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub region: Option<RegionConfig>,
    #[serde(default = "default_plot_width")]
    pub plot_width: i32,
    #[serde(default = "default_road_width")]
    pub road_width: i32,
    #[serde(default = "default_surface_height")]
    pub road_height: i32,
    #[serde(default = "default_surface_height")]
    pub plot_height: i32,
    #[serde(default = "default_surface_height")]
    pub wall_height: i32,
    /// Defaults to the host world's bottom.
    #[serde(default)]
    pub min_gen_height: Option<i32>,
    /// Defaults to the host world's top.
    #[serde(default)]
    pub max_gen_height: Option<i32>,
    /// Defaults to one above the generation floor.
    #[serde(default)]
    pub min_build_height: Option<i32>,
    #[serde(default)]
    pub max_build_height: Option<i32>,
    #[serde(default = "default_true")]
    pub plot_bedrock: bool,
    #[serde(default)]
    pub road_offset_x: i32,
    #[serde(default)]
    pub road_offset_z: i32,
    #[serde(default = "default_main_block")]
    pub main_block: String,
    #[serde(default = "default_top_block")]
    pub top_block: String,
    #[serde(default = "default_wall_block")]
    pub wall_block: String,
    #[serde(default = "default_wall_filling")]
    pub wall_filling: String,
    #[serde(default = "default_road_block")]
    pub road_block: String,
    #[serde(default)]
    pub biome: Option<String>,
}
fn default_plot_width() -> i32 {
    42
}
fn default_road_width() -> i32 {
    7
}
fn default_surface_height() -> i32 {
    62
}
fn default_main_block() -> String {
    "stone".to_string()
}
fn default_top_block() -> String {
    "grass_block".to_string()
}
fn default_wall_block() -> String {
    "stone_slab".to_string()
}
fn default_wall_filling() -> String {
    "stone".to_string()
}
fn default_road_block() -> String {
    "quartz_block".to_string()
}

// Overlay keys pack each axis into 16 bits.
const MAX_SECTION_SIZE: i32 = 0x7FFF;

impl PlotWorldConfig {
    /// `world` or `world;id`.
    pub fn label(&self) -> String {
        match &self.id {
            Some(id) => format!("{};{}", self.world, id),
            None => self.world.clone(),
        }
    }

    /// Resolve optional bounds against the host world's height range and validate.
    pub fn geometry(&self, world_min: i32, world_max: i32) -> Result<PlotGeometry, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidGeometry {
            area: self.label(),
            reason,
        };
        let min_gen = self.min_gen_height.unwrap_or(world_min);
        let max_gen = self.max_gen_height.unwrap_or(world_max);
        if min_gen > max_gen {
            return Err(invalid(format!(
                "min_gen_height {min_gen} above max_gen_height {max_gen}"
            )));
        }
        let min_build = self.min_build_height.unwrap_or(min_gen + 1).max(min_gen);
        let max_build = self.max_build_height.unwrap_or(max_gen).min(max_gen);
        if self.plot_width < 1 {
            return Err(invalid(format!("plot_width {} < 1", self.plot_width)));
        }
        if self.road_width < 0 {
            return Err(invalid(format!("road_width {} < 0", self.road_width)));
        }
        let size = self.plot_width + self.road_width;
        if size > MAX_SECTION_SIZE {
            return Err(invalid(format!(
                "plot_width + road_width = {size} exceeds {MAX_SECTION_SIZE}"
            )));
        }
        for (name, h) in [
            ("road_height", self.road_height),
            ("plot_height", self.plot_height),
            ("wall_height", self.wall_height),
        ] {
            if h < min_gen || h > max_gen {
                return Err(invalid(format!(
                    "{name} {h} outside [{min_gen}, {max_gen}]"
                )));
            }
        }
        Ok(PlotGeometry {
            plot_width: self.plot_width,
            road_width: self.road_width,
            road_height: self.road_height,
            plot_height: self.plot_height,
            wall_height: self.wall_height,
            min_gen,
            max_gen,
            min_build,
            max_build,
            plot_bedrock: self.plot_bedrock,
            road_offset_x: self.road_offset_x,
            road_offset_z: self.road_offset_z,
        })
    }
}

/// Validated, fully resolved plot grid dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlotGeometry {
    pub plot_width: i32,
    pub road_width: i32,
    pub road_height: i32,
    pub plot_height: i32,
    pub wall_height: i32,
    pub min_gen: i32,
    pub max_gen: i32,
    pub min_build: i32,
    pub max_build: i32,
    pub plot_bedrock: bool,
    pub road_offset_x: i32,
    pub road_offset_z: i32,
}

impl PlotGeometry {
    /// Edge of one repeating plot + road cell.
    #[inline]
    pub fn size(&self) -> i32 {
        self.plot_width + self.road_width
    }

    /// Number of generatable layers, inclusive of both bounds.
    #[inline]
    pub fn gen_height(&self) -> i32 {
        self.max_gen - self.min_gen + 1
    }

    pub fn path_width_lower(&self) -> i32 {
        if self.road_width & 1 == 0 {
            self.road_width / 2 - 1
        } else {
            self.road_width / 2
        }
    }

    pub fn path_width_upper(&self) -> i32 {
        if self.road_width == 0 {
            self.size() + 1
        } else {
            self.path_width_lower() + self.plot_width + 1
        }
    }
}

/// Log every resolved field of an area when `settings.debug` is on.
pub fn dump_settings(
    label: &str,
    cfg: &PlotWorldConfig,
    geom: &PlotGeometry,
    settings: &Settings,
) {
    if !settings.debug {
        return;
    }
    log::info!("- Dumping settings for plot area {label}");
    log::info!("-- plot_width = {}", geom.plot_width);
    log::info!("-- road_width = {}", geom.road_width);
    log::info!("-- road_height = {}", geom.road_height);
    log::info!("-- plot_height = {}", geom.plot_height);
    log::info!("-- wall_height = {}", geom.wall_height);
    log::info!("-- min_gen_height = {}", geom.min_gen);
    log::info!("-- max_gen_height = {}", geom.max_gen);
    log::info!("-- min_build_height = {}", geom.min_build);
    log::info!("-- max_build_height = {}", geom.max_build);
    log::info!("-- plot_bedrock = {}", geom.plot_bedrock);
    log::info!("-- road_offset_x = {}", geom.road_offset_x);
    log::info!("-- road_offset_z = {}", geom.road_offset_z);
    log::info!("-- path_width_lower = {}", geom.path_width_lower());
    log::info!("-- path_width_upper = {}", geom.path_width_upper());
    log::info!("-- main_block = {}", cfg.main_block);
    log::info!("-- top_block = {}", cfg.top_block);
    log::info!("-- wall_block = {}", cfg.wall_block);
    log::info!("-- wall_filling = {}", cfg.wall_filling);
    log::info!("-- road_block = {}", cfg.road_block);
    log::info!("-- biome = {}", cfg.biome.as_deref().unwrap_or("<none>"));
    log::info!("-- paste_on_top = {}", settings.schematics.paste_on_top);
    log::info!("-- paste_road_on_top = {}", settings.schematics.paste_road_on_top);
    log::info!(
        "-- use_wall_in_road_schem_height = {}",
        settings.schematics.use_wall_in_road_schem_height
    );
    log::info!("-- schematic_root = {}", settings.schematics.root.display());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(extra: &str) -> PlotWorldConfig {
        let file = PlotWorldsFile::from_toml_str(&format!(
            "[[area]]\nworld = \"plots\"\n{extra}\n"
        ))
        .unwrap();
        file.areas.into_iter().next().unwrap()
    }

    #[test]
    fn defaults_fill_everything() {
        let file = PlotWorldsFile::from_toml_str("").unwrap();
        assert!(!file.settings.debug);
        assert_eq!(file.settings.schematics, SchematicSettings::default());
        assert!(file.areas.is_empty());

        let cfg = area("");
        assert_eq!((cfg.plot_width, cfg.road_width), (42, 7));
        assert_eq!(cfg.label(), "plots");
        let geom = cfg.geometry(-64, 319).unwrap();
        assert_eq!((geom.min_gen, geom.max_gen), (-64, 319));
        assert_eq!((geom.min_build, geom.max_build), (-63, 319));
        assert_eq!(geom.gen_height(), 384);
        assert_eq!(geom.size(), 49);
    }

    #[test]
    fn settings_toggles_parse() {
        let file = PlotWorldsFile::from_toml_str(
            r#"
            [settings]
            debug = true
            [settings.schematics]
            paste_on_top = false
            root = "fragments"
        "#,
        )
        .unwrap();
        assert!(file.settings.debug);
        assert!(!file.settings.schematics.paste_on_top);
        assert!(file.settings.schematics.paste_road_on_top);
        assert_eq!(file.settings.schematics.root, PathBuf::from("fragments"));
    }

    #[test]
    fn path_widths_follow_road_parity() {
        let even = area("plot_width = 32\nroad_width = 6").geometry(0, 255).unwrap();
        assert_eq!((even.path_width_lower(), even.path_width_upper()), (2, 35));
        let odd = area("plot_width = 32\nroad_width = 7").geometry(0, 255).unwrap();
        assert_eq!((odd.path_width_lower(), odd.path_width_upper()), (3, 36));
        let none = area("plot_width = 32\nroad_width = 0").geometry(0, 255).unwrap();
        assert_eq!(none.path_width_upper(), 33);
    }

    #[test]
    fn bad_geometry_is_rejected() {
        assert!(matches!(
            area("plot_width = 0").geometry(0, 255),
            Err(ConfigError::InvalidGeometry { .. })
        ));
        assert!(area("road_width = -1").geometry(0, 255).is_err());
        assert!(area("plot_width = 40000").geometry(0, 255).is_err());
        assert!(area("road_height = 300").geometry(0, 255).is_err());
        assert!(area("min_gen_height = 10\nmax_gen_height = 5").geometry(0, 255).is_err());
    }

    #[test]
    fn labels_include_area_id() {
        assert_eq!(area("id = \"east\"").label(), "plots;east");
    }
}
