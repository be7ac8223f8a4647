use std::sync::Arc;

use plotgen_blocks::{BiomeTag, BlockBucket, BlockRegistry, VoxelState};
use plotgen_schem::{FragmentSource, fragment_root};

use crate::config::{
    ConfigError, PlotGeometry, PlotWorldConfig, RegionConfig, SchematicSettings, Settings,
    dump_settings,
};
use crate::overlay::{
    Fragments, Overlay, OverlayError, OverlayHandle, OverlaySummary, build_overlay,
    compute_anchors,
};

/// What the host tells us about a world.
pub trait HostWorld: Send + Sync {
    fn name(&self) -> &str;
    /// Lowest generatable y, inclusive.
    fn min_height(&self) -> i32;
    /// Highest generatable y, inclusive.
    fn max_height(&self) -> i32;
}

/// Inclusive x/z rectangle in block coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Region2 {
    pub min_x: i32,
    pub min_z: i32,
    pub max_x: i32,
    pub max_z: i32,
}

impl Region2 {
    pub fn new(a: (i32, i32), b: (i32, i32)) -> Self {
        Self {
            min_x: a.0.min(b.0),
            min_z: a.1.min(b.1),
            max_x: a.0.max(b.0),
            max_z: a.1.max(b.1),
        }
    }

    #[inline]
    pub fn contains(&self, x: i32, z: i32) -> bool {
        x >= self.min_x && x <= self.max_x && z >= self.min_z && z <= self.max_z
    }

    /// True when the chunk's corner lies strictly inside the region; a chunk
    /// touching the boundary does not count.
    pub fn is_whole_chunk(&self, cx: i32, cz: i32) -> bool {
        let (bx, bz) = (cx << 4, cz << 4);
        bx > self.min_x && bz > self.min_z && bx < self.max_x && bz < self.max_z
    }

    pub fn intersects_chunk(&self, cx: i32, cz: i32) -> bool {
        let (bx, bz) = (cx << 4, cz << 4);
        bx <= self.max_x && bx + 15 >= self.min_x && bz <= self.max_z && bz + 15 >= self.min_z
    }
}

impl From<RegionConfig> for Region2 {
    fn from(r: RegionConfig) -> Self {
        Region2::new((r.min[0], r.min[1]), (r.max[0], r.max[1]))
    }
}

/// Resolved block patterns of an area.
#[derive(Clone, Debug)]
pub struct AreaBlocks {
    pub main: BlockBucket,
    pub top: BlockBucket,
    pub wall: BlockBucket,
    pub wall_filling: BlockBucket,
    pub road: BlockBucket,
    pub bedrock: Option<VoxelState>,
}

impl AreaBlocks {
    fn resolve(cfg: &PlotWorldConfig, reg: &BlockRegistry) -> Result<Self, ConfigError> {
        let parse = |field: &'static str, spec: &str| {
            BlockBucket::parse(spec, reg).map_err(|reason| ConfigError::InvalidBlock {
                area: cfg.label(),
                field,
                reason,
            })
        };
        let bedrock = if cfg.plot_bedrock {
            let block = reg
                .block_from_key("bedrock")
                .ok_or_else(|| ConfigError::InvalidBlock {
                    area: cfg.label(),
                    field: "plot_bedrock",
                    reason: "registry has no 'bedrock' block".to_string(),
                })?;
            Some(VoxelState::new(block))
        } else {
            None
        };
        Ok(Self {
            main: parse("main_block", &cfg.main_block)?,
            top: parse("top_block", &cfg.top_block)?,
            wall: parse("wall_block", &cfg.wall_block)?,
            wall_filling: parse("wall_filling", &cfg.wall_filling)?,
            road: parse("road_block", &cfg.road_block)?,
            bedrock,
        })
    }
}

/// One configured plot area and its published overlay.
pub struct PlotArea {
    world: String,
    id: Option<String>,
    region: Option<Region2>,
    geometry: PlotGeometry,
    schematics: SchematicSettings,
    blocks: AreaBlocks,
    biome: Option<BiomeTag>,
    registry: Arc<BlockRegistry>,
    overlay: OverlayHandle,
}

impl PlotArea {
    pub fn new(
        cfg: &PlotWorldConfig,
        settings: &Settings,
        registry: Arc<BlockRegistry>,
        world: &dyn HostWorld,
    ) -> Result<Self, ConfigError> {
        let geometry = cfg.geometry(world.min_height(), world.max_height())?;
        let blocks = AreaBlocks::resolve(cfg, &registry)?;
        let biome = match &cfg.biome {
            Some(name) => Some(registry.biome_by_name(name).ok_or_else(|| {
                ConfigError::UnknownBiome {
                    area: cfg.label(),
                    biome: name.clone(),
                }
            })?),
            None => None,
        };
        dump_settings(&cfg.label(), cfg, &geometry, settings);
        let anchors = compute_anchors(&geometry, &settings.schematics, None, None);
        Ok(Self {
            world: cfg.world.clone(),
            id: cfg.id.clone(),
            region: cfg.region.map(Region2::from),
            geometry,
            schematics: settings.schematics.clone(),
            blocks,
            biome,
            registry,
            overlay: OverlayHandle::new(Overlay::empty(geometry.size(), anchors)),
        })
    }

    #[inline]
    pub fn world_name(&self) -> &str {
        &self.world
    }

    #[inline]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn label(&self) -> String {
        match &self.id {
            Some(id) => format!("{};{}", self.world, id),
            None => self.world.clone(),
        }
    }

    #[inline]
    pub fn region(&self) -> Option<Region2> {
        self.region
    }

    #[inline]
    pub fn geometry(&self) -> &PlotGeometry {
        &self.geometry
    }

    #[inline]
    pub fn blocks(&self) -> &AreaBlocks {
        &self.blocks
    }

    #[inline]
    pub fn biome(&self) -> Option<BiomeTag> {
        self.biome
    }

    #[inline]
    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    /// Current overlay; hold the `Arc` for the whole chunk.
    pub fn overlay(&self) -> Arc<Overlay> {
        self.overlay.snapshot()
    }

    /// Load this area's fragments and publish a freshly built overlay.
    ///
    /// On failure an empty overlay is published and the area generates
    /// without fragments.
    pub fn setup_overlay(&self, source: &dyn FragmentSource) -> Result<OverlaySummary, OverlayError> {
        let dir = fragment_root(&self.schematics.root, &self.world, self.id.as_deref());
        let fragments = match Fragments::load(source, &dir) {
            Ok(f) => f,
            Err(e) => {
                log::error!("{}: overlay setup failed: {e}", self.label());
                self.clear_overlay();
                return Err(e);
            }
        };
        Ok(self.install_fragments(&fragments))
    }

    /// Build and publish an overlay from already decoded fragments.
    pub fn install_fragments(&self, fragments: &Fragments) -> OverlaySummary {
        let overlay = build_overlay(&self.geometry, &self.schematics, &self.registry, fragments);
        let summary = overlay.summary();
        if fragments.is_empty() {
            log::debug!("{}: no fragments, plain plot world", self.label());
        } else {
            log::info!("{}: overlay ready: {summary}", self.label());
        }
        self.overlay.publish(overlay);
        summary
    }

    pub fn clear_overlay(&self) {
        let anchors = compute_anchors(&self.geometry, &self.schematics, None, None);
        self.overlay
            .publish(Overlay::empty(self.geometry.size(), anchors));
    }
}

/// Every plot area known to the process, looked up by world and chunk.
#[derive(Default)]
pub struct PlotAreaManager {
    areas: Vec<Arc<PlotArea>>,
}

impl PlotAreaManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, area: PlotArea) -> Arc<PlotArea> {
        let area = Arc::new(area);
        self.areas.push(Arc::clone(&area));
        area
    }

    pub fn areas(&self) -> &[Arc<PlotArea>] {
        &self.areas
    }

    pub fn areas_in_world<'a>(&'a self, world: &'a str) -> impl Iterator<Item = &'a Arc<PlotArea>> + 'a {
        self.areas.iter().filter(move |a| a.world_name() == world)
    }

    /// Area owning chunk `(cx, cz)` of `world`; unbounded areas match every chunk.
    pub fn area_for_chunk(&self, world: &str, cx: i32, cz: i32) -> Option<Arc<PlotArea>> {
        self.areas_in_world(world)
            .find(|a| a.region().is_none_or(|r| r.intersects_chunk(cx, cz)))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlotWorldsFile;

    pub(crate) struct TestWorld(&'static str);

    impl HostWorld for TestWorld {
        fn name(&self) -> &str {
            self.0
        }
        fn min_height(&self) -> i32 {
            -64
        }
        fn max_height(&self) -> i32 {
            319
        }
    }

    fn registry() -> Arc<BlockRegistry> {
        Arc::new(
            BlockRegistry::from_toml_str(
                r#"
                biomes = ["plains", "forest"]
                [[blocks]]
                name = "air"
                [[blocks]]
                name = "stone"
                [[blocks]]
                name = "bedrock"
            "#,
            )
            .unwrap(),
        )
    }

    fn load(toml: &str) -> PlotWorldsFile {
        PlotWorldsFile::from_toml_str(toml).unwrap()
    }

    const STONE_AREA: &str = r#"
        [[area]]
        world = "plots"
        main_block = "stone"
        top_block = "stone"
        wall_block = "stone"
        wall_filling = "stone"
        road_block = "stone"
    "#;

    #[test]
    fn whole_chunk_is_strict() {
        let r = Region2::new((0, 0), (64, 64));
        assert!(r.is_whole_chunk(1, 1));
        assert!(r.is_whole_chunk(3, 3));
        // corner on the boundary
        assert!(!r.is_whole_chunk(0, 1));
        assert!(!r.is_whole_chunk(4, 1));
        assert!(!r.is_whole_chunk(5, 1));
        assert!(r.contains(0, 64));
        assert!(!r.contains(-1, 0));
    }

    #[test]
    fn chunk_intersection_is_inclusive() {
        let r = Region2::new((100, 100), (10, 10));
        assert_eq!((r.min_x, r.max_x), (10, 100));
        assert!(r.intersects_chunk(0, 0));
        assert!(r.intersects_chunk(6, 6));
        assert!(!r.intersects_chunk(7, 0));
        assert!(!r.intersects_chunk(-1, 0));
    }

    #[test]
    fn area_resolves_blocks_and_biome() {
        let file = load(&format!("{STONE_AREA}\nbiome = \"minecraft:forest\""));
        let area = PlotArea::new(&file.areas[0], &file.settings, registry(), &TestWorld("plots")).unwrap();
        assert_eq!(area.biome(), Some(BiomeTag(1)));
        assert!(area.blocks().bedrock.is_some());
        assert!(area.overlay().is_empty());
    }

    #[test]
    fn unknown_names_are_config_errors() {
        let file = load(&format!("{STONE_AREA}\nbiome = \"desert\""));
        let err = PlotArea::new(&file.areas[0], &file.settings, registry(), &TestWorld("plots"));
        assert!(matches!(err, Err(ConfigError::UnknownBiome { .. })));

        let file = load("[[area]]\nworld = \"plots\"\nmain_block = \"stone\"");
        let err = PlotArea::new(&file.areas[0], &file.settings, registry(), &TestWorld("plots"));
        assert!(matches!(err, Err(ConfigError::InvalidBlock { field: "top_block", .. })));
    }

    #[test]
    fn manager_matches_world_and_region() {
        let file = load(&format!(
            "{STONE_AREA}\nid = \"west\"\nregion = {{ min = [-512, -512], max = [-1, 511] }}\n{}\nid = \"east\"\nregion = {{ min = [0, -512], max = [511, 511] }}",
            STONE_AREA
        ));
        let mut mgr = PlotAreaManager::new();
        for cfg in &file.areas {
            mgr.add(PlotArea::new(cfg, &file.settings, registry(), &TestWorld("plots")).unwrap());
        }
        assert_eq!(mgr.area_for_chunk("plots", -1, 0).unwrap().label(), "plots;west");
        assert_eq!(mgr.area_for_chunk("plots", 0, 0).unwrap().label(), "plots;east");
        assert!(mgr.area_for_chunk("plots", 40, 0).is_none());
        assert!(mgr.area_for_chunk("nether", 0, 0).is_none());
        assert_eq!(mgr.areas_in_world("plots").count(), 2);
    }
}
