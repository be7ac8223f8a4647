use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use plotgen_blocks::registry::{parse_block_key, strip_namespace};
use plotgen_blocks::{BlockRegistry, VoxelState};

use crate::clipboard::Clipboard;
use crate::error::SchematicError;

/// Opaque fragment loader.
///
/// `Ok(None)` means no file at `path`; a file that exists but cannot be
/// decoded is `Err(SchematicError::UnsupportedFormat)`.
pub trait FragmentSource: Send + Sync {
    fn load(&self, path: &Path) -> Result<Option<Clipboard>, SchematicError>;
}

/// Sponge / legacy schematic loader backed by `mc_schem`, mapping palette
/// keys through the block registry.
#[derive(Clone)]
pub struct McSchemLoader {
    registry: Arc<BlockRegistry>,
}

impl McSchemLoader {
    pub fn new(registry: Arc<BlockRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    /// Base ids in the file's palette that the registry cannot map.
    pub fn unsupported_blocks(&self, path: &Path) -> Result<Vec<String>, SchematicError> {
        let schem = read_schematic(path)?;
        let (palette, _lut) = schem.full_palette();
        let mut unsupported = BTreeSet::new();
        for (blk, _hash) in palette {
            if blk.is_air() || blk.is_structure_void() {
                continue;
            }
            let id = blk.full_id();
            if self.registry.block_from_key(&id).is_none() {
                let (base, _) = parse_block_key(&id);
                unsupported.insert(base.to_string());
            }
        }
        Ok(unsupported.into_iter().collect())
    }

    fn voxel_for_key(&self, key: &str) -> Option<VoxelState> {
        let block = self.registry.block_from_key_or_unknown(key)?;
        // Standing signs, banners and heads keep their 16-step rotation as entity data.
        let (_, props) = parse_block_key(key);
        let rot = props
            .get("rotation")
            .and_then(|r| r.parse::<u8>().ok())
            .filter(|r| *r < 16);
        Some(VoxelState { block, rot })
    }
}

fn read_schematic(path: &Path) -> Result<mc_schem::Schematic, SchematicError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| SchematicError::unsupported(path, "path is not valid UTF-8"))?;
    let (schem, _meta) = mc_schem::Schematic::from_file(path_str)
        .map_err(|e| SchematicError::unsupported(path, format!("parse schem: {e}")))?;
    Ok(schem)
}

impl FragmentSource for McSchemLoader {
    fn load(&self, path: &Path) -> Result<Option<Clipboard>, SchematicError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SchematicError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }
        let schem = read_schematic(path)?;
        let shape = schem.shape();
        if shape.iter().any(|&d| d < 0) {
            return Err(SchematicError::unsupported(
                path,
                format!("negative shape {shape:?}"),
            ));
        }
        let mut clip = Clipboard::new(shape[0] as usize, shape[1] as usize, shape[2] as usize);
        let mut unmapped: BTreeSet<String> = BTreeSet::new();
        for x in 0..shape[0] {
            for y in 0..shape[1] {
                for z in 0..shape[2] {
                    let Some(b) = schem.first_block_at([x, y, z]) else {
                        continue;
                    };
                    if b.is_air() || b.is_structure_void() {
                        continue;
                    }
                    let key = b.full_id();
                    match self.voxel_for_key(&key) {
                        Some(v) => clip.set(x as usize, y as usize, z as usize, v),
                        None => {
                            let (base, _) = parse_block_key(&key);
                            unmapped.insert(strip_namespace(base).to_string());
                        }
                    }
                }
            }
        }
        if !unmapped.is_empty() {
            log::warn!(
                "{}: skipped {} unmapped block type(s): {}",
                path.display(),
                unmapped.len(),
                unmapped.into_iter().collect::<Vec<_>>().join(", ")
            );
        }
        log::debug!(
            "loaded fragment {} ({}x{}x{}, {} solid)",
            path.display(),
            clip.width(),
            clip.height(),
            clip.length(),
            clip.non_air_count()
        );
        Ok(Some(clip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader() -> McSchemLoader {
        let reg = BlockRegistry::from_toml_str(
            r#"
            [[blocks]]
            name = "air"
            [[blocks]]
            name = "stone"
            [[blocks]]
            name = "oak_sign"
            state_schema = { rotation = ["0","1","2","3","4","5","6","7","8","9","10","11","12","13","14","15"] }
        "#,
        )
        .unwrap();
        McSchemLoader::new(Arc::new(reg))
    }

    #[test]
    fn missing_file_is_none() {
        let path = std::env::temp_dir().join("plotgen-no-such-fragment.schem");
        assert!(loader().load(&path).unwrap().is_none());
    }

    #[test]
    fn garbage_is_unsupported() {
        let path = std::env::temp_dir().join(format!("plotgen-garbage-{}.schem", std::process::id()));
        std::fs::write(&path, b"definitely not nbt").unwrap();
        let err = loader().load(&path).unwrap_err();
        assert!(err.is_unsupported_format(), "{err}");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn rotation_property_becomes_entity_tag() {
        let l = loader();
        let sign = l.voxel_for_key("minecraft:oak_sign[rotation=6]").unwrap();
        assert_eq!(sign.rot, Some(6));
        let stone = l.voxel_for_key("minecraft:stone").unwrap();
        assert_eq!(stone.rot, None);
        assert!(l.voxel_for_key("minecraft:bedrock").is_none());
    }
}
