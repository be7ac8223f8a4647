use crate::registry::BlockRegistry;
use crate::types::{Block, VoxelState};

/// Position-dependent voxel source.
pub trait Pattern: Send + Sync {
    fn apply(&self, x: i32, y: i32, z: i32) -> VoxelState;
}

impl Pattern for VoxelState {
    #[inline]
    fn apply(&self, _x: i32, _y: i32, _z: i32) -> VoxelState {
        *self
    }
}

impl Pattern for Block {
    #[inline]
    fn apply(&self, _x: i32, _y: i32, _z: i32) -> VoxelState {
        VoxelState::new(*self)
    }
}

/// Weighted mix of blocks, e.g. `stone:3,cobblestone:1`.
///
/// The pick depends only on the absolute position, so regenerating a chunk
/// reproduces it exactly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockBucket {
    entries: Vec<(VoxelState, u32)>,
    total: u32,
}

impl BlockBucket {
    pub fn single(voxel: VoxelState) -> Self {
        Self {
            entries: vec![(voxel, 1)],
            total: 1,
        }
    }

    pub fn parse(spec: &str, reg: &BlockRegistry) -> Result<Self, String> {
        let mut entries = Vec::new();
        let mut total: u32 = 0;
        for part in split_top_level(spec) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (key, weight) = match part.rsplit_once(':') {
                Some((k, w)) if !w.is_empty() && w.bytes().all(|b| b.is_ascii_digit()) => {
                    let w: u32 = w.parse().map_err(|e| format!("weight in '{part}': {e}"))?;
                    (k, w)
                }
                _ => (part, 1),
            };
            if weight == 0 {
                continue;
            }
            let block = reg
                .block_from_key(key)
                .ok_or_else(|| format!("unknown block '{key}'"))?;
            total = total
                .checked_add(weight)
                .ok_or_else(|| format!("bucket weights overflow in '{spec}'"))?;
            entries.push((VoxelState::new(block), weight));
        }
        if entries.is_empty() {
            return Err(format!("empty block bucket '{spec}'"));
        }
        Ok(Self { entries, total })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first(&self) -> VoxelState {
        self.entries.first().map(|(v, _)| *v).unwrap_or(VoxelState::AIR)
    }
}

impl Pattern for BlockBucket {
    fn apply(&self, x: i32, y: i32, z: i32) -> VoxelState {
        if self.entries.len() <= 1 {
            return self.first();
        }
        let mut pick = (position_hash(x, y, z) % u64::from(self.total)) as u32;
        for (voxel, weight) in &self.entries {
            if pick < *weight {
                return *voxel;
            }
            pick -= weight;
        }
        self.first()
    }
}

// Commas inside `[...]` belong to block properties, not the bucket list.
fn split_top_level(spec: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in spec.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(&spec[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&spec[start..]);
    out
}

#[inline]
fn position_hash(x: i32, y: i32, z: i32) -> u64 {
    let mut h = (x as u32 as u64)
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (y as u32 as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
        ^ (z as u32 as u64).wrapping_mul(0x1656_67B1_9E37_79F9);
    h ^= h >> 33;
    h = h.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    h ^= h >> 33;
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg() -> BlockRegistry {
        BlockRegistry::from_toml_str(
            r#"
            [[blocks]]
            name = "air"
            [[blocks]]
            name = "stone"
            [[blocks]]
            name = "cobblestone"
            [[blocks]]
            name = "oak_log"
            state_schema = { axis = ["y", "x", "z"] }
        "#,
        )
        .unwrap()
    }

    #[test]
    fn parses_weights_and_properties() {
        let reg = reg();
        let bucket = BlockBucket::parse("minecraft:stone:3, oak_log[axis=x]", &reg).unwrap();
        assert_eq!(bucket.len(), 2);
        assert_eq!(bucket.first().block.id, reg.id_by_name("stone").unwrap());
        assert!(BlockBucket::parse("bedrock", &reg).is_err());
        assert!(BlockBucket::parse(" , ", &reg).is_err());
    }

    #[test]
    fn picks_are_deterministic_and_weighted() {
        let reg = reg();
        let bucket = BlockBucket::parse("stone:3,cobblestone:1", &reg).unwrap();
        let stone = reg.id_by_name("stone").unwrap();
        let mut stones = 0;
        for x in 0..64 {
            for z in 0..64 {
                let a = bucket.apply(x, 10, z);
                assert_eq!(a, bucket.apply(x, 10, z));
                if a.block.id == stone {
                    stones += 1;
                }
            }
        }
        // 3:1 split over 4096 samples
        assert!((2800..3350).contains(&stones), "stones={stones}");
    }
}
