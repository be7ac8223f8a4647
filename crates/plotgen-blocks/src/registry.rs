use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::Path;

use super::config::BlocksConfig;
use super::orientation::Direction;
use super::types::{BiomeTag, Block, BlockId, BlockState};

const HORIZONTAL_LINKS: [&str; 4] = ["north", "east", "south", "west"];

#[derive(Default, Clone, Debug)]
pub struct BlockRegistry {
    pub blocks: Vec<BlockType>,
    pub by_name: HashMap<String, BlockId>,
    pub biomes: Vec<String>,
    pub biome_by_name: HashMap<String, BiomeTag>,
    pub unknown_block_id: Option<BlockId>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, id: BlockId) -> Option<&BlockType> {
        self.blocks.get(id as usize)
    }

    pub fn id_by_name(&self, name: &str) -> Option<BlockId> {
        self.by_name.get(name).copied()
    }

    pub fn biome_by_name(&self, name: &str) -> Option<BiomeTag> {
        self.biome_by_name.get(strip_namespace(name)).copied()
    }

    pub fn biome_name(&self, tag: BiomeTag) -> Option<&str> {
        self.biomes.get(tag.0 as usize).map(|s| s.as_str())
    }

    pub fn load_from_path(blocks_path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let blocks_toml = fs::read_to_string(blocks_path)?;
        Self::from_toml_str(&blocks_toml)
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: BlocksConfig = toml::from_str(toml_str)?;
        Self::from_configs(cfg)
    }

    pub fn from_configs(cfg: BlocksConfig) -> Result<Self, Box<dyn Error>> {
        let mut reg = BlockRegistry::new();
        for def in cfg.blocks.into_iter() {
            let id = def.id.unwrap_or(reg.blocks.len() as u16);
            if def.name == "air" && id != Block::AIR.id {
                return Err(format!("air must use id {}, got {}", Block::AIR.id, id).into());
            }
            let state_schema = def.state_schema.unwrap_or_default();
            let (state_fields, prop_index) = compute_state_layout(&state_schema);
            let total_bits: u32 = state_fields.iter().map(|f| f.bits).sum();
            if total_bits > BlockState::BITS {
                return Err(format!(
                    "block '{}' state schema needs {} bits (max {})",
                    def.name,
                    total_bits,
                    BlockState::BITS
                )
                .into());
            }
            let ty = BlockType {
                id,
                name: def.name,
                state_schema,
                state_fields,
                prop_index,
            };
            if reg.blocks.len() <= id as usize {
                reg.blocks
                    .resize(id as usize + 1, BlockType::placeholder(id));
            }
            reg.blocks[id as usize] = ty;
        }
        reg.by_name = reg
            .blocks
            .iter()
            .filter(|t| !t.name.is_empty())
            .map(|t| (t.name.clone(), t.id))
            .collect();
        if let Some(name) = cfg.unknown_block {
            reg.unknown_block_id = reg.id_by_name(&name);
        }
        reg.biome_by_name = cfg
            .biomes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), BiomeTag(i as u16)))
            .collect();
        reg.biomes = cfg.biomes;
        Ok(reg)
    }

    pub fn make_block_by_name(
        &self,
        name: &str,
        props: Option<&HashMap<String, String>>,
    ) -> Option<Block> {
        let id = self.id_by_name(name)?;
        let state = if let Some(p) = props {
            self.get(id).map(|ty| ty.pack_state(p)).unwrap_or(0)
        } else {
            0
        };
        Some(Block { id, state })
    }

    /// Resolve a palette key like `minecraft:oak_stairs[facing=east,half=top]`.
    pub fn block_from_key(&self, key: &str) -> Option<Block> {
        let (base, props) = parse_block_key(key);
        let name = strip_namespace(base);
        if props.is_empty() {
            self.make_block_by_name(name, None)
        } else {
            self.make_block_by_name(name, Some(&props))
        }
    }

    /// Like `block_from_key`, falling back to the configured unknown block.
    pub fn block_from_key_or_unknown(&self, key: &str) -> Option<Block> {
        self.block_from_key(key).or_else(|| {
            self.unknown_block_id
                .map(|id| Block { id, state: 0 })
        })
    }

    /// Geometric quarter turn about the vertical axis, `(x, z) -> (z, -x)`.
    ///
    /// Rewrites the orientation-bearing properties of the block state:
    /// `facing`, `axis`, the 16-step `rotation`, and the four horizontal
    /// connection flags. Unknown blocks and properties pass through.
    pub fn rotate_shape_y90(&self, block: Block) -> Block {
        let Some(ty) = self.get(block.id) else {
            return block;
        };
        if ty.state_fields.is_empty() {
            return block;
        }
        let src = block.state;
        let mut state = src;
        if let Some(facing) = ty.state_prop_value(src, "facing") {
            if let Some(turned) = Direction::from_name(facing).and_then(Direction::rotate_y90) {
                state = ty.with_prop(state, "facing", turned.name());
            }
        }
        if let Some(axis) = ty.state_prop_value(src, "axis") {
            let turned = match axis {
                "x" => "z",
                "z" => "x",
                other => other,
            };
            state = ty.with_prop(state, "axis", turned);
        }
        if let Some(rot) = ty
            .state_prop_value(src, "rotation")
            .and_then(|r| r.parse::<u8>().ok())
        {
            if let Some(turned) = Direction::from_rotation(rot).and_then(Direction::rotate_y90) {
                state = ty.with_prop(state, "rotation", &turned.to_rotation().to_string());
            }
        }
        if HORIZONTAL_LINKS.iter().all(|l| ty.prop_index.contains_key(*l)) {
            for link in HORIZONTAL_LINKS {
                let Some(from) = Direction::from_name(link) else {
                    continue;
                };
                let Some(to) = from.rotate_y90() else {
                    continue;
                };
                if let Some(value) = ty.state_prop_value(src, link) {
                    state = ty.with_prop(state, to.name(), value);
                }
            }
        }
        Block {
            id: block.id,
            state,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BlockType {
    pub id: BlockId,
    pub name: String,
    pub state_schema: HashMap<String, Vec<String>>, // property name -> allowed values
    // Precomputed, sorted layout for fast state packing/unpacking
    pub state_fields: Vec<StateField>,
    pub prop_index: HashMap<String, usize>,
}

impl BlockType {
    fn placeholder(id: BlockId) -> Self {
        BlockType {
            id,
            name: String::new(),
            state_schema: HashMap::new(),
            state_fields: Vec::new(),
            prop_index: HashMap::new(),
        }
    }

    pub fn state_prop_value<'a>(&'a self, state: BlockState, prop: &str) -> Option<&'a str> {
        if self.state_fields.is_empty() {
            return None;
        }
        let &i = self.prop_index.get(prop)?;
        let f = &self.state_fields[i];
        if f.bits == 0 {
            return f.values.first().map(|s| s.as_str());
        }
        let idx: usize = (((state as u32) >> f.offset) & f.mask()) as usize;
        f.values.get(idx).map(|s| s.as_str())
    }

    pub fn state_prop_is_value(&self, state: BlockState, prop: &str, expect: &str) -> bool {
        self.state_prop_value(state, prop) == Some(expect)
    }

    pub fn pack_state(&self, props: &HashMap<String, String>) -> BlockState {
        if self.state_fields.is_empty() {
            return 0;
        }
        let mut acc: u32 = 0;
        for f in &self.state_fields {
            if f.bits == 0 {
                continue;
            }
            let sel_idx: u32 = match props.get(&f.name) {
                Some(val) => f.values.iter().position(|s| s == val).unwrap_or(0) as u32,
                None => 0,
            };
            acc |= (sel_idx & f.mask()) << f.offset;
        }
        acc as BlockState
    }

    /// Replace one property in `state`. Values outside the schema leave it unchanged.
    pub fn with_prop(&self, state: BlockState, prop: &str, value: &str) -> BlockState {
        let Some(&i) = self.prop_index.get(prop) else {
            return state;
        };
        let f = &self.state_fields[i];
        let Some(sel_idx) = f.values.iter().position(|s| s == value) else {
            return state;
        };
        if f.bits == 0 {
            return state;
        }
        let cleared = (state as u32) & !(f.mask() << f.offset);
        (cleared | ((sel_idx as u32 & f.mask()) << f.offset)) as BlockState
    }
}

#[derive(Clone, Debug)]
pub struct StateField {
    pub name: String,
    pub values: Vec<String>,
    pub bits: u32,
    pub offset: u32,
}

impl StateField {
    #[inline]
    fn mask(&self) -> u32 {
        if self.bits >= 32 {
            u32::MAX
        } else {
            (1u32 << self.bits) - 1
        }
    }
}

fn compute_state_layout(
    schema: &HashMap<String, Vec<String>>,
) -> (Vec<StateField>, HashMap<String, usize>) {
    let mut keys: Vec<&String> = schema.keys().collect();
    keys.sort();
    let mut offset: u32 = 0;
    let mut fields: Vec<StateField> = Vec::with_capacity(keys.len());
    for k in keys.into_iter() {
        let vals = schema.get(k).cloned().unwrap_or_default();
        let vlen = vals.len() as u32;
        let bits: u32 = if vlen <= 1 {
            0
        } else {
            32 - (vlen - 1).leading_zeros()
        };
        fields.push(StateField {
            name: k.to_string(),
            values: vals,
            bits,
            offset,
        });
        offset = offset.saturating_add(bits);
    }
    let mut index: HashMap<String, usize> = HashMap::with_capacity(fields.len());
    for (i, f) in fields.iter().enumerate() {
        index.insert(f.name.clone(), i);
    }
    (fields, index)
}

#[inline]
pub fn strip_namespace(name: &str) -> &str {
    name.strip_prefix("minecraft:").unwrap_or(name)
}

/// Split `base[k=v,...]` into the base id and its property map.
pub fn parse_block_key(key: &str) -> (&str, HashMap<String, String>) {
    let mut props = HashMap::new();
    let Some((base, rest)) = key.split_once('[') else {
        return (key, props);
    };
    let body = rest.strip_suffix(']').unwrap_or(rest);
    for pair in body.split(',') {
        if let Some((k, v)) = pair.split_once('=') {
            props.insert(k.trim().to_string(), v.trim().to_string());
        }
    }
    (base, props)
}
