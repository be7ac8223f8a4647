use serde::{Deserialize, Serialize};

pub type BlockId = u16;
pub type BlockState = u16;

// Compact voxel representation used at runtime
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Debug, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub state: BlockState,
}

impl Block {
    pub const AIR: Block = Block { id: 0, state: 0 };

    #[inline]
    pub const fn new(id: BlockId, state: BlockState) -> Self {
        Self { id, state }
    }

    #[inline]
    pub fn is_air(self) -> bool {
        self.id == Self::AIR.id
    }
}

/// Full voxel state: the block plus an optional entity rotation tag.
///
/// `rot` is the 16-step rotation some block entities (skulls, banners, signs)
/// carry outside their block state. Voxels with a tag cannot be written
/// during raw chunk generation and are deferred to the populate pass.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Debug, Serialize, Deserialize)]
pub struct VoxelState {
    pub block: Block,
    pub rot: Option<u8>,
}

impl VoxelState {
    pub const AIR: VoxelState = VoxelState {
        block: Block::AIR,
        rot: None,
    };

    #[inline]
    pub const fn new(block: Block) -> Self {
        Self { block, rot: None }
    }

    #[inline]
    pub const fn with_rot(block: Block, rot: u8) -> Self {
        Self {
            block,
            rot: Some(rot),
        }
    }

    #[inline]
    pub fn is_air(&self) -> bool {
        self.block.is_air()
    }

    #[inline]
    pub fn has_entity_data(&self) -> bool {
        self.rot.is_some()
    }
}

impl From<Block> for VoxelState {
    fn from(block: Block) -> Self {
        Self::new(block)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Debug, Serialize, Deserialize)]
pub struct BiomeTag(pub u16);
