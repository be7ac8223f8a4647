//! Voxel value types, block registry, orientation codec, and patterns.
#![forbid(unsafe_code)]

pub mod config;
pub mod orientation;
pub mod pattern;
pub mod registry;
pub mod types;

pub use orientation::{Direction, rotate_encoded_direction, rotate_voxel};
pub use pattern::{BlockBucket, Pattern};
pub use registry::BlockRegistry;
pub use types::{BiomeTag, Block, BlockId, BlockState, VoxelState};
