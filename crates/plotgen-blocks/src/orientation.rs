//! Sixteen-point compass used by rotation tags and block-state orientation.
//!
//! Rotation index `r` follows the in-game convention: 0 faces south and the
//! index grows clockwise seen from above, so 4 is west, 8 north, 12 east.
//! Vectors are `(x, z)` with +x east and +z south.

use std::f64::consts::FRAC_PI_8;

use crate::registry::BlockRegistry;
use crate::types::VoxelState;

pub const CARDINAL: u8 = 0b001;
pub const ORDINAL: u8 = 0b010;
pub const SECONDARY_ORDINAL: u8 = 0b100;
pub const ALL_HORIZONTAL: u8 = CARDINAL | ORDINAL | SECONDARY_ORDINAL;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    South,
    SouthSouthwest,
    Southwest,
    WestSouthwest,
    West,
    WestNorthwest,
    Northwest,
    NorthNorthwest,
    North,
    NorthNortheast,
    Northeast,
    EastNortheast,
    East,
    EastSoutheast,
    Southeast,
    SouthSoutheast,
}

const BY_ROTATION: [Direction; 16] = [
    Direction::South,
    Direction::SouthSouthwest,
    Direction::Southwest,
    Direction::WestSouthwest,
    Direction::West,
    Direction::WestNorthwest,
    Direction::Northwest,
    Direction::NorthNorthwest,
    Direction::North,
    Direction::NorthNortheast,
    Direction::Northeast,
    Direction::EastNortheast,
    Direction::East,
    Direction::EastSoutheast,
    Direction::Southeast,
    Direction::SouthSoutheast,
];

impl Direction {
    #[inline]
    pub fn from_rotation(rot: u8) -> Option<Direction> {
        BY_ROTATION.get(rot as usize).copied()
    }

    #[inline]
    pub fn to_rotation(self) -> u8 {
        self as u8
    }

    pub fn flag(self) -> u8 {
        match self.to_rotation() % 4 {
            0 => CARDINAL,
            2 => ORDINAL,
            _ => SECONDARY_ORDINAL,
        }
    }

    /// Unit vector `(x, z)`.
    pub fn vector(self) -> (f64, f64) {
        let angle = f64::from(self.to_rotation()) * FRAC_PI_8;
        let (s, c) = angle.sin_cos();
        (-s, c)
    }

    /// Closest direction among those matching `flags`, by largest dot product.
    pub fn find_closest(v: (f64, f64), flags: u8) -> Option<Direction> {
        let len = (v.0 * v.0 + v.1 * v.1).sqrt();
        if len <= f64::EPSILON {
            return None;
        }
        let (nx, nz) = (v.0 / len, v.1 / len);
        let mut best: Option<(Direction, f64)> = None;
        for dir in BY_ROTATION {
            if dir.flag() & flags == 0 {
                continue;
            }
            let (dx, dz) = dir.vector();
            let dot = nx * dx + nz * dz;
            if best.is_none_or(|(_, d)| dot > d) {
                best = Some((dir, dot));
            }
        }
        best.map(|(d, _)| d)
    }

    /// Quarter turn about the vertical axis, keeping the direction's own class.
    pub fn rotate_y90(self) -> Option<Direction> {
        Direction::find_closest(rotate_vector_y90(self.vector()), self.flag())
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::South => "south",
            Direction::SouthSouthwest => "south_southwest",
            Direction::Southwest => "southwest",
            Direction::WestSouthwest => "west_southwest",
            Direction::West => "west",
            Direction::WestNorthwest => "west_northwest",
            Direction::Northwest => "northwest",
            Direction::NorthNorthwest => "north_northwest",
            Direction::North => "north",
            Direction::NorthNortheast => "north_northeast",
            Direction::Northeast => "northeast",
            Direction::EastNortheast => "east_northeast",
            Direction::East => "east",
            Direction::EastSoutheast => "east_southeast",
            Direction::Southeast => "southeast",
            Direction::SouthSoutheast => "south_southeast",
        }
    }

    pub fn from_name(name: &str) -> Option<Direction> {
        BY_ROTATION.into_iter().find(|d| d.name() == name)
    }
}

/// `(x, z) -> (z, -x)`: the same quarter turn the overlay applies to positions.
#[inline]
pub fn rotate_vector_y90(v: (f64, f64)) -> (f64, f64) {
    (v.1, -v.0)
}

/// Semantic half of the voxel rotation: turn the entity rotation tag.
///
/// Voxels without a tag, or with a tag outside `0..16`, come back unchanged.
pub fn rotate_encoded_direction(voxel: VoxelState) -> VoxelState {
    let Some(rot) = voxel.rot else {
        return voxel;
    };
    let Some(dir) = Direction::from_rotation(rot) else {
        return voxel;
    };
    match Direction::find_closest(rotate_vector_y90(dir.vector()), ALL_HORIZONTAL) {
        Some(turned) => VoxelState {
            block: voxel.block,
            rot: Some(turned.to_rotation()),
        },
        None => voxel,
    }
}

/// Full quarter turn of a voxel: rotation tag first, then block-state shape.
pub fn rotate_voxel(reg: &BlockRegistry, voxel: VoxelState) -> VoxelState {
    let tagged = rotate_encoded_direction(voxel);
    VoxelState {
        block: reg.rotate_shape_y90(tagged.block),
        rot: tagged.rot,
    }
}
