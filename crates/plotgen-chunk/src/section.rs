//! Packed addressing inside a 16x16x16 section.
//!
//! `j = (y & 15) << 8 | (z & 15) << 4 | (x & 15)`. Inputs wrap modulo the
//! section edge; a taller column addresses its stacked sections by layer
//! `i = y >> 4`, and `unpack_y(i, j)` restores the absolute height.

use std::sync::OnceLock;

pub const SECTION_EDGE: usize = 16;
pub const SECTION_VOLUME: usize = SECTION_EDGE * SECTION_EDGE * SECTION_EDGE;

struct IndexTables {
    x_loc: [u8; SECTION_VOLUME],
    y_loc: [u8; SECTION_VOLUME],
    z_loc: [u8; SECTION_VOLUME],
    // [y][x][z] -> j
    packed: [[[u16; SECTION_EDGE]; SECTION_EDGE]; SECTION_EDGE],
}

fn build_tables() -> IndexTables {
    let mut t = IndexTables {
        x_loc: [0; SECTION_VOLUME],
        y_loc: [0; SECTION_VOLUME],
        z_loc: [0; SECTION_VOLUME],
        packed: [[[0; SECTION_EDGE]; SECTION_EDGE]; SECTION_EDGE],
    };
    for j in 0..SECTION_VOLUME {
        let y = j >> 8;
        let rest = j - (y << 8);
        let z = rest >> 4;
        let x = rest - (z << 4);
        t.x_loc[j] = x as u8;
        t.y_loc[j] = y as u8;
        t.z_loc[j] = z as u8;
    }
    for y in 0..SECTION_EDGE {
        for x in 0..SECTION_EDGE {
            for z in 0..SECTION_EDGE {
                t.packed[y][x][z] = ((y << 8) | (z << 4) | x) as u16;
            }
        }
    }
    t
}

#[inline]
fn tables() -> &'static IndexTables {
    static TABLES: OnceLock<Box<IndexTables>> = OnceLock::new();
    TABLES.get_or_init(|| Box::new(build_tables()))
}

#[inline]
pub fn pack(x: i32, y: i32, z: i32) -> u16 {
    tables().packed[(y & 15) as usize][(x & 15) as usize][(z & 15) as usize]
}

#[inline]
pub fn unpack_x(j: u16) -> i32 {
    i32::from(tables().x_loc[j as usize & (SECTION_VOLUME - 1)])
}

#[inline]
pub fn unpack_z(j: u16) -> i32 {
    i32::from(tables().z_loc[j as usize & (SECTION_VOLUME - 1)])
}

/// Absolute height for index `j` inside section layer `layer` (may be negative).
#[inline]
pub fn unpack_y(layer: i32, j: u16) -> i32 {
    (layer << 4) + i32::from(tables().y_loc[j as usize & (SECTION_VOLUME - 1)])
}

#[inline]
pub fn section_layer(y: i32) -> i32 {
    y >> 4
}
