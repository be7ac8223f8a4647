use plotgen_blocks::{Pattern, VoxelState};
use plotgen_chunk::RegionWriteBuffer;

use crate::area::PlotArea;
use crate::overlay::Overlay;

/// Fills one buffer for an area. Implementations must be pure functions of
/// the area, its published overlay, and the buffer bounds.
pub trait PlotGenerator: Send + Sync {
    fn generate_chunk(&self, area: &PlotArea, buf: &mut RegionWriteBuffer);

    /// Second pass for content that needs a finished chunk; returns whether
    /// anything was written.
    fn populate_chunk(&self, area: &PlotArea, buf: &mut RegionWriteBuffer) -> bool {
        let _ = (area, buf);
        false
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    Road,
    Wall,
    Plot,
}

/// Per-axis position inside the repeating plot cell for `extent` columns
/// starting at absolute `start`.
pub fn relative_offsets(start: i32, size: i32, extent: usize) -> Vec<i32> {
    let first = start.rem_euclid(size);
    (0..extent as i32)
        .map(|i| {
            let v = first + i;
            if v >= size { v % size } else { v }
        })
        .collect()
}

/// Road, wall and plot columns from the area's block patterns, with the
/// overlay stamped on top.
#[derive(Copy, Clone, Debug, Default)]
pub struct HybridGen;

impl HybridGen {
    fn classify(v: i32, lower: i32, upper: i32) -> (bool, bool) {
        (v < lower || v > upper, v == lower || v == upper)
    }

    fn column_kinds(area: &PlotArea, buf: &RegionWriteBuffer) -> Vec<(usize, usize, i32, i32, ColumnKind)> {
        let geom = area.geometry();
        let (bot, _) = buf.bounds();
        let size = geom.size();
        let lower = geom.path_width_lower();
        let upper = geom.path_width_upper();
        let rel_x = relative_offsets(bot.x - geom.road_offset_x, size, buf.width());
        let rel_z = relative_offsets(bot.z - geom.road_offset_z, size, buf.length());
        let mut out = Vec::with_capacity(rel_x.len() * rel_z.len());
        for (x, &rx) in rel_x.iter().enumerate() {
            let (road_x, wall_x) = Self::classify(rx, lower, upper);
            for (z, &rz) in rel_z.iter().enumerate() {
                let (road_z, wall_z) = Self::classify(rz, lower, upper);
                let kind = if road_x || road_z {
                    ColumnKind::Road
                } else if wall_x || wall_z {
                    ColumnKind::Wall
                } else {
                    ColumnKind::Plot
                };
                out.push((x, z, rx, rz, kind));
            }
        }
        out
    }

    fn overlay_applies(overlay: &Overlay, kind: ColumnKind) -> bool {
        match kind {
            ColumnKind::Road | ColumnKind::Wall => overlay.road_schematic_enabled(),
            ColumnKind::Plot => overlay.plot_schematic_enabled(),
        }
    }
}

fn fill(buf: &mut RegionWriteBuffer, x: usize, z: usize, from: i32, to: i32, pattern: &dyn Pattern) {
    for y in from.max(buf.min_y())..=to.min(buf.max_y()) {
        buf.set_pattern(x, y, z, pattern);
    }
}

fn set_in_range(buf: &mut RegionWriteBuffer, x: usize, y: i32, z: usize, pattern: &dyn Pattern) {
    if y >= buf.min_y() && y <= buf.max_y() {
        buf.set_pattern(x, y, z, pattern);
    }
}

/// Copy one overlay column; `entities` selects the voxels carrying entity data.
fn stamp(
    buf: &mut RegionWriteBuffer,
    overlay: &Overlay,
    x: usize,
    z: usize,
    rx: i32,
    rz: i32,
    entities: bool,
) -> bool {
    let Some(column) = overlay.column(rx, rz) else {
        return false;
    };
    let mut wrote = false;
    for (i, cell) in column.iter().enumerate() {
        let Some(voxel) = cell else {
            continue;
        };
        if voxel.has_entity_data() != entities {
            continue;
        }
        let y = overlay.schem_y() + i as i32;
        if y < buf.min_y() || y > buf.max_y() {
            continue;
        }
        buf.set_voxel(x, y, z, *voxel);
        wrote = true;
    }
    wrote
}

impl PlotGenerator for HybridGen {
    fn generate_chunk(&self, area: &PlotArea, buf: &mut RegionWriteBuffer) {
        let geom = area.geometry();
        let blocks = area.blocks();
        let overlay = area.overlay();
        let floor = if blocks.bedrock.is_some() {
            geom.min_gen + 1
        } else {
            geom.min_gen
        };

        if let Some(biome) = area.biome() {
            for x in 0..buf.width() {
                for z in 0..buf.length() {
                    buf.set_biome_column(x, z, biome);
                }
            }
        }

        for (x, z, rx, rz, kind) in Self::column_kinds(area, buf) {
            if let Some(bedrock) = &blocks.bedrock {
                set_in_range(buf, x, geom.min_gen, z, bedrock);
            }
            match kind {
                ColumnKind::Road => {
                    fill(buf, x, z, floor, geom.road_height, &blocks.road);
                }
                ColumnKind::Wall => {
                    fill(buf, x, z, floor, geom.wall_height, &blocks.wall_filling);
                    if !overlay.road_schematic_enabled() {
                        set_in_range(buf, x, geom.wall_height + 1, z, &blocks.wall);
                    }
                }
                ColumnKind::Plot => {
                    fill(buf, x, z, floor, geom.plot_height - 1, &blocks.main);
                    set_in_range(buf, x, geom.plot_height, z, &blocks.top);
                }
            }
            if Self::overlay_applies(&overlay, kind) {
                stamp(buf, &overlay, x, z, rx, rz, false);
                if let Some(biome) = overlay.biome(rx, rz) {
                    buf.set_biome_column(x, z, biome);
                }
            }
        }
    }

    fn populate_chunk(&self, area: &PlotArea, buf: &mut RegionWriteBuffer) -> bool {
        let overlay = area.overlay();
        if !overlay.road_schematic_enabled() && !overlay.plot_schematic_enabled() {
            return false;
        }
        let mut wrote = false;
        for (x, z, rx, rz, kind) in Self::column_kinds(area, buf) {
            if Self::overlay_applies(&overlay, kind) && overlay.has_entity_data(rx, rz) {
                wrote |= stamp(buf, &overlay, x, z, rx, rz, true);
            }
        }
        wrote
    }
}

/// Voxel the generator would place for a fragment-free column, for tests and tools.
pub fn surface_voxel(area: &PlotArea, kind: ColumnKind, x: i32, z: i32) -> (i32, VoxelState) {
    let geom = area.geometry();
    let blocks = area.blocks();
    match kind {
        ColumnKind::Road => (geom.road_height, blocks.road.apply(x, geom.road_height, z)),
        ColumnKind::Wall => (
            geom.wall_height + 1,
            blocks.wall.apply(x, geom.wall_height + 1, z),
        ),
        ColumnKind::Plot => (geom.plot_height, blocks.top.apply(x, geom.plot_height, z)),
    }
}
