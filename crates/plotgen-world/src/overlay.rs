//! Fragment overlay grid: plot template, road segment and intersection
//! fragments folded into one `S x S` repeating cell of voxel columns.

use std::fmt;
use std::path::Path;
use std::sync::{Arc, RwLock};

use hashbrown::{HashMap, HashSet};
use plotgen_blocks::{BiomeTag, BlockRegistry, VoxelState, rotate_voxel};
use plotgen_schem::{
    Clipboard, FragmentKind, FragmentSource, SchematicError, fragment_path,
};
use thiserror::Error;

use crate::config::{PlotGeometry, SchematicSettings};

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("{kind} fragment has an unsupported format: {source}")]
    UnsupportedFormat {
        kind: FragmentKind,
        #[source]
        source: SchematicError,
    },
    #[error("{kind} fragment could not be read: {source}")]
    Io {
        kind: FragmentKind,
        #[source]
        source: SchematicError,
    },
}

impl OverlayError {
    fn from_schematic(kind: FragmentKind, source: SchematicError) -> Self {
        if source.is_unsupported_format() {
            OverlayError::UnsupportedFormat { kind, source }
        } else {
            OverlayError::Io { kind, source }
        }
    }

    pub fn kind(&self) -> FragmentKind {
        match self {
            OverlayError::UnsupportedFormat { kind, .. } | OverlayError::Io { kind, .. } => *kind,
        }
    }

    #[inline]
    pub fn is_unsupported_format(&self) -> bool {
        matches!(self, OverlayError::UnsupportedFormat { .. })
    }
}

/// Collision-free key for `0 <= x, z < 0x10000`.
#[inline]
pub fn pair(x: i32, z: i32) -> u32 {
    ((x as u32) << 16) | (z as u32 & 0xFFFF)
}

#[inline]
pub fn unpair(key: u32) -> (i32, i32) {
    ((key >> 16) as i32, (key & 0xFFFF) as i32)
}

#[inline]
fn wrap(c: i32, size: i32) -> i32 {
    c.rem_euclid(size)
}

/// Built overlay. Immutable once published.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Overlay {
    size: i32,
    anchors: Anchors,
    plot_schematic: bool,
    road_schematic: bool,
    columns: HashMap<u32, Box<[Option<VoxelState>]>>,
    biomes: HashMap<u32, BiomeTag>,
}

impl Overlay {
    pub fn empty(size: i32, anchors: Anchors) -> Self {
        assert!(size > 0, "overlay section size must be positive, got {size}");
        Self {
            size,
            anchors,
            plot_schematic: false,
            road_schematic: false,
            columns: HashMap::new(),
            biomes: HashMap::new(),
        }
    }

    #[inline]
    pub fn size(&self) -> i32 {
        self.size
    }

    #[inline]
    pub fn anchors(&self) -> Anchors {
        self.anchors
    }

    /// Absolute y of column index 0.
    #[inline]
    pub fn schem_y(&self) -> i32 {
        self.anchors.schem_y
    }

    #[inline]
    pub fn plot_schematic_enabled(&self) -> bool {
        self.plot_schematic
    }

    #[inline]
    pub fn road_schematic_enabled(&self) -> bool {
        self.road_schematic
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.biomes.is_empty()
    }

    /// Column at `(x, z)`, wrapped into the cell.
    pub fn column(&self, x: i32, z: i32) -> Option<&[Option<VoxelState>]> {
        self.columns
            .get(&pair(wrap(x, self.size), wrap(z, self.size)))
            .map(|c| &c[..])
    }

    pub fn biome(&self, x: i32, z: i32) -> Option<BiomeTag> {
        self.biomes
            .get(&pair(wrap(x, self.size), wrap(z, self.size)))
            .copied()
    }

    pub fn has_entity_data(&self, x: i32, z: i32) -> bool {
        self.column(x, z)
            .is_some_and(|c| c.iter().flatten().any(|v| v.has_entity_data()))
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn summary(&self) -> OverlaySummary {
        let mut voxels = 0;
        let mut entity_voxels = 0;
        for v in self.columns.values().flat_map(|c| c.iter().flatten()) {
            voxels += 1;
            if v.has_entity_data() {
                entity_voxels += 1;
            }
        }
        OverlaySummary {
            columns: self.columns.len(),
            voxels,
            entity_voxels,
            biomes: self.biomes.len(),
            plot_schematic: self.plot_schematic,
            road_schematic: self.road_schematic,
            anchors: self.anchors,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OverlaySummary {
    pub columns: usize,
    pub voxels: usize,
    pub entity_voxels: usize,
    pub biomes: usize,
    pub plot_schematic: bool,
    pub road_schematic: bool,
    pub anchors: Anchors,
}

impl fmt::Display for OverlaySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} columns, {} voxels ({} with entity data), {} biomes, plot={} road={}, schem_y={} plot_y={} road_y={}",
            self.columns,
            self.voxels,
            self.entity_voxels,
            self.biomes,
            self.plot_schematic,
            self.road_schematic,
            self.anchors.schem_y,
            self.anchors.plot_y,
            self.anchors.road_y
        )
    }
}

/// Shared, atomically swapped overlay. Readers snapshot an `Arc` per chunk.
#[derive(Clone, Debug)]
pub struct OverlayHandle {
    inner: Arc<RwLock<Arc<Overlay>>>,
}

impl OverlayHandle {
    pub fn new(overlay: Overlay) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(overlay))),
        }
    }

    pub fn snapshot(&self) -> Arc<Overlay> {
        match self.inner.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn publish(&self, overlay: Overlay) {
        let overlay = Arc::new(overlay);
        match self.inner.write() {
            Ok(mut guard) => *guard = overlay,
            Err(poisoned) => *poisoned.into_inner() = overlay,
        }
    }
}

/// Vertical placement: `schem_y` is absolute, the offsets are relative to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Anchors {
    pub schem_y: i32,
    pub plot_y: i32,
    pub road_y: i32,
}

/// Anchor the plot template and road fragments from their authored heights.
///
/// `road_h` is the road segment's height, or the intersection's when only
/// that is present.
pub fn compute_anchors(
    geom: &PlotGeometry,
    settings: &SchematicSettings,
    plot_h: Option<i32>,
    road_h: Option<i32>,
) -> Anchors {
    let full = geom.gen_height();
    let min_road_wall = if settings.use_wall_in_road_schem_height {
        geom.road_height.min(geom.wall_height)
    } else {
        geom.road_height
    };

    let mut plot_anchor = plot_h.map(|h| {
        if h == full {
            geom.min_gen
        } else if !settings.paste_on_top {
            geom.min_build
        } else {
            geom.plot_height
        }
    });
    // (anchor, pinned to the floor)
    let road_anchor = road_h.map(|h| {
        if h == full {
            (geom.min_gen, true)
        } else if !settings.paste_road_on_top {
            (geom.min_build, true)
        } else {
            (min_road_wall, false)
        }
    });
    if matches!(road_anchor, Some((_, true)))
        && plot_h.is_some_and(|h| h != full)
        && !settings.paste_on_top
    {
        // keep the plot template above the floor-pinned road layer
        plot_anchor = Some(geom.plot_height);
    }

    let schem_y = match (plot_anchor, road_anchor) {
        (Some(p), Some((r, _))) => p.min(r),
        (Some(p), None) => p,
        (None, Some((r, _))) => r,
        (None, None) => geom.plot_height.min(min_road_wall),
    };
    Anchors {
        schem_y,
        plot_y: plot_anchor.unwrap_or(geom.plot_height) - schem_y,
        road_y: road_anchor.map_or(min_road_wall, |(r, _)| r) - schem_y,
    }
}

/// Decoded fragments for one area; any may be absent.
#[derive(Clone, Debug, Default)]
pub struct Fragments {
    pub plot: Option<Clipboard>,
    pub sideroad: Option<Clipboard>,
    pub intersection: Option<Clipboard>,
}

impl Fragments {
    /// Load `plot`, `sideroad` and `intersection` from `dir`.
    pub fn load(source: &dyn FragmentSource, dir: &Path) -> Result<Self, OverlayError> {
        let mut out = Fragments::default();
        for kind in FragmentKind::ALL {
            let path = fragment_path(dir, kind);
            let clip = source
                .load(&path)
                .map_err(|e| OverlayError::from_schematic(kind, e))?;
            if clip.is_some() {
                log::debug!("- {kind} fragment: {}", path.display());
            }
            match kind {
                FragmentKind::Plot => out.plot = clip,
                FragmentKind::SideRoad => out.sideroad = clip,
                FragmentKind::Intersection => out.intersection = clip,
            }
        }
        Ok(out)
    }

    pub fn is_empty(&self) -> bool {
        self.plot.is_none() && self.sideroad.is_none() && self.intersection.is_none()
    }
}

struct OverlayBuilder<'a> {
    grid: Overlay,
    registry: &'a BlockRegistry,
    // offending heights already reported
    height_errors: HashSet<i32>,
    logged_errors: usize,
}

impl<'a> OverlayBuilder<'a> {
    fn new(grid: Overlay, registry: &'a BlockRegistry) -> Self {
        Self {
            grid,
            registry,
            height_errors: HashSet::new(),
            logged_errors: 0,
        }
    }

    fn add_block(&mut self, x: i32, y: i32, z: i32, voxel: VoxelState, rotate: bool, height: usize) {
        let size = self.grid.size;
        let key = pair(wrap(x, size), wrap(z, size));
        let voxel = if rotate {
            rotate_voxel(self.registry, voxel)
        } else {
            voxel
        };
        let column = self
            .grid
            .columns
            .entry(key)
            .or_insert_with(|| vec![None; height].into_boxed_slice());
        if y < 0 || y as usize >= column.len() {
            if self.height_errors.insert(y) {
                self.logged_errors += 1;
                log::error!(
                    "Error adding overlay block. `y > height`. y={y}, height={}",
                    column.len()
                );
            }
            return;
        }
        column[y as usize] = Some(voxel);
    }

    fn add_biome(&mut self, x: i32, z: i32, biome: Option<BiomeTag>) {
        let size = self.grid.size;
        let key = pair(wrap(x, size), wrap(z, size));
        match biome {
            Some(b) => {
                self.grid.biomes.insert(key, b);
            }
            None => {
                self.grid.biomes.remove(&key);
            }
        }
    }
}

/// Fold `fragments` into a fresh overlay for `geom`.
pub fn build_overlay(
    geom: &PlotGeometry,
    settings: &SchematicSettings,
    registry: &BlockRegistry,
    fragments: &Fragments,
) -> Overlay {
    let shift = geom.road_width / 2;
    let oddshift = geom.road_width & 1;
    let road_h = fragments
        .sideroad
        .as_ref()
        .or(fragments.intersection.as_ref())
        .map(|c| c.height() as i32);
    let anchors = compute_anchors(
        geom,
        settings,
        fragments.plot.as_ref().map(|c| c.height() as i32),
        road_h,
    );
    let mut b = OverlayBuilder::new(Overlay::empty(geom.size(), anchors), registry);

    if let Some(plot) = &fragments.plot {
        b.grid.plot_schematic = true;
        let (w, h, l) = plot.dimensions();
        let (w, h, l) = (w as i32, h as i32, l as i32);
        if w > geom.plot_width || l > geom.plot_width || h > geom.plot_width {
            b.grid.road_schematic = true;
        }
        let center_x = (geom.plot_width - w) / 2;
        let center_z = (geom.plot_width - l) / 2;
        let base = shift + oddshift;
        // room below the template for its offset above `schem_y`
        let column_h = (anchors.plot_y + h).max(0) as usize;
        for x in 0..w {
            for z in 0..l {
                for y in 0..h {
                    let v = plot.get(x as usize, y as usize, z as usize);
                    if !v.is_air() {
                        b.add_block(
                            x + base + center_x,
                            y + anchors.plot_y,
                            z + base + center_z,
                            v,
                            false,
                            column_h,
                        );
                    }
                }
                b.add_biome(
                    x + base + center_x,
                    z + base + center_z,
                    plot.biome(x as usize, z as usize),
                );
            }
        }
    }

    if (fragments.sideroad.is_none() && fragments.intersection.is_none()) || geom.road_width == 0 {
        return b.grid;
    }
    b.grid.road_schematic = true;

    // short authored walls still get room for the raised road
    let extra = if settings.use_wall_in_road_schem_height {
        0
    } else {
        (geom.road_height - geom.wall_height).max(0)
    };

    if let Some(road) = &fragments.sideroad {
        let (w, h, l) = road.dimensions();
        let column_h = (anchors.road_y + h as i32 + extra).max(0) as usize;
        for x in 0..w as i32 {
            for z in 0..l as i32 {
                for y in 0..h as i32 {
                    let v = road.get(x as usize, y as usize, z as usize);
                    if v.is_air() {
                        continue;
                    }
                    b.add_block(x - shift, y + anchors.road_y, z + shift + oddshift, v, false, column_h);
                    b.add_block(
                        z + shift + oddshift,
                        y + anchors.road_y,
                        shift - x + (oddshift - 1),
                        v,
                        true,
                        column_h,
                    );
                }
                let biome = road.biome(x as usize, z as usize);
                b.add_biome(x - shift, z + shift + oddshift, biome);
                b.add_biome(z + shift + oddshift, shift - x + (oddshift - 1), biome);
            }
        }
    }

    if let Some(inter) = &fragments.intersection {
        let (w, h, l) = inter.dimensions();
        let column_h = (anchors.road_y + h as i32 + extra).max(0) as usize;
        for x in 0..w as i32 {
            for z in 0..l as i32 {
                for y in 0..h as i32 {
                    let v = inter.get(x as usize, y as usize, z as usize);
                    if !v.is_air() {
                        b.add_block(x - shift, y + anchors.road_y, z - shift, v, false, column_h);
                    }
                }
                b.add_biome(x - shift, z - shift, inter.biome(x as usize, z as usize));
            }
        }
    }

    b.grid
}
