//! Region write buffer and section export for chunk generation.
#![forbid(unsafe_code)]

pub mod section;

use plotgen_blocks::{BiomeTag, Pattern, VoxelState};

use crate::section::{SECTION_EDGE, SECTION_VOLUME, pack, section_layer};

pub const CHUNK_EDGE: usize = 16;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

// One y layer: rows indexed by z, each row indexed by x, both allocated on demand.
type Row<T> = Box<[Option<T>]>;
type Layer<T> = Box<[Option<Row<T>>]>;

/// Sparse write target for one rectangular column range.
///
/// `x`/`z` are local to the bottom corner, `y` is absolute and must lie in
/// `[min_y, max_y]`. Layers and rows are only allocated when first written,
/// so the air above a plot surface costs nothing.
#[derive(Clone, Debug)]
pub struct RegionWriteBuffer {
    bot: BlockPos,
    top: BlockPos,
    width: usize,
    length: usize,
    voxels: Vec<Option<Layer<VoxelState>>>,
    biomes: Option<Vec<Option<Layer<BiomeTag>>>>,
}

impl RegionWriteBuffer {
    pub fn new(bot: BlockPos, top: BlockPos, track_biomes: bool) -> Self {
        assert!(
            top.x >= bot.x && top.y >= bot.y && top.z >= bot.z,
            "region corners out of order: {bot:?} > {top:?}"
        );
        let width = (top.x - bot.x + 1) as usize;
        let length = (top.z - bot.z + 1) as usize;
        let height = (top.y - bot.y + 1) as usize;
        Self {
            bot,
            top,
            width,
            length,
            voxels: empty_layers(height),
            biomes: track_biomes.then(|| empty_layers(height)),
        }
    }

    /// Buffer covering chunk column `(cx, cz)` over the world's `[min_y, max_y]`.
    pub fn for_chunk(cx: i32, cz: i32, min_y: i32, max_y: i32, track_biomes: bool) -> Self {
        let edge = CHUNK_EDGE as i32;
        Self::new(
            BlockPos::new(cx * edge, min_y, cz * edge),
            BlockPos::new(cx * edge + edge - 1, max_y, cz * edge + edge - 1),
            track_biomes,
        )
    }

    #[inline]
    pub fn bounds(&self) -> (BlockPos, BlockPos) {
        (self.bot, self.top)
    }

    #[inline]
    pub fn min_y(&self) -> i32 {
        self.bot.y
    }

    #[inline]
    pub fn max_y(&self) -> i32 {
        self.top.y
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn length(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn tracks_biomes(&self) -> bool {
        self.biomes.is_some()
    }

    #[inline]
    fn y_index(&self, y: i32) -> usize {
        debug_assert!(
            y >= self.bot.y && y <= self.top.y,
            "y={y} outside [{}, {}]",
            self.bot.y,
            self.top.y
        );
        (y - self.bot.y) as usize
    }

    pub fn set_voxel(&mut self, x: usize, y: i32, z: usize, voxel: VoxelState) -> bool {
        let yi = self.y_index(y);
        store(&mut self.voxels, yi, x, z, self.width, self.length, voxel);
        true
    }

    /// Write the pattern's pick for this cell's absolute position.
    pub fn set_pattern(&mut self, x: usize, y: i32, z: usize, pattern: &dyn Pattern) -> bool {
        let voxel = pattern.apply(self.bot.x + x as i32, y, self.bot.z + z as i32);
        self.set_voxel(x, y, z, voxel)
    }

    pub fn get_voxel(&self, x: usize, y: i32, z: usize) -> Option<VoxelState> {
        if y < self.bot.y || y > self.top.y {
            return None;
        }
        load(&self.voxels, (y - self.bot.y) as usize, x, z)
    }

    /// Set the biome for every height of column `(x, z)`.
    pub fn set_biome_column(&mut self, x: usize, z: usize, biome: BiomeTag) -> bool {
        let (width, length) = (self.width, self.length);
        let Some(biomes) = self.biomes.as_mut() else {
            return false;
        };
        for yi in 0..biomes.len() {
            store(biomes, yi, x, z, width, length, biome);
        }
        true
    }

    pub fn set_biome(&mut self, x: usize, y: i32, z: usize, biome: BiomeTag) -> bool {
        if self.biomes.is_none() {
            return false;
        }
        let yi = self.y_index(y);
        let (width, length) = (self.width, self.length);
        if let Some(biomes) = self.biomes.as_mut() {
            store(biomes, yi, x, z, width, length, biome);
        }
        true
    }

    pub fn get_biome(&self, x: usize, y: i32, z: usize) -> Option<BiomeTag> {
        if y < self.bot.y || y > self.top.y {
            return None;
        }
        load(self.biomes.as_ref()?, (y - self.bot.y) as usize, x, z)
    }

    /// Number of y layers that received at least one voxel write.
    pub fn written_layers(&self) -> usize {
        self.voxels.iter().filter(|l| l.is_some()).count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.written_layers() == 0
    }

    /// Every written voxel as `(x, y, z, voxel)` in y, z, x order.
    pub fn iter_voxels(&self) -> impl Iterator<Item = (usize, i32, usize, VoxelState)> + '_ {
        let min_y = self.bot.y;
        self.voxels.iter().enumerate().flat_map(move |(yi, layer)| {
            layer.iter().flat_map(move |rows| {
                rows.iter().enumerate().flat_map(move |(z, row)| {
                    row.iter().flat_map(move |cells| {
                        cells.iter().enumerate().filter_map(move |(x, cell)| {
                            (*cell).map(|v| (x, min_y + yi as i32, z, v))
                        })
                    })
                })
            })
        })
    }

    /// Repack a chunk-sized buffer into 16-high sections for upload.
    pub fn to_sections(&self) -> ChunkSections {
        assert!(
            self.width == CHUNK_EDGE && self.length == CHUNK_EDGE,
            "section export needs a {CHUNK_EDGE}x{CHUNK_EDGE} buffer, got {}x{}",
            self.width,
            self.length
        );
        let min_section = section_layer(self.bot.y);
        let max_section = section_layer(self.top.y);
        let count = (max_section - min_section + 1) as usize;
        let mut sections: Vec<Option<Box<[Option<VoxelState>]>>> = vec![None; count];
        for (x, y, z, voxel) in self.iter_voxels() {
            let si = (section_layer(y) - min_section) as usize;
            let section =
                sections[si].get_or_insert_with(|| vec![None; SECTION_VOLUME].into_boxed_slice());
            section[pack(x as i32, y, z as i32) as usize] = Some(voxel);
        }
        ChunkSections {
            min_section,
            sections,
        }
    }
}

fn empty_layers<T>(height: usize) -> Vec<Option<Layer<T>>> {
    let mut v = Vec::with_capacity(height);
    v.resize_with(height, || None);
    v
}

#[inline]
fn store<T: Copy>(
    layers: &mut [Option<Layer<T>>],
    yi: usize,
    x: usize,
    z: usize,
    width: usize,
    length: usize,
    value: T,
) {
    let layer = layers[yi].get_or_insert_with(|| {
        let mut rows = Vec::with_capacity(length);
        rows.resize_with(length, || None);
        rows.into_boxed_slice()
    });
    let row = layer[z].get_or_insert_with(|| vec![None; width].into_boxed_slice());
    row[x] = Some(value);
}

#[inline]
fn load<T: Copy>(layers: &[Option<Layer<T>>], yi: usize, x: usize, z: usize) -> Option<T> {
    let layer = layers.get(yi)?.as_ref()?;
    let row = layer.get(z)?.as_ref()?;
    row.get(x).copied().flatten()
}

/// Chunk content in 16x16x16 sections, the shape the host uploads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkSections {
    pub min_section: i32,
    pub sections: Vec<Option<Box<[Option<VoxelState>]>>>,
}

impl ChunkSections {
    pub fn get(&self, x: i32, y: i32, z: i32) -> Option<VoxelState> {
        let si = section_layer(y) - self.min_section;
        if si < 0 {
            return None;
        }
        let section = self.sections.get(si as usize)?.as_ref()?;
        section[pack(x, y, z) as usize]
    }

    /// Number of sections holding at least one voxel.
    pub fn populated(&self) -> usize {
        self.sections.iter().filter(|s| s.is_some()).count()
    }

    pub fn edge(&self) -> usize {
        SECTION_EDGE
    }
}
