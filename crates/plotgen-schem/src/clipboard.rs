use plotgen_blocks::{BiomeTag, VoxelState};

/// Decoded fragment: a dense box of voxels plus one optional biome per column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Clipboard {
    sx: usize,
    sy: usize,
    sz: usize,
    voxels: Vec<VoxelState>,
    biomes: Vec<Option<BiomeTag>>,
}

impl Clipboard {
    /// All-air clipboard of `sx * sy * sz` cells.
    pub fn new(sx: usize, sy: usize, sz: usize) -> Self {
        Self {
            sx,
            sy,
            sz,
            voxels: vec![VoxelState::AIR; sx * sy * sz],
            biomes: vec![None; sx * sz],
        }
    }

    /// `(width, height, length)`, i.e. x, y, z extents.
    #[inline]
    pub fn dimensions(&self) -> (usize, usize, usize) {
        (self.sx, self.sy, self.sz)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.sx
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.sy
    }

    #[inline]
    pub fn length(&self) -> usize {
        self.sz
    }

    #[inline]
    fn idx(&self, x: usize, y: usize, z: usize) -> usize {
        (y * self.sz + z) * self.sx + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> VoxelState {
        self.voxels[self.idx(x, y, z)]
    }

    pub fn set(&mut self, x: usize, y: usize, z: usize, voxel: VoxelState) {
        let i = self.idx(x, y, z);
        self.voxels[i] = voxel;
    }

    #[inline]
    pub fn biome(&self, x: usize, z: usize) -> Option<BiomeTag> {
        self.biomes[z * self.sx + x]
    }

    pub fn set_biome(&mut self, x: usize, z: usize, biome: Option<BiomeTag>) {
        let i = z * self.sx + x;
        self.biomes[i] = biome;
    }

    pub fn non_air_count(&self) -> usize {
        self.voxels.iter().filter(|v| !v.is_air()).count()
    }
}
