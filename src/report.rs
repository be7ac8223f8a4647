use hashbrown::HashMap;
use plotgen_blocks::{BlockId, BlockRegistry};
use plotgen_chunk::RegionWriteBuffer;

/// Running totals over a batch of generated chunks.
#[derive(Default)]
pub struct GenStats {
    pub chunks: usize,
    pub unmanaged: usize,
    pub skipped: usize,
    pub populated: usize,
    pub voxels: usize,
    pub entity_voxels: usize,
    pub layers: usize,
    pub sections: usize,
    pub t_gen_ms: u64,
    pub t_total_ms: u64,
    counts: HashMap<BlockId, usize>,
}

impl GenStats {
    pub fn add_buffer(&mut self, buf: &RegionWriteBuffer) {
        self.layers += buf.written_layers();
        self.sections += buf.to_sections().populated();
        for (_, _, _, v) in buf.iter_voxels() {
            self.voxels += 1;
            *self.counts.entry(v.block.id).or_insert(0) += 1;
        }
    }

    pub fn add_populated(&mut self, buf: &RegionWriteBuffer) {
        self.populated += 1;
        self.entity_voxels += buf.iter_voxels().count();
    }

    pub fn print(&self, reg: &BlockRegistry) {
        println!(
            "chunks: {} generated, {} unmanaged, {} skipped, {} with entity data",
            self.chunks, self.unmanaged, self.skipped, self.populated
        );
        println!(
            "voxels: {} in {} layers / {} sections, {} entity voxels",
            self.voxels, self.layers, self.sections, self.entity_voxels
        );
        if self.chunks > 0 {
            println!(
                "time: {} ms generating, {} ms total ({:.2} ms/chunk)",
                self.t_gen_ms,
                self.t_total_ms,
                self.t_total_ms as f64 / self.chunks as f64
            );
        }
        let mut counts: Vec<_> = self.counts.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        for (id, n) in counts {
            let name = reg.get(*id).map(|t| t.name.as_str()).unwrap_or("?");
            println!("  {name:<20} {n}");
        }
    }
}
