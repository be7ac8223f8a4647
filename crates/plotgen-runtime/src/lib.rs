//! Chunk generation entry points and the background job queue.
#![forbid(unsafe_code)]

mod hooks;
mod queue;

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use plotgen_chunk::RegionWriteBuffer;
use plotgen_world::{HostWorld, HybridGen, PlotArea, PlotAreaManager, PlotGenerator};
use rayon::ThreadPool;
use rayon::prelude::*;

pub use hooks::{ChunkHooks, NoopHooks};
pub use queue::{ChunkJob, ChunkJobOut, Runtime};

/// Result of one `generate_chunk` call.
#[derive(Debug)]
pub enum ChunkOutcome {
    /// No plot area owns the chunk; nothing was built.
    Unmanaged,
    /// `pre_process` stopped the chunk after touching the buffer.
    Skipped(RegionWriteBuffer),
    Generated(RegionWriteBuffer),
}

impl ChunkOutcome {
    pub fn buffer(&self) -> Option<&RegionWriteBuffer> {
        match self {
            ChunkOutcome::Unmanaged => None,
            ChunkOutcome::Skipped(buf) | ChunkOutcome::Generated(buf) => Some(buf),
        }
    }

    pub fn into_buffer(self) -> Option<RegionWriteBuffer> {
        match self {
            ChunkOutcome::Unmanaged => None,
            ChunkOutcome::Skipped(buf) | ChunkOutcome::Generated(buf) => Some(buf),
        }
    }

    #[inline]
    pub fn is_unmanaged(&self) -> bool {
        matches!(self, ChunkOutcome::Unmanaged)
    }
}

/// Drives the plot generator for host chunk requests.
#[derive(Clone)]
pub struct ChunkGenerator {
    areas: Arc<PlotAreaManager>,
    generator: Arc<dyn PlotGenerator>,
    hooks: Arc<dyn ChunkHooks>,
    track_biomes: bool,
}

impl ChunkGenerator {
    pub fn new(areas: Arc<PlotAreaManager>) -> Self {
        Self {
            areas,
            generator: Arc::new(HybridGen),
            hooks: Arc::new(NoopHooks),
            track_biomes: true,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn PlotGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ChunkHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_biomes(mut self, track: bool) -> Self {
        self.track_biomes = track;
        self
    }

    pub fn areas(&self) -> &PlotAreaManager {
        &self.areas
    }

    fn area_for(&self, world: &dyn HostWorld, cx: i32, cz: i32) -> Option<Arc<PlotArea>> {
        self.areas.area_for_chunk(world.name(), cx, cz)
    }

    pub fn generate_chunk(&self, world: &dyn HostWorld, cx: i32, cz: i32) -> ChunkOutcome {
        let Some(area) = self.area_for(world, cx, cz) else {
            return ChunkOutcome::Unmanaged;
        };
        let mut buf = RegionWriteBuffer::for_chunk(
            cx,
            cz,
            world.min_height(),
            world.max_height(),
            self.track_biomes,
        );
        if self.hooks.pre_process(cx, cz, &mut buf) {
            return ChunkOutcome::Skipped(buf);
        }
        let generator = &self.generator;
        let result = catch_unwind(AssertUnwindSafe(|| generator.generate_chunk(&area, &mut buf)));
        if let Err(payload) = result {
            log::error!(
                "{}: generator failed on chunk ({cx}, {cz}), keeping partial output: {}",
                area.label(),
                panic_message(payload.as_ref())
            );
        }
        self.hooks.post_process(cx, cz, &mut buf);
        ChunkOutcome::Generated(buf)
    }

    /// Entity-bearing overlay content for a generated chunk, if there is any.
    pub fn populate_chunk(
        &self,
        world: &dyn HostWorld,
        cx: i32,
        cz: i32,
    ) -> Option<RegionWriteBuffer> {
        let area = self.area_for(world, cx, cz)?;
        let mut buf =
            RegionWriteBuffer::for_chunk(cx, cz, world.min_height(), world.max_height(), false);
        let generator = &self.generator;
        let wrote = catch_unwind(AssertUnwindSafe(|| generator.populate_chunk(&area, &mut buf)))
            .unwrap_or_else(|payload| {
                log::error!(
                    "{}: populate failed on chunk ({cx}, {cz}): {}",
                    area.label(),
                    panic_message(payload.as_ref())
                );
                !buf.is_empty()
            });
        wrote.then_some(buf)
    }

    /// Generate `chunks` on `pool`; results keep the input order.
    pub fn generate_many(
        &self,
        world: &dyn HostWorld,
        chunks: &[(i32, i32)],
        pool: &ThreadPool,
    ) -> Vec<((i32, i32), ChunkOutcome)> {
        pool.install(|| {
            chunks
                .par_iter()
                .map(|&(cx, cz)| ((cx, cz), self.generate_chunk(world, cx, cz)))
                .collect()
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_are_readable() {
        let p = catch_unwind(|| panic!("boom {}", 7)).unwrap_err();
        assert_eq!(panic_message(p.as_ref()), "boom 7");
        let p = catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(p.as_ref()), "static");
        let p = catch_unwind(|| std::panic::panic_any(3u8)).unwrap_err();
        assert_eq!(panic_message(p.as_ref()), "non-string panic payload");
    }
}
