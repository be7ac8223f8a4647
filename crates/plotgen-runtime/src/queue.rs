use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, unbounded};
use plotgen_chunk::RegionWriteBuffer;
use plotgen_world::HostWorld;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

use crate::{ChunkGenerator, ChunkOutcome};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkJob {
    pub cx: i32,
    pub cz: i32,
    pub job_id: u64,
    /// Also run the populate pass once the chunk is generated.
    pub populate: bool,
}

pub struct ChunkJobOut {
    pub cx: i32,
    pub cz: i32,
    pub job_id: u64,
    pub outcome: ChunkOutcome,
    pub populated: Option<RegionWriteBuffer>,
    pub t_gen_ms: u32,
    pub t_total_ms: u32,
}

/// Background chunk generation on a worker pool; results are drained by the host.
pub struct Runtime {
    job_tx: Option<Sender<ChunkJob>>,
    res_rx: Receiver<ChunkJobOut>,
    queued: Arc<AtomicUsize>,
    inflight: Arc<AtomicUsize>,
    _pool: Arc<ThreadPool>,
}

fn process_job(
    job: ChunkJob,
    generator: &ChunkGenerator,
    world: &dyn HostWorld,
    tx: &Sender<ChunkJobOut>,
) {
    let t0 = Instant::now();
    let outcome = generator.generate_chunk(world, job.cx, job.cz);
    let t_gen_ms = t0.elapsed().as_millis() as u32;
    let populated = if job.populate && !outcome.is_unmanaged() {
        generator.populate_chunk(world, job.cx, job.cz)
    } else {
        None
    };
    let _ = tx.send(ChunkJobOut {
        cx: job.cx,
        cz: job.cz,
        job_id: job.job_id,
        outcome,
        populated,
        t_gen_ms,
        t_total_ms: t0.elapsed().as_millis() as u32,
    });
}

impl Runtime {
    pub fn new(
        generator: Arc<ChunkGenerator>,
        world: Arc<dyn HostWorld>,
        workers: usize,
    ) -> Result<Self, ThreadPoolBuildError> {
        let workers = workers.max(1);
        let (job_tx, job_rx) = unbounded::<ChunkJob>();
        let (res_tx, res_rx) = unbounded::<ChunkJobOut>();
        let queued = Arc::new(AtomicUsize::new(0));
        let inflight = Arc::new(AtomicUsize::new(0));
        let pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("plotgen-gen-{i}"))
                .build()?,
        );
        for _ in 0..workers {
            let rx = job_rx.clone();
            let tx = res_tx.clone();
            let generator = Arc::clone(&generator);
            let world = Arc::clone(&world);
            let queued = Arc::clone(&queued);
            let inflight = Arc::clone(&inflight);
            pool.spawn(move || {
                while let Ok(job) = rx.recv() {
                    queued.fetch_sub(1, Ordering::Relaxed);
                    inflight.fetch_add(1, Ordering::Relaxed);
                    process_job(job, &generator, world.as_ref(), &tx);
                    inflight.fetch_sub(1, Ordering::Relaxed);
                }
            });
        }
        log::info!("chunk runtime started with {workers} worker(s)");
        Ok(Self {
            job_tx: Some(job_tx),
            res_rx,
            queued,
            inflight,
            _pool: pool,
        })
    }

    pub fn submit(&self, job: ChunkJob) {
        let Some(tx) = &self.job_tx else {
            return;
        };
        self.queued.fetch_add(1, Ordering::Relaxed);
        if tx.send(job).is_err() {
            self.queued.fetch_sub(1, Ordering::Relaxed);
            log::warn!("chunk job {} dropped: workers gone", job.job_id);
        }
    }

    pub fn drain_results(&self) -> Vec<ChunkJobOut> {
        self.res_rx.try_iter().collect()
    }

    /// Block until the next result arrives.
    pub fn recv_result(&self) -> Option<ChunkJobOut> {
        self.res_rx.recv().ok()
    }

    /// `(queued, inflight)`
    pub fn queue_debug_counts(&self) -> (usize, usize) {
        (
            self.queued.load(Ordering::Relaxed),
            self.inflight.load(Ordering::Relaxed),
        )
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        // closing the job channel lets the workers return to the pool
        self.job_tx.take();
    }
}
