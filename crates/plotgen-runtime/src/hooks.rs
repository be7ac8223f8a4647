use plotgen_chunk::RegionWriteBuffer;

/// Region-management callbacks around each generated chunk.
pub trait ChunkHooks: Send + Sync {
    /// Return `true` to stop before the generator runs.
    fn pre_process(&self, cx: i32, cz: i32, buf: &mut RegionWriteBuffer) -> bool {
        let _ = (cx, cz, buf);
        false
    }

    fn post_process(&self, cx: i32, cz: i32, buf: &mut RegionWriteBuffer) {
        let _ = (cx, cz, buf);
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct NoopHooks;

impl ChunkHooks for NoopHooks {}
