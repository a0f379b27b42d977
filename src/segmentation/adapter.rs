use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

use crate::error::{BoothError, Result, SegmentationError};
use crate::segmentation::engine::SegmentationEngine;
use crate::video::types::{Frame, Mask};

/// One segmentation result: the mask plus the size of the frame it belongs to
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub mask: Mask,
    pub frame_width: u32,
    pub frame_height: u32,
}

/// Async front for a blocking [`SegmentationEngine`]
///
/// The engine has a single in-flight request slot. Concurrent `segment` calls
/// queue on it in arrival order and each gets its own result; the slot stays
/// taken until the engine returns, even if the caller stopped waiting.
pub struct SegmentationAdapter {
    engine: Arc<dyn SegmentationEngine>,
    ready: OnceCell<()>,
    slot: Arc<Mutex<()>>,
}

impl SegmentationAdapter {
    pub fn new(engine: Arc<dyn SegmentationEngine>) -> Self {
        Self {
            engine,
            ready: OnceCell::new(),
            slot: Arc::new(Mutex::new(())),
        }
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Load the engine. Safe to call repeatedly; only the first call does work.
    pub async fn initialize(&self) -> Result<()> {
        self.ready
            .get_or_try_init(|| async {
                info!("Initializing segmentation engine '{}'", self.engine.name());
                let engine = Arc::clone(&self.engine);
                tokio::task::spawn_blocking(move || engine.load())
                    .await
                    .map_err(|e| BoothError::from(SegmentationError::EngineFailed { reason: e.to_string() }))?
            })
            .await?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.ready.initialized()
    }

    /// Segment one frame
    ///
    /// Fails with [`SegmentationError::NotInitialized`] until
    /// [`initialize`](Self::initialize) has completed.
    pub async fn segment(&self, frame: &Frame) -> Result<Segmentation> {
        if !self.is_initialized() {
            return Err(SegmentationError::NotInitialized.into());
        }

        let slot = Arc::clone(&self.slot).lock_owned().await;
        let (frame_width, frame_height) = frame.dimensions();
        debug!("Segmenting {}x{} frame with '{}'", frame_width, frame_height, self.engine.name());

        let engine = Arc::clone(&self.engine);
        let owned = frame.clone();
        let mask = tokio::task::spawn_blocking(move || {
            let _slot = slot;
            engine.segment(&owned)
        })
        .await
        .map_err(|e| SegmentationError::EngineFailed { reason: e.to_string() })??;

        Ok(Segmentation { mask, frame_width, frame_height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Engine that records how many calls overlap
    #[derive(Default)]
    struct CountingEngine {
        loads: AtomicUsize,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl SegmentationEngine for CountingEngine {
        fn name(&self) -> &str {
            "counting"
        }

        fn load(&self) -> Result<()> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn segment(&self, frame: &Frame) -> Result<Mask> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(Mask::opaque(frame.width(), frame.height()))
        }
    }

    #[tokio::test]
    async fn test_segment_before_initialize_fails() {
        let adapter = SegmentationAdapter::new(Arc::new(CountingEngine::default()));
        let frame = Frame::new_filled(2, 2, [0, 0, 0, 255]);

        let result = adapter.segment(&frame).await;
        assert!(matches!(
            result,
            Err(BoothError::Segmentation(SegmentationError::NotInitialized))
        ));
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let engine = Arc::new(CountingEngine::default());
        let adapter = SegmentationAdapter::new(engine.clone());

        adapter.initialize().await.unwrap();
        adapter.initialize().await.unwrap();

        assert!(adapter.is_initialized());
        assert_eq!(engine.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_requests_are_serialized() {
        let engine = Arc::new(CountingEngine::default());
        let adapter = SegmentationAdapter::new(engine.clone());
        adapter.initialize().await.unwrap();

        let small = Frame::new_filled(2, 3, [0, 0, 0, 255]);
        let large = Frame::new_filled(5, 4, [0, 0, 0, 255]);
        let (a, b) = tokio::join!(adapter.segment(&small), adapter.segment(&large));

        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.mask.dimensions(), (2, 3));
        assert_eq!((b.frame_width, b.frame_height), (5, 4));
        assert_eq!(engine.max_active.load(Ordering::SeqCst), 1);
    }
}
