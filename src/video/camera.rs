use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, info};

use crate::error::{CameraError, Result};
use crate::video::types::Frame;

/// Anything that can hand out the current camera frame
///
/// The booth only asks for "the frame right now"; stream negotiation is the
/// source's business.
pub trait FrameSource: Send + Sync {
    /// Human-readable name for logs
    fn name(&self) -> &str;

    /// Grab the latest frame
    fn grab(&self) -> Result<Frame>;
}

/// A camera that keeps showing the same frame
pub struct StillFrameSource {
    frame: Frame,
}

impl StillFrameSource {
    pub fn new(frame: Frame) -> Self {
        Self { frame }
    }
}

impl FrameSource for StillFrameSource {
    fn name(&self) -> &str {
        "still"
    }

    fn grab(&self) -> Result<Frame> {
        Ok(self.frame.clone())
    }
}

/// A camera fed from pre-recorded image files
///
/// Each `grab` returns the next file's frame, wrapping around at the end.
pub struct ImageSequenceSource {
    frames: Vec<Frame>,
    cursor: AtomicUsize,
}

impl ImageSequenceSource {
    /// Build a source from frames already in memory
    pub fn from_frames(frames: Vec<Frame>) -> Result<Self> {
        if frames.is_empty() {
            return Err(CameraError::Unavailable {
                reason: "no frames were provided".to_string(),
            }
            .into());
        }
        Ok(Self { frames, cursor: AtomicUsize::new(0) })
    }

    /// Decode every image file into a frame
    pub async fn open<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut frames = Vec::with_capacity(paths.len());

        for path in paths {
            let path = path.as_ref();
            debug!("Loading camera frame from {:?}", path);
            frames.push(Self::load_frame(path).await?);
        }

        info!("Camera ready with {} pre-recorded frames", frames.len());
        Self::from_frames(frames)
    }

    async fn load_frame(path: &Path) -> Result<Frame> {
        let unavailable = |reason: String| CameraError::Unavailable {
            reason: format!("{}: {}", path.display(), reason),
        };

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let image = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await
            .map_err(|e| unavailable(e.to_string()))?
            .map_err(|e| unavailable(e.to_string()))?;

        Ok(Frame::new(image.to_rgba8()))
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    fn name(&self) -> &str {
        "image-sequence"
    }

    fn grab(&self) -> Result<Frame> {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.frames.len();
        Ok(self.frames[index].clone())
    }
}
