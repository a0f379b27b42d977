use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::assets::BackgroundCatalog;
use crate::composition::compositor::{CompositeRequest, FrameCompositor};
use crate::error::{CaptureError, Result, SegmentationError};
use crate::filters::{FilterCatalog, SliderValues, IDENTITY_FILTER};
use crate::segmentation::SegmentationAdapter;
use crate::video::camera::FrameSource;
use crate::video::types::{Frame, Mask, Photo};

/// Photos in one strip
pub const PHOTOS_PER_STRIP: usize = 3;

/// The controls as they stand at the moment of capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub filter: String,
    pub sliders: SliderValues,
    pub remove_background: bool,
    /// Name in the capture background catalog
    pub background: Option<String>,
    pub background_visible: bool,
    /// 0.0-1.0
    pub background_opacity: f32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            filter: IDENTITY_FILTER.to_string(),
            sliders: SliderValues::default(),
            remove_background: false,
            background: None,
            background_visible: false,
            background_opacity: 1.0,
        }
    }
}

impl CaptureSettings {
    /// Switch preset; manual sliders go back to their defaults
    pub fn select_filter<S: Into<String>>(&mut self, name: S) {
        self.filter = name.into();
        self.sliders = SliderValues::default();
    }
}

/// Snapshot of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    pub photos_taken: usize,
    pub is_full: bool,
    /// Set only on the capture that filled the session
    pub ready_to_finalize: bool,
}

impl SessionState {
    /// "2 / 3" style progress label for the next shot
    pub fn progress_label(&self) -> String {
        let next = (self.photos_taken + 1).min(PHOTOS_PER_STRIP);
        format!("{} / {}", next, PHOTOS_PER_STRIP)
    }
}

#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    pub photo: Photo,
    pub state: SessionState,
}

#[derive(Debug, Default)]
struct SessionInner {
    photos: Vec<Photo>,
    in_flight: bool,
}

/// Clears the in-flight flag however the capture ends
struct InFlightGuard<'a> {
    inner: &'a Mutex<SessionInner>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).in_flight = false;
    }
}

/// Takes up to three photos, one capture at a time
///
/// A failed capture leaves the session exactly as it was.
pub struct CaptureSession {
    camera: Arc<dyn FrameSource>,
    segmentation: Option<Arc<SegmentationAdapter>>,
    backgrounds: Arc<BackgroundCatalog>,
    filters: FilterCatalog,
    compositor: FrameCompositor,
    segmentation_timeout: Option<Duration>,
    inner: Mutex<SessionInner>,
}

impl CaptureSession {
    pub fn new(camera: Arc<dyn FrameSource>) -> Self {
        Self {
            camera,
            segmentation: None,
            backgrounds: Arc::new(BackgroundCatalog::new()),
            filters: FilterCatalog::builtin().clone(),
            compositor: FrameCompositor::new(),
            segmentation_timeout: None,
            inner: Mutex::new(SessionInner::default()),
        }
    }

    pub fn with_segmentation(mut self, adapter: Arc<SegmentationAdapter>) -> Self {
        self.segmentation = Some(adapter);
        self
    }

    pub fn with_backgrounds(mut self, backgrounds: Arc<BackgroundCatalog>) -> Self {
        self.backgrounds = backgrounds;
        self
    }

    pub fn with_filters(mut self, filters: FilterCatalog) -> Self {
        self.filters = filters;
        self
    }

    /// Give up on segmentation after `timeout`; `None` waits forever
    pub fn with_segmentation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.segmentation_timeout = timeout;
        self
    }

    pub fn filters(&self) -> &FilterCatalog {
        &self.filters
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> Result<InFlightGuard<'_>> {
        let mut inner = self.lock();
        if inner.in_flight {
            return Err(CaptureError::CaptureInProgress.into());
        }
        if inner.photos.len() >= PHOTOS_PER_STRIP {
            return Err(CaptureError::SessionFull { capacity: PHOTOS_PER_STRIP }.into());
        }
        inner.in_flight = true;
        Ok(InFlightGuard { inner: &self.inner })
    }

    /// Take one photo with the given settings
    pub async fn capture(&self, settings: &CaptureSettings) -> Result<CaptureOutcome> {
        let _in_flight = self.begin()?;

        let frame = self.camera.grab()?;
        let filter = self.filters.resolve(&settings.filter);
        let sliders = settings.sliders.clamped();
        debug!(
            "Capturing {}x{} frame from '{}' with filter '{}'",
            frame.width(),
            frame.height(),
            self.camera.name(),
            filter.name
        );

        let mask = if settings.remove_background {
            Some(self.segment(&frame).await?)
        } else {
            None
        };

        let background = if settings.remove_background && settings.background_visible {
            self.lookup_background(settings.background.as_deref())
        } else {
            None
        };

        let request = CompositeRequest::new(&frame, &filter, sliders)
            .with_mask(mask.as_ref())
            .with_background(background.as_deref(), settings.background_opacity);
        let photo = self.compositor.compose(&request)?;

        let state = {
            let mut inner = self.lock();
            inner.photos.push(photo.clone());
            let photos_taken = inner.photos.len();
            SessionState {
                photos_taken,
                is_full: photos_taken >= PHOTOS_PER_STRIP,
                ready_to_finalize: photos_taken == PHOTOS_PER_STRIP,
            }
        };

        info!("📸 Photo {}/{} captured", state.photos_taken, PHOTOS_PER_STRIP);
        if state.ready_to_finalize {
            info!("Session complete, ready to finalize the strip");
        }

        Ok(CaptureOutcome { photo, state })
    }

    async fn segment(&self, frame: &Frame) -> Result<Mask> {
        let adapter = self
            .segmentation
            .as_ref()
            .ok_or(SegmentationError::NotInitialized)?;

        let segmentation = match self.segmentation_timeout {
            Some(limit) => tokio::time::timeout(limit, adapter.segment(frame))
                .await
                .map_err(|_| SegmentationError::TimedOut { after_ms: limit.as_millis() as u64 })??,
            None => adapter.segment(frame).await?,
        };

        Ok(segmentation.mask)
    }

    fn lookup_background(&self, name: Option<&str>) -> Option<Arc<image::RgbaImage>> {
        let name = name?;
        let image = self.backgrounds.get(name);
        if image.is_none() {
            warn!("Background '{}' is not loaded, capturing without it", name);
        }
        image
    }

    /// Drop every photo and start over
    ///
    /// Rejected while a capture is running, so that capture cannot land in the
    /// fresh session.
    pub fn reset(&self) -> Result<()> {
        let mut inner = self.lock();
        if inner.in_flight {
            return Err(CaptureError::CaptureInProgress.into());
        }
        inner.photos.clear();
        info!("Session reset");
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        let inner = self.lock();
        SessionState {
            photos_taken: inner.photos.len(),
            is_full: inner.photos.len() >= PHOTOS_PER_STRIP,
            ready_to_finalize: false,
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.lock().in_flight
    }

    /// Photos in capture order
    pub fn photos(&self) -> Vec<Photo> {
        self.lock().photos.clone()
    }
}
