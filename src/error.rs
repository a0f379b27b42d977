use thiserror::Error;

/// Main error type for the photo booth library
#[derive(Error, Debug)]
pub enum BoothError {
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Segmentation error: {0}")]
    Segmentation(#[from] SegmentationError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Camera-specific errors
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Camera unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Background segmentation errors
#[derive(Error, Debug)]
pub enum SegmentationError {
    #[error("Background segmentation used before initialization")]
    NotInitialized,

    #[error("Segmentation engine failed: {reason}")]
    EngineFailed { reason: String },

    #[error("Segmentation timed out after {after_ms} ms")]
    TimedOut { after_ms: u64 },
}

/// Capture sequencing errors
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Session already holds {capacity} photos")]
    SessionFull { capacity: usize },

    #[error("Another capture is still in progress")]
    CaptureInProgress,
}

/// Image asset errors
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Failed to load asset '{name}': {reason}")]
    LoadFailed { name: String, reason: String },
}

/// Strip export errors
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Strip needs {expected} photos, got {actual}")]
    IncompleteStrip { expected: usize, actual: usize },

    #[error("Image encoding failed: {reason}")]
    EncodingFailed { reason: String },

    #[error("Caption rendering failed: {reason}")]
    CaptionFailed { reason: String },

    #[error("Strip layout is too large: {reason}")]
    LayoutTooLarge { reason: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using BoothError
pub type Result<T> = std::result::Result<T, BoothError>;

impl BoothError {
    /// Check if the action that produced this error can simply be re-attempted
    pub fn is_recoverable(&self) -> bool {
        // A broken config file needs a human to fix it
        !matches!(self, Self::Config(_))
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Camera(CameraError::Unavailable { .. }) => {
                "No camera stream is available. Capturing is disabled until a camera is granted.".to_string()
            }
            Self::Capture(CaptureError::SessionFull { capacity }) => {
                format!("All {} photos are taken. Retake to start a new strip.", capacity)
            }
            Self::Capture(CaptureError::CaptureInProgress) => {
                "Hold still, the previous photo is still being taken.".to_string()
            }
            Self::Segmentation(SegmentationError::NotInitialized) => {
                "Background removal is still starting up. Please try again.".to_string()
            }
            Self::Asset(AssetError::LoadFailed { name, .. }) => {
                format!("Background '{}' could not be loaded and was skipped.", name)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_errors_are_recoverable() {
        let full: BoothError = CaptureError::SessionFull { capacity: 3 }.into();
        assert!(full.is_recoverable());
        assert!(full.user_message().contains('3'));

        let busy: BoothError = CaptureError::CaptureInProgress.into();
        assert!(busy.is_recoverable());
    }

    #[test]
    fn test_config_errors_are_not_recoverable() {
        let err: BoothError = ConfigError::ParseFailed { path: "booth.toml".to_string() }.into();
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_display_includes_inner_error() {
        let err: BoothError = SegmentationError::TimedOut { after_ms: 250 }.into();
        assert_eq!(err.to_string(), "Segmentation error: Segmentation timed out after 250 ms");
    }
}
