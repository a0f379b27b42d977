//! # Background Assets
//!
//! Decorative images used behind the subject during capture and behind the
//! finished strip. A [`BackgroundCatalog`] is populated once at startup and is
//! never invalidated afterwards; assets that fail to decode are logged and
//! left out so the booth keeps working without them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{AssetError, Result};

/// A named background image on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundAsset {
    pub name: String,
    pub path: PathBuf,
}

impl BackgroundAsset {
    pub fn new<S: Into<String>, P: Into<PathBuf>>(name: S, path: P) -> Self {
        Self { name: name.into(), path: path.into() }
    }
}

/// Load-once cache of decoded background images, keyed by name
#[derive(Debug, Clone, Default)]
pub struct BackgroundCatalog {
    images: HashMap<String, Arc<RgbaImage>>,
    order: Vec<String>,
}

impl BackgroundCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode every asset; failures are skipped with a warning
    pub async fn load(assets: &[BackgroundAsset]) -> Self {
        let mut catalog = Self::new();

        for asset in assets {
            match load_image_file(&asset.name, &asset.path).await {
                Ok(image) => {
                    debug!("Cached background '{}' ({}x{})", asset.name, image.width(), image.height());
                    catalog.insert(asset.name.clone(), image);
                }
                Err(e) => warn!("Skipping background '{}': {}", asset.name, e),
            }
        }

        info!("Background catalog ready: {}/{} assets", catalog.len(), assets.len());
        catalog
    }

    /// Add an already decoded image while building the catalog
    pub fn with_image<S: Into<String>>(mut self, name: S, image: RgbaImage) -> Self {
        self.insert(name.into(), Arc::new(image));
        self
    }

    fn insert(&mut self, name: String, image: Arc<RgbaImage>) {
        if self.images.insert(name.clone(), image).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<RgbaImage>> {
        self.images.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.images.contains_key(name)
    }

    /// Cached names in load order
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Read and decode an image file
pub async fn load_image_file(name: &str, path: &Path) -> Result<Arc<RgbaImage>> {
    let bytes = tokio::fs::read(path).await.map_err(|e| AssetError::LoadFailed {
        name: name.to_string(),
        reason: format!("{}: {}", path.display(), e),
    })?;

    let owned_name = name.to_string();
    tokio::task::spawn_blocking(move || decode_image_bytes(&owned_name, &bytes))
        .await
        .map_err(|e| AssetError::LoadFailed { name: name.to_string(), reason: e.to_string() })?
}

/// Decode an in-memory image, e.g. one picked by the user
pub fn decode_image_bytes(name: &str, bytes: &[u8]) -> Result<Arc<RgbaImage>> {
    let image = image::load_from_memory(bytes).map_err(|e| AssetError::LoadFailed {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    Ok(Arc::new(image.to_rgba8()))
}
