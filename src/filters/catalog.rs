use std::sync::OnceLock;

use tracing::warn;

use crate::filters::adjust::{Adjustment, FilterSpec};

/// Name of the preset every unknown name falls back to
pub const IDENTITY_FILTER: &str = "normal";

/// Registry of named filter presets
///
/// Presets are kept in registration order so they can be listed the way the
/// booth shows them. The built-in catalog is process-wide and read-only, see
/// [`FilterCatalog::builtin`].
#[derive(Debug, Clone)]
pub struct FilterCatalog {
    filters: Vec<FilterSpec>,
}

impl FilterCatalog {
    /// Create a catalog holding every built-in preset
    pub fn new() -> Self {
        let mut catalog = Self { filters: Vec::new() };
        catalog.register_builtin_filters();
        catalog
    }

    /// The shared built-in catalog
    pub fn builtin() -> &'static FilterCatalog {
        static CATALOG: OnceLock<FilterCatalog> = OnceLock::new();
        CATALOG.get_or_init(FilterCatalog::new)
    }

    fn register_builtin_filters(&mut self) {
        use Adjustment::*;

        self.register(FilterSpec::identity());
        self.register(FilterSpec::new("bw", vec![Grayscale(1.0)]));
        self.register(FilterSpec::new("warm", vec![Sepia(0.4), Saturate(1.2)]));
        self.register(FilterSpec::new(
            "vintage",
            vec![Sepia(0.6), Contrast(1.2), Brightness(0.9)],
        ));
        self.register(FilterSpec::new("cool", vec![HueRotate(180.0), Saturate(1.1)]));
        self.register(FilterSpec::new("bright", vec![Brightness(1.2)]));
        self.register(FilterSpec::new("retro", vec![Contrast(1.2), Sepia(0.2)]));
        self.register(FilterSpec::new("neon", vec![Contrast(1.5), Saturate(2.0)]));
        self.register(FilterSpec::new("blur", vec![Blur(2.0)]));
    }

    /// Register a preset, replacing any existing preset with the same name
    pub fn register(&mut self, spec: FilterSpec) {
        match self.filters.iter_mut().find(|f| f.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.filters.push(spec),
        }
    }

    /// Look up a preset by name
    pub fn get(&self, name: &str) -> Option<&FilterSpec> {
        self.filters.iter().find(|f| f.name == name)
    }

    /// Resolve a preset, falling back to the identity preset for unknown names
    pub fn resolve(&self, name: &str) -> FilterSpec {
        match self.get(name) {
            Some(spec) => spec.clone(),
            None => {
                warn!("Unknown filter '{}', falling back to '{}'", name, IDENTITY_FILTER);
                self.get(IDENTITY_FILTER)
                    .cloned()
                    .unwrap_or_else(FilterSpec::identity)
            }
        }
    }

    /// Preset names in display order
    pub fn available_filters(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn has_filter(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl Default for FilterCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_filters_available() {
        let catalog = FilterCatalog::builtin();

        for name in ["normal", "bw", "warm", "vintage", "cool", "bright", "retro", "neon", "blur"] {
            assert!(catalog.has_filter(name), "missing {}", name);
        }
        assert_eq!(catalog.len(), 9);
        assert_eq!(catalog.available_filters()[0], "normal");
    }

    #[test]
    fn test_resolve_unknown_falls_back_to_identity() {
        let spec = FilterCatalog::builtin().resolve("sparkles");
        assert_eq!(spec.name, IDENTITY_FILTER);
        assert!(spec.adjustments.is_empty());
    }

    #[test]
    fn test_vintage_order_is_preserved() {
        let spec = FilterCatalog::builtin().resolve("vintage");
        assert_eq!(
            spec.adjustments,
            vec![Adjustment::Sepia(0.6), Adjustment::Contrast(1.2), Adjustment::Brightness(0.9)]
        );
    }

    #[test]
    fn test_custom_filter_registration() {
        let mut catalog = FilterCatalog::new();
        catalog.register(FilterSpec::new("noir", vec![Adjustment::Grayscale(1.0), Adjustment::Contrast(1.4)]));

        assert!(catalog.has_filter("noir"));
        assert_eq!(catalog.len(), 10);

        catalog.register(FilterSpec::new("noir", vec![Adjustment::Grayscale(0.5)]));
        assert_eq!(catalog.len(), 10);
        assert_eq!(catalog.resolve("noir").adjustments, vec![Adjustment::Grayscale(0.5)]);
    }
}
