use std::path::Path;
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ExportError, Result};

/// Closest a caption may get to any strip edge, as a fraction of the strip
pub const POSITION_MIN: f32 = 0.05;
pub const POSITION_MAX: f32 = 0.95;

pub const FONT_SIZE_RANGE: (f32, f32) = (10.0, 28.0);

/// Font families offered by the booth; any installed family also works
pub const FONT_FAMILIES: &[&str] = &["Arial", "Georgia", "Courier New", "Comic Sans MS", "Times New Roman"];

/// Common stand-ins for the booth families on hosts without them
const SANS_FALLBACKS: &[&str] = &["Liberation Sans", "DejaVu Sans", "Noto Sans", "FreeSans"];

/// Normalized caption anchor (top-left corner of the text)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptionPosition {
    pub x: f32,
    pub y: f32,
}

impl CaptionPosition {
    /// Build a position, pulling both axes into [0.05, 0.95]
    pub fn clamped(x: f32, y: f32) -> Self {
        fn clamp(v: f32) -> f32 {
            if v.is_nan() { 0.5 } else { v.clamp(POSITION_MIN, POSITION_MAX) }
        }
        Self { x: clamp(x), y: clamp(y) }
    }
}

impl Default for CaptionPosition {
    fn default() -> Self {
        Self { x: 0.5, y: 0.9 }
    }
}

/// Caption text and its style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionSpec {
    pub text: String,
    pub color: [u8; 3],
    pub bold: bool,
    pub font_family: String,
    pub font_size: f32,
    pub position: CaptionPosition,
}

impl Default for CaptionSpec {
    fn default() -> Self {
        Self {
            text: String::new(),
            color: [0, 0, 0],
            bold: false,
            font_family: "Arial".to_string(),
            font_size: 14.0,
            position: CaptionPosition::default(),
        }
    }
}

impl CaptionSpec {
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self { text: text.into(), ..Self::default() }
    }

    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = if size.is_nan() {
            FONT_SIZE_RANGE.0
        } else {
            size.clamp(FONT_SIZE_RANGE.0, FONT_SIZE_RANGE.1)
        };
        self
    }

    /// Top-left pixel of the caption on a strip of the given size
    ///
    /// The position is clamped here too, since it may come straight from
    /// deserialized input.
    pub fn origin(&self, width: u32, height: u32) -> (f32, f32) {
        let position = CaptionPosition::clamped(self.position.x, self.position.y);
        (position.x * width as f32, position.y * height as f32)
    }

    fn to_svg(&self, width: u32, height: u32) -> String {
        let (x, y) = self.origin(width, height);
        let [r, g, b] = self.color;
        let family = self.font_family.replace(['\'', '"'], "");

        format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
                r##"<text x="{x:.2}" y="{y:.2}" fill="#{r:02x}{g:02x}{b:02x}" "##,
                r#"font-family="'{family}', sans-serif" font-size="{size:.1}" font-weight="{weight}" "#,
                r#"dominant-baseline="hanging" xml:space="preserve">{text}</text></svg>"#
            ),
            w = width,
            h = height,
            x = x,
            y = y,
            r = r,
            g = g,
            b = b,
            family = escape_xml(&family),
            size = self.font_size,
            weight = if self.bold { "bold" } else { "normal" },
            text = escape_xml(&self.text),
        )
    }
}

/// Parse `#rrggbb` (or `rrggbb`) into an RGB triple
pub fn parse_hex_color(value: &str) -> Option<[u8; 3]> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Rasterizes captions with the system fonts plus an optional fonts directory
#[derive(Clone)]
pub struct CaptionRenderer {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl CaptionRenderer {
    pub fn new(fonts_dir: Option<&Path>) -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        if let Some(dir) = fonts_dir {
            db.load_fonts_dir(dir);
        }

        if db.is_empty() {
            warn!("No fonts found, captions will not be drawn");
        } else if !has_family(&db, "Arial") {
            // fontdb maps sans-serif to Arial, which most Linux hosts lack
            if let Some(family) = FONT_FAMILIES
                .iter()
                .chain(SANS_FALLBACKS)
                .find(|family| has_family(&db, family))
            {
                debug!("Using '{}' for sans-serif captions", family);
                db.set_sans_serif_family(*family);
            }
        }

        debug!("Caption renderer loaded {} font faces", db.len());
        Self { fontdb: Arc::new(db) }
    }

    pub fn font_count(&self) -> usize {
        self.fontdb.len()
    }

    /// Render the caption as a transparent layer of the given size
    ///
    /// Returns `None` for an empty caption.
    pub fn render(&self, caption: &CaptionSpec, width: u32, height: u32) -> Result<Option<RgbaImage>> {
        if caption.text.trim().is_empty() {
            return Ok(None);
        }

        let svg = caption.to_svg(width, height);
        let options = usvg::Options {
            fontdb: Arc::clone(&self.fontdb),
            font_resolver: caption_font_resolver(),
            ..Default::default()
        };
        let tree = usvg::Tree::from_str(&svg, &options)
            .map_err(|e| ExportError::CaptionFailed { reason: e.to_string() })?;

        let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height).ok_or_else(|| ExportError::CaptionFailed {
            reason: format!("cannot allocate {}x{} caption layer", width, height),
        })?;
        resvg::render(&tree, resvg::tiny_skia::Transform::identity(), &mut pixmap.as_mut());

        let mut layer = RgbaImage::new(width, height);
        for (dst, src) in layer.pixels_mut().zip(pixmap.pixels()) {
            let c = src.demultiply();
            *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
        }
        Ok(Some(layer))
    }
}

fn has_family(db: &usvg::fontdb::Database, name: &str) -> bool {
    db.faces()
        .any(|face| face.families.iter().any(|(family, _)| family.eq_ignore_ascii_case(name)))
}

/// Resolves the caption font, falling back to any installed face when the
/// requested family and the generic families are all missing
fn caption_font_resolver() -> usvg::FontResolver<'static> {
    use usvg::fontdb::{Family, Query, Stretch, Style, Weight};

    usvg::FontResolver {
        select_font: Box::new(|font, fontdb| {
            let mut families: Vec<Family<'_>> = font
                .families()
                .iter()
                .map(|family| match family {
                    usvg::FontFamily::Serif => Family::Serif,
                    usvg::FontFamily::SansSerif => Family::SansSerif,
                    usvg::FontFamily::Cursive => Family::Cursive,
                    usvg::FontFamily::Fantasy => Family::Fantasy,
                    usvg::FontFamily::Monospace => Family::Monospace,
                    usvg::FontFamily::Named(name) => Family::Name(name),
                })
                .collect();
            families.extend([Family::SansSerif, Family::Serif, Family::Monospace]);

            let style = match font.style() {
                usvg::FontStyle::Normal => Style::Normal,
                usvg::FontStyle::Italic => Style::Italic,
                usvg::FontStyle::Oblique => Style::Oblique,
            };

            let query = Query {
                families: &families,
                weight: Weight(font.weight()),
                stretch: Stretch::Normal,
                style,
            };

            fontdb
                .query(&query)
                .or_else(|| fontdb.faces().next().map(|face| face.id))
        }),
        select_fallback: usvg::FontResolver::default_fallback_selector(),
    }
}

impl std::fmt::Debug for CaptionRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptionRenderer")
            .field("font_faces", &self.fontdb.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_is_clamped() {
        assert_eq!(CaptionPosition::clamped(-3.0, 7.0), CaptionPosition { x: 0.05, y: 0.95 });
        assert_eq!(CaptionPosition::clamped(0.3, 0.6), CaptionPosition { x: 0.3, y: 0.6 });
    }

    #[test]
    fn test_default_caption_sits_low_and_centered() {
        let caption = CaptionSpec::new("Aug 2024");
        assert_eq!(caption.origin(200, 1000), (100.0, 900.0));
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ff8000"), Some([255, 128, 0]));
        assert_eq!(parse_hex_color("00ff00"), Some([0, 255, 0]));
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
    }

    #[test]
    fn test_svg_escapes_text_and_font() {
        let mut caption = CaptionSpec::new("Tom & <Jerry>");
        caption.font_family = "'Comic Sans MS'".to_string();
        caption.bold = true;
        let svg = caption.to_svg(100, 100);

        assert!(svg.contains("Tom &amp; &lt;Jerry&gt;"));
        assert!(svg.contains("font-family=\"'Comic Sans MS', sans-serif\""));
        assert!(svg.contains("font-weight=\"bold\""));
        assert!(svg.contains("fill=\"#000000\""));
    }

    #[test]
    fn test_font_size_is_clamped() {
        assert_eq!(CaptionSpec::new("x").with_font_size(80.0).font_size, 28.0);
        assert_eq!(CaptionSpec::new("x").with_font_size(2.0).font_size, 10.0);
    }

    #[test]
    fn test_empty_caption_renders_nothing() {
        let renderer = CaptionRenderer::new(None);
        let layer = renderer.render(&CaptionSpec::new("   "), 40, 40).unwrap();
        assert!(layer.is_none());
    }

    #[test]
    fn test_origin_clamps_unchecked_position() {
        let mut caption = CaptionSpec::new("x");
        caption.position = CaptionPosition { x: 2.0, y: -1.0 };
        let (x, y) = caption.origin(100, 200);
        assert!((x - 95.0).abs() < 1e-3 && (y - 10.0).abs() < 1e-3);
    }

    fn inked(layer: &RgbaImage) -> usize {
        layer.pixels().filter(|px| px.0[3] > 0).count()
    }

    #[test]
    fn test_caption_renders_even_when_font_family_is_missing() {
        let renderer = CaptionRenderer::new(None);
        if renderer.font_count() == 0 {
            // Nothing can draw text on a host without fonts
            return;
        }

        for family in ["Definitely Not Installed", "Arial", "sans-serif"] {
            let mut caption = CaptionSpec::new("Aug 2024");
            caption.font_family = family.to_string();
            let layer = renderer.render(&caption, 200, 400).unwrap().unwrap();
            assert!(inked(&layer) > 0, "no caption pixels with family '{}'", family);
        }
    }

    #[test]
    fn test_caption_layer_matches_strip_size() {
        let renderer = CaptionRenderer::new(None);
        let layer = renderer.render(&CaptionSpec::new("Aug 2024"), 120, 300).unwrap().unwrap();
        assert_eq!(layer.dimensions(), (120, 300));
    }
}
