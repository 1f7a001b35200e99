//! Geometry normalization: fit the drawable content to its `viewBox`.
//!
//! Diagram nodes are rectangular slots, not aspect-locked icons, so the
//! normalized document always stretches to fill its container
//! (`preserveAspectRatio="none"`). The `viewBox` is rewritten to the
//! tight bounding box of the content plus a configurable padding.
//!
//! Measuring that box needs real geometry (path curves, transforms), so
//! it sits behind the [`MeasureBounds`] trait. [`UsvgMeasurer`] is the
//! production implementation; tests substitute fakes.

use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Serialize};
use usvg::fontdb::Database;
#[cfg(not(target_arch = "wasm32"))]
use usvg::fontdb::{Family, Query};

use crate::tree::{Element, Node, SVG_NS, SvgDocument};
use crate::types::{BoundingBox, GeometryError};

/// How the normalized document is told to fill its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SizingMode {
    /// `width="100%" height="100%"` attributes.
    #[default]
    Attributes,
    /// `width`/`height` attributes removed in favor of an inline
    /// `width: 100%; height: 100%` style.
    InlineStyle,
}

/// Parameters of the `viewBox` rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// User-space padding added on every side of the measured box.
    pub padding: f64,
    /// Sizing attributes written to the root.
    pub sizing: SizingMode,
}

impl GeometryConfig {
    /// Default padding in user-space units.
    pub const DEFAULT_PADDING: f64 = 0.2;
    /// Size assumed for a missing or unusable `width`/`height`.
    pub const FALLBACK_EXTENT: f64 = 100.0;
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            padding: Self::DEFAULT_PADDING,
            sizing: SizingMode::default(),
        }
    }
}

/// Measures the object bounding box of a document's drawable content.
pub trait MeasureBounds {
    /// Bounding box of the root's children in user-space units, ignoring
    /// the root's own `viewBox` and sizing.
    ///
    /// # Errors
    ///
    /// Returns a [`GeometryError`] when the content cannot be measured.
    fn measure(&self, doc: &SvgDocument) -> Result<BoundingBox, GeometryError>;
}

/// Measures with [`usvg`]: the root's children are re-hosted in a bare
/// `<svg>` (namespace declarations only) so the result is in the
/// content's own user space.
///
/// Text is only laid out, and so only measured, with fonts in the
/// database. [`UsvgMeasurer::new`] shares the system fonts on native
/// targets; browser hosts pass bundled fonts through
/// [`UsvgMeasurer::with_fontdb`].
#[derive(Debug, Clone)]
pub struct UsvgMeasurer {
    fontdb: Arc<Database>,
}

static SYSTEM_FONTS: LazyLock<Arc<Database>> = LazyLock::new(|| Arc::new(system_fonts()));

impl UsvgMeasurer {
    /// Measurer backed by the system fonts, loaded once per process.
    #[must_use]
    pub fn new() -> Self {
        Self::with_fontdb(Arc::clone(&SYSTEM_FONTS))
    }

    /// Measurer backed by a caller-supplied font database.
    #[must_use]
    pub const fn with_fontdb(fontdb: Arc<Database>) -> Self {
        Self { fontdb }
    }

    /// Fonts available for text layout.
    #[must_use]
    pub fn fontdb(&self) -> &Database {
        &self.fontdb
    }
}

impl Default for UsvgMeasurer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn system_fonts() -> Database {
    let mut db = Database::new();
    db.load_system_fonts();
    // Generic families fall back to whatever is installed, so text is
    // never dropped for want of "Times New Roman".
    let first = db
        .faces()
        .find_map(|face| face.families.first())
        .map(|(family, _)| family.clone());
    if let Some(first) = first {
        if !has_family(&db, Family::Serif) {
            db.set_serif_family(first.clone());
        }
        if !has_family(&db, Family::SansSerif) {
            db.set_sans_serif_family(first);
        }
    }
    log::debug!("loaded {} system font faces", db.len());
    db
}

#[cfg(not(target_arch = "wasm32"))]
fn has_family(db: &Database, family: Family<'_>) -> bool {
    let families = [family];
    let query = Query {
        families: &families,
        ..Query::default()
    };
    db.query(&query).is_some()
}

#[cfg(target_arch = "wasm32")]
fn system_fonts() -> Database {
    Database::new()
}

impl MeasureBounds for UsvgMeasurer {
    fn measure(&self, doc: &SvgDocument) -> Result<BoundingBox, GeometryError> {
        if !has_drawable_children(doc.root()) {
            return Err(GeometryError::EmptyContent);
        }
        let markup = measurement_document(doc.root()).to_markup();
        let options = usvg::Options {
            fontdb: Arc::clone(&self.fontdb),
            ..usvg::Options::default()
        };
        let tree = usvg::Tree::from_str(&markup, &options)
            .map_err(|e| GeometryError::Usvg(e.to_string()))?;

        let root = tree.root();
        if !root.has_children() {
            return Err(GeometryError::EmptyContent);
        }
        let rect = root.abs_bounding_box();
        Ok(BoundingBox::new(
            f64::from(rect.x()),
            f64::from(rect.y()),
            f64::from(rect.width()),
            f64::from(rect.height()),
        ))
    }
}

/// A copy of `root`'s children under a fresh `<svg>` that keeps only the
/// namespace declarations.
fn measurement_document(root: &Element) -> SvgDocument {
    let mut host = Element::new("svg");
    for attribute in root.attributes() {
        if attribute.name == "xmlns" || attribute.name.starts_with("xmlns:") {
            host.set_attr(&attribute.name, attribute.value.as_str());
        }
    }
    if !host.has_attr("xmlns") {
        host.set_attr("xmlns", SVG_NS);
    }
    for child in root.children() {
        host.push(child.clone());
    }
    SvgDocument::from_root(host)
}

/// Result of [`normalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryOutcome {
    /// The box written to `viewBox`.
    pub view_box: BoundingBox,
    /// Why the declared-size fallback was used, if it was.
    pub fallback: Option<GeometryError>,
}

impl GeometryOutcome {
    /// Whether the declared-size fallback was used.
    #[must_use]
    pub const fn used_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

/// Rewrite the root's `viewBox` and sizing attributes.
///
/// Measurement failures never escape: the declared `width`/`height`
/// (100 when missing or not a plain number) become `viewBox="0 0 w h"`
/// and the sizing attributes are still written.
pub fn normalize<M>(doc: &mut SvgDocument, config: &GeometryConfig, measurer: &M) -> GeometryOutcome
where
    M: MeasureBounds + ?Sized,
{
    let measured = measurer.measure(doc).and_then(|bbox| {
        let padded = bbox.padded(config.padding);
        if padded.is_usable() {
            Ok(padded)
        } else {
            Err(GeometryError::Degenerate {
                width: bbox.width,
                height: bbox.height,
            })
        }
    });

    let (view_box, fallback) = match measured {
        Ok(view_box) => (view_box, None),
        Err(e) => {
            log::debug!("bounding box unavailable, using declared size: {e}");
            (declared_box(doc.root()), Some(e))
        }
    };

    let root = doc.root_mut();
    root.set_attr("viewBox", view_box.to_view_box());
    match config.sizing {
        SizingMode::Attributes => {
            root.set_attr("width", "100%");
            root.set_attr("height", "100%");
        }
        SizingMode::InlineStyle => {
            root.remove_attr("width");
            root.remove_attr("height");
            root.set_style_property("width", "100%");
            root.set_style_property("height", "100%");
        }
    }
    root.set_attr("preserveAspectRatio", "none");

    GeometryOutcome { view_box, fallback }
}

fn declared_box(root: &Element) -> BoundingBox {
    let extent = |name: &str| {
        root.attr(name)
            .and_then(parse_length)
            .unwrap_or(GeometryConfig::FALLBACK_EXTENT)
    };
    BoundingBox::new(0.0, 0.0, extent("width"), extent("height"))
}

/// Parse a plain or `px` length; percentages and other units yield `None`.
fn parse_length(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let number = raw.strip_suffix("px").unwrap_or(raw);
    number
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

/// Whether the root has any child element to measure.
#[must_use]
pub fn has_drawable_children(root: &Element) -> bool {
    root.children().iter().any(|c| matches!(c, Node::Element(_)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct FixedBounds(BoundingBox);

    impl MeasureBounds for FixedBounds {
        fn measure(&self, _doc: &SvgDocument) -> Result<BoundingBox, GeometryError> {
            Ok(self.0)
        }
    }

    struct FailingBounds;

    impl MeasureBounds for FailingBounds {
        fn measure(&self, _doc: &SvgDocument) -> Result<BoundingBox, GeometryError> {
            Err(GeometryError::EmptyContent)
        }
    }

    fn doc(text: &str) -> SvgDocument {
        SvgDocument::parse(text).unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-3,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn writes_padded_view_box_and_fill_sizing() {
        let mut d = doc(r#"<svg width="24" height="24" viewBox="0 0 24 24"><path/></svg>"#);
        let outcome = normalize(
            &mut d,
            &GeometryConfig::default(),
            &FixedBounds(BoundingBox::new(2.0, 3.0, 20.0, 10.0)),
        );
        let root = d.root();
        assert_eq!(root.attr("viewBox"), Some("1.8 2.8 20.4 10.4"));
        assert_eq!(root.attr("width"), Some("100%"));
        assert_eq!(root.attr("height"), Some("100%"));
        assert_eq!(root.attr("preserveAspectRatio"), Some("none"));
        assert!(!outcome.used_fallback());
    }

    #[test]
    fn zero_padding_uses_tight_box() {
        let mut d = doc("<svg><path/></svg>");
        let config = GeometryConfig {
            padding: 0.0,
            ..GeometryConfig::default()
        };
        normalize(&mut d, &config, &FixedBounds(BoundingBox::new(0.0, 0.0, 5.0, 7.0)));
        assert_eq!(d.root().attr("viewBox"), Some("0 0 5 7"));
    }

    #[test]
    fn inline_style_sizing_strips_dimensions() {
        let mut d = doc(r#"<svg width="24" height="24" style="opacity:1"><path/></svg>"#);
        let config = GeometryConfig {
            padding: 0.0,
            sizing: SizingMode::InlineStyle,
        };
        normalize(&mut d, &config, &FixedBounds(BoundingBox::new(0.0, 0.0, 1.0, 1.0)));
        let root = d.root();
        assert!(!root.has_attr("width"));
        assert!(!root.has_attr("height"));
        assert_eq!(root.style_property("width"), Some("100%"));
        assert_eq!(root.style_property("height"), Some("100%"));
        assert_eq!(root.style_property("opacity"), Some("1"));
        assert_eq!(root.attr("preserveAspectRatio"), Some("none"));
    }

    #[test]
    fn measurement_failure_falls_back_to_declared_size() {
        let mut d = doc(r#"<svg width="48px" height="32"><path/></svg>"#);
        let outcome = normalize(&mut d, &GeometryConfig::default(), &FailingBounds);
        assert_eq!(d.root().attr("viewBox"), Some("0 0 48 32"));
        assert_eq!(d.root().attr("preserveAspectRatio"), Some("none"));
        assert_eq!(outcome.fallback, Some(GeometryError::EmptyContent));
    }

    #[test]
    fn fallback_defaults_to_100_square() {
        let mut d = doc(r#"<svg width="50%"><path/></svg>"#);
        normalize(&mut d, &GeometryConfig::default(), &FailingBounds);
        assert_eq!(d.root().attr("viewBox"), Some("0 0 100 100"));
        assert_eq!(d.root().attr("width"), Some("100%"));
    }

    #[test]
    fn degenerate_box_falls_back() {
        let mut d = doc(r#"<svg width="10" height="10"><path/></svg>"#);
        let config = GeometryConfig {
            padding: 0.0,
            ..GeometryConfig::default()
        };
        let outcome = normalize(&mut d, &config, &FixedBounds(BoundingBox::new(3.0, 3.0, 0.0, 0.0)));
        assert!(matches!(outcome.fallback, Some(GeometryError::Degenerate { .. })));
        assert_eq!(d.root().attr("viewBox"), Some("0 0 10 10"));
    }

    #[test]
    fn flat_line_is_usable_with_padding() {
        let mut d = doc("<svg><line/></svg>");
        let outcome = normalize(
            &mut d,
            &GeometryConfig::default(),
            &FixedBounds(BoundingBox::new(0.0, 5.0, 10.0, 0.0)),
        );
        assert!(!outcome.used_fallback());
        assert_eq!(d.root().attr("viewBox"), Some("-0.2 4.8 10.4 0.4"));
    }

    #[test]
    fn parse_length_accepts_plain_and_px() {
        assert_eq!(parse_length("24"), Some(24.0));
        assert_eq!(parse_length(" 24.5px "), Some(24.5));
        assert_eq!(parse_length("100%"), None);
        assert_eq!(parse_length("2em"), None);
        assert_eq!(parse_length("-3"), None);
    }

    #[test]
    fn measurement_document_drops_root_sizing() {
        let d = doc(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" viewBox="0 0 1 1" width="5" class="x"><path/></svg>"#,
        );
        let host = measurement_document(d.root());
        let root = host.root();
        assert_eq!(root.attr("xmlns"), Some(SVG_NS));
        assert_eq!(root.attr("xmlns:xlink"), Some("http://www.w3.org/1999/xlink"));
        assert!(!root.has_attr("viewBox"));
        assert!(!root.has_attr("width"));
        assert!(!root.has_attr("class"));
        assert_eq!(root.child_elements().count(), 1);
    }

    #[test]
    fn usvg_measures_rect_in_user_space() {
        let d = doc(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 500 500" width="10" height="10"><rect x="2" y="3" width="10" height="5"/></svg>"#,
        );
        let bbox = UsvgMeasurer::new().measure(&d).unwrap();
        assert_close(bbox.x, 2.0);
        assert_close(bbox.y, 3.0);
        assert_close(bbox.width, 10.0);
        assert_close(bbox.height, 5.0);
    }

    #[test]
    fn usvg_applies_child_transforms() {
        let d = doc(
            r#"<svg><g transform="translate(10 20)"><rect width="4" height="6"/></g></svg>"#,
        );
        let bbox = UsvgMeasurer::new().measure(&d).unwrap();
        assert_close(bbox.x, 10.0);
        assert_close(bbox.y, 20.0);
        assert_close(bbox.width, 4.0);
        assert_close(bbox.height, 6.0);
    }

    #[test]
    fn usvg_reports_empty_documents() {
        let d = doc(r#"<svg xmlns="http://www.w3.org/2000/svg"/>"#);
        assert!(UsvgMeasurer::new().measure(&d).is_err());
        assert!(!has_drawable_children(d.root()));
    }

    // --- Text measurement tests ---

    const LABELLED_TANK: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="64" height="64"><rect width="10" height="10"/><text x="20" y="35" font-size="20">TANK-101</text></svg>"#;

    #[test]
    fn text_is_measured_with_system_fonts() {
        let measurer = UsvgMeasurer::new();
        if measurer.fontdb().is_empty() {
            eprintln!("no system fonts installed; skipping");
            return;
        }
        let bbox = measurer.measure(&doc(LABELLED_TANK)).unwrap();
        assert_close(bbox.x, 0.0);
        assert_close(bbox.y, 0.0);
        assert!(bbox.x + bbox.width > 60.0, "label cropped: {bbox:?}");
        assert!(bbox.y + bbox.height > 30.0, "label cropped: {bbox:?}");

        let mut d = doc(LABELLED_TANK);
        let outcome = normalize(&mut d, &GeometryConfig::default(), &measurer);
        assert!(!outcome.used_fallback());
        assert!(outcome.view_box.width > 60.0);
    }

    #[test]
    fn text_only_icon_is_measured_with_system_fonts() {
        let measurer = UsvgMeasurer::new();
        if measurer.fontdb().is_empty() {
            eprintln!("no system fonts installed; skipping");
            return;
        }
        let d = doc(r#"<svg xmlns="http://www.w3.org/2000/svg"><text x="5" y="20" font-size="16">T</text></svg>"#);
        let bbox = measurer.measure(&d).unwrap();
        assert!(bbox.width > 0.0 && bbox.height > 0.0);
        assert!(bbox.x >= 4.0 && bbox.y < 20.0, "{bbox:?}");
    }

    #[test]
    fn text_without_fonts_is_not_measured() {
        let measurer = UsvgMeasurer::with_fontdb(Arc::new(Database::new()));
        let bbox = measurer.measure(&doc(LABELLED_TANK)).unwrap();
        assert_close(bbox.width, 10.0);
        assert_close(bbox.height, 10.0);
    }

    #[test]
    fn measurers_share_the_system_database() {
        let a = UsvgMeasurer::new();
        let b = UsvgMeasurer::default();
        assert!(std::ptr::eq(a.fontdb(), b.fontdb()));
    }
}
