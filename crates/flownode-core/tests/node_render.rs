//! Integration test: drive a node through loads and restyles with the real
//! usvg measurer, the way a host does.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;
use std::future::{Future, ready};
use std::rc::Rc;

use flownode_core::tree::SvgDocument;
use flownode_core::{
    Color, Completion, LoadError, NodeContent, NodeData, NodeDefaults, NodeIdentity, NodeRenderer,
    RecordingSink, SourceLoader, Stage, StyleSpec, Update, ViewFlags,
};

const PUMP: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="64" height="64">
  <circle cx="20" cy="20" r="10" fill="#000"/>
  <path d="M10 30 L30 30" stroke="#000" fill="none"/>
</svg>"##;

const VALVE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="32" height="32">
  <rect x="4" y="6" width="8" height="4" fill="#333"/>
</svg>"##;

const RICH: &str = r##"<svg xmlns="http://www.w3.org/2000/svg">
  <rect x="0" y="0" width="5" height="5" fill="#111"/>
  <rect x="5" y="0" width="5" height="5" fill="#222"/>
  <rect x="0" y="5" width="5" height="5" fill="#333"/>
  <rect x="5" y="5" width="5" height="5" fill="#444"/>
</svg>"##;

struct MapLoader(HashMap<&'static str, &'static str>);

impl MapLoader {
    fn icons() -> Self {
        Self(HashMap::from([
            ("/icons/pump.svg", PUMP),
            ("/icons/valve.svg", VALVE),
            ("/icons/rich.svg", RICH),
            ("/icons/broken.svg", "<svg><g></svg>"),
        ]))
    }
}

impl SourceLoader for MapLoader {
    fn load(&self, locator: &str) -> impl Future<Output = Result<String, LoadError>> {
        ready(self.0.get(locator).map(|s| (*s).to_string()).ok_or(LoadError::NotFound))
    }
}

fn renderer(id: &str) -> (NodeRenderer, Rc<RecordingSink>) {
    let sink = Rc::new(RecordingSink::default());
    let renderer = NodeRenderer::new(NodeIdentity::new(id).with_kind("Pump"), sink.clone());
    (renderer, sink)
}

fn style_for(data: &NodeData, flags: ViewFlags) -> StyleSpec {
    StyleSpec::from_node(data, flags, &NodeDefaults::default())
}

fn inline_markup(renderer: &NodeRenderer) -> String {
    match renderer.view(false).content {
        NodeContent::Inline(markup) => markup.to_string(),
        other => unreachable!("expected inline content, got {other:?}"),
    }
}

#[test]
fn default_node_is_fitted_and_recolored() {
    let (mut node, sink) = renderer("p1");
    let style = style_for(&NodeData::default(), ViewFlags::default());

    let changed = futures::executor::block_on(node.refresh(&MapLoader::icons(), "/icons/pump.svg", style));
    assert!(changed);

    let doc = SvgDocument::parse(&inline_markup(&node)).unwrap();
    let root = doc.root();
    // Circle spans 10..30 on both axes; the path lies on y=30.
    assert_eq!(root.attr("viewBox"), Some("9.8 9.8 20.4 20.4"));
    assert_eq!(root.attr("width"), Some("100%"));
    assert_eq!(root.attr("height"), Some("100%"));
    assert_eq!(root.attr("preserveAspectRatio"), Some("none"));

    let circle = root.child_elements().find(|e| e.name() == "circle").unwrap();
    assert_eq!(circle.attr("fill"), Some("#d3d3d3"));
    assert_eq!(circle.attr("stroke"), None);
    let line = root.child_elements().find(|e| e.name() == "path").unwrap();
    assert_eq!(line.attr("fill"), Some("none"));
    assert_eq!(line.attr("stroke"), Some("#000000"));
    assert_eq!(line.attr("vector-effect"), Some("non-scaling-stroke"));

    assert!(sink.reports().is_empty());
}

#[test]
fn restyle_reuses_loaded_text() {
    let (mut node, _sink) = renderer("p1");
    let loader = MapLoader::icons();
    let first = style_for(&NodeData::default(), ViewFlags::default());
    futures::executor::block_on(node.refresh(&loader, "/icons/pump.svg", first));
    let generation = node.generation();

    let data = NodeData {
        gradient_start: Some(Color::from("#0000ff")),
        gradient_end: Some(Color::from("#ffffff")),
        ..NodeData::default()
    };
    let update = node.request("/icons/pump.svg", style_for(&data, ViewFlags::default()));
    assert_eq!(update, Update::Restyled);
    assert_eq!(node.generation(), generation);

    let markup = inline_markup(&node);
    assert!(markup.contains("customGradient-p1"));
    assert!(markup.contains(r#"id="svg-node-Pump""#));
    assert!(markup.contains("url(#customGradient-p1)"));
}

#[test]
fn slow_load_for_previous_locator_is_dropped() {
    let (mut node, _sink) = renderer("v1");
    let style = style_for(&NodeData::default(), ViewFlags::default());

    let Update::Fetch(old) = node.request("/icons/pump.svg", style.clone()) else {
        unreachable!()
    };
    let Update::Fetch(new) = node.request("/icons/valve.svg", style) else {
        unreachable!()
    };

    assert_eq!(node.complete(new, Ok(VALVE.to_string())), Completion::Applied);
    assert_eq!(node.complete(old, Ok(PUMP.to_string())), Completion::Stale);

    let doc = SvgDocument::parse(&inline_markup(&node)).unwrap();
    assert_eq!(doc.root().attr("viewBox"), Some("3.8 5.8 8.4 4.4"));
}

#[test]
fn special_icon_keeps_its_palette_but_gets_strokes() {
    let (mut node, _sink) = renderer("r1");
    let data = NodeData {
        node_color: Some(Color::from("#ff0000")),
        ..NodeData::default()
    };
    let flags = ViewFlags {
        selected: true,
        ..ViewFlags::default()
    };
    futures::executor::block_on(node.refresh(&MapLoader::icons(), "/icons/rich.svg", style_for(&data, flags)));

    let processed = node.processed().unwrap();
    assert!(processed.classification.special);
    let doc = SvgDocument::parse(&processed.markup).unwrap();
    let fills: Vec<_> = doc.root().child_elements().filter_map(|e| e.attr("fill")).collect();
    assert_eq!(fills, vec!["#111", "#222", "#333", "#444"]);
}

#[test]
fn failures_fall_back_to_plain_image() {
    let loader = MapLoader::icons();
    let style = StyleSpec {
        highlighted: true,
        ..StyleSpec::default()
    };

    let (mut missing, sink) = renderer("m1");
    futures::executor::block_on(missing.refresh(&loader, "/icons/missing.svg", style.clone()));
    assert_eq!(
        missing.view(false).content,
        NodeContent::Fallback {
            src: "/icons/missing.svg",
            highlighted: true,
        }
    );
    let reports = sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].stage, Stage::Fetch);
    assert_eq!(reports[0].locator.as_deref(), Some("/icons/missing.svg"));

    let (mut broken, sink) = renderer("b1");
    futures::executor::block_on(broken.refresh(&loader, "/icons/broken.svg", style));
    assert!(matches!(broken.view(false).content, NodeContent::Fallback { .. }));
    assert!(sink.has_stage(Stage::Parse));
}
