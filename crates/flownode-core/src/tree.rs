//! In-memory SVG tree.
//!
//! A small owned tree (elements with ordered attribute lists, text and
//! comments) that the pipeline passes mutate without a live rendering
//! surface. Parsing goes through [`roxmltree`]; serialization goes
//! through the [`svg`] crate's element builder, which takes care of XML
//! escaping.
//!
//! Whitespace is significant inside text content (`text`, `tspan`, ...)
//! and under `xml:space="preserve"`: there it is kept on parse and the
//! subtree is written without added line breaks.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::Hash;

use roxmltree::ParsingOptions;
use svg::node::Node as _;

use crate::types::ParseError;

/// SVG namespace URI.
pub const SVG_NS: &str = "http://www.w3.org/2000/svg";

/// XML namespace URI (implicitly bound to the `xml` prefix).
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Elements whose character data is rendered.
const TEXT_CONTENT: &[&str] = &["text", "tspan", "textPath", "title", "desc"];

/// One `name="value"` pair. Names keep their document prefix (`xlink:href`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Qualified attribute name.
    pub name: String,
    /// Unescaped attribute value.
    pub value: String,
}

/// A child of an [`Element`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Nested element.
    Element(Element),
    /// Character data (unescaped).
    Text(String),
    /// Comment body.
    Comment(String),
}

/// An SVG element with ordered attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<Attribute>,
    children: Vec<Node>,
}

impl Element {
    /// Create an empty element.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder-style child append.
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Qualified name as written in the document.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without its namespace prefix.
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.name
            .rsplit_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    /// Attribute value, if present.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Whether the attribute is present (with any value).
    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    /// Set an attribute, replacing its value in place if it already exists.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(existing) = self.attributes.iter_mut().find(|a| a.name == name) {
            existing.value = value;
        } else {
            self.attributes.push(Attribute {
                name: name.to_string(),
                value,
            });
        }
    }

    /// Remove an attribute, returning its old value.
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|a| a.name == name)?;
        Some(self.attributes.remove(index).value)
    }

    /// All attributes in document order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Direct children.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Append a child node.
    pub fn push(&mut self, child: Node) {
        self.children.push(child);
    }

    /// Insert a child node before position `index` (clamped to the end).
    pub fn insert(&mut self, index: usize, child: Node) {
        let index = index.min(self.children.len());
        self.children.insert(index, child);
    }

    /// Direct child elements.
    pub fn child_elements(&self) -> impl Iterator<Item = &Self> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// All elements below this one, in document order (self excluded).
    #[must_use]
    pub fn descendants(&self) -> Descendants<'_> {
        let mut stack: Vec<&Self> = self.child_elements().collect();
        stack.reverse();
        Descendants { stack }
    }

    /// Visit every element below this one, in document order (self
    /// excluded), with mutable access.
    pub fn for_each_descendant_mut(&mut self, f: &mut impl FnMut(&mut Self)) {
        for child in &mut self.children {
            if let Node::Element(element) = child {
                f(element);
                element.for_each_descendant_mut(f);
            }
        }
    }

    /// Append a token to the `class` attribute.
    pub fn add_class(&mut self, token: &str) {
        let existing = self.attr("class").unwrap_or_default();
        let joined = format!("{existing} {token}");
        self.set_attr("class", joined.trim());
    }

    /// Set one declaration in the inline `style` attribute, keeping the
    /// others.
    pub fn set_style_property(&mut self, property: &str, value: &str) {
        let mut declarations: Vec<(String, String)> = self
            .attr("style")
            .map(parse_style)
            .unwrap_or_default();
        if let Some(slot) = declarations
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(property))
        {
            slot.1 = value.to_string();
        } else {
            declarations.push((property.to_string(), value.to_string()));
        }
        let style = declarations
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect::<Vec<_>>()
            .join("; ");
        self.set_attr("style", style);
    }

    /// Value of one declaration in the inline `style` attribute.
    #[must_use]
    pub fn style_property(&self, property: &str) -> Option<&str> {
        self.attr("style")
            .and_then(|style| style_property(style, property))
    }

    fn keeps_whitespace(&self) -> bool {
        TEXT_CONTENT.contains(&self.local_name()) || self.attr("xml:space") == Some("preserve")
    }

    fn to_svg_element(&self, inline: bool) -> svg::node::element::Element {
        let mut out = svg::node::element::Element::new(self.name.as_str());
        for attribute in &self.attributes {
            out.assign(attribute.name.as_str(), attribute.value.as_str());
        }
        if self.children.is_empty() {
            return out;
        }
        if inline || self.keeps_whitespace() {
            let markup: String = self
                .children
                .iter()
                .map(|child| match child {
                    Node::Element(element) => element.to_svg_element(true).to_string(),
                    Node::Text(text) => svg::node::Text::new(text.as_str()).to_string(),
                    Node::Comment(comment) => svg::node::Comment::new(comment.as_str()).to_string(),
                })
                .collect();
            out.append(InlineMarkup(markup));
            return out;
        }
        for child in &self.children {
            match child {
                Node::Element(element) => out.append(element.to_svg_element(false)),
                Node::Text(text) => out.append(svg::node::Text::new(text.as_str())),
                Node::Comment(comment) => out.append(svg::node::Comment::new(comment.as_str())),
            }
        }
        out
    }
}

/// Serialized children written verbatim, with no line breaks around them.
#[derive(Debug, Clone)]
struct InlineMarkup(String);

impl fmt::Display for InlineMarkup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl svg::node::Node for InlineMarkup {
    fn get_name(&self) -> &'static str {
        "inline"
    }

    fn is_bare(&self) -> bool {
        true
    }
}

impl svg::node::NodeDefaultHash for InlineMarkup {
    fn default_hash(&self, state: &mut DefaultHasher) {
        self.0.hash(state);
    }
}

/// Pre-order iterator over descendant elements.
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        let start = self.stack.len();
        self.stack.extend(next.child_elements());
        self.stack[start..].reverse();
        Some(next)
    }
}

/// A parsed SVG document: an `<svg>` root element and its subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvgDocument {
    root: Element,
}

impl SvgDocument {
    /// Parse SVG text.
    ///
    /// Document type declarations are accepted (exporters commonly emit
    /// one). Whitespace-only text between elements is dropped, except
    /// inside text content; comments are kept.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Xml`] for malformed markup and
    /// [`ParseError::NotSvg`] when the root element is not `<svg>`.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let doc = parse_xml(text)?;
        let root = doc.root_element();
        if root.tag_name().name() != "svg" {
            return Err(ParseError::NotSvg {
                found: root.tag_name().name().to_string(),
            });
        }
        Ok(Self {
            root: convert(root, &[], false),
        })
    }

    /// Wrap an existing root element.
    #[must_use]
    pub const fn from_root(root: Element) -> Self {
        Self { root }
    }

    /// The `<svg>` root.
    #[must_use]
    pub const fn root(&self) -> &Element {
        &self.root
    }

    /// Mutable access to the `<svg>` root.
    pub const fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// Serialize to markup (no XML declaration).
    #[must_use]
    pub fn to_markup(&self) -> String {
        self.root.to_svg_element(false).to_string()
    }
}

/// Parse XML with the options every flownode parser uses.
pub(crate) fn parse_xml(text: &str) -> Result<roxmltree::Document<'_>, roxmltree::Error> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    roxmltree::Document::parse_with_options(text, options)
}

/// Value of one declaration in an inline `style` string.
#[must_use]
pub fn style_property<'a>(style: &'a str, property: &str) -> Option<&'a str> {
    style
        .split(';')
        .filter_map(|decl| decl.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case(property))
        .map(|(_, value)| value.trim())
}

fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| decl.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

/// `(prefix, uri)` pairs in scope for a node, minus the implicit `xml` one.
fn scope(node: roxmltree::Node<'_, '_>) -> Vec<(Option<String>, String)> {
    node.namespaces()
        .filter(|ns| ns.uri() != XML_NS)
        .map(|ns| (ns.name().map(str::to_string), ns.uri().to_string()))
        .collect()
}

fn qualify(node: roxmltree::Node<'_, '_>, namespace: Option<&str>, local: &str) -> String {
    match namespace {
        Some(XML_NS) => format!("xml:{local}"),
        Some(uri) => match node.lookup_prefix(uri) {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}:{local}"),
            _ => local.to_string(),
        },
        None => local.to_string(),
    }
}

fn convert(
    node: roxmltree::Node<'_, '_>,
    parent_scope: &[(Option<String>, String)],
    preserve: bool,
) -> Element {
    let tag = node.tag_name();
    let mut element = Element::new(qualify(node, tag.namespace(), tag.name()));

    // Re-declare only the namespaces this element introduces.
    let own_scope = scope(node);
    for (prefix, uri) in &own_scope {
        let inherited = parent_scope
            .iter()
            .any(|(p, u)| p == prefix && u == uri);
        if !inherited {
            let name = prefix
                .as_ref()
                .map_or_else(|| "xmlns".to_string(), |p| format!("xmlns:{p}"));
            element.attributes.push(Attribute {
                name,
                value: uri.clone(),
            });
        }
    }

    for attribute in node.attributes() {
        element.attributes.push(Attribute {
            name: qualify(node, attribute.namespace(), attribute.name()),
            value: attribute.value().to_string(),
        });
    }

    let preserve = preserve || element.keeps_whitespace();
    for child in node.children() {
        if child.is_element() {
            element
                .children
                .push(Node::Element(convert(child, &own_scope, preserve)));
        } else if child.is_text() {
            if let Some(text) = child.text()
                && (preserve || !text.trim().is_empty())
            {
                element.children.push(Node::Text(text.to_string()));
            }
        } else if child.is_comment()
            && let Some(text) = child.text()
        {
            element.children.push(Node::Comment(text.to_string()));
        }
    }

    element
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ICON: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd">
<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="24" height="24">
  <!-- body -->
  <g id="body">
    <rect x="1" y="1" width="10" height="10" fill="#fff"/>
    <use xlink:href="#body"/>
  </g>
  <text x="2" y="20">A &amp; B</text>
</svg>"##;

    #[test]
    fn parse_accepts_doctype_and_keeps_structure() {
        let doc = SvgDocument::parse(ICON).unwrap();
        let root = doc.root();
        assert_eq!(root.name(), "svg");
        assert_eq!(root.attr("width"), Some("24"));
        assert_eq!(root.attr("xmlns"), Some(SVG_NS));
        let names: Vec<&str> = root.descendants().map(Element::name).collect();
        assert_eq!(names, vec!["g", "rect", "use", "text"]);
    }

    #[test]
    fn parse_keeps_namespace_prefixes() {
        let doc = SvgDocument::parse(ICON).unwrap();
        let use_el = doc
            .root()
            .descendants()
            .find(|e| e.name() == "use")
            .unwrap();
        assert_eq!(use_el.attr("xlink:href"), Some("#body"));
    }

    #[test]
    fn parse_rejects_non_svg_root() {
        let err = SvgDocument::parse("<html/>").unwrap_err();
        assert!(matches!(err, ParseError::NotSvg { ref found } if found == "html"));
    }

    #[test]
    fn parse_rejects_malformed_markup() {
        let err = SvgDocument::parse("<svg><path></svg>").unwrap_err();
        assert!(matches!(err, ParseError::Xml(_)));
    }

    #[test]
    fn markup_escapes_text() {
        let doc = SvgDocument::parse(ICON).unwrap();
        let markup = doc.to_markup();
        assert!(markup.starts_with("<svg"));
        assert!(markup.contains("A &amp; B"));
    }

    #[test]
    fn parse_keeps_comments() {
        let doc = SvgDocument::parse(ICON).unwrap();
        assert!(
            doc.root()
                .children()
                .iter()
                .any(|n| matches!(n, Node::Comment(c) if c.trim() == "body"))
        );
    }

    #[test]
    fn markup_round_trips_through_parser() {
        let doc = SvgDocument::parse(ICON).unwrap();
        let reparsed = SvgDocument::parse(&doc.to_markup()).unwrap();
        let before: Vec<&str> = doc.root().descendants().map(Element::name).collect();
        let after: Vec<&str> = reparsed.root().descendants().map(Element::name).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn text_content_keeps_whitespace() {
        let doc = SvgDocument::parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><text x="1"><tspan>P</tspan> <tspan>101</tspan></text><text><tspan>A</tspan><tspan>B</tspan></text></svg>"#,
        )
        .unwrap();
        let markup = doc.to_markup();
        assert!(markup.contains(r#"<text x="1"><tspan>P</tspan> <tspan>101</tspan></text>"#), "{markup}");
        assert!(markup.contains("<text><tspan>A</tspan><tspan>B</tspan></text>"), "{markup}");
    }

    #[test]
    fn preserved_space_survives_round_trip() {
        let text = r#"<svg xmlns="http://www.w3.org/2000/svg"><g xml:space="preserve"><text>  a  b  </text> </g></svg>"#;
        let doc = SvgDocument::parse(text).unwrap();
        let group = doc.root().child_elements().next().unwrap();
        assert_eq!(group.attr("xml:space"), Some("preserve"));
        assert_eq!(group.children().len(), 2);
        assert!(doc.to_markup().contains("<text>  a  b  </text> </g>"));
        assert_eq!(SvgDocument::parse(&doc.to_markup()).unwrap(), doc);
    }

    #[test]
    fn whitespace_between_shapes_is_dropped() {
        let doc = SvgDocument::parse("<svg>\n  <rect/>\n  <circle/>\n</svg>").unwrap();
        assert_eq!(doc.root().children().len(), 2);
    }

    #[test]
    fn set_attr_replaces_in_place() {
        let mut el = Element::new("path")
            .with_attr("fill", "#fff")
            .with_attr("d", "M0 0");
        el.set_attr("fill", "red");
        assert_eq!(el.attributes()[0].value, "red");
        assert_eq!(el.attributes().len(), 2);
        assert_eq!(el.remove_attr("d"), Some("M0 0".to_string()));
        assert!(!el.has_attr("d"));
    }

    #[test]
    fn add_class_appends_token() {
        let mut el = Element::new("svg");
        el.add_class("highlighted");
        assert_eq!(el.attr("class"), Some("highlighted"));
        el.add_class("highlighted");
        assert_eq!(el.attr("class"), Some("highlighted highlighted"));
    }

    #[test]
    fn set_style_property_keeps_other_declarations() {
        let mut el = Element::new("path").with_attr("style", "opacity:0.5; FILTER: none");
        el.set_style_property("filter", "blur(1px)");
        assert_eq!(el.attr("style"), Some("opacity: 0.5; FILTER: blur(1px)"));
        el.set_style_property("stroke-linecap", "round");
        assert_eq!(el.style_property("stroke-linecap"), Some("round"));
    }

    #[test]
    fn style_property_lookup_is_case_insensitive() {
        assert_eq!(style_property("Stop-Color: #abc ;x:y", "stop-color"), Some("#abc"));
        assert_eq!(style_property("x:y", "stop-color"), None);
    }

    #[test]
    fn descendants_are_in_document_order() {
        let root = Element::new("svg")
            .with_child(
                Element::new("g")
                    .with_child(Element::new("a"))
                    .with_child(Element::new("b")),
            )
            .with_child(Element::new("c"));
        let names: Vec<&str> = root.descendants().map(Element::name).collect();
        assert_eq!(names, vec!["g", "a", "b", "c"]);
    }

    #[test]
    fn for_each_descendant_mut_skips_root() {
        let mut root = Element::new("svg")
            .with_attr("fill", "#000")
            .with_child(Element::new("g").with_child(Element::new("path")));
        root.for_each_descendant_mut(&mut |e| e.set_attr("fill", "red"));
        assert_eq!(root.attr("fill"), Some("#000"));
        assert!(root.descendants().all(|e| e.attr("fill") == Some("red")));
    }
}
