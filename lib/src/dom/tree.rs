use std::borrow::Cow;

use ego_tree::iter::Edge;
use ego_tree::NodeRef;
use memchr::memchr;
use scraper::node::Text;
use scraper::{Html, Node, StrTendril};

use crate::dom::element::{Element, ElementExt};
use crate::dom::parse::{ParseError, ParseErrorKind};

pub use ego_tree::NodeId;

/// One parsed HTML document.
///
/// Nodes live in the tree's arena and are addressed by [`NodeId`]. Detached
/// nodes stay in the arena but are unreachable from the root and never
/// serialized. Every traversal is iterative, so nesting depth is bounded only
/// by memory.
#[derive(Debug, Clone)]
pub struct Document {
    html: Html,
}

fn blank_text(node: &Node) -> Option<&str> {
    let text: &str = node.as_text()?;
    text.trim().is_empty().then_some(text)
}

/// The whitespace from the last newline of `text` on.
fn line_indent(text: &str) -> Option<String> {
    text.rfind('\n').map(|i| text[i..].to_string())
}

impl Document {
    /// Parses `input` with the HTML5 parsing algorithm.
    ///
    /// Any markup parses; missing `<html>`, `<head>` and `<body>` elements are
    /// implied. Only input that is not text at all is rejected.
    pub fn parse(input: &str) -> Result<Document, ParseError> {
        if let Some(offset) = memchr(0, input.as_bytes()) {
            return Err(ParseError::at(ParseErrorKind::NulByte, input.as_bytes(), offset));
        }

        Ok(Document { html: Html::parse_document(input) })
    }

    /// What the parser had to recover from, in source order.
    pub fn parse_errors(&self) -> &[Cow<'static, str>] {
        &self.html.errors
    }

    /// Parses `markup` as `<body>` content owned by `self`, returning the
    /// detached top-level nodes in order.
    pub fn parse_fragment(&mut self, markup: &str) -> Vec<NodeId> {
        let fragment = Html::parse_fragment(markup);
        // Fragment content hangs off a synthetic `<html>` element.
        let Some(holder) = fragment.tree.root().children().find(|n| n.value().is_element()) else {
            return vec![];
        };

        holder.children().filter_map(|child| self.adopt(child)).collect()
    }

    /// `markup` as it serializes once parsed as `<body>` content.
    pub fn normalize_fragment(markup: &str) -> String {
        let fragment = Document { html: Html::parse_fragment(markup) };
        fragment.html().map(|holder| fragment.inner_html(holder)).unwrap_or_default()
    }

    /// Copies `source` and its descendants, from any tree, into this
    /// document. Returns the detached copy of `source`.
    fn adopt(&mut self, source: NodeRef<'_, Node>) -> Option<NodeId> {
        let mut copy = None;
        let mut open: Vec<NodeId> = vec![];
        for edge in source.traverse() {
            match edge {
                Edge::Open(node) => {
                    let id = self.push(open.last().copied(), node.value().clone());
                    copy.get_or_insert(id);
                    open.push(id);
                }
                Edge::Close(_) => { open.pop(); }
            }
        }

        copy
    }

    fn push(&mut self, parent: Option<NodeId>, value: Node) -> NodeId {
        match parent.and_then(|id| self.html.tree.get_mut(id)) {
            Some(mut parent) => parent.append(value).id(),
            None => self.html.tree.orphan(value).id(),
        }
    }

    pub fn root_id(&self) -> NodeId {
        self.html.tree.root().id()
    }

    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_, Node>> {
        self.html.tree.get(id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent().map(|p| p.id())
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(id).into_iter().flat_map(|n| n.children()).map(|n| n.id())
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.node(id)?.value().as_element()
    }

    /// Runs `edit` on element `id`, returning its result, or `None` if `id`
    /// is not an element.
    pub fn update_element<F, R>(&mut self, id: NodeId, edit: F) -> Option<R>
        where F: FnOnce(&mut Element) -> R
    {
        let mut node = self.html.tree.get_mut(id)?;
        match node.value() {
            Node::Element(element) => Some(edit(element)),
            _ => None,
        }
    }

    /// `root` and all of its descendants, in document order.
    pub fn descendants(&self, root: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(root).into_iter().flat_map(|n| n.descendants()).map(|n| n.id())
    }

    /// Elements under `root` (inclusive) in document order.
    pub fn elements(&self, root: NodeId) -> impl Iterator<Item = (NodeId, &Element)> + '_ {
        self.node(root).into_iter()
            .flat_map(|n| n.descendants())
            .filter_map(|n| n.value().as_element().map(|e| (n.id(), e)))
    }

    pub fn elements_named<'a>(&'a self, root: NodeId, name: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.elements(root).filter(move |(_, e)| e.is(name)).map(|(id, _)| id)
    }

    pub fn first_named(&self, name: &str) -> Option<NodeId> {
        self.elements_named(self.root_id(), name).next()
    }

    pub fn html(&self) -> Option<NodeId> {
        self.first_named("html")
    }

    pub fn head(&self) -> Option<NodeId> {
        self.first_named("head")
    }

    pub fn body(&self) -> Option<NodeId> {
        self.first_named("body")
    }

    /// The text of `id` and its descendants, character references decoded.
    /// Script and style bodies are included verbatim; comments are skipped.
    pub fn text_content(&self, id: NodeId) -> String {
        self.node(id).into_iter()
            .flat_map(|n| n.descendants())
            .filter_map(|n| n.value().as_text())
            .map(|text| &**text)
            .collect()
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, element: Element) -> NodeId {
        self.html.tree.orphan(Node::Element(element)).id()
    }

    /// Creates a detached text node. Escaping happens on serialization.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        let text = Text { text: StrTendril::from(text) };
        self.html.tree.orphan(Node::Text(text)).id()
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(mut parent) = self.html.tree.get_mut(parent) {
            parent.append_id(child);
        }
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(mut parent) = self.html.tree.get_mut(parent) {
            parent.prepend_id(child);
        }
    }

    /// Inserts `new` as the previous sibling of `anchor`. Returns `false` if
    /// `anchor` has no parent.
    pub fn insert_before(&mut self, anchor: NodeId, new: NodeId) -> bool {
        if self.parent(anchor).is_none() {
            return false;
        }

        match self.html.tree.get_mut(anchor) {
            Some(mut anchor) => { anchor.insert_id_before(new); true }
            None => false,
        }
    }

    /// Inserts `new` as the next sibling of `anchor`. Returns `false` if
    /// `anchor` has no parent.
    pub fn insert_after(&mut self, anchor: NodeId, new: NodeId) -> bool {
        if self.parent(anchor).is_none() {
            return false;
        }

        match self.html.tree.get_mut(anchor) {
            Some(mut anchor) => { anchor.insert_id_after(new); true }
            None => false,
        }
    }

    /// Replaces all children of `parent` with `children`.
    pub fn replace_children(&mut self, parent: NodeId, children: Vec<NodeId>) {
        let old: Vec<NodeId> = self.children(parent).collect();
        for id in old {
            if let Some(mut node) = self.html.tree.get_mut(id) {
                node.detach();
            }
        }

        for child in children {
            self.append_child(parent, child);
        }
    }

    /// The indentation whitespace on the line `id` starts, if `id` is preceded
    /// by a whitespace text node containing a newline.
    pub fn indentation_of(&self, id: NodeId) -> Option<String> {
        let previous = self.node(id)?.prev_sibling()?;
        line_indent(blank_text(previous.value())?)
    }

    /// Appends `child` to `parent` on its own line, reusing the indentation of
    /// the parent's last element child when there is one.
    pub fn append_indented(&mut self, parent: NodeId, child: NodeId) {
        let Some(node) = self.node(parent) else { return };
        let last_element = node.children().filter(|c| c.value().is_element()).last().map(|c| c.id());
        let trailing = node.last_child().filter(|c| blank_text(c.value()).is_some()).map(|c| c.id());
        let indent = last_element.and_then(|e| self.indentation_of(e));

        match (indent, trailing) {
            (Some(indent), Some(trailing)) => {
                let indent = self.create_text(&indent);
                self.insert_before(trailing, indent);
                self.insert_before(trailing, child);
            }
            (Some(indent), None) => {
                let indent = self.create_text(&indent);
                self.append_child(parent, indent);
                self.append_child(parent, child);
            }
            (None, _) => self.append_child(parent, child),
        }
    }

    /// Prepends `child` to `parent`, on its own line when the parent's first
    /// child is indentation.
    pub fn prepend_indented(&mut self, parent: NodeId, child: NodeId) {
        let leading = self.node(parent)
            .and_then(|n| n.first_child())
            .and_then(|c| Some((c.id(), line_indent(blank_text(c.value())?)?)));

        match leading {
            Some((leading, indent)) => {
                self.insert_after(leading, child);
                let indent = self.create_text(&indent);
                self.insert_after(child, indent);
            }
            None => self.prepend_child(parent, child),
        }
    }

    /// Inserts `new` before `anchor`, on its own line when `anchor` is.
    pub fn insert_before_indented(&mut self, anchor: NodeId, new: NodeId) -> bool {
        let indent = self.indentation_of(anchor);
        if !self.insert_before(anchor, new) {
            return false;
        }

        if let Some(indent) = indent {
            let indent = self.create_text(&indent);
            self.insert_before(anchor, indent);
        }

        true
    }

    /// Inserts `new` after `anchor`, on its own line when `anchor` is.
    pub fn insert_after_indented(&mut self, anchor: NodeId, new: NodeId) -> bool {
        let indent = self.indentation_of(anchor);
        if !self.insert_after(anchor, new) {
            return false;
        }

        if let Some(indent) = indent {
            let indent = self.create_text(&indent);
            self.insert_after(anchor, indent);
        }

        true
    }
}
