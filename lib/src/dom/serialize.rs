use std::fmt;
use std::io;

use ego_tree::iter::Edge;
use ego_tree::NodeRef;
use html5ever::serialize::{serialize, Serialize, SerializeOpts, Serializer, TraversalScope};
use scraper::Node;

use crate::dom::tree::{Document, NodeId};

/// A node and its descendants, fed to the HTML serializer edge by edge.
struct Subtree<'a> {
    node: NodeRef<'a, Node>,
}

impl Serialize for Subtree<'_> {
    fn serialize<S: Serializer>(&self, serializer: &mut S, scope: TraversalScope) -> io::Result<()> {
        let skip_self = scope != TraversalScope::IncludeNode;
        for edge in self.node.traverse() {
            match edge {
                Edge::Open(node) | Edge::Close(node) if skip_self && node == self.node => {}
                Edge::Open(node) => match node.value() {
                    Node::Doctype(doctype) => serializer.write_doctype(doctype.name())?,
                    Node::Comment(comment) => serializer.write_comment(comment)?,
                    Node::Text(text) => serializer.write_text(text)?,
                    Node::Element(element) => {
                        let attrs = element.attrs.iter().map(|(name, value)| (name, &value[..]));
                        serializer.start_elem(element.name.clone(), attrs)?;
                    }
                    Node::ProcessingInstruction(pi) => {
                        serializer.write_processing_instruction(&pi.target, &pi.data)?;
                    }
                    Node::Document | Node::Fragment => {}
                },
                Edge::Close(node) => {
                    if let Some(element) = node.value().as_element() {
                        serializer.end_elem(element.name.clone())?;
                    }
                }
            }
        }

        Ok(())
    }
}

impl Document {
    /// Renders the whole document as HTML5.
    pub fn serialize(&self) -> String {
        self.outer_html(self.root_id())
    }

    /// Renders `id` and its descendants.
    pub fn outer_html(&self, id: NodeId) -> String {
        self.render(id, TraversalScope::IncludeNode)
    }

    /// Renders the children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        // The parent's name decides whether text is escaped, e.g. in <script>.
        let parent = self.element(id).map(|e| e.name.clone());
        self.render(id, TraversalScope::ChildrenOnly(parent))
    }

    fn render(&self, id: NodeId, traversal_scope: TraversalScope) -> String {
        let Some(node) = self.node(id) else { return String::new() };
        let opts = SerializeOpts { traversal_scope, ..SerializeOpts::default() };
        let mut output = Vec::new();
        // Writing into a `Vec` cannot fail.
        let _ = serialize(&mut output, &Subtree { node }, opts);
        match String::from_utf8(output) {
            Ok(html) => html,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}
