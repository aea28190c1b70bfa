//! The HTML document model, built on `scraper`'s html5ever tree.
//!
//! [`Document::parse`] runs the HTML5 parsing algorithm, so character
//! references, implied tags and misnested markup are handled the way browsers
//! handle them. Serialization re-renders the whole tree; callers that must not
//! touch unchanged files compare before writing.

mod element;
mod parse;
mod tree;
mod serialize;

pub use element::{element, Element, ElementExt};
pub use parse::{ParseError, ParseErrorKind};
pub use tree::{Document, NodeId};
pub use scraper::Node;
