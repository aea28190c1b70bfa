//! A toolkit for keeping the metadata of static HTML sites in order.
//!
//! # Overview
//!
//! Warbler post-processes finished HTML files in place. Every document is run
//! through a fixed, ordered list of [rules](rules): titles, descriptions,
//! canonical links, social cards, structured data, image and script
//! attributes, and optional snippets such as a dark-mode toggle. Each rule is
//! an _upsert_: it locates the element it is responsible for, creates it when
//! missing and reconciles it when stale, and reports whether it changed
//! anything. Running the rules twice is the same as running them once.
//!
//! ## Processing
//!
//! A site is typically processed as follows:
//!
//! 1. The site directory is walked with [`FsTree`](fstree::FsTree), pruning
//!    excluded directories and files.
//! 2. Each document is loaded from a [`DocumentSource`](storage::DocumentSource)
//!    and parsed into a [`Document`](dom::Document) with the HTML5 parsing
//!    algorithm.
//! 3. The rules are applied in order. A rule that cannot run, say for lack of
//!    an insertion point, is skipped and the rest proceed.
//! 4. If any rule changed the document, it is serialized and stored through a
//!    [`DocumentSink`](storage::DocumentSink). A document no rule changed is
//!    never serialized, so its file keeps its exact bytes.
//!
//! [`Pipeline`] does steps 2-4 for many documents in parallel, containing
//! failures to the document they occur in. A [`sitemap`] for the same set of
//! documents can be rendered from their paths and modification times.

#[macro_use]
pub mod error;
pub mod util;
pub mod url;
pub mod dom;
pub mod upsert;
pub mod resources;
pub mod site;
pub mod rules;
pub mod storage;
pub mod fstree;
pub mod pipeline;
pub mod sitemap;

pub use site::{RuleSettings, Site};
pub use pipeline::{Pipeline, Summary};
pub use dom::Document;

pub use rayon;
