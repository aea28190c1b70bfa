//! Idempotent locate-or-create edits on a [`Document`].
//!
//! An [`Upsert`] names the element it is responsible for with a [`Locator`],
//! says where a missing element goes with an [`Insertion`], and decides how an
//! existing element is reconciled with a [`Policy`]. [`apply`] runs the
//! synthesizer, compares, edits and reports a [`Change`]. Applying the same
//! upsert twice never changes a document the second time.

use std::fmt;

use crate::dom::{self, Document, Element, ElementExt, NodeId};

/// Where a locator searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    Document,
    Head,
    Body,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Attribute equals a value, ignoring ASCII case.
    Equals(String, String),
    /// Attribute is a whitespace-separated list containing a token.
    Token(String, String),
    /// Attribute is present with any value.
    Present(String),
}

/// Identifies the element playing a semantic role in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub tag: String,
    pub scope: Scope,
    pub predicates: Vec<Predicate>,
}

/// The result of a locator search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    /// The canonical match: first in document order.
    pub first: Option<NodeId>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insertion {
    /// Last child of the anchor.
    Append(Locator),
    /// First child of the anchor.
    Prepend(Locator),
    /// Previous sibling of the anchor.
    Before(Locator),
    /// Next sibling of the anchor.
    After(Locator),
}

/// How an existing element is reconciled with the desired one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Differing attributes and content are overwritten.
    Replace,
    /// Only absent or blank attributes and empty content are filled in.
    FillMissing,
    /// An existing element is left alone.
    CreateOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Text, escaped as needed when written.
    Text(String),
    /// An HTML fragment, parsed when written.
    Markup(String),
}

/// What a synthesizer wants the located element to look like.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Desired {
    pub attributes: Vec<(String, Option<String>)>,
    pub content: Option<Content>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upsert {
    pub name: String,
    pub locator: Locator,
    pub insertion: Insertion,
    pub policy: Policy,
}

/// What an edit did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Change {
    pub changed: bool,
    /// A short description of each edit made.
    pub notes: Vec<String>,
    /// More than one element matched a locator; only the first was used.
    pub ambiguous: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// The element a new element is inserted relative to does not exist.
    MissingInsertionPoint { rule: String, anchor: String },
}

impl Scope {
    /// The node searches in this scope start from, if it exists.
    pub fn root(self, doc: &Document) -> Option<NodeId> {
        match self {
            Scope::Document => Some(doc.root_id()),
            Scope::Head => doc.head(),
            Scope::Body => doc.body(),
        }
    }
}

impl Locator {
    /// A locator for `<tag>` elements; `*` matches any element.
    pub fn new(tag: &str) -> Self {
        Locator { tag: tag.to_ascii_lowercase(), scope: Scope::Document, predicates: vec![] }
    }

    pub fn within(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.predicates.push(Predicate::Equals(name.into(), value.into()));
        self
    }

    pub fn token(mut self, name: &str, token: &str) -> Self {
        self.predicates.push(Predicate::Token(name.into(), token.into()));
        self
    }

    pub fn has(mut self, name: &str) -> Self {
        self.predicates.push(Predicate::Present(name.into()));
        self
    }

    /// A locator for the element with class `class`.
    pub fn class(tag: &str, class: &str) -> Self {
        Locator::new(tag).token("class", class)
    }

    pub fn matches(&self, element: &Element) -> bool {
        (self.tag == "*" || element.is(&self.tag)) && self.predicates.iter().all(|p| match p {
            Predicate::Equals(name, value) => element.attr(name)
                .map_or(false, |v| v.trim().eq_ignore_ascii_case(value)),
            Predicate::Token(name, token) => element.has_token(name, token),
            Predicate::Present(name) => element.has_attr(name),
        })
    }

    /// Every match in document order.
    pub fn locate_all(&self, doc: &Document) -> Vec<NodeId> {
        let Some(root) = self.scope.root(doc) else { return vec![] };
        doc.elements(root)
            .filter(|(_, e)| self.matches(e))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn locate(&self, doc: &Document) -> Located {
        let all = self.locate_all(doc);
        Located { first: all.first().copied(), count: all.len() }
    }

    /// The attributes a newly created element needs for this locator to find it.
    fn identifying_attributes(&self) -> Vec<(String, Option<String>)> {
        self.predicates.iter()
            .filter_map(|p| match p {
                Predicate::Equals(name, value) | Predicate::Token(name, value) => {
                    Some((name.clone(), Some(value.clone())))
                }
                Predicate::Present(_) => None,
            })
            .collect()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.tag)?;
        for predicate in &self.predicates {
            match predicate {
                Predicate::Equals(name, value) => write!(f, " {name}=\"{value}\"")?,
                Predicate::Token(name, token) => write!(f, " {name}~=\"{token}\"")?,
                Predicate::Present(name) => write!(f, " {name}")?,
            }
        }

        write!(f, ">")
    }
}

impl Insertion {
    pub fn anchor(&self) -> &Locator {
        match self {
            Insertion::Append(l) | Insertion::Prepend(l)
                | Insertion::Before(l) | Insertion::After(l) => l,
        }
    }
}

impl Desired {
    pub fn new() -> Self {
        Desired::default()
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((name.into(), Some(value.into())));
        self
    }

    /// A valueless attribute, like `defer`.
    pub fn flag(mut self, name: &str) -> Self {
        self.attributes.push((name.into(), None));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.content = Some(Content::Text(text.into()));
        self
    }

    pub fn markup(mut self, markup: impl Into<String>) -> Self {
        self.content = Some(Content::Markup(markup.into()));
        self
    }
}

impl Upsert {
    pub fn new(name: &str, locator: Locator, insertion: Insertion, policy: Policy) -> Self {
        Upsert { name: name.into(), locator, insertion, policy }
    }
}

impl Change {
    pub fn none() -> Self {
        Change::default()
    }

    pub fn changed(note: impl Into<String>) -> Self {
        Change { changed: true, notes: vec![note.into()], ambiguous: false }
    }

    pub fn merge(&mut self, other: Change) {
        self.changed |= other.changed;
        self.ambiguous |= other.ambiguous;
        self.notes.extend(other.notes);
    }
}

impl FromIterator<Change> for Change {
    fn from_iter<I: IntoIterator<Item = Change>>(iter: I) -> Self {
        let mut total = Change::none();
        iter.into_iter().for_each(|change| total.merge(change));
        total
    }
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleError::MissingInsertionPoint { rule, anchor } => {
                write!(f, "{rule}: insertion point {anchor} not found")
            }
        }
    }
}

impl std::error::Error for RuleError { }

/// Locates, reconciles or creates the element `upsert` is responsible for.
///
/// `synthesize` is handed the document and the canonical existing match, if
/// any, and returns the desired element; `None` means there is nothing to say
/// and the document is left alone.
pub fn apply<F>(doc: &mut Document, upsert: &Upsert, synthesize: F) -> Result<Change, RuleError>
    where F: FnOnce(&Document, Option<NodeId>) -> Option<Desired>
{
    let located = upsert.locator.locate(doc);
    let ambiguous = located.count > 1;
    if ambiguous {
        log::warn!("{}: {} elements match {}; using the first",
            upsert.name, located.count, upsert.locator);
    }

    let mut change = match located.first {
        Some(_) if upsert.policy == Policy::CreateOnly => Change::none(),
        Some(id) => match synthesize(doc, Some(id)) {
            Some(desired) => reconcile(doc, upsert, id, desired)?,
            None => Change::none(),
        },
        None => match synthesize(doc, None) {
            Some(desired) => create(doc, upsert, desired)?,
            None => Change::none(),
        },
    };

    change.ambiguous = ambiguous;
    Ok(change)
}

/// Reconciles every element matching `locator` independently. The synthesizer
/// runs once per match; creation never happens.
pub fn apply_each<F>(doc: &mut Document, name: &str, locator: &Locator, policy: Policy, mut synthesize: F)
    -> Result<Change, RuleError>
    where F: FnMut(&Document, NodeId) -> Option<Desired>
{
    let upsert = Upsert::new(name, locator.clone(), Insertion::Append(locator.clone()), policy);
    let mut total = Change::none();
    if policy == Policy::CreateOnly {
        return Ok(total);
    }

    for id in locator.locate_all(doc) {
        if let Some(desired) = synthesize(doc, id) {
            total.merge(reconcile(doc, &upsert, id, desired)?);
        }
    }

    Ok(total)
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

fn reconcile(doc: &mut Document, upsert: &Upsert, id: NodeId, desired: Desired) -> Result<Change, RuleError> {
    let mut change = Change::none();
    let Some(tag) = doc.element(id).map(|e| e.name().to_string()) else { return Ok(change) };
    for (name, value) in &desired.attributes {
        let set = doc.update_element(id, |element| {
            let should_set = match upsert.policy {
                Policy::Replace => true,
                Policy::FillMissing => match value {
                    Some(_) => is_blank(element.attr(name)),
                    None => !element.has_attr(name),
                },
                Policy::CreateOnly => false,
            };

            should_set && element.set_attr(name, value.as_deref())
        });

        if set == Some(true) {
            log::debug!("{}: set {name} on <{tag}>", upsert.name);
            change.merge(Change::changed(format!("set {name} on <{tag}>")));
        }
    }

    let Some(content) = desired.content else { return Ok(change) };
    let current = match &content {
        Content::Text(_) => doc.text_content(id),
        Content::Markup(_) => doc.inner_html(id),
    };

    let should_write = match upsert.policy {
        Policy::Replace => match &content {
            Content::Text(text) => current != *text,
            Content::Markup(markup) => current.trim() != Document::normalize_fragment(markup).trim(),
        },
        Policy::FillMissing => current.trim().is_empty(),
        Policy::CreateOnly => false,
    };

    if should_write {
        let children = content_nodes(doc, &content);
        doc.replace_children(id, children);
        log::debug!("{}: rewrote content of <{tag}>", upsert.name);
        change.merge(Change::changed(format!("rewrote <{tag}> content")));
    }

    Ok(change)
}

fn content_nodes(doc: &mut Document, content: &Content) -> Vec<NodeId> {
    match content {
        Content::Text(text) if text.is_empty() => vec![],
        Content::Text(text) => vec![doc.create_text(text)],
        Content::Markup(markup) => doc.parse_fragment(markup),
    }
}

fn create(doc: &mut Document, upsert: &Upsert, desired: Desired) -> Result<Change, RuleError> {
    let anchor_locator = upsert.insertion.anchor();
    let Some(anchor) = anchor_locator.locate(doc).first else {
        return Err(RuleError::MissingInsertionPoint {
            rule: upsert.name.clone(),
            anchor: anchor_locator.to_string(),
        });
    };

    let mut element: Element = dom::element(&upsert.locator.tag);
    for (name, value) in upsert.locator.identifying_attributes() {
        element.set_attr(&name, value.as_deref());
    }

    for (name, value) in &desired.attributes {
        element.set_attr(name, value.as_deref());
    }

    let id = doc.create_element(element);
    if let Some(content) = &desired.content {
        for child in content_nodes(doc, content) {
            doc.append_child(id, child);
        }
    }

    let inserted = match &upsert.insertion {
        Insertion::Append(_) => { doc.append_indented(anchor, id); true }
        Insertion::Prepend(_) => { doc.prepend_indented(anchor, id); true }
        Insertion::Before(_) => doc.insert_before_indented(anchor, id),
        Insertion::After(_) => doc.insert_after_indented(anchor, id),
    };

    if !inserted {
        return Err(RuleError::MissingInsertionPoint {
            rule: upsert.name.clone(),
            anchor: anchor_locator.to_string(),
        });
    }

    log::debug!("{}: created {}", upsert.name, upsert.locator);
    Ok(Change::changed(format!("created {}", upsert.locator)))
}
