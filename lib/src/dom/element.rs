use html5ever::{namespace_url, ns, LocalName, QualName};
use scraper::StrTendril;

pub use scraper::node::Element;

/// A new HTML element named `name`, without attributes.
pub fn element(name: &str) -> Element {
    let name = QualName::new(None, ns!(html), LocalName::from(name.to_ascii_lowercase()));
    Element::new(name, vec![])
}

fn attribute_name(name: &str) -> QualName {
    QualName::new(None, ns!(), LocalName::from(name.to_ascii_lowercase()))
}

/// Queries and edits on parsed elements.
///
/// Attribute names are matched case-insensitively, as the parser lowercases
/// them. A valueless attribute like `defer` reads as `""`.
pub trait ElementExt {
    fn is(&self, name: &str) -> bool;

    fn has_attr(&self, name: &str) -> bool;

    /// Whether the whitespace-separated list in attribute `name` contains
    /// `token`, ignoring ASCII case.
    fn has_token(&self, name: &str, token: &str) -> bool;

    /// Sets attribute `name`, appending it if absent; `None` sets a valueless
    /// attribute. Returns `true` if the element changed.
    fn set_attr(&mut self, name: &str, value: Option<&str>) -> bool;

    fn with_attr(self, name: &str, value: Option<&str>) -> Self where Self: Sized;
}

impl ElementExt for Element {
    fn is(&self, name: &str) -> bool {
        self.name().eq_ignore_ascii_case(name)
    }

    fn has_attr(&self, name: &str) -> bool {
        self.attrs.contains_key(&attribute_name(name))
    }

    fn has_token(&self, name: &str, token: &str) -> bool {
        self.attrs.get(&attribute_name(name)).map_or(false, |list| {
            list.split_ascii_whitespace().any(|t| t.eq_ignore_ascii_case(token))
        })
    }

    fn set_attr(&mut self, name: &str, value: Option<&str>) -> bool {
        let name = attribute_name(name);
        let value = value.unwrap_or("");
        if self.attrs.get(&name).map_or(false, |current| &**current == value) {
            return false;
        }

        self.attrs.insert(name, StrTendril::from(value));
        true
    }

    fn with_attr(mut self, name: &str, value: Option<&str>) -> Self {
        self.set_attr(name, value);
        self
    }
}
