use crate::dom::Document;
use crate::rules::{apply_all, head, Page, Rule};
use crate::rules::head::{current_description, current_title};
use crate::upsert::{Change, Desired, Insertion, Locator, Policy, RuleError, Scope, Upsert};

/// Open Graph properties. Each is created independently and never altered.
pub struct OpenGraph;

/// Twitter card fields. Each is created independently and never altered.
pub struct TwitterCard;

/// The values social cards share: the page's normalized metadata.
struct Card {
    title: Option<String>,
    description: Option<String>,
    url: String,
    image: String,
}

impl Card {
    fn of(doc: &Document, page: &Page<'_>) -> Self {
        Card {
            title: current_title(doc),
            description: current_description(doc),
            url: page.canonical_url(),
            image: page.site.image.clone(),
        }
    }
}

/// `<meta {key}="{value}" content>` upserts in `<head>`, skipping fields
/// without a value.
fn meta_fields<'a, I>(rule: &'a str, key: &'a str, fields: I) -> impl Iterator<Item = (Upsert, Option<Desired>)> + 'a
    where I: IntoIterator<Item = (&'a str, Option<String>)> + 'a
{
    fields.into_iter().map(move |(field, content)| {
        let locator = Locator::new("meta").attr(key, field).within(Scope::Head);
        let upsert = Upsert::new(rule, locator, Insertion::Append(head()), Policy::CreateOnly);
        let desired = content.filter(|c| !c.is_empty()).map(|c| Desired::new().attr("content", &c));
        (upsert, desired)
    })
}

impl Rule for OpenGraph {
    fn name(&self) -> &'static str {
        "open-graph"
    }

    fn apply(&self, doc: &mut Document, page: &Page<'_>) -> Result<Change, RuleError> {
        let card = Card::of(doc, page);
        let fields = [
            ("og:type", Some("article".to_string())),
            ("og:title", card.title),
            ("og:description", card.description),
            ("og:url", Some(card.url)),
            ("og:image", Some(card.image)),
        ];

        apply_all(doc, meta_fields(self.name(), "property", fields))
    }
}

impl Rule for TwitterCard {
    fn name(&self) -> &'static str {
        "twitter-card"
    }

    fn apply(&self, doc: &mut Document, page: &Page<'_>) -> Result<Change, RuleError> {
        let card = Card::of(doc, page);
        let fields = [
            ("twitter:card", Some("summary_large_image".to_string())),
            ("twitter:title", card.title),
            ("twitter:description", card.description),
            ("twitter:image", Some(card.image)),
        ];

        apply_all(doc, meta_fields(self.name(), "name", fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::*;

    fn content(doc: &Document, key: &str, value: &str) -> Option<String> {
        let id = Locator::new("meta").attr(key, value).locate(doc).first?;
        doc.element(id)?.attr("content").map(String::from)
    }

    #[test]
    fn cards_use_page_metadata() {
        let site = site();
        let page = Page::new(&site, "post.html");
        let html = "<head><title>Post | Example</title><meta name=description content=\"About things\"></head>";
        let mut doc = Document::parse(html).unwrap();
        apply_twice(&OpenGraph, &mut doc, &page);
        apply_twice(&TwitterCard, &mut doc, &page);

        assert_eq!(content(&doc, "property", "og:title").as_deref(), Some("Post | Example"));
        assert_eq!(content(&doc, "property", "og:url").as_deref(), Some("https://example.com/post.html"));
        assert_eq!(content(&doc, "name", "twitter:card").as_deref(), Some("summary_large_image"));
        assert_eq!(content(&doc, "name", "twitter:description").as_deref(), Some("About things"));
    }

    #[test]
    fn custom_values_are_kept() {
        let site = site();
        let page = Page::new(&site, "post.html");
        let html = "<head><title>Post</title><meta property=\"og:title\" content=\"Hand Written\"></head>";
        let mut doc = Document::parse(html).unwrap();
        let change = apply_twice(&OpenGraph, &mut doc, &page);
        assert!(change.changed);
        assert_eq!(content(&doc, "property", "og:title").as_deref(), Some("Hand Written"));
        assert_eq!(doc.serialize().matches("og:title").count(), 1);
    }

    #[test]
    fn missing_values_are_skipped() {
        let site = site();
        let page = Page::new(&site, "post.html");
        let mut doc = Document::parse("<head></head>").unwrap();
        apply_twice(&TwitterCard, &mut doc, &page);
        assert!(content(&doc, "name", "twitter:title").is_none());
        assert!(content(&doc, "name", "twitter:image").is_some());
    }
}
