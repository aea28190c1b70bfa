use serde_json::{json, Value};

use crate::dom::Document;
use crate::rules::{head, Page, Rule};
use crate::rules::head::{current_description, current_title};
use crate::site::Site;
use crate::upsert::{self, Change, Desired, Insertion, Locator, Policy, RuleError, Upsert};

/// A schema.org `BlogPosting` JSON-LD block, created once if the document has
/// no JSON-LD at all.
pub struct StructuredData;

/// The `BlogPosting` object for a page.
pub fn blog_posting(site: &Site, headline: &str, description: &str, url: &str) -> Value {
    json!({
        "@context": "https://schema.org",
        "@type": "BlogPosting",
        "headline": headline,
        "description": description,
        "image": site.image,
        "author": {
            "@type": "Person",
            "name": site.author,
        },
        "publisher": {
            "@type": "Organization",
            "name": site.publisher,
            "logo": {
                "@type": "ImageObject",
                "url": site.image,
            }
        },
        "mainEntityOfPage": {
            "@type": "WebPage",
            "@id": url,
        }
    })
}

/// Renders `value` for a `<script>` body: `</` never appears in the output.
pub fn script_json(value: &Value) -> String {
    value.to_string().replace("</", "<\\/")
}

impl Rule for StructuredData {
    fn name(&self) -> &'static str {
        "structured-data"
    }

    fn apply(&self, doc: &mut Document, page: &Page<'_>) -> Result<Change, RuleError> {
        let locator = Locator::new("script").attr("type", "application/ld+json");
        let upsert = Upsert::new(self.name(), locator, Insertion::Append(head()), Policy::CreateOnly);
        upsert::apply(doc, &upsert, |doc, _| {
            let headline = current_title(doc).unwrap_or_else(|| page.file_words());
            let description = current_description(doc)
                .unwrap_or_else(|| page.site.default_description.clone());

            let posting = blog_posting(page.site, &headline, &description, &page.canonical_url());
            Some(Desired::new().text(script_json(&posting)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::*;

    #[test]
    fn block_is_created_once_and_parses() {
        let site = site();
        let page = Page::new(&site, "notes/post.html");
        let html = "<head><title>A </script> trap | Example</title></head>";
        let mut doc = Document::parse(html).unwrap();
        assert!(apply_twice(&StructuredData, &mut doc, &page).changed);

        let script = Locator::new("script").attr("type", "application/ld+json").locate(&doc);
        assert_eq!(script.count, 1);
        let body = doc.text_content(script.first.unwrap());
        assert!(!body.contains("</script"));

        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["@type"], "BlogPosting");
        assert_eq!(value["headline"], "A </script> trap | Example");
        assert_eq!(value["mainEntityOfPage"]["@id"], "https://example.com/notes/post.html");
        assert_eq!(value["publisher"]["logo"]["url"], site.image.as_str());
    }

    #[test]
    fn existing_json_ld_is_left_alone() {
        let site = site();
        let page = Page::new(&site, "post.html");
        let html = r#"<head><script type="application/ld+json">{"@type":"Person"}</script></head>"#;
        let mut doc = Document::parse(html).unwrap();
        let before = doc.serialize();
        assert!(!StructuredData.apply(&mut doc, &page).unwrap().changed);
        assert_eq!(doc.serialize(), before);
        assert!(before.contains(html));
    }
}
