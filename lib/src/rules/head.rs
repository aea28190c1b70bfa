use crate::dom::{Document, ElementExt};
use crate::rules::{head, Page, Rule};
use crate::upsert::{self, Change, Desired, Insertion, Locator, Policy, RuleError, Scope, Upsert};
use crate::util::{collapse_whitespace, truncate_with_ellipsis, ELLIPSIS};

pub struct HtmlLang;
pub struct Title;
pub struct MetaDescription;
pub struct Canonical;
pub struct Robots;

pub(crate) fn description_locator() -> Locator {
    Locator::new("meta").attr("name", "description").within(Scope::Head)
}

/// The text of the document's `<title>`, if it has a non-empty one.
pub(crate) fn current_title(doc: &Document) -> Option<String> {
    let title = Locator::new("title").within(Scope::Head).locate(doc).first?;
    let text = collapse_whitespace(&doc.text_content(title)).into_owned();
    (!text.is_empty()).then_some(text)
}

/// The `content` of the document's description, if non-empty.
pub(crate) fn current_description(doc: &Document) -> Option<String> {
    let meta = description_locator().locate(doc).first?;
    let content = doc.element(meta)?.attr("content")?.trim();
    (!content.is_empty()).then(|| content.to_string())
}

fn first_text(doc: &Document, names: &[&str]) -> Option<String> {
    let root = doc.body().unwrap_or(doc.root_id());
    doc.elements(root)
        .filter(|(_, e)| names.iter().any(|n| e.is(n)))
        .map(|(id, _)| collapse_whitespace(&doc.text_content(id)).into_owned())
        .find(|text| !text.is_empty())
}

/// Normalizes `raw` into `<base><suffix>` of at most `max` characters.
///
/// The base is `raw` without any `|`-delimited tail. If that is empty,
/// `fallback` provides it.
pub fn normalize_title<F>(raw: &str, suffix: &str, max: usize, fallback: F) -> String
    where F: FnOnce() -> String
{
    let raw = raw.trim();
    let raw = match suffix.trim() {
        "" => raw,
        trimmed => raw.strip_suffix(trimmed).unwrap_or(raw),
    };

    let base = raw.split('|').next().unwrap_or("");
    let mut base = collapse_whitespace(base).into_owned();
    if base.is_empty() {
        base = collapse_whitespace(&fallback()).into_owned();
    }

    let budget = max.saturating_sub(suffix.chars().count()).max(ELLIPSIS.len());
    let base = truncate_with_ellipsis(&base, budget);
    format!("{base}{suffix}")
}

impl Rule for HtmlLang {
    fn name(&self) -> &'static str {
        "html-lang"
    }

    fn apply(&self, doc: &mut Document, page: &Page<'_>) -> Result<Change, RuleError> {
        let html = Locator::new("html");
        let upsert = Upsert::new(self.name(), html.clone(), Insertion::Append(html), Policy::FillMissing);
        let language = &page.site.language;
        upsert::apply(doc, &upsert, |_, _| Some(Desired::new().attr("lang", language)))
    }
}

impl Rule for Title {
    fn name(&self) -> &'static str {
        "title"
    }

    fn apply(&self, doc: &mut Document, page: &Page<'_>) -> Result<Change, RuleError> {
        let locator = Locator::new("title").within(Scope::Head);
        let upsert = Upsert::new(self.name(), locator, Insertion::Append(head()), Policy::Replace);
        let site = page.site;
        upsert::apply(doc, &upsert, |doc, existing| {
            let raw = existing.map(|id| doc.text_content(id)).unwrap_or_default();
            let title = normalize_title(&raw, &site.title_suffix(), site.title_max, || {
                let words = first_text(doc, &["h1"]).unwrap_or_else(|| page.file_words());
                if words.is_empty() { "Untitled".into() } else { words }
            });

            Some(Desired::new().text(title))
        })
    }
}

impl Rule for MetaDescription {
    fn name(&self) -> &'static str {
        "meta-description"
    }

    fn apply(&self, doc: &mut Document, page: &Page<'_>) -> Result<Change, RuleError> {
        let upsert = Upsert::new(self.name(), description_locator(), Insertion::Append(head()), Policy::Replace);
        let site = page.site;
        upsert::apply(doc, &upsert, |doc, _| {
            let text = current_description(doc)
                .or_else(|| first_text(doc, &["p"]))
                .or_else(|| first_text(doc, &["h1", "h2", "h3"]))
                .unwrap_or_else(|| site.default_description.clone());

            let text = collapse_whitespace(&text);
            let description = truncate_with_ellipsis(&text, site.description_max);
            Some(Desired::new().attr("content", &description))
        })
    }
}

impl Rule for Canonical {
    fn name(&self) -> &'static str {
        "canonical"
    }

    fn apply(&self, doc: &mut Document, page: &Page<'_>) -> Result<Change, RuleError> {
        let locator = Locator::new("link").token("rel", "canonical").within(Scope::Head);
        let upsert = Upsert::new(self.name(), locator, Insertion::Append(head()), Policy::Replace);
        let url = page.canonical_url();
        upsert::apply(doc, &upsert, |_, _| Some(Desired::new().attr("href", &url)))
    }
}

impl Rule for Robots {
    fn name(&self) -> &'static str {
        "robots"
    }

    fn apply(&self, doc: &mut Document, page: &Page<'_>) -> Result<Change, RuleError> {
        let locator = Locator::new("meta").attr("name", "robots").within(Scope::Head);
        let upsert = Upsert::new(self.name(), locator, Insertion::Append(head()), Policy::CreateOnly);
        let robots = &page.site.robots;
        upsert::apply(doc, &upsert, |_, _| Some(Desired::new().attr("content", robots)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::*;

    #[test]
    fn titles_are_bounded_and_suffixed() {
        let suffix = " | Example";
        let title = normalize_title("Deep Learning | Old Blog", suffix, 60, String::new);
        assert_eq!(title, "Deep Learning | Example");

        let long = "An Exceedingly Long Title About Transformers, Attention and Everything Else";
        let title = normalize_title(long, suffix, 60, String::new);
        assert_eq!(title.chars().count(), 60);
        assert!(title.ends_with("... | Example"));
        assert_eq!(normalize_title(&title, suffix, 60, String::new), title);

        let title = normalize_title("  | Example", suffix, 60, || "From Heading".into());
        assert_eq!(title, "From Heading | Example");

        let custom = normalize_title("Post - Notes", " - Notes", 60, String::new);
        assert_eq!(custom, "Post - Notes");
    }

    #[test]
    fn title_rule_falls_back_to_heading() {
        let site = site();
        let page = Page::new(&site, "post.html");
        let mut doc = Document::parse("<html><head></head><body><h1>Hello  World</h1></body></html>").unwrap();
        apply_twice(&Title, &mut doc, &page);
        assert_eq!(current_title(&doc).as_deref(), Some("Hello World | Example"));
    }

    #[test]
    fn description_prefers_existing_then_paragraph() {
        let site = site();
        let page = Page::new(&site, "post.html");
        let mut doc = Document::parse(BARE).unwrap();
        apply_twice(&MetaDescription, &mut doc, &page);
        assert_eq!(current_description(&doc).as_deref(), Some("Neural networks, from the ground up."));

        let long = "word ".repeat(100);
        let html = format!("<head><meta name=description content=\"{long}\"></head>");
        let mut doc = Document::parse(&html).unwrap();
        apply_twice(&MetaDescription, &mut doc, &page);
        let description = current_description(&doc).unwrap();
        assert!(description.chars().count() <= 160);
        assert!(description.ends_with("..."));
    }

    #[test]
    fn description_defaults_without_text() {
        let site = site();
        let page = Page::new(&site, "post.html");
        let mut doc = Document::parse("<html><head></head><body></body></html>").unwrap();
        MetaDescription.apply(&mut doc, &page).unwrap();
        assert_eq!(current_description(&doc), Some(site.default_description.clone()));
    }

    #[test]
    fn canonical_is_replaced_and_robots_kept() {
        let site = site();
        let page = Page::new(&site, "blog/index.html");
        let html = r#"<head><link rel="canonical" href="http://old/"><meta name="robots" content="noindex"></head>"#;
        let mut doc = Document::parse(html).unwrap();

        assert!(apply_twice(&Canonical, &mut doc, &page).changed);
        assert!(!apply_twice(&Robots, &mut doc, &page).changed);
        assert!(doc.serialize().contains(concat!(
            r#"<head><link rel="canonical" href="https://example.com/blog/">"#,
            r#"<meta name="robots" content="noindex"></head>"#,
        )));
    }

    #[test]
    fn lang_is_filled_not_replaced() {
        let site = site();
        let page = Page::new(&site, "post.html");
        let mut doc = Document::parse("<html lang=\"fr\"><p>x</p></html>").unwrap();
        assert!(!apply_twice(&HtmlLang, &mut doc, &page).changed);

        let mut doc = Document::parse("<html><p>x</p></html>").unwrap();
        assert!(apply_twice(&HtmlLang, &mut doc, &page).changed);
        assert!(doc.serialize().starts_with("<html lang=\"en\">"));

        let mut doc = Document::parse("<p>x</p>").unwrap();
        assert!(apply_twice(&HtmlLang, &mut doc, &page).changed);
        assert!(doc.serialize().starts_with("<html lang=\"en\"><head></head><body><p>x</p>"));
    }

    #[test]
    fn named_references_are_decoded_not_reescaped() {
        let site = site();
        let page = Page::new(&site, "notes.html");
        let html = "<html><head><title>Caf&eacute; &rarr; Notes</title></head>\
            <body><p>Caf&eacute; &hearts; d&eacute;j&agrave; vu &amp; more</p></body></html>";
        let mut doc = Document::parse(html).unwrap();
        apply_twice(&Title, &mut doc, &page);
        apply_twice(&MetaDescription, &mut doc, &page);

        assert_eq!(current_title(&doc).as_deref(), Some("Café → Notes | Example"));
        assert_eq!(current_description(&doc).as_deref(), Some("Café ♥ déjà vu & more"));

        let html = doc.serialize();
        assert!(html.contains("<title>Café → Notes | Example</title>"));
        assert!(html.contains(r#"<meta name="description" content="Café ♥ déjà vu &amp; more">"#));
        assert!(!html.contains("&amp;eacute;") && !html.contains("&amp;rarr;"));
    }
}
