//! The metadata rules, applied to every document in a fixed order.
//!
//! | #  | rule               | what it maintains                              |
//! |----|--------------------|------------------------------------------------|
//! | 1  | `html-lang`        | `<html lang>`                                  |
//! | 2  | `title`            | a bounded `<title>` ending in the site suffix  |
//! | 3  | `meta-description` | a bounded `<meta name="description">`          |
//! | 4  | `canonical`        | `<link rel="canonical">`                       |
//! | 5  | `robots`           | `<meta name="robots">`                         |
//! | 6  | `open-graph`       | `og:*` properties                              |
//! | 7  | `twitter-card`     | `twitter:*` cards                              |
//! | 8  | `structured-data`  | a schema.org `BlogPosting` JSON-LD block       |
//! | 9  | `image-attributes` | `alt`, `loading` and logo dimensions on images |
//! | 10 | `script-defer`     | `defer` on external scripts                    |
//! | 11 | `iframe-lazy`      | `loading="lazy"` on iframes                    |
//! | 12 | `font-preconnect`  | preconnect hints for Google Fonts              |
//! | 13 | `critical-css`     | an inline critical stylesheet (opt-in)         |
//! | 14 | `dark-mode`        | dark-mode stylesheet, toggle, script (opt-in)  |
//! | 15 | `share-buttons`    | social sharing buttons (opt-in)                |
//!
//! Later rules read what earlier ones wrote: social cards and structured data
//! use the normalized title, description and canonical URL.

use crate::dom::Document;
use crate::site::Site;
use crate::upsert::{self, Change, Locator, RuleError, Upsert};
use crate::util::title_words;

mod head;
mod social;
mod structured;
mod media;
mod perf;
mod theme;

pub use head::*;
pub use social::*;
pub use structured::*;
pub use media::*;
pub use perf::*;
pub use theme::*;

/// The document being processed and where it lives.
#[derive(Debug, Clone, Copy)]
pub struct Page<'a> {
    pub site: &'a Site,
    /// Path relative to the site root, `/`-separated.
    pub path: &'a str,
}

pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, doc: &mut Document, page: &Page<'_>) -> Result<Change, RuleError>;
}

impl<'a> Page<'a> {
    pub fn new(site: &'a Site, path: &'a str) -> Self {
        Page { site, path }
    }

    pub fn canonical_url(&self) -> String {
        self.site.canonicalize(self.path)
    }

    /// Words derived from the file name, e.g. `Deep Learning` for
    /// `blog/deep_learning.html`. The index file is named after its directory.
    pub fn file_words(&self) -> String {
        let path = match self.path.strip_suffix(self.site.index_file.as_str()) {
            Some(dir) if dir.is_empty() || dir.ends_with('/') => dir.trim_end_matches('/'),
            _ => self.path,
        };

        title_words(path)
    }
}

/// The standard rule list, in application order, honoring `site.rules`.
pub fn standard(site: &Site) -> Vec<Box<dyn Rule>> {
    let settings = &site.rules;
    let mut rules: Vec<Box<dyn Rule>> = vec![
        Box::new(HtmlLang),
        Box::new(Title),
        Box::new(MetaDescription),
        Box::new(Canonical),
        Box::new(Robots),
        Box::new(OpenGraph),
        Box::new(TwitterCard),
        Box::new(StructuredData),
        Box::new(ImageAttributes),
        Box::new(ScriptDefer),
        Box::new(IframeLazy),
        Box::new(FontPreconnect),
    ];

    if settings.critical_css {
        rules.push(Box::new(CriticalCss));
    }

    if settings.dark_mode {
        rules.push(Box::new(DarkMode));
    }

    if settings.share_buttons {
        rules.push(Box::new(ShareButtons));
    }

    rules.retain(|rule| !settings.disable.iter().any(|name| name == rule.name()));
    rules
}

/// Fails with `MissingInsertionPoint` if `upsert` would have to create its
/// element and the anchor is absent. Lets multi-part rules fail before they
/// change anything.
pub(crate) fn require_anchor(doc: &Document, upsert: &Upsert) -> Result<(), RuleError> {
    let anchor = upsert.insertion.anchor();
    if upsert.locator.locate(doc).first.is_none() && anchor.locate(doc).first.is_none() {
        return Err(RuleError::MissingInsertionPoint {
            rule: upsert.name.clone(),
            anchor: anchor.to_string(),
        });
    }

    Ok(())
}

/// Applies `upserts` with fixed desired content, merging their changes.
pub(crate) fn apply_all<I>(doc: &mut Document, upserts: I) -> Result<Change, RuleError>
    where I: IntoIterator<Item = (Upsert, Option<upsert::Desired>)>
{
    let mut total = Change::none();
    for (upsert, desired) in upserts {
        total.merge(upsert::apply(doc, &upsert, |_, _| desired)?);
    }

    Ok(total)
}

pub(crate) fn head() -> Locator {
    Locator::new("head")
}

pub(crate) fn body() -> Locator {
    Locator::new("body")
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub const BARE: &str = "<!DOCTYPE html>\n<html>\n<head>\n    <meta charset=\"utf-8\">\n    \
        <link href=\"https://fonts.googleapis.com/css?family=Hind\" rel=\"stylesheet\">\n    \
        <title>Deep Learning Basics | Old Blog</title>\n</head>\n<body>\n    <h1>Deep Learning</h1>\n    \
        <div class=\"article-metadata\">Posted today</div>\n    <p>Neural networks, from the ground up.</p>\n    \
        <img src=\"img/neural_net.png\">\n    \
        <iframe src=\"https://www.youtube.com/embed/x\"></iframe>\n    <script src=\"js/app.js\"></script>\n</body>\n</html>\n";

    pub fn site() -> Site {
        let mut site = Site::default();
        site.base_url = "https://example.com".into();
        site.site_name = "Example".into();
        site
    }

    /// Applies `rule` twice, asserting the second application changes nothing.
    pub fn apply_twice(rule: &dyn Rule, doc: &mut Document, page: &Page<'_>) -> Change {
        let first = rule.apply(doc, page).unwrap();
        let snapshot = doc.serialize();
        let second = rule.apply(doc, page).unwrap();
        assert!(!second.changed, "{} changed twice: {:?}", rule.name(), second);
        assert_eq!(doc.serialize(), snapshot);
        first
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::test_support::*;

    #[test]
    fn standard_rules_respect_settings() {
        let mut site = site();
        let names = |site: &Site| standard(site).iter().map(|r| r.name()).collect::<Vec<_>>();
        assert_eq!(names(&site).len(), 12);
        assert_eq!(names(&site)[0], "html-lang");

        site.rules.dark_mode = true;
        site.rules.disable = vec!["robots".into()];
        let names = names(&site);
        assert_eq!(names.len(), 12);
        assert!(names.contains(&"dark-mode"));
        assert!(!names.contains(&"robots"));
    }

    #[test]
    fn file_words_name_pages() {
        let site = site();
        assert_eq!(Page::new(&site, "blog/deep_learning.html").file_words(), "Deep Learning");
        assert_eq!(Page::new(&site, "machine-learning/index.html").file_words(), "Machine Learning");
    }

    #[test]
    fn full_rule_list_is_idempotent() {
        let mut site = site();
        site.rules.dark_mode = true;
        site.rules.share_buttons = true;
        site.rules.critical_css = true;

        let page = Page::new(&site, "deep_learning.html");
        let mut doc = Document::parse(BARE).unwrap();
        for rule in standard(&site) {
            let change = rule.apply(&mut doc, &page).unwrap();
            assert!(change.changed, "{}", rule.name());
        }

        let once = doc.serialize();
        for rule in standard(&site) {
            assert!(!rule.apply(&mut doc, &page).unwrap().changed, "{}", rule.name());
        }

        assert_eq!(doc.serialize(), once);
        let reparsed = Document::parse(&once).unwrap();
        for rule in standard(&site) {
            let mut doc = reparsed.clone();
            assert!(!rule.apply(&mut doc, &page).unwrap().changed, "{}", rule.name());
        }
    }

    #[test]
    fn structured_data_follows_canonical() {
        let site = site();
        let page = Page::new(&site, "post.html");
        let mut doc = Document::parse(BARE).unwrap();
        for rule in standard(&site) {
            rule.apply(&mut doc, &page).unwrap();
        }

        let html = doc.serialize();
        let canonical = html.find("rel=\"canonical\"").unwrap();
        let json_ld = html.find("application/ld+json").unwrap();
        assert!(canonical < json_ld);
        assert_eq!(html.matches("application/ld+json").count(), 1);
    }
}
