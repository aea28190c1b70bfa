use crate::dom::Document;
use crate::resources::Resource;
use crate::rules::{body, head, require_anchor, Page, Rule};
use crate::upsert::{self, Change, Insertion, Locator, Policy, RuleError, Scope, Upsert};

/// Dark-mode support: a stylesheet in `<head>`, a toggle before the article
/// metadata and the toggle script at the end of `<body>`.
pub struct DarkMode;

/// Social sharing buttons after the article metadata.
pub struct ShareButtons;

pub const ARTICLE_METADATA: &str = "article-metadata";
pub const THEME_SWITCH: &str = "theme-switch-wrapper";
pub const SHARE_BUTTONS: &str = "blog-share-buttons";

fn article_metadata() -> Locator {
    Locator::class("*", ARTICLE_METADATA).within(Scope::Body)
}

/// Upserts a resource element, replacing it when its version is stale.
fn upsert_resource(doc: &mut Document, upsert: &Upsert, resource: &Resource, markup: bool)
    -> Result<Change, RuleError>
{
    upsert::apply(doc, upsert, |doc, existing| resource.synthesize(doc, existing, markup))
}

impl Rule for DarkMode {
    fn name(&self) -> &'static str {
        "dark-mode"
    }

    fn apply(&self, doc: &mut Document, page: &Page<'_>) -> Result<Change, RuleError> {
        let resources = &page.site.resources;
        let style = Upsert::new(
            self.name(),
            resources.dark_mode_css.locator("style").within(Scope::Head),
            Insertion::Append(head()),
            Policy::Replace,
        );

        // Keyed by class so toggles added before versioning are upgraded in place.
        let toggle = Upsert::new(
            self.name(),
            Locator::class("div", THEME_SWITCH).within(Scope::Body),
            Insertion::Before(article_metadata()),
            Policy::Replace,
        );

        let script = Upsert::new(
            self.name(),
            resources.dark_mode_script.locator("script").within(Scope::Body),
            Insertion::Append(body()),
            Policy::Replace,
        );

        for part in [&style, &toggle, &script] {
            require_anchor(doc, part)?;
        }

        let mut change = upsert_resource(doc, &style, &resources.dark_mode_css, false)?;
        change.merge(upsert_resource(doc, &toggle, &resources.theme_toggle, true)?);
        change.merge(upsert_resource(doc, &script, &resources.dark_mode_script, false)?);
        Ok(change)
    }
}

impl Rule for ShareButtons {
    fn name(&self) -> &'static str {
        "share-buttons"
    }

    fn apply(&self, doc: &mut Document, page: &Page<'_>) -> Result<Change, RuleError> {
        let upsert = Upsert::new(
            self.name(),
            Locator::class("div", SHARE_BUTTONS).within(Scope::Body),
            Insertion::After(article_metadata()),
            Policy::Replace,
        );

        upsert_resource(doc, &upsert, &page.site.resources.share_buttons, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::*;

    const TOGGLE_CLASS: &str = "class=\"theme-switch-wrapper\"";
    const METADATA_CLASS: &str = "class=\"article-metadata\"";

    #[test]
    fn dark_mode_scaffolding_is_placed_once() {
        let site = site();
        let page = Page::new(&site, "post.html");
        let mut doc = Document::parse(BARE).unwrap();
        assert!(apply_twice(&DarkMode, &mut doc, &page).changed);

        let html = doc.serialize();
        assert_eq!(html.matches("data-resource=\"dark-mode-css\"").count(), 1);
        assert_eq!(html.matches(TOGGLE_CLASS).count(), 1);
        let toggle = html.find(TOGGLE_CLASS).unwrap();
        let metadata = html.find(METADATA_CLASS).unwrap();
        assert!(toggle < metadata);

        let script = html.find("data-resource=\"dark-mode-script\"").unwrap();
        assert!(script > html.find("js/app.js").unwrap());
        let tail = &html[script..];
        let end = tail.find("</script>").unwrap() + "</script>".len();
        assert!(tail[end..].trim_start().starts_with("</body>"));
    }

    #[test]
    fn dark_mode_is_all_or_nothing() {
        let site = site();
        let page = Page::new(&site, "post.html");
        let html = "<html><head></head><body><p>no metadata</p></body></html>";
        let mut doc = Document::parse(html).unwrap();
        let error = DarkMode.apply(&mut doc, &page).unwrap_err();
        assert!(matches!(error, RuleError::MissingInsertionPoint { .. }));
        assert_eq!(doc.serialize(), html);
    }

    #[test]
    fn legacy_toggle_is_upgraded() {
        let site = site();
        let page = Page::new(&site, "post.html");
        let html = concat!(
            "<html><head></head><body>",
            "<div class=\"theme-switch-wrapper\"><span>Old</span></div>",
            "<p class=\"article-metadata\">x</p></body></html>",
        );

        let mut doc = Document::parse(html).unwrap();
        apply_twice(&DarkMode, &mut doc, &page);
        let html = doc.serialize();
        assert_eq!(html.matches(TOGGLE_CLASS).count(), 1);
        assert!(!html.contains("<span>Old</span>"));
        assert!(html.contains("data-resource=\"theme-toggle\""));
    }

    #[test]
    fn share_buttons_follow_metadata() {
        let site = site();
        let page = Page::new(&site, "post.html");
        let mut doc = Document::parse(BARE).unwrap();
        apply_twice(&ShareButtons, &mut doc, &page);

        let html = doc.serialize();
        let metadata = html.find(METADATA_CLASS).unwrap();
        let share = html.find("class=\"blog-share-buttons\"").unwrap();
        assert!(metadata < share && share < html.find("Neural networks").unwrap());
    }
}
