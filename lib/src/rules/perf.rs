use crate::dom::{Document, ElementExt};
use crate::rules::{apply_all, head, Page, Rule};
use crate::upsert::{self, Change, Desired, Insertion, Locator, Policy, RuleError, Scope, Upsert};

/// Adds `defer` to external scripts that are neither async, modules, nor
/// excluded by the site's `defer_exclude` patterns.
pub struct ScriptDefer;

/// Preconnect hints for Google Fonts, when the document uses them.
pub struct FontPreconnect;

/// The site's critical stylesheet, inlined at the top of `<head>`.
pub struct CriticalCss;

const FONTS_API: &str = "https://fonts.googleapis.com";
const FONTS_STATIC: &str = "https://fonts.gstatic.com";

impl Rule for ScriptDefer {
    fn name(&self) -> &'static str {
        "script-defer"
    }

    fn apply(&self, doc: &mut Document, page: &Page<'_>) -> Result<Change, RuleError> {
        let exclude = &page.site.defer_exclude;
        let scripts = Locator::new("script").has("src");
        upsert::apply_each(doc, self.name(), &scripts, Policy::FillMissing, |doc, id| {
            let script = doc.element(id)?;
            let src = script.attr("src")?;
            let skip = script.has_attr("defer")
                || script.has_attr("async")
                || script.attr("type").map_or(false, |t| t.trim().eq_ignore_ascii_case("module"))
                || exclude.iter().any(|pattern| !pattern.is_empty() && src.contains(pattern.as_str()));

            (!skip).then(|| Desired::new().flag("defer"))
        })
    }
}

impl Rule for FontPreconnect {
    fn name(&self) -> &'static str {
        "font-preconnect"
    }

    fn apply(&self, doc: &mut Document, _: &Page<'_>) -> Result<Change, RuleError> {
        let uses_fonts = doc.elements(doc.root_id())
            .filter(|(_, e)| e.is("link"))
            .any(|(_, e)| e.attr("href").map_or(false, |href| href.contains("fonts.googleapis.com")));

        if !uses_fonts {
            return Ok(Change::none());
        }

        let hint = |origin: &str| {
            let locator = Locator::new("link").token("rel", "preconnect").attr("href", origin);
            Upsert::new(self.name(), locator.within(Scope::Head), Insertion::Prepend(head()), Policy::CreateOnly)
        };

        // Prepended in reverse so the API origin comes first.
        apply_all(doc, [
            (hint(FONTS_STATIC), Some(Desired::new().flag("crossorigin"))),
            (hint(FONTS_API), Some(Desired::new())),
        ])
    }
}

impl Rule for CriticalCss {
    fn name(&self) -> &'static str {
        "critical-css"
    }

    fn apply(&self, doc: &mut Document, page: &Page<'_>) -> Result<Change, RuleError> {
        let resource = &page.site.resources.critical_css;
        let locator = resource.locator("style").within(Scope::Head);
        let upsert = Upsert::new(self.name(), locator, Insertion::Prepend(head()), Policy::Replace);
        upsert::apply(doc, &upsert, |doc, existing| resource.synthesize(doc, existing, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::Resource;
    use crate::rules::test_support::*;

    #[test]
    fn scripts_are_deferred_unless_excluded() {
        let site = site();
        let page = Page::new(&site, "post.html");
        let html = concat!(
            "<script src=\"app.js\"></script>",
            "<script src=\"js/loadHeader.js\"></script>",
            "<script src=\"jquery.min.js\"></script>",
            "<script src=\"mod.js\" type=\"module\"></script>",
            "<script src=\"a.js\" async></script>",
            "<script>inline()</script>",
        );

        let mut doc = Document::parse(html).unwrap();
        let change = apply_twice(&ScriptDefer, &mut doc, &page);
        assert_eq!(change.notes.len(), 1);
        let html = doc.serialize();
        assert!(html.contains("<head><script src=\"app.js\" defer=\"\"></script><script src=\"js/loadHeader.js\"></script>"));
        assert!(html.contains("<script src=\"a.js\" async=\"\"></script><script>inline()</script>"));
    }

    #[test]
    fn preconnect_only_with_google_fonts() {
        let site = site();
        let page = Page::new(&site, "post.html");
        let mut doc = Document::parse("<head><link rel=stylesheet href=style.css></head>").unwrap();
        assert!(!FontPreconnect.apply(&mut doc, &page).unwrap().changed);

        let html = "<head><link rel=stylesheet href=\"https://fonts.googleapis.com/css?family=Hind\"></head>";
        let mut doc = Document::parse(html).unwrap();
        apply_twice(&FontPreconnect, &mut doc, &page);
        assert!(doc.serialize().contains(concat!(
            "<head><link rel=\"preconnect\" href=\"https://fonts.googleapis.com\">",
            "<link rel=\"preconnect\" href=\"https://fonts.gstatic.com\" crossorigin=\"\">",
        )));
    }

    #[test]
    fn critical_css_is_versioned() {
        let mut site = site();
        let page = Page::new(&site, "post.html");
        let mut doc = Document::parse("<head><title>x</title></head>").unwrap();
        apply_twice(&CriticalCss, &mut doc, &page);
        assert!(doc.serialize().contains("<head><style data-resource=\"critical-css\" data-version=\"1\">"));

        site.resources.critical_css = Resource::new("critical-css", 2, "body { margin: 1px; }");
        let page = Page::new(&site, "post.html");
        assert!(apply_twice(&CriticalCss, &mut doc, &page).changed);
        let html = doc.serialize();
        assert_eq!(html.matches("<style").count(), 1);
        assert!(html.contains("data-version=\"2\">\nbody { margin: 1px; }\n</style>"));
    }
}
