use rustc_hash::FxHashMap;

use crate::dom::{Document, ElementExt, NodeId};
use crate::rules::{Page, Rule};
use crate::upsert::{self, Change, Desired, Locator, Policy, RuleError};
use crate::util::{collapse_whitespace, contains_ignore_case, title_words};

/// Fills in `alt`, `loading` and, for logos, `width`/`height` on every image.
pub struct ImageAttributes;

/// Lazy-loads every iframe that doesn't say otherwise.
pub struct IframeLazy;

fn is_heading(name: &str) -> bool {
    matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// Maps every `<img>` to the text of the nearest heading before it in
/// document order.
fn preceding_headings(doc: &Document) -> FxHashMap<NodeId, String> {
    let mut headings = FxHashMap::default();
    let mut last: Option<String> = None;
    for (id, element) in doc.elements(doc.root_id()) {
        if is_heading(element.name()) {
            let text = collapse_whitespace(&doc.text_content(id)).into_owned();
            if !text.is_empty() {
                last = Some(text);
            }
        } else if element.is("img") {
            if let Some(text) = &last {
                headings.insert(id, text.clone());
            }
        }
    }

    headings
}

/// Alt text for an image without one.
pub fn alt_text(heading: Option<&str>, src: Option<&str>) -> String {
    if let Some(heading) = heading {
        return format!("Image related to {heading}");
    }

    match src.map(title_words) {
        Some(words) if !words.is_empty() => words,
        _ => "Descriptive image".into(),
    }
}

impl Rule for ImageAttributes {
    fn name(&self) -> &'static str {
        "image-attributes"
    }

    fn apply(&self, doc: &mut Document, page: &Page<'_>) -> Result<Change, RuleError> {
        let site = page.site;
        let headings = preceding_headings(doc);
        upsert::apply_each(doc, self.name(), &Locator::new("img"), Policy::FillMissing, |doc, id| {
            let img = doc.element(id)?;
            let src = img.attr("src");
            let alt = alt_text(headings.get(&id).map(|s| s.as_str()), src);
            let mut desired = Desired::new().attr("alt", &alt).attr("loading", "lazy");

            let is_logo = src.map_or(false, |src| contains_ignore_case(src, &site.logo_pattern));
            if is_logo && !site.logo_pattern.is_empty() {
                desired = desired
                    .attr("width", &site.logo_width.to_string())
                    .attr("height", &site.logo_height.to_string());
            }

            Some(desired)
        })
    }
}

impl Rule for IframeLazy {
    fn name(&self) -> &'static str {
        "iframe-lazy"
    }

    fn apply(&self, doc: &mut Document, _: &Page<'_>) -> Result<Change, RuleError> {
        upsert::apply_each(doc, self.name(), &Locator::new("iframe"), Policy::FillMissing, |_, _| {
            Some(Desired::new().attr("loading", "lazy"))
        })
    }
}
