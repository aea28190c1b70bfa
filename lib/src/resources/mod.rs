//! Named, versioned snippets injected into documents.
//!
//! Every injected element carries `data-resource` and `data-version`. A
//! document holding the current version of a resource is left alone; an older
//! version is replaced in place.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::upsert::{Desired, Locator};
use crate::dom::{Document, NodeId};

pub const RESOURCE_ATTR: &str = "data-resource";
pub const VERSION_ATTR: &str = "data-version";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub name: Cow<'static, str>,
    pub version: u32,
    pub body: Cow<'static, str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resources {
    pub critical_css: Resource,
    pub dark_mode_css: Resource,
    pub dark_mode_script: Resource,
    pub theme_toggle: Resource,
    pub share_buttons: Resource,
}

impl Resource {
    pub const fn new(name: &'static str, version: u32, body: &'static str) -> Self {
        Resource { name: Cow::Borrowed(name), version, body: Cow::Borrowed(body) }
    }

    /// Locates the `<tag>` element carrying this resource.
    pub fn locator(&self, tag: &str) -> Locator {
        Locator::new(tag).attr(RESOURCE_ATTR, &self.name)
    }

    /// Whether `id` already holds this version of the resource.
    pub fn is_current(&self, doc: &Document, id: NodeId) -> bool {
        doc.element(id)
            .and_then(|e| e.attr(VERSION_ATTR))
            .map_or(false, |v| v.trim() == self.version.to_string())
    }

    fn tagged(&self) -> Desired {
        Desired::new()
            .attr(RESOURCE_ATTR, &self.name)
            .attr(VERSION_ATTR, &self.version.to_string())
    }

    /// The desired `<style>` or `<script>` element, body as raw text.
    pub fn as_text(&self) -> Desired {
        self.tagged().text(format!("\n{}\n", self.body.trim()))
    }

    /// The desired wrapper element, body as markup.
    pub fn as_markup(&self) -> Desired {
        self.tagged().markup(self.body.trim().to_string())
    }

    /// The desired element for `existing`: `None` if it is already current.
    pub fn synthesize(&self, doc: &Document, existing: Option<NodeId>, markup: bool) -> Option<Desired> {
        if existing.map_or(false, |id| self.is_current(doc, id)) {
            return None;
        }

        Some(if markup { self.as_markup() } else { self.as_text() })
    }
}

impl Default for Resources {
    fn default() -> Self {
        Resources {
            critical_css: Resource::new("critical-css", 1, include_str!("critical.css")),
            dark_mode_css: Resource::new("dark-mode-css", 1, include_str!("dark-mode.css")),
            dark_mode_script: Resource::new("dark-mode-script", 1, include_str!("dark-mode.js")),
            theme_toggle: Resource::new("theme-toggle", 1, include_str!("theme-toggle.html")),
            share_buttons: Resource::new("share-buttons", 1, include_str!("share-buttons.html")),
        }
    }
}
