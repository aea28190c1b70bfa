//! `sitemap.xml` generation.

use std::fmt::Write;
use std::time::SystemTime;

use chrono::{DateTime, Utc};

use crate::site::Site;

pub const XMLNS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub url: String,
    pub lastmod: DateTime<Utc>,
}

impl Entry {
    pub fn lastmod(&self) -> String {
        self.lastmod.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// One entry per canonical URL, sorted by URL. Pages that canonicalize to
/// the same URL keep the latest modification time.
pub fn entries<'a, I>(site: &Site, pages: I) -> Vec<Entry>
    where I: IntoIterator<Item = (&'a str, SystemTime)>
{
    let mut entries: Vec<Entry> = pages.into_iter()
        .map(|(path, modified)| Entry {
            url: site.canonicalize(path),
            lastmod: DateTime::<Utc>::from(modified),
        })
        .collect();

    entries.sort_by(|a, b| a.url.cmp(&b.url).then(b.lastmod.cmp(&a.lastmod)));
    entries.dedup_by(|later, first| later.url == first.url);
    entries
}

/// The `urlset` document for `entries`, in the given order.
pub fn to_xml(entries: &[Entry]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(xml, "<urlset xmlns=\"{XMLNS}\">");
    for entry in entries {
        xml.push_str("  <url>\n");
        let _ = writeln!(xml, "    <loc>{}</loc>", xml_escape(&entry.url));
        let _ = writeln!(xml, "    <lastmod>{}</lastmod>", entry.lastmod());
        xml.push_str("  </url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}

/// Renders the sitemap for `(relative path, last modified)` pairs.
pub fn render<'a, I>(site: &Site, pages: I) -> String
    where I: IntoIterator<Item = (&'a str, SystemTime)>
{
    to_xml(&entries(site, pages))
}
