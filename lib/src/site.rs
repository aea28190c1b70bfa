use std::path::Path;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::resources::Resources;
use crate::url::UrlBuf;

/// Everything the rules know about the site a document belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Site {
    /// Absolute URL of the site root, e.g. `https://example.com`.
    pub base_url: UrlBuf,
    pub site_name: String,
    /// Appended to every title. Defaults to ` | {site_name}`.
    pub title_suffix: Option<String>,
    pub language: String,
    /// The file that stands for its directory.
    pub index_file: String,
    pub title_max: usize,
    pub description_max: usize,
    pub default_description: String,
    /// Absolute URL of the image used for social cards and structured data.
    pub image: String,
    pub author: String,
    pub publisher: String,
    pub robots: String,
    /// Scripts whose `src` contains any of these are never deferred.
    pub defer_exclude: Vec<String>,
    /// Images whose `src` contains this get placeholder dimensions.
    pub logo_pattern: String,
    pub logo_width: u32,
    pub logo_height: u32,
    /// Relative document path to URL path, e.g. `product.html` to `product/`.
    pub aliases: FxHashMap<String, String>,
    pub rules: RuleSettings,
    pub resources: Resources,
}

/// Switches for rules. The three snippet rules are opt-in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSettings {
    pub critical_css: bool,
    pub dark_mode: bool,
    pub share_buttons: bool,
    /// Names of standard rules to skip.
    pub disable: Vec<String>,
}

impl Default for Site {
    fn default() -> Self {
        Site {
            base_url: UrlBuf::from("https://example.com"),
            site_name: "Example".into(),
            title_suffix: None,
            language: "en".into(),
            index_file: "index.html".into(),
            title_max: 60,
            description_max: 160,
            default_description: "Notes, guides and tutorials on engineering, \
                data and product development.".into(),
            image: "https://example.com/img/Logo.png".into(),
            author: "Example Author".into(),
            publisher: "Example Blog".into(),
            robots: "index,follow,max-image-preview:large".into(),
            defer_exclude: vec!["loadHeader.js".into(), "jquery".into()],
            logo_pattern: "logo".into(),
            logo_width: 200,
            logo_height: 60,
            aliases: FxHashMap::default(),
            rules: RuleSettings::default(),
            resources: Resources::default(),
        }
    }
}

impl Site {
    pub fn from_toml(string: &str) -> Result<Self> {
        let site: Site = toml::from_str(string)?;
        site.validate()?;
        Ok(site)
    }

    pub fn title_suffix(&self) -> String {
        match &self.title_suffix {
            Some(suffix) => suffix.clone(),
            None if self.site_name.is_empty() => String::new(),
            None => format!(" | {}", self.site_name),
        }
    }

    /// Checks settings that would make rules produce nonsense.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.scheme().is_none() {
            return err! {
                "base_url must be an absolute URL",
                "base_url" => &self.base_url,
            };
        }

        // Room for at least one character and the ellipsis.
        let suffix_len = self.title_suffix().chars().count();
        if suffix_len + 4 > self.title_max {
            return err! {
                "title suffix leaves no room for a title",
                "title suffix" => format!("{:?}", self.title_suffix()),
                "title_max" => self.title_max,
            };
        }

        if self.description_max < 4 {
            return err!("description_max is too small", "description_max" => self.description_max);
        }

        if self.index_file.is_empty() || self.index_file.contains('/') {
            return err!("index_file must be a bare file name", "index_file" => &self.index_file);
        }

        Ok(())
    }

    /// The canonical absolute URL of the document at relative path `path`.
    ///
    /// ```rust
    /// use warbler::Site;
    ///
    /// let mut site = Site::default();
    /// site.base_url = "https://example.com/".into();
    /// site.aliases.insert("product.html".into(), "product/".into());
    ///
    /// assert_eq!(site.canonicalize("index.html"), "https://example.com/");
    /// assert_eq!(site.canonicalize("blog/index.html"), "https://example.com/blog/");
    /// assert_eq!(site.canonicalize("post.html"), "https://example.com/post.html");
    /// assert_eq!(site.canonicalize("product.html"), "https://example.com/product/");
    /// assert_eq!(site.canonicalize("./notes\\today.html"), "https://example.com/notes/today.html");
    /// assert_eq!(site.canonicalize("notes:today.html"), "https://example.com/notes:today.html");
    /// ```
    pub fn canonicalize(&self, path: &str) -> String {
        let normalized = path.replace('\\', "/");
        let path = UrlBuf::from(Path::new(&normalized));
        let mut url = self.base_url.clone();
        url.trim_end_slashes();

        if let Some(alias) = self.aliases.get(path.as_str()) {
            url.append(alias);
            return url.into_string();
        }

        match path.strip_suffix(&self.index_file) {
            Some(dir) if dir.is_empty() || dir.ends_with('/') => url.push(dir),
            _ => url.push(&path),
        };

        url.into_string()
    }
}
