use std::path::Path;

use serde::{Deserialize, Serialize};

use warbler::{err, error, Site};
use warbler::error::{Chainable, Result};
use warbler::fstree::Exclude;

/// The contents of `finch.toml`: the site itself plus what to leave alone.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Directory names never descended into.
    pub exclude_dirs: Vec<String>,
    /// File names never processed.
    pub exclude_files: Vec<String>,
    pub exclude_hidden: bool,
    #[serde(flatten)]
    pub site: Site,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            exclude_dirs: vec!["admin".into(), "private".into(), ".git".into()],
            exclude_files: vec!["readme.htm".into()],
            exclude_hidden: true,
            site: Site::default(),
        }
    }
}

impl Settings {
    pub fn parse(string: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(string)?;
        settings.site.validate()?;
        Ok(settings)
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let string = std::fs::read_to_string(path)
            .chain_with(|| error!("failed to read settings", "path" => path.display()))?;

        Settings::parse(&string).chain_with(|| error!("invalid settings", "path" => path.display()))
    }

    /// Reads `explicit` if given, otherwise the settings file in `root` if
    /// there is one, otherwise the defaults.
    pub fn discover(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return err!("settings file does not exist", "path" => path.display());
            }

            return Settings::read(path);
        }

        let path = root.join(crate::CONFIG_FILE);
        if path.is_file() {
            return Settings::read(path);
        }

        log::debug!("no {} in {}: using defaults", crate::CONFIG_FILE, root.display());
        Ok(Settings::default())
    }

    pub fn exclude(&self) -> Exclude {
        Exclude {
            dirs: self.exclude_dirs.clone(),
            files: self.exclude_files.clone(),
            hidden: self.exclude_hidden,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_flatten_site() {
        let settings = Settings::parse(r#"
            base_url = "https://blog.example.org"
            site_name = "Field Notes"
            exclude_dirs = ["drafts"]

            [aliases]
            "product.html" = "product/"

            [rules]
            dark_mode = true
        "#).unwrap();

        assert_eq!(settings.exclude_dirs, ["drafts"]);
        assert_eq!(settings.exclude_files, ["readme.htm"]);
        assert!(settings.exclude_hidden);
        assert_eq!(settings.site.site_name, "Field Notes");
        assert!(settings.site.rules.dark_mode);
        assert_eq!(settings.site.canonicalize("product.html"), "https://blog.example.org/product/");
        assert_eq!(settings.site.title_max, 60);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        assert!(Settings::parse("title_max = 5").is_err());
        assert!(Settings::parse("base_url = \"example.com\"").is_err());
        assert!(Settings::parse("title_max = \"long\"").is_err());
    }
}
