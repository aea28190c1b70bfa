use std::path::{Path, PathBuf};
use std::time::SystemTime;

use warbler::fstree::FsTree;
use warbler::error::Result;

use crate::config::Settings;
use crate::util::dircheck;

/// A site directory on disk with its settings.
#[derive(Debug)]
pub struct SiteDir {
    pub root: PathBuf,
    pub settings: Settings,
    pub tree: FsTree,
}

impl SiteDir {
    pub fn new<P: AsRef<Path>>(root: P, config: Option<&Path>) -> Result<Self> {
        let root = root.as_ref();
        dircheck(root)?;

        let settings = Settings::discover(root, config)?;
        let tree = FsTree::build_with(root, &settings.exclude())?;
        Ok(SiteDir { root: root.to_path_buf(), settings, tree })
    }

    /// Ids of every HTML document: paths relative to the root.
    pub fn documents(&self) -> Vec<String> {
        self.tree.documents()
            .map(|entry| entry.relative_url().into_string())
            .collect()
    }

    /// Every HTML document with its modification time. Documents whose time
    /// can't be read are left out.
    pub fn pages(&self) -> Vec<(String, SystemTime)> {
        self.tree.documents()
            .filter_map(|entry| match entry.modified() {
                Some(time) => Some((entry.relative_url().into_string(), time)),
                None => {
                    log::warn!("{}: modification time unavailable", entry.path.display());
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn discovery_honors_settings() {
        let root = std::env::temp_dir().join(format!("finch-discover-{}", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(root.join("blog")).unwrap();
        fs::create_dir_all(root.join("private")).unwrap();
        fs::create_dir_all(root.join("drafts")).unwrap();
        for file in ["index.html", "blog/post.html", "private/secret.html", "drafts/wip.html"] {
            fs::write(root.join(file), "<p>x</p>").unwrap();
        }

        let site = SiteDir::new(&root, None).unwrap();
        let mut ids = site.documents();
        ids.sort();
        assert_eq!(ids, ["blog/post.html", "drafts/wip.html", "index.html"]);

        fs::write(root.join(crate::CONFIG_FILE), "exclude_dirs = [\"drafts\"]\nsite_name = \"Notes\"").unwrap();
        let site = SiteDir::new(&root, None).unwrap();
        assert_eq!(site.settings.site.site_name, "Notes");
        assert_eq!(site.pages().len(), 3);
        assert!(!site.documents().iter().any(|id| id.starts_with("drafts")));

        assert!(SiteDir::new(root.join("index.html"), None).is_err());
        fs::remove_dir_all(root).unwrap();
    }
}
