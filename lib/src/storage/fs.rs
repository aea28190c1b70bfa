use std::{fs, io};
use std::path::{Path, PathBuf};

use crate::error::{Result, Chainable};
use crate::storage::{decode, DocumentSink, DocumentSource, LoadError, Loaded};

/// Reads documents from a site root on disk.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

/// Writes documents under a site root on disk.
///
/// Writes go to a temporary sibling that is then renamed over the target, so
/// a reader never sees a partially written document. Identical content is
/// never rewritten.
#[derive(Debug, Clone)]
pub struct FsSink {
    root: PathBuf,
}

fn resolve(root: &Path, id: &str) -> PathBuf {
    root.join(id.trim_start_matches('/'))
}

impl FsSource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        FsSource { root: root.as_ref().to_path_buf() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DocumentSource for FsSource {
    fn load(&self, id: &str) -> Result<Loaded, LoadError> {
        match fs::read(resolve(&self.root, id)) {
            Ok(bytes) => decode(id, bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(LoadError::NotFound(id.into())),
            Err(error) => Err(LoadError::Io { id: id.into(), error }),
        }
    }
}

impl FsSink {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        FsSink { root: root.as_ref().to_path_buf() }
    }

    fn temp_path(path: &Path) -> PathBuf {
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
    }
}

impl DocumentSink for FsSink {
    fn store(&self, id: &str, markup: &str) -> Result<bool> {
        let path = resolve(&self.root, id);
        if fs::read(&path).map_or(false, |bytes| bytes == markup.as_bytes()) {
            return Ok(false);
        }

        let temp = Self::temp_path(&path);
        fs::write(&temp, markup).chain_with(|| error! {
            "failed to write temporary file",
            "path" => temp.display(),
        })?;

        if let Err(e) = fs::rename(&temp, &path) {
            let _ = fs::remove_file(&temp);
            return Err(e).chain(error! {
                "failed to replace document",
                "path" => path.display(),
            });
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("warbler-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("blog")).unwrap();
        dir
    }

    #[test]
    fn identical_writes_are_skipped() {
        let root = scratch("sink");
        let path = root.join("blog/post.html");
        fs::write(&path, "<p>one</p>").unwrap();
        let modified = fs::metadata(&path).unwrap().modified().unwrap();

        let sink = FsSink::new(&root);
        assert!(!sink.store("blog/post.html", "<p>one</p>").unwrap());
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), modified);

        assert!(sink.store("blog/post.html", "<p>two</p>").unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "<p>two</p>");
        let leftovers = fs::read_dir(root.join("blog")).unwrap().count();
        assert_eq!(leftovers, 1);
        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn load_errors_are_classified() {
        let root = scratch("source");
        fs::write(root.join("bad.html"), b"<p>\xff</p>").unwrap();
        fs::write(root.join("blog/ok.html"), "<p>ok</p>").unwrap();

        let source = FsSource::new(&root);
        assert_eq!(source.load("blog/ok.html").unwrap().markup, "<p>ok</p>");
        assert!(matches!(source.load("missing.html"), Err(LoadError::NotFound(_))));
        match source.load("bad.html") {
            Err(LoadError::Parse { error, .. }) => assert_eq!(error.offset, 3),
            other => panic!("unexpected: {other:?}"),
        }

        fs::remove_dir_all(root).unwrap();
    }
}
