use std::sync::Arc;
use std::path::Path;
use std::time::SystemTime;
use std::collections::VecDeque;
use std::{fs, fmt};

use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::url::UrlBuf;

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct EntryId(pub(crate) usize);

/// A site directory as discovered on disk, minus anything excluded.
#[derive(Debug)]
pub struct FsTree {
    entries: Vec<Entry>,
    map: FxHashMap<Arc<Path>, EntryId>,
}

#[derive(Debug)]
pub struct Entry {
    pub id: EntryId,
    pub path: Arc<Path>,
    pub metadata: fs::Metadata,
    pub file_name: String,
    pub file_type: fs::FileType,
    pub parent: Option<EntryId>,
    pub children: Vec<EntryId>,
    pub depth: usize,
}

/// Names pruned from a walk. Excluded directories are never descended into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exclude {
    pub dirs: Vec<String>,
    pub files: Vec<String>,
    /// Skip entries whose name starts with `.`.
    pub hidden: bool,
}

#[derive(Default, Debug)]
struct FsMetadata(Option<fs::Metadata>);

impl Exclude {
    pub fn excludes(&self, file_name: &str, is_dir: bool) -> bool {
        if self.hidden && file_name.starts_with('.') {
            return true;
        }

        let names = if is_dir { &self.dirs } else { &self.files };
        names.iter().any(|name| name.eq_ignore_ascii_case(file_name))
    }
}

impl FsTree {
    fn new() -> Self {
        Self {
            map: FxHashMap::default(),
            entries: vec![],
        }
    }

    pub fn build<P: AsRef<Path>>(root: P) -> Result<Self> {
        Self::build_with(root.as_ref(), &Exclude::default())
    }

    pub fn build_with<P: AsRef<Path>>(root: P, exclude: &Exclude) -> Result<Self> {
        use jwalk::WalkDirGeneric;

        let root = root.as_ref();
        let exclude = Arc::new(exclude.clone());
        let walker = WalkDirGeneric::<FsMetadata>::new(root)
            .follow_links(true)
            .sort(true)
            .process_read_dir(move |depth, _, _, entries| {
                // `depth` is `None` for the root itself, which is never excluded.
                if depth.is_some() {
                    entries.retain(|e| match e {
                        Ok(e) => !exclude.excludes(&e.file_name.to_string_lossy(), e.file_type.is_dir()),
                        Err(_) => true,
                    });
                }

                entries.iter_mut()
                    .filter_map(|e| e.as_mut().ok())
                    .for_each(|e| e.client_state = FsMetadata(e.metadata().ok()))
            });

        let mut tree: FsTree = FsTree::new();
        for f in walker.into_iter().filter_map(|e| e.ok()) {
            tree.insert(f);
        }

        if tree.len() == 0 {
            return err! {
                "file system tree discovery yielded zero files",
                "search root" => root.display(),
            }
        }

        Ok(tree)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn root(&self) -> &Entry {
        &self[self.root_id()]
    }

    pub fn root_id(&self) -> EntryId {
        EntryId(0)
    }

    #[inline]
    pub fn get<R, P>(&self, root: R, path: P) -> Option<&Entry>
        where R: Into<Option<EntryId>>, P: AsRef<Path>
    {
        self.get_id(root.into(), path.as_ref()).map(|id| &self[id])
    }

    pub fn get_id<R, P>(&self, root: R, path: P) -> Option<EntryId>
        where R: Into<Option<EntryId>>, P: AsRef<Path>
    {
        let root = root.into().unwrap_or(self.root_id());
        let full_path = self[root].path.join(path.as_ref());
        self.map.get(&*full_path).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        (0..self.entries.len()).map(|i| &self[EntryId(i)])
    }

    pub fn iter_depth_first(&self, root: EntryId) -> Dfs<'_> {
        Dfs {
            tree: self,
            stack: { let mut q = VecDeque::new(); q.push_back(root); q },
        }
    }

    /// HTML documents (`.html`, `.htm`) in depth-first order.
    pub fn documents(&self) -> impl Iterator<Item = &Entry> {
        self.iter_depth_first(self.root_id())
            .files()
            .filter(|e| e.is_html())
    }

    fn insert(&mut self, mut entry: jwalk::DirEntry<FsMetadata>) {
        // Entries whose metadata can't be read (e.g. dangling links) are skipped.
        let Some(metadata) = entry.client_state.0.take() else {
            if entry.depth != 0 {
                return;
            }

            match fs::metadata(entry.path()) {
                Ok(metadata) => return self.insert_with(entry, metadata),
                Err(_) => return,
            }
        };

        self.insert_with(entry, metadata)
    }

    fn insert_with(&mut self, entry: jwalk::DirEntry<FsMetadata>, metadata: fs::Metadata) {
        let entry = Entry {
            id: EntryId(self.entries.len()),
            path: Arc::from(entry.path().into_boxed_path()),
            metadata,
            file_type: entry.file_type,
            file_name: entry.file_name.to_string_lossy().into_owned(),
            parent: self.map.get(&entry.parent_path).cloned(),
            children: vec![],
            depth: entry.depth,
        };

        self.map.insert(entry.path.clone(), entry.id);
        if let Some(parent) = entry.parent {
            self.entries[parent.0].children.push(entry.id);
        }

        self.entries.push(entry);
    }
}

impl Entry {
    /// File name without the extension.
    pub fn file_stem(&self) -> &str {
        match self.file_name.rsplit_once('.') {
            Some((left, _)) => left,
            None => &self.file_name,
        }
    }

    /// The complete extension, if any.
    pub fn file_ext(&self) -> Option<&str> {
        self.file_name.rsplit_once('.').map(|(_, right)| right)
    }

    pub fn is_html(&self) -> bool {
        self.metadata.is_file() && self.file_ext()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
    }

    /// Path relative to the root tree of `self`.
    pub fn relative_path(&self) -> &Path {
        let mut components = self.path.components();
        for _ in 0..(self.path.components().count() - self.depth) {
            components.next();
        }

        components.as_path()
    }

    /// Path relative to the root tree, `/`-separated.
    pub fn relative_url(&self) -> UrlBuf {
        UrlBuf::from(self.relative_path())
    }

    pub fn modified(&self) -> Option<SystemTime> {
        self.metadata.modified().ok()
    }
}

pub struct Dfs<'a> {
    tree: &'a FsTree,
    stack: VecDeque<EntryId>,
}

impl<'a> Dfs<'a> {
    #[inline]
    pub fn entries(self) -> impl Iterator<Item = &'a Entry> {
        let tree = self.tree;
        self.into_iter().map(move |id| &tree[id])
    }

    #[inline]
    pub fn files(self) -> impl Iterator<Item = &'a Entry> {
        let tree = self.tree;
        self.into_iter().map(move |id| &tree[id]).filter(|e| e.metadata.is_file())
    }
}

impl Iterator for Dfs<'_> {
    type Item = EntryId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop_front()?;
        for &child in self.tree[node].children.iter().rev() {
            self.stack.push_front(child);
        }

        Some(node)
    }
}

impl jwalk::ClientState for FsMetadata {
    type ReadDirState = ();
    type DirEntryState = Self;
}

impl std::ops::Index<EntryId> for FsTree {
    type Output = Entry;

    fn index(&self, index: EntryId) -> &Self::Output {
        &self.entries[index.0]
    }
}

impl std::ops::IndexMut<EntryId> for FsTree {
    fn index_mut(&mut self, index: EntryId) -> &mut Self::Output {
        &mut self.entries[index.0]
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
