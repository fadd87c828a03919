//! Memoized construction of virtual directory trees from path text.
//!
//! A [`TreeResolver`] owns an arena of directory nodes. Each distinct
//! normalized path maps to exactly one node; [`VirtualDirectory`] is a cheap
//! handle `(store, id)` into that arena, and two handles compare equal only
//! when they name the same node of the same resolver.
//!
//! Paths are split on both `/` and `\`. Empty segments are skipped, so
//! `a/b`, `a\b` and `/a//b/` all resolve to the node whose full name is
//! `a\b`.
//!
//! # Example
//!
//! ```rust
//! use treepack::{Entry, TreeResolver, Timestamp};
//!
//! let mut resolver = TreeResolver::new(Timestamp::EPOCH);
//! let c = resolver.leaf_directory("A\\B\\C").unwrap();
//! let again = resolver.leaf_directory("A/B/C").unwrap();
//! assert_eq!(c, again);
//!
//! let b = c.parent_directory().unwrap();
//! assert_eq!(b.full_name(), "A\\B");
//! assert_eq!(resolver.root_directories()[0].full_name(), "A");
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::entry::{DirRef, DirectoryEntry, Entry, FileEntry, FileRef};
use crate::{Error, Result, Timestamp};

/// Separator used in memo keys and virtual full names.
const KEY_SEPARATOR: char = '\\';

/// Characters recognized as segment separators.
const SEPARATORS: [char; 2] = ['/', '\\'];

/// Index of a directory node inside its resolver's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirId(usize);

struct DirNode {
    name: String,
    full_name: String,
    parent: Option<DirId>,
    directories: Vec<DirId>,
    files: Vec<FileRef>,
}

/// The arena shared by a resolver and every handle it hands out.
struct TreeStore {
    nodes: Vec<DirNode>,
    index: HashMap<String, DirId>,
    roots: Vec<DirId>,
    baseline: Timestamp,
}

impl TreeStore {
    fn node(&self, id: DirId) -> &DirNode {
        &self.nodes[id.0]
    }

    fn insert(&mut self, name: &str, full_name: String, parent: Option<DirId>) -> DirId {
        let id = DirId(self.nodes.len());
        self.nodes.push(DirNode {
            name: name.to_string(),
            full_name: full_name.clone(),
            parent,
            directories: Vec::new(),
            files: Vec::new(),
        });
        match parent {
            Some(parent) => self.nodes[parent.0].directories.push(id),
            None => self.roots.push(id),
        }
        self.index.insert(full_name, id);
        id
    }
}

type SharedStore = Rc<RefCell<TreeStore>>;

/// Splits `path` into its non-empty segments.
fn segments(path: &str) -> Vec<&str> {
    path.split(SEPARATORS).filter(|s| !s.is_empty()).collect()
}

/// A directory node owned by a [`TreeResolver`].
///
/// Metadata is the resolver's baseline timestamp. The directory always
/// exists and is always read-only; its child lists only grow, as further
/// paths are resolved through the same resolver.
#[derive(Clone)]
pub struct VirtualDirectory {
    store: SharedStore,
    id: DirId,
}

impl VirtualDirectory {
    /// Returns the node's index in its resolver.
    pub fn id(&self) -> DirId {
        self.id
    }

    /// Returns true if both handles name the same node.
    pub fn same_node(a: &VirtualDirectory, b: &VirtualDirectory) -> bool {
        a == b
    }

    /// Returns a link that does not keep the resolver's store alive.
    pub fn downgrade(&self) -> WeakDirectory {
        WeakDirectory {
            store: Rc::downgrade(&self.store),
            id: self.id,
        }
    }

    /// Returns the parent as a concrete virtual directory.
    pub fn parent_directory(&self) -> Option<VirtualDirectory> {
        let parent = self.store.borrow().node(self.id).parent?;
        Some(self.sibling(parent))
    }

    /// Returns the child directories as concrete virtual directories.
    pub fn child_directories(&self) -> Vec<VirtualDirectory> {
        let ids = self.store.borrow().node(self.id).directories.clone();
        ids.into_iter().map(|id| self.sibling(id)).collect()
    }

    /// Returns the number of direct child files.
    pub fn file_count(&self) -> usize {
        self.store.borrow().node(self.id).files.len()
    }

    fn sibling(&self, id: DirId) -> VirtualDirectory {
        VirtualDirectory {
            store: Rc::clone(&self.store),
            id,
        }
    }

    fn baseline(&self) -> Timestamp {
        self.store.borrow().baseline
    }
}

impl PartialEq for VirtualDirectory {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.store, &other.store) && self.id == other.id
    }
}

impl Eq for VirtualDirectory {}

impl Entry for VirtualDirectory {
    fn name(&self) -> String {
        self.store.borrow().node(self.id).name.clone()
    }

    fn full_name(&self) -> String {
        self.store.borrow().node(self.id).full_name.clone()
    }

    fn parent(&self) -> Option<DirRef> {
        let parent: DirRef = Rc::new(self.parent_directory()?);
        Some(parent)
    }

    fn exists(&self) -> bool {
        true
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn creation_time(&self) -> Timestamp {
        self.baseline()
    }

    fn last_access_time(&self) -> Timestamp {
        self.baseline()
    }

    fn last_write_time(&self) -> Timestamp {
        self.baseline()
    }
}

impl DirectoryEntry for VirtualDirectory {
    fn files(&self) -> Result<Vec<FileRef>> {
        Ok(self.store.borrow().node(self.id).files.clone())
    }

    fn directories(&self) -> Result<Vec<DirRef>> {
        Ok(self
            .child_directories()
            .into_iter()
            .map(|dir| Rc::new(dir) as DirRef)
            .collect())
    }
}

impl fmt::Debug for VirtualDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualDirectory")
            .field("id", &self.id.0)
            .field("full_name", &self.full_name())
            .finish()
    }
}

/// A non-owning link to a [`VirtualDirectory`].
///
/// Held by files so that a directory's file list and the files' parent links
/// do not form an ownership cycle.
#[derive(Clone)]
pub struct WeakDirectory {
    store: Weak<RefCell<TreeStore>>,
    id: DirId,
}

impl WeakDirectory {
    /// Returns the directory if its resolver store is still alive.
    pub fn upgrade(&self) -> Option<VirtualDirectory> {
        Some(VirtualDirectory {
            store: self.store.upgrade()?,
            id: self.id,
        })
    }
}

impl fmt::Debug for WeakDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakDirectory").field("id", &self.id.0).finish()
    }
}

/// Builds and memoizes a graph of virtual directories from path strings.
///
/// The memo cache lives exactly as long as the resolver and the handles it
/// returned; it is never evicted.
pub struct TreeResolver {
    store: SharedStore,
}

impl TreeResolver {
    /// Creates an empty resolver. Every node it creates is stamped with
    /// `baseline` for all three timestamps.
    pub fn new(baseline: Timestamp) -> Self {
        Self {
            store: Rc::new(RefCell::new(TreeStore {
                nodes: Vec::new(),
                index: HashMap::new(),
                roots: Vec::new(),
                baseline,
            })),
        }
    }

    /// Returns the baseline timestamp.
    pub fn baseline(&self) -> Timestamp {
        self.store.borrow().baseline
    }

    /// Returns the directory named by `path`, creating it and any missing
    /// ancestors.
    ///
    /// Equal paths (after separator normalization) always return the same
    /// node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `path` has no non-empty segment.
    pub fn leaf_directory(&mut self, path: &str) -> Result<VirtualDirectory> {
        let parts = segments(path);
        if parts.is_empty() {
            return Err(Error::invalid_argument("path", "path has no segments"));
        }
        let id = self.resolve(&parts);
        Ok(self.handle(id))
    }

    fn resolve(&mut self, parts: &[&str]) -> DirId {
        let mut store = self.store.borrow_mut();
        let mut key = String::new();
        let mut parent = None;
        for part in parts {
            if !key.is_empty() {
                key.push(KEY_SEPARATOR);
            }
            key.push_str(part);
            let id = match store.index.get(&key) {
                Some(&id) => id,
                None => {
                    log::trace!("Creating virtual directory '{}'", key);
                    store.insert(part, key.clone(), parent)
                }
            };
            parent = Some(id);
        }
        // `parts` is non-empty, so at least one node was visited.
        parent.unwrap_or(DirId(0))
    }

    /// Returns the directories that have no parent, in first-resolution order.
    pub fn root_directories(&self) -> Vec<VirtualDirectory> {
        let roots = self.store.borrow().roots.clone();
        roots.into_iter().map(|id| self.handle(id)).collect()
    }

    /// Creates a file entry for `path` and records it under its parent
    /// directory.
    ///
    /// The path is split into a directory portion and a file name. The
    /// directory portion, if any, is resolved with
    /// [`leaf_directory`](Self::leaf_directory). `factory` is then called with
    /// the file name and the resolved parent, and the entry it returns is
    /// appended to the parent's file list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `path` has no non-empty segment,
    /// or if the entry built by `factory` reports a different parent than
    /// the one it was given. Parents are compared by `full_name`, so a
    /// same-named directory from another resolver is not detected.
    ///
    /// # Example
    ///
    /// ```rust
    /// use treepack::{DirectoryEntry, Entry, InMemoryFile, TreeResolver, Timestamp};
    ///
    /// let mut resolver = TreeResolver::new(Timestamp::EPOCH);
    /// let file = resolver
    ///     .file_with_path("docs\\readme.txt", |name, parent| {
    ///         InMemoryFile::new(name, b"hi".to_vec(), parent, Timestamp::EPOCH)
    ///     })
    ///     .unwrap();
    /// assert_eq!(file.name(), "readme.txt");
    /// assert_eq!(file.parent().unwrap().full_name(), "docs");
    /// ```
    pub fn file_with_path<F, B>(&mut self, path: &str, factory: B) -> Result<Rc<F>>
    where
        F: FileEntry + 'static,
        B: FnOnce(&str, Option<&VirtualDirectory>) -> F,
    {
        let parts = segments(path);
        let Some((file_name, dir_parts)) = parts.split_last() else {
            return Err(Error::invalid_argument("path", "path has no segments"));
        };

        let parent = if dir_parts.is_empty() {
            None
        } else {
            let id = self.resolve(dir_parts);
            Some(self.handle(id))
        };

        // No store borrow is held here: the factory may query the parent.
        let entry = Rc::new(factory(file_name, parent.as_ref()));

        let recorded = entry.parent().map(|p| p.full_name());
        let expected = parent.as_ref().map(Entry::full_name);
        if recorded != expected {
            return Err(Error::invalid_argument(
                "factory",
                format!(
                    "entry for '{}' reports parent {:?}, expected {:?}",
                    path, recorded, expected
                ),
            ));
        }

        if let Some(parent) = &parent {
            let file: FileRef = entry.clone();
            self.store.borrow_mut().nodes[parent.id.0].files.push(file);
        }
        log::trace!("Resolved file '{}'", path);
        Ok(entry)
    }

    /// Returns the number of memoized directories.
    pub fn len(&self) -> usize {
        self.store.borrow().nodes.len()
    }

    /// Returns true if no directory has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if `path` has already been resolved.
    pub fn contains(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    /// Returns the directory for `path` without creating it.
    pub fn directory(&self, path: &str) -> Option<VirtualDirectory> {
        self.lookup(path).map(|id| self.handle(id))
    }

    fn lookup(&self, path: &str) -> Option<DirId> {
        let key = segments(path).join(&KEY_SEPARATOR.to_string());
        self.store.borrow().index.get(&key).copied()
    }

    fn handle(&self, id: DirId) -> VirtualDirectory {
        VirtualDirectory {
            store: Rc::clone(&self.store),
            id,
        }
    }
}

impl Default for TreeResolver {
    fn default() -> Self {
        Self::new(Timestamp::EPOCH)
    }
}

impl fmt::Debug for TreeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = self.store.borrow();
        f.debug_struct("TreeResolver")
            .field("directories", &store.nodes.len())
            .field("roots", &store.roots.len())
            .field("baseline", &store.baseline)
            .finish()
    }
}
