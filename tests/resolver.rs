//! Virtual tree resolution.
//!
//! Node identity, ancestor chains, root sets and file placement for
//! [`TreeResolver`].

mod common;

use treepack::{DirectoryEntry, Entry, FileRef, TreeResolver, same_file};

#[test]
fn test_leaf_directory_identity() {
    let mut resolver = TreeResolver::new(common::baseline());
    let first = resolver.leaf_directory("A\\B\\C").unwrap();
    let second = resolver.leaf_directory("A\\B\\C").unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_ancestor_chain() {
    let mut resolver = TreeResolver::new(common::baseline());
    let c = resolver.leaf_directory("A\\B\\C").unwrap();
    assert_eq!(c.name(), "C");
    assert_eq!(c.full_name(), "A\\B\\C");

    let b = c.parent().unwrap();
    assert_eq!(b.name(), "B");
    assert_eq!(b.full_name(), "A\\B");

    let a = b.parent().unwrap();
    assert_eq!(a.name(), "A");
    assert_eq!(a.full_name(), "A");
    assert!(a.parent().is_none());
}

#[test]
fn test_root_directories_contain_first_segment() {
    let mut resolver = TreeResolver::new(common::baseline());
    let c = resolver.leaf_directory("A\\B\\C").unwrap();
    let roots = resolver.root_directories();
    assert_eq!(roots.len(), 1);

    let a = c.parent_directory().unwrap().parent_directory().unwrap();
    assert_eq!(roots[0], a);
}

#[test]
fn test_root_set_is_set_of_first_segments() {
    let mut resolver = TreeResolver::new(common::baseline());
    resolver.leaf_directory("x\\1").unwrap();
    resolver.leaf_directory("y/2/3").unwrap();
    resolver.leaf_directory("x\\4").unwrap();
    resolver.leaf_directory("z").unwrap();

    let mut roots: Vec<_> = resolver
        .root_directories()
        .iter()
        .map(Entry::full_name)
        .collect();
    roots.sort();
    assert_eq!(roots, vec!["x", "y", "z"]);
    assert!(resolver.root_directories().iter().all(|r| r.parent().is_none()));
}

#[test]
fn test_child_lists_grow_with_resolution() {
    let mut resolver = TreeResolver::new(common::baseline());
    let parent = resolver.leaf_directory("P").unwrap();
    assert!(parent.directories().unwrap().is_empty());

    resolver.leaf_directory("P\\one").unwrap();
    resolver.leaf_directory("P\\two\\deep").unwrap();
    resolver.leaf_directory("P\\one").unwrap();

    let names: Vec<_> = parent
        .directories()
        .unwrap()
        .iter()
        .map(|d| d.name())
        .collect();
    assert_eq!(names, vec!["one", "two"]);
}

#[test]
fn test_file_with_path_no_parent() {
    let mut resolver = TreeResolver::new(common::baseline());
    let file = common::resolve_file(&mut resolver, "File", b"");
    assert_eq!(file.name(), "File");
    assert_eq!(file.full_name(), "File");
    assert!(file.parent().is_none());
}

#[test]
fn test_file_with_path_with_parent() {
    let mut resolver = TreeResolver::new(common::baseline());
    let file = common::resolve_file(&mut resolver, "Parent\\Directory\\File", b"data");

    assert_eq!(file.name(), "File");
    assert_eq!(file.full_name(), "File");
    let parent = file.parent().unwrap();
    assert_eq!(parent.full_name(), "Parent\\Directory");

    let listed = parent.files().unwrap();
    assert_eq!(listed.len(), 1);
    let created: FileRef = file.clone();
    assert!(same_file(&listed[0], &created));
}

#[test]
fn test_files_share_memoized_parent() {
    let mut resolver = TreeResolver::new(common::baseline());
    common::resolve_file(&mut resolver, "dir/a.txt", b"a");
    common::resolve_file(&mut resolver, "dir\\b.txt", b"b");

    let dir = resolver.leaf_directory("dir").unwrap();
    let names: Vec<_> = dir.files().unwrap().iter().map(|f| f.name()).collect();
    assert_eq!(names, vec!["a.txt", "b.txt"]);
    assert_eq!(resolver.len(), 1);
}

#[test]
fn test_virtual_metadata_uses_baseline() {
    let baseline = common::baseline();
    let mut resolver = TreeResolver::new(baseline);
    let file = common::resolve_file(&mut resolver, "a\\b\\f.bin", b"xyz");
    let b = resolver.directory("a\\b").unwrap();
    let a = resolver.directory("a").unwrap();

    for dir in [&a, &b] {
        assert!(dir.exists());
        assert!(dir.is_read_only());
        assert_eq!(dir.creation_time(), baseline);
        assert_eq!(dir.last_access_time(), baseline);
        assert_eq!(dir.last_write_time(), baseline);
        dir.refresh();
    }
    assert_eq!(file.last_write_time(), baseline);
}

#[test]
fn test_resolved_tree_outlives_resolver_through_handles() {
    let dir = {
        let mut resolver = TreeResolver::new(common::baseline());
        resolver.leaf_directory("kept\\alive").unwrap()
    };
    assert_eq!(dir.parent().unwrap().full_name(), "kept");
}
