//! Shared test utilities for integration tests.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use treepack::{FileRef, InMemoryFile, Timestamp, TreeResolver};

/// The baseline used by resolver tests: 2000-01-01T00:00:00Z.
pub fn baseline() -> Timestamp {
    Timestamp::from_ymd_hms(2000, 1, 1, 0, 0, 0).expect("valid date")
}

/// Creates a parentless in-memory file.
pub fn memory_file(name: &str, content: &[u8]) -> FileRef {
    Rc::new(InMemoryFile::new(
        name,
        content.to_vec(),
        None,
        Timestamp::EPOCH,
    ))
}

/// Resolves `path` to an in-memory file whose content is `content`.
pub fn resolve_file(resolver: &mut TreeResolver, path: &str, content: &[u8]) -> Rc<InMemoryFile> {
    let ts = resolver.baseline();
    resolver
        .file_with_path(path, |name, parent| {
            InMemoryFile::new(name, content.to_vec(), parent, ts)
        })
        .expect("resolve file")
}

/// Writes `content` to `dir/name`, creating parent directories.
pub fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(&path, content).expect("write fixture");
    path
}

/// Reads every record of a zip archive as `(name, content)` in archive order.
pub fn read_archive(file: File) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(file).expect("valid zip");
    (0..archive.len())
        .map(|i| {
            let mut record = archive.by_index(i).expect("record");
            let mut content = Vec::new();
            record.read_to_end(&mut content).expect("record content");
            (record.name().to_string(), content)
        })
        .collect()
}

/// Reads only the record names of a zip archive.
pub fn archive_names(file: File) -> Vec<String> {
    read_archive(file).into_iter().map(|(name, _)| name).collect()
}

/// Opens the zip archive at `path` and reads its records.
pub fn read_archive_at(path: &Path) -> Vec<(String, Vec<u8>)> {
    read_archive(File::open(path).expect("open archive"))
}
