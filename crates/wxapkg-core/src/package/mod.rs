//! The wxapkg container: index parsing and concurrent extraction.
//!
//! Entries are written by a bounded pool of worker threads pulling from a
//! shared queue; results come back over a channel so one bad entry (out of
//! range, unsafe name, write failure) is recorded without stopping the rest.

mod error;
mod index;
mod path;

pub use error::PackageError;
pub use index::{parse_index, write_package, FileEntry, PackageHeader};
pub use path::entry_path;

use serde::Serialize;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::{mpsc, Mutex};

/// An entry that was listed in the index but not written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    pub name: String,
    pub reason: String,
}

/// Outcome of one extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnpackSummary {
    /// Number of entries in the index.
    pub entries: usize,
    /// Entries written to disk.
    pub written: usize,
    pub skipped: Vec<SkippedEntry>,
}

fn write_entry(data: &[u8], out_dir: &Path, entry: &FileEntry) -> Result<(), String> {
    let target = entry_path(out_dir, &entry.name).ok_or_else(|| "unsafe entry name".to_string())?;
    let range = entry.range_within(data.len()).ok_or_else(|| {
        format!(
            "data out of bounds (offset {} + size {} > {})",
            entry.offset,
            entry.size,
            data.len()
        )
    })?;
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("create {}: {e}", parent.display()))?;
    }
    fs::write(&target, &data[range]).map_err(|e| format!("write {}: {e}", target.display()))
}

/// Extract a plain package held in memory into `out_dir` using `threads` workers.
///
/// Fails only when the index cannot be parsed or `out_dir` cannot be created.
pub fn unpack(data: &[u8], out_dir: &Path, threads: usize) -> Result<UnpackSummary, PackageError> {
    let (_, entries) = parse_index(data)?;
    fs::create_dir_all(out_dir)?;

    let count = entries.len();
    let work: Mutex<VecDeque<FileEntry>> = Mutex::new(entries.into_iter().collect());
    let (tx, rx) = mpsc::channel::<(String, Result<(), String>)>();
    let num_workers = threads.max(1).min(count);

    let mut summary = UnpackSummary {
        entries: count,
        ..UnpackSummary::default()
    };

    std::thread::scope(|scope| {
        for _ in 0..num_workers {
            let tx = tx.clone();
            let work = &work;
            scope.spawn(move || loop {
                let entry = match work.lock().unwrap_or_else(|p| p.into_inner()).pop_front() {
                    Some(e) => e,
                    None => break,
                };
                let res = write_entry(data, out_dir, &entry);
                if tx.send((entry.name, res)).is_err() {
                    break;
                }
            });
        }
        drop(tx);

        for (name, res) in rx {
            match res {
                Ok(()) => summary.written += 1,
                Err(reason) => {
                    tracing::warn!("skipped entry {}: {}", name, reason);
                    summary.skipped.push(SkippedEntry { name, reason });
                }
            }
        }
    });

    summary.skipped.sort_by(|a, b| a.name.cmp(&b.name));
    tracing::debug!(
        "unpacked {} of {} entries into {}",
        summary.written,
        summary.entries,
        out_dir.display()
    );
    Ok(summary)
}

/// Read `path` and extract it; see [`unpack`].
pub fn unpack_file(path: &Path, out_dir: &Path, threads: usize) -> Result<UnpackSummary, PackageError> {
    let data = fs::read(path)?;
    unpack(&data, out_dir, threads)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_writes_all_entries() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<(String, String)> = (0..40)
            .map(|i| (format!("/pages/p{i}/index.js"), format!("page {i}")))
            .collect();
        let data = write_package(&files);
        let summary = unpack(&data, dir.path(), 4).unwrap();
        assert_eq!(summary.entries, 40);
        assert_eq!(summary.written, 40);
        assert!(summary.skipped.is_empty());
        for i in [0, 17, 39] {
            let p = dir.path().join(format!("pages/p{i}/index.js"));
            assert_eq!(fs::read_to_string(p).unwrap(), format!("page {i}"));
        }
    }

    #[test]
    fn unpack_skips_out_of_range_and_unsafe_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut data = write_package(&[
            ("/ok.js", "fine"),
            ("/../evil.js", "nope"),
            ("/broken.js", "body"),
        ]);
        // Point the last entry's size past the end of the buffer.
        let (_, entries) = parse_index(&data).unwrap();
        let size_pos = 14 + 4
            + (4 + "/ok.js".len() + 8)
            + (4 + "/../evil.js".len() + 8)
            + 4
            + "/broken.js".len()
            + 4;
        data[size_pos..size_pos + 4].copy_from_slice(&(entries[2].size + 100).to_be_bytes());

        let summary = unpack(&data, dir.path(), 2).unwrap();
        assert_eq!(summary.entries, 3);
        assert_eq!(summary.written, 1);
        let names: Vec<_> = summary.skipped.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["/../evil.js", "/broken.js"]);
        assert!(dir.path().join("ok.js").exists());
        assert!(!dir.path().join("broken.js").exists());
        assert!(!dir.path().parent().unwrap().join("evil.js").exists());
    }

    #[test]
    fn unpack_rejects_non_package() {
        let dir = tempfile::tempdir().unwrap();
        let err = unpack(b"definitely not a package", dir.path(), 1).unwrap_err();
        assert!(matches!(err, PackageError::BadMagic));
    }

    #[test]
    fn unpack_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("__APP__.wxapkg");
        fs::write(&pkg, write_package(&[("/app.json", "{}")])).unwrap();
        let out = dir.path().join("out");
        let summary = unpack_file(&pkg, &out, 0).unwrap();
        assert_eq!(summary.written, 1);
        assert_eq!(fs::read_to_string(out.join("app.json")).unwrap(), "{}");
    }
}
