//! Mapping archive names to paths under the output directory.

use std::path::{Component, Path, PathBuf};

/// Resolves an index name (e.g. `/pages/index.js`) below `out_dir`.
///
/// Leading `/` and `\` are stripped, backslashes are treated as separators and
/// `.` components are dropped. Returns None for empty names and for names that
/// would escape `out_dir` (`..`, drive prefixes, embedded NUL).
pub fn entry_path(out_dir: &Path, name: &str) -> Option<PathBuf> {
    if name.contains('\0') {
        return None;
    }
    let normalized = name.replace('\\', "/");
    let relative = normalized.trim_start_matches('/');

    let mut out = out_dir.to_path_buf();
    let mut depth = 0usize;
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => {
                out.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (depth > 0).then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_slash() {
        let base = Path::new("/tmp/out");
        assert_eq!(
            entry_path(base, "/pages/index/index.js"),
            Some(PathBuf::from("/tmp/out/pages/index/index.js"))
        );
        assert_eq!(entry_path(base, "app.json"), Some(PathBuf::from("/tmp/out/app.json")));
    }

    #[test]
    fn backslashes_and_dots() {
        let base = Path::new("out");
        assert_eq!(
            entry_path(base, "\\a\\.\\b.js"),
            Some(PathBuf::from("out/a/b.js"))
        );
    }

    #[test]
    fn rejects_traversal_and_empty() {
        let base = Path::new("out");
        assert_eq!(entry_path(base, "/../etc/passwd"), None);
        assert_eq!(entry_path(base, "a/../../b"), None);
        assert_eq!(entry_path(base, "/"), None);
        assert_eq!(entry_path(base, ""), None);
        assert_eq!(entry_path(base, "a\0b"), None);
    }
}
