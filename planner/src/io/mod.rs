//! I/O helpers for planner state and configuration.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

pub mod config;
pub mod init;
pub mod rate_store;

/// Write `contents` to a fresh temp file beside `path`, then rename it over `path`.
///
/// Each call gets its own temp file, so concurrent writers never share one.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let mut tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("create temp file in {}", parent.display()))?;
    tmp.write_all(contents.as_bytes())
        .with_context(|| format!("write temp file {}", tmp.path().display()))?;
    tmp.persist(path)
        .with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn concurrent_writers_leave_one_complete_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("state").join("rates.json");
        let bodies: Vec<String> = (0..8).map(|i| format!("{{\"writer\": {i}}}\n")).collect();

        thread::scope(|scope| {
            for body in &bodies {
                let path = &path;
                scope.spawn(move || {
                    for _ in 0..10 {
                        write_atomic(path, body).expect("write");
                    }
                });
            }
        });

        let contents = fs::read_to_string(&path).expect("read");
        assert!(bodies.contains(&contents));
        let entries: Vec<_> = fs::read_dir(path.parent().expect("parent"))
            .expect("read dir")
            .collect();
        assert_eq!(entries.len(), 1, "temp files left behind");
    }
}
