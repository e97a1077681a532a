use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Lowercase extensions the loader understands.
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["pcd", "ply", "xyz", "bin", "npy"];

/// Case-insensitive check against [`SUPPORTED_EXTENSIONS`].
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(e))
        })
        .unwrap_or(false)
}

/// One listed scan file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    pub name: String,
    pub size_bytes: u64,
}

/// The currently open directory and its supported scan files, sorted by name.
#[derive(Debug, Clone)]
pub struct ScanDirectory {
    pub path: PathBuf,
    pub entries: Vec<ScanEntry>,
}

impl ScanDirectory {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let mut dir = ScanDirectory {
            path: path.into(),
            entries: Vec::new(),
        };
        dir.refresh()?;
        Ok(dir)
    }

    /// Re-read the directory listing.
    pub fn refresh(&mut self) -> Result<()> {
        let read_dir = std::fs::read_dir(&self.path)
            .with_context(|| format!("listing {}", self.path.display()))?;

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.with_context(|| format!("listing {}", self.path.display()))?;
            let path = entry.path();
            if !is_supported(&path) {
                continue;
            }
            // Follows symlinks, so a link to a scan file is listed.
            let Ok(meta) = std::fs::metadata(&path) else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                log::warn!("Skipping non UTF-8 file name {}", path.display());
                continue;
            };
            entries.push(ScanEntry {
                name: name.to_string(),
                size_bytes: meta.len(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        self.entries = entries;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Full path of the entry at `index`.
    pub fn file_path(&self, index: usize) -> Option<PathBuf> {
        self.entries.get(index).map(|e| self.path.join(&e.name))
    }
}

/// Human-readable file size for the file list.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_check_ignores_case() {
        assert!(is_supported(Path::new("a/b/scan.PCD")));
        assert!(is_supported(Path::new("000001.bin")));
        assert!(!is_supported(Path::new("notes.txt")));
        assert!(!is_supported(Path::new("npy")));
    }

    #[test]
    fn lists_supported_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.ply", "a.XYZ", "readme.md", "c.bin", "000.npy"] {
            std::fs::write(dir.path().join(name), b"1234").unwrap();
        }
        std::fs::create_dir(dir.path().join("folder.pcd")).unwrap();

        let listing = ScanDirectory::open(dir.path()).unwrap();
        let names: Vec<&str> = listing.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["000.npy", "a.XYZ", "b.ply", "c.bin"]);
        assert_eq!(listing.entries[0].size_bytes, 4);
        assert_eq!(listing.file_path(2), Some(dir.path().join("b.ply")));
        assert_eq!(listing.file_path(9), None);
    }

    #[test]
    fn refresh_picks_up_new_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut listing = ScanDirectory::open(dir.path()).unwrap();
        assert!(listing.is_empty());

        std::fs::write(dir.path().join("new.pcd"), b"").unwrap();
        listing.refresh().unwrap();
        assert_eq!(listing.len(), 1);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ScanDirectory::open(dir.path().join("gone")).is_err());
    }

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(5 * 1024 * 1024 + 512 * 1024), "5.5 MiB");
    }
}
