use jwalk::WalkDir;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::ExcludeConfig;

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: String,
    pub is_dir: bool,
}

impl DirEntryInfo {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }
}

/// Lists the direct children of a directory.
///
/// Listings are ordered and already filtered. A directory that cannot be read
/// reports an error; callers keep whatever they already know about it.
pub trait DirectorySource {
    fn list(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>>;
}

/// A path discovered by a full scan.
#[derive(Debug, Clone)]
pub struct ScannedEntry {
    pub path: PathBuf,
    pub is_dir: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ScanStats {
    pub total_files: u64,
    pub total_dirs: u64,
    /// Directories that could not be read.
    pub unreadable: u64,
    pub duration_ms: u128,
}

/// Parallel file system crawler
pub struct FileCrawler {
    exclude: ExcludeConfig,
    file_count: Arc<AtomicU64>,
    dir_count: Arc<AtomicU64>,
    error_count: Arc<AtomicU64>,
}

impl FileCrawler {
    pub fn new(exclude: ExcludeConfig) -> Self {
        Self {
            exclude,
            file_count: Arc::new(AtomicU64::new(0)),
            dir_count: Arc::new(AtomicU64::new(0)),
            error_count: Arc::new(AtomicU64::new(0)),
        }
    }

    fn processing_parallelism() -> usize {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        (cores * 2).clamp(4, 64)
    }

    fn entry_name(path: &Path) -> Option<&str> {
        path.file_name().and_then(|n| n.to_str())
    }

    /// Scan a directory tree into a flat list, parents before children.
    ///
    /// The root itself is not part of the result.
    pub fn scan<P: AsRef<Path>>(&mut self, root: P) -> (Vec<ScannedEntry>, ScanStats) {
        let root_path = root.as_ref().to_path_buf();
        let start = Instant::now();

        self.file_count.store(0, Ordering::Relaxed);
        self.dir_count.store(0, Ordering::Relaxed);
        self.error_count.store(0, Ordering::Relaxed);

        let scan_threads = Self::processing_parallelism();
        let exclude = self.exclude.clone();
        let error_count = self.error_count.clone();

        let walker = WalkDir::new(&root_path)
            .skip_hidden(false)
            .sort(true)
            .min_depth(1)
            .parallelism(jwalk::Parallelism::RayonNewPool(scan_threads))
            .process_read_dir(move |_, _, _, children| {
                children.retain(|entry| match entry {
                    Ok(dir_entry) => Self::entry_name(&dir_entry.path())
                        .map(|name| !exclude.is_excluded(name))
                        .unwrap_or(true),
                    Err(_) => {
                        error_count.fetch_add(1, Ordering::Relaxed);
                        false
                    }
                });
            })
            .into_iter();

        let mut entries = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    self.error_count.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!("skipping unreadable entry: {}", e);
                }
            }
        }

        let file_count = self.file_count.clone();
        let dir_count = self.dir_count.clone();
        let process_entries = || {
            entries
                .par_iter()
                .map(|entry| {
                    let is_dir = entry.file_type().is_dir();
                    if is_dir {
                        dir_count.fetch_add(1, Ordering::Relaxed);
                    } else {
                        file_count.fetch_add(1, Ordering::Relaxed);
                    }
                    ScannedEntry {
                        path: entry.path(),
                        is_dir,
                    }
                })
                .collect::<Vec<_>>()
        };

        let mut nodes = ThreadPoolBuilder::new()
            .num_threads(scan_threads)
            .build()
            .map(|pool| pool.install(process_entries))
            .unwrap_or_else(|_| process_entries());

        // Component-wise ordering puts every directory before its contents.
        nodes.par_sort_by(|a, b| a.path.cmp(&b.path));

        let stats = ScanStats {
            total_files: self.file_count.load(Ordering::Relaxed),
            total_dirs: self.dir_count.load(Ordering::Relaxed),
            unreadable: self.error_count.load(Ordering::Relaxed),
            duration_ms: start.elapsed().as_millis(),
        };

        tracing::debug!(
            "scanned {:?}: {} files, {} dirs in {}ms",
            root_path,
            stats.total_files,
            stats.total_dirs,
            stats.duration_ms
        );

        (nodes, stats)
    }
}

impl DirectorySource for FileCrawler {
    fn list(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>> {
        // jwalk reports an unreadable root as an entry error, so probe first to
        // surface permission problems to the caller.
        std::fs::read_dir(dir)?;

        let mut listing = Vec::new();
        for entry in WalkDir::new(dir)
            .skip_hidden(false)
            .sort(true)
            .min_depth(1)
            .max_depth(1)
            .parallelism(jwalk::Parallelism::Serial)
        {
            let entry = entry.map_err(io::Error::other)?;
            let Some(name) = Self::entry_name(&entry.path()).map(str::to_string) else {
                continue;
            };
            if self.exclude.is_excluded(&name) {
                continue;
            }
            listing.push(DirEntryInfo {
                name,
                is_dir: entry.file_type().is_dir(),
            });
        }
        Ok(listing)
    }
}

impl Default for FileCrawler {
    fn default() -> Self {
        Self::new(ExcludeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        fs::create_dir_all(dir.path().join(".git/objects")).unwrap();
        fs::write(dir.path().join("README.md"), "readme").unwrap();
        fs::write(dir.path().join("src/lib.rs"), "lib").unwrap();
        fs::write(dir.path().join("src/nested/deep.rs"), "deep").unwrap();
        fs::write(dir.path().join(".git/HEAD"), "ref").unwrap();
        dir
    }

    #[test]
    fn test_crawler_basic() {
        let dir = fixture();
        let mut crawler = FileCrawler::default();
        let (nodes, stats) = crawler.scan(dir.path());

        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.total_dirs, 2);
        assert_eq!(nodes.len(), 5);
        assert!(nodes.iter().all(|n| !n.path.starts_with(dir.path().join(".git"))));
    }

    #[test]
    fn test_scan_orders_parents_first() {
        let dir = fixture();
        let mut crawler = FileCrawler::new(ExcludeConfig::none());
        let (nodes, _) = crawler.scan(dir.path());

        for (i, node) in nodes.iter().enumerate() {
            if let Some(parent) = node.path.parent() {
                if parent == dir.path() {
                    continue;
                }
                let parent_pos = nodes.iter().position(|n| n.path == parent);
                assert!(
                    parent_pos.map_or(false, |p| p < i),
                    "{:?} listed before its parent",
                    node.path
                );
            }
        }
    }

    #[test]
    fn test_list_is_sorted_and_filtered() {
        let dir = fixture();
        let crawler = FileCrawler::default();
        let listing = crawler.list(dir.path()).unwrap();

        assert_eq!(
            listing,
            vec![DirEntryInfo::file("README.md"), DirEntryInfo::dir("src")]
        );
    }

    #[test]
    fn test_list_missing_directory_is_an_error() {
        let dir = fixture();
        let crawler = FileCrawler::default();
        assert!(crawler.list(&dir.path().join("nope")).is_err());
    }
}
