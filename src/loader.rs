//! Background construction of a layout tree.
//!
//! The worker owns the tree while it is built and hands it over once, by
//! value, when packing has finished. The caller never sees a half-built tree.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use crate::config::Config;
use crate::crawler::{FileCrawler, ScanStats};
use crate::error::{LayoutError, Result};
use crate::tree::LayoutTree;

/// A packed tree together with the scan that produced it.
pub struct BuiltLayout {
    pub tree: LayoutTree,
    pub stats: ScanStats,
}

/// Receiving end of a build started with [`spawn_build`].
pub struct BuildHandle {
    root: PathBuf,
    rx: Option<Receiver<Result<BuiltLayout>>>,
}

/// Scan `root` and pack it on a worker thread.
pub fn spawn_build(root: impl AsRef<Path>, config: Config) -> BuildHandle {
    let root = root.as_ref().to_path_buf();
    let (tx, rx) = mpsc::channel();

    let path = root.clone();
    thread::spawn(move || {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            build_layout(&path, config)
        }));

        let outcome = match result {
            Ok(built) => built,
            Err(_) => Err(LayoutError::BuildFailed("build thread panicked".to_string())),
        };
        let _ = tx.send(outcome);
    });

    BuildHandle {
        root,
        rx: Some(rx),
    }
}

/// Scan and pack on the current thread.
pub fn build_layout(root: &Path, config: Config) -> Result<BuiltLayout> {
    let mut crawler = FileCrawler::new(config.exclude);
    let (entries, stats) = crawler.scan(root);

    let mut tree = LayoutTree::from_entries(root, &entries, config.layout);
    tree.adjust_tree_location()?;

    tracing::info!(
        "built layout for {:?}: {} nodes ({} files, {} dirs) in {}ms",
        root,
        tree.len(),
        stats.total_files,
        stats.total_dirs,
        stats.duration_ms
    );
    Ok(BuiltLayout { tree, stats })
}

impl BuildHandle {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True until the result has been taken.
    pub fn is_pending(&self) -> bool {
        self.rx.is_some()
    }

    /// Non-blocking poll. Returns the result at most once.
    pub fn try_take(&mut self) -> Option<Result<BuiltLayout>> {
        let rx = self.rx.as_ref()?;
        let outcome = match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(Self::disconnected()),
        };
        self.rx = None;
        Some(outcome)
    }

    /// Block until the build finishes.
    pub fn wait(mut self) -> Result<BuiltLayout> {
        let rx = self
            .rx
            .take()
            .ok_or_else(|| LayoutError::BuildFailed("result already taken".to_string()))?;
        rx.recv().unwrap_or_else(|_| Err(Self::disconnected()))
    }

    fn disconnected() -> LayoutError {
        LayoutError::BuildFailed("build thread exited without a result".to_string())
    }
}
