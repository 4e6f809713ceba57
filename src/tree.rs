use indextree::{Arena, NodeId};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::config::LayoutConfig;
use crate::crawler::{DirectorySource, ScannedEntry};
use crate::error::{LayoutError, Result};
use crate::geometry::{Rect, Vector2};
use crate::packer::{PackPolicy, PackStrategy};
use crate::text::name_width;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    /// A collapsed folder is opaque to hit testing and culling.
    Folder { collapsed: bool },
}

/// One file or folder rectangle in the layout.
#[derive(Debug, Clone)]
pub struct LayoutNode {
    pub path: PathBuf,
    pub name: String,
    pub kind: NodeKind,
    pub rect: Rect,
    /// Distance from the root, which has depth 0.
    pub depth: usize,
}

impl LayoutNode {
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder { .. })
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    pub fn is_collapsed(&self) -> bool {
        self.kind == NodeKind::Folder { collapsed: true }
    }

    /// Kind tag used by layout files.
    pub fn kind_label(&self) -> &'static str {
        match self.kind {
            NodeKind::File => "file",
            NodeKind::Folder { .. } => "directory",
        }
    }
}

/// Counts from an incremental refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    pub added: usize,
    /// Existing children no longer listed; kept and parked at the parent origin.
    pub missing: usize,
    /// Folders whose listing failed and were left untouched.
    pub unreadable: usize,
}

/// Which packer a re-pack pass uses.
#[derive(Clone, Copy)]
enum PackChoice<'a> {
    Policy,
    Fixed(&'a dyn PackStrategy),
}

/// Arena-backed tree of nested rectangles, one per file or folder.
///
/// Folders own their children through the arena; the upward link is an arena
/// handle, so there is no ownership cycle.
pub struct LayoutTree {
    arena: Arena<LayoutNode>,
    root: NodeId,
    path_to_node: HashMap<PathBuf, NodeId>,
    config: LayoutConfig,
    policy: PackPolicy,
    cascade_truncations: usize,
}

impl LayoutTree {
    /// Create a tree holding only the root folder, with default parameters.
    pub fn new<P: AsRef<Path>>(root_path: P) -> Self {
        Self::with_config(root_path, LayoutConfig::default())
    }

    pub fn with_config<P: AsRef<Path>>(root_path: P, config: LayoutConfig) -> Self {
        let mut arena = Arena::new();
        let root_path_buf = root_path.as_ref().to_path_buf();
        let root_name = root_path_buf
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| root_path_buf.display().to_string());

        let root_node = LayoutNode {
            rect: Self::initial_rect(&config, &root_name, true, Vector2::ZERO),
            path: root_path_buf.clone(),
            name: root_name,
            kind: NodeKind::Folder { collapsed: false },
            depth: 0,
        };

        let root = arena.new_node(root_node);
        let mut path_to_node = HashMap::new();
        path_to_node.insert(root_path_buf, root);

        Self {
            arena,
            root,
            path_to_node,
            policy: PackPolicy::new(config.greedy_limit),
            config,
            cascade_truncations: 0,
        }
    }

    /// Build from a flat scan. Entries whose parent is unknown are skipped.
    pub fn from_entries<P: AsRef<Path>>(
        root_path: P,
        entries: &[ScannedEntry],
        config: LayoutConfig,
    ) -> Self {
        let mut tree = Self::with_config(root_path, config);
        for entry in entries {
            if tree.insert_path(&entry.path, entry.is_dir).is_none() {
                tracing::debug!("no parent for {:?}, skipped", entry.path);
            }
        }
        tree
    }

    /// Enumerate `root_path` through `source` and pack the result.
    pub fn build<P: AsRef<Path>>(
        root_path: P,
        source: &dyn DirectorySource,
        config: LayoutConfig,
    ) -> Result<Self> {
        let mut tree = Self::with_config(root_path, config);
        let mut stats = RefreshStats::default();
        tree.refresh_folder(tree.root, source, &mut stats);
        tree.adjust_tree_location()?;
        Ok(tree)
    }

    fn initial_rect(config: &LayoutConfig, name: &str, is_dir: bool, origin: Vector2) -> Rect {
        let width = name_width(name, config.glyph_width);
        if is_dir {
            Rect::new(origin, width * 2.0, config.folder_height)
        } else {
            Rect::new(origin, width, config.file_height)
        }
    }

    // --- access ---

    pub fn get_root(&self) -> NodeId {
        self.root
    }

    pub fn get_arena(&self) -> &Arena<LayoutNode> {
        &self.arena
    }

    pub fn get_node(&self, path: &Path) -> Option<NodeId> {
        self.path_to_node.get(path).copied()
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn padding(&self) -> f64 {
        self.config.padding
    }

    pub fn node(&self, id: NodeId) -> Option<&LayoutNode> {
        self.arena.get(id).map(|n| n.get())
    }

    pub fn rect(&self, id: NodeId) -> Option<Rect> {
        self.node(id).map(|n| n.rect)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id)?.parent()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.ancestors(&self.arena).skip(1)
    }

    pub fn find_child(&self, folder: NodeId, name: &str) -> Option<NodeId> {
        self.children(folder).find(|&c| self.data(c).name == name)
    }

    pub fn len(&self) -> usize {
        self.arena.count()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.count() == 0
    }

    /// Cascades cut short by the level guard since the tree was created.
    pub fn cascade_truncations(&self) -> usize {
        self.cascade_truncations
    }

    fn contains_node(&self, id: NodeId) -> bool {
        self.arena.get(id).is_some_and(|n| !n.is_removed())
    }

    fn data(&self, id: NodeId) -> &LayoutNode {
        self.arena[id].get()
    }

    fn data_mut(&mut self, id: NodeId) -> &mut LayoutNode {
        self.arena[id].get_mut()
    }

    fn child_ids(&self, id: NodeId) -> Vec<NodeId> {
        id.children(&self.arena).collect()
    }

    fn expect_folder(&self, id: NodeId) -> Result<()> {
        if !self.contains_node(id) {
            return Err(LayoutError::UnknownNode);
        }
        let node = self.data(id);
        if node.is_folder() {
            Ok(())
        } else {
            Err(LayoutError::NotAFolder(node.path.clone()))
        }
    }

    fn expect_node(&self, id: NodeId) -> Result<()> {
        if self.contains_node(id) {
            Ok(())
        } else {
            Err(LayoutError::UnknownNode)
        }
    }

    // --- construction ---

    /// Append a child to `parent`. The new node sits at the parent's origin
    /// until the next re-pack.
    pub fn add_child(&mut self, parent: NodeId, name: &str, is_dir: bool) -> Result<NodeId> {
        self.expect_folder(parent)?;

        let (path, depth, origin) = {
            let p = self.data(parent);
            (p.path.join(name), p.depth + 1, p.rect.origin)
        };
        let node = LayoutNode {
            rect: Self::initial_rect(&self.config, name, is_dir, origin),
            path: path.clone(),
            name: name.to_string(),
            kind: if is_dir {
                NodeKind::Folder { collapsed: false }
            } else {
                NodeKind::File
            },
            depth,
        };

        let id = self.arena.new_node(node);
        parent.append(id, &mut self.arena);
        self.path_to_node.insert(path, id);
        Ok(id)
    }

    pub fn add_folder(&mut self, parent: NodeId, name: &str) -> Result<NodeId> {
        self.add_child(parent, name, true)
    }

    pub fn add_file(&mut self, parent: NodeId, name: &str) -> Result<NodeId> {
        self.add_child(parent, name, false)
    }

    /// Add a node by full path; its parent must already be in the tree.
    pub fn insert_path(&mut self, path: &Path, is_dir: bool) -> Option<NodeId> {
        if let Some(&existing) = self.path_to_node.get(path) {
            return Some(existing);
        }
        let parent = *self.path_to_node.get(path.parent()?)?;
        let name = path.file_name()?.to_str()?.to_string();
        self.add_child(parent, &name, is_dir).ok()
    }

    pub fn set_collapsed(&mut self, folder: NodeId, collapsed: bool) -> Result<()> {
        self.expect_folder(folder)?;
        self.data_mut(folder).kind = NodeKind::Folder { collapsed };
        Ok(())
    }

    /// Returns the new state.
    pub fn toggle_collapsed(&mut self, folder: NodeId) -> Result<bool> {
        self.expect_folder(folder)?;
        let collapsed = !self.data(folder).is_collapsed();
        self.data_mut(folder).kind = NodeKind::Folder { collapsed };
        Ok(collapsed)
    }

    /// Overwrite a node's rectangle without touching children or ancestors.
    pub(crate) fn set_rect(&mut self, id: NodeId, rect: Rect) {
        self.data_mut(id).rect = rect;
    }

    // --- mutation ---

    /// Absolute reposition of a node and, for folders, its whole subtree.
    ///
    /// Never adjusts ancestors and never pushes siblings.
    pub fn move_to(&mut self, id: NodeId, origin: Vector2) -> Result<()> {
        self.expect_node(id)?;
        self.place(id, origin);
        Ok(())
    }

    fn place(&mut self, id: NodeId, origin: Vector2) {
        let current = self.data(id).rect.origin;
        for child in self.child_ids(id) {
            let offset = self.data(child).rect.origin - current;
            self.place(child, origin + offset);
        }
        self.data_mut(id).rect.origin = origin;
    }

    /// Relative move, as done by a drag.
    ///
    /// The node and its subtree are translated, the parent is adjusted, then
    /// siblings hit by the node are pushed away.
    pub fn move_by(&mut self, id: NodeId, delta: Vector2) -> Result<()> {
        self.expect_node(id)?;

        self.data_mut(id).rect.origin += delta;
        for child in self.child_ids(id) {
            let target = self.data(child).rect.origin + delta;
            self.place(child, target);
        }

        let Some(parent) = self.parent(id) else {
            return Ok(());
        };
        self.cascade_adjust(parent);
        if self.push_siblings(id, delta) > 0 {
            self.cascade_adjust(parent);
        }
        Ok(())
    }

    /// Push `displaced` away from `mover` by the length of `delta`.
    ///
    /// One step along the line between the two centers; it does not guarantee
    /// the pair stops overlapping.
    pub fn resolve_collision(
        &mut self,
        mover: NodeId,
        displaced: NodeId,
        delta: Vector2,
    ) -> Result<()> {
        self.expect_node(mover)?;
        self.expect_node(displaced)?;
        self.displace(mover, displaced, delta);
        Ok(())
    }

    fn displace(&mut self, mover: NodeId, displaced: NodeId, delta: Vector2) {
        let from = self.data(mover).rect.center();
        let target = self.data(displaced).rect;
        let direction = (target.center() - from)
            .try_normalize()
            .unwrap_or(Vector2::X);
        let shift = direction * delta.length();
        self.place(displaced, target.origin + shift);
    }

    /// Displace every sibling that collides with `id`, in child order.
    fn push_siblings(&mut self, id: NodeId, delta: Vector2) -> usize {
        let Some(parent) = self.parent(id) else {
            return 0;
        };
        let mut pushed = 0;
        for sibling in self.child_ids(parent) {
            if sibling == id {
                continue;
            }
            if self.data(id).rect.collides(&self.data(sibling).rect) {
                self.displace(id, sibling, delta);
                pushed += 1;
            }
        }
        pushed
    }

    /// Refit a folder around its children and cascade upwards.
    ///
    /// Empty folders keep their rectangle. Otherwise the rectangle becomes the
    /// padded union of the children, siblings it now hits are pushed away, and
    /// the parent is adjusted in turn.
    pub fn adjust(&mut self, folder: NodeId) -> Result<()> {
        self.expect_folder(folder)?;
        self.cascade_adjust(folder);
        Ok(())
    }

    /// Set the folder rectangle to the padded union of its children.
    /// Returns the previous rectangle, or `None` for an empty folder.
    fn fit(&mut self, folder: NodeId) -> Option<Rect> {
        let bounds = Rect::bounding(folder.children(&self.arena).map(|c| &self.arena[c].get().rect))?;
        let padded = bounds.inflate(self.config.padding);
        let node = self.data_mut(folder);
        let previous = node.rect;
        node.rect = padded;
        Some(previous)
    }

    fn cascade_adjust(&mut self, folder: NodeId) {
        let mut current = folder;
        let mut level = 0usize;

        loop {
            if level >= self.config.max_cascade_levels {
                self.cascade_truncations += 1;
                tracing::warn!(
                    "adjust cascade from {:?} stopped after {} levels",
                    self.data(folder).path,
                    level
                );
                return;
            }

            let Some(previous) = self.fit(current) else {
                return;
            };
            let Some(parent) = self.parent(current) else {
                return;
            };

            let shift = edge_shift(&previous, &self.data(current).rect);
            self.push_siblings(current, shift);

            current = parent;
            level += 1;
        }
    }

    // --- packing ---

    /// Re-pack the whole tree.
    pub fn adjust_tree_location(&mut self) -> Result<()> {
        self.repack(self.root)
    }

    /// Re-pack the subtree under `folder` with the configured policy.
    pub fn repack(&mut self, folder: NodeId) -> Result<()> {
        self.expect_folder(folder)?;
        self.repack_subtree(folder, PackChoice::Policy)?;
        self.cascade_adjust(folder);
        Ok(())
    }

    /// Re-pack the subtree under `folder` using one strategy everywhere.
    pub fn repack_with(&mut self, folder: NodeId, strategy: &dyn PackStrategy) -> Result<()> {
        self.expect_folder(folder)?;
        self.repack_subtree(folder, PackChoice::Fixed(strategy))?;
        self.cascade_adjust(folder);
        Ok(())
    }

    /// Post-order: children are packed before they are treated as fixed-size
    /// boxes by their parent. Inner folders are only refitted here; the caller
    /// runs the full cascade once for the top of the subtree.
    fn repack_subtree(&mut self, folder: NodeId, choice: PackChoice<'_>) -> Result<()> {
        let children = self.child_ids(folder);
        for &child in &children {
            if self.data(child).is_folder() {
                self.repack_subtree(child, choice)?;
            }
        }
        if children.is_empty() {
            return Ok(());
        }

        let rects: Vec<Rect> = children.iter().map(|&c| self.data(c).rect).collect();
        let strategy = match choice {
            PackChoice::Fixed(strategy) => strategy,
            PackChoice::Policy => {
                let folders = children.iter().filter(|&&c| self.data(c).is_folder()).count();
                let homogeneous = folders == 0 || folders == children.len();
                self.policy.select(children.len(), homogeneous)
            }
        };

        let packed = strategy.pack(&rects, self.config.padding);
        self.verify_packing(folder, strategy, &rects, &packed)?;

        let base = self.data(folder).rect.origin;
        for (&child, rect) in children.iter().zip(&packed) {
            self.place(child, rect.origin + base);
        }
        self.fit(folder);

        tracing::trace!(
            "packed {} children of {:?} with {}",
            children.len(),
            self.data(folder).path,
            strategy.name()
        );
        Ok(())
    }

    fn verify_packing(
        &self,
        folder: NodeId,
        strategy: &dyn PackStrategy,
        input: &[Rect],
        output: &[Rect],
    ) -> Result<()> {
        let detail = if output.len() != input.len() {
            Some(format!("{} rectangles in, {} out", input.len(), output.len()))
        } else {
            input
                .iter()
                .zip(output)
                .position(|(a, b)| !a.same_size(b))
                .map(|i| {
                    format!(
                        "rectangle {} resized from {}x{} to {}x{}",
                        i, input[i].width, input[i].height, output[i].width, output[i].height
                    )
                })
        };

        let Some(detail) = detail else {
            return Ok(());
        };
        let err = LayoutError::PackerContract {
            strategy: strategy.name(),
            folder: self.data(folder).path.clone(),
            detail,
        };
        tracing::error!("{}", err);
        debug_assert!(false, "{}", err);
        Err(err)
    }

    // --- incremental refresh ---

    /// Merge a fresh listing into the tree and re-pack.
    ///
    /// New entries are appended, existing children keep their nodes, and
    /// children no longer listed are parked at their parent's origin.
    pub fn refresh(&mut self, source: &dyn DirectorySource) -> Result<RefreshStats> {
        let mut stats = RefreshStats::default();
        self.refresh_folder(self.root, source, &mut stats);
        self.adjust_tree_location()?;
        Ok(stats)
    }

    fn refresh_folder(&mut self, folder: NodeId, source: &dyn DirectorySource, stats: &mut RefreshStats) {
        let path = self.data(folder).path.clone();
        let listing = match source.list(&path) {
            Ok(listing) => listing,
            Err(e) => {
                stats.unreadable += 1;
                tracing::warn!("cannot list {:?}: {}", path, e);
                return;
            }
        };

        let mut listed = HashSet::with_capacity(listing.len());
        for entry in listing {
            let child = match self.find_child(folder, &entry.name) {
                Some(existing) => existing,
                None => match self.add_child(folder, &entry.name, entry.is_dir) {
                    Ok(added) => {
                        stats.added += 1;
                        added
                    }
                    Err(e) => {
                        tracing::warn!("cannot add {:?} under {:?}: {}", entry.name, path, e);
                        continue;
                    }
                },
            };
            if entry.is_dir && self.data(child).is_folder() {
                self.refresh_folder(child, source, stats);
            }
            listed.insert(entry.name);
        }

        let origin = self.data(folder).rect.origin;
        for child in self.child_ids(folder) {
            if !listed.contains(&self.data(child).name) {
                stats.missing += 1;
                self.place(child, origin);
            }
        }
    }
}

/// Largest movement of any edge between two boxes, per axis.
fn edge_shift(before: &Rect, after: &Rect) -> Vector2 {
    let dx = (after.left() - before.left())
        .abs()
        .max((after.right() - before.right()).abs());
    let dy = (after.top() - before.top())
        .abs()
        .max((after.bottom() - before.bottom()).abs());
    Vector2::new(dx, dy)
}
