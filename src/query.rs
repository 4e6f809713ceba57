//! Read-only lookups over a [`LayoutTree`]: point hit tests, flat
//! enumeration and viewport culling.

use indextree::NodeId;

use crate::geometry::{Rect, Vector2};
use crate::tree::LayoutTree;

/// Deepest node containing `point`, starting from the root.
pub fn hit_test(tree: &LayoutTree, point: Vector2) -> Option<NodeId> {
    hit_test_from(tree, tree.get_root(), point)
}

/// Deepest node under `start` containing `point`.
///
/// Children are tried in order and the first one containing the point wins.
/// A folder whose children all miss is itself the hit. Collapsed folders are
/// never descended into.
pub fn hit_test_from(tree: &LayoutTree, start: NodeId, point: Vector2) -> Option<NodeId> {
    let node = tree.node(start)?;
    if !node.rect.contains(point) {
        return None;
    }

    let mut current = start;
    'descend: loop {
        let node = tree.node(current)?;
        if !node.is_folder() || node.is_collapsed() {
            return Some(current);
        }
        for child in tree.children(current) {
            if tree.rect(child).is_some_and(|r| r.contains(point)) {
                current = child;
                continue 'descend;
            }
        }
        return Some(current);
    }
}

/// Every node under `start` in pre-order, `start` included.
pub fn descendants(tree: &LayoutTree, start: NodeId) -> Vec<NodeId> {
    start.descendants(tree.get_arena()).collect()
}

/// File nodes under `start`, pre-order.
pub fn files(tree: &LayoutTree, start: NodeId) -> Vec<NodeId> {
    start
        .descendants(tree.get_arena())
        .filter(|&id| tree.node(id).is_some_and(|n| n.is_file()))
        .collect()
}

/// Folder nodes under `start`, pre-order, `start` included when it is a folder.
pub fn folders(tree: &LayoutTree, start: NodeId) -> Vec<NodeId> {
    start
        .descendants(tree.get_arena())
        .filter(|&id| tree.node(id).is_some_and(|n| n.is_folder()))
        .collect()
}

/// Nodes whose rectangle meets `viewport`, pre-order.
///
/// A folder outside the viewport hides its whole subtree, and the children of
/// a collapsed folder are skipped.
pub fn visible(tree: &LayoutTree, viewport: &Rect) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![tree.get_root()];

    while let Some(id) = stack.pop() {
        let Some(node) = tree.node(id) else {
            continue;
        };
        if !node.rect.collides(viewport) {
            continue;
        }
        out.push(id);
        if node.is_folder() && !node.is_collapsed() {
            let children: Vec<NodeId> = tree.children(id).collect();
            stack.extend(children.into_iter().rev());
        }
    }

    out
}

/// Number of folder levels, the root included, so never less than 1.
///
/// Usable directly as the divisor when scaling by depth.
pub fn max_folder_depth(tree: &LayoutTree) -> usize {
    folders(tree, tree.get_root())
        .into_iter()
        .filter_map(|id| tree.node(id).map(|n| n.depth))
        .max()
        .unwrap_or(0)
        + 1
}

/// Sibling pairs whose rectangles collide, in tree order.
pub fn overlapping_siblings(tree: &LayoutTree) -> Vec<(NodeId, NodeId)> {
    let mut pairs = Vec::new();
    for folder in folders(tree, tree.get_root()) {
        let children: Vec<(NodeId, Rect)> = tree
            .children(folder)
            .filter_map(|c| tree.rect(c).map(|r| (c, r)))
            .collect();
        for (i, (a, ra)) in children.iter().enumerate() {
            for (b, rb) in &children[i + 1..] {
                if ra.collides(rb) {
                    pairs.push((*a, *b));
                }
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    /// root
    /// ├── docs/ (guide.md)
    /// └── notes.txt
    fn packed_tree() -> (LayoutTree, NodeId, NodeId, NodeId) {
        let mut tree = LayoutTree::new("/r");
        let root = tree.get_root();
        let docs = tree.add_folder(root, "docs").unwrap();
        let guide = tree.add_file(docs, "guide.md").unwrap();
        tree.add_file(root, "notes.txt").unwrap();
        tree.adjust_tree_location().unwrap();
        (tree, docs, guide, root)
    }

    #[test]
    fn test_hit_test_finds_deepest() {
        let (tree, docs, guide, root) = packed_tree();

        let guide_center = tree.rect(guide).unwrap().center();
        assert_eq!(hit_test(&tree, guide_center), Some(guide));

        // Inside the folder padding but outside its only child.
        let docs_rect = tree.rect(docs).unwrap();
        let in_padding = docs_rect.origin + Vector2::new(1.0, 1.0);
        assert_eq!(hit_test(&tree, in_padding), Some(docs));

        let root_rect = tree.rect(root).unwrap();
        assert_eq!(hit_test(&tree, root_rect.origin + Vector2::new(1.0, 1.0)), Some(root));
        assert_eq!(hit_test(&tree, root_rect.origin - Vector2::new(1.0, 1.0)), None);
    }

    #[test]
    fn test_hit_test_edges_count() {
        let (tree, _, guide, _) = packed_tree();
        let rect = tree.rect(guide).unwrap();
        assert_eq!(hit_test(&tree, Vector2::new(rect.right(), rect.bottom())), Some(guide));
    }

    #[test]
    fn test_collapsed_folder_is_opaque() {
        let (mut tree, docs, guide, _) = packed_tree();
        let point = tree.rect(guide).unwrap().center();

        tree.set_collapsed(docs, true).unwrap();
        assert_eq!(hit_test(&tree, point), Some(docs));
        assert!(!visible(&tree, &tree.rect(docs).unwrap()).contains(&guide));
    }

    #[test]
    fn test_first_matching_child_wins() {
        let mut tree = LayoutTree::new("/r");
        let root = tree.get_root();
        let first = tree.add_file(root, "first").unwrap();
        let second = tree.add_file(root, "second").unwrap();
        // Both start at the root origin, stacked on top of each other.
        let point = Vector2::new(10.0, 10.0);
        assert!(tree.rect(first).unwrap().contains(point));
        assert!(tree.rect(second).unwrap().contains(point));
        assert_eq!(hit_test_from(&tree, root, point), Some(first));
    }

    #[test]
    fn test_enumeration_is_preorder() {
        let (tree, docs, guide, root) = packed_tree();
        let notes = tree.find_child(root, "notes.txt").unwrap();

        assert_eq!(files(&tree, root), vec![guide, notes]);
        assert_eq!(folders(&tree, root), vec![root, docs]);
        assert_eq!(files(&tree, docs), vec![guide]);
        assert_eq!(descendants(&tree, root), vec![root, docs, guide, notes]);
    }

    #[test]
    fn test_visible_culls_outside_subtrees() {
        let (tree, docs, guide, root) = packed_tree();
        let notes = tree.find_child(root, "notes.txt").unwrap();

        let everything = tree.rect(root).unwrap();
        assert_eq!(visible(&tree, &everything), vec![root, docs, guide, notes]);

        let far_away = Rect::from_xywh(1e6, 1e6, 10.0, 10.0);
        assert!(visible(&tree, &far_away).is_empty());

        let only_notes = tree.rect(notes).unwrap();
        let seen = visible(&tree, &only_notes);
        assert!(seen.contains(&notes));
        assert!(!seen.contains(&guide));
    }

    #[test]
    fn test_max_folder_depth() {
        let mut tree = LayoutTree::new("/r");
        assert_eq!(max_folder_depth(&tree), 1);

        let root = tree.get_root();
        let a = tree.add_folder(root, "a").unwrap();
        let b = tree.add_folder(a, "b").unwrap();
        tree.add_file(b, "deep.txt").unwrap();
        assert_eq!(max_folder_depth(&tree), 3);
    }

    #[test]
    fn test_overlapping_siblings() {
        let (tree, _, _, _) = packed_tree();
        assert!(overlapping_siblings(&tree).is_empty());

        let mut stacked = LayoutTree::new("/r");
        let root = stacked.get_root();
        let a = stacked.add_file(root, "a").unwrap();
        let b = stacked.add_file(root, "b").unwrap();
        assert_eq!(overlapping_siblings(&stacked), vec![(a, b)]);
    }
}
