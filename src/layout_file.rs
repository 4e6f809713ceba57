//! Layout files: a JSON snapshot of every node rectangle, keyed by name.
//!
//! ```json
//! { "layout": [ { "kind": "directory", "name": "project",
//!                 "bodyShape": { "width": 500.0, "height": 300.0,
//!                                "locationLeftTop": [0.0, 0.0] },
//!                 "children": [ ... ] } ] }
//! ```

use indextree::NodeId;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{LayoutError, Result};
use crate::geometry::{Rect, Vector2};
use crate::tree::LayoutTree;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyShape {
    pub width: f64,
    pub height: f64,
    pub location_left_top: [f64; 2],
}

impl From<Rect> for BodyShape {
    fn from(rect: Rect) -> Self {
        Self {
            width: rect.width,
            height: rect.height,
            location_left_top: [rect.origin.x, rect.origin.y],
        }
    }
}

impl From<&BodyShape> for Rect {
    fn from(shape: &BodyShape) -> Self {
        let [x, y] = shape.location_left_top;
        Rect::new(Vector2::new(x, y), shape.width, shape.height)
    }
}

/// One node of a layout file. Only directories carry `children`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    /// `"file"` or `"directory"`. Kept as text so an unknown kind is reported
    /// as a mismatch against the tree rather than a parse failure.
    pub kind: String,
    pub name: String,
    pub body_shape: BodyShape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<NodeRecord>>,
}

impl NodeRecord {
    fn child(&self, name: &str) -> Option<&NodeRecord> {
        self.children.as_deref()?.iter().find(|c| c.name == name)
    }
}

/// The whole file. `layout` holds the root record, or nothing for an empty tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutDocument {
    pub layout: Vec<NodeRecord>,
}

/// What [`LayoutDocument::apply`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Nodes whose rectangle came from the document.
    pub applied: usize,
    /// Nodes absent from the document, parked at their parent's origin.
    pub repositioned: usize,
}

impl LayoutDocument {
    /// Snapshot every rectangle in the tree.
    pub fn capture(tree: &LayoutTree) -> Self {
        Self {
            layout: vec![record_for(tree, tree.get_root())],
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_json()?)?;
        tracing::debug!("layout saved to {:?}", path.as_ref());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Write the stored rectangles back onto `tree`, top down.
    ///
    /// Stops at the first node whose kind or name disagrees with its record;
    /// nodes visited before that keep their new rectangles. Children missing
    /// from the document move to their parent's updated origin, and records
    /// with no matching node are ignored.
    pub fn apply(&self, tree: &mut LayoutTree) -> Result<ApplyReport> {
        let root_record = self.layout.first().ok_or(LayoutError::EmptyDocument)?;
        let mut report = ApplyReport::default();
        apply_record(tree, tree.get_root(), root_record, &mut report)?;
        tracing::debug!(
            "layout applied: {} nodes, {} repositioned",
            report.applied,
            report.repositioned
        );
        Ok(report)
    }
}

fn record_for(tree: &LayoutTree, id: NodeId) -> NodeRecord {
    let node = tree.get_arena()[id].get();
    let children = node
        .is_folder()
        .then(|| tree.children(id).map(|c| record_for(tree, c)).collect());

    NodeRecord {
        kind: node.kind_label().to_string(),
        name: node.name.clone(),
        body_shape: node.rect.into(),
        children,
    }
}

fn apply_record(
    tree: &mut LayoutTree,
    id: NodeId,
    record: &NodeRecord,
    report: &mut ApplyReport,
) -> Result<()> {
    let node = tree.node(id).ok_or(LayoutError::UnknownNode)?;
    if record.kind != node.kind_label() || record.name != node.name {
        return Err(LayoutError::StructuralMismatch {
            path: node.path.clone(),
            expected_kind: node.kind_label(),
            expected_name: node.name.clone(),
            found_kind: record.kind.clone(),
            found_name: record.name.clone(),
        });
    }

    let rect = Rect::from(&record.body_shape);
    tree.set_rect(id, rect);
    report.applied += 1;

    let children: Vec<NodeId> = tree.children(id).collect();
    for child in children {
        let name = tree.node(child).map(|n| n.name.clone()).unwrap_or_default();
        match record.child(&name) {
            Some(child_record) => apply_record(tree, child, child_record, report)?,
            None => {
                tree.move_to(child, rect.origin)?;
                report.repositioned += 1;
            }
        }
    }
    Ok(())
}
