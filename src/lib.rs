//! Spatial layout engine for file system visualisation.
//!
//! Every file and folder becomes an axis-aligned rectangle. Folders wrap their
//! children with padding, siblings are packed so they never overlap, and the
//! arrangement can be edited by moving nodes, queried by point, and saved to a
//! layout file.

pub mod config;
pub mod crawler;
pub mod error;
pub mod geometry;
pub mod layout_file;
pub mod loader;
pub mod packer;
pub mod query;
pub mod text;
pub mod tree;

pub use config::{Config, ExcludeConfig, LayoutConfig};
pub use error::{LayoutError, Result};
pub use geometry::{Rect, Vector2};
pub use layout_file::{ApplyReport, LayoutDocument};
pub use tree::{LayoutNode, LayoutTree, NodeKind};
