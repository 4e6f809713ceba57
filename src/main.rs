use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use visualfile::layout_file::LayoutDocument;
use visualfile::loader::spawn_build;
use visualfile::{query, Config, Vector2};

/// Lay out a directory tree as nested rectangles.
#[derive(Parser, Debug)]
#[command(name = "visualfile", version, about)]
struct Args {
    /// Directory to lay out
    path: PathBuf,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Restore node positions from a layout file
    #[arg(long)]
    layout: Option<PathBuf>,

    /// Write the final layout to this file
    #[arg(long)]
    save: Option<PathBuf>,

    /// Report the node under a world-space point
    #[arg(long, num_args = 2, value_names = ["X", "Y"], allow_negative_numbers = true)]
    probe: Option<Vec<f64>>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };

    let built = spawn_build(&args.path, config)
        .wait()
        .with_context(|| format!("building layout for {}", args.path.display()))?;
    let mut tree = built.tree;

    if let Some(layout_path) = &args.layout {
        let report = LayoutDocument::load(layout_path)
            .and_then(|doc| doc.apply(&mut tree))
            .with_context(|| format!("applying layout {}", layout_path.display()))?;
        println!(
            "Layout restored: {} nodes placed, {} repositioned",
            report.applied, report.repositioned
        );
    }

    let root = tree.get_root();
    let bounds = tree.rect(root).context("tree has no root")?;
    println!(
        "{}: {} files, {} folders, depth {}",
        args.path.display(),
        query::files(&tree, root).len(),
        query::folders(&tree, root).len(),
        query::max_folder_depth(&tree)
    );
    println!(
        "Bounds: {:.1} x {:.1} at ({:.1}, {:.1})",
        bounds.width, bounds.height, bounds.origin.x, bounds.origin.y
    );

    let overlaps = query::overlapping_siblings(&tree).len();
    if overlaps > 0 || tree.cascade_truncations() > 0 {
        println!(
            "Warnings: {} overlapping sibling pairs, {} truncated cascades",
            overlaps,
            tree.cascade_truncations()
        );
    }

    if let Some(coords) = &args.probe {
        let point = Vector2::new(coords[0], coords[1]);
        match query::hit_test(&tree, point).and_then(|id| tree.node(id)) {
            Some(node) => println!("Hit ({}, {}): {} [{}]", point.x, point.y, node.path.display(), node.kind_label()),
            None => println!("Hit ({}, {}): nothing", point.x, point.y),
        }
    }

    if let Some(save_path) = &args.save {
        LayoutDocument::capture(&tree)
            .save(save_path)
            .with_context(|| format!("saving layout {}", save_path.display()))?;
        println!("Layout saved to {}", save_path.display());
    }

    Ok(())
}
