//! Run pipeline for the CLI commands
//!
//! Each command reads its tables, runs the resolver stages, validates the
//! result, and only then writes outputs and a lock file. A failure at any
//! stage leaves the output directory without new tables.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::lanes::{resolve_directed_links, ResolveOptions, ResolveStats};
use crate::manifest::RunLock;
use crate::numbering::{number_links, number_nodes};
use crate::region::{assign_regions, load_regions, AssignStats, RegionSet};
use crate::table::{read_table, write_table, DirectedLink, EdgeRecord, NodeRecord};
use crate::validate::validate_outputs;

pub const LINKS_FILE: &str = "links.json";
pub const NODES_FILE: &str = "nodes.json";

pub struct ResolveConfig {
    pub edges: PathBuf,
    pub outdir: PathBuf,
    pub trace: Option<(i64, i64)>,
}

pub struct AssignConfig {
    pub links: PathBuf,
    pub nodes: PathBuf,
    pub regions: PathBuf,
    pub outdir: PathBuf,
}

pub struct BuildConfig {
    pub edges: PathBuf,
    pub nodes: PathBuf,
    pub regions: PathBuf,
    pub outdir: PathBuf,
    pub trace: Option<(i64, i64)>,
}

pub struct RunResult {
    pub links_file: PathBuf,
    pub nodes_file: Option<PathBuf>,
    pub lock_file: PathBuf,
    pub links_count: usize,
    pub nodes_count: usize,
}

fn prepare_outdir(outdir: &Path) -> Result<()> {
    std::fs::create_dir_all(outdir)
        .with_context(|| format!("Failed to create output directory {}", outdir.display()))
}

fn load_regions_first(path: &Path) -> Result<RegionSet> {
    println!("Loading regions...");
    let regions = load_regions(path)?;
    println!(
        "  ✓ {} regions, coverage hull with {} vertices",
        regions.regions().len(),
        regions.coverage().exterior().0.len()
    );
    Ok(regions)
}

fn resolve_stage(edges_path: &Path, trace: Option<(i64, i64)>) -> Result<(Vec<DirectedLink>, ResolveStats)> {
    println!("Reading edges...");
    let edges: Vec<EdgeRecord> = read_table(edges_path)?;
    println!("  ✓ {} edges", edges.len());

    println!("Resolving directions and lanes...");
    let resolution = resolve_directed_links(edges, &ResolveOptions { trace })
        .context("Directional attribute resolution failed")?;
    let stats = &resolution.stats;
    println!(
        "  ✓ {} links ({} two-way pairs, {} single rows, {} reverse links synthesized)",
        stats.output_links, stats.pairs_both, stats.pairs_single, stats.synthesized_reverse
    );
    println!(
        "  ✓ Lanes: {} from tags, tiers {:?}",
        stats.lanes_from_tags, stats.lanes_by_tier
    );
    Ok((resolution.links, resolution.stats))
}

fn assign_stage(
    links: Vec<DirectedLink>,
    nodes: Vec<NodeRecord>,
    regions: &RegionSet,
) -> Result<(Vec<DirectedLink>, Vec<NodeRecord>, AssignStats)> {
    println!("Assigning counties...");
    let mut outcome = assign_regions(links, nodes, regions).context("Region assignment failed")?;
    let stats = &outcome.stats;
    println!(
        "  ✓ {} links, {} nodes inside coverage ({} links, {} nodes dropped)",
        outcome.links.len(),
        outcome.nodes.len(),
        stats.links_outside_coverage,
        stats.nodes_unreferenced
    );
    println!(
        "  ✓ {} boundary-crossing links, {} links and {} nodes kept their county",
        stats.links_multi_region, stats.links_preserved, stats.nodes_preserved
    );

    number_nodes(&mut outcome.nodes);
    number_links(&mut outcome.links);
    println!("  ✓ Model ids assigned");

    Ok((outcome.links, outcome.nodes, outcome.stats))
}

fn ensure_valid(links: &[DirectedLink], nodes: Option<&[NodeRecord]>) -> Result<()> {
    let report = validate_outputs(links, nodes);
    if !report.passed {
        bail!(
            "Output invariants violated: {}",
            report.errors.join("; ")
        );
    }
    Ok(())
}

fn staged_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.partial"))
}

fn discard(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::debug!(path = %path.display(), error = %e, "nothing to discard");
        }
    }
}

/// Write a links table and optional nodes table as one unit.
///
/// Both tables go to hidden staging files first and are renamed into place
/// only after every write succeeded.
fn commit_tables(
    links_file: &Path,
    links: &[DirectedLink],
    nodes: Option<(&Path, &[NodeRecord])>,
) -> Result<()> {
    let staged_links = staged_path(links_file);
    let staged_nodes = nodes.map(|(path, _)| staged_path(path));
    let staged: Vec<PathBuf> = std::iter::once(staged_links.clone())
        .chain(staged_nodes.clone())
        .collect();

    let written = write_table(&staged_links, links).and_then(|()| match (nodes, &staged_nodes) {
        (Some((_, rows)), Some(path)) => write_table(path, rows),
        _ => Ok(()),
    });
    if let Err(e) = written {
        discard(&staged);
        return Err(e).context("Failed to write output tables");
    }

    std::fs::rename(&staged_links, links_file).with_context(|| {
        discard(&staged);
        format!("Failed to move {} into place", links_file.display())
    })?;
    if let (Some((nodes_file, _)), Some(path)) = (nodes, &staged_nodes) {
        std::fs::rename(path, nodes_file).with_context(|| {
            discard(&[path.clone(), links_file.to_path_buf()]);
            format!("Failed to move {} into place", nodes_file.display())
        })?;
    }
    Ok(())
}

/// Attribute resolver only: edges in, directed links out
pub fn run_resolve(config: ResolveConfig) -> Result<RunResult> {
    println!("🦋 Starting resolve: Directional Attribute Resolver");
    println!("📂 Edges: {}", config.edges.display());
    println!("📂 Output: {}", config.outdir.display());
    println!();

    let (links, stats) = resolve_stage(&config.edges, config.trace)?;
    ensure_valid(&links, None)?;

    prepare_outdir(&config.outdir)?;
    let links_file = config.outdir.join(LINKS_FILE);
    commit_tables(&links_file, &links, None)?;
    println!("  ✓ Wrote {}", links_file.display());

    println!();
    println!("🔒 Generating lock file...");
    let lock_file = config.outdir.join("resolve.lock.json");
    let mut lock = RunLock::new("resolve");
    lock.input(&config.edges)?;
    lock.output(&links_file)?;
    lock.count("links", links.len());
    lock.stats("resolve", &stats)?;
    lock.write(&lock_file)?;

    println!();
    println!("✅ resolve complete!");
    Ok(RunResult {
        links_file,
        nodes_file: None,
        lock_file,
        links_count: links.len(),
        nodes_count: 0,
    })
}

fn write_assigned(
    command: &str,
    inputs: &[&Path],
    outdir: &Path,
    links: &[DirectedLink],
    nodes: &[NodeRecord],
    mut lock: RunLock,
) -> Result<RunResult> {
    prepare_outdir(outdir)?;
    let links_file = outdir.join(LINKS_FILE);
    let nodes_file = outdir.join(NODES_FILE);
    commit_tables(&links_file, links, Some((nodes_file.as_path(), nodes)))?;
    println!("  ✓ Wrote {}", links_file.display());
    println!("  ✓ Wrote {}", nodes_file.display());

    println!();
    println!("🔒 Generating lock file...");
    for input in inputs {
        lock.input(input)?;
    }
    lock.output(&links_file)?;
    lock.output(&nodes_file)?;
    lock.count("links", links.len());
    lock.count("nodes", nodes.len());
    let lock_file = outdir.join(format!("{command}.lock.json"));
    lock.write(&lock_file)?;

    Ok(RunResult {
        links_file,
        nodes_file: Some(nodes_file),
        lock_file,
        links_count: links.len(),
        nodes_count: nodes.len(),
    })
}

/// Regional assignment only: directed links and nodes in, labelled tables out
pub fn run_assign(config: AssignConfig) -> Result<RunResult> {
    println!("🦋 Starting assign: Regional Assignment Resolver");
    println!("📂 Links: {}", config.links.display());
    println!("📂 Nodes: {}", config.nodes.display());
    println!("📂 Regions: {}", config.regions.display());
    println!("📂 Output: {}", config.outdir.display());
    println!();

    let regions = load_regions_first(&config.regions)?;

    println!("Reading links and nodes...");
    let links: Vec<DirectedLink> = read_table(&config.links)?;
    let nodes: Vec<NodeRecord> = read_table(&config.nodes)?;
    println!("  ✓ {} links, {} nodes", links.len(), nodes.len());

    let (links, nodes, stats) = assign_stage(links, nodes, &regions)?;
    ensure_valid(&links, Some(nodes.as_slice()))?;

    let mut lock = RunLock::new("assign");
    lock.stats("assign", &stats)?;
    let result = write_assigned(
        "assign",
        &[config.links.as_path(), config.nodes.as_path(), config.regions.as_path()],
        &config.outdir,
        &links,
        &nodes,
        lock,
    )?;

    println!();
    println!("✅ assign complete!");
    Ok(result)
}

/// Both resolvers in order
pub fn run_build(config: BuildConfig) -> Result<RunResult> {
    println!("🦋 Starting build: Directional Attributes + Regional Assignment");
    println!("📂 Edges: {}", config.edges.display());
    println!("📂 Nodes: {}", config.nodes.display());
    println!("📂 Regions: {}", config.regions.display());
    println!("📂 Output: {}", config.outdir.display());
    println!();

    let regions = load_regions_first(&config.regions)?;
    let (links, resolve_stats) = resolve_stage(&config.edges, config.trace)?;

    println!("Reading nodes...");
    let nodes: Vec<NodeRecord> = read_table(&config.nodes)?;
    println!("  ✓ {} nodes", nodes.len());

    let (links, nodes, assign_stats) = assign_stage(links, nodes, &regions)?;
    ensure_valid(&links, Some(nodes.as_slice()))?;

    let mut lock = RunLock::new("build");
    lock.stats("resolve", &resolve_stats)?;
    lock.stats("assign", &assign_stats)?;
    let result = write_assigned(
        "build",
        &[config.edges.as_path(), config.nodes.as_path(), config.regions.as_path()],
        &config.outdir,
        &links,
        &nodes,
        lock,
    )?;

    println!();
    println!("✅ build complete!");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_nodes_write_leaves_no_tables() {
        let dir = tempfile::tempdir().unwrap();
        let links_file = dir.path().join(LINKS_FILE);
        let nodes_file = dir.path().join(NODES_FILE);
        // a directory where the staged nodes file should go makes its write fail
        std::fs::create_dir(staged_path(&nodes_file)).unwrap();

        let no_nodes: Vec<NodeRecord> = Vec::new();
        let err = commit_tables(&links_file, &[], Some((nodes_file.as_path(), no_nodes.as_slice()))).unwrap_err();

        assert!(format!("{err:#}").contains("Failed to write output tables"));
        assert!(!links_file.exists());
        assert!(!nodes_file.exists());
        assert!(!staged_path(&links_file).exists());
    }

    #[test]
    fn committed_tables_replace_staging_files() {
        let dir = tempfile::tempdir().unwrap();
        let links_file = dir.path().join(LINKS_FILE);
        let nodes_file = dir.path().join(NODES_FILE);

        let no_nodes: Vec<NodeRecord> = Vec::new();
        commit_tables(&links_file, &[], Some((nodes_file.as_path(), no_nodes.as_slice()))).unwrap();

        assert!(links_file.exists());
        assert!(nodes_file.exists());
        assert!(!staged_path(&links_file).exists());
        assert!(!staged_path(&nodes_file).exists());
        let links: Vec<DirectedLink> = read_table(&links_file).unwrap();
        assert!(links.is_empty());
    }
}
