//! Graph command - Project the relationship graph around filtered records

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use ecomap_config::{ConfigOverrides, EdgeClosure};
use ecomap_core::GraphProjection;

use super::{
    graph_builder, load_config_with, open_corpus, print_info, print_warnings, resolve_workspace,
    FilterArgs, OutputFormat, NO_MATCHES,
};
use crate::GlobalOptions;

/// Arguments for the graph command
#[derive(Args, Debug)]
pub struct GraphArgs {
    #[command(flatten)]
    filter: FilterArgs,

    /// Edge closure policy (inclusive-or, strict-and); overrides `graph.closure_policy`
    #[arg(long, short = 'p', value_parser = parse_policy)]
    policy: Option<EdgeClosure>,

    /// Output format
    #[arg(long, short = 'o', value_enum, default_value = "text")]
    output: OutputFormat,

    /// Write the render JSON to a file instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,

    /// Show the one-hop neighbourhood of a node instead of the summary
    #[arg(long, value_name = "ID")]
    neighbors: Option<String>,
}

/// Parse closure policy from string
fn parse_policy(s: &str) -> Result<EdgeClosure, String> {
    s.parse().map_err(|e: ecomap_config::ConfigError| e.to_string())
}

/// Execute the graph command
pub fn execute(args: GraphArgs, global: GlobalOptions) -> Result<()> {
    let workspace = resolve_workspace(&global)?;
    let overrides = ConfigOverrides {
        closure_policy: args.policy,
        ..global.to_config_overrides()
    };
    let config = load_config_with(&global, &workspace, overrides)?;
    let corpus = open_corpus(&config, &workspace)?;
    print_warnings(&corpus.warnings);

    let builder = graph_builder(&config);
    let filter = args.filter.to_filter();
    let projection = corpus.project(&builder, &filter);

    if let Some(ref id) = args.neighbors {
        return print_neighbors(&projection, id);
    }

    if let Some(ref path) = args.out {
        let json = projection
            .to_render_json()
            .context("Failed to serialize graph")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        print_info(
            &format!(
                "Wrote {} nodes and {} edges to {}",
                projection.node_count(),
                projection.edge_count(),
                path.display()
            ),
            global.quiet,
        );
        return Ok(());
    }

    match args.output {
        OutputFormat::Json => {
            let json = projection
                .to_render_json()
                .context("Failed to serialize graph")?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            if projection.seed().is_empty() {
                println!("{}", NO_MATCHES);
                return Ok(());
            }
            print_summary(&projection);
        }
    }

    Ok(())
}

fn print_summary(projection: &GraphProjection) {
    let summary = projection.summary();

    println!("Policy:     {}", summary.policy);
    println!(
        "Nodes:      {} ({} matched, {} unclassified)",
        summary.node_count, summary.seed_count, summary.unclassified_count
    );
    println!("Edges:      {}", summary.edge_count);
    println!("Components: {}", summary.component_count);

    if !summary.groups.is_empty() {
        println!("\nGroups:");
        for (group, count) in &summary.groups {
            println!("  {:<20} {}", group, count);
        }
    }

    if !summary.relationship_types.is_empty() {
        println!("\nRelationship types:");
        for (kind, count) in &summary.relationship_types {
            println!("  {:<20} {}", kind, count);
        }
    }

    println!("\nNodes:");
    for node in projection.nodes().values() {
        let marker = if node.seed { "*" } else { " " };
        println!(
            " {} {} [{}] degree={} size={}",
            marker, node.id, node.group, node.degree, node.size
        );
    }
}

fn print_neighbors(projection: &GraphProjection, id: &str) -> Result<()> {
    let view = projection.to_petgraph();
    let Some(node) = view.node(id) else {
        anyhow::bail!("'{}' is not part of the projection", id);
    };

    println!("{} ({}) [{}]", node.label, node.id, node.group);

    let outgoing = view.outgoing(id);
    let incoming = view.incoming(id);
    if outgoing.is_empty() && incoming.is_empty() {
        println!("  (no relationships)");
        return Ok(());
    }

    for (other, edge) in outgoing {
        println!("  -> {} ({}) [{}]", other.label, other.id, edge.relationship_type);
    }
    for (other, edge) in incoming {
        println!("  <- {} ({}) [{}]", other.label, other.id, edge.relationship_type);
    }

    Ok(())
}
