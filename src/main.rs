//! Graph Insight - command line front end
//!
//! Reads a JSON graph snapshot, runs one analysis and prints the result as
//! JSON on stdout. Logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use graph_insight::{
    AnalyticsEngine, CentralityType, CommunityAlgorithm, ComponentKind, EngineConfig,
    GraphAnalyticsEngine, GraphIndex, GraphSnapshot, HullType, NodePositions,
};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "graph-insight")]
#[command(about = "Graph analytics: communities, centrality, components and community hulls")]
struct Cli {
    /// YAML config file (default: ./graph-insight.yaml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every analysis and print the full report
    Analyze {
        /// Snapshot JSON file, or `-` for stdin
        snapshot: PathBuf,
    },

    /// Detect communities
    Communities {
        /// Snapshot JSON file, or `-` for stdin
        snapshot: PathBuf,

        /// Override the configured algorithm (louvain, leiden)
        #[arg(short, long)]
        algorithm: Option<CommunityAlgorithm>,

        /// Override the configured resolution
        #[arg(short, long)]
        resolution: Option<f64>,
    },

    /// Score nodes with one centrality measure
    Centrality {
        /// Snapshot JSON file, or `-` for stdin
        snapshot: PathBuf,

        /// degree, pagerank, eigenvector, katz, closeness or betweenness
        #[arg(short = 't', long = "type", default_value = "pagerank")]
        centrality_type: CentralityType,

        /// Print parallel id/score arrays instead of the full result
        #[arg(long)]
        bulk: bool,
    },

    /// Compute connected components
    Components {
        /// Snapshot JSON file, or `-` for stdin
        snapshot: PathBuf,

        /// Strongly connected components instead of weak ones
        #[arg(long)]
        strong: bool,
    },

    /// Compute community boundaries from the snapshot coordinates
    Hulls {
        /// Snapshot JSON file, or `-` for stdin
        snapshot: PathBuf,

        /// Override the configured hull type (convex, concave)
        #[arg(long)]
        hull_type: Option<HullType>,
    },

    /// Push overlapping community boundaries apart until they settle
    Settle {
        /// Snapshot JSON file, or `-` for stdin
        snapshot: PathBuf,

        /// Override the configured tick cap (0 = unbounded)
        #[arg(long)]
        max_ticks: Option<usize>,
    },
}

/// Output of the `settle` subcommand.
#[derive(Serialize)]
struct SettleOutput {
    displacement: graph_insight::BoundaryPhysicsResult,
    boundaries: Vec<graph_insight::CommunityBoundary>,
}

fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing; stdout is reserved for JSON output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,graph_insight=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = EngineConfig::from_yaml_and_env(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze { snapshot } => {
            let snapshot = read_snapshot(&snapshot)?;
            let engine = GraphAnalyticsEngine::new(config);
            print_json(&engine.analyze(&snapshot)?, cli.pretty)
        }
        Commands::Communities {
            snapshot,
            algorithm,
            resolution,
        } => {
            if let Some(algorithm) = algorithm {
                config.community.algorithm = algorithm;
            }
            if let Some(resolution) = resolution {
                config.community.resolution = resolution;
            }
            let index = GraphIndex::build(&read_snapshot(&snapshot)?)?;
            let engine = GraphAnalyticsEngine::new(config);
            let mut report_progress = |p: &graph_insight::graph::Progress| {
                tracing::debug!(phase = %p.phase, progress = p.progress, "community detection");
            };
            let assignment = engine.detect_communities(&index, Some(&mut report_progress))?;
            print_json(&assignment, cli.pretty)
        }
        Commands::Centrality {
            snapshot,
            centrality_type,
            bulk,
        } => {
            let index = GraphIndex::build(&read_snapshot(&snapshot)?)?;
            let engine = GraphAnalyticsEngine::new(config);
            if bulk {
                print_json(
                    &engine.compute_centrality_bulk(&index, centrality_type)?,
                    cli.pretty,
                )
            } else {
                print_json(&engine.compute_centrality(&index, centrality_type)?, cli.pretty)
            }
        }
        Commands::Components { snapshot, strong } => {
            let index = GraphIndex::build(&read_snapshot(&snapshot)?)?;
            let kind = if strong {
                ComponentKind::Strong
            } else {
                ComponentKind::Weak
            };
            let engine = GraphAnalyticsEngine::new(config);
            print_json(&engine.get_connected_components(&index, kind), cli.pretty)
        }
        Commands::Hulls {
            snapshot,
            hull_type,
        } => {
            if let Some(hull_type) = hull_type {
                config.hull.hull_type = hull_type;
            }
            let snapshot = read_snapshot(&snapshot)?;
            let engine = GraphAnalyticsEngine::new(config);
            print_json(&hulls_for(&engine, &snapshot)?, cli.pretty)
        }
        Commands::Settle {
            snapshot,
            max_ticks,
        } => {
            if let Some(max_ticks) = max_ticks {
                config.physics.max_ticks = max_ticks;
            }
            let snapshot = read_snapshot(&snapshot)?;
            let engine = GraphAnalyticsEngine::new(config);
            let boundaries = hulls_for(&engine, &snapshot)?;
            let mut state = engine.init_boundary_physics(&boundaries)?;
            let displacement = state.run_until_settled();
            tracing::info!(
                ticks = displacement.iteration,
                moved_nodes = displacement.node_ids.len(),
                has_overlaps = displacement.has_overlaps,
                "Settle complete"
            );
            let output = SettleOutput {
                displacement,
                boundaries: state.boundaries().cloned().collect(),
            };
            print_json(&output, cli.pretty)
        }
    }
}

/// Communities first, then one boundary per community.
fn hulls_for(
    engine: &GraphAnalyticsEngine,
    snapshot: &GraphSnapshot,
) -> Result<Vec<graph_insight::CommunityBoundary>> {
    let index = GraphIndex::build(snapshot)?;
    let assignment = engine.detect_communities(&index, None)?;
    let positions = NodePositions::from_snapshot(snapshot);
    Ok(engine.compute_hulls(&assignment, &positions)?)
}

fn read_snapshot(path: &Path) -> Result<GraphSnapshot> {
    let contents = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read snapshot from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?
    };
    let snapshot: GraphSnapshot = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;
    tracing::info!(
        "Loaded snapshot: {} nodes, {} edges",
        snapshot.nodes.len(),
        snapshot.edges.len()
    );
    Ok(snapshot)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}
