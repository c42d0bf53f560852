//! plugin-graph - run a text graph over stdin
//!
//! ```text
//! plugin-graph <graph.toml> [--topology]
//! ```
//!
//! Every stdin line is fed to the graph's entry node. With `--topology` the
//! built graph is printed as JSON instead.

use anyhow::{bail, Context};
use plugin_graph::{
    config::GraphConfig,
    graph::{nodes::register_text_nodes, NodeRegistry, PipelineBuilder},
    logging,
};
use std::io::BufRead;
use std::path::PathBuf;

const USAGE: &str = "usage: plugin-graph <graph.toml> [--topology]";

struct Args {
    graph: PathBuf,
    topology: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut graph = None;
    let mut topology = false;

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--topology" => topology = true,
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            flag if flag.starts_with('-') => bail!("unknown option '{}'\n{}", flag, USAGE),
            _ if graph.is_some() => bail!("more than one graph file given\n{}", USAGE),
            _ => graph = Some(PathBuf::from(&arg)),
        }
    }

    let graph = graph.context(USAGE)?;
    Ok(Args { graph, topology })
}

fn main() -> anyhow::Result<()> {
    let args = parse_args()?;

    let config = GraphConfig::load(&args.graph)
        .with_context(|| format!("Failed to load graph {:?}", args.graph))?;

    // Initialize logging
    let _log_guard = logging::init(&config.logging);

    tracing::info!("Starting plugin-graph with {:?}", args.graph);

    let mut registry = NodeRegistry::new();
    register_text_nodes(&mut registry);

    let pipeline = PipelineBuilder::new(&registry)
        .build(&config)
        .context("Failed to build pipeline")?;

    if args.topology {
        println!("{}", pipeline.snapshot().to_json()?);
        pipeline.close();
        return Ok(());
    }

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read stdin")?;
        pipeline
            .input(line)
            .context("Entry node stopped accepting input")?;
    }

    tracing::info!("Input exhausted, closing pipeline");
    pipeline.close();

    Ok(())
}
