use distbc::bc;
use distbc::builder::PartitionBuilder;
use distbc::config::RunConfig;
use distbc::generator::Generator;
use distbc::Cluster;
use std::env;
use tracing::{error, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const SCALE: usize = 8;
const DEGREE: usize = 4;
const SYMMETRIZE: bool = false;
const VERIFY: bool = true;
const TOP: usize = 10;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("DISTBC_LOG").unwrap_or_else(|_| EnvFilter::new("distbc=info,warn"));
    let format = env::var("DISTBC_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);
    match format.as_str() {
        "json" => registry.with(fmt::layer().json().with_ansi(false)).init(),
        _ => registry.with(fmt::layer().compact()).init(),
    }
}

fn run() -> distbc::Result<()> {
    // Optional TOML file with `[cluster]` and `[bc]` tables.
    let config = match env::args().nth(1) {
        Some(path) => RunConfig::from_path(path)?,
        None => RunConfig::default(),
    };

    let generator = Generator::new(SCALE, DEGREE);
    let edges = generator.generate_edge_list();
    let builder = PartitionBuilder::new(config.cluster.hosts, config.cluster.partition)
        .symmetrize(SYMMETRIZE)
        .with_num_nodes(generator.num_nodes());
    let cluster = Cluster::with_builder(config.cluster.clone(), &builder, &edges)?;

    let scores = cluster.betweenness(&config.bc)?;

    let mut ranked: Vec<_> = bc::normalize(&scores).into_iter().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    for (node, score) in ranked.into_iter().take(TOP) {
        println!("{:>8} {:.6}", node, score);
    }

    if VERIFY {
        let sources = config.bc.sources.resolve(cluster.total_nodes())?;
        let squished = builder.squish(&edges);
        if bc::verifier(cluster.total_nodes(), &squished, sources, &scores) {
            info!("verification passed");
        } else {
            error!("verification failed");
        }
    }
    Ok(())
}

fn main() {
    init_tracing();
    if let Err(e) = run() {
        error!(error = %e, "run failed");
        std::process::exit(1);
    }
}
