use std::path::PathBuf;
use std::process::exit;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use chord::{Config, Node};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Membership file: one `host port` pair per line.
    peer_file: PathBuf,
    /// Zero-based line index identifying this node.
    index: usize,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = match Config::from_peer_file(&cli.peer_file, cli.index) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("invalid peer list: {error}");
            exit(1);
        }
    };

    match Node::spawn(config) {
        Ok(node) => node.block_until_shutdown(),
        Err(error) => {
            eprintln!("failed to start node: {error}");
            exit(1);
        }
    }
}
