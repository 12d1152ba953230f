//! nxgeom CLI - inspect transformation chains and diffraction geometry
//!
//! Reads a NeXus tree exported as JSON and prints resolved chains, combined
//! transforms and per-pixel Q/HKL.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nxgeom_chain::{ChainComposer, ChainWalker};
use nxgeom_diffraction::{GeometryConfig, GeometryModel};
use nxgeom_ir::NexusTree;
use nxgeom_math::Transform;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "nxgeom")]
#[command(about = "Resolve NeXus transformation chains and diffraction geometry", long_about = None)]
struct Cli {
    /// Settings file with [geometry] and [layout] tables
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log chain resolution (repeat for more detail)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the links of the chain starting at a node
    Chain {
        /// Tree in JSON form
        tree: PathBuf,
        /// Start node (a transformation or a group with depends_on)
        path: String,
    },
    /// Print the combined 4x4 transform of a chain at one scan point
    Transform {
        /// Tree in JSON form
        tree: PathBuf,
        /// Start node
        path: String,
        /// Scan point
        #[arg(short, long, default_value_t = 0)]
        index: usize,
        /// Scan length (default: inferred from the chain)
        #[arg(long)]
        scan_len: Option<usize>,
    },
    /// Print position, Q and d-spacing of one pixel
    Pixel {
        /// Tree in JSON form
        tree: PathBuf,
        /// Detector module, by position in the layout
        #[arg(short, long, default_value_t = 0)]
        module: usize,
        /// Scan point
        #[arg(short, long, default_value_t = 0)]
        frame: usize,
        /// Slow pixel index
        slow: usize,
        /// Fast pixel index
        fast: usize,
    },
    /// Print the Miller indices of one pixel across the whole scan
    Hkl {
        /// Tree in JSON form
        tree: PathBuf,
        /// Detector module, by position in the layout
        #[arg(short, long, default_value_t = 0)]
        module: usize,
        /// Slow pixel index
        slow: usize,
        /// Fast pixel index
        fast: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => GeometryConfig::from_path(path)
            .with_context(|| format!("reading settings from {}", path.display()))?,
        None => GeometryConfig::default(),
    };
    info!(max_chain_length = config.geometry.max_chain_length, "settings loaded");

    match cli.command {
        Commands::Chain { tree, path } => {
            let tree = load_tree(&tree)?;
            let walker = ChainWalker::new(&tree).with_max_hops(config.geometry.max_chain_length);
            for (i, link) in walker.walk(&path)?.iter().enumerate() {
                println!("{:>3}  {}", i, link);
            }
        }
        Commands::Transform {
            tree,
            path,
            index,
            scan_len,
        } => {
            let tree = load_tree(&tree)?;
            let walker = ChainWalker::new(&tree).with_max_hops(config.geometry.max_chain_length);
            let links = walker.walk(&path)?;
            let scan_len = match scan_len {
                Some(n) => n,
                None => nxgeom_chain::Chain::load(&walker, &path)?.scan_len_hint(),
            };
            let m = ChainComposer::new(&tree, scan_len).compose(&links, index)?;
            print_transform(&m);
        }
        Commands::Pixel {
            tree,
            module,
            frame,
            slow,
            fast,
        } => {
            let tree = load_tree(&tree)?;
            let model = GeometryModel::from_accessor(&tree, &config.layout, &config.geometry)?;
            let p = model.pixel_position(module, frame, slow, fast)?;
            let q = model.pixel_q(module, frame, slow, fast)?;
            println!("position (mm)  {:>12.6} {:>12.6} {:>12.6}", p.x, p.y, p.z);
            println!("Q (1/A)        {:>12.6} {:>12.6} {:>12.6}", q.x, q.y, q.z);
            println!("2theta (deg)   {:>12.6}", model.scattering_angle(module, frame, slow, fast)?);
            match model.d_spacing(module, frame, slow, fast) {
                Ok(d) => println!("d (A)          {:>12.6}", d),
                Err(err) => println!("d (A)          n/a ({})", err),
            }
        }
        Commands::Hkl {
            tree,
            module,
            slow,
            fast,
        } => {
            let tree = load_tree(&tree)?;
            let model = GeometryModel::from_accessor(&tree, &config.layout, &config.geometry)?;
            for (frame, hkl) in model.scan_hkl(module, slow, fast).into_iter().enumerate() {
                match hkl {
                    Ok(hkl) => println!("{:>5}  {:>10.4} {:>10.4} {:>10.4}", frame, hkl.x, hkl.y, hkl.z),
                    Err(err) => println!("{:>5}  error: {}", frame, err),
                }
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_tree(path: &Path) -> Result<NexusTree> {
    let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let tree = NexusTree::from_json(&json).with_context(|| format!("parsing {}", path.display()))?;
    debug!(path = %path.display(), nodes = tree.len(), version = %tree.version, "loaded tree");
    Ok(tree)
}

fn print_transform(m: &Transform) {
    for row in m.matrix.row_iter() {
        println!(
            "{:>14.6} {:>14.6} {:>14.6} {:>14.6}",
            row[0], row[1], row[2], row[3]
        );
    }
}
