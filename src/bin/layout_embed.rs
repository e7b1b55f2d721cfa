use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use layout_embedding::bnb::BranchAndBoundSettings;
use layout_embedding::config::{Config, GreedyVariant};
use layout_embedding::input::EmbeddingInput;
use layout_embedding::{bnb, greedy, insertion_sequence, io, smoothing};

#[derive(Parser)]
#[command(name = "layout-embed")]
#[command(about = "Embed a coarse layout mesh onto a fine target mesh", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print mesh and landmark statistics for an input bundle.
    Info {
        /// Bundle prefix (expects `<prefix>_layout.obj`, `<prefix>_target.obj`, `<prefix>.lmk`).
        prefix: PathBuf,
    },
    /// Run only the greedy competitors and keep the best result.
    Greedy {
        prefix: PathBuf,
        /// Output `.emb` path.
        output: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run the full pipeline: greedy init, branch-and-bound, optional
    /// smoothing/subdivision, then save.
    Embed {
        prefix: PathBuf,
        output: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Smooth the resulting paths before saving.
        #[arg(long)]
        smooth: bool,
        /// Subdivide the target mesh (and remap paths) this many times before smoothing.
        #[arg(long, default_value_t = 0)]
        subdivide: u32,
    },
}

fn load_config(path: &Option<PathBuf>) -> Result<Config> {
    match path {
        Some(p) => Config::load(p).with_context(|| format!("loading config {}", p.display())),
        None => Ok(Config::default()),
    }
}

/// Like [`load_config`], but without a `--config` file falls back to
/// [`BranchAndBoundSettings::main_pig_driver_default`] rather than the
/// library-wide default, so `embed` without flags reproduces
/// `main_pig.cpp`'s own driver (cold branch-and-bound, no greedy init).
fn load_config_for_embed(path: &Option<PathBuf>) -> Result<Config> {
    match path {
        Some(p) => Config::load(p).with_context(|| format!("loading config {}", p.display())),
        None => Ok(Config { branch_and_bound: BranchAndBoundSettings::main_pig_driver_default(), ..Config::default() }),
    }
}

fn run_greedy_variant(input: &EmbeddingInput, variant: GreedyVariant) -> greedy::GreedyResult {
    match variant {
        GreedyVariant::Praun => greedy::embed_praun(input.clone()),
        GreedyVariant::Kraevoy => greedy::embed_kraevoy(input.clone()),
        GreedyVariant::Schreiner => greedy::embed_schreiner(input.clone()),
        GreedyVariant::BlockingAware => greedy::embed_blocking_aware(input.clone()),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Info { prefix } => {
            let input = EmbeddingInput::load_bundle(&prefix).context("loading input bundle")?;
            println!("layout:  {} vertices, {} faces", input.layout.num_vertices(), input.layout.num_faces());
            println!("target:  {} vertices, {} faces", input.target.num_vertices(), input.target.num_faces());
            println!("landmarks: {}", input.landmarks.len());
        }
        Commands::Greedy { prefix, output, config } => {
            let input = EmbeddingInput::load_bundle(&prefix).context("loading input bundle")?;
            let config = load_config(&config)?;

            println!("running greedy competitors...");
            let start = Instant::now();
            let results = greedy::embed_competitors(&input);
            for r in &results {
                println!("  {}: complete={} cost={:.6}", r.name, r.is_complete(), r.cost());
            }
            let winner = greedy::best(&results)
                .or_else(|| {
                    let preferred = run_greedy_variant(&input, config.greedy_variant);
                    results.iter().find(|r| r.name == preferred.name)
                })
                .context("no greedy variant reached a complete embedding")?;
            println!("winner: {} ({:.3}s, cost={:.6})", winner.name, start.elapsed().as_secs_f64(), winner.cost());

            io::emb::save(&winner.state, &winner.sequence, &output)?;
            println!("saved embedding to {}", output.display());
        }
        Commands::Embed { prefix, output, config, smooth, subdivide } => {
            let input = EmbeddingInput::load_bundle(&prefix).context("loading input bundle")?;
            let config = load_config_for_embed(&config)?;

            println!("running branch-and-bound (time limit {:.1}s)...", config.branch_and_bound.time_limit_secs);
            let start = Instant::now();
            let result = bnb::search(input.clone(), config.branch_and_bound)?;
            println!(
                "done in {:.3}s: cost={:.6} lower_bound={:.6} gap={:.6} iterations={}",
                start.elapsed().as_secs_f64(),
                result.cost,
                result.lower_bound,
                result.gap,
                result.iterations
            );
            if result.deadline_reached {
                println!("warning: time limit reached before optimality was proven");
            }

            let mut state = layout_embedding::EmbeddingState::new(input);
            insertion_sequence::apply(&result.sequence, &mut state)?;

            for _ in 0..subdivide {
                state = smoothing::subdivide(&state)?;
            }
            if smooth {
                // smooth_paths can introduce edge-interior points, which the
                // vertex-chain-only .emb format can't represent; report the
                // smoothed lengths without feeding them back into `state`.
                let smoothed = smoothing::smooth_paths(&state, true)?;
                let total: f64 = smoothed.values().map(|p| p.length(state.target())).sum();
                println!("smoothed {} paths (total length {:.6})", smoothed.len(), total);
            }

            io::emb::save(&state, &result.sequence, &output)?;
            println!("saved embedding to {}", output.display());
        }
    }

    Ok(())
}
