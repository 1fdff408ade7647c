//! Builds the cascade on the selected backend and prints its structure.
//!
//! ```bash
//! cargo run --bin summary -- --height 256 --width 256 --forward
//! cargo run --bin summary -- --json > summary.json
//! ```

use std::time::Instant;

use anyhow::{Context, Result};
use burn::{prelude::*, tensor::Distribution};
use cascade_burn::Cascade;
use cascade_demos::{create_device, init_tracing, ModelArgs, SelectedBackend, BACKEND_NAME};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    model: ModelArgs,

    /// Batch size of the summarized input
    #[arg(short, long, default_value = "1")]
    batch: usize,

    /// Input height, a multiple of 4
    #[arg(long, default_value = "256")]
    height: usize,

    /// Input width, a multiple of 4
    #[arg(long, default_value = "256")]
    width: usize,

    /// Print the layer summary as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Skip printing the module tree
    #[arg(long)]
    no_modules: bool,

    /// Also run one forward pass on a random image
    #[arg(long)]
    forward: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = cli.model.cascade_config()?;
    let summary = config
        .summary(cli.batch, cli.height, cli.width)
        .context("Failed to summarize model")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    tracing::info!(backend = BACKEND_NAME, "building model");
    let device = create_device();
    let model: Cascade<SelectedBackend> = config.init(&device).context("Failed to build model")?;
    tracing::info!(params = model.num_params(), "model built");

    if !cli.no_modules {
        println!("{model}");
    }
    println!("{summary}");

    if cli.forward {
        let input = Tensor::<SelectedBackend, 4>::random(
            [cli.batch, 3, cli.height, cli.width],
            Distribution::Normal(0.0, 1.0),
            &device,
        );

        let start = Instant::now();
        let outputs = model.forward(input).context("Forward pass failed")?;
        tracing::info!(elapsed = ?start.elapsed(), "forward pass finished");

        for (name, output) in ["d4", "d3", "d2", "d1"].into_iter().zip(outputs) {
            println!("{name}: {:?}", output.dims());
        }
    }

    Ok(())
}
