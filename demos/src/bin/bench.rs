//! Times repeated forward passes of the cascade on the selected backend.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use burn::prelude::*;
use cascade_burn::Cascade;
use cascade_demos::{create_device, init_tracing, ModelArgs, SelectedBackend, BACKEND_NAME};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    model: ModelArgs,

    /// Number of timed forward passes
    #[arg(short, long, default_value = "20")]
    iterations: usize,

    /// Side length of the square input, a multiple of 4
    #[arg(short, long, default_value = "256")]
    size: usize,

    /// Untimed passes run before measuring
    #[arg(long, default_value = "1")]
    warmup: usize,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let device = create_device();
    let model: Cascade<SelectedBackend> = cli
        .model
        .cascade_config()?
        .init(&device)
        .context("Failed to build model")?;
    tracing::info!(
        backend = BACKEND_NAME,
        params = model.num_params(),
        size = cli.size,
        iterations = cli.iterations,
        "starting benchmark",
    );

    let run = || -> Result<Duration> {
        let start = Instant::now();
        let x = Tensor::<SelectedBackend, 4>::zeros([1, 3, cli.size, cli.size], &device);
        let [d4, ..] = model.forward(x)?;
        // Reading the result waits for asynchronous backends to finish.
        let _ = d4.into_data();
        Ok(start.elapsed())
    };

    for _ in 0..cli.warmup {
        run()?;
    }

    let start = Instant::now();
    let durations = (0..cli.iterations).map(|_| run()).collect::<Result<Vec<_>>>()?;
    let total = start.elapsed();

    println!(
        "Total time: {:?}, Speed: {:.3} it/s",
        total,
        cli.iterations as f32 / total.as_secs_f32()
    );
    println!("{durations:?}");

    Ok(())
}
