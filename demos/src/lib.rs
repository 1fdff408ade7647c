//! Self-test binaries for the cascade deblurring network.
//!
//! ## Available binaries
//!
//! - `summary`: Build the model, print its structure and a per-layer summary
//! - `bench`: Time repeated forward passes
//!
//! ## Usage
//!
//! ```bash
//! # Print the module tree and layer table for a 256x256 input
//! cargo run --bin summary
//!
//! # Same on the GPU, also running one forward pass
//! cargo run --bin summary --features wgpu -- --forward
//!
//! # Time 20 forward passes
//! cargo run --release --bin bench -- --iterations 20
//! ```

pub mod backend;

use std::path::PathBuf;

use anyhow::{bail, Result};
use burn::config::Config;
use cascade_burn::{CascadeConfig, NUM_STAGES};
use clap::Args;
use tracing_subscriber::EnvFilter;

pub use backend::{create_device, SelectedBackend, SelectedDevice, BACKEND_NAME};

/// Model options shared by the binaries.
#[derive(Args, Debug)]
pub struct ModelArgs {
    /// JSON model configuration file (overrides --num-resblocks)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Residual blocks per path for each of the four stages
    #[arg(long, value_delimiter = ',', default_value = "3,3,3,3")]
    pub num_resblocks: Vec<usize>,
}

impl ModelArgs {
    /// Resolves the model configuration from a file or from the flags.
    pub fn cascade_config(&self) -> Result<CascadeConfig> {
        if let Some(path) = &self.config {
            return CascadeConfig::load(path).map_err(|err| {
                anyhow::anyhow!("Failed to load config file {}: {err:?}", path.display())
            });
        }

        let Ok(num_resblocks) = <[usize; NUM_STAGES]>::try_from(self.num_resblocks.as_slice())
        else {
            bail!(
                "--num-resblocks needs {NUM_STAGES} comma-separated values, got {:?}",
                self.num_resblocks
            );
        };
        Ok(CascadeConfig::new().with_num_resblocks(num_resblocks))
    }
}

/// Installs a `tracing` subscriber honouring `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
