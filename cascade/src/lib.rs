//! Progressive image restoration with a cascade of encoder-decoder networks,
//! implemented on the Burn deep learning framework.
//!
//! Four encoder-decoder stages refine an image one after another. Each stage
//! receives the original image next to the previous stage's estimate, and
//! folds the bottleneck features of all earlier stages into its own. All
//! intermediate estimates are returned for deep supervision.
//!
//! ```no_run
//! use burn::{backend::NdArray, prelude::*};
//! use cascade_burn::CascadeConfig;
//!
//! let device = Default::default();
//! let model = CascadeConfig::new().init::<NdArray>(&device)?;
//! let image = Tensor::<NdArray, 4>::zeros([1, 3, 256, 256], &device);
//! let [d4, d3, d2, d1] = model.forward(image)?;
//! # Ok::<(), cascade_burn::CascadeError>(())
//! ```

mod error;
mod models;
mod summary;

#[cfg(test)]
mod tests;

pub use error::{CascadeError, CascadeResult};
pub use models::{
    conv, conv_output_size, conv_t, conv_t_output_size, Cascade, CascadeConfig, CascadeRecord,
    EdCoder, EdCoderConfig, EdCoderOutput, EdCoderRecord, FusionBlock, FusionBlockConfig,
    ResBlock, ResBlockConfig, ResPath, ResPathConfig, FEATURE_CHANNELS, IMAGE_CHANNELS,
    LEVEL_CHANNELS, NUM_STAGES, SPATIAL_MULTIPLE, STAGE_INPUT_CHANNELS,
};
pub use summary::{LayerKind, LayerSummary, ModelSummary};
