//! # Model Architectures
//!
//! This module aggregates the components of the cascade network:
//!
//! - `modules`: Convolution primitives, residual blocks and the fusion block.
//! - `edcoder`: A single encoder-decoder stage.
//! - `cascade`: The four-stage progressive restoration model.
//!
//! The components are re-exported for easy access from the parent `models` module.

pub mod cascade;
pub mod edcoder;
pub mod modules;

pub use cascade::*;
pub use edcoder::*;
pub use modules::*;
