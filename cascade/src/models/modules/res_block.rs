//! # Residual Blocks
//!
//! The residual unit used at every resolution of an encoder-decoder stage,
//! and `ResPath`, a stack of identical units at one channel width.

use burn::{
    nn::{conv::Conv2d, Relu},
    prelude::*,
};

use super::conv;
use crate::error::{CascadeError, CascadeResult};

/// Configuration for the `ResBlock` module.
#[derive(Config, Debug)]
pub struct ResBlockConfig {
    /// Number of input channels.
    #[config(default = "32")]
    pub in_planes: usize,
    /// Number of output channels. Must equal `in_planes`.
    #[config(default = "32")]
    pub out_planes: usize,
}

impl ResBlockConfig {
    /// Initializes a new `ResBlock` module.
    ///
    /// # Errors
    ///
    /// Returns `CascadeError::InvalidConfiguration` if `in_planes != out_planes`,
    /// since the identity addition needs matching widths.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> CascadeResult<ResBlock<B>> {
        if self.in_planes != self.out_planes {
            return Err(CascadeError::InvalidConfiguration {
                reason: format!(
                    "ResBlock needs in_planes == out_planes for the identity skip, got {} and {}",
                    self.in_planes, self.out_planes
                ),
            });
        }

        Ok(ResBlock {
            conv1: conv(self.in_planes, self.in_planes, 3, 1, true, device),
            relu: Relu::new(),
            conv2: conv(self.in_planes, self.out_planes, 3, 1, true, device),
        })
    }
}

/// A two-convolution residual unit: `x + conv2(relu(conv1(x)))`.
#[derive(Module, Debug)]
pub struct ResBlock<B: Backend> {
    conv1: Conv2d<B>,
    relu: Relu,
    conv2: Conv2d<B>,
}

impl<B: Backend> ResBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let identity = x.clone();
        let x = self.conv1.forward(x);
        let x = self.relu.forward(x);
        let x = self.conv2.forward(x);

        identity + x
    }
}

/// Configuration for a `ResPath`, a run of `depth` residual blocks at `planes` channels.
#[derive(Config, Debug)]
pub struct ResPathConfig {
    /// Channel width shared by every block in the path.
    pub planes: usize,
    /// Number of residual blocks. Zero gives an identity path.
    pub depth: usize,
}

impl ResPathConfig {
    /// Initializes a new `ResPath` module.
    ///
    /// # Errors
    ///
    /// Propagates any error from building the individual blocks.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> CascadeResult<ResPath<B>> {
        let block = ResBlockConfig::new()
            .with_in_planes(self.planes)
            .with_out_planes(self.planes);
        let blocks = (0..self.depth)
            .map(|_| block.init(device))
            .collect::<CascadeResult<Vec<_>>>()?;

        Ok(ResPath { blocks })
    }
}

/// A homogeneous stack of residual blocks applied in order.
#[derive(Module, Debug)]
pub struct ResPath<B: Backend> {
    blocks: Vec<ResBlock<B>>,
}

impl<B: Backend> ResPath<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.blocks.iter().fold(x, |x, block| block.forward(x))
    }

    /// Number of residual blocks in the path.
    pub fn depth(&self) -> usize {
        self.blocks.len()
    }
}
