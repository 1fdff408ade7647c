use burn::{
    nn::{conv::Conv2d, Gelu},
    prelude::*,
};

use super::conv;
use crate::error::{CascadeError, CascadeResult};

/// Configuration for the `FusionBlock` module.
#[derive(Config, Debug)]
pub struct FusionBlockConfig {
    /// Width of the concatenated input features.
    pub in_planes: usize,
    /// Width of the projected output.
    #[config(default = "128")]
    pub out_planes: usize,
}

impl FusionBlockConfig {
    /// Initializes a new `FusionBlock` module.
    ///
    /// # Errors
    ///
    /// Returns `CascadeError::InvalidConfiguration` if either width is zero.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> CascadeResult<FusionBlock<B>> {
        if self.in_planes == 0 || self.out_planes == 0 {
            return Err(CascadeError::InvalidConfiguration {
                reason: format!(
                    "FusionBlock widths must be non-zero, got {} -> {}",
                    self.in_planes, self.out_planes
                ),
            });
        }

        Ok(FusionBlock {
            conv1: conv(self.in_planes, self.in_planes, 1, 1, true, device),
            act: Gelu::new(),
            conv2: conv(self.in_planes, self.out_planes, 1, 1, true, device),
        })
    }
}

/// Merges concatenated multi-level features with two 1x1 convolutions and a GELU.
#[derive(Module, Debug)]
pub struct FusionBlock<B: Backend> {
    conv1: Conv2d<B>,
    act: Gelu,
    conv2: Conv2d<B>,
}

impl<B: Backend> FusionBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv1.forward(x);
        let x = self.act.forward(x);
        self.conv2.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{backend::NdArray, tensor::Distribution};

    type TestBackend = NdArray<f32>;

    #[test]
    fn fusion_block_projects_to_128_channels() {
        let device = Default::default();
        for level in 2..=4 {
            let block = FusionBlockConfig::new(128 * level)
                .init::<TestBackend>(&device)
                .unwrap();
            let input = Tensor::<TestBackend, 4>::random(
                [1, 128 * level, 4, 6],
                Distribution::Normal(0.0, 1.0),
                &device,
            );

            assert_eq!(block.forward(input).dims(), [1, 128, 4, 6]);
        }
    }

    #[test]
    fn fusion_block_rejects_zero_width() {
        let device = Default::default();
        let result = FusionBlockConfig::new(0).init::<TestBackend>(&device);
        assert!(matches!(
            result,
            Err(CascadeError::InvalidConfiguration { .. })
        ));
    }
}
