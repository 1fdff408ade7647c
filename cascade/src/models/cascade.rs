//! # Cascade Model
//!
//! Four encoder-decoder stages refining the same image coarse-to-fine.
//!
//! Every stage after the first sees the original image concatenated with the
//! previous stage's restored image, and receives the bottleneck features of
//! all earlier stages as its fusion input. All four restored images are
//! returned so that a training loop can supervise each stage.

use burn::prelude::*;

use super::edcoder::{EdCoder, EdCoderConfig, IMAGE_CHANNELS};
use crate::error::{CascadeError, CascadeResult};

/// Number of encoder-decoder stages in the cascade.
pub const NUM_STAGES: usize = 4;

/// Stage input widths implied by the concatenation scheme: the image alone,
/// then the image together with the previous restored image.
pub const STAGE_INPUT_CHANNELS: [usize; NUM_STAGES] = [
    IMAGE_CHANNELS,
    2 * IMAGE_CHANNELS,
    2 * IMAGE_CHANNELS,
    2 * IMAGE_CHANNELS,
];

/// Configuration for the `Cascade` model.
#[derive(Config, Debug)]
pub struct CascadeConfig {
    /// Residual blocks per resolution path, one entry per stage.
    #[config(default = "[3, 3, 3, 3]")]
    pub num_resblocks: [usize; NUM_STAGES],
    /// Input channels of each stage. Must be `[3, 6, 6, 6]`.
    #[config(default = "[3, 6, 6, 6]")]
    pub input_channels: [usize; NUM_STAGES],
}

impl CascadeConfig {
    /// Validate the configuration against the fixed concatenation scheme.
    ///
    /// # Errors
    ///
    /// Returns `Err(CascadeError::InvalidConfiguration)` if `input_channels`
    /// differs from `[3, 6, 6, 6]`.
    pub fn validate(&self) -> CascadeResult<()> {
        if self.input_channels != STAGE_INPUT_CHANNELS {
            return Err(CascadeError::InvalidConfiguration {
                reason: format!(
                    "input_channels must be {STAGE_INPUT_CHANNELS:?} to match the stage concatenation, got {:?}",
                    self.input_channels
                ),
            });
        }
        Ok(())
    }

    /// Configuration of the stage at `index` (0-based), whose level is `index + 1`.
    #[must_use]
    pub fn stage(&self, index: usize) -> EdCoderConfig {
        EdCoderConfig::new(index + 1)
            .with_num_resblocks(self.num_resblocks[index])
            .with_input_channels(self.input_channels[index])
    }

    /// Configurations of all stages, in cascade order.
    #[must_use]
    pub fn stages(&self) -> [EdCoderConfig; NUM_STAGES] {
        core::array::from_fn(|index| self.stage(index))
    }

    /// Initializes a `Cascade` model with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> CascadeResult<Cascade<B>> {
        self.validate()?;

        tracing::debug!(
            num_resblocks = ?self.num_resblocks,
            input_channels = ?self.input_channels,
            "building cascade",
        );

        let [edcoder1, edcoder2, edcoder3, edcoder4] = self.stages();

        Ok(Cascade {
            edcoder1: edcoder1.init(device)?,
            edcoder2: edcoder2.init(device)?,
            edcoder3: edcoder3.init(device)?,
            edcoder4: edcoder4.init(device)?,
        })
    }
}

/// The four-stage progressive restoration network.
#[derive(Module, Debug)]
pub struct Cascade<B: Backend> {
    edcoder1: EdCoder<B>,
    edcoder2: EdCoder<B>,
    edcoder3: EdCoder<B>,
    edcoder4: EdCoder<B>,
}

impl<B: Backend> Cascade<B> {
    /// Runs all four stages on `x`.
    ///
    /// # Arguments
    ///
    /// * `x` - The input image of shape `[B, 3, H, W]`, with `H` and `W` multiples of 4.
    ///
    /// # Returns
    ///
    /// The restored images `[d4, d3, d2, d1]`, most refined first, each `[B, 3, H, W]`.
    ///
    /// # Errors
    ///
    /// Returns `CascadeError::InvalidTensorShape` if the input cannot flow through the network.
    pub fn forward(&self, x: Tensor<B, 4>) -> CascadeResult<[Tensor<B, 4>; NUM_STAGES]> {
        let s1 = self.edcoder1.forward(x.clone(), None)?;
        let f1 = s1.feature;

        let s2 = self.edcoder2.forward(
            Tensor::cat(vec![x.clone(), s1.image.clone()], 1),
            Some(f1.clone()),
        )?;
        let f2 = s2.feature;

        let s3 = self.edcoder3.forward(
            Tensor::cat(vec![x.clone(), s2.image.clone()], 1),
            Some(Tensor::cat(vec![f1.clone(), f2.clone()], 1)),
        )?;

        let s4 = self.edcoder4.forward(
            Tensor::cat(vec![x, s3.image.clone()], 1),
            Some(Tensor::cat(vec![f1, f2, s3.feature], 1)),
        )?;

        Ok([s4.image, s3.image, s2.image, s1.image])
    }

    /// Runs all four stages and returns only the final restored image.
    ///
    /// # Errors
    ///
    /// Same as [`Cascade::forward`].
    pub fn forward_final(&self, x: Tensor<B, 4>) -> CascadeResult<Tensor<B, 4>> {
        let [d4, ..] = self.forward(x)?;
        Ok(d4)
    }

    /// The stages in cascade order.
    pub const fn stages(&self) -> [&EdCoder<B>; NUM_STAGES] {
        [&self.edcoder1, &self.edcoder2, &self.edcoder3, &self.edcoder4]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::edcoder::FEATURE_CHANNELS;
    use burn::{
        backend::{Autodiff, NdArray},
        tensor::Distribution,
    };

    type TestBackend = NdArray<f32>;

    fn small_cascade() -> Cascade<TestBackend> {
        CascadeConfig::new()
            .with_num_resblocks([1, 1, 1, 1])
            .init(&Default::default())
            .unwrap()
    }

    #[test]
    fn default_config_matches_reference_setup() {
        let config = CascadeConfig::new();
        assert_eq!(config.num_resblocks, [3, 3, 3, 3]);
        assert_eq!(config.input_channels, [3, 6, 6, 6]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn stage_levels_and_fusion_widths() {
        let cascade = small_cascade();

        for (index, stage) in cascade.stages().into_iter().enumerate() {
            let level = index + 1;
            assert_eq!(stage.level(), level);
            assert_eq!(stage.input_channels(), STAGE_INPUT_CHANNELS[index]);
            assert_eq!(stage.fusion_channels(), FEATURE_CHANNELS * (level - 1));
            assert_eq!(stage.has_fusion(), level > 1);
        }
    }

    #[test]
    fn forward_returns_four_full_resolution_images() {
        let device = Default::default();
        let cascade = small_cascade();
        let input =
            Tensor::<TestBackend, 4>::random([2, 3, 16, 8], Distribution::Normal(0.0, 1.0), &device);

        let outputs = cascade.forward(input).unwrap();

        for output in outputs {
            assert_eq!(output.dims(), [2, 3, 16, 8]);
        }
    }

    #[test]
    fn forward_final_is_most_refined_output() {
        let device = Default::default();
        let cascade = small_cascade();
        let input =
            Tensor::<TestBackend, 4>::random([1, 3, 8, 8], Distribution::Normal(0.0, 1.0), &device);

        let [d4, ..] = cascade.forward(input.clone()).unwrap();
        let final_image = cascade.forward_final(input).unwrap();

        final_image.into_data().assert_eq(&d4.into_data(), true);
    }

    #[test]
    fn forward_rejects_non_rgb_input() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 4>::zeros([1, 6, 8, 8], &device);

        assert!(matches!(
            small_cascade().forward(input),
            Err(CascadeError::InvalidTensorShape { .. })
        ));
    }

    #[test]
    fn forward_rejects_size_not_divisible_by_four() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 4>::zeros([1, 3, 10, 8], &device);

        assert!(matches!(
            small_cascade().forward(input),
            Err(CascadeError::InvalidTensorShape { .. })
        ));
    }

    #[test]
    fn zero_resblocks_still_runs() {
        let device = Default::default();
        let cascade = CascadeConfig::new()
            .with_num_resblocks([0, 0, 0, 0])
            .init::<TestBackend>(&device)
            .unwrap();
        let input = Tensor::<TestBackend, 4>::zeros([1, 3, 4, 4], &device);

        let outputs = cascade.forward(input).unwrap();
        assert_eq!(outputs[0].dims(), [1, 3, 4, 4]);
    }

    #[test]
    fn gradients_reach_every_stage() {
        type AutodiffBackend = Autodiff<TestBackend>;

        let device = Default::default();
        let cascade = CascadeConfig::new()
            .with_num_resblocks([1, 1, 1, 1])
            .init::<AutodiffBackend>(&device)
            .unwrap();
        let input = Tensor::<AutodiffBackend, 4>::random(
            [1, 3, 8, 8],
            Distribution::Normal(0.0, 1.0),
            &device,
        );

        let [d4, d3, d2, d1] = cascade.forward(input).unwrap();
        let loss = d4.mean() + d3.mean() + d2.mean() + d1.mean();
        let grads = loss.backward();

        for stage in cascade.stages() {
            let grad = stage.layer1.weight.grad(&grads);
            assert!(grad.is_some(), "no gradient for stage {}", stage.level());
        }
    }

    #[test]
    #[ignore = "full 256x256 cascade is slow on the CPU backend"]
    fn full_resolution_reference_forward() {
        let device = Default::default();
        let cascade = CascadeConfig::new().init::<TestBackend>(&device).unwrap();
        let input = Tensor::<TestBackend, 4>::random(
            [1, 3, 256, 256],
            Distribution::Normal(0.0, 1.0),
            &device,
        );

        let outputs = cascade.forward(input).unwrap();

        for output in outputs {
            assert_eq!(output.dims(), [1, 3, 256, 256]);
        }
    }
}
