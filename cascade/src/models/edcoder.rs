//! # Encoder-Decoder Stage
//!
//! One stage of the cascade: a three-level U-Net style encoder-decoder built
//! from residual paths.
//!
//! Resolution walk for an `H x W` input:
//!
//! | step            | channels | resolution |
//! |-----------------|----------|------------|
//! | layer1 + layer2 | 32       | H x W      |
//! | layer3 + layer4 | 64       | H/2 x W/2  |
//! | layer5 + layer6 | 128      | H/4 x W/4  |
//! | layer7 + layer8 | 64       | H/2 x W/2  |
//! | layer9 + layer10| 32       | H x W      |
//! | layer11         | 3        | H x W      |
//!
//! Stages above level 1 own a `FusionBlock` that folds the bottleneck
//! features of all earlier stages into the current bottleneck before layer6.

use burn::{
    nn::conv::{Conv2d, ConvTranspose2d},
    prelude::*,
};

use super::modules::{conv, conv_t, FusionBlock, FusionBlockConfig, ResPath, ResPathConfig};
use crate::error::{CascadeError, CascadeResult};

/// Channels of an RGB image.
pub const IMAGE_CHANNELS: usize = 3;
/// Channel widths of the full, half and quarter resolution levels.
pub const LEVEL_CHANNELS: [usize; 3] = [32, 64, 128];
/// Channel width of the bottleneck feature every stage returns.
pub const FEATURE_CHANNELS: usize = 128;
/// Input height and width must be multiples of this (two stride-2 downsamplings).
pub const SPATIAL_MULTIPLE: usize = 4;

/// Configuration for the `EdCoder` module.
#[derive(Config, Debug)]
pub struct EdCoderConfig {
    /// Position of the stage in the cascade, starting at 1.
    pub level: usize,
    /// Residual blocks per resolution path.
    #[config(default = "3")]
    pub num_resblocks: usize,
    /// Channels of the stage input.
    #[config(default = "3")]
    pub input_channels: usize,
}

impl EdCoderConfig {
    /// Checks the stage configuration.
    ///
    /// # Errors
    ///
    /// Returns `CascadeError::InvalidConfiguration` if `level` or
    /// `input_channels` is zero.
    pub fn validate(&self) -> CascadeResult<()> {
        if self.level == 0 {
            return Err(CascadeError::InvalidConfiguration {
                reason: "EdCoder level starts at 1, got 0".to_string(),
            });
        }
        if self.input_channels == 0 {
            return Err(CascadeError::InvalidConfiguration {
                reason: format!("EdCoder at level {} has zero input channels", self.level),
            });
        }
        Ok(())
    }

    /// Channel width of the fusion feature this stage expects: 128 per earlier stage.
    #[must_use]
    pub const fn fusion_channels(&self) -> usize {
        FEATURE_CHANNELS * self.level.saturating_sub(1)
    }

    /// Initializes a new `EdCoder` module.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> CascadeResult<EdCoder<B>> {
        self.validate()?;

        tracing::debug!(
            level = self.level,
            num_resblocks = self.num_resblocks,
            input_channels = self.input_channels,
            fusion = self.level > 1,
            "building encoder-decoder stage",
        );

        let [c1, c2, c3] = LEVEL_CHANNELS;
        let path = |planes| ResPathConfig::new(planes, self.num_resblocks).init(device);

        let layerfb = if self.level > 1 {
            Some(
                FusionBlockConfig::new(FEATURE_CHANNELS * self.level)
                    .with_out_planes(FEATURE_CHANNELS)
                    .init(device)?,
            )
        } else {
            None
        };

        Ok(EdCoder {
            level: self.level,
            input_channels: self.input_channels,
            layer1: conv(self.input_channels, c1, 3, 1, true, device),
            layer2: path(c1)?,
            layer3: conv(c1, c2, 3, 2, true, device),
            layer4: path(c2)?,
            layer5: conv(c2, c3, 3, 2, true, device),
            layerfb,
            layer6: path(c3)?,
            layer7: conv_t(c3, c2, true, device),
            layer8: path(c2)?,
            layer9: conv_t(c2, c1, true, device),
            layer10: path(c1)?,
            layer11: conv(c1, IMAGE_CHANNELS, 3, 1, true, device),
        })
    }
}

/// The two results of a stage forward pass.
#[derive(Debug, Clone)]
pub struct EdCoderOutput<B: Backend> {
    /// Restored image, `[B, 3, H, W]`.
    pub image: Tensor<B, 4>,
    /// Bottleneck feature after layer6, `[B, 128, H/4, W/4]`.
    pub feature: Tensor<B, 4>,
}

/// A single encoder-decoder stage of the cascade.
#[derive(Module, Debug)]
pub struct EdCoder<B: Backend> {
    level: usize,
    input_channels: usize,
    pub(crate) layer1: Conv2d<B>,
    pub(crate) layer2: ResPath<B>,
    pub(crate) layer3: Conv2d<B>,
    pub(crate) layer4: ResPath<B>,
    pub(crate) layer5: Conv2d<B>,
    pub(crate) layerfb: Option<FusionBlock<B>>,
    pub(crate) layer6: ResPath<B>,
    pub(crate) layer7: ConvTranspose2d<B>,
    pub(crate) layer8: ResPath<B>,
    pub(crate) layer9: ConvTranspose2d<B>,
    pub(crate) layer10: ResPath<B>,
    pub(crate) layer11: Conv2d<B>,
}

impl<B: Backend> EdCoder<B> {
    /// Runs the stage on `x`, fusing `feature` into the bottleneck when given.
    ///
    /// A stage built with a fusion block and called without a feature skips
    /// fusion and behaves like a level-1 stage.
    ///
    /// # Errors
    ///
    /// Returns `CascadeError::InvalidTensorShape` if `x` does not have the
    /// configured channel count, if its height or width is not a multiple of 4,
    /// or if `feature` does not match `[B, 128 * (level - 1), H/4, W/4]`.
    /// Returns `CascadeError::UnexpectedFusionFeature` if a feature is given to
    /// a stage without a fusion block.
    pub fn forward(
        &self,
        x: Tensor<B, 4>,
        feature: Option<Tensor<B, 4>>,
    ) -> CascadeResult<EdCoderOutput<B>> {
        self.check_input(&x, feature.as_ref())?;

        let x = self.layer1.forward(x);
        let x2 = self.layer2.forward(x);

        let x = self.layer3.forward(x2.clone());
        let x4 = self.layer4.forward(x);

        let x = self.layer5.forward(x4.clone());
        let x = match (&self.layerfb, feature) {
            (Some(layerfb), Some(feature)) => layerfb.forward(Tensor::cat(vec![feature, x], 1)),
            _ => x,
        };
        let x6 = self.layer6.forward(x);

        let x = self.layer7.forward(x6.clone()) + x4;
        let x = self.layer8.forward(x);

        let x = self.layer9.forward(x) + x2;
        let x = self.layer10.forward(x);

        Ok(EdCoderOutput {
            image: self.layer11.forward(x),
            feature: x6,
        })
    }

    fn check_input(&self, x: &Tensor<B, 4>, feature: Option<&Tensor<B, 4>>) -> CascadeResult<()> {
        let [batch, channels, height, width] = x.dims();
        if channels != self.input_channels {
            return Err(CascadeError::InvalidTensorShape {
                expected: format!("[B, {}, H, W]", self.input_channels),
                actual: format!("{:?}", x.dims()),
            });
        }
        if !is_spatial_multiple(height) || !is_spatial_multiple(width) {
            return Err(CascadeError::InvalidTensorShape {
                expected: format!(
                    "[B, C, H, W] with H and W non-zero multiples of {SPATIAL_MULTIPLE}"
                ),
                actual: format!("{:?}", x.dims()),
            });
        }

        let Some(feature) = feature else {
            return Ok(());
        };
        if self.layerfb.is_none() {
            return Err(CascadeError::UnexpectedFusionFeature { level: self.level });
        }

        let expected = [
            batch,
            self.fusion_channels(),
            height / SPATIAL_MULTIPLE,
            width / SPATIAL_MULTIPLE,
        ];
        if feature.dims() != expected {
            return Err(CascadeError::InvalidTensorShape {
                expected: format!("{expected:?}"),
                actual: format!("{:?}", feature.dims()),
            });
        }

        Ok(())
    }

    /// Position of the stage in the cascade.
    pub const fn level(&self) -> usize {
        self.level
    }

    /// Channels this stage expects on its input.
    pub const fn input_channels(&self) -> usize {
        self.input_channels
    }

    /// Channel width of the fusion feature this stage accepts.
    pub const fn fusion_channels(&self) -> usize {
        FEATURE_CHANNELS * self.level.saturating_sub(1)
    }

    /// Whether the stage was built with a fusion block.
    pub const fn has_fusion(&self) -> bool {
        self.layerfb.is_some()
    }
}

const fn is_spatial_multiple(size: usize) -> bool {
    size != 0 && size % SPATIAL_MULTIPLE == 0
}
