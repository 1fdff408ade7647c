//! # Structural Summary
//!
//! Per-layer output shapes, parameter counts and multiply-accumulate counts
//! for a cascade configuration, computed from the architecture arithmetic
//! without building the model or running a forward pass.
//!
//! A convolution with `k x k` kernels contributes `in * out * k * k + out`
//! parameters and `output_numel * in * k * k` multiply-accumulates. Bias
//! additions, activations and skip additions are not counted.

use core::fmt;

use serde::Serialize;

use crate::error::{CascadeError, CascadeResult};
use crate::models::{
    conv_output_size, conv_t_output_size, CascadeConfig, EdCoderConfig, CONV_T_KERNEL,
    FEATURE_CHANNELS, IMAGE_CHANNELS, LEVEL_CHANNELS, SPATIAL_MULTIPLE,
};

/// The kind of a leaf layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LayerKind {
    Conv2d,
    ConvTranspose2d,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conv2d => f.write_str("Conv2d"),
            Self::ConvTranspose2d => f.write_str("ConvTranspose2d"),
        }
    }
}

/// One row of the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerSummary {
    /// Dotted module path, e.g. `edcoder2.layerfb.conv1`.
    pub name: String,
    pub kind: LayerKind,
    /// `[batch, channels, height, width]` after the layer.
    pub output_shape: [usize; 4],
    pub params: usize,
    pub macs: u64,
}

/// Summary of a whole cascade for a given input size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSummary {
    pub input_shape: [usize; 4],
    pub layers: Vec<LayerSummary>,
    pub total_params: usize,
    pub total_macs: u64,
}

impl CascadeConfig {
    /// Summarizes the cascade for an input of shape `[batch, 3, height, width]`.
    ///
    /// # Errors
    ///
    /// Returns `CascadeError::InvalidConfiguration` if the configuration is
    /// invalid and `CascadeError::InvalidTensorShape` if `height` or `width`
    /// is not a non-zero multiple of 4.
    pub fn summary(&self, batch: usize, height: usize, width: usize) -> CascadeResult<ModelSummary> {
        self.validate()?;

        let input_shape = [batch, IMAGE_CHANNELS, height, width];
        if height == 0
            || width == 0
            || height % SPATIAL_MULTIPLE != 0
            || width % SPATIAL_MULTIPLE != 0
        {
            return Err(CascadeError::InvalidTensorShape {
                expected: format!(
                    "[B, 3, H, W] with H and W non-zero multiples of {SPATIAL_MULTIPLE}"
                ),
                actual: format!("{input_shape:?}"),
            });
        }

        let mut builder = SummaryBuilder::default();
        for (index, stage) in self.stages().iter().enumerate() {
            let prefix = format!("edcoder{}", index + 1);
            builder.edcoder(&prefix, stage, [batch, stage.input_channels, height, width]);
        }

        Ok(builder.finish(input_shape))
    }
}

#[derive(Default)]
struct SummaryBuilder {
    layers: Vec<LayerSummary>,
}

impl SummaryBuilder {
    fn edcoder(&mut self, prefix: &str, config: &EdCoderConfig, input: [usize; 4]) {
        let [c1, c2, c3] = LEVEL_CHANNELS;
        let depth = config.num_resblocks;

        let x = self.conv(&format!("{prefix}.layer1"), input, c1, 3, 1);
        let x = self.res_path(&format!("{prefix}.layer2"), x, depth);
        let x = self.conv(&format!("{prefix}.layer3"), x, c2, 3, 2);
        let x = self.res_path(&format!("{prefix}.layer4"), x, depth);
        let x = self.conv(&format!("{prefix}.layer5"), x, c3, 3, 2);
        let x = if config.level > 1 {
            let [batch, channels, height, width] = x;
            let fused = [batch, channels + config.fusion_channels(), height, width];
            let fused = self.conv(&format!("{prefix}.layerfb.conv1"), fused, fused[1], 1, 1);
            self.conv(&format!("{prefix}.layerfb.conv2"), fused, FEATURE_CHANNELS, 1, 1)
        } else {
            x
        };
        let x = self.res_path(&format!("{prefix}.layer6"), x, depth);
        let x = self.conv_t(&format!("{prefix}.layer7"), x, c2);
        let x = self.res_path(&format!("{prefix}.layer8"), x, depth);
        let x = self.conv_t(&format!("{prefix}.layer9"), x, c1);
        let x = self.res_path(&format!("{prefix}.layer10"), x, depth);
        self.conv(&format!("{prefix}.layer11"), x, IMAGE_CHANNELS, 3, 1);
    }

    fn res_path(&mut self, prefix: &str, input: [usize; 4], depth: usize) -> [usize; 4] {
        let planes = input[1];
        (0..depth).fold(input, |x, index| {
            let x = self.conv(&format!("{prefix}.blocks.{index}.conv1"), x, planes, 3, 1);
            self.conv(&format!("{prefix}.blocks.{index}.conv2"), x, planes, 3, 1)
        })
    }

    fn conv(
        &mut self,
        name: &str,
        input: [usize; 4],
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
    ) -> [usize; 4] {
        let [batch, in_channels, height, width] = input;
        let output = [
            batch,
            out_channels,
            conv_output_size(height, kernel_size, stride),
            conv_output_size(width, kernel_size, stride),
        ];
        self.push(name, LayerKind::Conv2d, in_channels, output, kernel_size)
    }

    fn conv_t(&mut self, name: &str, input: [usize; 4], out_channels: usize) -> [usize; 4] {
        let [batch, in_channels, height, width] = input;
        let output = [
            batch,
            out_channels,
            conv_t_output_size(height),
            conv_t_output_size(width),
        ];
        self.push(name, LayerKind::ConvTranspose2d, in_channels, output, CONV_T_KERNEL)
    }

    fn push(
        &mut self,
        name: &str,
        kind: LayerKind,
        in_channels: usize,
        output_shape: [usize; 4],
        kernel_size: usize,
    ) -> [usize; 4] {
        let window = in_channels * kernel_size * kernel_size;
        let output_numel: usize = output_shape.iter().product();

        self.layers.push(LayerSummary {
            name: name.to_string(),
            kind,
            output_shape,
            params: window * output_shape[1] + output_shape[1],
            macs: output_numel as u64 * window as u64,
        });
        output_shape
    }

    fn finish(self, input_shape: [usize; 4]) -> ModelSummary {
        ModelSummary {
            input_shape,
            total_params: self.layers.iter().map(|layer| layer.params).sum(),
            total_macs: self.layers.iter().map(|layer| layer.macs).sum(),
            layers: self.layers,
        }
    }
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "-".repeat(104);
        writeln!(f, "{rule}")?;
        writeln!(
            f,
            "{:>40} {:>18} {:>22} {:>10} {:>10}",
            "Layer (type)", "", "Output Shape", "Param #", "MACs"
        )?;
        writeln!(f, "{}", "=".repeat(104))?;
        for layer in &self.layers {
            writeln!(
                f,
                "{:>40} {:>18} {:>22} {:>10} {:>10}",
                layer.name,
                layer.kind.to_string(),
                format!("{:?}", layer.output_shape),
                group_digits(layer.params as u64),
                format_macs(layer.macs),
            )?;
        }
        writeln!(f, "{}", "=".repeat(104))?;
        writeln!(f, "Input shape: {:?}", self.input_shape)?;
        writeln!(f, "Total params: {}", group_digits(self.total_params as u64))?;
        writeln!(f, "Total MACs: {}", format_macs(self.total_macs))?;
        write!(f, "{rule}")
    }
}

fn group_digits(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

fn format_macs(macs: u64) -> String {
    const UNITS: [(f64, &str); 3] = [(1e9, "G"), (1e6, "M"), (1e3, "K")];

    let value = macs as f64;
    UNITS
        .iter()
        .find(|(scale, _)| value >= *scale)
        .map_or_else(|| macs.to_string(), |(scale, unit)| format!("{:.2}{unit}", value / scale))
}
