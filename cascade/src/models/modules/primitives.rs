//! # Convolution Primitives
//!
//! Thin constructors for the two spatial operators used throughout the
//! network, together with the matching output-size arithmetic.
//!
//! Standard convolutions always pad by `kernel_size / 2`: stride 1 keeps the
//! spatial size and stride 2 halves it. Transposed convolutions are fixed at
//! kernel 4, stride 2, padding 1, which doubles the spatial size exactly so
//! decoder maps line up with their encoder skips.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig},
        PaddingConfig2d,
    },
    prelude::*,
};

/// Kernel size of every transposed convolution.
pub const CONV_T_KERNEL: usize = 4;
/// Stride of every transposed convolution.
pub const CONV_T_STRIDE: usize = 2;
/// Padding of every transposed convolution.
pub const CONV_T_PADDING: usize = 1;

/// Creates a square convolution padded by `kernel_size / 2`.
pub fn conv<B: Backend>(
    in_planes: usize,
    out_planes: usize,
    kernel_size: usize,
    stride: usize,
    bias: bool,
    device: &Device<B>,
) -> Conv2d<B> {
    let padding = kernel_size / 2;
    Conv2dConfig::new([in_planes, out_planes], [kernel_size, kernel_size])
        .with_stride([stride, stride])
        .with_padding(PaddingConfig2d::Explicit(padding, padding))
        .with_bias(bias)
        .init(device)
}

/// Creates the 4x4, stride 2, padding 1 transposed convolution used for upsampling.
pub fn conv_t<B: Backend>(
    in_planes: usize,
    out_planes: usize,
    bias: bool,
    device: &Device<B>,
) -> ConvTranspose2d<B> {
    ConvTranspose2dConfig::new([in_planes, out_planes], [CONV_T_KERNEL, CONV_T_KERNEL])
        .with_stride([CONV_T_STRIDE, CONV_T_STRIDE])
        .with_padding([CONV_T_PADDING, CONV_T_PADDING])
        .with_bias(bias)
        .init(device)
}

/// Output size along one spatial axis of a convolution built by [`conv`].
#[must_use]
pub const fn conv_output_size(size: usize, kernel_size: usize, stride: usize) -> usize {
    let padding = kernel_size / 2;
    (size + 2 * padding - kernel_size) / stride + 1
}

/// Output size along one spatial axis of a convolution built by [`conv_t`].
#[must_use]
pub const fn conv_t_output_size(size: usize) -> usize {
    (size - 1) * CONV_T_STRIDE + CONV_T_KERNEL - 2 * CONV_T_PADDING
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{backend::NdArray, tensor::Distribution};

    type TestBackend = NdArray<f32>;

    #[test]
    fn conv_stride_one_preserves_size() {
        let device = Default::default();
        let layer = conv::<TestBackend>(3, 32, 3, 1, true, &device);
        let input = Tensor::<TestBackend, 4>::random([2, 3, 12, 20], Distribution::Default, &device);

        assert_eq!(layer.forward(input).dims(), [2, 32, 12, 20]);
    }

    #[test]
    fn conv_stride_two_halves_size() {
        let device = Default::default();
        let layer = conv::<TestBackend>(32, 64, 3, 2, true, &device);
        let input = Tensor::<TestBackend, 4>::random([1, 32, 16, 8], Distribution::Default, &device);

        assert_eq!(layer.forward(input).dims(), [1, 64, 8, 4]);
    }

    #[test]
    fn conv_one_by_one_has_no_padding() {
        let device = Default::default();
        let layer = conv::<TestBackend>(256, 128, 1, 1, true, &device);
        let input = Tensor::<TestBackend, 4>::random([1, 256, 4, 4], Distribution::Default, &device);

        assert_eq!(layer.forward(input).dims(), [1, 128, 4, 4]);
    }

    #[test]
    fn conv_t_doubles_half_resolution_map() {
        let device = Default::default();
        let layer = conv_t::<TestBackend>(128, 64, true, &device);
        let input = Tensor::<TestBackend, 4>::random([2, 128, 5, 7], Distribution::Default, &device);

        assert_eq!(layer.forward(input).dims(), [2, 64, 10, 14]);
    }

    #[test]
    fn output_size_arithmetic() {
        assert_eq!(conv_output_size(256, 3, 1), 256);
        assert_eq!(conv_output_size(256, 3, 2), 128);
        assert_eq!(conv_output_size(7, 3, 2), 4);
        assert_eq!(conv_output_size(9, 1, 1), 9);
        assert_eq!(conv_t_output_size(64), 128);
        assert_eq!(conv_t_output_size(1), 2);
    }
}
