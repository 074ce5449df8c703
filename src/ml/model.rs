use burn::{
    nn::{
        conv::{Conv3d, Conv3dConfig},
        Linear, LinearConfig, PaddingConfig3d,
    },
    prelude::*,
    tensor::activation::relu,
};

use crate::domain::run_config::RunConfig;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct SkeletonEncoderConfig {
    /// [channels, depth, height, width]
    pub input_size:                  [usize; 4],
    pub num_representation_features: usize,
    pub num_outputs:                 usize,
    #[config(default = 8)]
    pub conv_channels:               usize,
    #[config(default = 64)]
    pub projection_hidden:           usize,
}

impl From<&RunConfig> for SkeletonEncoderConfig {
    fn from(cfg: &RunConfig) -> Self {
        Self::new(cfg.input_size, cfg.num_representation_features, cfg.num_outputs)
    }
}

/// Spatial extent after a kernel-3, stride-2, padding-1 convolution.
fn strided(extent: usize) -> usize {
    (extent + 1) / 2
}

impl SkeletonEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SkeletonEncoder<B> {
        let [channels, depth, height, width] = self.input_size;
        let conv = |c_in: usize, c_out: usize| {
            Conv3dConfig::new([c_in, c_out], [3, 3, 3])
                .with_stride([2, 2, 2])
                .with_padding(PaddingConfig3d::Explicit(1, 1, 1))
                .init(device)
        };
        let conv1 = conv(channels, self.conv_channels);
        let conv2 = conv(self.conv_channels, self.conv_channels * 2);

        let flat_features = self.conv_channels
            * 2
            * strided(strided(depth))
            * strided(strided(height))
            * strided(strided(width));

        SkeletonEncoder {
            conv1,
            conv2,
            representation: LinearConfig::new(flat_features, self.num_representation_features)
                .init(device),
            projection_1: LinearConfig::new(self.num_representation_features, self.projection_hidden)
                .init(device),
            projection_2: LinearConfig::new(self.projection_hidden, self.num_outputs).init(device),
            num_representation_features: self.num_representation_features,
        }
    }
}

/// Convolutional encoder with a two-layer projection head.
///
/// `represent` stops before the head; `forward` runs the whole model.
#[derive(Module, Debug)]
pub struct SkeletonEncoder<B: Backend> {
    pub conv1:          Conv3d<B>,
    pub conv2:          Conv3d<B>,
    pub representation: Linear<B>,
    pub projection_1:   Linear<B>,
    pub projection_2:   Linear<B>,
    pub num_representation_features: usize,
}

impl<B: Backend> SkeletonEncoder<B> {
    /// [batch, C, D, H, W] → [batch, num_representation_features]
    pub fn represent(&self, x: Tensor<B, 5>) -> Tensor<B, 2> {
        let x = relu(self.conv1.forward(x));
        let x = relu(self.conv2.forward(x));
        let x: Tensor<B, 2> = x.flatten(1, 4);
        self.representation.forward(x)
    }

    /// [batch, C, D, H, W] → [batch, num_outputs]
    pub fn forward(&self, x: Tensor<B, 5>) -> Tensor<B, 2> {
        let h = self.represent(x);
        self.projection_2.forward(relu(self.projection_1.forward(relu(h))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_output_shapes() {
        let device = Default::default();
        let model: SkeletonEncoder<NdArray> =
            SkeletonEncoderConfig::new([1, 5, 6, 7], 4, 3).init(&device);
        let x = Tensor::<NdArray, 5>::zeros([2, 1, 5, 6, 7], &device);
        assert_eq!(model.represent(x.clone()).dims(), [2, 4]);
        assert_eq!(model.forward(x).dims(), [2, 3]);
    }

    #[test]
    fn test_strided_extent() {
        assert_eq!(strided(12), 6);
        assert_eq!(strided(5), 3);
        assert_eq!(strided(1), 1);
    }
}
