use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig,
        Dropout, DropoutConfig,
        Linear, LinearConfig,
        PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::{log_softmax, relu, softmax},
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct EmotionCnnConfig {
    #[config(default = 7)]
    pub num_classes:  usize,
    #[config(default = 48)]
    pub height:       usize,
    #[config(default = 48)]
    pub width:        usize,
    /// Block widths are 2x, 4x and 8x this value
    #[config(default = 32)]
    pub base_filters: usize,
    #[config(default = 128)]
    pub dense_units:  usize,
    #[config(default = 0.2)]
    pub dropout:      f64,
    /// Running-average factor (0.01 == keep 99% of the old statistic)
    #[config(default = 0.01)]
    pub bn_momentum:  f64,
    #[config(default = 1e-3)]
    pub bn_epsilon:   f64,
}

/// Spatial side length after a convolution.
pub(crate) fn conv_output(size: usize, kernel: usize, stride: usize, same: bool) -> usize {
    if same {
        size.div_ceil(stride)
    } else {
        size.saturating_sub(kernel) / stride + 1
    }
}

/// Spatial side length after 2x2 / stride 2 max pooling.
pub(crate) fn pool_output(size: usize) -> usize {
    size / 2
}

/// One conv block as (filters, kernel, stride of the second conv).
pub(crate) struct BlockShape {
    pub filters:       usize,
    pub kernel:        usize,
    pub second_stride: usize,
}

impl EmotionCnnConfig {
    pub(crate) fn blocks(&self) -> [BlockShape; 3] {
        let f = self.base_filters;
        [
            BlockShape { filters: 2 * f, kernel: 3, second_stride: 1 },
            BlockShape { filters: 4 * f, kernel: 3, second_stride: 1 },
            BlockShape { filters: 8 * f, kernel: 1, second_stride: 2 },
        ]
    }

    /// [channels, height, width] reaching the flatten layer.
    pub fn feature_map_shape(&self) -> [usize; 3] {
        let (mut h, mut w, mut c) = (self.height, self.width, 1);
        for block in self.blocks() {
            let second_same = block.second_stride == 1;
            h = pool_output(conv_output(h, block.kernel, block.second_stride, second_same));
            w = pool_output(conv_output(w, block.kernel, block.second_stride, second_same));
            c = block.filters;
        }
        [c, h, w]
    }

    pub fn flattened_features(&self) -> usize {
        self.feature_map_shape().iter().product()
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> EmotionCnn<B> {
        let [b1, b2, b3] = self.blocks();
        let block1 = self.build_block(1, &b1, device);
        let block2 = self.build_block(b1.filters, &b2, device);
        let block3 = self.build_block(b2.filters, &b3, device);

        let dense1  = LinearConfig::new(self.flattened_features(), self.dense_units).init(device);
        let norm1   = self.batch_norm(self.dense_units).init(device);
        let dense2  = LinearConfig::new(self.dense_units, self.dense_units).init(device);
        let norm2   = self.batch_norm(self.dense_units).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        let output  = LinearConfig::new(self.dense_units, self.num_classes).init(device);

        EmotionCnn {
            block1, block2, block3,
            dense1, norm1, dense2, norm2, dropout, output,
            height: self.height,
            width:  self.width,
        }
    }

    fn batch_norm(&self, features: usize) -> BatchNormConfig {
        BatchNormConfig::new(features)
            .with_momentum(self.bn_momentum)
            .with_epsilon(self.bn_epsilon)
    }

    fn build_block<B: Backend>(
        &self,
        in_channels: usize,
        shape:       &BlockShape,
        device:      &B::Device,
    ) -> ConvBlock<B> {
        let kernel = [shape.kernel, shape.kernel];
        let conv_a = Conv2dConfig::new([in_channels, shape.filters], kernel)
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        let conv_b = if shape.second_stride == 1 {
            Conv2dConfig::new([shape.filters, shape.filters], kernel)
                .with_padding(PaddingConfig2d::Same)
                .init(device)
        } else {
            Conv2dConfig::new([shape.filters, shape.filters], kernel)
                .with_stride([shape.second_stride, shape.second_stride])
                .with_padding(PaddingConfig2d::Valid)
                .init(device)
        };
        let norm    = self.batch_norm(shape.filters).init(device);
        let pool    = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();
        let dropout = DropoutConfig::new(self.dropout).init();
        ConvBlock { conv_a, conv_b, norm, pool, dropout }
    }
}

/// conv → conv → batch norm → ReLU → max pool → dropout
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv_a:  Conv2d<B>,
    pub conv_b:  Conv2d<B>,
    pub norm:    BatchNorm<B, 2>,
    pub pool:    MaxPool2d,
    pub dropout: Dropout,
}

impl<B: Backend> ConvBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv_b.forward(self.conv_a.forward(x));
        let x = relu(self.norm.forward(x));
        self.dropout.forward(self.pool.forward(x))
    }
}

#[derive(Module, Debug)]
pub struct EmotionCnn<B: Backend> {
    pub block1:  ConvBlock<B>,
    pub block2:  ConvBlock<B>,
    pub block3:  ConvBlock<B>,
    pub dense1:  Linear<B>,
    pub norm1:   BatchNorm<B, 0>,
    pub dense2:  Linear<B>,
    pub norm2:   BatchNorm<B, 0>,
    pub dropout: Dropout,
    pub output:  Linear<B>,
    pub height:  usize,
    pub width:   usize,
}

impl<B: Backend> EmotionCnn<B> {
    /// images: [batch, height, width, 1] → logits: [batch, num_classes]
    ///
    /// # Panics
    /// If the image tensor does not match the configured input size.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let [_, h, w, c] = images.dims();
        assert!(
            h == self.height && w == self.width && c == 1,
            "expected images of shape [_, {}, {}, 1], got [_, {h}, {w}, {c}]",
            self.height,
            self.width,
        );

        // Channels-last input, channels-first convolutions
        let x = images.swap_dims(1, 3).swap_dims(2, 3); // [batch, 1, H, W]

        let x = self.block1.forward(x);
        let x = self.block2.forward(x);
        let x = self.block3.forward(x);

        let x = x.flatten::<2>(1, 3);
        let x = self.norm1.forward(self.dense1.forward(x));
        let x = self.norm2.forward(self.dense2.forward(x));
        let x = self.dropout.forward(x);
        self.output.forward(x)
    }

    /// Softmax class probabilities.
    pub fn predict(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        softmax(self.forward(images), 1)
    }

    /// Returns (categorical cross-entropy loss, logits).
    pub fn forward_loss(
        &self,
        images:  Tensor<B, 4>,
        targets: Tensor<B, 2>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(images);
        let loss   = categorical_cross_entropy(logits.clone(), targets);
        (loss, logits)
    }
}

/// Mean of -Σ target·log(softmax(logits)) over the batch.
pub fn categorical_cross_entropy<B: Backend>(
    logits:  Tensor<B, 2>,
    targets: Tensor<B, 2>,
) -> Tensor<B, 1> {
    (targets * log_softmax(logits, 1)).sum_dim(1).mean().neg()
}

/// How many rows have argmax(output) == argmax(targets).
pub fn correct_predictions<B: Backend>(output: Tensor<B, 2>, targets: Tensor<B, 2>) -> usize {
    // argmax(1) returns [batch, 1]; flatten to [batch] before comparing
    let predicted = output.argmax(1).flatten::<1>(0, 1);
    let expected  = targets.argmax(1).flatten::<1>(0, 1);
    predicted
        .equal(expected)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_fer_feature_map_is_256x3x3() {
        let cfg = EmotionCnnConfig::new();
        assert_eq!(cfg.feature_map_shape(), [256, 3, 3]);
        assert_eq!(cfg.flattened_features(), 2304);
    }

    #[test]
    fn test_conv_output_sizes() {
        assert_eq!(conv_output(48, 3, 1, true), 48);
        assert_eq!(conv_output(12, 1, 2, false), 6);
        assert_eq!(conv_output(13, 1, 2, false), 7);
        assert_eq!(pool_output(7), 3);
    }

    #[test]
    fn test_forward_shapes() {
        let device = Default::default();
        let cfg    = EmotionCnnConfig::new().with_height(16).with_width(16).with_base_filters(2);
        let model: EmotionCnn<TestBackend> = cfg.init(&device);

        let images = Tensor::<TestBackend, 4>::zeros([3, 16, 16, 1], &device);
        let probs  = model.predict(images);
        assert_eq!(probs.dims(), [3, 7]);

        let sums = probs.sum_dim(1).into_data().to_vec::<f32>().unwrap();
        for s in sums {
            assert!((s - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    #[should_panic]
    fn test_wrong_input_size_panics() {
        let device = Default::default();
        let cfg    = EmotionCnnConfig::new().with_height(16).with_width(16).with_base_filters(2);
        let model: EmotionCnn<TestBackend> = cfg.init(&device);
        let _ = model.forward(Tensor::zeros([1, 8, 8, 1], &device));
    }

    #[test]
    fn test_cross_entropy_of_confident_correct_prediction_is_small() {
        let device  = Default::default();
        let logits  = Tensor::<TestBackend, 2>::from_floats([[10.0, 0.0, 0.0], [0.0, 0.0, 10.0]], &device);
        let targets = Tensor::<TestBackend, 2>::from_floats([[1.0, 0.0, 0.0], [0.0, 0.0, 1.0]], &device);

        let loss = categorical_cross_entropy(logits.clone(), targets.clone())
            .into_scalar()
            .elem::<f64>();
        assert!(loss >= 0.0 && loss < 1e-3);
        assert_eq!(correct_predictions(logits, targets), 2);
    }

    #[test]
    fn test_cross_entropy_of_uniform_prediction_is_ln_classes() {
        let device  = Default::default();
        let logits  = Tensor::<TestBackend, 2>::zeros([4, 7], &device);
        let targets = Tensor::<TestBackend, 2>::from_floats(
            [[1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]; 4],
            &device,
        );
        let loss = categorical_cross_entropy(logits, targets).into_scalar().elem::<f64>();
        assert!((loss - (7.0f64).ln()).abs() < 1e-4);
    }
}
