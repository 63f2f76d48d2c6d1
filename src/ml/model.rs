use burn::{
    module::Param,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig,
        Initializer, Linear,
    },
    prelude::*,
    tensor::activation::relu,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::domain::image::{CHANNELS, HEIGHT, NUM_CLASSES};
use crate::domain::mode::ExecutionMode;

const KERNEL: usize = 3;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct CnnConfig {
    #[config(default = 8)]
    pub conv1_channels: usize,
    #[config(default = 16)]
    pub conv2_channels: usize,
    #[config(default = 64)]
    pub hidden: usize,
    /// Applied before the output layer, training mode only
    #[config(default = 0.0)]
    pub dropout: f64,
}

impl CnnConfig {
    /// Side length of the feature map after conv → pool → conv → pool.
    /// 32 → 30 → 15 → 13 → 6
    fn final_side() -> usize {
        ((HEIGHT - (KERNEL - 1)) / 2 - (KERNEL - 1)) / 2
    }

    /// Width of the flattened feature vector (576 with the defaults).
    pub fn flat_features(&self) -> usize {
        let side = Self::final_side();
        self.conv2_channels * side * side
    }

    /// Build the model with weights drawn from a StdRng seeded with `seed`,
    /// uniform in ±1/√fan_in. Same seed, same weights.
    pub fn init<B: Backend>(&self, device: &B::Device, seed: u64) -> Cnn<B> {
        let mut rng = StdRng::seed_from_u64(seed);

        let conv1 = seeded_conv(&mut rng, device, CHANNELS, self.conv1_channels);
        let conv2 = seeded_conv(&mut rng, device, self.conv1_channels, self.conv2_channels);
        let fc1   = seeded_linear(&mut rng, device, self.flat_features(), self.hidden);
        let fc2   = seeded_linear(&mut rng, device, self.hidden, NUM_CLASSES);

        Cnn {
            conv1,
            conv2,
            pool:    MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            fc1,
            fc2,
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

/// conv(3→8) → ReLU → pool → conv(8→16) → ReLU → pool → flatten
/// → linear(576→64) → ReLU → linear(64→10)
#[derive(Module, Debug)]
pub struct Cnn<B: Backend> {
    pub conv1:   Conv2d<B>,
    pub conv2:   Conv2d<B>,
    pub pool:    MaxPool2d,
    pub fc1:     Linear<B>,
    pub fc2:     Linear<B>,
    pub dropout: Dropout,
}

impl<B: Backend> Cnn<B> {
    /// images: [batch, 3, 32, 32] → logits: [batch, 10].
    /// No softmax; the loss works on raw scores.
    pub fn forward(&self, images: Tensor<B, 4>, mode: ExecutionMode) -> Tensor<B, 2> {
        let x = self.pool.forward(relu(self.conv1.forward(images)));
        let x = self.pool.forward(relu(self.conv2.forward(x)));
        let x = x.flatten::<2>(1, 3);
        let x = relu(self.fc1.forward(x));
        let x = if mode.is_training() { self.dropout.forward(x) } else { x };
        self.fc2.forward(x)
    }
}

fn seeded_conv<B: Backend>(
    rng:          &mut StdRng,
    device:       &B::Device,
    in_channels:  usize,
    out_channels: usize,
) -> Conv2d<B> {
    // Zeros keeps init off the backend RNG; the real weights come from `rng`
    let mut conv = Conv2dConfig::new([in_channels, out_channels], [KERNEL, KERNEL])
        .with_initializer(Initializer::Zeros)
        .init(device);
    let limit = 1.0 / ((in_channels * KERNEL * KERNEL) as f32).sqrt();
    conv.weight = Param::from_tensor(random_tensor(
        rng,
        [out_channels, in_channels, KERNEL, KERNEL],
        limit,
        device,
    ));
    conv.bias = Some(Param::from_tensor(random_tensor(rng, [out_channels], limit, device)));
    conv
}

fn seeded_linear<B: Backend>(
    rng:     &mut StdRng,
    device:  &B::Device,
    fan_in:  usize,
    fan_out: usize,
) -> Linear<B> {
    let limit = 1.0 / (fan_in as f32).sqrt();
    let weight = random_tensor::<B, 2>(rng, [fan_in, fan_out], limit, device);
    let bias = random_tensor::<B, 1>(rng, [fan_out], limit, device);

    Linear {
        weight: Param::from_tensor(weight),
        bias:   Some(Param::from_tensor(bias)),
    }
}

fn random_tensor<B: Backend, const D: usize>(
    rng:    &mut StdRng,
    shape:  [usize; D],
    limit:  f32,
    device: &B::Device,
) -> Tensor<B, D> {
    let total: usize = shape.iter().product();
    let values: Vec<f32> = (0..total)
        .map(|_| rng.gen::<f32>() * 2.0 * limit - limit)
        .collect();
    Tensor::<B, D>::from_floats(TensorData::new(values, shape), device)
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    fn weights(model: &Cnn<TestBackend>) -> Vec<f32> {
        model.conv1.weight.val().into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_default_flat_features() {
        assert_eq!(CnnConfig::new().flat_features(), 576);
    }

    #[test]
    fn test_output_shape() {
        let device = Default::default();
        let model: Cnn<TestBackend> = CnnConfig::new().init(&device, 1);
        let images = Tensor::<TestBackend, 4>::zeros([5, 3, 32, 32], &device);
        let logits = model.forward(images, ExecutionMode::Eval);
        assert_eq!(logits.dims(), [5, NUM_CLASSES]);
    }

    #[test]
    fn test_same_seed_same_weights() {
        let device = Default::default();
        let a: Cnn<TestBackend> = CnnConfig::new().init(&device, 7);
        let b: Cnn<TestBackend> = CnnConfig::new().init(&device, 7);
        let c: Cnn<TestBackend> = CnnConfig::new().init(&device, 8);
        assert_eq!(weights(&a), weights(&b));
        assert_ne!(weights(&a), weights(&c));
    }

    #[test]
    fn test_weights_within_init_bound() {
        let device = Default::default();
        let model: Cnn<TestBackend> = CnnConfig::new().init(&device, 3);
        let limit = 1.0 / ((3 * 3 * 3) as f32).sqrt();
        assert!(weights(&model).iter().all(|w| w.abs() <= limit));
    }

    #[test]
    fn test_eval_forward_is_deterministic_with_dropout() {
        let device = Default::default();
        let model: Cnn<TestBackend> = CnnConfig::new().with_dropout(0.5).init(&device, 2);
        let images = Tensor::<TestBackend, 4>::ones([2, 3, 32, 32], &device);
        let a = model.forward(images.clone(), ExecutionMode::Eval).into_data();
        let b = model.forward(images, ExecutionMode::Eval).into_data();
        assert_eq!(a, b);
    }
}
