use burn::config::Config;
use burn::module::{Ignored, Module};
use burn::nn::conv::{Conv1d, Conv1dConfig};
use burn::nn::{BatchNorm, BatchNormConfig};
use burn::tensor::Tensor;
use burn::tensor::activation;
use burn::tensor::backend::Backend;

/// Deformation network architectures.
#[derive(Config, Debug, PartialEq, Eq)]
pub enum DecoderKind {
    /// Pointwise MLP (1x1 convolutions) from template coordinates to 3D.
    Mapping2Dto3D,
}

/// Non-linearity applied after every hidden layer.
#[derive(Config, Debug, PartialEq, Eq)]
pub enum Activation {
    Relu,
    Sigmoid,
    Softplus,
    LogSigmoid,
    Softsign,
    Tanh,
}

impl Activation {
    pub fn forward<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Activation::Relu => activation::relu(x),
            Activation::Sigmoid => activation::sigmoid(x),
            Activation::Softplus => activation::softplus(x, 1.0),
            Activation::LogSigmoid => activation::log_sigmoid(x),
            Activation::Softsign => x.clone() / x.abs().add_scalar(1.0),
            Activation::Tanh => activation::tanh(x),
        }
    }
}

#[derive(Config, Debug)]
pub struct DecoderConfig {
    /// Dimension of the template coordinates (2 or 3).
    pub input_size: usize,
    /// Size of the latent code added after the first layer.
    pub bottleneck_size: usize,
    #[config(default = 512)]
    pub hidden_neurons: usize,
    /// Number of hidden layers between the second and last convolution.
    #[config(default = 2)]
    pub num_layers: usize,
    #[config(default = "Activation::Relu")]
    pub activation: Activation,
    /// Use identities instead of batch norms.
    #[config(default = false)]
    pub remove_batch_norms: bool,
}

impl DecoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Mapping2Dto3D<B> {
        let conv = |channels_in, channels_out| Conv1dConfig::new(channels_in, channels_out, 1).init(device);
        let norm = |channels| {
            (!self.remove_batch_norms).then(|| BatchNormConfig::new(channels).init(device))
        };

        Mapping2Dto3D {
            conv1: conv(self.input_size, self.bottleneck_size),
            conv2: conv(self.bottleneck_size, self.hidden_neurons),
            conv_list: (0..self.num_layers)
                .map(|_| conv(self.hidden_neurons, self.hidden_neurons))
                .collect(),
            last_conv: conv(self.hidden_neurons, 3),
            bn1: norm(self.bottleneck_size),
            bn2: norm(self.hidden_neurons),
            bn_list: (0..self.num_layers).map(|_| norm(self.hidden_neurons)).collect(),
            activation: Ignored(self.activation.clone()),
        }
    }
}

/// Per-primitive deformation: template coordinates + latent code -> 3D points
///
/// Every layer is a 1x1 convolution, so each point is mapped independently.
#[derive(Module, Debug)]
pub struct Mapping2Dto3D<B: Backend> {
    conv1: Conv1d<B>,
    conv2: Conv1d<B>,
    conv_list: Vec<Conv1d<B>>,
    last_conv: Conv1d<B>,
    bn1: Option<BatchNorm<B, 1>>,
    bn2: Option<BatchNorm<B, 1>>,
    bn_list: Vec<Option<BatchNorm<B, 1>>>,
    activation: Ignored<Activation>,
}

/// `None` is the identity.
fn normalize<B: Backend>(norm: &Option<BatchNorm<B, 1>>, x: Tensor<B, 3>) -> Tensor<B, 3> {
    match norm {
        Some(batch_norm) => batch_norm.forward(x),
        None => x,
    }
}

impl<B: Backend> Mapping2Dto3D<B> {
    /// points: [B, dim, N], latent: [B, bottleneck, 1] -> [B, 3, N]
    pub fn forward(&self, points: Tensor<B, 3>, latent: Tensor<B, 3>) -> Tensor<B, 3> {
        let x = self.conv1.forward(points) + latent; // [B, bottleneck, N]
        let mut x = self.activation.forward(normalize(&self.bn1, x));
        x = self.activation.forward(normalize(&self.bn2, self.conv2.forward(x))); // [B, hidden, N]
        for (conv, norm) in self.conv_list.iter().zip(&self.bn_list) {
            x = self.activation.forward(normalize(norm, conv.forward(x)));
        }
        self.last_conv.forward(x)
    }

    #[cfg(test)]
    pub(crate) fn batch_norm_count(&self) -> usize {
        [&self.bn1, &self.bn2]
            .into_iter()
            .chain(&self.bn_list)
            .filter(|norm| norm.is_some())
            .count()
    }
}
