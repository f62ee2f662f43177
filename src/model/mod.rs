mod decoder;

use burn::config::Config;
use burn::module::{Ignored, Module};
use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use ndarray::Array2;

pub use decoder::{Activation, DecoderConfig, DecoderKind, Mapping2Dto3D};

use crate::error::{self, AtlasnetError};
use crate::mesh::Mesh;
use crate::template::{Template, TemplateKind};

/// How template points are drawn on a forward pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sampling {
    /// Fresh uniform samples on every call (training).
    Random,
    /// The template's fixed grid (inference, mesh export).
    Regular,
}

#[derive(Config, Debug)]
pub struct AtlasnetConfig {
    /// Total number of points, shared evenly between primitives.
    #[config(default = 2500)]
    pub number_points: usize,
    #[config(default = 1)]
    pub nb_primitives: usize,
    /// Size of the latent vector.
    #[config(default = 1024)]
    pub bottleneck_size: usize,
    #[config(default = "TemplateKind::Sphere")]
    pub template_type: TemplateKind,
    #[config(default = "DecoderKind::Mapping2Dto3D")]
    pub decoder_type: DecoderKind,
    #[config(default = false)]
    pub remove_all_batch_norms: bool,
    #[config(default = 512)]
    pub hidden_neurons: usize,
    #[config(default = 2)]
    pub num_layers: usize,
    #[config(default = "Activation::Relu")]
    pub activation: Activation,
}

impl AtlasnetConfig {
    pub fn template_dim(&self) -> usize {
        self.template_type.dim()
    }

    /// Points left over after the even split are dropped.
    pub fn points_per_primitive(&self) -> usize {
        self.number_points.checked_div(self.nb_primitives).unwrap_or(0)
    }

    pub fn validate(&self) -> error::Result<()> {
        let invalid = |message: String| Err(AtlasnetError::InvalidConfig { message });

        if self.nb_primitives == 0 {
            return invalid("nb_primitives must be at least 1".to_string());
        }
        if self.points_per_primitive() == 0 {
            return invalid(format!(
                "{} points cannot be shared between {} primitives",
                self.number_points, self.nb_primitives
            ));
        }
        if self.bottleneck_size == 0 || self.hidden_neurons == 0 {
            return invalid("bottleneck_size and hidden_neurons must be positive".to_string());
        }
        Ok(())
    }

    fn init_decoder<B: Backend>(&self, device: &B::Device) -> Mapping2Dto3D<B> {
        match self.decoder_type {
            DecoderKind::Mapping2Dto3D => DecoderConfig::new(self.template_dim(), self.bottleneck_size)
                .with_hidden_neurons(self.hidden_neurons)
                .with_num_layers(self.num_layers)
                .with_activation(self.activation.clone())
                .with_remove_batch_norms(self.remove_all_batch_norms)
                .init(device),
        }
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> error::Result<Atlasnet<B>> {
        self.validate()?;

        let points_per_primitive = self.points_per_primitive();
        let dropped = self.number_points % self.nb_primitives;
        if dropped > 0 {
            log::warn!(
                "{} points do not split evenly between {} primitives; dropping {dropped}",
                self.number_points,
                self.nb_primitives,
            );
        }
        if self.remove_all_batch_norms {
            log::info!("Replacing all batch norms by identities.");
        }

        let template = Template::new(self.template_type.clone(), points_per_primitive)?;
        let templates = vec![template; self.nb_primitives];
        let decoders = (0..self.nb_primitives)
            .map(|_| self.init_decoder(device))
            .collect();

        log::info!(
            "Atlasnet: {} {:?} primitives, {points_per_primitive} points each, bottleneck {}",
            self.nb_primitives,
            self.template_type,
            self.bottleneck_size,
        );

        Ok(Atlasnet {
            decoders,
            templates: Ignored(templates),
            points_per_primitive,
            bottleneck_size: self.bottleneck_size,
        })
    }
}

/// Deforms `nb_primitives` templates, one decoder each, conditioned on a shared latent vector.
#[derive(Module, Debug)]
pub struct Atlasnet<B: Backend> {
    decoders: Vec<Mapping2Dto3D<B>>,
    templates: Ignored<Vec<Template>>,
    points_per_primitive: usize,
    bottleneck_size: usize,
}

impl<B: Backend> Atlasnet<B> {
    pub fn num_primitives(&self) -> usize {
        self.decoders.len()
    }

    /// Points per cloud with `Sampling::Regular`, summed over primitives.
    pub fn num_regular_points(&self) -> usize {
        self.templates.iter().map(Template::num_regular_points).sum()
    }

    /// latent: [B, bottleneck] -> batch size
    fn check_latent(&self, latent: &Tensor<B, 2>) -> error::Result<usize> {
        let [batch, size] = latent.dims();
        if batch == 0 || size != self.bottleneck_size {
            return Err(AtlasnetError::ShapeMismatch {
                expected: vec![batch.max(1), self.bottleneck_size],
                got: vec![batch, size],
            });
        }
        Ok(batch)
    }

    /// latent: [B, bottleneck] -> point cloud: [B, nb_primitives, N, 3]
    pub fn forward(&self, latent: Tensor<B, 2>, sampling: Sampling) -> error::Result<Tensor<B, 4>> {
        let batch = self.check_latent(&latent)?;
        let device = latent.device();
        let latent = latent.unsqueeze_dim::<3>(2); // [B, bottleneck, 1]

        let patches = self
            .templates
            .iter()
            .zip(&self.decoders)
            .map(|(template, decoder)| {
                let points = match sampling {
                    Sampling::Random => {
                        template.random_points(batch, self.points_per_primitive, &device)
                    }
                    Sampling::Regular => template.regular_points(batch, &device),
                };
                decoder.forward(points, latent.clone()).unsqueeze_dim::<4>(1) // [B, 1, 3, N]
            })
            .collect();

        Ok(Tensor::cat(patches, 1).swap_dims(2, 3))
    }

    /// latent: [1, bottleneck] -> one mesh made of every deformed primitive
    pub fn generate_mesh(&self, latent: Tensor<B, 2>) -> error::Result<Mesh> {
        let batch = self.check_latent(&latent)?;
        if batch != 1 {
            return Err(AtlasnetError::UnsupportedBatchSize { got: batch });
        }
        let device = latent.device();
        let latent = latent.unsqueeze_dim::<3>(2);

        let patches = self
            .templates
            .iter()
            .zip(&self.decoders)
            .map(|(template, decoder)| {
                let points = template.regular_points(1, &device);
                let deformed = decoder
                    .forward(points, latent.clone())
                    .squeeze::<2>(0) // [3, N]
                    .transpose(); // [N, 3]
                Mesh::new(to_host(deformed)?, template.faces().clone())
            })
            .collect::<error::Result<Vec<_>>>()?;

        let mesh = Mesh::merge(&patches)?;
        log::debug!(
            "merged {} patches into {} vertices, {} faces",
            patches.len(),
            mesh.num_vertices(),
            mesh.num_faces(),
        );
        Ok(mesh)
    }
}

/// Copy a [N, C] tensor into a host array.
pub fn to_host<B: Backend>(tensor: Tensor<B, 2>) -> error::Result<Array2<f32>> {
    let [rows, cols] = tensor.dims();
    let values = tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|err| AtlasnetError::TensorData(format!("{err:?}")))?;
    Ok(Array2::from_shape_vec((rows, cols), values)?)
}
