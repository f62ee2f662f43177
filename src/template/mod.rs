mod sphere;
mod square;

use burn::config::Config;
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use ndarray::Array2;

use crate::error;

/// Primitive surface deformed by one decoder.
#[derive(Config, Debug, PartialEq, Eq)]
pub enum TemplateKind {
    /// Unit square, parameterized in 2D.
    Square,
    /// Unit sphere, parameterized in 3D.
    Sphere,
}

impl TemplateKind {
    /// Dimension of the template's parameter domain.
    pub fn dim(&self) -> usize {
        match self {
            TemplateKind::Square => 2,
            TemplateKind::Sphere => 3,
        }
    }
}

/// A primitive with its precomputed regular grid and triangulation.
///
/// The grid and faces are fixed at construction, so the regular samples
/// are identical across calls and always match `faces()`.
#[derive(Clone, Debug)]
pub struct Template {
    kind: TemplateKind,
    vertices: Array2<f32>, // [N, dim], regular grid in the parameter domain
    faces: Array2<usize>,  // [F, 3]
}

impl Template {
    /// npoints: how many regular points to aim for. The grid holds about that many.
    pub fn new(kind: TemplateKind, npoints: usize) -> error::Result<Self> {
        let (vertices, faces) = match kind {
            TemplateKind::Square => square::regular_grid(npoints)?,
            TemplateKind::Sphere => sphere::icosphere(sphere::subdivision_level(npoints)),
        };
        log::debug!(
            "{kind:?} template: {} regular points, {} faces (asked for {npoints})",
            vertices.nrows(),
            faces.nrows(),
        );

        Ok(Self {
            kind,
            vertices,
            faces,
        })
    }

    pub fn num_regular_points(&self) -> usize {
        self.vertices.nrows()
    }

    /// Triangulation of the regular grid: [F, 3]
    pub fn faces(&self) -> &Array2<usize> {
        &self.faces
    }

    /// -> [batch, dim, npoints], freshly drawn on every call
    pub fn random_points<B: Backend>(
        &self,
        batch: usize,
        npoints: usize,
        device: &B::Device,
    ) -> Tensor<B, 3> {
        match self.kind {
            TemplateKind::Square => square::random_points(batch, npoints, device),
            TemplateKind::Sphere => sphere::random_points(batch, npoints, device),
        }
    }

    /// -> [batch, dim, N], the regular grid repeated over the batch
    pub fn regular_points<B: Backend>(&self, batch: usize, device: &B::Device) -> Tensor<B, 3> {
        let shape = [self.vertices.nrows(), self.vertices.ncols()];
        let data = TensorData::new(self.vertices.iter().copied().collect::<Vec<f32>>(), shape);
        let grid: Tensor<B, 2> = Tensor::from_data(data, device);

        grid.transpose() // [dim, N]
            .unsqueeze_dim::<3>(0) // [1, dim, N]
            .repeat_dim(0, batch) // [B, dim, N]
    }
}
