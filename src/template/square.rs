use burn::tensor::backend::Backend;
use burn::tensor::{Distribution, Tensor};
use ndarray::Array2;

use crate::error::{AtlasnetError, Result};

/// Uniform samples in [0, 1)^2 -> [batch, 2, npoints]
pub(super) fn random_points<B: Backend>(
    batch: usize,
    npoints: usize,
    device: &B::Device,
) -> Tensor<B, 3> {
    Tensor::random([batch, 2, npoints], Distribution::Uniform(0.0, 1.0), device)
}

/// grain x grain grid over the unit square, grain = floor(sqrt(npoints)).
///
/// Vertex (i, j) sits at index `i * grain + j`; each cell is split into two triangles.
pub(super) fn regular_grid(npoints: usize) -> Result<(Array2<f32>, Array2<usize>)> {
    let grain = (npoints as f64).sqrt() as usize;
    if grain < 2 {
        return Err(AtlasnetError::InvalidConfig {
            message: format!("square template needs at least 4 points per primitive, got {npoints}"),
        });
    }

    let step = (grain - 1) as f32;
    let vertices = Array2::from_shape_fn((grain * grain, 2), |(index, axis)| {
        let coord = if axis == 0 { index / grain } else { index % grain };
        coord as f32 / step
    });

    let mut faces = Vec::with_capacity(2 * (grain - 1) * (grain - 1) * 3);
    for i in 1..grain {
        for j in 1..grain {
            faces.extend_from_slice(&[j + grain * i, j + grain * (i - 1), j - 1 + grain * (i - 1)]);
            faces.extend_from_slice(&[j - 1 + grain * i, j + grain * i, j - 1 + grain * (i - 1)]);
        }
    }
    let faces = Array2::from_shape_vec((faces.len() / 3, 3), faces)?;

    Ok((vertices, faces))
}
