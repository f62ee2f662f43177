use std::collections::HashMap;

use burn::tensor::backend::Backend;
use burn::tensor::{Distribution, Tensor};
use nalgebra::Vector3;
use ndarray::Array2;

/// Level 4 gives 2562 vertices; finer grids are never generated.
const MAX_SUBDIVISION: u32 = 4;

const ICOSAHEDRON_FACES: [[usize; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

/// Gaussian samples projected onto the unit sphere -> [batch, 3, npoints]
pub(super) fn random_points<B: Backend>(
    batch: usize,
    npoints: usize,
    device: &B::Device,
) -> Tensor<B, 3> {
    let points = Tensor::<B, 3>::random([batch, 3, npoints], Distribution::Normal(0.0, 1.0), device);
    let norm = points.clone().powi_scalar(2).sum_dim(1).sqrt(); // [B, 1, N]
    points / norm
}

pub(super) fn vertex_count(level: u32) -> usize {
    10 * 4usize.pow(level) + 2
}

/// Coarsest level with at least `npoints` vertices.
pub(super) fn subdivision_level(npoints: usize) -> u32 {
    (0..MAX_SUBDIVISION)
        .find(|&level| vertex_count(level) >= npoints)
        .unwrap_or(MAX_SUBDIVISION)
}

fn midpoint(
    cache: &mut HashMap<(usize, usize), usize>,
    vertices: &mut Vec<Vector3<f32>>,
    a: usize,
    b: usize,
) -> usize {
    let key = (a.min(b), a.max(b));
    if let Some(&index) = cache.get(&key) {
        return index;
    }
    let middle = ((vertices[a] + vertices[b]) * 0.5).normalize();
    vertices.push(middle);
    let index = vertices.len() - 1;
    cache.insert(key, index);
    index
}

/// Unit icosphere with outward-facing triangles.
pub(super) fn icosphere(level: u32) -> (Array2<f32>, Array2<usize>) {
    let t = (1.0 + 5f32.sqrt()) / 2.0;
    let mut vertices: Vec<Vector3<f32>> = [
        [-1.0, t, 0.0],
        [1.0, t, 0.0],
        [-1.0, -t, 0.0],
        [1.0, -t, 0.0],
        [0.0, -1.0, t],
        [0.0, 1.0, t],
        [0.0, -1.0, -t],
        [0.0, 1.0, -t],
        [t, 0.0, -1.0],
        [t, 0.0, 1.0],
        [-t, 0.0, -1.0],
        [-t, 0.0, 1.0],
    ]
    .iter()
    .map(|&[x, y, z]| Vector3::new(x, y, z).normalize())
    .collect();
    let mut faces = ICOSAHEDRON_FACES.to_vec();

    for _ in 0..level {
        let mut cache = HashMap::new();
        let mut refined = Vec::with_capacity(faces.len() * 4);
        for &[a, b, c] in &faces {
            let ab = midpoint(&mut cache, &mut vertices, a, b);
            let bc = midpoint(&mut cache, &mut vertices, b, c);
            let ca = midpoint(&mut cache, &mut vertices, c, a);
            refined.extend_from_slice(&[[a, ab, ca], [b, bc, ab], [c, ca, bc], [ab, bc, ca]]);
        }
        faces = refined;
    }

    let vertices = Array2::from_shape_fn((vertices.len(), 3), |(i, axis)| vertices[i][axis]);
    let faces = Array2::from_shape_fn((faces.len(), 3), |(i, corner)| faces[i][corner]);
    (vertices, faces)
}
