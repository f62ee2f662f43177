use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use burn::prelude::*;
use burn::record::{CompactRecorder, Recorder};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::error::{AtlasnetError, Result};
use crate::mesh::Mesh;
use crate::model::{Atlasnet, AtlasnetConfig, Sampling, to_host};

/// Where the latent vector(s) come from.
#[derive(Clone, Debug)]
pub enum LatentSource {
    Values(Vec<f32>),
    /// JSON array of numbers.
    File(PathBuf),
    /// Standard normal draw.
    Random { seed: u64 },
}

pub fn load_config(path: Option<&Path>) -> Result<AtlasnetConfig> {
    match path {
        Some(path) => AtlasnetConfig::load(path)
            .map_err(|err| AtlasnetError::Config(format!("{}: {err:?}", path.display()))),
        None => Ok(AtlasnetConfig::new()),
    }
}

pub fn load_model<B: Backend>(
    config: &AtlasnetConfig,
    weights: Option<&Path>,
    device: &B::Device,
) -> Result<Atlasnet<B>> {
    let model = config.init::<B>(device)?;
    let Some(path) = weights else {
        log::warn!("No weights given; decoding with untrained parameters");
        return Ok(model);
    };

    let record = CompactRecorder::new()
        .load(path.to_path_buf(), device)
        .map_err(|err| AtlasnetError::Record(format!("{}: {err:?}", path.display())))?;
    log::info!("Loaded weights from {}", path.display());
    Ok(model.load_record(record))
}

/// -> [batch, size]. A single vector is repeated over the batch.
pub fn latent_batch<B: Backend>(
    source: &LatentSource,
    batch: usize,
    size: usize,
    device: &B::Device,
) -> Result<Tensor<B, 2>> {
    let values = match source {
        LatentSource::Values(values) => values.clone(),
        LatentSource::File(path) => serde_json::from_reader(BufReader::new(File::open(path)?))?,
        LatentSource::Random { seed } => {
            let mut rng = StdRng::seed_from_u64(*seed);
            (0..batch * size).map(|_| rng.sample(StandardNormal)).collect()
        }
    };

    let latent = if values.len() == size {
        Tensor::<B, 2>::from_data(TensorData::new(values, [1, size]), device).repeat_dim(0, batch)
    } else if values.len() == batch * size {
        Tensor::from_data(TensorData::new(values, [batch, size]), device)
    } else {
        return Err(AtlasnetError::ShapeMismatch {
            expected: vec![batch, size],
            got: vec![values.len()],
        });
    };
    Ok(latent)
}

/// Decode a single latent vector into a mesh and write it (`.vtk`, otherwise STL).
pub fn generate<B: Backend>(model: &Atlasnet<B>, latent: Tensor<B, 2>, output: &Path) -> Result<Mesh> {
    let mesh = model.generate_mesh(latent)?;
    create_parent_dir(output)?;
    match output.extension().and_then(|s| s.to_str()) {
        Some("vtk") => write_vtk_mesh(&mesh, output)?,
        _ => write_stl(&mesh, output)?,
    }
    log::info!(
        "Wrote mesh with {} vertices and {} faces to {}",
        mesh.num_vertices(),
        mesh.num_faces(),
        output.display(),
    );
    Ok(mesh)
}

/// Decode a batch of latent vectors and write the first point cloud.
pub fn sample<B: Backend>(
    model: &Atlasnet<B>,
    latent: Tensor<B, 2>,
    sampling: Sampling,
    output: &Path,
) -> Result<Array2<f32>> {
    if sampling == Sampling::Regular {
        log::debug!("Sampling {} regular points per cloud", model.num_regular_points());
    }
    let cloud = model.forward(latent, sampling)?;
    let [_, primitives, points, _] = cloud.dims();
    let first = cloud
        .slice([0..1, 0..primitives, 0..points, 0..3])
        .reshape([primitives * points, 3]);
    let points = to_host(first)?;

    create_parent_dir(output)?;
    write_vtk_points(&points, output)?;
    log::info!(
        "Wrote {} points from {} primitives to {}",
        points.nrows(),
        model.num_primitives(),
        output.display(),
    );
    Ok(points)
}

fn create_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn write_vtk_header(w: &mut impl Write, points: &Array2<f32>) -> std::io::Result<()> {
    writeln!(w, "# vtk DataFile Version 3.0")?;
    writeln!(w, "Atlasnet output")?;
    writeln!(w, "ASCII")?;
    writeln!(w, "DATASET POLYDATA")?;

    writeln!(w, "POINTS {} float", points.nrows())?;
    for p in points.rows() {
        writeln!(w, "{} {} {}", p[0], p[1], p[2])?;
    }
    Ok(())
}

/// points: [N, 3], one vertex cell per point
pub fn write_vtk_points(points: &Array2<f32>, path: &Path) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    write_vtk_header(&mut w, points)?;

    writeln!(w, "VERTICES {} {}", points.nrows(), points.nrows() * 2)?;
    for i in 0..points.nrows() {
        writeln!(w, "1 {i}")?;
    }
    w.flush()
}

pub fn write_vtk_mesh(mesh: &Mesh, path: &Path) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    write_vtk_header(&mut w, &mesh.vertices)?;

    writeln!(w, "POLYGONS {} {}", mesh.num_faces(), mesh.num_faces() * 4)?;
    for f in mesh.faces.rows() {
        writeln!(w, "3 {} {} {}", f[0], f[1], f[2])?;
    }
    w.flush()
}

/// Binary STL.
pub fn write_stl(mesh: &Mesh, path: &Path) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    stl_io::write_stl(&mut w, mesh.triangles().iter())?;
    w.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use ndarray::array;

    use crate::template::TemplateKind;

    type TestBackend = NdArray;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join("atlasnet_tests").join(name)
    }

    fn quad() -> Mesh {
        Mesh::new(
            array![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            array![[0, 1, 2], [0, 2, 3]],
        )
        .unwrap()
    }

    fn small_model() -> Atlasnet<TestBackend> {
        AtlasnetConfig::new()
            .with_number_points(200)
            .with_nb_primitives(2)
            .with_bottleneck_size(8)
            .with_hidden_neurons(16)
            .with_template_type(TemplateKind::Square)
            .init(&Default::default())
            .unwrap()
    }

    #[test]
    fn test_vtk_mesh() {
        let path = temp_path("quad.vtk");
        create_parent_dir(&path).unwrap();
        write_vtk_mesh(&quad(), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[3], "DATASET POLYDATA");
        assert_eq!(lines[4], "POINTS 4 float");
        assert_eq!(lines[9], "POLYGONS 2 8");
        assert_eq!(lines[11], "3 0 2 3");
    }

    #[test]
    fn test_vtk_points() {
        let path = temp_path("points.vtk");
        create_parent_dir(&path).unwrap();
        write_vtk_points(&array![[0.5, 0.0, 1.0], [0.0, 2.0, 0.0]], &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("POINTS 2 float\n0.5 0 1\n0 2 0\n"));
        assert!(text.ends_with("VERTICES 2 4\n1 0\n1 1\n"));
    }

    #[test]
    fn test_stl_reads_back() {
        let path = temp_path("quad.stl");
        create_parent_dir(&path).unwrap();
        write_stl(&quad(), &path).unwrap();

        let mut file = File::open(&path).unwrap();
        let mesh = stl_io::read_stl(&mut file).unwrap();
        assert_eq!(mesh.faces.len(), 2);
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.faces[0].normal.0, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_latent_repeated_over_batch() {
        let device = Default::default();
        let source = LatentSource::Values(vec![1.0, 2.0]);
        let latent = latent_batch::<TestBackend>(&source, 3, 2, &device).unwrap();

        assert_eq!(latent.dims(), [3, 2]);
        let values = latent.into_data().to_vec::<f32>().unwrap();
        assert_eq!(values, vec![1.0, 2.0, 1.0, 2.0, 1.0, 2.0]);
    }

    #[test]
    fn test_latent_wrong_length() {
        let device = Default::default();
        let source = LatentSource::Values(vec![1.0, 2.0, 3.0]);
        let result = latent_batch::<TestBackend>(&source, 2, 2, &device);
        assert!(matches!(result, Err(AtlasnetError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_random_latent_is_seeded() {
        let device = Default::default();
        let source = LatentSource::Random { seed: 7 };
        let a = latent_batch::<TestBackend>(&source, 2, 4, &device).unwrap();
        let b = latent_batch::<TestBackend>(&source, 2, 4, &device).unwrap();

        assert_eq!(a.dims(), [2, 4]);
        assert_eq!(a.into_data().to_vec::<f32>().unwrap(), b.into_data().to_vec::<f32>().unwrap());
    }

    #[test]
    fn test_latent_from_json() {
        let device = Default::default();
        let path = temp_path("latent.json");
        create_parent_dir(&path).unwrap();
        std::fs::write(&path, "[0.25, -1.5, 3.0]").unwrap();

        let latent = latent_batch::<TestBackend>(&LatentSource::File(path), 1, 3, &device).unwrap();
        assert_eq!(latent.into_data().to_vec::<f32>().unwrap(), vec![0.25, -1.5, 3.0]);
    }

    #[test]
    fn test_generate_writes_stl() {
        let device = Default::default();
        let model = small_model();
        let latent = latent_batch::<TestBackend>(&LatentSource::Random { seed: 1 }, 1, 8, &device).unwrap();
        let path = temp_path("generated/mesh.stl");

        let mesh = generate(&model, latent, &path).unwrap();
        assert_eq!(mesh.num_vertices(), 200);

        let mut file = File::open(&path).unwrap();
        let written = stl_io::read_stl(&mut file).unwrap();
        assert_eq!(written.faces.len(), mesh.num_faces());
    }

    #[test]
    fn test_sample_writes_first_cloud() {
        let device = Default::default();
        let model = small_model();
        let latent = latent_batch::<TestBackend>(&LatentSource::Random { seed: 2 }, 3, 8, &device).unwrap();
        let path = temp_path("sampled/points.vtk");

        let points = sample(&model, latent, Sampling::Random, &path).unwrap();
        assert_eq!(points.dim(), (200, 3));
        assert!(std::fs::read_to_string(&path).unwrap().contains("POINTS 200 float"));
    }

    #[test]
    fn test_sample_regular_uses_the_grid() {
        let device = Default::default();
        let model = AtlasnetConfig::new()
            .with_number_points(200)
            .with_nb_primitives(2)
            .with_bottleneck_size(8)
            .with_hidden_neurons(16)
            .init::<TestBackend>(&device)
            .unwrap();
        let latent = latent_batch::<TestBackend>(&LatentSource::Random { seed: 3 }, 1, 8, &device).unwrap();
        let path = temp_path("sampled/regular.vtk");

        let points = sample(&model, latent, Sampling::Regular, &path).unwrap();
        assert_eq!(model.num_regular_points(), 2 * 162);
        assert_eq!(points.nrows(), model.num_regular_points());
    }

    #[test]
    fn test_default_config_without_file() {
        let config = load_config(None).unwrap();
        assert_eq!(config.number_points, 2500);
    }
}
