#![recursion_limit = "131"]
mod error;
mod inference;
mod mesh;
mod model;
mod template;

use std::path::PathBuf;

use burn::backend::Wgpu;
use burn::backend::wgpu::WgpuDevice;
use clap::{Args, Parser, Subcommand};

use crate::error::Result;
use crate::inference::LatentSource;
use crate::model::Sampling;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ModelArgs {
    /// Model config (JSON). Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Trained weights saved with the compact recorder.
    #[arg(short, long)]
    weights: Option<PathBuf>,
    /// Latent vector values.
    #[arg(short, long, num_args = 1.., allow_negative_numbers = true)]
    latent: Vec<f32>,
    /// JSON file holding the latent vector(s).
    #[arg(long, conflicts_with = "latent")]
    latent_file: Option<PathBuf>,
    /// Seed for a random latent vector when none is given.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

impl ModelArgs {
    fn latent_source(&self) -> LatentSource {
        if !self.latent.is_empty() {
            LatentSource::Values(self.latent.clone())
        } else if let Some(path) = &self.latent_file {
            LatentSource::File(path.clone())
        } else {
            LatentSource::Random { seed: self.seed }
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a mesh from a latent vector.
    Generate {
        #[command(flatten)]
        model: ModelArgs,
        /// Output mesh, `.vtk` or `.stl`.
        #[arg(short, long, default_value = "artifacts/mesh.stl")]
        output: PathBuf,
    },
    /// Decode a batch of latent vectors into point clouds and write the first one.
    Sample {
        #[command(flatten)]
        model: ModelArgs,
        #[arg(short, long, default_value_t = 1)]
        batch_size: usize,
        /// Draw random template points instead of the regular grid.
        #[arg(long)]
        random: bool,
        #[arg(short, long, default_value = "artifacts/points.vtk")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    type MyBackend = Wgpu<f32, i32>;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let device = WgpuDevice::default();
    let start = std::time::Instant::now();

    match cli.command {
        Commands::Generate { model, output } => {
            let config = inference::load_config(model.config.as_deref())?;
            let atlasnet = inference::load_model::<MyBackend>(&config, model.weights.as_deref(), &device)?;
            let latent =
                inference::latent_batch(&model.latent_source(), 1, config.bottleneck_size, &device)?;
            inference::generate(&atlasnet, latent, &output)?;
        }
        Commands::Sample {
            model,
            batch_size,
            random,
            output,
        } => {
            let config = inference::load_config(model.config.as_deref())?;
            let atlasnet = inference::load_model::<MyBackend>(&config, model.weights.as_deref(), &device)?;
            let latent = inference::latent_batch(
                &model.latent_source(),
                batch_size,
                config.bottleneck_size,
                &device,
            )?;
            let sampling = if random {
                Sampling::Random
            } else {
                Sampling::Regular
            };
            inference::sample(&atlasnet, latent, sampling, &output)?;
        }
    }

    log::info!("Done in {:?}", start.elapsed());
    Ok(())
}
