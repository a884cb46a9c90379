//! Command-line runner: load a scene, step the bodies, report impacts.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use nalgebra::DVector;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ccd_core::{compute_earliest_toi, TimeStepper, DEFAULT_TOI_TOLERANCE};
use ccd_scene::{read_scene, SceneError};

#[derive(Debug, Parser)]
#[command(name = "ccd-cli", about = "Continuous collision detection over a rigid-body scene")]
struct Args {
    /// Scene JSON file.
    scene: PathBuf,

    /// Number of time steps to simulate.
    #[arg(long, default_value_t = 100)]
    steps: usize,

    /// Time step length in seconds.
    #[arg(long, default_value_t = 1e-2)]
    timestep: f64,

    /// Inflation radius for the broad phase.
    #[arg(long, default_value_t = 0.0)]
    inflation_radius: f64,

    /// Gravitational acceleration along the vertical (last) axis.
    #[arg(long, default_value_t = -9.81, allow_hyphen_values = true)]
    gravity: f64,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "simulation failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), SceneError> {
    let scene = read_scene(&args.scene)?;
    let mut bodies = scene.bodies;
    let dim = bodies.dim();
    let stepper = TimeStepper::for_dim(dim)?;

    let mut gravity = DVector::zeros(dim);
    gravity[dim - 1] = args.gravity;

    info!(
        bodies = bodies.num_bodies(),
        dim,
        stepper = stepper.name(),
        "loaded scene"
    );

    let mut num_impacts = 0usize;
    for step in 0..args.steps {
        let (poses_t0, poses_t1) = stepper.step_all(&mut bodies, &gravity, args.timestep)?;
        if let Some(toi) = compute_earliest_toi(
            &bodies,
            &poses_t0,
            &poses_t1,
            args.inflation_radius,
            DEFAULT_TOI_TOLERANCE,
        )? {
            num_impacts += 1;
            info!(step, toi, "impact during step");
        }
    }

    info!(steps = args.steps, num_impacts, "simulation finished");
    Ok(())
}
