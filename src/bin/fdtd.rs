//! Command-line driver: parameter file in, wavefunction and correlation files out.
//!
//! ```bash
//! fdtd run.in                # wavefront on all cores
//! fdtd run.in --threads 4    # fixed pool size
//! fdtd run.in --sequential
//! ```

use clap::Parser;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use waveguide_fdtd::export::{self, Component, RunSummary};
use waveguide_fdtd::{Grid, Parameters, Result};

/// Delay-feedback waveguide QED solver
#[derive(Parser)]
#[command(name = "fdtd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Parameter file (`key = value` lines)
    input: PathBuf,

    /// Worker threads for the wavefront driver (0: one per core)
    #[arg(short, long, default_value = "0")]
    threads: usize,

    /// Use the single-threaded driver
    #[arg(long)]
    sequential: bool,

    /// Enable debug output
    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("fdtd=debug,waveguide_fdtd=debug")
        } else {
            EnvFilter::new("fdtd=info,waveguide_fdtd=info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let parameters = Parameters::load(&cli.input)?;
    info!("parameters loaded from {}", cli.input.display());

    let start = Instant::now();
    let mut grid = Grid::new(parameters)?;
    grid.release_strips();
    let seed_seconds = start.elapsed().as_secs_f64();

    let start = Instant::now();
    let workers = if cli.sequential {
        grid.solve_sequential()?;
        1
    } else {
        grid.solve_wavefront(cli.threads)?
    };
    let solve_seconds = start.elapsed().as_secs_f64();
    info!("simulation done in {:.3} s on {} worker(s)", solve_seconds, workers);

    let outputs = write_results(&grid, &cli.input)?;

    let summary = RunSummary {
        parameters: grid.parameters().clone(),
        geometry: *grid.geometry(),
        workers,
        seed_seconds,
        solve_seconds,
        outputs,
    };
    summary.save(&export::output_path(&cli.input, export::SUMMARY_SUFFIX))?;
    Ok(())
}

fn write_results(grid: &Grid, input: &Path) -> Result<Vec<PathBuf>> {
    info!("writing results to files...");
    let p = grid.parameters();
    let mut outputs = Vec::new();

    if p.save_psi {
        outputs.push(export::save_psi(grid, input, Component::Real)?);
        outputs.push(export::save_psi(grid, input, Component::Imag)?);
    }
    if p.save_psi_square_integral {
        outputs.push(export::save_psi_square_integral(grid, input)?);
    }
    if p.save_psi_binary {
        outputs.push(export::save_psi_binary(grid, input)?);
    }
    if p.save_chi {
        outputs.push(export::save_chi(grid, input, Component::Abs)?);
    }
    Ok(outputs)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
