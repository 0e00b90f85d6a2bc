//! Writers for the finished grid.
//!
//! Every output file is named after the parameter file with a suffix appended,
//! e.g. `run.toml.re.out`.

use ndarray::{Array1, Array2, ErrorKind, ShapeError};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{FdtdError, Result};
use crate::grid::{Geometry, Grid};
use crate::params::Parameters;

/// Scalar part of a complex amplitude written to a text file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Component {
    Real,
    Imag,
    Abs,
}

struct ComponentEntry {
    component: Component,
    extract: fn(Complex64) -> f64,
    psi_suffix: &'static str,
    chi_suffix: &'static str,
}

static COMPONENTS: [ComponentEntry; 3] = [
    ComponentEntry {
        component: Component::Real,
        extract: |z| z.re,
        psi_suffix: ".re.out",
        chi_suffix: ".re_chi.out",
    },
    ComponentEntry {
        component: Component::Imag,
        extract: |z| z.im,
        psi_suffix: ".im.out",
        chi_suffix: ".im_chi.out",
    },
    ComponentEntry {
        component: Component::Abs,
        extract: |z| z.norm(),
        psi_suffix: ".abs.out",
        chi_suffix: ".abs_chi.out",
    },
];

impl Component {
    fn entry(self) -> &'static ComponentEntry {
        &COMPONENTS[self as usize]
    }

    pub fn extract(self, z: Complex64) -> f64 {
        (self.entry().extract)(z)
    }

    pub fn psi_suffix(self) -> &'static str {
        self.entry().psi_suffix
    }

    pub fn chi_suffix(self) -> &'static str {
        self.entry().chi_suffix
    }

    pub fn all() -> impl Iterator<Item = Component> {
        COMPONENTS.iter().map(|e| e.component)
    }
}

pub const NORM_SUFFIX: &str = ".norm.out";
pub const BINARY_SUFFIX: &str = ".bin";
pub const SUMMARY_SUFFIX: &str = ".summary.json";

/// `input` with `suffix` appended to its file name.
pub fn output_path(input: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Write one component of `psi`, `Ny` lines of `Ntotal` values.
pub fn save_psi(grid: &Grid, input: &Path, component: Component) -> Result<PathBuf> {
    let path = output_path(input, component.psi_suffix());
    let mut out = BufWriter::new(File::create(&path)?);
    for row in grid.psi().rows() {
        for &z in row {
            write!(out, "{:.5} ", component.extract(z))?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    info!("wrote {}", path.display());
    Ok(path)
}

/// Time rows `j` for which the outgoing correlation is fully determined.
pub fn correlation_rows(geometry: &Geometry) -> std::ops::RangeInclusive<usize> {
    geometry.minus_a_index..=geometry.ny
}

/// Separations `i` (in grid units) available on every correlation row.
pub fn correlation_columns(geometry: &Geometry) -> std::ops::RangeInclusive<usize> {
    0..=geometry.half_width - geometry.nx / 2
}

/// Outgoing two-photon amplitude `chi(a + Delta, a + Delta + i Delta, j Delta)`.
///
/// Combines the incident plane wave with the field radiated through both
/// emitter positions; `j` must lie in [`correlation_rows`] and `i` in
/// [`correlation_columns`].
pub fn two_photon_correlation(grid: &Grid, j: usize, i: usize) -> Complex64 {
    let g = grid.geometry();
    let (nx, minus_a, plus_a) = (g.nx, g.minus_a_index, g.plus_a_index);
    let gamma = grid.physics().gamma;
    let phase = grid.physics().k * (nx as f64 + 2.0 + i as f64 - 2.0 * j as f64) * g.delta;

    let radiated = grid.get(j - nx - i - 1, minus_a - i) - grid.get(j - i - 1, plus_a - i)
        + grid.get(j - nx - 1, minus_a + i)
        - grid.get(j - 1, plus_a + i);

    Complex64::new(0.0, phase).exp() - gamma.sqrt() / 2.0 * radiated
}

/// Stream one component of the correlation to disk without storing it.
pub fn save_chi(grid: &Grid, input: &Path, component: Component) -> Result<PathBuf> {
    let g = grid.geometry();
    let path = output_path(input, component.chi_suffix());
    let mut out = BufWriter::new(File::create(&path)?);
    for j in correlation_rows(g) {
        for i in correlation_columns(g) {
            write!(out, "{:.4} ", component.extract(two_photon_correlation(grid, j, i)))?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    info!("wrote {}", path.display());
    Ok(path)
}

/// `Delta * sum |psi(x, t)|^2` over the solved window, one value per row.
pub fn psi_square_integral(grid: &Grid) -> Array1<f64> {
    let g = grid.geometry();
    grid.psi()
        .rows()
        .into_iter()
        .map(|row| g.delta * row.iter().skip(g.nx + 1).map(|z| z.norm_sqr()).sum::<f64>())
        .collect()
}

/// Write the norm integral as `time value` lines.
pub fn save_psi_square_integral(grid: &Grid, input: &Path) -> Result<PathBuf> {
    let delta = grid.geometry().delta;
    let path = output_path(input, NORM_SUFFIX);
    let mut out = BufWriter::new(File::create(&path)?);
    for (t, norm) in psi_square_integral(grid).iter().enumerate() {
        writeln!(out, "{:.5} {:.10}", t as f64 * delta, norm)?;
    }
    out.flush()?;
    info!("wrote {}", path.display());
    Ok(path)
}

/// Dump `psi` as native-endian `(re, im)` f64 pairs, row-major.
pub fn save_psi_binary(grid: &Grid, input: &Path) -> Result<PathBuf> {
    let path = output_path(input, BINARY_SUFFIX);
    let data = grid
        .psi()
        .as_slice()
        .ok_or(FdtdError::Shape(ShapeError::from_kind(ErrorKind::IncompatibleLayout)))?;
    fs::write(&path, bytemuck::cast_slice::<Complex64, u8>(data))?;
    info!("wrote {} ({} bytes)", path.display(), std::mem::size_of_val(data));
    Ok(path)
}

/// Read back a binary dump of a `rows x cols` grid.
pub fn load_psi_binary(path: &Path, rows: usize, cols: usize) -> Result<Array2<Complex64>> {
    let bytes = fs::read(path)?;
    let width = std::mem::size_of::<Complex64>();
    if bytes.len() % width != 0 {
        return Err(invalid_data(format!("{}: {} bytes is not a whole number of amplitudes", path.display(), bytes.len())));
    }
    // a Vec<u8> is not necessarily aligned for f64
    let values: Vec<Complex64> = bytes
        .chunks_exact(width)
        .map(bytemuck::pod_read_unaligned::<Complex64>)
        .collect();
    Ok(Array2::from_shape_vec((rows, cols), values)?)
}

/// Parse a text export back into a matrix of values.
pub fn load_component(path: &Path) -> Result<Array2<f64>> {
    let reader = BufReader::new(File::open(path)?);
    let mut values = Vec::new();
    let mut rows = 0;
    let mut cols = None;

    for line in reader.lines() {
        let line = line?;
        let before = values.len();
        for token in line.split_whitespace() {
            let v: f64 = token
                .parse()
                .map_err(|_| invalid_data(format!("{}:{}: bad value {:?}", path.display(), rows + 1, token)))?;
            values.push(v);
        }
        let width = values.len() - before;
        match cols {
            None => cols = Some(width),
            Some(c) if c != width => {
                return Err(invalid_data(format!(
                    "{}:{}: expected {} values, found {}",
                    path.display(),
                    rows + 1,
                    c,
                    width
                )))
            }
            Some(_) => {}
        }
        rows += 1;
    }

    Ok(Array2::from_shape_vec((rows, cols.unwrap_or(0)), values)?)
}

fn invalid_data(msg: String) -> FdtdError {
    FdtdError::Io(io::Error::new(io::ErrorKind::InvalidData, msg))
}

/// Record of a finished run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub parameters: Parameters,
    pub geometry: Geometry,
    pub workers: usize,
    pub seed_seconds: f64,
    pub solve_seconds: f64,
    pub outputs: Vec<PathBuf>,
}

impl RunSummary {
    pub fn save(&self, filepath: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(filepath, json)?;
        Ok(())
    }

    pub fn load(filepath: &Path) -> Result<Self> {
        let json = fs::read_to_string(filepath)?;
        Ok(serde_json::from_str(&json)?)
    }
}
