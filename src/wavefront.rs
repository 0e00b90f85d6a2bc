//! Staggered wavefront parallelism.
//!
//! `N` workers advance `N` consecutive time rows together. In sweep `s` of a
//! batch starting at row `base`, worker `n` updates row `base + n` at column
//! `first + s - n * nx`. The stencil of a cell reaches at most `nx` columns
//! back into the previous row and reads mirrored columns from rows that are
//! further ahead in the stagger, so every read lands on a cell finished in an
//! earlier sweep. Each cell has exactly one writer; the end of each sweep's
//! parallel-for is the only synchronisation.

use ndarray::{Array2, ErrorKind, ShapeError};
use num_complex::Complex64;
use rayon::prelude::*;
use std::marker::PhantomData;
use std::ops::Range;
use tracing::{debug, info};

use crate::average::Amplitudes;
use crate::error::{FdtdError, Result};
use crate::grid::{Geometry, Grid};
use crate::solver::Recurrence;

/// Assignment of (row, column) cells to workers, sweep by sweep.
#[derive(Clone, Debug, PartialEq)]
pub struct WavefrontSchedule {
    workers: usize,
    stride: usize,
    rows: Range<usize>,
    columns: Range<usize>,
}

impl WavefrontSchedule {
    /// Build a schedule over `rows x columns` with the given column stagger.
    ///
    /// More than one worker needs a stagger of at least one column, otherwise
    /// a worker would read the cell its predecessor is writing.
    pub fn new(workers: usize, stride: usize, rows: Range<usize>, columns: Range<usize>) -> Result<Self> {
        if workers == 0 {
            return Err(FdtdError::schedule("at least one worker is required"));
        }
        if workers > 1 && stride == 0 {
            return Err(FdtdError::schedule(format!(
                "{workers} workers need a column stagger of at least 1"
            )));
        }
        Ok(Self {
            workers,
            stride,
            rows,
            columns,
        })
    }

    /// Schedule for the solved region of a grid, staggered by the delay `nx`.
    pub fn for_geometry(geometry: &Geometry, workers: usize) -> Result<Self> {
        Self::new(workers, geometry.nx, 1..geometry.ny, geometry.window())
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Consecutive row ranges advanced together, at most `workers` rows each.
    pub fn batches(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        let end = self.rows.end;
        self.rows
            .clone()
            .step_by(self.workers)
            .map(move |base| base..(base + self.workers).min(end))
    }

    /// Number of lock-step sweeps needed to finish a batch.
    pub fn sweeps(&self, batch: &Range<usize>) -> usize {
        if batch.is_empty() || self.columns.is_empty() {
            return 0;
        }
        self.columns.len() + (batch.len() - 1) * self.stride
    }

    /// Cell updated by `worker` in `sweep`, if any.
    #[inline]
    pub fn cell(&self, batch: &Range<usize>, sweep: usize, worker: usize) -> Option<(usize, usize)> {
        if worker >= batch.len() {
            return None;
        }
        let shift = worker * self.stride;
        if sweep < shift {
            return None;
        }
        let column = self.columns.start + (sweep - shift);
        if column >= self.columns.end {
            return None;
        }
        Some((batch.start + worker, column))
    }
}

/// Unsynchronised view of `psi` shared by the workers of one run.
struct SharedField<'a> {
    ptr: *mut Complex64,
    rows: usize,
    cols: usize,
    _psi: PhantomData<&'a mut Complex64>,
}

// SAFETY: the schedule gives every cell a single writer and only lets workers
// read cells completed before the current sweep, so no cell is read and
// written concurrently.
unsafe impl Sync for SharedField<'_> {}

impl<'a> SharedField<'a> {
    fn new(psi: &'a mut Array2<Complex64>) -> Result<Self> {
        let (rows, cols) = psi.dim();
        let data = psi
            .as_slice_mut()
            .ok_or(FdtdError::Shape(ShapeError::from_kind(ErrorKind::IncompatibleLayout)))?;
        Ok(Self {
            ptr: data.as_mut_ptr(),
            rows,
            cols,
            _psi: PhantomData,
        })
    }

    /// # Safety
    ///
    /// The caller must be the only worker assigned to `(t, x)` in this sweep.
    #[inline]
    unsafe fn write(&self, t: usize, x: usize, value: Complex64) {
        assert!(t < self.rows && x < self.cols);
        self.ptr.add(t * self.cols + x).write(value);
    }
}

impl Amplitudes for SharedField<'_> {
    #[inline]
    fn width(&self) -> usize {
        self.cols
    }

    #[inline]
    fn amplitude(&self, t: usize, x: usize) -> Complex64 {
        assert!(t < self.rows && x < self.cols);
        // SAFETY: in bounds, and never the target of a write in this sweep.
        unsafe { self.ptr.add(t * self.cols + x).read() }
    }
}

fn run_schedule(schedule: &WavefrontSchedule, recurrence: &Recurrence, field: &SharedField<'_>) -> Result<()> {
    for batch in schedule.batches() {
        debug!("wavefront: rows {}..{}", batch.start, batch.end);
        for sweep in 0..schedule.sweeps(&batch) {
            (0..batch.len()).into_par_iter().try_for_each(|worker| {
                if let Some((t, x)) = schedule.cell(&batch, sweep, worker) {
                    if let Some(value) = recurrence.advance(field, t, x)? {
                        // SAFETY: `cell` maps each (sweep, worker) to a distinct cell.
                        unsafe { field.write(t, x, value) };
                    }
                }
                Ok::<(), FdtdError>(())
            })?;
        }
    }
    Ok(())
}

impl Grid {
    /// Fill the solved window with the staggered wavefront on a pool of
    /// `threads` workers (`0` picks rayon's default). A single worker falls
    /// back to [`Grid::solve_sequential`]. Returns the number of workers used.
    pub fn solve_wavefront(&mut self, threads: usize) -> Result<usize> {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
        let workers = pool.current_num_threads();
        if workers <= 1 {
            self.solve_sequential()?;
            return Ok(1);
        }

        let schedule = WavefrontSchedule::for_geometry(self.geometry(), workers)?;
        let recurrence = Recurrence::for_grid(self);
        info!(
            "simulation starts (wavefront, {} workers, stagger {})",
            workers,
            recurrence.geometry().nx
        );

        let field = SharedField::new(self.psi_mut())?;
        pool.install(|| run_schedule(&schedule, &recurrence, &field))?;
        Ok(workers)
    }
}
