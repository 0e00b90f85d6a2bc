//! Delay-feedback solver benchmark suite

use waveguide_fdtd::{Grid, Parameters};

use std::time::Instant;

fn plane_wave(nx: usize, half_width: usize, steps: usize) -> Parameters {
    Parameters {
        nx,
        half_width,
        steps,
        delta: 0.01,
        k: 1.0,
        w0: 1.0,
        gamma: 1.0,
        init_cond: 1,
        save_psi: true,
        ..Default::default()
    }
}

fn benchmark_seeding() {
    println!("\n{}", "=".repeat(60));
    println!("BENCHMARK: Boundary Strip (plane wave)");
    println!("{}", "=".repeat(60));

    let sizes = [(20, 1000), (40, 2000), (80, 4000)];

    for &(nx, steps) in &sizes {
        let params = plane_wave(nx, 500, steps);

        let start = Instant::now();
        let grid = Grid::new(params).expect("seeding failed");
        let elapsed = start.elapsed().as_secs_f64();

        let cells = grid.psix0().len();
        println!(
            "  nx={:3}, Ny={:5}: {:.1} ms ({:.2} μs/cell)",
            nx,
            steps,
            elapsed * 1000.0,
            elapsed * 1e6 / cells as f64
        );
    }
}

fn benchmark_sequential() {
    println!("\n{}", "=".repeat(60));
    println!("BENCHMARK: Sequential Recurrence");
    println!("{}", "=".repeat(60));

    let sizes = [(20, 500, 1000), (20, 1000, 2000), (40, 2000, 4000)];

    for &(nx, half_width, steps) in &sizes {
        let mut grid = Grid::new(plane_wave(nx, half_width, steps)).expect("seeding failed");

        let start = Instant::now();
        grid.solve_sequential().expect("recurrence failed");
        let elapsed = start.elapsed().as_secs_f64();

        let cells = grid.psi().len();
        println!(
            "  {}x{}: {:.1} ms, {:.1} Mcells/s",
            steps,
            grid.geometry().ntotal,
            elapsed * 1000.0,
            cells as f64 / elapsed / 1e6
        );
    }
}

fn benchmark_wavefront() {
    println!("\n{}", "=".repeat(60));
    println!("BENCHMARK: Wavefront Scaling");
    println!("{}", "=".repeat(60));

    let params = plane_wave(40, 2000, 4000);
    let threads = [1, 2, 4, 8];

    let mut baseline = None;
    for &n in &threads {
        let mut grid = Grid::new(params.clone()).expect("seeding failed");

        let start = Instant::now();
        let workers = grid.solve_wavefront(n).expect("recurrence failed");
        let elapsed = start.elapsed().as_secs_f64();

        let base = *baseline.get_or_insert(elapsed);
        println!(
            "  {} worker(s): {:.1} ms, speedup {:.2}x",
            workers,
            elapsed * 1000.0,
            base / elapsed
        );
    }
}

fn main() {
    println!("\n{}", "#".repeat(60));
    println!("#  Delay-Feedback FDTD Benchmark Suite");
    println!("{}", "#".repeat(60));

    benchmark_seeding();
    benchmark_sequential();
    benchmark_wavefront();

    println!("\n{}", "=".repeat(60));
    println!("BENCHMARK COMPLETE");
    println!("{}", "=".repeat(60));
}
