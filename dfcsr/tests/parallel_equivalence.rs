//! Property 5 / S5 (parallel equivalence), exercised in-process: the wake
//! is computed once per grid point serially, then the same grid points are
//! split across simulated peer counts 1, 2, and 4 using the same slicing
//! `Partitioner` would use; the reassembled results must be bit-identical
//! to the serial computation, since the underlying math does not depend on
//! how the work is split.

use dfcsr::config::{CsrIntegration, InputBeam, LatticeElementConfig};
use dfcsr::deposition::CloudInCell;
use dfcsr::history::{DensityHistory, HistoryField};
use dfcsr::lattice::Lattice;
use dfcsr::localizer::linspace;
use dfcsr::partition::{local_range, partition_counts};
use dfcsr::quadrature::compute_wake;

fn setup() -> (Lattice, DensityHistory, Vec<f64>, Vec<f64>) {
    let lattice = Lattice::build(&[LatticeElementConfig::Dipole {
        l: 0.3,
        steps: 4,
        angle: 0.12,
        e1: 0.0,
        e2: 0.0,
        nsep: 1,
    }])
    .unwrap();

    let beam_cfg = InputBeam {
        charge: 1e-9,
        energy: 1.0,
        gamma: 1000.0,
        emittance_x: 1e-9,
        beta_x: 1.0,
        alpha_x: 0.0,
        sigma_x: 3e-5,
        sigma_z: 5e-5,
        sigma_delta: 1e-3,
        n_particles: 216,
        xz_correlation: 0.0,
    };
    let beam = dfcsr::beam::Beam::from_config(&beam_cfg);

    let mut history = DensityHistory::new();
    history.deposit(
        &CloudInCell,
        &beam.x,
        &beam.z,
        &beam.xp,
        beam.charge,
        beam.s,
        f64::INFINITY,
        20,
        20,
        -5.0 * beam_cfg.sigma_x,
        5.0 * beam_cfg.sigma_x,
        -5.0 * beam_cfg.sigma_z,
        5.0 * beam_cfg.sigma_z,
    );

    let x_grid = linspace(-5.0 * beam_cfg.sigma_x, 5.0 * beam_cfg.sigma_x, 6);
    let z_grid = linspace(0.15 - 5.0 * beam_cfg.sigma_z, 0.15 + 5.0 * beam_cfg.sigma_z, 6);
    (lattice, history, x_grid, z_grid)
}

fn compute_all(lattice: &Lattice, history: &DensityHistory, x_grid: &[f64], z_grid: &[f64], indices: std::ops::Range<usize>) -> Vec<(f64, f64)> {
    let params = CsrIntegration { xbins: 10, zbins: 10, n_formation_length: 1.0 };
    indices
        .map(|flat_idx| {
            let ix = flat_idx / z_grid.len();
            let iz = flat_idx % z_grid.len();
            let x = x_grid[ix];
            let s = z_grid[iz];
            let t = 0.15;
            let vx_field = history.query(HistoryField::Vx, t, x, s - t);
            compute_wake(lattice, history, |_sp| 0.0, s, x, t, vx_field, 3e-5, 5e-5, 1e-3, 1e-9, &params)
        })
        .collect()
}

#[test]
fn partitioning_the_observation_mesh_reproduces_the_serial_result_exactly() {
    let (lattice, history, x_grid, z_grid) = setup();
    let work_size = x_grid.len() * z_grid.len();

    let serial = compute_all(&lattice, &history, &x_grid, &z_grid, 0..work_size);

    for n_ranks in [1, 2, 4] {
        let (counts, _displs) = partition_counts(work_size, n_ranks);
        assert_eq!(counts.iter().sum::<usize>(), work_size);

        let mut reassembled = vec![(0.0, 0.0); work_size];
        for rank in 0..n_ranks {
            let (start, end) = local_range(work_size, n_ranks, rank);
            let chunk = compute_all(&lattice, &history, &x_grid, &z_grid, start..end);
            reassembled[start..end].copy_from_slice(&chunk);
        }

        for (i, (a, b)) in serial.iter().zip(&reassembled).enumerate() {
            assert_eq!(a.0.to_bits(), b.0.to_bits(), "dE/dct mismatch at flat index {i} for n_ranks={n_ranks}");
            assert_eq!(a.1.to_bits(), b.1.to_bits(), "x_kick mismatch at flat index {i} for n_ranks={n_ranks}");
        }
    }
}
