use criterion::{criterion_group, criterion_main, Criterion};

use dfcsr::config::{CsrIntegration, InputBeam};
use dfcsr::history::{DensityHistory, HistoryField};
use dfcsr::lattice::Lattice;
use dfcsr::quadrature::compute_wake;

fn build_history(lattice: &Lattice) -> DensityHistory {
    use dfcsr::beam::Beam;
    use dfcsr::deposition::CloudInCell;

    let beam = Beam::from_config(&InputBeam {
        charge: 1e-9,
        energy: 1.0,
        gamma: 1000.0,
        emittance_x: 1e-9,
        beta_x: 1.0,
        alpha_x: 0.0,
        sigma_x: 3e-5,
        sigma_z: 5e-5,
        sigma_delta: 1e-3,
        n_particles: 343,
        xz_correlation: 0.0,
    });
    let mut history = DensityHistory::new();
    history.deposit(
        &CloudInCell,
        &beam.x,
        &beam.z,
        &beam.xp,
        beam.charge,
        beam.s,
        f64::INFINITY,
        64,
        64,
        -5.0 * 3e-5,
        5.0 * 3e-5,
        -5.0 * 5e-5,
        5.0 * 5e-5,
    );
    let _ = lattice;
    history
}

fn wake_at_one_point() {
    let lattice = Lattice::build(&[dfcsr::config::LatticeElementConfig::Dipole {
        l: 0.5,
        steps: 10,
        angle: 0.1,
        e1: 0.0,
        e2: 0.0,
        nsep: 1,
    }])
    .unwrap();
    let history = build_history(&lattice);
    let params = CsrIntegration { xbins: 40, zbins: 40, n_formation_length: 1.0 };
    let vx_field = history.query(HistoryField::Vx, 0.0, 0.0, 0.0);
    compute_wake(&lattice, &history, |_sp| 0.0, 0.25, 0.0, 0.0, vx_field, 3e-5, 5e-5, 1e-3, 1e-9, &params);
}

fn my_benchmark(c: &mut Criterion) {
    c.bench_function("compute_wake_single_point", |b| b.iter(wake_at_one_point));
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(20);
    targets = my_benchmark
}
criterion_main!(benches);
