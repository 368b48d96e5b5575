//! Property 2 (localizer round-trip): the two roots returned by
//! `LightConeQuadratic::roots` must be consistent with the quadratic's own
//! documented closed form (`xp = term1 +/- term2`) across a sweep of field
//! points, retarded arc-lengths, and beam-shear slopes.

use dfcsr::config::LatticeElementConfig;
use dfcsr::lattice::Lattice;
use dfcsr::localizer::build_quadratic;

#[test]
fn roots_are_symmetric_about_the_documented_midpoint() {
    let lat = Lattice::build(&[
        LatticeElementConfig::Dipole { l: 0.4, steps: 4, angle: 0.15, e1: 0.0, e2: 0.0, nsep: 1 },
        LatticeElementConfig::Drift { l: 1.0, steps: 2, nsep: 1 },
    ])
    .unwrap();

    let mut checked = 0;
    for slope in [-0.05_f64, -0.01, 0.02, 0.08] {
        for i in 1..100 {
            let sp = 1.4 * i as f64 / 100.0;
            let s = 1.2;
            let x = 1.5e-5;
            let t = 1.3;
            let q = build_quadratic(&lat, |_| slope, x, s, t, sp);
            assert!((q.a - (q.k * q.k - 1.0)).abs() < 1e-15);
            if let Some((xp1, xp2)) = q.roots() {
                let midpoint = (xp1 + xp2) / 2.0;
                let expected_midpoint = (q.n_sp_dot_q * q.k * q.k + q.dt * q.k) / q.a;
                assert!((midpoint - expected_midpoint).abs() < 1e-9 * expected_midpoint.abs().max(1.0));

                let half_spread = (xp1 - xp2).abs() / 2.0;
                let inner = q.a * (q.dt * q.dt - q.q2) + (q.n_sp_dot_q * q.k + q.dt).powi(2);
                assert!(inner >= -1e-9, "negative inner despite Some(..) root: {inner}");
                let expected_spread = (q.k * q.k / q.a).abs() * inner.max(0.0).sqrt();
                assert!((half_spread - expected_spread).abs() < 1e-9 * expected_spread.max(1.0));
                checked += 1;
            }
        }
    }
    assert!(checked > 0, "no valid roots found across the sweep to check");
}
