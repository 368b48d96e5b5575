//! Property 1 (geometry consistency) and S4 (localizer extremes).

use dfcsr::config::LatticeElementConfig;
use dfcsr::lattice::Lattice;
use dfcsr::localizer::bracket_main_panel;

fn chicane() -> Lattice {
    Lattice::build(&[
        LatticeElementConfig::Dipole { l: 0.3, steps: 4, angle: 0.1, e1: 0.0, e2: 0.0, nsep: 1 },
        LatticeElementConfig::Drift { l: 0.5, steps: 2, nsep: 1 },
        LatticeElementConfig::Dipole { l: 0.3, steps: 4, angle: -0.1, e1: 0.0, e2: 0.0, nsep: 1 },
        LatticeElementConfig::Drift { l: 0.2, steps: 2, nsep: 1 },
        LatticeElementConfig::Dipole { l: 0.3, steps: 4, angle: -0.1, e1: 0.0, e2: 0.0, nsep: 1 },
        LatticeElementConfig::Drift { l: 0.5, steps: 2, nsep: 1 },
        LatticeElementConfig::Dipole { l: 0.3, steps: 4, angle: 0.1, e1: 0.0, e2: 0.0, nsep: 1 },
    ])
    .unwrap()
}

#[test]
fn tangent_and_normal_are_orthonormal_everywhere() {
    let lat = chicane();
    let n_probe = 200;
    for i in 0..=n_probe {
        let s = lat.total_length() * i as f64 / n_probe as f64;
        let tau = lat.tau(s);
        let n = lat.n(s);
        assert!((tau.x * tau.x + tau.y * tau.y - 1.0).abs() < 1e-9);
        assert!((n.x * n.x + n.y * n.y - 1.0).abs() < 1e-9);
        assert!((tau.x * n.x + tau.y * n.y).abs() < 1e-9);
    }
}

#[test]
fn reference_point_finite_difference_matches_tangent() {
    let lat = chicane();
    let h = 1e-4;
    let n_probe = 50;
    for i in 1..n_probe {
        let s = lat.total_length() * i as f64 / n_probe as f64;
        let (x0, y0) = lat.reference_point(s - h);
        let (x1, y1) = lat.reference_point(s + h);
        let fd = dfcsr::vecmath::Vec2::new((x1 - x0) / (2.0 * h), (y1 - y0) / (2.0 * h));
        let tau = lat.tau(s);
        assert!((fd.x - tau.x).abs() < 1e-2);
        assert!((fd.y - tau.y).abs() < 1e-2);
    }
}

#[test]
fn localizer_extremes_give_default_box_when_all_probes_are_valid() {
    let lat = Lattice::build(&[LatticeElementConfig::Drift { l: 2.0, steps: 1, nsep: 1 }]).unwrap();
    let sigma_z = 1e-3;
    let sigma_x = 1e-6;
    let s = 1.0;
    let x = 0.0;
    let t = 1.0;
    let (smin, smax, xmin, xmax) = bracket_main_panel(&lat, |_| 0.0, x, s, t, sigma_x, sigma_z, 200);
    assert!((smin - (s - 5.0 * sigma_z)).abs() < 1e-12);
    assert!((smax - (s + 5.0 * sigma_z)).abs() < 1e-12);
    assert!((xmin - (x - 5.0 * sigma_x)).abs() < 1e-12);
    assert!((xmax - (x + 5.0 * sigma_x)).abs() < 1e-12);
}
