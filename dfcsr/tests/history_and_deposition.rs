//! Property 3 (interpolation fidelity) and property 4 (deposition
//! consistency).

use dfcsr::deposition::{CloudInCell, DepositionKernel, Field2D};
use dfcsr::history::{DensityHistory, DensitySlice, HistoryField};

fn linear_field(a: f64, b: f64, c: f64, d: f64, t: f64, nx: usize, nz: usize, x_min: f64, x_max: f64, z_min: f64, z_max: f64) -> Field2D {
    let mut f = Field2D::zeros(nx, nz, x_min, x_max, z_min, z_max);
    for ix in 0..nx {
        for iz in 0..nz {
            let x = f.x_coord(ix);
            let z = f.z_coord(iz);
            let i = f.idx(ix, iz);
            f.data[i] = a + b * t + c * x + d * z;
        }
    }
    f
}

#[test]
fn query_recovers_a_linear_field_to_machine_precision_inside_support() {
    let (a, b, c, d) = (1.3, -0.7, 2.1, 0.9);
    let (nx, nz) = (12, 16);
    let (x_min, x_max, z_min, z_max) = (-1.0, 1.0, -2.0, 2.0);

    let mut hist = DensityHistory::new();
    for &t in &[0.0, 1.0, 2.0] {
        let rho = linear_field(a, b, c, d, t, nx, nz, x_min, x_max, z_min, z_max);
        let empty = Field2D::zeros(nx, nz, x_min, x_max, z_min, z_max);
        hist.append(DensitySlice {
            t,
            formation_length: f64::INFINITY,
            rho,
            rho_x: empty.clone(),
            rho_z: empty.clone(),
            vx: empty.clone(),
            vx_x: empty,
        });
    }

    for &(t, x, z) in &[(0.5, 0.25, 1.1), (1.0, -0.5, -0.5), (1.7, 0.9, 1.9)] {
        let zeta = z - t;
        let expected = a + b * t + c * x + d * z;
        let got = hist.query(HistoryField::Rho, t, x, zeta);
        assert!((got - expected).abs() < 1e-9, "t={t} x={x} z={z} expected={expected} got={got}");
    }

    let outside = hist.query(HistoryField::Rho, 1.0, 5.0, 0.0);
    assert_eq!(outside, 0.0);
}

#[test]
fn deposited_density_integrates_to_total_charge() {
    let n = 2000;
    let x_min = -5e-4;
    let x_max = 5e-4;
    let z_min = -5e-4;
    let z_max = 5e-4;
    let (nx, nz) = (64, 64);
    let charge = 1e-9;
    let weight = charge / n as f64;

    let mut field = Field2D::zeros(nx, nz, x_min, x_max, z_min, z_max);
    let kernel = CloudInCell;
    for i in 0..n {
        let u = (i as f64 + 0.5) / n as f64;
        let x = x_min + 0.6 * (x_max - x_min) * u;
        let z = z_min + 0.4 * (z_max - z_min) * (1.0 - u);
        kernel.deposit(&mut field, x, z, weight);
    }

    let total_weight: f64 = field.data.iter().sum();
    assert!((total_weight - charge).abs() / charge < 1e-6);
}
