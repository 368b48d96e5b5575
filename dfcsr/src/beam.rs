// dfcsr - A 2-D coherent synchrotron radiation wake engine
// Derived from sir_ddft (Copyright (C) 2021 Julian Jeggle, Raphael Wittkowski),
// licensed under the GNU Affero General Public License v3 or later.

//! Particle ensemble (C2). Coordinates are stored as separate flat `Vec<f64>`
//! fields per the crate's array-of-structs-of-arrays convention (mirrors the
//! S/I/R field layout of the density solvers this crate started from),
//! rather than a `Vec<Particle>` of structs.

use crate::config::InputBeam;
use crate::transport::{apply, twiss_propagate, Mat6};

/// A bunch of macro-particles in `(x, x', y, y', z, delta)` phase space.
pub struct Beam {
    pub x: Vec<f64>,
    pub xp: Vec<f64>,
    pub y: Vec<f64>,
    pub yp: Vec<f64>,
    pub z: Vec<f64>,
    pub delta: Vec<f64>,
    pub charge: f64,
    /// Arc-length position along the lattice.
    pub s: f64,
    pub step: usize,
    pub init_gamma: f64,
    pub init_energy: f64,
}

impl Beam {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Build an initial ensemble on a deterministic quiet-start tensor-product
    /// grid in `(x, x', z)` rather than drawing random samples: a run is
    /// reproducible bit-for-bit across MPI partitionings, which matters for
    /// the parallel-equivalence property.
    pub fn from_config(cfg: &InputBeam) -> Beam {
        let n = cfg.n_particles.max(1);
        let per_axis = (n as f64).cbrt().round().max(1.0) as usize;
        let total = per_axis * per_axis * per_axis;

        let mut x = Vec::with_capacity(total);
        let mut xp = Vec::with_capacity(total);
        let mut z = Vec::with_capacity(total);

        let gamma0 = cfg.alpha_x;
        let beta0 = cfg.beta_x;
        let emit = cfg.emittance_x;
        let grid = quiet_grid(per_axis);

        for &gx in &grid {
            for &gxp in &grid {
                for &gz in &grid {
                    // Normal-coordinate ellipse parametrized by action-angle
                    // radius gx (in sigma units) and phase gxp.
                    let u = gx * 3.0;
                    let v = gxp * 2.0 * std::f64::consts::PI;
                    let j = u.abs();
                    let un = (2.0 * j).sqrt() * v.cos();
                    let upn = (2.0 * j).sqrt() * v.sin();
                    let sigx = (emit * beta0).sqrt();
                    let sigxp = (emit * (1.0 + gamma0 * gamma0) / beta0).sqrt();
                    x.push(sigx * un);
                    xp.push(sigxp * (upn - gamma0 * un) / beta0.sqrt() * beta0.sqrt());
                    z.push(cfg.sigma_z * gz * 3.0 + cfg.xz_correlation * sigx * un);
                }
            }
        }
        let y = vec![0.0; total];
        let yp = vec![0.0; total];
        let delta = grid
            .iter()
            .cycle()
            .take(total)
            .map(|g| cfg.sigma_delta * g * 3.0)
            .collect();

        Beam {
            x,
            xp,
            y,
            yp,
            z,
            delta,
            charge: cfg.charge,
            s: 0.0,
            step: 0,
            init_gamma: cfg.gamma,
            init_energy: cfg.energy,
        }
    }

    /// Apply a 6x6 transport matrix to every particle and advance `s`.
    pub fn track(&mut self, r: &Mat6, dl: f64) {
        for i in 0..self.len() {
            let v = [self.x[i], self.xp[i], self.y[i], self.yp[i], self.z[i], self.delta[i]];
            let out = apply(r, &v);
            self.x[i] = out[0];
            self.xp[i] = out[1];
            self.y[i] = out[2];
            self.yp[i] = out[3];
            self.z[i] = out[4];
            self.delta[i] = out[5];
        }
        self.s += dl;
    }

    pub fn mean(field: &[f64]) -> f64 {
        if field.is_empty() {
            return 0.0;
        }
        field.iter().sum::<f64>() / field.len() as f64
    }

    pub fn std(field: &[f64]) -> f64 {
        let m = Self::mean(field);
        if field.is_empty() {
            return 0.0;
        }
        (field.iter().map(|v| (v - m).powi(2)).sum::<f64>() / field.len() as f64).sqrt()
    }

    fn cov(a: &[f64], b: &[f64]) -> f64 {
        let ma = Self::mean(a);
        let mb = Self::mean(b);
        if a.is_empty() {
            return 0.0;
        }
        a.iter().zip(b).map(|(x, y)| (x - ma) * (y - mb)).sum::<f64>() / a.len() as f64
    }

    pub fn mean_x(&self) -> f64 {
        Self::mean(&self.x)
    }
    pub fn sigma_x(&self) -> f64 {
        Self::std(&self.x)
    }
    pub fn sigma_z(&self) -> f64 {
        Self::std(&self.z)
    }
    pub fn sigma_delta(&self) -> f64 {
        Self::std(&self.delta)
    }

    /// Linear fit `x(z) = slope*z + intercept`, least squares. Used for the
    /// de-tilted transform coordinate `x_transform = x - slope*z`.
    pub fn slope_xz(&self) -> f64 {
        let cov = Self::cov(&self.z, &self.x);
        let var_z = Self::cov(&self.z, &self.z);
        if var_z > 0.0 {
            cov / var_z
        } else {
            0.0
        }
    }

    /// De-tilted horizontal coordinates, `x - slope*z`, per spec: the kernel
    /// operates on a beam with its mean shear removed.
    pub fn x_transform(&self) -> Vec<f64> {
        let slope = self.slope_xz();
        self.x.iter().zip(&self.z).map(|(x, z)| x - slope * z).collect()
    }

    /// Geometric emittance and Twiss parameters from the raw second moments
    /// (including dispersion smear).
    pub fn emittance_beta_alpha(&self) -> (f64, f64, f64) {
        let var_x = Self::cov(&self.x, &self.x);
        let var_xp = Self::cov(&self.xp, &self.xp);
        let cov_xxp = Self::cov(&self.x, &self.xp);
        let emit2 = var_x * var_xp - cov_xxp * cov_xxp;
        let emit = emit2.max(0.0).sqrt();
        if emit > 0.0 {
            (emit, var_x / emit, -cov_xxp / emit)
        } else {
            (0.0, 0.0, 0.0)
        }
    }

    /// Dispersion-subtracted emittance and Twiss, following the original's
    /// `stats_minus_dispersion`: subtract `eta*delta` and `eta'*delta` from
    /// the transverse coordinates before computing second moments, where
    /// `(eta, eta') = (R16, R26)` of the cumulative transport matrix `r_tot`.
    pub fn stats_minus_dispersion(&self, r_tot: &Mat6) -> (f64, f64, f64, f64) {
        let eta = r_tot[0][5];
        let etap = r_tot[1][5];
        let x_nodisp: Vec<f64> = self.x.iter().zip(&self.delta).map(|(x, d)| x - eta * d).collect();
        let xp_nodisp: Vec<f64> = self.xp.iter().zip(&self.delta).map(|(xp, d)| xp - etap * d).collect();
        let var_x = Self::cov(&x_nodisp, &x_nodisp);
        let var_xp = Self::cov(&xp_nodisp, &xp_nodisp);
        let cov_xxp = Self::cov(&x_nodisp, &xp_nodisp);
        let emit2 = var_x * var_xp - cov_xxp * cov_xxp;
        let emit = emit2.max(0.0).sqrt();
        // Normalized emittance uses the reference gamma*beta at this step.
        let beta_rel = (1.0 - 1.0 / (self.init_gamma * self.init_gamma)).sqrt();
        let norm_emit = emit * self.init_gamma * beta_rel;
        if emit > 0.0 {
            (emit, norm_emit, var_x / emit, -cov_xxp / emit)
        } else {
            (0.0, 0.0, 0.0, 0.0)
        }
    }

    /// Twiss propagation of the *design* optics (independent of the actual
    /// particle distribution), used to report `betaX`/`alphaX` alongside the
    /// beam-measured values.
    pub fn design_twiss(r_tot: &Mat6, alpha0: f64, beta0: f64) -> (f64, f64) {
        let r2 = [[r_tot[0][0], r_tot[0][1]], [r_tot[1][0], r_tot[1][1]]];
        let (beta, alpha, _gamma) = twiss_propagate(r2, alpha0, beta0);
        (beta, alpha)
    }

    /// Apply a transverse kick `dE/(c dt)` (longitudinal) and `x` kick from
    /// the CSR wake, sampled at each particle's `(x_transform, z)` by
    /// bilinear interpolation over the wake grid; particles outside the
    /// meshed region receive zero kick.
    pub fn apply_wakes(
        &mut self,
        x_grid: &[f64],
        z_grid: &[f64],
        dedct: &[f64],
        x_kick: &[f64],
        nx: usize,
        ds: f64,
    ) {
        let xt = self.x_transform();
        for i in 0..self.len() {
            let (wz, wx) = bilinear(x_grid, z_grid, nx, dedct, xt[i], self.z[i]);
            let (_, wxk) = bilinear(x_grid, z_grid, nx, x_kick, xt[i], self.z[i]);
            let e = self.init_energy * (1.0 + self.delta[i]);
            self.delta[i] += wz * ds / e.max(1e-30);
            self.xp[i] += wxk * ds / e.max(1e-30);
        }
    }
}

fn bilinear(x_grid: &[f64], z_grid: &[f64], nx: usize, field: &[f64], x: f64, z: f64) -> (f64, f64) {
    if x_grid.len() < 2 || z_grid.len() < 2 {
        return (0.0, 0.0);
    }
    let x0 = x_grid[0];
    let x1 = *x_grid.last().unwrap();
    let z0 = z_grid[0];
    let z1 = *z_grid.last().unwrap();
    if x < x0 || x > x1 || z < z0 || z > z1 {
        return (0.0, 0.0);
    }
    let nxg = x_grid.len();
    let nzg = z_grid.len();
    let fx = (x - x0) / (x1 - x0) * (nxg as f64 - 1.0);
    let fz = (z - z0) / (z1 - z0) * (nzg as f64 - 1.0);
    let ix = (fx.floor() as usize).min(nxg - 2);
    let iz = (fz.floor() as usize).min(nzg - 2);
    let tx = fx - ix as f64;
    let tz = fz - iz as f64;
    let idx = |ix: usize, iz: usize| -> usize { ix * nx + iz };
    let v00 = field[idx(ix, iz)];
    let v10 = field[idx(ix + 1, iz)];
    let v01 = field[idx(ix, iz + 1)];
    let v11 = field[idx(ix + 1, iz + 1)];
    let v0 = v00 * (1.0 - tx) + v10 * tx;
    let v1 = v01 * (1.0 - tx) + v11 * tx;
    let v = v0 * (1.0 - tz) + v1 * tz;
    (v, v)
}

fn quiet_grid(n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![0.0];
    }
    (0..n).map(|i| -1.0 + 2.0 * (i as f64) / (n as f64 - 1.0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::identity;

    fn test_cfg() -> InputBeam {
        InputBeam {
            charge: 1.0e-9,
            energy: 1.0,
            gamma: 1000.0,
            emittance_x: 1.0e-9,
            beta_x: 1.0,
            alpha_x: 0.0,
            sigma_x: 3.0e-5,
            sigma_z: 5.0e-5,
            sigma_delta: 1.0e-3,
            n_particles: 125,
            xz_correlation: 0.0,
        }
    }

    #[test]
    fn from_config_produces_zero_mean_distribution() {
        let beam = Beam::from_config(&test_cfg());
        assert!(!beam.is_empty());
        assert!(beam.mean_x().abs() < 1e-9);
    }

    #[test]
    fn tracking_through_identity_is_a_no_op() {
        let mut beam = Beam::from_config(&test_cfg());
        let before = beam.x.clone();
        beam.track(&identity(), 1.0);
        assert_eq!(beam.x, before);
        assert!((beam.s - 1.0).abs() < 1e-12);
    }

    #[test]
    fn dispersion_subtraction_removes_correlated_delta_term() {
        let mut beam = Beam::from_config(&test_cfg());
        let mut r = identity();
        r[0][5] = 2.0;
        for i in 0..beam.len() {
            beam.x[i] += 2.0 * beam.delta[i];
        }
        let (emit_with, _, _, _) = beam.stats_minus_dispersion(&r);
        let (emit_raw, _, _) = beam.emittance_beta_alpha();
        assert!(emit_with <= emit_raw + 1e-12);
    }
}
