// dfcsr - A 2-D coherent synchrotron radiation wake engine
// Derived from sir_ddft (Copyright (C) 2021 Julian Jeggle, Raphael Wittkowski),
// licensed under the GNU Affero General Public License v3 or later.

//! Collaborator contract described in spec §6: "From the transport layer:
//! 6x6 linear maps for `(L, angle, k1, E1, E2)` and the Twiss propagator
//! `R -> (beta, alpha)`". This module provides the concrete, standard
//! linear-optics maps that satisfy that contract; it is not itself part of
//! the CSR kernel (C1-C7) and carries no CSR-specific logic.

use crate::errors::DfcsrError;

/// A 6x6 linear transport matrix over (x, x', y, y', z, delta).
pub type Mat6 = [[f64; 6]; 6];

pub fn identity() -> Mat6 {
    let mut m = [[0.0; 6]; 6];
    for i in 0..6 {
        m[i][i] = 1.0;
    }
    m
}

pub fn apply(m: &Mat6, v: &[f64; 6]) -> [f64; 6] {
    let mut out = [0.0; 6];
    for i in 0..6 {
        let mut acc = 0.0;
        for j in 0..6 {
            acc += m[i][j] * v[j];
        }
        out[i] = acc;
    }
    out
}

/// Left-multiply: returns `a * b`, i.e. applying the result to a vector is
/// the same as applying `b` then `a`. Used to accumulate the cumulative
/// transport matrix `R_tot` step by step (`R_tot <- R_step * R_tot`).
pub fn mul(a: &Mat6, b: &Mat6) -> Mat6 {
    let mut out = [[0.0; 6]; 6];
    for i in 0..6 {
        for j in 0..6 {
            let mut acc = 0.0;
            for k in 0..6 {
                acc += a[i][k] * b[k][j];
            }
            out[i][j] = acc;
        }
    }
    out
}

/// A drift of length `l`: straight-line propagation, no focusing.
pub fn drift(l: f64) -> Mat6 {
    let mut m = identity();
    m[0][1] = l;
    m[2][3] = l;
    m
}

/// A quadrupole of length `l` and normalized gradient `k1` (focusing in x
/// for `k1 > 0`, defocusing in y).
pub fn quad(l: f64, k1: f64) -> Result<Mat6, DfcsrError> {
    if !l.is_finite() || !k1.is_finite() {
        return Err(DfcsrError::Geometry("non-finite quadrupole parameters".into()));
    }
    let mut m = identity();
    focusing_block(&mut m, 0, 1, l, k1);
    focusing_block(&mut m, 2, 3, l, -k1);
    Ok(m)
}

fn focusing_block(m: &mut Mat6, i: usize, ip: usize, l: f64, k: f64) {
    if k > 0.0 {
        let w = k.sqrt();
        let (s, c) = (w * l).sin_cos();
        m[i][i] = c;
        m[i][ip] = s / w;
        m[ip][i] = -w * s;
        m[ip][ip] = c;
    } else if k < 0.0 {
        let w = (-k).sqrt();
        let (s, c) = (w * l).sinh_cosh();
        m[i][i] = c;
        m[i][ip] = s / w;
        m[ip][i] = w * s;
        m[ip][ip] = c;
    } else {
        m[i][ip] = l;
    }
}

trait SinhCosh {
    fn sinh_cosh(self) -> (f64, f64);
}
impl SinhCosh for f64 {
    #[inline(always)]
    fn sinh_cosh(self) -> (f64, f64) {
        (self.sinh(), self.cosh())
    }
}

/// A sector dipole of length `l`, bend angle `angle` (so curvature `rho =
/// angle / l`), with edge-focusing angles `e1` (entrance) and `e2` (exit).
/// Per spec §4.6, `E1` acts only on the first sub-step of an element and
/// `E2` only on the last; callers pass `0.0` for the edge that does not
/// apply to a given sub-step.
pub fn dipole(l: f64, angle: f64, e1: f64, e2: f64) -> Result<Mat6, DfcsrError> {
    if angle == 0.0 {
        return Err(DfcsrError::Geometry("dipole with zero bend angle".into()));
    }
    if !l.is_finite() || !angle.is_finite() {
        return Err(DfcsrError::Geometry("non-finite dipole parameters".into()));
    }
    let rho = l / angle;
    let k = 1.0 / (rho * rho);
    let mut m = identity();
    // Horizontal plane: combined-function bend with weak focusing 1/rho^2.
    let w = k.sqrt();
    let (s, c) = (w * l).sin_cos();
    m[0][0] = c;
    m[0][1] = s / w;
    m[0][5] = (1.0 - c) / (rho * w * w);
    m[1][0] = -w * s;
    m[1][1] = c;
    m[1][5] = s / rho / w;
    m[4][0] = -s / rho / w;
    m[4][1] = -(1.0 - c) / (rho * w * w);
    m[4][5] = -(l - rho * s);
    m[4][4] = 1.0;
    // Vertical plane is field-free for a pure sector bend.
    m[2][3] = l;
    // Edge focusing: thin kick tan(e)/rho on x' and -tan(e)/rho on y'.
    apply_edge(&mut m, rho, e1, true);
    apply_edge(&mut m, rho, e2, false);
    Ok(m)
}

fn apply_edge(m: &mut Mat6, rho: f64, edge_angle: f64, entrance: bool) {
    if edge_angle == 0.0 {
        return;
    }
    let k_edge = edge_angle.tan() / rho;
    let edge = {
        let mut e = identity();
        e[1][0] = k_edge;
        e[3][2] = -k_edge;
        e
    };
    *m = if entrance { mul(m, &edge) } else { mul(&edge, m) };
}

/// Propagate Twiss parameters `(beta, alpha)` through the 2x2 block `r`
/// (rows/cols 0,1 of the cumulative transport matrix), matching the
/// original's `twiss_R(R, alpha0, beta0)`.
pub fn twiss_propagate(r: [[f64; 2]; 2], alpha0: f64, beta0: f64) -> (f64, f64, f64) {
    let gamma0 = (1.0 + alpha0 * alpha0) / beta0;
    let r11 = r[0][0];
    let r12 = r[0][1];
    let r21 = r[1][0];
    let r22 = r[1][1];
    let beta = r11 * r11 * beta0 - 2.0 * r11 * r12 * alpha0 + r12 * r12 * gamma0;
    let alpha = -r11 * r21 * beta0 + (r11 * r22 + r12 * r21) * alpha0 - r12 * r22 * gamma0;
    let gamma = r21 * r21 * beta0 - 2.0 * r21 * r22 * alpha0 + r22 * r22 * gamma0;
    (beta, alpha, gamma)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drift_is_symplectic_in_transverse_planes() {
        let m = drift(2.0);
        assert_eq!(m[0][1], 2.0);
        assert_eq!(m[2][3], 2.0);
        assert_eq!(m[0][0], 1.0);
    }

    #[test]
    fn dipole_rejects_zero_angle() {
        assert!(dipole(1.0, 0.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn mat6_mul_with_identity_is_identity() {
        let d = drift(1.5);
        let i = identity();
        let out = mul(&d, &i);
        for r in 0..6 {
            for c in 0..6 {
                assert!((out[r][c] - d[r][c]).abs() < 1e-12);
            }
        }
    }
}
