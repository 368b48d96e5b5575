// dfcsr - A 2-D coherent synchrotron radiation wake engine
// Derived from sir_ddft (Copyright (C) 2021 Julian Jeggle, Raphael Wittkowski),
// licensed under the GNU Affero General Public License v3 or later.

//! Retarded CSR kernel (C5, part one). Assembles the longitudinal and
//! transverse integrand of the 2-D Jefimenko-type wake integral at a single
//! `(source xp, source sp)` point, given the field point `(s, x)` and
//! observer time `t`.

use crate::history::{DensityHistory, HistoryField};
use crate::lattice::Lattice;

pub struct CsrIntegrandPoint {
    pub z: f64,
    pub x: f64,
}

/// Evaluate the CSR integrand at one `(xp, sp)` source point.
///
/// `vx_field` is the (non-retarded) transverse velocity of the distribution
/// at the field point itself, `vx(t, x, s - t)`. The longitudinal velocity
/// field is held at `vs = 1` (ultra-relativistic, co-moving coordinate
/// already factors out the reference speed) and its time derivative at the
/// source is held at `0`: a more accurate longitudinal-velocity model is a
/// known simplification, not a bug, matching the reference implementation.
#[allow(clippy::too_many_arguments)]
pub fn csr_integrand(
    lattice: &Lattice,
    history: &DensityHistory,
    s: f64,
    x: f64,
    t: f64,
    vx_field: f64,
    xp: f64,
    sp: f64,
) -> CsrIntegrandPoint {
    let (x0_s, y0_s) = lattice.reference_point(s);
    let (x0_sp, y0_sp) = lattice.reference_point(sp);
    let n_s = lattice.n(s);
    let n_sp = lattice.n(sp);
    let tau_s = lattice.tau(s);
    let tau_sp = lattice.tau(sp);

    let rx = x0_s - x0_sp + x * n_s.x - xp * n_sp.x;
    let ry = y0_s - y0_sp + x * n_s.y - xp * n_sp.y;
    let r = (rx * rx + ry * ry).sqrt();
    if r <= 0.0 {
        return CsrIntegrandPoint { z: 0.0, x: 0.0 };
    }

    let rho_sp = lattice.rho_at(sp);
    let t_ret = t - r;
    let zeta_ret = sp - t_ret;

    let density_ret = history.query(HistoryField::Rho, t_ret, xp, zeta_ret);
    let density_x_ret = history.query(HistoryField::RhoX, t_ret, xp, zeta_ret);
    let density_z_ret = history.query(HistoryField::RhoZ, t_ret, xp, zeta_ret);
    let vx_ret = history.query(HistoryField::Vx, t_ret, xp, zeta_ret);
    let vx_x_ret = history.query(HistoryField::VxX, t_ret, xp, zeta_ret);

    let vs_ret = 1.0;
    let vs_s_ret = 0.0;

    let scale_term = 1.0 + xp * rho_sp;

    let velocity_ret_x = vs_ret * tau_sp.x + vx_ret * n_sp.x;
    let velocity_ret_y = vs_ret * tau_sp.y + vx_ret * n_sp.y;

    let n_sp_dot_tau_s = n_sp.x * tau_s.x + n_sp.y * tau_s.y;
    let n_s_dot_tau_sp = n_s.x * tau_sp.x + n_s.y * tau_sp.y;
    let tau_sp_dot_tau_s = tau_sp.x * tau_s.x + tau_sp.y * tau_s.y;

    let nabla_density_ret_x = density_x_ret * n_sp.x + density_z_ret / scale_term * tau_sp.x;
    let nabla_density_ret_y = density_x_ret * n_sp.y + density_z_ret / scale_term * tau_sp.y;

    let div_velocity = vs_s_ret + vx_x_ret;

    let numerator1 = scale_term
        * ((n_sp_dot_tau_s + (vx_field - vx_ret) * tau_sp_dot_tau_s) * density_x_ret
            - vx_ret * n_sp_dot_tau_s / scale_term * density_z_ret);

    let numerator2 = -(tau_sp_dot_tau_s + (vx_field - vx_ret) * n_s_dot_tau_sp) * density_ret * vx_x_ret;

    // numerator3 (the dv/dt coupling term) vanishes identically because the
    // longitudinal velocity field above is held static.
    let csr_integrand_z = numerator1 / r + numerator2 / r;

    let n_minus_np_x = n_s.x - n_sp.x;
    let n_minus_np_y = n_s.y - n_sp.y;
    let part1 = rx * n_minus_np_x + ry * n_minus_np_y;
    let part2 = n_s_dot_tau_sp;

    let partial_density =
        -(velocity_ret_x * nabla_density_ret_x + velocity_ret_y * nabla_density_ret_y) - density_ret * div_velocity;

    let w1 = scale_term * part1 / (r * r * r) * density_ret;
    let w2 = scale_term * part1 / (r * r) * partial_density;
    let w3 = -scale_term * part2 / r * partial_density;

    CsrIntegrandPoint { z: csr_integrand_z, x: w1 + w2 + w3 }
}
