// dfcsr - A 2-D coherent synchrotron radiation wake engine
// Derived from sir_ddft (Copyright (C) 2021 Julian Jeggle, Raphael Wittkowski),
// licensed under the GNU Affero General Public License v3 or later.

//! Light-cone source localization (C4). For a field point `(s, x)` at
//! observer time `t` and a trial retarded arc-length `sp`, the two roots of
//! a quadratic in the source's transverse offset `xp` give the transverse
//! coordinates at which a source on the reference trajectory at `sp` could
//! have emitted a signal reaching the field point at exactly `t`. Scanning
//! `sp` and keeping only points whose roots fall inside the beam brackets
//! the 2-D source region the CSR integral needs to cover.

use crate::lattice::Lattice;

/// Coefficients of the light-cone quadratic `a*xp^2 + b*xp + c = 0` in the
/// solved-for form `xp = (b_half/a) +/- (k^2/a)*sqrt(inner)`, matching the
/// closed-form root extraction used for every field-point/retarded-arc-length
/// pair.
pub struct LightConeQuadratic {
    /// `k^2 - 1`, where `k` is the local beam shear slope `dx/dz` at `sp`.
    pub a: f64,
    pub k: f64,
    pub n_sp_dot_q: f64,
    pub dt: f64,
    pub q2: f64,
}

impl LightConeQuadratic {
    /// Returns `(xp1, xp2)`, the two transverse-offset roots, or `None` if
    /// the light cone does not intersect the reference trajectory at `sp`
    /// for this field point (negative discriminant) or the bracket is
    /// degenerate (`a == 0`, i.e. the beam-shear slope has unit magnitude).
    pub fn roots(&self) -> Option<(f64, f64)> {
        if self.a.abs() < 1e-12 {
            return None;
        }
        let k2 = self.k * self.k;
        let term1 = (self.n_sp_dot_q * k2 + self.dt * self.k) / self.a;
        let inner = self.a * (self.dt * self.dt - self.q2) + (self.n_sp_dot_q * self.k + self.dt).powi(2);
        if inner < 0.0 {
            return None;
        }
        let term2 = k2 / self.a * inner.sqrt();
        Some((term1 + term2, term1 - term2))
    }
}

/// Build the light-cone quadratic for field point `(s, x)` observed at time
/// `t`, against a candidate retarded arc-length `sp`. `slope_at(sp)` gives
/// the local beam-shear slope used to convert the reference-orbit normal
/// direction into the actual transverse coordinate.
pub fn build_quadratic(
    lattice: &Lattice,
    slope_at: impl Fn(f64) -> f64,
    x: f64,
    s: f64,
    t: f64,
    sp: f64,
) -> LightConeQuadratic {
    let (x0_s, y0_s) = lattice.reference_point(s);
    let (x0_sp, y0_sp) = lattice.reference_point(sp);
    let n_s = lattice.n(s);
    let n_sp = lattice.n(sp);
    let k = slope_at(sp);

    let qx = x * n_s.x + x0_s - x0_sp;
    let qy = x * n_s.y + y0_s - y0_sp;
    let q2 = qx * qx + qy * qy;
    let n_sp_dot_q = n_sp.x * qx + n_sp.y * qy;

    LightConeQuadratic { a: k * k - 1.0, k, n_sp_dot_q, dt: t - sp, q2 }
}

/// Localize the transverse source roots for a batch of candidate retarded
/// arc-lengths, skipping (as `None`) any `sp` whose light cone does not
/// reach the field point.
pub fn localize_batch(
    lattice: &Lattice,
    slope_at: impl Fn(f64) -> f64,
    x: f64,
    s: f64,
    t: f64,
    sp: &[f64],
) -> Vec<Option<(f64, f64)>> {
    sp.iter()
        .map(|&spi| build_quadratic(lattice, &slope_at, x, s, t, spi).roots())
        .collect()
}

/// Axis-aligned bracket `(smin, smax, xmin, xmax)` for the main integration
/// panel. A wide scan of `sp` over `[max(s - 100*sigma_z, 0), s +
/// 100*sigma_z]` determines where the light cone's transverse roots stay
/// within `5*sigma_x` of the field point; if every scanned point is valid
/// the trajectory is locally straight and untilted, so a fixed default box
/// is used instead of the (numerically noisier) bounding box of the scan.
pub fn bracket_main_panel(
    lattice: &Lattice,
    slope_at: impl Fn(f64) -> f64,
    x: f64,
    s: f64,
    t: f64,
    sigma_x: f64,
    sigma_z: f64,
    n_scan: usize,
) -> (f64, f64, f64, f64) {
    let lo = (s - 100.0 * sigma_z).max(0.0);
    let hi = s + 100.0 * sigma_z;
    let sp: Vec<f64> = linspace(lo, hi, n_scan);
    let roots = localize_batch(lattice, &slope_at, x, s, t, &sp);

    let mut valid_sp = Vec::new();
    let mut valid_xp = Vec::new();
    let mut n_valid = 0usize;
    for (spi, r) in sp.iter().zip(&roots) {
        if let Some((xp1, xp2)) = r {
            if xp1.abs() < 5.0 * sigma_x && xp2.abs() < 5.0 * sigma_x {
                n_valid += 1;
                valid_sp.push(*spi);
                valid_xp.push(*xp1);
                valid_xp.push(*xp2);
            }
        }
    }

    if n_valid == sp.len() {
        (s - 5.0 * sigma_z, s + 5.0 * sigma_z, x - 5.0 * sigma_x, x + 5.0 * sigma_x)
    } else if valid_sp.is_empty() {
        // No light-cone intersection anywhere in the scan: fall back to the
        // default box rather than returning an empty/ill-defined bracket.
        (s - 5.0 * sigma_z, s + 5.0 * sigma_z, x - 5.0 * sigma_x, x + 5.0 * sigma_x)
    } else {
        let smin = valid_sp.iter().cloned().fold(f64::INFINITY, f64::min);
        let smax = valid_sp.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let xmin = valid_xp.iter().cloned().fold(f64::INFINITY, f64::min);
        let xmax = valid_xp.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        (smin, smax, xmin, xmax)
    }
}

/// Bracket `(xL, xR)` for the second, upstream panel spanning one formation
/// length before the main panel's lower edge. Only the `xp1` root is used,
/// padded by `3*sigma_x` on each side.
pub fn bracket_upstream_panel(
    lattice: &Lattice,
    slope_at: impl Fn(f64) -> f64,
    x: f64,
    s: f64,
    t: f64,
    smin: f64,
    formation_length: f64,
    sigma_x: f64,
    n_scan: usize,
) -> (f64, f64, f64, f64) {
    let lo = (smin - formation_length).max(0.0);
    let sp: Vec<f64> = linspace(lo, smin, n_scan);
    let roots = localize_batch(lattice, &slope_at, x, s, t, &sp);
    let xp1: Vec<f64> = roots.iter().filter_map(|r| r.map(|(a, _)| a)).collect();
    if xp1.is_empty() {
        return (lo, smin, x - 5.0 * sigma_x, x + 5.0 * sigma_x);
    }
    let xl = xp1.iter().cloned().fold(f64::INFINITY, f64::min) - 3.0 * sigma_x;
    let xr = xp1.iter().cloned().fold(f64::NEG_INFINITY, f64::max) + 3.0 * sigma_x;
    (lo, smin, xl, xr)
}

pub fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![lo];
    }
    (0..n).map(|i| lo + (hi - lo) * i as f64 / (n - 1) as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LatticeElementConfig;

    fn straight_lattice() -> Lattice {
        Lattice::build(&[LatticeElementConfig::Drift { l: 10.0, steps: 1, nsep: 1 }]).unwrap()
    }

    #[test]
    fn on_axis_straight_trajectory_has_real_roots_near_causal_point() {
        let lat = straight_lattice();
        let q = build_quadratic(&lat, |_| 0.0, 0.0, 5.0, 5.0, 4.0);
        let roots = q.roots();
        assert!(roots.is_some());
    }

    #[test]
    fn main_panel_falls_back_to_default_box_on_straight_trajectory() {
        let lat = straight_lattice();
        let (smin, smax, xmin, xmax) = bracket_main_panel(&lat, |_| 0.0, 0.0, 5.0, 5.0, 1e-4, 1e-4, 200);
        assert!(smax > smin);
        assert!(xmax > xmin);
    }

    #[test]
    fn upstream_panel_clamps_lower_edge_at_zero() {
        let lat = straight_lattice();
        let (lo, hi, _, _) = bracket_upstream_panel(&lat, |_| 0.0, 0.0, 0.5, 0.5, 0.2, 10.0, 1e-4, 50);
        assert_eq!(lo, 0.0);
        assert_eq!(hi, 0.2);
    }
}
