// dfcsr - A 2-D coherent synchrotron radiation wake engine
// Derived from sir_ddft (Copyright (C) 2021 Julian Jeggle, Raphael Wittkowski),
// licensed under the GNU Affero General Public License v3 or later.

//! Rolling density/velocity history (C3). At each step the current beam is
//! deposited onto a fresh `(x, zeta)` slice (`zeta = z - t`, the co-moving
//! coordinate) and appended to a bounded-length history; older slices that
//! fall outside the longest formation length still in use are dropped.
//! Queries interpolate trilinearly in `(t, x, zeta)`.

use crate::deposition::{DepositionKernel, Field2D};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryField {
    Rho,
    RhoX,
    RhoZ,
    Vx,
    VxX,
}

/// One time-stamped snapshot of the co-moving density and mean-velocity
/// fields, plus their spatial derivatives used by the CSR kernel.
pub struct DensitySlice {
    pub t: f64,
    pub formation_length: f64,
    pub rho: Field2D,
    pub rho_x: Field2D,
    pub rho_z: Field2D,
    pub vx: Field2D,
    pub vx_x: Field2D,
}

impl DensitySlice {
    fn field(&self, which: HistoryField) -> &Field2D {
        match which {
            HistoryField::Rho => &self.rho,
            HistoryField::RhoX => &self.rho_x,
            HistoryField::RhoZ => &self.rho_z,
            HistoryField::Vx => &self.vx,
            HistoryField::VxX => &self.vx_x,
        }
    }
}

pub struct DensityHistory {
    pub slices: Vec<DensitySlice>,
}

impl DensityHistory {
    pub fn new() -> DensityHistory {
        DensityHistory { slices: Vec::new() }
    }

    /// Deposit the current ensemble of `(x, z, xp)` samples at time `t` onto
    /// a new grid of `nx * nz` cells spanning `[x_min,x_max] x [z_min,z_max]`
    /// and append it to the history, along with its spatial derivatives.
    /// `formation_length` bounds how far back in `t` this slice (and future
    /// ones) can be queried before being evicted; the first slice of a run
    /// carries `formation_length = f64::INFINITY` since no wake has been
    /// computed yet.
    #[allow(clippy::too_many_arguments)]
    pub fn deposit(
        &mut self,
        kernel: &dyn DepositionKernel,
        x: &[f64],
        z: &[f64],
        xp: &[f64],
        weight: f64,
        t: f64,
        formation_length: f64,
        nx: usize,
        nz: usize,
        x_min: f64,
        x_max: f64,
        z_min: f64,
        z_max: f64,
    ) {
        let mut rho = Field2D::zeros(nx, nz, x_min, x_max, z_min, z_max);
        let mut vx_sum = Field2D::zeros(nx, nz, x_min, x_max, z_min, z_max);
        for i in 0..x.len() {
            kernel.deposit(&mut rho, x[i], z[i], weight);
            kernel.deposit(&mut vx_sum, x[i], z[i], weight * xp[i]);
        }
        let cell_area = rho.dx() * rho.dz();
        let mut vx = Field2D::zeros(nx, nz, x_min, x_max, z_min, z_max);
        for i in 0..rho.data.len() {
            vx.data[i] = if rho.data[i] > 0.0 { vx_sum.data[i] / rho.data[i] } else { 0.0 };
            rho.data[i] /= cell_area.max(f64::MIN_POSITIVE);
        }
        let rho_x = central_diff_x(&rho);
        let rho_z = central_diff_z(&rho);
        let vx_x = central_diff_x(&vx);
        self.append(DensitySlice { t, formation_length, rho, rho_x, rho_z, vx, vx_x });
    }

    pub fn append(&mut self, slice: DensitySlice) {
        self.slices.push(slice);
        self.evict_stale();
    }

    /// Drop slices older than the largest formation length currently tracked
    /// by any remaining slice, keeping the history bounded without capping
    /// it at a fixed slice count (the needed depth depends on how long the
    /// bend has been active).
    fn evict_stale(&mut self) {
        if self.slices.is_empty() {
            return;
        }
        let t_now = self.slices.last().unwrap().t;
        let horizon = self
            .slices
            .iter()
            .map(|s| s.formation_length)
            .fold(0.0_f64, |a, b| if b.is_finite() { a.max(b) } else { a });
        if horizon <= 0.0 {
            return;
        }
        self.slices.retain(|s| t_now - s.t <= horizon * 1.01);
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Trilinear interpolation in `(t, x, zeta)`. `zeta = z - t` converts the
    /// slice's lab-frame `z` axis into the co-moving coordinate at query
    /// time. Returns 0 outside the time support of the stored slices (beyond
    /// half a step past the first or last one) or outside a bracketing
    /// slice's spatial grid, same as `Field2D::sample` does spatially; this
    /// is load-bearing for the retarded integrand, whose source time walks
    /// back past the start of the recorded history.
    pub fn query(&self, which: HistoryField, t: f64, x: f64, zeta: f64) -> f64 {
        if self.slices.is_empty() {
            return 0.0;
        }
        if self.slices.len() == 1 {
            let s = &self.slices[0];
            if (t - s.t).abs() > 1e-9 {
                return 0.0;
            }
            return s.field(which).sample(x, zeta + s.t);
        }
        let first = &self.slices[0];
        let last = self.slices.last().unwrap();
        let half_dt_lo = 0.5 * (self.slices[1].t - first.t).abs();
        let half_dt_hi = 0.5 * (last.t - self.slices[self.slices.len() - 2].t).abs();
        if t < first.t - half_dt_lo || t > last.t + half_dt_hi {
            return 0.0;
        }
        match self.slices.binary_search_by(|s| s.t.partial_cmp(&t).unwrap()) {
            Ok(i) => {
                let s = &self.slices[i];
                s.field(which).sample(x, zeta + s.t)
            }
            Err(0) => first.field(which).sample(x, zeta + first.t),
            Err(i) if i >= self.slices.len() => last.field(which).sample(x, zeta + last.t),
            Err(i) => {
                let s0 = &self.slices[i - 1];
                let s1 = &self.slices[i];
                let frac = if s1.t > s0.t { (t - s0.t) / (s1.t - s0.t) } else { 0.0 };
                let v0 = s0.field(which).sample(x, zeta + s0.t);
                let v1 = s1.field(which).sample(x, zeta + s1.t);
                v0 * (1.0 - frac) + v1 * frac
            }
        }
    }
}

impl Default for DensityHistory {
    fn default() -> Self {
        Self::new()
    }
}

fn central_diff_x(field: &Field2D) -> Field2D {
    let mut out = Field2D::zeros(field.nx, field.nz, field.x_min, field.x_max, field.z_min, field.z_max);
    let dx = field.dx();
    if field.nx < 2 || dx == 0.0 {
        return out;
    }
    for ix in 0..field.nx {
        for iz in 0..field.nz {
            let lo = ix.saturating_sub(1);
            let hi = (ix + 1).min(field.nx - 1);
            let denom = (hi - lo) as f64 * dx;
            let d = if denom > 0.0 {
                (field.get(hi, iz) - field.get(lo, iz)) / denom
            } else {
                0.0
            };
            let i = out.idx(ix, iz);
            out.data[i] = d;
        }
    }
    out
}

fn central_diff_z(field: &Field2D) -> Field2D {
    let mut out = Field2D::zeros(field.nx, field.nz, field.x_min, field.x_max, field.z_min, field.z_max);
    let dz = field.dz();
    if field.nz < 2 || dz == 0.0 {
        return out;
    }
    for ix in 0..field.nx {
        for iz in 0..field.nz {
            let lo = iz.saturating_sub(1);
            let hi = (iz + 1).min(field.nz - 1);
            let denom = (hi - lo) as f64 * dz;
            let d = if denom > 0.0 {
                (field.get(ix, hi) - field.get(ix, lo)) / denom
            } else {
                0.0
            };
            let i = out.idx(ix, iz);
            out.data[i] = d;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deposition::CloudInCell;

    #[test]
    fn deposit_then_query_recovers_density_at_particle_location() {
        let mut hist = DensityHistory::new();
        let x = vec![0.0; 200];
        let z: Vec<f64> = (0..200).map(|i| -1.0 + 2.0 * i as f64 / 199.0).collect();
        let xp = vec![0.0; 200];
        hist.deposit(&CloudInCell, &x, &z, &xp, 1.0, 0.0, f64::INFINITY, 16, 32, -1.0, 1.0, -1.0, 1.0);
        let v = hist.query(HistoryField::Rho, 0.0, 0.0, 0.0);
        assert!(v > 0.0);
    }

    #[test]
    fn query_outside_time_range_returns_zero() {
        let mut hist = DensityHistory::new();
        hist.deposit(&CloudInCell, &[0.0], &[0.0], &[0.0], 1.0, 0.0, f64::INFINITY, 4, 4, -1.0, 1.0, -1.0, 1.0);
        hist.deposit(&CloudInCell, &[0.0], &[0.0], &[0.0], 1.0, 1.0, 2.0, 4, 4, -1.0, 1.0, -1.0, 1.0);
        let v = hist.query(HistoryField::Rho, 5.0, 0.0, 0.0);
        assert_eq!(v, 0.0);
        let v_before = hist.query(HistoryField::Rho, -5.0, 0.0, 0.0);
        assert_eq!(v_before, 0.0);
    }

    #[test]
    fn stale_slices_are_evicted_once_formation_length_passes() {
        let mut hist = DensityHistory::new();
        hist.deposit(&CloudInCell, &[0.0], &[0.0], &[0.0], 1.0, 0.0, 1.0, 4, 4, -1.0, 1.0, -1.0, 1.0);
        hist.deposit(&CloudInCell, &[0.0], &[0.0], &[0.0], 1.0, 5.0, 1.0, 4, 4, -1.0, 1.0, -1.0, 1.0);
        assert_eq!(hist.slices.len(), 1);
    }
}
