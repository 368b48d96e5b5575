// dfcsr - A 2-D coherent synchrotron radiation wake engine
// Derived from sir_ddft (Copyright (C) 2021 Julian Jeggle, Raphael Wittkowski),
// licensed under the GNU Affero General Public License v3 or later.

//! Particle-to-grid deposition (a narrow collaborator of C3). The density
//! history only needs "particles in, a density/velocity field out"; the
//! actual weighting scheme is pulled behind a trait so the default
//! cloud-in-cell scheme can later be swapped for a higher-order kernel
//! without touching the history ring buffer.

/// A flat row-major 2-D grid over `(x, z)`, indexed `[ix * nz + iz]`. Plain
/// `Vec<f64>` with manual indexing, matching the rest of the crate's field
/// types rather than pulling in a dense-array crate.
#[derive(Debug, Clone)]
pub struct Field2D {
    pub nx: usize,
    pub nz: usize,
    pub x_min: f64,
    pub x_max: f64,
    pub z_min: f64,
    pub z_max: f64,
    pub data: Vec<f64>,
}

impl Field2D {
    pub fn zeros(nx: usize, nz: usize, x_min: f64, x_max: f64, z_min: f64, z_max: f64) -> Field2D {
        Field2D {
            nx,
            nz,
            x_min,
            x_max,
            z_min,
            z_max,
            data: vec![0.0; nx * nz],
        }
    }

    #[inline(always)]
    pub fn idx(&self, ix: usize, iz: usize) -> usize {
        ix * self.nz + iz
    }

    #[inline(always)]
    pub fn get(&self, ix: usize, iz: usize) -> f64 {
        self.data[self.idx(ix, iz)]
    }

    #[inline(always)]
    pub fn add(&mut self, ix: usize, iz: usize, v: f64) {
        let i = self.idx(ix, iz);
        self.data[i] += v;
    }

    pub fn dx(&self) -> f64 {
        if self.nx > 1 {
            (self.x_max - self.x_min) / (self.nx - 1) as f64
        } else {
            1.0
        }
    }

    pub fn dz(&self) -> f64 {
        if self.nz > 1 {
            (self.z_max - self.z_min) / (self.nz - 1) as f64
        } else {
            1.0
        }
    }

    pub fn x_coord(&self, ix: usize) -> f64 {
        self.x_min + ix as f64 * self.dx()
    }

    pub fn z_coord(&self, iz: usize) -> f64 {
        self.z_min + iz as f64 * self.dz()
    }

    /// Bilinear sample of the grid; returns 0 outside the grid's support.
    pub fn sample(&self, x: f64, z: f64) -> f64 {
        if x < self.x_min || x > self.x_max || z < self.z_min || z > self.z_max {
            return 0.0;
        }
        let fx = (x - self.x_min) / self.dx();
        let fz = (z - self.z_min) / self.dz();
        let ix = (fx.floor() as usize).min(self.nx.saturating_sub(2));
        let iz = (fz.floor() as usize).min(self.nz.saturating_sub(2));
        let tx = (fx - ix as f64).clamp(0.0, 1.0);
        let tz = (fz - iz as f64).clamp(0.0, 1.0);
        let v00 = self.get(ix, iz);
        let v10 = self.get((ix + 1).min(self.nx - 1), iz);
        let v01 = self.get(ix, (iz + 1).min(self.nz - 1));
        let v11 = self.get((ix + 1).min(self.nx - 1), (iz + 1).min(self.nz - 1));
        let v0 = v00 * (1.0 - tx) + v10 * tx;
        let v1 = v01 * (1.0 - tx) + v11 * tx;
        v0 * (1.0 - tz) + v1 * tz
    }
}

/// A particle-to-grid weighting scheme.
pub trait DepositionKernel {
    /// Deposit unit weight for a particle at `(x, z)` onto `field`, scaled by
    /// `weight`.
    fn deposit(&self, field: &mut Field2D, x: f64, z: f64, weight: f64);
}

/// Standard cloud-in-cell (bilinear) deposition: each particle splits its
/// weight among the four surrounding grid nodes in proportion to area.
pub struct CloudInCell;

impl DepositionKernel for CloudInCell {
    fn deposit(&self, field: &mut Field2D, x: f64, z: f64, weight: f64) {
        if x < field.x_min || x > field.x_max || z < field.z_min || z > field.z_max {
            return;
        }
        let dx = field.dx();
        let dz = field.dz();
        let fx = (x - field.x_min) / dx;
        let fz = (z - field.z_min) / dz;
        let ix = (fx.floor() as usize).min(field.nx.saturating_sub(2));
        let iz = (fz.floor() as usize).min(field.nz.saturating_sub(2));
        let tx = (fx - ix as f64).clamp(0.0, 1.0);
        let tz = (fz - iz as f64).clamp(0.0, 1.0);
        field.add(ix, iz, weight * (1.0 - tx) * (1.0 - tz));
        field.add(ix + 1, iz, weight * tx * (1.0 - tz));
        field.add(ix, iz + 1, weight * (1.0 - tx) * tz);
        field.add(ix + 1, iz + 1, weight * tx * tz);
    }
}
