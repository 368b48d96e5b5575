// dfcsr - A 2-D coherent synchrotron radiation wake engine
// Derived from sir_ddft (Copyright (C) 2021 Julian Jeggle, Raphael Wittkowski),
// licensed under the GNU Affero General Public License v3 or later.

//! HDF5 output (C9). Three files per run — particles, wakes, statistics —
//! each opened lazily on first write and truncated if a stale file from a
//! previous run of the same name is found. Only the root rank writes.

use std::path::{Path, PathBuf};

use crate::beam::Beam;
use crate::errors::DfcsrError;
use crate::lattice::Lattice;
use crate::stats::StatsRecorder;

pub struct Hdf5Writer {
    workdir: PathBuf,
    run_name: String,
    timestamp: String,
    is_root: bool,
    particles_initialized: bool,
    wakes_initialized: bool,
}

impl Hdf5Writer {
    pub fn new(workdir: impl AsRef<Path>, run_name: &str, timestamp: &str, is_root: bool) -> Hdf5Writer {
        Hdf5Writer {
            workdir: workdir.as_ref().to_path_buf(),
            run_name: run_name.to_string(),
            timestamp: timestamp.to_string(),
            is_root,
            particles_initialized: false,
            wakes_initialized: false,
        }
    }

    fn path_for(&self, suffix: &str) -> PathBuf {
        self.workdir.join(format!("{}-{}-{}.h5", self.run_name, self.timestamp, suffix))
    }

    /// Delete a stale file from a previous run with the same name, on the
    /// first write of a run only.
    fn truncate_once(path: &Path, initialized: &mut bool) -> Result<(), DfcsrError> {
        if !*initialized {
            if path.exists() {
                std::fs::remove_file(path)?;
                log::info!("existing file {} deleted", path.display());
            }
            *initialized = true;
        }
        Ok(())
    }

    pub fn write_beam(&mut self, beam: &Beam, current_element: &str) -> Result<(), DfcsrError> {
        if !self.is_root {
            return Ok(());
        }
        let path = self.path_for("particles");
        Self::truncate_once(&path, &mut self.particles_initialized)?;
        let file = hdf5::File::append(&path).map_err(|e| DfcsrError::Io(e.to_string()))?;
        let group = file
            .create_group(&format!("step_{}", beam.step))
            .map_err(|e| DfcsrError::Io(e.to_string()))?;
        write_scalar_attr(&group, "step", beam.step as f64)?;
        write_scalar_attr(&group, "position", beam.s)?;
        write_scalar_attr(&group, "mean_gamma", beam.init_gamma)?;
        write_scalar_attr(&group, "beam_energy", beam.init_energy)?;
        write_str_attr(&group, "element", current_element)?;
        write_scalar_attr(&group, "charge", beam.charge)?;

        let particles = group.create_group("particles").map_err(|e| DfcsrError::Io(e.to_string()))?;
        write_dataset(&particles, "x", &beam.x)?;
        write_dataset(&particles, "xp", &beam.xp)?;
        write_dataset(&particles, "y", &beam.y)?;
        write_dataset(&particles, "yp", &beam.yp)?;
        write_dataset(&particles, "z", &beam.z)?;
        write_dataset(&particles, "delta", &beam.delta)?;
        log::info!("beam written to {}", path.display());
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn write_wakes(
        &mut self,
        beam: &Beam,
        current_element: &str,
        x_grid: &[f64],
        z_grid: &[f64],
        dedct: &[f64],
        x_kick: &[f64],
    ) -> Result<(), DfcsrError> {
        if !self.is_root {
            return Ok(());
        }
        let path = self.path_for("wakes");
        Self::truncate_once(&path, &mut self.wakes_initialized)?;
        let file = hdf5::File::append(&path).map_err(|e| DfcsrError::Io(e.to_string()))?;
        let group = file
            .create_group(&format!("step_{}", beam.step))
            .map_err(|e| DfcsrError::Io(e.to_string()))?;
        write_scalar_attr(&group, "step", beam.step as f64)?;
        write_scalar_attr(&group, "position", beam.s)?;
        write_scalar_attr(&group, "mean_gamma", beam.init_gamma)?;
        write_scalar_attr(&group, "beam_energy", beam.init_energy)?;
        write_str_attr(&group, "element", current_element)?;
        write_scalar_attr(&group, "charge", beam.charge)?;

        let longitudinal = group.create_group("longitudinal").map_err(|e| DfcsrError::Io(e.to_string()))?;
        write_str_attr(&longitudinal, "unit", "MeV/m")?;
        write_dataset(&longitudinal, "x_grids", x_grid)?;
        write_dataset(&longitudinal, "z_grids", z_grid)?;
        write_dataset(&longitudinal, "dE_dct", dedct)?;

        let transverse = group.create_group("transverse").map_err(|e| DfcsrError::Io(e.to_string()))?;
        write_str_attr(&transverse, "unit", "MeV/m")?;
        write_dataset(&transverse, "x_grids", x_grid)?;
        write_dataset(&transverse, "z_grids", z_grid)?;
        write_dataset(&transverse, "xkicks", x_kick)?;
        log::info!("wakes written to {}", path.display());
        Ok(())
    }

    /// Statistics are written once at the end of a run, overwriting any
    /// prior file unconditionally (there is no incremental append).
    pub fn write_statistics(&self, stats: &StatsRecorder, lattice: &Lattice) -> Result<(), DfcsrError> {
        if !self.is_root {
            return Ok(());
        }
        let path = self.path_for("statistics");
        if path.exists() {
            std::fs::remove_file(&path)?;
            log::info!("existing file {} deleted", path.display());
        }
        let file = hdf5::File::create(&path).map_err(|e| DfcsrError::Io(e.to_string()))?;
        write_dataset(&file, "step_positions", &stats.s)?;
        write_dataset_2(&file, "slope", &stats.slope)?;
        write_dataset(&file, "gemitX", &stats.gemit_x)?;
        write_dataset(&file, "Cx", &stats.cx)?;
        write_dataset(&file, "Cxp", &stats.cxp)?;
        write_dataset(&file, "etaX", &stats.eta_x)?;
        write_dataset(&file, "etaXp", &stats.eta_xp)?;
        write_dataset(&file, "betaX", &stats.beta_x)?;
        write_dataset(&file, "alphaX", &stats.alpha_x)?;
        write_dataset(&file, "betaX_beam", &stats.beta_x_beam)?;
        write_dataset(&file, "alphaX_beam", &stats.alpha_x_beam)?;
        write_dataset(&file, "sigX", &stats.sig_x)?;
        write_dataset(&file, "sigZ", &stats.sig_z)?;
        write_dataset(&file, "sigE", &stats.sig_e)?;
        write_dataset(&file, "R56", &stats.r56)?;
        write_dataset(&file, "R51", &stats.r51)?;
        write_dataset(&file, "R52", &stats.r52)?;
        write_dataset(&file, "gemitX_minus_dispersion", &stats.gemit_x_minus_dispersion)?;
        write_dataset(&file, "betaX_minus_dispersion", &stats.beta_x_minus_dispersion)?;
        write_dataset(&file, "alphaX_minus_dispersion", &stats.alpha_x_minus_dispersion)?;

        let (_s, x0, y0, tau, n) = lattice.samples();
        let coords: Vec<f64> = x0.iter().zip(y0).flat_map(|(&x, &y)| [x, y]).collect();
        let tau_vec: Vec<f64> = tau.iter().flat_map(|v| [v.x, v.y]).collect();
        let n_vec: Vec<f64> = n.iter().flat_map(|v| [v.x, v.y]).collect();
        write_matrix(&file, "coords", &coords, x0.len())?;
        write_matrix(&file, "n_vec", &n_vec, n.len())?;
        write_matrix(&file, "tau_vec", &tau_vec, tau.len())?;
        log::info!("statistics written to {}", path.display());
        Ok(())
    }
}

fn write_dataset(container: &hdf5::Group, name: &str, data: &[f64]) -> Result<(), DfcsrError> {
    container
        .new_dataset::<f64>()
        .shape(data.len())
        .create(name)
        .and_then(|ds| ds.write(data))
        .map_err(|e| DfcsrError::Io(e.to_string()))
}

fn write_dataset_2(container: &hdf5::Group, name: &str, data: &[[f64; 2]]) -> Result<(), DfcsrError> {
    let flat: Vec<f64> = data.iter().flat_map(|row| row.iter().copied()).collect();
    write_matrix(container, name, &flat, data.len())
}

fn write_matrix(container: &hdf5::Group, name: &str, flat: &[f64], rows: usize) -> Result<(), DfcsrError> {
    container
        .new_dataset::<f64>()
        .shape((rows, 2))
        .create(name)
        .and_then(|ds| ds.write_raw(flat))
        .map_err(|e| DfcsrError::Io(e.to_string()))
}

fn write_scalar_attr(group: &hdf5::Group, name: &str, value: f64) -> Result<(), DfcsrError> {
    group
        .new_attr::<f64>()
        .create(name)
        .and_then(|attr| attr.write_scalar(&value))
        .map_err(|e| DfcsrError::Io(e.to_string()))
}

fn write_str_attr(group: &hdf5::Group, name: &str, value: &str) -> Result<(), DfcsrError> {
    group
        .new_attr::<hdf5::types::VarLenUnicode>()
        .create(name)
        .and_then(|attr| attr.write_scalar(&value.parse::<hdf5::types::VarLenUnicode>().unwrap()))
        .map_err(|e| DfcsrError::Io(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_for_includes_run_name_timestamp_and_suffix() {
        let w = Hdf5Writer::new("/tmp", "run", "2026-01-01T00_00_00", true);
        let p = w.path_for("statistics");
        assert_eq!(p.file_name().unwrap().to_str().unwrap(), "run-2026-01-01T00_00_00-statistics.h5");
    }
}
