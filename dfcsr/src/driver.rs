// dfcsr - A 2-D coherent synchrotron radiation wake engine
// Derived from sir_ddft (Copyright (C) 2021 Julian Jeggle, Raphael Wittkowski),
// licensed under the GNU Affero General Public License v3 or later.

//! Main step driver (C6): walks the lattice element by element, tracking
//! the beam, depositing the density history, computing and applying the
//! CSR wake at the configured cadence, and recording per-step statistics.

use crate::beam::Beam;
use crate::config::{Config, FormationLengthModel, LatticeElementConfig};
use crate::deposition::CloudInCell;
use crate::errors::DfcsrError;
use crate::history::{DensityHistory, HistoryField};
use crate::io::Hdf5Writer;
use crate::lattice::Lattice;
use crate::partition::Partitioner;
use crate::quadrature::compute_wake;
use crate::stats::StatsRecorder;
use crate::transport::{dipole, drift, identity, mul, quad, twiss_propagate, Mat6};

pub struct StepDriver {
    pub lattice: Lattice,
    pub beam: Beam,
    pub history: DensityHistory,
    pub stats: StatsRecorder,
    pub r_tot: Mat6,
    beta0: f64,
    alpha0: f64,
    formation_length: f64,
    r_rec: f64,
    phi_rec: f64,
    afterbend: bool,
    current_element: String,
}

impl StepDriver {
    pub fn new(config: &Config) -> Result<StepDriver, DfcsrError> {
        let lattice = Lattice::build(&config.input_lattice)?;
        let beam = Beam::from_config(&config.input_beam);
        Ok(StepDriver {
            lattice,
            beta0: config.input_beam.beta_x,
            alpha0: config.input_beam.alpha_x,
            beam,
            history: DensityHistory::new(),
            stats: StatsRecorder::new(),
            r_tot: identity(),
            formation_length: f64::INFINITY,
            r_rec: f64::INFINITY,
            phi_rec: 0.0,
            afterbend: false,
            current_element: String::new(),
        })
    }

    /// Run the full lattice once, optionally writing beam/wake/statistics
    /// snapshots through `writer`. A `Numerical` or `Geometry` error aborts
    /// the run immediately with whatever statistics have already been
    /// accumulated still intact on `self.stats`; an `Io` error from the
    /// writer is logged and the step continues.
    pub fn run(&mut self, config: &Config, partitioner: &Partitioner, mut writer: Option<&mut Hdf5Writer>) -> Result<(), DfcsrError> {
        for (ele_index, element) in config.input_lattice.iter().enumerate() {
            self.current_element = format!("element_{ele_index}");
            self.step_through_element(config, element, ele_index, partitioner, writer.as_deref_mut())?;
        }
        if let Some(w) = writer {
            if let Err(e) = w.write_statistics(&self.stats, &self.lattice) {
                log::warn!("{e}");
            }
        }
        Ok(())
    }

    fn step_through_element(
        &mut self,
        config: &Config,
        element: &LatticeElementConfig,
        ele_index: usize,
        partitioner: &Partitioner,
        mut writer: Option<&mut Hdf5Writer>,
    ) -> Result<(), DfcsrError> {
        let l = element.length();
        let steps = element.steps().max(1);
        let dl = l / steps as f64;
        let sigma_z = self.beam.sigma_z();

        let (rho, inbend) = match element {
            LatticeElementConfig::Dipole { angle, .. } => {
                let r = l / angle;
                self.r_rec = r;
                self.phi_rec = *angle;
                self.afterbend = true;
                (r, true)
            }
            _ => (f64::INFINITY, false),
        };
        self.formation_length = if self.afterbend {
            formation_length(
                config.distribution_interpolation.formation_length_model,
                rho,
                5.0 * sigma_z,
                self.r_rec,
                self.phi_rec,
                inbend,
            )
        } else {
            l
        };

        for step in 0..steps {
            let dr6 = step_matrix(element, dl, step, steps)?;
            self.beam.track(&dr6, dl);

            self.deposit_density_slice(config);

            if config.csr_computation.compute_csr && step % element.nsep().max(1) == 0 {
                self.compute_and_apply_wake(config, partitioner, dl * element.nsep().max(1) as f64, writer.as_deref_mut())?;
                if config.csr_computation.write_beam {
                    if let Some(w) = writer.as_deref_mut() {
                        if let Err(e) = w.write_beam(&self.beam, &self.current_element) {
                            log::warn!("{e}");
                        }
                    }
                }
            }

            self.r_tot = mul(&dr6, &self.r_tot);
            let r2 = [[self.r_tot[0][0], self.r_tot[0][1]], [self.r_tot[1][0], self.r_tot[1][1]]];
            let (design_beta, design_alpha, _) = twiss_propagate(r2, self.alpha0, self.beta0);
            self.stats.record(&self.beam, &self.r_tot, design_beta, design_alpha);

            log::info!("finished step {} of element {} at s={:.6}", step, ele_index, self.beam.s);
        }
        Ok(())
    }

    fn deposit_density_slice(&mut self, config: &Config) {
        let mean_x = self.beam.mean_x();
        let sigma_x = self.beam.sigma_x().max(1e-12);
        let sigma_z = self.beam.sigma_z().max(1e-12);
        let pad = config.distribution_interpolation.n_formation_length.max(3.0);
        let x_min = mean_x - pad * sigma_x;
        let x_max = mean_x + pad * sigma_x;
        let z_center = Beam::mean(&self.beam.z);
        let z_min = z_center - pad * sigma_z;
        let z_max = z_center + pad * sigma_z;
        self.history.deposit(
            &CloudInCell,
            &self.beam.x,
            &self.beam.z,
            &self.beam.xp,
            self.beam.charge,
            self.beam.s,
            self.formation_length,
            config.distribution_interpolation.grid_nx,
            config.distribution_interpolation.grid_nz,
            x_min,
            x_max,
            z_min,
            z_max,
        );
    }

    fn compute_and_apply_wake(
        &mut self,
        config: &Config,
        partitioner: &Partitioner,
        ds: f64,
        writer: Option<&mut Hdf5Writer>,
    ) -> Result<(), DfcsrError> {
        let sigma_x = self.beam.sigma_x().max(1e-12);
        let sigma_z = self.beam.sigma_z().max(1e-12);
        let xt = self.beam.x_transform();
        let mean_xt = Beam::mean(&xt);
        let z_center = Beam::mean(&self.beam.z);
        let params = &config.csr_computation;

        let x_grid: Vec<f64> = crate::localizer::linspace(mean_xt - params.xlim * sigma_x, mean_xt + params.xlim * sigma_x, params.xbins);
        // `z_grid` is in the beam's co-moving (relative) frame, matching
        // `beam.z`; the absolute arc-length observer position fed to
        // `compute_wake` is recovered per-point as `beam.s + z_grid[iz]`.
        let z_grid: Vec<f64> = crate::localizer::linspace(z_center - params.zlim * sigma_z, z_center + params.zlim * sigma_z, params.zbins);

        let work_size = x_grid.len() * z_grid.len();
        let (start, end) = partitioner.local_range(work_size);

        let slope = self.beam.slope_xz();
        let mut local_dedct = vec![0.0; end - start];
        let mut local_xkick = vec![0.0; end - start];

        for (local_idx, flat_idx) in (start..end).enumerate() {
            let ix = flat_idx / z_grid.len();
            let iz = flat_idx % z_grid.len();
            let x = x_grid[ix];
            let zeta = z_grid[iz];
            let s = self.beam.s + zeta;
            let vx_field = self.history.query(HistoryField::Vx, self.beam.s, x, zeta);
            let (dedct, xkick) = compute_wake(
                &self.lattice,
                &self.history,
                |_sp| slope,
                s,
                x,
                self.beam.s,
                vx_field,
                sigma_x,
                sigma_z,
                self.formation_length,
                self.beam.charge,
                &config.csr_integration,
            );
            if !dedct.is_finite() || !xkick.is_finite() {
                return Err(DfcsrError::Numerical {
                    s,
                    x,
                    step: self.beam.step,
                    reason: "non-finite CSR wake value".into(),
                });
            }
            local_dedct[local_idx] = dedct;
            local_xkick[local_idx] = xkick;
        }

        let dedct = partitioner.all_gather(&local_dedct, work_size);
        let xkick = partitioner.all_gather(&local_xkick, work_size);

        if config.csr_computation.apply_csr {
            self.beam.apply_wakes(&x_grid, &z_grid, &dedct, &xkick, z_grid.len(), ds);
        }
        if config.csr_computation.write_wakes {
            if let Some(w) = writer {
                if let Err(e) = w.write_wakes(&self.beam, &self.current_element, &x_grid, &z_grid, &dedct, &xkick) {
                    log::warn!("{e}");
                }
            }
        }
        self.beam.step += 1;
        Ok(())
    }
}

fn step_matrix(element: &LatticeElementConfig, dl: f64, step: usize, steps: usize) -> Result<Mat6, DfcsrError> {
    match element {
        LatticeElementConfig::Drift { .. } => Ok(drift(dl)),
        LatticeElementConfig::Quad { strength, .. } => quad(dl, *strength),
        LatticeElementConfig::Dipole { l, angle, e1, e2, .. } => {
            let dang = angle * dl / l;
            let (use_e1, use_e2) = if step == 0 {
                (*e1, 0.0)
            } else if step == steps - 1 {
                (0.0, *e2)
            } else {
                (0.0, 0.0)
            };
            dipole(dl, dang, use_e1, use_e2)
        }
    }
}

fn formation_length(model: FormationLengthModel, r_current: f64, sigma_z_scaled: f64, r_rec: f64, phi_rec: f64, inbend: bool) -> f64 {
    match model {
        FormationLengthModel::BendFallback => (24.0 * r_current * r_current * sigma_z_scaled).cbrt(),
        FormationLengthModel::PhaseSlip => {
            if inbend {
                (24.0 * r_current * r_current * sigma_z_scaled).cbrt()
            } else {
                let numerator = 3.0 * r_rec * r_rec * phi_rec.powi(4);
                let denominator = 4.0 * (r_rec * phi_rec.powi(3) - 6.0 * sigma_z_scaled);
                numerator / denominator
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputBeam;

    fn small_config() -> Config {
        Config {
            input_beam: InputBeam {
                charge: 1e-9,
                energy: 1.0,
                gamma: 1000.0,
                emittance_x: 1e-9,
                beta_x: 1.0,
                alpha_x: 0.0,
                sigma_x: 3e-5,
                sigma_z: 5e-5,
                sigma_delta: 1e-3,
                n_particles: 27,
                xz_correlation: 0.0,
            },
            input_lattice: vec![LatticeElementConfig::Drift { l: 0.1, steps: 2, nsep: 1 }],
            particle_deposition: Default::default(),
            distribution_interpolation: crate::config::DistributionInterpolation {
                n_formation_length: 3.0,
                grid_nx: 8,
                grid_nz: 8,
                formation_length_model: FormationLengthModel::BendFallback,
            },
            csr_integration: crate::config::CsrIntegration { xbins: 6, zbins: 6, n_formation_length: 1.0 },
            csr_computation: crate::config::CsrComputation {
                xbins: 6,
                zbins: 6,
                xlim: 5.0,
                zlim: 5.0,
                compute_csr: false,
                apply_csr: false,
                write_beam: false,
                write_wakes: false,
                workdir: ".".into(),
                write_name: "test".into(),
            },
        }
    }

    #[test]
    fn drift_only_run_advances_beam_position() {
        let cfg = small_config();
        let mut driver = StepDriver::new(&cfg).unwrap();
        let partitioner = Partitioner::single();
        driver.run(&cfg, &partitioner, None).unwrap();
        assert!((driver.beam.s - 0.1).abs() < 1e-9);
        assert_eq!(driver.stats.len(), 2);
    }

    #[test]
    fn formation_length_bend_fallback_matches_closed_form() {
        let fl = formation_length(FormationLengthModel::BendFallback, 10.0, 2.5e-4, 0.0, 0.0, true);
        let expected: f64 = (24.0 * 100.0 * 2.5e-4_f64).cbrt();
        assert!((fl - expected).abs() < 1e-12);
    }
}
