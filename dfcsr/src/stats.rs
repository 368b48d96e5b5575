// dfcsr - A 2-D coherent synchrotron radiation wake engine
// Derived from sir_ddft (Copyright (C) 2021 Julian Jeggle, Raphael Wittkowski),
// licensed under the GNU Affero General Public License v3 or later.

//! Per-step scalar beam statistics, recorded once per lattice step and
//! written out as flat HDF5 datasets by [`crate::io`].

use crate::beam::Beam;
use crate::transport::Mat6;

#[derive(Debug, Clone, Default)]
pub struct StatsRecorder {
    pub s: Vec<f64>,
    pub gemit_x: Vec<f64>,
    pub slope: Vec<[f64; 2]>,
    pub cx: Vec<f64>,
    pub cxp: Vec<f64>,
    pub eta_x: Vec<f64>,
    pub eta_xp: Vec<f64>,
    pub beta_x: Vec<f64>,
    pub alpha_x: Vec<f64>,
    pub beta_x_beam: Vec<f64>,
    pub alpha_x_beam: Vec<f64>,
    pub gemit_x_minus_dispersion: Vec<f64>,
    pub beta_x_minus_dispersion: Vec<f64>,
    pub alpha_x_minus_dispersion: Vec<f64>,
    pub sig_x: Vec<f64>,
    pub sig_z: Vec<f64>,
    pub sig_e: Vec<f64>,
    pub r56: Vec<f64>,
    pub r51: Vec<f64>,
    pub r52: Vec<f64>,
}

impl StatsRecorder {
    pub fn new() -> StatsRecorder {
        StatsRecorder::default()
    }

    /// Record one step's worth of scalar statistics. `design_beta`/`design_alpha`
    /// are the lattice's design Twiss parameters propagated through `r_tot`
    /// (independent of the actual particle distribution).
    pub fn record(&mut self, beam: &Beam, r_tot: &Mat6, design_beta: f64, design_alpha: f64) {
        let (beam_emit, beam_beta, beam_alpha) = beam.emittance_beta_alpha();
        let (_, gemit_minus_disp, beta_minus_disp, alpha_minus_disp) = beam.stats_minus_dispersion(r_tot);

        self.s.push(beam.s);
        self.gemit_x.push(beam_emit * beam.init_gamma);
        self.slope.push([beam.slope_xz(), 0.0]);
        self.cx.push(beam.mean_x());
        self.cxp.push(Beam::mean(&beam.xp));
        self.eta_x.push(r_tot[0][5]);
        self.eta_xp.push(r_tot[1][5]);
        self.beta_x.push(design_beta);
        self.alpha_x.push(design_alpha);
        self.beta_x_beam.push(beam_beta);
        self.alpha_x_beam.push(beam_alpha);
        self.gemit_x_minus_dispersion.push(gemit_minus_disp);
        self.beta_x_minus_dispersion.push(beta_minus_disp);
        self.alpha_x_minus_dispersion.push(alpha_minus_disp);
        self.sig_x.push(beam.sigma_x());
        self.sig_z.push(beam.sigma_z());
        self.sig_e.push(beam.sigma_delta());
        self.r56.push(r_tot[4][5]);
        self.r51.push(r_tot[4][0]);
        self.r52.push(r_tot[4][1]);
    }

    pub fn len(&self) -> usize {
        self.s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.s.is_empty()
    }
}
