// dfcsr - A 2-D coherent synchrotron radiation wake engine
// Derived from sir_ddft (Copyright (C) 2021 Julian Jeggle, Raphael Wittkowski),
// licensed under the GNU Affero General Public License v3 or later.

//! Run configuration (C8). Five top-level YAML sections per spec §6, each a
//! closed struct: unknown keys at the top level are a configuration error
//! (`deny_unknown_fields`), missing optional sections fall back to
//! `Default`. Per the Design Notes ("replace dynamic typing of
//! configuration with tagged variants"), lattice elements are a closed,
//! tagged enum rather than a dictionary keyed by a `type` string.

use serde::Deserialize;

use crate::errors::DfcsrError;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub input_beam: InputBeam,
    pub input_lattice: Vec<LatticeElementConfig>,
    #[serde(default)]
    pub particle_deposition: ParticleDeposition,
    #[serde(default)]
    pub distribution_interpolation: DistributionInterpolation,
    #[serde(default)]
    pub csr_integration: CsrIntegration,
    #[serde(default)]
    pub csr_computation: CsrComputation,
}

impl Config {
    /// Parse a run configuration from a YAML document. Unknown top-level
    /// keys and unknown keys within any section are rejected here (fatal,
    /// per spec §7's "Configuration error").
    pub fn parse(yaml: &str) -> Result<Config, DfcsrError> {
        serde_yaml::from_str(yaml).map_err(DfcsrError::from)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputBeam {
    /// Bunch charge in Coulombs.
    pub charge: f64,
    /// Reference kinetic energy in MeV.
    pub energy: f64,
    /// Reference relativistic gamma.
    pub gamma: f64,
    /// Geometric horizontal emittance.
    pub emittance_x: f64,
    pub beta_x: f64,
    pub alpha_x: f64,
    pub sigma_x: f64,
    pub sigma_z: f64,
    pub sigma_delta: f64,
    pub n_particles: usize,
    #[serde(default)]
    pub xz_correlation: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", deny_unknown_fields)]
pub enum LatticeElementConfig {
    Drift {
        #[serde(rename = "L")]
        l: f64,
        steps: usize,
        #[serde(default = "default_nsep")]
        nsep: usize,
    },
    Dipole {
        #[serde(rename = "L")]
        l: f64,
        steps: usize,
        angle: f64,
        #[serde(rename = "E1", default)]
        e1: f64,
        #[serde(rename = "E2", default)]
        e2: f64,
        #[serde(default = "default_nsep")]
        nsep: usize,
    },
    Quad {
        #[serde(rename = "L")]
        l: f64,
        steps: usize,
        strength: f64,
        #[serde(default = "default_nsep")]
        nsep: usize,
    },
}

fn default_nsep() -> usize {
    1
}

impl LatticeElementConfig {
    pub fn length(&self) -> f64 {
        match self {
            LatticeElementConfig::Drift { l, .. } => *l,
            LatticeElementConfig::Dipole { l, .. } => *l,
            LatticeElementConfig::Quad { l, .. } => *l,
        }
    }

    pub fn steps(&self) -> usize {
        match self {
            LatticeElementConfig::Drift { steps, .. } => *steps,
            LatticeElementConfig::Dipole { steps, .. } => *steps,
            LatticeElementConfig::Quad { steps, .. } => *steps,
        }
    }

    pub fn nsep(&self) -> usize {
        match self {
            LatticeElementConfig::Drift { nsep, .. } => *nsep,
            LatticeElementConfig::Dipole { nsep, .. } => *nsep,
            LatticeElementConfig::Quad { nsep, .. } => *nsep,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParticleDeposition {
    pub grid_nx: usize,
    pub grid_nz: usize,
    /// Gaussian smoothing width (in grid cells) applied by the deposition
    /// kernel; `0.0` disables smoothing.
    #[serde(default)]
    pub smoothing: f64,
}

impl Default for ParticleDeposition {
    fn default() -> Self {
        Self {
            grid_nx: 64,
            grid_nz: 64,
            smoothing: 0.0,
        }
    }
}

/// Which formula to use for the formation length in a drift that
/// immediately follows a dipole. See spec §9 Open Questions: the original
/// executes `BendFallback` (it recomputes as if still in the bend); a
/// `PhaseSlip` branch exists in the source as commented-out code but is
/// never actually executed.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormationLengthModel {
    BendFallback,
    PhaseSlip,
}

impl Default for FormationLengthModel {
    fn default() -> Self {
        FormationLengthModel::BendFallback
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DistributionInterpolation {
    pub n_formation_length: f64,
    pub grid_nx: usize,
    pub grid_nz: usize,
    #[serde(default)]
    pub formation_length_model: FormationLengthModel,
}

impl Default for DistributionInterpolation {
    fn default() -> Self {
        Self {
            n_formation_length: 3.0,
            grid_nx: 64,
            grid_nz: 256,
            formation_length_model: FormationLengthModel::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CsrIntegration {
    pub xbins: usize,
    pub zbins: usize,
    pub n_formation_length: f64,
}

impl Default for CsrIntegration {
    fn default() -> Self {
        Self {
            xbins: 100,
            zbins: 100,
            n_formation_length: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CsrComputation {
    pub xbins: usize,
    pub zbins: usize,
    pub xlim: f64,
    pub zlim: f64,
    #[serde(default = "default_true")]
    pub compute_csr: bool,
    #[serde(default = "default_true")]
    pub apply_csr: bool,
    #[serde(default)]
    pub write_beam: bool,
    #[serde(default)]
    pub write_wakes: bool,
    #[serde(default = "default_workdir")]
    pub workdir: String,
    #[serde(default = "default_write_name")]
    pub write_name: String,
}

fn default_true() -> bool {
    true
}
fn default_workdir() -> String {
    ".".to_string()
}
fn default_write_name() -> String {
    "dfcsr".to_string()
}

impl Default for CsrComputation {
    fn default() -> Self {
        Self {
            xbins: 32,
            zbins: 32,
            xlim: 5.0,
            zlim: 5.0,
            compute_csr: true,
            apply_csr: true,
            write_beam: false,
            write_wakes: false,
            workdir: default_workdir(),
            write_name: default_write_name(),
        }
    }
}
