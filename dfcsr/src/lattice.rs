// dfcsr - A 2-D coherent synchrotron radiation wake engine
// Derived from sir_ddft (Copyright (C) 2021 Julian Jeggle, Raphael Wittkowski),
// licensed under the GNU Affero General Public License v3 or later.

//! Reference-trajectory geometry (C1). Walks the configured lattice once,
//! sampling the reference orbit `(X0(s), Y0(s))`, its unit tangent `tau(s)`
//! and outward normal `n(s)`, and the local curvature `rho(s)` at a fixed
//! resolution per element. Everything else queries this table by linear
//! interpolation rather than re-deriving the geometry.

use crate::config::LatticeElementConfig;
use crate::errors::DfcsrError;
use crate::vecmath::Vec2;

/// Number of geometry samples laid down per unit length of lattice, used
/// regardless of how an element's own `steps`/`nsep` are set; tracking
/// reference-orbit geometry at coarser resolution than the step grid would
/// alias the curvature of a dipole.
const SAMPLES_PER_METER: f64 = 200.0;
const MIN_SAMPLES_PER_ELEMENT: usize = 4;

struct ElementSpan {
    s_start: f64,
    s_end: f64,
    /// Curvature `angle / L` (reciprocal bend radius); `0.0` for field-free
    /// elements.
    curvature: f64,
}

pub struct Lattice {
    spans: Vec<ElementSpan>,
    total_length: f64,
    s_samples: Vec<f64>,
    x0_samples: Vec<f64>,
    y0_samples: Vec<f64>,
    tau_samples: Vec<Vec2>,
    n_samples: Vec<Vec2>,
}

impl Lattice {
    pub fn build(elements: &[LatticeElementConfig]) -> Result<Lattice, DfcsrError> {
        if elements.is_empty() {
            return Err(DfcsrError::Configuration("input_lattice has no elements".into()));
        }

        let mut spans = Vec::with_capacity(elements.len());
        let mut s_samples = Vec::new();
        let mut x0_samples = Vec::new();
        let mut y0_samples = Vec::new();
        let mut tau_samples = Vec::new();
        let mut n_samples = Vec::new();

        let mut s = 0.0f64;
        let mut pos = Vec2::new(0.0, 0.0);
        let mut heading = 0.0f64; // angle of tau from +x axis

        for el in elements {
            let l = el.length();
            if !(l > 0.0) {
                return Err(DfcsrError::Geometry(format!("element length must be positive, got {l}")));
            }
            let radius = match el {
                LatticeElementConfig::Dipole { angle, .. } => {
                    if *angle == 0.0 {
                        return Err(DfcsrError::Geometry("dipole with zero bend angle".into()));
                    }
                    l / angle
                }
                _ => f64::INFINITY,
            };
            let curvature = if radius.is_finite() { 1.0 / radius } else { 0.0 };
            spans.push(ElementSpan { s_start: s, s_end: s + l, curvature });

            let n_steps = ((l * SAMPLES_PER_METER).ceil() as usize).max(MIN_SAMPLES_PER_ELEMENT);
            for i in 0..=n_steps {
                let ds = l * (i as f64) / (n_steps as f64);
                let (local_pos, local_heading) = if radius.is_finite() {
                    let dtheta = ds / radius;
                    let dx = radius * dtheta.sin();
                    let dy = radius * (1.0 - dtheta.cos());
                    (Vec2::new(dx, dy).rotate(heading) + pos, heading + dtheta)
                } else {
                    (Vec2::new(ds, 0.0).rotate(heading) + pos, heading)
                };
                // Avoid duplicate sample at element boundary shared with the
                // previous element's last point.
                if let Some(&last_s) = s_samples.last() {
                    if (last_s - (s + ds)).abs() < 1e-12 {
                        continue;
                    }
                }
                let tau = Vec2::new(1.0, 0.0).rotate(local_heading);
                s_samples.push(s + ds);
                x0_samples.push(local_pos.x);
                y0_samples.push(local_pos.y);
                tau_samples.push(tau);
                n_samples.push(tau.perp());
            }

            let dtheta_total = if radius.is_finite() { l / radius } else { 0.0 };
            pos = if radius.is_finite() {
                Vec2::new(radius * dtheta_total.sin(), radius * (1.0 - dtheta_total.cos())).rotate(heading) + pos
            } else {
                Vec2::new(l, 0.0).rotate(heading) + pos
            };
            heading += dtheta_total;
            s += l;
        }

        Ok(Lattice {
            spans,
            total_length: s,
            s_samples,
            x0_samples,
            y0_samples,
            tau_samples,
            n_samples,
        })
    }

    pub fn total_length(&self) -> f64 {
        self.total_length
    }

    /// Raw geometry sample table `(s, X0, Y0, tau, n)`, exposed for
    /// diagnostic output.
    pub fn samples(&self) -> (&[f64], &[f64], &[f64], &[Vec2], &[Vec2]) {
        (&self.s_samples, &self.x0_samples, &self.y0_samples, &self.tau_samples, &self.n_samples)
    }

    /// Curvature `angle / L` at arc length `s` (piecewise constant per
    /// element, `0.0` in drifts and quadrupoles).
    pub fn rho_at(&self, s: f64) -> f64 {
        let s = s.clamp(0.0, self.total_length);
        for span in &self.spans {
            if s <= span.s_end || (span.s_end - self.total_length).abs() < 1e-12 {
                return span.curvature;
            }
        }
        self.spans.last().map(|sp| sp.curvature).unwrap_or(0.0)
    }

    pub fn reference_point(&self, s: f64) -> (f64, f64) {
        let (i, frac) = self.bracket(s);
        let x = lerp(self.x0_samples[i], self.x0_samples[i + 1], frac);
        let y = lerp(self.y0_samples[i], self.y0_samples[i + 1], frac);
        (x, y)
    }

    pub fn tau(&self, s: f64) -> Vec2 {
        let (i, frac) = self.bracket(s);
        let v = Vec2::new(
            lerp(self.tau_samples[i].x, self.tau_samples[i + 1].x, frac),
            lerp(self.tau_samples[i].y, self.tau_samples[i + 1].y, frac),
        );
        let n = v.norm();
        if n > 0.0 { v * (1.0 / n) } else { v }
    }

    pub fn n(&self, s: f64) -> Vec2 {
        self.tau(s).perp()
    }

    fn bracket(&self, s: f64) -> (usize, f64) {
        let s = s.clamp(self.s_samples[0], *self.s_samples.last().unwrap());
        match self
            .s_samples
            .binary_search_by(|probe| probe.partial_cmp(&s).unwrap())
        {
            Ok(i) => (i.min(self.s_samples.len() - 2), 0.0),
            Err(i) => {
                let i = i.clamp(1, self.s_samples.len() - 1) - 1;
                let s0 = self.s_samples[i];
                let s1 = self.s_samples[i + 1];
                let frac = if s1 > s0 { (s - s0) / (s1 - s0) } else { 0.0 };
                (i, frac)
            }
        }
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}
