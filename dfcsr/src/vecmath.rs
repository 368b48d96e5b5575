// dfcsr - A 2-D coherent synchrotron radiation wake engine
// Derived from sir_ddft (Copyright (C) 2021 Julian Jeggle, Raphael Wittkowski),
// licensed under the GNU Affero General Public License v3 or later.

//! Minimal 2-D vector type used throughout the lattice geometry and CSR
//! kernel. Kept as a plain struct with inlined arithmetic rather than
//! pulling in a linear-algebra crate, matching the style of the rest of
//! the crate (flat arrays with explicit indexing instead of matrix types).

use std::ops::{Add, Sub, Mul};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    #[inline(always)]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline(always)]
    pub fn dot(&self, other: &Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    #[inline(always)]
    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Rotate by +90 degrees (used to get the outward normal from the tangent)
    #[inline(always)]
    pub fn perp(&self) -> Vec2 {
        Vec2::new(-self.y, self.x)
    }

    #[inline(always)]
    pub fn rotate(&self, angle: f64) -> Vec2 {
        let (s, c) = angle.sin_cos();
        Vec2::new(self.x * c - self.y * s, self.x * s + self.y * c)
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    #[inline(always)]
    fn add(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    #[inline(always)]
    fn sub(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    #[inline(always)]
    fn mul(self, scale: f64) -> Vec2 {
        Vec2::new(self.x * scale, self.y * scale)
    }
}
