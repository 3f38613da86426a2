//! Immutable 2D vector used for positions, velocities, and behavior forces.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

const FULL_TURN: f64 = std::f64::consts::TAU;

/// Planar vector with value semantics.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}

impl Vector {
    /// Construct a new vector.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The zero vector.
    #[must_use]
    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Euclidean length.
    #[must_use]
    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Euclidean distance between two points.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (other - self).length()
    }

    /// Unit vector in the same direction; the zero vector maps to itself.
    #[must_use]
    pub fn unit(self) -> Self {
        let length = self.length();
        if length == 0.0 || !length.is_finite() {
            return Self::zero();
        }
        self / length
    }

    /// Counter-clockwise 90 degree rotation.
    #[must_use]
    pub const fn orthogonal(self) -> Self {
        Self {
            x: -self.y,
            y: self.x,
        }
    }

    /// Unsigned angle between two vectors in degrees, within `[0, 180]`.
    ///
    /// A zero-length operand has no direction; the angle is reported as `0`
    /// so that a stationary agent sees in every direction.
    #[must_use]
    pub fn angle(self, other: Self) -> f64 {
        let denom = self.length() * other.length();
        if denom == 0.0 || !denom.is_finite() {
            return 0.0;
        }
        let cos = (self.dot(other) / denom).clamp(-1.0, 1.0);
        cos.acos().to_degrees()
    }

    /// Uniformly random direction with a magnitude drawn from `[0, max_magnitude]`.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, max_magnitude: f64) -> Self {
        let theta = rng.random_range(0.0..FULL_TURN);
        let magnitude = if max_magnitude > 0.0 {
            rng.random_range(0.0..=max_magnitude)
        } else {
            0.0
        };
        Self::new(theta.cos() * magnitude, theta.sin() * magnitude)
    }

    /// Arithmetic mean of a set of vectors, `None` when empty.
    #[must_use]
    pub fn mean<I>(vectors: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        let mut count = 0usize;
        let mut sum = Self::zero();
        for vector in vectors {
            sum = sum + vector;
            count += 1;
        }
        (count > 0).then(|| sum / count as f64)
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

impl Add for Vector {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vector {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Mul<Vector> for f64 {
    type Output = Vector;

    fn mul(self, rhs: Vector) -> Vector {
        rhs * self
    }
}

impl Div<f64> for Vector {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vector {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}
