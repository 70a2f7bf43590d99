//! 2D vector arithmetic

use std::ops::{Add, AddAssign, Mul, MulAssign, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// A 2D vector with `f64` components
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}

impl Vector {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub const fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    /// The vector (1, 1)
    pub const fn identity() -> Self {
        Self::new(1.0, 1.0)
    }

    pub const fn x_axis() -> Self {
        Self::new(1.0, 0.0)
    }

    pub const fn y_axis() -> Self {
        Self::new(0.0, 1.0)
    }

    /// Builds a vector from its length and its angle in radians
    pub fn from_magnitude_and_angle(magnitude: f64, angle: f64) -> Self {
        Self::new(angle.cos() * magnitude, angle.sin() * magnitude)
    }

    /// Length of the vector
    pub fn magnitude(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Scales the vector to the given length, keeping its direction.
    ///
    /// A zero vector has no direction and is left unchanged.
    pub fn set_magnitude(&mut self, magnitude: f64) {
        let current = self.magnitude();
        if current == 0.0 {
            return;
        }
        self.x *= magnitude / current;
        self.y *= magnitude / current;
    }

    /// Angle with the x axis, in `-PI..=PI`
    pub fn angle(&self) -> f64 {
        self.y.atan2(self.x)
    }

    /// Rotates the vector to the given angle, keeping its length
    pub fn set_angle(&mut self, angle: f64) {
        *self = Self::from_magnitude_and_angle(self.magnitude(), angle);
    }

    /// Component-wise product
    pub fn component_mul(self, other: Self) -> Self {
        Self::new(self.x * other.x, self.y * other.y)
    }

    /// Scalar dot product
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
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

    fn mul(self, scalar: f64) -> Self {
        Self::new(self.x * scalar, self.y * scalar)
    }
}

impl AddAssign for Vector {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Vector {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl MulAssign<f64> for Vector {
    fn mul_assign(&mut self, scalar: f64) {
        *self = *self * scalar;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    const EPSILON: f64 = 1e-9;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < EPSILON, "{} != {}", a, b);
    }

    #[test]
    fn test_constants() {
        assert_eq!(Vector::zero(), Vector::new(0.0, 0.0));
        assert_eq!(Vector::identity(), Vector::new(1.0, 1.0));
        assert_eq!(Vector::x_axis() + Vector::y_axis(), Vector::identity());
    }

    #[test]
    fn test_magnitude_and_angle() {
        let v = Vector::new(3.0, 4.0);
        assert_close(v.magnitude(), 5.0);
        assert_close(Vector::y_axis().angle(), FRAC_PI_2);
        assert_close(Vector::new(-1.0, 0.0).angle(), PI);
    }

    #[test]
    fn test_from_magnitude_and_angle() {
        let v = Vector::from_magnitude_and_angle(2.0, FRAC_PI_2);
        assert_close(v.x, 0.0);
        assert_close(v.y, 2.0);
    }

    #[test]
    fn test_set_magnitude_keeps_direction() {
        let mut v = Vector::new(3.0, 4.0);
        v.set_magnitude(10.0);
        assert_close(v.x, 6.0);
        assert_close(v.y, 8.0);
    }

    #[test]
    fn test_set_magnitude_on_zero_vector_is_noop() {
        let mut v = Vector::zero();
        v.set_magnitude(5.0);
        assert_eq!(v, Vector::zero());
    }

    #[test]
    fn test_set_angle_keeps_length() {
        let mut v = Vector::new(0.0, 2.0);
        v.set_angle(0.0);
        assert_close(v.x, 2.0);
        assert_close(v.y, 0.0);
    }

    #[test]
    fn test_arithmetic() {
        let a = Vector::new(1.0, 2.0);
        let b = Vector::new(3.0, 5.0);

        assert_eq!(a + b, Vector::new(4.0, 7.0));
        assert_eq!(b - a, Vector::new(2.0, 3.0));
        assert_eq!(a * 3.0, Vector::new(3.0, 6.0));
        assert_eq!(a.component_mul(b), Vector::new(3.0, 10.0));
        assert_close(a.dot(b), 13.0);

        let mut c = a;
        c += b;
        c -= Vector::identity();
        c *= 2.0;
        assert_eq!(c, Vector::new(6.0, 12.0));
    }
}
