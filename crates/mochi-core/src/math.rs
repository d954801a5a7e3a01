use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// A 3D vector in world units. Y is up; the XZ plane is the ground plane.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Length of the projection onto the XZ plane.
    pub fn length_xz(self) -> f32 {
        (self.x * self.x + self.z * self.z).sqrt()
    }

    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    /// Horizontal distance between two points, ignoring height.
    pub fn distance_xz(self, other: Self) -> f32 {
        (self - other).length_xz()
    }

    /// Unit vector in the same direction, or `None` for a (near) zero vector.
    pub fn try_normalize(self) -> Option<Self> {
        let len = self.length();
        if len > 1e-6 { Some(self * (1.0 / len)) } else { None }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl SubAssign for Vec3 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizontal_distance_ignores_height() {
        let a = Vec3::new(0.0, 5.0, 0.0);
        let b = Vec3::new(3.0, -2.0, 4.0);
        assert!((a.distance_xz(b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn normalize_zero_is_none() {
        assert!(Vec3::ZERO.try_normalize().is_none());
        let n = Vec3::new(0.0, 2.0, 0.0).try_normalize().unwrap();
        assert_eq!(n, Vec3::Y);
    }

    #[test]
    fn arithmetic_ops() {
        let mut v = Vec3::new(1.0, 2.0, 3.0);
        v += Vec3::new(1.0, 1.0, 1.0);
        assert_eq!(v, Vec3::new(2.0, 3.0, 4.0));
        v -= Vec3::new(2.0, 3.0, 4.0);
        assert_eq!(v, Vec3::ZERO);
        assert_eq!(-Vec3::Y * 2.0, Vec3::new(0.0, -2.0, 0.0));
    }

    #[test]
    fn finiteness() {
        assert!(Vec3::new(1.0, -2.0, 3.0).is_finite());
        assert!(!Vec3::new(0.0, f32::NAN, 0.0).is_finite());
        assert!(!Vec3::new(f32::NEG_INFINITY, 0.0, 0.0).is_finite());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_vec() -> impl Strategy<Value = Vec3> {
            (-100.0f32..100.0, -100.0f32..100.0, -100.0f32..100.0)
                .prop_map(|(x, y, z)| Vec3::new(x, y, z))
        }

        proptest! {
            #[test]
            fn distance_is_symmetric_and_bounds_xz(a in arb_vec(), b in arb_vec()) {
                prop_assert!((a.distance(b) - b.distance(a)).abs() < 1e-3);
                prop_assert!(a.distance_xz(b) <= a.distance(b) + 1e-3);
                prop_assert!(a.distance_xz(b) >= 0.0);
            }

            #[test]
            fn normalized_vectors_have_unit_length(v in arb_vec()) {
                if let Some(n) = v.try_normalize() {
                    prop_assert!((n.length() - 1.0).abs() < 1e-4);
                    prop_assert!(n.dot(v) >= 0.0);
                } else {
                    prop_assert!(v.length() <= 1e-6);
                }
            }

            #[test]
            fn add_then_sub_restores(a in arb_vec(), b in arb_vec()) {
                let back = (a + b) - b;
                prop_assert!(back.distance(a) < 1e-3);
            }
        }
    }
}
