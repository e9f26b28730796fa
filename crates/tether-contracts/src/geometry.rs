//! Minimal 3-D geometry for containment testing.
//!
//! The world uses a Y-up frame, so the "planar" extent of a volume is the
//! larger of its X and Z sizes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };
    pub const X: Vec3 = Vec3 { x: 1.0, y: 0.0, z: 0.0 };
    pub const Y: Vec3 = Vec3 { x: 0.0, y: 1.0, z: 0.0 };
    pub const Z: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 1.0 };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn distance(self, other: Vec3) -> f64 {
        (self - other).length()
    }

    /// The larger of the X and Z components.
    pub fn planar_max(self) -> f64 {
        self.x.abs().max(self.z.abs())
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

/// An oriented bounding box: a center, three orthonormal axes, and the half
/// size along each of them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientedBox {
    pub center: Vec3,
    /// Local X, Y, Z axes expressed in world space. Must be orthonormal.
    pub axes: [Vec3; 3],
    pub half_extents: Vec3,
}

impl OrientedBox {
    pub fn axis_aligned(center: Vec3, half_extents: Vec3) -> Self {
        Self { center, axes: [Vec3::X, Vec3::Y, Vec3::Z], half_extents }
    }

    /// A box rotated about the world Y axis by `yaw` radians.
    pub fn with_yaw(center: Vec3, half_extents: Vec3, yaw: f64) -> Self {
        let (sin, cos) = yaw.sin_cos();
        Self {
            center,
            axes: [Vec3::new(cos, 0.0, -sin), Vec3::Y, Vec3::new(sin, 0.0, cos)],
            half_extents,
        }
    }

    /// Express `point` in the box's local frame.
    pub fn to_local(&self, point: Vec3) -> Vec3 {
        let d = point - self.center;
        Vec3::new(d.dot(self.axes[0]), d.dot(self.axes[1]), d.dot(self.axes[2]))
    }

    /// True when `point` lies inside or on the surface of the box.
    pub fn contains(&self, point: Vec3) -> bool {
        let local = self.to_local(point);
        local.x.abs() <= self.half_extents.x
            && local.y.abs() <= self.half_extents.y
            && local.z.abs() <= self.half_extents.z
    }
}

/// The volume a containment query tests candidates against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ReferenceVolume {
    /// Precise geometry.
    Oriented(OrientedBox),
    /// Generous fallback when no precise volume is known.
    Radius { center: Vec3, radius: f64 },
}

impl ReferenceVolume {
    pub fn contains(&self, point: Vec3) -> bool {
        match self {
            ReferenceVolume::Oriented(obb) => obb.contains(point),
            ReferenceVolume::Radius { center, radius } => center.distance(point) <= *radius,
        }
    }
}
