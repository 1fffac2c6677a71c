use rapier::math::{Isometry, Real, Rotation, Vector};

/// Placement of a body in space: a position and a unit-quaternion orientation.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Pose {
    pub position: Vector<Real>,
    pub orientation: Rotation<Real>,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    pub fn identity() -> Self {
        Self {
            position: Vector::zeros(),
            orientation: Rotation::identity(),
        }
    }

    pub fn new(position: Vector<Real>, orientation: Rotation<Real>) -> Self {
        Self {
            position,
            orientation,
        }
        .renormalized()
    }

    pub fn from_translation(position: Vector<Real>) -> Self {
        Self {
            position,
            orientation: Rotation::identity(),
        }
    }

    /// Builds a pose from a position and XYZ Euler angles (in radians).
    pub fn from_euler(position: Vector<Real>, angles: Vector<Real>) -> Self {
        Self::new(
            position,
            Rotation::from_euler_angles(angles.x, angles.y, angles.z),
        )
    }

    /// Re-normalizes the orientation quaternion.
    ///
    /// Orientations composed from Euler angles or long chains of products slowly drift
    /// away from unit norm. The physics engine expects a unit quaternion.
    pub fn renormalized(self) -> Self {
        Self {
            position: self.position,
            orientation: Rotation::new_normalize(self.orientation.into_inner()),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|e| e.is_finite())
            && self.orientation.coords.iter().all(|e| e.is_finite())
    }

    pub fn isometry(&self) -> Isometry<Real> {
        Isometry::from_parts(self.position.into(), self.orientation)
    }
}

impl From<Isometry<Real>> for Pose {
    fn from(value: Isometry<Real>) -> Self {
        Self {
            position: value.translation.vector,
            orientation: value.rotation,
        }
    }
}

impl From<Pose> for Isometry<Real> {
    fn from(value: Pose) -> Self {
        value.isometry()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapier::na::vector;

    #[test]
    fn euler_poses_are_normalized() {
        let pose = Pose::from_euler(vector![1.0, 2.0, 3.0], vector![0.3, 0.7, 0.9]);
        assert!((pose.orientation.into_inner().norm() - 1.0).abs() < 1.0e-6);
        assert_eq!(pose.position, vector![1.0, 2.0, 3.0]);
    }

    #[test]
    fn isometry_conversion_preserves_the_pose() {
        let pose = Pose::from_euler(vector![-2.0, 3.0, 0.5], vector![0.0, 1.2, 0.0]);
        let back = Pose::from(pose.isometry());
        assert_eq!(back, pose);
    }

    #[test]
    fn non_finite_positions_are_detected() {
        let pose = Pose::from_translation(vector![Real::NAN, 0.0, 0.0]);
        assert!(!pose.is_finite());
        assert!(Pose::identity().is_finite());
    }
}
