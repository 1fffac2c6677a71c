//! Time-parameterized trajectories for kinematic bodies.
//!
//! A trajectory is a pure function of the elapsed simulation time. It owns no mutable
//! state, so rewinding, pausing or evaluating the same instant twice always yields the
//! same pose.

use crate::error::{DriverError, DriverResult};
use crate::pose::Pose;
use rapier::math::{AngVector, Real, Rotation, Vector};
use rapier::na::vector;
use std::ops::{Add, Mul};

/// Maps an elapsed simulation time to a pose.
pub trait TrajectoryFunction: Send + Sync {
    fn evaluate(&self, elapsed: Real) -> Pose;
}

impl<T: TrajectoryFunction + ?Sized> TrajectoryFunction for Box<T> {
    fn evaluate(&self, elapsed: Real) -> Pose {
        (**self).evaluate(elapsed)
    }
}

// NaN and infinities are clamped to the time origin so the produced pose stays finite.
fn sanitize_time(elapsed: Real, origin: Real) -> Real {
    if elapsed.is_finite() {
        elapsed
    } else {
        origin
    }
}

/// A body spinning around the vertical axis while orbiting the origin on a horizontal
/// circle.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OrbitTrajectory {
    pub radius: Real,
    pub height: Real,
    /// Yaw rate, in radians per second.
    pub spin_speed: Real,
    /// Angular speed along the orbit, in radians per second.
    pub orbit_speed: Real,
}

impl OrbitTrajectory {
    pub fn new(
        radius: Real,
        height: Real,
        spin_speed: Real,
        orbit_speed: Real,
    ) -> DriverResult<Self> {
        let result = Self {
            radius,
            height,
            spin_speed,
            orbit_speed,
        };
        result.validate()?;
        Ok(result)
    }

    pub fn validate(&self) -> DriverResult<()> {
        if ![self.radius, self.height, self.spin_speed, self.orbit_speed]
            .iter()
            .all(|e| e.is_finite())
        {
            return Err(DriverError::configuration(
                "orbit trajectory parameters must be finite",
            ));
        }

        if self.radius < 0.0 {
            return Err(DriverError::configuration(format!(
                "orbit radius must be non-negative, got {}",
                self.radius
            )));
        }

        Ok(())
    }

    /// Time needed to complete one full orbit, or `None` if the body does not orbit.
    pub fn period(&self) -> Option<Real> {
        if self.orbit_speed == 0.0 {
            None
        } else {
            Some(std::f32::consts::TAU / self.orbit_speed.abs())
        }
    }
}

impl TrajectoryFunction for OrbitTrajectory {
    fn evaluate(&self, elapsed: Real) -> Pose {
        let t = sanitize_time(elapsed, 0.0);
        let yaw = t * self.spin_speed;
        let orientation = Rotation::from_axis_angle(&Vector::y_axis(), yaw);

        let angle = t * self.orbit_speed;
        let (sin, cos) = angle.sin_cos();
        let position = vector![sin * self.radius, self.height, cos * self.radius];

        Pose::new(position, orientation)
    }
}

/// Piecewise-linear interpolation between evenly spaced control points.
///
/// Once `total_time` has elapsed, the curve either holds its last control point or,
/// with `loop_back`, runs backward to the first one and keeps ping-ponging.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct KinematicCurve<T> {
    pub control_points: Vec<T>,
    pub t0: Real,
    pub total_time: Real,
    pub loop_back: bool,
}

impl<T> KinematicCurve<T> {
    pub fn new(
        control_points: Vec<T>,
        t0: Real,
        total_time: Real,
        loop_back: bool,
    ) -> DriverResult<Self> {
        let result = Self {
            control_points,
            t0,
            total_time,
            loop_back,
        };
        result.validate()?;
        Ok(result)
    }

    pub fn validate(&self) -> DriverResult<()> {
        if self.control_points.is_empty() {
            return Err(DriverError::configuration(
                "a kinematic curve needs at least one control point",
            ));
        }

        if !self.t0.is_finite() || !self.total_time.is_finite() || self.total_time <= 0.0 {
            return Err(DriverError::configuration(format!(
                "invalid kinematic curve timing: t0 = {}, total time = {}",
                self.t0, self.total_time
            )));
        }

        Ok(())
    }

    /// Evaluates the curve at time `t`, or returns `None` if it has no control point.
    ///
    /// A curve with invalid timing holds its first control point.
    pub fn eval(&self, t: Real) -> Option<T>
    where
        T: Copy + Mul<Real, Output = T> + Add<T, Output = T>,
    {
        let first = *self.control_points.first()?;
        let valid_timing =
            self.t0.is_finite() && self.total_time.is_finite() && self.total_time > 0.0;

        if !valid_timing || self.control_points.len() == 1 {
            return Some(first);
        }

        let t = sanitize_time(t, self.t0);
        if t <= self.t0 {
            return Some(first);
        }

        let t = t - self.t0;
        if t >= self.total_time && !self.loop_back {
            return self.control_points.last().copied();
        }

        let loop_id = (t / self.total_time).floor() as i64;
        let phase = (t / self.total_time).fract() * self.total_time;
        let rel_t = if loop_id % 2 == 1 {
            self.total_time - phase
        } else {
            phase
        };

        let num_slices = self.control_points.len() - 1;
        let time_slice = self.total_time / num_slices as Real;
        let curr_time_slice = ((rel_t / time_slice).floor() as usize).min(num_slices - 1);
        let rel_slice_t = (rel_t - curr_time_slice as Real * time_slice) / time_slice;

        Some(
            self.control_points[curr_time_slice] * (1.0 - rel_slice_t)
                + self.control_points[curr_time_slice + 1] * rel_slice_t,
        )
    }
}

/// Keyframed motion relative to a base pose.
///
/// The linear curve, when present, replaces the base translation. The angular curve,
/// when present, replaces the base orientation with the rotation of the given scaled
/// axis.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct KeyframeTrajectory {
    pub base: Pose,
    pub linear: Option<KinematicCurve<Vector<Real>>>,
    pub angular: Option<KinematicCurve<AngVector<Real>>>,
}

impl KeyframeTrajectory {
    pub fn new(
        base: Pose,
        linear: Option<KinematicCurve<Vector<Real>>>,
        angular: Option<KinematicCurve<AngVector<Real>>>,
    ) -> DriverResult<Self> {
        if let Some(linear) = &linear {
            linear.validate()?;
        }
        if let Some(angular) = &angular {
            angular.validate()?;
        }

        Ok(Self {
            base,
            linear,
            angular,
        })
    }
}

impl TrajectoryFunction for KeyframeTrajectory {
    fn evaluate(&self, elapsed: Real) -> Pose {
        let mut result = self.base;

        if let Some(position) = self.linear.as_ref().and_then(|c| c.eval(elapsed)) {
            result.position = position;
        }

        if let Some(axisangle) = self.angular.as_ref().and_then(|c| c.eval(elapsed)) {
            result.orientation = Rotation::new(axisangle);
        }

        // Non-finite control points or base pose fall back to something the engine accepts.
        [result.renormalized(), self.base.renormalized()]
            .into_iter()
            .find(Pose::is_finite)
            .unwrap_or_else(Pose::identity)
    }
}
