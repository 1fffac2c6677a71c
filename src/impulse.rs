//! Click-to-jump: mass-normalized impulses on dynamic bodies.

use crate::physics::PhysicsEngine;
use crate::rapier::dynamics::RigidBodyHandle;
use crate::rapier::math::{AngVector, Real, Vector};
use twister_api_types::objects::BodyKind;
use twister_api_types::{DriverError, DriverResult};

/// The impulses actually submitted for one request.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ImpulseRequest {
    pub body: RigidBodyHandle,
    pub linear: Vector<Real>,
    pub angular: AngVector<Real>,
}

/// Turns discrete user actions into impulses scaled by the target's mass, so that
/// every body jumps to the same height whatever it weighs.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ImpulseController {
    pub linear_factor: Real,
    pub angular_factor: Real,
}

impl Default for ImpulseController {
    fn default() -> Self {
        Self {
            linear_factor: 5.0,
            angular_factor: 0.5,
        }
    }
}

impl ImpulseController {
    pub fn new(linear_factor: Real, angular_factor: Real) -> Self {
        Self {
            linear_factor,
            angular_factor,
        }
    }

    /// Computes the jump impulses for `body` from its current mass.
    pub fn jump_request(
        &self,
        engine: &impl PhysicsEngine,
        body: RigidBodyHandle,
    ) -> DriverResult<ImpulseRequest> {
        let kind = engine.body_kind(body)?;
        if kind != BodyKind::Dynamic {
            return Err(DriverError::InvalidBodyKind {
                handle: body,
                expected: BodyKind::Dynamic,
                actual: kind,
            });
        }

        let mass = engine.mass(body)?;
        Ok(ImpulseRequest {
            body,
            linear: Vector::y() * (self.linear_factor * mass),
            angular: AngVector::y() * (self.angular_factor * mass),
        })
    }

    /// Makes `body` jump. Stale handles fail with `BodyNotFound` and touch nothing.
    pub fn apply_jump_impulse(
        &self,
        engine: &mut impl PhysicsEngine,
        body: RigidBodyHandle,
    ) -> DriverResult<ImpulseRequest> {
        let request = self.jump_request(&*engine, body)?;
        engine.apply_impulses(body, request.linear, request.angular)?;
        log::debug!(
            "Jump impulse {:?} on {:?}.",
            request.linear.y,
            request.body
        );
        Ok(request)
    }
}
