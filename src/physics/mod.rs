//! The seam between the driver and the physics engine.
//!
//! Bodies are owned by the engine. Everything else only keeps [`RigidBodyHandle`]s,
//! which become stale once the body is removed.

use crate::rapier::dynamics::RigidBodyHandle;
use crate::rapier::math::{AngVector, Real, Vector};
use twister_api_types::objects::{BodyDesc, BodyKind};
use twister_api_types::pose::Pose;
use twister_api_types::{DriverError, DriverResult};

pub use self::world::PhysicsWorld;

mod world;

/// A change of contact status between two distinct bodies, reported by a step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ContactEvent {
    pub body1: RigidBodyHandle,
    pub body2: RigidBodyHandle,
    /// `true` when the bodies started touching, `false` when they separated.
    pub started: bool,
}

pub trait PhysicsEngine {
    /// Validates and registers a body with all its colliders.
    fn insert_body(&mut self, desc: &BodyDesc) -> DriverResult<RigidBodyHandle>;
    fn remove_body(&mut self, handle: RigidBodyHandle) -> DriverResult<()>;
    fn contains(&self, handle: RigidBodyHandle) -> bool;

    fn body_kind(&self, handle: RigidBodyHandle) -> DriverResult<BodyKind>;
    fn pose(&self, handle: RigidBodyHandle) -> DriverResult<Pose>;
    fn mass(&self, handle: RigidBodyHandle) -> DriverResult<Real>;

    /// Sets the pose a kinematic body must reach at the end of the next step.
    fn set_next_kinematic_pose(&mut self, handle: RigidBodyHandle, pose: &Pose)
        -> DriverResult<()>;
    fn apply_impulse(&mut self, handle: RigidBodyHandle, impulse: Vector<Real>)
        -> DriverResult<()>;
    fn apply_torque_impulse(
        &mut self,
        handle: RigidBodyHandle,
        torque_impulse: AngVector<Real>,
    ) -> DriverResult<()>;

    /// Applies a linear and an angular impulse together: either both land or neither.
    fn apply_impulses(
        &mut self,
        handle: RigidBodyHandle,
        impulse: Vector<Real>,
        torque_impulse: AngVector<Real>,
    ) -> DriverResult<()> {
        if !self.contains(handle) {
            return Err(DriverError::BodyNotFound(handle));
        }

        self.apply_impulse(handle, impulse)?;
        self.apply_torque_impulse(handle, torque_impulse)
    }

    /// Makes contacts involving this body show up in the events returned by `step`.
    fn enable_collision_events(&mut self, handle: RigidBodyHandle) -> DriverResult<()>;

    /// Integrates every body by one timestep and returns the contact changes it caused.
    fn step(&mut self) -> Vec<ContactEvent>;
    fn timestep(&self) -> Real;
}
