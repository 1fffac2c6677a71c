//! Error taxonomy shared by the driver components.

use crate::objects::BodyKind;
use rapier::dynamics::RigidBodyHandle;
use thiserror::Error;

/// Errors raised while building a scene or while driving it tick after tick.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum DriverError {
    /// A body, shape, or scene parameter is invalid. Fails the setup.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A component was attached to a body of the wrong kind.
    #[error("body {handle:?} is {actual}, expected {expected}")]
    InvalidBodyKind {
        /// The offending body.
        handle: RigidBodyHandle,
        /// The kind the component requires.
        expected: BodyKind,
        /// The kind the body actually has.
        actual: BodyKind,
    },

    /// The handle refers to a body that was removed from the physics engine.
    #[error("body {0:?} is not registered with the physics engine")]
    BodyNotFound(RigidBodyHandle),

    /// An audio or asset resource could not be loaded.
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),
}

impl DriverError {
    /// Creates a configuration error from anything printable.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Returns `true` if the simulation loop may skip the failed effect and carry on.
    ///
    /// Configuration errors and kind mismatches are setup-time failures; stale handles
    /// and missing resources only ever degrade a single effect.
    pub fn recoverable(&self) -> bool {
        matches!(self, Self::BodyNotFound(_) | Self::ResourceUnavailable(_))
    }
}

pub type DriverResult<T> = Result<T, DriverError>;
