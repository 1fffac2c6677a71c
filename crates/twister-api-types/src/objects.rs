use crate::error::{DriverError, DriverResult};
use crate::pose::Pose;
use rapier::dynamics::{RigidBodyBuilder, RigidBodyType};
use rapier::geometry::{ColliderBuilder, SharedShape};
use rapier::math::{Real, Vector};
use strum_macros::{Display, EnumIter};
use uuid::Uuid;

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, Display, EnumIter, serde::Serialize,
    serde::Deserialize,
)]
#[strum(serialize_all = "lowercase")]
pub enum BodyKind {
    /// Simulated: affected by gravity, forces, and contacts.
    Dynamic,
    /// Pose driven from the outside every tick. Pushes dynamic bodies around.
    Kinematic,
    /// Immovable collision geometry.
    Fixed,
}

impl From<BodyKind> for RigidBodyType {
    fn from(value: BodyKind) -> Self {
        match value {
            BodyKind::Dynamic => RigidBodyType::Dynamic,
            BodyKind::Kinematic => RigidBodyType::KinematicPositionBased,
            BodyKind::Fixed => RigidBodyType::Fixed,
        }
    }
}

impl From<RigidBodyType> for BodyKind {
    fn from(value: RigidBodyType) -> Self {
        match value {
            RigidBodyType::Dynamic => BodyKind::Dynamic,
            RigidBodyType::KinematicPositionBased | RigidBodyType::KinematicVelocityBased => {
                BodyKind::Kinematic
            }
            RigidBodyType::Fixed => BodyKind::Fixed,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ShapeDesc {
    Ball { radius: Real },
    Cuboid { half_extents: Vector<Real> },
    /// Cylinder aligned with the local `y` axis.
    Cylinder { half_height: Real, radius: Real },
    /// Capsule aligned with the local `y` axis.
    Capsule { half_height: Real, radius: Real },
    /// Several non-compound shapes rigidly attached together.
    Compound { parts: Vec<(Pose, ShapeDesc)> },
}

fn check_positive(name: &str, value: Real) -> DriverResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(DriverError::configuration(format!(
            "{name} must be positive and finite, got {value}"
        )))
    }
}

impl ShapeDesc {
    pub fn ball(radius: Real) -> Self {
        Self::Ball { radius }
    }

    pub fn cuboid(hx: Real, hy: Real, hz: Real) -> Self {
        Self::Cuboid {
            half_extents: Vector::new(hx, hy, hz),
        }
    }

    pub fn validate(&self) -> DriverResult<()> {
        match self {
            Self::Ball { radius } => check_positive("ball radius", *radius),
            Self::Cuboid { half_extents } => half_extents
                .iter()
                .try_for_each(|e| check_positive("cuboid half-extent", *e)),
            Self::Cylinder {
                half_height,
                radius,
            } => {
                check_positive("cylinder half-height", *half_height)?;
                check_positive("cylinder radius", *radius)
            }
            Self::Capsule {
                half_height,
                radius,
            } => {
                check_positive("capsule half-height", *half_height)?;
                check_positive("capsule radius", *radius)
            }
            Self::Compound { parts } => {
                if parts.is_empty() {
                    return Err(DriverError::configuration("compound shape without parts"));
                }

                for (pose, part) in parts {
                    if matches!(part, Self::Compound { .. }) {
                        return Err(DriverError::configuration(
                            "compound shapes cannot be nested",
                        ));
                    }
                    if !pose.is_finite() {
                        return Err(DriverError::configuration(
                            "compound part pose must be finite",
                        ));
                    }
                    part.validate()?;
                }

                Ok(())
            }
        }
    }

    /// The same shape uniformly scaled by `scale`.
    pub fn scaled(&self, scale: Real) -> Self {
        match self {
            Self::Ball { radius } => Self::Ball {
                radius: radius * scale,
            },
            Self::Cuboid { half_extents } => Self::Cuboid {
                half_extents: half_extents * scale,
            },
            Self::Cylinder {
                half_height,
                radius,
            } => Self::Cylinder {
                half_height: half_height * scale,
                radius: radius * scale,
            },
            Self::Capsule {
                half_height,
                radius,
            } => Self::Capsule {
                half_height: half_height * scale,
                radius: radius * scale,
            },
            Self::Compound { parts } => Self::Compound {
                parts: parts
                    .iter()
                    .map(|(pose, part)| {
                        let pose = Pose {
                            position: pose.position * scale,
                            orientation: pose.orientation,
                        };
                        (pose, part.scaled(scale))
                    })
                    .collect(),
            },
        }
    }

    pub fn shared_shape(&self) -> SharedShape {
        match self {
            Self::Ball { radius } => SharedShape::ball(*radius),
            Self::Cuboid { half_extents } => {
                SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
            Self::Cylinder {
                half_height,
                radius,
            } => SharedShape::cylinder(*half_height, *radius),
            Self::Capsule {
                half_height,
                radius,
            } => SharedShape::capsule_y(*half_height, *radius),
            Self::Compound { parts } => SharedShape::compound(
                parts
                    .iter()
                    .map(|(pose, part)| (pose.isometry(), part.shared_shape()))
                    .collect(),
            ),
        }
    }
}

/// A collider attached to a body, expressed in the body's local frame.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ColliderDesc {
    pub shape: ShapeDesc,
    pub offset: Pose,
    /// Explicit mass. Takes precedence over `density`.
    pub mass: Option<Real>,
    pub density: Real,
    pub friction: Real,
    pub restitution: Real,
}

impl ColliderDesc {
    pub fn new(shape: ShapeDesc) -> Self {
        Self {
            shape,
            offset: Pose::identity(),
            mass: None,
            density: 1.0,
            friction: 0.5,
            restitution: 0.0,
        }
    }

    pub fn offset(mut self, offset: Vector<Real>) -> Self {
        self.offset = Pose::from_translation(offset);
        self
    }

    pub fn mass(mut self, mass: Real) -> Self {
        self.mass = Some(mass);
        self
    }

    pub fn friction(mut self, friction: Real) -> Self {
        self.friction = friction;
        self
    }

    pub fn restitution(mut self, restitution: Real) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn validate(&self) -> DriverResult<()> {
        self.shape.validate()?;

        if !self.offset.is_finite() {
            return Err(DriverError::configuration("collider offset must be finite"));
        }

        if let Some(mass) = self.mass {
            if !mass.is_finite() || mass < 0.0 {
                return Err(DriverError::configuration(format!(
                    "collider mass must be non-negative, got {mass}"
                )));
            }
        }

        for (name, value) in [
            ("density", self.density),
            ("friction", self.friction),
            ("restitution", self.restitution),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(DriverError::configuration(format!(
                    "collider {name} must be non-negative, got {value}"
                )));
            }
        }

        Ok(())
    }

    pub fn builder(&self) -> ColliderBuilder {
        let builder = ColliderBuilder::new(self.shape.shared_shape())
            .position(self.offset.isometry())
            .friction(self.friction)
            .restitution(self.restitution);

        match self.mass {
            Some(mass) => builder.mass(mass),
            None => builder.density(self.density),
        }
    }
}

/// Everything the physics engine needs to register one rigid body.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub pose: Pose,
    pub colliders: Vec<ColliderDesc>,
    pub gravity_scale: Real,
    pub can_sleep: bool,
    pub ccd: bool,
}

impl BodyDesc {
    pub fn new(kind: BodyKind, pose: Pose) -> Self {
        Self {
            kind,
            pose,
            colliders: vec![],
            gravity_scale: 1.0,
            can_sleep: true,
            ccd: false,
        }
    }

    pub fn dynamic(pose: Pose) -> Self {
        Self::new(BodyKind::Dynamic, pose)
    }

    pub fn kinematic(pose: Pose) -> Self {
        Self::new(BodyKind::Kinematic, pose)
    }

    pub fn fixed(pose: Pose) -> Self {
        Self::new(BodyKind::Fixed, pose)
    }

    pub fn collider(mut self, collider: ColliderDesc) -> Self {
        self.colliders.push(collider);
        self
    }

    pub fn gravity_scale(mut self, gravity_scale: Real) -> Self {
        self.gravity_scale = gravity_scale;
        self
    }

    pub fn can_sleep(mut self, can_sleep: bool) -> Self {
        self.can_sleep = can_sleep;
        self
    }

    pub fn validate(&self) -> DriverResult<()> {
        if !self.pose.is_finite() {
            return Err(DriverError::configuration("body pose must be finite"));
        }

        if !self.gravity_scale.is_finite() {
            return Err(DriverError::configuration("gravity scale must be finite"));
        }

        if self.kind == BodyKind::Dynamic && self.colliders.is_empty() {
            return Err(DriverError::configuration(
                "a dynamic body needs at least one collider to get a mass",
            ));
        }

        self.colliders.iter().try_for_each(|c| c.validate())
    }

    pub fn builder(&self) -> RigidBodyBuilder {
        RigidBodyBuilder::new(self.kind.into())
            .position(self.pose.isometry())
            .gravity_scale(self.gravity_scale)
            .can_sleep(self.can_sleep)
            .ccd_enabled(self.ccd)
    }
}

/// Pose of one body, as handed to the render front-end.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BodyPoseObject {
    pub name: String,
    /// Rendering batch shared by instanced bodies.
    pub batch: Option<Uuid>,
    pub instance: Option<usize>,
    pub pose: Pose,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PoseFrame {
    pub timestamp: u64,
    pub elapsed: Real,
    pub objects: Vec<BodyPoseObject>,
}
