//! Drives kinematic bodies along their trajectories.

use crate::physics::PhysicsEngine;
use crate::rapier::dynamics::RigidBodyHandle;
use crate::rapier::math::Real;
use twister_api_types::kinematic::TrajectoryFunction;
use twister_api_types::objects::BodyKind;
use twister_api_types::{DriverError, DriverResult};

pub struct KinematicActuator {
    body: RigidBodyHandle,
    trajectory: Box<dyn TrajectoryFunction>,
}

impl KinematicActuator {
    /// Attaches `trajectory` to `body`, which must be a kinematic body.
    pub fn new(
        engine: &impl PhysicsEngine,
        body: RigidBodyHandle,
        trajectory: impl TrajectoryFunction + 'static,
    ) -> DriverResult<Self> {
        let kind = engine.body_kind(body)?;
        if kind != BodyKind::Kinematic {
            return Err(DriverError::InvalidBodyKind {
                handle: body,
                expected: BodyKind::Kinematic,
                actual: kind,
            });
        }

        Ok(Self {
            body,
            trajectory: Box::new(trajectory),
        })
    }

    pub fn body(&self) -> RigidBodyHandle {
        self.body
    }

    /// Submits the pose the body must reach at `elapsed`, the end of the upcoming step.
    ///
    /// Must run before the engine step. Calling it twice for the same step simply
    /// overwrites the previous target.
    pub fn tick(&self, engine: &mut impl PhysicsEngine, elapsed: Real) -> DriverResult<()> {
        let pose = self.trajectory.evaluate(elapsed);
        engine.set_next_kinematic_pose(self.body, &pose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::PhysicsWorld;
    use crate::na::vector;
    use twister_api_types::kinematic::OrbitTrajectory;
    use twister_api_types::objects::{BodyDesc, ColliderDesc, ShapeDesc};
    use twister_api_types::pose::Pose;

    fn twister_desc(orbit: &OrbitTrajectory) -> BodyDesc {
        let collider = ColliderDesc::new(ShapeDesc::cuboid(0.2, 0.2, 1.5));
        BodyDesc::kinematic(orbit.evaluate(0.0)).collider(collider.friction(0.0))
    }

    #[test]
    fn rejects_non_kinematic_bodies() {
        let mut world = PhysicsWorld::new(vector![0.0, -9.81, 0.0], 1.0 / 60.0);
        let orbit = OrbitTrajectory::new(2.0, -0.8, 3.0, 0.5).unwrap();
        let ball = ColliderDesc::new(ShapeDesc::ball(0.5));
        let dynamic = BodyDesc::dynamic(Pose::identity()).collider(ball.clone());
        let fixed = BodyDesc::fixed(Pose::identity()).collider(ball);
        let dynamic = world.insert_body(&dynamic).unwrap();
        let fixed = world.insert_body(&fixed).unwrap();

        for (handle, kind) in [(dynamic, BodyKind::Dynamic), (fixed, BodyKind::Fixed)] {
            match KinematicActuator::new(&world, handle, orbit) {
                Err(DriverError::InvalidBodyKind { actual, .. }) => assert_eq!(actual, kind),
                _ => panic!("expected an InvalidBodyKind error"),
            }
        }

        world.remove_body(dynamic).unwrap();
        assert!(matches!(
            KinematicActuator::new(&world, dynamic, orbit),
            Err(DriverError::BodyNotFound(_))
        ));
    }

    #[test]
    fn follows_the_orbit_step_after_step() {
        let mut world = PhysicsWorld::new(vector![0.0, -9.81, 0.0], 1.0 / 60.0);
        let orbit = OrbitTrajectory::new(2.0, -0.8, 3.0, 0.5).unwrap();
        let handle = world.insert_body(&twister_desc(&orbit)).unwrap();
        let actuator = KinematicActuator::new(&world, handle, orbit).unwrap();

        let start = world.pose(handle).unwrap();
        assert!((start.position - vector![0.0, -0.8, 2.0]).norm() < 1.0e-5);

        let dt = world.timestep();
        for step in 1..=90 {
            let t = step as Real * dt;
            actuator.tick(&mut world, t).unwrap();
            world.step();

            let expected = orbit.evaluate(t);
            let pose = world.pose(handle).unwrap();
            assert!((pose.position - expected.position).norm() < 1.0e-3);
            assert!(pose.orientation.angle_to(&expected.orientation) < 1.0e-3);
        }
    }

    #[test]
    fn later_targets_overwrite_earlier_ones() {
        let mut world = PhysicsWorld::new(vector![0.0, -9.81, 0.0], 1.0 / 60.0);
        let orbit = OrbitTrajectory::new(2.0, -0.8, 3.0, 0.5).unwrap();
        let handle = world.insert_body(&twister_desc(&orbit)).unwrap();
        let actuator = KinematicActuator::new(&world, handle, orbit).unwrap();

        actuator.tick(&mut world, 5.0).unwrap();
        actuator.tick(&mut world, 0.5).unwrap();
        world.step();

        let pose = world.pose(handle).unwrap();
        let expected = orbit.evaluate(0.5);
        assert!((pose.position - expected.position).norm() < 1.0e-3);
    }

    #[test]
    fn ticking_a_removed_body_is_not_found() {
        let mut world = PhysicsWorld::new(vector![0.0, -9.81, 0.0], 1.0 / 60.0);
        let orbit = OrbitTrajectory::new(2.0, -0.8, 3.0, 0.5).unwrap();
        let handle = world.insert_body(&twister_desc(&orbit)).unwrap();
        let actuator = KinematicActuator::new(&world, handle, orbit).unwrap();

        world.remove_body(handle).unwrap();
        assert_eq!(
            actuator.tick(&mut world, 1.0),
            Err(DriverError::BodyNotFound(handle))
        );
    }
}
