use super::{ContactEvent, PhysicsEngine};
use crate::rapier::crossbeam::channel::Receiver;
use crate::rapier::prelude::*;
use std::collections::HashMap;
use twister_api_types::objects::{BodyDesc, BodyKind};
use twister_api_types::pose::Pose;
use twister_api_types::{DriverError, DriverResult};

/// A complete rapier simulation: body/collider sets, pipeline, and event channels.
pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub params: IntegrationParameters,
    pub islands: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub impulse_joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    physics_pipeline: PhysicsPipeline,
    events: ChannelEventCollector,
    coll_events_rcv: Receiver<CollisionEvent>,
    force_events_rcv: Receiver<ContactForceEvent>,
    collider2body: HashMap<ColliderHandle, RigidBodyHandle>,
    // Colliders of removed bodies. Their `Stopped` events still arrive during the next
    // step, so the parent mapping is only dropped afterwards.
    removed_colliders: Vec<ColliderHandle>,
    step_id: u64,
}

impl PhysicsWorld {
    pub fn new(gravity: Vector<Real>, timestep: Real) -> Self {
        let (coll_events_snd, coll_events_rcv) = crate::rapier::crossbeam::channel::unbounded();
        let (force_events_snd, force_events_rcv) = crate::rapier::crossbeam::channel::unbounded();
        let events = ChannelEventCollector::new(coll_events_snd, force_events_snd);
        let mut params = IntegrationParameters::default();
        params.dt = timestep;

        Self {
            gravity,
            params,
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            physics_pipeline: PhysicsPipeline::new(),
            events,
            coll_events_rcv,
            force_events_rcv,
            collider2body: HashMap::new(),
            removed_colliders: vec![],
            step_id: 0,
        }
    }

    /// Number of steps integrated so far.
    pub fn step_id(&self) -> u64 {
        self.step_id
    }

    /// Simulated time, in seconds.
    pub fn elapsed(&self) -> Real {
        self.step_id as Real * self.params.dt
    }

    pub fn num_bodies(&self) -> usize {
        self.bodies.len()
    }

    pub fn linvel(&self, handle: RigidBodyHandle) -> DriverResult<Vector<Real>> {
        Ok(*self.body(handle)?.linvel())
    }

    pub fn angvel(&self, handle: RigidBodyHandle) -> DriverResult<AngVector<Real>> {
        Ok(*self.body(handle)?.angvel())
    }

    fn body(&self, handle: RigidBodyHandle) -> DriverResult<&RigidBody> {
        self.bodies
            .get(handle)
            .ok_or(DriverError::BodyNotFound(handle))
    }

    fn body_mut(&mut self, handle: RigidBodyHandle) -> DriverResult<&mut RigidBody> {
        self.bodies
            .get_mut(handle)
            .ok_or(DriverError::BodyNotFound(handle))
    }
}

impl PhysicsEngine for PhysicsWorld {
    fn insert_body(&mut self, desc: &BodyDesc) -> DriverResult<RigidBodyHandle> {
        desc.validate()?;

        let handle = self.bodies.insert(desc.builder());
        for collider in &desc.colliders {
            let builder = collider.builder();
            let co_handle = self
                .colliders
                .insert_with_parent(builder, handle, &mut self.bodies);
            self.collider2body.insert(co_handle, handle);
        }

        // Mass properties are otherwise only refreshed at the beginning of the next step.
        if let Some(rb) = self.bodies.get_mut(handle) {
            rb.recompute_mass_properties_from_colliders(&self.colliders);
        }

        Ok(handle)
    }

    fn remove_body(&mut self, handle: RigidBodyHandle) -> DriverResult<()> {
        let removed = self
            .bodies
            .remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .ok_or(DriverError::BodyNotFound(handle))?;
        self.removed_colliders
            .extend_from_slice(removed.colliders());
        Ok(())
    }

    fn contains(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.contains(handle)
    }

    fn body_kind(&self, handle: RigidBodyHandle) -> DriverResult<BodyKind> {
        Ok(self.body(handle)?.body_type().into())
    }

    fn pose(&self, handle: RigidBodyHandle) -> DriverResult<Pose> {
        Ok(Pose::from(*self.body(handle)?.position()))
    }

    fn mass(&self, handle: RigidBodyHandle) -> DriverResult<Real> {
        Ok(self.body(handle)?.mass())
    }

    fn set_next_kinematic_pose(
        &mut self,
        handle: RigidBodyHandle,
        pose: &Pose,
    ) -> DriverResult<()> {
        let rb = self.body_mut(handle)?;
        if !rb.is_kinematic() {
            return Err(DriverError::InvalidBodyKind {
                handle,
                expected: BodyKind::Kinematic,
                actual: rb.body_type().into(),
            });
        }

        rb.wake_up(true);
        rb.set_next_kinematic_position(pose.isometry());
        Ok(())
    }

    fn apply_impulse(
        &mut self,
        handle: RigidBodyHandle,
        impulse: Vector<Real>,
    ) -> DriverResult<()> {
        self.body_mut(handle)?.apply_impulse(impulse, true);
        Ok(())
    }

    fn apply_torque_impulse(
        &mut self,
        handle: RigidBodyHandle,
        torque_impulse: AngVector<Real>,
    ) -> DriverResult<()> {
        self.body_mut(handle)?
            .apply_torque_impulse(torque_impulse, true);
        Ok(())
    }

    fn apply_impulses(
        &mut self,
        handle: RigidBodyHandle,
        impulse: Vector<Real>,
        torque_impulse: AngVector<Real>,
    ) -> DriverResult<()> {
        let rb = self.body_mut(handle)?;
        rb.apply_impulse(impulse, true);
        rb.apply_torque_impulse(torque_impulse, true);
        Ok(())
    }

    fn enable_collision_events(&mut self, handle: RigidBodyHandle) -> DriverResult<()> {
        let rb = self
            .bodies
            .get(handle)
            .ok_or(DriverError::BodyNotFound(handle))?;

        for co_handle in rb.colliders() {
            if let Some(collider) = self.colliders.get_mut(*co_handle) {
                collider.set_active_events(
                    collider.active_events() | ActiveEvents::COLLISION_EVENTS,
                );
            }
        }

        Ok(())
    }

    fn step(&mut self) -> Vec<ContactEvent> {
        self.physics_pipeline.step(
            &self.gravity,
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &self.events,
        );
        self.step_id += 1;

        let mut result = vec![];
        while let Ok(event) = self.coll_events_rcv.try_recv() {
            let body1 = self.collider2body.get(&event.collider1());
            let body2 = self.collider2body.get(&event.collider2());

            if let (Some(body1), Some(body2)) = (body1, body2) {
                if body1 != body2 {
                    result.push(ContactEvent {
                        body1: *body1,
                        body2: *body2,
                        started: event.started(),
                    });
                }
            }
        }

        // Contact forces aren't subscribed to, but keep the channel empty.
        while self.force_events_rcv.try_recv().is_ok() {}

        for co_handle in self.removed_colliders.drain(..) {
            self.collider2body.remove(&co_handle);
        }

        result
    }

    fn timestep(&self) -> Real {
        self.params.dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use twister_api_types::objects::{ColliderDesc, ShapeDesc};

    fn floor(world: &mut PhysicsWorld) -> RigidBodyHandle {
        let pose = Pose::from_translation(vector![0.0, -0.5, 0.0]);
        let slab = ColliderDesc::new(ShapeDesc::cuboid(10.0, 0.5, 10.0));
        let desc = BodyDesc::fixed(pose).collider(slab);
        world.insert_body(&desc).unwrap()
    }

    fn ball(world: &mut PhysicsWorld, y: Real) -> RigidBodyHandle {
        let pose = Pose::from_translation(vector![0.0, y, 0.0]);
        let desc = BodyDesc::dynamic(pose).collider(ColliderDesc::new(ShapeDesc::ball(0.5)));
        world.insert_body(&desc).unwrap()
    }

    #[test]
    fn mass_is_available_right_after_insertion() {
        let mut world = PhysicsWorld::new(vector![0.0, -9.81, 0.0], 1.0 / 60.0);
        let collider = ColliderDesc::new(ShapeDesc::cuboid(0.5, 0.5, 0.5));
        let cube = BodyDesc::dynamic(Pose::identity()).collider(collider.mass(2.0));
        let handle = world.insert_body(&cube).unwrap();
        assert!((world.mass(handle).unwrap() - 2.0).abs() < 1.0e-5);
        assert_eq!(world.body_kind(handle).unwrap(), BodyKind::Dynamic);
    }

    #[test]
    fn invalid_descriptions_register_nothing() {
        let mut world = PhysicsWorld::new(vector![0.0, -9.81, 0.0], 1.0 / 60.0);
        let negative = ColliderDesc::new(ShapeDesc::ball(-1.0));
        let desc = BodyDesc::dynamic(Pose::identity()).collider(negative);
        assert!(matches!(
            world.insert_body(&desc),
            Err(DriverError::Configuration(_))
        ));
        assert_eq!(world.num_bodies(), 0);
    }

    #[test]
    fn removed_bodies_are_not_found() {
        let mut world = PhysicsWorld::new(vector![0.0, -9.81, 0.0], 1.0 / 60.0);
        let handle = ball(&mut world, 2.0);
        world.remove_body(handle).unwrap();

        assert!(!world.contains(handle));
        assert_eq!(world.mass(handle), Err(DriverError::BodyNotFound(handle)));
        assert_eq!(
            world.remove_body(handle),
            Err(DriverError::BodyNotFound(handle))
        );
    }

    #[test]
    fn kinematic_targets_are_reached_after_one_step() {
        let mut world = PhysicsWorld::new(vector![0.0, -9.81, 0.0], 1.0 / 60.0);
        let blade = ColliderDesc::new(ShapeDesc::cuboid(0.2, 0.2, 1.5));
        let desc = BodyDesc::kinematic(Pose::identity()).collider(blade);
        let handle = world.insert_body(&desc).unwrap();

        let target = Pose::from_euler(vector![0.1, -0.8, 1.9], vector![0.0, 0.3, 0.0]);
        world.set_next_kinematic_pose(handle, &target).unwrap();
        world.step();

        let pose = world.pose(handle).unwrap();
        assert!((pose.position - target.position).norm() < 1.0e-4);
        assert!(pose.orientation.angle_to(&target.orientation) < 1.0e-4);
    }

    #[test]
    fn kinematic_targets_require_kinematic_bodies() {
        let mut world = PhysicsWorld::new(vector![0.0, -9.81, 0.0], 1.0 / 60.0);
        let handle = ball(&mut world, 1.0);
        assert!(matches!(
            world.set_next_kinematic_pose(handle, &Pose::identity()),
            Err(DriverError::InvalidBodyKind { .. })
        ));
    }

    #[test]
    fn falling_ball_reports_a_contact_with_the_floor() {
        let mut world = PhysicsWorld::new(vector![0.0, -9.81, 0.0], 1.0 / 60.0);
        let floor = floor(&mut world);
        let ball = ball(&mut world, 1.0);
        world.enable_collision_events(ball).unwrap();

        let mut started = vec![];
        for _ in 0..120 {
            started.extend(world.step().into_iter().filter(|e| e.started));
        }

        assert!(!started.is_empty());
        for event in started {
            let pair = [event.body1, event.body2];
            assert!(pair.contains(&ball));
            assert!(pair.contains(&floor));
        }
    }

    #[test]
    fn unsubscribed_bodies_stay_silent() {
        let mut world = PhysicsWorld::new(vector![0.0, -9.81, 0.0], 1.0 / 60.0);
        floor(&mut world);
        ball(&mut world, 1.0);

        for _ in 0..120 {
            assert!(world.step().is_empty());
        }
    }
}
