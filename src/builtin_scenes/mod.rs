//! Scene construction: explicit body registration through a builder, collected into a
//! registry of named handles.

use crate::audio::AudioBackend;
use crate::collision::{CollisionEventRouter, CollisionHandler, EventKind};
use crate::impulse::ImpulseController;
use crate::kinematic::KinematicActuator;
use crate::physics::{PhysicsEngine, PhysicsWorld};
use crate::pool::{InstancedBodyPool, PoolConfig};
use crate::rapier::dynamics::RigidBodyHandle;
use std::collections::{HashMap, HashSet};
use twister_api_types::config::SceneConfig;
use twister_api_types::kinematic::TrajectoryFunction;
use twister_api_types::objects::{BodyDesc, BodyPoseObject, PoseFrame};
use twister_api_types::{DriverError, DriverResult};

mod keyframe_sweeper;
mod twister_playground;

pub type SceneInit = fn(&SceneConfig, Box<dyn AudioBackend>) -> DriverResult<BuiltinScene>;

pub fn builders() -> Vec<(&'static str, SceneInit)> {
    let mut builders: Vec<(_, SceneInit)> = vec![
        ("Twister playground", twister_playground::init_world),
        ("Keyframe sweeper", keyframe_sweeper::init_world),
    ];

    builders.sort_by(|a, b| a.0.cmp(b.0));

    builders
}

/// Finds a built-in scene by name, ignoring case.
pub fn find(name: &str) -> Option<SceneInit> {
    builders()
        .into_iter()
        .find(|(scene_name, _)| scene_name.eq_ignore_ascii_case(name))
        .map(|(_, init)| init)
}

/// Named handles of the bodies of a scene.
#[derive(Clone, Debug, Default)]
pub struct SceneRegistry {
    bodies: Vec<(String, RigidBodyHandle)>,
    by_name: HashMap<String, RigidBodyHandle>,
    clickable: HashSet<RigidBodyHandle>,
}

impl SceneRegistry {
    pub fn get(&self, name: &str) -> Option<RigidBodyHandle> {
        self.by_name.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, RigidBodyHandle)> {
        self.bodies
            .iter()
            .map(|(name, handle)| (name.as_str(), *handle))
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn is_clickable(&self, handle: RigidBodyHandle) -> bool {
        self.clickable.contains(&handle)
    }

    /// Clickable bodies, in registration order.
    pub fn clickable(&self) -> impl Iterator<Item = RigidBodyHandle> + '_ {
        self.bodies
            .iter()
            .map(|(_, handle)| *handle)
            .filter(|handle| self.clickable.contains(handle))
    }
}

pub struct BuiltinScene {
    pub world: PhysicsWorld,
    pub registry: SceneRegistry,
    pub actuators: Vec<KinematicActuator>,
    pub pools: Vec<(String, InstancedBodyPool)>,
    pub router: CollisionEventRouter,
    pub impulses: ImpulseController,
}

impl BuiltinScene {
    /// Removes a body from the simulation and from every component referring to it.
    ///
    /// The registry keeps the name, so later input aimed at the body fails with
    /// `BodyNotFound`.
    pub fn despawn(&mut self, handle: RigidBodyHandle) -> DriverResult<()> {
        self.world.remove_body(handle)?;
        self.router.forget_body(handle);
        self.actuators.retain(|actuator| actuator.body() != handle);
        Ok(())
    }

    /// Poses of every live body, for the render front-end.
    pub fn pose_frame(&self) -> PoseFrame {
        let mut objects = vec![];

        for (name, handle) in self.registry.iter() {
            if let Ok(pose) = self.world.pose(handle) {
                objects.push(BodyPoseObject {
                    name: name.to_string(),
                    batch: None,
                    instance: None,
                    pose,
                });
            }
        }

        for (name, pool) in &self.pools {
            for (instance, handle) in pool.handles().iter().enumerate() {
                if let Ok(pose) = self.world.pose(*handle) {
                    objects.push(BodyPoseObject {
                        name: name.clone(),
                        batch: Some(pool.batch()),
                        instance: Some(instance),
                        pose,
                    });
                }
            }
        }

        PoseFrame {
            timestamp: self.world.step_id(),
            elapsed: self.world.elapsed(),
            objects,
        }
    }
}

pub struct SceneBuilder {
    world: PhysicsWorld,
    registry: SceneRegistry,
    actuators: Vec<KinematicActuator>,
    pools: Vec<(String, InstancedBodyPool)>,
    router: CollisionEventRouter,
    impulses: ImpulseController,
}

impl SceneBuilder {
    pub fn new(config: &SceneConfig) -> DriverResult<Self> {
        config.validate()?;

        Ok(Self {
            world: PhysicsWorld::new(config.gravity, config.timestep),
            registry: SceneRegistry::default(),
            actuators: vec![],
            pools: vec![],
            router: CollisionEventRouter::new(),
            impulses: ImpulseController::new(config.jump_linear_factor, config.jump_angular_factor),
        })
    }

    fn check_name(&self, name: &str) -> DriverResult<()> {
        let taken = self.registry.by_name.contains_key(name)
            || self.pools.iter().any(|(pool_name, _)| pool_name == name);
        if taken {
            Err(DriverError::configuration(format!(
                "scene object name `{name}` is already taken"
            )))
        } else {
            Ok(())
        }
    }

    pub fn body(&mut self, name: &str, desc: BodyDesc) -> DriverResult<RigidBodyHandle> {
        self.check_name(name)?;
        let handle = self.world.insert_body(&desc)?;
        self.registry.bodies.push((name.to_string(), handle));
        self.registry.by_name.insert(name.to_string(), handle);
        Ok(handle)
    }

    /// Lets click events reach `handle`.
    pub fn clickable(&mut self, handle: RigidBodyHandle) -> DriverResult<()> {
        if !self.world.contains(handle) {
            return Err(DriverError::BodyNotFound(handle));
        }
        self.registry.clickable.insert(handle);
        Ok(())
    }

    pub fn actuator(
        &mut self,
        handle: RigidBodyHandle,
        trajectory: impl TrajectoryFunction + 'static,
    ) -> DriverResult<()> {
        let actuator = KinematicActuator::new(&self.world, handle, trajectory)?;
        self.actuators.push(actuator);
        Ok(())
    }

    pub fn pool(
        &mut self,
        name: &str,
        config: &PoolConfig,
        count: usize,
        rng: &mut oorandom::Rand32,
    ) -> DriverResult<()> {
        self.check_name(name)?;
        let pool = InstancedBodyPool::create(&mut self.world, config, count, rng)?;
        self.pools.push((name.to_string(), pool));
        Ok(())
    }

    pub fn on_collision(
        &mut self,
        kind: EventKind,
        handle: RigidBodyHandle,
        handler: impl CollisionHandler + 'static,
    ) -> DriverResult<()> {
        self.world.enable_collision_events(handle)?;
        self.router.register(kind, handle, handler);
        Ok(())
    }

    pub fn build(self) -> BuiltinScene {
        let pooled: usize = self.pools.iter().map(|(_, pool)| pool.len()).sum();
        log::info!(
            "Scene ready: {} named bodies, {} pooled bodies, {} actuators.",
            self.registry.len(),
            pooled,
            self.actuators.len()
        );

        BuiltinScene {
            world: self.world,
            registry: self.registry,
            actuators: self.actuators,
            pools: self.pools,
            router: self.router,
            impulses: self.impulses,
        }
    }
}
