//! The per-tick update loop of a scene.

use crate::builtin_scenes::BuiltinScene;
use crate::physics::PhysicsEngine;
use crate::rapier::dynamics::RigidBodyHandle;
use crate::rapier::math::Real;
use flume::{Receiver, Sender};

/// Input accepted by a running simulation, consumed at the start of the next tick.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RunnerCommand {
    Click { body: RigidBodyHandle },
    Despawn { body: RigidBodyHandle },
    StartStop { running: bool },
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Number of steps taken by the world so far.
    pub step_id: u64,
    pub stepped: bool,
    /// Contact changes reported by the step.
    pub contacts: usize,
    pub handlers_invoked: usize,
    pub impulses: usize,
}

pub struct SimulationRunner {
    scene: BuiltinScene,
    commands: Receiver<RunnerCommand>,
    is_running: bool,
}

impl SimulationRunner {
    pub fn new(scene: BuiltinScene) -> (Self, Sender<RunnerCommand>) {
        let (commands_snd, commands) = flume::unbounded();
        let runner = Self {
            scene,
            commands,
            is_running: true,
        };
        (runner, commands_snd)
    }

    pub fn scene(&self) -> &BuiltinScene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut BuiltinScene {
        &mut self.scene
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    /// Runs one update: pending input, kinematic targets, the engine step, then the
    /// collision handlers.
    ///
    /// Kinematic targets are computed for the time reached at the end of the step, so
    /// after `n` steps every actuated body sits exactly on its trajectory at `n * dt`.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        while let Ok(command) = self.commands.try_recv() {
            match command {
                RunnerCommand::Click { body } => {
                    if self.click(body) {
                        report.impulses += 1;
                    }
                }
                RunnerCommand::Despawn { body } => {
                    if let Err(err) = self.scene.despawn(body) {
                        log::debug!("Ignoring despawn of {:?}: {}", body, err);
                    }
                }
                RunnerCommand::StartStop { running } => self.is_running = running,
            }
        }

        let scene = &mut self.scene;
        report.step_id = scene.world.step_id();

        if !self.is_running {
            return report;
        }

        let target_time = (scene.world.step_id() + 1) as Real * scene.world.timestep();
        for actuator in &scene.actuators {
            if let Err(err) = actuator.tick(&mut scene.world, target_time) {
                log::warn!(
                    "Kinematic actuator of {:?} failed: {}",
                    actuator.body(),
                    err
                );
            }
        }

        let contacts = scene.world.step();
        let timestamp = scene.world.elapsed();
        for contact in &contacts {
            report.handlers_invoked += scene.router.dispatch(contact, timestamp);
        }

        report.step_id = scene.world.step_id();
        report.stepped = true;
        report.contacts = contacts.len();
        report
    }

    fn click(&mut self, body: RigidBodyHandle) -> bool {
        let scene = &mut self.scene;

        if !scene.registry.is_clickable(body) {
            log::debug!("Ignoring click on non-clickable {:?}.", body);
            return false;
        }

        match scene.impulses.apply_jump_impulse(&mut scene.world, body) {
            Ok(_) => true,
            Err(err) if err.recoverable() => {
                log::debug!("Ignoring click: {}", err);
                false
            }
            Err(err) => {
                log::warn!("Click on {:?} failed: {}", body, err);
                false
            }
        }
    }
}
