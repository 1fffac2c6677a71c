use super::twister_playground::{floor, walls};
use crate::audio::{AudioBackend, AudioCueHandler, AudioResource};
use crate::builtin_scenes::{BuiltinScene, SceneBuilder};
use crate::collision::EventKind;
use crate::pool::PoolConfig;
use crate::na::vector;
use std::f32::consts::PI;
use twister_api_types::config::SceneConfig;
use twister_api_types::kinematic::{KeyframeTrajectory, KinematicCurve, TrajectoryFunction};
use twister_api_types::objects::{BodyDesc, ColliderDesc, ShapeDesc};
use twister_api_types::pose::Pose;
use twister_api_types::DriverResult;

pub fn init_world(
    config: &SceneConfig,
    audio: Box<dyn AudioBackend>,
) -> DriverResult<BuiltinScene> {
    let mut builder = SceneBuilder::new(config)?;
    let mut rng = oorandom::Rand32::new(config.resolved_seed());

    /*
     * Ground
     */
    let half_size = 5.0;
    builder.body("floor", floor(half_size))?;
    builder.body(
        "walls",
        BodyDesc::fixed(Pose::identity()).collider(ColliderDesc::new(walls(half_size))),
    )?;

    /*
     * Paddle sweeping the floor back and forth while turning around.
     */
    let sweep = KeyframeTrajectory::new(
        Pose::identity(),
        Some(KinematicCurve::new(
            vec![vector![-3.0, -0.7, 0.0], vector![3.0, -0.7, 0.0]],
            0.0,
            4.0,
            true,
        )?),
        Some(KinematicCurve::new(
            vec![vector![0.0, 0.0, 0.0], vector![0.0, PI, 0.0]],
            0.0,
            4.0,
            true,
        )?),
    )?;
    let blade = ColliderDesc::new(ShapeDesc::cuboid(0.2, 0.3, 2.0)).friction(0.0);
    let paddle = builder.body(
        "paddle",
        BodyDesc::kinematic(sweep.evaluate(0.0))
            .can_sleep(false)
            .collider(blade),
    )?;
    builder.actuator(paddle, sweep)?;

    /*
     * Clickable ball
     */
    let ball = builder.body(
        "ball",
        BodyDesc::dynamic(Pose::from_translation(vector![0.0, 2.0, 2.5]))
            .collider(ColliderDesc::new(ShapeDesc::ball(0.5)).restitution(0.3)),
    )?;
    builder.clickable(ball)?;

    if let Some(hit_sound) = &config.hit_sound {
        let seed = rng.rand_u32() as u64;
        let cue = AudioCueHandler::new(audio, AudioResource::load(hit_sound), seed);
        builder.on_collision(EventKind::CollisionBegin, ball, cue)?;
    }

    /*
     * Debris
     */
    let debris = PoolConfig {
        collider: ColliderDesc::new(ShapeDesc::ball(0.4)),
        base_height: 3.0,
        ..PoolConfig::default()
    };
    builder.pool("debris", &debris, config.pool_size, &mut rng)?;

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::PhysicsEngine;

    #[test]
    fn paddle_sweeps_between_the_walls() {
        let config = SceneConfig {
            seed: Some(0),
            hit_sound: None,
            pool_size: 10,
            ..SceneConfig::default()
        };
        struct Mute;
        impl AudioBackend for Mute {
            fn play(&self, _: &AudioResource, _: f32, _: f32) {}
        }

        let mut scene = init_world(&config, Box::new(Mute)).unwrap();
        let paddle = scene.registry.get("paddle").unwrap();
        assert_eq!(scene.world.num_bodies(), 14);

        // Two seconds in, the paddle crosses the middle of the box.
        for _ in 0..120 {
            let t = (scene.world.step_id() + 1) as f32 * scene.world.timestep();
            for actuator in &scene.actuators {
                actuator.tick(&mut scene.world, t).unwrap();
            }
            scene.world.step();
        }

        let pose = scene.world.pose(paddle).unwrap();
        assert!(pose.position.x.abs() < 1.0e-3);
        assert!((pose.position.y + 0.7).abs() < 1.0e-4);
    }
}
