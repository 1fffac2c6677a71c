use crate::audio::{AudioBackend, AudioCueHandler, AudioResource};
use crate::builtin_scenes::{BuiltinScene, SceneBuilder};
use crate::collision::EventKind;
use crate::pool::PoolConfig;
use crate::rapier::math::{Real, Vector};
use crate::na::vector;
use twister_api_types::config::SceneConfig;
use twister_api_types::kinematic::TrajectoryFunction;
use twister_api_types::objects::{BodyDesc, ColliderDesc, ShapeDesc};
use twister_api_types::pose::Pose;
use twister_api_types::DriverResult;

pub(super) fn walls(half_size: Real) -> ShapeDesc {
    let wall = |position: Vector<Real>, hx: Real, hz: Real| {
        (Pose::from_translation(position), ShapeDesc::cuboid(hx, 2.0, hz))
    };

    ShapeDesc::Compound {
        parts: vec![
            wall(vector![0.0, 1.0, -half_size - 0.25], half_size, 0.5),
            wall(vector![half_size, 1.0, 0.0], 0.5, half_size),
            wall(vector![0.0, 1.0, half_size + 0.25], half_size, 0.5),
            wall(vector![-half_size, 1.0, 0.0], 0.5, half_size),
        ],
    }
}

pub(super) fn floor(half_size: Real) -> BodyDesc {
    BodyDesc::fixed(Pose::from_translation(vector![0.0, -1.25, 0.0]))
        .collider(ColliderDesc::new(ShapeDesc::cuboid(half_size, 0.25, half_size)))
}

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
     * Props
     */
    builder.body(
        "ball",
        BodyDesc::dynamic(Pose::from_translation(vector![-2.0, 3.0, 0.0]))
            .collider(ColliderDesc::new(ShapeDesc::ball(1.0))),
    )?;
    builder.body(
        "burger",
        BodyDesc::dynamic(Pose::from_translation(vector![0.0, 4.0, 0.0])).collider(
            ColliderDesc::new(ShapeDesc::Cylinder {
                half_height: 0.5,
                radius: 1.25,
            }),
        ),
    )?;

    let cube = builder.body(
        "cube",
        BodyDesc::dynamic(Pose::from_translation(vector![2.0, 2.0, 0.0])).collider(
            ColliderDesc::new(ShapeDesc::cuboid(0.5, 0.5, 0.5))
                .mass(2.0)
                .restitution(0.5)
                .friction(0.2),
        ),
    )?;
    builder.clickable(cube)?;

    if let Some(hit_sound) = &config.hit_sound {
        let seed = rng.rand_u32() as u64;
        let cue = AudioCueHandler::new(audio, AudioResource::load(hit_sound), seed);
        builder.on_collision(EventKind::CollisionBegin, cube, cue)?;
    }

    /*
     * Twister
     */
    let orbit = config.orbit();
    let blade = ColliderDesc::new(ShapeDesc::cuboid(0.2, 0.2, 1.5)).friction(0.0);
    let twister = builder.body(
        "twister",
        BodyDesc::kinematic(orbit.evaluate(0.0))
            .can_sleep(false)
            .collider(blade),
    )?;
    builder.actuator(twister, orbit)?;

    /*
     * Falling cubes
     */
    builder.pool("cubes", &PoolConfig::default(), config.pool_size, &mut rng)?;

    Ok(builder.build())
}
