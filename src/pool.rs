//! Instanced swarms of independent dynamic bodies.
//!
//! All the bodies of a pool share one rendering batch but nothing else: each one has its
//! own physics identity, mass, and contacts. Transforms are drawn once, when the pool is
//! created, from an injected generator.

use crate::physics::PhysicsEngine;
use crate::rapier::dynamics::RigidBodyHandle;
use crate::rapier::geometry::Aabb;
use crate::rapier::math::{Real, Vector};
use crate::na::{point, vector};
use twister_api_types::objects::{BodyDesc, ColliderDesc, ShapeDesc};
use twister_api_types::pose::Pose;
use twister_api_types::{DriverError, DriverResult};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq)]
pub struct PoolConfig {
    /// Collider of an instance at scale 1.
    pub collider: ColliderDesc,
    /// Instances are spread over `[-half_width, half_width)` along `x` and `z`.
    pub half_width: Real,
    pub base_height: Real,
    /// Vertical offset between consecutive instances, so they don't start interpenetrating.
    pub stack_spacing: Real,
    pub min_scale: Real,
    pub max_scale: Real,
    /// Euler angles are drawn in `[0, max_rotation)`.
    pub max_rotation: Real,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            collider: ColliderDesc::new(ShapeDesc::cuboid(0.5, 0.5, 0.5)),
            half_width: 4.0,
            base_height: 6.0,
            stack_spacing: 0.2,
            min_scale: 0.2,
            max_scale: 1.0,
            max_rotation: 1.0,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> DriverResult<()> {
        self.collider.validate()?;

        let all_finite = [
            self.half_width,
            self.base_height,
            self.stack_spacing,
            self.min_scale,
            self.max_scale,
            self.max_rotation,
        ]
        .iter()
        .all(|e| e.is_finite());

        if !all_finite || self.half_width < 0.0 || self.stack_spacing < 0.0 {
            return Err(DriverError::configuration(
                "pool placement parameters must be finite and non-negative",
            ));
        }

        if self.min_scale <= 0.0 || self.max_scale < self.min_scale {
            return Err(DriverError::configuration(format!(
                "invalid pool scale range [{}, {}]",
                self.min_scale, self.max_scale
            )));
        }

        Ok(())
    }

    /// The box every initial position of a `count`-sized pool falls in.
    pub fn bounding_box(&self, count: usize) -> Aabb {
        let top = self.base_height + count.saturating_sub(1) as Real * self.stack_spacing;
        Aabb::new(
            point![-self.half_width, self.base_height, -self.half_width],
            point![self.half_width, top, self.half_width],
        )
    }
}

/// Initial transform of one instance.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PoolEntry {
    pub position: Vector<Real>,
    /// XYZ Euler angles, in radians.
    pub rotation: Vector<Real>,
    pub scale: Real,
}

impl PoolEntry {
    pub fn pose(&self) -> Pose {
        Pose::from_euler(self.position, self.rotation)
    }
}

pub fn generate_entries(
    config: &PoolConfig,
    count: usize,
    rng: &mut oorandom::Rand32,
) -> Vec<PoolEntry> {
    (0..count)
        .map(|i| {
            let scale = config.min_scale + rng.rand_float() * (config.max_scale - config.min_scale);
            let position = vector![
                (rng.rand_float() - 0.5) * 2.0 * config.half_width,
                config.base_height + i as Real * config.stack_spacing,
                (rng.rand_float() - 0.5) * 2.0 * config.half_width
            ];
            let rotation = vector![
                rng.rand_float() * config.max_rotation,
                rng.rand_float() * config.max_rotation,
                rng.rand_float() * config.max_rotation
            ];

            PoolEntry {
                position,
                rotation,
                scale,
            }
        })
        .collect()
}

pub struct InstancedBodyPool {
    batch: Uuid,
    entries: Vec<PoolEntry>,
    handles: Vec<RigidBodyHandle>,
}

impl InstancedBodyPool {
    /// Generates `count` transforms and registers one dynamic body per transform.
    ///
    /// Either every body is registered or none is.
    pub fn create(
        engine: &mut impl PhysicsEngine,
        config: &PoolConfig,
        count: usize,
        rng: &mut oorandom::Rand32,
    ) -> DriverResult<Self> {
        config.validate()?;

        let entries = generate_entries(config, count, rng);
        let descs: Vec<_> = entries
            .iter()
            .map(|entry| Self::body_desc(config, entry))
            .collect();
        descs.iter().try_for_each(|desc| desc.validate())?;

        let mut handles = Vec::with_capacity(count);
        for desc in &descs {
            match engine.insert_body(desc) {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    for handle in handles {
                        let _ = engine.remove_body(handle);
                    }
                    return Err(err);
                }
            }
        }

        let batch = Uuid::new_v4();
        log::info!("Created pool {} with {} instances.", batch, handles.len());

        Ok(Self {
            batch,
            entries,
            handles,
        })
    }

    pub fn body_desc(config: &PoolConfig, entry: &PoolEntry) -> BodyDesc {
        let collider = ColliderDesc {
            shape: config.collider.shape.scaled(entry.scale),
            ..config.collider.clone()
        };
        BodyDesc::dynamic(entry.pose()).collider(collider)
    }

    /// Identity of the rendering batch shared by every instance.
    pub fn batch(&self) -> Uuid {
        self.batch
    }

    pub fn entries(&self) -> &[PoolEntry] {
        &self.entries
    }

    pub fn handles(&self) -> &[RigidBodyHandle] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn instance_of(&self, handle: RigidBodyHandle) -> Option<usize> {
        self.handles.iter().position(|h| *h == handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::PhysicsWorld;
    use std::collections::HashSet;
    use twister_api_types::objects::BodyKind;

    fn world() -> PhysicsWorld {
        PhysicsWorld::new(vector![0.0, -9.81, 0.0], 1.0 / 60.0)
    }

    #[test]
    fn hundred_independent_instances() {
        let mut world = world();
        let config = PoolConfig::default();
        let mut rng = oorandom::Rand32::new(1234);
        let pool = InstancedBodyPool::create(&mut world, &config, 100, &mut rng).unwrap();

        assert_eq!(pool.len(), 100);
        let distinct: HashSet<_> = pool.handles().iter().collect();
        assert_eq!(distinct.len(), 100);

        let aabb = config.bounding_box(100);
        for (i, entry) in pool.entries().iter().enumerate() {
            for k in 0..3 {
                assert!((aabb.mins[k]..=aabb.maxs[k]).contains(&entry.position[k]));
            }
            assert!((entry.position.y - (6.0 + i as Real * 0.2)).abs() < 1.0e-4);
            assert!(entry.scale >= 0.2 && entry.scale <= 1.0);
            assert!(entry.rotation.iter().all(|e| (0.0..1.0).contains(e)));
        }

        for handle in pool.handles() {
            assert_eq!(world.body_kind(*handle).unwrap(), BodyKind::Dynamic);
        }
        assert_eq!(pool.instance_of(pool.handles()[42]), Some(42));
    }

    #[test]
    fn seeded_pools_are_reproducible() {
        let config = PoolConfig::default();
        let a = generate_entries(&config, 100, &mut oorandom::Rand32::new(99));
        let b = generate_entries(&config, 100, &mut oorandom::Rand32::new(99));
        let c = generate_entries(&config, 100, &mut oorandom::Rand32::new(100));
        assert_eq!(a, b);
        assert_ne!(a, c);

        let mut world = world();
        let mut rng = oorandom::Rand32::new(99);
        let pool = InstancedBodyPool::create(&mut world, &config, 100, &mut rng).unwrap();
        assert_eq!(pool.entries(), &a[..]);
    }

    #[test]
    fn instances_are_scaled_individually() {
        let config = PoolConfig::default();
        let entry = PoolEntry {
            position: vector![0.0, 6.0, 0.0],
            rotation: Vector::zeros(),
            scale: 0.5,
        };
        let desc = InstancedBodyPool::body_desc(&config, &entry);
        assert_eq!(desc.colliders[0].shape, ShapeDesc::cuboid(0.25, 0.25, 0.25));
        assert_eq!(desc.kind, BodyKind::Dynamic);
    }

    #[test]
    fn impulses_only_affect_their_instance() {
        let mut world = world();
        let mut rng = oorandom::Rand32::new(5);
        let pool =
            InstancedBodyPool::create(&mut world, &PoolConfig::default(), 3, &mut rng).unwrap();

        world
            .apply_impulse(pool.handles()[1], vector![0.0, 1.0, 0.0])
            .unwrap();
        assert_ne!(world.linvel(pool.handles()[1]).unwrap(), Vector::zeros());
        assert_eq!(world.linvel(pool.handles()[0]).unwrap(), Vector::zeros());
        assert_eq!(world.linvel(pool.handles()[2]).unwrap(), Vector::zeros());
    }

    #[test]
    fn invalid_pools_register_nothing() {
        let mut world = world();
        let config = PoolConfig {
            min_scale: 0.0,
            ..PoolConfig::default()
        };
        let mut rng = oorandom::Rand32::new(5);
        assert!(matches!(
            InstancedBodyPool::create(&mut world, &config, 10, &mut rng),
            Err(DriverError::Configuration(_))
        ));
        assert_eq!(world.num_bodies(), 0);

        let empty =
            InstancedBodyPool::create(&mut world, &PoolConfig::default(), 0, &mut rng).unwrap();
        assert!(empty.is_empty());
    }
}
