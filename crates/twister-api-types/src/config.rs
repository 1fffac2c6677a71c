use crate::error::{DriverError, DriverResult};
use crate::kinematic::OrbitTrajectory;
use rapier::math::{Real, Vector};
use rapier::na::vector;
use std::path::{Path, PathBuf};

/// Externally supplied scene parameters.
///
/// Every field has a default matching the reference scene, so a JSON file only needs
/// to list what it overrides.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SceneConfig {
    pub gravity: Vector<Real>,
    pub pool_size: usize,
    pub trajectory_radius: Real,
    /// Orbit speed of the twister, in radians per second.
    pub trajectory_speed: Real,
    /// Yaw rate of the twister, in radians per second.
    pub trajectory_spin_speed: Real,
    pub trajectory_height: Real,
    pub jump_linear_factor: Real,
    pub jump_angular_factor: Real,
    /// Seed of the pool and volume generators. Random when absent.
    pub seed: Option<u64>,
    pub hit_sound: Option<PathBuf>,
    pub timestep: Real,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            gravity: vector![0.0, -9.81, 0.0],
            pool_size: 100,
            trajectory_radius: 2.0,
            trajectory_speed: 0.5,
            trajectory_spin_speed: 3.0,
            trajectory_height: -0.8,
            jump_linear_factor: 5.0,
            jump_angular_factor: 0.5,
            seed: None,
            hit_sound: Some(PathBuf::from("hit.mp3")),
            timestep: 1.0 / 60.0,
        }
    }
}

impl SceneConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        log::debug!("Loaded scene configuration from {}.", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> DriverResult<()> {
        if !self.gravity.iter().all(|e| e.is_finite()) {
            return Err(DriverError::configuration("gravity must be finite"));
        }

        if !self.timestep.is_finite() || self.timestep <= 0.0 {
            return Err(DriverError::configuration(format!(
                "timestep must be positive, got {}",
                self.timestep
            )));
        }

        if !self.jump_linear_factor.is_finite() || !self.jump_angular_factor.is_finite() {
            return Err(DriverError::configuration("jump factors must be finite"));
        }

        self.orbit().validate()
    }

    pub fn orbit(&self) -> OrbitTrajectory {
        OrbitTrajectory {
            radius: self.trajectory_radius,
            height: self.trajectory_height,
            spin_speed: self.trajectory_spin_speed,
            orbit_speed: self.trajectory_speed,
        }
    }

    /// The seed to use, drawing one from the system clock if none was configured.
    pub fn resolved_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: SceneConfig = serde_json::from_str(
            r#"{
                "gravity": [0.0, -3.0, 0.0],
                "poolSize": 12,
                "trajectoryRadius": 4.0,
                "trajectorySpeed": 1.0
            }"#,
        )
        .unwrap();

        assert_eq!(config.gravity, vector![0.0, -3.0, 0.0]);
        assert_eq!(config.pool_size, 12);
        assert_eq!(config.trajectory_radius, 4.0);
        assert_eq!(config.trajectory_speed, 1.0);
        assert_eq!(config.trajectory_spin_speed, 3.0);
        assert_eq!(config.trajectory_height, -0.8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_values_are_configuration_errors() {
        let config = SceneConfig {
            trajectory_radius: -2.0,
            ..SceneConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(DriverError::Configuration(_))
        ));

        let config = SceneConfig {
            timestep: 0.0,
            ..SceneConfig::default()
        };
        assert!(config.validate().is_err());

        let config = SceneConfig {
            gravity: vector![0.0, Real::INFINITY, 0.0],
            ..SceneConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn configured_seed_wins() {
        let config = SceneConfig {
            seed: Some(42),
            ..SceneConfig::default()
        };
        assert_eq!(config.resolved_seed(), 42);
    }
}
