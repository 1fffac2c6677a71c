use crate::rapier::math::Real;
use std::path::PathBuf;
use twister_api_types::config::SceneConfig;

#[derive(clap::Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// JSON scene configuration. Flags below override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long, default_value = "Twister playground")]
    pub scene: String,
    #[arg(long, default_value_t = false)]
    pub list_scenes: bool,
    #[arg(long, default_value_t = 600)]
    pub steps: u64,
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(long)]
    pub pool_size: Option<usize>,
    #[arg(long)]
    pub trajectory_radius: Option<Real>,
    #[arg(long)]
    pub trajectory_speed: Option<Real>,
    #[arg(long)]
    pub hit_sound: Option<PathBuf>,
    /// Click every clickable body every N steps. 0 disables clicks.
    #[arg(long, default_value_t = 120)]
    pub jump_every: u64,
    /// Print a JSON pose frame every N steps. 0 disables frames.
    #[arg(long, default_value_t = 0)]
    pub frames_every: u64,
    /// Sleep between steps to match the timestep.
    #[arg(long, default_value_t = false)]
    pub realtime: bool,
}

impl CliArgs {
    pub fn scene_config(&self) -> anyhow::Result<SceneConfig> {
        let mut config = match &self.config {
            Some(path) => SceneConfig::from_json_file(path)?,
            None => SceneConfig::default(),
        };

        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(pool_size) = self.pool_size {
            config.pool_size = pool_size;
        }
        if let Some(radius) = self.trajectory_radius {
            config.trajectory_radius = radius;
        }
        if let Some(speed) = self.trajectory_speed {
            config.trajectory_speed = speed;
        }
        if let Some(hit_sound) = &self.hit_sound {
            config.hit_sound = Some(hit_sound.clone());
        }

        config.validate()?;
        Ok(config)
    }
}
