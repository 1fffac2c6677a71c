//! Best-effort audio feedback for collisions.
//!
//! Decoding and output are left to the backend. Playing a cue never blocks the
//! simulation tick, and a missing sound only silences the cue.

use crate::collision::{CollisionEvent, CollisionHandler};
use flume::{Receiver, Sender};
use std::path::{Path, PathBuf};
use twister_api_types::{DriverError, DriverResult};

/// A non-empty sound file known to exist on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioResource {
    path: PathBuf,
}

impl AudioResource {
    pub fn load(path: impl AsRef<Path>) -> DriverResult<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|e| {
            DriverError::ResourceUnavailable(format!("{}: {}", path.display(), e))
        })?;

        if !metadata.is_file() || metadata.len() == 0 {
            return Err(DriverError::ResourceUnavailable(format!(
                "{} is not a sound file",
                path.display()
            )));
        }

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub trait AudioBackend {
    /// Starts playing `resource` from `start_offset` seconds. Must return immediately.
    fn play(&self, resource: &AudioResource, volume: f32, start_offset: f32);
}

impl<T: AudioBackend + ?Sized> AudioBackend for Box<T> {
    fn play(&self, resource: &AudioResource, volume: f32, start_offset: f32) {
        (**self).play(resource, volume, start_offset)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlayRequest {
    pub resource: AudioResource,
    pub volume: f32,
    pub start_offset: f32,
}

/// Hands play requests over to a playback thread.
///
/// The thread only logs the cues it receives: it is a stand-in for a real output
/// device, which decoding and mixing would plug in behind the same channel.
pub struct ChannelAudioBackend {
    requests: Sender<PlayRequest>,
}

impl ChannelAudioBackend {
    pub fn spawn() -> Self {
        let (requests, requests_rcv) = flume::unbounded();
        std::thread::spawn(move || playback_loop(requests_rcv));
        Self { requests }
    }
}

impl AudioBackend for ChannelAudioBackend {
    fn play(&self, resource: &AudioResource, volume: f32, start_offset: f32) {
        let request = PlayRequest {
            resource: resource.clone(),
            volume,
            start_offset,
        };

        if self.requests.send(request).is_err() {
            log::trace!("Playback thread is gone, dropping cue.");
        }
    }
}

/// Waits for the next request, skipping over older pending ones.
///
/// A new cue restarts the sound, so only the most recent request is worth playing.
fn next_playback(requests: &Receiver<PlayRequest>) -> Option<PlayRequest> {
    let mut latest = requests.recv().ok()?;
    while let Ok(next) = requests.try_recv() {
        latest = next;
    }
    Some(latest)
}

fn playback_loop(requests: Receiver<PlayRequest>) {
    while let Some(request) = next_playback(&requests) {
        log::debug!(
            "Playing {} from {}s at volume {:.2}.",
            request.resource.path().display(),
            request.start_offset,
            request.volume
        );
    }
}

/// Plays a sound, from its start and at a random volume, every time a contact begins.
pub struct AudioCueHandler<A> {
    backend: A,
    resource: Option<AudioResource>,
    volumes: oorandom::Rand32,
}

impl<A: AudioBackend> AudioCueHandler<A> {
    /// Creates the handler. If the sound failed to load, the handler stays silent.
    pub fn new(backend: A, resource: DriverResult<AudioResource>, seed: u64) -> Self {
        let resource = match resource {
            Ok(resource) => Some(resource),
            Err(err) => {
                log::warn!("Collision sound disabled: {}", err);
                None
            }
        };

        Self {
            backend,
            resource,
            volumes: oorandom::Rand32::new(seed),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.resource.is_some()
    }
}

impl<A: AudioBackend> CollisionHandler for AudioCueHandler<A> {
    fn handle(&mut self, _event: &CollisionEvent) -> DriverResult<()> {
        if let Some(resource) = &self.resource {
            let volume = self.volumes.rand_float();
            self.backend.play(resource, volume, 0.0);
        }

        Ok(())
    }
}
