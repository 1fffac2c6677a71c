pub extern crate rapier3d as rapier;

pub mod config;
pub mod error;
pub mod kinematic;
pub mod objects;
pub mod pose;

pub use error::{DriverError, DriverResult};
