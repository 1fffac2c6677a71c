//! Kinematic trajectories, click impulses, collision cues and instanced pools driven
//! on top of a rapier world.

pub extern crate nalgebra as na;
pub extern crate rapier3d as rapier;

pub mod audio;
pub mod builtin_scenes;
pub mod cli;
pub mod collision;
pub mod impulse;
pub mod kinematic;
pub mod physics;
pub mod pool;
pub mod runner;
