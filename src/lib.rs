//! Hand-gesture desktop control: landmarks in, OS actions out.

pub mod actuator;
pub mod args;
pub mod camera;
pub mod classifier;
pub mod config;
pub mod error;
pub mod font;
pub mod geometry;
pub mod hand_landmark;
pub mod output;
pub mod overlay;
pub mod pipeline;
pub mod session;
pub mod smoother;
pub mod ttf;
pub mod types;
