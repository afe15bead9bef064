//! Watermarker: stamp a text watermark onto an image, preview it on a
//! pan/zoom canvas and export the result at full resolution.

#[macro_use]
pub mod logger;
pub mod app;
pub mod canvas;
pub mod cli;
pub mod components;
pub mod error;
pub mod io;
pub mod ops;
pub mod project;
pub mod settings;

pub use error::{Result, WatermarkError};
