//! Fanviz - minimal glTF viewer with a free-fly camera and spinning fan
//! parts.
//!
//! The crate is split along the seams the viewer actually has: `session`
//! owns all mutable viewer state and the per-frame update, `engine` is the
//! trait boundary to the renderer, `assets` loads glTF off the frame loop,
//! `render` is the wgpu backend and `app` is the winit shell.

pub mod app;
pub mod assets;
pub mod config;
pub mod engine;
pub mod render;
pub mod session;
