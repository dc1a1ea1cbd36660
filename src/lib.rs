pub mod app;
pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod library;
pub mod logging;
pub mod model;
pub mod navigator;
pub mod playlist;
pub mod render;
pub mod rotation;
pub mod scheduler;
pub mod sync;
pub mod visualizer;
