pub mod app;
pub mod audio;
pub mod beat;
pub mod color;
pub mod config;
pub mod motion;
pub mod render;
pub mod show;
pub mod surface;
pub mod terminal;
pub mod visual;
