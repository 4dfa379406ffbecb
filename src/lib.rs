//! Skin descriptor parsing and note scrolling for a mania playfield.

pub mod assets;
pub mod config;
pub mod core;
pub mod error;
pub mod game;

pub use error::PlayfieldError;
