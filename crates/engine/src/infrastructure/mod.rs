//! Infrastructure adapters for the engine's external boundaries.

pub mod comfyui;
pub mod image_store;
pub mod ollama;
pub mod ports;
