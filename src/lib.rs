//! Image-to-LaTeX conversion through a multimodal inference API
//!
//! Validates an uploaded image, sends it with a fixed instruction prompt to
//! the Messages API, and returns the generated LaTeX. Without an API key a
//! demo client returns a bundled sample instead.

pub mod ai;
pub mod app;
pub mod clipboard;
pub mod error;
pub mod image;
pub mod models;
pub mod prompts;
pub mod session;

pub use error::{Error, Result};
