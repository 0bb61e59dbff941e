//! Data models for the Memoria draft & settings backend.
//!
//! These models match the frontend TypeScript interfaces exactly for seamless
//! interoperability.

mod draft;
mod record;
mod settings;

pub use draft::*;
pub use record::*;
pub use settings::*;
