//! The meditation track catalog.
//!
//! Tracks are static data: created once at startup from the built-in list or
//! from configuration, and never mutated afterwards.

mod display;
mod model;

pub use display::display_from_fields;
pub use model::*;
