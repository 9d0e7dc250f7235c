//! Application module: exposes the app model used by the TUI and runtime.
//!
//! The `App` model lives in `app::model` and holds the catalog, the cursor
//! and the latest playback snapshot.

mod model;

pub use model::*;
