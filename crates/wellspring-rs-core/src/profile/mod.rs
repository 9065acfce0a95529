//! Profile extraction: pattern hints, model extraction, validation and the
//! replace-on-write store update.

mod hints;
mod manager;
mod validate;

pub use hints::ProfileHints;
pub use manager::{ProfileManager, ProfileUpdate};
pub use validate::sanitize;
