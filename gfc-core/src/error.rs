//! Re-export of the shared error type

pub use gfc_error::{FanControlError, Result};
