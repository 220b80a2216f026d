//! # Folio Common
//!
//! Foundational pieces shared by every Folio crate:
//!
//! - [`error`] - severity classification for crate-specific error enums
//! - [`logging`] - helpers for rendering structured values in tracing output

pub mod error;
pub mod logging;

pub use error::{ErrorSeverity, Severity};
pub use logging::Pretty;
