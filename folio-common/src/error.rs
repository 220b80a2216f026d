//! Severity classification shared by Folio error types
//!
//! Each crate owns its own `thiserror` enum. Those enums implement [`Severity`]
//! so callers can decide between aborting the process, failing a single
//! request, or just logging.

/// Severity levels for error classification
///
/// - **Warning**: the operation degraded but completed (for example a stored
///   payload that could not be decoded and was replaced by a zero value).
/// - **Error**: one operation failed, the process keeps serving (a rejected
///   form submission, a content type whose batch was rolled back).
/// - **Critical**: a programmer or configuration error. Continuing would risk
///   writing bad content, so the caller should stop and fix the code.
///
/// ```rust
/// use folio_common::ErrorSeverity;
///
/// let bad_write = ErrorSeverity::Critical;
/// let bad_request = ErrorSeverity::Error;
/// assert!(bad_write > bad_request);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Potential issue but the operation completed
    Warning,

    /// Operation failed but the system can continue
    Error,

    /// The process should not continue until the cause is fixed
    Critical,
}

impl ErrorSeverity {
    /// Whether an error of this severity should abort startup.
    pub fn is_fatal(self) -> bool {
        self == ErrorSeverity::Critical
    }
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorSeverity::Warning => "warning",
            ErrorSeverity::Error => "error",
            ErrorSeverity::Critical => "critical",
        };
        f.write_str(label)
    }
}

/// Trait for error types that have severity levels
///
/// ```rust
/// use folio_common::{ErrorSeverity, Severity};
///
/// #[derive(Debug)]
/// enum StoreError {
///     Corrupted,
///     Missing,
/// }
///
/// impl Severity for StoreError {
///     fn severity(&self) -> ErrorSeverity {
///         match self {
///             StoreError::Corrupted => ErrorSeverity::Critical,
///             StoreError::Missing => ErrorSeverity::Error,
///         }
///     }
/// }
///
/// assert_eq!(StoreError::Corrupted.severity(), ErrorSeverity::Critical);
/// ```
pub trait Severity {
    /// Get the severity level of this error
    fn severity(&self) -> ErrorSeverity;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_by_impact() {
        assert!(ErrorSeverity::Warning < ErrorSeverity::Error);
        assert!(ErrorSeverity::Error < ErrorSeverity::Critical);
    }

    #[test]
    fn only_critical_is_fatal() {
        assert!(!ErrorSeverity::Warning.is_fatal());
        assert!(!ErrorSeverity::Error.is_fatal());
        assert!(ErrorSeverity::Critical.is_fatal());
    }

    #[test]
    fn display_is_lowercase() {
        assert_eq!(ErrorSeverity::Critical.to_string(), "critical");
    }
}
