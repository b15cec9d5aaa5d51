//! Report-based results for startup paths.
//!
//! Registry construction, configuration loading and engine wiring return
//! `Result<T, C>` so a failure keeps its chain of causes. Runtime paths use
//! each crate's plain error enums instead.

use rootcause::Report;

/// Result whose error is a report with context `C`.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
