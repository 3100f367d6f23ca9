//! Output formatting module
//!
//! Renders result sets for the console and for files.

mod formatter;

pub use formatter::{OutputFormat, ResultFormatter};
