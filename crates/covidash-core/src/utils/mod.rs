//! Utility functions for string formatting, comparison and matching.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{
    cmp_ignore_case, contains_ignore_case, format_count, format_diff, format_percent,
    truncate_string,
};
