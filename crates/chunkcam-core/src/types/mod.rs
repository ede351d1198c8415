//! Type system utilities and aliases.
//!
//! - [`aliases`]: shared vector wrapper used by listeners.

pub mod aliases;

pub use aliases::*;
