//! Security module for toolpilot: workspace path sandboxing.
//!
//! Every path a file tool touches goes through [`Workspace::resolve`] first.

pub mod path;

pub use path::{PathValidationError, Workspace};
