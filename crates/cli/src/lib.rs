//! Command-line front-end for Formwright wizards.
//!
//! The binary renders a step's view model, lints wizard definitions and drives
//! wizards through YAML event scripts with file-backed persistence.

pub mod commands;
pub mod persistence;
pub mod script;
