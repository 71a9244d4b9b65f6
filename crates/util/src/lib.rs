//! Shared helpers for the Formwright engine and CLI.
//!
//! Everything here is pure data manipulation over `serde_json::Value` or small,
//! self-contained primitives; nothing depends on wizard state.

pub mod config;
mod deep_clean;
mod path_resolution;
pub mod template;
mod throttle;

pub use config::{OutputFormat, Settings, SettingsError, expand_tilde};
pub use deep_clean::{deep_clean, has_meaningful_value, prune_rows_without};
pub use path_resolution::{
    ABSOLUTE_MARKER, PathError, get_path, join_path, last_segment, parent_path, remove_path, resolve_path, set_path,
};
pub use template::{LinkSubstitution, placeholder_names, substitute_placeholders};
pub use throttle::FrameThrottle;
