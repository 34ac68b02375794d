//! Expansion of `~` and environment variables in configured paths.

use std::borrow::Cow;
use std::env::VarError;

use crate::ConfigError;

/// Expand a leading `~` and `${VAR}` / `${VAR:-default}` references in a path
/// value. Values with neither are returned unchanged.
pub(crate) fn expand_path(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") && !value.starts_with('~') {
        return Ok(value.to_owned());
    }

    let home_dir = || std::env::var("HOME").ok();
    let lookup = |var: &str| -> Result<Option<String>, VarError> {
        std::env::var(var).map(Some)
    };

    shellexpand::full_with_context(value, home_dir, lookup)
        .map(Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })
}
