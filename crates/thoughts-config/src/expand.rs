//! `${VAR}` expansion for configuration strings.
//!
//! - `${VAR}` expands to the value of `VAR` and fails if it is unset
//! - `${VAR:-default}` falls back to `default`
//!
//! Bare `$VAR` is left alone so repository URLs and titles may contain `$`.

use crate::ConfigError;

/// Expand environment variable references in `value`.
///
/// `field` is the dotted config path reported in errors (e.g. `source.repo`).
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, UnsetVar> {
        std::env::var(var).map(Some).map_err(|_| UnsetVar(var.to_owned()))
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{}}} not set", e.cause.0),
    })
}

/// Name of a variable that was referenced but not set.
struct UnsetVar(String);
