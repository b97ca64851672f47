use std::time::Duration;

use humantime::parse_duration;

use crate::error::ConfigError;

pub(super) fn env_string(key: &'static str) -> std::result::Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(ConfigError::Other(format!("{key}: {err}"))),
    }
}

/// Reads `key`, ignoring blank values, and converts it with `parse`.
fn env_with<T, E>(
    key: &'static str,
    parse: impl FnOnce(&str) -> std::result::Result<T, E>,
) -> std::result::Result<Option<T>, ConfigError>
where
    E: std::fmt::Display,
{
    let Some(value) = env_string(key)? else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    parse(trimmed)
        .map(Some)
        .map_err(|err| ConfigError::InvalidField {
            field: key,
            message: err.to_string(),
        })
}

pub(super) fn env_parse<T>(key: &'static str) -> std::result::Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_with(key, str::parse::<T>)
}

/// Accepts the usual shell spellings: 1/0, true/false, yes/no, on/off.
pub(super) fn env_bool(key: &'static str) -> std::result::Result<Option<bool>, ConfigError> {
    env_with(key, parse_flag)
}

pub(super) fn env_duration(
    key: &'static str,
) -> std::result::Result<Option<Duration>, ConfigError> {
    env_with(key, parse_duration)
}

pub(super) fn parse_flag(raw: &str) -> std::result::Result<bool, String> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "no" | "n" | "off" => Ok(false),
        other => Err(format!("expected a boolean, got {other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_flag;

    #[test]
    fn flags_accept_shell_spellings() {
        assert_eq!(parse_flag("YES"), Ok(true));
        assert_eq!(parse_flag("off"), Ok(false));
        assert!(parse_flag("maybe").is_err());
    }
}
