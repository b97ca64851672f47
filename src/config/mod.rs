use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::Result;
use crate::error::Error as NotifyError;
use crate::types::Position;

mod defaults;
mod env;
mod raw;
mod serde;

pub(crate) use defaults::{DEFAULT_TEMPLATE, FALLBACK_ACTION};
pub(crate) use serde::HumantimeDuration;

const ORDER_LIMIT_BOUNDS: RangeInclusive<usize> = 1..=100;

/// Operator settings for the storefront side: what to show and where the
/// order data comes from.
#[derive(Debug, Clone)]
pub struct Settings {
    pub notifications: NotificationSettings,
    pub store: StoreSettings,
}

#[derive(Debug, Clone)]
pub struct NotificationSettings {
    pub interval: Duration,
    pub duration: Duration,
    pub position: Position,
    pub template: String,
    pub show_product_image: bool,
    pub show_additional_items: bool,
    pub action_variations: Vec<String>,
    pub css_variables: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub order_limit: usize,
    pub export: PathBuf,
    pub fixture: PathBuf,
    pub base_url: Option<Url>,
    pub dev_mode: bool,
}

impl Settings {
    /// Load settings from an optional TOML file, `WOO_NOTIFY__*` variables and
    /// the plain environment overrides, in that order.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be parsed, when an environment
    /// override is malformed, or when the merged values fail validation.
    pub fn from_env_and_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut raw = raw::load(path).map_err(NotifyError::from)?;
        raw.apply_env_overrides().map_err(NotifyError::from)?;
        raw.validate_and_build()
    }

    /// Settings used when no file and no environment are present.
    ///
    /// # Errors
    ///
    /// Only fails if the built-in defaults stop validating.
    pub fn defaults() -> Result<Self> {
        raw::RawSettings::default().validate_and_build()
    }
}
