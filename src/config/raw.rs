use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde_with::serde_as;
use url::Url;

use crate::Result;
use crate::error::ConfigError;
use crate::types::Position;

use super::defaults::{
    FALLBACK_ACTION, default_action_variations, default_css_variables, default_duration,
    default_export_path, default_fixture_path, default_interval, default_order_limit,
    default_position, default_template, default_true,
};
use super::env::{env_bool, env_duration, env_parse, env_string};
use super::{
    HumantimeDuration, NotificationSettings, ORDER_LIMIT_BOUNDS, Settings, StoreSettings,
};

pub(super) fn load(path: impl AsRef<Path>) -> std::result::Result<RawSettings, ConfigError> {
    let path = path.as_ref();
    let mut raw: RawSettings = ::config::Config::builder()
        .add_source(::config::File::from(path).required(false))
        .add_source(
            ::config::Environment::with_prefix("WOO_NOTIFY")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|err| ConfigError::Other(err.to_string()))?
        .try_deserialize()
        .map_err(|err| ConfigError::Parse(err.to_string()))?;
    for name in css_variable_names(path)? {
        raw.notifications.restore_css_case(name);
    }
    Ok(raw)
}

/// CSS variable names exactly as written in the TOML file. The layered
/// loader lowercases map keys, and custom properties are case-sensitive.
fn css_variable_names(path: &Path) -> std::result::Result<Vec<String>, ConfigError> {
    #[derive(Default, Deserialize)]
    struct Names {
        #[serde(default)]
        notifications: NotificationNames,
    }

    #[derive(Default, Deserialize)]
    struct NotificationNames {
        #[serde(default)]
        css_variables: BTreeMap<String, toml::Value>,
    }

    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if !is_toml || !path.is_file() {
        return Ok(Vec::new());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let names: Names = toml::from_str(&text).map_err(|err| ConfigError::Parse(err.to_string()))?;
    Ok(names.notifications.css_variables.into_keys().collect())
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct RawSettings {
    #[serde(default)]
    pub(super) notifications: RawNotifications,
    #[serde(default)]
    pub(super) store: RawStore,
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub(super) struct RawNotifications {
    #[serde(default = "default_interval")]
    #[serde_as(as = "HumantimeDuration")]
    pub(super) interval: Duration,
    #[serde(default = "default_duration")]
    #[serde_as(as = "HumantimeDuration")]
    pub(super) duration: Duration,
    #[serde(default = "default_position")]
    pub(super) position: String,
    #[serde(default = "default_template")]
    pub(super) template: String,
    #[serde(default = "default_true")]
    pub(super) show_product_image: bool,
    #[serde(default = "default_true")]
    pub(super) show_additional_items: bool,
    #[serde(default = "default_action_variations")]
    pub(super) action_variations: Vec<String>,
    #[serde(default = "default_css_variables")]
    pub(super) css_variables: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawStore {
    #[serde(default = "default_order_limit")]
    pub(super) order_limit: usize,
    #[serde(default = "default_export_path")]
    pub(super) export: PathBuf,
    #[serde(default = "default_fixture_path")]
    pub(super) fixture: PathBuf,
    #[serde(default)]
    pub(super) base_url: Option<String>,
    #[serde(default)]
    pub(super) dev_mode: bool,
}

impl RawNotifications {
    fn restore_css_case(&mut self, name: String) {
        let lowered = name.to_lowercase();
        if lowered == name {
            return;
        }
        if let Some(value) = self.css_variables.remove(&lowered) {
            self.css_variables.insert(name, value);
        }
    }
}

impl RawSettings {
    pub(super) fn apply_env_overrides(&mut self) -> std::result::Result<(), ConfigError> {
        if let Some(interval) = env_duration("NOTIFY_INTERVAL")? {
            self.notifications.interval = interval;
        }
        if let Some(duration) = env_duration("NOTIFY_DURATION")? {
            self.notifications.duration = duration;
        }
        if let Some(position) = env_string("NOTIFY_POSITION")? {
            self.notifications.position = position;
        }
        if let Some(template) = env_string("NOTIFY_TEMPLATE")? {
            self.notifications.template = template;
        }
        if let Some(limit) = env_parse::<usize>("ORDER_LIMIT")? {
            self.store.order_limit = limit;
        }
        if let Some(export) = env_string("STORE_EXPORT")? {
            self.store.export = PathBuf::from(export);
        }
        if let Some(base_url) = env_string("STORE_BASE_URL")? {
            self.store.base_url = Some(base_url);
        }
        if let Some(dev_mode) = env_bool("WOO_NOTIFY_DEV_MODE")? {
            self.store.dev_mode = dev_mode;
        }
        Ok(())
    }

    pub(super) fn validate_and_build(self) -> Result<Settings> {
        let Self {
            notifications,
            store,
        } = self;

        if notifications.interval.is_zero() {
            return Err(ConfigError::InvalidField {
                field: "notifications.interval",
                message: "interval must be greater than zero".to_string(),
            }
            .into());
        }
        if notifications.duration.is_zero() {
            return Err(ConfigError::InvalidField {
                field: "notifications.duration",
                message: "duration must be greater than zero".to_string(),
            }
            .into());
        }
        let position =
            Position::from_str(&notifications.position).map_err(|message| {
                ConfigError::InvalidField {
                    field: "notifications.position",
                    message,
                }
            })?;

        if !ORDER_LIMIT_BOUNDS.contains(&store.order_limit) {
            return Err(ConfigError::InvalidField {
                field: "store.order_limit",
                message: format!(
                    "expected between {} and {}, got {}",
                    ORDER_LIMIT_BOUNDS.start(),
                    ORDER_LIMIT_BOUNDS.end(),
                    store.order_limit
                ),
            }
            .into());
        }
        let base_url = store
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(Url::parse)
            .transpose()
            .map_err(|err| ConfigError::InvalidField {
                field: "store.base_url",
                message: err.to_string(),
            })?;

        let mut action_variations: Vec<String> = notifications
            .action_variations
            .iter()
            .map(|action| action.trim())
            .filter(|action| !action.is_empty())
            .map(str::to_string)
            .collect();
        if action_variations.is_empty() {
            action_variations.push(FALLBACK_ACTION.to_string());
        }

        let template = if notifications.template.trim().is_empty() {
            default_template()
        } else {
            notifications.template
        };

        Ok(Settings {
            notifications: NotificationSettings {
                interval: notifications.interval,
                duration: notifications.duration,
                position,
                template,
                show_product_image: notifications.show_product_image,
                show_additional_items: notifications.show_additional_items,
                action_variations,
                css_variables: notifications.css_variables,
            },
            store: StoreSettings {
                order_limit: store.order_limit,
                export: store.export,
                fixture: store.fixture,
                base_url,
                dev_mode: store.dev_mode,
            },
        })
    }
}

impl Default for RawNotifications {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            duration: default_duration(),
            position: default_position(),
            template: default_template(),
            show_product_image: true,
            show_additional_items: true,
            action_variations: default_action_variations(),
            css_variables: default_css_variables(),
        }
    }
}

impl Default for RawStore {
    fn default() -> Self {
        Self {
            order_limit: default_order_limit(),
            export: default_export_path(),
            fixture: default_fixture_path(),
            base_url: None,
            dev_mode: false,
        }
    }
}
