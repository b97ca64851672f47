//! The configuration object handed to the notification engine at page load.
//!
//! The storefront serialises it into the page and the engine ingests it once.
//! WordPress' script localisation stringifies top-level scalars, so numbers
//! and flags are accepted in their string spellings as well.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{DEFAULT_TEMPLATE, FALLBACK_ACTION, NotificationSettings};
use crate::engine::css_time;
use crate::types::Position;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_DURATION: Duration = Duration::from_secs(5);
const DEFAULT_LEAVE_DELAY: Duration = Duration::from_millis(300);
const ANIMATION_DURATION_VAR: &str = "--woo-notif-animation-duration";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    #[serde(default, deserialize_with = "lenient_orders")]
    pub orders: Vec<Order>,
    #[serde(default, deserialize_with = "lenient_millis")]
    pub interval: Option<u64>,
    #[serde(default, deserialize_with = "lenient_millis")]
    pub duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub show_product_image: bool,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub show_additional_items: bool,
    #[serde(default)]
    pub action_variations: Vec<String>,
    #[serde(default)]
    pub css_variables: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Order {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,
    #[serde(
        default,
        alias = "additionalItems",
        deserialize_with = "lenient_count"
    )]
    pub additional_items: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Product {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, alias = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Ingested, defaulted view of a [`Payload`]. Immutable for the engine's life.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub orders: Vec<Order>,
    pub interval: Duration,
    pub duration: Duration,
    pub position: Position,
    pub template: String,
    pub show_product_image: bool,
    pub show_additional_items: bool,
    pub action_variations: Vec<String>,
    pub css_variables: BTreeMap<String, String>,
}

impl Order {
    /// The displayable parts of the record, if both are present.
    pub fn displayable(&self) -> Option<(&str, &Product)> {
        let name = self.name.as_deref().filter(|name| !name.is_empty())?;
        Some((name, self.product.as_ref()?))
    }
}

impl Payload {
    /// Builds the page payload. `None` when there is nothing to show, in which
    /// case the storefront should not load the widget at all.
    pub fn from_settings(settings: &NotificationSettings, orders: Vec<Order>) -> Option<Self> {
        if orders.is_empty() {
            return None;
        }
        Some(Self {
            orders,
            interval: Some(as_millis(settings.interval)),
            duration: Some(as_millis(settings.duration)),
            position: Some(settings.position.to_string()),
            template: Some(settings.template.clone()),
            show_product_image: settings.show_product_image,
            show_additional_items: settings.show_additional_items,
            action_variations: settings.action_variations.clone(),
            css_variables: settings.css_variables.clone(),
        })
    }
}

impl EngineConfig {
    /// Accepts the payload, or `None` when it is absent or carries no orders.
    pub fn ingest(payload: Option<Payload>) -> Option<Self> {
        let payload = payload?;
        if payload.orders.is_empty() {
            return None;
        }

        let mut action_variations = payload.action_variations;
        if action_variations.is_empty() {
            action_variations.push(FALLBACK_ACTION.to_string());
        }

        Some(Self {
            orders: payload.orders,
            interval: positive_millis(payload.interval).unwrap_or(DEFAULT_INTERVAL),
            duration: positive_millis(payload.duration).unwrap_or(DEFAULT_DURATION),
            position: Position::resolve(payload.position.as_deref()),
            template: payload
                .template
                .filter(|template| !template.is_empty())
                .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string()),
            show_product_image: payload.show_product_image,
            show_additional_items: payload.show_additional_items,
            action_variations,
            css_variables: payload.css_variables,
        })
    }

    /// How long the hide transition runs. Follows the stylesheet's animation
    /// duration variable when it is set to a valid CSS time.
    pub fn leave_delay(&self) -> Duration {
        self.css_variables
            .get(ANIMATION_DURATION_VAR)
            .and_then(|raw| css_time(raw))
            .unwrap_or(DEFAULT_LEAVE_DELAY)
    }
}

fn positive_millis(raw: Option<u64>) -> Option<Duration> {
    raw.filter(|&ms| ms > 0).map(Duration::from_millis)
}

fn as_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Numberish {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
}

impl Numberish {
    fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            #[allow(clippy::cast_possible_truncation)]
            Self::Float(value) if value.is_finite() => Some(value.trunc() as i64),
            Self::Str(value) => value.trim().parse::<f64>().ok().and_then(|parsed| {
                Self::Float(parsed).as_i64()
            }),
            Self::Float(_) | Self::Bool(_) | Self::Null => None,
        }
    }
}

fn lenient_millis<'de, D>(de: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Numberish::deserialize(de)?
        .as_i64()
        .and_then(|value| u64::try_from(value).ok()))
}

fn lenient_count<'de, D>(de: D) -> std::result::Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Numberish::deserialize(de)?.as_i64().unwrap_or(0))
}

/// A record that does not decode keeps its slot as an empty order, so the
/// tick that draws it is skipped instead of the whole payload being dropped.
fn lenient_orders<'de, D>(de: D) -> std::result::Result<Vec<Order>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let records = Option::<Vec<serde_json::Value>>::deserialize(de)?.unwrap_or_default();
    Ok(records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            serde_json::from_value(record).unwrap_or_else(|err| {
                debug!(index, error = %err, "undecodable order record");
                Order::default()
            })
        })
        .collect())
}

fn lenient_flag<'de, D>(de: D) -> std::result::Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Numberish::deserialize(de)? {
        Numberish::Bool(value) => value,
        Numberish::Int(value) => value != 0,
        Numberish::Float(value) => value != 0.0,
        Numberish::Str(value) => matches!(value.trim(), "1" | "true" | "TRUE" | "yes"),
        Numberish::Null => false,
    })
}

#[cfg(test)]
mod tests {
    use super::{EngineConfig, Order, Payload, Product};
    use crate::config::Settings;
    use crate::types::Position;
    use std::time::Duration;

    fn parse(raw: &str) -> Payload {
        match serde_json::from_str(raw) {
            Ok(payload) => payload,
            Err(err) => panic!("payload should parse: {err}"),
        }
    }

    #[test]
    fn missing_or_empty_orders_are_inert() {
        assert!(EngineConfig::ingest(None).is_none());
        assert!(EngineConfig::ingest(Some(parse(r#"{"orders":[]}"#))).is_none());
        assert!(EngineConfig::ingest(Some(parse("{}"))).is_none());
    }

    #[test]
    fn ingest_applies_documented_defaults() {
        let payload = parse(r#"{"orders":[{"name":"Dana"}],"position":"middle"}"#);
        let Some(config) = EngineConfig::ingest(Some(payload)) else {
            panic!("one order is enough to run");
        };
        assert_eq!(config.interval, Duration::from_secs(10));
        assert_eq!(config.duration, Duration::from_secs(5));
        assert_eq!(config.position, Position::BottomRight);
        assert_eq!(config.action_variations, vec!["purchased"]);
        assert_eq!(
            config.template,
            "{name} just {action} {product}{additional_items}"
        );
        assert_eq!(config.leave_delay(), Duration::from_millis(300));
    }

    #[test]
    fn accepts_wordpress_stringified_scalars() {
        let payload = parse(
            r#"{
                "orders":[{"name":"Ana","product":{"title":"Mug","url":"/mug","imageUrl":"/m.png"},"additionalItems":"2"}],
                "interval":"10000","duration":"5000",
                "showProductImage":"1","showAdditionalItems":""
            }"#,
        );
        assert_eq!(payload.interval, Some(10_000));
        assert_eq!(payload.duration, Some(5_000));
        assert!(payload.show_product_image);
        assert!(!payload.show_additional_items);
        let order = &payload.orders[0];
        assert_eq!(order.additional_items, 2);
        assert_eq!(
            order.product.as_ref().and_then(|p| p.image_url.as_deref()),
            Some("/m.png")
        );
    }

    #[test]
    fn broken_record_keeps_the_rest_of_the_payload() {
        let payload = parse(
            r#"{"orders":[
                {"name":"Dana","product":{"title":"Mug","url":"/mug"}},
                {"name":42,"product":{"title":"Tee","url":"/tee"}},
                {"name":"Lee","product":{"title":null,"url":"/cap"}}
            ]}"#,
        );
        assert_eq!(payload.orders.len(), 3);
        assert!(payload.orders[0].displayable().is_some());
        assert_eq!(payload.orders[1], Order::default());
        assert!(payload.orders[2].displayable().is_none());
        assert!(EngineConfig::ingest(Some(payload)).is_some());
    }

    #[test]
    fn zero_timings_fall_back() {
        let payload = parse(r#"{"orders":[{"name":"Ana"}],"interval":0,"duration":-5}"#);
        let Some(config) = EngineConfig::ingest(Some(payload)) else {
            panic!("orders present");
        };
        assert_eq!(config.interval, Duration::from_secs(10));
        assert_eq!(config.duration, Duration::from_secs(5));
    }

    #[test]
    fn leave_delay_follows_animation_variable() {
        let payload = parse(
            r#"{"orders":[{"name":"Ana"}],"cssVariables":{"--woo-notif-animation-duration":"450ms"}}"#,
        );
        let Some(config) = EngineConfig::ingest(Some(payload)) else {
            panic!("orders present");
        };
        assert_eq!(config.leave_delay(), Duration::from_millis(450));
    }

    #[test]
    fn displayable_requires_name_and_product() {
        let product = Product {
            title: "Mug".into(),
            url: "/mug".into(),
            image_url: None,
        };
        let nameless = Order {
            name: Some(String::new()),
            product: Some(product.clone()),
            additional_items: 0,
        };
        let productless = Order {
            name: Some("Dana".into()),
            product: None,
            additional_items: 0,
        };
        let complete = Order {
            name: Some("Dana".into()),
            product: Some(product),
            additional_items: 0,
        };
        assert!(nameless.displayable().is_none());
        assert!(productless.displayable().is_none());
        assert_eq!(complete.displayable().map(|(name, _)| name), Some("Dana"));
    }

    #[test]
    fn from_settings_converts_to_millis_and_skips_empty() {
        let settings = match Settings::defaults() {
            Ok(settings) => settings,
            Err(err) => panic!("defaults: {err}"),
        };
        assert!(Payload::from_settings(&settings.notifications, Vec::new()).is_none());

        let order = Order {
            name: Some("Dana".into()),
            ..Order::default()
        };
        let Some(payload) = Payload::from_settings(&settings.notifications, vec![order]) else {
            panic!("orders present");
        };
        assert_eq!(payload.interval, Some(10_000));
        assert_eq!(payload.duration, Some(5_000));
        assert_eq!(payload.position.as_deref(), Some("bottom-right"));

        let json = match serde_json::to_value(&payload) {
            Ok(json) => json,
            Err(err) => panic!("serialize: {err}"),
        };
        assert_eq!(json["showProductImage"], serde_json::json!(true));
        assert_eq!(json["orders"][0]["additional_items"], serde_json::json!(0));
    }
}
