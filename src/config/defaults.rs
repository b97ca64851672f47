use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

pub(crate) const DEFAULT_TEMPLATE: &str = "{name} just {action} {product}{additional_items}";
pub(crate) const FALLBACK_ACTION: &str = "purchased";

pub(super) const fn default_order_limit() -> usize {
    20
}

pub(super) const fn default_interval() -> Duration {
    Duration::from_secs(10)
}

pub(super) const fn default_duration() -> Duration {
    Duration::from_secs(5)
}

pub(super) fn default_position() -> String {
    "bottom-right".to_string()
}

pub(super) fn default_template() -> String {
    DEFAULT_TEMPLATE.to_string()
}

pub(super) const fn default_true() -> bool {
    true
}

pub(super) fn default_action_variations() -> Vec<String> {
    ["purchased", "ordered", "bought", "got"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub(super) fn default_css_variables() -> BTreeMap<String, String> {
    [
        ("--woo-notif-bg-color", "#ffffff"),
        ("--woo-notif-text-color", "#333333"),
        ("--woo-notif-border-radius", "8px"),
        ("--woo-notif-padding", "16px 20px"),
        ("--woo-notif-font-size", "16px"),
        ("--woo-notif-box-shadow", "0 4px 12px rgba(0, 0, 0, 0.15)"),
        ("--woo-notif-animation-duration", "0.3s"),
        ("--woo-notif-link-color", "#266431"),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value.to_string()))
    .collect()
}

pub(super) fn default_export_path() -> PathBuf {
    PathBuf::from("store-export.json")
}

pub(super) fn default_fixture_path() -> PathBuf {
    PathBuf::from("test-orders.json")
}
