use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Screen corner a notification slides in from.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    #[default]
    BottomRight,
    BottomLeft,
    TopRight,
    TopLeft,
}

impl Position {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BottomRight => "bottom-right",
            Self::BottomLeft => "bottom-left",
            Self::TopRight => "top-right",
            Self::TopLeft => "top-left",
        }
    }

    /// Stylesheet class carrying the corner placement.
    pub const fn class(self) -> &'static str {
        match self {
            Self::BottomRight => "woo-notif-bottom-right",
            Self::BottomLeft => "woo-notif-bottom-left",
            Self::TopRight => "woo-notif-top-right",
            Self::TopLeft => "woo-notif-top-left",
        }
    }

    /// Lenient resolution used on the display path: anything unknown lands
    /// bottom-right.
    pub fn resolve(raw: Option<&str>) -> Self {
        raw.and_then(|value| value.parse().ok()).unwrap_or_default()
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bottom-right" => Ok(Self::BottomRight),
            "bottom-left" => Ok(Self::BottomLeft),
            "top-right" => Ok(Self::TopRight),
            "top-left" => Ok(Self::TopLeft),
            other => Err(format!("unknown position: {other}")),
        }
    }
}

/// Storefront order status as exported by the shop.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OrderStatus {
    Pending,
    Processing,
    OnHold,
    Completed,
    Cancelled,
    Refunded,
    Failed,
    Other(String),
}

impl OrderStatus {
    /// Only orders that were actually paid for are shown to shoppers.
    pub const fn is_eligible(&self) -> bool {
        matches!(self, Self::Processing | Self::Completed)
    }
}

impl From<&str> for OrderStatus {
    fn from(raw: &str) -> Self {
        let lowered = raw.trim().to_ascii_lowercase();
        let bare = lowered.strip_prefix("wc-").unwrap_or(&lowered);
        match bare {
            "pending" => Self::Pending,
            "processing" => Self::Processing,
            "on-hold" => Self::OnHold,
            "completed" => Self::Completed,
            "cancelled" => Self::Cancelled,
            "refunded" => Self::Refunded,
            "failed" => Self::Failed,
            _ => Self::Other(bare.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for OrderStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw.as_str()))
    }
}
