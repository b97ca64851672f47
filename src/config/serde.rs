use std::time::Duration;

use humantime::parse_duration;
use serde::Deserialize;
use serde_with::DeserializeAs;

/// Duration written either as a humantime string (`"10s"`, `"1m 30s"`) or as
/// a bare number of seconds.
pub(crate) struct HumantimeDuration;

impl<'de> DeserializeAs<'de, Duration> for HumantimeDuration {
    fn deserialize_as<D>(deserializer: D) -> std::result::Result<Duration, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Spelled {
            Seconds(u64),
            Text(String),
        }

        match Spelled::deserialize(deserializer)? {
            Spelled::Seconds(secs) => Ok(Duration::from_secs(secs)),
            Spelled::Text(raw) => parse_duration(raw.trim()).map_err(serde::de::Error::custom),
        }
    }
}
