use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::types::OrderStatus;

/// A store export: recent orders and the catalog entries they reference.
#[derive(Debug, Default, Deserialize)]
pub struct StoreExport {
    #[serde(default, deserialize_with = "valid_rows")]
    pub orders: Vec<StoreOrder>,
    #[serde(default, deserialize_with = "valid_rows")]
    pub products: Vec<CatalogProduct>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreOrder {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: u64,
    pub status: OrderStatus,
    pub date_created: DateTime<Utc>,
    #[serde(default)]
    pub billing_first_name: Option<String>,
    #[serde(default)]
    pub items: Vec<LineItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineItem {
    #[serde(deserialize_with = "deserialize_id")]
    pub product_id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogProduct {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: u64,
    pub name: String,
    pub permalink: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl StoreOrder {
    /// Trimmed first name, if the customer left one.
    pub fn first_name(&self) -> Option<&str> {
        self.billing_first_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

impl StoreExport {
    pub fn product(&self, id: u64) -> Option<&CatalogProduct> {
        self.products.iter().find(|product| product.id == id)
    }
}

/// Decodes a list row by row, dropping rows that do not fit the model.
fn valid_rows<'de, D, T>(de: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: DeserializeOwned,
{
    let rows = Vec::<serde_json::Value>::deserialize(de)?;
    Ok(rows
        .into_iter()
        .enumerate()
        .filter_map(|(index, row)| {
            serde_json::from_value(row)
                .map_err(|err| debug!(index, error = %err, "skipping export row"))
                .ok()
        })
        .collect())
}

fn deserialize_id<'de, D>(de: D) -> std::result::Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MaybeId {
        Int(u64),
        Str(String),
    }

    match MaybeId::deserialize(de)? {
        MaybeId::Int(id) => Ok(id),
        MaybeId::Str(raw) => raw.trim().parse().map_err(serde::de::Error::custom),
    }
}
