//! Order feed: turns a store export into the order records the engine shows.
//!
//! Only paid orders are considered, newest first. Each surviving order
//! features one randomly picked line item; the rest are counted as
//! additional items.

mod models;

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::Result;
use crate::config::{NotificationSettings, Settings, StoreSettings};
use crate::engine::{Chooser, choose};
use crate::error::FeedError;
use crate::payload::{Order, Product};

pub use models::{CatalogProduct, LineItem, StoreExport, StoreOrder};

/// Loads the orders to embed in the page payload.
///
/// In dev mode the fixture file is returned as-is, and a missing or broken
/// fixture just yields no orders.
///
/// # Errors
///
/// Returns [`FeedError`] when the store export cannot be read or parsed.
pub fn load_orders<C>(settings: &Settings, chooser: &mut C) -> Result<Vec<Order>>
where
    C: Chooser + ?Sized,
{
    if settings.store.dev_mode {
        return Ok(load_fixture(&settings.store.fixture));
    }
    let export = read_export(&settings.store.export)?;
    Ok(select_orders(
        &export,
        &settings.notifications,
        &settings.store,
        chooser,
    ))
}

/// Reads a store export file.
///
/// # Errors
///
/// Fails when the file is unreadable or not a valid export document.
pub fn read_export(path: &Path) -> std::result::Result<StoreExport, FeedError> {
    let raw = fs::read_to_string(path).map_err(|source| FeedError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| FeedError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_fixture(path: &Path) -> Vec<Order> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Fixture {
        List(Vec<Order>),
        Wrapped { orders: Vec<Order> },
    }

    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "no dev fixture, showing nothing");
            return Vec::new();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(Fixture::List(orders) | Fixture::Wrapped { orders }) => orders,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "dev fixture is not a list of orders");
            Vec::new()
        }
    }
}

/// Picks and formats the orders to show from an export.
pub fn select_orders<C>(
    export: &StoreExport,
    notifications: &NotificationSettings,
    store: &StoreSettings,
    chooser: &mut C,
) -> Vec<Order>
where
    C: Chooser + ?Sized,
{
    let mut recent: Vec<&StoreOrder> = export
        .orders
        .iter()
        .filter(|order| order.status.is_eligible())
        .collect();
    recent.sort_by(|a, b| b.date_created.cmp(&a.date_created));
    recent.truncate(store.order_limit);

    let mut selected = Vec::with_capacity(recent.len());
    for order in recent {
        let Some(name) = order.first_name() else {
            debug!(order = order.id, "order has no first name, skipping");
            continue;
        };
        let Some(item) = choose(chooser, &order.items) else {
            debug!(order = order.id, "order has no line items, skipping");
            continue;
        };
        let Some(product) = export.product(item.product_id) else {
            debug!(
                order = order.id,
                product = item.product_id,
                "product missing from catalog, skipping"
            );
            continue;
        };

        let image_url = if notifications.show_product_image {
            product
                .thumbnail
                .as_deref()
                .filter(|thumb| !thumb.is_empty())
                .map(|thumb| resolve_url(store.base_url.as_ref(), thumb))
        } else {
            None
        };
        let additional_items = if notifications.show_additional_items && order.items.len() > 1 {
            i64::try_from(order.items.len() - 1).unwrap_or(i64::MAX)
        } else {
            0
        };

        selected.push(Order {
            name: Some(name.to_string()),
            product: Some(Product {
                title: product.name.clone(),
                url: resolve_url(store.base_url.as_ref(), &product.permalink),
                image_url,
            }),
            additional_items,
        });
    }
    selected
}

/// Joins a possibly relative link onto the store's base URL. Absolute links
/// and links that fail to join are kept as written.
pub fn resolve_url(base: Option<&Url>, raw: &str) -> String {
    base.and_then(|base| base.join(raw).ok())
        .map_or_else(|| raw.to_string(), String::from)
}
