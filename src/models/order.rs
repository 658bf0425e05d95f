//! Grouped-order read model.
//!
//! Orders are stored as flat line-item rows that share a pickup code. This
//! module collapses those rows back into logical orders and applies the
//! price-snapshot fallback chain for rows written by older schema versions.

use serde::Serialize;
use std::collections::HashMap;

/// Round to two decimals, the precision used for all money values.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A flat order row joined with its product and user, as handed over by the
/// repository layer.
#[derive(Debug, Clone)]
pub struct OrderRow {
    pub code: String,
    pub quantity: i32,
    pub collected: bool,
    pub total_amount: f64,
    pub unit_price: Option<f64>,
    pub line_total: Option<f64>,
    pub created_at: String,
    pub product_name: Option<String>,
    pub product_price: Option<f64>,
    pub user: Option<OrderUser>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderUser {
    pub id: i32,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderLine {
    pub product_name: String,
    pub quantity: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub subtotal: f64,
}

/// One logical order: every row sharing a pickup code.
#[derive(Debug, Clone, Serialize)]
pub struct OrderGroup {
    pub code: String,
    pub items: Vec<OrderLine>,
    pub total: f64,
    pub collected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<OrderUser>,
    pub created_at: Option<String>,
}

/// Price fallback per row: snapshot unit price, then snapshot line total,
/// then the live product price, then the legacy `total_amount`.
fn line_from_row(row: &OrderRow) -> OrderLine {
    let product_name = row
        .product_name
        .clone()
        .unwrap_or_else(|| "Unknown".to_string());

    if let Some(unit_price) = row.unit_price {
        return OrderLine {
            product_name,
            quantity: row.quantity,
            price: Some(unit_price),
            subtotal: round2(unit_price * f64::from(row.quantity)),
        };
    }

    if let Some(line_total) = row.line_total {
        return OrderLine {
            product_name,
            quantity: row.quantity,
            price: None,
            subtotal: line_total,
        };
    }

    if let Some(price) = row.product_price {
        return OrderLine {
            product_name,
            quantity: row.quantity,
            price: Some(price),
            subtotal: round2(price * f64::from(row.quantity)),
        };
    }

    OrderLine {
        product_name,
        quantity: row.quantity,
        price: None,
        subtotal: row.total_amount,
    }
}

/// Collapse rows sharing one code into a single logical order.
///
/// The group is collected only if every row is collected, its timestamp is
/// the earliest row's, and its user is the first row that has one.
#[must_use]
pub fn build_group(code: String, rows: &[OrderRow]) -> OrderGroup {
    let mut items = Vec::with_capacity(rows.len());
    let mut total = 0.0;
    let mut collected = true;
    let mut created_at: Option<String> = None;
    let mut user: Option<OrderUser> = None;

    for row in rows {
        let line = line_from_row(row);
        total += line.subtotal;
        items.push(line);

        collected = collected && row.collected;

        match &created_at {
            Some(existing) if existing.as_str() <= row.created_at.as_str() => {}
            _ => created_at = Some(row.created_at.clone()),
        }

        if user.is_none() {
            user = row.user.clone();
        }
    }

    OrderGroup {
        code,
        items,
        total: round2(total),
        collected,
        user,
        created_at,
    }
}

/// Group a flat row set by pickup code, newest order first.
#[must_use]
pub fn group_rows(rows: Vec<OrderRow>) -> Vec<OrderGroup> {
    let mut by_code: HashMap<String, Vec<OrderRow>> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for row in rows {
        let bucket = by_code.entry(row.code.clone()).or_default();
        if bucket.is_empty() {
            order.push(row.code.clone());
        }
        bucket.push(row);
    }

    let mut groups: Vec<OrderGroup> = order
        .into_iter()
        .map(|code| {
            let rows = by_code.remove(&code).unwrap_or_default();
            build_group(code, &rows)
        })
        .collect();

    groups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    groups
}
