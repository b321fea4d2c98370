//! Cart snapshot and diff models
//!
//! Monetary values are integer minor-currency units throughout. The cart
//! API occasionally reports prices as decimal strings; those are rounded
//! to the nearest integer on ingest so comparisons stay exact.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Point-in-time read of server-side cart state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub item_count: u32,
    /// Total in minor currency units
    pub total_price: i64,
    pub items: Vec<CartLine>,
}

/// One line item in a cart snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(alias = "id")]
    pub variant_id: u64,
    pub quantity: u32,
    /// Unit price in minor currency units
    #[serde(default)]
    pub price: i64,
    /// Line-item customizations; part of the line's identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
}

impl CartLine {
    /// Diff key: variant id plus the canonical JSON rendering of the
    /// line's properties. serde_json maps are ordered, so equal property
    /// sets always render identically.
    pub fn key(&self) -> (u64, String) {
        let props = self
            .properties
            .as_ref()
            .map(|p| p.to_string())
            .unwrap_or_default();
        (self.variant_id, props)
    }

    /// Parse a line item from a loosely-shaped JSON object (lossy; None
    /// when no variant id is present).
    pub fn from_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let variant_id = obj
            .get("variant_id")
            .or_else(|| obj.get("id"))
            .and_then(Value::as_u64)?;
        let quantity = obj.get("quantity").and_then(Value::as_u64).unwrap_or(0) as u32;
        let price = obj.get("price").map(parse_minor_units).unwrap_or(0);
        let properties = obj
            .get("properties")
            .filter(|p| !p.is_null())
            .cloned();
        Some(Self {
            variant_id,
            quantity,
            price,
            properties,
        })
    }
}

impl CartSnapshot {
    /// Parse a snapshot from a cart-read response body (lossy; None when
    /// the body is not a cart document).
    pub fn from_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let items = obj.get("items")?.as_array()?;
        Some(Self {
            item_count: obj.get("item_count").and_then(Value::as_u64).unwrap_or(0) as u32,
            total_price: obj.get("total_price").map(parse_minor_units).unwrap_or(0),
            items: items.iter().filter_map(CartLine::from_json).collect(),
        })
    }
}

/// Authoritative line deltas supplied by a mutation response itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MutationDeltas {
    pub added: Vec<CartLine>,
    pub removed: Vec<CartLine>,
}

impl MutationDeltas {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// A line whose quantity changed between two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineChange {
    pub variant_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
    pub quantity_before: u32,
    pub quantity_after: u32,
    pub price_before: i64,
    pub price_after: i64,
}

/// Structural before/after diff around a cart mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartDiff {
    /// None when no before snapshot was available
    pub items_before: Option<u32>,
    pub items_after: u32,
    pub total_before: Option<i64>,
    pub total_after: i64,
    pub added: Vec<CartLine>,
    pub removed: Vec<CartLine>,
    pub changed: Vec<LineChange>,
}

impl CartDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Read a price as integer minor units. Numbers pass through rounded;
/// decimal strings are parsed then rounded to the nearest integer.
pub fn parse_minor_units(value: &Value) -> i64 {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i
            } else {
                n.as_f64().map(|f| f.round() as i64).unwrap_or(0)
            }
        }
        Value::String(s) => s.trim().parse::<f64>().map(|f| f.round() as i64).unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minor_units_round_decimal_strings() {
        assert_eq!(parse_minor_units(&json!(1999)), 1999);
        assert_eq!(parse_minor_units(&json!(1999.6)), 2000);
        assert_eq!(parse_minor_units(&json!("1999.4")), 1999);
        assert_eq!(parse_minor_units(&json!(" 250 ")), 250);
        assert_eq!(parse_minor_units(&json!(null)), 0);
        assert_eq!(parse_minor_units(&json!("not a price")), 0);
    }

    #[test]
    fn line_key_includes_canonical_properties() {
        let plain = CartLine {
            variant_id: 7,
            quantity: 1,
            price: 100,
            properties: None,
        };
        let engraved = CartLine {
            properties: Some(json!({"engraving": "hi"})),
            ..plain.clone()
        };
        assert_ne!(plain.key(), engraved.key());

        // Same properties in any construction order yield the same key.
        let reordered = CartLine {
            properties: Some(json!({"engraving": "hi"})),
            ..plain.clone()
        };
        assert_eq!(engraved.key(), reordered.key());
    }

    #[test]
    fn snapshot_parses_cart_read_body() {
        let body = json!({
            "item_count": 2,
            "total_price": "3000.2",
            "items": [
                {"variant_id": 1, "quantity": 1, "price": 1000},
                {"id": 2, "quantity": 1, "price": "2000.0", "properties": null}
            ]
        });
        let snap = CartSnapshot::from_json(&body).expect("parses");
        assert_eq!(snap.item_count, 2);
        assert_eq!(snap.total_price, 3000);
        assert_eq!(snap.items.len(), 2);
        assert_eq!(snap.items[1].variant_id, 2);
        assert_eq!(snap.items[1].price, 2000);
        assert!(snap.items[1].properties.is_none());
    }

    #[test]
    fn snapshot_rejects_non_cart_bodies() {
        assert!(CartSnapshot::from_json(&json!({"product": {}})).is_none());
        assert!(CartSnapshot::from_json(&json!("nope")).is_none());
    }
}
