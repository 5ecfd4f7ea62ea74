//! Maps a marketplace's raw product record into the canonical row.
//!
//! Remote payloads are loosely structured: beyond `id`, every field may be
//! absent, null, an empty list or a nested object, and the shape shifts per
//! marketplace and per item. Scalars default to None; list-shaped fields
//! default to `[]` and object-shaped fields to `{}`, serialized to text so
//! they round-trip losslessly through scalar storage columns.

use crate::sync::error::SyncError;
use bigdecimal::BigDecimal;
use serde_json::Value;
use std::str::FromStr;

/// Canonical stored representation of one remote product, keyed by the
/// marketplace-native id. The `images`/`attachments`/`family`/... fields hold
/// the serialized encoding described in the module docs.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRow {
    pub id: i64,
    pub part_number_key: Option<String>,
    pub brand_name: Option<String>,
    pub buy_button_rank: Option<i32>,
    pub category_id: Option<i32>,
    pub brand: Option<String>,
    pub name: Option<String>,
    pub part_number: Option<String>,
    pub sale_price: Option<BigDecimal>,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub warranty: Option<i32>,
    pub general_stock: Option<i32>,
    pub weight: Option<BigDecimal>,
    pub status: Option<i32>,
    pub recommended_price: Option<BigDecimal>,
    pub images: String,
    pub attachments: String,
    pub vat_id: Option<i32>,
    pub family: String,
    pub reversible_vat_charging: Option<bool>,
    pub min_sale_price: Option<BigDecimal>,
    pub max_sale_price: Option<BigDecimal>,
    pub offer_details: String,
    pub availability: String,
    pub stock: String,
    pub handling_time: String,
    pub ean: String,
    pub commission: Option<BigDecimal>,
    pub validation_status: String,
    pub translation_validation_status: String,
    pub offer_validation_status: String,
    pub auto_translated: Option<i32>,
    pub ownership: Option<bool>,
    pub best_offer_sale_price: Option<BigDecimal>,
    pub best_offer_recommended_price: Option<BigDecimal>,
    pub number_of_offers: Option<i32>,
    pub genius_eligibility: Option<i32>,
    pub recycle_warranties: Option<i32>,
}

impl ProductRow {
    /// Decode the stored images encoding back into the received sequence.
    pub fn decoded_images(&self) -> Vec<Value> {
        serde_json::from_str(&self.images).unwrap_or_default()
    }
}

/// Normalize one raw record. Only fails when the record has no usable `id`,
/// since that is the upsert key; a sparse-but-well-formed record always maps.
pub fn normalize(record: &Value) -> Result<ProductRow, SyncError> {
    let id = record
        .get("id")
        .and_then(value_as_i64)
        .ok_or_else(|| SyncError::MalformedRecord("record without id".into()))?;

    Ok(ProductRow {
        id,
        part_number_key: opt_str(record, "part_number_key"),
        brand_name: opt_str(record, "brand_name"),
        buy_button_rank: opt_i32(record, "buy_button_rank"),
        category_id: opt_i32(record, "category_id"),
        brand: opt_str(record, "brand"),
        name: opt_str(record, "name"),
        part_number: opt_str(record, "part_number"),
        sale_price: opt_decimal(record, "sale_price"),
        currency: opt_str(record, "currency"),
        description: opt_str(record, "description"),
        url: opt_str(record, "url"),
        warranty: opt_i32(record, "warranty"),
        general_stock: opt_i32(record, "general_stock"),
        weight: opt_decimal(record, "weight"),
        status: opt_i32(record, "status"),
        recommended_price: opt_decimal(record, "recommended_price"),
        images: encoded_seq(record, "images"),
        attachments: encoded_seq(record, "attachments"),
        vat_id: opt_i32(record, "vat_id"),
        family: encoded_map(record, "family"),
        reversible_vat_charging: opt_bool(record, "reversible_vat_charging"),
        min_sale_price: opt_decimal(record, "min_sale_price"),
        max_sale_price: opt_decimal(record, "max_sale_price"),
        offer_details: encoded_map(record, "offer_details"),
        availability: encoded_seq(record, "availability"),
        stock: encoded_seq(record, "stock"),
        handling_time: encoded_seq(record, "handling_time"),
        ean: encoded_seq(record, "ean"),
        commission: opt_decimal(record, "commission"),
        validation_status: encoded_seq(record, "validation_status"),
        translation_validation_status: encoded_seq(record, "translation_validation_status"),
        offer_validation_status: encoded_map(record, "offer_validation_status"),
        auto_translated: opt_i32(record, "auto_translated"),
        ownership: opt_bool(record, "ownership"),
        best_offer_sale_price: opt_decimal(record, "best_offer_sale_price"),
        best_offer_recommended_price: opt_decimal(record, "best_offer_recommended_price"),
        number_of_offers: opt_i32(record, "number_of_offers"),
        genius_eligibility: opt_i32(record, "genius_eligibility"),
        recycle_warranties: opt_i32(record, "recycleWarranties"),
    })
}

fn value_as_i64(v: &Value) -> Option<i64> {
    if let Some(n) = v.as_i64() {
        return Some(n);
    }
    if let Some(s) = v.as_str() {
        return s.trim().parse::<i64>().ok();
    }
    None
}

fn opt_str(record: &Value, key: &str) -> Option<String> {
    record
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

fn opt_i32(record: &Value, key: &str) -> Option<i32> {
    record
        .get(key)
        .and_then(value_as_i64)
        .and_then(|n| i32::try_from(n).ok())
}

fn opt_bool(record: &Value, key: &str) -> Option<bool> {
    let v = record.get(key)?;
    if let Some(b) = v.as_bool() {
        return Some(b);
    }
    // Some marketplaces report boolean-ish fields as 0/1 integers.
    v.as_i64().map(|n| n != 0)
}

fn opt_decimal(record: &Value, key: &str) -> Option<BigDecimal> {
    let v = record.get(key)?;
    match v {
        // Go through the literal text so 16.4-scale prices keep their digits.
        Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        Value::String(s) if !s.trim().is_empty() => BigDecimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// Sequence-shaped field: serialize as received (order preserved), `[]` when
/// absent, null, or not a sequence.
fn encoded_seq(record: &Value, key: &str) -> String {
    match record.get(key) {
        Some(v @ Value::Array(_)) => serde_json::to_string(v).unwrap_or_else(|_| "[]".into()),
        _ => "[]".into(),
    }
}

/// Object-shaped field: serialize as received (key order preserved by the
/// encoder), `{}` when absent, null, or not an object.
fn encoded_map(record: &Value, key: &str) -> String {
    match record.get(key) {
        Some(v @ Value::Object(_)) => serde_json::to_string(v).unwrap_or_else(|_| "{}".into()),
        _ => "{}".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sparse_record_maps_with_documented_defaults() {
        let row = normalize(&json!({"id": 7})).unwrap();
        assert_eq!(row.id, 7);
        assert_eq!(row.name, None);
        assert_eq!(row.sale_price, None);
        assert_eq!(row.images, "[]");
        assert_eq!(row.attachments, "[]");
        assert_eq!(row.ean, "[]");
        assert_eq!(row.family, "{}");
        assert_eq!(row.offer_details, "{}");
        assert_eq!(row.offer_validation_status, "{}");
        assert!(row.decoded_images().is_empty());
    }

    #[test]
    fn null_and_wrong_shapes_fall_back_to_defaults() {
        let row = normalize(&json!({
            "id": 8,
            "images": null,
            "family": null,
            "stock": "oops",
            "sale_price": "",
        }))
        .unwrap();
        assert_eq!(row.images, "[]");
        assert_eq!(row.family, "{}");
        assert_eq!(row.stock, "[]");
        assert_eq!(row.sale_price, None);
    }

    #[test]
    fn record_without_id_is_malformed() {
        assert!(matches!(
            normalize(&json!({"name": "ghost product"})),
            Err(SyncError::MalformedRecord(_))
        ));
    }

    #[test]
    fn string_id_is_accepted() {
        let row = normalize(&json!({"id": "4421"})).unwrap();
        assert_eq!(row.id, 4421);
    }

    #[test]
    fn scalars_and_prices_map() {
        let row = normalize(&json!({
            "id": 12,
            "name": "USB-C Cable",
            "brand": "Acme",
            "category_id": 506,
            "sale_price": 19.9900,
            "recommended_price": "24.99",
            "general_stock": 250,
            "status": 1,
            "reversible_vat_charging": 0,
            "ownership": 1,
        }))
        .unwrap();
        assert_eq!(row.name.as_deref(), Some("USB-C Cable"));
        assert_eq!(row.category_id, Some(506));
        assert_eq!(row.sale_price, Some(BigDecimal::from_str("19.99").unwrap()));
        assert_eq!(
            row.recommended_price,
            Some(BigDecimal::from_str("24.99").unwrap())
        );
        assert_eq!(row.reversible_vat_charging, Some(false));
        assert_eq!(row.ownership, Some(true));
    }

    #[test]
    fn nested_structures_round_trip_through_the_encoding() {
        let images = json!([
            {"url": "https://img.shop.test/a/1.jpg", "display_type": 1},
            {"url": "https://img.shop.test/a/2.jpg", "display_type": 2}
        ]);
        let row = normalize(&json!({
            "id": 30,
            "images": images,
            "family": {"id": 9, "name": "cables", "family_type_id": 2},
            "ean": ["5941234567890"],
        }))
        .unwrap();

        let decoded: Value = serde_json::from_str(&row.images).unwrap();
        assert_eq!(decoded, images);
        assert_eq!(row.decoded_images().len(), 2);

        let family: Value = serde_json::from_str(&row.family).unwrap();
        assert_eq!(family["name"], "cables");

        let ean: Value = serde_json::from_str(&row.ean).unwrap();
        assert_eq!(ean, json!(["5941234567890"]));
    }

    #[test]
    fn normalize_is_deterministic() {
        let record = json!({"id": 99, "name": "x", "images": [{"url": "u"}]});
        assert_eq!(normalize(&record).unwrap(), normalize(&record).unwrap());
    }
}
