//! Wire types for the remote cart API and their normalization.
//!
//! These types are deliberately permissive: every field is optional and the
//! `product` reference may be either a bare id or a populated product
//! document. Conversion into `cart_sync_core` types enforces the invariants
//! the rest of the engine relies on (non-empty id, quantity >= 1, one line per
//! product).

use std::str::FromStr;

use cart_sync_core::{CartItem, CartResponse, Product, ProductId, ShippingInfo, normalize};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

// =============================================================================
// Requests
// =============================================================================

/// Body of `POST /cart/add`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest<'a> {
    pub product_id: &'a str,
    pub quantity: u32,
}

// =============================================================================
// Responses
// =============================================================================

/// Cart document as sent by the server.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCart {
    #[serde(default)]
    items: Vec<WireItem>,
    #[serde(default)]
    shipping_info: Option<ShippingInfo>,
}

#[derive(Debug, Deserialize)]
struct WireItem {
    product: Option<WireProductRef>,
    name: Option<String>,
    price: Option<WireNumber>,
    image: Option<String>,
    stock: Option<i64>,
    quantity: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireProductRef {
    Id(String),
    Populated(WireProduct),
}

/// Product document, either populated inside a cart line or returned by the
/// catalog endpoint.
#[derive(Debug, Deserialize)]
struct WireProduct {
    #[serde(rename = "_id", alias = "id")]
    id: String,
    name: Option<String>,
    price: Option<WireNumber>,
    image: Option<String>,
    #[serde(default)]
    images: Vec<WireImage>,
    stock: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WireImage {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireNumber {
    Number(serde_json::Number),
    Text(String),
}

impl WireNumber {
    fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Number(n) => Decimal::from_str(&n.to_string()).ok(),
            Self::Text(s) => Decimal::from_str(s.trim()).ok(),
        }
    }
}

impl WireProduct {
    fn primary_image(&self) -> Option<String> {
        self.image
            .clone()
            .filter(|url| !url.is_empty())
            .or_else(|| self.images.first().map(|img| img.url.clone()))
    }
}

// =============================================================================
// Conversions
// =============================================================================

/// Parse a cart response body.
///
/// Accepts the cart at the top level or wrapped as `{ "cart": ... }`; a null
/// or missing cart means the user has no cart yet.
pub fn parse_cart(body: &str) -> Result<CartResponse, serde_json::Error> {
    let value: Value = if body.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(body)?
    };

    let cart_value = match value {
        Value::Object(mut map) if map.contains_key("cart") => {
            map.remove("cart").unwrap_or(Value::Null)
        }
        other => other,
    };

    let wire: WireCart = if cart_value.is_null() {
        WireCart::default()
    } else {
        serde_json::from_value(cart_value)?
    };

    Ok(CartResponse {
        items: normalize(wire.items.into_iter().filter_map(convert_item).collect()),
        shipping_info: wire.shipping_info,
    })
}

/// Parse a catalog product body (`{ "product": ... }` or the bare document).
pub fn parse_product(body: &str) -> Result<Product, serde_json::Error> {
    let value: Value = serde_json::from_str(body)?;
    let product_value = match value {
        Value::Object(mut map) if map.contains_key("product") => {
            map.remove("product").unwrap_or(Value::Null)
        }
        other => other,
    };

    let wire: WireProduct = serde_json::from_value(product_value)?;
    Ok(Product {
        id: ProductId::new(wire.id.clone()),
        name: wire.name.clone().unwrap_or_default(),
        price: wire
            .price
            .as_ref()
            .and_then(WireNumber::to_decimal)
            .unwrap_or_default(),
        image: wire.primary_image().unwrap_or_default(),
        stock: clamp_u32(wire.stock.unwrap_or(0)),
    })
}

/// Extract a server-provided error message (`{ "message": ... }`), if any.
pub fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(String::from)
}

fn convert_item(item: WireItem) -> Option<CartItem> {
    let populated = match &item.product {
        Some(WireProductRef::Populated(product)) => Some(product),
        _ => None,
    };
    let id = match &item.product {
        Some(WireProductRef::Id(id)) => id.clone(),
        Some(WireProductRef::Populated(product)) => product.id.clone(),
        None => String::new(),
    };

    if id.is_empty() {
        warn!(name = ?item.name, "Dropping cart line without product id");
        return None;
    }

    let name = item
        .name
        .or_else(|| populated.and_then(|p| p.name.clone()))
        .unwrap_or_default();
    let price = item
        .price
        .as_ref()
        .or_else(|| populated.and_then(|p| p.price.as_ref()))
        .and_then(WireNumber::to_decimal)
        .unwrap_or_default();
    let image = item
        .image
        .or_else(|| populated.and_then(WireProduct::primary_image))
        .unwrap_or_default();
    let stock = item
        .stock
        .or_else(|| populated.and_then(|p| p.stock))
        .unwrap_or(0);

    Some(CartItem {
        product: ProductId::new(id),
        name,
        price,
        image,
        stock: clamp_u32(stock),
        quantity: clamp_u32(item.quantity.unwrap_or(1)).max(1),
    })
}

fn clamp_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cart_sync_core::quantity_of;

    use super::*;

    #[test]
    fn test_parse_bare_cart() {
        let body = r#"{
            "items": [
                {"product": "p1", "name": "Mango", "price": 4.5, "image": "m.jpg", "stock": 9, "quantity": 2}
            ],
            "shippingInfo": {"address": "1 Main St", "city": "Springfield"}
        }"#;
        let cart = parse_cart(body).unwrap();

        assert_eq!(cart.items.len(), 1);
        let item = cart.items.first().unwrap();
        assert_eq!(item.product, ProductId::new("p1"));
        assert_eq!(item.price, Decimal::new(45, 1));
        assert_eq!(item.stock, 9);
        assert_eq!(item.quantity, 2);
        assert_eq!(cart.shipping_info.unwrap().city, "Springfield");
    }

    #[test]
    fn test_parse_wrapped_cart_with_populated_product() {
        let body = r#"{
            "success": true,
            "cart": {
                "items": [{
                    "product": {"_id": "p2", "name": "Kiwi", "price": "3.25", "images": [{"url": "k.jpg"}], "stock": 4},
                    "quantity": 3
                }]
            }
        }"#;
        let cart = parse_cart(body).unwrap();

        let item = cart.items.first().unwrap();
        assert_eq!(item.product, ProductId::new("p2"));
        assert_eq!(item.name, "Kiwi");
        assert_eq!(item.price, Decimal::new(325, 2));
        assert_eq!(item.image, "k.jpg");
        assert_eq!(item.stock, 4);
        assert_eq!(item.quantity, 3);
        assert!(cart.shipping_info.is_none());
    }

    #[test]
    fn test_parse_null_cart_is_empty() {
        assert!(parse_cart(r#"{"cart": null}"#).unwrap().items.is_empty());
        assert!(parse_cart("").unwrap().items.is_empty());
        assert!(parse_cart("null").unwrap().items.is_empty());
    }

    #[test]
    fn test_parse_cart_normalizes_lines() {
        let body = r#"{"items": [
            {"product": "p1", "quantity": 1},
            {"name": "orphan", "quantity": 1},
            {"product": "p1", "quantity": 2},
            {"product": "p3", "quantity": -4}
        ]}"#;
        let cart = parse_cart(body).unwrap();

        assert_eq!(cart.items.len(), 2);
        assert_eq!(quantity_of(&cart.items, &ProductId::new("p1")), 3);
        assert_eq!(quantity_of(&cart.items, &ProductId::new("p3")), 1);
    }

    #[test]
    fn test_parse_cart_rejects_garbage() {
        assert!(parse_cart("<html>").is_err());
    }

    #[test]
    fn test_parse_product_wrapped_and_bare() {
        let wrapped = r#"{"success": true, "product": {"_id": "p9", "name": "Fig", "price": 7, "images": [{"url": "f.jpg"}], "stock": 12}}"#;
        let product = parse_product(wrapped).unwrap();
        assert_eq!(product.id, ProductId::new("p9"));
        assert_eq!(product.price, Decimal::from(7));
        assert_eq!(product.image, "f.jpg");
        assert_eq!(product.stock, 12);

        let bare = r#"{"id": "p8", "name": "Date", "price": 1.1}"#;
        let product = parse_product(bare).unwrap();
        assert_eq!(product.id, ProductId::new("p8"));
        assert_eq!(product.stock, 0);
        assert!(product.image.is_empty());
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(r#"{"message": "Insufficient stock"}"#).as_deref(),
            Some("Insufficient stock")
        );
        assert_eq!(
            error_message(r#"{"error": "Bad id"}"#).as_deref(),
            Some("Bad id")
        );
        assert!(error_message("oops").is_none());
    }

    #[test]
    fn test_add_item_request_shape() {
        let body = serde_json::to_value(AddItemRequest {
            product_id: "p1",
            quantity: 2,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"productId": "p1", "quantity": 2}));
    }
}
