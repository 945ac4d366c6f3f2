//! Shipping address attached to a cart.

use serde::{Deserialize, Serialize};

/// Shipping address fields.
///
/// Persisted locally and synced remotely independently of the cart items.
/// Missing fields deserialize as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingInfo {
    /// Street address.
    pub address: String,
    /// City.
    pub city: String,
    /// State or province.
    pub state: String,
    /// Postal or ZIP code.
    pub postal_code: String,
    /// Country name or code.
    pub country: String,
    /// Contact phone number.
    pub phone_no: String,
}

impl ShippingInfo {
    /// Whether every field required to ship is filled in.
    ///
    /// `state` and `phone_no` are optional.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [&self.address, &self.city, &self.postal_code, &self.country]
            .iter()
            .all(|field| !field.trim().is_empty())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_fills_defaults() {
        let info: ShippingInfo =
            serde_json::from_str(r#"{"address":"1 Main St","postalCode":"94107"}"#).unwrap();
        assert_eq!(info.address, "1 Main St");
        assert_eq!(info.postal_code, "94107");
        assert!(info.city.is_empty());
        assert!(!info.is_complete());
    }

    #[test]
    fn test_is_complete() {
        let info = ShippingInfo {
            address: "1 Main St".to_string(),
            city: "San Francisco".to_string(),
            postal_code: "94107".to_string(),
            country: "US".to_string(),
            ..ShippingInfo::default()
        };
        assert!(info.is_complete());
    }
}
