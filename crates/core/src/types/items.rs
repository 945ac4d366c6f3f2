//! Pure helpers over ordered cart item lists.
//!
//! A cart is an ordered `Vec<CartItem>` (insertion order) holding at most one
//! entry per product. Every helper here preserves both properties.

use super::cart::{CartItem, Product};
use super::id::ProductId;

/// Find the line for `product`.
#[must_use]
pub fn find<'a>(items: &'a [CartItem], product: &ProductId) -> Option<&'a CartItem> {
    items.iter().find(|item| &item.product == product)
}

/// Current quantity of `product`, or 0 if absent.
#[must_use]
pub fn quantity_of(items: &[CartItem], product: &ProductId) -> u32 {
    find(items, product).map_or(0, |item| item.quantity)
}

/// Add `quantity` units of `product`, returning the resulting line quantity.
///
/// If the product is already in the cart its quantity is incremented and the
/// line keeps its position; otherwise a new line is appended.
pub fn merge_quantity(items: &mut Vec<CartItem>, product: &Product, quantity: u32) -> u32 {
    if let Some(existing) = items.iter_mut().find(|item| item.product == product.id) {
        existing.quantity = existing.quantity.saturating_add(quantity);
        return existing.quantity;
    }

    items.push(product.to_cart_item(quantity));
    quantity
}

/// Copy of `items` without the line for `product`.
#[must_use]
pub fn without(items: &[CartItem], product: &ProductId) -> Vec<CartItem> {
    items
        .iter()
        .filter(|item| &item.product != product)
        .cloned()
        .collect()
}

/// Enforce the one-line-per-product invariant.
///
/// Duplicate lines are coalesced into the first occurrence (quantities summed)
/// and lines with quantity 0 or an empty product id are dropped.
#[must_use]
pub fn normalize(items: Vec<CartItem>) -> Vec<CartItem> {
    let mut out: Vec<CartItem> = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity == 0 || item.product.is_empty() {
            continue;
        }
        match out.iter_mut().find(|existing| existing.product == item.product) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
            None => out.push(item),
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn product(id: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            price: Decimal::new(500, 2),
            image: String::new(),
            stock: 20,
        }
    }

    #[test]
    fn test_merge_appends_new_product() {
        let mut items = Vec::new();
        assert_eq!(merge_quantity(&mut items, &product("a"), 2), 2);
        assert_eq!(merge_quantity(&mut items, &product("b"), 1), 1);
        let ids: Vec<_> = items.iter().map(|i| i.product.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn test_merge_sums_deltas_without_duplicates() {
        let mut items = Vec::new();
        for delta in [1, 4, 2] {
            merge_quantity(&mut items, &product("a"), delta);
        }
        assert_eq!(items.len(), 1);
        assert_eq!(quantity_of(&items, &ProductId::new("a")), 7);
    }

    #[test]
    fn test_merge_keeps_position_of_existing_line() {
        let mut items = Vec::new();
        merge_quantity(&mut items, &product("a"), 1);
        merge_quantity(&mut items, &product("b"), 1);
        merge_quantity(&mut items, &product("a"), 1);
        assert_eq!(items.first().unwrap().product.as_str(), "a");
        assert_eq!(items.first().unwrap().quantity, 2);
    }

    #[test]
    fn test_without_removes_only_target() {
        let items = vec![product("a").to_cart_item(1), product("b").to_cart_item(2)];
        let remaining = without(&items, &ProductId::new("a"));
        assert_eq!(remaining.len(), 1);
        assert!(find(&remaining, &ProductId::new("a")).is_none());
        assert_eq!(quantity_of(&remaining, &ProductId::new("b")), 2);
    }

    #[test]
    fn test_normalize_coalesces_and_drops_invalid() {
        let items = vec![
            product("a").to_cart_item(1),
            product("b").to_cart_item(0),
            product("a").to_cart_item(2),
            product("").to_cart_item(5),
        ];
        let normalized = normalize(items);
        assert_eq!(normalized.len(), 1);
        assert_eq!(quantity_of(&normalized, &ProductId::new("a")), 3);
    }
}
