//! Terminal output.

#![allow(clippy::print_stdout)]

use cart_sync::{CartState, LoginSync};
use cart_sync_core::CartItem;
use rust_decimal::Decimal;

const NAME_WIDTH: usize = 32;

/// Print the item table, shipping address, and sync status.
pub fn cart(state: &CartState, authenticated: bool) {
    if state.items.is_empty() {
        println!("Cart is empty");
    } else {
        println!(
            "{:<26} {:<NAME_WIDTH$} {:>5} {:>10} {:>10}",
            "PRODUCT", "NAME", "QTY", "PRICE", "TOTAL"
        );
        for item in &state.items {
            println!("{}", line(item));
        }
        println!(
            "{} unit(s), total {}",
            state.item_count(),
            money(total(&state.items))
        );
    }

    if state.shipping_info.is_complete() {
        let info = &state.shipping_info;
        println!(
            "Ship to: {}, {} {}, {}",
            info.address, info.city, info.postal_code, info.country
        );
    }

    if authenticated {
        let status = if state.db_synced {
            "synced with account"
        } else {
            "not synced with account"
        };
        println!("Status: {status}");
    }

    if let Some(error) = &state.error {
        println!("Note: {error}");
    }
}

/// Print what the login sync did.
pub fn sync_outcome(outcome: &LoginSync) {
    match outcome {
        LoginSync::Skipped => println!("Cart already synced"),
        LoginSync::Fetched => println!("Loaded account cart"),
        LoginSync::Unavailable => println!("Account cart unavailable, keeping local cart"),
        LoginSync::Merged(report) => {
            println!("Merged {} item(s) into account cart", report.accepted.len());
            for product in &report.rejected {
                println!("Dropped unavailable product {product}");
            }
            for product in &report.failed {
                println!("Could not sync product {product}");
            }
        }
    }
}

fn line(item: &CartItem) -> String {
    format!(
        "{:<26} {:<NAME_WIDTH$} {:>5} {:>10} {:>10}",
        item.product.as_str(),
        truncate(&item.name, NAME_WIDTH),
        item.quantity,
        money(item.price),
        money(item.line_total())
    )
}

fn total(items: &[CartItem]) -> Decimal {
    items.iter().map(CartItem::line_total).sum()
}

fn money(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        return name.to_string();
    }
    let mut short: String = name.chars().take(width.saturating_sub(1)).collect();
    short.push('…');
    short
}
