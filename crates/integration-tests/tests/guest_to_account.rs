//! Guest cart lifecycle: browse logged out, restart, log in, log out.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use cart_sync::{LoginSync, SessionTrigger};
use cart_sync_core::{ProductId, quantity_of};
use cart_sync_integration_tests::{TOKEN, TestContext, product};

fn catalog() -> Vec<cart_sync_core::Product> {
    vec![
        product("P1", 1999, 10),
        product("P2", 500, 3),
        product("P9", 250, 5),
    ]
}

fn id(s: &str) -> ProductId {
    ProductId::new(s)
}

#[tokio::test]
async fn guest_cart_survives_restart_and_merges_on_login() {
    let ctx = TestContext::start(&catalog()).await;

    let first_run = ctx.reconciler();
    first_run.add_item(&id("P1"), 2).await.unwrap();
    first_run.add_item(&id("P2"), 1).await.unwrap();
    let guest_items = first_run.items();

    // Only the public catalog was contacted while logged out.
    assert_eq!(
        ctx.server.request_lines(),
        vec!["GET /api/product/P1", "GET /api/product/P2"]
    );

    let second_run = ctx.reconciler();
    assert_eq!(second_run.items(), guest_items);

    ctx.login();
    let outcome = second_run.sync_on_login().await;

    let LoginSync::Merged(report) = outcome else {
        panic!("expected a merge, got {outcome:?}");
    };
    assert!(report.synced);
    assert_eq!(
        ctx.server.lines(),
        vec![("P1".to_string(), 2), ("P2".to_string(), 1)]
    );

    let state = second_run.state();
    assert!(state.db_synced);
    assert_eq!(quantity_of(&state.items, &id("P1")), 2);
    assert_eq!(quantity_of(&state.items, &id("P2")), 1);
    assert_eq!(state.items.len(), 2);

    let requests = ctx.server.requests();
    let merge: Vec<_> = requests.iter().skip(2).collect();
    assert_eq!(
        merge
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect::<Vec<_>>(),
        vec![
            "GET /api/cart",
            "POST /api/cart/add",
            "GET /api/cart",
            "POST /api/cart/add",
            "GET /api/cart",
        ]
    );
    let bearer = format!("Bearer {TOKEN}");
    assert!(
        merge
            .iter()
            .all(|r| r.authorization.as_deref() == Some(bearer.as_str()))
    );
}

#[tokio::test]
async fn guest_lines_add_onto_existing_account_lines() {
    let ctx = TestContext::start(&catalog()).await;
    ctx.server.put_line("P1", 1);
    let reconciler = ctx.reconciler();
    reconciler.add_item(&id("P1"), 2).await.unwrap();
    reconciler.add_item(&id("P2"), 1).await.unwrap();

    ctx.login();
    let outcome = reconciler.sync_on_login().await;

    assert!(matches!(outcome, LoginSync::Merged(ref report) if report.synced));
    assert_eq!(
        ctx.server.lines(),
        vec![("P1".to_string(), 3), ("P2".to_string(), 1)]
    );
    assert_eq!(quantity_of(&reconciler.items(), &id("P1")), 3);
    assert_eq!(quantity_of(&ctx.store().load_items(), &id("P1")), 3);
}

#[tokio::test]
async fn spawned_trigger_syncs_when_session_logs_in() {
    let ctx = TestContext::start(&catalog()).await;
    let reconciler = ctx.reconciler();
    reconciler.add_item(&id("P1"), 3).await.unwrap();

    let trigger = SessionTrigger::spawn(reconciler.clone());
    let mut state = reconciler.subscribe();
    ctx.login();

    tokio::time::timeout(Duration::from_secs(5), state.wait_for(|s| s.db_synced))
        .await
        .unwrap()
        .unwrap();
    trigger.abort();

    assert_eq!(ctx.server.lines(), vec![("P1".to_string(), 3)]);
    assert!(!reconciler.state().loading);
}

#[tokio::test]
async fn login_with_empty_guest_cart_loads_account_cart() {
    let ctx = TestContext::start(&catalog()).await;
    ctx.server.put_line("P2", 2);
    let reconciler = ctx.reconciler();

    ctx.login();

    assert_eq!(reconciler.sync_on_login().await, LoginSync::Fetched);
    assert_eq!(quantity_of(&reconciler.items(), &id("P2")), 2);
    assert_eq!(
        quantity_of(&ctx.store().load_items(), &id("P2")),
        2,
        "account cart is persisted locally"
    );
}

#[tokio::test]
async fn deleted_product_is_dropped_from_merge() {
    let ctx = TestContext::start(&catalog()).await;
    let reconciler = ctx.reconciler();
    reconciler.add_item(&id("P1"), 1).await.unwrap();
    reconciler.add_item(&id("P9"), 2).await.unwrap();
    reconciler.add_item(&id("P2"), 1).await.unwrap();
    ctx.server.delete_product("P9");

    ctx.login();
    let outcome = reconciler.sync_on_login().await;

    let LoginSync::Merged(report) = outcome else {
        panic!("expected a merge, got {outcome:?}");
    };
    assert_eq!(report.rejected, vec![id("P9")]);
    assert_eq!(report.accepted, vec![id("P1"), id("P2")]);
    assert_eq!(
        ctx.server.lines(),
        vec![("P1".to_string(), 1), ("P2".to_string(), 1)]
    );
    assert!(find_none(&reconciler.items(), "P9"));
}

#[tokio::test]
async fn logout_then_login_restores_account_cart() {
    let ctx = TestContext::start(&catalog()).await;
    let reconciler = ctx.reconciler();
    reconciler.add_item(&id("P1"), 2).await.unwrap();
    ctx.login();
    reconciler.sync_on_login().await;

    ctx.session.logout();
    reconciler.on_logout();

    assert!(reconciler.items().is_empty());
    assert!(ctx.store().load_items().is_empty());
    assert_eq!(ctx.server.lines(), vec![("P1".to_string(), 2)]);

    ctx.login();
    assert_eq!(reconciler.sync_on_login().await, LoginSync::Fetched);
    assert_eq!(quantity_of(&reconciler.items(), &id("P1")), 2);
}

#[tokio::test]
async fn shipping_info_round_trips_through_backend() {
    let ctx = TestContext::start(&catalog()).await;
    let reconciler = ctx.reconciler();
    ctx.login();

    let info = cart_sync_core::ShippingInfo {
        address: "12 Harbour Rd".to_string(),
        city: "Leith".to_string(),
        postal_code: "EH6 6QQ".to_string(),
        country: "GB".to_string(),
        ..Default::default()
    };
    reconciler.set_shipping(info.clone()).await;

    let posted = ctx.server.shipping().unwrap();
    assert_eq!(posted["postalCode"], "EH6 6QQ");

    let restarted = ctx.reconciler();
    assert_eq!(restarted.state().shipping_info, info);
    restarted.refresh().await.unwrap();
    assert_eq!(restarted.state().shipping_info, info);
}

fn find_none(items: &[cart_sync_core::CartItem], product: &str) -> bool {
    cart_sync_core::find(items, &id(product)).is_none()
}
