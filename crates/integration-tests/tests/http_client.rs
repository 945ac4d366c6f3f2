//! Wire-level checks of the HTTP cart client and catalog.

#![allow(clippy::unwrap_used)]

use cart_sync::{CartApi, Catalog, HttpCartClient, HttpCatalog, RemoteError, Session};
use cart_sync_core::{ProductId, ShippingInfo, quantity_of};
use cart_sync_integration_tests::{TOKEN, TestContext, product};
use secrecy::SecretString;

async fn logged_in_client() -> (TestContext, HttpCartClient) {
    let ctx = TestContext::start(&[
        product("P1", 1999, 10),
        product("gift card", 2500, 50),
    ])
    .await;
    ctx.login();
    let client = HttpCartClient::new(ctx.config.api_base_url.clone(), ctx.session.clone());
    (ctx, client)
}

#[tokio::test]
async fn add_returns_normalized_cart() {
    let (_ctx, client) = logged_in_client().await;

    let cart = client.add_item(&ProductId::new("P1"), 2).await.unwrap();

    let item = cart.items.first().unwrap();
    assert_eq!(item.product, ProductId::new("P1"));
    assert_eq!(item.name, "Product P1");
    assert_eq!(item.price.to_string(), "19.99");
    assert_eq!(item.image, "https://cdn.test/P1.jpg");
    assert_eq!(item.stock, 10);
    assert_eq!(item.quantity, 2);
}

#[tokio::test]
async fn set_quantity_replaces_line_total() {
    let (ctx, client) = logged_in_client().await;
    let p1 = ProductId::new("P1");

    client.set_quantity(&p1, 4).await.unwrap();
    let cart = client.set_quantity(&p1, 1).await.unwrap();

    assert_eq!(quantity_of(&cart.items, &p1), 1);
    assert_eq!(ctx.server.lines(), vec![("P1".to_string(), 1)]);
}

#[tokio::test]
async fn add_grows_an_existing_line() {
    let (ctx, client) = logged_in_client().await;
    ctx.server.put_line("P1", 3);

    let cart = client.add_item(&ProductId::new("P1"), 2).await.unwrap();

    assert_eq!(quantity_of(&cart.items, &ProductId::new("P1")), 5);
    assert_eq!(ctx.server.lines(), vec![("P1".to_string(), 5)]);
    assert_eq!(
        ctx.server.request_lines(),
        vec!["GET /api/cart", "POST /api/cart/add"]
    );
}

#[tokio::test]
async fn product_ids_are_path_encoded() {
    let (ctx, client) = logged_in_client().await;
    let gift = ProductId::new("gift card");
    client.add_item(&gift, 1).await.unwrap();

    client.increase(&gift).await.unwrap();
    client.decrease(&gift).await.unwrap();
    client.remove_item(&gift).await.unwrap();
    client.clear().await.unwrap();

    assert_eq!(
        ctx.server.request_lines(),
        vec![
            "GET /api/cart",
            "POST /api/cart/add",
            "PUT /api/cart/increase/gift%20card",
            "PUT /api/cart/decrease/gift%20card",
            "DELETE /api/cart/remove/gift%20card",
            "DELETE /api/cart/clear",
        ]
    );
    assert!(ctx.server.lines().is_empty());
}

#[tokio::test]
async fn every_request_carries_the_session_token() {
    let (ctx, client) = logged_in_client().await;

    client.fetch_cart().await.unwrap();
    client
        .set_shipping(&ShippingInfo {
            address: "12 Harbour Rd".to_string(),
            phone_no: "+44 131 496 0000".to_string(),
            ..ShippingInfo::default()
        })
        .await
        .unwrap();

    let bearer = format!("Bearer {TOKEN}");
    assert!(
        ctx.server
            .requests()
            .iter()
            .all(|r| r.authorization.as_deref() == Some(bearer.as_str()))
    );
    let shipping = ctx.server.shipping().unwrap();
    assert_eq!(shipping["address"], "12 Harbour Rd");
    assert_eq!(shipping["phoneNo"], "+44 131 496 0000");
}

#[tokio::test]
async fn logged_out_client_never_hits_the_network() {
    let ctx = TestContext::start(&[product("P1", 1999, 10)]).await;
    let client = HttpCartClient::new(ctx.config.api_base_url.clone(), Session::new());

    let err = client.fetch_cart().await.unwrap_err();

    assert!(matches!(err, RemoteError::NetworkOrServer(_)));
    assert!(ctx.server.requests().is_empty());
}

#[tokio::test]
async fn status_codes_map_to_failure_classes() {
    let (_ctx, client) = logged_in_client().await;

    let missing = client.add_item(&ProductId::new("P404"), 1).await.unwrap_err();
    assert_eq!(missing, RemoteError::NotFound("Product not found".to_string()));

    let bad = client.set_quantity(&ProductId::new("P1"), 11).await.unwrap_err();
    assert_eq!(bad, RemoteError::BadRequest("Only 10 left in stock".to_string()));
    assert!(bad.is_item_rejected());

    let gone = client.increase(&ProductId::new("P1")).await.unwrap_err();
    assert!(matches!(gone, RemoteError::NotFound(_)));
}

#[tokio::test]
async fn wrong_token_is_a_server_failure() {
    let ctx = TestContext::start(&[product("P1", 1999, 10)]).await;
    let session = Session::with_token(SecretString::from("Zq8rT3wLm5Kx1Vb7Nc9Hd2Fg4Js6Py0A"));
    let client = HttpCartClient::new(ctx.config.api_base_url.clone(), session);

    let err = client.fetch_cart().await.unwrap_err();

    assert!(matches!(err, RemoteError::NetworkOrServer(ref msg) if msg.contains("401")));
}

#[tokio::test]
async fn catalog_caches_hits_but_not_misses() {
    let ctx = TestContext::start(&[product("P1", 1999, 10)]).await;
    let catalog = HttpCatalog::new(ctx.config.api_base_url.clone(), ctx.config.catalog_cache);
    let p1 = ProductId::new("P1");
    let missing = ProductId::new("P2");

    let first = catalog.product(&p1).await.unwrap();
    let second = catalog.product(&p1).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.price.to_string(), "19.99");

    assert!(matches!(
        catalog.product(&missing).await,
        Err(RemoteError::NotFound(_))
    ));
    assert!(matches!(
        catalog.product(&missing).await,
        Err(RemoteError::NotFound(_))
    ));

    assert_eq!(
        ctx.server.request_lines(),
        vec!["GET /api/product/P1", "GET /api/product/P2", "GET /api/product/P2"]
    );

    catalog.invalidate(&p1).await;
    catalog.product(&p1).await.unwrap();
    assert_eq!(ctx.server.requests().len(), 4);
}
