//! A minimal cart backend served with axum.
//!
//! Speaks the same JSON shapes as the production API: cart lines carry a
//! populated product document, prices arrive as strings inside carts and as
//! numbers from the catalog, and everything is wrapped in `cart`/`product`.
//! Like the production API, `POST /cart/add` stores the posted quantity as
//! the line total.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use cart_sync_core::Product;
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

/// A request as the mock saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
}

#[derive(Debug, Default)]
struct MockState {
    token: String,
    products: HashMap<String, Product>,
    lines: Vec<(String, u32)>,
    shipping: Option<Value>,
    requests: Vec<RecordedRequest>,
    failure: Option<StatusCode>,
}

/// Handle to a running mock backend.
#[derive(Debug, Clone, Default)]
pub struct MockCartServer {
    state: Arc<Mutex<MockState>>,
}

impl MockCartServer {
    /// Start serving on an ephemeral localhost port under `/api/`.
    ///
    /// Cart endpoints require `Authorization: Bearer <token>`; the catalog is
    /// public.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start(products: &[Product], token: &str) -> (Self, Url) {
        let server = Self::default();
        {
            let mut state = server.lock();
            state.token = token.to_string();
            state.products = products
                .iter()
                .map(|p| (p.id.to_string(), p.clone()))
                .collect();
        }

        let api = Router::new()
            .route("/cart", get(fetch_cart))
            .route("/cart/add", post(add_item))
            .route("/cart/increase/{id}", put(increase))
            .route("/cart/decrease/{id}", put(decrease))
            .route("/cart/remove/{id}", delete(remove_item))
            .route("/cart/clear", delete(clear))
            .route("/cart/shipping", post(set_shipping))
            .route("/product/{id}", get(product));

        let app = Router::new()
            .nest("/api", api)
            .layer(middleware::from_fn_with_state(server.clone(), track))
            .with_state(server.clone());

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("Failed to bind mock server");
        let addr = listener.local_addr().expect("Mock server has no address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let base_url = Url::parse(&format!("http://{addr}/api/")).expect("Invalid mock URL");
        (server, base_url)
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answer every request with `status` until cleared with `None`.
    pub fn fail_with(&self, status: Option<StatusCode>) {
        self.lock().failure = status;
    }

    /// Remove a product from the catalog.
    pub fn delete_product(&self, id: &str) {
        self.lock().products.remove(id);
    }

    /// Seed a cart line.
    pub fn put_line(&self, id: &str, quantity: u32) {
        let mut state = self.lock();
        state.lines.retain(|(line, _)| line != id);
        state.lines.push((id.to_string(), quantity));
    }

    /// Cart lines as `(product, quantity)`.
    #[must_use]
    pub fn lines(&self) -> Vec<(String, u32)> {
        self.lock().lines.clone()
    }

    /// Last shipping document received.
    #[must_use]
    pub fn shipping(&self) -> Option<Value> {
        self.lock().shipping.clone()
    }

    /// Every request received, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// `METHOD path` for each request, for compact assertions.
    #[must_use]
    pub fn request_lines(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }

    fn cart_json(state: &MockState) -> Value {
        let items: Vec<Value> = state
            .lines
            .iter()
            .filter_map(|(id, quantity)| {
                let product = state.products.get(id)?;
                Some(json!({
                    "product": {
                        "_id": id,
                        "name": product.name,
                        "price": product.price.to_string(),
                        "images": [{ "url": product.image }],
                        "stock": product.stock,
                    },
                    "quantity": quantity,
                }))
            })
            .collect();

        json!({
            "cart": {
                "items": items,
                "shippingInfo": state.shipping,
            }
        })
    }
}

fn message(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "message": message.into() }))).into_response()
}

/// Record the request, apply scripted failures, and check the bearer token.
async fn track(State(server): State<MockCartServer>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let authorization = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(String::from);

    let (failure, expected) = {
        let mut state = server.lock();
        state.requests.push(RecordedRequest {
            method: request.method().as_str().to_string(),
            path: path.clone(),
            authorization: authorization.clone(),
        });
        (state.failure, format!("Bearer {}", state.token))
    };

    if let Some(status) = failure {
        return message(status, "Scripted failure");
    }
    if !path.starts_with("/api/product/") && authorization.as_deref() != Some(expected.as_str()) {
        return message(StatusCode::UNAUTHORIZED, "Not authenticated");
    }
    next.run(request).await
}

async fn fetch_cart(State(server): State<MockCartServer>) -> Json<Value> {
    Json(MockCartServer::cart_json(&server.lock()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddBody {
    product_id: String,
    quantity: i64,
}

async fn add_item(State(server): State<MockCartServer>, Json(body): Json<AddBody>) -> Response {
    let mut state = server.lock();
    let Ok(quantity) = u32::try_from(body.quantity) else {
        return message(StatusCode::BAD_REQUEST, "Quantity must be positive");
    };
    if quantity == 0 {
        return message(StatusCode::BAD_REQUEST, "Quantity must be positive");
    }
    let Some(product) = state.products.get(&body.product_id) else {
        return message(StatusCode::NOT_FOUND, "Product not found");
    };
    if quantity > product.stock {
        return message(
            StatusCode::BAD_REQUEST,
            format!("Only {} left in stock", product.stock),
        );
    }

    match state.lines.iter_mut().find(|(id, _)| *id == body.product_id) {
        Some(line) => line.1 = quantity,
        None => state.lines.push((body.product_id, quantity)),
    }
    Json(MockCartServer::cart_json(&state)).into_response()
}

async fn increase(State(server): State<MockCartServer>, Path(id): Path<String>) -> StatusCode {
    let mut state = server.lock();
    match state.lines.iter_mut().find(|(line, _)| *line == id) {
        Some(line) => {
            line.1 += 1;
            StatusCode::OK
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn decrease(State(server): State<MockCartServer>, Path(id): Path<String>) -> StatusCode {
    let mut state = server.lock();
    match state.lines.iter_mut().find(|(line, _)| *line == id) {
        Some(line) => {
            line.1 = line.1.saturating_sub(1).max(1);
            StatusCode::OK
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn remove_item(State(server): State<MockCartServer>, Path(id): Path<String>) -> StatusCode {
    server.lock().lines.retain(|(line, _)| *line != id);
    StatusCode::OK
}

async fn clear(State(server): State<MockCartServer>) -> StatusCode {
    server.lock().lines.clear();
    StatusCode::OK
}

async fn set_shipping(State(server): State<MockCartServer>, Json(body): Json<Value>) -> Json<Value> {
    server.lock().shipping = Some(body);
    Json(json!({ "success": true }))
}

async fn product(State(server): State<MockCartServer>, Path(id): Path<String>) -> Response {
    let state = server.lock();
    let Some(product) = state.products.get(&id) else {
        return message(StatusCode::NOT_FOUND, "Product not found");
    };
    let price: Value = serde_json::from_str(&product.price.to_string()).unwrap_or(Value::Null);
    Json(json!({
        "product": {
            "_id": id,
            "name": product.name,
            "price": price,
            "images": [{ "url": product.image }],
            "stock": product.stock,
        }
    }))
    .into_response()
}
