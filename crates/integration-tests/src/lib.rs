//! Integration test support for Shopfront.
//!
//! [`FakeBackend`] is an in-process storefront API served by axum on an
//! ephemeral port. It keeps accounts, products, server carts, orders and
//! chat messages in memory and answers with the same JSON shapes and error
//! bodies as the real API, so the client crate can be exercised end to end.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopfront-integration-tests
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Multipart, Path as UrlPath, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use shopfront_client::ClientConfig;
use uuid::Uuid;

type Shared = Arc<Mutex<BackendState>>;
type Reply = Result<Json<Value>, Response>;

/// Account stored by the fake backend.
struct Account {
    user: Value,
    password: String,
}

#[derive(Clone)]
struct CartRow {
    id: String,
    product_id: String,
    quantity: i64,
    created_at: String,
}

#[derive(Default)]
struct BackendState {
    accounts: Vec<Account>,
    tokens: HashMap<String, String>,
    categories: Vec<Value>,
    products: Vec<Value>,
    carts: HashMap<String, Vec<CartRow>>,
    orders: Vec<Value>,
    chat: Vec<Value>,
    payments_failing: bool,
    chat_unavailable: bool,
    hits: HashMap<&'static str, usize>,
}

impl BackendState {
    fn hit(&mut self, label: &'static str) {
        *self.hits.entry(label).or_default() += 1;
    }

    fn user_by_token(&self, token: &str) -> Option<&Value> {
        let user_id = self.tokens.get(token)?;
        self.accounts
            .iter()
            .map(|account| &account.user)
            .find(|user| user["id"] == user_id.as_str())
    }

    fn product(&self, id: &str) -> Option<&Value> {
        self.products.iter().find(|product| product["id"] == id)
    }

    fn product_mut(&mut self, id: &str) -> Option<&mut Value> {
        self.products.iter_mut().find(|product| product["id"] == id)
    }

    fn issue_token(&mut self, user_id: &str) -> String {
        let token = format!("token-{}", Uuid::new_v4().simple());
        self.tokens.insert(token.clone(), user_id.to_string());
        token
    }

    fn cart_item_json(&self, row: &CartRow) -> Value {
        json!({
            "id": row.id,
            "product_id": row.product_id,
            "quantity": row.quantity,
            "product": self.product(&row.product_id).cloned().unwrap_or(Value::Null),
            "created_at": row.created_at,
        })
    }
}

/// An in-memory storefront API listening on `127.0.0.1`.
pub struct FakeBackend {
    addr: SocketAddr,
    state: Shared,
    server: tokio::task::JoinHandle<()>,
}

impl FakeBackend {
    /// Start the backend on an ephemeral port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn spawn() -> Self {
        let state: Shared = Arc::default();
        let app = router(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("Failed to read local address");
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Fake backend stopped");
            }
        });
        Self {
            addr,
            state,
            server,
        }
    }

    /// Base URL of the API.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Client configuration pointing at this backend.
    ///
    /// # Panics
    ///
    /// Panics if the URL is rejected, which cannot happen for a bound socket.
    #[must_use]
    pub fn config(&self, data_dir: &Path) -> ClientConfig {
        ClientConfig::for_api_url(&self.url())
            .expect("Fake backend URL is valid")
            .with_data_dir(data_dir)
    }

    fn state(&self) -> MutexGuard<'_, BackendState> {
        lock(&self.state)
    }

    /// Create an account and return its id.
    pub fn add_user(&self, email: &str, password: &str, full_name: &str) -> String {
        let mut state = self.state();
        insert_account(&mut state, email, password, Some(full_name), false)
    }

    /// Issue a valid token for an existing account.
    ///
    /// # Panics
    ///
    /// Panics if no account uses `email`.
    pub fn issue_token(&self, email: &str) -> String {
        let mut state = self.state();
        let user_id = state
            .accounts
            .iter()
            .find(|account| account.user["email"] == email)
            .and_then(|account| account.user["id"].as_str())
            .map(str::to_string)
            .expect("No account for email");
        state.issue_token(&user_id)
    }

    /// Invalidate every issued token, as an expiry would.
    pub fn revoke_tokens(&self) {
        self.state().tokens.clear();
    }

    pub fn add_category(&self, id: &str, name: &str) {
        self.state().categories.push(json!({
            "id": id,
            "name": name,
            "description": null,
            "image_url": null,
            "is_active": true,
            "created_at": Utc::now(),
        }));
    }

    /// Add an active product. `price` is a decimal string such as `"12.50"`.
    pub fn add_product(&self, id: &str, name: &str, price: &str, stock: i64) {
        self.state().products.push(json!({
            "id": id,
            "name": name,
            "description": format!("{name} from the fake catalog"),
            "price": price,
            "discount_price": null,
            "category_id": null,
            "image_urls": [format!("https://img.example.com/{id}.jpg")],
            "stock_quantity": stock,
            "is_active": true,
            "is_featured": false,
            "rating": 4.5,
            "review_count": 3,
            "created_at": Utc::now(),
        }));
    }

    /// Mark a product featured and put it in a category.
    pub fn feature_product(&self, id: &str, category_id: Option<&str>) {
        let mut state = self.state();
        if let Some(product) = state.product_mut(id) {
            product["is_featured"] = json!(true);
            if let Some(category_id) = category_id {
                product["category_id"] = json!(category_id);
            }
        }
    }

    /// Current stock of a product, `None` if unknown.
    #[must_use]
    pub fn stock_of(&self, id: &str) -> Option<i64> {
        self.state()
            .product(id)
            .and_then(|product| product["stock_quantity"].as_i64())
    }

    pub fn set_stock(&self, id: &str, stock: i64) {
        if let Some(product) = self.state().product_mut(id) {
            product["stock_quantity"] = json!(stock);
        }
    }

    /// Make payment intent creation fail.
    pub fn set_payments_failing(&self, failing: bool) {
        self.state().payments_failing = failing;
    }

    /// Make the assistant answer with `503`.
    pub fn set_chat_unavailable(&self, unavailable: bool) {
        self.state().chat_unavailable = unavailable;
    }

    /// Number of requests seen by the handler labelled `label`, e.g. `"auth/me"`.
    #[must_use]
    pub fn hits(&self, label: &str) -> usize {
        self.state().hits.get(label).copied().unwrap_or(0)
    }

    /// Orders stored by the backend, newest last.
    #[must_use]
    pub fn orders(&self) -> Vec<Value> {
        self.state().orders.clone()
    }

    /// Total quantity in every server cart.
    #[must_use]
    pub fn server_cart_units(&self) -> i64 {
        self.state()
            .carts
            .values()
            .flatten()
            .map(|row| row.quantity)
            .sum()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn lock(state: &Shared) -> MutexGuard<'_, BackendState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn insert_account(
    state: &mut BackendState,
    email: &str,
    password: &str,
    full_name: Option<&str>,
    google: bool,
) -> String {
    let id = Uuid::new_v4().to_string();
    let username = email.split('@').next().unwrap_or(email);
    state.accounts.push(Account {
        user: json!({
            "id": id,
            "email": email,
            "username": username,
            "full_name": full_name,
            "avatar_url": null,
            "is_active": true,
            "is_verified": google,
            "is_google_user": google,
            "created_at": Utc::now(),
        }),
        password: password.to_string(),
    });
    id
}

// =============================================================================
// Router
// =============================================================================

fn router(state: Shared) -> Router {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/google", post(google))
        .route("/auth/me", get(me))
        .route("/products/", get(list_products))
        .route("/products/categories/", get(list_categories))
        .route("/products/featured/", get(featured_products))
        .route("/products/search/", get(search_products))
        .route("/products/category/{id}", get(products_by_category))
        .route("/products/{id}", get(get_product))
        .route("/cart/", get(get_cart).post(add_to_cart).delete(clear_cart))
        .route("/cart/count", get(cart_count))
        .route("/cart/{id}", put(update_cart_item).delete(remove_cart_item))
        .route("/orders/", get(list_orders).post(create_order))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/payment-intent", post(create_payment_intent))
        .route("/orders/{id}/confirm-payment", post(confirm_payment))
        .route("/orders/{id}/cancel", post(cancel_order))
        .route("/chat/", post(send_chat))
        .route("/chat/sessions", get(chat_sessions))
        .route("/chat/history/{id}", get(chat_history))
        .route("/chat/session/{id}", delete(delete_chat_session))
        .route("/upload/single", post(upload_single))
        .route("/upload/multiple", post(upload_multiple))
        .route("/upload/", delete(delete_upload))
        .with_state(state)
}

fn fail(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

/// Resolve the bearer token to a user id.
fn authorize(state: &BackendState, headers: &HeaderMap) -> Result<String, Response> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .and_then(|token| state.user_by_token(token))
        .and_then(|user| user["id"].as_str())
        .map(str::to_string)
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Could not validate credentials"))
}

fn text<'a>(body: &'a Value, key: &str) -> &'a str {
    body[key].as_str().unwrap_or_default()
}

fn decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .and_then(|raw| Decimal::from_str(raw).ok())
        .unwrap_or_default()
}

fn page(items: Vec<Value>, params: &HashMap<String, String>) -> Vec<Value> {
    let skip = params
        .get("skip")
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(0);
    let limit = params
        .get("limit")
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(100);
    items.into_iter().skip(skip).take(limit).collect()
}

// =============================================================================
// Auth
// =============================================================================

async fn register(State(state): State<Shared>, Json(body): Json<Value>) -> Reply {
    let mut state = lock(&state);
    state.hit("auth/register");
    let email = text(&body, "email");
    if state
        .accounts
        .iter()
        .any(|account| account.user["email"] == email)
    {
        return Err(fail(StatusCode::BAD_REQUEST, "Email already registered"));
    }
    let full_name = body["full_name"].as_str();
    let id = insert_account(&mut state, email, text(&body, "password"), full_name, false);
    let user = state
        .accounts
        .iter()
        .find(|account| account.user["id"] == id.as_str())
        .map(|account| account.user.clone())
        .unwrap_or_default();
    Ok(Json(user))
}

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Reply {
    let mut state = lock(&state);
    state.hit("auth/login");
    let user_id = state
        .accounts
        .iter()
        .find(|account| {
            account.user["email"] == text(&body, "email")
                && account.password == text(&body, "password")
        })
        .and_then(|account| account.user["id"].as_str())
        .map(str::to_string)
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Incorrect email or password"))?;
    let token = state.issue_token(&user_id);
    Ok(Json(json!({ "access_token": token, "token_type": "bearer" })))
}

/// Accepts credentials of the form `google:<email>`.
async fn google(State(state): State<Shared>, Json(body): Json<Value>) -> Reply {
    let mut state = lock(&state);
    state.hit("auth/google");
    let email = text(&body, "token")
        .strip_prefix("google:")
        .ok_or_else(|| fail(StatusCode::BAD_REQUEST, "Invalid Google token"))?
        .to_string();
    let existing = state
        .accounts
        .iter()
        .find(|account| account.user["email"] == email.as_str())
        .and_then(|account| account.user["id"].as_str())
        .map(str::to_string);
    let user_id =
        existing.unwrap_or_else(|| insert_account(&mut state, &email, "", None, true));
    let token = state.issue_token(&user_id);
    Ok(Json(json!({ "access_token": token, "token_type": "bearer" })))
}

async fn me(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let mut state = lock(&state);
    state.hit("auth/me");
    let user_id = authorize(&state, &headers)?;
    state
        .accounts
        .iter()
        .find(|account| account.user["id"] == user_id.as_str())
        .map(|account| Json(account.user.clone()))
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "User not found"))
}

// =============================================================================
// Catalog
// =============================================================================

async fn list_products(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let mut state = lock(&state);
    state.hit("products");
    let search = params.get("search").map(|s| s.to_lowercase());
    let featured_only = params.get("featured_only").is_some_and(|v| v == "true");
    let category = params.get("category_id");
    let matching = state
        .products
        .iter()
        .filter(|p| p["is_active"] == true)
        .filter(|p| !featured_only || p["is_featured"] == true)
        .filter(|p| category.is_none_or(|c| p["category_id"] == c.as_str()))
        .filter(|p| {
            search
                .as_ref()
                .is_none_or(|s| text(p, "name").to_lowercase().contains(s))
        })
        .cloned()
        .collect();
    Json(Value::Array(page(matching, &params)))
}

async fn get_product(State(state): State<Shared>, UrlPath(id): UrlPath<String>) -> Reply {
    let mut state = lock(&state);
    state.hit("products/{id}");
    state
        .product(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Product not found"))
}

async fn list_categories(State(state): State<Shared>) -> Json<Value> {
    let mut state = lock(&state);
    state.hit("products/categories");
    Json(Value::Array(state.categories.clone()))
}

async fn featured_products(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let mut state = lock(&state);
    state.hit("products/featured");
    let featured = state
        .products
        .iter()
        .filter(|p| p["is_featured"] == true)
        .cloned()
        .collect();
    Json(Value::Array(page(featured, &params)))
}

async fn search_products(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let mut state = lock(&state);
    state.hit("products/search");
    let q = params.get("q").map(|q| q.to_lowercase()).unwrap_or_default();
    let matching = state
        .products
        .iter()
        .filter(|p| text(p, "name").to_lowercase().contains(&q))
        .cloned()
        .collect();
    Json(Value::Array(page(matching, &params)))
}

async fn products_by_category(
    State(state): State<Shared>,
    UrlPath(id): UrlPath<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let state = lock(&state);
    let matching = state
        .products
        .iter()
        .filter(|p| p["category_id"] == id.as_str())
        .cloned()
        .collect();
    Json(Value::Array(page(matching, &params)))
}

// =============================================================================
// Server cart
// =============================================================================

async fn get_cart(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let state = lock(&state);
    let user_id = authorize(&state, &headers)?;
    let items = state
        .carts
        .get(&user_id)
        .map(|rows| rows.iter().map(|row| state.cart_item_json(row)).collect())
        .unwrap_or_default();
    Ok(Json(Value::Array(items)))
}

async fn add_to_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let mut state = lock(&state);
    state.hit("cart/add");
    let user_id = authorize(&state, &headers)?;
    let product_id = text(&body, "product_id").to_string();
    let quantity = body["quantity"].as_i64().unwrap_or(1);
    let stock = state
        .product(&product_id)
        .and_then(|p| p["stock_quantity"].as_i64())
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Product not found"))?;

    let rows = state.carts.entry(user_id).or_default();
    let row = match rows.iter_mut().find(|row| row.product_id == product_id) {
        Some(row) => {
            if row.quantity + quantity > stock {
                return Err(fail(StatusCode::BAD_REQUEST, "Not enough stock available"));
            }
            row.quantity += quantity;
            row.clone()
        }
        None => {
            if quantity > stock {
                return Err(fail(StatusCode::BAD_REQUEST, "Not enough stock available"));
            }
            let row = CartRow {
                id: Uuid::new_v4().to_string(),
                product_id,
                quantity,
                created_at: Utc::now().to_rfc3339(),
            };
            rows.push(row.clone());
            row
        }
    };
    Ok(Json(state.cart_item_json(&row)))
}

async fn update_cart_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<String>,
    Json(body): Json<Value>,
) -> Reply {
    let mut state = lock(&state);
    state.hit("cart/update");
    let user_id = authorize(&state, &headers)?;
    let quantity = body["quantity"].as_i64().unwrap_or(0);
    let product_id = state
        .carts
        .get(&user_id)
        .and_then(|rows| rows.iter().find(|row| row.id == id))
        .map(|row| row.product_id.clone())
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Cart item not found"))?;
    let stock = state
        .product(&product_id)
        .and_then(|p| p["stock_quantity"].as_i64())
        .unwrap_or(0);
    if quantity > stock {
        return Err(fail(StatusCode::BAD_REQUEST, "Not enough stock available"));
    }
    let row = state
        .carts
        .get_mut(&user_id)
        .and_then(|rows| rows.iter_mut().find(|row| row.id == id))
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Cart item not found"))?;
    row.quantity = quantity;
    let row = row.clone();
    Ok(Json(state.cart_item_json(&row)))
}

async fn remove_cart_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<String>,
) -> Reply {
    let mut state = lock(&state);
    state.hit("cart/remove");
    let user_id = authorize(&state, &headers)?;
    let rows = state.carts.entry(user_id).or_default();
    let before = rows.len();
    rows.retain(|row| row.id != id);
    if rows.len() == before {
        return Err(fail(StatusCode::NOT_FOUND, "Cart item not found"));
    }
    Ok(Json(json!({ "message": "Item removed from cart" })))
}

async fn clear_cart(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let mut state = lock(&state);
    state.hit("cart/clear");
    let user_id = authorize(&state, &headers)?;
    state.carts.remove(&user_id);
    Ok(Json(json!({ "message": "Cart cleared" })))
}

async fn cart_count(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let mut state = lock(&state);
    state.hit("cart/count");
    let user_id = authorize(&state, &headers)?;
    let count: i64 = state
        .carts
        .get(&user_id)
        .map(|rows| rows.iter().map(|row| row.quantity).sum())
        .unwrap_or(0);
    Ok(Json(json!({ "count": count })))
}

// =============================================================================
// Orders
// =============================================================================

async fn list_orders(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let state = lock(&state);
    let user_id = authorize(&state, &headers)?;
    let orders = state
        .orders
        .iter()
        .filter(|order| order["user_id"] == user_id.as_str())
        .cloned()
        .collect();
    Ok(Json(Value::Array(orders)))
}

fn find_order<'a>(
    state: &'a mut BackendState,
    user_id: &str,
    id: &str,
) -> Result<&'a mut Value, Response> {
    state
        .orders
        .iter_mut()
        .find(|order| order["id"] == id && order["user_id"] == user_id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Order not found"))
}

async fn get_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<String>,
) -> Reply {
    let mut state = lock(&state);
    let user_id = authorize(&state, &headers)?;
    find_order(&mut state, &user_id, &id).map(|order| Json(order.clone()))
}

/// Build an order from the server cart, reserving stock.
async fn create_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let mut state = lock(&state);
    state.hit("orders/create");
    let user_id = authorize(&state, &headers)?;
    let rows = state.carts.remove(&user_id).unwrap_or_default();
    if rows.is_empty() {
        return Err(fail(StatusCode::BAD_REQUEST, "Cart is empty"));
    }

    let mut items = Vec::new();
    let mut total = Decimal::ZERO;
    let mut shortage = None;
    for row in &rows {
        let Some(product) = state.product(&row.product_id).cloned() else {
            shortage = Some("Product not found".to_string());
            break;
        };
        let stock = product["stock_quantity"].as_i64().unwrap_or(0);
        if row.quantity > stock {
            shortage = Some(format!("Not enough stock for {}", text(&product, "name")));
            break;
        }
        let price = decimal(&product["price"]);
        total += price * Decimal::from(row.quantity);
        items.push(json!({
            "id": Uuid::new_v4().to_string(),
            "product_id": row.product_id,
            "quantity": row.quantity,
            "price": price.to_string(),
            "product": product,
        }));
    }
    if let Some(detail) = shortage {
        state.carts.insert(user_id, rows);
        return Err(fail(StatusCode::BAD_REQUEST, &detail));
    }
    for row in &rows {
        if let Some(product) = state.product_mut(&row.product_id) {
            let stock = product["stock_quantity"].as_i64().unwrap_or(0);
            product["stock_quantity"] = json!(stock - row.quantity);
        }
    }

    let order = json!({
        "id": Uuid::new_v4().to_string(),
        "user_id": user_id,
        "total_amount": total.to_string(),
        "status": "pending",
        "payment_method": body["payment_method"],
        "payment_status": "pending",
        "shipping_address": body["shipping_address"],
        "billing_address": body["billing_address"],
        "created_at": Utc::now(),
        "order_items": items,
    });
    state.orders.push(order.clone());
    Ok(Json(order))
}

async fn create_payment_intent(
    State(state): State<Shared>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<String>,
    Json(body): Json<Value>,
) -> Reply {
    let mut state = lock(&state);
    state.hit("orders/payment-intent");
    let user_id = authorize(&state, &headers)?;
    let failing = state.payments_failing;
    let order = find_order(&mut state, &user_id, &id)?;
    if order["status"] != "pending" {
        return Err(fail(StatusCode::BAD_REQUEST, "Order is not pending"));
    }
    if decimal(&body["amount"]) != decimal(&order["total_amount"]) {
        return Err(fail(StatusCode::BAD_REQUEST, "Amount does not match order total"));
    }
    if failing {
        return Err(fail(StatusCode::BAD_REQUEST, "Payment processing failed"));
    }
    let intent = format!("pi_{}", Uuid::new_v4().simple());
    order["payment_intent_id"] = json!(intent);
    Ok(Json(json!({
        "client_secret": format!("{intent}_secret"),
        "payment_intent_id": intent,
    })))
}

async fn confirm_payment(
    State(state): State<Shared>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Reply {
    let mut state = lock(&state);
    let user_id = authorize(&state, &headers)?;
    let order = find_order(&mut state, &user_id, &id)?;
    let intent = params.get("payment_intent_id").map(String::as_str);
    if intent.is_none() || order["payment_intent_id"].as_str() != intent {
        return Err(fail(StatusCode::BAD_REQUEST, "Payment not successful"));
    }
    order["status"] = json!("confirmed");
    order["payment_status"] = json!("paid");
    Ok(Json(json!({
        "message": "Payment confirmed successfully",
        "order_status": "confirmed",
    })))
}

async fn cancel_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<String>,
) -> Reply {
    let mut state = lock(&state);
    let user_id = authorize(&state, &headers)?;
    let order = find_order(&mut state, &user_id, &id)?;
    if !matches!(order["status"].as_str(), Some("pending" | "confirmed")) {
        return Err(fail(StatusCode::BAD_REQUEST, "Order cannot be cancelled"));
    }
    order["status"] = json!("cancelled");
    Ok(Json(json!({ "message": "Order cancelled successfully" })))
}

// =============================================================================
// Chat
// =============================================================================

fn chat_message(user_id: &str, session_id: &str, message: &str, from_ai: bool) -> Value {
    json!({
        "id": Uuid::new_v4().to_string(),
        "user_id": user_id,
        "message": message,
        "is_from_ai": from_ai,
        "session_id": session_id,
        "created_at": Utc::now(),
    })
}

async fn send_chat(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let mut state = lock(&state);
    let user_id = authorize(&state, &headers)?;
    if state.chat_unavailable {
        return Err(fail(StatusCode::SERVICE_UNAVAILABLE, "AI service unavailable"));
    }
    let session_id = body["session_id"]
        .as_str()
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_string);
    let message = text(&body, "message");
    let reply = chat_message(&user_id, &session_id, &format!("You asked: {message}"), true);
    state
        .chat
        .push(chat_message(&user_id, &session_id, message, false));
    state.chat.push(reply.clone());
    Ok(Json(reply))
}

async fn chat_sessions(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let state = lock(&state);
    let user_id = authorize(&state, &headers)?;
    let mut sessions: Vec<Value> = Vec::new();
    for message in state.chat.iter().filter(|m| m["user_id"] == user_id.as_str()) {
        if !sessions.contains(&message["session_id"]) {
            sessions.push(message["session_id"].clone());
        }
    }
    Ok(Json(Value::Array(sessions)))
}

async fn chat_history(
    State(state): State<Shared>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Reply {
    let state = lock(&state);
    let user_id = authorize(&state, &headers)?;
    let messages = state
        .chat
        .iter()
        .filter(|m| m["user_id"] == user_id.as_str() && m["session_id"] == id.as_str())
        .cloned()
        .collect();
    Ok(Json(Value::Array(page(messages, &params))))
}

async fn delete_chat_session(
    State(state): State<Shared>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<String>,
) -> Reply {
    let mut state = lock(&state);
    let user_id = authorize(&state, &headers)?;
    state
        .chat
        .retain(|m| !(m["user_id"] == user_id.as_str() && m["session_id"] == id.as_str()));
    Ok(Json(json!({ "message": "Chat session deleted successfully" })))
}

// =============================================================================
// Uploads
// =============================================================================

async fn read_files(
    mut multipart: Multipart,
    field_name: &str,
) -> Result<Vec<Value>, Response> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| fail(StatusCode::BAD_REQUEST, &e.to_string()))?
    {
        if field.name() != Some(field_name) {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image/") {
            return Err(fail(StatusCode::BAD_REQUEST, "File must be an image"));
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| fail(StatusCode::BAD_REQUEST, &e.to_string()))?;
        files.push(json!({
            "url": format!("/uploads/{}_{filename}", Uuid::new_v4().simple()),
            "filename": filename,
            "size": bytes.len(),
        }));
    }
    Ok(files)
}

async fn upload_single(
    State(state): State<Shared>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Reply {
    authorize(&lock(&state), &headers)?;
    let files = read_files(multipart, "file").await?;
    files
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| fail(StatusCode::BAD_REQUEST, "No file uploaded"))
}

async fn upload_multiple(
    State(state): State<Shared>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Reply {
    authorize(&lock(&state), &headers)?;
    let files = read_files(multipart, "files").await?;
    Ok(Json(Value::Array(files)))
}

async fn delete_upload(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Reply {
    authorize(&lock(&state), &headers)?;
    if !params
        .get("file_url")
        .is_some_and(|url| url.starts_with("/uploads/"))
    {
        return Err(fail(StatusCode::NOT_FOUND, "File not found"));
    }
    Ok(Json(json!({ "message": "File deleted successfully" })))
}
