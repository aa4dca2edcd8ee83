//! Cart persistence across restarts and the checkout flow against the fake
//! backend.

use rust_decimal::Decimal;
use secrecy::SecretString;
use shopfront_client::cart::{CartError, NewCartLine};
use shopfront_client::checkout::CheckoutError;
use shopfront_client::{ErrorKind, Storefront};
use shopfront_core::{Address, OrderStatus, PaymentMethod, PaymentStatus, ProductId};
use shopfront_integration_tests::FakeBackend;

fn storefront(backend: &FakeBackend, dir: &tempfile::TempDir) -> Storefront {
    Storefront::new(backend.config(dir.path())).expect("Failed to build storefront")
}

async fn signed_in(backend: &FakeBackend, dir: &tempfile::TempDir) -> Storefront {
    backend.add_user("jane@example.com", "hunter22", "Jane Doe");
    let storefront = storefront(backend, dir);
    storefront.session().initialize().await;
    storefront
        .session()
        .login("jane@example.com", &SecretString::from("hunter22".to_string()))
        .await
        .expect("login");
    storefront
}

async fn add(storefront: &Storefront, id: &str, times: usize) {
    let product = storefront
        .api()
        .get_product(&ProductId::new(id))
        .await
        .expect("product");
    for _ in 0..times {
        storefront
            .cart()
            .add_item(NewCartLine::from_product(&product))
            .expect("add to cart");
    }
}

fn address() -> Address {
    Address {
        first_name: "Jane".to_string(),
        last_name: "Doe".to_string(),
        email: "jane@example.com".to_string(),
        phone: "555-0100".to_string(),
        address: "1 Market St".to_string(),
        city: "San Francisco".to_string(),
        state: "CA".to_string(),
        zip_code: "94105".to_string(),
        country: "United States".to_string(),
    }
}

// ============================================================================
// Cart persistence
// ============================================================================

#[tokio::test]
async fn test_cart_survives_restart() {
    let backend = FakeBackend::spawn().await;
    backend.add_product("p1", "Mug", "12.50", 5);
    backend.add_product("p2", "Tea", "4.00", 10);
    let dir = tempfile::tempdir().expect("tempdir");

    {
        let storefront = storefront(&backend, &dir);
        add(&storefront, "p1", 2).await;
        add(&storefront, "p2", 1).await;
    }

    let restarted = storefront(&backend, &dir);
    let lines = restarted.cart().lines();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].product_id, ProductId::new("p1"));
    assert_eq!(lines[0].quantity, 2);
    assert_eq!(restarted.cart().total_items(), 3);
    assert_eq!(restarted.cart().total_price(), Decimal::new(2900, 2));
}

#[tokio::test]
async fn test_cart_stops_at_stock() {
    let backend = FakeBackend::spawn().await;
    backend.add_product("p1", "Mug", "12.50", 2);
    let dir = tempfile::tempdir().expect("tempdir");
    let storefront = storefront(&backend, &dir);
    add(&storefront, "p1", 2).await;

    let product = storefront
        .api()
        .get_product(&ProductId::new("p1"))
        .await
        .expect("product");
    let err = storefront
        .cart()
        .add_item(NewCartLine::from_product(&product))
        .expect_err("third unit exceeds stock");

    assert!(matches!(err, CartError::StockLimit { stock: 2, .. }));
    assert_eq!(err.kind(), ErrorKind::StockLimit);
    assert_eq!(storefront.cart().total_items(), 2);
}

#[tokio::test]
async fn test_product_lookups_are_cached() {
    let backend = FakeBackend::spawn().await;
    backend.add_product("p1", "Mug", "12.50", 2);
    let dir = tempfile::tempdir().expect("tempdir");
    let storefront = storefront(&backend, &dir);

    add(&storefront, "p1", 1).await;
    add(&storefront, "p1", 1).await;
    assert_eq!(backend.hits("products/{id}"), 1);

    storefront.api().invalidate_cache();
    add(&storefront, "p1", 0).await;
    assert_eq!(backend.hits("products/{id}"), 2);
}

// ============================================================================
// Server cart
// ============================================================================

#[tokio::test]
async fn test_server_cart_lines_can_be_updated_counted_and_removed() {
    let backend = FakeBackend::spawn().await;
    backend.add_product("p1", "Mug", "12.50", 5);
    backend.add_product("p2", "Tea", "4.00", 10);
    let dir = tempfile::tempdir().expect("tempdir");
    let storefront = signed_in(&backend, &dir).await;
    let api = storefront.api();

    let mug = api
        .add_server_cart_item(&ProductId::new("p1"), 2)
        .await
        .expect("add mug");
    api.add_server_cart_item(&ProductId::new("p2"), 1)
        .await
        .expect("add tea");
    assert_eq!(api.server_cart_count().await.expect("count"), 3);

    let updated = api
        .update_server_cart_item(&mug.id, 4)
        .await
        .expect("update mug");
    assert_eq!(updated.id, mug.id);
    assert_eq!(updated.quantity, 4);
    assert_eq!(updated.product.name, "Mug");
    assert_eq!(api.server_cart_count().await.expect("count"), 5);

    let err = api
        .update_server_cart_item(&mug.id, 6)
        .await
        .expect_err("beyond stock");
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.user_message(), "Not enough stock available");

    api.remove_server_cart_item(&mug.id)
        .await
        .expect("remove mug");
    let remaining = api.server_cart().await.expect("server cart");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].product_id, ProductId::new("p2"));
    assert_eq!(api.server_cart_count().await.expect("count"), 1);

    let err = api
        .remove_server_cart_item(&mug.id)
        .await
        .expect_err("already removed");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.user_message(), "Cart item not found");
    assert_eq!(backend.hits("cart/update"), 2);
    assert_eq!(backend.hits("cart/remove"), 2);
    assert_eq!(backend.hits("cart/count"), 3);
}

// ============================================================================
// Checkout
// ============================================================================

#[tokio::test]
async fn test_card_checkout_pays_and_clears_cart() {
    let backend = FakeBackend::spawn().await;
    backend.add_product("p1", "Mug", "12.50", 5);
    backend.add_product("p2", "Tea", "4.00", 10);
    let dir = tempfile::tempdir().expect("tempdir");
    let storefront = signed_in(&backend, &dir).await;
    add(&storefront, "p1", 2).await;
    add(&storefront, "p2", 1).await;

    let placed = storefront
        .checkout()
        .place_order(address(), address(), PaymentMethod::Card)
        .await
        .expect("checkout");

    assert_eq!(placed.order.total_amount, Decimal::new(2900, 2));
    assert_eq!(placed.order.item_count(), 3);
    assert_eq!(placed.order.status, OrderStatus::Confirmed);
    assert_eq!(placed.order.payment_status, PaymentStatus::Paid);
    assert!(placed.payment.is_some());
    assert!(storefront.cart().is_empty());
    assert_eq!(backend.stock_of("p1"), Some(3));
    assert_eq!(backend.server_cart_units(), 0);

    let stored = storefront
        .api()
        .get_order(&placed.order.id)
        .await
        .expect("order");
    assert_eq!(stored.payment_status, PaymentStatus::Paid);
}

#[tokio::test]
async fn test_cash_on_delivery_skips_payment() {
    let backend = FakeBackend::spawn().await;
    backend.add_product("p1", "Mug", "12.50", 5);
    let dir = tempfile::tempdir().expect("tempdir");
    let storefront = signed_in(&backend, &dir).await;
    add(&storefront, "p1", 1).await;

    let placed = storefront
        .checkout()
        .place_order(address(), address(), PaymentMethod::CashOnDelivery)
        .await
        .expect("checkout");

    assert_eq!(placed.order.status, OrderStatus::Pending);
    assert_eq!(placed.order.payment_method, "cash_on_delivery");
    assert!(placed.payment.is_none());
    assert_eq!(backend.hits("orders/payment-intent"), 0);
}

#[tokio::test]
async fn test_failed_payment_reports_created_order() {
    let backend = FakeBackend::spawn().await;
    backend.add_product("p1", "Mug", "12.50", 5);
    backend.set_payments_failing(true);
    let dir = tempfile::tempdir().expect("tempdir");
    let storefront = signed_in(&backend, &dir).await;
    add(&storefront, "p1", 1).await;

    let err = storefront
        .checkout()
        .place_order(address(), address(), PaymentMethod::Card)
        .await
        .expect_err("payment fails");

    let CheckoutError::PaymentFailed { order, .. } = &err else {
        panic!("expected PaymentFailed, got {err:?}");
    };
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(
        err.to_string(),
        "Order placed but payment failed: Payment processing failed"
    );
    assert!(storefront.cart().is_empty());
    assert_eq!(backend.orders().len(), 1);
}

#[tokio::test]
async fn test_checkout_requires_sign_in() {
    let backend = FakeBackend::spawn().await;
    backend.add_product("p1", "Mug", "12.50", 5);
    let dir = tempfile::tempdir().expect("tempdir");
    let storefront = storefront(&backend, &dir);
    storefront.session().initialize().await;
    add(&storefront, "p1", 1).await;

    let err = storefront
        .checkout()
        .place_order(address(), address(), PaymentMethod::Card)
        .await
        .expect_err("anonymous");

    assert!(matches!(err, CheckoutError::NotAuthenticated));
    assert_eq!(backend.hits("cart/clear"), 0);
    assert_eq!(storefront.cart().total_items(), 1);
}

#[tokio::test]
async fn test_checkout_rejects_incomplete_address_before_any_request() {
    let backend = FakeBackend::spawn().await;
    backend.add_product("p1", "Mug", "12.50", 5);
    let dir = tempfile::tempdir().expect("tempdir");
    let storefront = signed_in(&backend, &dir).await;
    add(&storefront, "p1", 1).await;

    let incomplete = Address {
        zip_code: String::new(),
        ..address()
    };
    let err = storefront
        .checkout()
        .place_order(incomplete, address(), PaymentMethod::Card)
        .await
        .expect_err("missing zip code");

    assert_eq!(err.to_string(), "Missing required fields: zipCode");
    assert_eq!(backend.hits("cart/clear"), 0);
}

#[tokio::test]
async fn test_checkout_rejects_invalid_billing_address_before_any_request() {
    let backend = FakeBackend::spawn().await;
    backend.add_product("p1", "Mug", "12.50", 5);
    let dir = tempfile::tempdir().expect("tempdir");
    let storefront = signed_in(&backend, &dir).await;
    add(&storefront, "p1", 1).await;

    let incomplete = Address {
        city: String::new(),
        ..address()
    };
    let err = storefront
        .checkout()
        .place_order(address(), incomplete, PaymentMethod::Card)
        .await
        .expect_err("missing billing city");
    assert_eq!(err.to_string(), "Missing required fields: city");

    let bad_email = Address {
        email: "not-an-email".to_string(),
        ..address()
    };
    let err = storefront
        .checkout()
        .place_order(address(), bad_email, PaymentMethod::Card)
        .await
        .expect_err("invalid billing email");
    assert!(matches!(err, CheckoutError::InvalidEmail(_)));

    assert_eq!(backend.hits("cart/clear"), 0);
    assert_eq!(storefront.cart().total_items(), 1);
}

#[tokio::test]
async fn test_stock_shortage_keeps_local_cart() {
    let backend = FakeBackend::spawn().await;
    backend.add_product("p1", "Mug", "12.50", 5);
    let dir = tempfile::tempdir().expect("tempdir");
    let storefront = signed_in(&backend, &dir).await;
    add(&storefront, "p1", 3).await;
    backend.set_stock("p1", 1);

    let err = storefront
        .checkout()
        .place_order(address(), address(), PaymentMethod::Card)
        .await
        .expect_err("not enough stock");

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.to_string(), "Not enough stock available");
    assert_eq!(storefront.cart().total_items(), 3);
    assert_eq!(backend.hits("orders/create"), 0);
}
