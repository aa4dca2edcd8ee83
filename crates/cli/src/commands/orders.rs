//! Checkout and order history.

use shopfront_client::Storefront;
use shopfront_client::feedback;
use shopfront_client::guard::Route;
use shopfront_core::{Address, OrderId, PaymentMethod, format_amount};

use super::{CliError, require_user, settle};
use crate::output;

/// Place an order for the cart, billed to the shipping address.
pub async fn checkout(
    storefront: &Storefront,
    address: Address,
    payment_method: PaymentMethod,
) -> Result<(), CliError> {
    let checkout = storefront.checkout();
    let summary = checkout.summary();
    if summary.total_items > 0 {
        output::line(&format!(
            "Placing order for {} item(s), {}",
            summary.total_items,
            format_amount(summary.total_price)
        ));
    }

    let billing = address.clone();
    let result = checkout.place_order(address, billing, payment_method).await;
    let placed = settle(&feedback::checkout(&result), result)?;
    output::order(&placed.order);
    if let Some(payment) = &placed.payment {
        output::line(&payment.message);
    }
    Ok(())
}

pub async fn list(storefront: &Storefront) -> Result<(), CliError> {
    require_user(storefront, Route::Orders)?;
    let orders = storefront.api().list_orders().await?;
    output::orders(&orders);
    Ok(())
}

pub async fn show(storefront: &Storefront, id: &OrderId) -> Result<(), CliError> {
    require_user(storefront, Route::Order(id.clone()))?;
    let order = storefront.api().get_order(id).await?;
    output::order(&order);
    Ok(())
}

pub async fn cancel(storefront: &Storefront, id: &OrderId) -> Result<(), CliError> {
    require_user(storefront, Route::Order(id.clone()))?;
    storefront.api().cancel_order(id).await?;
    output::line("Order cancelled");
    Ok(())
}
