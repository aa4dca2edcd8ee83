//! Local cart commands.

use shopfront_client::Storefront;
use shopfront_client::cart::NewCartLine;
use shopfront_client::feedback;
use shopfront_core::ProductId;

use super::{CliError, settle};
use crate::output;

pub fn show(storefront: &Storefront) {
    let cart = storefront.cart();
    output::cart(&cart.lines(), cart.summary());
}

/// Add one unit, using the catalog's current price and stock.
pub async fn add(storefront: &Storefront, product_id: &ProductId) -> Result<(), CliError> {
    let product = storefront.api().get_product(product_id).await?;
    let result = storefront
        .cart()
        .add_item(NewCartLine::from_product(&product));
    settle(&feedback::add_item(&result), result)?;
    Ok(())
}

pub fn remove(storefront: &Storefront, product_id: &ProductId) {
    if storefront.cart().remove_item(product_id) {
        output::notice(&feedback::remove_item().notice);
    } else {
        output::line("Item is not in your cart");
    }
}

pub fn set(storefront: &Storefront, product_id: &ProductId, quantity: i64) -> Result<(), CliError> {
    let result = storefront.cart().update_quantity(product_id, quantity);
    settle(&feedback::update_quantity(&result), result)?;
    Ok(())
}

pub fn clear(storefront: &Storefront) {
    storefront.cart().clear();
    output::notice(&feedback::clear_cart().notice);
}
