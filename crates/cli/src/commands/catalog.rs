//! Catalog browsing.

use shopfront_client::Storefront;
use shopfront_client::api::products::ProductQuery;
use shopfront_core::ProductId;

use super::CliError;
use crate::output;

pub async fn list(storefront: &Storefront, query: &ProductQuery) -> Result<(), CliError> {
    let products = match (&query.search, query.featured_only) {
        (None, true) => storefront.api().featured_products(query.limit).await?,
        _ => storefront.api().list_products(query).await?,
    };
    output::products(&products);
    Ok(())
}

pub async fn show(storefront: &Storefront, id: &ProductId) -> Result<(), CliError> {
    let product = storefront.api().get_product(id).await?;
    output::product(&product);
    Ok(())
}

pub async fn categories(storefront: &Storefront) -> Result<(), CliError> {
    let categories = storefront.api().list_categories().await?;
    output::categories(&categories);
    Ok(())
}
