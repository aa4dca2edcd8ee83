//! Sign-in, registration and account commands.

use secrecy::SecretString;
use shopfront_client::Storefront;
use shopfront_client::feedback;
use shopfront_client::guard::Route;
use shopfront_client::session::PresentedCredential;

use super::{CliError, require_user, settle};
use crate::output;

pub async fn login(storefront: &Storefront, email: &str, password: String) -> Result<(), CliError> {
    let result = storefront
        .session()
        .login(email, &SecretString::from(password))
        .await;
    settle(&feedback::login(&result), result)?;
    Ok(())
}

pub async fn login_google(storefront: &Storefront, credential: String) -> Result<(), CliError> {
    let provider = PresentedCredential::new(credential);
    let result = storefront.session().login_with_federated(&provider).await;
    settle(&feedback::federated_login(&result), result)?;
    Ok(())
}

pub async fn register(
    storefront: &Storefront,
    name: &str,
    email: &str,
    password: String,
) -> Result<(), CliError> {
    let result = storefront
        .session()
        .register(name, email, &SecretString::from(password))
        .await;
    settle(&feedback::register(&result), result)?;
    Ok(())
}

pub fn logout(storefront: &Storefront) {
    storefront.session().logout();
    output::notice(&feedback::logout().notice);
}

pub fn whoami(storefront: &Storefront) -> Result<(), CliError> {
    let user = require_user(storefront, Route::Profile)?;
    output::user(&user);
    Ok(())
}
