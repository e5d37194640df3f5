//! CLI auth command handlers for login, registration, status, and logout.

use crate::client::HttpTransport;
use crate::services::Services;
use crate::types::RegisterRequest;

use super::{LoginArgs, RegisterArgs};

/// Handle `quill auth login`.
pub async fn handle_login(
    services: &Services<HttpTransport>,
    args: &LoginArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let user = services.auth.login(&args.email, &args.password).await?;
    println!("✅ Logged in as {} <{}>", user.name, user.email);
    Ok(())
}

/// Handle `quill auth register`.
pub async fn handle_register(
    services: &Services<HttpTransport>,
    args: &RegisterArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let request = RegisterRequest {
        name: args.name.clone(),
        email: args.email.clone(),
        password: args.password.clone(),
        password_confirm: args
            .password_confirm
            .clone()
            .unwrap_or_else(|| args.password.clone()),
    };
    let user = services.auth.register(&request).await?;
    println!("✅ Account created for {} <{}>", user.name, user.email);
    Ok(())
}

/// Handle `quill auth status`.
pub async fn handle_status(services: &Services<HttpTransport>) -> Result<(), Box<dyn std::error::Error>> {
    match services.auth.current_user().await? {
        Some(user) => {
            println!("✅ Logged in as {} <{}> ({})", user.name, user.email, user.role);
        }
        None => println!("❌ Not logged in"),
    }
    Ok(())
}

/// Handle `quill auth logout`.
pub async fn handle_logout(services: &Services<HttpTransport>) -> Result<(), Box<dyn std::error::Error>> {
    if !services.auth.is_authenticated() {
        println!("Already logged out");
        return Ok(());
    }
    services.auth.logout().await;
    println!("✅ Logged out");
    Ok(())
}
