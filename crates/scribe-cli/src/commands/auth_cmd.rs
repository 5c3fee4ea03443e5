//! Auth command handlers.

use scribe_core::auth::RegisterRequest;

use crate::error::CliError;

use super::common::AppContext;

pub async fn run_login(
    context: &AppContext,
    email: &str,
    password: &str,
    remember: bool,
) -> Result<(), CliError> {
    let success = context.manager.login(email, password, remember).await?;
    println!(
        "Signed in as {} <{}>",
        success.user.display_name(),
        success.user.email
    );
    if remember {
        println!("Session will be restored automatically next time.");
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn run_register(
    context: &AppContext,
    email: &str,
    password: &str,
    confirm_password: &str,
    first_name: &str,
    last_name: &str,
    remember: bool,
) -> Result<(), CliError> {
    let request = RegisterRequest {
        email: email.to_string(),
        password: password.to_string(),
        confirm_password: confirm_password.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
    };
    let success = context.manager.register(&request, remember).await?;
    println!(
        "Account created. Signed in as {} <{}>",
        success.user.display_name(),
        success.user.email
    );
    Ok(())
}

pub async fn run_logout(context: &AppContext) -> Result<(), CliError> {
    context.manager.logout().await?;
    println!("Signed out.");
    Ok(())
}

pub fn run_status(context: &AppContext) -> Result<(), CliError> {
    let credentials = context.manager.credentials();
    let report = credentials.validate_stored_data()?;

    match credentials.get_user()? {
        Some(user) => println!("User: {} <{}>", user.display_name(), user.email),
        None => println!("User: (none)"),
    }
    println!("Remember me: {}", credentials.remember_me()?);
    println!("Auto-login: {}", context.manager.should_auto_login()?);

    if let Some(session) = context.manager.current_session()? {
        println!(
            "Session: {} ({:?}, started {})",
            session.id, session.login_method, session.created_at
        );
    } else {
        println!("Session: (none)");
    }
    println!(
        "Session history: {} entries",
        context.manager.session_history()?.len()
    );

    if report.is_valid {
        println!("Stored credentials: ok");
    } else {
        println!("Stored credentials: INVALID");
        for issue in &report.issues {
            println!("  - {issue}");
        }
    }
    Ok(())
}
