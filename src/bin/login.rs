//! Interactive login that prints a session string for `TG_SESSION_STRING`.

use std::io::{self, BufRead, Write};

use anyhow::{Context, bail};
use grammers_client::SignInError;
use grammers_session::Session;
use topic_digest::telegram::client::{connect, export_session};

fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let api_id = prompt("Enter your Telegram API ID: ")?
        .parse::<i32>()
        .context("API ID must be a number")?;
    let api_hash = prompt("Enter your Telegram API Hash: ")?;
    let phone = prompt("Enter your phone number (with country code): ")?;

    let client = connect(api_id, &api_hash, Session::new()).await?;

    if !client.is_authorized().await? {
        let token = client.request_login_code(&phone).await?;
        let code = prompt("Enter the login code you received: ")?;

        match client.sign_in(&token, &code).await {
            Ok(_) => {}
            Err(SignInError::PasswordRequired(password_token)) => {
                let password = prompt("2FA password required: ")?;
                if password.is_empty() {
                    bail!("Account requires a 2FA password but none was provided.");
                }
                client.check_password(password_token, password).await?;
            }
            Err(e) => return Err(e.into()),
        }
    }

    println!("\nYour session string (keep it secret):");
    println!("{}", export_session(&client));
    Ok(())
}
