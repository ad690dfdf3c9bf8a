//! One-shot interactive login that produces the MTProto session file.
//!
//! The server itself never performs interactive login: it refuses to start
//! the user client when the session is missing or signed out. Run this
//! tool once (phone number, login code, optional 2FA password) and the
//! saved session is picked up on the next server start.

use grammers_client::session::Session;
use grammers_client::{Client, Config as MtprotoConfig, InitParams, SignInError};
use std::io::{self, BufRead, Write};
use telegram_dl::Config;

fn prompt(label: &str) -> io::Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = Config::from_env();
    let user_client = &config.user_client;
    let (Some(api_id), Some(api_hash)) = (user_client.api_id, user_client.api_hash.clone()) else {
        eprintln!("TELEGRAM_API_ID and TELEGRAM_API_HASH must be set (see my.telegram.org).");
        std::process::exit(1);
    };

    let session = Session::load_file_or_create(&user_client.session_file)?;
    let client = Client::connect(MtprotoConfig {
        session,
        api_id,
        api_hash,
        params: InitParams::default(),
    })
    .await?;

    if client.is_authorized().await? {
        let me = client.get_me().await?;
        println!("Session is already authorized as {}.", me.full_name());
        return Ok(());
    }

    let phone = prompt("Phone number (international format)")?;
    let token = client.request_login_code(&phone).await?;
    let code = prompt("Login code")?;

    let user = match client.sign_in(&token, &code).await {
        Ok(user) => user,
        Err(SignInError::PasswordRequired(password_token)) => {
            let hint = password_token.hint().unwrap_or("no hint").to_string();
            let password = prompt(&format!("2FA password (hint: {hint})"))?;
            client.check_password(password_token, password).await?
        }
        Err(e) => return Err(e.into()),
    };

    client.session().save_to_file(&user_client.session_file)?;
    println!(
        "Signed in as {}. Session saved to {}.",
        user.full_name(),
        user_client.session_file.display()
    );
    Ok(())
}
