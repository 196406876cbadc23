//! `claudesync auth`: store, list and clear session keys.
//!
//! Login verifies the candidate key against the service before writing
//! anything; a rejected key leaves the configuration untouched.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::config::{ConfigStore, Scope, ACTIVE_PROVIDER};
use crate::prompt;
use crate::provider;

/// Default lifetime assumed for a session key when none is given.
pub const DEFAULT_SESSION_DAYS: i64 = 30;

const SESSION_KEY_HELP: &str = "\
To obtain your session key:
  1. Open https://claude.ai in your browser and log in
  2. Open the developer tools (F12, or Cmd+Option+I on macOS)
  3. Go to Application (Chrome/Edge) or Storage (Firefox) > Cookies > https://claude.ai
  4. Copy the value of the 'sessionKey' cookie (not URL-encoded)";

pub async fn run_login(
    config: Arc<ConfigStore>,
    provider_name: &str,
    session_key: Option<String>,
    expires: Option<String>,
) -> Result<()> {
    let interactive = session_key.is_none();
    let session_key = match session_key {
        Some(key) => key,
        None => {
            println!("A session key is required to call {}", config.api_url());
            println!("{}", SESSION_KEY_HELP);
            prompt::ask("Please enter your sessionKey", None)?
        }
    };
    let session_key = session_key.trim().to_string();
    if session_key.is_empty() {
        bail!("session key must not be empty");
    }

    let default_expiry = Utc::now() + Duration::days(DEFAULT_SESSION_DAYS);
    let expiry = match expires {
        Some(raw) => parse_expiry(&raw)?,
        None if interactive => {
            let raw = prompt::ask(
                "Please enter the expiry time for the sessionKey (optional)",
                Some(&default_expiry.to_rfc2822()),
            )?;
            parse_expiry(&raw)?
        }
        None => default_expiry,
    };

    let provider = provider::for_name(provider_name, config.clone())?;
    let organizations = provider
        .verify_session_key(&session_key)
        .await
        .context("session key verification failed")?;
    tracing::debug!(organizations = organizations.len(), "session key accepted");

    config.set_session_key(provider_name, &session_key, expiry)?;
    config.set(ACTIVE_PROVIDER, provider_name, Scope::Global)?;
    println!(
        "Successfully stored session key for {}. Session key stored globally.",
        provider_name
    );
    Ok(())
}

pub fn run_logout(config: &ConfigStore) -> Result<()> {
    config.clear_all_session_keys()?;
    println!("Logged out from all providers successfully.");
    Ok(())
}

pub fn run_list(config: &ConfigStore) -> Result<()> {
    let providers = config.providers_with_session_keys();
    if providers.is_empty() {
        println!("No authenticated providers found.");
        return Ok(());
    }
    println!("Authenticated providers:");
    for name in providers {
        match config.session_key(&name) {
            Ok(cred) if cred.expiry < Utc::now() => {
                println!("  - {} (expired {})", name, cred.expiry.to_rfc2822())
            }
            Ok(cred) => println!("  - {} (expires {})", name, cred.expiry.to_rfc2822()),
            Err(_) => println!("  - {} (invalid entry)", name),
        }
    }
    Ok(())
}

/// Accept RFC 3339 (`2030-01-02T03:04:05Z`) or RFC 2822
/// (`Wed, 02 Jan 2030 03:04:05 GMT`).
pub fn parse_expiry(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("invalid expiry time format: '{}'", raw))
}
