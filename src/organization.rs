//! `claudesync organization`: list and select the active organization.

use anyhow::{bail, Result};
use std::sync::Arc;

use crate::config::{ConfigStore, Scope, ACTIVE_PROVIDER};
use crate::prompt;
use crate::provider;

pub async fn run_list(config: Arc<ConfigStore>) -> Result<()> {
    let provider = provider::active(config)?;
    let organizations = provider.get_organizations().await?;
    if organizations.is_empty() {
        println!("No organizations found.");
        return Ok(());
    }
    println!("Available organizations:");
    for (i, org) in organizations.iter().enumerate() {
        println!("  {}. {} (ID: {})", i + 1, org.name, org.id);
    }
    Ok(())
}

/// Select by `--org-id` or interactively. Clears the active project.
pub async fn run_set(
    config: Arc<ConfigStore>,
    organization_id: Option<String>,
    provider_name: &str,
) -> Result<()> {
    let provider = provider::for_name(provider_name, config.clone())?;
    let organizations = provider.get_organizations().await?;
    if organizations.is_empty() {
        bail!("no organizations available for this session key");
    }

    let selected = match organization_id {
        Some(id) => match organizations.iter().find(|o| o.id == id) {
            Some(org) => org,
            None => bail!("organization with ID {} not found", id),
        },
        None => {
            println!("Available organizations:");
            for (i, org) in organizations.iter().enumerate() {
                println!("  {}. {} (ID: {})", i + 1, org.name, org.id);
            }
            let index = prompt::select(
                "Enter the number of the organization you want to work with",
                organizations.len(),
            )?;
            &organizations[index]
        }
    };

    config.set(ACTIVE_PROVIDER, provider_name, Scope::Local)?;
    config.select_organization(&selected.id)?;
    println!("Selected organization: {} (ID: {})", selected.name, selected.id);
    println!("Project settings cleared. Please select or create a new project for this organization.");
    Ok(())
}
