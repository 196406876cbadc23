//! `claudesync project`: create, archive, select and list projects.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::sync::Arc;

use crate::config::{
    ConfigStore, Scope, ACTIVE_ORGANIZATION_ID, ACTIVE_PROVIDER, CONFIG_DIR, LOCAL_PATH,
};
use crate::models::Project;
use crate::prompt;
use crate::provider;

pub const DEFAULT_DESCRIPTION: &str = "Project created with ClaudeSync";

pub struct CreateOptions {
    pub name: Option<String>,
    pub description: String,
    pub local_path: String,
    pub provider: String,
    pub organization: Option<String>,
}

/// Create a remote project and make it the active one for `local_path`.
pub async fn run_create(config: Arc<ConfigStore>, opts: CreateOptions) -> Result<()> {
    let organization_id = match opts.organization {
        Some(id) => id,
        None => config.active_organization_id()?,
    };
    let name = match opts.name {
        Some(name) => name,
        None => default_project_name(Path::new(&opts.local_path))?,
    };

    let provider = provider::for_name(&opts.provider, config.clone())?;
    let project = provider
        .create_project(&organization_id, &name, &opts.description)
        .await?;
    println!(
        "Project '{}' (uuid: {}) has been created successfully.",
        project.name, project.id
    );

    let marker = Path::new(&opts.local_path).join(CONFIG_DIR);
    std::fs::create_dir_all(&marker)
        .with_context(|| format!("failed to create {}", marker.display()))?;

    config.set(ACTIVE_PROVIDER, opts.provider.as_str(), Scope::Local)?;
    config.set(ACTIVE_ORGANIZATION_ID, organization_id.as_str(), Scope::Local)?;
    config.select_project(&project.id, &project.name)?;
    config.set(LOCAL_PATH, opts.local_path.as_str(), Scope::Local)?;

    println!("\nProject setup complete. You can now start syncing files with this project.");
    println!("URL: https://claude.ai/project/{}", project.id);
    Ok(())
}

/// Archive `project_id`, or pick one interactively and confirm.
pub async fn run_archive(config: Arc<ConfigStore>, project_id: Option<String>) -> Result<()> {
    let organization_id = config.active_organization_id()?;
    let provider = provider::active(config)?;
    let projects = provider.get_projects(&organization_id, false).await?;

    let selected = match project_id {
        Some(id) => find_project(&projects, &id)?.clone(),
        None => {
            if projects.is_empty() {
                println!("No active projects found.");
                return Ok(());
            }
            println!("Available projects to archive:");
            print_numbered(&projects);
            let index = prompt::select(
                "Enter the number of the project to archive",
                projects.len(),
            )?;
            let selected = projects[index].clone();
            let question = format!(
                "Are you sure you want to archive the project '{}'? \
                 Archived projects cannot be modified but can still be viewed.",
                selected.name
            );
            if !prompt::confirm(&question)? {
                println!("Archive operation cancelled.");
                return Ok(());
            }
            selected
        }
    };

    provider.archive_project(&organization_id, &selected.id).await?;
    println!("Project '{}' has been archived.", selected.name);
    Ok(())
}

/// Make a project active for this directory.
pub async fn run_set(
    config: Arc<ConfigStore>,
    project_id: Option<String>,
    provider_name: &str,
) -> Result<()> {
    let organization_id = config.active_organization_id()?;
    let provider = provider::for_name(provider_name, config.clone())?;
    let projects = provider.get_projects(&organization_id, false).await?;

    let selected = match project_id {
        Some(id) => find_project(&projects, &id)?,
        None => {
            if projects.is_empty() {
                println!("No active projects found.");
                return Ok(());
            }
            println!("Available projects:");
            print_numbered(&projects);
            let index = prompt::select("Enter the number of the project to select", projects.len())?;
            &projects[index]
        }
    };

    config.set(ACTIVE_PROVIDER, provider_name, Scope::Local)?;
    config.select_project(&selected.id, &selected.name)?;
    if config.get_string(LOCAL_PATH).is_none() {
        config.set(LOCAL_PATH, ".", Scope::Local)?;
    }
    println!("Selected project: {} (ID: {})", selected.name, selected.id);
    println!(
        "Local configuration stored in {}",
        config.local_path().display()
    );
    Ok(())
}

pub async fn run_list(config: Arc<ConfigStore>, all: bool) -> Result<()> {
    let organization_id = config.active_organization_id()?;
    let provider = provider::active(config)?;
    let projects = provider.get_projects(&organization_id, all).await?;
    if projects.is_empty() {
        println!("No projects found.");
        return Ok(());
    }
    println!("Remote projects:");
    for project in &projects {
        let status = if project.is_archived() { " (Archived)" } else { "" };
        println!("  - {} (ID: {}){}", project.name, project.id, status);
    }
    Ok(())
}

fn find_project<'a>(projects: &'a [Project], id: &str) -> Result<&'a Project> {
    match projects.iter().find(|p| p.id == id) {
        Some(project) => Ok(project),
        None => bail!("project with ID {} not found among active projects", id),
    }
}

fn print_numbered(projects: &[Project]) {
    for (i, project) in projects.iter().enumerate() {
        println!("  {}. {} (ID: {})", i + 1, project.name, project.id);
    }
}

/// Directory name of `local_path`, resolving `.` and friends first.
fn default_project_name(local_path: &Path) -> Result<String> {
    let resolved = std::fs::canonicalize(local_path)
        .with_context(|| format!("failed to resolve {}", local_path.display()))?;
    resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("cannot derive a project name from the local path; pass --name")
}
