//! Repository set resolution
//!
//! Merges organisation-derived and explicit repository descriptors into one
//! ordered list, deduplicated by clone URL with first-wins semantics:
//! organisations in configured order (named repositories before the
//! filtered listing), then explicit git repositories.

use super::{LocalRepository, RepositoryDirectory};
use crate::config::{GitHubOrganisation, ProjectConfig};
use indexmap::map::Entry;
use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};

/// Resolve the configured repository set
pub async fn resolve_repositories(
    config: &ProjectConfig,
    directory: &dyn RepositoryDirectory,
) -> Vec<LocalRepository> {
    let work_dir = config.resolved_work_dir();
    let mut map: IndexMap<String, LocalRepository> = IndexMap::new();

    let github_dir = work_dir.join("github");
    for organisation in config.organisations() {
        add_organisation_repositories(
            &mut map,
            directory,
            organisation,
            &github_dir.join(&organisation.name),
        )
        .await;
    }

    let git_dir = work_dir.join("git");
    for git in &config.git {
        add_repository(&mut map, LocalRepository::from_git(git, git_dir.join(&git.name)));
    }

    debug!("Resolved {} repositories", map.len());
    map.into_values().collect()
}

/// Insert a repository unless its clone URL is already registered
fn add_repository(map: &mut IndexMap<String, LocalRepository>, repository: LocalRepository) -> bool {
    match map.entry(repository.clone_url.clone()) {
        Entry::Vacant(entry) => {
            entry.insert(repository);
            true
        }
        Entry::Occupied(entry) => {
            debug!(
                "Ignoring {} as {} already provides {}",
                repository.full_name,
                entry.get().full_name,
                entry.key()
            );
            false
        }
    }
}

async fn add_organisation_repositories(
    map: &mut IndexMap<String, LocalRepository>,
    directory: &dyn RepositoryDirectory,
    organisation: &GitHubOrganisation,
    org_dir: &Path,
) {
    let org_name = organisation.name.as_str();
    let service = directory.service_name();
    let mut found_names: BTreeSet<String> = BTreeSet::new();

    for name in &organisation.repositories {
        let name = name.trim();
        // a name is claimed before the lookup so a failed lookup is not
        // re-added from the listing
        if name.is_empty() || !found_names.insert(name.to_string()) {
            continue;
        }
        match directory.find_repository(org_name, name).await {
            Ok(Some(remote)) => {
                let dir = org_dir.join(&remote.name);
                add_repository(map, LocalRepository::from_remote(remote, dir));
            }
            Ok(None) => warn!("{} repository {}/{} not found!", service, org_name, name),
            Err(e) => warn!("{} repository {}/{} not found: {}", service, org_name, name, e),
        }
    }

    let filter = match organisation.create_filter() {
        Ok(filter) => filter,
        Err(e) => {
            warn!("Invalid filter for organisation {}: {}", org_name, e);
            return;
        }
    };

    let mut listing = match directory.list_repositories(org_name).await {
        Ok(listing) => listing,
        Err(e) => {
            warn!("Failed to load organisation: {}. {}", org_name, e);
            return;
        }
    };
    listing.sort_by(|a, b| a.name.cmp(&b.name));

    for remote in listing {
        if filter.matches(&remote.name) && found_names.insert(remote.name.clone()) {
            let dir = org_dir.join(&remote.name);
            add_repository(map, LocalRepository::from_remote(remote, dir));
        }
    }
}
