//! Interchangeable backends for persisting the repo collection.

use crate::config::Config;
use crate::errors::UnknownStorage;
use crate::Repo;
use async_trait::async_trait;
use failure::{Error, ResultExt};
use serde_derive::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

mod local;
mod memory;
mod rest;

pub use self::local::LocalStorage;
pub use self::memory::MemoryStorage;
pub use self::rest::RestStorage;

/// The sample collection used when seeding a fresh store.
const SAMPLE_REPOS: &str = include_str!("../../assets/sample-repos.json");

/// The operations every storage backend supports.
///
/// Repos are matched on their `id` when updating or deleting.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Every stored repo, most recently added first.
    async fn fetch_repos(&self) -> Result<Vec<Repo>, Error>;

    /// Save a new repo, assigning it an `id` if it doesn't have one.
    async fn create_repo(&self, repo: Repo) -> Result<Repo, Error>;

    /// Save several repos at once, skipping any whose URL is already
    /// stored. Returns the repos which were actually added.
    async fn create_many(&self, repos: Vec<Repo>) -> Result<Vec<Repo>, Error>;

    /// Replace an existing repo, failing with
    /// [`NotFound`](crate::errors::NotFound) if it isn't stored.
    async fn update_repo(&self, repo: Repo) -> Result<Repo, Error>;

    async fn update_many(&self, repos: Vec<Repo>) -> Result<Vec<Repo>, Error>;

    /// Remove a repo, returning `false` if there was nothing to remove.
    async fn delete_repo(&self, repo: &Repo) -> Result<bool, Error>;

    /// Remove several repos, returning `true` if any were removed.
    async fn delete_many(&self, repos: &[Repo]) -> Result<bool, Error>;
}

/// Which storage backend to use.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// A JSON file on disk.
    Local,
    /// Kept in memory and lost when the process exits.
    Mock,
    /// A remote REST service.
    Rest,
}

impl Default for StorageKind {
    fn default() -> StorageKind {
        StorageKind::Local
    }
}

impl Display for StorageKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            StorageKind::Local => f.write_str("local"),
            StorageKind::Mock => f.write_str("mock"),
            StorageKind::Rest => f.write_str("rest"),
        }
    }
}

impl FromStr for StorageKind {
    type Err = UnknownStorage;

    fn from_str(s: &str) -> Result<StorageKind, UnknownStorage> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(StorageKind::Local),
            "mock" => Ok(StorageKind::Mock),
            "rest" => Ok(StorageKind::Rest),
            _ => Err(UnknownStorage {
                name: s.to_string(),
            }),
        }
    }
}

/// Create the storage backend selected by the config.
pub fn open(cfg: &Config) -> Result<Box<dyn Storage>, Error> {
    let kind = cfg.storage_kind()?;
    info!("Using the {} storage driver", kind);

    let storage: Box<dyn Storage> = match kind {
        StorageKind::Local => {
            let data_dir = cfg.data_dir()?;
            Box::new(LocalStorage::new(data_dir, cfg.general.seed_sample))
        }
        StorageKind::Mock => {
            if cfg.general.seed_sample {
                Box::new(MemoryStorage::with_repos(sample_repos()?))
            } else {
                Box::new(MemoryStorage::new())
            }
        }
        StorageKind::Rest => Box::new(RestStorage::new(cfg.rest.base_url.clone())),
    };

    Ok(storage)
}

/// The bundled sample collection, with ids assigned.
pub fn sample_repos() -> Result<Vec<Repo>, Error> {
    let mut repos: Vec<Repo> = serde_json::from_str(SAMPLE_REPOS)
        .context("The bundled sample repos are invalid")?;

    for repo in &mut repos {
        assign_id(repo);
    }

    Ok(repos)
}

/// Give the repo a fresh `id` unless it already has one.
pub(crate) fn assign_id(repo: &mut Repo) {
    if repo.id.is_none() {
        repo.id = Some(uuid::Uuid::new_v4().to_string());
    }
}

/// Drop repos whose URL is already in `existing` (or appeared earlier in the
/// batch), assigning ids to the rest.
pub(crate) fn new_repos(existing: &[Repo], candidates: Vec<Repo>) -> Vec<Repo> {
    let mut seen: HashSet<String> =
        existing.iter().filter_map(Repo::dedup_key).collect();
    let mut fresh = Vec::new();

    for mut repo in candidates {
        if let Some(key) = repo.dedup_key() {
            if !seen.insert(key) {
                trace!("Skipping {}, it's already stored", repo.display_name());
                continue;
            }
        }

        assign_id(&mut repo);
        fresh.push(repo);
    }

    fresh
}

/// Does `stored` refer to the same record as `target`?
pub(crate) fn same_record(stored: &Repo, target: &Repo) -> bool {
    match (&stored.id, &target.id) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

pub(crate) fn missing(repo: &Repo) -> Error {
    crate::errors::NotFound {
        what: match &repo.id {
            Some(id) => format!("{} (id: {})", repo.display_name(), id),
            None => format!("{} (no id)", repo.display_name()),
        },
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(url: &str) -> Repo {
        Repo {
            url: Some(url.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn parse_storage_kinds() {
        assert_eq!("local".parse::<StorageKind>().unwrap(), StorageKind::Local);
        assert_eq!("MOCK".parse::<StorageKind>().unwrap(), StorageKind::Mock);
        assert_eq!(" rest ".parse::<StorageKind>().unwrap(), StorageKind::Rest);
        assert!("sqlite".parse::<StorageKind>().is_err());
    }

    #[test]
    fn the_sample_repos_load() {
        let repos = sample_repos().unwrap();

        assert!(!repos.is_empty());
        assert!(repos.iter().all(|r| r.id.is_some()));
    }

    #[test]
    fn duplicates_are_detected_by_normalized_url() {
        let mut stored = repo("https://github.com/torvalds/linux");
        stored.id = Some(String::from("1"));
        let candidates = vec![
            repo("https://GitHub.com/torvalds/linux/"),
            repo("https://github.com/rust-lang/rust"),
            repo("http://github.com/rust-lang/rust"),
        ];

        let got = new_repos(&[stored], candidates);

        assert_eq!(got.len(), 1);
        assert_eq!(got[0].url.as_deref(), Some("https://github.com/rust-lang/rust"));
        assert!(got[0].id.is_some());
    }

    #[test]
    fn existing_ids_are_kept() {
        let mut with_id = repo("https://github.com/a/b");
        with_id.id = Some(String::from("keep-me"));

        let got = new_repos(&[], vec![with_id]);

        assert_eq!(got[0].id.as_deref(), Some("keep-me"));
    }

    #[test]
    fn records_match_on_id_only() {
        let mut a = repo("https://github.com/a/b");
        a.id = Some(String::from("1"));
        let mut b = repo("https://github.com/a/b");
        b.id = Some(String::from("2"));

        assert!(same_record(&a, &a.clone()));
        assert!(!same_record(&a, &b));
        assert!(!same_record(&a, &repo("https://github.com/a/b")));
    }
}
