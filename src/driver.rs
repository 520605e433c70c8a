use crate::config::Config;
use crate::errors::NotFound;
use crate::providers::ProviderKind;
use crate::registry::{is_user_profile_url, ProviderRegistry};
use crate::repo::normalize_url;
use crate::storage::{self, Storage};
use crate::Repo;
use failure::{Error, ResultExt};

/// Ties the provider registry and the selected storage backend together.
pub struct Driver {
    registry: ProviderRegistry,
    storage: Box<dyn Storage>,
}

impl Driver {
    pub fn new(registry: ProviderRegistry, storage: Box<dyn Storage>) -> Driver {
        Driver { registry, storage }
    }

    /// Set up the built-in providers, any custom providers from the config,
    /// and the configured storage backend.
    pub fn with_config(cfg: &Config) -> Result<Driver, Error> {
        let mut registry = ProviderRegistry::with_builtins();

        for custom in &cfg.providers {
            registry.add_custom(custom.kind, &custom.domain);
        }

        let storage = storage::open(cfg).context("Unable to open storage")?;

        Ok(Driver::new(registry, storage))
    }

    pub fn register_provider(&mut self, kind: ProviderKind, domain: &str) {
        self.registry.add_custom(kind, domain);
    }

    /// Add whatever a URL points at to the collection.
    ///
    /// A user's profile URL imports everything they've starred, anything
    /// else is treated as a single repository. Returns the repos which were
    /// actually added.
    pub async fn import(&self, url: &str) -> Result<Vec<Repo>, Error> {
        if is_user_profile_url(url) {
            let starred = self.registry.get_user_starred_repos(url, None).await?;
            let found = starred.len();

            let created = self.storage.create_many(starred).await?;
            info!(
                "Added {} of {} starred repos ({} were already stored)",
                created.len(),
                found,
                found.saturating_sub(created.len())
            );

            Ok(created)
        } else {
            if let Some(existing) = self.find_stored(url).await? {
                info!("{} is already stored", existing.display_name());
                return Ok(Vec::new());
            }

            let repo = self.registry.get_repo(url, None).await?;

            // the URL we were given may point somewhere inside the repo
            if let Some(key) = repo.dedup_key() {
                if let Some(existing) = self.find_by_key(&key).await? {
                    info!("{} is already stored", existing.display_name());
                    return Ok(Vec::new());
                }
            }

            let created = self.storage.create_repo(repo).await?;
            info!("Added {}", created.display_name());

            Ok(vec![created])
        }
    }

    pub async fn list(&self) -> Result<Vec<Repo>, Error> {
        self.storage.fetch_repos().await
    }

    /// Look up a stored repo by its URL.
    pub async fn find_stored(&self, url: &str) -> Result<Option<Repo>, Error> {
        self.find_by_key(&normalize_url(url)).await
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<Repo>, Error> {
        let repos = self.storage.fetch_repos().await?;

        Ok(repos
            .into_iter()
            .find(|r| r.dedup_key().as_deref() == Some(key)))
    }

    /// Replace the topics on a stored repo.
    pub async fn set_topics(
        &self,
        url: &str,
        topics: Vec<String>,
    ) -> Result<Repo, Error> {
        let mut repo = self.stored(url).await?;
        repo.topics = Some(topics);

        self.storage.update_repo(repo).await
    }

    /// Remove a stored repo, returning `false` if it wasn't stored.
    pub async fn remove(&self, url: &str) -> Result<bool, Error> {
        match self.find_stored(url).await? {
            Some(repo) => self.storage.delete_repo(&repo).await,
            None => Ok(false),
        }
    }

    /// Fetch the latest metadata for a stored repo, keeping its `id` and any
    /// topics it was tagged with.
    pub async fn refresh(&self, url: &str) -> Result<Repo, Error> {
        let stored = self.stored(url).await?;
        let mut latest = self.registry.get_repo(url, None).await?;

        latest.id = stored.id;
        latest.topics = merge_topics(stored.topics, latest.topics);

        self.storage.update_repo(latest).await
    }

    async fn stored(&self, url: &str) -> Result<Repo, Error> {
        match self.find_stored(url).await? {
            Some(repo) => Ok(repo),
            None => Err(NotFound {
                what: url.to_string(),
            }
            .into()),
        }
    }
}

fn merge_topics(
    existing: Option<Vec<String>>,
    latest: Option<Vec<String>>,
) -> Option<Vec<String>> {
    match (existing, latest) {
        (Some(mut existing), Some(latest)) => {
            for topic in latest {
                if !existing.contains(&topic) {
                    existing.push(topic);
                }
            }
            Some(existing)
        }
        (existing, latest) => existing.or(latest),
    }
}
