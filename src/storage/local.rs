use super::{assign_id, missing, new_repos, same_record, sample_repos, Storage};
use crate::Repo;
use async_trait::async_trait;
use failure::{Error, ResultExt};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

/// The file (inside the data directory) the whole collection is kept in.
pub const STORAGE_KEY: &str = "repos.json";

/// Persist the collection as a single JSON array on the local filesystem.
#[derive(Debug)]
pub struct LocalStorage {
    path: PathBuf,
    seed_sample: bool,
    lock: Mutex<()>,
}

impl LocalStorage {
    /// Keep repos in `data_dir`. When `seed_sample` is set and nothing has
    /// ever been saved, the store starts off with the bundled sample repos.
    pub fn new<P: Into<PathBuf>>(data_dir: P, seed_sample: bool) -> LocalStorage {
        LocalStorage {
            path: data_dir.into().join(STORAGE_KEY),
            seed_sample,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<Repo>, Error> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(ref e) if e.kind() == io::ErrorKind::NotFound => {
                return self.first_access().await;
            }
            Err(e) => {
                return Err(e)
                    .with_context(|_| {
                        format!("Unable to read {}", self.path.display())
                    })
                    .map_err(Error::from);
            }
        };

        let repos = serde_json::from_str(&raw).with_context(|_| {
            format!("{} doesn't contain a list of repos", self.path.display())
        })?;
        Ok(repos)
    }

    async fn first_access(&self) -> Result<Vec<Repo>, Error> {
        if !self.seed_sample {
            return Ok(Vec::new());
        }

        info!("Seeding {} with the sample repos", self.path.display());
        let repos = sample_repos()?;
        self.save(&repos).await?;

        Ok(repos)
    }

    async fn save(&self, repos: &[Repo]) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.with_context(|_| {
                format!("Couldn't create the data directory ({})", parent.display())
            })?;
        }

        let serialized = serde_json::to_string_pretty(repos)?;
        let temp = self.path.with_extension("json.tmp");

        fs::write(&temp, serialized)
            .await
            .with_context(|_| format!("Unable to write {}", temp.display()))?;
        fs::rename(&temp, &self.path)
            .await
            .with_context(|_| format!("Unable to replace {}", self.path.display()))?;

        debug!("Saved {} repos to {}", repos.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn fetch_repos(&self) -> Result<Vec<Repo>, Error> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    async fn create_repo(&self, mut repo: Repo) -> Result<Repo, Error> {
        let _guard = self.lock.lock().await;
        let mut repos = self.load().await?;

        assign_id(&mut repo);
        repos.insert(0, repo.clone());
        self.save(&repos).await?;

        Ok(repo)
    }

    async fn create_many(&self, candidates: Vec<Repo>) -> Result<Vec<Repo>, Error> {
        let _guard = self.lock.lock().await;
        let mut repos = self.load().await?;

        let fresh = new_repos(&repos, candidates);
        if fresh.is_empty() {
            return Ok(fresh);
        }

        repos.splice(0..0, fresh.iter().cloned());
        self.save(&repos).await?;

        Ok(fresh)
    }

    async fn update_repo(&self, repo: Repo) -> Result<Repo, Error> {
        let _guard = self.lock.lock().await;
        let mut repos = self.load().await?;

        match repos.iter_mut().find(|r| same_record(r, &repo)) {
            Some(existing) => *existing = repo.clone(),
            None => return Err(missing(&repo)),
        }

        self.save(&repos).await?;
        Ok(repo)
    }

    async fn update_many(&self, updated: Vec<Repo>) -> Result<Vec<Repo>, Error> {
        let _guard = self.lock.lock().await;
        let mut repos = self.load().await?;

        for repo in &updated {
            match repos.iter_mut().find(|r| same_record(r, repo)) {
                Some(existing) => *existing = repo.clone(),
                None => return Err(missing(repo)),
            }
        }

        self.save(&repos).await?;
        Ok(updated)
    }

    async fn delete_repo(&self, repo: &Repo) -> Result<bool, Error> {
        let _guard = self.lock.lock().await;
        let mut repos = self.load().await?;

        match repos.iter().position(|r| same_record(r, repo)) {
            Some(ix) => {
                repos.remove(ix);
                self.save(&repos).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_many(&self, targets: &[Repo]) -> Result<bool, Error> {
        let _guard = self.lock.lock().await;
        let mut repos = self.load().await?;
        let before = repos.len();

        repos.retain(|r| !targets.iter().any(|target| same_record(r, target)));

        if repos.len() == before {
            return Ok(false);
        }

        self.save(&repos).await?;
        Ok(true)
    }
}
