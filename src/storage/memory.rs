use super::{assign_id, missing, new_repos, same_record, Storage};
use crate::Repo;
use async_trait::async_trait;
use failure::Error;
use tokio::sync::RwLock;

/// A store which only lives as long as the process, handy for demos and
/// tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    repos: RwLock<Vec<Repo>>,
}

impl MemoryStorage {
    pub fn new() -> MemoryStorage {
        MemoryStorage::default()
    }

    pub fn with_repos(repos: Vec<Repo>) -> MemoryStorage {
        MemoryStorage {
            repos: RwLock::new(repos),
        }
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn fetch_repos(&self) -> Result<Vec<Repo>, Error> {
        Ok(self.repos.read().await.clone())
    }

    async fn create_repo(&self, mut repo: Repo) -> Result<Repo, Error> {
        assign_id(&mut repo);
        self.repos.write().await.insert(0, repo.clone());

        Ok(repo)
    }

    async fn create_many(&self, repos: Vec<Repo>) -> Result<Vec<Repo>, Error> {
        let mut stored = self.repos.write().await;
        let fresh = new_repos(&stored, repos);
        stored.splice(0..0, fresh.iter().cloned());

        Ok(fresh)
    }

    async fn update_repo(&self, repo: Repo) -> Result<Repo, Error> {
        let mut stored = self.repos.write().await;

        match stored.iter_mut().find(|r| same_record(r, &repo)) {
            Some(existing) => {
                *existing = repo.clone();
                Ok(repo)
            }
            None => Err(missing(&repo)),
        }
    }

    async fn update_many(&self, repos: Vec<Repo>) -> Result<Vec<Repo>, Error> {
        let mut stored = self.repos.write().await;
        let mut positions = Vec::with_capacity(repos.len());

        for repo in &repos {
            match stored.iter().position(|r| same_record(r, repo)) {
                Some(ix) => positions.push(ix),
                None => return Err(missing(repo)),
            }
        }

        for (ix, repo) in positions.into_iter().zip(&repos) {
            stored[ix] = repo.clone();
        }

        Ok(repos)
    }

    async fn delete_repo(&self, repo: &Repo) -> Result<bool, Error> {
        let mut stored = self.repos.write().await;

        match stored.iter().position(|r| same_record(r, repo)) {
            Some(ix) => {
                stored.remove(ix);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_many(&self, repos: &[Repo]) -> Result<bool, Error> {
        let mut stored = self.repos.write().await;
        let before = stored.len();

        stored.retain(|r| !repos.iter().any(|target| same_record(r, target)));

        Ok(stored.len() != before)
    }
}
