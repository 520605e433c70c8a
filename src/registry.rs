use crate::errors::ProviderNotFound;
use crate::providers::{self, Provider, ProviderKind};
use crate::Repo;
use failure::Error;

/// The ordered set of providers used to resolve repository URLs.
///
/// Providers are checked in the order they were added and the first one
/// claiming a URL wins, so the built-ins always take priority over custom
/// providers registered later.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: Vec<Box<dyn Provider>>,
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn new() -> ProviderRegistry {
        ProviderRegistry::default()
    }

    /// A registry containing the built-in providers (GitHub, GitLab and
    /// Codeberg).
    pub fn with_builtins() -> ProviderRegistry {
        ProviderRegistry {
            providers: providers::builtin(),
        }
    }

    pub fn add_provider(&mut self, provider: Box<dyn Provider>) {
        if self.providers.iter().any(|p| p.domain() == provider.domain()) {
            warn!(
                "{} is already handled by another provider, the new {} provider will never be used",
                provider.domain(),
                provider.name()
            );
        }

        info!("Registering a {} provider for {}", provider.name(), provider.domain());
        self.providers.push(provider);
    }

    /// Register a custom provider for a self-hosted instance.
    pub fn add_custom(&mut self, kind: ProviderKind, domain: &str) {
        self.add_provider(kind.for_domain(domain));
    }

    pub fn providers(&self) -> impl Iterator<Item = &dyn Provider> {
        self.providers.iter().map(|p| &**p)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Find the first provider which claims this URL.
    pub fn determine_provider(&self, url: &str) -> Result<&dyn Provider, Error> {
        self.providers()
            .find(|p| p.match_url(url))
            .ok_or_else(|| {
                ProviderNotFound {
                    url: url.to_string(),
                }
                .into()
            })
    }

    /// Fetch a single repository, resolving its provider when one isn't
    /// supplied.
    pub async fn get_repo(
        &self,
        url: &str,
        provider: Option<&dyn Provider>,
    ) -> Result<Repo, Error> {
        let url = sanitize_url(url);
        let provider = match provider {
            Some(p) => p,
            None => self.determine_provider(url)?,
        };

        debug!("Fetching {} using the {} provider", url, provider.name());
        provider.get_repo(url).await
    }

    /// Fetch every repository starred by the user a profile URL points at.
    pub async fn get_user_starred_repos(
        &self,
        url: &str,
        provider: Option<&dyn Provider>,
    ) -> Result<Vec<Repo>, Error> {
        let url = sanitize_url(url);
        let provider = match provider {
            Some(p) => p,
            None => self.determine_provider(url)?,
        };
        let path = sanitize_url(without_query(url));
        let user_name = path.rsplit('/').next().unwrap_or(path);

        info!("Fetching the repos {} starred on {}", user_name, provider.domain());
        let repos = provider.get_user_starred_repos(user_name).await?;
        info!("Found {} starred repos", repos.len());

        Ok(repos)
    }
}

/// Strip trailing slashes from a URL.
pub fn sanitize_url(url: &str) -> &str {
    url.trim_end_matches('/')
}

/// Everything before the first `?` or `#`.
fn without_query(url: &str) -> &str {
    match url.find(|c| c == '?' || c == '#') {
        Some(end) => &url[..end],
        None => url,
    }
}

/// Does this URL point at a user (`https://github.com/torvalds`) rather than
/// one of their repositories?
pub fn is_user_profile_url(url: &str) -> bool {
    let without_protocol = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);

    sanitize_url(without_query(without_protocol)).split('/').count() == 2
}
