//! Adapters for the services repositories can be hosted on.

use crate::errors::{MalformedUrl, UnknownProviderKind};
use crate::Repo;
use async_trait::async_trait;
use failure::Error;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_derive::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;

mod gitea;
mod github;
mod gitlab;
pub(crate) mod pagination;

pub use self::gitea::Gitea;
pub use self::github::GitHub;
pub use self::gitlab::GitLab;
pub use self::pagination::PAGE_SIZE;

/// Something which can look up repositories on a hosting service.
#[async_trait]
pub trait Provider: Debug + Send + Sync {
    /// A short name for the service, used in log messages.
    fn name(&self) -> &str;

    /// The domain this provider owns (e.g. `github.com`).
    fn domain(&self) -> &str;

    /// Does this URL belong to the provider's domain?
    fn match_url(&self, url: &str) -> bool;

    /// Fetch a single repository from its URL (e.g.
    /// `https://github.com/torvalds/linux`).
    async fn get_repo(&self, url: &str) -> Result<Repo, Error>;

    /// Fetch every repository a user has starred, across all pages.
    async fn get_user_starred_repos(
        &self,
        user_name: &str,
    ) -> Result<Vec<Repo>, Error>;
}

/// The URL patterns shared by every provider hosted at a single domain.
#[derive(Clone)]
pub struct UrlPattern {
    domain: String,
    matcher: Regex,
}

impl UrlPattern {
    pub fn new<S: Into<String>>(domain: S) -> UrlPattern {
        let domain = domain.into();
        let pattern = format!(r"^(https?://)?{}/", regex::escape(&domain));
        let matcher = Regex::new(&pattern)
            .expect("An escaped domain is always a valid regex");

        UrlPattern { domain, matcher }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn matches(&self, url: &str) -> bool {
        self.matcher.is_match(url)
    }

    /// Pull the `(owner, repo)` pair out of a repository URL.
    pub fn owner_and_name(
        &self,
        url: &str,
        provider: &str,
    ) -> Result<(String, String), Error> {
        static OWNER_AND_NAME: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"^(?:https?://)?[\w.-]+(?::\d+)?/([^/?#]+)/([^/?#]+)")
                .expect("Valid regex")
        });

        match OWNER_AND_NAME.captures(url) {
            Some(caps) => Ok((caps[1].to_string(), caps[2].to_string())),
            None => Err(MalformedUrl {
                url: url.to_string(),
                provider: provider.to_string(),
            }
            .into()),
        }
    }
}

impl Debug for UrlPattern {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("UrlPattern")
            .field("domain", &self.domain)
            .finish()
    }
}

/// The kinds of self-hosted services a custom provider can be created for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "gitlab")]
    GitLab,
    #[serde(rename = "gitea")]
    Gitea,
}

impl ProviderKind {
    /// Create a provider for a self-hosted instance at `domain`, talking to
    /// the instance's API over HTTPS.
    pub fn for_domain(self, domain: &str) -> Box<dyn Provider> {
        match self {
            ProviderKind::GitLab => Box::new(GitLab::self_hosted(domain)),
            ProviderKind::Gitea => Box::new(Gitea::self_hosted(domain)),
        }
    }
}

impl Display for ProviderKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            ProviderKind::GitLab => f.write_str("gitlab"),
            ProviderKind::Gitea => f.write_str("gitea"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = UnknownProviderKind;

    fn from_str(s: &str) -> Result<ProviderKind, UnknownProviderKind> {
        match s.to_lowercase().as_str() {
            "gitlab" => Ok(ProviderKind::GitLab),
            "gitea" | "forgejo" => Ok(ProviderKind::Gitea),
            _ => Err(UnknownProviderKind {
                name: s.to_string(),
            }),
        }
    }
}

/// The built-in providers, in the order they should be checked.
pub fn builtin() -> Vec<Box<dyn Provider>> {
    vec![
        Box::new(GitHub::new()),
        Box::new(GitLab::new()),
        Box::new(Gitea::codeberg()),
    ]
}
