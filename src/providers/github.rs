use super::pagination::fetch_all;
use super::{Provider, UrlPattern};
use crate::client::ApiClient;
use crate::mapper::{parse_response, FieldMapper};
use crate::repo::RepoField;
use crate::Repo;
use async_trait::async_trait;
use failure::Error;

const DEFAULT_API_URL: &str = "https://api.github.com";
const DEFAULT_DOMAIN: &str = "github.com";

/// Retrieve repositories from GitHub.
#[derive(Debug, Clone)]
pub struct GitHub {
    client: ApiClient,
    pattern: UrlPattern,
    mapper: FieldMapper,
}

impl GitHub {
    pub fn new() -> GitHub {
        GitHub::with_base_url(DEFAULT_DOMAIN, DEFAULT_API_URL)
    }

    /// Create a `GitHub` which owns `domain` but sends its API requests to
    /// `base_url`.
    pub fn with_base_url<D, U>(domain: D, base_url: U) -> GitHub
    where
        D: Into<String>,
        U: Into<String>,
    {
        GitHub {
            client: ApiClient::new(base_url),
            pattern: UrlPattern::new(domain),
            mapper: mapper(),
        }
    }
}

impl Default for GitHub {
    fn default() -> GitHub {
        GitHub::new()
    }
}

#[async_trait]
impl Provider for GitHub {
    fn name(&self) -> &str {
        "github"
    }

    fn domain(&self) -> &str {
        self.pattern.domain()
    }

    fn match_url(&self, url: &str) -> bool {
        self.pattern.matches(url)
    }

    async fn get_repo(&self, url: &str) -> Result<Repo, Error> {
        let (owner, name) = self.pattern.owner_and_name(url, self.name())?;
        debug!("Fetching {}/{} from GitHub", owner, name);

        let raw = self
            .client
            .get_json(&format!("repos/{}/{}", owner, name), &[])
            .await?;

        Ok(parse_response(&raw, &self.mapper))
    }

    async fn get_user_starred_repos(
        &self,
        user_name: &str,
    ) -> Result<Vec<Repo>, Error> {
        debug!("Fetching the repositories {} starred on GitHub", user_name);

        let starred = fetch_all(
            self.client.clone(),
            format!("users/{}/starred", urlencoding::encode(user_name)),
            "per_page",
            &self.mapper,
        )
        .await?;

        debug!("{} starred repos", starred.len());
        Ok(starred)
    }
}

fn mapper() -> FieldMapper {
    FieldMapper::new(vec![
        ("full_name", RepoField::FullName),
        ("name", RepoField::Name),
        ("description", RepoField::Description),
        ("topics", RepoField::Topics),
        ("html_url", RepoField::Url),
        ("homepage", RepoField::Homepage),
        ("language", RepoField::Lang),
        ("license.spdx_id", RepoField::License),
        ("created_at", RepoField::CreatedAt),
        ("pushed_at", RepoField::LastPush),
        ("updated_at", RepoField::LastUpdate),
        ("fork", RepoField::Forked),
        ("archived", RepoField::Archived),
        ("is_template", RepoField::Template),
        ("forks_count", RepoField::Forks),
        ("stargazers_count", RepoField::Stars),
        ("owner.login", RepoField::Owner),
        ("owner.type", RepoField::OwnerType),
    ])
}
