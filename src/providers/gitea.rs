use super::pagination::fetch_all;
use super::{Provider, UrlPattern};
use crate::client::ApiClient;
use crate::mapper::{parse_response, FieldMapper};
use crate::repo::RepoField;
use crate::Repo;
use async_trait::async_trait;
use failure::Error;
use serde_json::Value;

const CODEBERG_HOSTNAME: &str = "codeberg.org";

/// A Gitea (or Forgejo) instance, including Codeberg.
///
/// Gitea's repository endpoint doesn't include topics, so fetching a single
/// repo takes a second request to `/repos/:owner/:repo/topics`.
///
/// Codeberg only serves starred lists to authenticated clients. We never
/// send credentials, so expect [`get_user_starred_repos()`] to fail with
/// [`Unauthorized`] there.
///
/// [`get_user_starred_repos()`]: Provider::get_user_starred_repos
/// [`Unauthorized`]: crate::errors::Unauthorized
#[derive(Debug, Clone)]
pub struct Gitea {
    name: String,
    client: ApiClient,
    pattern: UrlPattern,
    mapper: FieldMapper,
}

impl Gitea {
    pub fn codeberg() -> Gitea {
        Gitea::with_base_url(
            "codeberg",
            CODEBERG_HOSTNAME,
            format!("https://{}/api/v1", CODEBERG_HOSTNAME),
        )
    }

    /// A Gitea instance hosted at `hostname`.
    pub fn self_hosted(hostname: &str) -> Gitea {
        Gitea::with_base_url(
            "gitea",
            hostname,
            format!("https://{}/api/v1", hostname),
        )
    }

    pub fn with_base_url<N, D, U>(name: N, domain: D, base_url: U) -> Gitea
    where
        N: Into<String>,
        D: Into<String>,
        U: Into<String>,
    {
        Gitea {
            name: name.into(),
            client: ApiClient::new(base_url),
            pattern: UrlPattern::new(domain),
            mapper: mapper(),
        }
    }

    async fn topics(&self, owner: &str, name: &str) -> Result<Vec<String>, Error> {
        let raw = self
            .client
            .get_json(&format!("repos/{}/{}/topics", owner, name), &[])
            .await?;

        let topics = raw
            .get("topics")
            .and_then(Value::as_array)
            .map(|topics| {
                topics
                    .iter()
                    .filter_map(|t| t.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        Ok(topics)
    }
}

#[async_trait]
impl Provider for Gitea {
    fn name(&self) -> &str {
        &self.name
    }

    fn domain(&self) -> &str {
        self.pattern.domain()
    }

    fn match_url(&self, url: &str) -> bool {
        self.pattern.matches(url)
    }

    async fn get_repo(&self, url: &str) -> Result<Repo, Error> {
        let (owner, name) = self.pattern.owner_and_name(url, self.name())?;
        debug!("Fetching {}/{} from {}", owner, name, self.domain());

        let raw = self
            .client
            .get_json(&format!("repos/{}/{}", owner, name), &[])
            .await?;
        let mut repo = parse_response(&raw, &self.mapper);

        repo.topics = Some(self.topics(&owner, &name).await?);

        Ok(repo)
    }

    /// Pages are requested with `limit=100`. Servers clamp that to their
    /// `MAX_RESPONSE_ITEMS` setting (50 by default), in which case the first
    /// page looks short and only that many repos are returned.
    async fn get_user_starred_repos(
        &self,
        user_name: &str,
    ) -> Result<Vec<Repo>, Error> {
        debug!(
            "Fetching the repositories {} starred on {}",
            user_name,
            self.domain()
        );

        let starred = fetch_all(
            self.client.clone(),
            format!("users/{}/starred", urlencoding::encode(user_name)),
            "limit",
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
        ("html_url", RepoField::Url),
        ("website", RepoField::Homepage),
        ("language", RepoField::Lang),
        ("created_at", RepoField::CreatedAt),
        ("updated_at", RepoField::LastUpdate),
        ("fork", RepoField::Forked),
        ("archived", RepoField::Archived),
        ("template", RepoField::Template),
        ("forks_count", RepoField::Forks),
        ("stars_count", RepoField::Stars),
        ("owner.login", RepoField::Owner),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Unauthorized;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn codeberg(server: &MockServer) -> Gitea {
        Gitea::with_base_url(
            "codeberg",
            "codeberg.org",
            format!("{}/api/v1", server.uri()),
        )
    }

    #[tokio::test]
    async fn topics_come_from_a_second_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/repos/forgejo/forgejo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "full_name": "forgejo/forgejo",
                "name": "forgejo",
                "html_url": "https://codeberg.org/forgejo/forgejo",
                "website": "https://forgejo.org",
                "stars_count": 2000,
                "template": false,
                "owner": { "login": "forgejo" },
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/repos/forgejo/forgejo/topics"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "topics": ["forge", "git"] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let got = codeberg(&server)
            .get_repo("https://codeberg.org/forgejo/forgejo")
            .await
            .unwrap();

        assert_eq!(got.full_name.as_deref(), Some("forgejo/forgejo"));
        assert_eq!(got.homepage.as_deref(), Some("https://forgejo.org"));
        assert_eq!(got.stars, Some(2000));
        assert_eq!(
            got.topics,
            Some(vec![String::from("forge"), String::from("git")])
        );
    }

    #[tokio::test]
    async fn a_failing_topics_request_fails_the_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/repos/a/b"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "name": "b" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/repos/a/b/topics"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let got = codeberg(&server).get_repo("https://codeberg.org/a/b").await;

        assert!(got.is_err());
    }

    #[tokio::test]
    async fn starred_lists_use_the_limit_parameter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/users/alice/starred"))
            .and(query_param("limit", "100"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "full_name": "alice/dotfiles" },
            ])))
            .expect(1)
            .mount(&server)
            .await;
        let gitea = Gitea::with_base_url(
            "gitea",
            "git.example.com",
            format!("{}/api/v1", server.uri()),
        );

        let got = gitea.get_user_starred_repos("alice").await.unwrap();

        assert_eq!(got.len(), 1);
        assert_eq!(got[0].full_name.as_deref(), Some("alice/dotfiles"));
    }

    #[tokio::test]
    async fn unauthenticated_starred_lists_are_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/users/alice/starred"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = codeberg(&server)
            .get_user_starred_repos("alice")
            .await
            .unwrap_err();

        assert!(err.downcast_ref::<Unauthorized>().is_some());
    }
}
