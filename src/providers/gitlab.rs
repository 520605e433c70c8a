use super::pagination::fetch_all;
use super::{Provider, UrlPattern};
use crate::client::ApiClient;
use crate::mapper::{parse_response, FieldMapper};
use crate::repo::RepoField;
use crate::Repo;
use async_trait::async_trait;
use failure::Error;
use serde_json::Value;

const DEFAULT_HOSTNAME: &str = "gitlab.com";

/// The GitLab provider, either gitlab.com or a self-hosted instance.
#[derive(Debug, Clone)]
pub struct GitLab {
    client: ApiClient,
    pattern: UrlPattern,
    mapper: FieldMapper,
}

impl GitLab {
    pub fn new() -> GitLab {
        GitLab::self_hosted(DEFAULT_HOSTNAME)
    }

    /// A GitLab instance hosted at `hostname`.
    pub fn self_hosted(hostname: &str) -> GitLab {
        GitLab::with_base_url(hostname, format!("https://{}/api/v4", hostname))
    }

    pub fn with_base_url<D, U>(domain: D, base_url: U) -> GitLab
    where
        D: Into<String>,
        U: Into<String>,
    {
        GitLab {
            client: ApiClient::new(base_url),
            pattern: UrlPattern::new(domain),
            mapper: mapper(),
        }
    }

    async fn main_language(&self, project: &str) -> Result<Option<String>, Error> {
        let languages = self
            .client
            .get_json(&format!("projects/{}/languages", project), &[])
            .await?;

        Ok(max_language(&languages))
    }
}

impl Default for GitLab {
    fn default() -> GitLab {
        GitLab::new()
    }
}

#[async_trait]
impl Provider for GitLab {
    fn name(&self) -> &str {
        "gitlab"
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

        let project = urlencoding::encode(&format!("{}/{}", owner, name))
            .into_owned();
        let raw = self
            .client
            .get_json(
                &format!("projects/{}", project),
                &[("license", String::from("true"))],
            )
            .await?;

        let mut repo = parse_response(&raw, &self.mapper);

        // the languages endpoint accepts either the numeric ID or the path
        let project_ref = match raw.get("id").and_then(Value::as_u64) {
            Some(id) => id.to_string(),
            None => project,
        };
        repo.lang = self.main_language(&project_ref).await?;

        Ok(repo)
    }

    async fn get_user_starred_repos(
        &self,
        user_name: &str,
    ) -> Result<Vec<Repo>, Error> {
        debug!(
            "Fetching the projects {} starred on {}",
            user_name,
            self.domain()
        );

        let starred = fetch_all(
            self.client.clone(),
            format!("users/{}/starred_projects", urlencoding::encode(user_name)),
            "per_page",
            &self.mapper,
        )
        .await?;

        debug!("Found {} starred projects", starred.len());
        Ok(starred)
    }
}

/// Pick the language with the biggest share from a `{ language: weight }`
/// breakdown.
///
/// Ties go to whichever language comes first in the response.
pub(crate) fn max_language(languages: &Value) -> Option<String> {
    let mut best: Option<(&str, f64)> = None;

    for (language, weight) in languages.as_object()?.iter() {
        let weight = match weight.as_f64() {
            Some(w) => w,
            None => continue,
        };

        match best {
            Some((_, best_weight)) if weight <= best_weight => {}
            _ => best = Some((language.as_str(), weight)),
        }
    }

    best.map(|(language, _)| language.to_string())
}

fn mapper() -> FieldMapper {
    FieldMapper::new(vec![
        ("path_with_namespace", RepoField::FullName),
        ("path", RepoField::Name),
        ("description", RepoField::Description),
        ("tag_list", RepoField::Topics),
        ("topics", RepoField::Topics),
        ("web_url", RepoField::Url),
        ("license.name", RepoField::License),
        ("created_at", RepoField::CreatedAt),
        ("last_activity_at", RepoField::LastPush),
        ("updated_at", RepoField::LastUpdate),
        ("archived", RepoField::Archived),
        ("forks_count", RepoField::Forks),
        ("star_count", RepoField::Stars),
        ("namespace.full_path", RepoField::Owner),
        ("namespace.kind", RepoField::OwnerType),
    ])
}
