use super::{assign_id, missing, new_repos, Storage};
use crate::client::ApiClient;
use crate::errors::FailedRequest;
use crate::Repo;
use async_trait::async_trait;
use failure::{Error, ResultExt};
use reqwest::{Method, StatusCode};
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;

/// Store repos on a small JSON-over-HTTP service.
///
/// The service only understands `GET`, `POST` and `DELETE`, so bulk updates
/// and deletes are sent as a `POST /repo` with a `_method` envelope.
#[derive(Debug, Clone)]
pub struct RestStorage {
    client: ApiClient,
}

impl RestStorage {
    pub fn new<S: Into<String>>(base_url: S) -> RestStorage {
        RestStorage {
            client: ApiClient::new(base_url),
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, Error> {
        self.client.send_json(method, path, body.as_ref()).await
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "_method", rename_all = "lowercase")]
enum Envelope<'a> {
    Put { repos: &'a [Repo] },
    Delete { ids: Vec<&'a str> },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Outcome {
    success: bool,
}

#[async_trait]
impl Storage for RestStorage {
    async fn fetch_repos(&self) -> Result<Vec<Repo>, Error> {
        let raw = self.send(Method::GET, "repo", None).await?;
        let repos =
            serde_json::from_value(raw).context("Expected a list of repos")?;

        Ok(repos)
    }

    async fn create_repo(&self, mut repo: Repo) -> Result<Repo, Error> {
        assign_id(&mut repo);

        let body = serde_json::to_value(&repo)?;
        let raw = self.send(Method::POST, "repo", Some(body)).await?;
        let created =
            serde_json::from_value(raw).context("Expected the created repo")?;

        Ok(created)
    }

    async fn create_many(&self, repos: Vec<Repo>) -> Result<Vec<Repo>, Error> {
        let existing = self.fetch_repos().await?;
        let fresh = new_repos(&existing, repos);

        if fresh.is_empty() {
            return Ok(fresh);
        }

        let body = serde_json::to_value(&fresh)?;
        let raw = self.send(Method::POST, "repo", Some(body)).await?;
        let created =
            serde_json::from_value(raw).context("Expected the created repos")?;

        Ok(created)
    }

    async fn update_repo(&self, repo: Repo) -> Result<Repo, Error> {
        let id = match repo.id.as_deref() {
            Some(id) => urlencoding::encode(id).into_owned(),
            None => return Err(missing(&repo)),
        };

        let body = serde_json::to_value(&repo)?;
        let raw = match self
            .send(Method::POST, &format!("repo/{}", id), Some(body))
            .await
        {
            Ok(raw) => raw,
            Err(ref e) if is_not_found(e) => return Err(missing(&repo)),
            Err(e) => return Err(e),
        };

        let updated =
            serde_json::from_value(raw).context("Expected the updated repo")?;
        Ok(updated)
    }

    async fn update_many(&self, repos: Vec<Repo>) -> Result<Vec<Repo>, Error> {
        if let Some(without_id) = repos.iter().find(|r| r.id.is_none()) {
            return Err(missing(without_id));
        }

        let body = serde_json::to_value(Envelope::Put { repos: &repos })?;
        let raw = self.send(Method::POST, "repo", Some(body)).await?;
        let updated =
            serde_json::from_value(raw).context("Expected the updated repos")?;

        Ok(updated)
    }

    async fn delete_repo(&self, repo: &Repo) -> Result<bool, Error> {
        let id = match repo.id.as_deref() {
            Some(id) => urlencoding::encode(id).into_owned(),
            None => return Ok(false),
        };

        match self.send(Method::DELETE, &format!("repo/{}", id), None).await {
            Ok(raw) => Ok(outcome(raw)?),
            Err(ref e) if is_not_found(e) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn delete_many(&self, repos: &[Repo]) -> Result<bool, Error> {
        let ids: Vec<&str> = repos.iter().filter_map(|r| r.id.as_deref()).collect();

        if ids.is_empty() {
            return Ok(false);
        }

        let body = serde_json::to_value(Envelope::Delete { ids })?;
        let raw = self.send(Method::POST, "repo", Some(body)).await?;

        outcome(raw)
    }
}

fn outcome(raw: Value) -> Result<bool, Error> {
    // an empty 2xx body means the request went through
    if raw.is_null() {
        return Ok(true);
    }

    let Outcome { success } = serde_json::from_value(raw)
        .context("Expected a `{ \"success\": bool }` response")?;
    Ok(success)
}

fn is_not_found(err: &Error) -> bool {
    err.downcast_ref::<FailedRequest>()
        .map(|failed| failed.status == StatusCode::NOT_FOUND)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::NotFound;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn linux() -> Repo {
        Repo {
            id: Some(String::from("42")),
            full_name: Some(String::from("torvalds/linux")),
            url: Some(String::from("https://github.com/torvalds/linux")),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn fetch_every_repo() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "42", "full_name": "torvalds/linux", "url": "https://github.com/torvalds/linux" },
            ])))
            .expect(1)
            .mount(&server)
            .await;
        let storage = RestStorage::new(server.uri());

        let got = storage.fetch_repos().await.unwrap();

        assert_eq!(got, vec![linux()]);
    }

    #[tokio::test]
    async fn create_posts_the_entity() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repo"))
            .and(body_json(json!({ "id": "7", "full_name": "torvalds/linux" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "7",
                "full_name": "torvalds/linux",
            })))
            .expect(1)
            .mount(&server)
            .await;
        let storage = RestStorage::new(server.uri());
        let repo = Repo {
            id: Some(String::from("7")),
            full_name: Some(String::from("torvalds/linux")),
            ..Default::default()
        };

        let got = storage.create_repo(repo).await.unwrap();

        assert_eq!(got.id.as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn created_repos_are_given_an_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repo"))
            .respond_with(|req: &wiremock::Request| {
                let body: Value = serde_json::from_slice(&req.body).unwrap();
                ResponseTemplate::new(201).set_body_json(body)
            })
            .expect(1)
            .mount(&server)
            .await;
        let storage = RestStorage::new(server.uri());
        let repo = Repo {
            url: Some(String::from("https://github.com/rust-lang/rust")),
            ..Default::default()
        };

        let got = storage.create_repo(repo).await.unwrap();

        assert!(got.id.is_some());
        assert_eq!(got.url.as_deref(), Some("https://github.com/rust-lang/rust"));
    }

    #[tokio::test]
    async fn bulk_create_only_sends_new_repos() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repo"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([linux()])),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repo"))
            .respond_with(|req: &wiremock::Request| {
                let body: Value = serde_json::from_slice(&req.body).unwrap();
                ResponseTemplate::new(201).set_body_json(body)
            })
            .expect(1)
            .mount(&server)
            .await;
        let storage = RestStorage::new(server.uri());
        let rust = Repo {
            url: Some(String::from("https://github.com/rust-lang/rust")),
            ..Default::default()
        };
        let mut duplicate = linux();
        duplicate.id = None;

        let got = storage.create_many(vec![duplicate, rust]).await.unwrap();

        assert_eq!(got.len(), 1);
        assert_eq!(got[0].url.as_deref(), Some("https://github.com/rust-lang/rust"));
        assert!(got[0].id.is_some());
    }

    #[tokio::test]
    async fn update_one_posts_to_its_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repo/42"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!(linux())),
            )
            .expect(1)
            .mount(&server)
            .await;
        let storage = RestStorage::new(server.uri());

        let got = storage.update_repo(linux()).await.unwrap();

        assert_eq!(got, linux());
    }

    #[tokio::test]
    async fn updating_an_unknown_repo_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repo/42"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let storage = RestStorage::new(server.uri());

        let err = storage.update_repo(linux()).await.unwrap_err();

        assert!(err.downcast_ref::<NotFound>().is_some());
    }

    #[tokio::test]
    async fn bulk_updates_use_the_put_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repo"))
            .and(body_json(json!({
                "_method": "put",
                "repos": [linux()],
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([linux()])),
            )
            .expect(1)
            .mount(&server)
            .await;
        let storage = RestStorage::new(server.uri());

        let got = storage.update_many(vec![linux()]).await.unwrap();

        assert_eq!(got, vec![linux()]);
    }

    #[tokio::test]
    async fn delete_one_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/repo/42"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "success": true })),
            )
            .expect(1)
            .mount(&server)
            .await;
        let storage = RestStorage::new(server.uri());

        assert!(storage.delete_repo(&linux()).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_an_unknown_repo_is_false() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let storage = RestStorage::new(server.uri());
        let never_stored = Repo::default();

        assert!(!storage.delete_repo(&linux()).await.unwrap());
        assert!(!storage.delete_repo(&never_stored).await.unwrap());
    }

    #[tokio::test]
    async fn bulk_deletes_use_the_delete_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repo"))
            .and(body_json(json!({ "_method": "delete", "ids": ["42"] })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "success": true })),
            )
            .expect(1)
            .mount(&server)
            .await;
        let storage = RestStorage::new(server.uri());

        assert!(storage.delete_many(&[linux()]).await.unwrap());
    }
}
