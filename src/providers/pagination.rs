use crate::client::ApiClient;
use crate::mapper::{parse_response, FieldMapper};
use crate::Repo;
use async_stream::try_stream;
use failure::Error;
use futures::stream::{Stream, TryStreamExt};
use serde_json::Value;

/// How many items are requested per page.
pub const PAGE_SIZE: usize = 100;

/// Lazily fetch the pages of a page-number paginated endpoint.
///
/// Pages are requested one after another (`page=1`, `page=2`, ...) and the
/// stream ends after the first page holding fewer than [`PAGE_SIZE`] items.
/// The `size_param` is whatever the API calls its page size parameter
/// (`per_page` for GitHub and GitLab, `limit` for Gitea).
pub(crate) fn paginated(
    client: ApiClient,
    path: String,
    size_param: &'static str,
) -> impl Stream<Item = Result<Vec<Value>, Error>> {
    try_stream! {
        let mut page = 1_usize;

        loop {
            let query = [
                (size_param, PAGE_SIZE.to_string()),
                ("page", page.to_string()),
            ];
            let raw = client.get_json(&path, &query).await?;
            let items = into_items(raw, &path)?;
            let is_last = items.len() < PAGE_SIZE;
            trace!("Page {} of {} had {} items", page, path, items.len());

            yield items;

            if is_last {
                break;
            }
            page += 1;
        }
    }
}

/// Pull every page from [`paginated()`] and normalize each item.
///
/// The first error aborts the whole fetch and anything accumulated so far is
/// dropped.
pub(crate) async fn fetch_all(
    client: ApiClient,
    path: String,
    size_param: &'static str,
    mapper: &FieldMapper,
) -> Result<Vec<Repo>, Error> {
    let pages = paginated(client, path, size_param);
    futures::pin_mut!(pages);

    let mut repos = Vec::new();

    while let Some(page) = pages.try_next().await? {
        repos.extend(page.iter().map(|raw| parse_response(raw, mapper)));
    }

    Ok(repos)
}

fn into_items(raw: Value, path: &str) -> Result<Vec<Value>, Error> {
    match raw {
        Value::Array(items) => Ok(items),
        other => {
            let msg = format!(
                "Expected a list of repositories from {}, found {}",
                path,
                kind_of(&other)
            );
            Err(failure::err_msg(msg))
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::RepoField;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn page_of(count: usize, offset: usize) -> Value {
        let items: Vec<Value> = (0..count)
            .map(|i| json!({ "full_name": format!("user/repo-{}", offset + i) }))
            .collect();
        Value::Array(items)
    }

    async fn mount_page(server: &MockServer, page: usize, body: Value) {
        Mock::given(method("GET"))
            .and(path("/users/alice/starred"))
            .and(query_param("page", page.to_string().as_str()))
            .and(query_param("per_page", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn stop_after_the_first_short_page() {
        let server = MockServer::start().await;
        mount_page(&server, 1, page_of(100, 0)).await;
        mount_page(&server, 2, page_of(100, 100)).await;
        mount_page(&server, 3, page_of(37, 200)).await;
        let mapper = FieldMapper::new(vec![("full_name", RepoField::FullName)]);

        let got = fetch_all(
            ApiClient::new(server.uri()),
            String::from("users/alice/starred"),
            "per_page",
            &mapper,
        )
        .await
        .unwrap();

        assert_eq!(got.len(), 237);
        assert_eq!(got[0].full_name.as_deref(), Some("user/repo-0"));
        assert_eq!(got[236].full_name.as_deref(), Some("user/repo-236"));

        let requests = server.received_requests().await.unwrap();
        let pages: Vec<String> = requests
            .iter()
            .filter_map(|r| {
                r.url
                    .query_pairs()
                    .find(|(k, _)| k == "page")
                    .map(|(_, v)| v.into_owned())
            })
            .collect();
        assert_eq!(pages, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn empty_first_page_means_no_repos() {
        let server = MockServer::start().await;
        mount_page(&server, 1, json!([])).await;
        let mapper = FieldMapper::new(vec![("full_name", RepoField::FullName)]);

        let got = fetch_all(
            ApiClient::new(server.uri()),
            String::from("users/alice/starred"),
            "per_page",
            &mapper,
        )
        .await
        .unwrap();

        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn a_failing_page_fails_the_whole_fetch() {
        let server = MockServer::start().await;
        mount_page(&server, 1, page_of(100, 0)).await;
        Mock::given(method("GET"))
            .and(path("/users/alice/starred"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        let mapper = FieldMapper::new(vec![("full_name", RepoField::FullName)]);

        let err = fetch_all(
            ApiClient::new(server.uri()),
            String::from("users/alice/starred"),
            "per_page",
            &mapper,
        )
        .await
        .unwrap_err();

        assert!(err.downcast_ref::<crate::errors::FailedRequest>().is_some());
    }

    #[tokio::test]
    async fn non_list_pages_are_an_error() {
        let server = MockServer::start().await;
        mount_page(&server, 1, json!({ "message": "nope" })).await;
        let mapper = FieldMapper::new(vec![("full_name", RepoField::FullName)]);

        let got = fetch_all(
            ApiClient::new(server.uri()),
            String::from("users/alice/starred"),
            "per_page",
            &mapper,
        )
        .await;

        assert!(got.is_err());
    }
}
