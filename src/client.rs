use crate::errors::{FailedRequest, Unauthorized};
use failure::{Error, ResultExt};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;

const AGENT: &str = "repo-shelf";

/// A thin JSON-over-HTTP client scoped to a single base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    inner: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new<S: Into<String>>(base_url: S) -> ApiClient {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        ApiClient {
            inner: Client::new(),
            base_url,
        }
    }

    /// The full URL for an endpoint relative to the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get_json(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, Error> {
        let request = self.request(Method::GET, path).query(query);
        self.execute(request).await
    }

    /// Send a request with an optional JSON body and parse the JSON reply.
    pub async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, Error> {
        let mut request = self.request(method, path);

        if let Some(body) = body {
            request = request.json(body);
        }

        self.execute(request).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.inner
            .request(method, &self.endpoint(path))
            .header(USER_AGENT, AGENT)
            .header(ACCEPT, "application/json")
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Value, Error> {
        let request = request
            .build()
            .context("Generated invalid request. This is a bug.")?;
        let url = request.url().to_string();
        debug!("Sending {} request to {:?}", request.method(), url);

        let response = self
            .inner
            .execute(request)
            .await
            .context("Unable to send request")?;

        let status = response.status();
        debug!("Received response ({})", status);

        if log_enabled!(log::Level::Trace) {
            for line in format!("Response Headers {:#?}", response.headers()).lines()
            {
                trace!("{}", line);
            }
        }

        check_status(status, &url)?;
        let raw = read_body(response).await?;

        if log_enabled!(log::Level::Trace) {
            trace!("Body:");
            let pretty = serde_json::to_string_pretty(&raw)
                .unwrap_or_else(|_| raw.to_string());
            for line in pretty.lines() {
                trace!("{}", line);
            }
        }

        Ok(raw)
    }
}

fn check_status(status: StatusCode, url: &str) -> Result<(), Error> {
    if status.is_success() {
        return Ok(());
    }

    warn!("Request failed with {}", status);

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        Err(Unauthorized {
            status,
            url: url.to_string(),
        }
        .into())
    } else {
        Err(FailedRequest {
            status,
            url: url.to_string(),
        }
        .into())
    }
}

async fn read_body(response: Response) -> Result<Value, Error> {
    let bytes = response
        .bytes()
        .await
        .context("Unable to read the response body")?;

    if bytes.is_empty() {
        return Ok(Value::Null);
    }

    let raw = serde_json::from_slice(&bytes)
        .context("Unable to deserialize response")?;
    Ok(raw)
}
