//! REST client for the dataset upload endpoints.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use promethium_protocol::constants::{
    DATASETS_PATH, FIELD_CHUNK_INDEX, FIELD_FILE, FIELD_UPLOAD_ID, UPLOAD_CHUNK_PATH,
    UPLOAD_FINALIZE_PATH, UPLOAD_INIT_PATH, chunk_file_name,
};
use promethium_protocol::{
    DatasetRecord, ErrorResponse, FinalizeUploadRequest, InitUploadRequest, InitUploadResponse,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::api::UploadApi;
use crate::error::TransportError;

const USER_AGENT: &str = concat!("promethium-upload/", env!("CARGO_PKG_VERSION"));

#[derive(Debug)]
struct HttpClientBuilderInner {
    base_url: Url,
    bearer_token: Option<String>,
    reqwest_builder: reqwest::ClientBuilder,
}

/// Builder to create an [`HttpClient`].
#[must_use]
#[derive(Debug)]
pub struct HttpClientBuilder(Result<HttpClientBuilderInner, TransportError>);

impl HttpClientBuilder {
    /// Creates a builder for the API rooted at `base_url`,
    /// e.g. `http://localhost:8000/api/v1`.
    pub fn new(base_url: impl reqwest::IntoUrl) -> Self {
        let mut base_url = match base_url.into_url() {
            Ok(url) => url,
            Err(err) => return Self(Err(err.into())),
        };
        // Relative joins replace the last segment unless the path ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let reqwest_builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .user_agent(USER_AGENT);

        Self(Ok(HttpClientBuilderInner {
            base_url,
            bearer_token: None,
            reqwest_builder,
        }))
    }

    /// Sets the total per-request timeout.
    pub fn timeout(self, timeout: Duration) -> Self {
        self.configure_reqwest(|builder| builder.timeout(timeout))
    }

    pub fn connect_timeout(self, timeout: Duration) -> Self {
        self.configure_reqwest(|builder| builder.connect_timeout(timeout))
    }

    /// Sends `Authorization: Bearer <token>` with every request.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        if let Ok(ref mut inner) = self.0 {
            inner.bearer_token = Some(token.into());
        }
        self
    }

    /// Calls the closure with the underlying [`reqwest::ClientBuilder`].
    pub fn configure_reqwest<F>(self, closure: F) -> Self
    where
        F: FnOnce(reqwest::ClientBuilder) -> reqwest::ClientBuilder,
    {
        let Ok(inner) = self.0 else { return self };
        Self(Ok(HttpClientBuilderInner {
            reqwest_builder: closure(inner.reqwest_builder),
            ..inner
        }))
    }

    /// Returns an [`HttpClient`] using this configuration.
    ///
    /// Fails if the base URL was invalid or the [`reqwest::Client`] fails to build.
    pub fn build(self) -> Result<HttpClient, TransportError> {
        let inner = self.0?;
        Ok(HttpClient {
            inner: Arc::new(HttpClientInner {
                reqwest: inner.reqwest_builder.build()?,
                base_url: inner.base_url,
                bearer_token: inner.bearer_token,
            }),
        })
    }
}

#[derive(Debug)]
struct HttpClientInner {
    reqwest: reqwest::Client,
    base_url: Url,
    bearer_token: Option<String>,
}

/// Client for the dataset REST API. Cheap to clone.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Arc<HttpClientInner>,
}

impl HttpClient {
    pub fn builder(base_url: impl reqwest::IntoUrl) -> HttpClientBuilder {
        HttpClientBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn url(&self, path: &str) -> Result<Url, TransportError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| TransportError::InvalidUrl(format!("{path}: {e}")))
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self.inner.reqwest.request(method, url);
        match &self.inner.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, TransportError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        trace!(%url, "POST");
        let response = self
            .request(reqwest::Method::POST, url)
            .json(body)
            .send()
            .await?;
        decode(check_status(response).await?).await
    }

    /// Lists registered datasets, newest first as ordered by the server.
    pub async fn list_datasets(
        &self,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<DatasetRecord>, TransportError> {
        let mut url = self.url(DATASETS_PATH)?;
        url.query_pairs_mut()
            .append_pair("skip", &skip.to_string())
            .append_pair("limit", &limit.to_string());
        trace!(%url, "GET");
        let response = self.request(reqwest::Method::GET, url).send().await?;
        decode(check_status(response).await?).await
    }

    /// Fetches one dataset. Returns `None` when the server answers 404.
    pub async fn get_dataset(&self, id: i64) -> Result<Option<DatasetRecord>, TransportError> {
        let url = self.url(&format!("{DATASETS_PATH}/{id}"))?;
        trace!(%url, "GET");
        let response = self.request(reqwest::Method::GET, url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode(check_status(response).await?).await.map(Some)
    }
}

impl UploadApi for HttpClient {
    fn init_upload<'a>(
        &'a self,
        request: &'a InitUploadRequest,
    ) -> BoxFuture<'a, Result<InitUploadResponse, TransportError>> {
        Box::pin(self.post_json(UPLOAD_INIT_PATH, request))
    }

    fn upload_chunk<'a>(
        &'a self,
        upload_id: &'a str,
        chunk_index: usize,
        data: Bytes,
    ) -> BoxFuture<'a, Result<(), TransportError>> {
        Box::pin(async move {
            let url = self.url(UPLOAD_CHUNK_PATH)?;
            let len = data.len() as u64;
            let part = Part::stream_with_length(data, len)
                .file_name(chunk_file_name(chunk_index))
                .mime_str("application/octet-stream")?;
            let form = Form::new()
                .text(FIELD_UPLOAD_ID, upload_id.to_string())
                .text(FIELD_CHUNK_INDEX, chunk_index.to_string())
                .part(FIELD_FILE, part);

            trace!(%url, chunk = chunk_index, "POST");
            let response = self
                .request(reqwest::Method::POST, url)
                .multipart(form)
                .send()
                .await?;
            check_status(response).await?;
            Ok(())
        })
    }

    fn finalize_upload<'a>(
        &'a self,
        request: &'a FinalizeUploadRequest,
    ) -> BoxFuture<'a, Result<DatasetRecord, TransportError>> {
        Box::pin(self.post_json(UPLOAD_FINALIZE_PATH, request))
    }
}

/// Maps non-2xx responses to [`TransportError::Status`], using the
/// server's `detail` message when the body carries one.
async fn check_status(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.bytes().await.unwrap_or_default();
    let message = match serde_json::from_slice::<ErrorResponse>(&body) {
        Ok(err) => err.message(),
        Err(_) if body.is_empty() => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
        Err(_) => String::from_utf8_lossy(&body).into_owned(),
    };
    Err(TransportError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let client = HttpClient::builder("http://localhost:8000/api/v1")
            .build()
            .unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:8000/api/v1/");
        assert_eq!(
            client.url(UPLOAD_INIT_PATH).unwrap().as_str(),
            "http://localhost:8000/api/v1/datasets/upload/init"
        );
    }

    #[test]
    fn invalid_base_url() {
        let err = HttpClient::builder("not a url").build().unwrap_err();
        assert!(matches!(err, TransportError::Http(_)));

        assert!(HttpClient::builder("mailto:ops@example.com").build().is_err());
    }
}
