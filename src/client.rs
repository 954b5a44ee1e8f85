use std::fmt;
use std::path::Path;

use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::Value;
use tokio::time::Instant;
use url::Url;

use crate::errors::{Result, SensifaiError};
use crate::graphql::{
    api_result_request, error_message, graphql_errors, unwrap_envelope, upload_by_file_map,
    upload_by_file_operations, upload_by_url_request, GraphQlRequest, API_RESULT_FIELD,
    UPLOAD_BY_FILE_FIELD, UPLOAD_BY_URL_FIELD,
};
use crate::models::{
    analysis_result_from_value, upload_result_from_value, AnalysisResult, DecodeMode,
    PollOptions, UploadResult,
};

const DEFAULT_BASE_URL: &str = "https://api.sensifai.com/api/";
const TOKEN_ENV_VAR: &str = "SENSIFAI_TOKEN";

/// Builder for constructing a [`Client`] with custom configuration.
///
/// # Example
///
/// ```no_run
/// use sensifai::{ClientBuilder, DecodeMode};
///
/// # fn example() -> sensifai::Result<()> {
/// let client = ClientBuilder::new()
///     .token("your-sensifai-token")
///     .base_url("https://proxy.example.com/api/")
///     .decode_mode(DecodeMode::Lenient)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    token: Option<String>,
    base_url: String,
    http: Option<reqwest::Client>,
    decode_mode: DecodeMode,
}

impl ClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            http: None,
            decode_mode: DecodeMode::default(),
        }
    }

    /// Set the access token sent with every upload.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Override the endpoint (defaults to `https://api.sensifai.com/api/`).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Use a pre-configured HTTP client, e.g. one with a request timeout.
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Choose how undecodable responses are handled (defaults to
    /// [`DecodeMode::Strict`]).
    pub fn decode_mode(mut self, mode: DecodeMode) -> Self {
        self.decode_mode = mode;
        self
    }

    /// Build the [`Client`].
    ///
    /// If no token was set via [`token`](Self::token), the builder reads the
    /// `SENSIFAI_TOKEN` environment variable.
    ///
    /// Returns [`SensifaiError::Configuration`] if no token is available or the
    /// base URL does not parse.
    pub fn build(self) -> Result<Client> {
        let token = self
            .token
            .or_else(|| std::env::var(TOKEN_ENV_VAR).ok())
            .ok_or_else(|| SensifaiError::Configuration {
                message: "access token is required. Pass it to ClientBuilder::token() \
                          or set the SENSIFAI_TOKEN environment variable."
                    .into(),
            })?;

        let base_url = Url::parse(&self.base_url).map_err(|e| SensifaiError::Configuration {
            message: format!("invalid base URL {:?}: {e}", self.base_url),
        })?;

        let http = match self.http {
            Some(http) => http,
            None => reqwest::Client::builder()
                .build()
                .map_err(|e| SensifaiError::Configuration {
                    message: format!("cannot build HTTP client: {e}"),
                })?,
        };

        Ok(Client {
            token,
            base_url,
            http,
            decode_mode: self.decode_mode,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The Sensifai API client.
///
/// Holds no mutable state: clone it or share it across tasks freely.
///
/// # Example
///
/// ```no_run
/// use sensifai::Client;
///
/// # async fn example() -> sensifai::Result<()> {
/// let client = Client::new("your-sensifai-token")?;
///
/// let upload = client.upload_by_url(&["https://example.com/cat.jpg"]).await?;
/// for task_id in upload.task_ids() {
///     let result = client.wait_for_result(task_id, None).await?;
///     println!("{task_id}: {:?}", result.kind());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    token: String,
    base_url: Url,
    http: reqwest::Client,
    decode_mode: DecodeMode,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("decode_mode", &self.decode_mode)
            .finish()
    }
}

impl Client {
    /// Create a client for the public Sensifai endpoint.
    ///
    /// For customization, use [`ClientBuilder`] instead.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        ClientBuilder::new().token(token).build()
    }

    /// The endpoint every request is posted to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Upload local files for analysis.
    ///
    /// All files are read before anything is sent, so an unreadable path
    /// aborts the call without a partial submission. The files travel in one
    /// multipart request following the GraphQL multipart-upload convention.
    ///
    /// # Errors
    ///
    /// - [`SensifaiError::InvalidInput`] if `paths` is empty.
    /// - [`SensifaiError::Io`] if a file cannot be read.
    /// - [`SensifaiError::Service`] if the service does not answer 200.
    pub async fn upload_by_file<P: AsRef<Path>>(&self, paths: &[P]) -> Result<UploadResult> {
        if paths.is_empty() {
            return Err(SensifaiError::InvalidInput {
                message: "upload_by_file needs at least one path".into(),
            });
        }

        // Each handle is closed as soon as its read returns.
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|source| SensifaiError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned());
            files.push((file_name, bytes));
        }

        let operations = upload_by_file_operations(&self.token, files.len())
            .to_value()
            .to_string();
        let map = Value::Object(upload_by_file_map(files.len())).to_string();

        let mut form = Form::new().text("operations", operations).text("map", map);
        for (index, (file_name, bytes)) in files.into_iter().enumerate() {
            let part = Part::bytes(bytes)
                .file_name(file_name)
                .mime_str("application/octet-stream")
                .map_err(|e| SensifaiError::Configuration {
                    message: format!("invalid file part: {e}"),
                })?;
            form = form.part(index.to_string(), part);
        }

        tracing::debug!(
            operation = UPLOAD_BY_FILE_FIELD,
            files = paths.len(),
            "submitting files"
        );

        let request = self.http.post(self.base_url.clone()).multipart(form);
        let payload = self.execute(request, UPLOAD_BY_FILE_FIELD).await?;
        self.decode(payload, UPLOAD_BY_FILE_FIELD, upload_result_from_value)
    }

    /// Submit remote URLs for server-side download and analysis.
    ///
    /// URLs are passed through as given; the service reports the ones it
    /// cannot fetch in [`UploadResult::rejected`].
    pub async fn upload_by_url<S: AsRef<str>>(&self, urls: &[S]) -> Result<UploadResult> {
        if urls.is_empty() {
            return Err(SensifaiError::InvalidInput {
                message: "upload_by_url needs at least one URL".into(),
            });
        }

        let urls: Vec<String> = urls.iter().map(|u| u.as_ref().to_string()).collect();
        tracing::debug!(
            operation = UPLOAD_BY_URL_FIELD,
            urls = urls.len(),
            "submitting urls"
        );

        let body = upload_by_url_request(&self.token, &urls);
        let payload = self.post_json(&body, UPLOAD_BY_URL_FIELD).await?;
        self.decode(payload, UPLOAD_BY_URL_FIELD, upload_result_from_value)
    }

    /// Fetch the current state of an analysis task.
    ///
    /// Check [`AnalysisResult::is_done`] before reading the findings.
    pub async fn get_result(&self, task_id: &str) -> Result<AnalysisResult> {
        tracing::debug!(operation = API_RESULT_FIELD, task_id, "fetching result");

        let body = api_result_request(task_id);
        let payload = self.post_json(&body, API_RESULT_FIELD).await?;
        self.decode(payload, API_RESULT_FIELD, analysis_result_from_value)
    }

    /// Poll a task until it is done or the timeout is exceeded.
    ///
    /// # Errors
    ///
    /// - [`SensifaiError::Timeout`] if the task is still running at the deadline.
    /// - Any error from [`get_result`](Self::get_result); nothing is retried.
    ///
    /// In [`DecodeMode::Lenient`] an undecodable response ends the wait with
    /// the zero-valued result instead of being polled until the deadline.
    pub async fn wait_for_result(
        &self,
        task_id: &str,
        opts: Option<PollOptions>,
    ) -> Result<AnalysisResult> {
        let opts = opts.unwrap_or_default();
        let deadline = Instant::now() + opts.timeout;

        loop {
            let result = self.get_result(task_id).await?;

            if result.is_done() {
                return Ok(result);
            }

            // Only the lenient fallback has no raw payload.
            if result.raw().is_null() {
                tracing::warn!(task_id, "stopped polling on an undecodable result");
                return Ok(result);
            }

            if let Some(ref cb) = opts.on_progress {
                cb(&result);
            }

            if Instant::now() >= deadline {
                return Err(SensifaiError::Timeout(opts.timeout));
            }

            tokio::time::sleep(opts.poll_interval).await;
        }
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    async fn post_json(&self, body: &GraphQlRequest, field: &str) -> Result<Option<Value>> {
        let request = self
            .http
            .post(self.base_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .json(body);
        self.execute(request, field).await
    }

    /// Send a request and unwrap `data.<field>` from the response.
    ///
    /// Returns `Ok(None)` when the body does not decode and the client is in
    /// [`DecodeMode::Lenient`].
    async fn execute(&self, request: reqwest::RequestBuilder, field: &str) -> Result<Option<Value>> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        tracing::debug!(operation = field, status = status.as_u16(), "response received");

        let parsed: Option<Value> = serde_json::from_str(&text).ok();

        if status != StatusCode::OK {
            let message = error_message(parsed.as_ref(), field);
            tracing::warn!(
                operation = field,
                status = status.as_u16(),
                %message,
                "service rejected request"
            );
            return Err(SensifaiError::Service {
                status_code: status.as_u16(),
                message,
                body: parsed,
            });
        }

        match unwrap_envelope(&text, field) {
            Ok(payload) => Ok(Some(payload)),
            Err(err) => {
                if let Some(message) = parsed.as_ref().and_then(graphql_errors) {
                    return Err(SensifaiError::Service {
                        status_code: status.as_u16(),
                        message,
                        body: parsed,
                    });
                }
                self.lenient(err, field).map(|()| None)
            }
        }
    }

    fn decode<T: Default>(
        &self,
        payload: Option<Value>,
        field: &str,
        from_value: fn(Value) -> Result<T>,
    ) -> Result<T> {
        let Some(payload) = payload else {
            return Ok(T::default());
        };
        match from_value(payload) {
            Ok(value) => Ok(value),
            Err(err) => self.lenient(err, field).map(|()| T::default()),
        }
    }

    /// Swallow a decode error in lenient mode, propagate it otherwise.
    fn lenient(&self, err: SensifaiError, field: &str) -> Result<()> {
        match self.decode_mode {
            DecodeMode::Strict => Err(err),
            DecodeMode::Lenient => {
                tracing::warn!(operation = field, error = %err, "returning empty result");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_binds_default_endpoint() {
        let client = Client::new("tok").unwrap();
        assert_eq!(client.base_url().as_str(), DEFAULT_BASE_URL);
        assert_eq!(client.decode_mode, DecodeMode::Strict);
    }

    #[test]
    fn invalid_base_url_is_a_configuration_error() {
        let err = ClientBuilder::new()
            .token("tok")
            .base_url("not a url")
            .build()
            .unwrap_err();
        assert!(matches!(err, SensifaiError::Configuration { .. }));
    }

    #[test]
    fn debug_output_hides_token() {
        let client = Client::new("super-secret").unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
