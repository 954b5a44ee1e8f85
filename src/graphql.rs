//! GraphQL documents, request payloads and the `data.<field>` envelope.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::errors::{Result, SensifaiError};

pub(crate) const UPLOAD_BY_FILE_FIELD: &str = "uploadByFile";
pub(crate) const UPLOAD_BY_URL_FIELD: &str = "uploadByUrl";
pub(crate) const API_RESULT_FIELD: &str = "apiResult";

const UPLOAD_BY_FILE_MUTATION: &str = "mutation( $token: String!, $files: [Upload!]! ){uploadByFile(token: $token, files: $files){result error succeed{file taskId} cannotUpload}}";

const UPLOAD_BY_URL_MUTATION: &str = "mutation( $token: String!, $urls: [String!]! ){uploadByUrl(token: $token, urls: $urls){result error succeed{file taskId} cannotUpload}}";

const API_RESULT_QUERY: &str = "query( $taskId: String! ){apiResult( taskId: $taskId ){ ...on ImageResult{isDone errors imageResults{nsfwResult{type probability value}logoResult{description}landmarkResult{description}taggingResult{label probability}faceResult{detectedBoxesPercentage probability detectedFace label}}} ... on VideoResult{fps duration isDone framesCount errors videoResults{startSecond endSecond startFrame endFrame thumbnailPath taggingResult{label probability}actionResult{label probability}celebrityResult{name frequency} sportResult{label probability}nsfwResult{probability type value}}}}}";

/// A `{ query, variables }` GraphQL request body.
#[derive(Debug, Serialize)]
pub(crate) struct GraphQlRequest {
    pub query: &'static str,
    pub variables: Value,
}

impl GraphQlRequest {
    /// The body as a JSON value, for multipart fields that need it as text.
    pub(crate) fn to_value(&self) -> Value {
        json!({
            "query": self.query,
            "variables": self.variables,
        })
    }
}

/// The `operations` part of an upload-by-file request. Every file slot is a
/// `null` placeholder the server fills from the matching multipart part.
pub(crate) fn upload_by_file_operations(token: &str, file_count: usize) -> GraphQlRequest {
    GraphQlRequest {
        query: UPLOAD_BY_FILE_MUTATION,
        variables: json!({
            "token": token,
            "files": vec![Value::Null; file_count],
        }),
    }
}

/// The `map` part of an upload-by-file request: `{"<i>": ["variables.files.<i>"]}`.
pub(crate) fn upload_by_file_map(file_count: usize) -> Map<String, Value> {
    (0..file_count)
        .map(|i| (i.to_string(), json!([format!("variables.files.{i}")])))
        .collect()
}

pub(crate) fn upload_by_url_request(token: &str, urls: &[String]) -> GraphQlRequest {
    GraphQlRequest {
        query: UPLOAD_BY_URL_MUTATION,
        variables: json!({
            "token": token,
            "urls": urls,
        }),
    }
}

pub(crate) fn api_result_request(task_id: &str) -> GraphQlRequest {
    GraphQlRequest {
        query: API_RESULT_QUERY,
        variables: json!({ "taskId": task_id }),
    }
}

/// Parse a response body and return the value at `data.<field>`.
///
/// Each stage reports its own [`SensifaiError::Decode`] so a caller can tell a
/// malformed body apart from a well-formed body that lacks the operation.
pub(crate) fn unwrap_envelope(body: &str, field: &str) -> Result<Value> {
    let outer: Value = serde_json::from_str(body)
        .map_err(|e| SensifaiError::decode(format!("response is not valid JSON: {e}")))?;

    let data = match outer.get("data") {
        Some(Value::Object(data)) => data,
        Some(Value::Null) | None => {
            return Err(SensifaiError::decode("response has no `data` object"));
        }
        Some(other) => {
            return Err(SensifaiError::decode(format!(
                "`data` is not an object: {other}"
            )));
        }
    };

    match data.get(field) {
        Some(Value::Null) | None => Err(SensifaiError::decode(format!(
            "response has no `data.{field}`"
        ))),
        Some(value) => Ok(value.clone()),
    }
}

/// Best-effort error message from a response body.
///
/// Looks at `data.<field>.error` (uploads) or `data.<field>.errors` (results)
/// first, then at the top-level GraphQL `errors` array.
pub(crate) fn error_message(body: Option<&Value>, field: &str) -> String {
    let Some(body) = body else {
        return String::new();
    };

    let payload = body.get("data").and_then(|d| d.get(field));
    let from_payload = payload
        .and_then(|p| p.get("error").or_else(|| p.get("errors")))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty());

    if let Some(message) = from_payload {
        return message.to_string();
    }

    graphql_errors(body).unwrap_or_default()
}

/// Join the `message` of every entry of a top-level GraphQL `errors` array.
pub(crate) fn graphql_errors(body: &Value) -> Option<String> {
    let errors = body.get("errors")?.as_array()?;
    let messages: Vec<&str> = errors
        .iter()
        .filter_map(|e| e.get("message").and_then(Value::as_str))
        .collect();

    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}
