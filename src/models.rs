use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::{Result, SensifaiError};

/// One accepted submission and the task id to poll it with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct UploadedFile {
    /// File base name or URL as reported by the service.
    #[serde(rename = "file", default, deserialize_with = "null_as_default")]
    pub source_file: String,

    #[serde(rename = "taskId", default, deserialize_with = "null_as_default")]
    pub task_id: String,
}

/// Returned by `upload_by_file` / `upload_by_url`.
///
/// A successful call does not mean every input was accepted: check
/// [`rejected`](Self::rejected) or [`is_fully_accepted`](Self::is_fully_accepted).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct UploadResult {
    #[serde(rename = "error", default, deserialize_with = "null_as_default")]
    pub error_message: String,

    #[serde(rename = "result", default, deserialize_with = "null_as_default")]
    pub success: bool,

    /// In submission order.
    #[serde(rename = "succeed", default, deserialize_with = "null_as_default")]
    pub succeeded: Vec<UploadedFile>,

    /// Inputs the service refused.
    #[serde(rename = "cannotUpload", default, deserialize_with = "null_as_default")]
    pub rejected: Vec<String>,
}

impl UploadResult {
    /// `success` with nothing rejected.
    pub fn is_fully_accepted(&self) -> bool {
        self.success && self.rejected.is_empty()
    }

    pub fn task_ids(&self) -> impl Iterator<Item = &str> {
        self.succeeded.iter().map(|u| u.task_id.as_str())
    }

    /// Task id assigned to `source`, matched by full name or base name.
    pub fn task_id_for(&self, source: &str) -> Option<&str> {
        self.succeeded
            .iter()
            .find(|u| same_source(&u.source_file, source))
            .map(|u| u.task_id.as_str())
    }

    /// `true` if every input pairs off with exactly one entry of `succeeded`
    /// or `rejected`, with no entry left over.
    ///
    /// Each reported entry is used once, so two inputs sharing a base name
    /// (`x/a.jpg`, `y/a.jpg`) need two reported `a.jpg` entries. Exact matches
    /// are paired before base-name matches.
    pub fn accounts_for<S: AsRef<str>>(&self, inputs: &[S]) -> bool {
        let mut reported: Vec<Option<&str>> = self
            .succeeded
            .iter()
            .map(|u| Some(u.source_file.as_str()))
            .chain(self.rejected.iter().map(|r| Some(r.as_str())))
            .collect();

        if reported.len() != inputs.len() {
            return false;
        }

        let mut pending: Vec<&str> = Vec::with_capacity(inputs.len());
        for input in inputs {
            let input = input.as_ref();
            if !take_entry(&mut reported, |r| r == input) {
                pending.push(input);
            }
        }

        pending
            .into_iter()
            .all(|input| take_entry(&mut reported, |r| r == base_name(input)))
    }
}

/// Consume the first unused entry matching `pred`.
fn take_entry(entries: &mut [Option<&str>], pred: impl Fn(&str) -> bool) -> bool {
    match entries.iter_mut().find(|e| matches!(e, Some(r) if pred(r))) {
        Some(entry) => {
            *entry = None;
            true
        }
        None => false,
    }
}

/// The service reports uploads by base name, URLs usually verbatim.
fn same_source(reported: &str, input: &str) -> bool {
    reported == input || reported == base_name(input)
}

fn base_name(s: &str) -> &str {
    s.trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(s)
}

/// Which payload the service attached to a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Image,
    Video,
}

/// Returned by `get_result`. The variant follows the media type of the
/// original submission.
#[derive(Debug, Clone)]
pub enum AnalysisResult {
    Image(ImageAnalysis),
    Video(VideoAnalysis),
}

impl AnalysisResult {
    pub fn kind(&self) -> ResultKind {
        match self {
            AnalysisResult::Image(_) => ResultKind::Image,
            AnalysisResult::Video(_) => ResultKind::Video,
        }
    }

    /// While `false`, the findings are incomplete; poll again later.
    pub fn is_done(&self) -> bool {
        match self {
            AnalysisResult::Image(r) => r.is_done,
            AnalysisResult::Video(r) => r.is_done,
        }
    }

    pub fn error_message(&self) -> &str {
        match self {
            AnalysisResult::Image(r) => &r.error_message,
            AnalysisResult::Video(r) => &r.error_message,
        }
    }

    /// Full `apiResult` JSON.
    pub fn raw(&self) -> &Value {
        match self {
            AnalysisResult::Image(r) => &r.raw,
            AnalysisResult::Video(r) => &r.raw,
        }
    }

    pub fn as_image(&self) -> Option<&ImageAnalysis> {
        match self {
            AnalysisResult::Image(r) => Some(r),
            AnalysisResult::Video(_) => None,
        }
    }

    pub fn as_video(&self) -> Option<&VideoAnalysis> {
        match self {
            AnalysisResult::Video(r) => Some(r),
            AnalysisResult::Image(_) => None,
        }
    }
}

/// The zero value handed back by [`DecodeMode::Lenient`] when a response does
/// not decode. It is an `Image` with `raw == Value::Null`; that variant was not
/// chosen by the service, so check [`raw`](AnalysisResult::raw) before trusting
/// [`kind`](AnalysisResult::kind).
impl Default for AnalysisResult {
    fn default() -> Self {
        AnalysisResult::Image(ImageAnalysis::default())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImageAnalysis {
    pub error_message: String,
    pub is_done: bool,
    pub findings: ImageFindings,
    pub raw: Value,
}

#[derive(Debug, Clone, Default)]
pub struct VideoAnalysis {
    pub error_message: String,
    pub is_done: bool,
    pub frames_per_second: f64,
    pub duration_seconds: f64,
    pub frame_count: u64,
    pub segments: Vec<VideoSegment>,
    pub raw: Value,
}

/// Detections for a single image. Every group may be empty.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ImageFindings {
    #[serde(rename = "nsfwResult", default, deserialize_with = "one_or_many")]
    pub nsfw: Vec<NsfwDetection>,

    #[serde(rename = "logoResult", default, deserialize_with = "one_or_many")]
    pub logos: Vec<Description>,

    #[serde(rename = "landmarkResult", default, deserialize_with = "one_or_many")]
    pub landmarks: Vec<Description>,

    #[serde(rename = "taggingResult", default, deserialize_with = "one_or_many")]
    pub tags: Vec<Label>,

    #[serde(rename = "faceResult", default, deserialize_with = "one_or_many")]
    pub faces: Vec<FaceDetection>,
}

/// A time/frame range of a video and what was detected inside it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSegment {
    #[serde(default, deserialize_with = "null_as_default")]
    pub start_second: f64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub end_second: f64,

    #[serde(default, deserialize_with = "frame_number")]
    pub start_frame: u64,

    #[serde(default, deserialize_with = "frame_number")]
    pub end_frame: u64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub thumbnail_path: String,

    #[serde(rename = "taggingResult", default, deserialize_with = "one_or_many")]
    pub tags: Vec<Label>,

    #[serde(rename = "actionResult", default, deserialize_with = "one_or_many")]
    pub actions: Vec<Label>,

    #[serde(rename = "celebrityResult", default, deserialize_with = "one_or_many")]
    pub celebrities: Vec<Celebrity>,

    #[serde(rename = "sportResult", default, deserialize_with = "one_or_many")]
    pub sports: Vec<Label>,

    #[serde(rename = "nsfwResult", default, deserialize_with = "one_or_many")]
    pub nsfw: Vec<NsfwDetection>,
}

/// Tag, action or sport label.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Label {
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub probability: f64,
}

/// Logo or landmark.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Description {
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct NsfwDetection {
    /// e.g. "Safe", "Adult".
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub probability: f64,

    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceDetection {
    /// Bounding boxes as fractions of the image size.
    #[serde(default)]
    pub detected_boxes_percentage: Value,

    #[serde(default, deserialize_with = "null_as_default")]
    pub probability: f64,

    #[serde(default)]
    pub detected_face: Value,

    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Celebrity {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub frequency: f64,
}

/// How to treat a 200 response whose body does not decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodeMode {
    /// Fail with [`SensifaiError::Decode`].
    #[default]
    Strict,
    /// Return a zero-valued result and log a warning.
    Lenient,
}

/// Polling config for `wait_for_result`.
pub struct PollOptions {
    /// Default: 5s.
    pub poll_interval: std::time::Duration,
    /// Default: 1h.
    pub timeout: std::time::Duration,
    /// Called with every result that is not done yet.
    #[allow(clippy::type_complexity)]
    pub on_progress: Option<Box<dyn Fn(&AnalysisResult) + Send + Sync>>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            poll_interval: std::time::Duration::from_secs(5),
            timeout: std::time::Duration::from_secs(60 * 60),
            on_progress: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Internal deserialization helpers (not part of the public API surface)
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResultWire {
    #[serde(default, deserialize_with = "null_as_default")]
    errors: String,
    #[serde(default, deserialize_with = "null_as_default")]
    is_done: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    image_results: ImageFindings,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoResultWire {
    #[serde(default, deserialize_with = "null_as_default")]
    errors: String,
    #[serde(default, deserialize_with = "null_as_default")]
    is_done: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    fps: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    duration: f64,
    #[serde(default, deserialize_with = "frame_number")]
    frames_count: u64,
    #[serde(default, deserialize_with = "one_or_many")]
    video_results: Vec<VideoSegment>,
}

/// Decode an `apiResult` payload. The variant is picked by which of
/// `imageResults` / `videoResults` is present, even when its value is null.
pub(crate) fn analysis_result_from_value(val: Value) -> Result<AnalysisResult> {
    let obj = val
        .as_object()
        .ok_or_else(|| SensifaiError::decode(format!("`apiResult` is not an object: {val}")))?;

    match (obj.contains_key("imageResults"), obj.contains_key("videoResults")) {
        (true, false) => {
            let wire: ImageResultWire = serde_json::from_value(val.clone())
                .map_err(|e| SensifaiError::decode(format!("invalid image result: {e}")))?;
            Ok(AnalysisResult::Image(ImageAnalysis {
                error_message: wire.errors,
                is_done: wire.is_done,
                findings: wire.image_results,
                raw: val,
            }))
        }
        (false, true) => {
            let wire: VideoResultWire = serde_json::from_value(val.clone())
                .map_err(|e| SensifaiError::decode(format!("invalid video result: {e}")))?;
            Ok(AnalysisResult::Video(VideoAnalysis {
                error_message: wire.errors,
                is_done: wire.is_done,
                frames_per_second: wire.fps,
                duration_seconds: wire.duration,
                frame_count: wire.frames_count,
                segments: wire.video_results,
                raw: val,
            }))
        }
        (true, true) => Err(SensifaiError::decode(
            "`apiResult` carries both imageResults and videoResults",
        )),
        (false, false) => Err(SensifaiError::decode(
            "`apiResult` carries neither imageResults nor videoResults",
        )),
    }
}

pub(crate) fn upload_result_from_value(val: Value) -> Result<UploadResult> {
    serde_json::from_value(val).map_err(|e| SensifaiError::decode(format!("invalid upload result: {e}")))
}

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept a single object, a list of objects, or `null`.
fn one_or_many<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<Value>::deserialize(deserializer)? {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(de::Error::custom))
            .collect(),
        Some(item) => serde_json::from_value(item)
            .map(|item| vec![item])
            .map_err(de::Error::custom),
    }
}

/// Frame counts and indices. Some encoders send them as floats (`120.0`).
fn frame_number<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(n) = Option::<serde_json::Number>::deserialize(deserializer)? else {
        return Ok(0);
    };
    n.as_u64()
        .or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        })
        .ok_or_else(|| de::Error::custom(format!("invalid frame number {n}")))
}
