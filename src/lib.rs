//! # Sensifai SDK for Rust
//!
//! Async client for the [Sensifai](https://sensifai.com) media analysis API.
//! Submit local files or remote URLs for image and video analysis (tagging,
//! face, logo, landmark and NSFW detection, action, sport and celebrity
//! recognition), then poll for the result by task id.
//!
//! ## Quick start
//!
//! ```no_run
//! use sensifai::{AnalysisResult, Client};
//!
//! #[tokio::main]
//! async fn main() -> sensifai::Result<()> {
//!     let client = Client::new("your-sensifai-token")?;
//!
//!     let upload = client.upload_by_file(&["holiday.jpg", "clip.mp4"]).await?;
//!     for rejected in &upload.rejected {
//!         eprintln!("not accepted: {rejected}");
//!     }
//!
//!     for task_id in upload.task_ids() {
//!         match client.wait_for_result(task_id, None).await? {
//!             AnalysisResult::Image(image) => {
//!                 for tag in &image.findings.tags {
//!                     println!("  {} ({:.2})", tag.label, tag.probability);
//!                 }
//!             }
//!             AnalysisResult::Video(video) => {
//!                 for seg in &video.segments {
//!                     println!("  [{:.1}-{:.1}s] {} tags", seg.start_second, seg.end_second, seg.tags.len());
//!                 }
//!             }
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Builder pattern
//!
//! ```no_run
//! use sensifai::{ClientBuilder, DecodeMode};
//!
//! # fn example() -> sensifai::Result<()> {
//! let client = ClientBuilder::new()
//!     .token("your-sensifai-token")
//!     .base_url("https://proxy.example.com/api/")
//!     .decode_mode(DecodeMode::Lenient)
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! The library logs through [`tracing`]; install a subscriber in your
//! application to see request and response events.

mod client;
mod errors;
mod graphql;
mod models;

pub use client::{Client, ClientBuilder};
pub use errors::{Result, SensifaiError};
pub use models::{
    AnalysisResult, Celebrity, DecodeMode, Description, FaceDetection, ImageAnalysis,
    ImageFindings, Label, NsfwDetection, PollOptions, ResultKind, UploadResult, UploadedFile,
    VideoAnalysis, VideoSegment,
};
