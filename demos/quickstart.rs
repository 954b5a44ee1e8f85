//! Quick-start examples for the Sensifai Rust SDK.
//!
//! Run with:
//!   SENSIFAI_TOKEN=... cargo run --example quickstart -- photo.jpg clip.mp4
//!
//! Or pass the token directly in code (not recommended for production).

use sensifai::{AnalysisResult, ClientBuilder, PollOptions};
use std::time::Duration;

#[tokio::main]
async fn main() -> sensifai::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Create a client (reads SENSIFAI_TOKEN from environment)
    // -----------------------------------------------------------------------
    let client = ClientBuilder::new().build()?;

    // Or provide the token directly:
    // let client = sensifai::Client::new("your-sensifai-token")?;

    // -----------------------------------------------------------------------
    // 2. Upload local files given on the command line
    // -----------------------------------------------------------------------
    let paths: Vec<String> = std::env::args().skip(1).collect();
    if !paths.is_empty() {
        let upload = client.upload_by_file(paths.as_slice()).await?;

        println!("Accepted:");
        for file in &upload.succeeded {
            println!("  {} -> task {}", file.source_file, file.task_id);
        }
        if !upload.rejected.is_empty() {
            println!("Rejected: {}", upload.rejected.join(", "));
        }
        println!();
    }

    // -----------------------------------------------------------------------
    // 3. Submit a remote URL
    // -----------------------------------------------------------------------
    let upload = client
        .upload_by_url(&["https://example.com/sample.mp4"])
        .await?;

    if !upload.is_fully_accepted() {
        println!("Service said: {}", upload.error_message);
    }

    // -----------------------------------------------------------------------
    // 4. Poll each task with a progress callback
    // -----------------------------------------------------------------------
    for task_id in upload.task_ids() {
        let opts = PollOptions {
            poll_interval: Duration::from_secs(3),
            timeout: Duration::from_secs(600),
            on_progress: Some(Box::new(|result| {
                println!("  still running ({:?})", result.kind());
            })),
        };

        match client.wait_for_result(task_id, Some(opts)).await? {
            AnalysisResult::Image(image) => {
                println!("Image task {task_id}:");
                for tag in &image.findings.tags {
                    println!("  tag {} ({:.2})", tag.label, tag.probability);
                }
                for nsfw in &image.findings.nsfw {
                    println!("  nsfw {} ({:.2})", nsfw.kind, nsfw.probability);
                }
            }
            AnalysisResult::Video(video) => {
                println!(
                    "Video task {task_id}: {:.1}s, {} frames at {:.1} fps",
                    video.duration_seconds, video.frame_count, video.frames_per_second
                );
                for seg in &video.segments {
                    let labels: Vec<&str> = seg.tags.iter().map(|t| t.label.as_str()).collect();
                    println!(
                        "  [{:.1}s - {:.1}s] {}",
                        seg.start_second,
                        seg.end_second,
                        labels.join(", ")
                    );
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // 5. One-off status check without waiting
    // -----------------------------------------------------------------------
    if let Some(task_id) = upload.task_ids().next() {
        let result = client.get_result(task_id).await?;
        println!("Task {task_id} done: {}", result.is_done());
    }

    Ok(())
}
