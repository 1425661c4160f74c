use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use api_router::error::{indicates_expired_credentials, EXPIRED_KEY_HINT};
use clap::Parser;
use common::{
    error::AppError,
    types::{
        attachment::DreamAttachment,
        dream_analysis::DreamAnalysis,
        generation::{AspectRatio, ImageConfig, ImageSize, Resolution, VideoConfig},
    },
    utils::config::get_config,
};
use generation_pipeline::DreamStudio;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Analyze a dream and optionally render it as an image and a video.
#[derive(Debug, Parser)]
#[command(name = "dream", version)]
struct Args {
    /// Dream description
    #[arg(long, conflicts_with = "text_file")]
    text: Option<String>,

    /// Read the dream description from a file
    #[arg(long)]
    text_file: Option<PathBuf>,

    /// Image or PDF handed to the analysis as extra context (repeatable)
    #[arg(long = "attach")]
    attachments: Vec<PathBuf>,

    /// Write a still image of the dream to this path; without an extension
    /// one matching the returned image type is added
    #[arg(long)]
    image: Option<PathBuf>,

    /// Write a video of the dream to this path
    #[arg(long)]
    video: Option<PathBuf>,

    /// Video resolution: 720p or 1080p
    #[arg(long, default_value = "720p", value_parser = parse_service_value::<Resolution>)]
    resolution: Resolution,

    /// Aspect ratio for image and video: 16:9 or 9:16
    #[arg(long, default_value = "16:9", value_parser = parse_service_value::<AspectRatio>)]
    aspect_ratio: AspectRatio,

    /// Image size: 1K, 2K or 4K
    #[arg(long, default_value = "2K", value_parser = parse_service_value::<ImageSize>)]
    image_size: ImageSize,

    /// Give up on the video job after this many seconds
    #[arg(long)]
    max_wait_secs: Option<u64>,

    /// Print a machine-readable summary instead of prose
    #[arg(long)]
    json: bool,
}

/// Parses the service spelling ("720p", "16:9", "2K") through the serde names.
fn parse_service_value<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| format!("unsupported value '{raw}'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => Ok(()),
        Err(err) => {
            if indicates_expired_credentials(&format!("{err:#}")) {
                eprintln!("{EXPIRED_KEY_HINT}");
            }
            Err(err)
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = get_config().context("loading configuration")?;
    if let Some(secs) = args.max_wait_secs {
        config.video_max_wait_secs = Some(secs);
    }
    let max_attachment_bytes = config.attachment_max_bytes;
    let studio = DreamStudio::new(config)?;

    let dream_text = read_dream_text(&args).await?;
    let mut attachments = Vec::with_capacity(args.attachments.len());
    for path in &args.attachments {
        attachments.push(DreamAttachment::from_path(path, max_attachment_bytes).await?);
    }
    if dream_text.trim().is_empty() && attachments.is_empty() {
        bail!("Provide --text, --text-file or at least one --attach");
    }

    let analysis = studio.analyze(&dream_text, &attachments).await?;
    if !args.json {
        print_analysis(&analysis);
    }

    let mut image_path = None;
    if let Some(path) = &args.image {
        let image_config = ImageConfig {
            aspect_ratio: args.aspect_ratio,
            image_size: args.image_size,
        };
        let image = studio
            .generate_image(&analysis.visual_prompt, &image_config)
            .await?;
        let path = image_output_path(path, image.file_extension());
        write_artifact(&path, &image.bytes).await?;
        info!(path = %path.display(), mime_type = %image.mime_type, "Image written");
        if !args.json {
            println!("Image saved to {}", path.display());
        }
        image_path = Some(path.display().to_string());
    }

    let mut video_summary = None;
    if let Some(path) = &args.video {
        let video_config = VideoConfig {
            resolution: args.resolution,
            aspect_ratio: args.aspect_ratio,
            ..VideoConfig::default()
        };

        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling video job");
                on_interrupt.cancel();
            }
        });

        if !args.json {
            println!("Generating video, this can take a few minutes...");
        }
        let video = studio
            .generate_video_with_cancel(&analysis.visual_prompt, &video_config, &cancel)
            .await
            .map_err(describe_failure)?;
        write_artifact(path, &video.bytes).await?;
        if !args.json {
            println!("Video saved to {}", path.display());
        }
        video_summary = Some(json!({
            "path": path.display().to_string(),
            "resultRef": video.result_ref,
        }));
    }

    if args.json {
        let summary = json!({
            "analysis": analysis,
            "image": image_path,
            "video": video_summary,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}

async fn read_dream_text(args: &Args) -> Result<String> {
    if let Some(text) = &args.text {
        return Ok(text.clone());
    }
    match &args.text_file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display())),
        None => Ok(String::new()),
    }
}

fn image_output_path(requested: &Path, extension: &str) -> PathBuf {
    if requested.extension().is_some() {
        requested.to_path_buf()
    } else {
        requested.with_extension(extension)
    }
}

async fn write_artifact(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("writing {}", path.display()))
}

fn describe_failure(err: AppError) -> anyhow::Error {
    match err {
        AppError::Job(common::error::JobError::Cancelled) => anyhow!("Video generation cancelled"),
        other => anyhow::Error::new(other).context("Video generation failed"),
    }
}

fn print_analysis(analysis: &DreamAnalysis) {
    println!("{}\n", analysis.title);
    println!("{}\n", analysis.summary);
    println!("{}\n", analysis.interpretation);
    if !analysis.symbolism.is_empty() {
        println!("Symbols: {}", analysis.symbolism.join(", "));
    }
    println!("Visual prompt: {}", analysis.visual_prompt);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generation_options_in_service_spelling() {
        let args = Args::try_parse_from([
            "dream",
            "--text",
            "a staircase into the sea",
            "--attach",
            "sketch.png",
            "--attach",
            "notes.pdf",
            "--video",
            "out/dream.mp4",
            "--resolution",
            "1080p",
            "--aspect-ratio",
            "9:16",
            "--max-wait-secs",
            "600",
        ])
        .expect("valid arguments");

        assert_eq!(args.attachments.len(), 2);
        assert_eq!(args.resolution, Resolution::P1080);
        assert_eq!(args.aspect_ratio, AspectRatio::Portrait);
        assert_eq!(args.image_size, ImageSize::TwoK);
        assert_eq!(args.max_wait_secs, Some(600));
        assert!(!args.json);
    }

    #[test]
    fn rejects_unknown_resolution_and_conflicting_text_sources() {
        assert!(Args::try_parse_from(["dream", "--text", "x", "--resolution", "4k"]).is_err());
        assert!(
            Args::try_parse_from(["dream", "--text", "x", "--text-file", "dream.txt"]).is_err()
        );
    }

    #[test]
    fn image_path_gets_the_returned_extension_only_when_missing() {
        assert_eq!(
            image_output_path(Path::new("out/dream"), "jpg"),
            PathBuf::from("out/dream.jpg")
        );
        assert_eq!(
            image_output_path(Path::new("out/dream.png"), "jpg"),
            PathBuf::from("out/dream.png")
        );
    }

    #[test]
    fn cancellation_gets_a_plain_message() {
        let err = describe_failure(AppError::Job(common::error::JobError::Cancelled));
        assert_eq!(err.to_string(), "Video generation cancelled");

        let err = describe_failure(AppError::Job(common::error::JobError::Poll(
            "404 - Requested entity was not found.".into(),
        )));
        assert!(indicates_expired_credentials(&format!("{err:#}")));
    }
}
