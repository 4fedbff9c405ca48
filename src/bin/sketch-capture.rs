// sketch-capture - drive the capture client from the terminal, using a still
// image file in place of a webcam

use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;
use sketch_to_image::capture::{CaptureClient, HttpTransport, StillFrameSource};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Send a captured frame and prompt to a sketch-to-image server", long_about = None)]
struct Args {
    /// Image file used as the camera frame
    #[arg(short, long)]
    frame: PathBuf,

    /// What the sketch depicts
    #[arg(short, long)]
    prompt: String,

    /// Base URL of the server
    #[arg(short, long, default_value = "http://localhost:3000")]
    server: String,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("sketch_to_image={},sketch_capture={}", log_level, log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let transport = HttpTransport::new(&args.server);
    tracing::info!(endpoint = transport.endpoint(), frame = %args.frame.display(), "submitting capture");

    let mut client = CaptureClient::new(StillFrameSource::new(&args.frame), transport);
    client.start_camera();
    client.capture_image();
    client.set_prompt(args.prompt);
    client.send_image().await;

    let view = client.view();
    if view.captured_image.is_none() {
        bail!("no frame captured from {}", args.frame.display());
    }
    match view.result_image {
        Some(url) => println!("{}", url),
        None => bail!("no image was generated"),
    }

    Ok(())
}
