use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "kenburns", version, about = "Turn a still image into a pan/zoom video")]
struct Cli {
    /// JSON config file. Defaults apply to missing fields; KENBURNS_* env vars override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output width in pixels (overrides config).
    #[arg(long, global = true)]
    width: Option<u32>,

    /// Output height in pixels (overrides config).
    #[arg(long, global = true)]
    height: Option<u32>,

    /// ffmpeg executable (overrides config).
    #[arg(long, global = true)]
    ffmpeg: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Render an MP4 file (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Stream a fragmented MP4 to stdout (requires `ffmpeg` on PATH).
    Stream(StreamArgs),
    /// Run the render as a background job, report progress, then copy the output.
    Job(JobArgs),
}

#[derive(Args, Debug)]
struct RequestArgs {
    /// Source image.
    #[arg(long)]
    image: PathBuf,

    /// Animation: pan-left-to-right, pan-right-to-left, pan-top-to-bottom, pan-bottom-to-top,
    /// zoom-in, zoom-out or static (short aliases such as `lr` or `zoomIn` also work).
    #[arg(long, default_value = "zoom-in")]
    animation: String,

    /// Duration in seconds.
    #[arg(long, conflicts_with = "speed")]
    duration: Option<f64>,

    /// Playback speed; duration becomes max(2, 6 / speed) seconds.
    #[arg(long)]
    speed: Option<f64>,

    /// Frames per second (defaults to the configured frame rate).
    #[arg(long)]
    fps: Option<u32>,
}

#[derive(Args, Debug)]
struct FrameArgs {
    #[command(flatten)]
    request: RequestArgs,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    request: RequestArgs,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct StreamArgs {
    #[command(flatten)]
    request: RequestArgs,
}

#[derive(Args, Debug)]
struct JobArgs {
    #[command(flatten)]
    request: RequestArgs,

    /// Where to copy the finished video.
    #[arg(long)]
    out: PathBuf,

    /// Poll interval in milliseconds.
    #[arg(long, default_value_t = 250)]
    poll_ms: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    match cli.cmd {
        Command::Frame(args) => cmd_frame(&config, args),
        Command::Render(args) => cmd_render(&config, args),
        Command::Stream(args) => cmd_stream(&config, args),
        Command::Job(args) => cmd_job(&config, args),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<kenburns::ServiceConfig> {
    let mut config = match &cli.config {
        Some(path) => kenburns::ServiceConfig::from_json_path(path)?,
        None => kenburns::ServiceConfig::default(),
    };
    config
        .apply_env()
        .context("apply KENBURNS_* environment overrides")?;
    if let Some(width) = cli.width {
        config.canvas.width = width;
    }
    if let Some(height) = cli.height {
        config.canvas.height = height;
    }
    if let Some(program) = &cli.ffmpeg {
        config.ffmpeg.program = program.clone();
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn build_request(
    config: &kenburns::ServiceConfig,
    args: &RequestArgs,
) -> anyhow::Result<kenburns::RenderRequest> {
    let animation = kenburns::AnimationKind::parse(&args.animation)?;
    let request = match (args.duration, args.speed) {
        (Some(duration), _) => kenburns::RenderRequest::new(&args.image, animation, duration),
        (None, Some(speed)) => kenburns::RenderRequest::from_speed(&args.image, animation, speed)?,
        (None, None) => kenburns::RenderRequest::from_speed(&args.image, animation, 1.0)?,
    };
    let request = request.with_frame_rate(args.fps.unwrap_or(config.frame_rate));
    request.validate(&config.limits())?;
    Ok(request)
}

fn cmd_frame(config: &kenburns::ServiceConfig, args: FrameArgs) -> anyhow::Result<()> {
    let request = build_request(config, &args.request)?;
    let prepared = kenburns::PreparedRender::prepare(&request, config.canvas)?;
    let frame = prepared.render_frame(args.frame)?;

    kenburns::ensure_parent_dir(&args.out)?;
    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(config: &kenburns::ServiceConfig, args: RenderArgs) -> anyhow::Result<()> {
    use kenburns::EncoderFactory as _;

    let request = build_request(config, &args.request)?;
    let prepared = kenburns::PreparedRender::prepare(&request, config.canvas)?;

    let encoder = kenburns::FfmpegEncoder::new(config.ffmpeg.clone());
    let on_progress: kenburns::ProgressFn = Arc::new(|fraction| {
        tracing::debug!(percent = (fraction * 100.0).round(), "encoding");
    });
    let mut sink = encoder.file_sink(&args.out, on_progress)?;
    let stats = kenburns::render_to_sink(&prepared, sink.as_mut(), config.channel_capacity)?;

    eprintln!(
        "wrote {} ({} frames)",
        args.out.display(),
        stats.frames_encoded
    );
    Ok(())
}

fn cmd_stream(config: &kenburns::ServiceConfig, args: StreamArgs) -> anyhow::Result<()> {
    let request = build_request(config, &args.request)?;
    let encoder = Arc::new(kenburns::FfmpegEncoder::new(config.ffmpeg.clone()));
    let renderer = kenburns::StreamingRenderer::new(config, encoder)?;
    let stats = renderer.stream(request, std::io::stdout())?;
    tracing::info!(frames = stats.frames_encoded, "streamed");
    Ok(())
}

fn cmd_job(config: &kenburns::ServiceConfig, args: JobArgs) -> anyhow::Result<()> {
    let request = build_request(config, &args.request)?;
    let encoder = Arc::new(kenburns::FfmpegEncoder::new(config.ffmpeg.clone()));
    let service = kenburns::JobService::new(config, encoder)?;

    let id = service.submit(request)?;
    let mut last_progress = None;
    let snapshot = loop {
        let snapshot = service
            .poll(id)
            .with_context(|| format!("job {id} disappeared"))?;
        if last_progress != Some(snapshot.progress_percent) {
            eprintln!("{}", serde_json::to_string(&snapshot)?);
            last_progress = Some(snapshot.progress_percent);
        }
        if snapshot.status.is_terminal() {
            break snapshot;
        }
        std::thread::sleep(Duration::from_millis(args.poll_ms.max(1)));
    };

    if snapshot.status == kenburns::JobStatus::Failed {
        anyhow::bail!(
            "job {id} failed: {}",
            snapshot.error.as_deref().unwrap_or("unknown error")
        );
    }

    let mut output = service.fetch_output(id)?;
    kenburns::ensure_parent_dir(&args.out)?;
    let mut dst =
        File::create(&args.out).with_context(|| format!("create '{}'", args.out.display()))?;
    std::io::copy(&mut output.file, &mut dst)
        .with_context(|| format!("copy {} to '{}'", output.file_name, args.out.display()))?;
    service.remove(id);

    eprintln!("wrote {} ({} bytes)", args.out.display(), output.len);
    Ok(())
}
