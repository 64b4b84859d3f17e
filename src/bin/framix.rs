use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "framix", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one compositing invocation and write the result as a PNG.
    Process(ProcessArgs),
    /// List the supported shape identifiers.
    Shapes,
}

#[derive(Parser, Debug)]
struct ProcessArgs {
    /// Input request JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Generation backend endpoint (gemini route).
    #[arg(long, conflicts_with = "generated")]
    backend_url: Option<String>,

    /// Bearer token for the generation backend.
    #[arg(long)]
    token: Option<String>,

    /// Use a local image file or data URL as the generated image instead of
    /// calling a backend.
    #[arg(long)]
    generated: Option<String>,

    /// Network timeout in seconds for generation and asset fetches.
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    /// Font file registered as the last-resort family for text effects.
    #[arg(long)]
    fallback_font: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Process(args) => cmd_process(args),
        Command::Shapes => {
            for id in framix::ShapeId::ALL {
                println!("{}", serde_json::to_string(&id)?.trim_matches('"'));
            }
            Ok(())
        }
    }
}

fn read_request(path: &Path) -> anyhow::Result<framix::ProcessRequest> {
    let f = File::open(path).with_context(|| format!("open request '{}'", path.display()))?;
    let r = BufReader::new(f);
    let req: framix::ProcessRequest =
        serde_json::from_reader(r).with_context(|| "parse request JSON")?;
    Ok(req)
}

fn cmd_process(args: ProcessArgs) -> anyhow::Result<()> {
    let req = read_request(&args.in_path)?;
    let timeout = Duration::from_secs(args.timeout_secs);

    let generation: Box<dyn framix::GenerationService> = match (&args.generated, &args.backend_url)
    {
        (Some(location), _) => Box::new(framix::StaticGeneration {
            image: location.clone(),
        }),
        (None, Some(url)) => Box::new(framix::HttpGenerationService::new(
            url.clone(),
            args.token.clone(),
            timeout,
        )?),
        (None, None) => anyhow::bail!("pass either --backend-url or --generated"),
    };

    let fetcher = framix::HttpFetcher::new(timeout)?;
    let segmenter = framix::AlphaSegmenter;

    let mut processor = framix::Processor::new(generation.as_ref(), &fetcher, &segmenter);
    if let Some(font_path) = &args.fallback_font {
        let bytes = std::fs::read(font_path)
            .with_context(|| format!("read font '{}'", font_path.display()))?;
        processor = processor.with_fallback_font(bytes);
    }

    let png = processor.process(&req)?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, &png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
