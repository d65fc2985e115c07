use anyhow::Result;
use clap::Parser;
use image_to_latex::ai::ConversionMode;
use image_to_latex::app::App;
use image_to_latex::image::UploadCandidate;
use image_to_latex::models::Config;
use image_to_latex::Error;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "image-to-latex")]
#[command(about = "Convert an image of mathematics into LaTeX")]
struct CliArgs {
    /// Image to convert (PNG, JPEG, GIF, or WebP).
    #[arg(value_name = "IMAGE")]
    image: PathBuf,

    /// Extra instructions appended to the conversion prompt.
    #[arg(short, long)]
    instructions: Option<String>,

    /// Declared MIME type, overriding the one derived from the extension.
    #[arg(long, value_name = "TYPE", value_parser = parse_mime_arg)]
    mime: Option<String>,

    /// Write the LaTeX to this file instead of stdout.
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Copy the LaTeX to the clipboard.
    #[arg(long)]
    copy: bool,
}

fn parse_mime_arg(input: &str) -> std::result::Result<String, String> {
    if input.contains('/') {
        Ok(input.trim().to_string())
    } else {
        Err(format!(
            "Invalid MIME type '{}'. Expected format: type/subtype",
            input
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "image_to_latex=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let app = match App::new(&config) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    match run(&app, &args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Conversion failed: {}", e);
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    }
}

async fn run(app: &App, args: &CliArgs) -> image_to_latex::Result<()> {
    let candidate = UploadCandidate::from_path(&args.image, args.mime.as_deref()).await?;
    app.upload(Some(candidate)).await?;

    if let Some(instructions) = &args.instructions {
        app.set_instructions(instructions.as_str());
    }

    if app.mode() == ConversionMode::Demo {
        info!("Set ANTHROPIC_API_KEY to convert with the live API");
    }

    let latex = tokio::select! {
        result = app.convert() => result?,
        _ = tokio::signal::ctrl_c() => {
            app.reset();
            return Err(Error::Cancelled);
        }
    };

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, format!("{}\n", latex)).await?;
            info!("Wrote LaTeX to {}", path.display());
        }
        None => println!("{}", latex),
    }

    if args.copy {
        if app.copy().await {
            info!("Copied LaTeX to clipboard");
        } else {
            info!("Clipboard unavailable, output not copied");
        }
    }

    Ok(())
}
