use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "truyenff-bubbles",
    version,
    about = "Composite speech bubbles onto generated comic panels"
)]
struct Cli {
    /// Panels JSON file (array or {"panels": [...]}); reads stdin when omitted
    #[arg(short = 'd', long = "data")]
    data: Option<String>,

    /// Output file (batch report JSON, or the image in --image mode)
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Render a single image file instead of a panel batch
    #[arg(long = "image", requires_all = ["text", "output"])]
    image: Option<String>,

    /// Dialogue text for --image mode
    #[arg(short = 't', long = "text")]
    text: Option<String>,

    /// Speaker name shown above the bubble (--image mode)
    #[arg(short = 's', long = "speaker")]
    speaker: Option<String>,

    /// Emotion: angry, sad, thinking, surprised (anything else is neutral)
    #[arg(short = 'e', long = "emotion")]
    emotion: Option<String>,

    /// Camera angle: close_up, medium_shot, wide_shot
    #[arg(short = 'c', long = "camera-angle")]
    camera_angle: Option<String>,

    /// Output image mime (default from settings, image/png)
    #[arg(short = 'M', long = "output-mime")]
    output_mime: Option<String>,

    /// Worker threads for batch mode (default: number of CPUs)
    #[arg(short = 'w', long = "workers")]
    workers: Option<usize>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    truyenff_bubbles::logging::init(cli.verbose)?;

    let output_mime = cli.output_mime.clone().or_else(|| {
        cli.image.as_ref().and(cli.output.as_deref()).and_then(|path| {
            truyenff_bubbles::image_data::mime_from_path(Path::new(path)).map(str::to_string)
        })
    });
    let config = truyenff_bubbles::Config {
        settings_path: cli.read_settings.clone(),
        workers: cli.workers,
        output_mime,
    };

    if let Some(image_path) = cli.image {
        let output = cli
            .output
            .ok_or_else(|| anyhow!("--image requires --output"))?;
        let text = cli.text.ok_or_else(|| anyhow!("--image requires --text"))?;
        let bytes = truyenff_bubbles::render_single(
            config,
            truyenff_bubbles::SingleRequest {
                image_path,
                text,
                speaker: cli.speaker,
                emotion: cli.emotion,
                camera_angle: cli.camera_angle,
                scene_type: None,
            },
        )?;
        std::fs::write(&output, bytes)
            .with_context(|| format!("failed to write image: {}", output))?;
        eprintln!("wrote {}", output);
        return Ok(());
    }

    let input = match cli.data.as_deref() {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read panels: {}", path))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .with_context(|| "failed to read panels from stdin")?;
            buffer
        }
    };

    let report = truyenff_bubbles::run(config, &input)?;
    match cli.output {
        Some(path) => std::fs::write(&path, report)
            .with_context(|| format!("failed to write report: {}", path))?,
        None => println!("{}", report),
    }
    Ok(())
}
