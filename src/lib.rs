use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::sync::Arc;

pub mod batch;
pub mod bubble;
pub mod compose;
pub mod font;
pub mod image_data;
pub mod logging;
pub mod panel;
pub mod settings;
pub mod surface;
#[cfg(test)]
mod test_util;

pub use batch::{add_dialogue_batch, process_panel};
pub use compose::{AnchorPolicy, BubbleLayout, ComposeOptions, Compositor, DialogueLine, PanelMeta};
pub use font::FontBook;
pub use panel::{BatchReport, Panel, ProcessedPanel, SkipReason};

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub settings_path: Option<String>,
    pub workers: Option<usize>,
    pub output_mime: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SingleRequest {
    pub image_path: String,
    pub text: String,
    pub speaker: Option<String>,
    pub emotion: Option<String>,
    pub camera_angle: Option<String>,
    pub scene_type: Option<String>,
}

fn prepare(config: &Config) -> Result<(settings::Settings, Compositor)> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let mut settings = settings::load_settings(settings_path)?;
    if let Some(mime) = config.output_mime.as_deref() {
        settings.output_mime = mime.trim().to_ascii_lowercase();
    }
    if let Some(workers) = config.workers {
        settings.workers = Some(workers);
    }
    if image_data::image_format_from_mime(&settings.output_mime).is_none() {
        return Err(anyhow!(
            "unsupported output mime '{}' (expected image/png, image/jpeg, image/webp, ...)",
            settings.output_mime
        ));
    }
    let fonts = FontBook::load(&settings)?;
    let compositor = Compositor::new(Arc::new(fonts), ComposeOptions::from_settings(&settings));
    Ok((settings, compositor))
}

/// Adds dialogue to every panel in `input` (a JSON array or `{"panels": [...]}`)
/// and returns the batch report as pretty JSON.
pub fn run(config: Config, input: &str) -> Result<String> {
    if input.trim().is_empty() {
        return Err(anyhow!("panels input is empty"));
    }
    let panels = panel::parse_panels(input)?;
    let (settings, compositor) = prepare(&config)?;
    let report = add_dialogue_batch(&compositor, panels, settings.worker_count())?;
    serde_json::to_string_pretty(&report).with_context(|| "failed to serialize batch report")
}

/// Composites one bubble onto an image file and returns the encoded bytes.
pub fn render_single(config: Config, request: SingleRequest) -> Result<Vec<u8>> {
    let bytes = std::fs::read(&request.image_path)
        .with_context(|| format!("failed to read image: {}", request.image_path))?;
    let (_, compositor) = prepare(&config)?;
    compositor.add_dialogue_bytes(
        bytes,
        PanelMeta {
            scene_type: request.scene_type.as_deref(),
            camera_angle: request.camera_angle.as_deref(),
            emotion: request.emotion.as_deref(),
        },
        DialogueLine {
            speaker: request.speaker.as_deref(),
            text: &request.text,
        },
    )
}
