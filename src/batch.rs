use anyhow::{Context, Result, anyhow};
use rayon::prelude::*;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::compose::{Compositor, DialogueLine, PanelMeta};
use crate::panel::{BatchReport, Panel, ProcessedPanel, SkipReason};

/// Adds dialogue to one panel. Failures become an `error` annotation and
/// never escape, so sibling panels are unaffected.
pub fn process_panel(compositor: &Compositor, mut panel: Panel, index: usize) -> ProcessedPanel {
    panel.clear_outcome();
    let label = panel.label(index);
    if panel.image_data().is_none() {
        tracing::info!("panel {}: skipped, no image", label);
        return ProcessedPanel::skipped(panel, SkipReason::NoImage);
    }
    if panel.dialogue_text().is_none() {
        tracing::info!("panel {}: skipped, no dialogue", label);
        return ProcessedPanel::skipped(panel, SkipReason::NoDialogue);
    }

    match composite_panel(compositor, &panel) {
        Ok(data_url) => {
            let speaker = panel.dialogue.as_ref().and_then(|d| d.speaker.clone());
            let text = panel.dialogue_text().map(str::to_string);
            if let Some(generation) = panel.image_generation.as_mut() {
                generation.image_data = Some(data_url);
                generation.dialogue_added = Some(true);
                generation.dialogue_text = text;
                generation.dialogue_speaker = speaker;
            }
            tracing::info!("panel {}: dialogue added", label);
            ProcessedPanel::added(panel)
        }
        Err(err) => {
            tracing::warn!("panel {}: {:#}", label, err);
            ProcessedPanel::failed(panel, format!("{:#}", err))
        }
    }
}

fn composite_panel(compositor: &Compositor, panel: &Panel) -> Result<String> {
    let image_data = panel
        .image_data()
        .ok_or_else(|| anyhow!("panel has no image data"))?;
    let dialogue = panel
        .dialogue
        .as_ref()
        .ok_or_else(|| anyhow!("panel has no dialogue"))?;
    let meta = PanelMeta {
        scene_type: panel.scene_type.as_deref(),
        camera_angle: panel.camera_angle.as_deref(),
        emotion: dialogue.emotion.as_deref(),
    };
    let line = DialogueLine {
        speaker: dialogue.speaker.as_deref(),
        text: dialogue.text.as_deref().unwrap_or_default(),
    };
    compositor.add_dialogue(image_data, meta, line)
}

/// Processes every panel, preserving input order in the report. `workers`
/// bounds the pool; 1 runs sequentially on the calling thread.
pub fn add_dialogue_batch(
    compositor: &Compositor,
    panels: Vec<Panel>,
    workers: usize,
) -> Result<BatchReport> {
    if panels.is_empty() {
        return Err(anyhow!("no panels provided"));
    }
    let total = panels.len();
    tracing::info!("adding dialogue to {} panel(s) with {} worker(s)", total, workers);

    let processed: Vec<ProcessedPanel> = if workers <= 1 {
        panels
            .into_iter()
            .enumerate()
            .map(|(index, panel)| process_panel(compositor, panel, index))
            .collect()
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|idx| format!("bubble-{}", idx))
            .build()
            .with_context(|| "failed to build worker pool")?;
        pool.install(|| {
            panels
                .into_par_iter()
                .enumerate()
                .map(|(index, panel)| process_panel(compositor, panel, index))
                .collect::<Vec<_>>()
        })
    };

    let added = processed.iter().filter(|panel| panel.dialogue_added).count();
    let success_rate = ((added as f64 / total as f64) * 100.0).round() as u32;
    tracing::info!("dialogue added to {}/{} panel(s)", added, total);
    Ok(BatchReport {
        success: true,
        panels: processed,
        total_panels: total,
        dialogue_added_count: added,
        success_rate,
        timestamp: timestamp_now()?,
    })
}

fn timestamp_now() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .with_context(|| "failed to format timestamp")
}
