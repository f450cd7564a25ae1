use anyhow::{Result, anyhow};

use crate::bubble::{FontSpec, TextMeasure};
use crate::surface::{Outline, Paint, RasterSurface, TextRun};

pub(crate) fn with_temp_home<F, R>(func: F) -> R
where
    F: FnOnce(&std::path::Path) -> R,
{
    static HOME_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
    let _guard = HOME_MUTEX.lock().unwrap_or_else(|poison| poison.into_inner());
    let dir = tempfile::tempdir().expect("tempdir");
    let old_home = std::env::var("HOME").ok();
    // SAFETY: HOME_MUTEX serializes every test that touches HOME.
    unsafe { std::env::set_var("HOME", dir.path()) };
    let result = func(dir.path());
    match old_home {
        Some(old) => unsafe { std::env::set_var("HOME", old) },
        None => unsafe { std::env::remove_var("HOME") },
    }
    result
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Save,
    Restore,
    Outline(Outline, Paint),
    Text {
        text: String,
        x: f32,
        y: f32,
        font: FontSpec,
    },
}

/// Surface double that records every primitive and measures 0.6em per char
/// (9.6px at 16px).
pub(crate) struct RecordingSurface {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) calls: Vec<Call>,
    pub(crate) fail_text: bool,
    depth: usize,
}

impl RecordingSurface {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            calls: Vec::new(),
            fail_text: false,
            depth: 0,
        }
    }

    pub(crate) fn outlines(&self) -> Vec<&Outline> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Outline(outline, _) => Some(outline),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn count_circles(&self) -> usize {
        self.outlines()
            .iter()
            .filter(|outline| matches!(outline, Outline::Circle { .. }))
            .count()
    }

    pub(crate) fn count_polygons(&self) -> usize {
        self.outlines()
            .iter()
            .filter(|outline| matches!(outline, Outline::Polygon(_)))
            .count()
    }

    pub(crate) fn count_rounded_rects(&self) -> usize {
        self.outlines()
            .iter()
            .filter(|outline| matches!(outline, Outline::RoundedRect { .. }))
            .count()
    }

    pub(crate) fn count_tails(&self) -> usize {
        self.outlines()
            .iter()
            .filter(|outline| matches!(outline, Outline::Polyline(_)))
            .count()
    }

    pub(crate) fn texts(&self) -> Vec<(&str, f32, f32, FontSpec)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Text { text, x, y, font } => Some((text.as_str(), *x, *y, *font)),
                _ => None,
            })
            .collect()
    }
}

impl TextMeasure for RecordingSurface {
    fn measure_text(&self, text: &str, font: &FontSpec) -> f32 {
        text.chars().count() as f32 * font.size * 0.6
    }
}

impl RasterSurface for RecordingSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn save(&mut self) {
        self.depth += 1;
        self.calls.push(Call::Save);
    }

    fn restore(&mut self) -> Result<()> {
        if self.depth == 0 {
            return Err(anyhow!("restore without save"));
        }
        self.depth -= 1;
        self.calls.push(Call::Restore);
        Ok(())
    }

    fn draw_outline(&mut self, outline: &Outline, paint: &Paint) -> Result<()> {
        self.calls.push(Call::Outline(outline.clone(), paint.clone()));
        Ok(())
    }

    fn draw_text(&mut self, run: &TextRun<'_>) -> Result<()> {
        if self.fail_text {
            return Err(anyhow!("font not available"));
        }
        self.calls.push(Call::Text {
            text: run.text.to_string(),
            x: run.x,
            y: run.y,
            font: run.font,
        });
        Ok(())
    }
}
