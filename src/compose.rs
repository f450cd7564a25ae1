use anyhow::{Result, anyhow};
use serde::Deserialize;
use std::sync::Arc;

use crate::bubble::{
    Anchor, BubbleGeometry, BubbleStyle, FontSpec, Rgb, clamp_anchor, compute_anchor,
    render_bubble, resolve_style, vertical_overhang, wrap_text,
};
use crate::font::FontBook;
use crate::image_data::{self, PNG_MIME};
use crate::settings::Settings;
use crate::surface::{RasterSurface, SvgSurface, TextAlign, TextRun, with_saved_state};

const SPEAKER_COLOR: Rgb = Rgb(0x66, 0x66, 0x66);
const SPEAKER_GAP: f32 = 15.0;

/// How the anchor is clamped against the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorPolicy {
    /// Clamp with the fixed 100px placeholder box only.
    Placeholder,
    /// Clamp again with the wrapped bubble's real height, including the
    /// tail, spikes, thought trail and speaker label.
    FitRendered,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PanelMeta<'a> {
    pub scene_type: Option<&'a str>,
    pub camera_angle: Option<&'a str>,
    pub emotion: Option<&'a str>,
}

#[derive(Debug, Clone, Copy)]
pub struct DialogueLine<'a> {
    pub speaker: Option<&'a str>,
    pub text: &'a str,
}

#[derive(Debug, Clone)]
pub struct ComposeOptions {
    pub output_mime: String,
    pub anchor_policy: AnchorPolicy,
    pub show_speaker: bool,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            output_mime: PNG_MIME.to_string(),
            anchor_policy: AnchorPolicy::FitRendered,
            show_speaker: true,
        }
    }
}

impl ComposeOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            output_mime: settings.output_mime.clone(),
            anchor_policy: settings.anchor_policy,
            show_speaker: settings.show_speaker,
        }
    }
}

/// Everything computed for one bubble, returned for inspection.
#[derive(Debug, Clone)]
pub struct BubbleLayout {
    pub style: BubbleStyle,
    pub anchor: Anchor,
    pub lines: Vec<String>,
    pub geometry: BubbleGeometry,
}

pub struct Compositor {
    fonts: Arc<FontBook>,
    options: ComposeOptions,
}

impl Compositor {
    pub fn new(fonts: Arc<FontBook>, options: ComposeOptions) -> Self {
        Self { fonts, options }
    }

    /// Composites the bubble onto base64 image data and returns a data URL in
    /// the configured output format.
    pub fn add_dialogue(
        &self,
        image_data: &str,
        meta: PanelMeta<'_>,
        dialogue: DialogueLine<'_>,
    ) -> Result<String> {
        let base = image_data::decode_image_data(image_data)?;
        let bytes = self.composite(base, meta, dialogue)?;
        Ok(image_data::encode_data_url(&bytes, &self.options.output_mime))
    }

    pub fn add_dialogue_bytes(
        &self,
        image_bytes: Vec<u8>,
        meta: PanelMeta<'_>,
        dialogue: DialogueLine<'_>,
    ) -> Result<Vec<u8>> {
        let base = image_data::decode_image_bytes(image_bytes)?;
        self.composite(base, meta, dialogue)
    }

    fn composite(
        &self,
        base: image_data::DecodedImage,
        meta: PanelMeta<'_>,
        dialogue: DialogueLine<'_>,
    ) -> Result<Vec<u8>> {
        if dialogue.text.trim().is_empty() {
            return Err(anyhow!("dialogue text is empty"));
        }
        let base = image_data::ensure_embeddable(base)?;
        let mut surface = SvgSurface::new(base.width, base.height, Arc::clone(&self.fonts));
        surface.draw_base_image(&base);
        let layout = self.compose_on(&mut surface, meta, dialogue)?;
        tracing::debug!(
            width = base.width,
            height = base.height,
            shape = layout.style.shape.as_str(),
            lines = layout.lines.len(),
            x = layout.anchor.x,
            y = layout.anchor.y,
            "bubble placed"
        );
        surface.finish(&self.options.output_mime)
    }

    /// Resolves, places, wraps and draws one bubble on `surface`.
    pub fn compose_on<S>(
        &self,
        surface: &mut S,
        meta: PanelMeta<'_>,
        dialogue: DialogueLine<'_>,
    ) -> Result<BubbleLayout>
    where
        S: RasterSurface + ?Sized,
    {
        let width = surface.width();
        let height = surface.height();
        let style = resolve_style(meta.emotion.unwrap_or_default());
        let placed = compute_anchor(width, height, &style, meta.camera_angle);
        let lines = wrap_text(dialogue.text, style.wrap_width(), &style.font(), &*surface);
        let speaker = dialogue
            .speaker
            .map(str::trim)
            .filter(|speaker| self.options.show_speaker && !speaker.is_empty());
        let mut geometry = BubbleGeometry::for_lines(placed, lines.len(), &style);
        if self.options.anchor_policy == AnchorPolicy::FitRendered {
            let (mut above, below) = vertical_overhang(&style);
            if speaker.is_some() {
                above = above.max(SPEAKER_GAP + speaker_font(&style).size / 2.0);
            }
            // clamp the full drawn extent, then shift back to the body center
            let shift = (below - above) / 2.0;
            let extent = clamp_anchor(
                Anchor {
                    x: placed.x,
                    y: placed.y + shift,
                },
                width as f32,
                height as f32,
                geometry.width,
                geometry.height + above + below,
            );
            geometry = geometry.with_anchor(Anchor {
                x: extent.x,
                y: extent.y - shift,
            });
        }

        with_saved_state(surface, |surface| {
            render_bubble(surface, &geometry, &style)?;
            draw_dialogue_text(surface, &geometry, &lines, &style)?;
            if let Some(speaker) = speaker {
                draw_speaker_label(surface, &geometry, &style, speaker)?;
            }
            Ok(())
        })?;

        Ok(BubbleLayout {
            anchor: geometry.anchor,
            style,
            lines,
            geometry,
        })
    }
}

/// Lines are centered on the anchor and stacked as a block centered on it.
pub fn draw_dialogue_text<S>(
    surface: &mut S,
    geometry: &BubbleGeometry,
    lines: &[String],
    style: &BubbleStyle,
) -> Result<()>
where
    S: RasterSurface + ?Sized,
{
    let line_height = style.line_height();
    let text_height = lines.len() as f32 * line_height;
    let start_y = geometry.anchor.y - text_height / 2.0 + line_height / 2.0;
    for (idx, line) in lines.iter().enumerate() {
        surface.draw_text(&TextRun {
            text: line,
            x: geometry.anchor.x,
            y: start_y + idx as f32 * line_height,
            font: style.font(),
            color: style.text_color,
            align: TextAlign::Center,
        })?;
    }
    Ok(())
}

fn speaker_font(style: &BubbleStyle) -> FontSpec {
    FontSpec {
        family: style.font_family,
        size: style.font_size - 2.0,
        bold: true,
    }
}

pub fn draw_speaker_label<S>(
    surface: &mut S,
    geometry: &BubbleGeometry,
    style: &BubbleStyle,
    speaker: &str,
) -> Result<()>
where
    S: RasterSurface + ?Sized,
{
    let label = format!("{}:", speaker);
    surface.draw_text(&TextRun {
        text: &label,
        x: geometry.anchor.x,
        y: geometry.top() - SPEAKER_GAP,
        font: speaker_font(style),
        color: SPEAKER_COLOR,
        align: TextAlign::Start,
    })
}
