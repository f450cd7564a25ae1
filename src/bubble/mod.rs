mod position;
mod shape;
mod style;
mod wrap;

pub use position::{
    CameraAngle, PLACEHOLDER_BUBBLE_HEIGHT, clamp_anchor, compute_anchor, placeholder_box,
};
pub use shape::{
    TAIL_DROP, TAIL_HALF_BASE, THOUGHT_TRAIL, bubble_body, bubble_tail, draw_regular_bubble,
    draw_spiky_bubble, draw_thought_bubble, render_bubble, spiky_outline, vertical_overhang,
};
pub use style::{Emotion, resolve_style, style_for};
pub use wrap::{TextMeasure, wrap_text};

use anyhow::{Result, anyhow};

pub const LINE_HEIGHT_FACTOR: f32 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0x00, 0x00, 0x00);
    pub const WHITE: Rgb = Rgb(0xFF, 0xFF, 0xFF);

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }

    pub fn parse_hex(value: &str) -> Result<Self> {
        let raw = value.trim();
        let digits = raw
            .strip_prefix('#')
            .ok_or_else(|| anyhow!("color '{}' must start with '#'", raw))?;
        let expanded = match digits.len() {
            3 => digits.chars().flat_map(|ch| [ch, ch]).collect::<String>(),
            6 => digits.to_string(),
            _ => return Err(anyhow!("color '{}' must be #RGB or #RRGGBB", raw)),
        };
        let channel = |idx: usize| {
            u8::from_str_radix(&expanded[idx..idx + 2], 16)
                .map_err(|_| anyhow!("color '{}' has invalid hex digits", raw))
        };
        Ok(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// Which registered face a run of text uses. `Secondary` is the hand-written
/// comic face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontFamily {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSpec {
    pub family: FontFamily,
    pub size: f32,
    pub bold: bool,
}

impl FontSpec {
    pub fn regular(family: FontFamily, size: f32) -> Self {
        Self {
            family,
            size,
            bold: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpikeKind {
    /// Spikes along the top edge only.
    Burst,
    /// Spikes along the top and bottom edges.
    Jagged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeFamily {
    Plain,
    Spiky(SpikeKind),
    Cloud,
}

impl ShapeFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            ShapeFamily::Plain => "plain",
            ShapeFamily::Spiky(_) => "spiky",
            ShapeFamily::Cloud => "cloud",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BubbleStyle {
    pub max_text_width: f32,
    pub padding: f32,
    pub font_size: f32,
    pub font_family: FontFamily,
    pub text_color: Rgb,
    pub fill_color: Rgb,
    pub border_color: Rgb,
    pub border_width: f32,
    pub shape: ShapeFamily,
    pub border_dashed: bool,
    pub curved: bool,
}

impl BubbleStyle {
    pub fn font(&self) -> FontSpec {
        FontSpec::regular(self.font_family, self.font_size)
    }

    pub fn line_height(&self) -> f32 {
        self.font_size * LINE_HEIGHT_FACTOR
    }

    /// Width budget handed to the wrapper: the bubble width minus padding on
    /// both sides.
    pub fn wrap_width(&self) -> f32 {
        self.max_text_width - self.padding * 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BubbleGeometry {
    pub anchor: Anchor,
    pub width: f32,
    pub height: f32,
}

impl BubbleGeometry {
    pub fn for_lines(anchor: Anchor, line_count: usize, style: &BubbleStyle) -> Self {
        let text_height = line_count as f32 * style.line_height();
        Self {
            anchor,
            width: style.max_text_width,
            height: text_height + style.padding * 2.0,
        }
    }

    pub fn left(&self) -> f32 {
        self.anchor.x - self.width / 2.0
    }

    pub fn right(&self) -> f32 {
        self.anchor.x + self.width / 2.0
    }

    pub fn top(&self) -> f32 {
        self.anchor.y - self.height / 2.0
    }

    pub fn bottom(&self) -> f32 {
        self.anchor.y + self.height / 2.0
    }

    pub fn with_anchor(self, anchor: Anchor) -> Self {
        Self { anchor, ..self }
    }
}
