use super::{Anchor, BubbleStyle};

/// Box height assumed while the wrapped line count is still unknown.
pub const PLACEHOLDER_BUBBLE_HEIGHT: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraAngle {
    CloseUp,
    MediumShot,
    WideShot,
    Other,
}

impl CameraAngle {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|raw| raw.trim().to_ascii_lowercase()).as_deref() {
            Some("close_up") => CameraAngle::CloseUp,
            Some("medium_shot") => CameraAngle::MediumShot,
            Some("wide_shot") => CameraAngle::WideShot,
            _ => CameraAngle::Other,
        }
    }

    /// Horizontal position as a fraction of the image width.
    fn x_ratio(self) -> f32 {
        match self {
            CameraAngle::CloseUp => 0.7,
            CameraAngle::WideShot => 0.3,
            CameraAngle::MediumShot | CameraAngle::Other => 0.5,
        }
    }
}

/// `(width, height)` of the box used to clamp the anchor before wrapping.
pub fn placeholder_box(style: &BubbleStyle) -> (f32, f32) {
    (
        style.max_text_width + style.padding * 2.0,
        PLACEHOLDER_BUBBLE_HEIGHT,
    )
}

pub fn compute_anchor(
    width: u32,
    height: u32,
    style: &BubbleStyle,
    camera_angle: Option<&str>,
) -> Anchor {
    let angle = CameraAngle::parse(camera_angle);
    let width = width as f32;
    let height = height as f32;
    let raw = Anchor {
        x: width * angle.x_ratio(),
        y: height * 0.1,
    };
    let (box_w, box_h) = placeholder_box(style);
    clamp_anchor(raw, width, height, box_w, box_h)
}

/// Keeps a `box_w` x `box_h` box centered on `anchor` inside the image. An
/// axis too small for the box centers the anchor on that axis.
pub fn clamp_anchor(anchor: Anchor, width: f32, height: f32, box_w: f32, box_h: f32) -> Anchor {
    Anchor {
        x: clamp_axis(anchor.x, box_w / 2.0, width),
        y: clamp_axis(anchor.y, box_h / 2.0, height),
    }
}

fn clamp_axis(value: f32, half: f32, extent: f32) -> f32 {
    if extent < half * 2.0 {
        return extent / 2.0;
    }
    value.clamp(half, extent - half)
}
