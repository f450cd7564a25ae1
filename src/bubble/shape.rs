use anyhow::Result;

use super::{BubbleGeometry, BubbleStyle, ShapeFamily, SpikeKind};
use crate::surface::{Outline, Paint, Point, RasterSurface, with_saved_state};

const CORNER_RADIUS: f32 = 15.0;
const CURVED_CORNER_RADIUS: f32 = 30.0;
const DASH: [f32; 2] = [5.0, 5.0];

const SPIKES: usize = 8;
const SPIKE_HEIGHT: f32 = 10.0;
const CORNER_INSET: f32 = 10.0;

pub const TAIL_HALF_BASE: f32 = 10.0;
pub const TAIL_DROP: f32 = 20.0;

/// `(dx, dy, radius)` of the thought trail circles, relative to the anchor x
/// and the bubble's bottom edge.
pub const THOUGHT_TRAIL: [(f32, f32, f32); 3] =
    [(-30.0, 20.0, 8.0), (-50.0, 35.0, 5.0), (-65.0, 45.0, 3.0)];

/// How far the drawn shape reaches `(above, below)` the body box.
pub fn vertical_overhang(style: &BubbleStyle) -> (f32, f32) {
    match style.shape {
        ShapeFamily::Plain => (0.0, TAIL_DROP),
        ShapeFamily::Spiky(SpikeKind::Burst) => (SPIKE_HEIGHT, 0.0),
        ShapeFamily::Spiky(SpikeKind::Jagged) => (SPIKE_HEIGHT, SPIKE_HEIGHT),
        ShapeFamily::Cloud => {
            let trail = THOUGHT_TRAIL
                .iter()
                .map(|(_, dy, radius)| dy + radius)
                .fold(0.0, f32::max);
            (0.0, trail.max(TAIL_DROP))
        }
    }
}

pub fn render_bubble<S>(surface: &mut S, geometry: &BubbleGeometry, style: &BubbleStyle) -> Result<()>
where
    S: RasterSurface + ?Sized,
{
    with_saved_state(surface, |surface| match style.shape {
        ShapeFamily::Plain => draw_regular_bubble(surface, geometry, style),
        ShapeFamily::Spiky(kind) => draw_spiky_bubble(surface, geometry, style, kind),
        ShapeFamily::Cloud => draw_thought_bubble(surface, geometry, style),
    })
}

fn solid_paint(style: &BubbleStyle) -> Paint {
    Paint {
        fill: style.fill_color,
        stroke: style.border_color,
        stroke_width: style.border_width,
        dash: None,
    }
}

pub fn bubble_body(geometry: &BubbleGeometry, style: &BubbleStyle) -> Outline {
    let preferred = if style.curved {
        CURVED_CORNER_RADIUS
    } else {
        CORNER_RADIUS
    };
    let radius = preferred.min(geometry.width.min(geometry.height) / 2.0);
    Outline::RoundedRect {
        x: geometry.left(),
        y: geometry.top(),
        width: geometry.width,
        height: geometry.height,
        radius,
    }
}

pub fn bubble_tail(geometry: &BubbleGeometry) -> Outline {
    let x = geometry.anchor.x;
    let bottom = geometry.bottom();
    Outline::Polyline(vec![
        Point::new(x - TAIL_HALF_BASE, bottom),
        Point::new(x, bottom + TAIL_DROP),
        Point::new(x + TAIL_HALF_BASE, bottom),
    ])
}

pub fn draw_regular_bubble<S>(
    surface: &mut S,
    geometry: &BubbleGeometry,
    style: &BubbleStyle,
) -> Result<()>
where
    S: RasterSurface + ?Sized,
{
    let solid = solid_paint(style);
    let body_paint = Paint {
        dash: style.border_dashed.then_some(DASH),
        ..solid.clone()
    };
    surface.draw_outline(&bubble_body(geometry, style), &body_paint)?;
    surface.draw_outline(&bubble_tail(geometry), &solid)
}

pub fn spiky_outline(geometry: &BubbleGeometry, kind: SpikeKind) -> Vec<Point> {
    let left = geometry.left();
    let right = geometry.right();
    let top = geometry.top();
    let bottom = geometry.bottom();
    let segment = geometry.width / SPIKES as f32;

    let mut points = Vec::with_capacity(SPIKES * 4 + 6);
    points.push(Point::new(left, top + CORNER_INSET));
    for idx in 0..SPIKES {
        let start = left + segment * idx as f32;
        points.push(Point::new(start + segment / 2.0, top - SPIKE_HEIGHT));
        points.push(Point::new(start + segment, top));
    }
    points.push(Point::new(right, top + CORNER_INSET));
    points.push(Point::new(right, bottom - CORNER_INSET));
    points.push(Point::new(right - CORNER_INSET, bottom));
    if kind == SpikeKind::Jagged {
        let run = geometry.width - CORNER_INSET * 2.0;
        let bottom_segment = run / SPIKES as f32;
        for idx in 0..SPIKES {
            let start = right - CORNER_INSET - bottom_segment * idx as f32;
            points.push(Point::new(
                start - bottom_segment / 2.0,
                bottom + SPIKE_HEIGHT,
            ));
            points.push(Point::new(start - bottom_segment, bottom));
        }
    } else {
        points.push(Point::new(left + CORNER_INSET, bottom));
    }
    points.push(Point::new(left, bottom - CORNER_INSET));
    points
}

pub fn draw_spiky_bubble<S>(
    surface: &mut S,
    geometry: &BubbleGeometry,
    style: &BubbleStyle,
    kind: SpikeKind,
) -> Result<()>
where
    S: RasterSurface + ?Sized,
{
    let outline = Outline::Polygon(spiky_outline(geometry, kind));
    surface.draw_outline(&outline, &solid_paint(style))
}

pub fn draw_thought_bubble<S>(
    surface: &mut S,
    geometry: &BubbleGeometry,
    style: &BubbleStyle,
) -> Result<()>
where
    S: RasterSurface + ?Sized,
{
    draw_regular_bubble(surface, geometry, style)?;
    let solid = solid_paint(style);
    let bottom = geometry.bottom();
    for (dx, dy, radius) in THOUGHT_TRAIL {
        let circle = Outline::Circle {
            cx: geometry.anchor.x + dx,
            cy: bottom + dy,
            radius,
        };
        surface.draw_outline(&circle, &solid)?;
    }
    Ok(())
}
