use anyhow::{Context, Result, anyhow};
use resvg::render;
use std::io::Cursor;
use std::sync::Arc;
use tiny_skia::Pixmap;
use usvg::{Options, Tree, fontdb};

use crate::bubble::{FontSpec, Rgb, TextMeasure};
use crate::font::FontBook;
use crate::image_data::{self, DecodedImage};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outline {
    RoundedRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        radius: f32,
    },
    /// Closed path.
    Polygon(Vec<Point>),
    /// Open path: filled as if closed, stroked without the closing edge.
    Polyline(Vec<Point>),
    Circle {
        cx: f32,
        cy: f32,
        radius: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paint {
    pub fill: Rgb,
    pub stroke: Rgb,
    pub stroke_width: f32,
    pub dash: Option<[f32; 2]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Start,
    Center,
}

/// One line of text; `y` is the vertical middle of the glyph box.
#[derive(Debug, Clone)]
pub struct TextRun<'a> {
    pub text: &'a str,
    pub x: f32,
    pub y: f32,
    pub font: FontSpec,
    pub color: Rgb,
    pub align: TextAlign,
}

/// Drawing target for one panel. Paint is passed to every primitive, so
/// `save`/`restore` only scope grouping and nothing leaks between bubbles.
pub trait RasterSurface: TextMeasure {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn save(&mut self);
    fn restore(&mut self) -> Result<()>;
    fn draw_outline(&mut self, outline: &Outline, paint: &Paint) -> Result<()>;
    fn draw_text(&mut self, run: &TextRun<'_>) -> Result<()>;
}

/// Runs `draw` between `save` and `restore`. The scope is closed even when
/// `draw` fails; the drawing error wins over a restore error.
pub fn with_saved_state<S, F, T>(surface: &mut S, draw: F) -> Result<T>
where
    S: RasterSurface + ?Sized,
    F: FnOnce(&mut S) -> Result<T>,
{
    surface.save();
    let result = draw(surface);
    let restored = surface.restore();
    let value = result?;
    restored?;
    Ok(value)
}

/// Builds the panel as SVG markup and rasterizes it with resvg on `finish`.
pub struct SvgSurface {
    width: u32,
    height: u32,
    svg: String,
    open_groups: usize,
    fonts: Arc<FontBook>,
}

impl SvgSurface {
    pub fn new(width: u32, height: u32, fonts: Arc<FontBook>) -> Self {
        let mut svg = String::new();
        svg.push_str(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = width,
            h = height
        ));
        Self {
            width,
            height,
            svg,
            open_groups: 0,
            fonts,
        }
    }

    /// Paints `image` at the origin, stretched to the surface size.
    pub fn draw_base_image(&mut self, image: &DecodedImage) {
        let data_uri = image_data::encode_data_url(&image.bytes, &image.mime);
        self.svg.push_str(&format!(
            r#"<image href="{uri}" xlink:href="{uri}" x="0" y="0" width="{w}" height="{h}" preserveAspectRatio="none"/>"#,
            uri = data_uri,
            w = self.width,
            h = self.height
        ));
    }

    /// Markup with any still-open groups closed.
    pub fn to_svg(&self) -> String {
        let mut svg = self.svg.clone();
        for _ in 0..self.open_groups {
            svg.push_str("</g>");
        }
        svg.push_str("</svg>");
        svg
    }

    pub fn finish(self, output_mime: &str) -> Result<Vec<u8>> {
        if self.open_groups > 0 {
            return Err(anyhow!(
                "surface finished with {} unbalanced save(s)",
                self.open_groups
            ));
        }
        let svg = self.to_svg();
        render_svg_bytes(&svg, output_mime, self.fonts.database())
    }
}

impl TextMeasure for SvgSurface {
    fn measure_text(&self, text: &str, font: &FontSpec) -> f32 {
        self.fonts.measure_text(text, font)
    }
}

impl RasterSurface for SvgSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn save(&mut self) {
        self.open_groups += 1;
        self.svg.push_str("<g>");
    }

    fn restore(&mut self) -> Result<()> {
        if self.open_groups == 0 {
            return Err(anyhow!("restore called without a matching save"));
        }
        self.open_groups -= 1;
        self.svg.push_str("</g>");
        Ok(())
    }

    fn draw_outline(&mut self, outline: &Outline, paint: &Paint) -> Result<()> {
        if !paint.stroke_width.is_finite() || paint.stroke_width < 0.0 {
            return Err(anyhow!("invalid stroke width {}", paint.stroke_width));
        }
        let paint_attrs = paint_attributes(paint);
        let element = match outline {
            Outline::RoundedRect {
                x,
                y,
                width,
                height,
                radius,
            } => format!(
                r#"<rect x="{x:.2}" y="{y:.2}" width="{width:.2}" height="{height:.2}" rx="{radius:.2}" ry="{radius:.2}" {paint_attrs}/>"#,
            ),
            Outline::Polygon(points) => format!(
                r#"<polygon points="{}" {paint_attrs}/>"#,
                format_points(points)
            ),
            Outline::Polyline(points) => format!(
                r#"<polyline points="{}" {paint_attrs}/>"#,
                format_points(points)
            ),
            Outline::Circle { cx, cy, radius } => format!(
                r#"<circle cx="{cx:.2}" cy="{cy:.2}" r="{radius:.2}" {paint_attrs}/>"#,
            ),
        };
        self.svg.push_str(&element);
        Ok(())
    }

    fn draw_text(&mut self, run: &TextRun<'_>) -> Result<()> {
        if !run.font.size.is_finite() || run.font.size <= 0.0 {
            return Err(anyhow!("invalid font size {}", run.font.size));
        }
        let anchor = match run.align {
            TextAlign::Start => "start",
            TextAlign::Center => "middle",
        };
        let weight = if run.font.bold { "bold" } else { "normal" };
        self.svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" font-size="{size}" font-family="{family}" font-weight="{weight}" fill="{color}" text-anchor="{anchor}" dominant-baseline="middle">{text}</text>"#,
            x = run.x,
            y = run.y,
            size = run.font.size,
            family = escape_xml(self.fonts.family_name(run.font.family)),
            weight = weight,
            color = run.color.to_hex(),
            anchor = anchor,
            text = escape_xml(run.text)
        ));
        Ok(())
    }
}

fn paint_attributes(paint: &Paint) -> String {
    let mut attrs = format!(
        r#"fill="{}" stroke="{}" stroke-width="{}""#,
        paint.fill.to_hex(),
        paint.stroke.to_hex(),
        paint.stroke_width
    );
    if let Some([on, off]) = paint.dash {
        attrs.push_str(&format!(r#" stroke-dasharray="{} {}""#, on, off));
    }
    attrs
}

fn format_points(points: &[Point]) -> String {
    points
        .iter()
        .map(|point| format!("{:.2},{:.2}", point.x, point.y))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn render_svg_bytes(
    svg: &str,
    output_mime: &str,
    fonts: Arc<fontdb::Database>,
) -> Result<Vec<u8>> {
    let options = Options {
        fontdb: fonts,
        ..Options::default()
    };
    let tree = Tree::from_str(svg, &options).with_context(|| "failed to parse SVG")?;
    let size = tree.size().to_int_size();
    let mut pixmap =
        Pixmap::new(size.width(), size.height()).ok_or_else(|| anyhow!("empty SVG size"))?;
    let mut pixmap_mut = pixmap.as_mut();
    render(&tree, tiny_skia::Transform::identity(), &mut pixmap_mut);
    // tiny-skia pixels are premultiplied
    let rgba: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|pixel| {
            let color = pixel.demultiply();
            [color.red(), color.green(), color.blue(), color.alpha()]
        })
        .collect();
    let image = image::RgbaImage::from_raw(size.width(), size.height(), rgba)
        .ok_or_else(|| anyhow!("failed to build image buffer from SVG"))?;
    let format = image_data::image_format_from_mime(output_mime)
        .ok_or_else(|| anyhow!("unsupported output image mime '{}'", output_mime))?;
    let image = image::DynamicImage::ImageRgba8(image);
    // JPEG has no alpha channel
    let image = if format == image::ImageFormat::Jpeg {
        image::DynamicImage::ImageRgb8(image.to_rgb8())
    } else {
        image
    };
    let mut bytes = Vec::new();
    let mut cursor = Cursor::new(&mut bytes);
    image
        .write_to(&mut cursor, format)
        .with_context(|| "failed to encode composited image")?;
    Ok(bytes)
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bubble::FontFamily;

    fn surface() -> SvgSurface {
        SvgSurface::new(320, 240, Arc::new(FontBook::estimated()))
    }

    fn paint(dash: Option<[f32; 2]>) -> Paint {
        Paint {
            fill: Rgb::WHITE,
            stroke: Rgb::BLACK,
            stroke_width: 2.0,
            dash,
        }
    }

    #[test]
    fn outlines_become_svg_elements() {
        let mut surface = surface();
        surface
            .draw_outline(
                &Outline::RoundedRect {
                    x: 10.0,
                    y: 20.0,
                    width: 100.0,
                    height: 50.0,
                    radius: 15.0,
                },
                &paint(Some([5.0, 5.0])),
            )
            .expect("rect");
        surface
            .draw_outline(
                &Outline::Polyline(vec![Point::new(0.0, 0.0), Point::new(5.0, 10.0)]),
                &paint(None),
            )
            .expect("polyline");
        let svg = surface.to_svg();
        assert!(svg.contains(
            r##"<rect x="10.00" y="20.00" width="100.00" height="50.00" rx="15.00" ry="15.00" fill="#FFFFFF" stroke="#000000" stroke-width="2" stroke-dasharray="5 5"/>"##
        ));
        assert!(svg.contains(r#"<polyline points="0.00,0.00 5.00,10.00""#));
        assert!(svg.ends_with("</svg>"));
    }

    #[test]
    fn text_is_escaped_and_aligned() {
        let mut surface = surface();
        surface
            .draw_text(&TextRun {
                text: "<Tom & Jerry>",
                x: 50.0,
                y: 60.0,
                font: FontSpec {
                    family: FontFamily::Secondary,
                    size: 14.0,
                    bold: true,
                },
                color: Rgb(0x66, 0x66, 0x66),
                align: TextAlign::Start,
            })
            .expect("text");
        let svg = surface.to_svg();
        assert!(svg.contains("&lt;Tom &amp; Jerry&gt;"));
        assert!(svg.contains(r#"text-anchor="start""#));
        assert!(svg.contains(r#"font-weight="bold""#));
        assert!(svg.contains(r##"fill="#666666""##));
    }

    #[test]
    fn unbalanced_restore_is_rejected() {
        let mut surface = surface();
        assert!(surface.restore().is_err());
        surface.save();
        assert!(surface.to_svg().contains("<g></g>"));
        assert!(surface.finish("image/png").is_err());
    }

    #[test]
    fn saved_state_closes_scope_on_error() {
        let mut surface = surface();
        let result: Result<()> = with_saved_state(&mut surface, |surface| {
            surface.draw_outline(
                &Outline::Circle {
                    cx: 1.0,
                    cy: 1.0,
                    radius: 1.0,
                },
                &Paint {
                    stroke_width: f32::NAN,
                    ..paint(None)
                },
            )
        });
        assert!(result.is_err());
        assert!(surface.to_svg().contains("<g></g></svg>"));
    }

    #[test]
    fn blank_surface_rasterizes_to_requested_size() {
        let bytes = surface().finish("image/png").expect("png");
        let decoded = image::load_from_memory(&bytes).expect("decode");
        assert_eq!((decoded.width(), decoded.height()), (320, 240));
    }

    #[test]
    fn unknown_output_mime_is_rejected() {
        let err = surface().finish("image/x-unknown").unwrap_err();
        assert!(err.to_string().contains("unsupported output image mime"));
    }
}
