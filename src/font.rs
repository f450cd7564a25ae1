use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::sync::Arc;
use ttf_parser::Face;
use ttf_parser::name_id;
use usvg::fontdb;

use crate::bubble::{FontFamily, FontSpec, TextMeasure};
use crate::settings::{FaceSettings, Settings};

/// Generic family written into the SVG when no face could be resolved.
pub const GENERIC_FAMILY: &str = "sans-serif";

#[derive(Clone)]
pub struct FontMetrics {
    data: Arc<Vec<u8>>,
    units_per_em: u16,
    space_advance: u16,
    family: Option<String>,
    face_index: u32,
}

impl FontMetrics {
    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }
}

fn load_font_metrics(path: &Path) -> Result<FontMetrics> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read font: {}", path.display()))?;
    load_font_metrics_from_data(&data, None)
        .map_err(|err| anyhow!("failed to parse font: {} ({})", path.display(), err))
}

#[derive(Clone)]
pub struct ResolvedFace {
    pub metrics: FontMetrics,
    pub family: String,
}

/// A configured path must load; otherwise the family and then each fallback
/// is looked up in `db`.
pub fn resolve_face(
    db: &fontdb::Database,
    font_path: Option<&Path>,
    font_family: Option<&str>,
    fallback: &[String],
) -> Result<ResolvedFace> {
    if let Some(path) = font_path {
        let metrics = load_font_metrics(path)?;
        let family = metrics
            .family()
            .map(|name| name.to_string())
            .or_else(|| font_family.map(|name| name.to_string()))
            .unwrap_or_else(|| GENERIC_FAMILY.to_string());
        return Ok(ResolvedFace { metrics, family });
    }

    if let Some(family) = font_family {
        if let Ok(resolved) = load_face_from_family(db, family) {
            return Ok(resolved);
        }
    }

    for candidate in fallback {
        if let Ok(resolved) = load_face_from_family(db, candidate) {
            return Ok(resolved);
        }
    }

    Err(anyhow!(
        "no font found for '{}' or fallbacks [{}]",
        font_family.unwrap_or(GENERIC_FAMILY),
        fallback.join(", ")
    ))
}

/// Registered faces plus the font database handed to the rasterizer. Built
/// once and shared read-only across panels.
pub struct FontBook {
    db: Arc<fontdb::Database>,
    primary: Option<ResolvedFace>,
    secondary: Option<ResolvedFace>,
}

impl FontBook {
    pub fn load(settings: &Settings) -> Result<Self> {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        let fonts = &settings.fonts;
        let paths = [
            fonts.primary.path.as_deref(),
            fonts.primary_bold_path.as_deref(),
            fonts.secondary.path.as_deref(),
        ];
        for path in paths.into_iter().flatten() {
            db.load_font_file(path)
                .with_context(|| format!("failed to register font: {}", path))?;
        }

        let primary = load_configured(&db, &fonts.primary, &fonts.fallback)?;
        let secondary = load_configured(&db, &fonts.secondary, &fonts.fallback)?;
        tracing::debug!(
            primary = primary.as_ref().map(|face| face.family.as_str()),
            secondary = secondary.as_ref().map(|face| face.family.as_str()),
            "font book ready"
        );
        Ok(Self {
            db: Arc::new(db),
            primary,
            secondary,
        })
    }

    /// No faces and an empty database: measurement falls back to per-glyph
    /// estimates and text renders with whatever the rasterizer finds.
    pub fn estimated() -> Self {
        Self {
            db: Arc::new(fontdb::Database::new()),
            primary: None,
            secondary: None,
        }
    }

    pub fn database(&self) -> Arc<fontdb::Database> {
        Arc::clone(&self.db)
    }

    pub fn face(&self, family: FontFamily) -> Option<&ResolvedFace> {
        match family {
            FontFamily::Primary => self.primary.as_ref(),
            FontFamily::Secondary => self.secondary.as_ref().or(self.primary.as_ref()),
        }
    }

    pub fn family_name(&self, family: FontFamily) -> &str {
        self.face(family)
            .map(|face| face.family.as_str())
            .unwrap_or(GENERIC_FAMILY)
    }
}

impl TextMeasure for FontBook {
    fn measure_text(&self, text: &str, font: &FontSpec) -> f32 {
        let metrics = self.face(font.family).map(|face| &face.metrics);
        measure_text_width_px(text, font.size, metrics)
    }
}

fn load_configured(
    db: &fontdb::Database,
    face: &FaceSettings,
    fallback: &[String],
) -> Result<Option<ResolvedFace>> {
    let path = face.path.as_deref().map(Path::new);
    match resolve_face(db, path, face.family.as_deref(), fallback) {
        Ok(resolved) => Ok(Some(resolved)),
        Err(err) if path.is_some() => Err(err),
        Err(err) => {
            tracing::warn!("{}; text width will be estimated", err);
            Ok(None)
        }
    }
}

pub(crate) fn measure_text_width_px(text: &str, font_size: f32, font: Option<&FontMetrics>) -> f32 {
    if let Some(font) = font {
        if let Ok(face) = Face::parse(&font.data, font.face_index) {
            let mut advance = 0u32;
            for ch in text.chars() {
                if ch == '\n' {
                    continue;
                }
                if ch == ' ' {
                    advance = advance.saturating_add(font.space_advance as u32);
                    continue;
                }
                let glyph_advance = face
                    .glyph_index(ch)
                    .and_then(|glyph| face.glyph_hor_advance(glyph))
                    .unwrap_or(font.space_advance);
                advance = advance.saturating_add(glyph_advance as u32);
            }
            let units = font.units_per_em.max(1) as f32;
            return advance as f32 * (font_size / units);
        }
    }
    estimate_text_width_units(text) * font_size
}

fn estimate_char_units(ch: char) -> f32 {
    if ch.is_whitespace() {
        0.25
    } else if ch.is_ascii_alphanumeric() {
        0.55
    } else if ch.is_ascii() {
        0.35
    } else if ch.is_alphabetic() && (ch as u32) < 0x2000 {
        // Latin with diacritics (Vietnamese dialogue)
        0.55
    } else if matches!(
        ch as u32,
        0x4E00..=0x9FFF | 0x3040..=0x30FF | 0x31F0..=0x31FF | 0xAC00..=0xD7AF
    ) {
        1.0
    } else {
        0.9
    }
}

fn estimate_text_width_units(text: &str) -> f32 {
    text.chars().map(estimate_char_units).sum()
}

fn load_font_metrics_from_data(data: &[u8], preferred_family: Option<&str>) -> Result<FontMetrics> {
    let mut fallback = None;
    let count = ttf_parser::fonts_in_collection(data).unwrap_or(1);
    for index in 0..count {
        if let Ok(face) = Face::parse(data, index) {
            let family = extract_family_name(&face);
            let units_per_em = face.units_per_em().max(1);
            let space_advance = face
                .glyph_index(' ')
                .and_then(|id| face.glyph_hor_advance(id))
                .unwrap_or(units_per_em / 2);
            let metrics = FontMetrics {
                data: Arc::new(data.to_vec()),
                units_per_em,
                space_advance,
                family: family.clone(),
                face_index: index,
            };
            if let (Some(preferred), Some(found)) = (preferred_family, &family) {
                if found.eq_ignore_ascii_case(preferred) {
                    return Ok(metrics);
                }
            }
            if fallback.is_none() {
                fallback = Some(metrics);
            }
        }
    }
    fallback.ok_or_else(|| anyhow!("failed to parse font data"))
}

fn load_face_from_family(db: &fontdb::Database, family: &str) -> Result<ResolvedFace> {
    let families = if family.eq_ignore_ascii_case(GENERIC_FAMILY) {
        vec![fontdb::Family::SansSerif]
    } else {
        vec![fontdb::Family::Name(family)]
    };
    let query = fontdb::Query {
        families: &families,
        ..Default::default()
    };
    let id = db
        .query(&query)
        .ok_or_else(|| anyhow!("font not found: {}", family))?;
    let data = db
        .with_face_data(id, |data, _index| data.to_vec())
        .ok_or_else(|| anyhow!("failed to load font data: {}", family))?;
    let metrics = load_font_metrics_from_data(&data, Some(family))?;
    let resolved_family = metrics
        .family()
        .map(|name| name.to_string())
        .unwrap_or_else(|| family.to_string());
    Ok(ResolvedFace {
        metrics,
        family: resolved_family,
    })
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}
