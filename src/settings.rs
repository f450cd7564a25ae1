use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::compose::AnchorPolicy;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone, Default)]
pub struct FaceSettings {
    pub family: Option<String>,
    pub path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FontSettings {
    pub primary: FaceSettings,
    /// Bold face file registered under the primary family for weighted text.
    pub primary_bold_path: Option<String>,
    pub secondary: FaceSettings,
    pub fallback: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub fonts: FontSettings,
    pub output_mime: String,
    pub anchor_policy: AnchorPolicy,
    pub show_speaker: bool,
    pub workers: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fonts: FontSettings {
                primary: FaceSettings {
                    family: Some("NotoSans".to_string()),
                    path: None,
                },
                primary_bold_path: None,
                secondary: FaceSettings {
                    family: Some("PatrickHand".to_string()),
                    path: None,
                },
                fallback: vec!["sans-serif".to_string()],
            },
            output_mime: "image/png".to_string(),
            anchor_policy: AnchorPolicy::FitRendered,
            show_speaker: true,
            workers: None,
        }
    }
}

impl Settings {
    /// Worker count for the batch pool, never zero.
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get).max(1)
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    fonts: Option<FontsSection>,
    render: Option<RenderSection>,
    batch: Option<BatchSection>,
}

#[derive(Debug, Default, Deserialize)]
struct FontsSection {
    primary_family: Option<String>,
    primary_path: Option<String>,
    primary_bold_path: Option<String>,
    secondary_family: Option<String>,
    secondary_path: Option<String>,
    fallback: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct RenderSection {
    output_mime: Option<String>,
    anchor_policy: Option<AnchorPolicy>,
    show_speaker: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct BatchSection {
    workers: Option<usize>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    settings.merge(parse_settings(DEFAULT_SETTINGS_TOML, Path::new("<built-in>"))?);
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            settings.merge(parse_settings(&content, &path)?);
            tracing::debug!("merged settings from {}", path.display());
        }
    }

    Ok(settings)
}

fn parse_settings(content: &str, path: &Path) -> Result<SettingsFile> {
    toml::from_str(content).with_context(|| format!("failed to parse settings: {}", path.display()))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn merge_face(face: &mut FaceSettings, family: Option<String>, path: Option<String>) {
    if let Some(family) = non_blank(family) {
        face.family = Some(family);
    }
    if let Some(path) = non_blank(path) {
        face.path = Some(path);
    }
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(fonts) = incoming.fonts {
            merge_face(
                &mut self.fonts.primary,
                fonts.primary_family,
                fonts.primary_path,
            );
            if let Some(path) = non_blank(fonts.primary_bold_path) {
                self.fonts.primary_bold_path = Some(path);
            }
            merge_face(
                &mut self.fonts.secondary,
                fonts.secondary_family,
                fonts.secondary_path,
            );
            if let Some(fallback) = fonts.fallback {
                let fallback: Vec<String> = fallback
                    .into_iter()
                    .filter(|family| !family.trim().is_empty())
                    .collect();
                if !fallback.is_empty() {
                    self.fonts.fallback = fallback;
                }
            }
        }
        if let Some(render) = incoming.render {
            if let Some(mime) = non_blank(render.output_mime) {
                self.output_mime = mime.trim().to_ascii_lowercase();
            }
            if let Some(policy) = render.anchor_policy {
                self.anchor_policy = policy;
            }
            if let Some(show) = render.show_speaker {
                self.show_speaker = show;
            }
        }
        if let Some(batch) = incoming.batch {
            if let Some(workers) = batch.workers {
                if workers > 0 {
                    self.workers = Some(workers);
                }
            }
        }
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".truyenff-bubbles"))
        }
    })
}
