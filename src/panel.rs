use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys written by a previous run that must not be echoed twice.
const OUTCOME_KEYS: [&str; 3] = ["dialogue_added", "reason", "error"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Panel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_angle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_generation: Option<ImageGeneration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue: Option<Dialogue>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageGeneration {
    #[serde(default)]
    pub image_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue_added: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue_speaker: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dialogue {
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Panel {
    /// Identifier for log lines; panels are free-form so this is best effort.
    pub fn label(&self, index: usize) -> String {
        match self.extra.get("panel_id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => format!("#{}", index + 1),
        }
    }

    pub fn image_data(&self) -> Option<&str> {
        self.image_generation
            .as_ref()
            .and_then(|generation| generation.image_data.as_deref())
            .filter(|data| !data.trim().is_empty())
    }

    pub fn dialogue_text(&self) -> Option<&str> {
        self.dialogue
            .as_ref()
            .and_then(|dialogue| dialogue.text.as_deref())
            .filter(|text| !text.trim().is_empty())
    }

    pub(crate) fn clear_outcome(&mut self) {
        for key in OUTCOME_KEYS {
            self.extra.remove(key);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    #[serde(rename = "No image")]
    NoImage,
    #[serde(rename = "No dialogue")]
    NoDialogue,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessedPanel {
    #[serde(flatten)]
    pub panel: Panel,
    pub dialogue_added: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SkipReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessedPanel {
    pub fn added(panel: Panel) -> Self {
        Self {
            panel,
            dialogue_added: true,
            reason: None,
            error: None,
        }
    }

    pub fn skipped(panel: Panel, reason: SkipReason) -> Self {
        Self {
            panel,
            dialogue_added: false,
            reason: Some(reason),
            error: None,
        }
    }

    pub fn failed(panel: Panel, error: String) -> Self {
        Self {
            panel,
            dialogue_added: false,
            reason: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub success: bool,
    pub panels: Vec<ProcessedPanel>,
    pub total_panels: usize,
    pub dialogue_added_count: usize,
    pub success_rate: u32,
    pub timestamp: String,
}

/// Accepts either a bare array of panels or an object with a `panels` array.
pub fn parse_panels(input: &str) -> anyhow::Result<Vec<Panel>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PanelsInput {
        List(Vec<Panel>),
        Wrapped { panels: Vec<Panel> },
    }

    let parsed: PanelsInput = serde_json::from_str(input)
        .map_err(|err| anyhow::anyhow!("failed to parse panels JSON: {}", err))?;
    Ok(match parsed {
        PanelsInput::List(panels) => panels,
        PanelsInput::Wrapped { panels } => panels,
    })
}
