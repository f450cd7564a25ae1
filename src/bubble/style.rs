use super::{BubbleStyle, FontFamily, Rgb, ShapeFamily, SpikeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Emotion {
    Angry,
    Sad,
    Thinking,
    Surprised,
    #[default]
    Neutral,
}

impl Emotion {
    pub const KNOWN: [Emotion; 4] = [
        Emotion::Angry,
        Emotion::Sad,
        Emotion::Thinking,
        Emotion::Surprised,
    ];

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "angry" => Emotion::Angry,
            "sad" => Emotion::Sad,
            "thinking" => Emotion::Thinking,
            "surprised" => Emotion::Surprised,
            _ => Emotion::Neutral,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Sad => "sad",
            Emotion::Thinking => "thinking",
            Emotion::Surprised => "surprised",
            Emotion::Neutral => "neutral",
        }
    }
}

fn base_style() -> BubbleStyle {
    BubbleStyle {
        max_text_width: 200.0,
        padding: 15.0,
        font_size: 16.0,
        font_family: FontFamily::Secondary,
        text_color: Rgb::BLACK,
        fill_color: Rgb::WHITE,
        border_color: Rgb::BLACK,
        border_width: 2.0,
        shape: ShapeFamily::Plain,
        border_dashed: false,
        curved: false,
    }
}

pub fn style_for(emotion: Emotion) -> BubbleStyle {
    let base = base_style();
    match emotion {
        Emotion::Angry => BubbleStyle {
            fill_color: Rgb(0xFF, 0xE6, 0xE6),
            border_color: Rgb(0xFF, 0x00, 0x00),
            border_width: 3.0,
            shape: ShapeFamily::Spiky(SpikeKind::Burst),
            ..base
        },
        Emotion::Sad => BubbleStyle {
            fill_color: Rgb(0xE6, 0xF3, 0xFF),
            border_color: Rgb(0x00, 0x66, 0xCC),
            curved: true,
            ..base
        },
        Emotion::Thinking => BubbleStyle {
            fill_color: Rgb(0xF0, 0xF0, 0xF0),
            shape: ShapeFamily::Cloud,
            border_dashed: true,
            ..base
        },
        Emotion::Surprised => BubbleStyle {
            fill_color: Rgb(0xFF, 0xFF, 0x99),
            border_color: Rgb(0xFF, 0x66, 0x00),
            shape: ShapeFamily::Spiky(SpikeKind::Jagged),
            ..base
        },
        Emotion::Neutral => base,
    }
}

/// Unrecognized emotions resolve to the neutral style.
pub fn resolve_style(emotion: &str) -> BubbleStyle {
    style_for(Emotion::parse(emotion))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angry_matches_table() {
        let style = resolve_style("angry");
        assert_eq!(style.fill_color.to_hex(), "#FFE6E6");
        assert_eq!(style.border_color.to_hex(), "#FF0000");
        assert_eq!(style.border_width, 3.0);
        assert_eq!(style.shape, ShapeFamily::Spiky(SpikeKind::Burst));
        assert_eq!(style.max_text_width, 200.0);
        assert_eq!(style.padding, 15.0);
        assert_eq!(style.font_size, 16.0);
        assert!(!style.border_dashed);
    }

    #[test]
    fn remaining_rows_match_table() {
        let sad = resolve_style("sad");
        assert_eq!(sad.fill_color.to_hex(), "#E6F3FF");
        assert_eq!(sad.border_color.to_hex(), "#0066CC");
        assert_eq!(sad.border_width, 2.0);
        assert_eq!(sad.shape, ShapeFamily::Plain);
        assert!(sad.curved);

        let thinking = resolve_style("thinking");
        assert_eq!(thinking.fill_color.to_hex(), "#F0F0F0");
        assert_eq!(thinking.border_color, Rgb::BLACK);
        assert_eq!(thinking.shape, ShapeFamily::Cloud);
        assert!(thinking.border_dashed);

        let surprised = resolve_style("surprised");
        assert_eq!(surprised.fill_color.to_hex(), "#FFFF99");
        assert_eq!(surprised.border_color.to_hex(), "#FF6600");
        assert_eq!(surprised.border_width, 2.0);
        assert_eq!(surprised.shape, ShapeFamily::Spiky(SpikeKind::Jagged));

        let neutral = resolve_style("calm");
        assert_eq!(neutral.fill_color, Rgb::WHITE);
        assert_eq!(neutral.border_color, Rgb::BLACK);
        assert_eq!(neutral.border_width, 2.0);
        assert_eq!(neutral.shape, ShapeFamily::Plain);
        assert!(!neutral.curved && !neutral.border_dashed);
    }

    #[test]
    fn base_fields_are_shared_by_every_style() {
        for emotion in Emotion::KNOWN.into_iter().chain([Emotion::Neutral]) {
            let style = style_for(emotion);
            assert_eq!(style.max_text_width, 200.0);
            assert_eq!(style.padding, 15.0);
            assert_eq!(style.font_size, 16.0);
            assert_eq!(style.font_family, FontFamily::Secondary);
            assert_eq!(style.text_color, Rgb::BLACK);
        }
    }

    #[test]
    fn resolution_is_deterministic() {
        for name in ["angry", "sad", "thinking", "surprised", "", "whatever"] {
            assert_eq!(resolve_style(name), resolve_style(name));
        }
    }

    #[test]
    fn every_known_emotion_has_its_own_style() {
        let neutral = style_for(Emotion::Neutral);
        for emotion in Emotion::KNOWN {
            assert_eq!(Emotion::parse(emotion.as_str()), emotion);
            assert_ne!(style_for(emotion), neutral, "{} fell back", emotion.as_str());
        }
    }

    #[test]
    fn angry_and_surprised_are_distinct_shapes() {
        assert_ne!(resolve_style("angry").shape, resolve_style("surprised").shape);
    }

    #[test]
    fn parsing_ignores_case_and_whitespace() {
        assert_eq!(Emotion::parse("  ANGRY "), Emotion::Angry);
        assert_eq!(Emotion::parse("Angri"), Emotion::Neutral);
    }
}
