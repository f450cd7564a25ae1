use super::FontSpec;

pub trait TextMeasure {
    fn measure_text(&self, text: &str, font: &FontSpec) -> f32;
}

impl<F> TextMeasure for F
where
    F: Fn(&str, &FontSpec) -> f32,
{
    fn measure_text(&self, text: &str, font: &FontSpec) -> f32 {
        self(text, font)
    }
}

/// Greedy word wrap. The candidate measured for each word carries a trailing
/// space, so a line may end up a little narrower than `max_width`.
pub fn wrap_text<M>(text: &str, max_width: f32, font: &FontSpec, measure: &M) -> Vec<String>
where
    M: TextMeasure + ?Sized,
{
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split(' ').filter(|word| !word.is_empty()) {
        let candidate = format!("{}{} ", current, word);
        let width = measure.measure_text(&candidate, font);
        // break only after a word has landed; leading spaces never yield an empty line
        if width > max_width && !current.is_empty() {
            lines.push(current.trim().to_string());
            current.clear();
            current.push_str(word);
            current.push(' ');
        } else {
            current = candidate;
        }
    }

    if !current.trim().is_empty() {
        lines.push(current.trim().to_string());
    }
    lines
}
