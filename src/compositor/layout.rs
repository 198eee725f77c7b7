//! Caption placement, independent of any font or pixel buffer.

/// Horizontal advance of a run of text at a given size, in pixels.
pub trait TextMeasure {
    fn width(&self, text: &str, font_size: f32) -> f32;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptionLine {
    pub text: String,
    pub center_x: f32,
    pub baseline: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptionLayout {
    pub font_size: f32,
    pub line_height: f32,
    pub stroke_width: f32,
    pub max_width: f32,
    pub lines: Vec<CaptionLine>,
}

/// Something a laid-out caption can be drawn onto.
pub trait CaptionSurface {
    fn stroke_text(&mut self, line: &CaptionLine, font_size: f32, stroke_width: f32);
    fn fill_text(&mut self, line: &CaptionLine, font_size: f32);
}

const FONT_DIVISOR: f32 = 18.0;
const WRAP_RATIO: f32 = 0.9;
const LINE_SPACING: f32 = 1.1;
const STROKE_DIVISOR: f32 = 8.0;
const BOTTOM_MARGIN: f32 = 0.05;

/// Greedy word wrap. A single word wider than `max_width` gets a line of its own.
pub fn wrap_words(
    text: &str,
    measure: &dyn TextMeasure,
    font_size: f32,
    max_width: f32,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{} {}", current, word);
        if measure.width(&candidate, font_size) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Lays out an uppercased caption along the bottom of a `width` x `height`
/// canvas. The last line sits 5% of the height above the bottom edge.
pub fn layout_caption(
    caption: &str,
    width: u32,
    height: u32,
    measure: &dyn TextMeasure,
) -> CaptionLayout {
    let width = width as f32;
    let height = height as f32;
    let font_size = width / FONT_DIVISOR;
    let line_height = font_size * LINE_SPACING;
    let max_width = width * WRAP_RATIO;

    let wrapped = wrap_words(&caption.to_uppercase(), measure, font_size, max_width);
    let n = wrapped.len();
    let bottom = height - height * BOTTOM_MARGIN;

    let lines = wrapped
        .into_iter()
        .enumerate()
        .map(|(i, text)| CaptionLine {
            text,
            center_x: width / 2.0,
            baseline: bottom - (n - 1 - i) as f32 * line_height,
        })
        .collect();

    CaptionLayout {
        font_size,
        line_height,
        stroke_width: font_size / STROKE_DIVISOR,
        max_width,
        lines,
    }
}

/// Draws every line, outline first so the fill stays crisp.
pub fn render_caption(layout: &CaptionLayout, surface: &mut dyn CaptionSurface) {
    for line in &layout.lines {
        surface.stroke_text(line, layout.font_size, layout.stroke_width);
        surface.fill_text(line, layout.font_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every character is `ratio` em wide.
    struct FixedMeasure(f32);

    impl TextMeasure for FixedMeasure {
        fn width(&self, text: &str, font_size: f32) -> f32 {
            text.chars().count() as f32 * font_size * self.0
        }
    }

    #[derive(Default)]
    struct Recorder(Vec<(&'static str, String)>);

    impl CaptionSurface for Recorder {
        fn stroke_text(&mut self, line: &CaptionLine, _font_size: f32, _stroke_width: f32) {
            self.0.push(("stroke", line.text.clone()));
        }

        fn fill_text(&mut self, line: &CaptionLine, _font_size: f32) {
            self.0.push(("fill", line.text.clone()));
        }
    }

    #[test]
    fn wrap_respects_max_width() {
        let measure = FixedMeasure(1.0);
        let lines = wrap_words("aa bb cc dd ee", &measure, 10.0, 55.0);
        assert_eq!(lines, vec!["aa bb", "cc dd", "ee"]);
        for line in &lines {
            assert!(measure.width(line, 10.0) <= 55.0);
        }
    }

    #[test]
    fn oversized_word_stands_alone() {
        let measure = FixedMeasure(1.0);
        let lines = wrap_words("a supercalifragilistic b", &measure, 10.0, 50.0);
        assert_eq!(lines, vec!["a", "supercalifragilistic", "b"]);
    }

    #[test]
    fn blank_caption_has_no_lines() {
        let layout = layout_caption("   ", 1024, 683, &FixedMeasure(0.7));
        assert!(layout.lines.is_empty());
    }

    #[test]
    fn reference_caption_wraps_onto_two_lines_at_bottom() {
        let layout = layout_caption("hello world this is a test", 1024, 683, &FixedMeasure(0.7));

        assert!((layout.font_size - 1024.0 / 18.0).abs() < 1e-3);
        assert!((layout.stroke_width - layout.font_size / 8.0).abs() < 1e-3);
        assert!(layout.lines.len() >= 2);
        assert!(layout.lines.iter().all(|l| l.text == l.text.to_uppercase()));
        assert!(layout.lines.iter().all(|l| l.center_x == 512.0));

        let last = layout.lines.last().unwrap();
        let gap = 683.0 - last.baseline;
        assert!((gap - 683.0 * 0.05).abs() < 1e-3);
        assert!(gap <= 683.0 * 0.05 + layout.line_height);

        for pair in layout.lines.windows(2) {
            assert!((pair[1].baseline - pair[0].baseline - layout.line_height).abs() < 1e-3);
        }
    }

    #[test]
    fn stroke_precedes_fill_for_each_line() {
        let layout = layout_caption("one two three four five six", 300, 200, &FixedMeasure(0.7));
        let mut recorder = Recorder::default();
        render_caption(&layout, &mut recorder);

        assert_eq!(recorder.0.len(), layout.lines.len() * 2);
        for (pair, line) in recorder.0.chunks(2).zip(&layout.lines) {
            assert_eq!(pair[0], ("stroke", line.text.clone()));
            assert_eq!(pair[1], ("fill", line.text.clone()));
        }
    }
}
