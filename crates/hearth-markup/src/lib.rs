/// Rule-content markup renderer.
///
/// Rule text uses a tiny inline vocabulary (`<b>`, `<i>`, `<mark>`, `<u>`)
/// plus line-leading bullet markers (`•`, `-`, `→`). This crate tokenizes
/// that text into structured `{text, style}` spans. It never produces an
/// HTML string: anything outside the allow-list stays literal text, so
/// there is no injection surface for a rendering sink downstream.
use serde::{Deserialize, Serialize};

/// A run of text with a uniform style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub highlight: bool,
    #[serde(default)]
    pub underline: bool,
}

/// One rendered line. Blank lines come through as empty-span lines so
/// paragraph breaks survive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub bullet: bool,
    pub spans: Vec<Span>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Style {
    bold: bool,
    italic: bool,
    highlight: bool,
    underline: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Bold,
    Italic,
    Highlight,
    Underline,
}

impl Tag {
    const ALL: [Tag; 4] = [Tag::Bold, Tag::Italic, Tag::Highlight, Tag::Underline];

    fn open(self) -> &'static str {
        match self {
            Tag::Bold => "<b>",
            Tag::Italic => "<i>",
            Tag::Highlight => "<mark>",
            Tag::Underline => "<u>",
        }
    }

    fn close(self) -> &'static str {
        match self {
            Tag::Bold => "</b>",
            Tag::Italic => "</i>",
            Tag::Highlight => "</mark>",
            Tag::Underline => "</u>",
        }
    }

    fn apply(self, mut style: Style) -> Style {
        match self {
            Tag::Bold => style.bold = true,
            Tag::Italic => style.italic = true,
            Tag::Highlight => style.highlight = true,
            Tag::Underline => style.underline = true,
        }
        style
    }
}

const BULLET_MARKERS: [char; 3] = ['•', '-', '→'];

/// Render rule content into displayable lines.
pub fn render(content: &str) -> Vec<Line> {
    content.lines().map(render_line).collect()
}

fn render_line(line: &str) -> Line {
    let trimmed = line.trim();

    let (bullet, text) = match trimmed.chars().next() {
        Some(marker) if BULLET_MARKERS.contains(&marker) => {
            (true, trimmed[marker.len_utf8()..].trim_start())
        }
        _ => (false, trimmed),
    };

    let mut spans = Vec::new();
    parse_spans(text, Style::default(), &mut spans);
    Line { bullet, spans }
}

/// Scan `text` for allow-listed tags, emitting styled spans. A tag only
/// takes effect when its matching close tag appears later in the same
/// line (earliest close wins); otherwise it is literal text. Unknown
/// tags are always literal.
fn parse_spans(text: &str, style: Style, out: &mut Vec<Span>) {
    let mut literal = String::new();
    let mut rest = text;

    while let Some(pos) = rest.find('<') {
        let (before, at_tag) = rest.split_at(pos);
        literal.push_str(before);

        match Tag::ALL.iter().find(|t| at_tag.starts_with(t.open())) {
            Some(&tag) => {
                let after_open = &at_tag[tag.open().len()..];
                match after_open.find(tag.close()) {
                    Some(end) => {
                        flush(&mut literal, style, out);
                        parse_spans(&after_open[..end], tag.apply(style), out);
                        rest = &after_open[end + tag.close().len()..];
                    }
                    None => {
                        // unclosed tag renders as-is
                        literal.push_str(tag.open());
                        rest = after_open;
                    }
                }
            }
            None => {
                literal.push('<');
                rest = &at_tag[1..];
            }
        }
    }

    literal.push_str(rest);
    flush(&mut literal, style, out);
}

fn flush(literal: &mut String, style: Style, out: &mut Vec<Span>) {
    if literal.is_empty() {
        return;
    }
    out.push(Span {
        text: std::mem::take(literal),
        bold: style.bold,
        italic: style.italic,
        highlight: style.highlight,
        underline: style.underline,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(text: &str) -> Span {
        Span {
            text: text.into(),
            bold: false,
            italic: false,
            highlight: false,
            underline: false,
        }
    }

    #[test]
    fn plain_text_is_one_span() {
        let lines = render("Quiet after ten.");
        assert_eq!(lines.len(), 1);
        assert!(!lines[0].bullet);
        assert_eq!(lines[0].spans, vec![plain("Quiet after ten.")]);
    }

    #[test]
    fn each_tag_maps_to_its_style() {
        for (input, check) in [
            ("<b>x</b>", Box::new(|s: &Span| s.bold) as Box<dyn Fn(&Span) -> bool>),
            ("<i>x</i>", Box::new(|s: &Span| s.italic)),
            ("<mark>x</mark>", Box::new(|s: &Span| s.highlight)),
            ("<u>x</u>", Box::new(|s: &Span| s.underline)),
        ] {
            let lines = render(input);
            assert_eq!(lines[0].spans.len(), 1, "input: {input}");
            assert_eq!(lines[0].spans[0].text, "x");
            assert!(check(&lines[0].spans[0]), "input: {input}");
        }
    }

    #[test]
    fn styled_run_splits_surrounding_text() {
        let lines = render("keep the <b>kitchen</b> clean");
        let spans = &lines[0].spans;
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[0], plain("keep the "));
        assert_eq!(spans[1].text, "kitchen");
        assert!(spans[1].bold);
        assert_eq!(spans[2], plain(" clean"));
    }

    #[test]
    fn tags_nest() {
        let lines = render("<b>very <mark>important</mark></b>");
        let spans = &lines[0].spans;
        assert_eq!(spans.len(), 2);
        assert!(spans[0].bold && !spans[0].highlight);
        assert_eq!(spans[0].text, "very ");
        assert!(spans[1].bold && spans[1].highlight);
        assert_eq!(spans[1].text, "important");
    }

    #[test]
    fn unclosed_tag_is_literal() {
        let lines = render("<b>never closed");
        assert_eq!(lines[0].spans, vec![plain("<b>never closed")]);
    }

    #[test]
    fn unknown_tag_is_literal() {
        let lines = render("<script>alert(1)</script>");
        assert_eq!(lines[0].spans, vec![plain("<script>alert(1)</script>")]);
    }

    #[test]
    fn bullet_markers_are_recognized_and_stripped() {
        for marker in ["•", "-", "→"] {
            let lines = render(&format!("{marker} take out the trash"));
            assert!(lines[0].bullet, "marker: {marker}");
            assert_eq!(lines[0].spans, vec![plain("take out the trash")]);
        }
    }

    #[test]
    fn bullet_line_keeps_inline_styles() {
        let lines = render("• <mark>no guests</mark> after quiet hours");
        assert!(lines[0].bullet);
        assert!(lines[0].spans[0].highlight);
    }

    #[test]
    fn blank_lines_are_preserved() {
        let lines = render("first\n\nsecond");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].spans.is_empty());
    }

    #[test]
    fn lines_serialize_for_the_api() {
        let lines = render("• <b>x</b>");
        let json = serde_json::to_value(&lines).unwrap();
        assert_eq!(json[0]["bullet"], true);
        assert_eq!(json[0]["spans"][0]["text"], "x");
        assert_eq!(json[0]["spans"][0]["bold"], true);
    }

    #[test]
    fn earliest_close_wins() {
        let lines = render("<b>a</b>b</b>");
        let spans = &lines[0].spans;
        assert_eq!(spans[0].text, "a");
        assert!(spans[0].bold);
        assert_eq!(spans[1], plain("b</b>"));
    }
}
