/// A stretch of paragraph text with uniform emphasis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub bold: bool,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), bold: false }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self { text: text.into(), bold: true }
    }
}

/// Split `**bold**` spans out of a line. An unmatched `**` stays literal.
pub fn parse_runs(text: &str) -> Vec<TextRun> {
    let mut runs = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("**") {
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("**") else {
            break;
        };
        if open > 0 {
            runs.push(TextRun::plain(&rest[..open]));
        }
        if close > 0 {
            runs.push(TextRun::bold(&after_open[..close]));
        }
        rest = &after_open[close + 2..];
    }

    if !rest.is_empty() {
        runs.push(TextRun::plain(rest));
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_one_run() {
        assert_eq!(parse_runs("hello"), vec![TextRun::plain("hello")]);
    }

    #[test]
    fn bold_label_then_text() {
        assert_eq!(
            parse_runs("**Objective:** validate login"),
            vec![TextRun::bold("Objective:"), TextRun::plain(" validate login")]
        );
    }

    #[test]
    fn unmatched_marker_stays_literal() {
        assert_eq!(parse_runs("a ** b"), vec![TextRun::plain("a ** b")]);
    }

    #[test]
    fn empty_bold_span_is_dropped() {
        assert_eq!(parse_runs("x****y"), vec![TextRun::plain("x"), TextRun::plain("y")]);
    }
}
