//! Splitting raw model output into an answer and its reasoning.

use regex::Regex;

/// A model response split into its parts.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub answer: String,
    /// `None` when the response had no reasoning section at all.
    pub reasoning: Option<String>,
}

/// Extracts answer and reasoning from raw generated text.
pub trait ResponseParser: Send + Sync {
    fn parse(&self, raw: &str) -> ParsedResponse;
}

/// Parser for `Answer: ...` / `Reasoning: ...` sections.
///
/// Headings are case-insensitive, may start a line with markdown heading
/// marks, and may be wrapped in `**` or `__`. Text without any heading is
/// taken as the answer.
pub struct SectionParser {
    heading: Regex,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Answer,
    Reasoning,
}

impl SectionParser {
    pub fn new() -> Self {
        let heading = Regex::new(
            r"(?imx)
            ^[\ \t]*
            (?:\#{1,6}[\ \t]*)?      # markdown heading
            (?:\*\*|__)?[\ \t]*       # opening emphasis
            (answer|reasoning)
            [\ \t]*(?:\*\*|__)?[\ \t]*  # emphasis closed before the colon
            :
            [\ \t]*(?:\*\*|__)?       # emphasis closed after the colon
        ",
        )
        .expect("Invalid regex");
        Self { heading }
    }
}

impl Default for SectionParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseParser for SectionParser {
    fn parse(&self, raw: &str) -> ParsedResponse {
        let headings: Vec<(Section, usize, usize)> = self
            .heading
            .captures_iter(raw)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let section = if caps[1].eq_ignore_ascii_case("answer") {
                    Section::Answer
                } else {
                    Section::Reasoning
                };
                Some((section, whole.start(), whole.end()))
            })
            .collect();

        let body = |wanted: Section| -> Option<String> {
            headings
                .iter()
                .enumerate()
                .find(|(_, (section, _, _))| *section == wanted)
                .map(|(i, (_, _, end))| {
                    let stop = headings.get(i + 1).map(|h| h.1).unwrap_or(raw.len());
                    raw[*end..stop].trim().to_string()
                })
        };

        let reasoning = body(Section::Reasoning);
        let answer = match body(Section::Answer) {
            Some(answer) if !answer.is_empty() => answer,
            _ => {
                // No usable answer heading: whatever precedes the first heading.
                let stop = headings.first().map(|h| h.1).unwrap_or(raw.len());
                raw[..stop].trim().to_string()
            }
        };

        ParsedResponse { answer, reasoning }
    }
}
