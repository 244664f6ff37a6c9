//! Output AST and rendering for formatted citations.
//!
//! Evaluation builds an [`Output`] tree; rendering walks it once, applying
//! formatting markup for the requested [`OutputFormat`] and the two
//! punctuation rules that depend on neighbouring text:
//!
//! - a `.` that follows text already ending in `.`, `?`, or `!` is dropped
//!   (and a `,` after a `,`),
//! - with punctuation-in-quote, a `.` or `,` that follows a closing quote
//!   moves inside it.

use papervista_csl::{FontStyle, FontWeight, Formatting, TextCase};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const OPEN_QUOTE: char = '“';
const CLOSE_QUOTE: char = '”';

/// Markup flavour of a rendered citation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// No markup.
    #[default]
    Plain,
    /// `<i>`, `<b>`, and `<a href>`, with text escaped.
    Html,
    /// `*italic*` and `**bold**`.
    Markdown,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "plain" | "text" => Ok(OutputFormat::Plain),
            "html" => Ok(OutputFormat::Html),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!(
                "unknown output format '{}' (expected plain, html, or markdown)",
                other
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Plain => "plain",
            OutputFormat::Html => "html",
            OutputFormat::Markdown => "markdown",
        };
        f.write_str(name)
    }
}

/// Options that affect rendering but not evaluation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    pub format: OutputFormat,
    pub punctuation_in_quote: bool,
}

/// Intermediate output representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// A formatted group of children.
    Formatted {
        formatting: Formatting,
        children: Vec<Output>,
    },
    /// A hyperlink wrapping children.
    Linked { url: String, children: Vec<Output> },
    /// Literal text content.
    Literal(String),
    /// Empty output.
    Null,
}

impl Output {
    /// Create a literal text node.
    pub fn literal(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            Output::Null
        } else {
            Output::Literal(s)
        }
    }

    /// Create a formatted node with children.
    pub fn formatted(formatting: Formatting, children: Vec<Output>) -> Self {
        let children: Vec<_> = children.into_iter().filter(|c| !c.is_null()).collect();
        if children.is_empty() {
            Output::Null
        } else {
            Output::Formatted {
                formatting,
                children,
            }
        }
    }

    /// Create a linked node.
    pub fn linked(url: impl Into<String>, children: Vec<Output>) -> Self {
        let children: Vec<_> = children.into_iter().filter(|c| !c.is_null()).collect();
        if children.is_empty() {
            Output::Null
        } else {
            Output::Linked {
                url: url.into(),
                children,
            }
        }
    }

    /// Create a sequence of outputs.
    pub fn sequence(children: Vec<Output>) -> Self {
        let mut children: Vec<_> = children.into_iter().filter(|c| !c.is_null()).collect();
        match children.len() {
            0 => Output::Null,
            1 => children.remove(0),
            _ => Output::Formatted {
                formatting: Formatting::default(),
                children,
            },
        }
    }

    /// Check if this output is empty.
    pub fn is_null(&self) -> bool {
        match self {
            Output::Null => true,
            Output::Literal(s) => s.is_empty(),
            Output::Formatted { children, .. } | Output::Linked { children, .. } => {
                children.iter().all(|c| c.is_null())
            }
        }
    }

    /// Render to a string.
    pub fn render(&self, options: &RenderOptions) -> String {
        let mut renderer = Renderer::new(options);
        renderer.render(self);
        renderer.buf
    }

    /// Render as plain text with default options.
    pub fn render_plain(&self) -> String {
        self.render(&RenderOptions::default())
    }
}

/// Join multiple outputs with a delimiter, skipping empty ones.
pub fn join_outputs(outputs: Vec<Output>, delimiter: &str) -> Output {
    let mut non_null: Vec<_> = outputs.into_iter().filter(|o| !o.is_null()).collect();

    if non_null.len() <= 1 {
        return non_null.pop().unwrap_or(Output::Null);
    }

    let mut children = Vec::with_capacity(non_null.len() * 2);
    for (i, output) in non_null.into_iter().enumerate() {
        if i > 0 && !delimiter.is_empty() {
            children.push(Output::Literal(delimiter.to_string()));
        }
        children.push(output);
    }

    Output::Formatted {
        formatting: Formatting::default(),
        children,
    }
}

struct Renderer<'a> {
    options: &'a RenderOptions,
    buf: String,
    /// Last character of visible text (markup excluded).
    last_char: Option<char>,
}

impl<'a> Renderer<'a> {
    fn new(options: &'a RenderOptions) -> Self {
        Self {
            options,
            buf: String::new(),
            last_char: None,
        }
    }

    fn render(&mut self, output: &Output) {
        match output {
            Output::Null => {}
            Output::Literal(s) => self.push_text(s),
            Output::Formatted {
                formatting,
                children,
            } => self.render_formatted(formatting, children),
            Output::Linked { url, children } => {
                let html = self.options.format == OutputFormat::Html;
                if html {
                    self.push_markup(&format!("<a href=\"{}\">", escape_html(url)));
                }
                for child in children {
                    self.render(child);
                }
                if html {
                    self.push_markup("</a>");
                }
            }
        }
    }

    /// Order: prefix, text case and strip-periods, markup, quotes, suffix.
    fn render_formatted(&mut self, formatting: &Formatting, children: &[Output]) {
        if children.iter().all(|c| c.is_null()) {
            return;
        }

        if let Some(prefix) = &formatting.prefix {
            self.push_text(prefix);
        }

        let (open, close) = markup(self.options.format, formatting);
        if formatting.quotes {
            self.push_quote(OPEN_QUOTE);
        }
        self.push_markup(&open);

        if formatting.text_case.is_some() || formatting.strip_periods {
            let mut first = true;
            let transformed = transform_text(children, formatting, &mut first);
            for child in &transformed {
                self.render(child);
            }
        } else {
            for child in children {
                self.render(child);
            }
        }

        self.push_markup(&close);
        if formatting.quotes {
            self.push_quote(CLOSE_QUOTE);
        }

        if let Some(suffix) = &formatting.suffix {
            self.push_text(suffix);
        }
    }

    fn push_markup(&mut self, markup: &str) {
        self.buf.push_str(markup);
    }

    fn push_quote(&mut self, quote: char) {
        self.buf.push(quote);
        self.last_char = Some(quote);
    }

    fn push_text(&mut self, text: &str) {
        let mut text = text;

        if let Some(first) = text.chars().next() {
            let duplicate = match first {
                '.' => matches!(self.last_char, Some('.' | '?' | '!')),
                ',' => self.last_char == Some(','),
                _ => false,
            };
            if duplicate {
                text = &text[first.len_utf8()..];
            } else if matches!(first, '.' | ',')
                && self.options.punctuation_in_quote
                && self.buf.ends_with(CLOSE_QUOTE)
            {
                let quote_at = self.buf.len() - CLOSE_QUOTE.len_utf8();
                let before = self.buf[..quote_at].chars().last();
                if !(first == '.' && matches!(before, Some('.' | '?' | '!'))) {
                    self.buf.insert(quote_at, first);
                }
                text = &text[first.len_utf8()..];
            }
        }

        if text.is_empty() {
            return;
        }

        match self.options.format {
            OutputFormat::Html => self.buf.push_str(&escape_html(text)),
            OutputFormat::Markdown => self.buf.push_str(&text.replace('*', "\\*")),
            OutputFormat::Plain => self.buf.push_str(text),
        }
        self.last_char = text.chars().last();
    }
}

fn markup(format: OutputFormat, formatting: &Formatting) -> (String, String) {
    let italic = formatting.font_style == Some(FontStyle::Italic);
    let bold = formatting.font_weight == Some(FontWeight::Bold);

    let (i_open, i_close, b_open, b_close) = match format {
        OutputFormat::Plain => return (String::new(), String::new()),
        OutputFormat::Html => ("<i>", "</i>", "<b>", "</b>"),
        OutputFormat::Markdown => ("*", "*", "**", "**"),
    };

    let mut open = String::new();
    let mut close = String::new();
    if bold {
        open.push_str(b_open);
    }
    if italic {
        open.push_str(i_open);
        close.push_str(i_close);
    }
    if bold {
        close.push_str(b_close);
    }
    (open, close)
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Apply text case and strip-periods to every literal under `children`.
///
/// `first` tracks whether the first word of the span is still ahead, for the
/// cases that only touch the first word.
fn transform_text(children: &[Output], formatting: &Formatting, first: &mut bool) -> Vec<Output> {
    children
        .iter()
        .map(|child| match child {
            Output::Literal(s) => {
                let mut text = apply_text_case(s, formatting.text_case, *first);
                if formatting.strip_periods {
                    text = text.replace('.', "");
                }
                if !s.trim().is_empty() {
                    *first = false;
                }
                Output::Literal(text)
            }
            Output::Formatted {
                formatting: inner,
                children,
            } => Output::Formatted {
                formatting: inner.clone(),
                children: transform_text(children, formatting, first),
            },
            Output::Linked { url, children } => Output::Linked {
                url: url.clone(),
                children: transform_text(children, formatting, first),
            },
            Output::Null => Output::Null,
        })
        .collect()
}

fn apply_text_case(text: &str, case: Option<TextCase>, at_start: bool) -> String {
    match case {
        None => text.to_string(),
        Some(TextCase::Lowercase) => text.to_lowercase(),
        Some(TextCase::Uppercase) => text.to_uppercase(),
        Some(TextCase::CapitalizeFirst) if at_start => capitalize_first(text),
        Some(TextCase::CapitalizeFirst) => text.to_string(),
        Some(TextCase::CapitalizeAll) => capitalize_all(text),
        Some(TextCase::Title) => title_case(text, at_start),
        Some(TextCase::Sentence) => sentence_case(text, at_start),
    }
}

/// Capitalize the first character.
pub(crate) fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

/// Capitalize the first character of each word, keeping the spacing.
fn capitalize_all(s: &str) -> String {
    map_words(s, |_, word| capitalize_first(word))
}

const MINOR_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "but", "by", "for", "from", "in", "into", "nor", "of", "on",
    "or", "the", "to", "with",
];

/// Title case: capitalize every word except minor words after the first.
fn title_case(s: &str, at_start: bool) -> String {
    map_words(s, |index, word| {
        let leading = at_start && index == 0;
        if !leading && MINOR_WORDS.contains(&word.to_lowercase().as_str()) {
            word.to_lowercase()
        } else {
            capitalize_first(word)
        }
    })
}

/// Sentence case: lowercase everything but the first word and acronyms.
fn sentence_case(s: &str, at_start: bool) -> String {
    map_words(s, |index, word| {
        let is_acronym = word.chars().filter(|c| c.is_alphabetic()).count() > 1
            && word.chars().all(|c| !c.is_lowercase());
        if is_acronym {
            word.to_string()
        } else if at_start && index == 0 {
            capitalize_first(&word.to_lowercase())
        } else {
            word.to_lowercase()
        }
    })
}

/// Apply `f(word_index, word)` to each whitespace-separated word.
fn map_words(s: &str, mut f: impl FnMut(usize, &str) -> String) -> String {
    let mut out = String::with_capacity(s.len());
    let mut index = 0;
    let mut word = String::new();
    for c in s.chars() {
        if c.is_whitespace() {
            if !word.is_empty() {
                out.push_str(&f(index, &word));
                index += 1;
                word.clear();
            }
            out.push(c);
        } else {
            word.push(c);
        }
    }
    if !word.is_empty() {
        out.push_str(&f(index, &word));
    }
    out
}
