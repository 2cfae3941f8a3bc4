//! Raw cell classification and sanitization.
//!
//! Cell shape is decided once at parse time as a tagged variant and matched
//! exhaustively here. The sanitizer is a strict allow-list: anything it
//! cannot prove is inert plain text is rejected, because spreadsheet cells
//! are an injection surface for the downstream payment file.

/// Styling attributes of one rich-text run, as carried by the `<rPr>` block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStyle {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub strike: Option<bool>,
    pub color: Option<String>,
    pub size: Option<f64>,
    pub name: Option<String>,
    pub family: Option<String>,
    pub scheme: Option<String>,
}

impl RunStyle {
    /// True when any styling attribute is effectively present. Boolean flags
    /// explicitly set to false (val="0") do not count as styling.
    pub fn is_styled(&self) -> bool {
        self.bold == Some(true)
            || self.italic == Some(true)
            || self.underline == Some(true)
            || self.strike == Some(true)
            || self.color.is_some()
            || self.size.is_some()
            || self.name.is_some()
            || self.family.is_some()
            || self.scheme.is_some()
    }
}

/// One run of a rich-text cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RichTextRun {
    pub text: String,
    pub style: Option<RunStyle>,
}

/// A raw spreadsheet cell, classified at parse time. Ephemeral: exists only
/// while a row is being processed.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    RichText(Vec<RichTextRun>),
    /// A hyperlink-bearing cell; only its display text survives.
    Hyperlink { text: String },
    /// A formula-bearing cell. Always rejected, even when a cached value is
    /// available: formulas are untrusted input vectors.
    Formula(String),
    Unsupported,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ContentRejected {
    #[error("Cell contains styled text (bold, italic, underline, color, size, etc.)")]
    StyledText,
    #[error("Rich text run missing text content")]
    MissingRunText,
    #[error("Cell contains a formula - not allowed")]
    FormulaNotAllowed,
    #[error("Unsupported cell structure")]
    UnsupportedStructure,
}

/// Remove line breaks and surrounding whitespace from already-plain text.
fn clean(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c != '\n' && c != '\r' {
            out.push(c);
        }
    }
    out.trim().to_string()
}

/// Normalize a raw cell into a safe plain string.
///
/// Idempotent on plain text: sanitizing an already-sanitized string returns
/// the same string.
pub fn sanitize(cell: &RawCell) -> Result<String, ContentRejected> {
    match cell {
        RawCell::Empty => Ok(String::new()),
        RawCell::Text(text) => Ok(clean(text)),
        RawCell::Number(n) => Ok(n.to_string()),
        RawCell::RichText(runs) => {
            let mut combined = String::new();
            for run in runs {
                if run.text.is_empty() {
                    return Err(ContentRejected::MissingRunText);
                }
                if run.style.as_ref().is_some_and(RunStyle::is_styled) {
                    return Err(ContentRejected::StyledText);
                }
                combined.push_str(&run.text);
            }
            Ok(clean(&combined))
        }
        RawCell::Hyperlink { text } => Ok(clean(text)),
        RawCell::Formula(_) => Err(ContentRejected::FormulaNotAllowed),
        RawCell::Unsupported => Err(ContentRejected::UnsupportedStructure),
    }
}
