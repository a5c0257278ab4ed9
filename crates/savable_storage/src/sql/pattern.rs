//! Anchored literal patterns for the SQL `REGEXP` operator.
//!
//! Filters compile to `col REGEXP ?` with the operand escaped into an
//! anchored pattern: `^lit` for a prefix, `lit$` for a suffix and `^lit$`
//! for an exact match. SQLite has no built-in `REGEXP`, so the connection
//! registers [`regexp`], which understands exactly this pattern language and
//! compares bytes the same way [`FilterType::matches`] does.

use crate::query::FilterType;

const META: &[char] = &[
    '\\', '.', '^', '$', '|', '?', '*', '+', '(', ')', '[', ']', '{', '}',
];

/// Escapes an operand into an anchored pattern for `filter_type`.
pub fn to_pattern(filter_type: FilterType, operand: &str) -> String {
    let mut pattern = String::with_capacity(operand.len() + 4);
    if matches!(filter_type, FilterType::StartsWith | FilterType::ExactMatch) {
        pattern.push('^');
    }
    for c in operand.chars() {
        if META.contains(&c) {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    if matches!(filter_type, FilterType::EndsWith | FilterType::ExactMatch) {
        pattern.push('$');
    }
    pattern
}

/// A parsed anchored literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralPattern {
    literal: String,
    anchored_start: bool,
    anchored_end: bool,
}

impl LiteralPattern {
    /// Parses a pattern produced by [`to_pattern`].
    ///
    /// # Errors
    ///
    /// Returns a message if the pattern uses an unescaped metacharacter
    /// other than the anchors, or ends in a dangling escape.
    pub fn parse(pattern: &str) -> Result<Self, String> {
        let (anchored_start, body) = match pattern.strip_prefix('^') {
            Some(rest) => (true, rest),
            None => (false, pattern),
        };

        let mut literal = String::with_capacity(body.len());
        let mut anchored_end = false;
        let mut chars = body.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(escaped) => literal.push(escaped),
                    None => return Err(format!("dangling escape in pattern {pattern:?}")),
                },
                '$' if chars.peek().is_none() => anchored_end = true,
                c if META.contains(&c) => {
                    return Err(format!(
                        "unsupported metacharacter {c:?} in pattern {pattern:?}"
                    ))
                }
                c => literal.push(c),
            }
        }

        Ok(Self {
            literal,
            anchored_start,
            anchored_end,
        })
    }

    /// Tests a stored value against the pattern.
    pub fn is_match(&self, text: &str) -> bool {
        let (text, literal) = (text.as_bytes(), self.literal.as_bytes());
        match (self.anchored_start, self.anchored_end) {
            (true, true) => text == literal,
            (true, false) => text.starts_with(literal),
            (false, true) => text.ends_with(literal),
            (false, false) => {
                literal.is_empty() || text.windows(literal.len()).any(|w| w == literal)
            }
        }
    }
}

/// The `regexp(pattern, text)` SQL function.
pub(crate) fn regexp(ctx: &rusqlite::functions::Context<'_>) -> rusqlite::Result<bool> {
    let pattern: String = ctx.get(0)?;
    let text: String = ctx.get(1)?;
    let pattern = LiteralPattern::parse(&pattern)
        .map_err(|message| rusqlite::Error::UserFunctionError(message.into()))?;
    Ok(pattern.is_match(&text))
}
