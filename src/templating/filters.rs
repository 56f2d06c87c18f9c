//! Tera filters and escaping for OpenDocument output.
//!
//! Values printed into an OpenDocument body must be valid XML character data
//! and should keep their layout, so the escape function used for autoescaping
//! also turns control characters into their ODF elements:
//!
//! | input  | output                |
//! |--------|-----------------------|
//! | `\n`   | `<text:line-break/>`  |
//! | `\t`   | `<text:tab/>`         |
//! | `\x0b` | `<text:space/>`       |
//! | `\x0c` | `<text:space/>`       |
//!
//! # Filters
//!
//! - `pad(length=5)`: zero-fill a value to `length` characters, keeping a
//!   leading sign in front (`{{ invoice.number | pad(length=6) }}`)
//! - `image`: resolve a file name against the configured media directory so
//!   the media pass can embed it (`<draw:frame draw:name="{{ logo | image }}">`)
//! - `markdown`: convert Markdown text to ODF markup, see [`super::markdown`]

use std::collections::HashMap;
use std::path::PathBuf;
use tera::Value;

/// Width used by `pad` when no `length` argument is given.
pub const DEFAULT_PAD_LENGTH: usize = 5;

/// Escape a printed value for an OpenDocument body.
pub fn escape_odf(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&#34;"),
            '\'' => output.push_str("&#39;"),
            '\n' => output.push_str("<text:line-break/>"),
            '\t' => output.push_str("<text:tab/>"),
            '\x0b' | '\x0c' => output.push_str("<text:space/>"),
            _ => output.push(c),
        }
    }
    output
}

/// The `pad` filter.
///
/// # Errors
///
/// Returns an error when `length` is not a non-negative integer.
pub fn pad(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let length = match args.get("length") {
        Some(length) => {
            let length = length
                .as_u64()
                .ok_or_else(|| tera::Error::msg("pad filter: `length` must be a non-negative integer"))?;
            usize::try_from(length).map_err(|e| tera::Error::msg(format!("pad filter: {e}")))?
        }
        None => DEFAULT_PAD_LENGTH,
    };

    let text = match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };

    Ok(Value::String(zero_fill(&text, length)))
}

fn zero_fill(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }

    let (sign, digits) = match text.chars().next() {
        Some(sign @ ('+' | '-')) => (Some(sign), &text[1..]),
        _ => (None, text),
    };

    let mut out = String::with_capacity(width);
    if let Some(sign) = sign {
        out.push(sign);
    }
    out.extend(std::iter::repeat_n('0', width - len));
    out.push_str(digits);
    out
}

/// Create the `image` filter resolving names against `media_dir`.
pub fn create_image_filter(media_dir: PathBuf) -> impl tera::Filter + 'static {
    move |value: &Value, _args: &HashMap<String, Value>| -> tera::Result<Value> {
        let name = value.as_str().ok_or_else(|| tera::Error::msg("image filter requires a file name"))?;
        Ok(Value::String(media_dir.join(name).to_string_lossy().into_owned()))
    }
}
