//! Undoing XML escaping inside template tags of serialized XML.
//!
//! Serialization escapes `>`, `<`, `&`, `"` and `'` everywhere, including in
//! the literal tag text produced by the rewriter, where the expansion backend
//! needs them raw. Each entity rule only matches an entity preceded by a start
//! delimiter and followed by an end delimiter with no delimiter of the other
//! kind in between, so escaped text outside tags is never touched.
//!
//! Hyperlink targets using the private link scheme carry a percent-encoded
//! expression; they are decoded and the expression is marked safe so the
//! backend does not escape its result a second time.

use percent_encoding::percent_decode_str;
use regex::{Captures, Regex};
use std::borrow::Cow;

use super::patterns::{TagPatterns, compile};
use crate::core::{MalformedOutput, OdtError};

/// Entity and replacement, applied in this order.
const ENTITIES: [(&str, &str); 5] =
    [("&gt;", ">"), ("&lt;", "<"), ("&amp;", "&"), ("&quot;", "\""), ("&apos;", "'")];

#[derive(Debug, Clone)]
struct EntityRule {
    entity: &'static str,
    value: &'static str,
    pattern: Regex,
}

/// Rewrites serialized XML into source text for the expansion backend.
#[derive(Debug, Clone)]
pub struct EscapeNormalizer {
    rules: Vec<EntityRule>,
    link: Regex,
    variable: Regex,
    max_passes: usize,
}

impl EscapeNormalizer {
    pub fn new(patterns: &TagPatterns, link_scheme: &str, max_passes: usize) -> Result<Self, OdtError> {
        let d = patterns.delimiters();
        let starts = format!("{}|{}", regex::escape(&d.variable_start), regex::escape(&d.block_start));
        let ends = format!("{}|{}", regex::escape(&d.variable_end), regex::escape(&d.block_end));
        let start_chars = char_class(&[&d.variable_start, &d.block_start]);
        let end_chars = char_class(&[&d.variable_end, &d.block_end]);

        let rules = ENTITIES
            .iter()
            .map(|&(entity, value)| {
                let pattern = compile(&format!(
                    r"(?is)(({starts})[^{end_chars}]*?)({entity})([^{start_chars}]*?({ends}))",
                    entity = regex::escape(entity),
                ))?;
                Ok(EntityRule {
                    entity,
                    value,
                    pattern,
                })
            })
            .collect::<Result<Vec<_>, OdtError>>()?;

        let link = compile(&format!(r#"(?is)(xlink:href="){}:(.*?)(")"#, regex::escape(link_scheme)))?;

        Ok(Self {
            rules,
            link,
            variable: patterns.variable().clone(),
            max_passes: max_passes.max(1),
        })
    }

    /// Unescape entities inside tags, then rewrite private-scheme links.
    ///
    /// `mark_safe` turns an expression into the backend's "already escaped"
    /// form, for example `x` into ` x | safe `.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedOutput::UnescapeLimit`] when a rule still matches
    /// after the configured number of passes.
    pub fn normalize(&self, xml: &str, mark_safe: impl Fn(&str) -> String) -> Result<String, OdtError> {
        let mut text = xml.to_string();

        for rule in &self.rules {
            let mut passes = 0;
            loop {
                let next = match rule.pattern.replace_all(&text, |caps: &Captures<'_>| {
                    format!("{}{}{}", &caps[1], rule.value, &caps[4])
                }) {
                    Cow::Borrowed(_) => break,
                    Cow::Owned(next) => next,
                };
                if passes >= self.max_passes {
                    return Err(self.limit(rule.entity));
                }
                text = next;
                passes += 1;
            }
        }

        let mut passes = 0;
        loop {
            let next = match self.link.replace_all(&text, |caps: &Captures<'_>| {
                let payload = percent_decode_str(&caps[2]).decode_utf8_lossy();
                let expression = self.variable.replace_all(&payload, |inner: &Captures<'_>| {
                    format!("{}{}{}", &inner[1], mark_safe(&inner[2]), &inner[3])
                });
                format!("{}{}{}", &caps[1], expression, &caps[3])
            }) {
                Cow::Borrowed(_) => break,
                Cow::Owned(next) => next,
            };
            if passes >= self.max_passes {
                return Err(self.limit("link"));
            }
            text = next;
            passes += 1;
        }

        Ok(text)
    }

    fn limit(&self, entity: &str) -> OdtError {
        MalformedOutput::UnescapeLimit {
            entity: entity.to_string(),
            passes: self.max_passes,
        }
        .into()
    }
}

/// Escaped, deduplicated characters of `delimiters` for use inside `[^...]`.
fn char_class(delimiters: &[&String]) -> String {
    let mut seen: Vec<char> = Vec::new();
    for c in delimiters.iter().flat_map(|d| d.chars()) {
        if !seen.contains(&c) {
            seen.push(c);
        }
    }
    seen.iter().map(|c| regex::escape(&c.to_string())).collect()
}
