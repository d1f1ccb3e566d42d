//! Event body parsers.
//!
//! The body of a trace-cmd event has no fixed grammar. Most events print
//! whitespace-separated `key=value` pairs, some need a regular expression, and
//! `sched_switch` has two incompatible historical layouts. Every parser here is
//! best-effort: text it does not understand produces no fields (or a partial
//! set), never a panic.

use super::event::{FieldMap, FieldValue};
use crate::utils::config::SCHED_SWITCH_LEGACY_PATTERN;
use crate::utils::error::{BodyParseError, TraceError};
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Signature shared by all body parsers
pub type ParseFn = dyn Fn(&mut FieldMap, &str) -> Result<(), BodyParseError> + Send + Sync;

/// A callable that fills an event's fields from its body text
#[derive(Clone)]
pub struct BodyParser {
    kind: &'static str,
    func: Arc<ParseFn>,
}

impl BodyParser {
    /// Wrap a closure as a body parser
    pub fn from_fn<F>(func: F) -> Self
    where
        F: Fn(&mut FieldMap, &str) -> Result<(), BodyParseError> + Send + Sync + 'static,
    {
        Self {
            kind: "function",
            func: Arc::new(func),
        }
    }

    /// The `key=value` parser used for events without a registered parser
    pub fn key_value() -> Self {
        Self {
            kind: "key_value",
            func: Arc::new(|fields: &mut FieldMap, text: &str| {
                default_body_parser(fields, text);
                Ok(())
            }),
        }
    }

    /// Parser that extracts the named groups of `regex`
    pub fn regex(regex: Regex) -> Self {
        Self {
            kind: "regex",
            func: Arc::new(move |fields: &mut FieldMap, text: &str| {
                regex_body_parser(fields, &regex, text);
                Ok(())
            }),
        }
    }

    /// Compile `pattern` with `flags` and build a regex parser from it
    ///
    /// # Errors
    /// * `TraceError::InvalidPattern` - `pattern` is not a valid regex
    pub fn from_pattern(pattern: &str, flags: PatternFlags) -> Result<Self, TraceError> {
        Ok(Self::regex(flags.compile(pattern)?))
    }

    /// Parser for both `sched_switch` body layouts
    pub fn sched_switch() -> Self {
        Self {
            kind: "sched_switch",
            func: Arc::new(sched_switch_parser),
        }
    }

    /// Run the parser over `text`, inserting into `fields`
    pub fn parse(&self, fields: &mut FieldMap, text: &str) -> Result<(), BodyParseError> {
        (self.func)(fields, text)
    }
}

impl Default for BodyParser {
    fn default() -> Self {
        Self::key_value()
    }
}

impl fmt::Debug for BodyParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyParser").field("kind", &self.kind).finish()
    }
}

/// Compilation flags for pattern-string parsers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternFlags {
    pub case_insensitive: bool,
    pub multi_line: bool,
    pub dot_matches_new_line: bool,
    pub ignore_whitespace: bool,
}

impl PatternFlags {
    pub fn compile(&self, pattern: &str) -> Result<Regex, TraceError> {
        RegexBuilder::new(pattern)
            .case_insensitive(self.case_insensitive)
            .multi_line(self.multi_line)
            .dot_matches_new_line(self.dot_matches_new_line)
            .ignore_whitespace(self.ignore_whitespace)
            .build()
            .map_err(|source| TraceError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }
}

/// The forms a caller may register a parser in
///
/// All of them are normalized into a [`BodyParser`] at registration time.
#[derive(Debug, Clone)]
pub enum ParserSpec {
    Function(BodyParser),
    Pattern(Regex),
    Source { pattern: String, flags: PatternFlags },
}

impl ParserSpec {
    pub fn into_parser(self) -> Result<BodyParser, TraceError> {
        match self {
            Self::Function(parser) => Ok(parser),
            Self::Pattern(regex) => Ok(BodyParser::regex(regex)),
            Self::Source { pattern, flags } => BodyParser::from_pattern(&pattern, flags),
        }
    }
}

impl From<BodyParser> for ParserSpec {
    fn from(parser: BodyParser) -> Self {
        Self::Function(parser)
    }
}

impl From<Regex> for ParserSpec {
    fn from(regex: Regex) -> Self {
        Self::Pattern(regex)
    }
}

impl From<&str> for ParserSpec {
    fn from(pattern: &str) -> Self {
        Self::Source {
            pattern: pattern.to_string(),
            flags: PatternFlags::default(),
        }
    }
}

impl From<String> for ParserSpec {
    fn from(pattern: String) -> Self {
        Self::Source {
            pattern,
            flags: PatternFlags::default(),
        }
    }
}

/// Body parsers keyed by event name
///
/// Events without an entry fall back to the `key=value` parser.
#[derive(Debug, Clone)]
pub struct ParserRegistry {
    parsers: HashMap<String, BodyParser>,
    fallback: BodyParser,
}

impl ParserRegistry {
    /// Registry with no event-specific parsers at all
    pub fn empty() -> Self {
        Self {
            parsers: HashMap::new(),
            fallback: BodyParser::key_value(),
        }
    }

    /// Register (or replace) the parser for `event_name`
    ///
    /// # Errors
    /// * `TraceError::InvalidPattern` - a pattern source failed to compile
    pub fn register(
        &mut self,
        event_name: impl Into<String>,
        spec: impl Into<ParserSpec>,
    ) -> Result<(), TraceError> {
        let parser = spec.into().into_parser()?;
        self.parsers.insert(event_name.into(), parser);
        Ok(())
    }

    /// Parser to use for `event_name`
    pub fn get(&self, event_name: &str) -> &BodyParser {
        self.parsers.get(event_name).unwrap_or(&self.fallback)
    }

    pub fn contains(&self, event_name: &str) -> bool {
        self.parsers.contains_key(event_name)
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .parsers
            .insert("sched_switch".to_string(), BodyParser::sched_switch());
        registry
    }
}

/// Parse whitespace-separated `key=value` pairs
///
/// **Public** - the fallback parser for every event
///
/// The body has no pair delimiter other than whitespace before the next `=`,
/// and keys or values may themselves contain spaces. The text is split on `=`
/// and the last whitespace-delimited token of every interior fragment is taken
/// as the next key. This is a lossy heuristic: if the fragments do not pair up
/// nothing is parsed.
pub fn default_body_parser(fields: &mut FieldMap, text: &str) {
    let fragments: Vec<&str> = text.trim().split('=').collect();
    let last = fragments.len().saturating_sub(1);

    let mut parts: Vec<&str> = Vec::with_capacity(fragments.len() * 2);
    for (i, fragment) in fragments.iter().enumerate() {
        if i == 0 || i == last {
            parts.push(fragment.trim());
            continue;
        }
        match fragment.trim_end().rsplit_once(char::is_whitespace) {
            Some((value, key)) => {
                parts.push(value.trim());
                parts.push(key.trim());
            }
            None => parts.push(fragment.trim()),
        }
    }

    if parts.len() % 2 != 0 {
        return;
    }

    for pair in parts.chunks_exact(2) {
        fields.insert(pair[0].to_string(), FieldValue::int_or_string(pair[1]));
    }
}

/// Populate fields from the named groups of `regex`
///
/// **Public** - backs every pattern-based parser
///
/// No match leaves `fields` untouched. Groups that did not participate in the
/// match are skipped.
pub fn regex_body_parser(fields: &mut FieldMap, regex: &Regex, text: &str) {
    let Some(caps) = regex.captures(text) else {
        return;
    };

    for name in regex.capture_names().flatten() {
        if let Some(m) = caps.name(name) {
            fields.insert(name.to_string(), FieldValue::int_or_string(m.as_str()));
        }
    }
}

/// Parse a `sched_switch` body in either of its layouts
///
/// Older kernels print `prev:pid [prio] S ==> next:pid [prio]`, which contains
/// exactly two `=` (both in the arrow). Newer ones print `key=value` pairs with
/// the `==>` arrow in the middle. The `=` count is only a heuristic for telling
/// them apart.
pub fn sched_switch_parser(fields: &mut FieldMap, text: &str) -> Result<(), BodyParseError> {
    if text.matches('=').count() == 2 {
        let regex = legacy_sched_switch_regex()?;
        regex_body_parser(fields, regex, text);
    } else {
        default_body_parser(fields, &text.replace("==>", ""));
    }
    Ok(())
}

fn legacy_sched_switch_regex() -> Result<&'static Regex, BodyParseError> {
    static LEGACY: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

    LEGACY
        .get_or_init(|| Regex::new(SCHED_SWITCH_LEGACY_PATTERN))
        .as_ref()
        .map_err(|e| BodyParseError(e.to_string()))
}
