//! Predefined-macro tables.
//!
//! A `MacroTable` is the parsed form of a compiler's predefined-macro dump
//! (`c++ -dM -E -x c++ -`), optionally extended with `-D` switches from the
//! build invocation. It is the raw material the probe reads signals from.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

static DEFINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*#\s*define\s+([A-Za-z_][A-Za-z0-9_]*)(\([^)]*\))?(?:\s+(.*?))?\s*$")
        .expect("define pattern is valid")
});

/// A set of macro definitions, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroTable {
    defs: BTreeMap<String, String>,
}

impl MacroTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `#define NAME VALUE` lines. Other lines are ignored.
    ///
    /// Function-like macros are recorded by name with their replacement text.
    pub fn parse(text: &str) -> Self {
        let mut table = MacroTable::new();
        for line in text.lines() {
            if let Some(caps) = DEFINE_RE.captures(line) {
                let name = caps[1].to_string();
                let value = caps.get(3).map(|m| m.as_str()).unwrap_or("");
                table.defs.insert(name, value.to_string());
            }
        }
        table
    }

    /// Build a table from `-D` style switches (`NAME` or `NAME=VALUE`).
    pub fn from_switches<'a>(switches: impl IntoIterator<Item = &'a str>) -> Self {
        let mut table = MacroTable::new();
        table.extend_switches(switches);
        table
    }

    /// Add `-D` style switches; later definitions win.
    pub fn extend_switches<'a>(&mut self, switches: impl IntoIterator<Item = &'a str>) {
        for sw in switches {
            let sw = sw.strip_prefix("-D").unwrap_or(sw);
            match sw.split_once('=') {
                Some((name, value)) => self.insert(name, value),
                None => self.insert(sw, "1"),
            }
        }
    }

    /// Define a macro.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.defs.insert(name.into(), value.into());
    }

    /// Whether a macro is defined.
    pub fn is_defined(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    /// Raw replacement text of a macro.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.defs.get(name).map(|s| s.as_str())
    }

    /// Integer value of a macro, understanding C literal suffixes and hex.
    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(parse_c_integer)
    }

    /// Unsigned value of a macro.
    pub fn uint(&self, name: &str) -> Option<u64> {
        self.int(name).and_then(|v| u64::try_from(v).ok())
    }

    /// Whether a macro is defined to a nonzero integer.
    pub fn truthy(&self, name: &str) -> bool {
        self.int(name).is_some_and(|v| v != 0)
    }

    /// Names starting with `prefix`.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.defs
            .range(prefix.to_string()..)
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

/// Parse a C integer literal such as `201703L`, `0x10`, `(1)` or `-1`.
pub fn parse_c_integer(raw: &str) -> Option<i64> {
    let mut s = raw.trim();
    while let Some(inner) = s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        s = inner.trim();
    }

    let (negative, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest.trim()),
        None => (false, s),
    };

    let s = s.trim_end_matches(['u', 'U', 'l', 'L']);
    if s.is_empty() {
        return None;
    }

    let value = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if s.len() > 1 && s.starts_with('0') {
        i64::from_str_radix(&s[1..], 8).ok()?
    } else {
        s.parse::<i64>().ok()?
    };

    Some(if negative { -value } else { value })
}
