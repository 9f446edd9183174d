//! Cross-version match correlation.
//!
//! An external matching tool emits a nested, tab-indented text file pairing
//! symbols of the previous artifact version with symbols of the current one:
//!
//! ```text
//! c\t<Lold/class;>\t<Lnew/class;>
//! \tm\t<name><desc>\t<name><desc>
//! \tf\t<name>;;<desc>\t<name>;;<desc>
//! \t\tma\t<old position>\t<new position>
//! ```
//!
//! Member lines attach to the most recently opened class line; argument
//! lines attach to the most recently opened method line, and a class line
//! implicitly closes any open method. The parser is strict: a structurally
//! malformed line aborts the whole correlation, since partial correlation
//! could silently reclassify matched symbols as new.
//!
//! Lookups answer "what was this current-version symbol called in the old
//! version": each map is bijective and queried by its value side. A pair
//! reusing an already correlated identity on either side is a format error;
//! silently dropping one of two conflicting pairs would reclassify a matched
//! symbol as new.

use std::collections::HashMap;
use std::fs;
use std::hash::Hash;
use std::path::Path;

use crate::error::{Result, SurveyorError};
use crate::types::{ArgKey, MemberKey};

// ============================================================================
// Bijective Map
// ============================================================================

/// A bijective old-to-new mapping with O(1) lookup from either side.
#[derive(Debug, Clone)]
pub struct BiMap<K> {
    forward: HashMap<K, K>,
    reverse: HashMap<K, K>,
}

impl<K: Clone + Eq + Hash> BiMap<K> {
    fn new() -> Self {
        BiMap {
            forward: HashMap::new(),
            reverse: HashMap::new(),
        }
    }

    /// Insert a pair. Refuses to touch either map when the old or the new
    /// identity already participates in a pair.
    #[must_use]
    fn insert(&mut self, old: K, new: K) -> bool {
        if self.forward.contains_key(&old) || self.reverse.contains_key(&new) {
            return false;
        }
        self.reverse.insert(new.clone(), old.clone());
        self.forward.insert(old, new);
        true
    }

    /// The old-version identity correlated with a new-version identity.
    pub fn old_for(&self, new: &K) -> Option<&K> {
        self.reverse.get(new)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

impl<K: Clone + Eq + Hash> Default for BiMap<K> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Match Set
// ============================================================================

/// The four bijections produced by one correlation file.
#[derive(Debug, Clone, Default)]
pub struct MatchSet {
    pub classes: BiMap<String>,
    pub methods: BiMap<MemberKey>,
    pub fields: BiMap<MemberKey>,
    pub args: BiMap<ArgKey>,
}

impl MatchSet {
    /// Read and parse a correlation file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse the nested match format.
    pub fn parse(content: &str, origin: &str) -> Result<Self> {
        let mut set = MatchSet::default();
        // (old, new) of the innermost open class / method line.
        let mut current_class: Option<(String, String)> = None;
        let mut current_method: Option<(MemberKey, MemberKey)> = None;

        for (lineno, line) in content.lines().enumerate() {
            let lineno = lineno + 1;
            if line.is_empty() {
                continue;
            }

            if let Some(rest) = line.strip_prefix("c\t") {
                let (old_raw, new_raw) = split_pair(rest, origin, lineno)?;
                let old = strip_class_descriptor(old_raw, origin, lineno)?;
                let new = strip_class_descriptor(new_raw, origin, lineno)?;
                if !set.classes.insert(old.clone(), new.clone()) {
                    return Err(SurveyorError::format(
                        origin,
                        lineno,
                        format!("class '{old}' or '{new}' is correlated twice"),
                    ));
                }
                current_class = Some((old, new));
                current_method = None;
            } else if let Some(rest) = line.strip_prefix("\tm\t") {
                let (old_owner, new_owner) = open_class(&current_class, origin, lineno)?;
                let (old_raw, new_raw) = split_pair(rest, origin, lineno)?;
                let old = parse_method_text(old_owner, old_raw, origin, lineno)?;
                let new = parse_method_text(new_owner, new_raw, origin, lineno)?;
                if !set.methods.insert(old.clone(), new.clone()) {
                    return Err(SurveyorError::format(
                        origin,
                        lineno,
                        format!("method {old} or {new} is correlated twice"),
                    ));
                }
                current_method = Some((old, new));
            } else if let Some(rest) = line.strip_prefix("\tf\t") {
                let (old_owner, new_owner) = open_class(&current_class, origin, lineno)?;
                let (old_raw, new_raw) = split_pair(rest, origin, lineno)?;
                let old = parse_field_text(old_owner, old_raw, origin, lineno)?;
                let new = parse_field_text(new_owner, new_raw, origin, lineno)?;
                if !set.fields.insert(old.clone(), new.clone()) {
                    return Err(SurveyorError::format(
                        origin,
                        lineno,
                        format!("field {old} or {new} is correlated twice"),
                    ));
                }
                current_method = None;
            } else if let Some(rest) = line.strip_prefix("\t\tma\t") {
                let Some((old_method, new_method)) = current_method.clone() else {
                    return Err(SurveyorError::format(
                        origin,
                        lineno,
                        "argument line outside a method context",
                    ));
                };
                let (old_raw, new_raw) = split_pair(rest, origin, lineno)?;
                let old_pos = parse_position(old_raw, origin, lineno)?;
                let new_pos = parse_position(new_raw, origin, lineno)?;
                let inserted = set
                    .args
                    .insert(ArgKey::new(old_method, old_pos), ArgKey::new(new_method, new_pos));
                if !inserted {
                    return Err(SurveyorError::format(
                        origin,
                        lineno,
                        format!("argument position {new_pos} is correlated twice"),
                    ));
                }
            } else {
                return Err(SurveyorError::format(
                    origin,
                    lineno,
                    "unrecognized line structure",
                ));
            }
        }
        Ok(set)
    }

    /// Old name of a matched class, given its current obfuscated name.
    pub fn class_match(&self, new_name: &str) -> Option<&str> {
        self.classes.old_for(&new_name.to_string()).map(String::as_str)
    }

    /// Old identity of a matched method.
    pub fn method_match(&self, new_key: &MemberKey) -> Option<&MemberKey> {
        self.methods.old_for(new_key)
    }

    /// Old identity of a matched field.
    pub fn field_match(&self, new_key: &MemberKey) -> Option<&MemberKey> {
        self.fields.old_for(new_key)
    }

    /// Old argument position of a matched method argument.
    pub fn arg_match(&self, new_method: &MemberKey, index: usize) -> Option<&ArgKey> {
        self.args.old_for(&ArgKey::new(new_method.clone(), index))
    }
}

// ============================================================================
// Line-Level Parsing
// ============================================================================

fn split_pair<'a>(rest: &'a str, origin: &str, lineno: usize) -> Result<(&'a str, &'a str)> {
    match rest.split_once('\t') {
        Some((a, b)) if !a.is_empty() && !b.is_empty() && !b.contains('\t') => Ok((a, b)),
        _ => Err(SurveyorError::format(
            origin,
            lineno,
            "expected exactly two tab-separated fields",
        )),
    }
}

fn open_class<'a>(
    current: &'a Option<(String, String)>,
    origin: &str,
    lineno: usize,
) -> Result<(&'a str, &'a str)> {
    current
        .as_ref()
        .map(|(old, new)| (old.as_str(), new.as_str()))
        .ok_or_else(|| SurveyorError::format(origin, lineno, "member line outside a class context"))
}

/// Class names arrive wrapped as type descriptors: `Lcom/foo/Bar;`.
fn strip_class_descriptor(raw: &str, origin: &str, lineno: usize) -> Result<String> {
    raw.strip_prefix('L')
        .and_then(|r| r.strip_suffix(';'))
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            SurveyorError::format(origin, lineno, format!("malformed class descriptor '{raw}'"))
        })
}

/// Method text is `name(args)ret`.
fn parse_method_text(owner: &str, raw: &str, origin: &str, lineno: usize) -> Result<MemberKey> {
    let paren = raw.find('(').ok_or_else(|| {
        SurveyorError::format(origin, lineno, format!("method '{raw}' has no descriptor"))
    })?;
    if paren == 0 {
        return Err(SurveyorError::format(
            origin,
            lineno,
            format!("method '{raw}' has an empty name"),
        ));
    }
    Ok(MemberKey::new(owner, &raw[..paren], &raw[paren..]))
}

/// Field text is `name;;desc`.
fn parse_field_text(owner: &str, raw: &str, origin: &str, lineno: usize) -> Result<MemberKey> {
    match raw.split_once(";;") {
        Some((name, desc)) if !name.is_empty() && !desc.is_empty() => {
            Ok(MemberKey::new(owner, name, desc))
        }
        _ => Err(SurveyorError::format(
            origin,
            lineno,
            format!("malformed field entry '{raw}'"),
        )),
    }
}

fn parse_position(raw: &str, origin: &str, lineno: usize) -> Result<usize> {
    raw.parse().map_err(|_| {
        SurveyorError::format(origin, lineno, format!("'{raw}' is not a valid position"))
    })
}
