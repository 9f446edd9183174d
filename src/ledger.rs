//! The naming ledger: an append-only record of every name ever minted.
//!
//! The record count per kind doubles as the numeric suffix source for the
//! next name of that kind (`class_N` where N is the number of class records),
//! so the ledger is both the durable history and the generator of fresh
//! names. Records are never removed; resuming from a persisted ledger
//! continues numbering exactly where the previous run stopped.
//!
//! The on-disk format is one record per line, `<KIND>\t<name>[\t<desc>]`,
//! with `METHOD` and `FIELD` carrying the descriptor seen at minting time.
//! Parsing is strict: a malformed line fails the whole load, since an
//! inconsistent ledger risks handing out duplicate names.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{Result, SurveyorError};
use crate::types::NameKind;

/// One minted name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRecord {
    pub kind: NameKind,
    pub name: String,
    /// Descriptor at minting time; present for methods and fields only.
    pub desc: Option<String>,
}

/// Append-only mint log, grouped by kind.
#[derive(Debug, Clone, Default)]
pub struct NamingLedger {
    classes: Vec<NameRecord>,
    methods: Vec<NameRecord>,
    fields: Vec<NameRecord>,
    args: Vec<NameRecord>,
}

impl NamingLedger {
    /// A fresh ledger with no history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a persisted ledger, or start fresh if the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("no ledger at {}, starting fresh", path.display());
            return Ok(Self::new());
        }
        let content = fs::read_to_string(path)?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse the line-oriented ledger format.
    pub fn parse(content: &str, origin: &str) -> Result<Self> {
        let mut ledger = Self::new();
        for (lineno, line) in content.lines().enumerate() {
            let lineno = lineno + 1;
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split('\t');
            let tag = parts.next().unwrap_or_default();
            let kind = NameKind::from_tag(tag).ok_or_else(|| {
                SurveyorError::format(origin, lineno, format!("unknown record kind '{tag}'"))
            })?;
            let name = parts
                .next()
                .filter(|n| !n.is_empty())
                .ok_or_else(|| SurveyorError::format(origin, lineno, "missing name field"))?
                .to_string();
            let desc = parts.next().map(str::to_string);
            if parts.next().is_some() {
                return Err(SurveyorError::format(origin, lineno, "too many fields"));
            }
            match kind {
                NameKind::Method | NameKind::Field => {
                    if desc.is_none() {
                        return Err(SurveyorError::format(
                            origin,
                            lineno,
                            format!("{} record is missing its descriptor", kind.tag()),
                        ));
                    }
                }
                NameKind::Class | NameKind::Arg => {
                    if desc.is_some() {
                        return Err(SurveyorError::format(
                            origin,
                            lineno,
                            format!("{} record carries an unexpected extra field", kind.tag()),
                        ));
                    }
                }
            }
            ledger.records_mut(kind).push(NameRecord { kind, name, desc });
        }
        Ok(ledger)
    }

    /// Mint the next class name.
    pub fn next_class_name(&mut self) -> String {
        let name = format!("{}_{}", NameKind::Class.prefix(), self.classes.len());
        self.classes.push(NameRecord {
            kind: NameKind::Class,
            name: name.clone(),
            desc: None,
        });
        name
    }

    /// Mint the next method name, recording the descriptor it was minted for.
    pub fn next_method_name(&mut self, desc: &str) -> String {
        let name = format!("{}_{}", NameKind::Method.prefix(), self.methods.len());
        self.methods.push(NameRecord {
            kind: NameKind::Method,
            name: name.clone(),
            desc: Some(desc.to_string()),
        });
        name
    }

    /// Mint the next field name, recording the descriptor it was minted for.
    pub fn next_field_name(&mut self, desc: &str) -> String {
        let name = format!("{}_{}", NameKind::Field.prefix(), self.fields.len());
        self.fields.push(NameRecord {
            kind: NameKind::Field,
            name: name.clone(),
            desc: Some(desc.to_string()),
        });
        name
    }

    /// Mint the next argument name for a method.
    ///
    /// Argument numbering is scoped per method, not global: the suffix counts
    /// existing argument records belonging to the same method ordinal, so two
    /// methods each get `param_<m>_0`, `param_<m>_1`, ... independently.
    pub fn next_argument_name(&mut self, method_name: &str) -> Result<String> {
        let ordinal = method_name
            .rsplit('_')
            .next()
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or_else(|| {
                SurveyorError::internal(format!(
                    "cannot derive a method ordinal from '{method_name}'"
                ))
            })?;
        let scope_prefix = format!("{}_{}_", NameKind::Arg.prefix(), ordinal);
        let existing = self
            .args
            .iter()
            .filter(|r| r.name.starts_with(&scope_prefix))
            .count();
        let name = format!("{scope_prefix}{existing}");
        self.args.push(NameRecord {
            kind: NameKind::Arg,
            name: name.clone(),
            desc: None,
        });
        Ok(name)
    }

    /// Number of records of a kind. Also the suffix the next mint will use.
    pub fn count(&self, kind: NameKind) -> usize {
        self.records(kind).len()
    }

    /// Serialize all records in class, method, field, argument order and
    /// overwrite the destination atomically. Callers must skip this entirely
    /// on simulated runs.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let mut out = String::new();
        for record in self
            .classes
            .iter()
            .chain(&self.methods)
            .chain(&self.fields)
            .chain(&self.args)
        {
            out.push_str(record.kind.tag());
            out.push('\t');
            out.push_str(&record.name);
            if let Some(desc) = &record.desc {
                out.push('\t');
                out.push_str(desc);
            }
            out.push('\n');
        }
        crate::util::atomic_write(path, out.as_bytes())?;
        Ok(())
    }

    fn records(&self, kind: NameKind) -> &Vec<NameRecord> {
        match kind {
            NameKind::Class => &self.classes,
            NameKind::Method => &self.methods,
            NameKind::Field => &self.fields,
            NameKind::Arg => &self.args,
        }
    }

    fn records_mut(&mut self, kind: NameKind) -> &mut Vec<NameRecord> {
        match kind {
            NameKind::Class => &mut self.classes,
            NameKind::Method => &mut self.methods,
            NameKind::Field => &mut self.fields,
            NameKind::Arg => &mut self.args,
        }
    }
}
