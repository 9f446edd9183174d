//! Core identity types shared across the pipeline.
//!
//! Symbols are identified structurally, never through string-encoded composite
//! keys: a member is an (owner, name, descriptor) triple and an argument is a
//! member plus a position. The textual forms (`owner.name(desc)`,
//! `owner.name;;desc`) exist only at the match-file boundary in
//! [`crate::matches`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SurveyorError};

/// Internal name of the constructor member in class files.
pub const CONSTRUCTOR_NAME: &str = "<init>";

// ============================================================================
// Name Kinds
// ============================================================================

/// The four kinds of names the ledger mints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NameKind {
    Class,
    Method,
    Field,
    Arg,
}

impl NameKind {
    /// Tag used in the ledger file and as the minted-name prefix.
    pub fn tag(&self) -> &'static str {
        match self {
            NameKind::Class => "CLASS",
            NameKind::Method => "METHOD",
            NameKind::Field => "FIELD",
            NameKind::Arg => "ARG",
        }
    }

    /// Prefix of names minted for this kind (`class_N`, `method_N`, ...).
    pub fn prefix(&self) -> &'static str {
        match self {
            NameKind::Class => "class",
            NameKind::Method => "method",
            NameKind::Field => "field",
            NameKind::Arg => "param",
        }
    }

    /// Parse a ledger tag back into a kind.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "CLASS" => Some(NameKind::Class),
            "METHOD" => Some(NameKind::Method),
            "FIELD" => Some(NameKind::Field),
            "ARG" => Some(NameKind::Arg),
            _ => None,
        }
    }
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ============================================================================
// Member Identity
// ============================================================================

/// Structured identity of a method or field: owning class, own name, and
/// type descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberKey {
    /// Internal name of the owning class (`a`, `a$b`, `com/example/Foo`).
    pub owner: String,
    /// Member name as it appears in the artifact.
    pub name: String,
    /// Method descriptor (`(I)V`) or field value descriptor (`J`, `Lfoo;`).
    pub desc: String,
}

impl MemberKey {
    /// Create a member key.
    pub fn new(owner: impl Into<String>, name: impl Into<String>, desc: impl Into<String>) -> Self {
        MemberKey {
            owner: owner.into(),
            name: name.into(),
            desc: desc.into(),
        }
    }

    /// Whether this member is a constructor.
    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }
}

impl fmt::Display for MemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.desc.starts_with('(') {
            write!(f, "{}.{}{}", self.owner, self.name, self.desc)
        } else {
            write!(f, "{}.{}:{}", self.owner, self.name, self.desc)
        }
    }
}

/// Identity of a method argument: the method plus a zero-based position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArgKey {
    pub method: MemberKey,
    pub index: usize,
}

impl ArgKey {
    pub fn new(method: MemberKey, index: usize) -> Self {
        ArgKey { method, index }
    }
}

// ============================================================================
// Class Name Helpers
// ============================================================================

/// Whether a class's internal name places it in a package.
///
/// Obfuscators emit package-less names; anything already packaged is not an
/// obfuscated class and keeps its name.
pub fn in_package(name: &str) -> bool {
    name.contains('/')
}

/// Whether a class name denotes an inner class.
pub fn is_inner(name: &str) -> bool {
    name.contains('$')
}

/// The `$`-separated nesting chain of a class name, outermost first.
pub fn nesting_chain(name: &str) -> Vec<&str> {
    name.split('$').collect()
}

/// Innermost simple name of a (possibly nested) class.
pub fn innermost(name: &str) -> &str {
    name.rsplit('$').next().unwrap_or(name)
}

/// Whether the innermost simple name is purely numeric (anonymous class).
pub fn is_anonymous(name: &str) -> bool {
    let simple = innermost(name);
    !simple.is_empty() && simple.bytes().all(|b| b.is_ascii_digit())
}

// ============================================================================
// Descriptor Parsing
// ============================================================================

/// Count the declared arguments of a method descriptor.
///
/// Walks the parenthesized parameter list of a JVM-style descriptor; fails
/// with an internal error on malformed input since descriptors come from the
/// structural index, not from user files.
pub fn argument_count(desc: &str) -> Result<usize> {
    let inner = desc
        .strip_prefix('(')
        .and_then(|rest| rest.split_once(')'))
        .map(|(params, _)| params)
        .ok_or_else(|| SurveyorError::internal(format!("malformed method descriptor: {desc}")))?;

    let mut count = 0;
    let bytes = inner.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'[' => {
                i += 1;
                continue;
            }
            b'L' => {
                let end = inner[i..]
                    .find(';')
                    .ok_or_else(|| {
                        SurveyorError::internal(format!("unterminated object type in: {desc}"))
                    })?;
                i += end + 1;
            }
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' => {
                i += 1;
            }
            other => {
                return Err(SurveyorError::internal(format!(
                    "unexpected descriptor byte '{}' in: {desc}",
                    other as char
                )));
            }
        }
        count += 1;
    }
    Ok(count)
}

// ============================================================================
// Identifier Validation
// ============================================================================

/// Reserved words that can never be used as member names in sources.
const RESERVED_WORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally", "float",
    "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long",
    "native", "new", "package", "private", "protected", "public", "return", "short", "static",
    "strictfp", "super", "switch", "synchronized", "this", "throw", "throws", "transient", "true",
    "false", "null", "try", "void", "volatile", "while",
];

/// Check that a name is a legal source identifier.
///
/// The constructor marker passes unconditionally; it is never emitted as a
/// source-level name. A failing name is a per-symbol skip, not an error, so
/// this returns a plain bool.
pub fn is_valid_identifier(name: &str) -> bool {
    if name == CONSTRUCTOR_NAME {
        return true;
    }
    if RESERVED_WORDS.contains(&name) {
        return false;
    }
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_' || first == '$') {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    mod name_kind_tests {
        use super::*;

        #[test]
        fn tag_round_trips() {
            for kind in [NameKind::Class, NameKind::Method, NameKind::Field, NameKind::Arg] {
                assert_eq!(NameKind::from_tag(kind.tag()), Some(kind));
            }
            assert_eq!(NameKind::from_tag("BOGUS"), None);
        }
    }

    mod member_key_tests {
        use super::*;

        #[test]
        fn display_method_concatenates_descriptor() {
            let key = MemberKey::new("a", "b", "(I)V");
            assert_eq!(key.to_string(), "a.b(I)V");
        }

        #[test]
        fn display_field_separates_descriptor() {
            let key = MemberKey::new("a", "c", "J");
            assert_eq!(key.to_string(), "a.c:J");
        }

        #[test]
        fn constructor_detection() {
            assert!(MemberKey::new("a", "<init>", "()V").is_constructor());
            assert!(!MemberKey::new("a", "init", "()V").is_constructor());
        }
    }

    mod class_name_tests {
        use super::*;

        #[test]
        fn package_and_inner_checks() {
            assert!(in_package("com/example/Foo"));
            assert!(!in_package("a"));
            assert!(is_inner("a$b"));
            assert!(!is_inner("a"));
        }

        #[test]
        fn nesting_chain_splits_outermost_first() {
            assert_eq!(nesting_chain("a$b$c"), vec!["a", "b", "c"]);
            assert_eq!(nesting_chain("a"), vec!["a"]);
        }

        #[test]
        fn anonymous_classes_have_numeric_simple_names() {
            assert!(is_anonymous("a$1"));
            assert!(is_anonymous("a$b$12"));
            assert!(!is_anonymous("a$b"));
            assert!(!is_anonymous("a"));
        }
    }

    mod descriptor_tests {
        use super::*;

        #[test]
        fn counts_primitives_objects_and_arrays() {
            assert_eq!(argument_count("()V").unwrap(), 0);
            assert_eq!(argument_count("(I)V").unwrap(), 1);
            assert_eq!(argument_count("(IJ)V").unwrap(), 2);
            assert_eq!(argument_count("(Ljava/lang/String;I)V").unwrap(), 2);
            assert_eq!(argument_count("([[I[Ljava/lang/String;D)J").unwrap(), 3);
        }

        #[test]
        fn malformed_descriptor_is_an_error() {
            assert!(argument_count("I)V").is_err());
            assert!(argument_count("(Lunterminated)V").is_err());
            assert!(argument_count("(Q)V").is_err());
        }
    }

    mod identifier_tests {
        use super::*;

        #[test]
        fn accepts_ordinary_identifiers() {
            assert!(is_valid_identifier("a"));
            assert!(is_valid_identifier("ab"));
            assert!(is_valid_identifier("_x$1"));
        }

        #[test]
        fn rejects_reserved_words_and_bad_characters() {
            assert!(!is_valid_identifier("do"));
            assert!(!is_valid_identifier("if"));
            assert!(!is_valid_identifier("1a"));
            assert!(!is_valid_identifier(""));
            assert!(!is_valid_identifier("a-b"));
        }

        #[test]
        fn constructor_marker_is_always_valid() {
            assert!(is_valid_identifier(CONSTRUCTOR_NAME));
        }
    }
}
