//! Structural index of the artifact under analysis.
//!
//! Surveyor does not parse class files. An external bytecode indexer produces
//! this structure (classes, members, inheritance edges, and its own
//! per-symbol obfuscation verdicts); at the CLI boundary it arrives as JSON.
//! The index is read-only for the whole run.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::MemberKey;

/// Methods every class inherits from the root value type. These are never
/// obfuscated identifiers no matter what the rest of the heuristic says.
const UNIVERSAL_METHODS: &[(&str, &str)] = &[
    ("clone", "()Ljava/lang/Object;"),
    ("equals", "(Ljava/lang/Object;)Z"),
    ("finalize", "()V"),
    ("getClass", "()Ljava/lang/Class;"),
    ("hashCode", "()I"),
    ("notify", "()V"),
    ("notifyAll", "()V"),
    ("toString", "()Ljava/lang/String;"),
    ("wait", "()V"),
    ("wait", "(J)V"),
    ("wait", "(JI)V"),
];

// ============================================================================
// Declarations
// ============================================================================

/// Access properties of a declared member, as reported by the indexer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Access {
    #[serde(default)]
    pub private: bool,
    #[serde(default, rename = "static")]
    pub is_static: bool,
    #[serde(default)]
    pub synthetic: bool,
    #[serde(default)]
    pub bridge: bool,
}

/// A method declared by an indexed class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    pub desc: String,
    #[serde(default)]
    pub access: Access,
}

impl MethodDecl {
    pub fn new(name: impl Into<String>, desc: impl Into<String>) -> Self {
        MethodDecl {
            name: name.into(),
            desc: desc.into(),
            access: Access::default(),
        }
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn is_constructor(&self) -> bool {
        self.name == crate::types::CONSTRUCTOR_NAME
    }
}

/// A field declared by an indexed class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub desc: String,
    #[serde(default)]
    pub access: Access,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, desc: impl Into<String>) -> Self {
        FieldDecl {
            name: name.into(),
            desc: desc.into(),
            access: Access::default(),
        }
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }
}

/// A class in the artifact: its inheritance edges, member list, and the
/// indexer's obfuscation verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDecl {
    /// Internal name (`a`, `a$b`, `com/example/Foo`).
    pub name: String,
    #[serde(default)]
    pub superclass: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
    /// The indexer's detection verdict for this class. Accepted as given.
    #[serde(default = "default_obfuscated")]
    pub obfuscated: bool,
}

fn default_obfuscated() -> bool {
    true
}

impl ClassDecl {
    pub fn new(name: impl Into<String>) -> Self {
        ClassDecl {
            name: name.into(),
            superclass: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            obfuscated: true,
        }
    }

    pub fn with_superclass(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    pub fn with_interface(mut self, iface: impl Into<String>) -> Self {
        self.interfaces.push(iface.into());
        self
    }

    pub fn with_method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_obfuscated(mut self, obfuscated: bool) -> Self {
        self.obfuscated = obfuscated;
        self
    }

    /// Find a declared method by name and descriptor.
    pub fn method(&self, name: &str, desc: &str) -> Option<&MethodDecl> {
        self.methods.iter().find(|m| m.name == name && m.desc == desc)
    }

    /// Find a declared field by name and descriptor.
    pub fn field(&self, name: &str, desc: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name && f.desc == desc)
    }
}

// ============================================================================
// Artifact Index
// ============================================================================

/// Read-only queryable index over all classes of one artifact version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactIndex {
    /// Keyed by internal class name; BTreeMap keeps iteration deterministic.
    classes: BTreeMap<String, ClassDecl>,
}

impl ArtifactIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a serialized index produced by the external indexer.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn insert(&mut self, class: ClassDecl) {
        self.classes.insert(class.name.clone(), class);
    }

    pub fn class(&self, name: &str) -> Option<&ClassDecl> {
        self.classes.get(name)
    }

    pub fn contains_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// All classes, in deterministic (name) order. The generator re-sorts by
    /// obfuscation index before processing.
    pub fn classes(&self) -> impl Iterator<Item = &ClassDecl> {
        self.classes.values()
    }

    /// All (owner, method) pairs.
    pub fn methods(&self) -> impl Iterator<Item = (&ClassDecl, &MethodDecl)> {
        self.classes
            .values()
            .flat_map(|c| c.methods.iter().map(move |m| (c, m)))
    }

    /// All (owner, field) pairs.
    pub fn fields(&self) -> impl Iterator<Item = (&ClassDecl, &FieldDecl)> {
        self.classes
            .values()
            .flat_map(|c| c.fields.iter().map(move |f| (c, f)))
    }

    /// The indexer's verdict on a class.
    pub fn is_obfuscated_class(&self, name: &str) -> bool {
        self.class(name).map(|c| c.obfuscated).unwrap_or(false)
    }

    /// The indexer's verdict on a method.
    ///
    /// Universally inherited root-type methods are never obfuscated; beyond
    /// that, any method owned by an obfuscated indexed class counts.
    pub fn is_obfuscated_method(&self, key: &MemberKey) -> bool {
        if UNIVERSAL_METHODS
            .iter()
            .any(|(n, d)| *n == key.name && *d == key.desc)
        {
            return false;
        }
        self.is_obfuscated_class(&key.owner)
    }

    /// The indexer's verdict on a field: declared by an obfuscated class.
    pub fn is_obfuscated_field(&self, key: &MemberKey) -> bool {
        self.is_obfuscated_class(&key.owner)
            && self
                .class(&key.owner)
                .map(|c| c.field(&key.name, &key.desc).is_some())
                .unwrap_or(false)
    }
}
