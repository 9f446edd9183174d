//! The output mapping tree.
//!
//! A root class mapping owns its member mappings and, recursively, its inner
//! class mappings. Each node pairs an obfuscated identity with an assigned
//! target name; a node with no target name was deliberately left unchanged.
//!
//! Every obfuscated identity may appear in the tree exactly once. Attempting
//! to register an identity twice is a [`MappingConflict`] and aborts the run;
//! silently picking one of two names would corrupt continuity for every
//! later version.
//!
//! [`MappingConflict`]: crate::error::SurveyorError::MappingConflict

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SurveyorError};
use crate::types;
use crate::util::atomic_write;

/// Shown in conflict messages for a slot registered without a target name.
const UNCHANGED: &str = "<unchanged>";

// ============================================================================
// Nodes
// ============================================================================

/// A method (or constructor) mapping with its argument names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodMapping {
    pub obf: String,
    pub desc: String,
    /// Assigned name; `None` for constructors (no name slot in this format)
    /// and for members left unchanged.
    pub deobf: Option<String>,
    /// Argument position -> assigned argument name.
    #[serde(default)]
    pub args: BTreeMap<usize, String>,
}

/// A field mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub obf: String,
    pub desc: String,
    pub deobf: Option<String>,
}

/// A class mapping node: target name, members, and inner classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassMapping {
    /// Full internal name for roots, innermost simple name for inner nodes.
    pub obf: String,
    pub deobf: Option<String>,
    #[serde(default)]
    pub methods: Vec<MethodMapping>,
    #[serde(default)]
    pub fields: Vec<FieldMapping>,
    #[serde(default)]
    pub inner: Vec<ClassMapping>,
    /// Whether this slot was explicitly registered (as opposed to created as
    /// a placeholder parent for an inner class). Placeholders may be upgraded
    /// once; registered slots may not.
    #[serde(skip)]
    registered: bool,
}

impl ClassMapping {
    fn placeholder(obf: &str) -> Self {
        ClassMapping {
            obf: obf.to_string(),
            deobf: None,
            methods: Vec::new(),
            fields: Vec::new(),
            inner: Vec::new(),
            registered: false,
        }
    }

    /// Find an inner class node by its simple obfuscated name.
    pub fn inner_class(&self, simple: &str) -> Option<&ClassMapping> {
        self.inner.iter().find(|c| c.obf == simple)
    }

    fn inner_class_mut(&mut self, simple: &str) -> Option<&mut ClassMapping> {
        self.inner.iter_mut().find(|c| c.obf == simple)
    }

    /// Find a method mapping by obfuscated name and descriptor.
    pub fn method(&self, name: &str, desc: &str) -> Option<&MethodMapping> {
        self.methods.iter().find(|m| m.obf == name && m.desc == desc)
    }

    /// Find a field mapping by obfuscated name and descriptor.
    pub fn field(&self, name: &str, desc: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.obf == name && f.desc == desc)
    }
}

// ============================================================================
// Tree
// ============================================================================

/// The complete mapping for one artifact version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingTree {
    roots: BTreeMap<String, ClassMapping>,
}

impl MappingTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a previously saved tree (the prior version's output).
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Serialize and overwrite atomically. Callers must skip this on
    /// simulated runs.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        atomic_write(path, json.as_bytes())?;
        Ok(())
    }

    /// Register a class (top-level or inner, addressed by its full `$`-joined
    /// obfuscated name).
    ///
    /// Returns `Ok(false)` when an inner class's root mapping does not exist;
    /// the caller skips the class with a diagnostic rather than aborting
    /// (this happens for a handful of platform-adjacent classes whose outer
    /// class is not in the artifact).
    pub fn register_class(&mut self, obf_name: &str, deobf: Option<String>) -> Result<bool> {
        let chain = types::nesting_chain(obf_name);
        if chain.len() == 1 {
            match self.roots.get_mut(obf_name) {
                Some(existing) => upgrade(existing, obf_name, deobf)?,
                None => {
                    let mut node = ClassMapping::placeholder(obf_name);
                    node.deobf = deobf;
                    node.registered = true;
                    self.roots.insert(obf_name.to_string(), node);
                }
            }
            return Ok(true);
        }

        let Some(mut node) = self.roots.get_mut(chain[0]) else {
            return Ok(false);
        };
        // Intermediate segments become placeholders on demand.
        for segment in &chain[1..chain.len() - 1] {
            if node.inner_class(segment).is_none() {
                node.inner.push(ClassMapping::placeholder(segment));
            }
            node = node.inner_class_mut(segment).expect("just inserted");
        }
        let simple = chain[chain.len() - 1];
        match node.inner_class_mut(simple) {
            Some(existing) => upgrade(existing, obf_name, deobf)?,
            None => {
                let mut child = ClassMapping::placeholder(simple);
                child.deobf = deobf;
                child.registered = true;
                node.inner.push(child);
            }
        }
        Ok(true)
    }

    /// Look up a class node by full obfuscated name.
    pub fn class(&self, obf_name: &str) -> Option<&ClassMapping> {
        let chain = types::nesting_chain(obf_name);
        let mut node = self.roots.get(chain[0])?;
        for segment in &chain[1..] {
            node = node.inner_class(segment)?;
        }
        Some(node)
    }

    fn class_mut(&mut self, obf_name: &str) -> Option<&mut ClassMapping> {
        let chain = types::nesting_chain(obf_name);
        let mut node = self.roots.get_mut(chain[0])?;
        for segment in &chain[1..] {
            node = node.inner_class_mut(segment)?;
        }
        Some(node)
    }

    /// Attach a method mapping beneath its owner class.
    pub fn add_method(&mut self, owner: &str, mapping: MethodMapping) -> Result<()> {
        let identity = format!("{}.{}{}", owner, mapping.obf, mapping.desc);
        let node = self.class_mut(owner).ok_or_else(|| {
            SurveyorError::internal(format!("no mapping registered for owner class {owner}"))
        })?;
        if let Some(existing) = node.method(&mapping.obf, &mapping.desc) {
            return Err(conflict(&identity, existing.deobf.as_deref(), mapping.deobf.as_deref()));
        }
        node.methods.push(mapping);
        Ok(())
    }

    /// Attach a field mapping beneath its owner class.
    pub fn add_field(&mut self, owner: &str, mapping: FieldMapping) -> Result<()> {
        let identity = format!("{}.{}:{}", owner, mapping.obf, mapping.desc);
        let node = self.class_mut(owner).ok_or_else(|| {
            SurveyorError::internal(format!("no mapping registered for owner class {owner}"))
        })?;
        if let Some(existing) = node.field(&mapping.obf, &mapping.desc) {
            return Err(conflict(&identity, existing.deobf.as_deref(), mapping.deobf.as_deref()));
        }
        node.fields.push(mapping);
        Ok(())
    }

    /// Mutable access to a method mapping, for argument-name insertion.
    pub fn method_mut(
        &mut self,
        owner: &str,
        name: &str,
        desc: &str,
    ) -> Option<&mut MethodMapping> {
        self.class_mut(owner)?
            .methods
            .iter_mut()
            .find(|m| m.obf == name && m.desc == desc)
    }

    /// Root class mappings, in deterministic order.
    pub fn roots(&self) -> impl Iterator<Item = &ClassMapping> {
        self.roots.values()
    }
}

fn upgrade(existing: &mut ClassMapping, identity: &str, deobf: Option<String>) -> Result<()> {
    if existing.registered {
        return Err(conflict(identity, existing.deobf.as_deref(), deobf.as_deref()));
    }
    existing.deobf = deobf;
    existing.registered = true;
    Ok(())
}

fn conflict(identity: &str, existing: Option<&str>, proposed: Option<&str>) -> SurveyorError {
    SurveyorError::MappingConflict {
        identity: identity.to_string(),
        existing: existing.unwrap_or(UNCHANGED).to_string(),
        proposed: proposed.unwrap_or(UNCHANGED).to_string(),
    }
}
