//! Ancestor resolution and override suppression.
//!
//! Deciding whether a member may be renamed requires the *complete* ancestor
//! set of its owning class. Ancestors can live in three places, tried in
//! priority order:
//! 1. the artifact's own index,
//! 2. an externally supplied library index,
//! 3. a static manifest of the known platform surface.
//!
//! A class that resolves nowhere is a fatal error: with a hole in the
//! ancestor set, override suppression could rename a member that a library
//! type already owns.
//!
//! Resolved ancestor sets are cached per class; the graph is acyclic and
//! re-queried for every member of every class.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SurveyorError};
use crate::index::{ArtifactIndex, ClassDecl};
use crate::types::MemberKey;

/// Internal name of the root value type.
pub const OBJECT_CLASS: &str = "java/lang/Object";

/// Internal name of the enumeration base type.
pub const ENUM_CLASS: &str = "java/lang/Enum";

/// Stand-in surface for enumeration ancestors.
///
/// Compilers synthesize per-enum members (`values`, `valueOf`) whose
/// descriptors mention the concrete enum type, so they can never match a
/// manifest entry by signature. When an ancestor chain reaches the enum base
/// type, a name-level check against this surface fills the gap.
const ENUM_STAND_IN_METHODS: &[&str] = &[
    "name",
    "ordinal",
    "equals",
    "hashCode",
    "toString",
    "compareTo",
    "getDeclaringClass",
    "valueOf",
    "values",
    "clone",
    "finalize",
];

// ============================================================================
// Resolved Class Shape
// ============================================================================

/// A member signature as seen by ancestor resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSig {
    pub name: String,
    pub desc: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default, rename = "static")]
    pub is_static: bool,
}

impl MemberSig {
    pub fn new(name: impl Into<String>, desc: impl Into<String>) -> Self {
        MemberSig {
            name: name.into(),
            desc: desc.into(),
            private: false,
            is_static: false,
        }
    }

    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }

    pub fn statik(mut self) -> Self {
        self.is_static = true;
        self
    }
}

/// The slice of a class that ancestor resolution needs: edges and declared
/// method signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedClass {
    pub name: String,
    #[serde(default)]
    pub superclass: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub methods: Vec<MemberSig>,
}

impl ResolvedClass {
    pub fn new(name: impl Into<String>) -> Self {
        ResolvedClass {
            name: name.into(),
            superclass: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
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

    pub fn with_method(mut self, method: MemberSig) -> Self {
        self.methods.push(method);
        self
    }

    /// Find a declared method by name and descriptor.
    pub fn method(&self, name: &str, desc: &str) -> Option<&MemberSig> {
        self.methods.iter().find(|m| m.name == name && m.desc == desc)
    }
}

impl From<&ClassDecl> for ResolvedClass {
    fn from(decl: &ClassDecl) -> Self {
        ResolvedClass {
            name: decl.name.clone(),
            superclass: decl.superclass.clone(),
            interfaces: decl.interfaces.clone(),
            methods: decl
                .methods
                .iter()
                .map(|m| MemberSig {
                    name: m.name.clone(),
                    desc: m.desc.clone(),
                    private: m.access.private,
                    is_static: m.access.is_static,
                })
                .collect(),
        }
    }
}

// ============================================================================
// Ancestor Sources
// ============================================================================

/// A place ancestor classes can be resolved from.
pub trait AncestorSource {
    fn resolve(&self, class: &str) -> Option<ResolvedClass>;
}

impl AncestorSource for ArtifactIndex {
    fn resolve(&self, class: &str) -> Option<ResolvedClass> {
        self.class(class).map(ResolvedClass::from)
    }
}

/// Index over the artifact's library dependencies, supplied externally.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibraryIndex {
    classes: BTreeMap<String, ResolvedClass>,
}

impl LibraryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn insert(&mut self, class: ResolvedClass) {
        self.classes.insert(class.name.clone(), class);
    }
}

impl AncestorSource for LibraryIndex {
    fn resolve(&self, class: &str) -> Option<ResolvedClass> {
        self.classes.get(class).cloned()
    }
}

/// Static manifest of the trusted platform surface. Ships with the root and
/// enumeration base types built in; extra entries can be loaded from a
/// manifest file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformManifest {
    classes: BTreeMap<String, ResolvedClass>,
}

impl PlatformManifest {
    /// Manifest containing only the built-in root and enum base types.
    pub fn builtin() -> Self {
        let mut classes = BTreeMap::new();

        let object = ResolvedClass::new(OBJECT_CLASS)
            .with_method(MemberSig::new("clone", "()Ljava/lang/Object;"))
            .with_method(MemberSig::new("equals", "(Ljava/lang/Object;)Z"))
            .with_method(MemberSig::new("finalize", "()V"))
            .with_method(MemberSig::new("getClass", "()Ljava/lang/Class;"))
            .with_method(MemberSig::new("hashCode", "()I"))
            .with_method(MemberSig::new("notify", "()V"))
            .with_method(MemberSig::new("notifyAll", "()V"))
            .with_method(MemberSig::new("toString", "()Ljava/lang/String;"))
            .with_method(MemberSig::new("wait", "()V"))
            .with_method(MemberSig::new("wait", "(J)V"))
            .with_method(MemberSig::new("wait", "(JI)V"));
        classes.insert(object.name.clone(), object);

        let enum_base = ResolvedClass::new(ENUM_CLASS)
            .with_superclass(OBJECT_CLASS)
            .with_method(MemberSig::new("name", "()Ljava/lang/String;"))
            .with_method(MemberSig::new("ordinal", "()I"))
            .with_method(MemberSig::new("compareTo", "(Ljava/lang/Enum;)I"))
            .with_method(MemberSig::new(
                "getDeclaringClass",
                "()Ljava/lang/Class;",
            ))
            .with_method(MemberSig::new("equals", "(Ljava/lang/Object;)Z"))
            .with_method(MemberSig::new("hashCode", "()I"))
            .with_method(MemberSig::new("toString", "()Ljava/lang/String;"));
        classes.insert(enum_base.name.clone(), enum_base);

        PlatformManifest { classes }
    }

    /// Built-ins plus entries from a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let extra: Vec<ResolvedClass> = serde_json::from_str(&content)?;
        let mut manifest = Self::builtin();
        for class in extra {
            manifest.classes.insert(class.name.clone(), class);
        }
        Ok(manifest)
    }

    pub fn insert(&mut self, class: ResolvedClass) {
        self.classes.insert(class.name.clone(), class);
    }
}

impl Default for PlatformManifest {
    fn default() -> Self {
        Self::builtin()
    }
}

impl AncestorSource for PlatformManifest {
    fn resolve(&self, class: &str) -> Option<ResolvedClass> {
        self.classes.get(class).cloned()
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Resolves complete ancestor sets across the three sources, with a per-class
/// cache.
pub struct HierarchyResolver<'a> {
    sources: Vec<&'a dyn AncestorSource>,
    cache: HashMap<String, Rc<Vec<ResolvedClass>>>,
}

impl<'a> HierarchyResolver<'a> {
    /// Sources are tried in the order given.
    pub fn new(sources: Vec<&'a dyn AncestorSource>) -> Self {
        HierarchyResolver {
            sources,
            cache: HashMap::new(),
        }
    }

    fn resolve(&self, class: &str) -> Option<ResolvedClass> {
        self.sources.iter().find_map(|s| s.resolve(class))
    }

    /// All superclasses and interfaces of a class, transitively, excluding
    /// the class itself. Fatal if any ancestor resolves nowhere.
    pub fn ancestors(&mut self, class: &str) -> Result<Rc<Vec<ResolvedClass>>> {
        if let Some(cached) = self.cache.get(class) {
            return Ok(Rc::clone(cached));
        }

        let root = self.resolve(class).ok_or_else(|| SurveyorError::MissingAncestor {
            class: class.to_string(),
            dependent: class.to_string(),
        })?;

        let mut result = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut queue: Vec<String> = Vec::new();
        queue.extend(root.superclass.iter().cloned());
        queue.extend(root.interfaces.iter().cloned());

        while let Some(name) = queue.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            let resolved = self.resolve(&name).ok_or_else(|| SurveyorError::MissingAncestor {
                class: name.clone(),
                dependent: class.to_string(),
            })?;
            queue.extend(resolved.superclass.iter().cloned());
            queue.extend(resolved.interfaces.iter().cloned());
            result.push(resolved);
        }

        let rc = Rc::new(result);
        self.cache.insert(class.to_string(), Rc::clone(&rc));
        Ok(rc)
    }

    /// Whether some ancestor already declares this member as an overridable
    /// (non-private, non-static) method.
    ///
    /// Private and static ancestor members share a signature by coincidence,
    /// not by inheritance, so they do not suppress renaming. Enumeration
    /// ancestors get the name-level stand-in check.
    pub fn is_overridden_elsewhere(&mut self, method: &MemberKey) -> Result<bool> {
        let ancestors = self.ancestors(&method.owner)?;
        for ancestor in ancestors.iter() {
            if let Some(sig) = ancestor.method(&method.name, &method.desc) {
                if !sig.private && !sig.is_static {
                    return Ok(true);
                }
            }
            if ancestor.name == ENUM_CLASS
                && ENUM_STAND_IN_METHODS.contains(&method.name.as_str())
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

// ============================================================================
// Provider Check
// ============================================================================

/// Whether `method`'s owner is the original declaration site of the member.
///
/// Walks the full transitive set of potential ancestors reachable through the
/// artifact's own edges; if any of them declares an obfuscated version of the
/// member, this class merely inherits the name and must not rename it
/// independently (the provider will, when its turn comes).
pub fn is_provider(index: &ArtifactIndex, method: &MemberKey) -> bool {
    let mut ancestors = HashSet::new();
    if let Some(class) = index.class(&method.owner) {
        collect_potential_ancestors(index, class, &mut ancestors);
    }
    for ancestor in &ancestors {
        let candidate = MemberKey::new(ancestor.as_str(), &method.name, &method.desc);
        let declared = index
            .class(ancestor)
            .map(|c| c.method(&method.name, &method.desc).is_some())
            .unwrap_or(false);
        if declared && index.is_obfuscated_method(&candidate) {
            return false;
        }
    }
    true
}

fn collect_potential_ancestors(
    index: &ArtifactIndex,
    class: &ClassDecl,
    out: &mut HashSet<String>,
) {
    for iface in &class.interfaces {
        if out.insert(iface.clone()) {
            if let Some(decl) = index.class(iface) {
                collect_potential_ancestors(index, decl, out);
            }
        }
    }
    if let Some(superclass) = &class.superclass {
        if out.insert(superclass.clone()) {
            if let Some(decl) = index.class(superclass) {
                collect_potential_ancestors(index, decl, out);
            }
        }
    }
}
