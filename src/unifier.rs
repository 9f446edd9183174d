//! Sibling-interface name unification.
//!
//! Two structurally unrelated interfaces sometimes declare an identical
//! method signature, and a class implements both with a single method body.
//! Left alone, the generator would mint a different placeholder for each
//! interface's declaration and the shared implementation could not satisfy
//! both. The unifier pre-scans every class's directly declared interfaces for
//! such signature collisions; when the first interface of a group gets a
//! fresh name, the rest of the group reuses it.

use std::collections::HashMap;

use tracing::debug;

use crate::index::ArtifactIndex;

/// A method signature independently declared by two or more sibling
/// interfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SignatureGroup {
    /// The interfaces declaring the signature; the first is the
    /// representative that keys remembered names.
    interfaces: Vec<String>,
    name: String,
    desc: String,
}

/// Collision groups plus the names already chosen for them.
#[derive(Debug, Default)]
pub struct InterfaceUnifier {
    groups: Vec<SignatureGroup>,
    /// (representative interface, obfuscated method name) -> chosen name.
    chosen: HashMap<(String, String), String>,
}

impl InterfaceUnifier {
    /// Pre-scan all classes for signatures shared by two or more of their
    /// directly declared interfaces.
    pub fn scan(index: &ArtifactIndex) -> Self {
        let mut groups: Vec<SignatureGroup> = Vec::new();
        for class in index.classes() {
            for method in &class.methods {
                let declaring: Vec<String> = class
                    .interfaces
                    .iter()
                    .filter(|iface| {
                        index
                            .class(iface)
                            .map(|decl| decl.method(&method.name, &method.desc).is_some())
                            .unwrap_or(false)
                    })
                    .cloned()
                    .collect();
                if declaring.len() > 1 {
                    let group = SignatureGroup {
                        interfaces: declaring,
                        name: method.name.clone(),
                        desc: method.desc.clone(),
                    };
                    if !groups.contains(&group) {
                        debug!(
                            "interfaces {:?} share {}{}",
                            group.interfaces, group.name, group.desc
                        );
                        groups.push(group);
                    }
                }
            }
        }
        InterfaceUnifier {
            groups,
            chosen: HashMap::new(),
        }
    }

    /// Number of collision groups found by the pre-scan.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Run a freshly minted name through the unifier.
    ///
    /// If the method belongs to a recorded group, the first call records the
    /// candidate as the group's name and every later call for the group
    /// returns that remembered name instead of its own candidate.
    pub fn unify(&mut self, owner: &str, name: &str, desc: &str, candidate: String) -> String {
        let mut result = candidate;
        for group in &self.groups {
            if group.name != name || group.desc != desc {
                continue;
            }
            if !group.interfaces.iter().any(|i| i == owner) {
                continue;
            }
            let key = (group.interfaces[0].clone(), name.to_string());
            match self.chosen.get(&key) {
                Some(remembered) => {
                    debug!(
                        "reusing {} for {}.{}{} (shared interface signature)",
                        remembered, owner, name, desc
                    );
                    result = remembered.clone();
                }
                None => {
                    self.chosen.insert(key, result.clone());
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{ClassDecl, MethodDecl};

    fn index_with_shared_signature() -> ArtifactIndex {
        let mut index = ArtifactIndex::new();
        index.insert(ClassDecl::new("i").with_method(MethodDecl::new("y", "()V")));
        index.insert(ClassDecl::new("j").with_method(MethodDecl::new("y", "()V")));
        index.insert(
            ClassDecl::new("c")
                .with_interface("i")
                .with_interface("j")
                .with_method(MethodDecl::new("y", "()V")),
        );
        index
    }

    #[test]
    fn scan_finds_shared_signatures() {
        let unifier = InterfaceUnifier::scan(&index_with_shared_signature());
        assert_eq!(unifier.group_count(), 1);
    }

    #[test]
    fn scan_ignores_single_declarations() {
        let mut index = ArtifactIndex::new();
        index.insert(ClassDecl::new("i").with_method(MethodDecl::new("y", "()V")));
        index.insert(
            ClassDecl::new("c")
                .with_interface("i")
                .with_method(MethodDecl::new("y", "()V")),
        );
        let unifier = InterfaceUnifier::scan(&index);
        assert_eq!(unifier.group_count(), 0);
    }

    #[test]
    fn group_members_share_the_first_name() {
        let mut unifier = InterfaceUnifier::scan(&index_with_shared_signature());
        let first = unifier.unify("i", "y", "()V", "method_0".to_string());
        assert_eq!(first, "method_0");
        let second = unifier.unify("j", "y", "()V", "method_1".to_string());
        assert_eq!(second, "method_0");
    }

    #[test]
    fn unrelated_methods_keep_their_candidate() {
        let mut unifier = InterfaceUnifier::scan(&index_with_shared_signature());
        assert_eq!(
            unifier.unify("c", "z", "()V", "method_5".to_string()),
            "method_5"
        );
        // Same name, different owner outside the group.
        assert_eq!(
            unifier.unify("q", "y", "()V", "method_6".to_string()),
            "method_6"
        );
    }
}
