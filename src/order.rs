//! Deterministic processing order for obfuscated symbols.
//!
//! Obfuscators hand out short base-26 alphabetic tokens (`a` .. `z`, `aa`,
//! ...) in a fixed internal order. Sorting by the positional value of that
//! token reproduces the obfuscator's order, which in turn makes ledger
//! numbering deterministic when no match data exists: the same symbol always
//! arrives at the same point of the pass and draws the same numeric suffix.

use std::cmp::Ordering;

use crate::index::{ClassDecl, FieldDecl, MethodDecl};
use crate::types;

/// Positional base-26 value of an obfuscated token.
///
/// `a`/`A` contribute 1, `z`/`Z` contribute 26; every non-letter byte
/// contributes 0 but still shifts the place value, so `a$1` sorts after `a`
/// and inner classes land behind their enclosing class.
pub fn obf_index(name: &str) -> u64 {
    let mut acc: u64 = 0;
    for c in name.chars() {
        let value = if c.is_ascii_alphabetic() {
            (c.to_ascii_lowercase() as u64) - ('a' as u64) + 1
        } else {
            0
        };
        acc = acc.saturating_mul(26).saturating_add(value);
    }
    acc
}

/// Total order for classes: obfuscation index, then nesting depth, then the
/// name itself as the identity tiebreak.
pub fn compare_classes(a: &ClassDecl, b: &ClassDecl) -> Ordering {
    obf_index(&a.name)
        .cmp(&obf_index(&b.name))
        .then_with(|| {
            let depth_a = types::nesting_chain(&a.name).len();
            let depth_b = types::nesting_chain(&b.name).len();
            depth_a.cmp(&depth_b)
        })
        .then_with(|| a.name.cmp(&b.name))
}

/// Total order for (owner, method) pairs.
pub fn compare_methods(a: &(&ClassDecl, &MethodDecl), b: &(&ClassDecl, &MethodDecl)) -> Ordering {
    compare_members(
        (&a.0.name, &a.1.name, &a.1.desc),
        (&b.0.name, &b.1.name, &b.1.desc),
    )
}

/// Total order for (owner, field) pairs.
pub fn compare_fields(a: &(&ClassDecl, &FieldDecl), b: &(&ClassDecl, &FieldDecl)) -> Ordering {
    compare_members(
        (&a.0.name, &a.1.name, &a.1.desc),
        (&b.0.name, &b.1.name, &b.1.desc),
    )
}

fn compare_members(a: (&str, &str, &str), b: (&str, &str, &str)) -> Ordering {
    obf_index(a.0)
        .cmp(&obf_index(b.0))
        .then_with(|| a.0.cmp(b.0))
        .then_with(|| obf_index(a.1).cmp(&obf_index(b.1)))
        .then_with(|| a.1.cmp(b.1))
        .then_with(|| a.2.cmp(b.2))
}
