//! The mapping assignment orchestrator.
//!
//! Drives the single-pass, three-phase pipeline: classes first, then
//! methods, then fields, each in the deterministic order from
//! [`crate::order`]. Every symbol is classified as externally owned (left
//! alone), matched (inherits its predecessor's name), or new (gets a freshly
//! minted, permanently recorded name).
//!
//! The generator owns the ledger and the output tree exclusively for the
//! duration of a run; the whole pass is single-threaded, and ordering is a
//! correctness requirement, not an optimization.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::constructors::{ConstructorRecord, ConstructorTable};
use crate::error::{Result, SurveyorError};
use crate::hierarchy::{
    self, AncestorSource, HierarchyResolver, LibraryIndex, PlatformManifest,
};
use crate::index::{ArtifactIndex, ClassDecl, FieldDecl, MethodDecl};
use crate::ledger::NamingLedger;
use crate::mapping::{FieldMapping, MappingTree, MethodMapping};
use crate::matches::MatchSet;
use crate::order;
use crate::types::{self, MemberKey};
use crate::unifier::InterfaceUnifier;

// ============================================================================
// Configuration
// ============================================================================

/// Tunable knobs for one generation run.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Package prefix for freshly minted top-level class names.
    pub package_prefix: String,
    /// A non-constructor method name longer than this already looks
    /// resolved and is skipped.
    pub method_name_threshold: usize,
    /// A field name longer than this already looks resolved and is skipped.
    pub field_name_threshold: usize,
    /// Simulated runs perform the full pass but persist nothing.
    pub simulate: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            package_prefix: "remapped".to_string(),
            method_name_threshold: 3,
            field_name_threshold: 2,
            simulate: false,
        }
    }
}

/// Everything a run reads: the new artifact's index plus the optional
/// prior-version inputs.
#[derive(Clone, Copy)]
pub struct GeneratorInputs<'a> {
    pub index: &'a ArtifactIndex,
    pub libraries: Option<&'a LibraryIndex>,
    pub platform: &'a PlatformManifest,
    pub matches: Option<&'a MatchSet>,
    pub old_tree: Option<&'a MappingTree>,
    pub old_constructors: Option<&'a ConstructorTable>,
}

// ============================================================================
// Report
// ============================================================================

/// Decision counters, exposed for reporting only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub new_classes: usize,
    pub matched_classes: usize,
    pub new_methods: usize,
    pub matched_methods: usize,
    pub new_fields: usize,
    pub matched_fields: usize,
    pub interface_groups: usize,
}

/// The products of a run.
#[derive(Debug)]
pub struct RunOutput {
    pub tree: MappingTree,
    pub constructors: ConstructorTable,
    pub report: RunReport,
    /// Whether the run that produced this output was simulated.
    pub simulated: bool,
}

impl RunOutput {
    /// Write the mapping tree, the constructor side table, and the ledger.
    ///
    /// A simulated run persists nothing: the pass ran in full, the ledger was
    /// advanced in memory, and the filesystem stays exactly as it was.
    pub fn persist(
        &self,
        ledger: &NamingLedger,
        tree_path: &Path,
        constructors_path: &Path,
        ledger_path: &Path,
    ) -> Result<()> {
        if self.simulated {
            info!("simulated run, nothing persisted");
            return Ok(());
        }
        for path in [tree_path, constructors_path, ledger_path] {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
        }
        self.tree.save(tree_path)?;
        self.constructors.save(constructors_path)?;
        ledger.persist(ledger_path)?;
        Ok(())
    }
}

// ============================================================================
// Generator
// ============================================================================

/// The classification pass over one artifact version.
pub struct Generator<'a> {
    inputs: GeneratorInputs<'a>,
    ledger: &'a mut NamingLedger,
    resolver: HierarchyResolver<'a>,
    unifier: InterfaceUnifier,
    tree: MappingTree,
    new_constructors: ConstructorTable,
    config: GeneratorConfig,
    report: RunReport,
}

impl<'a> Generator<'a> {
    pub fn new(
        inputs: GeneratorInputs<'a>,
        ledger: &'a mut NamingLedger,
        config: GeneratorConfig,
    ) -> Self {
        let mut sources: Vec<&'a dyn AncestorSource> = vec![inputs.index];
        if let Some(libs) = inputs.libraries {
            sources.push(libs);
        }
        sources.push(inputs.platform);

        Generator {
            inputs,
            ledger,
            resolver: HierarchyResolver::new(sources),
            unifier: InterfaceUnifier::default(),
            tree: MappingTree::new(),
            new_constructors: ConstructorTable::new(),
            config,
            report: RunReport::default(),
        }
    }

    /// Run the full pipeline and hand back the outputs.
    pub fn run(mut self) -> Result<RunOutput> {
        let index = self.inputs.index;

        let mut classes: Vec<&ClassDecl> = index.classes().collect();
        classes.sort_by(|a, b| order::compare_classes(a, b));

        let mut methods: Vec<(&ClassDecl, &MethodDecl)> = index.methods().collect();
        methods.sort_by(order::compare_methods);

        let mut fields: Vec<(&ClassDecl, &FieldDecl)> = index.fields().collect();
        fields.sort_by(order::compare_fields);

        self.unifier = InterfaceUnifier::scan(index);
        self.report.interface_groups = self.unifier.group_count();
        info!(
            "found {} shared interface signature groups",
            self.report.interface_groups
        );

        info!("processing {} classes", classes.len());
        for class in classes {
            self.handle_class(class)?;
        }

        info!("processing {} methods", methods.len());
        for (owner, method) in methods {
            self.handle_method(owner, method)?;
        }

        info!("processing {} fields", fields.len());
        for (owner, field) in fields {
            self.handle_field(owner, field)?;
        }

        info!(
            "classes: {} matched / {} new; methods: {} matched / {} new; fields: {} matched / {} new",
            self.report.matched_classes,
            self.report.new_classes,
            self.report.matched_methods,
            self.report.new_methods,
            self.report.matched_fields,
            self.report.new_fields,
        );

        Ok(RunOutput {
            tree: self.tree,
            constructors: self.new_constructors,
            report: self.report,
            simulated: self.config.simulate,
        })
    }

    // ------------------------------------------------------------------
    // Classes
    // ------------------------------------------------------------------

    fn handle_class(&mut self, class: &ClassDecl) -> Result<()> {
        let name = &class.name;
        // Already packaged classes and anonymous inner classes keep their
        // names; they still get a slot in the tree.
        let renameable =
            !types::in_package(name) && !(types::is_inner(name) && types::is_anonymous(name));
        if !renameable {
            if !self.tree.register_class(name, None)? {
                warn!("no parent mapping for {name}, skipping");
            }
            return Ok(());
        }

        let matched = self
            .inputs
            .matches
            .and_then(|m| m.class_match(name))
            .map(str::to_string);

        if let Some(old_name) = matched {
            let old_deobf = self
                .inputs
                .old_tree
                .and_then(|t| t.class(&old_name))
                .and_then(|c| c.deobf.clone());
            match old_deobf {
                Some(old_deobf) => {
                    // Identity is preserved through the match: the old name
                    // is copied verbatim, never regenerated.
                    if !self.tree.register_class(name, Some(old_deobf.clone()))? {
                        warn!("no parent mapping for matched class {name}, skipping");
                        return Ok(());
                    }
                    debug!("MC: {name} -> {old_deobf}");
                    self.report.matched_classes += 1;
                    return Ok(());
                }
                None => {
                    warn!(
                        "matched class {name} has no predecessor mapping for {old_name}, \
                         minting a new name"
                    );
                }
            }
        }

        let minted = self.ledger.next_class_name();
        let deobf = if types::is_inner(name) {
            minted
        } else {
            format!("{}/{}", self.config.package_prefix, minted)
        };
        if !self.tree.register_class(name, Some(deobf.clone()))? {
            warn!("no parent mapping for new class {name}, skipping");
            return Ok(());
        }
        debug!("NC: {name} -> {deobf}");
        self.report.new_classes += 1;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Methods
    // ------------------------------------------------------------------

    fn handle_method(&mut self, owner: &ClassDecl, method: &MethodDecl) -> Result<()> {
        let key = MemberKey::new(&owner.name, &method.name, &method.desc);
        if !self.inputs.index.is_obfuscated_method(&key) {
            return Ok(());
        }
        if key.name.to_lowercase().contains("lambda$") {
            return Ok(());
        }
        // Renaming synthetics or bridges breaks them in strange ways.
        if method.access.synthetic || method.access.bridge {
            return Ok(());
        }
        let is_ctor = method.is_constructor();
        if key.name.len() > self.config.method_name_threshold && !is_ctor {
            return Ok(());
        }
        if self.resolver.is_overridden_elsewhere(&key)? {
            debug!("skipping {key}: declared by an ancestor");
            return Ok(());
        }
        if !hierarchy::is_provider(self.inputs.index, &key) {
            debug!("skipping {key}: not the providing declaration");
            return Ok(());
        }
        if !types::is_valid_identifier(&key.name) {
            warn!("skipping {key}: name is not a valid identifier");
            return Ok(());
        }

        // Matched symbols inherit their predecessor's name; a match whose
        // predecessor mapping is gone downgrades to new.
        let mut matched: Option<(String, MethodMapping)> = None;
        if let Some(old_key) = self.inputs.matches.and_then(|m| m.method_match(&key)).cloned() {
            let old_mapping = self
                .inputs
                .old_tree
                .and_then(|t| t.class(&old_key.owner))
                .and_then(|c| c.method(&old_key.name, &old_key.desc))
                .cloned();
            match old_mapping {
                Some(old) if is_ctor => {
                    // The primary format never carried a constructor name;
                    // the side table must have it.
                    let record = self
                        .inputs
                        .old_constructors
                        .and_then(|t| t.get(&old_key.owner, &old_key.desc))
                        .ok_or_else(|| SurveyorError::MissingConstructor {
                            owner: old_key.owner.clone(),
                            desc: old_key.desc.clone(),
                        })?;
                    matched = Some((record.deobf_name.clone(), old));
                }
                Some(old) => match old.deobf.clone() {
                    Some(name) => matched = Some((name, old)),
                    None => warn!("matched method {key} has an unnamed predecessor, minting"),
                },
                None => warn!("matched method {key} has no predecessor mapping, minting"),
            }
        }

        let (display_name, old_mapping) = match matched {
            Some((name, old)) => {
                debug!("MM: {key} -> {name}");
                self.report.matched_methods += 1;
                (name, Some(old))
            }
            None => {
                let minted = self.ledger.next_method_name(&key.desc);
                let unified = self.unifier.unify(&key.owner, &key.name, &key.desc, minted);
                debug!("NM: {key} -> {unified}");
                self.report.new_methods += 1;
                (unified, None)
            }
        };

        self.tree.add_method(
            &key.owner,
            MethodMapping {
                obf: key.name.clone(),
                desc: key.desc.clone(),
                deobf: (!is_ctor).then(|| display_name.clone()),
                args: BTreeMap::new(),
            },
        )?;

        self.assign_arguments(&key, &display_name, old_mapping.as_ref())?;

        if is_ctor {
            let args = self
                .tree
                .class(&key.owner)
                .and_then(|c| c.method(&key.name, &key.desc))
                .map(|m| m.args.clone())
                .unwrap_or_default();
            self.new_constructors.insert(ConstructorRecord {
                owner: key.owner.clone(),
                desc: key.desc.clone(),
                deobf_name: display_name,
                args,
            });
        }
        Ok(())
    }

    fn assign_arguments(
        &mut self,
        key: &MemberKey,
        display_name: &str,
        old_mapping: Option<&MethodMapping>,
    ) -> Result<()> {
        let count = types::argument_count(&key.desc)?;
        for position in 0..count {
            let matched_arg = self.inputs.matches.and_then(|m| m.arg_match(key, position));
            let name = match (matched_arg, old_mapping) {
                (Some(old_arg), Some(old)) => match old.args.get(&old_arg.index) {
                    Some(old_name) => {
                        debug!("MP: {key}#{position} -> {old_name}");
                        old_name.clone()
                    }
                    None => {
                        warn!(
                            "matched argument {key}#{position} has no predecessor name, minting"
                        );
                        self.ledger.next_argument_name(display_name)?
                    }
                },
                _ => {
                    let minted = self.ledger.next_argument_name(display_name)?;
                    debug!("NP: {key}#{position} -> {minted}");
                    minted
                }
            };
            let mapping = self
                .tree
                .method_mut(&key.owner, &key.name, &key.desc)
                .ok_or_else(|| {
                    SurveyorError::internal(format!("method {key} vanished from the tree"))
                })?;
            mapping.args.insert(position, name);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Fields
    // ------------------------------------------------------------------

    fn handle_field(&mut self, owner: &ClassDecl, field: &FieldDecl) -> Result<()> {
        let key = MemberKey::new(&owner.name, &field.name, &field.desc);
        if !self.inputs.index.is_obfuscated_field(&key) {
            return Ok(());
        }
        if field.access.synthetic {
            return Ok(());
        }
        if key.name.len() > self.config.field_name_threshold {
            return Ok(());
        }

        let mut matched_name: Option<String> = None;
        if let Some(old_key) = self.inputs.matches.and_then(|m| m.field_match(&key)).cloned() {
            let old_deobf = self
                .inputs
                .old_tree
                .and_then(|t| t.class(&old_key.owner))
                .and_then(|c| c.field(&old_key.name, &old_key.desc))
                .and_then(|f| f.deobf.clone());
            match old_deobf {
                Some(name) => matched_name = Some(name),
                None => warn!("matched field {key} has no predecessor mapping, minting"),
            }
        }

        let deobf = match matched_name {
            Some(name) => {
                debug!("MF: {key} -> {name}");
                self.report.matched_fields += 1;
                name
            }
            None => {
                let minted = self.ledger.next_field_name(&key.desc);
                debug!("NF: {key} -> {minted}");
                self.report.new_fields += 1;
                minted
            }
        };

        self.tree.add_field(
            &key.owner,
            FieldMapping {
                obf: key.name.clone(),
                desc: key.desc.clone(),
                deobf: Some(deobf),
            },
        )?;
        Ok(())
    }
}
