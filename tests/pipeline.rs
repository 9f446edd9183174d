//! End-to-end pipeline tests: two artifact versions, persisted state between
//! runs, and name continuity through match data.

use std::collections::BTreeMap;

use surveyor::constructors::ConstructorTable;
use surveyor::hierarchy::PlatformManifest;
use surveyor::index::{ArtifactIndex, ClassDecl, FieldDecl, MethodDecl};
use surveyor::ledger::NamingLedger;
use surveyor::mapping::MappingTree;
use surveyor::matches::MatchSet;
use surveyor::{Generator, GeneratorConfig, GeneratorInputs, RunOutput};

const OBJECT: &str = "java/lang/Object";

/// A small artifact: two top-level classes, an inner class, and two sibling
/// interfaces sharing a method signature.
fn version_one() -> ArtifactIndex {
    let mut index = ArtifactIndex::new();
    index.insert(
        ClassDecl::new("a")
            .with_superclass(OBJECT)
            .with_method(MethodDecl::new("<init>", "(I)V"))
            .with_method(MethodDecl::new("b", "(II)V"))
            .with_field(FieldDecl::new("c", "I")),
    );
    index.insert(
        ClassDecl::new("b")
            .with_superclass("a")
            .with_method(MethodDecl::new("b", "(II)V"))
            .with_field(FieldDecl::new("d", "J")),
    );
    index.insert(ClassDecl::new("a$c").with_superclass(OBJECT));
    index.insert(ClassDecl::new("i").with_method(MethodDecl::new("y", "()V")));
    index.insert(ClassDecl::new("j").with_method(MethodDecl::new("y", "()V")));
    index.insert(
        ClassDecl::new("c")
            .with_superclass(OBJECT)
            .with_interface("i")
            .with_interface("j")
            .with_method(MethodDecl::new("y", "()V")),
    );
    index
}

fn run_fresh(index: &ArtifactIndex, ledger: &mut NamingLedger) -> RunOutput {
    let platform = PlatformManifest::builtin();
    let inputs = GeneratorInputs {
        index,
        libraries: None,
        platform: &platform,
        matches: None,
        old_tree: None,
        old_constructors: None,
    };
    Generator::new(inputs, ledger, GeneratorConfig::default())
        .run()
        .expect("fresh run")
}

#[test]
fn identical_inputs_produce_identical_output() {
    let index = version_one();
    let mut ledger_a = NamingLedger::new();
    let mut ledger_b = NamingLedger::new();

    let first = run_fresh(&index, &mut ledger_a);
    let second = run_fresh(&index, &mut ledger_b);

    let json_a = serde_json::to_string(&first.tree).unwrap();
    let json_b = serde_json::to_string(&second.tree).unwrap();
    assert_eq!(json_a, json_b);
    assert_eq!(first.report, second.report);
}

#[test]
fn override_suppression_names_only_the_provider() {
    let index = version_one();
    let mut ledger = NamingLedger::new();
    let output = run_fresh(&index, &mut ledger);

    // a.b(II)V is the declaration site; b.b(II)V overrides it.
    assert!(output.tree.class("a").unwrap().method("b", "(II)V").is_some());
    assert!(output.tree.class("b").unwrap().method("b", "(II)V").is_none());
}

#[test]
fn sibling_interfaces_share_one_generated_name() {
    let index = version_one();
    let mut ledger = NamingLedger::new();
    let output = run_fresh(&index, &mut ledger);

    let on_i = output
        .tree
        .class("i")
        .unwrap()
        .method("y", "()V")
        .unwrap()
        .deobf
        .clone();
    let on_j = output
        .tree
        .class("j")
        .unwrap()
        .method("y", "()V")
        .unwrap()
        .deobf
        .clone();
    assert!(on_i.is_some());
    assert_eq!(on_i, on_j);
    assert_eq!(output.report.interface_groups, 1);
}

#[test]
fn argument_names_are_scoped_to_their_method() {
    let index = version_one();
    let mut ledger = NamingLedger::new();
    let output = run_fresh(&index, &mut ledger);

    let ctor = output.constructors.get("a", "(I)V").expect("ctor record");
    let method = output.tree.class("a").unwrap().method("b", "(II)V").unwrap();

    // Each method's arguments count from zero under its own ordinal.
    let ctor_ordinal: Vec<&str> = ctor.args.values().map(String::as_str).collect();
    let method_ordinal: Vec<&str> = method.args.values().map(String::as_str).collect();
    assert_eq!(ctor_ordinal.len(), 1);
    assert_eq!(method_ordinal.len(), 2);
    assert!(ctor_ordinal[0].ends_with("_0"));
    assert!(method_ordinal[0].ends_with("_0"));
    assert!(method_ordinal[1].ends_with("_1"));
    assert_ne!(ctor_ordinal[0], method_ordinal[0]);
}

#[test]
fn matched_symbols_keep_their_names_across_versions() {
    let dir = tempfile::tempdir().unwrap();
    let ledger_path = dir.path().join("names.txt");
    let tree_path = dir.path().join("mappings.json");
    let ctors_path = dir.path().join("constructors.json");

    // Version 1: everything is new.
    let v1 = version_one();
    let mut ledger = NamingLedger::load(&ledger_path).unwrap();
    let out1 = run_fresh(&v1, &mut ledger);
    out1.tree.save(&tree_path).unwrap();
    out1.constructors.save(&ctors_path).unwrap();
    ledger.persist(&ledger_path).unwrap();

    let a_name = out1.tree.class("a").unwrap().deobf.clone().unwrap();
    let b_method_name = out1
        .tree
        .class("a")
        .unwrap()
        .method("b", "(II)V")
        .unwrap()
        .deobf
        .clone()
        .unwrap();
    let c_field_name = out1
        .tree
        .class("a")
        .unwrap()
        .field("c", "I")
        .unwrap()
        .deobf
        .clone()
        .unwrap();

    // Version 2: the obfuscator shuffled names (a -> q, b -> r, c -> s) and
    // added one brand-new class.
    let mut v2 = ArtifactIndex::new();
    v2.insert(
        ClassDecl::new("q")
            .with_superclass(OBJECT)
            .with_method(MethodDecl::new("<init>", "(I)V"))
            .with_method(MethodDecl::new("r", "(II)V"))
            .with_field(FieldDecl::new("s", "I")),
    );
    v2.insert(ClassDecl::new("z").with_superclass(OBJECT));

    let matches = MatchSet::parse(
        "c\tLa;\tLq;\n\
         \tm\t<init>(I)V\t<init>(I)V\n\
         \t\tma\t0\t0\n\
         \tm\tb(II)V\tr(II)V\n\
         \t\tma\t0\t0\n\
         \t\tma\t1\t1\n\
         \tf\tc;;I\ts;;I\n",
        "test",
    )
    .unwrap();

    let old_tree = MappingTree::load(&tree_path).unwrap();
    let old_ctors = ConstructorTable::load(&ctors_path).unwrap();
    let mut resumed = NamingLedger::load(&ledger_path).unwrap();
    let platform = PlatformManifest::builtin();
    let inputs = GeneratorInputs {
        index: &v2,
        libraries: None,
        platform: &platform,
        matches: Some(&matches),
        old_tree: Some(&old_tree),
        old_constructors: Some(&old_ctors),
    };
    let out2 = Generator::new(inputs, &mut resumed, GeneratorConfig::default())
        .run()
        .expect("update run");

    // Matched symbols carry their old names verbatim.
    let q = out2.tree.class("q").unwrap();
    assert_eq!(q.deobf.as_deref(), Some(a_name.as_str()));
    assert_eq!(
        q.method("r", "(II)V").unwrap().deobf.as_deref(),
        Some(b_method_name.as_str())
    );
    assert_eq!(
        q.field("s", "I").unwrap().deobf.as_deref(),
        Some(c_field_name.as_str())
    );

    // Matched argument names carry over too.
    let old_args: BTreeMap<usize, String> = out1
        .tree
        .class("a")
        .unwrap()
        .method("b", "(II)V")
        .unwrap()
        .args
        .clone();
    assert_eq!(q.method("r", "(II)V").unwrap().args, old_args);

    // The matched constructor keeps its side-table name.
    let old_record = out1.constructors.get("a", "(I)V").unwrap();
    let new_record = out2.constructors.get("q", "(I)V").unwrap();
    assert_eq!(new_record.deobf_name, old_record.deobf_name);

    // The unmatched class continues numbering past everything version 1
    // minted, never reusing a suffix.
    let z_name = out2.tree.class("z").unwrap().deobf.clone().unwrap();
    let v1_classes = out1.report.new_classes;
    assert_eq!(z_name, format!("remapped/class_{v1_classes}"));

    assert_eq!(out2.report.matched_classes, 1);
    assert_eq!(out2.report.new_classes, 1);
    assert_eq!(out2.report.matched_methods, 2);
    assert_eq!(out2.report.matched_fields, 1);
}

#[test]
fn unmatched_update_symbols_downgrade_to_new_with_fresh_names() {
    // A match referencing a predecessor that was never mapped must not abort
    // the run; the symbol is treated as new.
    let mut index = ArtifactIndex::new();
    index.insert(
        ClassDecl::new("q")
            .with_superclass(OBJECT)
            .with_field(FieldDecl::new("s", "I")),
    );
    let matches = MatchSet::parse("c\tLgone;\tLq;\n\tf\tx;;I\ts;;I\n", "test").unwrap();
    let old_tree = MappingTree::new();
    let old_ctors = ConstructorTable::new();

    let mut ledger = NamingLedger::new();
    let platform = PlatformManifest::builtin();
    let inputs = GeneratorInputs {
        index: &index,
        libraries: None,
        platform: &platform,
        matches: Some(&matches),
        old_tree: Some(&old_tree),
        old_constructors: Some(&old_ctors),
    };
    let output = Generator::new(inputs, &mut ledger, GeneratorConfig::default())
        .run()
        .expect("downgrade run");

    assert_eq!(
        output.tree.class("q").unwrap().deobf.as_deref(),
        Some("remapped/class_0")
    );
    assert_eq!(
        output
            .tree
            .class("q")
            .unwrap()
            .field("s", "I")
            .unwrap()
            .deobf
            .as_deref(),
        Some("field_0")
    );
    assert_eq!(output.report.new_classes, 1);
    assert_eq!(output.report.new_fields, 1);
}

#[test]
fn persisted_ledger_keeps_numbering_monotonic() {
    let dir = tempfile::tempdir().unwrap();
    let ledger_path = dir.path().join("names.txt");

    let v1 = version_one();
    let mut ledger = NamingLedger::load(&ledger_path).unwrap();
    run_fresh(&v1, &mut ledger);
    ledger.persist(&ledger_path).unwrap();

    let mut resumed = NamingLedger::load(&ledger_path).unwrap();
    let next_class = resumed.next_class_name();
    let next_method = resumed.next_method_name("()V");

    // Fresh mints continue where the persisted run stopped.
    let prior = NamingLedger::load(&ledger_path).unwrap();
    assert_eq!(
        next_class,
        format!("class_{}", prior.count(surveyor::types::NameKind::Class))
    );
    assert_eq!(
        next_method,
        format!("method_{}", prior.count(surveyor::types::NameKind::Method))
    );
}

#[test]
fn simulated_runs_leave_persisted_state_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let tree_path = dir.path().join("mappings.json");
    let ctors_path = dir.path().join("constructors.json");
    let ledger_path = dir.path().join("names.txt");

    // A real run populates the output directory.
    let v1 = version_one();
    let mut ledger = NamingLedger::load(&ledger_path).unwrap();
    let out1 = run_fresh(&v1, &mut ledger);
    out1.persist(&ledger, &tree_path, &ctors_path, &ledger_path)
        .unwrap();

    let tree_before = std::fs::read_to_string(&tree_path).unwrap();
    let ctors_before = std::fs::read_to_string(&ctors_path).unwrap();
    let ledger_before = std::fs::read_to_string(&ledger_path).unwrap();

    // A simulated run over a grown artifact classifies everything but must
    // not touch any of the three files.
    let mut v2 = version_one();
    v2.insert(ClassDecl::new("z").with_superclass(OBJECT));
    let mut resumed = NamingLedger::load(&ledger_path).unwrap();
    let platform = PlatformManifest::builtin();
    let inputs = GeneratorInputs {
        index: &v2,
        libraries: None,
        platform: &platform,
        matches: None,
        old_tree: None,
        old_constructors: None,
    };
    let config = GeneratorConfig {
        simulate: true,
        ..GeneratorConfig::default()
    };
    let out2 = Generator::new(inputs, &mut resumed, config)
        .run()
        .expect("simulated run");
    out2.persist(&resumed, &tree_path, &ctors_path, &ledger_path)
        .unwrap();

    assert!(out2.simulated);
    assert_eq!(out2.report.new_classes, 7);
    assert_eq!(std::fs::read_to_string(&tree_path).unwrap(), tree_before);
    assert_eq!(std::fs::read_to_string(&ctors_path).unwrap(), ctors_before);
    assert_eq!(std::fs::read_to_string(&ledger_path).unwrap(), ledger_before);
}

#[test]
fn missing_ancestor_aborts_the_run() {
    let mut index = ArtifactIndex::new();
    index.insert(
        ClassDecl::new("a")
            .with_superclass("com/vendor/Gone")
            .with_method(MethodDecl::new("b", "()V")),
    );
    let mut ledger = NamingLedger::new();
    let platform = PlatformManifest::builtin();
    let inputs = GeneratorInputs {
        index: &index,
        libraries: None,
        platform: &platform,
        matches: None,
        old_tree: None,
        old_constructors: None,
    };
    let err = Generator::new(inputs, &mut ledger, GeneratorConfig::default())
        .run()
        .unwrap_err();
    assert!(matches!(err, surveyor::SurveyorError::MissingAncestor { .. }));
}
