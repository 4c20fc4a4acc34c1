#![allow(clippy::unwrap_used, clippy::expect_used)]

use objenealogist::{Genealogist, LocationFilter, Reflection, TreeOptions, to_tree};
use regex::Regex;
use rstest::rstest;

use crate::helpers::workspace::Workspace;

fn assert_match(pattern: &str, text: &str) {
    let re = Regex::new(&format!("(?m){pattern}")).unwrap();
    assert!(re.is_match(text), "expected /{pattern}/ in:\n{text}");
}

fn refute_match(pattern: &str, text: &str) {
    let re = Regex::new(&format!("(?m){pattern}")).unwrap();
    assert!(!re.is_match(text), "unexpected /{pattern}/ in:\n{text}");
}

fn my_class_tree(options: &TreeOptions) -> String {
    let ws = Workspace::my_class();
    assert!(ws.report.is_clean(), "{:?}", ws.report);
    to_tree(&ws.runtime, &ws.class("MyClass"), options)
}

#[test]
fn test_to_tree_root_line() {
    let out = my_class_tree(&TreeOptions::default());
    assert_match(r"\AC MyClass \(location: .*my_class\.rb:39\)$", &out);
}

#[test]
fn test_to_tree_with_show_methods_false() {
    let out = my_class_tree(&TreeOptions::new().with_methods(false));
    assert_match("C MyClass", &out);
    refute_match(r"│ .* c\b", &out);
}

#[test]
fn test_to_tree_with_show_locations_false() {
    let out = my_class_tree(&TreeOptions::new().with_locations(false));
    assert_match("C MyClass$", &out);
    refute_match(r"\(location:", &out);
}

#[test]
fn test_to_tree_with_show_locations_pattern() {
    let options = TreeOptions::new().with_locations(Regex::new("MyClass").unwrap());
    let out = my_class_tree(&options);
    assert_match(r"C MyClass \(location:", &out);
    assert_match("M M2$", &out);
}

#[rstest]
#[case::modules(&["M M1", "M M2"])]
#[case::superclasses(&["C NS::C2", "C C1"])]
#[case::own_methods(&[r"│ .* c\b", r"│ .* singleton_c\b"])]
#[case::module_methods(&[r"│ .* m1\b", r"│ .* m2\b"])]
fn test_to_tree_includes(#[case] patterns: &[&str]) {
    let out = my_class_tree(&TreeOptions::default());
    for pattern in patterns {
        assert_match(pattern, &out);
    }
}

#[test]
fn test_to_tree_skips_modules_of_superclasses() {
    let out = my_class_tree(&TreeOptions::new().with_methods(false).with_locations(false));
    // M5 hangs off C1 only, M3 and M4 off NS::C2 only
    assert_eq!(out.matches("M M5").count(), 1);
    assert_eq!(out.matches("M M3").count(), 1);
    assert!(!out.contains("Kernel"));
    assert!(!out.contains("C Object"));
    assert_match(r"^        └── M M5$", &out);
}

#[test]
fn test_to_tree_nested_class() {
    let ws = Workspace::my_class();
    let out = to_tree(&ws.runtime, &ws.class("NS::C2"), &TreeOptions::default());
    assert_match(r"C NS::C2 \(location:", &out);
    assert_match("M M4", &out);
    assert_match("C C1", &out);
    refute_match("MyClass", &out);
}

#[test]
fn test_to_tree_for_instance_matches_class() {
    let ws = Workspace::my_class();
    let class = ws.class("MyClass");
    let genealogist = Genealogist::new(&ws.runtime);
    let instance = ws.runtime.allocate_uninitialized(&class);
    assert_eq!(
        genealogist.to_tree_for_instance(&instance, &TreeOptions::default()),
        genealogist.to_tree(&class, &TreeOptions::default())
    );
}

#[test]
fn test_to_tree_reopened_and_nested() {
    let ws = Workspace::new(&[
        ("lib/widget.rb", crate::helpers::source_fixtures::REOPEN_FIRST),
        ("lib/widget_update.rb", crate::helpers::source_fixtures::REOPEN_SECOND),
        ("lib/report.rb", crate::helpers::source_fixtures::NESTED_HELPERS),
    ]);
    assert!(ws.report.is_clean(), "{:?}", ws.report);

    let widget = to_tree(&ws.runtime, &ws.class("Widget"), &TreeOptions::default());
    let first = ws.path("lib/widget.rb").display().to_string();
    let second = ws.path("lib/widget_update.rb").display().to_string();
    assert_eq!(
        widget.lines().next().unwrap(),
        format!("C Widget (location: {first}:1, {second}:3)")
    );
    assert!(widget.contains(&format!("render (location: {first}:2)")));
    assert!(widget.contains(&format!("update (location: {second}:6)")));

    let report = to_tree(&ws.runtime, &ws.class("Report"), &TreeOptions::new().with_locations(false));
    assert_eq!(
        report,
        "C Report\n│   └── title\n└── M Report::Formatting\n    └── bold"
    );
}

#[test]
fn test_location_filter_applies_to_method_owner() {
    let ws = Workspace::my_class();
    let options = TreeOptions {
        show_methods: true,
        show_locations: LocationFilter::Matching(Regex::new("^M1$").unwrap()),
    };
    let out = to_tree(&ws.runtime, &ws.class("MyClass"), &options);
    assert_match(r"^├── M M1 \(location: .*:3\)$", &out);
    assert_match(r"^│   └── m1 \(location: .*:4\)$", &out);
    assert_match(r"^│   ├── c$", &out);
}
