#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};

use objenealogist::project::MemoryLoader;
use objenealogist::syntax::{ParseError, RubyParser, SyntaxParser, SyntaxTree};
use objenealogist::{Genealogist, MethodKind, SourceLocation, build_location_map};

use crate::helpers::source_fixtures::{MY_CLASS, NESTED_HELPERS, REOPEN_FIRST, REOPEN_SECOND};
use crate::helpers::workspace::Workspace;

/// Counts how many files get parsed
#[derive(Default)]
struct CountingParser {
    calls: AtomicUsize,
}

impl SyntaxParser for CountingParser {
    fn parse(&self, text: &str) -> Result<SyntaxTree, ParseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        RubyParser.parse(text)
    }
}

#[test]
fn test_location_map_entries() {
    let ws = Workspace::my_class();
    let map = build_location_map(&ws.runtime, &ws.class("MyClass"));
    let file = ws.path("test/my_class.rb");

    let names: Vec<&str> = map.names().map(|n| n.as_str()).collect();
    assert_eq!(
        names,
        vec!["MyClass", "M2", "M1", "NS::C2", "M4", "M3", "C1", "M5"]
    );
    assert_eq!(
        map.get("MyClass").unwrap().locations(),
        vec![SourceLocation::new(&file, 39)]
    );

    let c = map
        .methods("MyClass")
        .iter()
        .find(|m| m.name == "c")
        .unwrap();
    assert_eq!(c.kind, MethodKind::Instance);
    assert_eq!(c.location, Some(SourceLocation::new(&file, 43)));
}

#[test]
fn test_each_file_is_scanned_once() {
    let ws = Workspace::new(&[
        ("a_widget.rb", REOPEN_FIRST),
        ("b_widget.rb", REOPEN_SECOND),
    ]);
    let parser = CountingParser::default();
    let genealogist = Genealogist::new(&ws.runtime).with_parser(&parser);
    let map = genealogist.location_map(&ws.class("Widget"));

    assert_eq!(parser.calls.load(Ordering::SeqCst), 2);
    assert_eq!(map.declarations("Widget").len(), 2);
    assert_eq!(map.methods("Widget").len(), 3);
}

#[test]
fn test_deleted_file_is_skipped() {
    let ws = Workspace::new(&[
        ("a_widget.rb", REOPEN_FIRST),
        ("b_widget.rb", REOPEN_SECOND),
    ]);
    fs::remove_file(ws.path("b_widget.rb")).unwrap();

    let map = build_location_map(&ws.runtime, &ws.class("Widget"));
    let widget = map.get("Widget").unwrap();
    assert_eq!(widget.declarations.len(), 1);
    let update = widget.methods.iter().find(|m| m.name == "update").unwrap();
    assert_eq!(update.location, None);
    let render = widget.methods.iter().find(|m| m.name == "render").unwrap();
    assert_eq!(
        render.location,
        Some(SourceLocation::new(ws.path("a_widget.rb"), 2))
    );
}

#[test]
fn test_swapped_loader_sees_edited_sources() {
    let ws = Workspace::new(&[("report.rb", NESTED_HELPERS)]);
    let file = ws.path("report.rb");

    // same text shifted down two lines: the reported lines now fall outside
    // the nested module, so everything lands on the class itself
    let shifted = format!("\n\n{NESTED_HELPERS}");
    let loader = MemoryLoader::new().with_file(&file, shifted);
    let map = Genealogist::new(&ws.runtime)
        .with_loader(loader)
        .location_map(&ws.class("Report"));

    assert!(map.methods("Report::Formatting").is_empty());
    assert_eq!(map.methods("Report").len(), 2);
}

#[test]
fn test_build_twice_is_equal() {
    let ws = Workspace::new(&[("my_class.rb", MY_CLASS)]);
    let class = ws.class("MyClass");
    assert_eq!(
        build_location_map(&ws.runtime, &class),
        build_location_map(&ws.runtime, &class)
    );
}
