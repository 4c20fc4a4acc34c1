#![allow(clippy::unwrap_used, clippy::expect_used)]

use objenealogist::project::{IndexError, index_directory};
use objenealogist::{MethodId, Reflection, SourceLocation, Visibility};
use tempfile::TempDir;

use crate::helpers::workspace::Workspace;

#[test]
fn test_index_gem_layout() {
    let ws = Workspace::new(&[
        (
            "lib/shop.rb",
            "module Shop\n  VERSION = '1.0'\nend\n",
        ),
        (
            "lib/shop/billing.rb",
            "module Shop\n  module Priced\n    def price = @price\n  end\nend\n",
        ),
        (
            "lib/shop/item.rb",
            "module Shop\n  class Item\n    include Priced\n\n    def initialize(price)\n      @price = price\n    end\n  end\nend\n",
        ),
        ("lib/shop/.hidden/ignored.rb", "class Ignored; end\n"),
        ("README.md", "# shop\n"),
    ]);

    assert!(ws.report.is_clean(), "{:?}", ws.report);
    assert_eq!(ws.report.indexed.len(), 3);
    assert!(!ws.runtime.contains("Ignored"));

    let item = ws.class("Shop::Item");
    let names: Vec<String> = ws
        .runtime
        .ancestors(&item)
        .into_iter()
        .map(|t| t.name.to_string())
        .collect();
    assert_eq!(names[..2], ["Shop::Item", "Shop::Priced"]);

    let instance = ws.runtime.allocate_uninitialized(&item);
    assert_eq!(
        ws.runtime.instance_methods(&instance, Visibility::Private),
        vec!["initialize"]
    );
    assert_eq!(
        ws.runtime.source_location(&item, &MethodId::instance("price")),
        Some(SourceLocation::new(ws.path("lib/shop/billing.rb"), 3))
    );
}

#[test]
fn test_index_reports_broken_files() {
    let ws = Workspace::new(&[
        ("good.rb", "class Good\nend\n"),
        ("broken.rb", "class Broken\n  def oops\n"),
    ]);
    assert!(ws.runtime.contains("Good"));
    assert_eq!(ws.report.failures.len(), 1);
    let failure = &ws.report.failures[0];
    assert!(matches!(failure, IndexError::Parse { .. }));
    assert_eq!(failure.path(), ws.path("broken.rb"));
    assert!(failure.to_string().contains("missing 'end'"));
}

#[test]
fn test_index_missing_directory() {
    let dir = TempDir::new().unwrap();
    let err = index_directory(&dir.path().join("absent")).unwrap_err();
    assert!(err.is_missing());
}
