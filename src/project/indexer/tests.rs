#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::project::MemoryLoader;
use crate::runtime::{Reflection, TypeKind, TypeRef};
use rstest::rstest;
use std::fs;
use tempfile::TempDir;

fn index(files: &[(&str, &str)]) -> (Runtime, IndexReport) {
    let mut loader = MemoryLoader::new();
    for (path, text) in files {
        loader.insert(*path, *text);
    }
    let paths: Vec<PathBuf> = files.iter().map(|(p, _)| PathBuf::from(p)).collect();
    index_sources(&loader, &paths)
}

fn ancestors(runtime: &Runtime, name: &str) -> Vec<String> {
    runtime
        .ancestor_names(name)
        .into_iter()
        .map(|n| n.to_string())
        .collect()
}

fn line_of(runtime: &Runtime, class: &str, method: &MethodId) -> Option<u32> {
    let ty = runtime.lookup(class).unwrap();
    runtime.source_location(&ty, method).map(|l| l.line)
}

const HIERARCHY: &str = "\
module M3
  def m3 = :m3
end

module M4
  include M3
  def m4 = :m4
end

class C1
  def c1 = :c1
end

module NS
  class C2 < C1
    include M4
    def c2 = :c2
  end
end

class MyClass < NS::C2
  def c = :c
  def self.singleton_c = :singleton_c
end
";

#[test]
fn test_index_hierarchy() {
    let (runtime, report) = index(&[("my_class.rb", HIERARCHY)]);
    assert!(report.is_clean(), "{report:?}");
    assert_eq!(
        ancestors(&runtime, "MyClass"),
        vec!["MyClass", "NS::C2", "M4", "M3", "C1", "Object", "Kernel", "BasicObject"]
    );
    assert_eq!(line_of(&runtime, "MyClass", &MethodId::instance("c")), Some(22));
    assert_eq!(
        line_of(&runtime, "MyClass", &MethodId::singleton("singleton_c")),
        Some(23)
    );
    assert_eq!(line_of(&runtime, "MyClass", &MethodId::instance("m3")), Some(2));
    assert_eq!(runtime.lookup("NS").unwrap().kind, TypeKind::Module);
}

#[test]
fn test_reopen_across_files() {
    let (runtime, report) = index(&[
        ("a.rb", "class Foo\n  def a; end\nend\n"),
        ("b.rb", "\n\nclass Foo\n  def b; end\nend\n"),
    ]);
    assert_eq!(report.indexed.len(), 2);
    let a = runtime.find_method("Foo", "a").unwrap().1.location.clone().unwrap();
    let b = runtime.find_method("Foo", "b").unwrap().1.location.clone().unwrap();
    assert_eq!(a, SourceLocation::new("a.rb", 2));
    assert_eq!(b, SourceLocation::new("b.rb", 4));
}

#[test]
fn test_lexical_constant_resolution() {
    let source = "\
module Outer
  module Helpers
    def help; end
  end

  class Inner
    include Helpers
  end
end

module Helpers
end
";
    let (runtime, _) = index(&[("outer.rb", source)]);
    let inner = ancestors(&runtime, "Outer::Inner");
    assert_eq!(inner[1], "Outer::Helpers");
    assert!(runtime.contains("Helpers"));
}

#[test]
fn test_namespaced_reopen_resolves_prefix() {
    let (runtime, report) = index(&[
        ("ns.rb", "module NS\nend\n"),
        ("c.rb", "class NS::Widget\n  def w; end\nend\n"),
    ]);
    assert!(report.is_clean(), "{report:?}");
    assert!(runtime.contains("NS::Widget"));
}

#[test]
fn test_visibility_tracking() {
    let source = "\
class Account
  attr_reader :id
  attr_accessor :name

  def initialize(id)
    @id = id
  end

  def balance; end

  protected

  def ledger; end

  private

  def audit; end

  public def open?; end

  private :balance
end
";
    let (runtime, report) = index(&[("account.rb", source)]);
    assert!(report.is_clean(), "{report:?}");
    let class = runtime.lookup("Account").unwrap();
    let instance = runtime.allocate_uninitialized(&class);
    assert_eq!(
        runtime.instance_methods(&instance, Visibility::Public),
        vec!["id", "name", "name=", "open?"]
    );
    assert_eq!(
        runtime.instance_methods(&instance, Visibility::Protected),
        vec!["ledger"]
    );
    assert_eq!(
        runtime.instance_methods(&instance, Visibility::Private),
        vec!["initialize", "balance", "audit"]
    );
}

#[test]
fn test_singleton_forms() {
    let source = "\
class Config
  class << self
    attr_accessor :current

    def load; end

    private

    def parse; end
  end

  def self.reset; end
  private_class_method def self.secret; end
end
";
    let (runtime, report) = index(&[("config.rb", source)]);
    assert!(report.is_clean(), "{report:?}");
    let class = runtime.lookup("Config").unwrap();
    let methods = runtime.singleton_methods(&class);
    assert!(methods.contains(&"current".into()));
    assert!(methods.contains(&"current=".into()));
    assert!(methods.contains(&"load".into()));
    assert!(methods.contains(&"reset".into()));
    assert!(!methods.contains(&"secret".into()));
    assert!(!methods.contains(&"parse".into()));
    assert_eq!(
        line_of(&runtime, "Config", &MethodId::singleton("load")),
        Some(5)
    );
}

#[test]
fn test_module_function() {
    let source = "\
module Util
  module_function

  def tidy; end
end

module Other
  def shout; end
  module_function :shout
end
";
    let (runtime, report) = index(&[("util.rb", source)]);
    assert!(report.is_clean(), "{report:?}");
    for (module, method) in [("Util", "tidy"), ("Other", "shout")] {
        let ty = runtime.lookup(module).unwrap();
        assert_eq!(runtime.singleton_methods(&ty), vec![method]);
        let ids = runtime.methods_of(&ty);
        assert!(ids.contains(&MethodId::instance(method)));
    }
}

#[test]
fn test_extend_and_prepend() {
    let source = "\
module Loud
  def speak; end
end

module Tracing
end

class Dog
  extend Loud
  prepend Tracing
end
";
    let (runtime, _) = index(&[("dog.rb", source)]);
    let dog = runtime.lookup("Dog").unwrap();
    assert_eq!(runtime.singleton_methods(&dog), vec!["speak"]);
    assert_eq!(ancestors(&runtime, "Dog")[..2], ["Tracing", "Dog"]);
}

#[test]
fn test_include_multiple_targets_keeps_written_order() {
    let source = "module A; end\nmodule B; end\nclass K\n  include A, B\nend\n";
    let (runtime, _) = index(&[("k.rb", source)]);
    assert_eq!(ancestors(&runtime, "K")[..3], ["K", "A", "B"]);
}

#[test]
fn test_methods_in_conditional_blocks() {
    let source = "\
class Feature
  if ENV['X']
    def maybe; end
  end

  [1].each do |i|
    include Comparable if i
  end
end
";
    let (runtime, _) = index(&[("feature.rb", source)]);
    assert_eq!(
        line_of(&runtime, "Feature", &MethodId::instance("maybe")),
        Some(3)
    );
}

#[rstest]
#[case::include("class K\n  include Missing\nend\n", "Missing", TypeKind::Module, 2)]
#[case::superclass("class K < Base\nend\n", "Base", TypeKind::Class, 1)]
#[case::namespace("class Api::K\nend\n", "Api", TypeKind::Module, 1)]
fn test_unresolved_constants_become_placeholders(
    #[case] source: &str,
    #[case] placeholder: &str,
    #[case] kind: TypeKind,
    #[case] line: u32,
) {
    let (runtime, report) = index(&[("k.rb", source)]);
    assert_eq!(runtime.lookup(placeholder), Some(TypeRef { name: placeholder.into(), kind }));
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].message.contains(placeholder));
    assert_eq!(report.warnings[0].location.line, line);
}

#[test]
fn test_superclass_mismatch_is_warned() {
    let (runtime, report) = index(&[
        ("a.rb", "class Base; end\nclass Other; end\nclass K < Base; end\n"),
        ("b.rb", "class K < Other\n  def k; end\nend\n"),
    ]);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].message.contains("ignored reopen mismatch"));
    // the body is still indexed against the existing class
    assert!(runtime.find_method("K", "k").is_some());
    assert_eq!(
        runtime.superclass(&runtime.lookup("K").unwrap()).unwrap().name,
        "Base"
    );
}

#[test]
fn test_failures_do_not_stop_indexing() {
    let mut loader = MemoryLoader::new()
        .with_file("good.rb", "class Good; end\n")
        .with_file("bad.rb", "class Bad\n  def x\nend\n");
    loader.insert("other.rb", "module Other; end\n");
    let paths = vec![
        PathBuf::from("bad.rb"),
        PathBuf::from("missing.rb"),
        PathBuf::from("good.rb"),
        PathBuf::from("good.rb"),
    ];
    let (runtime, report) = index_sources(&loader, &paths);

    assert!(runtime.contains("Good"));
    assert!(!runtime.contains("Bad"));
    assert_eq!(report.indexed, vec![PathBuf::from("good.rb")]);
    assert_eq!(report.failures.len(), 2);
    assert!(matches!(report.failures[0], IndexError::Parse { .. }));
    assert_eq!(report.failures[0].path(), Path::new("bad.rb"));
    assert!(matches!(report.failures[1], IndexError::Load(ref e) if e.is_missing()));
}

#[test]
fn test_index_directory() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.rb"), "module A\n  def a; end\nend\n").unwrap();
    fs::create_dir(dir.path().join("lib")).unwrap();
    fs::write(dir.path().join("lib/b.rb"), "class B\n  include A\nend\n").unwrap();

    let (runtime, report) = index_directory(dir.path()).unwrap();
    assert!(report.is_clean(), "{report:?}");
    let (owner, info) = runtime.find_method("B", "a").unwrap();
    assert_eq!(owner, "A");
    assert_eq!(info.location.as_ref().unwrap().file, dir.path().join("a.rb"));
}
