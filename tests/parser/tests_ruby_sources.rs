#![allow(clippy::unwrap_used, clippy::expect_used)]

use objenealogist::LineSpan;
use objenealogist::parser::{ErrorCode, parse};
use objenealogist::syntax::{DeclKind, DeclNode, RubyParser, SyntaxFile, SyntaxParser};
use rstest::rstest;

const SERVICE: &str = r#"# frozen_string_literal: true

require "json"

module Billing
  class Invoice < Base
    TEMPLATE = <<~TEXT
      class NotReal
      end
    TEXT

    attr_reader :lines

    def initialize(lines = [])
      @lines = lines.map { |l| l.strip }
    end

    def total
      lines.sum do |line|
        case line
        when /\A#/ then 0
        else line.to_i
        end
      end
    end

    def to_json(*args) = { total: total, class: self.class.name }.to_json(*args)

    def each_line
      return enum_for(:each_line) unless block_given?
      i = 0
      while i < lines.size
        yield lines[i]
        i += 1
      end
    end

    class << self
      def parse(text)
        new(text.split(%r{\n}))
      rescue ArgumentError => e
        warn "bad invoice: #{e.message}"
        nil
      end
    end

    private

    def words = %w[a b c]
  end

  module Helpers
    def self.format(n) = format("%.2f", n / 100.0)
  end
end
"#;

fn names(nodes: &[DeclNode]) -> Vec<String> {
    nodes.iter().map(DeclNode::local_name).collect()
}

#[test]
fn test_realistic_file_parses_cleanly() {
    let parse = parse(SERVICE);
    assert!(parse.ok(), "errors: {:?}", parse.errors);
    assert_eq!(parse.syntax().text().to_string(), SERVICE);
}

#[test]
fn test_realistic_file_declarations() {
    let tree = RubyParser.parse(SERVICE).unwrap();
    assert_eq!(names(&tree.roots), vec!["Billing"]);

    let billing = &tree.roots[0];
    assert_eq!(billing.kind, DeclKind::Module);
    assert_eq!(billing.span, LineSpan::new(5, 55));
    assert_eq!(names(&billing.children), vec!["Invoice", "Helpers"]);

    let invoice = &billing.children[0];
    assert_eq!(invoice.kind, DeclKind::Class);
    assert_eq!(invoice.span, LineSpan::new(6, 50));
    // the heredoc body is text, not a declaration
    assert!(invoice.children.is_empty());

    assert_eq!(billing.children[1].span, LineSpan::new(52, 54));
}

#[test]
fn test_line_index_counts_trailing_line() {
    let file = SyntaxFile::new(SERVICE);
    assert!(!file.has_errors());
    assert_eq!(file.line_index().line_count(), 56);
}

#[rstest]
#[case::missing_end("class A\n  def x\nend\n", ErrorCode::E0201, 4)]
#[case::stray_end("class A\nend\nend\n", ErrorCode::E0202, 3)]
#[case::unterminated_string("class A\n  X = \"open\nend\n", ErrorCode::E0102, 2)]
#[case::unterminated_heredoc("X = <<~EOS\n  never closed\n", ErrorCode::E0104, 2)]
fn test_broken_sources(#[case] source: &str, #[case] code: ErrorCode, #[case] line: u32) {
    let err = RubyParser.parse(source).unwrap_err();
    assert_eq!(err.code, Some(code), "{err}");
    assert_eq!(err.line, line, "{err}");
}
