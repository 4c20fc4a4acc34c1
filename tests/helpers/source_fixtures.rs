//! Common Ruby sources for tests.

/// `MyClass < NS::C2 < C1` with modules M1..M5
pub const MY_CLASS: &str = include_str!("../fixtures/my_class.rb");

/// A class opened in two files, each adding a method
pub const REOPEN_FIRST: &str = "\
class Widget
  def render; end
end
";

pub const REOPEN_SECOND: &str = "\
# frozen_string_literal: true

class Widget
  attr_reader :size

  def update(size)
    @size = size
  end
end
";

/// Methods defined inside a module nested in the class that includes it
pub const NESTED_HELPERS: &str = "\
class Report
  module Formatting
    def bold(text)
      \"*#{text}*\"
    end
  end

  include Formatting

  def title = bold('Report')
end
";
