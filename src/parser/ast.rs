//! Typed AST wrappers over the untyped rowan CST.
//!
//! Each struct wraps a SyntaxNode and provides methods to access children.

use smol_str::SmolStr;

use super::syntax_kind::SyntaxKind;
use super::{SyntaxNode, SyntaxToken};

/// Trait for AST nodes that wrap a SyntaxNode
pub trait AstNode: Sized {
    fn can_cast(kind: SyntaxKind) -> bool;
    fn cast(node: SyntaxNode) -> Option<Self>;
    fn syntax(&self) -> &SyntaxNode;
}

// ============================================================================
// Helper macros
// ============================================================================

macro_rules! ast_node {
    ($name:ident, $kind:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(SyntaxNode);

        impl AstNode for $name {
            fn can_cast(kind: SyntaxKind) -> bool {
                kind == SyntaxKind::$kind
            }

            fn cast(node: SyntaxNode) -> Option<Self> {
                if Self::can_cast(node.kind()) {
                    Some(Self(node))
                } else {
                    None
                }
            }

            fn syntax(&self) -> &SyntaxNode {
                &self.0
            }
        }
    };
}

/// Non-trivia tokens that are direct children of `node`
fn significant_tokens(node: &SyntaxNode) -> impl Iterator<Item = SyntaxToken> + '_ {
    node.children_with_tokens()
        .filter_map(|element| element.into_token())
        .filter(|token| !token.kind().is_trivia())
}

/// Name carried by a symbol or string literal: `:foo`, `:"foo"`, `"foo"`, `'foo'`
pub fn literal_name(token: &SyntaxToken) -> Option<SmolStr> {
    let text = token.text();
    let body = match token.kind() {
        SyntaxKind::SYMBOL => text.strip_prefix(':')?,
        SyntaxKind::STRING => text,
        _ => return None,
    };
    let unquoted = body
        .strip_prefix('"')
        .and_then(|b| b.strip_suffix('"'))
        .or_else(|| body.strip_prefix('\'').and_then(|b| b.strip_suffix('\'')))
        .unwrap_or(body);
    if unquoted.is_empty() || unquoted.contains("#{") {
        return None;
    }
    Some(SmolStr::new(unquoted))
}

// ============================================================================
// Root
// ============================================================================

ast_node!(SourceFile, SOURCE_FILE);

impl SourceFile {
    /// Top-level statements that matter to declarations
    pub fn items(&self) -> impl Iterator<Item = BodyItem> + '_ {
        self.0.children().filter_map(BodyItem::cast)
    }
}

// ============================================================================
// Declarations
// ============================================================================

/// A class or module opening
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Declaration {
    Class(ClassDef),
    Module(ModuleDef),
}

impl AstNode for Declaration {
    fn can_cast(kind: SyntaxKind) -> bool {
        matches!(kind, SyntaxKind::CLASS_DEF | SyntaxKind::MODULE_DEF)
    }

    fn cast(node: SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::CLASS_DEF => Some(Self::Class(ClassDef(node))),
            SyntaxKind::MODULE_DEF => Some(Self::Module(ModuleDef(node))),
            _ => None,
        }
    }

    fn syntax(&self) -> &SyntaxNode {
        match self {
            Self::Class(n) => n.syntax(),
            Self::Module(n) => n.syntax(),
        }
    }
}

impl Declaration {
    pub fn name(&self) -> Option<ConstPath> {
        self.syntax().children().find_map(ConstPath::cast)
    }

    pub fn body(&self) -> Option<Body> {
        self.syntax().children().find_map(Body::cast)
    }

    pub fn is_module(&self) -> bool {
        matches!(self, Self::Module(_))
    }
}

ast_node!(ClassDef, CLASS_DEF);

impl ClassDef {
    pub fn name(&self) -> Option<ConstPath> {
        self.0.children().find_map(ConstPath::cast)
    }

    pub fn superclass(&self) -> Option<Superclass> {
        self.0.children().find_map(Superclass::cast)
    }

    pub fn body(&self) -> Option<Body> {
        self.0.children().find_map(Body::cast)
    }
}

ast_node!(ModuleDef, MODULE_DEF);

impl ModuleDef {
    pub fn name(&self) -> Option<ConstPath> {
        self.0.children().find_map(ConstPath::cast)
    }

    pub fn body(&self) -> Option<Body> {
        self.0.children().find_map(Body::cast)
    }
}

ast_node!(SingletonClass, SINGLETON_CLASS);

impl SingletonClass {
    /// `class << self` (as opposed to `class << some_object`)
    pub fn is_self(&self) -> bool {
        let mut target = self
            .0
            .children_with_tokens()
            .take_while(|e| e.kind() != SyntaxKind::BODY)
            .filter_map(|e| e.into_token())
            .filter(|t| !t.kind().is_trivia())
            .skip_while(|t| t.kind() != SyntaxKind::LT_LT)
            .skip(1);
        matches!(target.next(), Some(t) if t.kind() == SyntaxKind::SELF_KW) && target.next().is_none()
    }

    pub fn body(&self) -> Option<Body> {
        self.0.children().find_map(Body::cast)
    }
}

ast_node!(ConstPath, CONST_PATH);

impl ConstPath {
    /// `::Foo` is resolved from the top level
    pub fn is_absolute(&self) -> bool {
        significant_tokens(&self.0)
            .next()
            .is_some_and(|t| t.kind() == SyntaxKind::COLON_COLON)
    }

    pub fn segments(&self) -> Vec<SmolStr> {
        significant_tokens(&self.0)
            .filter(|t| t.kind() == SyntaxKind::CONSTANT)
            .map(|t| SmolStr::new(t.text()))
            .collect()
    }

    /// Path as written, without the leading `::`
    pub fn text(&self) -> String {
        self.segments().join("::")
    }
}

ast_node!(Superclass, SUPERCLASS);

impl Superclass {
    /// The superclass when it is a plain constant path (`< Foo::Bar`),
    /// `None` for expressions like `< Struct.new(:a)`.
    pub fn path(&self) -> Option<ConstPath> {
        let path = self.0.children().find_map(ConstPath::cast)?;
        let trailing = self
            .0
            .children_with_tokens()
            .skip_while(|e| e.as_node() != Some(path.syntax()))
            .skip(1)
            .any(|e| !e.kind().is_trivia() && !e.kind().is_terminator());
        (!trailing).then_some(path)
    }
}

ast_node!(Body, BODY);

impl Body {
    pub fn items(&self) -> impl Iterator<Item = BodyItem> + '_ {
        self.0.children().filter_map(BodyItem::cast)
    }
}

// ============================================================================
// Body items
// ============================================================================

/// A statement inside a declaration body that affects the object model
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BodyItem {
    Declaration(Declaration),
    SingletonClass(SingletonClass),
    Method(MethodDef),
    Mixin(MixinCall),
    Visibility(VisibilityCall),
    Attr(AttrCall),
    Block(EndBlock),
}

impl AstNode for BodyItem {
    fn can_cast(kind: SyntaxKind) -> bool {
        Declaration::can_cast(kind)
            || matches!(
                kind,
                SyntaxKind::SINGLETON_CLASS
                    | SyntaxKind::METHOD_DEF
                    | SyntaxKind::MIXIN_CALL
                    | SyntaxKind::VISIBILITY_CALL
                    | SyntaxKind::ATTR_CALL
                    | SyntaxKind::END_BLOCK
            )
    }

    fn cast(node: SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::CLASS_DEF | SyntaxKind::MODULE_DEF => {
                Declaration::cast(node).map(Self::Declaration)
            }
            SyntaxKind::SINGLETON_CLASS => Some(Self::SingletonClass(SingletonClass(node))),
            SyntaxKind::METHOD_DEF => Some(Self::Method(MethodDef(node))),
            SyntaxKind::MIXIN_CALL => Some(Self::Mixin(MixinCall(node))),
            SyntaxKind::VISIBILITY_CALL => Some(Self::Visibility(VisibilityCall(node))),
            SyntaxKind::ATTR_CALL => Some(Self::Attr(AttrCall(node))),
            SyntaxKind::END_BLOCK => Some(Self::Block(EndBlock(node))),
            _ => None,
        }
    }

    fn syntax(&self) -> &SyntaxNode {
        match self {
            Self::Declaration(n) => n.syntax(),
            Self::SingletonClass(n) => n.syntax(),
            Self::Method(n) => n.syntax(),
            Self::Mixin(n) => n.syntax(),
            Self::Visibility(n) => n.syntax(),
            Self::Attr(n) => n.syntax(),
            Self::Block(n) => n.syntax(),
        }
    }
}

ast_node!(MethodDef, METHOD_DEF);

impl MethodDef {
    pub fn name(&self) -> Option<SmolStr> {
        self.0
            .children()
            .find(|n| n.kind() == SyntaxKind::METHOD_NAME)
            .map(|n| SmolStr::new(n.text().to_string()))
    }

    pub fn receiver(&self) -> Option<MethodReceiver> {
        self.0.children().find_map(MethodReceiver::cast)
    }

    /// `def name = expr`
    pub fn is_endless(&self) -> bool {
        significant_tokens(&self.0).any(|t| t.kind() == SyntaxKind::EQ)
    }
}

ast_node!(MethodReceiver, METHOD_RECEIVER);

impl MethodReceiver {
    pub fn is_self(&self) -> bool {
        significant_tokens(&self.0)
            .next()
            .is_some_and(|t| t.kind() == SyntaxKind::SELF_KW)
    }

    /// Receiver constant for `def Foo.bar`
    pub fn constant(&self) -> Option<SmolStr> {
        significant_tokens(&self.0)
            .find(|t| t.kind() == SyntaxKind::CONSTANT)
            .map(|t| SmolStr::new(t.text()))
    }
}

/// Which mixin call a [`MixinCall`] is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MixinKind {
    Include,
    Prepend,
    Extend,
}

ast_node!(MixinCall, MIXIN_CALL);

impl MixinCall {
    pub fn kind(&self) -> Option<MixinKind> {
        match significant_tokens(&self.0).next()?.text() {
            "include" => Some(MixinKind::Include),
            "prepend" => Some(MixinKind::Prepend),
            "extend" => Some(MixinKind::Extend),
            _ => None,
        }
    }

    /// Constant arguments in call order
    pub fn targets(&self) -> impl Iterator<Item = ConstPath> + '_ {
        self.0.children().filter_map(ConstPath::cast)
    }

    /// `extend self`
    pub fn targets_self(&self) -> bool {
        significant_tokens(&self.0).any(|t| t.kind() == SyntaxKind::SELF_KW)
    }
}

ast_node!(VisibilityCall, VISIBILITY_CALL);

impl VisibilityCall {
    /// `private`, `protected`, `public`, `module_function`, ...
    pub fn name(&self) -> SmolStr {
        significant_tokens(&self.0)
            .next()
            .map(|t| SmolStr::new(t.text()))
            .unwrap_or_default()
    }

    /// No arguments: applies to the definitions that follow
    pub fn is_bare(&self) -> bool {
        significant_tokens(&self.0).nth(1).is_none() && self.0.children().next().is_none()
    }

    /// Method names passed as symbols or strings
    pub fn symbols(&self) -> Vec<SmolStr> {
        significant_tokens(&self.0)
            .filter_map(|t| literal_name(&t))
            .collect()
    }

    /// `private def foo ... end`
    pub fn method_defs(&self) -> impl Iterator<Item = MethodDef> + '_ {
        self.0.children().filter_map(MethodDef::cast)
    }

    /// `private attr_reader :foo`
    pub fn attr_calls(&self) -> impl Iterator<Item = AttrCall> + '_ {
        self.0.children().filter_map(AttrCall::cast)
    }
}

/// Which accessors an [`AttrCall`] generates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrKind {
    Reader,
    Writer,
    Accessor,
}

impl AttrKind {
    pub fn reads(self) -> bool {
        matches!(self, Self::Reader | Self::Accessor)
    }

    pub fn writes(self) -> bool {
        matches!(self, Self::Writer | Self::Accessor)
    }
}

ast_node!(AttrCall, ATTR_CALL);

impl AttrCall {
    pub fn kind(&self) -> Option<AttrKind> {
        match significant_tokens(&self.0).next()?.text() {
            "attr_reader" | "attr" => Some(AttrKind::Reader),
            "attr_writer" => Some(AttrKind::Writer),
            "attr_accessor" => Some(AttrKind::Accessor),
            _ => None,
        }
    }

    pub fn names(&self) -> Vec<SmolStr> {
        significant_tokens(&self.0)
            .filter_map(|t| literal_name(&t))
            .collect()
    }
}

ast_node!(EndBlock, END_BLOCK);

impl EndBlock {
    /// Items nested in the block (`if defined?(X) ... def y; end ... end`)
    pub fn items(&self) -> impl Iterator<Item = BodyItem> + '_ {
        self.0.children().filter_map(BodyItem::cast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn source_file(source: &str) -> SourceFile {
        let parse = parse(source);
        assert!(parse.ok(), "errors: {:?}", parse.errors);
        SourceFile::cast(parse.syntax()).unwrap()
    }

    fn first_declaration(source: &str) -> Declaration {
        source_file(source)
            .items()
            .find_map(|item| match item {
                BodyItem::Declaration(d) => Some(d),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_declaration_name_segments() {
        let decl = first_declaration("class ::NS::C2 < C1\nend\n");
        let name = decl.name().unwrap();
        assert!(name.is_absolute());
        assert_eq!(name.segments(), vec!["NS", "C2"]);
        assert_eq!(name.text(), "NS::C2");
    }

    #[test]
    fn test_superclass_path_only_for_constants() {
        let Declaration::Class(class) = first_declaration("class A < B::C\nend\n") else {
            panic!("expected class");
        };
        assert_eq!(class.superclass().unwrap().path().unwrap().text(), "B::C");

        let Declaration::Class(class) = first_declaration("class A < Struct.new(:x)\nend\n")
        else {
            panic!("expected class");
        };
        assert!(class.superclass().unwrap().path().is_none());
    }

    #[test]
    fn test_body_items() {
        let source = "module M\n  include A, B\n  extend self\n  attr_accessor :x, 'y'\n  private\n  def a; end\n  def self.b = 1\nend\n";
        let body = first_declaration(source).body().unwrap();
        let items: Vec<_> = body.items().collect();
        assert_eq!(items.len(), 6);

        let BodyItem::Mixin(include) = &items[0] else {
            panic!("expected mixin");
        };
        assert_eq!(include.kind(), Some(MixinKind::Include));
        assert_eq!(include.targets().count(), 2);

        let BodyItem::Mixin(extend) = &items[1] else {
            panic!("expected mixin");
        };
        assert!(extend.targets_self());

        let BodyItem::Attr(attr) = &items[2] else {
            panic!("expected attr");
        };
        assert_eq!(attr.kind(), Some(AttrKind::Accessor));
        assert_eq!(attr.names(), vec!["x", "y"]);

        let BodyItem::Visibility(private) = &items[3] else {
            panic!("expected visibility");
        };
        assert!(private.is_bare());

        let BodyItem::Method(singleton) = &items[5] else {
            panic!("expected method");
        };
        assert_eq!(singleton.name().as_deref(), Some("b"));
        assert!(singleton.receiver().unwrap().is_self());
        assert!(singleton.is_endless());
    }

    #[test]
    fn test_visibility_with_arguments() {
        let source = "class A\n  private :a, :b\n  private def c; end\nend\n";
        let body = first_declaration(source).body().unwrap();
        let calls: Vec<_> = body
            .items()
            .filter_map(|item| match item {
                BodyItem::Visibility(v) => Some(v),
                _ => None,
            })
            .collect();
        assert_eq!(calls[0].symbols(), vec!["a", "b"]);
        assert!(!calls[0].is_bare());
        assert_eq!(calls[1].method_defs().count(), 1);
        assert!(!calls[1].is_bare());
    }

    #[test]
    fn test_singleton_class_target() {
        let source = "class A\n  class << self\n    def x; end\n  end\nend\n";
        let body = first_declaration(source).body().unwrap();
        let Some(BodyItem::SingletonClass(singleton)) = body.items().next() else {
            panic!("expected singleton class");
        };
        assert!(singleton.is_self());
        assert_eq!(singleton.body().unwrap().items().count(), 1);
    }

    #[test]
    fn test_literal_name_rejects_interpolation() {
        let source = "class A\n  attr_reader :\"a#{1}\", :b\nend\n";
        let body = first_declaration(source).body().unwrap();
        let Some(BodyItem::Attr(attr)) = body.items().next() else {
            panic!("expected attr");
        };
        assert_eq!(attr.names(), vec!["b"]);
    }
}
