//! A parsed Java compilation unit.

use super::convert::{Converter, all_children, is_expression_kind, named_children};
use super::{Expr, JavaType, Span, simple_name};
use crate::error::Result;
use crate::lang::{Java, Language};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, QueryCursor, Tree};

static STRING_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"\\]*)""#).expect("valid regex"));

/// An `import` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    /// The imported name without `import`, `static` or the trailing `.*`.
    pub path: String,
    pub is_static: bool,
    pub wildcard: bool,
    pub span: Span,
}

impl ImportDecl {
    fn parse(text: &str, span: Span) -> Option<Self> {
        let body = text.trim().strip_prefix("import")?.trim_end_matches(';').trim();
        let (is_static, body) = match body.strip_prefix("static ") {
            Some(rest) => (true, rest.trim()),
            None => (false, body),
        };
        let body: String = body.chars().filter(|c| !c.is_whitespace()).collect();
        let (wildcard, path) = match body.strip_suffix(".*") {
            Some(prefix) => (true, prefix.to_string()),
            None => (false, body),
        };
        Some(Self {
            path,
            is_static,
            wildcard,
            span,
        })
    }

    /// Returns the simple name this import brings into scope, if any.
    pub fn simple_name(&self) -> Option<&str> {
        (!self.wildcard).then(|| simple_name(&self.path))
    }
}

/// A `@SuppressWarnings` annotation and the declaration it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suppression {
    pub names: Vec<String>,
    pub span: Span,
}

/// A variable, field or parameter declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    /// `None` for `var` declarations and inferred lambda parameters.
    pub ty: Option<JavaType>,
    /// The initializer of a `var` declaration.
    pub init: Option<Expr>,
    pub offset: usize,
}

/// Where new import declarations go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportAnchor {
    AfterImports(usize),
    AfterPackage(usize),
    Start,
}

/// A parsed source file with the facts the engine needs about it.
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    source: String,
    roots: Vec<Expr>,
    imports: Vec<ImportDecl>,
    package: Option<String>,
    suppressions: Vec<Suppression>,
    declarations: Vec<Declaration>,
    declared_types: HashSet<String>,
    type_variables: HashSet<String>,
    identifiers: HashSet<String>,
    import_anchor: ImportAnchor,
    error_count: usize,
}

impl CompilationUnit {
    /// Parses a Java source file.
    pub fn parse(source: &str) -> Result<Self> {
        let tree = Java.parse(source)?;
        let mut unit = Self {
            source: source.to_string(),
            roots: Vec::new(),
            imports: Vec::new(),
            package: None,
            suppressions: Vec::new(),
            declarations: Vec::new(),
            declared_types: HashSet::new(),
            type_variables: HashSet::new(),
            identifiers: HashSet::new(),
            import_anchor: ImportAnchor::Start,
            error_count: 0,
        };

        unit.collect_headers(&tree)?;
        unit.collect_suppressions(&tree)?;
        unit.walk(tree.root_node());

        let mut converter = Converter::new(source);
        let mut roots = Vec::new();
        collect_roots(tree.root_node(), &mut converter, &mut roots);
        unit.roots = roots;

        Ok(unit)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Top-level expressions in source order.
    ///
    /// Subexpressions are reachable through the roots; expressions nested in
    /// unmodeled syntax (block lambdas, anonymous classes) are roots themselves.
    pub fn roots(&self) -> &[Expr] {
        &self.roots
    }

    pub fn imports(&self) -> &[ImportDecl] {
        &self.imports
    }

    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    pub fn suppressions(&self) -> &[Suppression] {
        &self.suppressions
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn import_anchor(&self) -> ImportAnchor {
        self.import_anchor
    }

    /// Number of syntax errors tree-sitter recovered from.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Identifiers and operator tokens that occur anywhere in the file.
    pub fn identifiers(&self) -> &HashSet<String> {
        &self.identifiers
    }

    pub fn has_identifier(&self, ident: &str) -> bool {
        self.identifiers.contains(ident)
    }

    /// Whether a class, interface, enum or record with this simple name is declared here.
    pub fn declares_type(&self, simple: &str) -> bool {
        self.declared_types.contains(simple)
    }

    pub fn is_type_variable(&self, name: &str) -> bool {
        self.type_variables.contains(name)
    }

    /// Returns the declaration of `name` visible at `offset`.
    ///
    /// Prefers the closest preceding declaration; falls back to the first
    /// declaration in the file, which covers fields declared further down.
    pub fn declaration(&self, name: &str, offset: usize) -> Option<&Declaration> {
        let mut candidates = self.declarations.iter().filter(|d| d.name == name);
        let first = candidates.clone().next();
        candidates
            .filter(|d| d.offset <= offset)
            .max_by_key(|d| d.offset)
            .or(first)
    }

    /// Returns the single-type import for a simple name.
    pub fn import_of(&self, simple: &str, is_static: bool) -> Option<&ImportDecl> {
        self.imports
            .iter()
            .find(|i| i.is_static == is_static && i.simple_name() == Some(simple))
    }

    /// Whether `qualified` is already visible under its simple name.
    pub fn imports_name(&self, qualified: &str, is_static: bool) -> bool {
        let (owner, _) = qualified.rsplit_once('.').unwrap_or(("", qualified));
        self.imports.iter().any(|i| {
            i.is_static == is_static
                && ((!i.wildcard && i.path == qualified) || (i.wildcard && i.path == owner))
        }) || (!is_static && (owner == "java.lang" || Some(owner) == self.package()))
    }

    fn collect_headers(&mut self, tree: &Tree) -> Result<()> {
        let query = Java.query("(package_declaration) @package (import_declaration) @import")?;
        let mut cursor = QueryCursor::new();
        let source = self.source.clone();
        let mut matches = cursor.matches(&query, tree.root_node(), source.as_bytes());
        while let Some(query_match) = matches.next() {
            for capture in query_match.captures {
                let node = capture.node;
                let text = &source[node.byte_range()];
                let span = Span::new(node.start_byte(), node.end_byte());
                match query.capture_names()[capture.index as usize] {
                    "package" => {
                        let name = text
                            .trim()
                            .trim_start_matches("package")
                            .trim_end_matches(';')
                            .trim();
                        self.package = Some(name.to_string());
                        self.import_anchor = ImportAnchor::AfterPackage(span.end);
                    }
                    _ => {
                        if let Some(import) = ImportDecl::parse(text, span) {
                            self.import_anchor = ImportAnchor::AfterImports(span.end);
                            self.imports.push(import);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn collect_suppressions(&mut self, tree: &Tree) -> Result<()> {
        let query = Java.query("(annotation) @annotation")?;
        let mut cursor = QueryCursor::new();
        let source = self.source.clone();
        let mut matches = cursor.matches(&query, tree.root_node(), source.as_bytes());
        while let Some(query_match) = matches.next() {
            for capture in query_match.captures {
                let node = capture.node;
                let Some(name) = node.child_by_field_name("name") else {
                    continue;
                };
                if simple_name(&source[name.byte_range()]) != "SuppressWarnings" {
                    continue;
                }
                let args = node
                    .child_by_field_name("arguments")
                    .map(|a| &source[a.byte_range()])
                    .unwrap_or_default();
                let names = STRING_LITERAL
                    .captures_iter(args)
                    .map(|c| c[1].to_string())
                    .collect();
                let Some(target) = annotated_declaration(node) else {
                    continue;
                };
                self.suppressions.push(Suppression {
                    names,
                    span: Span::new(target.start_byte(), target.end_byte()),
                });
            }
        }
        Ok(())
    }

    fn text(&self, node: Node<'_>) -> &str {
        &self.source[node.byte_range()]
    }

    fn walk(&mut self, node: Node<'_>) {
        if node.is_error() || node.is_missing() {
            self.error_count += 1;
        }
        if node.child_count() == 0 {
            let token = if matches!(node.kind(), "identifier" | "type_identifier") {
                self.text(node).to_string()
            } else {
                node.kind().to_string()
            };
            self.identifiers.insert(token);
        }

        match node.kind() {
            "class_declaration"
            | "interface_declaration"
            | "enum_declaration"
            | "record_declaration"
            | "annotation_type_declaration" => {
                if let Some(name) = node.child_by_field_name("name") {
                    let name = self.text(name).to_string();
                    self.declared_types.insert(name);
                }
            }
            "type_parameter" => {
                if let Some(name) = named_children(node)
                    .into_iter()
                    .find(|c| c.kind() == "type_identifier")
                {
                    let name = self.text(name).to_string();
                    self.type_variables.insert(name);
                }
            }
            "local_variable_declaration" | "field_declaration" => {
                let ty = node.child_by_field_name("type");
                let mut cursor = node.walk();
                let declarators: Vec<Node<'_>> =
                    node.children_by_field_name("declarator", &mut cursor).collect();
                for declarator in declarators {
                    self.declare(
                        declarator,
                        ty,
                        declarator.child_by_field_name("value"),
                    );
                }
            }
            "formal_parameter" | "catch_formal_parameter" => {
                let ty = node
                    .child_by_field_name("type")
                    .or_else(|| named_children(node).into_iter().find(|c| c.kind() == "catch_type"));
                self.declare(node, ty, None);
            }
            "spread_parameter" => {
                let ty = named_children(node)
                    .into_iter()
                    .find(|c| !matches!(c.kind(), "modifiers" | "variable_declarator"));
                let name = named_children(node)
                    .into_iter()
                    .find(|c| c.kind() == "variable_declarator")
                    .and_then(|d| d.child_by_field_name("name"));
                if let Some(name) = name {
                    let ty = ty
                        .and_then(|t| JavaType::parse(self.text(t)))
                        .map(|t| t.with_dims(1));
                    self.push_declaration(name, ty, None);
                }
            }
            "enhanced_for_statement" | "resource" => {
                self.declare(node, node.child_by_field_name("type"), None);
            }
            _ => {}
        }

        for child in all_children(node) {
            self.walk(child);
        }
    }

    /// Records a declaration whose `name` field (and optional `dimensions`) live on `node`.
    fn declare(&mut self, node: Node<'_>, ty: Option<Node<'_>>, value: Option<Node<'_>>) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let extra_dims = node
            .child_by_field_name("dimensions")
            .map(|d| self.text(d).matches('[').count())
            .unwrap_or(0);
        let ty_text = ty.map(|t| self.text(t).to_string());
        match ty_text.as_deref() {
            Some("var") => {
                let init = value.map(|v| Converter::new(&self.source).convert(v));
                self.push_declaration(name, None, init);
            }
            Some(text) => {
                let ty = JavaType::parse(text).map(|t| t.with_dims(extra_dims));
                self.push_declaration(name, ty, None);
            }
            None => self.push_declaration(name, None, None),
        }
    }

    fn push_declaration(&mut self, name: Node<'_>, ty: Option<JavaType>, init: Option<Expr>) {
        self.declarations.push(Declaration {
            name: self.text(name).to_string(),
            ty,
            init,
            offset: name.start_byte(),
        });
    }
}

/// Finds the declaration an annotation is attached to.
fn annotated_declaration(annotation: Node<'_>) -> Option<Node<'_>> {
    let parent = annotation.parent()?;
    if parent.kind() == "modifiers" {
        parent.parent()
    } else {
        Some(parent)
    }
}

fn collect_roots<'s, 't>(node: Node<'t>, converter: &mut Converter<'s, 't>, roots: &mut Vec<Expr>) {
    if matches!(node.kind(), "annotation" | "marker_annotation") {
        return;
    }
    // bare names are never rewritten on their own, and most are declarations
    if is_expression_kind(node.kind()) && !matches!(node.kind(), "identifier" | "this") {
        roots.push(converter.convert(node));
        for opaque in converter.take_opaque() {
            for child in all_children(opaque) {
                collect_roots(child, converter, roots);
            }
        }
        return;
    }
    for child in all_children(node) {
        collect_roots(child, converter, roots);
    }
}
