//! Conversion from tree-sitter-java nodes to [`Expr`] trees.

use super::{BinaryOp, Expr, ExprKind, JavaType, Literal, LiteralKind, Span, UnaryOp};
use crate::lang::{Java, Language};
use tree_sitter::Node;

/// Expression node kinds with a dedicated [`ExprKind`].
const MODELED: &[&str] = &[
    "identifier",
    "this",
    "parenthesized_expression",
    "field_access",
    "method_invocation",
    "object_creation_expression",
    "array_creation_expression",
    "cast_expression",
    "instanceof_expression",
    "ternary_expression",
    "binary_expression",
    "unary_expression",
    "array_access",
    "lambda_expression",
    "method_reference",
    "class_literal",
];

/// Expression node kinds that are kept as opaque text.
const UNMODELED: &[&str] = &[
    "assignment_expression",
    "update_expression",
    "switch_expression",
    "array_initializer",
];

/// Returns true if a tree-sitter node kind denotes a Java expression.
pub fn is_expression_kind(kind: &str) -> bool {
    MODELED.contains(&kind) || UNMODELED.contains(&kind) || literal_kind(kind, "").is_some()
}

fn literal_kind(kind: &str, text: &str) -> Option<LiteralKind> {
    let long = text.ends_with(['l', 'L']);
    let float = text.ends_with(['f', 'F']);
    Some(match kind {
        "decimal_integer_literal"
        | "hex_integer_literal"
        | "octal_integer_literal"
        | "binary_integer_literal" => {
            if long {
                LiteralKind::Long
            } else {
                LiteralKind::Int
            }
        }
        "decimal_floating_point_literal" | "hex_floating_point_literal" => {
            if float {
                LiteralKind::Float
            } else {
                LiteralKind::Double
            }
        }
        "true" | "false" => LiteralKind::Boolean,
        "character_literal" => LiteralKind::Char,
        "string_literal" => LiteralKind::String,
        "null_literal" => LiteralKind::Null,
        _ => return None,
    })
}

/// Converts tree-sitter nodes of one source text into expressions.
///
/// Nodes that have no dedicated representation become [`ExprKind::Opaque`];
/// they are remembered so callers can look for nested expressions inside them.
pub(crate) struct Converter<'s, 't> {
    source: &'s str,
    offset: usize,
    opaque: Vec<Node<'t>>,
}

impl<'s, 't> Converter<'s, 't> {
    pub(crate) fn new(source: &'s str) -> Self {
        Self::with_offset(source, 0)
    }

    /// Spans are reported relative to `offset`.
    pub(crate) fn with_offset(source: &'s str, offset: usize) -> Self {
        Self {
            source,
            offset,
            opaque: Vec::new(),
        }
    }

    /// Takes the opaque nodes produced since the last call.
    pub(crate) fn take_opaque(&mut self) -> Vec<Node<'t>> {
        std::mem::take(&mut self.opaque)
    }

    pub(crate) fn convert(&mut self, node: Node<'t>) -> Expr {
        let kind = match self.convert_kind(node) {
            Some(kind) => kind,
            None => {
                self.opaque.push(node);
                ExprKind::Opaque(self.text(node).to_string())
            }
        };
        Expr::new(kind, Some(self.span(node)))
    }

    fn text(&self, node: Node<'_>) -> &'s str {
        &self.source[node.byte_range()]
    }

    fn span(&self, node: Node<'_>) -> Span {
        Span::new(
            node.start_byte().saturating_sub(self.offset),
            node.end_byte().saturating_sub(self.offset),
        )
    }

    fn boxed(&mut self, node: Option<Node<'t>>) -> Option<Box<Expr>> {
        node.map(|n| Box::new(self.convert(n)))
    }

    fn ty(&self, node: Option<Node<'t>>) -> Option<JavaType> {
        JavaType::parse(self.text(node?))
    }

    fn list(&mut self, node: Option<Node<'t>>) -> Vec<Expr> {
        node.map(named_children)
            .unwrap_or_default()
            .into_iter()
            .map(|n| self.convert(n))
            .collect()
    }

    fn convert_kind(&mut self, node: Node<'t>) -> Option<ExprKind> {
        let text = self.text(node);
        if let Some(kind) = literal_kind(node.kind(), text) {
            return Some(ExprKind::Literal(Literal::new(kind, text)));
        }

        Some(match node.kind() {
            "identifier" => ExprKind::Name(text.to_string()),
            "this" => ExprKind::This,
            "parenthesized_expression" => {
                let inner = named_children(node).into_iter().next()?;
                ExprKind::Paren(Box::new(self.convert(inner)))
            }
            "field_access" => {
                let member = field(node, "field")?;
                if member.kind() != "identifier" {
                    return None;
                }
                ExprKind::FieldAccess {
                    target: self.boxed(field(node, "object"))?,
                    field: self.text(member).to_string(),
                }
            }
            "method_invocation" => {
                let name = self.text(field(node, "name")?).to_string();
                let type_args = match field(node, "type_arguments") {
                    Some(args) => named_children(args)
                        .into_iter()
                        .map(|a| JavaType::parse(self.text(a)))
                        .collect::<Option<Vec<_>>>()?,
                    None => Vec::new(),
                };
                let receiver = self.boxed(field(node, "object"));
                ExprKind::Call {
                    receiver,
                    type_args,
                    name,
                    args: self.list(field(node, "arguments")),
                }
            }
            "object_creation_expression" => {
                let qualified = all_children(node).first().is_some_and(|c| c.kind() != "new");
                let anonymous = named_children(node).iter().any(|c| c.kind() == "class_body");
                if qualified || anonymous || field(node, "type_arguments").is_some() {
                    return None;
                }
                ExprKind::New {
                    ty: self.ty(field(node, "type"))?,
                    args: self.list(field(node, "arguments")),
                }
            }
            "array_creation_expression" => {
                let base = self.ty(field(node, "type"))?;
                let mut total = 0;
                let mut dims = Vec::new();
                let mut cursor = node.walk();
                let parts: Vec<Node<'t>> =
                    node.children_by_field_name("dimensions", &mut cursor).collect();
                for part in parts {
                    match part.kind() {
                        "dimensions_expr" => {
                            let size = named_children(part).into_iter().next()?;
                            dims.push(self.convert(size));
                            total += 1;
                        }
                        "dimensions" => total += self.text(part).matches('[').count(),
                        _ => return None,
                    }
                }
                let init = field(node, "value").map(|v| self.list(Some(v)));
                ExprKind::NewArray {
                    ty: base.with_dims(total),
                    dims,
                    init,
                }
            }
            "cast_expression" => {
                let mut cursor = node.walk();
                let types: Vec<Node<'t>> =
                    node.children_by_field_name("type", &mut cursor).collect();
                if types.len() != 1 {
                    return None;
                }
                ExprKind::Cast {
                    ty: self.ty(types.first().copied())?,
                    expr: self.boxed(field(node, "value"))?,
                }
            }
            "instanceof_expression" => {
                if field(node, "pattern").is_some() || field(node, "name").is_some() {
                    return None;
                }
                ExprKind::InstanceOf {
                    ty: self.ty(field(node, "right"))?,
                    expr: self.boxed(field(node, "left"))?,
                }
            }
            "ternary_expression" => ExprKind::Ternary {
                cond: self.boxed(field(node, "condition"))?,
                then: self.boxed(field(node, "consequence"))?,
                otherwise: self.boxed(field(node, "alternative"))?,
            },
            "binary_expression" => ExprKind::Binary {
                op: BinaryOp::from_token(self.text(field(node, "operator")?))?,
                lhs: self.boxed(field(node, "left"))?,
                rhs: self.boxed(field(node, "right"))?,
            },
            "unary_expression" => ExprKind::Unary {
                op: UnaryOp::from_token(self.text(field(node, "operator")?))?,
                operand: self.boxed(field(node, "operand"))?,
            },
            "array_access" => ExprKind::ArrayAccess {
                array: self.boxed(field(node, "array"))?,
                index: self.boxed(field(node, "index"))?,
            },
            "lambda_expression" => {
                let body = field(node, "body")?;
                if body.kind() == "block" {
                    return None;
                }
                let params = self.lambda_params(field(node, "parameters")?)?;
                ExprKind::Lambda {
                    params,
                    body: Box::new(self.convert(body)),
                }
            }
            "method_reference" => {
                let children = named_children(node);
                let target = *children.first()?;
                let last = *all_children(node).last()?;
                let name = match last.kind() {
                    "identifier" | "new" => self.text(last).to_string(),
                    _ => return None,
                };
                if children.iter().any(|c| c.kind() == "type_arguments") {
                    return None;
                }
                let target = if MODELED.contains(&target.kind()) {
                    self.convert(target)
                } else {
                    // a type such as `String[]` or `List<String>`
                    Expr::new(
                        ExprKind::Name(self.text(target).to_string()),
                        Some(self.span(target)),
                    )
                };
                ExprKind::MethodRef {
                    target: Box::new(target),
                    name,
                }
            }
            "class_literal" => ExprKind::ClassLit(self.ty(named_children(node).into_iter().next())?),
            _ => return None,
        })
    }

    fn lambda_params(&self, params: Node<'t>) -> Option<Vec<String>> {
        match params.kind() {
            "identifier" => Some(vec![self.text(params).to_string()]),
            "inferred_parameters" => Some(
                named_children(params)
                    .into_iter()
                    .map(|p| self.text(p).to_string())
                    .collect(),
            ),
            "formal_parameters" => named_children(params)
                .into_iter()
                .map(|p| match p.kind() {
                    "formal_parameter" => Some(self.text(field(p, "name")?).to_string()),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }
}

fn field<'t>(node: Node<'t>, name: &str) -> Option<Node<'t>> {
    node.child_by_field_name(name)
}

/// Returns the named, non-comment children of a node.
pub(crate) fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| !c.is_extra())
        .collect()
}

const WRAPPER_PREFIX: &str = "class __Template { Object __value = ";
const WRAPPER_SUFFIX: &str = "; }";

/// Parses standalone Java expression text.
///
/// Returns `None` if the text is not exactly one well-formed expression. Spans
/// of the result are relative to the trimmed text.
pub fn parse_expression(text: &str) -> Option<Expr> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let wrapped = format!("{WRAPPER_PREFIX}{text}{WRAPPER_SUFFIX}");
    let tree = Java.parse(&wrapped).ok()?;
    if tree.root_node().has_error() {
        return None;
    }
    let declarator = find_kind(tree.root_node(), "variable_declarator")?;
    let value = declarator.child_by_field_name("value")?;
    if value.byte_range() != (WRAPPER_PREFIX.len()..WRAPPER_PREFIX.len() + text.len()) {
        return None;
    }
    let mut converter = Converter::with_offset(&wrapped, WRAPPER_PREFIX.len());
    Some(converter.convert(value))
}

pub(crate) fn all_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn find_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    if node.kind() == kind {
        return Some(node);
    }
    all_children(node)
        .into_iter()
        .find_map(|c| find_kind(c, kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ExprKind {
        parse_expression(text).unwrap().kind
    }

    #[test]
    fn test_method_invocation() {
        let ExprKind::Call {
            receiver,
            name,
            args,
            type_args,
        } = parse("list.get(0)")
        else {
            panic!("expected call");
        };
        assert_eq!(name, "get");
        assert_eq!(args.len(), 1);
        assert!(type_args.is_empty());
        assert!(matches!(receiver.unwrap().kind, ExprKind::Name(ref n) if n == "list"));
    }

    #[test]
    fn test_generic_witness() {
        let ExprKind::Call { type_args, .. } = parse("ImmutableList.<String>of()") else {
            panic!("expected call");
        };
        assert_eq!(type_args, vec![JavaType::named("String")]);
    }

    #[test]
    fn test_binary_and_unary() {
        let ExprKind::Unary { op, operand } = parse("!(a.compareTo(b) < 0)") else {
            panic!("expected unary");
        };
        assert_eq!(op, UnaryOp::Not);
        let ExprKind::Paren(inner) = operand.kind else {
            panic!("expected parens");
        };
        assert!(matches!(inner.kind, ExprKind::Binary { op: BinaryOp::Lt, .. }));
    }

    #[test]
    fn test_literals() {
        assert!(matches!(
            parse("10L"),
            ExprKind::Literal(Literal { kind: LiteralKind::Long, .. })
        ));
        assert!(matches!(
            parse("\"text\""),
            ExprKind::Literal(Literal { kind: LiteralKind::String, .. })
        ));
        assert!(matches!(
            parse("null"),
            ExprKind::Literal(Literal { kind: LiteralKind::Null, .. })
        ));
    }

    #[test]
    fn test_lambda_and_method_ref() {
        let ExprKind::Lambda { params, .. } = parse("(a, b) -> a + b") else {
            panic!("expected lambda");
        };
        assert_eq!(params, vec!["a", "b"]);

        let ExprKind::MethodRef { name, .. } = parse("String::valueOf") else {
            panic!("expected method reference");
        };
        assert_eq!(name, "valueOf");
    }

    #[test]
    fn test_arrays() {
        let ExprKind::NewArray { ty, dims, init } = parse("new String[0]") else {
            panic!("expected array creation");
        };
        assert_eq!(ty.to_string(), "String[]");
        assert_eq!(dims.len(), 1);
        assert!(init.is_none());

        let ExprKind::NewArray { init, .. } = parse("new int[] {1, 2}") else {
            panic!("expected array creation");
        };
        assert_eq!(init.unwrap().len(), 2);
    }

    #[test]
    fn test_unmodeled_becomes_opaque() {
        assert!(matches!(parse("x = 1"), ExprKind::Opaque(ref t) if t == "x = 1"));
        assert!(matches!(parse("new Object() {}"), ExprKind::Opaque(_)));
    }

    #[test]
    fn test_rejects_non_expressions() {
        assert!(parse_expression("a b").is_none());
        assert!(parse_expression("").is_none());
        assert!(parse_expression("foo(;").is_none());
    }

    #[test]
    fn test_spans_are_relative_to_text() {
        let expr = parse_expression("  a.b(c)").unwrap();
        assert_eq!(expr.span, Some(Span::new(0, 6)));
    }
}
