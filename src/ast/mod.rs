//! Java expression trees as seen by the rewrite engine.
//!
//! The host front end (tree-sitter) produces a concrete syntax tree; this module
//! holds the engine's own immutable expression model derived from it:
//!
//! - [`Expr`]: an expression node with an optional source [`Span`]
//! - [`CompilationUnit`]: one parsed source file with its imports, declarations
//!   and suppression annotations
//! - [`Printer`]: renders expressions back to Java text, re-using source text for
//!   untouched subtrees and inserting parentheses by operator precedence
//!
//! Nodes that carry a span were read from source. Nodes without one were
//! synthesized by the engine (from a template, or rebuilt by a substitution).

mod convert;
mod print;
mod types;
mod unit;

pub use convert::{is_expression_kind, parse_expression};
pub use print::Printer;
pub use types::{JavaType, simple_name};
pub use unit::{CompilationUnit, Declaration, ImportAnchor, ImportDecl, Suppression};

use std::fmt;

/// A half-open byte range into a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if `other` lies entirely within this span.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Returns true if the two spans share at least one byte.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// The lexical category of a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Int,
    Long,
    Float,
    Double,
    Boolean,
    Char,
    String,
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    pub kind: LiteralKind,
    pub text: String,
}

impl Literal {
    pub fn new(kind: LiteralKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn boolean(value: bool) -> Self {
        Self::new(LiteralKind::Boolean, if value { "true" } else { "false" })
    }

    /// Returns the static type of this literal.
    pub fn java_type(&self) -> JavaType {
        JavaType::named(match self.kind {
            LiteralKind::Int => "int",
            LiteralKind::Long => "long",
            LiteralKind::Float => "float",
            LiteralKind::Double => "double",
            LiteralKind::Boolean => "boolean",
            LiteralKind::Char => "char",
            LiteralKind::String => "String",
            LiteralKind::Null => "null",
        })
    }

    /// Returns true for numeric literals whose value is zero.
    pub fn is_zero(&self) -> bool {
        matches!(self.kind, LiteralKind::Int | LiteralKind::Long)
            && self
                .text
                .trim_end_matches(['l', 'L'])
                .chars()
                .all(|c| c == '0' || c == '_')
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    BitNot,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::BitNot => "~",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "!" => UnaryOp::Not,
            "-" => UnaryOp::Neg,
            "+" => UnaryOp::Plus,
            "~" => UnaryOp::BitNot,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    UShr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Rem,
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "<<" => BinaryOp::Shl,
            ">>" => BinaryOp::Shr,
            ">>>" => BinaryOp::UShr,
            "<" => BinaryOp::Lt,
            ">" => BinaryOp::Gt,
            "<=" => BinaryOp::Le,
            ">=" => BinaryOp::Ge,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "&" => BinaryOp::BitAnd,
            "^" => BinaryOp::BitXor,
            "|" => BinaryOp::BitOr,
            "&&" => BinaryOp::And,
            "||" => BinaryOp::Or,
            _ => return None,
        })
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Or => prec::OR,
            BinaryOp::And => prec::AND,
            BinaryOp::BitOr => prec::BIT_OR,
            BinaryOp::BitXor => prec::BIT_XOR,
            BinaryOp::BitAnd => prec::BIT_AND,
            BinaryOp::Eq | BinaryOp::Ne => prec::EQUALITY,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => prec::RELATIONAL,
            BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => prec::SHIFT,
            BinaryOp::Add | BinaryOp::Sub => prec::ADDITIVE,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => prec::MULTIPLICATIVE,
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne
        )
    }

    /// Returns the comparison that holds exactly when this one does not.
    pub fn complement(&self) -> Option<BinaryOp> {
        Some(match self {
            BinaryOp::Lt => BinaryOp::Ge,
            BinaryOp::Ge => BinaryOp::Lt,
            BinaryOp::Gt => BinaryOp::Le,
            BinaryOp::Le => BinaryOp::Gt,
            BinaryOp::Eq => BinaryOp::Ne,
            BinaryOp::Ne => BinaryOp::Eq,
            _ => return None,
        })
    }
}

/// Java operator precedence levels.
pub mod prec {
    pub const LAMBDA: u8 = 1;
    pub const TERNARY: u8 = 2;
    pub const OR: u8 = 3;
    pub const AND: u8 = 4;
    pub const BIT_OR: u8 = 5;
    pub const BIT_XOR: u8 = 6;
    pub const BIT_AND: u8 = 7;
    pub const EQUALITY: u8 = 8;
    pub const RELATIONAL: u8 = 9;
    pub const SHIFT: u8 = 10;
    pub const ADDITIVE: u8 = 11;
    pub const MULTIPLICATIVE: u8 = 12;
    pub const UNARY: u8 = 13;
    pub const PRIMARY: u8 = 14;
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Name(String),
    Literal(Literal),
    This,
    FieldAccess {
        target: Box<Expr>,
        field: String,
    },
    Call {
        receiver: Option<Box<Expr>>,
        type_args: Vec<JavaType>,
        name: String,
        args: Vec<Expr>,
    },
    New {
        ty: JavaType,
        args: Vec<Expr>,
    },
    /// `ty` is the full array type; `dims` are the sized dimensions.
    NewArray {
        ty: JavaType,
        dims: Vec<Expr>,
        init: Option<Vec<Expr>>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Paren(Box<Expr>),
    Cast {
        ty: JavaType,
        expr: Box<Expr>,
    },
    InstanceOf {
        expr: Box<Expr>,
        ty: JavaType,
    },
    ArrayAccess {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    Lambda {
        params: Vec<String>,
        body: Box<Expr>,
    },
    MethodRef {
        target: Box<Expr>,
        name: String,
    },
    ClassLit(JavaType),
    /// Syntax the engine does not model; compared by text.
    Opaque(String),
}

impl Expr {
    pub fn new(kind: ExprKind, span: Option<Span>) -> Self {
        Self { kind, span }
    }

    /// Creates a node that did not come from source.
    pub fn synthetic(kind: ExprKind) -> Self {
        Self { kind, span: None }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self::synthetic(ExprKind::Name(name.into()))
    }

    pub fn is_synthetic(&self) -> bool {
        self.span.is_none()
    }

    /// Skips any number of enclosing parentheses.
    pub fn strip_parens(&self) -> &Expr {
        let mut current = self;
        while let ExprKind::Paren(inner) = &current.kind {
            current = inner;
        }
        current
    }

    /// Binding strength of this node when printed.
    pub fn precedence(&self) -> u8 {
        match &self.kind {
            ExprKind::Lambda { .. } | ExprKind::Opaque(_) => prec::LAMBDA,
            ExprKind::Ternary { .. } => prec::TERNARY,
            ExprKind::Binary { op, .. } => op.precedence(),
            ExprKind::InstanceOf { .. } => prec::RELATIONAL,
            ExprKind::Unary { .. } | ExprKind::Cast { .. } => prec::UNARY,
            _ => prec::PRIMARY,
        }
    }

    /// Returns the direct children in source order.
    pub fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Name(_)
            | ExprKind::Literal(_)
            | ExprKind::This
            | ExprKind::ClassLit(_)
            | ExprKind::Opaque(_) => Vec::new(),
            ExprKind::FieldAccess { target, .. } | ExprKind::MethodRef { target, .. } => {
                vec![target]
            }
            ExprKind::Call { receiver, args, .. } => {
                receiver.iter().map(|r| r.as_ref()).chain(args).collect()
            }
            ExprKind::New { args, .. } => args.iter().collect(),
            ExprKind::NewArray { dims, init, .. } => {
                dims.iter().chain(init.iter().flatten()).collect()
            }
            ExprKind::Unary { operand, .. } => vec![operand],
            ExprKind::Binary { lhs, rhs, .. } => vec![lhs, rhs],
            ExprKind::Ternary {
                cond,
                then,
                otherwise,
            } => vec![cond, then, otherwise],
            ExprKind::Paren(inner) => vec![inner],
            ExprKind::Cast { expr, .. } | ExprKind::InstanceOf { expr, .. } => vec![expr],
            ExprKind::ArrayAccess { array, index } => vec![array, index],
            ExprKind::Lambda { body, .. } => vec![body],
        }
    }

    /// Visits this node and all descendants, parents first.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        for child in self.children() {
            child.visit(f);
        }
    }

    /// Structural equality that ignores spans and redundant parentheses.
    pub fn same_structure(&self, other: &Expr) -> bool {
        use ExprKind as K;
        let (a, b) = (self.strip_parens(), other.strip_parens());
        match (&a.kind, &b.kind) {
            (K::Name(x), K::Name(y)) | (K::Opaque(x), K::Opaque(y)) => x == y,
            (K::Literal(x), K::Literal(y)) => x == y,
            (K::This, K::This) => true,
            (
                K::FieldAccess { target: t1, field: f1 },
                K::FieldAccess { target: t2, field: f2 },
            ) => f1 == f2 && t1.same_structure(t2),
            (
                K::Call {
                    receiver: r1,
                    type_args: ta1,
                    name: n1,
                    args: a1,
                },
                K::Call {
                    receiver: r2,
                    type_args: ta2,
                    name: n2,
                    args: a2,
                },
            ) => {
                n1 == n2
                    && ta1 == ta2
                    && match (r1, r2) {
                        (Some(x), Some(y)) => x.same_structure(y),
                        (None, None) => true,
                        _ => false,
                    }
                    && all_same(a1, a2)
            }
            (K::New { ty: t1, args: a1 }, K::New { ty: t2, args: a2 }) => {
                t1 == t2 && all_same(a1, a2)
            }
            (
                K::NewArray {
                    ty: t1,
                    dims: d1,
                    init: i1,
                },
                K::NewArray {
                    ty: t2,
                    dims: d2,
                    init: i2,
                },
            ) => {
                t1 == t2
                    && all_same(d1, d2)
                    && match (i1, i2) {
                        (Some(x), Some(y)) => all_same(x, y),
                        (None, None) => true,
                        _ => false,
                    }
            }
            (
                K::Unary {
                    op: o1,
                    operand: x1,
                },
                K::Unary {
                    op: o2,
                    operand: x2,
                },
            ) => o1 == o2 && x1.same_structure(x2),
            (
                K::Binary {
                    op: o1,
                    lhs: l1,
                    rhs: r1,
                },
                K::Binary {
                    op: o2,
                    lhs: l2,
                    rhs: r2,
                },
            ) => o1 == o2 && l1.same_structure(l2) && r1.same_structure(r2),
            (
                K::Ternary {
                    cond: c1,
                    then: t1,
                    otherwise: e1,
                },
                K::Ternary {
                    cond: c2,
                    then: t2,
                    otherwise: e2,
                },
            ) => c1.same_structure(c2) && t1.same_structure(t2) && e1.same_structure(e2),
            (K::Cast { ty: t1, expr: e1 }, K::Cast { ty: t2, expr: e2 })
            | (K::InstanceOf { expr: e1, ty: t1 }, K::InstanceOf { expr: e2, ty: t2 }) => {
                t1 == t2 && e1.same_structure(e2)
            }
            (
                K::ArrayAccess {
                    array: a1,
                    index: i1,
                },
                K::ArrayAccess {
                    array: a2,
                    index: i2,
                },
            ) => a1.same_structure(a2) && i1.same_structure(i2),
            (
                K::Lambda {
                    params: p1,
                    body: b1,
                },
                K::Lambda {
                    params: p2,
                    body: b2,
                },
            ) => p1 == p2 && b1.same_structure(b2),
            (
                K::MethodRef {
                    target: t1,
                    name: n1,
                },
                K::MethodRef {
                    target: t2,
                    name: n2,
                },
            ) => n1 == n2 && t1.same_structure(t2),
            (K::ClassLit(t1), K::ClassLit(t2)) => t1 == t2,
            _ => false,
        }
    }

    /// Returns true if some subtree is structurally equal to `needle`.
    pub fn contains(&self, needle: &Expr) -> bool {
        let mut found = false;
        self.visit(&mut |e| found = found || e.same_structure(needle));
        found
    }

    /// Returns true if the simple name `name` occurs anywhere in this tree.
    pub fn mentions_name(&self, name: &str) -> bool {
        let mut found = false;
        self.visit(&mut |e| {
            if let ExprKind::Name(n) = &e.kind {
                found = found || n == name;
            }
        });
        found
    }

    /// Returns the dotted text of a pure name chain such as `java.util.List`.
    pub fn qualified_name(&self) -> Option<String> {
        match &self.strip_parens().kind {
            ExprKind::Name(n) => Some(n.clone()),
            ExprKind::FieldAccess { target, field } => {
                Some(format!("{}.{}", target.qualified_name()?, field))
            }
            _ => None,
        }
    }

    /// Rebuilds this tree, replacing every node for which `f` returns a value.
    ///
    /// Ancestors of replaced nodes lose their span, since their source text no
    /// longer describes them.
    pub fn replace_where(&self, f: &mut impl FnMut(&Expr) -> Option<Expr>) -> Expr {
        self.replace_inner(f).0
    }

    fn replace_inner(&self, f: &mut impl FnMut(&Expr) -> Option<Expr>) -> (Expr, bool) {
        if let Some(replacement) = f(self) {
            return (replacement, true);
        }
        let mut changed = false;
        let kind = self.kind.map_children(&mut |child| {
            let (next, child_changed) = child.replace_inner(f);
            changed |= child_changed;
            next
        });
        let span = if changed { None } else { self.span };
        (Expr { kind, span }, changed)
    }
}

fn all_same(a: &[Expr], b: &[Expr]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_structure(y))
}

impl ExprKind {
    /// Clones this node, mapping every direct child through `f`.
    pub fn map_children(&self, f: &mut impl FnMut(&Expr) -> Expr) -> ExprKind {
        let mut boxed = |e: &Expr| Box::new(f(e));
        match self {
            ExprKind::Name(_)
            | ExprKind::Literal(_)
            | ExprKind::This
            | ExprKind::ClassLit(_)
            | ExprKind::Opaque(_) => self.clone(),
            ExprKind::FieldAccess { target, field } => ExprKind::FieldAccess {
                target: boxed(target),
                field: field.clone(),
            },
            ExprKind::Call {
                receiver,
                type_args,
                name,
                args,
            } => {
                let receiver = receiver.as_ref().map(|r| boxed(r));
                ExprKind::Call {
                    receiver,
                    type_args: type_args.clone(),
                    name: name.clone(),
                    args: args.iter().map(|a| *boxed(a)).collect(),
                }
            }
            ExprKind::New { ty, args } => ExprKind::New {
                ty: ty.clone(),
                args: args.iter().map(|a| *boxed(a)).collect(),
            },
            ExprKind::NewArray { ty, dims, init } => {
                let dims = dims.iter().map(|d| *boxed(d)).collect();
                ExprKind::NewArray {
                    ty: ty.clone(),
                    dims,
                    init: init
                        .as_ref()
                        .map(|items| items.iter().map(|i| *boxed(i)).collect()),
                }
            }
            ExprKind::Unary { op, operand } => ExprKind::Unary {
                op: *op,
                operand: boxed(operand),
            },
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = boxed(lhs);
                ExprKind::Binary {
                    op: *op,
                    lhs,
                    rhs: boxed(rhs),
                }
            }
            ExprKind::Ternary {
                cond,
                then,
                otherwise,
            } => {
                let cond = boxed(cond);
                let then = boxed(then);
                ExprKind::Ternary {
                    cond,
                    then,
                    otherwise: boxed(otherwise),
                }
            }
            ExprKind::Paren(inner) => ExprKind::Paren(boxed(inner)),
            ExprKind::Cast { ty, expr } => ExprKind::Cast {
                ty: ty.clone(),
                expr: boxed(expr),
            },
            ExprKind::InstanceOf { expr, ty } => ExprKind::InstanceOf {
                expr: boxed(expr),
                ty: ty.clone(),
            },
            ExprKind::ArrayAccess { array, index } => {
                let array = boxed(array);
                ExprKind::ArrayAccess {
                    array,
                    index: boxed(index),
                }
            }
            ExprKind::Lambda { params, body } => ExprKind::Lambda {
                params: params.clone(),
                body: boxed(body),
            },
            ExprKind::MethodRef { target, name } => ExprKind::MethodRef {
                target: boxed(target),
                name: name.clone(),
            },
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Printer::new().render(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Expr {
        parse_expression(text).unwrap()
    }

    #[test]
    fn test_same_structure_ignores_parens_and_spans() {
        let a = parse("(a.compareTo(b)) < 0");
        let b = parse("a.compareTo((b)) < 0");
        assert!(a.same_structure(&b));
        assert!(!a.same_structure(&parse("a.compareTo(c) < 0")));
    }

    #[test]
    fn test_contains_and_mentions() {
        let e = parse("list.stream().filter(x -> x.isEmpty())");
        assert!(e.contains(&parse("x.isEmpty()")));
        assert!(e.mentions_name("list"));
        assert!(!e.mentions_name("map"));
    }

    #[test]
    fn test_replace_where_drops_ancestor_spans() {
        let e = parse("foo(a, b)");
        let replaced = e.replace_where(&mut |node| {
            matches!(&node.kind, ExprKind::Name(n) if n == "a").then(|| Expr::name("z"))
        });
        assert_eq!(replaced.to_string(), "foo(z, b)");
        assert!(replaced.is_synthetic());
        let ExprKind::Call { args, .. } = &replaced.kind else {
            panic!("expected a call");
        };
        assert!(!args[1].is_synthetic());
    }

    #[test]
    fn test_qualified_name() {
        assert_eq!(
            parse("java.util.Optional").qualified_name().as_deref(),
            Some("java.util.Optional")
        );
        assert!(parse("foo().bar").qualified_name().is_none());
    }

    #[test]
    fn test_span_relations() {
        let outer = Span::new(0, 10);
        assert!(outer.contains(&Span::new(2, 5)));
        assert!(outer.overlaps(&Span::new(9, 12)));
        assert!(!outer.overlaps(&Span::new(10, 12)));
    }

    #[test]
    fn test_literal_zero() {
        assert!(Literal::new(LiteralKind::Int, "0").is_zero());
        assert!(Literal::new(LiteralKind::Long, "0L").is_zero());
        assert!(!Literal::new(LiteralKind::Int, "10").is_zero());
    }

    #[test]
    fn test_complement() {
        assert_eq!(BinaryOp::Lt.complement(), Some(BinaryOp::Ge));
        assert_eq!(BinaryOp::Eq.complement(), Some(BinaryOp::Ne));
        assert!(BinaryOp::Add.complement().is_none());
    }
}
