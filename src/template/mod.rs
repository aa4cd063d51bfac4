//! Canonical template patterns.
//!
//! A [`Pattern`] mirrors the expression model with three extra leaf kinds:
//! metavariables (rule parameters), placeholder invocations and references to
//! the template's own lambda parameters. Parentheses never appear in patterns;
//! the printer re-inserts them by precedence.

mod normalize;

pub use normalize::compile_rule;

use crate::ast::{BinaryOp, Expr, ExprKind, JavaType, Literal, LiteralKind, Printer, UnaryOp};
use std::collections::BTreeSet;
use std::sync::Arc;

/// A declared placeholder method.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderDecl {
    pub name: String,
    pub ty: Option<JavaType>,
    pub params: Vec<PlaceholderParam>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderParam {
    pub name: String,
    pub ty: Option<JavaType>,
    /// The captured body does not have to mention this parameter.
    pub optional: bool,
}

/// A placeholder invocation inside a template.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderCall {
    pub decl: Arc<PlaceholderDecl>,
    pub args: Vec<Pattern>,
}

/// A node of a canonical template.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// A rule parameter.
    Metavar(String),
    /// A parameter of a lambda written in the template; matched up to renaming.
    LambdaParam(String),
    Placeholder(PlaceholderCall),
    Name(String),
    Literal(Literal),
    This,
    FieldAccess {
        target: Box<Pattern>,
        field: String,
    },
    Call {
        receiver: Option<Box<Pattern>>,
        type_args: Vec<JavaType>,
        name: String,
        args: Vec<Pattern>,
    },
    New {
        ty: JavaType,
        args: Vec<Pattern>,
    },
    NewArray {
        ty: JavaType,
        dims: Vec<Pattern>,
        init: Option<Vec<Pattern>>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Pattern>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Pattern>,
        rhs: Box<Pattern>,
    },
    Ternary {
        cond: Box<Pattern>,
        then: Box<Pattern>,
        otherwise: Box<Pattern>,
    },
    Cast {
        ty: JavaType,
        expr: Box<Pattern>,
    },
    InstanceOf {
        expr: Box<Pattern>,
        ty: JavaType,
    },
    ArrayAccess {
        array: Box<Pattern>,
        index: Box<Pattern>,
    },
    Lambda {
        params: Vec<String>,
        body: Box<Pattern>,
    },
    MethodRef {
        target: Box<Pattern>,
        name: String,
    },
    ClassLit(JavaType),
    Opaque(String),
}

impl Pattern {
    /// Returns the direct children in source order.
    pub fn children(&self) -> Vec<&Pattern> {
        match self {
            Pattern::Metavar(_)
            | Pattern::LambdaParam(_)
            | Pattern::Name(_)
            | Pattern::Literal(_)
            | Pattern::This
            | Pattern::ClassLit(_)
            | Pattern::Opaque(_) => Vec::new(),
            Pattern::Placeholder(call) => call.args.iter().collect(),
            Pattern::FieldAccess { target, .. } | Pattern::MethodRef { target, .. } => {
                vec![target]
            }
            Pattern::Call { receiver, args, .. } => {
                receiver.iter().map(|r| r.as_ref()).chain(args).collect()
            }
            Pattern::New { args, .. } => args.iter().collect(),
            Pattern::NewArray { dims, init, .. } => {
                dims.iter().chain(init.iter().flatten()).collect()
            }
            Pattern::Unary { operand, .. } => vec![operand],
            Pattern::Binary { lhs, rhs, .. } => vec![lhs, rhs],
            Pattern::Ternary {
                cond,
                then,
                otherwise,
            } => vec![cond, then, otherwise],
            Pattern::Cast { expr, .. } | Pattern::InstanceOf { expr, .. } => vec![expr],
            Pattern::ArrayAccess { array, index } => vec![array, index],
            Pattern::Lambda { body, .. } => vec![body],
        }
    }

    /// Visits this node and all descendants, parents first.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Pattern)) {
        f(self);
        for child in self.children() {
            child.visit(f);
        }
    }

    /// Names of the metavariables used in this pattern, in first-use order.
    pub fn metavars(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        self.visit(&mut |p| {
            if let Pattern::Metavar(name) = p {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        });
        names
    }

    /// Names of the placeholders invoked in this pattern.
    pub fn placeholders(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        self.visit(&mut |p| {
            if let Pattern::Placeholder(call) = p {
                names.insert(call.decl.name.as_str());
            }
        });
        names
    }

    /// Number of nodes that must be matched literally.
    pub fn literal_weight(&self) -> usize {
        let mut weight = 0;
        self.visit(&mut |p| {
            if !matches!(
                p,
                Pattern::Metavar(_) | Pattern::Placeholder(_) | Pattern::LambdaParam(_)
            ) {
                weight += 1;
            }
        });
        weight
    }

    /// Identifiers (and, optionally, operator tokens) any match must contain.
    ///
    /// Placeholder names are excluded since placeholders match arbitrary code.
    pub fn identifiers(&self, with_operators: bool) -> BTreeSet<String> {
        let mut idents = BTreeSet::new();
        self.visit(&mut |p| match p {
            Pattern::Name(name) => {
                idents.insert(name.clone());
            }
            Pattern::FieldAccess { field: name, .. }
            | Pattern::Call { name, .. }
            | Pattern::MethodRef { name, .. } => {
                if name != "new" {
                    idents.insert(name.clone());
                }
            }
            Pattern::Unary { op, .. } if with_operators => {
                idents.insert(op.as_str().to_string());
            }
            Pattern::Binary { op, .. } if with_operators => {
                idents.insert(op.as_str().to_string());
            }
            _ => {}
        });
        idents
    }

    /// Root shape key for the dispatch index; `None` if the root matches anything.
    pub fn discriminator(&self) -> Option<String> {
        Some(match self {
            Pattern::Metavar(_) | Pattern::Placeholder(_) | Pattern::LambdaParam(_) => {
                return None;
            }
            Pattern::Name(name) => format!("name:{name}"),
            Pattern::Literal(_) => "literal".to_string(),
            Pattern::This => "this".to_string(),
            Pattern::FieldAccess { field, .. } => format!("field:{field}"),
            Pattern::Call { name, .. } => format!("call:{name}"),
            Pattern::New { .. } => "new".to_string(),
            Pattern::NewArray { .. } => "new[]".to_string(),
            Pattern::Unary { op, .. } => format!("unary:{}", op.as_str()),
            Pattern::Binary { op, .. } => format!("binary:{}", op.as_str()),
            Pattern::Ternary { .. } => "ternary".to_string(),
            Pattern::Cast { .. } => "cast".to_string(),
            Pattern::InstanceOf { .. } => "instanceof".to_string(),
            Pattern::ArrayAccess { .. } => "index".to_string(),
            Pattern::Lambda { .. } => "lambda".to_string(),
            Pattern::MethodRef { name, .. } => format!("ref:{name}"),
            Pattern::ClassLit(_) => "class".to_string(),
            Pattern::Opaque(_) => "opaque".to_string(),
        })
    }

    /// The logical negation of a boolean pattern, when it has a direct form.
    ///
    /// `!x` becomes `x` and comparisons flip (`a < b` becomes `a >= b`). The
    /// matcher only accepts a flipped ordering comparison over non-floating operands.
    pub fn negated(&self) -> Option<Pattern> {
        match self {
            Pattern::Unary {
                op: UnaryOp::Not,
                operand,
            } => Some((**operand).clone()),
            Pattern::Binary { op, lhs, rhs } => Some(Pattern::Binary {
                op: op.complement()?,
                lhs: lhs.clone(),
                rhs: rhs.clone(),
            }),
            Pattern::Literal(lit) if lit.kind == LiteralKind::Boolean => {
                Some(Pattern::Literal(Literal::boolean(lit.text != "true")))
            }
            _ => None,
        }
    }

    /// Renders the pattern as an expression, metavariables shown by name.
    pub fn skeleton(&self) -> Expr {
        self.skeleton_with(&mut |_| None)
    }

    /// Like [`Pattern::skeleton`], with `leaf` consulted first at every node.
    pub fn skeleton_with(&self, leaf: &mut dyn FnMut(&Pattern) -> Option<Expr>) -> Expr {
        if let Some(expr) = leaf(self) {
            return expr;
        }
        let kind = match self {
            Pattern::Metavar(name) | Pattern::LambdaParam(name) | Pattern::Name(name) => {
                ExprKind::Name(name.clone())
            }
            Pattern::Placeholder(call) => ExprKind::Call {
                receiver: None,
                type_args: Vec::new(),
                name: call.decl.name.clone(),
                args: call.args.iter().map(|p| p.skeleton_with(leaf)).collect(),
            },
            Pattern::Literal(lit) => ExprKind::Literal(lit.clone()),
            Pattern::This => ExprKind::This,
            Pattern::FieldAccess { target, field } => ExprKind::FieldAccess {
                target: Box::new(target.skeleton_with(leaf)),
                field: field.clone(),
            },
            Pattern::Call {
                receiver,
                type_args,
                name,
                args,
            } => ExprKind::Call {
                receiver: receiver.as_ref().map(|r| Box::new(r.skeleton_with(leaf))),
                type_args: type_args.clone(),
                name: name.clone(),
                args: args.iter().map(|p| p.skeleton_with(leaf)).collect(),
            },
            Pattern::New { ty, args } => ExprKind::New {
                ty: ty.clone(),
                args: args.iter().map(|p| p.skeleton_with(leaf)).collect(),
            },
            Pattern::NewArray { ty, dims, init } => ExprKind::NewArray {
                ty: ty.clone(),
                dims: dims.iter().map(|p| p.skeleton_with(leaf)).collect(),
                init: init
                    .as_ref()
                    .map(|items| items.iter().map(|p| p.skeleton_with(leaf)).collect()),
            },
            Pattern::Unary { op, operand } => ExprKind::Unary {
                op: *op,
                operand: Box::new(operand.skeleton_with(leaf)),
            },
            Pattern::Binary { op, lhs, rhs } => ExprKind::Binary {
                op: *op,
                lhs: Box::new(lhs.skeleton_with(leaf)),
                rhs: Box::new(rhs.skeleton_with(leaf)),
            },
            Pattern::Ternary {
                cond,
                then,
                otherwise,
            } => ExprKind::Ternary {
                cond: Box::new(cond.skeleton_with(leaf)),
                then: Box::new(then.skeleton_with(leaf)),
                otherwise: Box::new(otherwise.skeleton_with(leaf)),
            },
            Pattern::Cast { ty, expr } => ExprKind::Cast {
                ty: ty.clone(),
                expr: Box::new(expr.skeleton_with(leaf)),
            },
            Pattern::InstanceOf { expr, ty } => ExprKind::InstanceOf {
                expr: Box::new(expr.skeleton_with(leaf)),
                ty: ty.clone(),
            },
            Pattern::ArrayAccess { array, index } => ExprKind::ArrayAccess {
                array: Box::new(array.skeleton_with(leaf)),
                index: Box::new(index.skeleton_with(leaf)),
            },
            Pattern::Lambda { params, body } => ExprKind::Lambda {
                params: params.clone(),
                body: Box::new(body.skeleton_with(leaf)),
            },
            Pattern::MethodRef { target, name } => ExprKind::MethodRef {
                target: Box::new(target.skeleton_with(leaf)),
                name: name.clone(),
            },
            Pattern::ClassLit(ty) => ExprKind::ClassLit(ty.clone()),
            Pattern::Opaque(text) => ExprKind::Opaque(text.clone()),
        };
        Expr::synthetic(kind)
    }

    pub fn skeleton_text(&self) -> String {
        Printer::new().render(&self.skeleton())
    }
}

/// Root shape key of a target expression, comparable with [`Pattern::discriminator`].
pub fn shape_key(expr: &Expr) -> String {
    match &expr.strip_parens().kind {
        ExprKind::Name(name) => format!("name:{name}"),
        ExprKind::Literal(_) => "literal".to_string(),
        ExprKind::This => "this".to_string(),
        ExprKind::FieldAccess { field, .. } => format!("field:{field}"),
        ExprKind::Call { name, .. } => format!("call:{name}"),
        ExprKind::New { .. } => "new".to_string(),
        ExprKind::NewArray { .. } => "new[]".to_string(),
        ExprKind::Unary { op, .. } => format!("unary:{}", op.as_str()),
        ExprKind::Binary { op, .. } => format!("binary:{}", op.as_str()),
        ExprKind::Ternary { .. } => "ternary".to_string(),
        ExprKind::Cast { .. } => "cast".to_string(),
        ExprKind::InstanceOf { .. } => "instanceof".to_string(),
        ExprKind::ArrayAccess { .. } => "index".to_string(),
        ExprKind::Lambda { .. } => "lambda".to_string(),
        ExprKind::MethodRef { name, .. } => format!("ref:{name}"),
        ExprKind::ClassLit(_) => "class".to_string(),
        ExprKind::Opaque(_) | ExprKind::Paren(_) => "opaque".to_string(),
    }
}
