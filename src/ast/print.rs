//! Rendering of expression trees back to Java source text.

use super::{Expr, ExprKind, UnaryOp, prec};

/// Renders [`Expr`] trees as Java text.
///
/// When constructed with the source the nodes were read from, subtrees that
/// still carry a span are copied verbatim, which keeps the user's formatting
/// and comments. Parentheses are added wherever operator precedence requires.
#[derive(Debug, Clone, Copy, Default)]
pub struct Printer<'a> {
    source: Option<&'a str>,
}

impl<'a> Printer<'a> {
    /// Creates a printer that renders every node from its structure.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a printer that copies spanned nodes from `source`.
    pub fn with_source(source: &'a str) -> Self {
        Self {
            source: Some(source),
        }
    }

    pub fn render(&self, expr: &Expr) -> String {
        let mut out = String::new();
        self.write(expr, &mut out);
        out
    }

    fn write(&self, expr: &Expr, out: &mut String) {
        let original = self
            .source
            .zip(expr.span)
            .and_then(|(source, span)| source.get(span.range()));
        if let Some(text) = original {
            out.push_str(text);
            return;
        }

        match &expr.kind {
            ExprKind::Name(name) => out.push_str(name),
            ExprKind::Literal(lit) => out.push_str(&lit.text),
            ExprKind::This => out.push_str("this"),
            ExprKind::Opaque(text) => out.push_str(text),
            ExprKind::FieldAccess { target, field } => {
                self.operand(target, prec::PRIMARY, out);
                out.push('.');
                out.push_str(field);
            }
            ExprKind::Call {
                receiver,
                type_args,
                name,
                args,
            } => {
                if let Some(receiver) = receiver {
                    self.operand(receiver, prec::PRIMARY, out);
                    out.push('.');
                    if !type_args.is_empty() {
                        out.push('<');
                        out.push_str(&join(type_args.iter().map(|t| t.to_string())));
                        out.push('>');
                    }
                }
                out.push_str(name);
                self.args(args, out);
            }
            ExprKind::New { ty, args } => {
                out.push_str("new ");
                out.push_str(&ty.to_string());
                self.args(args, out);
            }
            ExprKind::NewArray { ty, dims, init } => {
                out.push_str("new ");
                match init {
                    Some(items) => {
                        out.push_str(&ty.to_string());
                        out.push_str(" {");
                        out.push_str(&join(items.iter().map(|i| self.render(i))));
                        out.push('}');
                    }
                    None => {
                        out.push_str(&ty.base().to_string());
                        for dim in dims {
                            out.push('[');
                            self.write(dim, out);
                            out.push(']');
                        }
                        for _ in dims.len()..ty.dims {
                            out.push_str("[]");
                        }
                    }
                }
            }
            ExprKind::Unary { op, operand } => {
                out.push_str(op.as_str());
                let mut inner = String::new();
                self.operand(operand, prec::UNARY, &mut inner);
                // `- -x` must not collapse into `--x`
                let clash = matches!(op, UnaryOp::Neg | UnaryOp::Plus)
                    && inner.starts_with(op.as_str());
                if clash {
                    out.push('(');
                    out.push_str(&inner);
                    out.push(')');
                } else {
                    out.push_str(&inner);
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let level = op.precedence();
                self.operand(lhs, level, out);
                out.push(' ');
                out.push_str(op.as_str());
                out.push(' ');
                self.operand(rhs, level + 1, out);
            }
            ExprKind::Ternary {
                cond,
                then,
                otherwise,
            } => {
                self.operand(cond, prec::TERNARY + 1, out);
                out.push_str(" ? ");
                self.operand(then, prec::TERNARY, out);
                out.push_str(" : ");
                self.operand(otherwise, prec::TERNARY, out);
            }
            ExprKind::Paren(inner) => {
                out.push('(');
                self.write(inner, out);
                out.push(')');
            }
            ExprKind::Cast { ty, expr } => {
                out.push('(');
                out.push_str(&ty.to_string());
                out.push_str(") ");
                let signed = matches!(
                    expr.kind,
                    ExprKind::Unary {
                        op: UnaryOp::Neg | UnaryOp::Plus,
                        ..
                    }
                );
                let level = if signed { prec::PRIMARY } else { prec::UNARY };
                self.operand(expr, level, out);
            }
            ExprKind::InstanceOf { expr, ty } => {
                self.operand(expr, prec::RELATIONAL, out);
                out.push_str(" instanceof ");
                out.push_str(&ty.to_string());
            }
            ExprKind::ArrayAccess { array, index } => {
                // `new int[n][i]` would read as a two-dimensional creation
                let level = match array.strip_parens().kind {
                    ExprKind::NewArray { init: None, .. } => prec::PRIMARY + 1,
                    _ => prec::PRIMARY,
                };
                self.operand(array, level, out);
                out.push('[');
                self.write(index, out);
                out.push(']');
            }
            ExprKind::Lambda { params, body } => {
                match params.as_slice() {
                    [single] => out.push_str(single),
                    _ => {
                        out.push('(');
                        out.push_str(&params.join(", "));
                        out.push(')');
                    }
                }
                out.push_str(" -> ");
                self.write(body, out);
            }
            ExprKind::MethodRef { target, name } => {
                self.operand(target, prec::PRIMARY, out);
                out.push_str("::");
                out.push_str(name);
            }
            ExprKind::ClassLit(ty) => {
                out.push_str(&ty.to_string());
                out.push_str(".class");
            }
        }
    }

    /// Writes a child, parenthesized if it binds looser than `min`.
    fn operand(&self, expr: &Expr, min: u8, out: &mut String) {
        let expr = match &expr.kind {
            ExprKind::Paren(inner) if expr.span.is_none() || self.source.is_none() => inner,
            _ => expr,
        };
        if expr.precedence() < min {
            out.push('(');
            self.write(expr, out);
            out.push(')');
        } else {
            self.write(expr, out);
        }
    }

    fn args(&self, args: &[Expr], out: &mut String) {
        out.push('(');
        out.push_str(&join(args.iter().map(|a| self.render(a))));
        out.push(')');
    }
}

fn join(parts: impl Iterator<Item = String>) -> String {
    parts.collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, parse_expression};

    fn synthetic(text: &str) -> Expr {
        let expr = parse_expression(text).unwrap();
        expr.replace_where(&mut |e| match &e.kind {
            ExprKind::Paren(inner) => Some((**inner).clone()),
            _ => None,
        })
    }

    #[test]
    fn test_reinserts_parentheses() {
        let expr = synthetic("(a + b) * c");
        assert_eq!(Printer::new().render(&expr), "(a + b) * c");

        let expr = synthetic("a - (b - c)");
        assert_eq!(Printer::new().render(&expr), "a - (b - c)");

        let expr = synthetic("(a ? b : c).foo()");
        assert_eq!(Printer::new().render(&expr), "(a ? b : c).foo()");
    }

    #[test]
    fn test_drops_redundant_parentheses() {
        let expr = synthetic("(a * b) + c");
        assert_eq!(Printer::new().render(&expr), "a * b + c");
    }

    #[test]
    fn test_negation_of_comparison() {
        let cmp = synthetic("a.compareTo(b) < 0");
        let negated = Expr::synthetic(ExprKind::Unary {
            op: UnaryOp::Not,
            operand: Box::new(cmp),
        });
        assert_eq!(Printer::new().render(&negated), "!(a.compareTo(b) < 0)");
    }

    #[test]
    fn test_copies_source_text_for_spanned_nodes() {
        let source = "foo(a  +  b)";
        let expr = parse_expression(source).unwrap();
        let ExprKind::Call { args, .. } = &expr.kind else {
            panic!("expected call");
        };
        let sum = args[0].clone();
        let doubled = Expr::synthetic(ExprKind::Binary {
            op: BinaryOp::Mul,
            lhs: Box::new(sum),
            rhs: Box::new(Expr::name("k")),
        });
        assert_eq!(Printer::with_source(source).render(&doubled), "(a  +  b) * k");
    }

    #[test]
    fn test_arrays_and_lambdas() {
        assert_eq!(Printer::new().render(&synthetic("new String[0]")), "new String[0]");
        assert_eq!(
            Printer::new().render(&synthetic("new int[] {1, 2}")),
            "new int[] {1, 2}"
        );
        assert_eq!(Printer::new().render(&synthetic("x -> x + 1")), "x -> x + 1");
    }
}
