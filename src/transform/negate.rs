//! Logical negation of boolean expressions.

use crate::ast::{BinaryOp, Expr, ExprKind, Literal, LiteralKind, UnaryOp};

/// Returns an expression that is true exactly when `expr` is false.
///
/// Double negations cancel, `==`/`!=` flip and boolean literals invert.
/// `&&`/`||` are pushed through by De Morgan. Relational comparisons are
/// wrapped rather than flipped, since `!(a < b)` and `a >= b` differ for NaN.
pub fn negate(expr: &Expr) -> Expr {
    let inner = expr.strip_parens();
    match &inner.kind {
        ExprKind::Unary {
            op: UnaryOp::Not,
            operand,
        } => (**operand).clone(),
        ExprKind::Binary {
            op: op @ (BinaryOp::Eq | BinaryOp::Ne),
            lhs,
            rhs,
        } => Expr::synthetic(ExprKind::Binary {
            op: op.complement().unwrap_or(*op),
            lhs: lhs.clone(),
            rhs: rhs.clone(),
        }),
        ExprKind::Binary {
            op: op @ (BinaryOp::And | BinaryOp::Or),
            lhs,
            rhs,
        } => Expr::synthetic(ExprKind::Binary {
            op: if *op == BinaryOp::And {
                BinaryOp::Or
            } else {
                BinaryOp::And
            },
            lhs: Box::new(negate(lhs)),
            rhs: Box::new(negate(rhs)),
        }),
        ExprKind::Literal(lit) if lit.kind == LiteralKind::Boolean => {
            Expr::synthetic(ExprKind::Literal(Literal::boolean(lit.text != "true")))
        }
        _ => Expr::synthetic(ExprKind::Unary {
            op: UnaryOp::Not,
            operand: Box::new(inner.clone()),
        }),
    }
}
