//! Built-in guard matchers.

use super::{GuardContext, GuardMatcher};
use crate::ast::{Expr, ExprKind, JavaType, UnaryOp, simple_name};
use crate::error::GuardError;

/// Containers with a public constructor that creates an empty instance.
const MUTABLE_COLLECTIONS: &[&str] = &[
    "ArrayList",
    "HashMap",
    "HashSet",
    "LinkedHashMap",
    "LinkedHashSet",
    "LinkedList",
    "Stack",
    "TreeMap",
    "TreeSet",
    "Vector",
];

/// Types whose nullary `empty`/`of` factories produce empty instances.
const CONTAINER_TYPES: &[&str] = &[
    "List",
    "Set",
    "Map",
    "Collection",
    "Iterable",
    "Iterator",
    "Optional",
    "OptionalInt",
    "OptionalLong",
    "OptionalDouble",
    "Stream",
    "IntStream",
    "LongStream",
    "DoubleStream",
    "ImmutableList",
    "ImmutableSet",
    "ImmutableMap",
    "ImmutableMultimap",
    "ImmutableListMultimap",
    "ImmutableSetMultimap",
    "ImmutableSortedSet",
    "ImmutableSortedMap",
    "ImmutableMultiset",
    "Flux",
    "Mono",
];

const EMPTY_CONSTANTS: &[&str] = &["EMPTY_LIST", "EMPTY_MAP", "EMPTY_SET"];

/// Matches expressions guaranteed to yield an empty container, array or string.
pub struct IsEmpty;

impl IsEmpty {
    fn is_empty(&self, expr: &Expr, cx: &GuardContext<'_>) -> bool {
        match &expr.strip_parens().kind {
            ExprKind::Call {
                receiver,
                name,
                args,
                ..
            } if args.is_empty() => {
                let owner = receiver.as_ref().and_then(|r| r.qualified_name());
                let owner = owner.as_deref().map(simple_name);
                match owner {
                    Some(owner) if CONTAINER_TYPES.contains(&owner) => {
                        matches!(name.as_str(), "empty" | "of" | "just" | "ofEntries")
                    }
                    Some("Collections") | Some("Spliterators") => name.starts_with("empty"),
                    None => {
                        let static_import = cx.unit.import_of(name, true).is_some_and(|i| {
                            i.path
                                .rsplit_once('.')
                                .is_some_and(|(o, _)| simple_name(o) == "Collections")
                        });
                        static_import && name.starts_with("empty")
                    }
                    _ => false,
                }
            }
            ExprKind::NewArray { dims, init, .. } => {
                dims.first().is_some_and(|d| match &d.strip_parens().kind {
                    ExprKind::Literal(lit) => lit.is_zero(),
                    _ => false,
                }) || init.as_ref().is_some_and(Vec::is_empty)
            }
            ExprKind::New { ty, args } if MUTABLE_COLLECTIONS.contains(&ty.simple_name()) => {
                // sizing arguments and comparators still give an empty collection
                let sizing = args.iter().all(|a| {
                    cx.type_of(a).is_some_and(|t| {
                        t.is_primitive() || cx.oracle.hierarchy().is_subtype(&t.name, "Comparator")
                    })
                });
                sizing || (args.len() == 1 && self.is_empty(&args[0], cx))
            }
            ExprKind::Cast { expr, .. } => self.is_empty(expr, cx),
            ExprKind::Literal(lit) => lit.text == "\"\"",
            ExprKind::FieldAccess { target, field } => {
                EMPTY_CONSTANTS.contains(&field.as_str())
                    && target
                        .qualified_name()
                        .is_some_and(|q| simple_name(&q) == "Collections")
            }
            _ => false,
        }
    }
}

impl GuardMatcher for IsEmpty {
    fn name(&self) -> &'static str {
        "is_empty"
    }

    fn matches(&self, cx: &GuardContext<'_>) -> Result<bool, GuardError> {
        Ok(self.is_empty(cx.expr, cx))
    }
}

/// Matches expressions of array type.
pub struct IsArray;

impl GuardMatcher for IsArray {
    fn name(&self) -> &'static str {
        "is_array"
    }

    fn matches(&self, cx: &GuardContext<'_>) -> Result<bool, GuardError> {
        if let ExprKind::NewArray { .. } = cx.expr.strip_parens().kind {
            return Ok(true);
        }
        let ty: Option<JavaType> = cx.ty.cloned().or_else(|| cx.type_of(cx.expr));
        match ty {
            Some(ty) => Ok(ty.is_array()),
            None => Err(GuardError::Unsupported {
                guard: self.name().to_string(),
                what: format!("'{}' of unknown type", cx.expr),
            }),
        }
    }
}

/// Matches expressions that are cheap enough to evaluate eagerly instead of lazily.
///
/// Names, literals, field reads and accessor-style calls on them, and lambdas
/// or method references whose evaluation is itself trivial.
pub struct IsLikelyTrivialComputation;

impl IsLikelyTrivialComputation {
    fn trivial(expr: &Expr) -> bool {
        match &expr.strip_parens().kind {
            ExprKind::Name(_) | ExprKind::Literal(_) | ExprKind::This | ExprKind::ClassLit(_) => {
                true
            }
            ExprKind::FieldAccess { target, .. } => Self::trivial(target),
            ExprKind::MethodRef { target, .. } => Self::trivial(target),
            ExprKind::Lambda { body, .. } => Self::trivial_body(body),
            ExprKind::Unary { operand, .. } => Self::trivial(operand),
            _ => false,
        }
    }

    /// A lambda body is trivial when it is a single accessor on trivial operands.
    fn trivial_body(body: &Expr) -> bool {
        match &body.strip_parens().kind {
            ExprKind::Call {
                receiver, args, ..
            } => {
                receiver.as_deref().is_none_or(Self::trivial) && args.iter().all(Self::trivial)
            }
            _ => Self::trivial(body),
        }
    }
}

impl GuardMatcher for IsLikelyTrivialComputation {
    fn name(&self) -> &'static str {
        "is_likely_trivial_computation"
    }

    fn matches(&self, cx: &GuardContext<'_>) -> Result<bool, GuardError> {
        Ok(Self::trivial(cx.expr))
    }
}

/// Matches expressions whose evaluation involves more than reading a constant or variable.
pub struct RequiresComputation;

impl RequiresComputation {
    fn requires(expr: &Expr) -> bool {
        match &expr.strip_parens().kind {
            ExprKind::Name(_)
            | ExprKind::Literal(_)
            | ExprKind::This
            | ExprKind::ClassLit(_)
            | ExprKind::Lambda { .. } => false,
            ExprKind::Unary {
                op: UnaryOp::Neg | UnaryOp::Plus,
                operand,
            } => Self::requires(operand),
            ExprKind::FieldAccess { target, .. } => Self::requires(target),
            ExprKind::MethodRef { target, .. } => Self::requires(target),
            _ => true,
        }
    }
}

impl GuardMatcher for RequiresComputation {
    fn name(&self) -> &'static str {
        "requires_computation"
    }

    fn matches(&self, cx: &GuardContext<'_>) -> Result<bool, GuardError> {
        Ok(Self::requires(cx.expr))
    }
}

/// Accessors known not to mutate their receiver.
const PURE_METHODS: &[&str] = &[
    "isEmpty",
    "size",
    "length",
    "get",
    "getKey",
    "getValue",
    "isPresent",
    "equals",
    "hashCode",
    "toString",
    "contains",
    "containsKey",
    "name",
    "ordinal",
];

/// Matches expressions whose evaluation cannot have side effects.
pub struct IsSideEffectFree;

impl IsSideEffectFree {
    fn free(expr: &Expr) -> bool {
        match &expr.strip_parens().kind {
            ExprKind::Name(_)
            | ExprKind::Literal(_)
            | ExprKind::This
            | ExprKind::ClassLit(_)
            | ExprKind::Lambda { .. } => true,
            ExprKind::MethodRef { target, .. } | ExprKind::FieldAccess { target, .. } => {
                Self::free(target)
            }
            ExprKind::Unary { operand, .. } => Self::free(operand),
            ExprKind::Binary { lhs, rhs, .. } => Self::free(lhs) && Self::free(rhs),
            ExprKind::Ternary {
                cond,
                then,
                otherwise,
            } => Self::free(cond) && Self::free(then) && Self::free(otherwise),
            ExprKind::Cast { expr, .. } | ExprKind::InstanceOf { expr, .. } => Self::free(expr),
            ExprKind::ArrayAccess { array, index } => Self::free(array) && Self::free(index),
            ExprKind::Call {
                receiver,
                name,
                args,
                ..
            } => {
                PURE_METHODS.contains(&name.as_str())
                    && receiver.as_deref().is_some_and(Self::free)
                    && args.iter().all(Self::free)
            }
            _ => false,
        }
    }
}

impl GuardMatcher for IsSideEffectFree {
    fn name(&self) -> &'static str {
        "is_side_effect_free"
    }

    fn matches(&self, cx: &GuardContext<'_>) -> Result<bool, GuardError> {
        Ok(Self::free(cx.expr))
    }
}

/// Matches literals, including signed numeric literals.
pub struct IsLiteral;

impl GuardMatcher for IsLiteral {
    fn name(&self) -> &'static str {
        "is_literal"
    }

    fn matches(&self, cx: &GuardContext<'_>) -> Result<bool, GuardError> {
        Ok(match &cx.expr.strip_parens().kind {
            ExprKind::Literal(_) => true,
            ExprKind::Unary {
                op: UnaryOp::Neg | UnaryOp::Plus,
                operand,
            } => matches!(operand.strip_parens().kind, ExprKind::Literal(_)),
            _ => false,
        })
    }
}
