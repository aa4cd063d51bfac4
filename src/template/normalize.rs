//! Compilation of catalog entries into canonical rules.

use super::{Pattern, PlaceholderCall, PlaceholderDecl, PlaceholderParam};
use crate::ast::{Expr, ExprKind, JavaType, parse_expression};
use crate::error::RuleDefinitionError;
use crate::guard::GuardRegistry;
use crate::rule::{
    Alternative, Guard, Import, Multiplicity, Param, Rule, RuleSpec, Specificity, TypeParam,
};
use crate::types::TypeHierarchy;
use std::collections::HashMap;
use std::sync::Arc;

type CompileResult<T> = std::result::Result<T, RuleDefinitionError>;

/// Compiles one catalog entry into an immutable [`Rule`].
///
/// Checks that only concern the rule itself happen here; checks that need the
/// matcher or other rules (idempotence, ambiguity) happen in the repository.
pub fn compile_rule(
    spec: &RuleSpec,
    group: &str,
    id: usize,
    guards: &GuardRegistry,
    hierarchy: &TypeHierarchy,
) -> CompileResult<Rule> {
    let rule = spec.name.clone();
    let invalid_type = |param: &str, ty: &str| RuleDefinitionError::InvalidType {
        rule: rule.clone(),
        param: param.to_string(),
        ty: ty.to_string(),
    };

    let type_params = spec
        .type_params
        .iter()
        .map(|text| parse_type_param(text).ok_or_else(|| invalid_type(text, text)))
        .collect::<CompileResult<Vec<_>>>()?;

    let mut params = HashMap::new();
    let mut rule_guards = Vec::new();
    for param in &spec.params {
        let mut ty = JavaType::parse(&param.ty).ok_or_else(|| invalid_type(&param.name, &param.ty))?;
        let multiplicity = if param.repeated {
            // `T...` and `T[]` both declare the element type `T`
            if ty.is_array() {
                ty = ty.element().unwrap_or(ty);
            }
            Multiplicity::Repeated
        } else {
            Multiplicity::Single
        };
        let previous = params.insert(
            param.name.clone(),
            Param {
                name: param.name.clone(),
                ty,
                multiplicity,
            },
        );
        if previous.is_some() {
            return Err(RuleDefinitionError::DuplicateParameter {
                rule: rule.clone(),
                param: param.name.clone(),
            });
        }

        let required = param.matches.iter().map(|m| (m, false));
        let forbidden = param.not_matches.iter().map(|m| (m, true));
        for (matcher, negate) in required.chain(forbidden) {
            if !guards.contains(matcher) {
                return Err(RuleDefinitionError::UnknownGuard {
                    rule: rule.clone(),
                    matcher: matcher.clone(),
                });
            }
            rule_guards.push(Guard {
                var: param.name.clone(),
                matcher: matcher.clone(),
                negate,
            });
        }
    }

    let mut placeholders = HashMap::new();
    for spec_placeholder in &spec.placeholders {
        if params.contains_key(&spec_placeholder.name)
            || placeholders.contains_key(&spec_placeholder.name)
        {
            return Err(RuleDefinitionError::DuplicateParameter {
                rule: rule.clone(),
                param: spec_placeholder.name.clone(),
            });
        }
        let parse_optional = |param: &str, ty: &Option<String>| -> CompileResult<Option<JavaType>> {
            ty.as_deref()
                .map(|t| JavaType::parse(t).ok_or_else(|| invalid_type(param, t)))
                .transpose()
        };
        let decl = PlaceholderDecl {
            name: spec_placeholder.name.clone(),
            ty: parse_optional(&spec_placeholder.name, &spec_placeholder.ty)?,
            params: spec_placeholder
                .params
                .iter()
                .map(|p| {
                    Ok(PlaceholderParam {
                        name: p.name.clone(),
                        ty: parse_optional(&p.name, &p.ty)?,
                        optional: p.optional,
                    })
                })
                .collect::<CompileResult<Vec<_>>>()?,
        };
        placeholders.insert(decl.name.clone(), Arc::new(decl));
    }

    if spec.before.is_empty() {
        return Err(RuleDefinitionError::NoBeforeTemplate { rule: rule.clone() });
    }

    let normalizer = Normalizer {
        rule: &rule,
        params: &params,
        placeholders: &placeholders,
    };
    let before = spec
        .before
        .iter()
        .map(|template| normalizer.template(template))
        .collect::<CompileResult<Vec<_>>>()?;
    let after = normalizer.template(&spec.after)?;

    for pattern in before.iter().chain(std::iter::once(&after)) {
        normalizer.check_multiplicity(pattern, false)?;
    }

    for (index, pattern) in before.iter().enumerate() {
        let bound = pattern.metavars();
        if let Some(unbound) = after.metavars().into_iter().find(|v| !bound.contains(v)) {
            return Err(RuleDefinitionError::UnboundInAfter {
                rule: rule.clone(),
                param: unbound.to_string(),
                index,
            });
        }
        let captured = pattern.placeholders();
        if let Some(missing) = after.placeholders().into_iter().find(|p| !captured.contains(p)) {
            return Err(RuleDefinitionError::UnboundPlaceholder {
                rule: rule.clone(),
                placeholder: missing.to_string(),
            });
        }
    }

    let imports = spec
        .imports
        .iter()
        .map(|text| {
            Import::parse(text).ok_or_else(|| RuleDefinitionError::InvalidImport {
                rule: rule.clone(),
                import: text.clone(),
            })
        })
        .collect::<CompileResult<Vec<_>>>()?;

    let is_type_param = |name: &str| type_params.iter().any(|t: &TypeParam| t.name == name);
    let before = before
        .into_iter()
        .map(|pattern| {
            let bound_depth = pattern
                .metavars()
                .iter()
                .filter_map(|v| params.get(*v))
                .filter(|p| !is_type_param(&p.ty.name))
                .map(|p| hierarchy.depth(&p.ty.name))
                .sum();
            let identifiers = pattern.identifiers(!spec.also_negation);
            Alternative {
                specificity: Specificity {
                    literal_weight: pattern.literal_weight(),
                    bound_depth,
                },
                identifiers,
                discriminator: pattern.discriminator(),
                pattern,
            }
        })
        .collect();

    Ok(Rule {
        id,
        name: spec.name.clone(),
        group: group.to_string(),
        description: spec.description.clone(),
        type_params,
        params,
        placeholders,
        before,
        after,
        guards: rule_guards,
        also_negation: spec.also_negation,
        import_policy: spec.import_policy,
        imports,
        priority: spec.priority,
        behavior_preserving: spec.behavior_preserving,
        risk: spec.risk.clone(),
    })
}

/// Parses `T` or `T extends Bound`.
fn parse_type_param(text: &str) -> Option<TypeParam> {
    let text = text.trim();
    let (name, bound) = match text.split_once(" extends ") {
        Some((name, bound)) => (name.trim(), Some(JavaType::parse(bound)?)),
        None => (text, None),
    };
    let valid = name.chars().next().is_some_and(char::is_alphabetic)
        && name.chars().all(|c| c.is_alphanumeric() || c == '_');
    valid.then(|| TypeParam {
        name: name.to_string(),
        bound,
    })
}

struct Normalizer<'a> {
    rule: &'a str,
    params: &'a HashMap<String, Param>,
    placeholders: &'a HashMap<String, Arc<PlaceholderDecl>>,
}

impl Normalizer<'_> {
    fn template(&self, text: &str) -> CompileResult<Pattern> {
        let expr = parse_expression(text).ok_or_else(|| RuleDefinitionError::Syntax {
            rule: self.rule.to_string(),
            template: text.to_string(),
        })?;
        self.pattern(&expr, &mut Vec::new())
    }

    fn patterns(&self, exprs: &[Expr], scope: &mut Vec<String>) -> CompileResult<Vec<Pattern>> {
        exprs.iter().map(|e| self.pattern(e, scope)).collect()
    }

    fn boxed(&self, expr: &Expr, scope: &mut Vec<String>) -> CompileResult<Box<Pattern>> {
        Ok(Box::new(self.pattern(expr, scope)?))
    }

    fn pattern(&self, expr: &Expr, scope: &mut Vec<String>) -> CompileResult<Pattern> {
        Ok(match &expr.kind {
            ExprKind::Paren(inner) => self.pattern(inner, scope)?,
            ExprKind::Name(name) if scope.contains(name) => Pattern::LambdaParam(name.clone()),
            ExprKind::Name(name) if self.params.contains_key(name) => {
                Pattern::Metavar(name.clone())
            }
            ExprKind::Name(name) => Pattern::Name(name.clone()),
            ExprKind::Literal(lit) => Pattern::Literal(lit.clone()),
            ExprKind::This => Pattern::This,
            ExprKind::Opaque(text) => Pattern::Opaque(text.clone()),
            ExprKind::FieldAccess { target, field } => Pattern::FieldAccess {
                target: self.boxed(target, scope)?,
                field: field.clone(),
            },
            ExprKind::Call {
                receiver: None,
                name,
                args,
                ..
            } if self.placeholders.contains_key(name) => {
                let decl = Arc::clone(&self.placeholders[name]);
                if decl.params.len() != args.len() {
                    return Err(RuleDefinitionError::PlaceholderArity {
                        rule: self.rule.to_string(),
                        placeholder: name.clone(),
                        expected: decl.params.len(),
                        found: args.len(),
                    });
                }
                Pattern::Placeholder(PlaceholderCall {
                    decl,
                    args: self.patterns(args, scope)?,
                })
            }
            ExprKind::Call {
                receiver,
                type_args,
                name,
                args,
            } => Pattern::Call {
                receiver: receiver
                    .as_ref()
                    .map(|r| self.boxed(r, scope))
                    .transpose()?,
                type_args: type_args.clone(),
                name: name.clone(),
                args: self.patterns(args, scope)?,
            },
            ExprKind::New { ty, args } => Pattern::New {
                ty: ty.clone(),
                args: self.patterns(args, scope)?,
            },
            ExprKind::NewArray { ty, dims, init } => Pattern::NewArray {
                ty: ty.clone(),
                dims: self.patterns(dims, scope)?,
                init: init
                    .as_ref()
                    .map(|items| self.patterns(items, scope))
                    .transpose()?,
            },
            ExprKind::Unary { op, operand } => Pattern::Unary {
                op: *op,
                operand: self.boxed(operand, scope)?,
            },
            ExprKind::Binary { op, lhs, rhs } => Pattern::Binary {
                op: *op,
                lhs: self.boxed(lhs, scope)?,
                rhs: self.boxed(rhs, scope)?,
            },
            ExprKind::Ternary {
                cond,
                then,
                otherwise,
            } => Pattern::Ternary {
                cond: self.boxed(cond, scope)?,
                then: self.boxed(then, scope)?,
                otherwise: self.boxed(otherwise, scope)?,
            },
            ExprKind::Cast { ty, expr } => Pattern::Cast {
                ty: ty.clone(),
                expr: self.boxed(expr, scope)?,
            },
            ExprKind::InstanceOf { expr, ty } => Pattern::InstanceOf {
                expr: self.boxed(expr, scope)?,
                ty: ty.clone(),
            },
            ExprKind::ArrayAccess { array, index } => Pattern::ArrayAccess {
                array: self.boxed(array, scope)?,
                index: self.boxed(index, scope)?,
            },
            ExprKind::Lambda { params, body } => {
                let depth = scope.len();
                scope.extend(params.iter().cloned());
                let body = self.boxed(body, scope);
                scope.truncate(depth);
                Pattern::Lambda {
                    params: params.clone(),
                    body: body?,
                }
            }
            ExprKind::MethodRef { target, name } => Pattern::MethodRef {
                target: self.boxed(target, scope)?,
                name: name.clone(),
            },
            ExprKind::ClassLit(ty) => Pattern::ClassLit(ty.clone()),
        })
    }

    /// Repeated metavariables may only appear as elements of an argument list,
    /// at most one per list.
    fn check_multiplicity(&self, pattern: &Pattern, in_list: bool) -> CompileResult<()> {
        let inconsistent = |param: &str, detail: &str| RuleDefinitionError::InconsistentMultiplicity {
            rule: self.rule.to_string(),
            param: param.to_string(),
            detail: detail.to_string(),
        };
        let is_repeated = |p: &Pattern| match p {
            Pattern::Metavar(name) => self
                .params
                .get(name)
                .is_some_and(|p| p.multiplicity == Multiplicity::Repeated),
            _ => false,
        };

        if let Pattern::Metavar(name) = pattern {
            if is_repeated(pattern) && !in_list {
                return Err(inconsistent(
                    name,
                    "repeated parameter used outside an argument list",
                ));
            }
        }

        let lists: Vec<&[Pattern]> = match pattern {
            Pattern::Call { args, .. } | Pattern::New { args, .. } => vec![args.as_slice()],
            Pattern::Placeholder(call) => vec![call.args.as_slice()],
            Pattern::NewArray {
                init: Some(items), ..
            } => vec![items.as_slice()],
            _ => Vec::new(),
        };
        for list in &lists {
            let repeated: Vec<&Pattern> = list.iter().filter(|p| is_repeated(p)).collect();
            if repeated.len() > 1 {
                let name = match repeated[1] {
                    Pattern::Metavar(name) => name.as_str(),
                    _ => "",
                };
                return Err(inconsistent(name, "more than one repeated parameter in one argument list"));
            }
        }

        for child in pattern.children() {
            let in_list = lists
                .iter()
                .any(|list| list.iter().any(|item| std::ptr::eq(item, child)));
            self.check_multiplicity(child, in_list)?;
        }
        Ok(())
    }
}
