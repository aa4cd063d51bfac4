//! Typed structural unification of template patterns against target code.

use super::binding::{Bound, BoundExpr, Binding, PlaceholderFn};
use crate::ast::{BinaryOp, CompilationUnit, Expr, ExprKind, JavaType, UnaryOp, simple_name};
use crate::rule::{Multiplicity, Rule};
use crate::template::{Pattern, PlaceholderCall};
use crate::types::{TypeOracle, known_class, same_type};

/// Matches the patterns of one rule against the expressions of one compilation unit.
///
/// Matching is a single top-down pass per alternative: no partial commit, no
/// backtracking across subtrees and no implicit commutativity. A failed match
/// is `None`, never an error.
pub struct Unifier<'a> {
    rule: &'a Rule,
    oracle: &'a dyn TypeOracle,
    unit: &'a CompilationUnit,
}

/// A placeholder seen during the structural pass, resolved once every
/// metavariable of the pattern is bound.
struct Deferred<'p> {
    call: &'p PlaceholderCall,
    target: Expr,
    scope: Vec<(String, String)>,
}

struct State<'p> {
    binding: Binding,
    /// Enclosing lambda parameters as (template name, target name), innermost last.
    scope: Vec<(String, String)>,
    deferred: Vec<Deferred<'p>>,
}

impl<'a> Unifier<'a> {
    pub fn new(rule: &'a Rule, oracle: &'a dyn TypeOracle, unit: &'a CompilationUnit) -> Self {
        Self { rule, oracle, unit }
    }

    pub fn rule(&self) -> &Rule {
        self.rule
    }

    /// Unifies one pattern with `target`, returning a fresh binding on success.
    pub fn match_pattern(&self, pattern: &Pattern, target: &Expr) -> Option<Binding> {
        let mut state = State {
            binding: Binding::new(),
            scope: Vec::new(),
            deferred: Vec::new(),
        };
        if !self.unify(pattern, target, &mut state) {
            return None;
        }
        for deferred in std::mem::take(&mut state.deferred) {
            if !self.bind_placeholder(&deferred, &mut state.binding) {
                return None;
            }
        }
        Some(state.binding)
    }

    /// Tries the before-templates in declared order; the first success wins.
    pub fn match_alternatives(&self, target: &Expr) -> Option<(usize, Binding)> {
        self.match_alternatives_with(target, |_| true)
    }

    /// Like [`Unifier::match_alternatives`], moving on to the next alternative
    /// when `accept` rejects a structurally successful binding.
    pub fn match_alternatives_with(
        &self,
        target: &Expr,
        mut accept: impl FnMut(&Binding) -> bool,
    ) -> Option<(usize, Binding)> {
        self.rule
            .before
            .iter()
            .enumerate()
            .find_map(|(index, alt)| {
                self.match_pattern(&alt.pattern, target)
                    .filter(|b| accept(b))
                    .map(|b| (index, b))
            })
    }

    /// Matches `target` as the logical negation of a before-template.
    ///
    /// Either the negated template matches directly (`a >= b` for a template
    /// `a < b`), or `target` is `!inner` and the template matches `inner`.
    /// A flipped comparison only matches when neither operand can be NaN.
    pub fn match_negated(
        &self,
        target: &Expr,
        mut accept: impl FnMut(&Binding) -> bool,
    ) -> Option<(usize, Binding)> {
        let target = target.strip_parens();
        if let ExprKind::Unary {
            op: UnaryOp::Not,
            operand,
        } = &target.kind
        {
            if let Some(found) = self.match_alternatives_with(operand, &mut accept) {
                return Some(found);
            }
        }
        self.rule
            .before
            .iter()
            .enumerate()
            .find_map(|(index, alt)| {
                // `!x` negates to `x`, which would match anything
                let negated = alt.pattern.negated()?;
                if matches!(negated, Pattern::Metavar(_)) {
                    return None;
                }
                if !self.complement_is_exact(target) {
                    return None;
                }
                self.match_pattern(&negated, target)
                    .filter(|b| accept(b))
                    .map(|b| (index, b))
            })
    }

    /// Whether `target`, if it is an ordering comparison, has operands of known
    /// non-floating types, so that `!(a < b)` and `a >= b` agree.
    fn complement_is_exact(&self, target: &Expr) -> bool {
        let ExprKind::Binary { op, lhs, rhs } = &target.kind else {
            return true;
        };
        if !matches!(op, BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge) {
            return true;
        }
        [lhs, rhs].iter().all(|side| {
            self.oracle.static_type(side, self.unit).is_some_and(|ty| {
                let name = ty.unboxed().unwrap_or(ty.name.as_str());
                name != "float" && name != "double"
            })
        })
    }

    fn unify<'p>(&self, pattern: &'p Pattern, target: &Expr, st: &mut State<'p>) -> bool {
        let target = target.strip_parens();
        match (pattern, &target.kind) {
            (Pattern::Metavar(name), _) => self.bind_metavar(name, target, st),
            (Pattern::Placeholder(call), _) => {
                st.deferred.push(Deferred {
                    call,
                    target: target.clone(),
                    scope: st.scope.clone(),
                });
                true
            }
            (Pattern::LambdaParam(name), ExprKind::Name(actual)) => st
                .scope
                .iter()
                .rev()
                .find(|(template, _)| template == name)
                .is_some_and(|(_, bound)| bound == actual),
            (Pattern::Name(name), _) => self.name_matches(name, target),
            (Pattern::Literal(lit), ExprKind::Literal(actual)) => lit == actual,
            (Pattern::This, ExprKind::This) => true,
            (
                Pattern::FieldAccess { target: t, field },
                ExprKind::FieldAccess {
                    target: actual,
                    field: actual_field,
                },
            ) => field == actual_field && self.unify(t, actual, st),
            (Pattern::Call { .. }, ExprKind::Call { .. }) => self.unify_call(pattern, target, st),
            (
                Pattern::New { ty, args },
                ExprKind::New {
                    ty: actual_ty,
                    args: actual_args,
                },
            ) => self.type_matches(ty, actual_ty, &mut st.binding) && self.unify_seq(args, actual_args, st),
            (
                Pattern::NewArray { ty, dims, init },
                ExprKind::NewArray {
                    ty: actual_ty,
                    dims: actual_dims,
                    init: actual_init,
                },
            ) => {
                self.type_matches(ty, actual_ty, &mut st.binding)
                    && self.unify_seq(dims, actual_dims, st)
                    && match (init, actual_init) {
                        (Some(items), Some(actual)) => self.unify_seq(items, actual, st),
                        (None, None) => true,
                        _ => false,
                    }
            }
            (
                Pattern::Unary { op, operand },
                ExprKind::Unary {
                    op: actual_op,
                    operand: actual,
                },
            ) => op == actual_op && self.unify(operand, actual, st),
            (
                Pattern::Binary { op, lhs, rhs },
                ExprKind::Binary {
                    op: actual_op,
                    lhs: l,
                    rhs: r,
                },
            ) => op == actual_op && self.unify(lhs, l, st) && self.unify(rhs, r, st),
            (
                Pattern::Ternary {
                    cond,
                    then,
                    otherwise,
                },
                ExprKind::Ternary {
                    cond: c,
                    then: t,
                    otherwise: o,
                },
            ) => self.unify(cond, c, st) && self.unify(then, t, st) && self.unify(otherwise, o, st),
            (
                Pattern::Cast { ty, expr },
                ExprKind::Cast {
                    ty: actual_ty,
                    expr: actual,
                },
            )
            | (
                Pattern::InstanceOf { expr, ty },
                ExprKind::InstanceOf {
                    expr: actual,
                    ty: actual_ty,
                },
            ) => self.type_matches(ty, actual_ty, &mut st.binding) && self.unify(expr, actual, st),
            (
                Pattern::ArrayAccess { array, index },
                ExprKind::ArrayAccess {
                    array: a,
                    index: i,
                },
            ) => self.unify(array, a, st) && self.unify(index, i, st),
            (
                Pattern::Lambda { params, body },
                ExprKind::Lambda {
                    params: actual_params,
                    body: actual_body,
                },
            ) => {
                if params.len() != actual_params.len() {
                    return false;
                }
                let depth = st.scope.len();
                for (template, actual) in params.iter().zip(actual_params) {
                    st.scope.push((template.clone(), actual.clone()));
                    st.binding.rename_lambda_param(template.clone(), actual.clone());
                }
                let matched = self.unify(body, actual_body, st);
                st.scope.truncate(depth);
                matched
            }
            (
                Pattern::MethodRef { target: t, name },
                ExprKind::MethodRef {
                    target: actual,
                    name: actual_name,
                },
            ) => name == actual_name && self.unify(t, actual, st),
            (Pattern::ClassLit(ty), ExprKind::ClassLit(actual)) => {
                self.type_matches(ty, actual, &mut st.binding)
            }
            (Pattern::Opaque(text), ExprKind::Opaque(actual)) => same_tokens(text, actual),
            _ => false,
        }
    }

    fn unify_call<'p>(&self, pattern: &'p Pattern, target: &Expr, st: &mut State<'p>) -> bool {
        let (
            Pattern::Call {
                receiver,
                type_args,
                name,
                args,
            },
            ExprKind::Call {
                receiver: actual_receiver,
                type_args: actual_type_args,
                name: actual_name,
                args: actual_args,
            },
        ) = (pattern, &target.kind)
        else {
            return false;
        };
        if name != actual_name {
            return false;
        }

        let receivers = match (receiver, actual_receiver) {
            (Some(r), Some(actual)) => self.unify(r, actual, st),
            (None, None) => self.static_member_resolves(name),
            // `Owner.member(..)` in the template, `member(..)` statically imported in the target
            (Some(r), None) => match r.as_ref() {
                Pattern::Name(owner) => {
                    let qualified = self.template_class(owner);
                    self.unit.imports().iter().filter(|i| i.is_static).any(|i| {
                        let class = if i.wildcard {
                            Some(i.path.as_str())
                        } else {
                            i.path
                                .rsplit_once('.')
                                .filter(|(_, member)| *member == name.as_str())
                                .map(|(class, _)| class)
                        };
                        class.is_some_and(|class| match &qualified {
                            Some(q) => class == q,
                            None => simple_name(class) == simple_name(owner),
                        })
                    })
                }
                _ => false,
            },
            // `member(..)` in the template refers to a static import the rule declares
            (None, Some(actual)) => self
                .rule
                .imports
                .iter()
                .filter(|i| i.is_static && i.simple_name() == name)
                .filter_map(|i| i.owner())
                .any(|owner| self.names_class(owner, actual)),
        };
        if !receivers {
            return false;
        }

        // explicit type witnesses constrain only when the template spells them out
        if !type_args.is_empty() {
            if type_args.len() != actual_type_args.len() {
                if !actual_type_args.is_empty() {
                    return false;
                }
            } else {
                for (ty, actual) in type_args.iter().zip(actual_type_args) {
                    if !self.type_matches(ty, actual, &mut st.binding) {
                        return false;
                    }
                }
            }
        }

        self.unify_seq(args, actual_args, st)
    }

    /// Unifies a pattern list with a target list, expanding at most one repeated
    /// metavariable over the run of targets between the fixed prefix and suffix.
    fn unify_seq<'p>(&self, patterns: &'p [Pattern], targets: &[Expr], st: &mut State<'p>) -> bool {
        let repeated = patterns
            .iter()
            .position(|p| matches!(p, Pattern::Metavar(name) if self.rule.is_repeated(name)));
        let Some(at) = repeated else {
            return patterns.len() == targets.len()
                && patterns.iter().zip(targets).all(|(p, t)| self.unify(p, t, st));
        };

        let suffix = patterns.len() - at - 1;
        if targets.len() < at + suffix {
            return false;
        }
        let run_end = targets.len() - suffix;
        for (p, t) in patterns[..at].iter().zip(&targets[..at]) {
            if !self.unify(p, t, st) {
                return false;
            }
        }
        for (p, t) in patterns[at + 1..].iter().zip(&targets[run_end..]) {
            if !self.unify(p, t, st) {
                return false;
            }
        }
        let Pattern::Metavar(name) = &patterns[at] else {
            return false;
        };
        self.bind_repeated(name, &targets[at..run_end], st)
    }

    fn bind_metavar(&self, name: &str, target: &Expr, st: &mut State<'_>) -> bool {
        if mentions_scoped(target, &st.scope) {
            return false;
        }
        if let Some(existing) = st.binding.get(name) {
            return match existing {
                Bound::Single(bound) => bound.expr.same_structure(target),
                Bound::Repeated(_) => false,
            };
        }
        let Some(param) = self.rule.param(name) else {
            return false;
        };
        if param.multiplicity == Multiplicity::Repeated {
            // repeated variables only bind through argument lists
            return false;
        }
        let ty = self.oracle.static_type(target, self.unit);
        if !self.admits(&param.ty, ty.as_ref(), target, &mut st.binding) {
            return false;
        }
        st.binding.bind(
            name,
            Bound::Single(BoundExpr {
                expr: target.clone(),
                ty,
            }),
        );
        true
    }

    fn bind_repeated(&self, name: &str, targets: &[Expr], st: &mut State<'_>) -> bool {
        let Some(param) = self.rule.param(name) else {
            return false;
        };
        let mut items = Vec::with_capacity(targets.len());
        for target in targets {
            let target = target.strip_parens();
            if mentions_scoped(target, &st.scope) {
                return false;
            }
            let ty = self.oracle.static_type(target, self.unit);
            if !self.admits(&param.ty, ty.as_ref(), target, &mut st.binding) {
                return false;
            }
            items.push(BoundExpr {
                expr: target.clone(),
                ty,
            });
        }
        if let Some(existing) = st.binding.get(name) {
            return match existing {
                Bound::Repeated(previous) => {
                    previous.len() == items.len()
                        && previous
                            .iter()
                            .zip(&items)
                            .all(|(a, b)| a.expr.same_structure(&b.expr))
                }
                Bound::Single(_) => false,
            };
        }
        st.binding.bind(name, Bound::Repeated(items));
        true
    }

    /// Checks a bound expression's static type against a declared parameter type.
    fn admits(
        &self,
        declared: &JavaType,
        actual: Option<&JavaType>,
        target: &Expr,
        binding: &mut Binding,
    ) -> bool {
        if self.rule.is_type_param(&declared.name) {
            return match actual {
                Some(actual) => self.capture_type_var(declared, actual, binding),
                None => true,
            };
        }
        if declared.dims == 0 && declared.args.is_empty() && declared.simple_name() == "Object" {
            return true;
        }
        let Some(actual) = actual else {
            let functional = matches!(
                target.strip_parens().kind,
                ExprKind::Lambda { .. } | ExprKind::MethodRef { .. }
            );
            return self.oracle.accepts_unknown() || (functional && !declared.is_primitive());
        };
        let bound = self.erase_type_vars(declared);
        if !self.oracle.is_assignable(actual, &bound) {
            return false;
        }
        self.capture_args(declared, actual, binding)
    }

    /// Binds rule type variables mentioned in `declared` from the matching
    /// positions of `actual`.
    fn capture_args(&self, declared: &JavaType, actual: &JavaType, binding: &mut Binding) -> bool {
        if self.rule.is_type_param(&declared.name) {
            return self.capture_type_var(declared, actual, binding);
        }
        if declared.args.len() != actual.args.len() || declared.dims != actual.dims {
            return true;
        }
        declared
            .args
            .iter()
            .zip(&actual.args)
            .filter(|(_, a)| !a.is_wildcard())
            .all(|(d, a)| self.capture_args(d, a, binding))
    }

    /// Binds the rule type variable `declared` (possibly an array of one) to `actual`.
    fn capture_type_var(&self, declared: &JavaType, actual: &JavaType, binding: &mut Binding) -> bool {
        if actual.name == "null" || actual.name == "void" {
            return actual.name == "null";
        }
        if actual.dims < declared.dims {
            return false;
        }
        let mut value = JavaType {
            name: actual.name.clone(),
            args: actual.args.clone(),
            dims: actual.dims - declared.dims,
        };
        if value.is_primitive() {
            if declared.dims > 0 {
                return false;
            }
            value = value.boxed().map(JavaType::named).unwrap_or(value);
        }

        if let Some(bound) = self
            .rule
            .type_param(&declared.name)
            .and_then(|t| t.bound.as_ref())
        {
            if !self.oracle.is_assignable(&value, &self.erase_type_vars(bound)) {
                return false;
            }
        }

        match binding.type_var(&declared.name).cloned() {
            None => {
                binding.bind_type_var(declared.name.clone(), value);
                true
            }
            Some(existing) if same_type(&existing, &value) => true,
            // keep the wider of two compatible instantiations
            Some(existing) if self.oracle.is_assignable(&value, &existing) => true,
            Some(existing) if self.oracle.is_assignable(&existing, &value) => {
                binding.bind_type_var(declared.name.clone(), value);
                true
            }
            Some(_) => false,
        }
    }

    /// Replaces rule type variables by wildcards (or `Object` at the top level).
    fn erase_type_vars(&self, ty: &JavaType) -> JavaType {
        if self.rule.is_type_param(&ty.name) {
            return JavaType::named("Object").with_dims(ty.dims);
        }
        JavaType {
            name: ty.name.clone(),
            args: ty
                .args
                .iter()
                .map(|a| {
                    if self.rule.is_type_param(&a.name) && a.dims == 0 {
                        JavaType::wildcard()
                    } else {
                        self.erase_type_vars(a)
                    }
                })
                .collect(),
            dims: ty.dims,
        }
    }

    /// Compares a type written in a template with one written in target code.
    fn type_matches(&self, pattern: &JavaType, actual: &JavaType, binding: &mut Binding) -> bool {
        if pattern.is_wildcard() {
            return true;
        }
        if self.rule.is_type_param(&pattern.name) {
            return self.capture_type_var(pattern, actual, binding);
        }
        if pattern.simple_name() != actual.simple_name() || pattern.dims != actual.dims {
            return false;
        }
        // raw types and diamonds match any instantiation
        let raw = |t: &JavaType| t.args.is_empty() || t.is_diamond();
        if raw(pattern) || raw(actual) {
            return true;
        }
        pattern.args.len() == actual.args.len()
            && pattern
                .args
                .iter()
                .zip(&actual.args)
                .all(|(p, a)| self.type_matches(p, a, binding))
    }

    /// A template name matches the same name, or the same name qualified by a package.
    ///
    /// Class names the rule can place in a package must also resolve to that
    /// package in the target unit.
    fn name_matches(&self, name: &str, target: &Expr) -> bool {
        if let Some(qualified) = self.template_class(name) {
            return self.names_class(&qualified, target);
        }
        match &target.kind {
            ExprKind::Name(actual) => actual == name,
            ExprKind::FieldAccess { .. } => target.qualified_name().is_some_and(|qualified| {
                qualified
                    .strip_suffix(name)
                    .and_then(|prefix| prefix.strip_suffix('.'))
                    .is_some_and(|package| package.starts_with(|c: char| c.is_ascii_lowercase()))
            }),
            _ => false,
        }
    }

    /// The qualified name of a class the template spells by its simple name.
    fn template_class(&self, simple: &str) -> Option<String> {
        self.rule
            .imports
            .iter()
            .find(|i| !i.is_static && i.simple_name() == simple)
            .map(|i| i.path.clone())
            .or_else(|| known_class(simple))
    }

    /// Whether `target` refers to the class `qualified` from within the unit.
    fn names_class(&self, qualified: &str, target: &Expr) -> bool {
        let simple = simple_name(qualified);
        match &target.kind {
            ExprKind::Name(actual) if actual == simple => match self.unit.import_of(simple, false) {
                Some(import) => import.path == qualified,
                None => {
                    !self.unit.declares_type(simple)
                        || self
                            .unit
                            .package()
                            .is_some_and(|package| format!("{package}.{simple}") == qualified)
                }
            },
            ExprKind::FieldAccess { .. } => target.qualified_name().as_deref() == Some(qualified),
            _ => false,
        }
    }

    /// Whether a receiverless call to `member` can reach the member the rule imports.
    ///
    /// A single static import shadows every on-demand one, so an explicit import
    /// from another class rules the call out. On-demand imports rule it out only
    /// when none of them is the rule's own class.
    fn static_member_resolves(&self, member: &str) -> bool {
        let expected = self
            .rule
            .imports
            .iter()
            .find(|i| i.is_static && i.simple_name() == member);
        let mut on_demand = None;
        for import in self.unit.imports().iter().filter(|i| i.is_static) {
            if import.wildcard {
                let own = expected.and_then(|e| e.owner()) == Some(import.path.as_str());
                on_demand = Some(own || on_demand == Some(true));
            } else if import.simple_name() == Some(member) {
                return expected.is_some_and(|e| e.path == import.path);
            }
        }
        on_demand.unwrap_or(true)
    }

    /// Captures a placeholder body once the structural pass has bound its arguments.
    fn bind_placeholder(&self, deferred: &Deferred<'_>, binding: &mut Binding) -> bool {
        let call = deferred.call;
        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            match realize(arg, binding, &deferred.scope) {
                Some(expr) => args.push(expr),
                None => return false,
            }
        }

        let mut body = deferred.target.clone();
        for (index, arg) in args.iter().enumerate() {
            body = body.replace_where(&mut |node| {
                node.same_structure(arg)
                    .then(|| Expr::name(PlaceholderFn::marker(index)))
            });
        }

        for (index, formal) in call.decl.params.iter().enumerate() {
            if !formal.optional && !body.mentions_name(&PlaceholderFn::marker(index)) {
                return false;
            }
        }
        if mentions_scoped(&body, &deferred.scope) {
            return false;
        }
        if let Some(declared) = &call.decl.ty {
            if !self.rule.is_type_param(&declared.name) {
                let actual = self.oracle.static_type(&deferred.target, self.unit);
                if let Some(actual) = actual {
                    if !self.oracle.is_assignable(&actual, &self.erase_type_vars(declared)) {
                        return false;
                    }
                }
            }
        }

        let value = PlaceholderFn {
            body,
            arity: call.decl.params.len(),
        };
        match binding.placeholder(&call.decl.name) {
            Some(existing) => existing.body.same_structure(&value.body),
            None => {
                binding.bind_placeholder(call.decl.name.clone(), value);
                true
            }
        }
    }
}

/// Builds the target expression a placeholder argument stands for.
fn realize(arg: &Pattern, binding: &Binding, scope: &[(String, String)]) -> Option<Expr> {
    let mut complete = true;
    let expr = arg.skeleton_with(&mut |p| {
        let realized = match p {
            Pattern::Metavar(name) => binding.single(name).map(|b| b.expr.clone()),
            Pattern::LambdaParam(name) => scope
                .iter()
                .rev()
                .find(|(template, _)| template == name)
                .map(|(_, actual)| Expr::name(actual.clone())),
            Pattern::Placeholder(_) => None,
            _ => return None,
        };
        complete &= realized.is_some();
        Some(realized.unwrap_or_else(|| Expr::name("")))
    });
    complete.then_some(expr)
}

fn mentions_scoped(expr: &Expr, scope: &[(String, String)]) -> bool {
    scope.iter().any(|(_, actual)| expr.mentions_name(actual))
}

fn same_tokens(a: &str, b: &str) -> bool {
    a.split_whitespace().eq(b.split_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::GuardRegistry;
    use crate::rule::RuleSpec;
    use crate::template::compile_rule;
    use crate::types::{DeclaredTypeOracle, TypeHierarchy};

    const SOURCE: &str = r#"
import java.util.*;
import java.time.Instant;

class A {
    void run(List<String> list, Map<String, Integer> map, Instant a, Instant b, int n,
             Optional<String> optional, Object any) {
    }
}
"#;

    fn rule(yaml: &str) -> Rule {
        let spec: RuleSpec = serde_yaml::from_str(yaml).unwrap();
        compile_rule(&spec, "Test", 0, &GuardRegistry::builtin(), &TypeHierarchy::jdk()).unwrap()
    }

    fn expr(text: &str) -> Expr {
        crate::ast::parse_expression(text).unwrap()
    }

    fn matches(rule: &Rule, text: &str) -> Option<Binding> {
        matches_in(rule, SOURCE, text)
    }

    fn matches_in(rule: &Rule, source: &str, text: &str) -> Option<Binding> {
        let unit = CompilationUnit::parse(source).unwrap();
        let oracle = DeclaredTypeOracle::default();
        let unifier = Unifier::new(rule, &oracle, &unit);
        unifier.match_alternatives(&expr(text)).map(|(_, b)| b)
    }

    #[test]
    fn test_binds_metavariable_with_type() {
        let rule = rule(
            r#"
name: ListGetFirst
type_params: [T]
params: [{name: list, type: "List<T>"}]
before: ["list.get(0)"]
after: list.getFirst()
"#,
        );
        let binding = matches(&rule, "list.get(0)").unwrap();
        assert_eq!(binding.single("list").unwrap().expr.to_string(), "list");
        assert_eq!(binding.type_var("T").unwrap().to_string(), "String");

        assert!(matches(&rule, "list.get(1)").is_none());
        // a Map is not a List
        assert!(matches(&rule, "map.get(0)").is_none());
        // unknown receivers fail closed
        assert!(matches(&rule, "unknown.get(0)").is_none());
    }

    #[test]
    fn test_reoccurrence_requires_same_subtree() {
        let rule = rule(
            r#"
name: SelfCompare
params: [{name: x, type: int}]
before: ["x == x"]
after: "true"
"#,
        );
        assert!(matches(&rule, "n == n").is_some());
        assert!(matches(&rule, "n == (n)").is_some());
        assert!(matches(&rule, "n == 1").is_none());
    }

    #[test]
    fn test_first_alternative_wins() {
        let rule = rule(
            r#"
name: MapIsEmpty
type_params: [K, V]
params: [{name: map, type: "Map<K, V>"}]
before:
  - map.size() == 0
  - map.keySet().isEmpty()
after: map.isEmpty()
"#,
        );
        let unit = CompilationUnit::parse(SOURCE).unwrap();
        let oracle = DeclaredTypeOracle::default();
        let unifier = Unifier::new(&rule, &oracle, &unit);
        let (index, _) = unifier.match_alternatives(&expr("map.keySet().isEmpty()")).unwrap();
        assert_eq!(index, 1);
        let (index, _) = unifier.match_alternatives(&expr("(map.size()) == 0")).unwrap();
        assert_eq!(index, 0);
    }

    #[test]
    fn test_repeated_binds_run() {
        let rule = rule(
            r#"
name: ListOf
type_params: [T]
params: [{name: items, type: "T...", repeated: true}]
before: ["Arrays.asList(items)"]
after: List.of(items)
"#,
        );
        let binding = matches(&rule, "Arrays.asList(\"a\", \"b\", \"c\")").unwrap();
        assert_eq!(binding.get("items").unwrap().exprs().len(), 3);
        let empty = matches(&rule, "Arrays.asList()").unwrap();
        assert!(empty.get("items").unwrap().exprs().is_empty());
    }

    #[test]
    fn test_negated_match() {
        let rule = rule(
            r#"
name: InstantIsBefore
params:
  - {name: a, type: Instant}
  - {name: b, type: Instant}
before: ["a.compareTo(b) < 0"]
after: a.isBefore(b)
also_negation: true
"#,
        );
        let unit = CompilationUnit::parse(SOURCE).unwrap();
        let oracle = DeclaredTypeOracle::default();
        let unifier = Unifier::new(&rule, &oracle, &unit);
        assert!(unifier.match_negated(&expr("!(a.compareTo(b) < 0)"), |_| true).is_some());
        assert!(unifier.match_negated(&expr("a.compareTo(b) >= 0"), |_| true).is_some());
        assert!(unifier.match_negated(&expr("a.compareTo(b) > 0"), |_| true).is_none());
    }

    #[test]
    fn test_flipped_comparison_needs_non_floating_operands() {
        let rule = rule(
            r#"
name: Less
params:
  - {name: x, type: double}
  - {name: y, type: double}
before: ["x < y"]
after: lessThan(x, y)
also_negation: true
"#,
        );
        let source = "class T { void t(double d, double e, int i, int j) { } }";
        let unit = CompilationUnit::parse(source).unwrap();
        let oracle = DeclaredTypeOracle::default();
        let unifier = Unifier::new(&rule, &oracle, &unit);

        assert!(unifier.match_negated(&expr("i >= j"), |_| true).is_some());
        // `d >= e` holds neither way for NaN, while `!(d < e)` does
        assert!(unifier.match_negated(&expr("d >= e"), |_| true).is_none());
        assert!(unifier.match_negated(&expr("!(d < e)"), |_| true).is_some());
    }

    #[test]
    fn test_lambda_params_match_up_to_renaming() {
        let rule = rule(
            r#"
name: StreamAnyMatchNot
type_params: [T]
params: [{name: list, type: "List<T>"}]
before: ["!list.stream().anyMatch(e -> e.isEmpty())"]
after: list.stream().allMatch(e -> !e.isEmpty())
"#,
        );
        let binding = matches(&rule, "!list.stream().anyMatch(s -> s.isEmpty())").unwrap();
        assert_eq!(binding.lambda_rename("e"), Some("s"));
        assert!(matches(&rule, "!list.stream().anyMatch(s -> other.isEmpty())").is_none());
    }

    #[test]
    fn test_placeholder_captures_body() {
        let rule = rule(
            r#"
name: OptionalMapOrElse
type_params: [T, R]
params:
  - {name: optional, type: "Optional<T>"}
placeholders:
  - name: transform
    params: [{name: value}]
before: ["optional.isPresent() ? transform(optional.get()) : null"]
after: optional.map(v -> transform(v)).orElse(null)
"#,
        );
        let binding =
            matches(&rule, "optional.isPresent() ? optional.get().trim() : null").unwrap();
        let f = binding.placeholder("transform").unwrap();
        assert_eq!(f.call(&[expr("v")]).to_string(), "v.trim()");

        // the formal parameter must be used
        assert!(matches(&rule, "optional.isPresent() ? \"x\" : null").is_none());
    }

    #[test]
    fn test_scoped_lambda_params_are_not_bound() {
        let rule = rule(
            r#"
name: PrintEach
type_params: [T]
params:
  - {name: list, type: "List<T>"}
  - {name: x, type: Object}
before: ["list.forEach(e -> System.out.println(x))"]
after: System.out.println(x)
"#,
        );
        assert!(matches(&rule, "list.forEach(s -> System.out.println(list))").is_some());
        assert!(matches(&rule, "list.forEach(s -> System.out.println(s))").is_none());
    }

    #[test]
    fn test_receiverless_call_resolves_through_static_imports() {
        let rule = rule(
            r#"
name: AssertThatStringIsEmpty
params: [{name: s, type: String}]
before: ["assertThat(s.isEmpty()).isTrue()"]
after: assertThat(s).isEmpty()
imports: ["static org.assertj.core.api.Assertions.assertThat"]
"#,
        );
        let unit = |imports: &str| format!("{imports}\nclass T {{ void t(String s) {{ }} }}");
        let target = "assertThat(s.isEmpty()).isTrue()";

        assert!(matches_in(&rule, &unit(""), target).is_some());
        assert!(matches_in(
            &rule,
            &unit("import static org.assertj.core.api.Assertions.assertThat;"),
            target
        )
        .is_some());
        assert!(matches_in(&rule, &unit("import static org.assertj.core.api.Assertions.*;"), target).is_some());

        // Truth's assertThat reads the same but is another method
        assert!(matches_in(
            &rule,
            &unit("import static com.google.common.truth.Truth.assertThat;"),
            target
        )
        .is_none());
        assert!(matches_in(&rule, &unit("import static com.google.common.truth.Truth.*;"), target).is_none());
        assert!(matches_in(
            &rule,
            &unit("import static com.google.common.truth.Truth.*;\nimport static org.assertj.core.api.Assertions.*;"),
            target
        )
        .is_some());

        // a qualified call must name the same class
        assert!(matches_in(
            &rule,
            &unit("import org.assertj.core.api.Assertions;"),
            "Assertions.assertThat(s.isEmpty()).isTrue()"
        )
        .is_some());
        assert!(matches_in(
            &rule,
            &unit("import com.example.Assertions;"),
            "Assertions.assertThat(s.isEmpty()).isTrue()"
        )
        .is_none());
    }

    #[test]
    fn test_class_name_resolves_to_its_package() {
        let rule = rule(
            r#"
name: ListOf
type_params: [T]
params: [{name: items, type: "T...", repeated: true}]
before: ["Arrays.asList(items)"]
after: List.of(items)
"#,
        );
        let unit = |header: &str| format!("{header}\nclass T {{ void t(String a) {{ }} }}");
        let target = "Arrays.asList(a, a)";

        assert!(matches_in(&rule, &unit("import java.util.Arrays;"), target).is_some());
        assert!(matches_in(&rule, &unit("import java.util.*;"), target).is_some());
        assert!(matches_in(&rule, &unit("import com.example.Arrays;"), target).is_none());
        assert!(matches_in(&rule, &unit("class Arrays {}"), target).is_none());

        assert!(matches_in(&rule, &unit(""), "java.util.Arrays.asList(a)").is_some());
        assert!(matches_in(&rule, &unit(""), "com.example.Arrays.asList(a)").is_none());

        // a static import of the member stands in for the qualifier
        assert!(matches_in(&rule, &unit("import static java.util.Arrays.asList;"), "asList(a)").is_some());
        assert!(matches_in(&rule, &unit("import static java.util.Arrays.*;"), "asList(a)").is_some());
        assert!(matches_in(&rule, &unit("import static com.example.Arrays.asList;"), "asList(a)").is_none());
    }
}
