//! Static type information for matched expressions.
//!
//! The engine does not type-check Java. It asks a [`TypeOracle`] for the static
//! type of an expression and whether one type is assignable to another. The
//! bundled [`DeclaredTypeOracle`] answers from local declarations, literals and
//! a table of well-known library members, and reports `None` when it cannot
//! tell.

mod known;

use crate::ast::{BinaryOp, CompilationUnit, Expr, ExprKind, JavaType, UnaryOp, simple_name};
use std::collections::{HashMap, HashSet, VecDeque};

/// A subtype relation over simple type names.
#[derive(Debug, Clone, Default)]
pub struct TypeHierarchy {
    supertypes: HashMap<String, Vec<String>>,
}

impl TypeHierarchy {
    /// Creates an empty hierarchy; every type is only a subtype of itself and `Object`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a hierarchy seeded with common JDK, Guava and java.time types.
    pub fn jdk() -> Self {
        let mut hierarchy = Self::default();
        for (ty, supers) in known::SUPERTYPES {
            hierarchy.add(ty, supers.iter().copied());
        }
        hierarchy
    }

    /// Declares `supers` as direct supertypes of `ty`.
    pub fn add<'a>(&mut self, ty: &str, supers: impl IntoIterator<Item = &'a str>) {
        let entry = self
            .supertypes
            .entry(simple_name(ty).to_string())
            .or_default();
        for sup in supers {
            let sup = simple_name(sup).to_string();
            if !entry.contains(&sup) {
                entry.push(sup);
            }
        }
    }

    /// Returns true if `sub` is `sup` or one of its (transitive) subtypes.
    pub fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        let (sub, sup) = (simple_name(sub), simple_name(sup));
        sup == "Object" || self.ancestors(sub).iter().any(|a| a == sup)
    }

    /// Returns `ty` followed by all of its supertypes, breadth first.
    pub fn ancestors(&self, ty: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([simple_name(ty).to_string()]);
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next.clone()) {
                continue;
            }
            if let Some(supers) = self.supertypes.get(&next) {
                queue.extend(supers.iter().cloned());
            }
            order.push(next);
        }
        order
    }

    /// Distance from `Object`; deeper types are narrower.
    pub fn depth(&self, ty: &str) -> usize {
        self.depth_inner(simple_name(ty), &mut HashSet::new())
    }

    fn depth_inner(&self, ty: &str, visiting: &mut HashSet<String>) -> usize {
        if ty == "Object" || !visiting.insert(ty.to_string()) {
            return 0;
        }
        let depth = match self.supertypes.get(ty) {
            Some(supers) if !supers.is_empty() => {
                1 + supers
                    .iter()
                    .map(|s| self.depth_inner(s, visiting))
                    .max()
                    .unwrap_or(0)
            }
            _ => 1,
        };
        visiting.remove(ty);
        depth
    }
}

/// Answers static-type questions about target expressions.
pub trait TypeOracle: Send + Sync {
    /// Returns the static type of `expr`, or `None` if it cannot be determined.
    fn static_type(&self, expr: &Expr, unit: &CompilationUnit) -> Option<JavaType>;

    /// Returns the subtype relation used by [`TypeOracle::is_assignable`].
    fn hierarchy(&self) -> &TypeHierarchy;

    /// Whether expressions of unknown type satisfy concrete type bounds.
    fn accepts_unknown(&self) -> bool {
        false
    }

    /// Returns true if a value of type `from` may be assigned to `to`.
    fn is_assignable(&self, from: &JavaType, to: &JavaType) -> bool {
        assignable(self.hierarchy(), from, to)
    }
}

const WIDENING: &[(&str, &[&str])] = &[
    ("byte", &["short", "int", "long", "float", "double"]),
    ("short", &["int", "long", "float", "double"]),
    ("char", &["int", "long", "float", "double"]),
    ("int", &["long", "float", "double"]),
    ("long", &["float", "double"]),
    ("float", &["double"]),
];

fn widens(from: &str, to: &str) -> bool {
    from == to
        || WIDENING
            .iter()
            .any(|(f, targets)| *f == from && targets.contains(&to))
}

fn assignable(hierarchy: &TypeHierarchy, from: &JavaType, to: &JavaType) -> bool {
    if from.name == "void" || to.name == "void" {
        return false;
    }
    if from.name == "null" {
        return !to.is_primitive();
    }
    if to.dims == 0 && to.simple_name() == "Object" {
        return true;
    }

    match (from.is_primitive(), to.is_primitive()) {
        (true, true) => return widens(&from.name, &to.name),
        (true, false) => {
            return from
                .boxed()
                .is_some_and(|boxed| assignable(hierarchy, &JavaType::named(boxed), to));
        }
        (false, true) => {
            return from.unboxed().is_some_and(|prim| widens(prim, &to.name));
        }
        (false, false) => {}
    }

    if from.dims != to.dims {
        // any array is an Object[] of lower rank when its elements are references
        return from.dims > to.dims
            && to.simple_name() == "Object"
            && to.args.is_empty();
    }
    if from.dims > 0 && (from.base().is_primitive() || to.base().is_primitive()) {
        return from.name == to.name;
    }

    if !hierarchy.is_subtype(&from.name, &to.name) {
        return false;
    }
    let raw = |t: &JavaType| t.args.is_empty() || t.is_diamond();
    if raw(from) || raw(to) || from.simple_name() != to.simple_name() {
        return true;
    }
    from.args.len() == to.args.len()
        && from
            .args
            .iter()
            .zip(&to.args)
            .all(|(f, t)| t.is_wildcard() || f.is_wildcard() || same_type(f, t))
}

/// The fully qualified name of a well-known library class.
pub fn known_class(simple: &str) -> Option<String> {
    known::PACKAGES
        .iter()
        .find(|(_, types)| types.contains(&simple))
        .map(|(package, _)| format!("{package}.{simple}"))
}

/// Type equality up to name qualification.
pub fn same_type(a: &JavaType, b: &JavaType) -> bool {
    a.simple_name() == b.simple_name()
        && a.dims == b.dims
        && a.args.len() == b.args.len()
        && a.args.iter().zip(&b.args).all(|(x, y)| same_type(x, y))
}

/// A [`TypeOracle`] backed by source declarations and a table of library members.
#[derive(Debug, Clone)]
pub struct DeclaredTypeOracle {
    hierarchy: TypeHierarchy,
    lenient: bool,
}

impl Default for DeclaredTypeOracle {
    fn default() -> Self {
        Self::new(TypeHierarchy::jdk())
    }
}

impl DeclaredTypeOracle {
    pub fn new(hierarchy: TypeHierarchy) -> Self {
        Self {
            hierarchy,
            lenient: false,
        }
    }

    /// Lets expressions of unknown type satisfy any type bound.
    pub fn lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    fn name_type(&self, name: &str, at: usize, unit: &CompilationUnit) -> Option<JavaType> {
        let decl = unit.declaration(name, at)?;
        match (&decl.ty, &decl.init) {
            (Some(ty), _) => Some(ty.clone()),
            (None, Some(init)) if !init.mentions_name(name) => self.static_type(init, unit),
            _ => None,
        }
    }

    /// Returns the class named by `expr` when it is used as a static qualifier.
    fn static_owner(&self, expr: &Expr, unit: &CompilationUnit) -> Option<String> {
        let qualified = expr.qualified_name()?;
        let simple = simple_name(&qualified);
        let at = expr.span.map(|s| s.start).unwrap_or(0);
        let is_type = simple.starts_with(|c: char| c.is_ascii_uppercase())
            && unit.declaration(simple, at).is_none();
        is_type.then(|| simple.to_string())
    }

    fn call_type(
        &self,
        receiver: Option<&Expr>,
        name: &str,
        args: &[Expr],
        unit: &CompilationUnit,
    ) -> Option<JavaType> {
        let owner = match receiver {
            Some(receiver) => self.static_owner(receiver, unit),
            None => unit
                .imports()
                .iter()
                .find(|i| i.is_static && !i.wildcard && simple_name(&i.path) == name)
                .and_then(|i| i.path.rsplit_once('.'))
                .map(|(owner, _)| simple_name(owner).to_string()),
        };

        if let Some(owner) = owner {
            let (_, _, ret) = known::STATIC_METHODS
                .iter()
                .find(|(o, m, _)| *o == owner && *m == name)?;
            if *ret == "$0" {
                return self.static_type(args.first()?, unit);
            }
            return JavaType::parse(ret);
        }

        let receiver_type = self.static_type(receiver?, unit)?;
        self.instance_method_type(&receiver_type, name)
    }

    fn instance_method_type(&self, receiver: &JavaType, name: &str) -> Option<JavaType> {
        if receiver.is_primitive() {
            return None;
        }
        if receiver.is_array() {
            return (name == "clone").then(|| receiver.clone());
        }
        let mut ancestors = self.hierarchy.ancestors(receiver.simple_name());
        ancestors.push("Object".to_string());
        for ancestor in &ancestors {
            let found = known::INSTANCE_METHODS.iter().find(|(owner, method, _)| {
                *method == name && simple_name(owner.split('<').next().unwrap_or(owner)) == ancestor
            });
            if let Some((owner, _, ret)) = found {
                let owner = JavaType::parse(owner)?;
                let ret = JavaType::parse(ret)?;
                return Some(bind_type_params(&ret, &owner, receiver));
            }
        }
        None
    }
}

/// Replaces the owner's type parameters in `ty` by the receiver's type arguments.
fn bind_type_params(ty: &JavaType, owner: &JavaType, receiver: &JavaType) -> JavaType {
    if let Some(pos) = owner.args.iter().position(|p| p.name == ty.name) {
        return match receiver.args.get(pos) {
            Some(actual) if !actual.is_wildcard() && owner.args.len() == receiver.args.len() => {
                actual.clone().with_dims(ty.dims)
            }
            _ => JavaType::named("Object").with_dims(ty.dims),
        };
    }
    JavaType {
        name: ty.name.clone(),
        args: ty
            .args
            .iter()
            .map(|a| bind_type_params(a, owner, receiver))
            .collect(),
        dims: ty.dims,
    }
}

fn numeric_promotion(a: &JavaType, b: &JavaType) -> Option<JavaType> {
    let unbox = |t: &JavaType| -> Option<String> {
        if t.is_primitive() {
            Some(t.name.clone())
        } else {
            t.unboxed().map(str::to_string)
        }
    };
    let (a, b) = (unbox(a)?, unbox(b)?);
    if a == "boolean" || b == "boolean" {
        return (a == b).then(|| JavaType::named("boolean"));
    }
    let result = ["double", "float", "long"]
        .into_iter()
        .find(|wide| a == *wide || b == *wide)
        .unwrap_or("int");
    Some(JavaType::named(result))
}

impl TypeOracle for DeclaredTypeOracle {
    fn static_type(&self, expr: &Expr, unit: &CompilationUnit) -> Option<JavaType> {
        let expr = expr.strip_parens();
        let at = expr.span.map(|s| s.start).unwrap_or(0);
        match &expr.kind {
            ExprKind::Literal(lit) => Some(lit.java_type()),
            ExprKind::Name(name) => self.name_type(name, at, unit),
            ExprKind::New { ty, .. } if ty.is_diamond() => Some(ty.erased()),
            ExprKind::Cast { ty, .. } | ExprKind::New { ty, .. } | ExprKind::NewArray { ty, .. } => {
                Some(ty.clone())
            }
            ExprKind::InstanceOf { .. } => Some(JavaType::named("boolean")),
            ExprKind::ClassLit(ty) => {
                let arg = ty.boxed().map(JavaType::named).unwrap_or_else(|| ty.clone());
                Some(JavaType::generic("Class", vec![arg]))
            }
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Not => Some(JavaType::named("boolean")),
                _ => {
                    let ty = self.static_type(operand, unit)?;
                    numeric_promotion(&ty, &ty)
                }
            },
            ExprKind::Binary { op, lhs, rhs } => match op {
                BinaryOp::And | BinaryOp::Or => Some(JavaType::named("boolean")),
                op if op.is_comparison() => Some(JavaType::named("boolean")),
                _ => {
                    let (l, r) = (self.static_type(lhs, unit), self.static_type(rhs, unit));
                    let is_string = |t: &Option<JavaType>| {
                        t.as_ref().is_some_and(|t| t.dims == 0 && t.simple_name() == "String")
                    };
                    if *op == BinaryOp::Add && (is_string(&l) || is_string(&r)) {
                        return Some(JavaType::named("String"));
                    }
                    let promoted = numeric_promotion(&l?, &r?)?;
                    // shifts take the type of the left operand
                    match op {
                        BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => {
                            numeric_promotion(&promoted, &JavaType::named("int"))
                        }
                        _ => Some(promoted),
                    }
                }
            },
            ExprKind::Ternary {
                then, otherwise, ..
            } => {
                let (t, o) = (self.static_type(then, unit), self.static_type(otherwise, unit));
                match (t, o) {
                    (Some(t), Some(o)) if same_type(&t, &o) => Some(t),
                    (Some(t), Some(o)) if o.name == "null" => Some(t),
                    (Some(t), Some(o)) if t.name == "null" => Some(o),
                    (Some(t), Some(o)) => numeric_promotion(&t, &o),
                    _ => None,
                }
            }
            ExprKind::ArrayAccess { array, .. } => self.static_type(array, unit)?.element(),
            ExprKind::FieldAccess { target, field } => {
                if let Some(owner) = self.static_owner(target, unit) {
                    let (_, _, ty) = known::STATIC_FIELDS
                        .iter()
                        .find(|(o, f, _)| *o == owner && f == field)?;
                    return JavaType::parse(ty);
                }
                let target_type = self.static_type(target, unit)?;
                (target_type.is_array() && field == "length").then(|| JavaType::named("int"))
            }
            ExprKind::Call {
                receiver,
                name,
                args,
                ..
            } => self.call_type(receiver.as_deref(), name, args, unit),
            ExprKind::This
            | ExprKind::Lambda { .. }
            | ExprKind::MethodRef { .. }
            | ExprKind::Opaque(_)
            | ExprKind::Paren(_) => None,
        }
    }

    fn hierarchy(&self) -> &TypeHierarchy {
        &self.hierarchy
    }

    fn accepts_unknown(&self) -> bool {
        self.lenient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
import java.util.*;
import java.time.Instant;

class A {
    void run(Optional<String> value, List<Integer> list, Map<String, Long> counts, int[] data) {
        Instant a = Instant.now();
        var b = a;
        String text = "x";
    }
}
"#;

    fn type_of(oracle: &DeclaredTypeOracle, unit: &CompilationUnit, text: &str) -> Option<String> {
        let expr = crate::ast::parse_expression(text).unwrap();
        oracle.static_type(&expr, unit).map(|t| t.to_string())
    }

    #[test]
    fn test_hierarchy() {
        let hierarchy = TypeHierarchy::jdk();
        assert!(hierarchy.is_subtype("ArrayList", "Collection"));
        assert!(hierarchy.is_subtype("java.util.ArrayList", "Iterable"));
        assert!(hierarchy.is_subtype("Instant", "Comparable"));
        assert!(!hierarchy.is_subtype("List", "Set"));
        assert!(hierarchy.depth("ArrayList") > hierarchy.depth("Collection"));
        assert_eq!(hierarchy.depth("Object"), 0);
    }

    #[test]
    fn test_assignability() {
        let oracle = DeclaredTypeOracle::default();
        let ty = |s: &str| JavaType::parse(s).unwrap();
        assert!(oracle.is_assignable(&ty("int"), &ty("long")));
        assert!(!oracle.is_assignable(&ty("long"), &ty("int")));
        assert!(oracle.is_assignable(&ty("int"), &ty("Integer")));
        assert!(oracle.is_assignable(&ty("int"), &ty("Comparable")));
        assert!(oracle.is_assignable(&ty("Integer"), &ty("long")));
        assert!(oracle.is_assignable(&ty("ArrayList<String>"), &ty("List<String>")));
        assert!(oracle.is_assignable(&ty("List<String>"), &ty("Collection<?>")));
        assert!(!oracle.is_assignable(&ty("List<String>"), &ty("List<Integer>")));
        assert!(oracle.is_assignable(&ty("String[]"), &ty("Object")));
        assert!(!oracle.is_assignable(&ty("int[]"), &ty("long[]")));
        assert!(oracle.is_assignable(&JavaType::named("null"), &ty("String")));
    }

    #[test]
    fn test_static_types() {
        let unit = CompilationUnit::parse(SOURCE).unwrap();
        let oracle = DeclaredTypeOracle::default();
        assert_eq!(type_of(&oracle, &unit, "value").as_deref(), Some("Optional<String>"));
        assert_eq!(type_of(&oracle, &unit, "value.isPresent()").as_deref(), Some("boolean"));
        assert_eq!(type_of(&oracle, &unit, "value.get()").as_deref(), Some("String"));
        assert_eq!(type_of(&oracle, &unit, "list.get(0)").as_deref(), Some("Integer"));
        assert_eq!(type_of(&oracle, &unit, "list.size() + 1L").as_deref(), Some("long"));
        assert_eq!(type_of(&oracle, &unit, "counts.get(text)").as_deref(), Some("Long"));
        assert_eq!(type_of(&oracle, &unit, "b").as_deref(), Some("Instant"));
        assert_eq!(type_of(&oracle, &unit, "a.compareTo(b) < 0").as_deref(), Some("boolean"));
        assert_eq!(type_of(&oracle, &unit, "data.length").as_deref(), Some("int"));
        assert_eq!(type_of(&oracle, &unit, "data[0]").as_deref(), Some("int"));
        assert_eq!(type_of(&oracle, &unit, "text + 1").as_deref(), Some("String"));
        assert_eq!(type_of(&oracle, &unit, "Collections.EMPTY_LIST").as_deref(), Some("List"));
        assert!(type_of(&oracle, &unit, "unknown.call()").is_none());
    }
}
