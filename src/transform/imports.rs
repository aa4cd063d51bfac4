//! Import bookkeeping for instantiated replacements.

use crate::ast::{CompilationUnit, Expr, ExprKind, JavaType, simple_name};
use crate::rule::{Import, ImportPolicy, Rule};
use std::collections::BTreeSet;

/// Works out the imports a replacement needs under the rule's import policy.
///
/// Returns the (possibly qualified) replacement and the imports to add. Only
/// nodes generated from the after-template are considered; bound subtrees
/// already resolve in the user's code.
pub fn plan_imports(rule: &Rule, unit: &CompilationUnit, expr: Expr) -> (Expr, Vec<Import>) {
    let mut required = Vec::new();
    let mut expr = expr;

    for import in &rule.imports {
        let simple = import.simple_name().to_string();
        if import.is_static {
            if !uses_static_member(&expr, &simple) || unit.imports_name(&import.path, true) {
                continue;
            }
            let clash = unit.imports().iter().any(|i| {
                i.is_static && !i.wildcard && i.simple_name() == Some(simple.as_str()) && i.path != import.path
            });
            if rule.import_policy == ImportPolicy::StaticImportAlways && !clash {
                push_unique(&mut required, import.clone());
                continue;
            }
            let Some(owner) = import.owner() else {
                continue;
            };
            let owner = Import {
                path: owner.to_string(),
                is_static: false,
            };
            let qualifier = type_reference(unit, &owner, &mut required);
            expr = map_synthetic(&expr, &mut |kind| match kind {
                ExprKind::Call {
                    receiver: None,
                    type_args,
                    name,
                    args,
                } if name == simple => ExprKind::Call {
                    receiver: Some(Box::new(Expr::name(qualifier.clone()))),
                    type_args,
                    name,
                    args,
                },
                ExprKind::Name(name) if name == simple => ExprKind::FieldAccess {
                    target: Box::new(Expr::name(qualifier.clone())),
                    field: name,
                },
                other => other,
            });
        } else {
            if !uses_type(&expr, &simple) {
                continue;
            }
            let reference = type_reference(unit, import, &mut required);
            if reference != simple {
                expr = map_synthetic(&expr, &mut |kind| qualify_type(kind, &simple, &reference));
            }
        }
    }
    (expr, required)
}

/// Imports of `unit` that only the matched code referred to.
///
/// These are candidates for removal; whether the rest of the file still uses
/// them is checked after all replacements are spliced in.
pub fn removable_imports(unit: &CompilationUnit, matched: &Expr, replacement: &Expr) -> Vec<Import> {
    let before = referenced_names(matched);
    let after = referenced_names(replacement);
    unit.imports()
        .iter()
        .filter_map(|decl| {
            let simple = decl.simple_name()?;
            (before.contains(simple) && !after.contains(simple)).then(|| Import {
                path: decl.path.clone(),
                is_static: decl.is_static,
            })
        })
        .collect()
}

/// The text to refer to `import` by, adding the import when the simple name is free.
fn type_reference(unit: &CompilationUnit, import: &Import, required: &mut Vec<Import>) -> String {
    let simple = import.simple_name();
    if unit.imports_name(&import.path, false) {
        return simple.to_string();
    }
    let taken = unit
        .import_of(simple, false)
        .is_some_and(|other| other.path != import.path)
        || unit.declares_type(simple)
        || unit.is_type_variable(simple)
        || required
            .iter()
            .any(|r| !r.is_static && r.simple_name() == simple && r.path != import.path);
    if taken {
        import.path.clone()
    } else {
        push_unique(required, import.clone());
        simple.to_string()
    }
}

fn push_unique(imports: &mut Vec<Import>, import: Import) {
    if !imports.contains(&import) {
        imports.push(import);
    }
}

/// Rebuilds the synthetic part of `expr` bottom-up through `f`; spanned subtrees are kept.
fn map_synthetic(expr: &Expr, f: &mut dyn FnMut(ExprKind) -> ExprKind) -> Expr {
    if expr.span.is_some() {
        return expr.clone();
    }
    let kind = expr.kind.map_children(&mut |child| map_synthetic(child, f));
    Expr::synthetic(f(kind))
}

fn qualify_type(kind: ExprKind, simple: &str, qualified: &str) -> ExprKind {
    let rename = |ty: JavaType| rename_type(ty, simple, qualified);
    match kind {
        ExprKind::Name(name) if name == simple => ExprKind::Name(qualified.to_string()),
        ExprKind::New { ty, args } => ExprKind::New {
            ty: rename(ty),
            args,
        },
        ExprKind::NewArray { ty, dims, init } => ExprKind::NewArray {
            ty: rename(ty),
            dims,
            init,
        },
        ExprKind::Cast { ty, expr } => ExprKind::Cast {
            ty: rename(ty),
            expr,
        },
        ExprKind::InstanceOf { expr, ty } => ExprKind::InstanceOf {
            expr,
            ty: rename(ty),
        },
        ExprKind::ClassLit(ty) => ExprKind::ClassLit(rename(ty)),
        ExprKind::Call {
            receiver,
            type_args,
            name,
            args,
        } => ExprKind::Call {
            receiver,
            type_args: type_args.into_iter().map(rename).collect(),
            name,
            args,
        },
        other => other,
    }
}

fn rename_type(ty: JavaType, simple: &str, qualified: &str) -> JavaType {
    JavaType {
        name: if ty.name == simple {
            qualified.to_string()
        } else {
            ty.name
        },
        args: ty
            .args
            .into_iter()
            .map(|a| rename_type(a, simple, qualified))
            .collect(),
        dims: ty.dims,
    }
}

fn uses_static_member(expr: &Expr, member: &str) -> bool {
    let mut found = false;
    expr.visit(&mut |e| {
        if e.span.is_some() {
            return;
        }
        found |= match &e.kind {
            ExprKind::Call {
                receiver: None,
                name,
                ..
            } => name == member,
            ExprKind::Name(name) => name == member,
            _ => false,
        };
    });
    found
}

fn uses_type(expr: &Expr, simple: &str) -> bool {
    let mut found = false;
    expr.visit(&mut |e| {
        if e.span.is_none() {
            found |= node_names(e).contains(simple);
        }
    });
    found
}

/// Simple names one node refers to directly: variables, static members and types.
fn node_names(expr: &Expr) -> BTreeSet<String> {
    fn add_type(ty: &JavaType, names: &mut BTreeSet<String>) {
        if !ty.name.is_empty() {
            names.insert(ty.name.split('.').next().unwrap_or(&ty.name).to_string());
            names.insert(simple_name(&ty.name).to_string());
        }
        for arg in &ty.args {
            add_type(arg, names);
        }
    }

    let mut names = BTreeSet::new();
    match &expr.kind {
        ExprKind::Name(name) => {
            // the first segment of a qualified name, or the name itself
            names.insert(name.split('.').next().unwrap_or(name).to_string());
        }
        ExprKind::Call {
            receiver,
            type_args,
            name,
            ..
        } => {
            if receiver.is_none() {
                names.insert(name.clone());
            }
            for ty in type_args {
                add_type(ty, &mut names);
            }
        }
        ExprKind::New { ty, .. }
        | ExprKind::NewArray { ty, .. }
        | ExprKind::Cast { ty, .. }
        | ExprKind::InstanceOf { ty, .. }
        | ExprKind::ClassLit(ty) => add_type(ty, &mut names),
        _ => {}
    }
    names
}

fn referenced_names(expr: &Expr) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    expr.visit(&mut |e| names.extend(node_names(e)));
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::GuardRegistry;
    use crate::rule::RuleSpec;
    use crate::template::compile_rule;
    use crate::types::TypeHierarchy;

    fn rule(yaml: &str) -> Rule {
        let spec: RuleSpec = serde_yaml::from_str(yaml).unwrap();
        compile_rule(&spec, "Test", 0, &GuardRegistry::builtin(), &TypeHierarchy::jdk()).unwrap()
    }

    fn plan(rule: &Rule, source: &str) -> (String, Vec<String>) {
        let unit = CompilationUnit::parse(source).unwrap();
        let (expr, imports) = plan_imports(rule, &unit, rule.after.skeleton());
        (expr.to_string(), imports.iter().map(|i| i.to_string()).collect())
    }

    const STATIC_RULE: &str = r#"
name: AssertThatIsPresent
params: [{name: o, type: Object}]
before: ["Assertions.assertThat(o.isPresent()).isTrue()"]
after: assertThat(o).isPresent()
imports: ["static org.assertj.core.api.Assertions.assertThat"]
import_policy: static_import_always
"#;

    #[test]
    fn test_static_import_always() {
        let rule = rule(STATIC_RULE);
        let (text, imports) = plan(&rule, "class T {}");
        assert_eq!(text, "assertThat(o).isPresent()");
        assert_eq!(
            imports,
            vec!["import static org.assertj.core.api.Assertions.assertThat;"]
        );

        let (_, imports) = plan(
            &rule,
            "import static org.assertj.core.api.Assertions.*;\nclass T {}",
        );
        assert!(imports.is_empty());
    }

    #[test]
    fn test_static_clash_qualifies_through_owner() {
        let rule = rule(STATIC_RULE);
        let (text, imports) = plan(
            &rule,
            "import static org.hamcrest.MatcherAssert.assertThat;\nclass T {}",
        );
        assert_eq!(text, "Assertions.assertThat(o).isPresent()");
        assert_eq!(imports, vec!["import org.assertj.core.api.Assertions;"]);
    }

    #[test]
    fn test_import_if_unambiguous() {
        let rule = rule(
            r#"
name: NewList
before: ["new LinkedList<>()"]
after: new ArrayList<>()
imports: ["java.util.ArrayList"]
"#,
        );
        let (text, imports) = plan(&rule, "class T {}");
        assert_eq!(text, "new ArrayList<>()");
        assert_eq!(imports, vec!["import java.util.ArrayList;"]);

        let (text, imports) = plan(&rule, "import com.example.ArrayList;\nclass T {}");
        assert_eq!(text, "new java.util.ArrayList<>()");
        assert!(imports.is_empty());

        let (_, imports) = plan(&rule, "import java.util.*;\nclass T {}");
        assert!(imports.is_empty());
    }

    #[test]
    fn test_removable_imports() {
        let source = "import java.util.Collections;\nimport java.util.List;\nclass T {}";
        let unit = CompilationUnit::parse(source).unwrap();
        let matched = crate::ast::parse_expression("Collections.emptyList()").unwrap();
        let replacement = crate::ast::parse_expression("List.of()").unwrap();
        let removable = removable_imports(&unit, &matched, &replacement);
        assert_eq!(removable.len(), 1);
        assert_eq!(removable[0].path, "java.util.Collections");
    }
}
