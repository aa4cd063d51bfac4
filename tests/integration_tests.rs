//! Integration tests for the rewrite engine and the bundled rules.

use refaster_dsl::prelude::*;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn engine() -> Engine {
    Engine::builder().strict(true).build().unwrap()
}

/// Wraps an expression in a method with well-typed locals.
fn subject(expr: &str) -> String {
    format!(
        "import java.time.Instant;\nimport java.util.*;\n\nclass Subject {{\n    Object run(List<String> list, Map<String, Integer> map, Optional<String> optional,\n               Collection<Integer> numbers, Instant start, Instant end, String name, String[] names) {{\n        return {expr};\n    }}\n}}\n"
    )
}

fn create_java_project(dir: &std::path::Path) {
    fs::create_dir_all(dir.join("src/main/java/com/example")).unwrap();
    fs::create_dir_all(dir.join("src/test/java/com/example")).unwrap();

    fs::write(
        dir.join("src/main/java/com/example/Names.java"),
        "package com.example;\n\nimport java.util.List;\n\nclass Names {\n    String first(List<String> names) {\n        return names.get(0);\n    }\n}\n",
    )
    .unwrap();
    fs::write(
        dir.join("src/test/java/com/example/NamesTest.java"),
        "package com.example;\n\nimport java.util.Optional;\n\nclass NamesTest {\n    void present(Optional<String> optional) {\n        assertThat(optional.isPresent()).isTrue();\n    }\n}\n",
    )
    .unwrap();
    fs::write(
        dir.join("src/main/java/com/example/Plain.java"),
        "package com.example;\n\nclass Plain {\n    int twice(int x) {\n        return x * 2;\n    }\n}\n",
    )
    .unwrap();
}

#[test]
fn test_bundled_rules_load_cleanly() {
    let engine = engine();
    assert!(engine.load_errors().is_empty());
    assert!(engine.repository().get("CollectionRules.ListGetFirst").is_some());
    assert!(engine.repository().get("AssertThatMapIsEmpty").is_some());
    assert_eq!(engine.documentation().len(), engine.rules().len());
}

/// One concrete instance per before-template: (rule, alternative, code, expected rewrite).
const INSTANCES: &[(&str, usize, &str, &str)] = &[
    (
        "AssertThatOptionalIsPresent",
        0,
        "assertThat(optional.isPresent()).isTrue()",
        "assertThat(optional).isPresent()",
    ),
    (
        "AssertThatOptionalIsPresent",
        1,
        "assertThat(optional.isEmpty()).isFalse()",
        "assertThat(optional).isPresent()",
    ),
    (
        "AssertThatOptionalIsEmpty",
        0,
        "assertThat(optional.isEmpty()).isTrue()",
        "assertThat(optional).isEmpty()",
    ),
    (
        "AssertThatOptionalIsEmpty",
        1,
        "assertThat(optional.isPresent()).isFalse()",
        "assertThat(optional).isEmpty()",
    ),
    ("AssertThatMapIsEmpty", 0, "assertThat(map).hasSize(0)", "assertThat(map).isEmpty()"),
    ("AssertThatMapIsEmpty", 1, "assertThat(map.isEmpty()).isTrue()", "assertThat(map).isEmpty()"),
    ("AssertThatMapIsEmpty", 2, "assertThat(map.size()).isEqualTo(0)", "assertThat(map).isEmpty()"),
    (
        "AssertThatMapContainsKey",
        0,
        "assertThat(map.containsKey(name)).isTrue()",
        "assertThat(map).containsKey(name)",
    ),
    (
        "AssertThatMapContainsKey",
        1,
        "assertThat(map.keySet()).contains(name)",
        "assertThat(map).containsKey(name)",
    ),
    ("ListGetFirst", 0, "list.get(0)", "list.getFirst()"),
    ("CollectionIsEmpty", 0, "numbers.size() == 0", "numbers.isEmpty()"),
    ("ArraysAsListToListOf", 0, "Arrays.asList(\"a\", name)", "List.of(\"a\", name)"),
    ("InstantIsBefore", 0, "start.compareTo(end) < 0", "start.isBefore(end)"),
    ("InstantIsAfter", 0, "start.compareTo(end) > 0", "start.isAfter(end)"),
    (
        "OptionalMapOrElseNull",
        0,
        "optional.isPresent() ? optional.get().trim() : null",
        "optional.map(v -> v.trim()).orElse(null)",
    ),
    ("StringIsEmpty", 0, "name.length() == 0", "name.isEmpty()"),
];

#[test]
fn test_every_before_template_rewrites_to_a_fixpoint() {
    let engine = engine();
    for rule in engine.rules() {
        for index in 0..rule.before.len() {
            let Some((_, _, before, after)) = INSTANCES
                .iter()
                .find(|(name, i, ..)| *name == rule.name && *i == index)
            else {
                panic!("no instance for {} #{index}", rule.qualified_name());
            };

            let rewrite = engine.rewrite_source(&subject(before)).unwrap();
            assert_eq!(
                rewrite.replacements.first().map(|r| r.rule.clone()),
                Some(rule.qualified_name()),
                "{before} gave:\n{}",
                rewrite.source
            );
            assert!(
                rewrite.source.contains(&format!("return {after};")),
                "{before} gave:\n{}",
                rewrite.source
            );

            let again = engine.rewrite_source(&rewrite.source).unwrap();
            assert_eq!(again.passes, 0, "{} #{index} is not a fixpoint", rule.qualified_name());
            assert_eq!(again.source, rewrite.source);
        }
    }
}

#[test]
fn test_rewritten_output_is_a_fixpoint() {
    let engine = engine();
    for before in [
        "list.get(0)",
        "numbers.size() != 0",
        "!(start.compareTo(end) < 0)",
        "assertThat(map).hasSize(0)",
    ] {
        let first = engine.rewrite_source(&subject(before)).unwrap();
        assert!(first.is_modified(), "{before} was not rewritten");

        let second = engine.rewrite_source(&first.source).unwrap();
        assert_eq!(second.source, first.source);
        assert_eq!(second.passes, 0);
    }
}

#[test]
fn test_source_without_instances_is_untouched() {
    let source = subject("list.size() + map.size()");
    let rewrite = engine().rewrite_source(&source).unwrap();
    assert_eq!(rewrite.source, source);
    assert!(rewrite.replacements.is_empty());
}

#[test]
fn test_guard_rejects_array_argument() {
    let source = subject("Arrays.asList(names)");
    assert_eq!(engine().rewrite_source(&source).unwrap().source, source);
}

#[test]
fn test_alternatives_share_one_rewrite() {
    let engine = engine();
    for before in [
        "assertThat(map).hasSize(0)",
        "assertThat(map.isEmpty()).isTrue()",
        "assertThat(map.size()).isEqualTo(0)",
    ] {
        let rewrite = engine.rewrite_source(&subject(before)).unwrap();
        assert!(
            rewrite.source.contains("return assertThat(map).isEmpty();"),
            "{before} gave:\n{}",
            rewrite.source
        );
        assert_eq!(rewrite.replacements[0].rule, "AssertJMapRules.AssertThatMapIsEmpty");
    }
}

#[test]
fn test_repeated_parameter_needs_identical_subtrees() {
    let catalog = RuleCatalog::from_yaml(
        r#"
group: EqualityRules
rules:
  - name: SelfEquals
    params: [{name: s, type: String}]
    before: ["s.equals(s)"]
    after: "true"
"#,
    )
    .unwrap();
    let engine = Engine::builder()
        .without_builtin_rules()
        .catalog(catalog)
        .strict(true)
        .build()
        .unwrap();

    let same = engine.rewrite_source(&subject("name.equals(name)")).unwrap();
    assert!(same.source.contains("return true;"));

    let different = engine.rewrite_source(&subject("name.equals(list)")).unwrap();
    assert!(!different.is_modified());
}

#[test]
fn test_negation_is_propagated() {
    let engine = engine();

    let rewrite = engine.rewrite_source(&subject("!(start.compareTo(end) < 0)")).unwrap();
    assert!(rewrite.source.contains("return !start.isBefore(end);"), "{}", rewrite.source);

    let rewrite = engine.rewrite_source(&subject("start.compareTo(end) >= 0")).unwrap();
    assert!(rewrite.source.contains("return !start.isBefore(end);"), "{}", rewrite.source);
}

#[test]
fn test_assert_present_adds_static_import() {
    let source = "package com.example;\n\nimport java.util.Optional;\n\nclass NamesTest {\n    void present(Optional<String> optional) {\n        assertThat(optional.isPresent()).isTrue();\n    }\n}\n";
    let engine = engine();

    let rewrite = engine.rewrite_source(source).unwrap();
    assert!(rewrite.source.contains("assertThat(optional).isPresent();"));
    assert!(rewrite.source.contains(
        "import java.util.Optional;\nimport static org.assertj.core.api.Assertions.assertThat;\n"
    ));

    let again = engine.rewrite_source(&rewrite.source).unwrap();
    assert_eq!(again.source, rewrite.source);
}

#[test]
fn test_existing_static_import_is_kept() {
    let source = "import static org.assertj.core.api.Assertions.assertThat;\n\nimport java.util.Optional;\n\nclass T {\n    void t(Optional<String> o) {\n        assertThat(o.isPresent()).isFalse();\n    }\n}\n";
    let rewrite = engine().rewrite_source(source).unwrap();
    assert!(rewrite.source.contains("assertThat(o).isEmpty();"));
    assert_eq!(rewrite.source.matches("import static").count(), 1);
}

#[test]
fn test_other_libraries_assert_that_is_untouched() {
    let source = "import static com.google.common.truth.Truth.assertThat;\n\nimport java.util.Optional;\n\nclass T {\n    void t(Optional<String> o) {\n        assertThat(o.isPresent()).isTrue();\n    }\n}\n";
    let rewrite = engine().rewrite_source(source).unwrap();
    assert_eq!(rewrite.source, source);
    assert!(!rewrite.is_modified());
}

#[test]
fn test_same_named_user_class_is_untouched() {
    let source = "package com.example.app;\n\nimport com.example.Arrays;\n\nclass T {\n    Object t(String a) {\n        return Arrays.asList(a, a);\n    }\n}\n";
    let rewrite = engine().rewrite_source(source).unwrap();
    assert_eq!(rewrite.source, source);
    assert!(rewrite.source.contains("import com.example.Arrays;"));
}

#[test]
fn test_strict_build_rejects_overlapping_rules() {
    let catalog = RuleCatalog::from_yaml(
        r#"
group: Wrappers
rules:
  - name: UnwrapObject
    params: [{name: x, type: Object}]
    before: ["wrap(x)"]
    after: unwrapA(x)
  - name: UnwrapAny
    type_params: [T]
    params: [{name: x, type: T}]
    before: ["wrap(x)"]
    after: unwrapB(x)
"#,
    )
    .unwrap();

    let built = Engine::builder()
        .without_builtin_rules()
        .catalog(catalog.clone())
        .strict(true)
        .build();
    assert!(built.is_err());

    let lenient = Engine::builder()
        .without_builtin_rules()
        .catalog(catalog)
        .build()
        .unwrap();
    assert_eq!(lenient.rules().len(), 1);
    assert!(matches!(
        lenient.load_errors()[0],
        RuleDefinitionError::AmbiguousWith { .. }
    ));
}

#[test]
fn test_list_get_first() {
    let engine = engine();
    let rewrite = engine.rewrite_source(&subject("list.get(0)")).unwrap();
    assert!(rewrite.source.contains("return list.getFirst();"));
    assert_eq!(rewrite.replacements.len(), 1);
    assert!(rewrite.replacements[0].notes[0].contains("NoSuchElementException"));

    let again = engine.rewrite_source(&rewrite.source).unwrap();
    assert!(!again.is_modified());
}

#[test]
fn test_nested_rewrites_take_two_passes() {
    let rewrite = engine().rewrite_source(&subject("list.get(0).length() == 0")).unwrap();
    assert!(
        rewrite.source.contains("return list.getFirst().isEmpty();"),
        "{}",
        rewrite.source
    );
    assert_eq!(rewrite.passes, 2);
}

#[test]
fn test_suppressed_method_is_skipped() {
    let source = "import java.util.List;\n\nclass A {\n    @SuppressWarnings(\"CollectionRules\")\n    Object kept(List<String> list) {\n        return list.get(0);\n    }\n\n    Object changed(List<String> list) {\n        return list.get(0);\n    }\n}\n";
    let rewrite = engine().rewrite_source(source).unwrap();
    assert_eq!(rewrite.source.matches("list.get(0)").count(), 1);
    assert_eq!(rewrite.source.matches("list.getFirst()").count(), 1);
}

#[test]
fn test_config_disables_rules() {
    let config = EngineConfig {
        disabled_rules: vec!["ListGetFirst".to_string()],
        ..EngineConfig::default()
    };
    let engine = Engine::builder().config(config).build().unwrap();
    assert!(engine.repository().get("ListGetFirst").is_none());

    let source = subject("list.get(0)");
    assert_eq!(engine.rewrite_source(&source).unwrap().source, source);
}

#[test]
fn test_refactor_dry_run() {
    let dir = TempDir::new().unwrap();
    create_java_project(dir.path());

    let result = Refactor::in_repo(dir.path())
        .rules(Arc::new(engine()))
        .dry_run()
        .apply()
        .unwrap();

    assert_eq!(result.changes.len(), 3);
    assert_eq!(result.files_modified(), 2);
    assert_eq!(result.replacements().count(), 2);

    let diff = result.diff();
    assert!(diff.contains("-        return names.get(0);"));
    assert!(diff.contains("+        return names.getFirst();"));
    assert!(diff.contains("+import static org.assertj.core.api.Assertions.assertThat;"));

    // dry run leaves files alone
    let content =
        fs::read_to_string(dir.path().join("src/main/java/com/example/Names.java")).unwrap();
    assert!(content.contains("names.get(0)"));
}

#[test]
fn test_refactor_apply() {
    let dir = TempDir::new().unwrap();
    create_java_project(dir.path());

    let result = Refactor::in_repo(dir.path())
        .matching(|f| f.include("src/main/**"))
        .rules(Arc::new(engine()))
        .apply()
        .unwrap();

    assert_eq!(result.files_modified(), 1);
    let content =
        fs::read_to_string(dir.path().join("src/main/java/com/example/Names.java")).unwrap();
    assert!(content.contains("return names.getFirst();"));

    let untouched =
        fs::read_to_string(dir.path().join("src/test/java/com/example/NamesTest.java")).unwrap();
    assert!(untouched.contains("assertThat(optional.isPresent()).isTrue();"));
}

#[test]
fn test_refactor_with_extra_transform() {
    let dir = TempDir::new().unwrap();
    create_java_project(dir.path());

    struct TrimTrailing;

    impl Transform for TrimTrailing {
        fn apply(&self, source: &str, _path: &std::path::Path) -> Result<String> {
            Ok(source.trim_end().to_string() + "\n// reviewed\n")
        }

        fn describe(&self) -> String {
            "Mark reviewed".to_string()
        }
    }

    let result = Refactor::in_repo(dir.path())
        .matching(|f| f.name_matches(r"^Plain\.java$"))
        .transform(|t| t.custom(TrimTrailing))
        .dry_run()
        .apply()
        .unwrap();

    assert_eq!(result.changes.len(), 1);
    assert!(result.changes[0].transformed.ends_with("// reviewed\n"));
}

#[test]
fn test_no_files_matched() {
    let dir = TempDir::new().unwrap();
    let result = Refactor::in_repo(dir.path()).rules(Arc::new(engine())).apply();
    assert!(matches!(result, Err(RefasterError::NoFilesMatched)));
}

#[test]
fn test_rules_from_file() {
    let dir = TempDir::new().unwrap();
    let rules = dir.path().join("team.yaml");
    fs::write(
        &rules,
        r#"
group: TeamRules
rules:
  - name: StringValueOfToString
    params: [{name: s, type: String}]
    before: ["String.valueOf(s)"]
    after: s
"#,
    )
    .unwrap();

    let config = EngineConfig {
        builtin_rules: false,
        rule_files: vec![rules],
        ..EngineConfig::default()
    };
    let engine = Engine::builder().config(config).build().unwrap();
    assert_eq!(engine.rules().len(), 1);

    let rewrite = engine.rewrite_source(&subject("String.valueOf(name)")).unwrap();
    assert!(rewrite.source.contains("return name;"));
}
