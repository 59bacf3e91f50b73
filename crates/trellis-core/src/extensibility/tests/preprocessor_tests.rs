#![cfg(test)]

use std::collections::BTreeSet;

use crate::extensibility::error::ExtensibilityError;
use crate::extensibility::preprocessor::{DirectivePreprocessor, Preprocessor};

fn constants(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn lines(text: &str) -> Vec<&str> {
    text.lines().collect()
}

#[test]
fn test_text_without_directives_is_unchanged() {
    let output = DirectivePreprocessor.preprocess("a\nb\n", &constants(&[])).unwrap();
    assert_eq!(output, "a\nb\n");
}

#[test]
fn test_if_includes_only_when_defined() {
    let text = "start\n#if FEATURE\nfeature\n#endif\nend";

    let with = DirectivePreprocessor.preprocess(text, &constants(&["FEATURE"])).unwrap();
    assert_eq!(lines(&with), vec!["start", "", "feature", "", "end"]);

    let without = DirectivePreprocessor.preprocess(text, &constants(&[])).unwrap();
    assert_eq!(lines(&without), vec!["start", "", "", "", "end"]);
}

#[test]
fn test_negated_condition_and_else() {
    let text = "#if !DEBUG\nrelease\n#else\ndebug\n#endif";

    let release = DirectivePreprocessor.preprocess(text, &constants(&[])).unwrap();
    assert_eq!(lines(&release), vec!["", "release", "", "", ""]);

    let debug = DirectivePreprocessor.preprocess(text, &constants(&["DEBUG"])).unwrap();
    assert_eq!(lines(&debug), vec!["", "", "", "debug", ""]);
}

#[test]
fn test_nested_blocks() {
    let text = "#if A\n#if B\nab\n#else\na\n#endif\n#else\nnone\n#endif";

    let a_only = DirectivePreprocessor.preprocess(text, &constants(&["A"])).unwrap();
    let kept: Vec<&str> = a_only.lines().filter(|line| !line.is_empty()).collect();
    assert_eq!(kept, vec!["a"]);

    let neither = DirectivePreprocessor.preprocess(text, &constants(&["B"])).unwrap();
    let kept: Vec<&str> = neither.lines().filter(|line| !line.is_empty()).collect();
    assert_eq!(kept, vec!["none"]);
}

#[test]
fn test_unbalanced_directives_are_errors() {
    let empty = constants(&[]);

    let error = DirectivePreprocessor.preprocess("#endif", &empty).unwrap_err();
    assert!(matches!(error, ExtensibilityError::Preprocessor { line: 1, .. }));

    let error = DirectivePreprocessor.preprocess("x\n#else", &empty).unwrap_err();
    assert!(matches!(error, ExtensibilityError::Preprocessor { line: 2, .. }));

    let error = DirectivePreprocessor.preprocess("#if A\n#else\n#else\n#endif", &empty).unwrap_err();
    assert!(matches!(error, ExtensibilityError::Preprocessor { line: 3, .. }));

    assert!(DirectivePreprocessor.preprocess("#if A\nx", &empty).is_err());
    assert!(DirectivePreprocessor.preprocess("#if !\n#endif", &empty).is_err());
}
