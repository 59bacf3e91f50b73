//! Conditional inclusion over plugin descriptor text.
use std::collections::BTreeSet;

use crate::extensibility::error::{ExtensibilityError, Result};

pub trait Preprocessor: Send + Sync {
    /// Returns `text` with conditional sections resolved against `constants`.
    fn preprocess(&self, text: &str, constants: &BTreeSet<String>) -> Result<String>;
}

/// Line-oriented directives: `#if NAME`, `#if !NAME`, `#else` and `#endif`.
///
/// Blocks nest. Directive lines and excluded lines become blank lines so
/// parse errors still report the original line numbers.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectivePreprocessor;

struct Block {
    parent_active: bool,
    condition: bool,
    in_else: bool,
}

impl Block {
    fn active(&self) -> bool {
        self.parent_active && (self.condition != self.in_else)
    }
}

impl Preprocessor for DirectivePreprocessor {
    fn preprocess(&self, text: &str, constants: &BTreeSet<String>) -> Result<String> {
        let mut blocks: Vec<Block> = Vec::new();
        let mut output = String::with_capacity(text.len());

        for (index, line) in text.lines().enumerate() {
            let line_number = index + 1;
            let active = blocks.last().is_none_or(Block::active);
            let directive = line.trim();

            if let Some(condition) = directive.strip_prefix("#if ") {
                let condition = condition.trim();
                let (negated, name) = match condition.strip_prefix('!') {
                    Some(name) => (true, name.trim()),
                    None => (false, condition),
                };
                if name.is_empty() {
                    return Err(ExtensibilityError::Preprocessor {
                        line: line_number,
                        message: "Expected a constant name after '#if'.".into(),
                    });
                }
                blocks.push(Block {
                    parent_active: active,
                    condition: constants.contains(name) != negated,
                    in_else: false,
                });
            } else if directive == "#else" {
                match blocks.last_mut() {
                    Some(block) if !block.in_else => block.in_else = true,
                    _ => {
                        return Err(ExtensibilityError::Preprocessor {
                            line: line_number,
                            message: "Unexpected '#else'.".into(),
                        });
                    }
                }
            } else if directive == "#endif" {
                if blocks.pop().is_none() {
                    return Err(ExtensibilityError::Preprocessor {
                        line: line_number,
                        message: "Unexpected '#endif'.".into(),
                    });
                }
            } else if active {
                output.push_str(line);
            }
            output.push('\n');
        }

        if !blocks.is_empty() {
            return Err(ExtensibilityError::Preprocessor {
                line: text.lines().count(),
                message: format!("{} '#if' block(s) were not closed.", blocks.len()),
            });
        }
        Ok(output)
    }
}
