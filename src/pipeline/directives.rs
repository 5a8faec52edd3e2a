//! Require directives
//!
//! A module declares what it depends on in a directive header: comment lines
//! at the top of the file, before the first line of code.
//!
//! ```text
//! //= require rake/tasks
//! //= require_tree ./views
//! /*= require core-test/runner */
//!  *= require ./reset
//! ```
//!
//! Directive lines are removed from the emitted body; everything else is
//! kept byte for byte.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// A single module
    Require(String),
    /// Every module under a directory, in sorted path order
    RequireTree(String),
}

/// A module split into its directives and the remaining body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSource {
    pub directives: Vec<Directive>,
    pub body: String,
}

pub fn parse(source: &str) -> ParsedSource {
    let mut directives = Vec::new();
    let mut body = String::with_capacity(source.len());
    let mut in_header = true;
    let mut in_block_comment = false;

    for line in source.split_inclusive('\n') {
        if in_header {
            let trimmed = line.trim();
            if let Some(directive) = parse_directive(trimmed) {
                directives.push(directive);
                if trimmed.starts_with("/*") && !trimmed.ends_with("*/") {
                    in_block_comment = true;
                }
                continue;
            }

            if in_block_comment {
                if trimmed.contains("*/") {
                    in_block_comment = false;
                }
            } else if trimmed.starts_with("/*") {
                in_block_comment = !trimmed.contains("*/");
            } else if !(trimmed.is_empty() || trimmed.starts_with("//")) {
                in_header = false;
            }
        }
        body.push_str(line);
    }

    ParsedSource { directives, body }
}

fn parse_directive(line: &str) -> Option<Directive> {
    let rest = line
        .strip_prefix("//=")
        .or_else(|| line.strip_prefix("/*="))
        .or_else(|| line.strip_prefix("*="))?;
    let rest = rest.trim().trim_end_matches("*/").trim();

    let (command, argument) = rest.split_once(char::is_whitespace)?;
    let argument = argument
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();
    if argument.is_empty() {
        return None;
    }

    match command {
        "require" => Some(Directive::Require(argument)),
        "require_tree" => Some(Directive::RequireTree(argument)),
        _ => None,
    }
}
