//! Script splitting and statement tokenisation.
//!
//! Both passes are purely lexical: tokens come out without unescaping or
//! substitution, and their meaning is decided at evaluation time. Only the
//! ASCII delimiters `{}`, `[]`, `"` and the four whitespace characters are
//! significant, so byte scanning is safe on UTF-8 input.

use crate::error::{SzlError, SzlResult};

/// The comment prefix, valid at the first non-whitespace position of a line.
pub(crate) const COMMENT_PREFIX: u8 = b'#';

/// szl whitespace: space, tab, carriage return, newline.
#[inline]
pub(crate) fn is_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n')
}

/// Strips leading and trailing szl whitespace.
pub(crate) fn trim(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_ascii() && is_space(c as u8))
}

/// Splits script text into statements.
///
/// A statement ends at a newline that is outside all `{}`/`[]` nesting, or at
/// the end of input. Blank lines and whole-line comments are dropped. Nesting
/// still open at the end of input is an unbalance error.
pub(crate) fn split_statements(text: &str) -> SzlResult<Vec<&str>> {
    fn emit<'a>(line: &'a str, out: &mut Vec<&'a str>) {
        let trimmed = trim(line);
        if !trimmed.is_empty() && trimmed.as_bytes()[0] != COMMENT_PREFIX {
            out.push(line);
        }
    }

    let bytes = text.as_bytes();
    let mut statements = Vec::new();
    let mut braces = 0i64;
    let mut brackets = 0i64;
    let mut start = 0;

    for (i, &byte) in bytes.iter().enumerate() {
        match byte {
            b'{' => braces += 1,
            b'}' => braces -= 1,
            b'[' => brackets += 1,
            b']' => brackets -= 1,
            b'\n' if braces == 0 && brackets == 0 => {
                emit(&text[start..i], &mut statements);
                start = i + 1;
            }
            _ => {}
        }
    }
    if braces != 0 {
        return Err(SzlError::unbalanced_braces(text));
    }
    if brackets != 0 {
        return Err(SzlError::unbalanced_brackets(text));
    }
    emit(&text[start..], &mut statements);
    Ok(statements)
}

/// Splits one statement into tokens.
///
/// A token is a balanced `{…}` group, a balanced `[…]` group, a `"…"` quoted
/// string, or a bareword (a maximal run of non-whitespace bytes). Groups are
/// emitted including their outer delimiters. Delimiters are only recognised
/// at the start of a token; inside a group only the group's own pair counts.
pub(crate) fn split_tokens(statement: &str) -> SzlResult<Vec<&str>> {
    let statement = trim(statement);
    let bytes = statement.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        while i < bytes.len() && is_space(bytes[i]) {
            i += 1;
        }
        if i == bytes.len() {
            break;
        }
        let start = i;
        match bytes[i] {
            open @ (b'{' | b'[') => {
                let close = if open == b'{' { b'}' } else { b']' };
                let mut depth = 0i64;
                let mut end = None;
                while i < bytes.len() {
                    if bytes[i] == open {
                        depth += 1;
                    } else if bytes[i] == close {
                        depth -= 1;
                        if depth == 0 {
                            end = Some(i);
                            break;
                        }
                    }
                    i += 1;
                }
                match end {
                    Some(end) => {
                        tokens.push(&statement[start..=end]);
                        i = end + 1;
                    }
                    None if open == b'{' => return Err(SzlError::unbalanced_braces(statement)),
                    None => return Err(SzlError::unbalanced_brackets(statement)),
                }
            }
            b'"' => {
                // An unterminated quote runs to the end of input; evaluation
                // will then see it as a plain literal.
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    i += 1;
                }
                if i < bytes.len() {
                    i += 1;
                }
                tokens.push(&statement[start..i]);
            }
            _ => {
                while i < bytes.len() && !is_space(bytes[i]) {
                    i += 1;
                }
                tokens.push(&statement[start..i]);
            }
        }
    }
    Ok(tokens)
}

/// Net `{}`/`[]` balance of `text`, used by the REPL to detect continuation
/// lines. Positive counts mean more input is expected.
#[must_use]
pub fn nesting_balance(text: &str) -> (i64, i64) {
    let mut braces = 0i64;
    let mut brackets = 0i64;
    for &byte in text.as_bytes() {
        match byte {
            b'{' => braces += 1,
            b'}' => braces -= 1,
            b'[' => brackets += 1,
            b']' => brackets -= 1,
            _ => {}
        }
    }
    (braces, brackets)
}

/// True when joining `s` into a list string requires `{…}` wrapping: empty
/// items and items containing whitespace would otherwise not re-tokenise.
pub(crate) fn needs_wrap(s: &str) -> bool {
    s.is_empty() || s.bytes().any(is_space)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn statements_split_at_top_level_newlines() {
        let stmts = split_statements("set a 1\nset b 2").unwrap();
        assert_eq!(stmts, vec!["set a 1", "set b 2"]);
    }

    #[test]
    fn newlines_inside_braces_do_not_split() {
        let stmts = split_statements("proc f {} {\n  echo hi\n}\nf").unwrap();
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[1], "f");
    }

    #[test]
    fn comments_and_blank_lines_are_dropped() {
        let stmts = split_statements("# a comment\n\n   \necho hi\n  # trailing").unwrap();
        assert_eq!(stmts, vec!["echo hi"]);
    }

    #[test]
    fn unbalanced_brace_is_reported() {
        let err = split_statements("{").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnbalancedBrace);
        let err = split_statements("}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnbalancedBrace);
    }

    #[test]
    fn unbalanced_bracket_is_reported() {
        let err = split_statements("[").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnbalancedBracket);
        let err = split_statements("]").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnbalancedBracket);
    }

    #[test]
    fn tokens_split_on_whitespace_runs() {
        let toks = split_tokens("a  b\tc").unwrap();
        assert_eq!(toks, vec!["a", "b", "c"]);
    }

    #[test]
    fn groups_keep_their_delimiters() {
        let toks = split_tokens("if {a b} [c d]").unwrap();
        assert_eq!(toks, vec!["if", "{a b}", "[c d]"]);
    }

    #[test]
    fn nested_groups_are_scanned_greedily() {
        let toks = split_tokens("while {[< $i 10]} {incr i}").unwrap();
        assert_eq!(toks, vec!["while", "{[< $i 10]}", "{incr i}"]);
    }

    #[test]
    fn quoted_tokens_keep_inner_whitespace() {
        let toks = split_tokens("format \"hello, {}\" $n").unwrap();
        assert_eq!(toks, vec!["format", "\"hello, {}\"", "$n"]);
    }

    #[test]
    fn adjacent_groups_are_separate_tokens() {
        let toks = split_tokens("{a}{b}").unwrap();
        assert_eq!(toks, vec!["{a}", "{b}"]);
    }

    #[test]
    fn retokenising_a_joined_token_list_is_stable() {
        let toks = split_tokens("a {b c}  d").unwrap();
        let joined = toks.join(" ");
        assert_eq!(split_tokens(&joined).unwrap(), toks);
    }

    #[test]
    fn unbalanced_token_group_is_an_error() {
        assert_eq!(
            split_tokens("{a b").unwrap_err().kind(),
            ErrorKind::UnbalancedBrace
        );
        assert_eq!(
            split_tokens("[a b").unwrap_err().kind(),
            ErrorKind::UnbalancedBracket
        );
    }
}
