use winnow::ascii::multispace1;
use winnow::combinator::{alt, cut_err, preceded, repeat, terminated};
use winnow::token::{any, take_till};
use winnow::{ModalResult, Parser};

use crate::command::ConversionError;

/// Splits a command line into shell-style words.
///
/// Single quotes take everything literally; double quotes honor backslash
/// escapes for `"`, `\`, `$` and backtick; an unquoted backslash escapes the
/// next character. Backslash-newline continuations vanish, so multi-line
/// commands copied from browser devtools tokenize the same as one-liners.
/// Adjacent segments concatenate into one word: `foo'bar'` is `foobar`.
///
/// An unterminated quote or a trailing bare backslash is a malformed-input
/// failure; the scanner must finish outside of any quote.
pub fn tokenize(input: &str) -> Result<Vec<String>, ConversionError> {
    words.parse(input).map_err(|err| {
        ConversionError::MalformedInput(format!(
            "unparseable quoting near byte {}",
            err.offset()
        ))
    })
}

fn words(s: &mut &str) -> ModalResult<Vec<String>> {
    preceded(gap, repeat(0.., terminated(word, gap))).parse_next(s)
}

/// Inter-word separator: whitespace and line continuations.
fn gap(s: &mut &str) -> ModalResult<()> {
    repeat(0.., alt((multispace1, "\\\r\n", "\\\n"))).parse_next(s)
}

fn word(s: &mut &str) -> ModalResult<String> {
    repeat(1.., alt((single_quoted, double_quoted, escaped, bare)))
        .map(|parts: Vec<String>| parts.concat())
        .parse_next(s)
}

fn bare(s: &mut &str) -> ModalResult<String> {
    take_till(1.., |c: char| {
        c.is_whitespace() || matches!(c, '\'' | '"' | '\\')
    })
    .map(str::to_string)
    .parse_next(s)
}

fn single_quoted(s: &mut &str) -> ModalResult<String> {
    preceded('\'', cut_err(terminated(take_till(0.., '\''), '\'')))
        .map(str::to_string)
        .parse_next(s)
}

fn double_quoted(s: &mut &str) -> ModalResult<String> {
    preceded(
        '"',
        cut_err(terminated(
            repeat(0.., double_quoted_piece).map(|parts: Vec<String>| parts.concat()),
            '"',
        )),
    )
    .parse_next(s)
}

fn double_quoted_piece(s: &mut &str) -> ModalResult<String> {
    alt((
        take_till(1.., ['"', '\\']).map(str::to_string),
        preceded('\\', any).map(|c| match c {
            '"' | '\\' | '$' | '`' => c.to_string(),
            '\n' => String::new(),
            other => format!("\\{other}"),
        }),
    ))
    .parse_next(s)
}

/// Unquoted backslash escape. An escaped newline is a continuation and
/// contributes nothing to the word.
fn escaped(s: &mut &str) -> ModalResult<String> {
    preceded('\\', cut_err(any))
        .map(|c| match c {
            '\n' | '\r' => String::new(),
            other => other.to_string(),
        })
        .parse_next(s)
}
