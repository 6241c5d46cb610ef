//! Reader for the PACE 2018 `.gr` Steiner tree format.

use crate::graph::{edge_key, EdgeWeight, Graph, VertexId};
use std::collections::HashSet;
use std::num::ParseIntError;
use std::str::FromStr;
use thiserror::Error;

impl FromStr for Graph {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_graph(s)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("{message} ({}:{column})", .line + 1)]
pub struct ParseError {
    line: usize,
    column: usize,
    message: String,
}

impl ParseError {
    pub fn new(line: usize, column: usize, message: String) -> Self {
        ParseError {
            line,
            column,
            message,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
/// Rest of input, line, column.
type ParseState<'a> = (&'a str, usize, usize);

/// Wraps a "raw", parsed [VertexId], i.e. a number between `1` and `#nodes`.
/// This is to avoid confusion between the 1-indexing used by the file format and the 0-based indexing used internally.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
struct ParsedVertexId(usize);

impl FromStr for ParsedVertexId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(ParsedVertexId)
    }
}

impl ParsedVertexId {
    /// Convert to a 0-based id, checking that it names one of the `num_nodes` vertices.
    fn resolve(self, num_nodes: usize, (_, line, column): ParseState) -> ParseResult<VertexId> {
        if self.0 == 0 || self.0 > num_nodes {
            return Err(ParseError::new(
                line,
                column,
                format!("vertex {} is not between 1 and {}", self.0, num_nodes),
            ));
        }
        Ok(self.0 - 1)
    }
}

/// Error if the start of the rest of the input doesn't match the expected string.
fn expect<'a>(
    (input, line, column): ParseState<'a>,
    expected: &str,
) -> ParseResult<ParseState<'a>> {
    match input.strip_prefix(expected) {
        Some(new) => Ok((new, line, column + expected.len())),
        None => Err(ParseError::new(
            line,
            column,
            format!(
                "expected '{}' but got {:?}",
                expected,
                input.split_terminator('\n').next()
            ),
        )),
    }
}

/// Expect end of input. Error if it's not the end.
fn expect_the_end(state: ParseState) -> ParseResult<ParseState> {
    let (end, line, column) = skip_whitespace(state);
    if !end.is_empty() {
        Err(ParseError::new(line, column, "expected EOL".to_string()))
    } else {
        Ok(state)
    }
}

/// Skip matches of pattern at the start. Note that this always succeeds even if the pattern doesn't
/// match (in that case, nothing is skipped).
fn skip_pattern<P: FnMut(char) -> bool>((input, line, column): ParseState, pat: P) -> ParseState {
    let trimmed = input.trim_start_matches(pat);
    (trimmed, line, column + input.len() - trimmed.len())
}

/// Skip whitespace.
fn skip_whitespace(state: ParseState) -> ParseState {
    skip_pattern(state, |c: char| c.is_ascii_whitespace() && c != '\n')
}

/// Advance state to next whitespace.
fn to_next_whitespace(state: ParseState) -> ParseResult<(&str, ParseState)> {
    let (input, line, column) = skip_whitespace(state);
    let text = input
        .split_ascii_whitespace()
        .next()
        .ok_or_else(|| ParseError::new(line, column, "unexpected end of input".to_string()))?;
    Ok((text, (&input[text.len()..], line, column + text.len())))
}

/// Like `expect` but ignores leading whitespace.
fn symbol<'a>(state: ParseState<'a>, symbol: &str) -> ParseResult<ParseState<'a>> {
    let state = skip_whitespace(state);
    expect(state, symbol)
}

/// Return the current line, i.e. from the current position until the next EOL.
fn current_line((input, line, column): ParseState) -> ParseResult<&str> {
    input
        .split('\n')
        .next()
        .map(str::trim_end)
        .ok_or_else(|| ParseError::new(line, column, "split failed".into()))
}

/// Parse anything that implements `FromStr`.
fn parse<R: FromStr>((input, line, column): ParseState<'_>) -> ParseResult<R>
where
    R::Err: std::error::Error,
{
    let text = current_line((input, line, column))?;
    text.parse().map_err(|err| {
        ParseError::new(
            line,
            column,
            format!("could not parse input '{}': {}", text, err),
        )
    })
}

/// Parse a header of the form: `NAME CONTENT`.
fn parse_key_value<R: FromStr>(state: ParseState, name: &str) -> ParseResult<R>
where
    R::Err: std::error::Error,
{
    let state = symbol(state, name)?;
    let state = skip_whitespace(state);
    parse(state)
}

/// Skip to the next line.
fn next_line(state: ParseState) -> ParseResult<ParseState> {
    let state = skip_pattern(state, |c| c != '\n');
    let (input, line, _) = expect(state, "\n").or_else(|_| {
        let state = skip_whitespace(state);
        expect_the_end(state)
    })?;
    Ok((input, line + 1, 0))
}

/// Check if the current line is empty (i.e. only consists of whitespace).
fn line_is_empty(state: ParseState) -> bool {
    let (text, _, _) = skip_whitespace(state);
    text.starts_with('\n') || text.starts_with('\r')
}

/// Parse element inside single line, separated by whitespace.
fn parse_inline<T: FromStr>(state: ParseState) -> ParseResult<(T, ParseState)>
where
    T::Err: std::error::Error,
{
    let before_state = skip_whitespace(state);
    let (str, state) = to_next_whitespace(before_state)?;
    Ok((parse::<T>((str, before_state.1, before_state.2))?, state))
}

/// Parse edge in the format `E u v w`.
fn parse_edge(
    state: ParseState,
) -> ParseResult<((ParsedVertexId, ParsedVertexId, EdgeWeight), ParseState)> {
    let state = symbol(state, "E")?;
    let (from, state) = parse_inline(state)?;
    let (to, state) = parse_inline(state)?;
    let (weight, state) = parse_inline(state)?;
    let state = skip_whitespace(state);
    let state = next_line(state)?;
    Ok(((from, to, weight), state))
}

fn skip_empty_lines(state: &mut ParseState) {
    while line_is_empty(*state) {
        let next = next_line(*state);
        if let Ok(next) = next {
            *state = next;
        } else {
            return;
        }
    }
}

/// Parse graph, reporting parse errors.
/// Since we're dealing with an NP-hard problem and thus the graphs are not going to be "huge"
/// it's acceptable to just expect the whole graph file to be read into memory.
///
/// Edge ids follow the order of the `E` lines, starting at 0.
pub fn parse_graph(text: &str) -> ParseResult<Graph> {
    let mut state = (text, 0, 0);
    skip_empty_lines(&mut state);
    state = symbol(state, "SECTION")?;
    state = symbol(state, "Graph")?;
    state = next_line(state)?;
    let num_nodes: usize = parse_key_value(state, "Nodes")?;
    state = next_line(state)?;
    let num_edges: usize = parse_key_value(state, "Edges")?;
    state = next_line(state)?;
    let mut graph = Graph::with_vertices(num_nodes);
    let mut seen = HashSet::with_capacity(num_edges);
    for _ in 0..num_edges {
        let line_state = state;
        let ((from, to, weight), new_state) = parse_edge(state)?;
        let from = from.resolve(num_nodes, line_state)?;
        let to = to.resolve(num_nodes, line_state)?;
        if from == to {
            return Err(ParseError::new(
                line_state.1,
                0,
                format!("loop at vertex {}", from + 1),
            ));
        }
        if !seen.insert(edge_key(from, to)) {
            return Err(ParseError::new(
                line_state.1,
                0,
                format!("duplicate edge between {} and {}", from + 1, to + 1),
            ));
        }
        graph.define_edge(from, to, weight);
        state = new_state;
    }
    state = symbol(state, "END")?;
    state = next_line(state)?;
    skip_empty_lines(&mut state);
    state = symbol(state, "SECTION")?;
    state = symbol(state, "Terminals")?;
    state = next_line(state)?;
    let num_terminals: usize = parse_key_value(state, "Terminals")?;
    state = next_line(state)?;
    for _ in 0..num_terminals {
        let terminal: ParsedVertexId = parse_key_value(state, "T")?;
        let terminal = terminal.resolve(num_nodes, state)?;
        graph.set_terminal(terminal);
        state = next_line(state)?;
    }
    state = symbol(state, "END")?;
    state = next_line(state)?;
    skip_empty_lines(&mut state);
    symbol(state, "EOF")?;
    Ok(graph)
}
