use std::fmt;

use super::expander::PidExpander;

const INPUT_REDIRECT: &str = "<";
const OUTPUT_REDIRECT: &str = ">";
const BACKGROUND_MARKER: &str = "&";
const COMMENT_MARKER: char = '#';

/// One command line, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub args: Vec<String>,
    pub input: Option<String>,
    pub output: Option<String>,
    pub background: bool,
}

impl ParsedCommand {
    pub fn program(&self) -> &str {
        // The parser never builds a command without a program name.
        self.args.first().map(String::as_str).unwrap_or_default()
    }

    /// Arguments after the program name.
    pub fn arguments(&self) -> &[String] {
        self.args.get(1..).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    MissingRedirectTarget(&'static str),
    DuplicateRedirect(&'static str),
    MissingCommand,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MissingRedirectTarget(op) => write!(f, "missing path after '{}'", op),
            ParseError::DuplicateRedirect(op) => write!(f, "more than one '{}' redirection", op),
            ParseError::MissingCommand => write!(f, "missing command"),
        }
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone, Default)]
pub struct Parser {
    expander: PidExpander,
}

impl Parser {
    pub fn new(expander: PidExpander) -> Self {
        Self { expander }
    }

    /// Returns `Ok(None)` for blank lines and comments.
    pub fn parse(&self, line: &str) -> Result<Option<ParsedCommand>, ParseError> {
        let mut tokens = line.split_whitespace().peekable();
        match tokens.peek() {
            None => return Ok(None),
            Some(first) if first.starts_with(COMMENT_MARKER) => return Ok(None),
            Some(_) => {}
        }

        let mut command = ParsedCommand {
            args: Vec::new(),
            input: None,
            output: None,
            background: false,
        };

        while let Some(token) = tokens.next() {
            match token {
                INPUT_REDIRECT => {
                    let path = self.redirect_target(INPUT_REDIRECT, tokens.next())?;
                    Self::set_once(&mut command.input, path, INPUT_REDIRECT)?;
                }
                OUTPUT_REDIRECT => {
                    let path = self.redirect_target(OUTPUT_REDIRECT, tokens.next())?;
                    Self::set_once(&mut command.output, path, OUTPUT_REDIRECT)?;
                }
                _ => command.args.push(self.expander.expand(token).into_owned()),
            }
        }

        if command.args.last().map(String::as_str) == Some(BACKGROUND_MARKER) {
            command.args.pop();
            command.background = true;
        }

        if command.args.is_empty() {
            return Err(ParseError::MissingCommand);
        }

        Ok(Some(command))
    }

    fn redirect_target(&self, op: &'static str, token: Option<&str>) -> Result<String, ParseError> {
        token
            .map(|path| self.expander.expand(path).into_owned())
            .ok_or(ParseError::MissingRedirectTarget(op))
    }

    fn set_once(slot: &mut Option<String>, path: String, op: &'static str) -> Result<(), ParseError> {
        if slot.is_some() {
            return Err(ParseError::DuplicateRedirect(op));
        }
        *slot = Some(path);
        Ok(())
    }
}
