//! A small reference tokenizer that feeds the group engine.
//!
//! It understands `--` (end of options), `--name=value` and `--name value`
//! forms, subcommands and positional parameters. It does not cluster short
//! options and never converts values: every value is kept as the string the
//! user typed.
//!
//! # Examples
//!
//! ```
//! use argspec_core::*;
//!
//! let mut cmd = CommandSpec::new("tool");
//! let a = cmd.add_option(OptionSpec::flag(&["-a"])).unwrap();
//! let b = cmd.add_option(OptionSpec::flag(&["-b"])).unwrap();
//! let group = cmd
//!     .build_group(ArgGroupSpec::builder().args([a, b]).multiplicity(Range::exactly(1)))
//!     .unwrap();
//! cmd.add_group(group).unwrap();
//!
//! let parser = Parser::new(&cmd);
//! assert!(parser.parse(&["-a"]).is_ok());
//!
//! let err = parser.parse(&["-a", "-b"]).unwrap_err();
//! assert_eq!(err.to_string(), "-a, -b are mutually exclusive (specify only one)");
//! ```

use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

use crate::abbrev::MatchError;
use crate::command::CommandSpec;
use crate::error::ErrorKind;
use crate::matching::{GroupMatch, GroupMatchContainer, GroupMatcher, GroupMatches};
use crate::types::{ArgId, ArgSpec};
use crate::validate::{ValidationError, validate_groups};

/// Errors raised while parsing a command line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Unknown option: '{0}'")]
    UnknownOption(String),
    /// An abbreviated option or subcommand name matched several candidates.
    #[error(transparent)]
    AmbiguousOption(MatchError),
    #[error("Missing value for option '{option}': expected {expected} but got {actual}")]
    MissingValue {
        option: String,
        expected: u32,
        actual: usize,
    },
    #[error("Option '{option}' does not take a value but got '{value}'")]
    UnexpectedValue { option: String, value: String },
    /// An ungrouped option with a bounded arity was given more than once.
    #[error("Option '{0}' should be specified only once")]
    RepeatedOption(String),
    #[error("Unmatched argument: '{0}'")]
    UnexpectedArgument(String),
    #[error("Missing required argument(s): {}", .0.join(", "))]
    MissingRequiredArgument(Vec<String>),
    #[error(transparent)]
    Group(#[from] ValidationError),
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownOption(_) => ErrorKind::Unknown,
            Self::AmbiguousOption(err) => err.kind(),
            Self::MissingRequiredArgument(_) => ErrorKind::MissingRequired,
            Self::Group(err) => err.kind(),
            Self::MissingValue { .. }
            | Self::UnexpectedValue { .. }
            | Self::RepeatedOption(_)
            | Self::UnexpectedArgument(_) => ErrorKind::InvalidInput,
        }
    }
}

/// Everything matched for one command, plus the subcommand that followed.
#[derive(Debug, Clone)]
pub struct ParseResult<'c> {
    command: &'c CommandSpec,
    values: IndexMap<ArgId, Vec<String>>,
    groups: GroupMatches,
    subcommand: Option<Box<ParseResult<'c>>>,
}

impl<'c> ParseResult<'c> {
    pub fn command(&self) -> &'c CommandSpec {
        self.command
    }

    /// Values of an argument outside every group.
    pub fn matched_values(&self, arg: ArgId) -> Option<&[String]> {
        self.values.get(&arg).map(Vec::as_slice)
    }

    /// Ungrouped arguments in the order they were first matched.
    pub fn free_values(&self) -> impl Iterator<Item = (ArgId, &[String])> {
        self.values.iter().map(|(arg, values)| (*arg, values.as_slice()))
    }

    /// Whether `arg` was matched anywhere, grouped or not.
    pub fn is_present(&self, arg: ArgId) -> bool {
        self.values.contains_key(&arg) || self.groups.containers().any(|c| container_has(c, arg))
    }

    pub fn groups(&self) -> &GroupMatches {
        &self.groups
    }

    pub fn subcommand(&self) -> Option<&ParseResult<'c>> {
        self.subcommand.as_deref()
    }
}

fn container_has(container: &GroupMatchContainer, arg: ArgId) -> bool {
    container.matches().iter().any(|occurrence| occurrence_has(occurrence, arg))
}

fn occurrence_has(occurrence: &GroupMatch, arg: ArgId) -> bool {
    occurrence.is_present(arg) || occurrence.matched_subgroups().any(|c| container_has(c, arg))
}

/// Parses command lines against one [`CommandSpec`].
#[derive(Debug, Clone, Copy)]
pub struct Parser<'c> {
    command: &'c CommandSpec,
}

impl<'c> Parser<'c> {
    pub fn new(command: &'c CommandSpec) -> Self {
        Self { command }
    }

    /// Parses `args` (without the program name) and validates every group.
    pub fn parse<S: AsRef<str>>(&self, args: &[S]) -> Result<ParseResult<'c>, ParseError> {
        let args: Vec<String> = args.iter().map(|arg| arg.as_ref().to_string()).collect();
        parse_command(self.command, &args)
    }
}

fn looks_like_option(token: &str) -> bool {
    token.len() > 1 && token.starts_with('-')
}

fn parse_command<'c>(command: &'c CommandSpec, args: &[String]) -> Result<ParseResult<'c>, ParseError> {
    let mut state = CommandState::new(command);
    let mut idx = 0;
    let mut options_ended = false;

    while idx < args.len() {
        let token = &args[idx];
        idx += 1;

        if !options_ended && token == "--" {
            options_ended = true;
            continue;
        }
        if !options_ended && looks_like_option(token) {
            idx = state.option(token, args, idx)?;
            continue;
        }
        if !options_ended && !command.subcommands().is_empty() {
            match command.resolve_subcommand(token) {
                Ok(sub) => {
                    debug!(command = command.name(), subcommand = sub.name(), "Entering subcommand");
                    let mut result = state.finish()?;
                    result.subcommand = Some(Box::new(parse_command(sub, &args[idx..])?));
                    return Ok(result);
                }
                Err(err @ MatchError::Ambiguous { .. }) => {
                    return Err(ParseError::AmbiguousOption(err));
                }
                Err(MatchError::Unknown { .. }) => {}
            }
        }
        state.positional(token)?;
    }
    state.finish()
}

/// Per-command parse state.
struct CommandState<'c> {
    command: &'c CommandSpec,
    matcher: GroupMatcher<'c>,
    values: IndexMap<ArgId, Vec<String>>,
    cursor: PositionalCursor,
}

impl<'c> CommandState<'c> {
    fn new(command: &'c CommandSpec) -> Self {
        Self {
            command,
            matcher: GroupMatcher::new(command),
            values: IndexMap::new(),
            cursor: PositionalCursor::new(command),
        }
    }

    /// Handles one option token and its values; returns the next index.
    fn option(&mut self, token: &str, args: &[String], mut idx: usize) -> Result<usize, ParseError> {
        let (name, attached) = match token.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (token, None),
        };
        let id = self.command.resolve_option(name).map_err(|err| match err {
            MatchError::Unknown { .. } => ParseError::UnknownOption(name.to_string()),
            ambiguous => ParseError::AmbiguousOption(ambiguous),
        })?;
        let ArgSpec::Option(option) = self.command.arg(id) else {
            return Err(ParseError::UnknownOption(name.to_string()));
        };

        let mut values: Vec<String> = Vec::new();
        if !option.takes_value() {
            if let Some(value) = attached {
                return Err(ParseError::UnexpectedValue {
                    option: option.display_name().to_string(),
                    value: value.to_string(),
                });
            }
            values.push("true".to_string());
        } else {
            let arity = option.arity;
            let min = arity.min() as usize;
            if let Some(value) = attached {
                values.push(value.to_string());
            }
            while arity.admits_more_than(values.len()) && idx < args.len() {
                let next = &args[idx];
                if next == "--" || looks_like_option(next) {
                    break;
                }
                if values.len() >= min && self.command.resolve_subcommand(next).is_ok() {
                    break;
                }
                values.push(next.clone());
                idx += 1;
            }
            if values.len() < min {
                return Err(ParseError::MissingValue {
                    option: option.display_name().to_string(),
                    expected: arity.min(),
                    actual: values.len(),
                });
            }
        }

        self.record(id, values)?;
        Ok(idx)
    }

    fn positional(&mut self, token: &str) -> Result<(), ParseError> {
        let id = self
            .cursor
            .next(self.command)
            .ok_or_else(|| ParseError::UnexpectedArgument(token.to_string()))?;
        self.record(id, vec![token.to_string()])
    }

    fn record(&mut self, id: ArgId, values: Vec<String>) -> Result<(), ParseError> {
        if self.command.group_of(id).is_some() {
            self.matcher.record(id, values)?;
            return Ok(());
        }
        let arg = self.command.arg(id);
        if arg.is_option() && !arg.arity().is_unbounded() && self.values.contains_key(&id) {
            return Err(ParseError::RepeatedOption(arg.display_name()));
        }
        self.values.entry(id).or_default().extend(values);
        Ok(())
    }

    /// Checks required ungrouped arguments, then validates the groups.
    fn finish(self) -> Result<ParseResult<'c>, ParseError> {
        let mut missing: Vec<String> = Vec::new();
        for (id, arg) in self.command.args() {
            if self.command.group_of(id).is_some() {
                continue;
            }
            let count = self.values.get(&id).map_or(0, Vec::len);
            let absent = match arg {
                ArgSpec::Option(_) => arg.is_required() && count == 0,
                ArgSpec::Positional(positional) => {
                    let min = (positional.arity.min() as usize).max(1);
                    arg.is_required() && count < min
                }
            };
            if absent {
                missing.push(self.command.arg_synopsis(id));
            }
        }
        if !missing.is_empty() {
            return Err(ParseError::MissingRequiredArgument(missing));
        }

        let groups = self.matcher.finish();
        validate_groups(self.command, &groups)?;
        Ok(ParseResult {
            command: self.command,
            values: self.values,
            groups,
            subcommand: None,
        })
    }
}

/// Assigns positional values to parameters in index order.
///
/// Once every parameter is full, the cursor wraps back to the first
/// parameter of the outermost repeatable group owning the last one.
struct PositionalCursor {
    order: Vec<ArgId>,
    position: usize,
    filled: usize,
    wrap: Option<usize>,
}

impl PositionalCursor {
    fn new(command: &CommandSpec) -> Self {
        let order = command.positionals();
        let repeatable = order.last().and_then(|last| {
            command
                .group_path(*last)
                .into_iter()
                .find(|id| command.group(*id).multiplicity().max() != Some(1))
        });
        let wrap = repeatable.and_then(|group| {
            order
                .iter()
                .position(|id| command.group_path(*id).contains(&group))
        });
        Self {
            order,
            position: 0,
            filled: 0,
            wrap,
        }
    }

    fn next(&mut self, command: &CommandSpec) -> Option<ArgId> {
        let mut wrapped = false;
        loop {
            let Some(&id) = self.order.get(self.position) else {
                if wrapped {
                    return None;
                }
                self.position = self.wrap?;
                self.filled = 0;
                wrapped = true;
                continue;
            };
            if command.arg(id).arity().admits_more_than(self.filled) {
                self.filled += 1;
                return Some(id);
            }
            self.position += 1;
            self.filled = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArgGroupSpec, OptionSpec, PositionalSpec, Range};

    #[test]
    fn test_free_options_and_positionals() {
        let mut cmd = CommandSpec::new("cp");
        let verbose = cmd.add_option(OptionSpec::flag(&["-v", "--verbose"])).unwrap();
        let mode = cmd.add_option(OptionSpec::with_value(&["--mode"])).unwrap();
        let src = cmd.add_positional(PositionalSpec::new(0, "src"));
        let dest = cmd.add_positional(PositionalSpec::new(1, "dest"));

        let result = Parser::new(&cmd)
            .parse(&["--mode=fast", "a.txt", "-v", "b.txt"])
            .unwrap();
        assert_eq!(result.matched_values(verbose), Some(&["true".to_string()][..]));
        assert_eq!(result.matched_values(mode), Some(&["fast".to_string()][..]));
        assert_eq!(result.matched_values(src), Some(&["a.txt".to_string()][..]));
        assert_eq!(result.matched_values(dest), Some(&["b.txt".to_string()][..]));
        assert!(result.groups().is_empty());
    }

    #[test]
    fn test_double_dash_ends_options() {
        let mut cmd = CommandSpec::new("rm");
        cmd.add_option(OptionSpec::flag(&["-f"])).unwrap();
        let files = cmd.add_positional(PositionalSpec::new(0, "file").with_arity(Range::at_least(0)));

        let result = Parser::new(&cmd).parse(&["-f", "--", "-f", "x"]).unwrap();
        assert_eq!(
            result.matched_values(files),
            Some(&["-f".to_string(), "x".to_string()][..])
        );
    }

    #[test]
    fn test_option_errors() {
        let mut cmd = CommandSpec::new("tool");
        cmd.add_option(OptionSpec::flag(&["--verbose"])).unwrap();
        cmd.add_option(OptionSpec::flag(&["--version"])).unwrap();
        cmd.add_option(OptionSpec::with_value(&["--name"])).unwrap();
        cmd.set_abbreviate_options(true);
        let parser = Parser::new(&cmd);

        assert_eq!(
            parser.parse(&["--nope"]).unwrap_err(),
            ParseError::UnknownOption("--nope".to_string())
        );
        let err = parser.parse(&["--ver"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Ambiguous);
        assert_eq!(
            err.to_string(),
            "'--ver' is not unique: it matches '--verbose', '--version'"
        );
        assert_eq!(
            parser.parse(&["--name"]).unwrap_err(),
            ParseError::MissingValue {
                option: "--name".to_string(),
                expected: 1,
                actual: 0,
            }
        );
        assert_eq!(
            parser.parse(&["--verbose=yes"]).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            parser.parse(&["stray"]).unwrap_err(),
            ParseError::UnexpectedArgument("stray".to_string())
        );
        assert!(parser.parse(&["--verb", "--n", "x"]).is_ok());
    }

    #[test]
    fn test_required_free_arguments() {
        let mut cmd = CommandSpec::new("tool");
        cmd.add_option(OptionSpec::with_value(&["--name"]).required(true)).unwrap();
        cmd.add_positional(PositionalSpec::new(0, "file"));

        let err = Parser::new(&cmd).parse::<&str>(&[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required argument(s): --name=<name>, <file>"
        );
        assert_eq!(err.kind(), ErrorKind::MissingRequired);
    }

    #[test]
    fn test_optional_positional_may_be_omitted() {
        let mut cmd = CommandSpec::new("tool");
        let file = cmd.add_positional(PositionalSpec::new(0, "file").required(false));
        assert_eq!(cmd.synopsis(), "tool [<file>]");

        let result = Parser::new(&cmd).parse::<&str>(&[]).unwrap();
        assert!(!result.is_present(file));

        let result = Parser::new(&cmd).parse(&["a.txt"]).unwrap();
        assert_eq!(result.matched_values(file), Some(&["a.txt".to_string()][..]));
    }

    #[test]
    fn test_positional_below_arity_minimum() {
        let mut cmd = CommandSpec::new("diff");
        cmd.add_positional(PositionalSpec::new(0, "files").with_arity(Range::new(2, 2).unwrap()));

        let err = Parser::new(&cmd).parse(&["a.txt"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequired);
        assert!(Parser::new(&cmd).parse(&["a.txt", "b.txt"]).is_ok());
    }

    #[test]
    fn test_bounded_free_option_given_twice() {
        let mut cmd = CommandSpec::new("tool");
        cmd.add_option(OptionSpec::with_value(&["--mode"])).unwrap();
        let defines = cmd
            .add_option(OptionSpec::with_value(&["-D"]).with_arity(Range::at_least(1)))
            .unwrap();

        let err = Parser::new(&cmd)
            .parse(&["--mode", "a", "--mode", "b"])
            .unwrap_err();
        assert_eq!(err, ParseError::RepeatedOption("--mode".to_string()));
        assert_eq!(err.to_string(), "Option '--mode' should be specified only once");
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let result = Parser::new(&cmd).parse(&["-D", "x=1", "-D", "y=2"]).unwrap();
        assert_eq!(
            result.matched_values(defines),
            Some(&["x=1".to_string(), "y=2".to_string()][..])
        );
    }

    #[test]
    fn test_subcommand_is_parsed_recursively() {
        let mut sub = CommandSpec::new("commit");
        let message = sub.add_option(OptionSpec::with_value(&["-m", "--message"])).unwrap();
        let mut cmd = CommandSpec::new("git");
        let verbose = cmd.add_option(OptionSpec::flag(&["-v"])).unwrap();
        cmd.add_subcommand(sub).unwrap();
        cmd.set_abbreviate_subcommands(true);

        let result = Parser::new(&cmd).parse(&["-v", "com", "-m", "hi"]).unwrap();
        assert!(result.is_present(verbose));
        let sub = result.subcommand().unwrap();
        assert_eq!(sub.command().name(), "commit");
        assert_eq!(sub.matched_values(message), Some(&["hi".to_string()][..]));
    }

    #[test]
    fn test_option_values_stop_at_subcommand() {
        let mut cmd = CommandSpec::new("tool");
        let tags = cmd
            .add_option(OptionSpec::with_value(&["--tag"]).with_arity(Range::at_least(1)))
            .unwrap();
        cmd.add_subcommand(CommandSpec::new("run")).unwrap();

        let result = Parser::new(&cmd).parse(&["--tag", "a", "b", "run"]).unwrap();
        assert_eq!(
            result.matched_values(tags),
            Some(&["a".to_string(), "b".to_string()][..])
        );
        assert_eq!(result.subcommand().unwrap().command().name(), "run");
    }

    #[test]
    fn test_positionals_wrap_into_repeating_group() {
        let mut cmd = CommandSpec::new("pairs");
        let key = cmd.add_positional(PositionalSpec::new(0, "key"));
        let value = cmd.add_positional(PositionalSpec::new(1, "value"));
        let group = cmd
            .build_group(
                ArgGroupSpec::builder()
                    .args([key, value])
                    .exclusive(false)
                    .multiplicity(Range::at_least(1)),
            )
            .unwrap();
        cmd.add_group(group).unwrap();
        let parser = Parser::new(&cmd);

        let result = parser.parse(&["a", "1", "b", "2"]).unwrap();
        let container = result.groups().container(group).unwrap();
        assert_eq!(container.len(), 2);
        assert_eq!(container.matches()[1].describe(&cmd), "{<key>=b <value>=2}");
        assert!(result.is_present(value));

        let err = parser.parse(&["a", "1", "b"]).unwrap_err();
        assert_eq!(err.to_string(), "Missing required argument(s): <value>");
    }

    #[test]
    fn test_positional_overflow_without_repeating_group() {
        let mut cmd = CommandSpec::new("tool");
        let file = cmd.add_positional(PositionalSpec::new(0, "file"));
        let group = cmd.build_group(ArgGroupSpec::builder().arg(file)).unwrap();
        cmd.add_group(group).unwrap();

        let err = Parser::new(&cmd).parse(&["a", "b"]).unwrap_err();
        assert_eq!(err, ParseError::UnexpectedArgument("b".to_string()));
    }
}
