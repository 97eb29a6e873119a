//! Resolution engine for command-line argument definitions.
//!
//! This crate turns abbreviated, case-folded or grouped user input into
//! structured matches, or rejects it with a precise diagnostic:
//!
//! - [`match_abbreviation`] resolves a typed token against known names using
//!   chunk-wise prefix matching, with deterministic ambiguity errors.
//! - [`CaseAwareMap`] is the ordered name table the matcher searches. Its
//!   case sensitivity can be toggled at runtime without silently merging keys.
//! - [`ArgGroupSpec`] trees, stored in a [`CommandSpec`], declare exclusive,
//!   co-occurring and repeating groups of options and positional parameters.
//! - [`GroupMatcher`] records which occurrence of which group captured each
//!   value; [`validate_groups`] checks the result and the synopsis renderer
//!   ([`CommandSpec::group_synopsis`]) prints the grammar.
//! - [`Parser`] is a small reference tokenizer wiring all of the above.
//!
//! # Example
//!
//! ```
//! use argspec_core::*;
//!
//! let mut cmd = CommandSpec::new("deploy");
//! cmd.set_abbreviate_options(true);
//! let host = cmd.add_option(OptionSpec::with_value(&["--target-host"])).unwrap();
//! let port = cmd.add_option(OptionSpec::with_value(&["--target-port"])).unwrap();
//! let socket = cmd.add_option(OptionSpec::with_value(&["--socket-path"])).unwrap();
//!
//! let tcp = cmd
//!     .build_group(ArgGroupSpec::builder().args([host, port]).exclusive(false))
//!     .unwrap();
//! let target = cmd
//!     .build_group(
//!         ArgGroupSpec::builder()
//!             .subgroup(tcp)
//!             .arg(socket)
//!             .multiplicity(Range::exactly(1)),
//!     )
//!     .unwrap();
//! cmd.add_group(target).unwrap();
//!
//! assert_eq!(
//!     cmd.synopsis(),
//!     "deploy ([--target-host=<target-host> --target-port=<target-port>] | --socket-path=<socket-path>)"
//! );
//!
//! let result = Parser::new(&cmd).parse(&["--t-h", "example.org", "--t-p", "22"]).unwrap();
//! assert!(result.is_present(port));
//!
//! let err = Parser::new(&cmd).parse(&["--t-h", "example.org"]).unwrap_err();
//! assert_eq!(err.to_string(), "Missing required argument(s): --target-port=<target-port>");
//! ```

mod abbrev;
mod command;
mod error;
mod group;
mod map;
mod matching;
mod parse;
mod range;
mod synopsis;
mod types;
mod validate;

pub use abbrev::{Chunk, MatchError, Resolved, is_abbreviation_of, match_abbreviation, split_into_chunks};
pub use command::CommandSpec;
pub use error::{ErrorKind, SpecError};
pub use group::{ArgGroupBuilder, ArgGroupSpec, Member};
pub use map::{CaseAwareMap, FoldKey, Locale, MapError};
pub use matching::{
    GroupMatch, GroupMatchContainer, GroupMatcher, GroupMatches, MatchEvent, MatchState,
};
pub use parse::{ParseError, ParseResult, Parser};
pub use range::{Range, RangeError};
pub use synopsis::MAX_EXPANDED_UNITS;
pub use types::*;
pub use validate::{
    GroupValidation, Presence, ValidationError, validate_container, validate_groups,
};
