//! Structural errors raised while a command definition is assembled, and the
//! shared error taxonomy.

use thiserror::Error;

use crate::abbrev::MatchError;
use crate::map::MapError;
use crate::Range;

/// Coarse classification shared by every error type in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unknown,
    Ambiguous,
    DuplicateKey,
    EmptyGroup,
    InvalidMultiplicity,
    CrossGroupOwnership,
    AlreadyAttached,
    /// Any other mistake in the command definition.
    InvalidDefinition,
    MissingRequired,
    MutuallyExclusive,
    MaxValuesExceeded,
    /// Malformed command-line input outside the group engine.
    InvalidInput,
}

/// Mistakes in a command definition.
///
/// These indicate a programming error in how a command was declared, never
/// bad user input, and surface before any argument is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    /// An option was declared without any name.
    #[error("option must define at least one name")]
    MissingOptionName,
    /// An option name does not start with a dash or is only dashes.
    #[error("invalid option name: {0}")]
    InvalidOptionName(String),
    /// Two options share a name under the command's case mode.
    #[error("duplicate option name: {0}")]
    DuplicateOption(String),
    /// Two subcommands (or aliases) share a name.
    #[error("duplicate subcommand: {0}")]
    DuplicateSubcommand(String),
    /// Switching case mode would merge two names.
    #[error(transparent)]
    DuplicateKey(#[from] MapError),
    #[error("ArgGroup has no options or positional parameters, and no subgroups")]
    EmptyGroup,
    #[error(
        "ArgGroup must have multiplicity that allows at least one occurrence, but had multiplicity={0}"
    )]
    InvalidMultiplicity(Range),
    /// A member handle does not belong to this command.
    #[error("unknown {kind} handle #{index}")]
    UnknownHandle { kind: &'static str, index: usize },
    /// A group was used as a subgroup of two different groups.
    #[error("group {group} is already a subgroup of {parent}")]
    SubgroupReused { group: String, parent: String },
    #[error(
        "An option cannot be in multiple groups but {arg} is in {first} and {second}. Refactor to avoid this. For example, (-a | (-a -b)) can be rewritten as (-a [-b])."
    )]
    CrossGroupOwnership {
        arg: String,
        first: String,
        second: String,
    },
    #[error(
        "Groups that are part of another group should not be added to a command. Add only the top-level group: {group}"
    )]
    NestedGroupAttached { group: String },
    #[error("The specified group {group} has already been added to the command")]
    AlreadyAttached { group: String },
}

impl SpecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateKey(err) => err.kind(),
            Self::EmptyGroup => ErrorKind::EmptyGroup,
            Self::InvalidMultiplicity(_) => ErrorKind::InvalidMultiplicity,
            Self::CrossGroupOwnership { .. } => ErrorKind::CrossGroupOwnership,
            Self::AlreadyAttached { .. } => ErrorKind::AlreadyAttached,
            Self::DuplicateOption(_) | Self::DuplicateSubcommand(_) => ErrorKind::DuplicateKey,
            Self::MissingOptionName
            | Self::InvalidOptionName(_)
            | Self::UnknownHandle { .. }
            | Self::SubgroupReused { .. }
            | Self::NestedGroupAttached { .. } => ErrorKind::InvalidDefinition,
        }
    }
}

impl MapError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            Self::Unsupported(_) => ErrorKind::InvalidDefinition,
        }
    }
}

impl MatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unknown { .. } => ErrorKind::Unknown,
            Self::Ambiguous { .. } => ErrorKind::Ambiguous,
        }
    }
}
