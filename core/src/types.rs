//! Argument definitions: options and positional parameters.
//!
//! These types describe *what* a command accepts. They are registered with a
//! [`CommandSpec`](crate::CommandSpec), which hands back an [`ArgId`] used by
//! group builders and by the match engine.

use serde::{Deserialize, Serialize};

use crate::Range;

/// Handle of an argument registered with a [`CommandSpec`](crate::CommandSpec).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArgId(pub(crate) usize);

impl ArgId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle of a group built by a [`CommandSpec`](crate::CommandSpec).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub(crate) usize);

impl GroupId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A named option such as `-o`/`--output`.
///
/// # Examples
///
/// ```
/// use argspec_core::{OptionSpec, Range};
///
/// let verbose = OptionSpec::flag(&["-v", "--verbose"]);
/// assert_eq!(verbose.arity, Range::exactly(0));
///
/// let output = OptionSpec::with_value(&["-o", "--output"]);
/// assert_eq!(output.arity, Range::exactly(1));
/// assert_eq!(output.label(), "output");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSpec {
    /// All spellings, including leading dashes. The first one is used in
    /// synopses and messages.
    pub names: Vec<String>,
    /// Number of values consumed per occurrence.
    #[serde(default = "OptionSpec::default_arity")]
    pub arity: Range,
    /// Label shown for the value, without angle brackets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_label: Option<String>,
    /// `Some(true)` makes a free option mandatory; `Some(false)` makes a
    /// member of a co-occurring group optional within it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl OptionSpec {
    fn default_arity() -> Range {
        Range::exactly(1)
    }

    /// A boolean option taking no value.
    pub fn flag(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|name| name.to_string()).collect(),
            arity: Range::exactly(0),
            param_label: None,
            required: None,
            description: None,
        }
    }

    /// An option taking exactly one value.
    pub fn with_value(names: &[&str]) -> Self {
        Self {
            arity: Range::exactly(1),
            ..Self::flag(names)
        }
    }

    pub fn with_arity(mut self, arity: Range) -> Self {
        self.arity = arity;
        self
    }

    pub fn with_param_label(mut self, label: &str) -> Self {
        self.param_label = Some(label.to_string());
        self
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    /// Name used in synopses: the first declared spelling.
    pub fn display_name(&self) -> &str {
        self.names.first().map_or("", String::as_str)
    }

    /// Value label; defaults to the longest name without dashes.
    pub fn label(&self) -> String {
        if let Some(label) = &self.param_label {
            return label.clone();
        }
        self.names
            .iter()
            .max_by_key(|name| name.len())
            .map(|name| name.trim_start_matches('-').to_string())
            .unwrap_or_default()
    }

    pub fn takes_value(&self) -> bool {
        self.arity.max() != Some(0)
    }
}

/// A positional parameter.
///
/// `index` orders positionals; positionals inside a repeating group are
/// filled in index order once per occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionalSpec {
    pub index: usize,
    pub label: String,
    #[serde(default = "PositionalSpec::default_arity")]
    pub arity: Range,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PositionalSpec {
    fn default_arity() -> Range {
        Range::exactly(1)
    }

    pub fn new(index: usize, label: &str) -> Self {
        Self {
            index,
            label: label.to_string(),
            arity: Range::exactly(1),
            required: None,
            description: None,
        }
    }

    pub fn with_arity(mut self, arity: Range) -> Self {
        self.arity = arity;
        self
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }
}

/// Either kind of argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgSpec {
    Option(OptionSpec),
    Positional(PositionalSpec),
}

impl ArgSpec {
    pub fn arity(&self) -> Range {
        match self {
            Self::Option(option) => option.arity,
            Self::Positional(positional) => positional.arity,
        }
    }

    pub fn is_option(&self) -> bool {
        matches!(self, Self::Option(_))
    }

    pub fn as_option(&self) -> Option<&OptionSpec> {
        match self {
            Self::Option(option) => Some(option),
            Self::Positional(_) => None,
        }
    }

    pub fn as_positional(&self) -> Option<&PositionalSpec> {
        match self {
            Self::Option(_) => None,
            Self::Positional(positional) => Some(positional),
        }
    }

    /// Short name for messages: `-a` or `<file>`.
    pub fn display_name(&self) -> String {
        match self {
            Self::Option(option) => option.display_name().to_string(),
            Self::Positional(positional) => format!("<{}>", positional.label),
        }
    }

    /// Whether the argument must be given outside of any group.
    pub fn is_required(&self) -> bool {
        match self {
            Self::Option(option) => option.required == Some(true),
            Self::Positional(positional) => positional
                .required
                .unwrap_or(positional.arity.min() > 0),
        }
    }

    /// Whether a co-occurring group needs this member in every occurrence.
    pub fn is_required_in_group(&self) -> bool {
        match self {
            Self::Option(option) => option.required != Some(false),
            Self::Positional(_) => self.is_required(),
        }
    }
}

impl From<OptionSpec> for ArgSpec {
    fn from(option: OptionSpec) -> Self {
        Self::Option(option)
    }
}

impl From<PositionalSpec> for ArgSpec {
    fn from(positional: PositionalSpec) -> Self {
        Self::Positional(positional)
    }
}
