//! Group validation.
//!
//! Walks the group definitions and a [`GroupMatches`] tree together,
//! depth-first and post-order: subgroups are checked before their parent
//! looks at their presence. Top-level groups are visited in attach order and
//! the first failure wins. A group with `validate: false` reports only its
//! presence; failures of validating groups nested inside it are reported on
//! their own, never as the unvalidated group's failure.
//!
//! # Examples
//!
//! ```
//! use argspec_core::*;
//!
//! let mut cmd = CommandSpec::new("tool");
//! let a = cmd.add_option(OptionSpec::flag(&["-a"])).unwrap();
//! let b = cmd.add_option(OptionSpec::flag(&["-b"])).unwrap();
//! let group = cmd.build_group(ArgGroupSpec::builder().args([a, b])).unwrap();
//! cmd.add_group(group).unwrap();
//!
//! let mut matcher = GroupMatcher::new(&cmd);
//! matcher.record(a, vec!["true".into()]).unwrap();
//! matcher.record(b, vec!["true".into()]).unwrap();
//!
//! let err = validate_groups(&cmd, &matcher.finish()).unwrap_err();
//! assert_eq!(err.to_string(), "-a, -b are mutually exclusive (specify only one)");
//! ```

use thiserror::Error;
use tracing::debug;

use crate::command::CommandSpec;
use crate::error::ErrorKind;
use crate::group::Member;
use crate::matching::{GroupMatch, GroupMatchContainer, GroupMatches};
use crate::types::GroupId;

/// Parse-time group failures.
///
/// Members are carried as synopsis fragments so the messages read like the
/// usage line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Required members (or a whole required group) were not given.
    #[error("{}", missing_message(.members, *.exclusive))]
    MissingRequired { members: Vec<String>, exclusive: bool },
    /// A group with a fixed count matched a different number of times.
    #[error("Group: {group} must be specified {expected} times but was matched {actual} times")]
    MissingOccurrences {
        group: String,
        expected: u32,
        actual: usize,
    },
    /// Several members of one exclusive occurrence were given.
    #[error("{} are mutually exclusive (specify only one)", exclusive_members(.members, *.composite))]
    MutuallyExclusive {
        members: Vec<String>,
        /// A subgroup is among the members.
        composite: bool,
    },
    /// More occurrences than the group's maximum were attempted.
    #[error("{}", max_values_message(*.max, .occurrences))]
    MaxValuesExceeded {
        group: String,
        max: u32,
        occurrences: Vec<String>,
    },
}

fn missing_message(members: &[String], exclusive: bool) -> String {
    if exclusive {
        format!(
            "Missing required argument (specify one of these): {}",
            members.join(", ")
        )
    } else {
        format!("Missing required argument(s): {}", members.join(", "))
    }
}

fn exclusive_members(members: &[String], composite: bool) -> String {
    members.join(if composite { " and " } else { ", " })
}

fn max_values_message(max: u32, occurrences: &[String]) -> String {
    if max == 1 && occurrences.len() == 2 {
        format!(
            "expected only one match but got {} and {}",
            occurrences[0], occurrences[1]
        )
    } else {
        format!(
            "expected at most {max} matches but got {}",
            occurrences.join(", ")
        )
    }
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingRequired { .. } | Self::MissingOccurrences { .. } => {
                ErrorKind::MissingRequired
            }
            Self::MutuallyExclusive { .. } => ErrorKind::MutuallyExclusive,
            Self::MaxValuesExceeded { .. } => ErrorKind::MaxValuesExceeded,
        }
    }
}

/// Whether any argument of a group was matched, independent of the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Presence {
    Present,
    Absent,
}

/// Outcome of validating one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupValidation {
    Success(Presence),
    Failure(Presence, ValidationError),
}

impl GroupValidation {
    pub fn presence(&self) -> Presence {
        match self {
            Self::Success(presence) | Self::Failure(presence, _) => *presence,
        }
    }

    pub fn is_present(&self) -> bool {
        self.presence() == Presence::Present
    }

    pub fn error(&self) -> Option<&ValidationError> {
        match self {
            Self::Success(_) => None,
            Self::Failure(_, err) => Some(err),
        }
    }

    pub fn into_result(self) -> Result<Presence, ValidationError> {
        match self {
            Self::Success(presence) => Ok(presence),
            Self::Failure(_, err) => Err(err),
        }
    }
}

/// Validates every attached group of `command`; the first failure wins.
pub fn validate_groups(command: &CommandSpec, matches: &GroupMatches) -> Result<(), ValidationError> {
    for id in command.top_level_groups() {
        let container = matches.container(*id);
        let failure = match validate_container(command, *id, container) {
            GroupValidation::Failure(_, err) => Some(err),
            GroupValidation::Success(_) => container.and_then(|c| shielded_failure(command, c)),
        };
        if let Some(err) = failure {
            debug!(group = %command.group_synopsis(*id), error = %err, "Group validation failed");
            return Err(err);
        }
    }
    Ok(())
}

/// First failure of a validating group nested below a group with
/// `validate: false`.
///
/// Such failures belong to the nested group alone, so they are reported on
/// their own instead of through the unvalidated ancestor.
fn shielded_failure(command: &CommandSpec, container: &GroupMatchContainer) -> Option<ValidationError> {
    let shielding = !command.group(container.group()).validate();
    for occurrence in container.matches() {
        for sub in occurrence.matched_subgroups() {
            if shielding
                && command.group(sub.group()).validate()
                && let GroupValidation::Failure(_, err) =
                    validate_container(command, sub.group(), Some(sub))
            {
                return Some(err);
            }
            if let Some(err) = shielded_failure(command, sub) {
                return Some(err);
            }
        }
    }
    None
}

/// Validates the occurrences of one group.
///
/// `container` is `None` when the group never matched.
pub fn validate_container(
    command: &CommandSpec,
    id: GroupId,
    container: Option<&GroupMatchContainer>,
) -> GroupValidation {
    let group = command.group(id);
    let occurrences = container.map_or(&[][..], GroupMatchContainer::matches);
    let presence = if occurrences.iter().any(|occurrence| !occurrence.is_empty()) {
        Presence::Present
    } else {
        Presence::Absent
    };
    let multiplicity = group.multiplicity();

    if !group.validate() {
        return GroupValidation::Success(presence);
    }
    if presence == Presence::Absent {
        if multiplicity.min() > 0 {
            return GroupValidation::Failure(
                presence,
                ValidationError::MissingRequired {
                    members: vec![command.group_synopsis(id)],
                    exclusive: group.exclusive(),
                },
            );
        }
        return GroupValidation::Success(presence);
    }

    for occurrence in occurrences {
        if let Err(err) = validate_occurrence(command, id, occurrence) {
            return GroupValidation::Failure(presence, err);
        }
    }

    let count = occurrences.len();
    if (count as u64) < u64::from(multiplicity.min()) {
        let err = if multiplicity.max() == Some(multiplicity.min()) {
            ValidationError::MissingOccurrences {
                group: command.group_synopsis(id),
                expected: multiplicity.min(),
                actual: count,
            }
        } else {
            ValidationError::MissingRequired {
                members: required_members(command, id),
                exclusive: group.exclusive(),
            }
        };
        return GroupValidation::Failure(presence, err);
    }
    if !multiplicity.contains(u32::try_from(count).unwrap_or(u32::MAX)) {
        let synopsis = command.group_synopsis(id);
        return GroupValidation::Failure(
            presence,
            ValidationError::MaxValuesExceeded {
                max: multiplicity.max().unwrap_or(u32::MAX),
                occurrences: occurrences
                    .iter()
                    .map(|occurrence| format!("{synopsis}={}", occurrence.describe(command)))
                    .collect(),
                group: synopsis,
            },
        );
    }
    GroupValidation::Success(presence)
}

/// Checks one occurrence of group `id` after validating its subgroups.
fn validate_occurrence(
    command: &CommandSpec,
    id: GroupId,
    occurrence: &GroupMatch,
) -> Result<(), ValidationError> {
    let group = command.group(id);
    let mut present: Vec<String> = Vec::new();
    let mut missing: Vec<String> = Vec::new();
    let mut composite = false;

    for member in group.members() {
        match *member {
            Member::Arg(arg) => {
                if occurrence.is_present(arg) {
                    present.push(command.arg_synopsis(arg));
                } else if !group.exclusive() && command.arg(arg).is_required_in_group() {
                    missing.push(command.arg_synopsis(arg));
                }
            }
            Member::Group(sub) => {
                let container = occurrence.subgroup(sub).filter(|c| !c.is_empty());
                match container {
                    Some(container) => {
                        validate_container(command, sub, Some(container)).into_result()?;
                        present.push(command.group_synopsis(sub));
                        composite = true;
                    }
                    None => {
                        let required = command.group(sub).multiplicity().min() > 0;
                        if !group.exclusive() && required {
                            missing.push(command.group_synopsis(sub));
                        }
                    }
                }
            }
        }
    }

    if group.exclusive() && present.len() > 1 {
        return Err(ValidationError::MutuallyExclusive {
            members: present,
            composite,
        });
    }
    if !missing.is_empty() {
        return Err(ValidationError::MissingRequired {
            members: missing,
            exclusive: false,
        });
    }
    Ok(())
}

/// Members listed when a group matched fewer times than required.
fn required_members(command: &CommandSpec, id: GroupId) -> Vec<String> {
    let group = command.group(id);
    let required: Vec<String> = group
        .members()
        .iter()
        .filter(|member| match member {
            Member::Arg(arg) => group.exclusive() || command.arg(*arg).is_required_in_group(),
            Member::Group(sub) => group.exclusive() || command.group(*sub).multiplicity().min() > 0,
        })
        .map(|member| command.member_synopsis(id, *member))
        .collect();
    if required.is_empty() {
        vec![command.group_synopsis(id)]
    } else {
        required
    }
}
