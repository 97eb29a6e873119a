//! Argument groups: exclusivity, co-occurrence, multiplicity and nesting.
//!
//! Groups are assembled with an [`ArgGroupBuilder`] and stored in the arena
//! of the owning [`CommandSpec`](crate::CommandSpec), which validates them
//! on [`build_group`](crate::CommandSpec::build_group) and again when a
//! top-level group is attached with
//! [`add_group`](crate::CommandSpec::add_group).
//!
//! # Examples
//!
//! ```
//! use argspec_core::*;
//!
//! let mut cmd = CommandSpec::new("tool");
//! let a = cmd.add_option(OptionSpec::flag(&["-a"])).unwrap();
//! let b = cmd.add_option(OptionSpec::flag(&["-b"])).unwrap();
//!
//! let group = cmd
//!     .build_group(ArgGroupSpec::builder().arg(a).arg(b).multiplicity(Range::exactly(1)))
//!     .unwrap();
//! cmd.add_group(group).unwrap();
//!
//! assert_eq!(cmd.group_synopsis(group), "(-a | -b)");
//! ```

use crate::types::{ArgId, GroupId};
use crate::Range;

/// One entry of a group, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Member {
    Arg(ArgId),
    Group(GroupId),
}

/// An immutable group node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgGroupSpec {
    pub(crate) id: GroupId,
    pub(crate) members: Vec<Member>,
    pub(crate) exclusive: bool,
    pub(crate) multiplicity: Range,
    pub(crate) validate: bool,
    pub(crate) heading: Option<String>,
    pub(crate) order: i32,
    /// Lookup link to the enclosing group; never used for ownership.
    pub(crate) parent: Option<GroupId>,
}

impl ArgGroupSpec {
    /// Starts a group with `exclusive = true`, `multiplicity = 0..1` and
    /// `validate = true`.
    pub fn builder() -> ArgGroupBuilder {
        ArgGroupBuilder::default()
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Arguments owned directly by this group.
    pub fn args(&self) -> impl Iterator<Item = ArgId> + '_ {
        self.members.iter().filter_map(|member| match member {
            Member::Arg(arg) => Some(*arg),
            Member::Group(_) => None,
        })
    }

    pub fn subgroups(&self) -> impl Iterator<Item = GroupId> + '_ {
        self.members.iter().filter_map(|member| match member {
            Member::Group(group) => Some(*group),
            Member::Arg(_) => None,
        })
    }

    pub fn exclusive(&self) -> bool {
        self.exclusive
    }

    pub fn multiplicity(&self) -> Range {
        self.multiplicity
    }

    pub fn validate(&self) -> bool {
        self.validate
    }

    pub fn heading(&self) -> Option<&str> {
        self.heading.as_deref()
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn parent(&self) -> Option<GroupId> {
        self.parent
    }

    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }
}

/// Fluent builder for [`ArgGroupSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgGroupBuilder {
    pub(crate) members: Vec<Member>,
    pub(crate) exclusive: bool,
    pub(crate) multiplicity: Range,
    pub(crate) validate: bool,
    pub(crate) heading: Option<String>,
    pub(crate) order: i32,
}

impl Default for ArgGroupBuilder {
    fn default() -> Self {
        Self {
            members: Vec::new(),
            exclusive: true,
            multiplicity: Range::optional(),
            validate: true,
            heading: None,
            order: -1,
        }
    }
}

impl ArgGroupBuilder {
    pub fn arg(mut self, arg: ArgId) -> Self {
        self.members.push(Member::Arg(arg));
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = ArgId>) -> Self {
        self.members.extend(args.into_iter().map(Member::Arg));
        self
    }

    pub fn subgroup(mut self, group: GroupId) -> Self {
        self.members.push(Member::Group(group));
        self
    }

    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    pub fn multiplicity(mut self, multiplicity: Range) -> Self {
        self.multiplicity = multiplicity;
        self
    }

    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn heading(mut self, heading: impl Into<String>) -> Self {
        self.heading = Some(heading.into());
        self
    }

    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }
}
