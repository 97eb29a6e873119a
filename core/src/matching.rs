//! Runtime match tree: which occurrence of which group captured each value.
//!
//! A [`GroupMatcher`] receives `(argument, values)` events in command-line
//! order and routes each one down the path of groups owning the argument.
//! At every level the event either joins the current occurrence or closes it
//! and opens a new one. Routing is planned against the current tree first
//! and applied only once a complete path has been found.
//!
//! Each occurrence moves through an explicit [`MatchState`]:
//!
//! | state     | `Value`   | `Close`  |
//! |-----------|-----------|----------|
//! | `Empty`   | `Filling` | `Closed` |
//! | `Filling` | `Filling` | `Closed` |
//! | `Closed`  | `Closed`  | `Closed` |

use indexmap::IndexMap;
use tracing::debug;

use crate::command::CommandSpec;
use crate::group::{ArgGroupSpec, Member};
use crate::types::{ArgId, ArgSpec, GroupId};
use crate::validate::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchState {
    /// Opened but nothing captured yet.
    Empty,
    /// Accepting values.
    Filling,
    /// A later occurrence was opened or the parse finished.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchEvent {
    Value,
    Close,
}

impl MatchState {
    pub fn on(self, event: MatchEvent) -> Self {
        match (self, event) {
            (_, MatchEvent::Close) => Self::Closed,
            (Self::Closed, MatchEvent::Value) => Self::Closed,
            (Self::Empty | Self::Filling, MatchEvent::Value) => Self::Filling,
        }
    }
}

/// One occurrence of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMatch {
    state: MatchState,
    values: IndexMap<ArgId, Vec<String>>,
    subgroups: IndexMap<GroupId, GroupMatchContainer>,
}

impl GroupMatch {
    fn new(group: &ArgGroupSpec) -> Self {
        Self {
            state: MatchState::Empty,
            values: IndexMap::new(),
            subgroups: group
                .subgroups()
                .map(|id| (id, GroupMatchContainer::new(id)))
                .collect(),
        }
    }

    pub fn state(&self) -> MatchState {
        self.state
    }

    /// Values captured by `arg` in this occurrence, in command-line order.
    pub fn matched_values(&self, arg: ArgId) -> Option<&[String]> {
        self.values.get(&arg).map(Vec::as_slice)
    }

    /// Arguments owned directly by the group that captured something.
    pub fn matched_args(&self) -> impl Iterator<Item = (ArgId, &[String])> {
        self.values.iter().map(|(arg, values)| (*arg, values.as_slice()))
    }

    pub fn is_present(&self, arg: ArgId) -> bool {
        self.values.contains_key(&arg)
    }

    /// Subgroups with at least one occurrence inside this one.
    pub fn matched_subgroups(&self) -> impl Iterator<Item = &GroupMatchContainer> {
        self.subgroups.values().filter(|container| !container.is_empty())
    }

    pub fn subgroup(&self, id: GroupId) -> Option<&GroupMatchContainer> {
        self.subgroups.get(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.subgroups.values().all(GroupMatchContainer::is_empty)
    }

    fn push(&mut self, arg: ArgId, values: Vec<String>) {
        self.state = self.state.on(MatchEvent::Value);
        self.values.entry(arg).or_default().extend(values);
    }

    fn close(&mut self) {
        self.state = self.state.on(MatchEvent::Close);
        for container in self.subgroups.values_mut() {
            container.close();
        }
    }

    /// Whether a member other than `member` is already present.
    fn holds_other_than(&self, member: Member) -> bool {
        let other_arg = self
            .values
            .keys()
            .any(|arg| Member::Arg(*arg) != member);
        let other_group = self
            .subgroups
            .iter()
            .any(|(id, container)| Member::Group(*id) != member && !container.is_empty());
        other_arg || other_group
    }

    /// Compact rendering such as `{-a=1 <file>=x}`.
    pub fn describe(&self, command: &CommandSpec) -> String {
        let mut parts: Vec<String> = Vec::new();
        for (arg, values) in &self.values {
            let name = command.arg(*arg).display_name();
            match command.arg(*arg) {
                ArgSpec::Option(option) if !option.takes_value() => parts.push(name),
                _ if values.len() == 1 => parts.push(format!("{name}={}", values[0])),
                _ => parts.push(format!("{name}=[{}]", values.join(", "))),
            }
        }
        for container in self.matched_subgroups() {
            for occurrence in container.matches() {
                parts.push(occurrence.describe(command));
            }
        }
        format!("{{{}}}", parts.join(" "))
    }
}

/// Occurrences of one group, in the order they were opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMatchContainer {
    group: GroupId,
    matches: Vec<GroupMatch>,
}

impl GroupMatchContainer {
    fn new(group: GroupId) -> Self {
        Self {
            group,
            matches: Vec::new(),
        }
    }

    pub fn group(&self) -> GroupId {
        self.group
    }

    pub fn matches(&self) -> &[GroupMatch] {
        &self.matches
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// The last occurrence, or a new one when `open` is set or none exists.
    fn current_or_open(&mut self, group: &ArgGroupSpec, open: bool) -> &mut GroupMatch {
        if open || self.matches.is_empty() {
            if let Some(last) = self.matches.last_mut() {
                last.close();
            }
            self.matches.push(GroupMatch::new(group));
        }
        let last = self.matches.len() - 1;
        &mut self.matches[last]
    }

    fn close(&mut self) {
        for occurrence in &mut self.matches {
            occurrence.close();
        }
    }
}

/// Match trees of every attached group of one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupMatches {
    containers: IndexMap<GroupId, GroupMatchContainer>,
}

impl GroupMatches {
    /// Occurrences of a top-level group; `None` when it never matched.
    pub fn container(&self, id: GroupId) -> Option<&GroupMatchContainer> {
        self.containers.get(&id)
    }

    pub fn containers(&self) -> impl Iterator<Item = &GroupMatchContainer> {
        self.containers.values()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.values().all(GroupMatchContainer::is_empty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Append,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Clean,
    /// An exclusive occurrence already holding another member.
    Exclusive,
    /// The occurrence cannot take this argument again.
    Full,
}

/// Routes matched arguments into a [`GroupMatches`] tree.
///
/// # Examples
///
/// ```
/// use argspec_core::*;
///
/// let mut cmd = CommandSpec::new("tool");
/// let a = cmd.add_option(OptionSpec::with_value(&["-a"])).unwrap();
/// let group = cmd
///     .build_group(ArgGroupSpec::builder().arg(a).multiplicity(Range::exactly(2)))
///     .unwrap();
/// cmd.add_group(group).unwrap();
///
/// let mut matcher = GroupMatcher::new(&cmd);
/// matcher.record(a, vec!["1".into()]).unwrap();
/// matcher.record(a, vec!["2".into()]).unwrap();
///
/// let matches = matcher.finish();
/// let container = matches.container(group).unwrap();
/// assert_eq!(container.len(), 2);
/// assert_eq!(container.matches()[1].matched_values(a), Some(&["2".to_string()][..]));
/// ```
#[derive(Debug)]
pub struct GroupMatcher<'c> {
    command: &'c CommandSpec,
    root: GroupMatches,
}

impl<'c> GroupMatcher<'c> {
    pub fn new(command: &'c CommandSpec) -> Self {
        Self {
            command,
            root: GroupMatches::default(),
        }
    }

    pub fn matches(&self) -> &GroupMatches {
        &self.root
    }

    /// Records one option occurrence or one positional value.
    ///
    /// Returns `Ok(false)` when `arg` belongs to no group. Fails with
    /// [`ValidationError::MaxValuesExceeded`] when no occurrence on the path
    /// can take the event.
    pub fn record(&mut self, arg: ArgId, values: Vec<String>) -> Result<bool, ValidationError> {
        let path = self.command.group_path(arg);
        let Some(&top) = path.first() else {
            return Ok(false);
        };

        let container = self.root.containers.get(&top);
        let strict = self.plan(&path, 0, arg, container, false);
        let steps = match strict {
            Some(steps) => steps,
            None => match self.plan(&path, 0, arg, container, true) {
                Some(steps) => {
                    debug!(arg = %self.command.arg(arg).display_name(), "Routed into a complete occurrence");
                    steps
                }
                None => return Err(self.max_values_exceeded(top, arg, &values)),
            },
        };

        debug!(arg = %self.command.arg(arg).display_name(), ?steps, "Routed argument");
        self.apply(&path, &steps, arg, values);
        Ok(true)
    }

    /// Closes every occurrence and returns the tree.
    pub fn finish(mut self) -> GroupMatches {
        for container in self.root.containers.values_mut() {
            container.close();
        }
        self.root
    }

    fn plan(
        &self,
        path: &[GroupId],
        depth: usize,
        arg: ArgId,
        container: Option<&GroupMatchContainer>,
        lenient: bool,
    ) -> Option<Vec<Step>> {
        let group = self.command.group(path[depth]);
        let owner_level = depth + 1 == path.len();
        let member = if owner_level {
            Member::Arg(arg)
        } else {
            Member::Group(path[depth + 1])
        };

        let last = container.and_then(|c| c.matches.last());
        let admission = last.map(|occurrence| self.admit(group, occurrence, member));

        let descend = |occurrence: &GroupMatch| -> Option<Vec<Step>> {
            if owner_level {
                return Some(vec![Step::Append]);
            }
            let nested = occurrence.subgroup(path[depth + 1]);
            let mut steps = self.plan(path, depth + 1, arg, nested, lenient)?;
            steps.insert(0, Step::Append);
            Some(steps)
        };

        if let (Some(occurrence), Some(Admission::Clean)) = (last, admission)
            && let Some(steps) = descend(occurrence)
        {
            return Some(steps);
        }

        let count = container.map_or(0, GroupMatchContainer::len);
        if group.multiplicity().admits_more_than(count) {
            return Some(vec![Step::Open; path.len() - depth]);
        }

        if lenient
            && let (Some(occurrence), Some(Admission::Exclusive)) = (last, admission)
        {
            return descend(occurrence);
        }
        None
    }

    fn admit(&self, group: &ArgGroupSpec, occurrence: &GroupMatch, member: Member) -> Admission {
        if let Member::Arg(arg) = member {
            match self.command.arg(arg) {
                ArgSpec::Option(_) => {
                    if occurrence.is_present(arg) {
                        return Admission::Full;
                    }
                }
                ArgSpec::Positional(positional) => {
                    let count = occurrence.matched_values(arg).map_or(0, <[String]>::len);
                    if !positional.arity.admits_more_than(count) {
                        return Admission::Full;
                    }
                    let later_filled = group.args().any(|other| {
                        self.command
                            .arg(other)
                            .as_positional()
                            .is_some_and(|p| p.index > positional.index)
                            && occurrence.is_present(other)
                    });
                    if later_filled {
                        return Admission::Full;
                    }
                }
            }
        }
        if group.exclusive() && occurrence.holds_other_than(member) {
            return Admission::Exclusive;
        }
        Admission::Clean
    }

    fn apply(&mut self, path: &[GroupId], steps: &[Step], arg: ArgId, values: Vec<String>) {
        let command = self.command;
        let mut container = self
            .root
            .containers
            .entry(path[0])
            .or_insert_with(|| GroupMatchContainer::new(path[0]));

        for (depth, step) in steps.iter().enumerate() {
            let group = command.group(path[depth]);
            let occurrence = container.current_or_open(group, *step == Step::Open);
            match path.get(depth + 1) {
                Some(next) => {
                    container = occurrence
                        .subgroups
                        .entry(*next)
                        .or_insert_with(|| GroupMatchContainer::new(*next));
                }
                None => {
                    occurrence.push(arg, values);
                    return;
                }
            }
        }
    }

    fn max_values_exceeded(&self, top: GroupId, arg: ArgId, values: &[String]) -> ValidationError {
        let group = self.command.group(top);
        let synopsis = self.command.group_synopsis(top);
        let mut attempted = GroupMatch::new(group);
        attempted.values.insert(arg, values.to_vec());

        let mut occurrences: Vec<String> = self
            .root
            .container(top)
            .map(|container| {
                container
                    .matches()
                    .iter()
                    .map(|occurrence| format!("{synopsis}={}", occurrence.describe(self.command)))
                    .collect()
            })
            .unwrap_or_default();
        occurrences.push(format!("{synopsis}={}", attempted.describe(self.command)));

        debug!(group = %synopsis, ?occurrences, "Group cannot take more occurrences");
        ValidationError::MaxValuesExceeded {
            group: synopsis,
            max: group.multiplicity().max().unwrap_or(u32::MAX),
            occurrences,
        }
    }
}
