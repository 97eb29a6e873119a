//! Command model: arguments, group arena, subcommands and name resolution.
//!
//! A [`CommandSpec`] owns every argument and group declared for one command.
//! Groups reference arguments and each other by handle, so the whole tree can
//! be borrowed immutably while a command line is parsed.
//!
//! # Examples
//!
//! ```
//! use argspec_core::*;
//!
//! let mut cmd = CommandSpec::new("fetch");
//! cmd.set_abbreviate_options(true);
//! let depth = cmd.add_option(OptionSpec::with_value(&["--max-depth"])).unwrap();
//! cmd.add_option(OptionSpec::flag(&["--verbose"])).unwrap();
//!
//! assert_eq!(cmd.resolve_option("--m-d").unwrap(), depth);
//! assert!(cmd.resolve_option("--nope").is_err());
//! ```

use tracing::debug;

use crate::abbrev::{MatchError, match_abbreviation};
use crate::error::SpecError;
use crate::group::{ArgGroupBuilder, ArgGroupSpec, Member};
use crate::map::{CaseAwareMap, Locale};
use crate::types::{ArgId, ArgSpec, GroupId, OptionSpec, PositionalSpec};

/// One command (or subcommand) and everything it accepts.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    name: String,
    description: Option<String>,
    aliases: Vec<String>,
    args: Vec<ArgSpec>,
    groups: Vec<ArgGroupSpec>,
    top_level: Vec<GroupId>,
    /// Owning group per argument, filled when a tree is attached.
    arg_owner: Vec<Option<GroupId>>,
    options: CaseAwareMap<String, ArgId>,
    subcommands: CaseAwareMap<String, usize>,
    commands: Vec<CommandSpec>,
    abbreviate_options: bool,
    abbreviate_subcommands: bool,
}

impl CommandSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            aliases: Vec::new(),
            args: Vec::new(),
            groups: Vec::new(),
            top_level: Vec::new(),
            arg_owner: Vec::new(),
            options: CaseAwareMap::new(),
            subcommands: CaseAwareMap::new(),
            commands: Vec::new(),
            abbreviate_options: false,
            abbreviate_subcommands: false,
        }
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Adds an alternative name used when this command is a subcommand.
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn abbreviate_options(&self) -> bool {
        self.abbreviate_options
    }

    pub fn set_abbreviate_options(&mut self, enabled: bool) {
        self.abbreviate_options = enabled;
    }

    pub fn abbreviate_subcommands(&self) -> bool {
        self.abbreviate_subcommands
    }

    pub fn set_abbreviate_subcommands(&mut self, enabled: bool) {
        self.abbreviate_subcommands = enabled;
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.options.is_case_insensitive()
    }

    /// Switches option and subcommand lookup to (in)sensitive mode.
    ///
    /// Fails without changing either map when two names would collide.
    pub fn set_case_insensitive(&mut self, insensitive: bool) -> Result<(), SpecError> {
        let previous = self.options.is_case_insensitive();
        self.options.set_case_insensitive(insensitive)?;
        if let Err(err) = self.subcommands.set_case_insensitive(insensitive) {
            self.options.set_case_insensitive(previous)?;
            return Err(err.into());
        }
        Ok(())
    }

    pub fn locale(&self) -> &Locale {
        self.options.locale()
    }

    pub fn set_locale(&mut self, locale: Locale) -> Result<(), SpecError> {
        let previous = self.options.locale().clone();
        self.options.set_locale(locale.clone())?;
        if let Err(err) = self.subcommands.set_locale(locale) {
            self.options.set_locale(previous)?;
            return Err(err.into());
        }
        Ok(())
    }

    /// Registers an option under all of its names.
    pub fn add_option(&mut self, option: OptionSpec) -> Result<ArgId, SpecError> {
        if option.names.is_empty() {
            return Err(SpecError::MissingOptionName);
        }
        for (idx, name) in option.names.iter().enumerate() {
            if !name.starts_with('-') || name.chars().all(|c| c == '-') {
                return Err(SpecError::InvalidOptionName(name.clone()));
            }
            let repeated = option.names[..idx]
                .iter()
                .any(|earlier| self.same_option_name(earlier, name));
            if repeated || self.options.contains_key(name) {
                return Err(SpecError::DuplicateOption(name.clone()));
            }
        }

        let id = ArgId(self.args.len());
        for name in &option.names {
            self.options.insert(name.clone(), id);
        }
        self.args.push(ArgSpec::Option(option));
        self.arg_owner.push(None);
        Ok(id)
    }

    fn same_option_name(&self, left: &str, right: &str) -> bool {
        if self.options.is_case_insensitive() {
            let locale = self.options.locale();
            locale.to_lowercase(left) == locale.to_lowercase(right)
        } else {
            left == right
        }
    }

    pub fn add_positional(&mut self, positional: PositionalSpec) -> ArgId {
        let id = ArgId(self.args.len());
        self.args.push(ArgSpec::Positional(positional));
        self.arg_owner.push(None);
        id
    }

    /// Registers a subcommand under its name and aliases.
    pub fn add_subcommand(&mut self, command: CommandSpec) -> Result<(), SpecError> {
        let names: Vec<String> = std::iter::once(command.name.clone())
            .chain(command.aliases.iter().cloned())
            .collect();
        for (idx, name) in names.iter().enumerate() {
            let repeated = names[..idx]
                .iter()
                .any(|earlier| self.same_option_name(earlier, name));
            if repeated || self.subcommands.contains_key(name) {
                return Err(SpecError::DuplicateSubcommand(name.clone()));
            }
        }

        let index = self.commands.len();
        for name in names {
            self.subcommands.insert(name, index);
        }
        self.commands.push(command);
        Ok(())
    }

    /// Validates a group definition and stores it in the arena.
    ///
    /// The group becomes the parent of every subgroup it lists. It is not
    /// attached to the command until [`add_group`](Self::add_group).
    pub fn build_group(&mut self, builder: ArgGroupBuilder) -> Result<GroupId, SpecError> {
        if builder.members.is_empty() {
            return Err(SpecError::EmptyGroup);
        }
        if builder.multiplicity.max() == Some(0) {
            return Err(SpecError::InvalidMultiplicity(builder.multiplicity));
        }

        let id = GroupId(self.groups.len());
        let mut members: Vec<Member> = Vec::with_capacity(builder.members.len());
        for member in builder.members {
            match member {
                Member::Arg(arg) if arg.0 >= self.args.len() => {
                    return Err(SpecError::UnknownHandle {
                        kind: "argument",
                        index: arg.0,
                    });
                }
                Member::Group(group) if group.0 >= self.groups.len() => {
                    return Err(SpecError::UnknownHandle {
                        kind: "group",
                        index: group.0,
                    });
                }
                Member::Group(group) => {
                    if let Some(parent) = self.groups[group.0].parent {
                        return Err(SpecError::SubgroupReused {
                            group: self.group_synopsis(group),
                            parent: self.group_synopsis(parent),
                        });
                    }
                    if members.contains(&member) {
                        return Err(SpecError::SubgroupReused {
                            group: self.group_synopsis(group),
                            parent: "the same group twice".to_string(),
                        });
                    }
                    if self.top_level.contains(&group) {
                        return Err(SpecError::NestedGroupAttached {
                            group: self.group_synopsis(group),
                        });
                    }
                }
                Member::Arg(_) => {}
            }
            if !members.contains(&member) {
                members.push(member);
            }
        }

        for member in &members {
            if let Member::Group(group) = member {
                self.groups[group.0].parent = Some(id);
            }
        }
        self.groups.push(ArgGroupSpec {
            id,
            members,
            exclusive: builder.exclusive,
            multiplicity: builder.multiplicity,
            validate: builder.validate,
            heading: builder.heading,
            order: builder.order,
            parent: None,
        });
        Ok(id)
    }

    /// Attaches a top-level group tree to the command.
    ///
    /// Every argument in the tree must not belong to any other group of this
    /// command, including another group of the same tree.
    pub fn add_group(&mut self, id: GroupId) -> Result<(), SpecError> {
        let group = self.groups.get(id.0).ok_or(SpecError::UnknownHandle {
            kind: "group",
            index: id.0,
        })?;
        if group.parent.is_some() {
            return Err(SpecError::NestedGroupAttached {
                group: self.group_synopsis(id),
            });
        }
        if self.top_level.contains(&id) {
            return Err(SpecError::AlreadyAttached {
                group: self.group_synopsis(id),
            });
        }

        let mut owned: Vec<(ArgId, GroupId)> = Vec::new();
        self.collect_owned(id, &mut owned);
        for (idx, (arg, owner)) in owned.iter().enumerate() {
            let first = owned[..idx]
                .iter()
                .find(|(earlier, _)| earlier == arg)
                .map(|(_, group)| *group)
                .or(self.arg_owner[arg.0]);
            if let Some(first) = first {
                return Err(SpecError::CrossGroupOwnership {
                    arg: self.args[arg.0].display_name(),
                    first: self.group_synopsis(first),
                    second: self.group_synopsis(*owner),
                });
            }
        }

        for (arg, owner) in owned {
            self.arg_owner[arg.0] = Some(owner);
        }
        self.top_level.push(id);
        debug!(group = %self.group_synopsis(id), "Attached argument group");
        Ok(())
    }

    fn collect_owned(&self, id: GroupId, owned: &mut Vec<(ArgId, GroupId)>) {
        for member in &self.groups[id.0].members {
            match member {
                Member::Arg(arg) => owned.push((*arg, id)),
                Member::Group(group) => self.collect_owned(*group, owned),
            }
        }
    }

    pub fn arg(&self, id: ArgId) -> &ArgSpec {
        &self.args[id.0]
    }

    pub fn args(&self) -> impl Iterator<Item = (ArgId, &ArgSpec)> {
        self.args.iter().enumerate().map(|(idx, arg)| (ArgId(idx), arg))
    }

    /// Positional parameters ordered by index, then declaration.
    pub fn positionals(&self) -> Vec<ArgId> {
        let mut positionals: Vec<(usize, ArgId)> = self
            .args()
            .filter_map(|(id, arg)| arg.as_positional().map(|p| (p.index, id)))
            .collect();
        positionals.sort_by_key(|(index, _)| *index);
        positionals.into_iter().map(|(_, id)| id).collect()
    }

    pub fn group(&self, id: GroupId) -> &ArgGroupSpec {
        &self.groups[id.0]
    }

    pub fn groups(&self) -> &[ArgGroupSpec] {
        &self.groups
    }

    /// Attached groups in attach order.
    pub fn top_level_groups(&self) -> &[GroupId] {
        &self.top_level
    }

    /// The attached group owning `arg` directly.
    pub fn group_of(&self, arg: ArgId) -> Option<GroupId> {
        self.arg_owner.get(arg.0).copied().flatten()
    }

    /// Groups from the top-level group down to the owner of `arg`.
    pub fn group_path(&self, arg: ArgId) -> Vec<GroupId> {
        let mut path = Vec::new();
        let mut current = self.group_of(arg);
        while let Some(id) = current {
            path.push(id);
            current = self.groups[id.0].parent;
        }
        path.reverse();
        path
    }

    pub fn options(&self) -> &CaseAwareMap<String, ArgId> {
        &self.options
    }

    pub fn subcommands(&self) -> &[CommandSpec] {
        &self.commands
    }

    /// Resolves an option name, accepting abbreviations when enabled.
    pub fn resolve_option(&self, token: &str) -> Result<ArgId, MatchError> {
        if self.abbreviate_options {
            let resolved =
                match_abbreviation(&self.options, token, self.options.is_case_insensitive())?;
            return Ok(*resolved.value);
        }
        self.options
            .get(&token.to_string())
            .copied()
            .ok_or_else(|| MatchError::Unknown {
                token: token.to_string(),
            })
    }

    /// Resolves a subcommand name or alias, accepting abbreviations when enabled.
    pub fn resolve_subcommand(&self, token: &str) -> Result<&CommandSpec, MatchError> {
        let index = if self.abbreviate_subcommands {
            *match_abbreviation(
                &self.subcommands,
                token,
                self.subcommands.is_case_insensitive(),
            )?
            .value
        } else {
            self.subcommands
                .get(&token.to_string())
                .copied()
                .ok_or_else(|| MatchError::Unknown {
                    token: token.to_string(),
                })?
        };
        Ok(&self.commands[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Range;
    use crate::error::ErrorKind;

    fn flags(cmd: &mut CommandSpec, names: &[&str]) -> Vec<ArgId> {
        names
            .iter()
            .map(|name| cmd.add_option(OptionSpec::flag(&[name])).unwrap())
            .collect()
    }

    #[test]
    fn test_option_names_are_validated() {
        let mut cmd = CommandSpec::new("tool");
        assert_eq!(
            cmd.add_option(OptionSpec::flag(&[])),
            Err(SpecError::MissingOptionName)
        );
        assert_eq!(
            cmd.add_option(OptionSpec::flag(&["name"])),
            Err(SpecError::InvalidOptionName("name".to_string()))
        );
        assert_eq!(
            cmd.add_option(OptionSpec::flag(&["--"])),
            Err(SpecError::InvalidOptionName("--".to_string()))
        );
        cmd.add_option(OptionSpec::flag(&["-v", "--verbose"])).unwrap();
        assert_eq!(
            cmd.add_option(OptionSpec::flag(&["--verbose"])),
            Err(SpecError::DuplicateOption("--verbose".to_string()))
        );
        assert_eq!(cmd.options().len(), 2);
    }

    #[test]
    fn test_case_insensitive_rejects_folded_duplicates() {
        let mut cmd = CommandSpec::new("tool");
        cmd.add_option(OptionSpec::flag(&["-a"])).unwrap();
        cmd.add_option(OptionSpec::flag(&["-A"])).unwrap();
        cmd.add_subcommand(CommandSpec::new("run")).unwrap();

        let err = cmd.set_case_insensitive(true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateKey);
        assert!(!cmd.is_case_insensitive());
        assert!(cmd.resolve_subcommand("RUN").is_err());
    }

    #[test]
    fn test_case_insensitive_resolution() {
        let mut cmd = CommandSpec::new("tool");
        let verbose = cmd.add_option(OptionSpec::flag(&["--verbose"])).unwrap();
        cmd.add_subcommand(CommandSpec::new("status").with_alias("st"))
            .unwrap();
        cmd.set_case_insensitive(true).unwrap();

        assert_eq!(cmd.resolve_option("--VERBOSE").unwrap(), verbose);
        assert_eq!(cmd.resolve_subcommand("ST").unwrap().name(), "status");
        assert_eq!(
            cmd.add_option(OptionSpec::flag(&["--Verbose"])),
            Err(SpecError::DuplicateOption("--Verbose".to_string()))
        );
    }

    #[test]
    fn test_subcommand_abbreviation() {
        let mut cmd = CommandSpec::new("git");
        cmd.add_subcommand(CommandSpec::new("commit")).unwrap();
        cmd.add_subcommand(CommandSpec::new("cherry-pick")).unwrap();
        cmd.add_subcommand(CommandSpec::new("checkout")).unwrap();

        assert!(cmd.resolve_subcommand("co").is_err());
        cmd.set_abbreviate_subcommands(true);
        assert_eq!(cmd.resolve_subcommand("co").unwrap().name(), "commit");
        assert_eq!(cmd.resolve_subcommand("c-p").unwrap().name(), "cherry-pick");
        let err = cmd.resolve_subcommand("ch").unwrap_err();
        assert_eq!(
            err.to_string(),
            "'ch' is not unique: it matches 'cherry-pick', 'checkout'"
        );
    }

    #[test]
    fn test_duplicate_subcommand_alias() {
        let mut cmd = CommandSpec::new("tool");
        cmd.add_subcommand(CommandSpec::new("list").with_alias("ls"))
            .unwrap();
        assert_eq!(
            cmd.add_subcommand(CommandSpec::new("dir").with_alias("ls")),
            Err(SpecError::DuplicateSubcommand("ls".to_string()))
        );
    }

    #[test]
    fn test_build_group_rejects_empty_and_zero_multiplicity() {
        let mut cmd = CommandSpec::new("tool");
        let err = cmd.build_group(ArgGroupSpec::builder()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "ArgGroup has no options or positional parameters, and no subgroups"
        );

        let a = flags(&mut cmd, &["-a"])[0];
        let err = cmd
            .build_group(ArgGroupSpec::builder().arg(a).multiplicity(Range::exactly(0)))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidMultiplicity);
        assert_eq!(
            err.to_string(),
            "ArgGroup must have multiplicity that allows at least one occurrence, but had multiplicity=0"
        );
    }

    #[test]
    fn test_build_group_rejects_unknown_handles() {
        let mut cmd = CommandSpec::new("tool");
        assert_eq!(
            cmd.build_group(ArgGroupSpec::builder().arg(ArgId(3))),
            Err(SpecError::UnknownHandle {
                kind: "argument",
                index: 3
            })
        );
        assert_eq!(
            cmd.build_group(ArgGroupSpec::builder().subgroup(GroupId(0))),
            Err(SpecError::UnknownHandle {
                kind: "group",
                index: 0
            })
        );
    }

    #[test]
    fn test_subgroup_has_single_parent() {
        let mut cmd = CommandSpec::new("tool");
        let ids = flags(&mut cmd, &["-a", "-b", "-c"]);
        let inner = cmd.build_group(ArgGroupSpec::builder().arg(ids[0])).unwrap();
        let outer = cmd
            .build_group(ArgGroupSpec::builder().arg(ids[1]).subgroup(inner))
            .unwrap();
        assert_eq!(cmd.group(inner).parent(), Some(outer));

        let err = cmd
            .build_group(ArgGroupSpec::builder().arg(ids[2]).subgroup(inner))
            .unwrap_err();
        assert!(matches!(err, SpecError::SubgroupReused { .. }));
    }

    #[test]
    fn test_add_group_rejects_nested_and_repeated() {
        let mut cmd = CommandSpec::new("tool");
        let ids = flags(&mut cmd, &["-a", "-b"]);
        let inner = cmd.build_group(ArgGroupSpec::builder().arg(ids[0])).unwrap();
        let outer = cmd
            .build_group(ArgGroupSpec::builder().arg(ids[1]).subgroup(inner))
            .unwrap();

        let err = cmd.add_group(inner).unwrap_err();
        assert!(
            err.to_string()
                .starts_with("Groups that are part of another group should not be added")
        );

        cmd.add_group(outer).unwrap();
        let err = cmd.add_group(outer).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyAttached);
        assert_eq!(
            err.to_string(),
            "The specified group [-b | [-a]] has already been added to the command"
        );
        assert_eq!(cmd.group_path(ids[0]), vec![outer, inner]);
        assert_eq!(cmd.group_of(ids[1]), Some(outer));
    }

    #[test]
    fn test_cross_group_ownership_within_tree() {
        let mut cmd = CommandSpec::new("tool");
        let ids = flags(&mut cmd, &["-a", "-b"]);
        let inner = cmd
            .build_group(
                ArgGroupSpec::builder()
                    .args([ids[0], ids[1]])
                    .exclusive(false)
                    .multiplicity(Range::exactly(1)),
            )
            .unwrap();
        let outer = cmd
            .build_group(
                ArgGroupSpec::builder()
                    .arg(ids[0])
                    .subgroup(inner)
                    .multiplicity(Range::exactly(1)),
            )
            .unwrap();

        let err = cmd.add_group(outer).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CrossGroupOwnership);
        assert!(err.to_string().starts_with(
            "An option cannot be in multiple groups but -a is in (-a | (-a -b)) and (-a -b)."
        ));
        assert!(cmd.top_level_groups().is_empty());
        assert_eq!(cmd.group_of(ids[0]), None);
    }

    #[test]
    fn test_cross_group_ownership_across_trees() {
        let mut cmd = CommandSpec::new("tool");
        let ids = flags(&mut cmd, &["-a", "-b"]);
        let first = cmd.build_group(ArgGroupSpec::builder().arg(ids[0])).unwrap();
        let second = cmd
            .build_group(ArgGroupSpec::builder().args([ids[0], ids[1]]))
            .unwrap();
        cmd.add_group(first).unwrap();

        let err = cmd.add_group(second).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CrossGroupOwnership);
        assert_eq!(cmd.group_of(ids[1]), None);
    }

    #[test]
    fn test_positionals_sorted_by_index() {
        let mut cmd = CommandSpec::new("cp");
        let dest = cmd.add_positional(PositionalSpec::new(1, "dest"));
        let src = cmd.add_positional(PositionalSpec::new(0, "src"));
        assert_eq!(cmd.positionals(), vec![src, dest]);
    }
}
