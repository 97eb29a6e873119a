//! Bracketed grammar strings for arguments, groups and whole commands.
//!
//! Rendering is a pure function of the command definition:
//!
//! * exclusive members are joined with `" | "`, co-occurring ones with `" "`;
//! * a group with a minimum of at least one is wrapped in `()`, otherwise `[]`;
//! * the unit is repeated up to the minimum, then followed by `...` when the
//!   maximum is unbounded, or by optional `[...]` units up to the maximum;
//! * bounds above [`MAX_EXPANDED_UNITS`] collapse to a single repeated unit.

use crate::command::CommandSpec;
use crate::group::Member;
use crate::types::{ArgId, ArgSpec, GroupId};

/// Largest multiplicity bound rendered unit by unit.
pub const MAX_EXPANDED_UNITS: u32 = 8;

impl CommandSpec {
    /// Synopsis fragment of a single argument, e.g. `-o=<file>` or `[<rest>...]`.
    pub fn arg_synopsis(&self, id: ArgId) -> String {
        match self.arg(id) {
            ArgSpec::Option(option) => {
                let name = option.display_name();
                let arity = option.arity;
                if !option.takes_value() {
                    return name.to_string();
                }
                let repeat = if arity.max().is_none_or(|max| max > 1) {
                    "..."
                } else {
                    ""
                };
                let label = format!("<{}>{repeat}", option.label());
                if arity.min() == 0 {
                    format!("{name}[={label}]")
                } else {
                    format!("{name}={label}")
                }
            }
            ArgSpec::Positional(positional) => {
                let arity = positional.arity;
                let repeat = if arity.max().is_none_or(|max| max > 1) {
                    "..."
                } else {
                    ""
                };
                let label = format!("<{}>{repeat}", positional.label);
                if arity.min() == 0 {
                    format!("[{label}]")
                } else {
                    label
                }
            }
        }
    }

    /// Fragment of a group member as it appears inside its group.
    pub(crate) fn member_synopsis(&self, group: GroupId, member: Member) -> String {
        match member {
            Member::Group(sub) => self.group_synopsis(sub),
            Member::Arg(arg) => {
                let fragment = self.arg_synopsis(arg);
                let optional =
                    !self.group(group).exclusive() && !self.arg(arg).is_required_in_group();
                if optional && !is_bracketed(&fragment) {
                    format!("[{fragment}]")
                } else {
                    fragment
                }
            }
        }
    }

    /// Synopsis of a group and its subgroups.
    pub fn group_synopsis(&self, id: GroupId) -> String {
        let group = self.group(id);
        let separator = if group.exclusive() { " | " } else { " " };
        let body = group
            .members()
            .iter()
            .map(|member| self.member_synopsis(id, *member))
            .collect::<Vec<_>>()
            .join(separator);

        let multiplicity = group.multiplicity();
        let required = format!("({body})");
        let optional = format!("[{body}]");

        let bound = multiplicity.max().unwrap_or(multiplicity.min());
        if bound > MAX_EXPANDED_UNITS {
            return if multiplicity.min() > 0 {
                format!("{required}...")
            } else {
                format!("{optional}...")
            };
        }

        let mut units: Vec<String> = Vec::new();
        for _ in 0..multiplicity.min() {
            units.push(required.clone());
        }
        match multiplicity.max() {
            None => match units.last_mut() {
                Some(last) => last.push_str("..."),
                None => units.push(format!("{optional}...")),
            },
            Some(max) => {
                for _ in multiplicity.min()..max {
                    units.push(optional.clone());
                }
            }
        }
        units.join(" ")
    }

    /// One-line synopsis of the command: free options, free positionals,
    /// groups by `order`, then `[COMMAND]` when subcommands exist.
    pub fn synopsis(&self) -> String {
        let mut parts = vec![self.name().to_string()];

        for (id, arg) in self.args() {
            if !arg.is_option() || self.group_of(id).is_some() {
                continue;
            }
            let fragment = self.arg_synopsis(id);
            if arg.is_required() {
                parts.push(fragment);
            } else {
                parts.push(format!("[{fragment}]"));
            }
        }

        for id in self.positionals() {
            if self.group_of(id).is_some() {
                continue;
            }
            let fragment = self.arg_synopsis(id);
            if self.arg(id).is_required() || is_bracketed(&fragment) {
                parts.push(fragment);
            } else {
                parts.push(format!("[{fragment}]"));
            }
        }

        let mut groups = self.top_level_groups().to_vec();
        groups.sort_by_key(|id| self.group(*id).order());
        parts.extend(groups.into_iter().map(|id| self.group_synopsis(id)));

        if !self.subcommands().is_empty() {
            parts.push("[COMMAND]".to_string());
        }
        parts.join(" ")
    }
}

/// Whether the whole fragment is one `[...]` unit.
fn is_bracketed(fragment: &str) -> bool {
    if !fragment.starts_with('[') {
        return false;
    }
    let mut depth = 0usize;
    for (idx, c) in fragment.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return idx + 1 == fragment.len();
                }
            }
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArgGroupSpec, OptionSpec, PositionalSpec, Range};

    #[test]
    fn test_arg_synopsis_forms() {
        let mut cmd = CommandSpec::new("tool");
        let flag = cmd.add_option(OptionSpec::flag(&["-v", "--verbose"])).unwrap();
        let value = cmd.add_option(OptionSpec::with_value(&["-o", "--output"])).unwrap();
        let optional = cmd
            .add_option(
                OptionSpec::with_value(&["--color"])
                    .with_arity(Range::new(0, 1).unwrap())
                    .with_param_label("when"),
            )
            .unwrap();
        let multi = cmd
            .add_option(OptionSpec::with_value(&["-D"]).with_arity(Range::at_least(1)))
            .unwrap();
        let file = cmd.add_positional(PositionalSpec::new(0, "file"));
        let rest = cmd.add_positional(PositionalSpec::new(1, "rest").with_arity(Range::at_least(0)));

        assert_eq!(cmd.arg_synopsis(flag), "-v");
        assert_eq!(cmd.arg_synopsis(value), "-o=<output>");
        assert_eq!(cmd.arg_synopsis(optional), "--color[=<when>]");
        assert_eq!(cmd.arg_synopsis(multi), "-D=<D>...");
        assert_eq!(cmd.arg_synopsis(file), "<file>");
        assert_eq!(cmd.arg_synopsis(rest), "[<rest>...]");
    }

    #[test]
    fn test_group_multiplicity_forms() {
        let cases = [
            (Range::optional(), "[-a | -b]"),
            (Range::exactly(1), "(-a | -b)"),
            (Range::exactly(2), "(-a | -b) (-a | -b)"),
            (Range::at_least(0), "[-a | -b]..."),
            (Range::at_least(1), "(-a | -b)..."),
            (Range::new(1, 3).unwrap(), "(-a | -b) [-a | -b] [-a | -b]"),
            (Range::new(0, 4_000_000_000).unwrap(), "[-a | -b]..."),
            (Range::exactly(50), "(-a | -b)..."),
        ];
        for (multiplicity, expected) in cases {
            let mut cmd = CommandSpec::new("tool");
            let a = cmd.add_option(OptionSpec::flag(&["-a"])).unwrap();
            let b = cmd.add_option(OptionSpec::flag(&["-b"])).unwrap();
            let group = cmd
                .build_group(ArgGroupSpec::builder().args([a, b]).multiplicity(multiplicity))
                .unwrap();
            assert_eq!(cmd.group_synopsis(group), expected, "multiplicity {multiplicity}");
        }
    }

    #[test]
    fn test_co_occurring_optional_members_bracketed() {
        let mut cmd = CommandSpec::new("tool");
        let a = cmd.add_option(OptionSpec::flag(&["-a"])).unwrap();
        let b = cmd.add_option(OptionSpec::flag(&["-b"]).required(false)).unwrap();
        let rest = cmd.add_positional(PositionalSpec::new(0, "rest").with_arity(Range::at_least(0)));
        let group = cmd
            .build_group(
                ArgGroupSpec::builder()
                    .args([a, b, rest])
                    .exclusive(false)
                    .multiplicity(Range::exactly(1)),
            )
            .unwrap();
        assert_eq!(cmd.group_synopsis(group), "(-a [-b] [<rest>...])");
    }

    #[test]
    fn test_nested_group_synopsis() {
        let mut cmd = CommandSpec::new("tool");
        let x = cmd.add_option(OptionSpec::flag(&["-x"])).unwrap();
        let y = cmd.add_option(OptionSpec::flag(&["-y"])).unwrap();
        let a = cmd.add_option(OptionSpec::with_value(&["-a"])).unwrap();
        let b = cmd.add_option(OptionSpec::with_value(&["-b"])).unwrap();
        let inner = cmd
            .build_group(ArgGroupSpec::builder().args([x, y]).multiplicity(Range::exactly(1)))
            .unwrap();
        let outer = cmd
            .build_group(
                ArgGroupSpec::builder()
                    .args([a, b])
                    .subgroup(inner)
                    .exclusive(false)
                    .multiplicity(Range::at_least(0)),
            )
            .unwrap();
        assert_eq!(cmd.group_synopsis(outer), "[-a=<a> -b=<b> (-x | -y)]...");
    }

    #[test]
    fn test_command_synopsis_order() {
        let mut cmd = CommandSpec::new("tool");
        let req = cmd.add_option(OptionSpec::with_value(&["--name"]).required(true)).unwrap();
        cmd.add_option(OptionSpec::flag(&["-q"])).unwrap();
        cmd.add_positional(PositionalSpec::new(0, "input"));
        cmd.add_positional(PositionalSpec::new(1, "extra").with_arity(Range::at_least(0)));
        let a = cmd.add_option(OptionSpec::flag(&["-a"])).unwrap();
        let b = cmd.add_option(OptionSpec::flag(&["-b"])).unwrap();
        let later = cmd
            .build_group(ArgGroupSpec::builder().arg(a).order(2))
            .unwrap();
        let earlier = cmd
            .build_group(ArgGroupSpec::builder().arg(b).order(1))
            .unwrap();
        cmd.add_group(later).unwrap();
        cmd.add_group(earlier).unwrap();
        cmd.add_subcommand(CommandSpec::new("sub")).unwrap();

        assert!(cmd.arg(req).is_required());
        assert_eq!(
            cmd.synopsis(),
            "tool --name=<name> [-q] <input> [<extra>...] [-b] [-a] [COMMAND]"
        );
    }

    #[test]
    fn test_is_bracketed() {
        assert!(is_bracketed("[-a]"));
        assert!(is_bracketed("[-a [-b]]"));
        assert!(!is_bracketed("[-a] [-b]"));
        assert!(!is_bracketed("-a"));
        assert!(!is_bracketed("[-a]..."));
    }
}
