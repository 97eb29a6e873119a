//! Declarative command definitions.
//!
//! A definition names its groups and composes them by reference, so a group
//! tree can be written flat in YAML or JSON. Members use the same spelling as
//! the synopsis: `-x`/`--long` for options, `<label>` for positionals and a
//! bare name for another group.
//!
//! # Example YAML
//!
//! ```yaml
//! name: deploy
//! settings:
//!   abbreviate_options: true
//! options:
//!   - names: ["--host"]
//!   - names: ["--port"]
//!   - names: ["--socket"]
//! groups:
//!   - name: target
//!     multiplicity: "1"
//!     members: [tcp, --socket]
//!   - name: tcp
//!     exclusive: false
//!     members: [--host, --port]
//! ```
//!
//! Groups not referenced by another group are attached to the command unless
//! an explicit `attach` list is given.

use std::collections::{HashMap, HashSet};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use argspec_core::{
    ArgGroupSpec, ArgId, CommandSpec, GroupId, Locale, OptionSpec, PositionalSpec, Range,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DefinitionError, Result};

/// Parsing behaviour; unset fields are inherited from the parent command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_insensitive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abbreviate_options: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abbreviate_subcommands: Option<bool>,
    /// Locale tag used for case folding (e.g., `"tr"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<Locale>,
}

impl Settings {
    /// Fills unset fields from `parent`.
    pub fn inherit(&self, parent: &Settings) -> Settings {
        Settings {
            case_insensitive: self.case_insensitive.or(parent.case_insensitive),
            abbreviate_options: self.abbreviate_options.or(parent.abbreviate_options),
            abbreviate_subcommands: self.abbreviate_subcommands.or(parent.abbreviate_subcommands),
            locale: self.locale.clone().or_else(|| parent.locale.clone()),
        }
    }
}

/// A named argument group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDef {
    pub name: String,
    #[serde(default = "default_true")]
    pub exclusive: bool,
    #[serde(default)]
    pub multiplicity: Range,
    #[serde(default = "default_true")]
    pub validate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(default = "default_order")]
    pub order: i32,
    /// Options (`-x`), positionals (`<label>`) and group names, in order.
    pub members: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_order() -> i32 {
    -1
}

impl GroupDef {
    /// An exclusive, optional group.
    pub fn new(name: &str, members: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            exclusive: true,
            multiplicity: Range::optional(),
            validate: true,
            heading: None,
            order: -1,
            members: members.iter().map(|m| m.to_string()).collect(),
        }
    }

    pub fn co_occurring(mut self) -> Self {
        self.exclusive = false;
        self
    }

    pub fn with_multiplicity(mut self, multiplicity: Range) -> Self {
        self.multiplicity = multiplicity;
        self
    }
}

/// A command with its arguments, groups and subcommands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub positionals: Vec<PositionalSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupDef>,
    /// Groups to attach; defaults to every group no other group references.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attach: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subcommands: Vec<CommandDef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
}

impl Format {
    fn of(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            _ => Err(DefinitionError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

impl CommandDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            aliases: Vec::new(),
            settings: Settings::default(),
            options: Vec::new(),
            positionals: Vec::new(),
            groups: Vec::new(),
            attach: None,
            subcommands: Vec::new(),
        }
    }

    /// Loads a definition from a `.json`, `.yaml` or `.yml` file.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedFormat`](DefinitionError::UnsupportedFormat) for
    /// other extensions, [`IoError`](DefinitionError::IoError) if the file
    /// cannot be read, or a JSON/YAML error if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = Format::of(path)?;
        let reader = BufReader::new(std::fs::File::open(path)?);
        let def = match format {
            Format::Json => serde_json::from_reader(reader)?,
            Format::Yaml => serde_yaml::from_reader(reader)?,
        };
        Ok(def)
    }

    /// Saves the definition, choosing the format from the extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let format = Format::of(path)?;
        let writer = BufWriter::new(std::fs::File::create(path)?);
        match format {
            Format::Json => serde_json::to_writer_pretty(writer, self)?,
            Format::Yaml => serde_yaml::to_writer(writer, self)?,
        }
        Ok(())
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Builds the command tree.
    ///
    /// # Errors
    ///
    /// Fails on duplicate or unknown names, group cycles, and every
    /// structural error the engine reports.
    pub fn build(&self) -> Result<CommandSpec> {
        self.build_with(&Settings::default())
    }

    fn build_with(&self, parent: &Settings) -> Result<CommandSpec> {
        let settings = self.settings.inherit(parent);
        let mut cmd = CommandSpec::new(&self.name);
        if let Some(desc) = &self.description {
            cmd = cmd.with_description(desc);
        }
        for alias in &self.aliases {
            cmd = cmd.with_alias(alias);
        }

        for option in &self.options {
            cmd.add_option(option.clone())?;
        }
        let mut positionals: HashMap<&str, ArgId> = HashMap::new();
        for positional in &self.positionals {
            let id = cmd.add_positional(positional.clone());
            if positionals.insert(positional.label.as_str(), id).is_some() {
                return Err(DefinitionError::DuplicateName {
                    kind: "positional",
                    name: positional.label.clone(),
                });
            }
        }

        if let Some(locale) = &settings.locale {
            cmd.set_locale(locale.clone())?;
        }
        cmd.set_case_insensitive(settings.case_insensitive.unwrap_or(false))?;
        cmd.set_abbreviate_options(settings.abbreviate_options.unwrap_or(false));
        cmd.set_abbreviate_subcommands(settings.abbreviate_subcommands.unwrap_or(false));

        let mut assembler = GroupAssembler::new(self, &positionals)?;
        let roots = assembler.roots();
        for name in &roots {
            assembler.build(&mut cmd, name)?;
        }
        let attach: Vec<String> = match &self.attach {
            Some(names) => names.clone(),
            None => roots,
        };
        for name in &attach {
            let id = assembler.built_or_build(&mut cmd, name, &self.name)?;
            cmd.add_group(id)?;
        }

        let mut names: HashSet<&str> = HashSet::new();
        for sub in &self.subcommands {
            if !names.insert(sub.name.as_str()) {
                return Err(DefinitionError::DuplicateName {
                    kind: "subcommand",
                    name: sub.name.clone(),
                });
            }
            cmd.add_subcommand(sub.build_with(&settings)?)?;
        }

        debug!(
            command = %self.name,
            groups = attach.len(),
            subcommands = self.subcommands.len(),
            "Built command definition"
        );
        Ok(cmd)
    }
}

/// Builds named groups bottom-up.
struct GroupAssembler<'d> {
    def: &'d CommandDef,
    positionals: &'d HashMap<&'d str, ArgId>,
    by_name: HashMap<&'d str, &'d GroupDef>,
    built: HashMap<String, GroupId>,
}

impl<'d> GroupAssembler<'d> {
    fn new(def: &'d CommandDef, positionals: &'d HashMap<&'d str, ArgId>) -> Result<Self> {
        let mut by_name = HashMap::new();
        for group in &def.groups {
            if by_name.insert(group.name.as_str(), group).is_some() {
                return Err(DefinitionError::DuplicateName {
                    kind: "group",
                    name: group.name.clone(),
                });
            }
        }
        let assembler = Self {
            def,
            positionals,
            by_name,
            built: HashMap::new(),
        };
        assembler.check_cycles()?;
        Ok(assembler)
    }

    /// Groups no other group references, in declaration order.
    fn roots(&self) -> Vec<String> {
        let referenced: HashSet<&str> = self
            .def
            .groups
            .iter()
            .flat_map(|group| group.members.iter())
            .map(String::as_str)
            .filter(|member| self.by_name.contains_key(*member))
            .collect();
        self.def
            .groups
            .iter()
            .filter(|group| !referenced.contains(group.name.as_str()))
            .map(|group| group.name.clone())
            .collect()
    }

    fn check_cycles(&self) -> Result<()> {
        let mut done: HashSet<&str> = HashSet::new();
        for group in &self.def.groups {
            let mut path: Vec<&str> = Vec::new();
            self.visit(group.name.as_str(), &mut path, &mut done)?;
        }
        Ok(())
    }

    fn visit(&self, name: &'d str, path: &mut Vec<&'d str>, done: &mut HashSet<&'d str>) -> Result<()> {
        if let Some(start) = path.iter().position(|entry| *entry == name) {
            let mut cycle: Vec<&str> = path[start..].to_vec();
            cycle.push(name);
            return Err(DefinitionError::GroupCycle(cycle.join(" ")));
        }
        if done.contains(name) {
            return Ok(());
        }
        let Some(group) = self.by_name.get(name).copied() else {
            return Ok(());
        };
        path.push(name);
        for member in &group.members {
            if self.by_name.contains_key(member.as_str()) {
                self.visit(member.as_str(), path, done)?;
            }
        }
        path.pop();
        done.insert(name);
        Ok(())
    }

    fn built_or_build(&mut self, cmd: &mut CommandSpec, name: &str, owner: &str) -> Result<GroupId> {
        if let Some(id) = self.built.get(name) {
            return Ok(*id);
        }
        if !self.by_name.contains_key(name) {
            return Err(DefinitionError::UnknownReference {
                kind: "group",
                name: name.to_string(),
                owner: format!("command {owner}"),
            });
        }
        self.build(cmd, name)
    }

    fn build(&mut self, cmd: &mut CommandSpec, name: &str) -> Result<GroupId> {
        if let Some(id) = self.built.get(name) {
            return Ok(*id);
        }
        let Some(group) = self.by_name.get(name).copied() else {
            return Err(DefinitionError::UnknownReference {
                kind: "group",
                name: name.to_string(),
                owner: format!("command {}", self.def.name),
            });
        };

        let mut builder = ArgGroupSpec::builder()
            .exclusive(group.exclusive)
            .multiplicity(group.multiplicity)
            .validate(group.validate)
            .order(group.order);
        if let Some(heading) = &group.heading {
            builder = builder.heading(heading.clone());
        }

        for member in &group.members {
            builder = if self.by_name.contains_key(member.as_str()) {
                let sub = self.build(cmd, member)?;
                builder.subgroup(sub)
            } else {
                builder.arg(self.resolve_arg(cmd, member, &group.name)?)
            };
        }

        let id = cmd.build_group(builder)?;
        self.built.insert(name.to_string(), id);
        Ok(id)
    }

    fn resolve_arg(&self, cmd: &CommandSpec, member: &str, group: &str) -> Result<ArgId> {
        let unknown = |kind: &'static str| DefinitionError::UnknownReference {
            kind,
            name: member.to_string(),
            owner: format!("group {group}"),
        };
        if let Some(label) = member.strip_prefix('<').and_then(|m| m.strip_suffix('>')) {
            return self
                .positionals
                .get(label)
                .copied()
                .ok_or_else(|| unknown("positional"));
        }
        if member.starts_with('-') {
            return cmd
                .options()
                .get(&member.to_string())
                .copied()
                .ok_or_else(|| unknown("option"));
        }
        Err(unknown("group"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPLOY: &str = r#"
name: deploy
settings:
  abbreviate_options: true
options:
  - names: ["--host"]
  - names: ["--port"]
  - names: ["--socket"]
groups:
  - name: target
    multiplicity: "1"
    members: [tcp, --socket]
  - name: tcp
    exclusive: false
    members: [--host, --port]
"#;

    #[test]
    fn test_build_from_yaml() {
        let def = CommandDef::from_yaml_str(DEPLOY).unwrap();
        let cmd = def.build().unwrap();
        assert!(cmd.abbreviate_options());
        assert_eq!(cmd.top_level_groups().len(), 1);
        assert_eq!(
            cmd.synopsis(),
            "deploy ([--host=<host> --port=<port>] | --socket=<socket>)"
        );
    }

    #[test]
    fn test_group_defaults() {
        let group: GroupDef = serde_yaml::from_str("name: g\nmembers: [-a]").unwrap();
        assert!(group.exclusive);
        assert!(group.validate);
        assert_eq!(group.multiplicity, Range::optional());
        assert_eq!(group.order, -1);
    }

    #[test]
    fn test_group_cycle_detected() {
        let mut def = CommandDef::new("tool");
        def.options.push(OptionSpec::flag(&["-x"]));
        def.groups.push(GroupDef::new("a", &["b", "-x"]));
        def.groups.push(GroupDef::new("b", &["a"]));

        let err = def.build().unwrap_err();
        assert!(matches!(err, DefinitionError::GroupCycle(ref path) if path == "a b a"));
        assert_eq!(err.to_string(), "group cycle detected at path: a b a");
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let mut def = CommandDef::new("tool");
        def.groups.push(GroupDef::new("a", &["a"]));
        assert!(matches!(def.build(), Err(DefinitionError::GroupCycle(path)) if path == "a a"));
    }

    #[test]
    fn test_unknown_member() {
        let mut def = CommandDef::new("tool");
        def.groups.push(GroupDef::new("g", &["--missing"]));
        let err = def.build().unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown option '--missing' referenced by group g"
        );

        let mut def = CommandDef::new("tool");
        def.groups.push(GroupDef::new("g", &["other"]));
        assert!(matches!(
            def.build(),
            Err(DefinitionError::UnknownReference { kind: "group", .. })
        ));
    }

    #[test]
    fn test_duplicate_group_name() {
        let mut def = CommandDef::new("tool");
        def.options.push(OptionSpec::flag(&["-x"]));
        def.groups.push(GroupDef::new("g", &["-x"]));
        def.groups.push(GroupDef::new("g", &["-x"]));
        assert!(matches!(
            def.build(),
            Err(DefinitionError::DuplicateName { kind: "group", .. })
        ));
    }

    #[test]
    fn test_structural_errors_surface() {
        let mut def = CommandDef::new("tool");
        def.options.push(OptionSpec::flag(&["-x"]));
        def.groups.push(GroupDef::new("g", &["-x"]).with_multiplicity(Range::exactly(0)));
        let err = def.build().unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidSpec(_)));

        let mut def = CommandDef::new("tool");
        def.options.push(OptionSpec::flag(&["-x"]));
        def.groups.push(GroupDef::new("first", &["-x"]));
        def.groups.push(GroupDef::new("second", &["-x"]));
        let err = def.build().unwrap_err();
        assert!(err.to_string().contains("An option cannot be in multiple groups"));
    }

    #[test]
    fn test_explicit_attach_list() {
        let mut def = CommandDef::new("tool");
        def.options.push(OptionSpec::flag(&["-x"]));
        def.options.push(OptionSpec::flag(&["-y"]));
        def.groups.push(GroupDef::new("inner", &["-x"]));
        def.groups.push(GroupDef::new("outer", &["inner", "-y"]));
        def.attach = Some(vec!["inner".to_string()]);

        let err = def.build().unwrap_err();
        assert!(
            err.to_string()
                .contains("Groups that are part of another group should not be added")
        );
    }

    #[test]
    fn test_settings_are_inherited() {
        let yaml = r#"
name: git
settings:
  case_insensitive: true
  abbreviate_subcommands: true
subcommands:
  - name: commit
    options:
      - names: ["--message"]
  - name: checkout
    settings:
      case_insensitive: false
"#;
        let cmd = CommandDef::from_yaml_str(yaml).unwrap().build().unwrap();
        let commit = cmd.resolve_subcommand("COM").unwrap();
        assert_eq!(commit.name(), "commit");
        assert!(commit.is_case_insensitive());
        assert!(commit.resolve_option("--MESSAGE").is_ok());
        assert!(!cmd.resolve_subcommand("check").unwrap().is_case_insensitive());
    }

    #[test]
    fn test_positional_members() {
        let yaml = r#"
name: pairs
positionals:
  - index: 0
    label: key
  - index: 1
    label: value
groups:
  - name: pair
    exclusive: false
    multiplicity: "1..*"
    members: ["<key>", "<value>"]
"#;
        let cmd = CommandDef::from_yaml_str(yaml).unwrap().build().unwrap();
        assert_eq!(cmd.synopsis(), "pairs (<key> <value>)...");
    }
}
