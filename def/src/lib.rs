//! Declarative command definitions for the argspec engine.
//!
//! A [`CommandDef`] is the serializable form of a command: options,
//! positionals, named argument groups and subcommands. It is read from YAML
//! or JSON and turned into a [`CommandSpec`](argspec_core::CommandSpec) by
//! [`CommandDef::build`], which resolves group references by name and
//! rejects cycles and unknown members before any engine call.
//!
//! # Quick start
//!
//! ```
//! use argspec_def::CommandDef;
//!
//! let def = CommandDef::from_yaml_str(
//!     r#"
//! name: fetch
//! options:
//!   - names: ["-q", "--quiet"]
//!     arity: "0"
//!   - names: ["-v", "--verbose"]
//!     arity: "0"
//! groups:
//!   - name: verbosity
//!     members: [-q, -v]
//! "#,
//! )
//! .unwrap();
//!
//! let cmd = def.build().unwrap();
//! assert_eq!(cmd.synopsis(), "fetch [-q | -v]");
//! ```

mod definition;
mod error;

pub use definition::{CommandDef, GroupDef, Settings};
pub use error::{DefinitionError, Result};
