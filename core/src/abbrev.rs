//! Abbreviated name resolution for options and subcommands.
//!
//! Names are split into chunks at hyphens and (when matching
//! case-sensitively) at uppercase letters. A typed token matches a candidate
//! when its first chunk prefixes the candidate's first chunk and every
//! following chunk prefixes some later candidate chunk, in order:
//!
//! ```
//! use argspec_core::{CaseAwareMap, match_abbreviation};
//!
//! let mut names = CaseAwareMap::new();
//! names.insert("--very-long-option".to_string(), 1);
//! names.insert("--verbose".to_string(), 2);
//!
//! let resolved = match_abbreviation(&names, "--v-l", false).unwrap();
//! assert_eq!(resolved.name, "--very-long-option");
//! assert!(match_abbreviation(&names, "--ve", false).is_err());
//! ```

use std::borrow::Cow;
use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::map::{CaseAwareMap, Locale};

/// Failure to resolve a typed token to exactly one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// No candidate matches.
    #[error("'{token}' does not match any known name")]
    Unknown { token: String },
    /// Several candidates match; they are listed in insertion order.
    #[error("'{token}' is not unique: it matches {}", quote_all(.matches))]
    Ambiguous { token: String, matches: Vec<String> },
}

fn quote_all(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("'{name}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Candidate selected by [`match_abbreviation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved<'m, V> {
    /// Stored spelling of the matched candidate.
    pub name: &'m str,
    pub value: &'m V,
    /// `true` when the token named the candidate without abbreviation.
    pub exact: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkKind {
    /// Leading punctuation such as `--`.
    Prefix,
    Word,
    /// A chunk introduced by a hyphen; `text` excludes the hyphen.
    Hyphenated,
}

/// One word-like piece of an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    text: &'a str,
    source: &'a str,
    kind: ChunkKind,
}

impl<'a> Chunk<'a> {
    pub fn is_prefix(&self) -> bool {
        self.kind == ChunkKind::Prefix
    }

    /// Comparison form: hyphen-introduced chunks are capitalized, so
    /// `kebab-case` and `kebabCase` produce the same chunks.
    pub fn canonical(&self) -> Cow<'a, str> {
        if self.kind != ChunkKind::Hyphenated {
            return Cow::Borrowed(self.text);
        }
        let mut chars = self.text.chars();
        match chars.next() {
            Some(first) if !first.is_uppercase() => {
                Cow::Owned(first.to_uppercase().chain(chars).collect())
            }
            _ => Cow::Borrowed(self.text),
        }
    }

    /// The slice of the identifier this chunk covers, hyphens included.
    ///
    /// Concatenating the sources of all chunks yields the identifier.
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Prefix test; `fold` is the locale to lowercase with when matching
    /// case-insensitively.
    fn starts_with(&self, prefix: &Chunk<'_>, fold: Option<&Locale>) -> bool {
        let (text, prefix) = (self.canonical(), prefix.canonical());
        match fold {
            Some(locale) => locale
                .to_lowercase(&text)
                .starts_with(&locale.to_lowercase(&prefix)),
            None => text.starts_with(prefix.as_ref()),
        }
    }
}

impl fmt::Display for Chunk<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// Splits an identifier into chunks.
///
/// Leading non-alphanumeric characters form a single prefix chunk. When
/// `case_insensitive` is `false`, every uppercase letter starts a new chunk.
/// Runs of hyphens stay with the chunk they introduce, and trailing hyphens
/// with the last chunk.
///
/// ```
/// use argspec_core::split_into_chunks;
///
/// let chunks: Vec<String> = split_into_chunks("--very-long-kebab-case", false)
///     .iter()
///     .map(ToString::to_string)
///     .collect();
/// assert_eq!(chunks, ["--", "very", "Long", "Kebab", "Case"]);
/// ```
pub fn split_into_chunks(identifier: &str, case_insensitive: bool) -> Vec<Chunk<'_>> {
    let mut chunks = Vec::new();
    let body_start = identifier
        .find(char::is_alphanumeric)
        .unwrap_or(identifier.len());
    if body_start > 0 {
        let prefix = &identifier[..body_start];
        chunks.push(Chunk {
            text: prefix,
            source: prefix,
            kind: ChunkKind::Prefix,
        });
    }

    let mut start = body_start;
    for (offset, ch) in identifier[body_start..].char_indices() {
        let idx = body_start + offset;
        let pending = &identifier[start..idx];
        if pending.trim_start_matches('-').is_empty() {
            continue;
        }
        if ch == '-' || (!case_insensitive && ch.is_uppercase()) {
            chunks.push(chunk_at(pending));
            start = idx;
        }
    }

    let rest = &identifier[start..];
    if !rest.trim_start_matches('-').is_empty() {
        chunks.push(chunk_at(rest));
    } else if let Some(last) = chunks.last_mut() {
        let from = start - last.source.len();
        last.source = &identifier[from..];
    }
    chunks
}

fn chunk_at(source: &str) -> Chunk<'_> {
    let text = source.trim_start_matches('-');
    let kind = if text.len() < source.len() {
        ChunkKind::Hyphenated
    } else {
        ChunkKind::Word
    };
    Chunk { text, source, kind }
}

fn chunks_match(token: &[Chunk<'_>], candidate: &[Chunk<'_>], fold: Option<&Locale>) -> bool {
    if token.is_empty() || token.len() > candidate.len() {
        return false;
    }

    let mut tok = 0;
    let mut cand = 0;
    match (token[0].is_prefix(), candidate[0].is_prefix()) {
        (false, false) => {}
        // punctuation has no case
        (true, true) if token[0].text == candidate[0].text => {
            tok = 1;
            cand = 1;
        }
        _ => return false,
    }

    if tok == token.len() {
        return cand == candidate.len();
    }
    if cand == candidate.len() || !candidate[cand].starts_with(&token[tok], fold) {
        return false;
    }
    cand += 1;

    for chunk in &token[tok + 1..] {
        match candidate[cand..]
            .iter()
            .position(|c| c.starts_with(chunk, fold))
        {
            Some(offset) => cand += offset + 1,
            None => return false,
        }
    }
    true
}

/// Returns `true` if `token` is an abbreviation of `candidate`.
///
/// Case-insensitive comparison folds with the root locale.
pub fn is_abbreviation_of(token: &str, candidate: &str, case_insensitive: bool) -> bool {
    let root = Locale::root();
    chunks_match(
        &split_into_chunks(token, case_insensitive),
        &split_into_chunks(candidate, case_insensitive),
        case_insensitive.then_some(&root),
    )
}

/// Resolves `token` against the keys of `candidates`.
///
/// An exact key (compared with the map's own case mode) always wins.
/// Otherwise every abbreviation match is collected: one match resolves,
/// none is [`MatchError::Unknown`], several are [`MatchError::Ambiguous`].
pub fn match_abbreviation<'m, V>(
    candidates: &'m CaseAwareMap<String, V>,
    token: &str,
    case_insensitive: bool,
) -> Result<Resolved<'m, V>, MatchError> {
    if let Some((name, value)) = candidates.get_key_value(&token.to_string()) {
        return Ok(Resolved {
            name,
            value,
            exact: true,
        });
    }

    let typed = split_into_chunks(token, case_insensitive);
    let fold = case_insensitive.then(|| candidates.locale());
    let mut matches: Vec<(&'m String, &'m V)> = candidates
        .iter()
        .filter(|(name, _)| chunks_match(&typed, &split_into_chunks(name, case_insensitive), fold))
        .collect();

    match matches.len() {
        0 => Err(MatchError::Unknown {
            token: token.to_string(),
        }),
        1 => {
            let (name, value) = matches.remove(0);
            debug!(token, resolved = %name, "Resolved abbreviation");
            Ok(Resolved {
                name,
                value,
                exact: false,
            })
        }
        _ => {
            let matches: Vec<String> = matches.into_iter().map(|(name, _)| name.clone()).collect();
            debug!(token, ?matches, "Ambiguous abbreviation");
            Err(MatchError::Ambiguous {
                token: token.to_string(),
                matches,
            })
        }
    }
}
