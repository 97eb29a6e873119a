//! Insertion-ordered map with switchable case sensitivity.
//!
//! [`CaseAwareMap`] backs the option and subcommand name tables of a
//! [`CommandSpec`](crate::CommandSpec). In case-insensitive mode lookups fold
//! keys with the configured [`Locale`] while the originally inserted spelling
//! is kept for display and for abbreviation matching.

use std::collections::HashMap;
use std::hash::Hash;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by [`CaseAwareMap`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    /// Two stored keys fold to the same value under the requested mode.
    #[error("Duplicate key: '{first}' and '{second}' are equal when compared case-insensitively")]
    DuplicateKey { first: String, second: String },
    /// The key type has no notion of case.
    #[error("key {0} cannot be case-folded")]
    Unsupported(String),
}

/// Locale used for case folding.
///
/// Only the language subtag influences folding: Turkish and Azeri map `I`
/// to dotless `ı` and `İ` to `i`; every other language uses Unicode default
/// lowercasing.
///
/// # Examples
///
/// ```
/// use argspec_core::Locale;
///
/// assert_eq!(Locale::root().to_lowercase("TITLE"), "title");
/// assert_eq!(Locale::new("tr-TR").to_lowercase("TITLE"), "tıtle");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locale(String);

impl Locale {
    /// The language-neutral root locale.
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Creates a locale from a BCP 47 tag such as `"en-US"` or `"tr"`.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn tag(&self) -> &str {
        &self.0
    }

    /// Primary language subtag, lowercased (`"tr"` for `"tr-TR"`).
    pub fn language(&self) -> String {
        self.0
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase()
    }

    /// Lowercases `text` according to this locale.
    pub fn to_lowercase(&self, text: &str) -> String {
        match self.language().as_str() {
            "tr" | "az" => text
                .chars()
                .map(|ch| match ch {
                    'I' => "ı".to_string(),
                    'İ' => "i".to_string(),
                    other => other.to_lowercase().collect(),
                })
                .collect(),
            _ => text.to_lowercase(),
        }
    }
}

/// Keys usable in a [`CaseAwareMap`].
pub trait FoldKey: Clone + Eq + Hash {
    /// Case-folded form of the key, or `None` when the key has no case.
    fn fold_case(&self, locale: &Locale) -> Option<Self>;

    /// Human-readable spelling used in error messages.
    fn display_key(&self) -> String;
}

impl FoldKey for String {
    fn fold_case(&self, locale: &Locale) -> Option<Self> {
        Some(locale.to_lowercase(self))
    }

    fn display_key(&self) -> String {
        self.clone()
    }
}

/// `None` models a null key: it folds to itself and is a single ordinary key.
impl<T: FoldKey> FoldKey for Option<T> {
    fn fold_case(&self, locale: &Locale) -> Option<Self> {
        match self {
            None => Some(None),
            Some(inner) => inner.fold_case(locale).map(Some),
        }
    }

    fn display_key(&self) -> String {
        match self {
            None => "null".to_string(),
            Some(inner) => inner.display_key(),
        }
    }
}

macro_rules! caseless_keys {
    ($($ty:ty),*) => {
        $(
            impl FoldKey for $ty {
                fn fold_case(&self, _locale: &Locale) -> Option<Self> {
                    None
                }

                fn display_key(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

caseless_keys!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, bool);

/// Ordered key/value store whose key comparison can be made case-insensitive.
///
/// # Examples
///
/// ```
/// use argspec_core::CaseAwareMap;
///
/// let mut map = CaseAwareMap::new();
/// map.insert("Verbose".to_string(), 1);
/// assert!(map.get(&"verbose".to_string()).is_none());
///
/// map.set_case_insensitive(true).unwrap();
/// assert_eq!(map.get(&"VERBOSE".to_string()), Some(&1));
/// assert_eq!(
///     map.case_sensitive_key(&"verbose".to_string()).unwrap(),
///     Some(&"Verbose".to_string())
/// );
/// ```
#[derive(Debug, Clone)]
pub struct CaseAwareMap<K, V> {
    entries: IndexMap<K, V>,
    /// folded key -> stored spelling; populated only in case-insensitive mode
    folded: HashMap<K, K>,
    case_insensitive: bool,
    locale: Locale,
}

impl<K: FoldKey, V> Default for CaseAwareMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: FoldKey, V> CaseAwareMap<K, V> {
    /// Creates an empty, case-sensitive map using the root locale.
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            folded: HashMap::new(),
            case_insensitive: false,
            locale: Locale::root(),
        }
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Switches key comparison mode.
    ///
    /// Enabling case-insensitivity fails with [`MapError::DuplicateKey`] if
    /// two stored keys fold to the same value; the map is left unchanged.
    pub fn set_case_insensitive(&mut self, insensitive: bool) -> Result<(), MapError> {
        if insensitive == self.case_insensitive {
            return Ok(());
        }
        if insensitive {
            self.folded = build_fold_index(&self.entries, &self.locale)?;
        } else {
            self.folded.clear();
        }
        self.case_insensitive = insensitive;
        Ok(())
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    /// Replaces the folding locale, re-folding stored keys when insensitive.
    pub fn set_locale(&mut self, locale: Locale) -> Result<(), MapError> {
        if self.case_insensitive {
            self.folded = build_fold_index(&self.entries, &locale)?;
        }
        self.locale = locale;
        Ok(())
    }

    fn index_of(&self, key: &K) -> Option<usize> {
        if self.case_insensitive
            && let Some(folded) = key.fold_case(&self.locale)
        {
            let stored = self.folded.get(&folded)?;
            return self.entries.get_index_of(stored);
        }
        self.entries.get_index_of(key)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.index_of(key)
            .and_then(|idx| self.entries.get_index(idx))
            .map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let idx = self.index_of(key)?;
        self.entries.get_index_mut(idx).map(|(_, value)| value)
    }

    /// Returns the stored entry (original spelling and value) for `key`.
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.index_of(key).and_then(|idx| self.entries.get_index(idx))
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.index_of(key).is_some()
    }

    /// Stored spelling of `key`.
    ///
    /// Fails with [`MapError::Unsupported`] when the key type has no case.
    pub fn case_sensitive_key(&self, key: &K) -> Result<Option<&K>, MapError> {
        if key.fold_case(&self.locale).is_none() {
            return Err(MapError::Unsupported(key.display_key()));
        }
        Ok(self
            .index_of(key)
            .and_then(|idx| self.entries.get_index(idx))
            .map(|(stored, _)| stored))
    }

    /// Inserts a value, returning the previous value for an equal key.
    ///
    /// In case-insensitive mode a fold-equal key replaces the value of the
    /// existing entry, which keeps its original spelling and position.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(idx) = self.index_of(&key) {
            let (_, slot) = self.entries.get_index_mut(idx)?;
            return Some(std::mem::replace(slot, value));
        }
        if self.case_insensitive
            && let Some(folded) = key.fold_case(&self.locale)
        {
            self.folded.insert(folded, key.clone());
        }
        self.entries.insert(key, value);
        None
    }

    /// Removes an entry, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let idx = self.index_of(key)?;
        let (stored, value) = self.entries.shift_remove_index(idx)?;
        if self.case_insensitive
            && let Some(folded) = stored.fold_case(&self.locale)
        {
            self.folded.remove(&folded);
        }
        Some(value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.folded.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in insertion order, with their original spelling.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }
}

impl<K: FoldKey, V: PartialEq> CaseAwareMap<K, V> {
    pub fn contains_value(&self, value: &V) -> bool {
        self.entries.values().any(|stored| stored == value)
    }
}

fn build_fold_index<K: FoldKey, V>(
    entries: &IndexMap<K, V>,
    locale: &Locale,
) -> Result<HashMap<K, K>, MapError> {
    let mut index = HashMap::with_capacity(entries.len());
    for key in entries.keys() {
        let Some(folded) = key.fold_case(locale) else {
            continue;
        };
        if let Some(previous) = index.insert(folded, key.clone()) {
            return Err(MapError::DuplicateKey {
                first: previous.display_key(),
                second: key.display_key(),
            });
        }
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> String {
        s.to_string()
    }

    #[test]
    fn test_sensitive_mode_keeps_distinct_spellings() {
        let mut map = CaseAwareMap::new();
        assert_eq!(map.insert(key("abc"), 1), None);
        assert_eq!(map.insert(key("ABC"), 2), None);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&key("abc")), Some(&1));
        assert_eq!(map.get(&key("aBc")), None);
    }

    #[test]
    fn test_insensitive_insert_overwrites_and_keeps_spelling() {
        let mut map = CaseAwareMap::new();
        map.set_case_insensitive(true).unwrap();
        map.insert(key("Help"), 1);
        assert_eq!(map.insert(key("HELP"), 2), Some(1));
        assert_eq!(map.len(), 1);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["Help"]);
        assert_eq!(map.get(&key("help")), Some(&2));
        assert!(map.contains_key(&key("hElP")));
    }

    #[test]
    fn test_toggle_with_collision_leaves_map_unchanged() {
        let mut map = CaseAwareMap::new();
        map.insert(key("abc"), 1);
        map.insert(key("ABC"), 2);

        let err = map.set_case_insensitive(true).unwrap_err();
        assert_eq!(
            err,
            MapError::DuplicateKey {
                first: "abc".into(),
                second: "ABC".into()
            }
        );
        assert!(!map.is_case_insensitive());
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&key("ABC")), Some(&2));
    }

    #[test]
    fn test_toggle_back_to_sensitive() {
        let mut map = CaseAwareMap::new();
        map.set_case_insensitive(true).unwrap();
        map.insert(key("Name"), 1);
        map.set_case_insensitive(false).unwrap();
        assert_eq!(map.get(&key("name")), None);
        assert_eq!(map.get(&key("Name")), Some(&1));
    }

    #[test]
    fn test_remove_clears_fold_entry_and_order() {
        let mut map = CaseAwareMap::new();
        map.set_case_insensitive(true).unwrap();
        map.insert(key("a"), 1);
        map.insert(key("B"), 2);
        map.insert(key("c"), 3);

        assert_eq!(map.remove(&key("b")), Some(2));
        assert!(!map.contains_key(&key("B")));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "c"]);

        map.insert(key("b"), 4);
        assert_eq!(map.case_sensitive_key(&key("B")).unwrap(), Some(&key("b")));
    }

    #[test]
    fn test_contains_value_and_clear() {
        let mut map = CaseAwareMap::new();
        map.insert(key("x"), 10);
        assert!(map.contains_value(&10));
        assert!(!map.contains_value(&11));
        map.clear();
        assert!(map.is_empty());
    }

    #[test]
    fn test_caseless_keys_fall_back_to_equality() {
        let mut map: CaseAwareMap<u32, &str> = CaseAwareMap::new();
        map.insert(7, "seven");
        map.set_case_insensitive(true).unwrap();
        assert_eq!(map.get(&7), Some(&"seven"));
        assert!(map.contains_key(&7));
        assert!(!map.contains_key(&8));
        assert_eq!(
            map.case_sensitive_key(&7),
            Err(MapError::Unsupported("7".into()))
        );
    }

    #[test]
    fn test_null_key_is_single_entry() {
        let mut map: CaseAwareMap<Option<String>, i32> = CaseAwareMap::new();
        map.set_case_insensitive(true).unwrap();
        map.insert(None, 1);
        assert_eq!(map.insert(None, 2), Some(1));
        map.insert(Some(key("Key")), 3);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&None), Some(&2));
        assert_eq!(map.get(&Some(key("KEY"))), Some(&3));
        assert_eq!(map.case_sensitive_key(&None).unwrap(), Some(&None));
    }

    #[test]
    fn test_clone_is_independent() {
        let mut map = CaseAwareMap::new();
        map.set_locale(Locale::new("tr")).unwrap();
        map.set_case_insensitive(true).unwrap();
        map.insert(key("one"), 1);

        let mut copy = map.clone();
        copy.insert(key("two"), 2);
        assert!(copy.is_case_insensitive());
        assert_eq!(copy.locale(), &Locale::new("tr"));
        assert_eq!(copy.get(&key("ONE")), Some(&1));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_turkish_locale_folding() {
        let mut map = CaseAwareMap::new();
        map.set_locale(Locale::new("tr-TR")).unwrap();
        map.set_case_insensitive(true).unwrap();
        map.insert(key("TITLE"), 1);
        assert_eq!(map.get(&key("tıtle")), Some(&1));
        assert_eq!(map.get(&key("title")), None);
    }

    #[test]
    fn test_set_locale_collision_is_atomic() {
        let mut map = CaseAwareMap::new();
        map.insert(key("ı"), 1);
        map.insert(key("I"), 2);
        map.set_case_insensitive(true).unwrap();

        assert!(map.set_locale(Locale::new("tr")).is_err());
        assert_eq!(map.locale(), &Locale::root());
        assert_eq!(map.get(&key("i")), Some(&2));
    }
}
