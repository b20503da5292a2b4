/// One master key with its recognized synonyms.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct KeyMapEntry {
    /// Canonical field name.
    pub master: String,
    /// Recognized aliases, including the master key itself.
    pub synonyms: Vec<String>,
}

/// Master vocabulary: canonical field names and their recognized aliases.
///
/// Insertion order is preserved and is the match priority, so overlapping
/// synonym sets resolve deterministically to the earliest master key.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct KeyMap {
    entries: Vec<KeyMapEntry>,
}

impl KeyMap {
    /// Empty vocabulary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a master key and its synonyms. The master key is added to its
    /// own synonym set when missing.
    pub fn insert<S: Into<String>>(&mut self, master: S, synonyms: Vec<String>) {
        let master = master.into();
        let mut synonyms = synonyms;
        if !synonyms.iter().any(|s| s == &master) {
            synonyms.insert(0, master.clone());
        }
        self.entries.push(KeyMapEntry { master, synonyms });
    }

    /// Master keys with synonyms, in priority order.
    pub fn entries(&self) -> &[KeyMapEntry] {
        &self.entries
    }

    /// Number of master keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when the vocabulary is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Canonicalizes loosely-named fields so the same concept under different
/// labels consolidates into one tabular column.
#[derive(Clone, Debug, Default)]
pub struct KeyNormalizer {
    map: KeyMap,
}

impl KeyNormalizer {
    /// Build a normalizer over a master vocabulary.
    pub fn new(map: KeyMap) -> Self {
        Self { map }
    }

    /// The underlying vocabulary.
    pub fn key_map(&self) -> &KeyMap {
        &self.map
    }

    /// Map an incoming field name to its master key.
    ///
    /// Both sides are trimmed and case-folded for comparison; the first master
    /// key (in vocabulary order) with a matching synonym wins. Unrecognized
    /// names pass through unchanged.
    pub fn normalize<'a>(&'a self, name: &'a str) -> &'a str {
        let needle = fold(name);
        for entry in &self.map.entries {
            if entry.synonyms.iter().any(|s| fold(s) == needle) {
                return entry.master.as_str();
            }
        }
        name
    }

    /// Normalize the keys of ordered field/value pairs, preserving order.
    pub fn normalize_pairs(&self, pairs: &[(String, String)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (self.normalize(k).to_string(), v.clone()))
            .collect()
    }
}

fn fold(s: &str) -> String {
    s.trim().to_lowercase()
}

#[cfg(test)]
#[path = "../../tests/unit/normalize/keymap.rs"]
mod tests;
