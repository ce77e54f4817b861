//! Session tokens harvested from portal URLs
//!
//! The portal protects its export endpoint with query parameters that are
//! minted per session. They live only as long as one retrieval and are
//! never cached or persisted.

/// Ordered `name -> value` map of session token parameters
///
/// Insertion order is preserved so reconstructed URLs carry the tokens in the
/// order the portal emitted them. Inserting an existing name replaces its
/// value in place.
///
/// ```
/// use domain::SessionTokens;
///
/// let mut tokens = SessionTokens::default();
/// tokens.insert("sid1", "abc");
/// tokens.insert("caltoken2", "xyz");
/// tokens.insert("sid1", "def");
///
/// let pairs: Vec<_> = tokens.iter().collect();
/// assert_eq!(pairs, vec![("sid1", "def"), ("caltoken2", "xyz")]);
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionTokens {
    entries: Vec<(String, String)>,
}

impl SessionTokens {
    /// Insert or replace a token
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Tokens in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Token names only, for diagnostics
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }
}

// Values are session secrets; only names are shown.
impl std::fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokens")
            .field("names", &self.names())
            .finish()
    }
}
