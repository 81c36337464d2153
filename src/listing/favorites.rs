use std::collections::BTreeSet;

/// In-memory favorites for the current session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoriteSet {
    ids: BTreeSet<String>,
}

impl FavoriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of `ad_id`; returns true if it is now a favorite.
    pub fn toggle(&mut self, ad_id: &str) -> bool {
        if self.ids.remove(ad_id) {
            false
        } else {
            self.ids.insert(ad_id.to_string());
            true
        }
    }

    pub fn contains(&self, ad_id: &str) -> bool {
        self.ids.contains(ad_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for FavoriteSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).collect(),
        }
    }
}
