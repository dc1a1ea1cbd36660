use crate::config;
use crate::library;
use crate::model::TrackRef;
use std::collections::HashSet;
use std::path::PathBuf;
use unicode_normalization::UnicodeNormalization;

/// Ordered tracks plus the filtered view the navigator indexes into.
///
/// `filtered` holds positions into `tracks` in ascending order, so the view is
/// always an order-preserving subsequence.
#[derive(Debug, Clone, Default)]
pub struct PlaylistView {
    tracks: Vec<TrackRef>,
    query: String,
    filtered: Vec<usize>,
}

impl PlaylistView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut view = Self::new();
        view.add_paths(paths);
        view
    }

    /// Appends supported, not-yet-present paths. Returns how many were added.
    pub fn add_paths<I, P>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut known: HashSet<PathBuf> = self
            .tracks
            .iter()
            .map(|track| config::normalize_path(&track.path))
            .collect();

        let before = self.tracks.len();
        for path in library::filter_supported(paths) {
            if known.insert(config::normalize_path(&path)) {
                self.tracks.push(TrackRef::new(path));
            }
        }
        self.refilter();
        self.tracks.len() - before
    }

    pub fn set_filter(&mut self, query: &str) {
        self.query = query.to_string();
        self.refilter();
    }

    pub fn clear_filter(&mut self) {
        self.set_filter("");
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn len(&self) -> usize {
        self.filtered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filtered.is_empty()
    }

    pub fn total_len(&self) -> usize {
        self.tracks.len()
    }

    pub fn get(&self, index: usize) -> Option<&TrackRef> {
        let position = *self.filtered.get(index)?;
        self.tracks.get(position)
    }

    pub fn cache_duration(&mut self, index: usize, seconds: f64) {
        if let Some(&position) = self.filtered.get(index)
            && let Some(track) = self.tracks.get_mut(position)
        {
            track.duration = seconds;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackRef> {
        self.filtered
            .iter()
            .filter_map(|position| self.tracks.get(*position))
    }

    pub fn all(&self) -> &[TrackRef] {
        &self.tracks
    }

    fn refilter(&mut self) {
        let needle = fold(&self.query);
        self.filtered = self
            .tracks
            .iter()
            .enumerate()
            .filter(|(_, track)| needle.is_empty() || fold(&track.display_name()).contains(&needle))
            .map(|(position, _)| position)
            .collect();
    }
}

fn fold(value: &str) -> String {
    value.nfkc().collect::<String>().to_lowercase()
}
