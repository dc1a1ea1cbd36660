use crate::model::{LoopMode, NavigationPolicy, TrackRef};
use crate::playlist::PlaylistView;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Picks the index that plays after `current` in a view of `len` tracks.
///
/// Precedence: shuffle, then single loop, then linear advance, then playlist
/// loop. `None` means the playlist is exhausted.
pub fn next_index<R: Rng>(
    current: usize,
    len: usize,
    policy: NavigationPolicy,
    rng: &mut R,
) -> Option<usize> {
    if len == 0 {
        return None;
    }
    if policy.shuffle {
        return Some(rng.random_range(0..len));
    }
    if policy.loop_mode == LoopMode::LoopSingle {
        return Some(current);
    }
    if current + 1 < len {
        return Some(current + 1);
    }
    if policy.loop_mode == LoopMode::LoopPlaylist {
        return Some(0);
    }
    None
}

/// Linear only: never wraps and ignores shuffle.
pub fn previous_index(current: usize) -> Option<usize> {
    current.checked_sub(1)
}

#[derive(Debug)]
pub struct PlaylistNavigator {
    view: PlaylistView,
    policy: NavigationPolicy,
    rng: SmallRng,
}

impl PlaylistNavigator {
    pub fn new(view: PlaylistView, policy: NavigationPolicy, rng: SmallRng) -> Self {
        Self { view, policy, rng }
    }

    pub fn seeded(view: PlaylistView, policy: NavigationPolicy, seed: u64) -> Self {
        Self::new(view, policy, SmallRng::seed_from_u64(seed))
    }

    pub fn next(&mut self, current: usize) -> Option<usize> {
        next_index(current, self.view.len(), self.policy, &mut self.rng)
    }

    pub fn previous(&self, current: usize) -> Option<usize> {
        previous_index(current)
    }

    pub fn policy(&self) -> NavigationPolicy {
        self.policy
    }

    pub fn set_loop_mode(&mut self, mode: LoopMode) {
        self.policy.loop_mode = mode;
    }

    pub fn set_shuffle(&mut self, enabled: bool) {
        self.policy.shuffle = enabled;
    }

    pub fn view(&self) -> &PlaylistView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut PlaylistView {
        &mut self.view
    }

    pub fn track(&self, index: usize) -> Option<&TrackRef> {
        self.view.get(index)
    }

    pub fn len(&self) -> usize {
        self.view.len()
    }

    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }
}
