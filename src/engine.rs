use crate::audio::MediaBackend;
use crate::error::{PlayerError, Result};
use crate::model::{LoopMode, NavigationPolicy, PlayerConfig, RenderEvent, TransportState};
use crate::navigator::PlaylistNavigator;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Suppresses end-of-track detection right after an auto-advance.
///
/// The first poll after arming records the new track's elapsed time; the
/// guard lifts once a later poll sees the position move past it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AdvanceGuard {
    baseline: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    Advanced(usize),
    Exhausted,
    Failed(String),
}

pub struct PlaybackEngine<B: MediaBackend> {
    backend: B,
    navigator: PlaylistNavigator,
    state: TransportState,
    current_index: Option<usize>,
    loaded: Option<PathBuf>,
    loaded_length: f64,
    volume: u8,
    volume_step: u8,
    metadata_timeout: Duration,
    metadata_retry: Duration,
    last_parse: Option<Instant>,
    advance_guard: Option<AdvanceGuard>,
    events: Vec<RenderEvent>,
}

impl<B: MediaBackend> PlaybackEngine<B> {
    pub fn new(backend: B, navigator: PlaylistNavigator, config: &PlayerConfig) -> Self {
        let mut engine = Self {
            backend,
            navigator,
            state: TransportState::Stopped,
            current_index: None,
            loaded: None,
            loaded_length: 0.0,
            volume: 0,
            volume_step: config.volume_step,
            metadata_timeout: config.metadata_timeout(),
            metadata_retry: config.metadata_retry_interval(),
            last_parse: None,
            advance_guard: None,
            events: Vec::new(),
        };
        engine.set_volume(i32::from(config.initial_volume));
        engine
    }

    /// Binds the backend to the track at `index` of the current filtered view.
    ///
    /// On failure nothing changes: the previous media, index and transport
    /// state stay as they were.
    pub fn load(&mut self, index: usize) -> Result<()> {
        let path = self
            .navigator
            .track(index)
            .map(|track| track.path.clone())
            .ok_or(PlayerError::IndexOutOfBounds(index))?;

        if let Err(err) = self.backend.load(&path) {
            tracing::warn!(error = %err, "track could not be loaded");
            self.advance_guard = None;
            return Err(err);
        }

        self.loaded = Some(path);
        self.loaded_length = 0.0;
        self.last_parse = None;
        self.current_index = Some(index);
        self.set_state(TransportState::Stopped);
        Ok(())
    }

    pub fn play(&mut self) {
        if self.loaded.is_none() {
            if let Some(index) = self.current_index
                && let Err(err) = self.select_and_play(index)
            {
                self.events.push(RenderEvent::Error(err.to_string()));
            }
            return;
        }
        self.backend.play();
        self.set_state(TransportState::Playing);
    }

    pub fn pause(&mut self) {
        if self.state != TransportState::Playing {
            return;
        }
        self.backend.pause();
        self.set_state(TransportState::Paused);
    }

    pub fn stop(&mut self) {
        self.backend.stop();
        self.loaded = None;
        self.loaded_length = 0.0;
        self.advance_guard = None;
        self.set_state(TransportState::Stopped);
    }

    pub fn set_volume(&mut self, level: i32) {
        let level = level.clamp(0, 100) as u8;
        self.backend.set_volume(level);
        if level != self.volume {
            self.volume = level;
            self.events.push(RenderEvent::Volume(level));
        }
    }

    pub fn volume_up(&mut self) {
        self.set_volume(i32::from(self.volume) + i32::from(self.volume_step));
    }

    pub fn volume_down(&mut self) {
        self.set_volume(i32::from(self.volume) - i32::from(self.volume_step));
    }

    /// Negative positions clamp to 0; positions past the end are the
    /// backend's business.
    pub fn seek(&mut self, seconds: f64) {
        let seconds = if seconds.is_finite() {
            seconds.max(0.0)
        } else {
            0.0
        };
        self.backend.seek(seconds);
    }

    /// Best known duration of the loaded track in seconds, 0 if unknown.
    ///
    /// Falls back to a metadata parse bounded by the configured timeout. A
    /// failed parse is retried on a later call once the retry interval has
    /// passed, so an unknown length costs at most one parse per interval.
    pub fn get_length(&mut self) -> f64 {
        if self.loaded.is_none() {
            return 0.0;
        }

        match self.backend.length_seconds() {
            Ok(length) if length > 0.0 => return self.remember_length(length),
            Ok(_) => {}
            Err(err) => tracing::debug!(error = %err, "length read failed"),
        }

        if self.loaded_length > 0.0 {
            return self.loaded_length;
        }

        if self
            .last_parse
            .is_some_and(|at| at.elapsed() < self.metadata_retry)
        {
            return 0.0;
        }
        self.last_parse = Some(Instant::now());
        let parsed = self.backend.request_metadata_parse(self.metadata_timeout);
        if parsed > 0.0 {
            return self.remember_length(parsed);
        }
        tracing::debug!("track length still unknown");
        0.0
    }

    /// Length without triggering a metadata parse.
    pub fn known_length(&self) -> f64 {
        match self.backend.length_seconds() {
            Ok(length) if length > 0.0 => length,
            _ => self.loaded_length,
        }
    }

    fn remember_length(&mut self, length: f64) -> f64 {
        if self.loaded_length != length {
            self.loaded_length = length;
            if let Some(index) = self.current_index
                && self.current_track_is_loaded()
            {
                self.navigator.view_mut().cache_duration(index, length);
            }
        }
        length
    }

    pub fn position(&self) -> Result<f64> {
        self.backend.position_seconds()
    }

    pub fn select_and_play(&mut self, index: usize) -> Result<()> {
        self.advance_guard = None;
        self.load(index)?;
        self.play();

        let display_name = self
            .navigator
            .track(index)
            .map(|track| track.display_name())
            .unwrap_or_default();
        tracing::info!(index, track = %display_name, "track changed");
        self.events.push(RenderEvent::TrackChanged {
            index,
            display_name,
        });
        Ok(())
    }

    /// User "next". Does nothing when the playlist is exhausted.
    pub fn next(&mut self) -> Result<Option<usize>> {
        let target = match self.current_index {
            Some(current) => self.navigator.next(current),
            None => (!self.navigator.is_empty()).then_some(0),
        };
        if let Some(index) = target {
            self.select_and_play(index)?;
        }
        Ok(target)
    }

    pub fn previous(&mut self) -> Result<Option<usize>> {
        let target = self
            .current_index
            .and_then(|current| self.navigator.previous(current));
        if let Some(index) = target {
            self.select_and_play(index)?;
        }
        Ok(target)
    }

    /// Moves on after the current track finished: plays the next index or
    /// stops when there is none.
    ///
    /// A neighbour that fails to load is reported and skipped; each index is
    /// tried at most once, and if nothing loads playback stops.
    pub fn auto_advance(&mut self) -> AdvanceOutcome {
        let Some(current) = self.current_index else {
            tracing::info!("finished track is outside the current view");
            self.stop();
            return AdvanceOutcome::Exhausted;
        };

        let mut tried = HashSet::new();
        let mut last_error = None;
        let mut candidate = self.navigator.next(current);
        for _ in 0..self.navigator.len() {
            let Some(index) = candidate else {
                break;
            };
            if !tried.insert(index) {
                candidate = self.navigator.next(index);
                continue;
            }
            match self.select_and_play(index) {
                Ok(()) => {
                    self.advance_guard = Some(AdvanceGuard::default());
                    return AdvanceOutcome::Advanced(index);
                }
                Err(err) => {
                    let message = err.to_string();
                    self.events.push(RenderEvent::Error(message.clone()));
                    last_error = Some(message);
                    candidate = self.navigator.next(index);
                }
            }
        }

        self.stop();
        match last_error {
            Some(message) => {
                tracing::warn!(tried = tried.len(), "no following track could be loaded");
                AdvanceOutcome::Failed(message)
            }
            None => {
                tracing::info!("playlist exhausted");
                AdvanceOutcome::Exhausted
            }
        }
    }

    /// Feeds one polled position to the advance guard. Returns `true` while
    /// end-of-track detection must stay suppressed.
    pub(crate) fn guard_suppresses(&mut self, elapsed: f64) -> bool {
        if self.advance_guard.is_none() {
            return false;
        }
        if self.state == TransportState::Playing && !self.backend.is_playing() {
            // Track drained before its position was seen moving.
            tracing::debug!(elapsed, "advance guard released by drained backend");
            self.advance_guard = None;
            return false;
        }
        let Some(guard) = self.advance_guard.as_mut() else {
            return false;
        };
        let baseline = guard.baseline;
        match baseline {
            None => {
                guard.baseline = Some(elapsed);
                true
            }
            Some(baseline) if elapsed > baseline => {
                tracing::debug!(elapsed, baseline, "advance guard released");
                self.advance_guard = None;
                false
            }
            Some(_) => true,
        }
    }

    pub fn advance_guard(&self) -> Option<AdvanceGuard> {
        self.advance_guard
    }

    /// Re-filters the view and re-resolves the selection by path. A selected
    /// track the new view hides becomes "no selection"; the loaded track keeps
    /// playing either way.
    pub fn set_filter(&mut self, query: &str) {
        let selected = self
            .current_index
            .and_then(|index| self.navigator.track(index))
            .map(|track| track.path.clone());
        let had_selection = selected.is_some();
        self.navigator.view_mut().set_filter(query);
        self.current_index = selected.and_then(|path| {
            self.navigator
                .view()
                .iter()
                .position(|track| track.path == path)
        });
        if had_selection && self.current_index.is_none() {
            tracing::debug!(query, "selection cleared by filter");
        }
    }

    pub fn clear_filter(&mut self) {
        self.set_filter("");
    }

    pub fn cycle_loop_mode(&mut self) {
        let mode = self.navigator.policy().loop_mode.next();
        self.set_loop_mode(mode);
    }

    pub fn set_loop_mode(&mut self, mode: LoopMode) {
        self.navigator.set_loop_mode(mode);
        self.events.push(RenderEvent::Policy(self.navigator.policy()));
    }

    pub fn toggle_shuffle(&mut self) {
        let enabled = !self.navigator.policy().shuffle;
        self.navigator.set_shuffle(enabled);
        self.events.push(RenderEvent::Policy(self.navigator.policy()));
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn loaded_path(&self) -> Option<&Path> {
        self.loaded.as_deref()
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn policy(&self) -> NavigationPolicy {
        self.navigator.policy()
    }

    pub fn navigator(&self) -> &PlaylistNavigator {
        &self.navigator
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn take_events(&mut self) -> Vec<RenderEvent> {
        std::mem::take(&mut self.events)
    }

    fn current_track_is_loaded(&self) -> bool {
        let Some(index) = self.current_index else {
            return false;
        };
        self.navigator
            .track(index)
            .zip(self.loaded.as_deref())
            .is_some_and(|(track, loaded)| track.path == loaded)
    }

    fn set_state(&mut self, state: TransportState) {
        if self.state == state {
            return;
        }
        tracing::info!(from = ?self.state, to = ?state, "transport state changed");
        self.state = state;
        self.events.push(RenderEvent::Transport(state));
    }
}
