use pulse::app::Player;
use pulse::audio::MediaBackend;
use pulse::error::{PlayerError, Result};
use pulse::model::{LoopMode, PlayerConfig, RenderEvent, TransportState};
use pulse::playlist::PlaylistView;
use std::cell::Cell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Backend whose position follows a clock the test moves by hand.
struct ScriptedBackend {
    clock: Rc<Cell<f64>>,
    lengths: HashMap<PathBuf, f64>,
    broken: Vec<PathBuf>,
    current: Option<PathBuf>,
    started_at: f64,
    offset: f64,
    playing: bool,
    volume: u8,
    loads: Vec<PathBuf>,
    stops: usize,
}

impl ScriptedBackend {
    fn new(clock: Rc<Cell<f64>>, lengths: &[(&str, f64)]) -> Self {
        Self {
            clock,
            lengths: lengths
                .iter()
                .map(|(path, length)| (PathBuf::from(path), *length))
                .collect(),
            broken: Vec::new(),
            current: None,
            started_at: 0.0,
            offset: 0.0,
            playing: false,
            volume: 0,
            loads: Vec::new(),
            stops: 0,
        }
    }
}

impl MediaBackend for ScriptedBackend {
    fn load(&mut self, path: &Path) -> Result<()> {
        if self.broken.iter().any(|broken| broken == path) {
            return Err(PlayerError::unloadable(path, "unsupported codec"));
        }
        self.current = Some(path.to_path_buf());
        self.loads.push(path.to_path_buf());
        self.offset = 0.0;
        self.playing = false;
        Ok(())
    }

    fn play(&mut self) {
        if !self.playing {
            self.started_at = self.clock.get();
            self.playing = true;
        }
    }

    fn pause(&mut self) {
        if self.playing {
            self.offset = self.position_seconds().unwrap_or(self.offset);
            self.playing = false;
        }
    }

    fn stop(&mut self) {
        self.current = None;
        self.playing = false;
        self.offset = 0.0;
        self.stops += 1;
    }

    fn set_volume(&mut self, level: u8) {
        self.volume = level;
    }

    fn seek(&mut self, seconds: f64) {
        self.offset = seconds;
        self.started_at = self.clock.get();
    }

    fn position_seconds(&self) -> Result<f64> {
        if !self.playing {
            return Ok(self.offset);
        }
        Ok(self.offset + self.clock.get() - self.started_at)
    }

    fn length_seconds(&self) -> Result<f64> {
        Ok(self
            .current
            .as_ref()
            .and_then(|path| self.lengths.get(path).copied())
            .unwrap_or(0.0))
    }

    fn request_metadata_parse(&mut self, _timeout: Duration) -> f64 {
        0.0
    }

    fn is_playing(&self) -> bool {
        self.current.is_some() && self.playing
    }
}

fn one_second_polls(loop_mode: LoopMode) -> PlayerConfig {
    PlayerConfig {
        poll_interval_ms: 1_000,
        end_epsilon_secs: 0.5,
        loop_mode,
        ..PlayerConfig::default()
    }
}

fn player(
    clock: &Rc<Cell<f64>>,
    lengths: &[(&str, f64)],
    config: PlayerConfig,
) -> Player<ScriptedBackend> {
    let backend = ScriptedBackend::new(Rc::clone(clock), lengths);
    let view = PlaylistView::from_paths(lengths.iter().map(|(path, _)| *path));
    Player::with_seed(backend, view, config, 7)
}

fn secs(value: u64) -> Duration {
    Duration::from_secs(value)
}

fn track_changes(events: &[RenderEvent]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|event| match event {
            RenderEvent::TrackChanged { index, .. } => Some(*index),
            _ => None,
        })
        .collect()
}

#[test]
fn end_of_track_advances_exactly_once() {
    let clock = Rc::new(Cell::new(0.0));
    let mut player = player(
        &clock,
        &[("a.mp3", 10.0), ("b.mp3", 0.4), ("c.mp3", 10.0)],
        one_second_polls(LoopMode::Off),
    );
    let start = Instant::now();
    player.engine_mut().select_and_play(0).expect("load");
    player.start(start);
    let mut sink: Vec<RenderEvent> = Vec::new();

    for tick in 0..9 {
        clock.set(tick as f64 + 0.6);
        player.step(start + secs(tick), &mut sink).expect("step");
        assert_eq!(player.engine().backend().loads.len(), 1, "tick {tick}");
    }

    clock.set(9.6);
    player.step(start + secs(9), &mut sink).expect("step");
    assert_eq!(player.engine().current_index(), Some(1));
    assert_eq!(player.engine().backend().loads.len(), 2);

    // New track still reports 0, which is already within epsilon of its end.
    player.step(start + secs(10), &mut sink).expect("step");
    assert_eq!(player.engine().current_index(), Some(1));
    assert_eq!(player.engine().backend().loads.len(), 2);

    clock.set(9.9);
    player.step(start + secs(11), &mut sink).expect("step");
    assert_eq!(player.engine().current_index(), Some(2));
    assert_eq!(track_changes(&sink), vec![0, 1, 2]);
}

#[test]
fn progress_events_carry_position_and_length() {
    let clock = Rc::new(Cell::new(0.0));
    let mut player = player(&clock, &[("a.mp3", 60.0)], one_second_polls(LoopMode::Off));
    let start = Instant::now();
    player.engine_mut().select_and_play(0).expect("load");
    player.start(start);
    let mut sink: Vec<RenderEvent> = Vec::new();

    clock.set(12.0);
    player.step(start, &mut sink).expect("step");

    let progress: Vec<_> = sink
        .iter()
        .filter_map(|event| match event {
            RenderEvent::Progress(position) => Some(*position),
            _ => None,
        })
        .collect();
    assert_eq!(progress.len(), 1);
    assert_eq!(progress[0].elapsed, 12.0);
    assert_eq!(progress[0].total, 60.0);
}

#[test]
fn unknown_length_never_auto_advances() {
    let clock = Rc::new(Cell::new(0.0));
    let mut player = player(
        &clock,
        &[("a.mp3", 0.0), ("b.mp3", 0.0)],
        one_second_polls(LoopMode::Off),
    );
    let start = Instant::now();
    player.engine_mut().select_and_play(0).expect("load");
    player.start(start);
    let mut sink: Vec<RenderEvent> = Vec::new();

    for tick in 0..30 {
        clock.set(tick as f64 * 10.0);
        player.step(start + secs(tick), &mut sink).expect("step");
    }

    assert_eq!(player.engine().backend().loads.len(), 1);
    assert_eq!(player.engine().state(), TransportState::Playing);
    assert!(
        !sink
            .iter()
            .any(|event| matches!(event, RenderEvent::Progress(_)))
    );
}

#[test]
fn last_track_ending_stops_playback() {
    let clock = Rc::new(Cell::new(0.0));
    let mut player = player(
        &clock,
        &[("a.mp3", 3.0), ("b.mp3", 3.0)],
        one_second_polls(LoopMode::Off),
    );
    let start = Instant::now();
    player.engine_mut().select_and_play(1).expect("load");
    player.start(start);
    let mut sink: Vec<RenderEvent> = Vec::new();

    for tick in 0..5 {
        clock.set(tick as f64);
        player.step(start + secs(tick), &mut sink).expect("step");
    }

    assert_eq!(player.engine().state(), TransportState::Stopped);
    assert!(!player.engine().is_loaded());
    assert_eq!(player.engine().advance_guard(), None);
    assert!(sink.contains(&RenderEvent::Transport(TransportState::Stopped)));
    assert_eq!(player.engine().backend().loads.len(), 1);
}

#[test]
fn loop_playlist_wraps_to_first_track() {
    let clock = Rc::new(Cell::new(0.0));
    let mut player = player(
        &clock,
        &[("a.mp3", 3.0), ("b.mp3", 3.0)],
        one_second_polls(LoopMode::LoopPlaylist),
    );
    let start = Instant::now();
    player.engine_mut().select_and_play(1).expect("load");
    player.start(start);
    let mut sink: Vec<RenderEvent> = Vec::new();

    for tick in 0..4 {
        clock.set(tick as f64);
        player.step(start + secs(tick), &mut sink).expect("step");
    }

    assert_eq!(player.engine().current_index(), Some(0));
    assert_eq!(player.engine().state(), TransportState::Playing);
}

#[test]
fn paused_track_is_never_advanced() {
    let clock = Rc::new(Cell::new(0.0));
    let mut player = player(
        &clock,
        &[("a.mp3", 3.0), ("b.mp3", 3.0)],
        one_second_polls(LoopMode::Off),
    );
    let start = Instant::now();
    player.engine_mut().select_and_play(0).expect("load");
    player.engine_mut().seek(2.9);
    player.engine_mut().pause();
    player.start(start);
    let mut sink: Vec<RenderEvent> = Vec::new();

    for tick in 0..5 {
        clock.set(tick as f64);
        player.step(start + secs(tick), &mut sink).expect("step");
    }

    assert_eq!(player.engine().current_index(), Some(0));
    assert_eq!(player.engine().state(), TransportState::Paused);
}

#[test]
fn broken_neighbour_is_skipped_once_per_completion() {
    let clock = Rc::new(Cell::new(0.0));
    let mut player = player(
        &clock,
        &[("a.mp3", 3.0), ("b.mp3", 3.0), ("c.mp3", 3.0)],
        one_second_polls(LoopMode::Off),
    );
    player
        .engine_mut()
        .backend_mut()
        .broken
        .push(PathBuf::from("b.mp3"));
    let start = Instant::now();
    player.engine_mut().select_and_play(0).expect("load");
    player.start(start);
    let mut sink: Vec<RenderEvent> = Vec::new();

    for tick in 0..5 {
        clock.set(tick as f64);
        player.step(start + secs(tick), &mut sink).expect("step");
    }

    let errors: Vec<&String> = sink
        .iter()
        .filter_map(|event| match event {
            RenderEvent::Error(message) => Some(message),
            _ => None,
        })
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("b.mp3"));
    assert_eq!(player.engine().current_index(), Some(2));
    assert_eq!(track_changes(&sink), vec![0, 2]);

    for tick in 5..20 {
        clock.set(tick as f64);
        player.step(start + secs(tick), &mut sink).expect("step");
    }
    assert_eq!(player.engine().state(), TransportState::Stopped);
    assert!(!player.engine().is_loaded());
    assert_eq!(
        sink.iter()
            .filter(|event| matches!(event, RenderEvent::Error(_)))
            .count(),
        1
    );
}

#[test]
fn trailing_broken_tracks_stop_playback() {
    let clock = Rc::new(Cell::new(0.0));
    let mut player = player(
        &clock,
        &[("a.mp3", 3.0), ("b.mp3", 3.0)],
        one_second_polls(LoopMode::Off),
    );
    player
        .engine_mut()
        .backend_mut()
        .broken
        .push(PathBuf::from("b.mp3"));
    let start = Instant::now();
    player.engine_mut().select_and_play(0).expect("load");
    player.start(start);
    let mut sink: Vec<RenderEvent> = Vec::new();

    for tick in 0..10 {
        clock.set(tick as f64);
        player.step(start + secs(tick), &mut sink).expect("step");
    }

    assert_eq!(player.engine().state(), TransportState::Stopped);
    assert!(!player.engine().is_loaded());
    assert_eq!(player.engine().backend().loads.len(), 1);
}

#[test]
fn track_hidden_by_filter_still_reports_and_ends() {
    let clock = Rc::new(Cell::new(0.0));
    let mut player = player(
        &clock,
        &[("a.mp3", 3.0), ("b.mp3", 3.0), ("c.mp3", 3.0)],
        one_second_polls(LoopMode::Off),
    );
    let start = Instant::now();
    player.engine_mut().select_and_play(2).expect("load");
    player.engine_mut().set_filter("a");
    assert_eq!(player.engine().current_index(), None);
    player.start(start);
    let mut sink: Vec<RenderEvent> = Vec::new();

    for tick in 0..6 {
        clock.set(tick as f64);
        player.step(start + secs(tick), &mut sink).expect("step");
    }

    assert!(
        sink.iter()
            .any(|event| matches!(event, RenderEvent::Progress(_)))
    );
    assert_eq!(player.engine().state(), TransportState::Stopped);
    assert!(!player.engine().is_loaded());
}

#[test]
fn volume_is_clamped_end_to_end() {
    let clock = Rc::new(Cell::new(0.0));
    let mut player = player(&clock, &[("a.mp3", 3.0)], PlayerConfig::default());

    player.engine_mut().set_volume(150);
    assert_eq!(player.engine().backend().volume, 100);
    player.engine_mut().set_volume(-20);
    assert_eq!(player.engine().backend().volume, 0);
    player.engine_mut().set_volume(42);
    assert_eq!(player.engine().backend().volume, 42);
}

#[test]
fn filter_is_an_order_preserving_subsequence() {
    let clock = Rc::new(Cell::new(0.0));
    let mut player = player(
        &clock,
        &[
            ("Beat It.mp3", 1.0),
            ("Blue.flac", 1.0),
            ("beach house.ogg", 1.0),
            ("Clair.wav", 1.0),
        ],
        PlayerConfig::default(),
    );

    player.engine_mut().set_filter("BE");
    let names: Vec<String> = player
        .engine()
        .navigator()
        .view()
        .iter()
        .map(|track| track.display_name())
        .collect();
    assert_eq!(names, vec!["Beat It.mp3", "beach house.ogg"]);

    player.engine_mut().clear_filter();
    assert_eq!(player.engine().navigator().len(), 4);
    assert_eq!(
        player
            .engine()
            .navigator()
            .track(3)
            .map(|track| track.display_name()),
        Some(String::from("Clair.wav"))
    );
}

#[test]
fn visualizer_settles_after_stop() {
    let clock = Rc::new(Cell::new(0.0));
    let mut player = player(&clock, &[("a.mp3", 60.0)], PlayerConfig::default());
    let start = Instant::now();
    player.engine_mut().select_and_play(0).expect("load");
    player.start(start);
    let mut sink: Vec<RenderEvent> = Vec::new();

    clock.set(5.0);
    player.step(start, &mut sink).expect("step");
    assert!(player.visualizer().heights().iter().any(|h| *h > 0.0));

    player.engine_mut().stop();
    for frame in 1..=12 {
        player
            .step(start + Duration::from_millis(30 * frame), &mut sink)
            .expect("step");
    }
    assert!(player.visualizer().heights().iter().all(|h| *h == 0.0));
}

#[test]
fn shutdown_stops_backend_and_timers() {
    let clock = Rc::new(Cell::new(0.0));
    let mut player = player(&clock, &[("a.mp3", 60.0)], PlayerConfig::default());
    let start = Instant::now();
    player.engine_mut().select_and_play(0).expect("load");
    player.start(start);
    let mut sink: Vec<RenderEvent> = Vec::new();
    player.step(start, &mut sink).expect("step");

    player.shutdown(&mut sink).expect("shutdown");
    assert!(player.is_shut_down());
    assert_eq!(player.engine().backend().stops, 1);
    assert_eq!(player.step(start + secs(60), &mut sink).expect("step"), 0);
}
