use crate::audio::MediaBackend;
use crate::engine::PlaybackEngine;
use crate::model::{PlaybackPosition, PlayerConfig, RenderEvent, TransportState};
use crate::navigator::PlaylistNavigator;
use crate::playlist::PlaylistView;
use crate::rotation::{Artwork, RotationAnimator};
use crate::scheduler::{CancellationToken, Scheduler, TaskKind};
use crate::sync::ProgressSynchronizer;
use crate::visualizer::VisualizationSampler;
use anyhow::Result;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::thread;
use std::time::{Duration, Instant};

const IDLE_SLEEP: Duration = Duration::from_millis(10);

/// Receives render-ready values. Drawing them is somebody else's job.
pub trait RenderSink {
    fn render(&mut self, event: &RenderEvent) -> Result<()>;
}

impl RenderSink for Vec<RenderEvent> {
    fn render(&mut self, event: &RenderEvent) -> Result<()> {
        self.push(event.clone());
        Ok(())
    }
}

/// Application root: owns the engine and every periodic task, and runs them
/// one at a time on a single loop.
pub struct Player<B: MediaBackend> {
    engine: PlaybackEngine<B>,
    synchronizer: ProgressSynchronizer,
    visualizer: VisualizationSampler,
    rotation: RotationAnimator,
    scheduler: Scheduler,
    pending: Vec<RenderEvent>,
    config: PlayerConfig,
}

impl<B: MediaBackend> Player<B> {
    pub fn new(backend: B, view: PlaylistView, config: PlayerConfig) -> Self {
        Self::from_rngs(
            backend,
            view,
            config,
            SmallRng::from_os_rng(),
            SmallRng::from_os_rng(),
        )
    }

    /// Deterministic shuffle and visualizer noise.
    pub fn with_seed(backend: B, view: PlaylistView, config: PlayerConfig, seed: u64) -> Self {
        Self::from_rngs(
            backend,
            view,
            config,
            SmallRng::seed_from_u64(seed),
            SmallRng::seed_from_u64(seed.wrapping_add(1)),
        )
    }

    fn from_rngs(
        backend: B,
        view: PlaylistView,
        config: PlayerConfig,
        navigation_rng: SmallRng,
        noise_rng: SmallRng,
    ) -> Self {
        let navigator = PlaylistNavigator::new(view, config.policy(), navigation_rng);
        Self {
            engine: PlaybackEngine::new(backend, navigator, &config),
            synchronizer: ProgressSynchronizer::new(config.end_epsilon_secs),
            visualizer: VisualizationSampler::new(
                config.bar_count,
                config.decay_rate,
                config.noise_amplitude,
                noise_rng,
            ),
            rotation: RotationAnimator::new(config.rotation_speed),
            scheduler: Scheduler::default(),
            pending: Vec::new(),
            config,
        }
    }

    /// Registers all periodic tasks, first due at `now`.
    pub fn start(&mut self, now: Instant) {
        let progress = self.config.poll_interval();
        let frame = self.config.frame_interval();
        let rotation = self.config.rotation_interval();
        self.scheduler.register(TaskKind::Progress, progress, now);
        self.scheduler.register(TaskKind::Visualizer, frame, now);
        self.scheduler.register(TaskKind::Rotation, rotation, now);
        self.scheduler.register(TaskKind::Render, frame, now);
    }

    /// Runs every task due at `now`, in order. Returns how many ran.
    pub fn step(&mut self, now: Instant, sink: &mut dyn RenderSink) -> Result<usize> {
        self.absorb_engine_events();
        let due = self.scheduler.due(now);
        for kind in &due {
            self.run_task(*kind, sink)?;
        }
        Ok(due.len())
    }

    fn run_task(&mut self, kind: TaskKind, sink: &mut dyn RenderSink) -> Result<()> {
        match kind {
            TaskKind::Progress => {
                let outcome = self.synchronizer.tick(&mut self.engine);
                if let Some(position) = outcome.position() {
                    self.pending.push(RenderEvent::Progress(position));
                }
                self.absorb_engine_events();
            }
            TaskKind::Visualizer => {
                let playing = self.engine.is_playing().then(|| PlaybackPosition {
                    elapsed: self.engine.position().unwrap_or(0.0),
                    total: self.engine.known_length(),
                });
                let frame = self.visualizer.tick(playing);
                tracing::trace!(bars = frame.bars.len(), "visualizer frame");
                self.pending.push(RenderEvent::Visualizer(frame));
            }
            TaskKind::Rotation => {
                if let Some(angle) = self.rotation.tick(self.engine.is_playing()) {
                    self.pending.push(RenderEvent::Rotation(angle));
                }
            }
            TaskKind::Render => self.flush(sink)?,
        }
        Ok(())
    }

    fn absorb_engine_events(&mut self) {
        for event in self.engine.take_events() {
            if matches!(event, RenderEvent::TrackChanged { .. })
                && let Some(path) = self.engine.loaded_path()
            {
                self.rotation.bind(Artwork::for_track(path));
            }
            self.pending.push(event);
        }
    }

    fn flush(&mut self, sink: &mut dyn RenderSink) -> Result<()> {
        for event in self.pending.drain(..) {
            sink.render(&event)?;
        }
        Ok(())
    }

    /// Loops until `token` is cancelled or `finished` says so, then tears
    /// everything down.
    pub fn run(
        &mut self,
        sink: &mut dyn RenderSink,
        token: &CancellationToken,
        mut finished: impl FnMut(&PlaybackEngine<B>) -> bool,
    ) -> Result<()> {
        self.start(Instant::now());
        let result = loop {
            if token.is_cancelled() || finished(&self.engine) {
                break Ok(());
            }
            if let Err(err) = self.step(Instant::now(), sink) {
                break Err(err);
            }
            let now = Instant::now();
            let wait = self
                .scheduler
                .next_deadline()
                .map_or(IDLE_SLEEP, |deadline| deadline.saturating_duration_since(now));
            if !wait.is_zero() {
                thread::sleep(wait);
            }
        };
        self.shutdown(sink)?;
        result
    }

    /// Cancels every timer, then stops the backend. There is no partial
    /// teardown.
    pub fn shutdown(&mut self, sink: &mut dyn RenderSink) -> Result<()> {
        self.scheduler.cancel_all();
        if self.engine.state() != TransportState::Stopped || self.engine.is_loaded() {
            self.engine.stop();
        }
        self.absorb_engine_events();
        self.flush(sink)?;
        tracing::info!("player shut down");
        Ok(())
    }

    pub fn engine(&self) -> &PlaybackEngine<B> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut PlaybackEngine<B> {
        &mut self.engine
    }

    pub fn visualizer(&self) -> &VisualizationSampler {
        &self.visualizer
    }

    pub fn rotation(&self) -> &RotationAnimator {
        &self.rotation
    }

    pub fn is_shut_down(&self) -> bool {
        self.scheduler.is_cancelled()
    }
}
