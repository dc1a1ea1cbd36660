use crate::error::{PlayerError, Result};
use crate::library;
use anyhow::Context;
use rodio::Source;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
#[cfg(unix)]
use std::ffi::CString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// Control surface of whatever actually decodes and outputs audio.
///
/// Calls are synchronous and never overlap; the engine serializes them on the
/// cooperative loop.
pub trait MediaBackend {
    fn load(&mut self, path: &Path) -> Result<()>;
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    /// `level` is already clamped to `0..=100`.
    fn set_volume(&mut self, level: u8);
    fn seek(&mut self, seconds: f64);
    fn position_seconds(&self) -> Result<f64>;
    /// 0 means the backend does not know the length yet.
    fn length_seconds(&self) -> Result<f64>;
    /// Parses the loaded media for its duration, waiting at most `timeout`.
    /// Returns 0 when the duration is still unknown.
    fn request_metadata_parse(&mut self, timeout: Duration) -> f64;
    fn is_playing(&self) -> bool;
}

pub struct RodioBackend {
    stream: OutputStream,
    sink: Sink,
    current: Option<PathBuf>,
    track_duration: Option<Duration>,
    parsed_length: f64,
    volume: u8,
}

impl RodioBackend {
    pub fn new() -> anyhow::Result<Self> {
        let stream = Self::open_output_stream()?;
        let sink = Sink::connect_new(stream.mixer());

        Ok(Self {
            stream,
            sink,
            current: None,
            track_duration: None,
            parsed_length: 0.0,
            volume: 100,
        })
    }

    fn open_output_stream() -> anyhow::Result<OutputStream> {
        let mut stream = with_silenced_stderr(|| {
            OutputStreamBuilder::from_default_device()
                .context("failed to open default system output stream")?
                .with_error_callback(|_| {})
                .open_stream_or_fallback()
                .context("failed to start default output stream")
        })?;
        stream.log_on_drop(false);
        Ok(stream)
    }

    fn apply_volume(&self) {
        self.sink.set_volume(f32::from(self.volume) / 100.0);
    }
}

impl MediaBackend for RodioBackend {
    fn load(&mut self, path: &Path) -> Result<()> {
        let file = File::open(path).map_err(|err| PlayerError::unloadable(path, err))?;
        let source = Decoder::try_from(file).map_err(|err| PlayerError::unloadable(path, err))?;

        self.sink.stop();
        self.sink = Sink::connect_new(self.stream.mixer());
        self.track_duration = source.total_duration().filter(|d| !d.is_zero());
        self.parsed_length = 0.0;
        self.sink.pause();
        self.sink.append(source);
        self.apply_volume();
        self.current = Some(path.to_path_buf());
        Ok(())
    }

    fn play(&mut self) {
        self.sink.play();
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn stop(&mut self) {
        self.sink.stop();
        self.current = None;
        self.track_duration = None;
        self.parsed_length = 0.0;
    }

    fn set_volume(&mut self, level: u8) {
        self.volume = level.min(100);
        self.apply_volume();
    }

    fn seek(&mut self, seconds: f64) {
        if self.current.is_none() {
            return;
        }
        if let Err(err) = self.sink.try_seek(Duration::from_secs_f64(seconds.max(0.0))) {
            tracing::debug!(error = ?err, seconds, "seek rejected by output");
        }
    }

    fn position_seconds(&self) -> Result<f64> {
        if self.current.is_none() {
            return Ok(0.0);
        }
        Ok(self.sink.get_pos().as_secs_f64())
    }

    fn length_seconds(&self) -> Result<f64> {
        Ok(self
            .track_duration
            .map(|duration| duration.as_secs_f64())
            .unwrap_or(self.parsed_length))
    }

    fn request_metadata_parse(&mut self, timeout: Duration) -> f64 {
        let Some(path) = self.current.clone() else {
            return 0.0;
        };
        let seconds = probe_duration_with_timeout(path, timeout);
        if seconds > 0.0 {
            self.parsed_length = seconds;
        }
        seconds
    }

    fn is_playing(&self) -> bool {
        self.current.is_some() && !self.sink.is_paused() && !self.sink.empty()
    }
}

fn probe_duration_with_timeout(path: PathBuf, timeout: Duration) -> f64 {
    probe_with_timeout(path, timeout, library::probe_duration)
}

/// Runs `probe` on a helper thread and gives up after `timeout`. A late
/// result is dropped with the channel.
fn probe_with_timeout<F>(path: PathBuf, timeout: Duration, probe: F) -> f64
where
    F: FnOnce(&Path) -> Option<f64> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name(String::from("pulse-duration-probe"))
        .spawn(move || {
            let _ = tx.send(probe(&path));
        });
    if let Err(err) = spawned {
        tracing::warn!(error = %err, "failed to spawn duration probe");
        return 0.0;
    }

    match rx.recv_timeout(timeout) {
        Ok(Some(seconds)) => seconds,
        Ok(None) => 0.0,
        Err(_) => {
            tracing::debug!(?timeout, "duration probe timed out");
            0.0
        }
    }
}

#[cfg(unix)]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    let saved = unsafe { libc::dup(libc::STDERR_FILENO) };
    if saved < 0 {
        return operation();
    }

    let devnull = CString::new("/dev/null")
        .ok()
        .map(|path| unsafe { libc::open(path.as_ptr(), libc::O_WRONLY) })
        .unwrap_or(-1);

    if devnull >= 0 {
        unsafe {
            libc::dup2(devnull, libc::STDERR_FILENO);
            libc::close(devnull);
        }
    }

    let result = operation();

    unsafe {
        libc::dup2(saved, libc::STDERR_FILENO);
        libc::close(saved);
    }

    result
}

#[cfg(not(unix))]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    operation()
}

/// Backend with no audio device: keeps a logical clock so the core behaves
/// as if the track were playing.
pub struct NullBackend {
    paused: bool,
    current: Option<PathBuf>,
    volume: u8,
    started_at: Option<Instant>,
    position_offset: Duration,
    track_duration: Option<Duration>,
}

impl NullBackend {
    pub fn new() -> Self {
        Self {
            paused: true,
            current: None,
            volume: 100,
            started_at: None,
            position_offset: Duration::ZERO,
            track_duration: None,
        }
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn current_track(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    fn current_position(&self) -> Duration {
        let mut position = self.position_offset;
        if !self.paused
            && self.current.is_some()
            && let Some(started_at) = self.started_at
        {
            position = position.saturating_add(started_at.elapsed());
        }
        if let Some(duration) = self.track_duration {
            return position.min(duration);
        }
        position
    }
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaBackend for NullBackend {
    fn load(&mut self, path: &Path) -> Result<()> {
        self.paused = true;
        self.current = Some(path.to_path_buf());
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.track_duration = library::probe_duration(path)
            .filter(|seconds| *seconds > 0.0)
            .map(Duration::from_secs_f64);
        Ok(())
    }

    fn play(&mut self) {
        if self.current.is_some() && self.paused {
            self.started_at = Some(Instant::now());
            self.paused = false;
        }
    }

    fn pause(&mut self) {
        if self.paused {
            return;
        }
        self.position_offset = self.current_position();
        self.started_at = None;
        self.paused = true;
    }

    fn stop(&mut self) {
        self.current = None;
        self.paused = true;
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.track_duration = None;
    }

    fn set_volume(&mut self, level: u8) {
        self.volume = level.min(100);
    }

    fn seek(&mut self, seconds: f64) {
        if self.current.is_none() {
            return;
        }
        let position = Duration::from_secs_f64(seconds.max(0.0));
        self.position_offset = self
            .track_duration
            .map_or(position, |duration| position.min(duration));
        self.started_at = if self.paused {
            None
        } else {
            Some(Instant::now())
        };
    }

    fn position_seconds(&self) -> Result<f64> {
        if self.current.is_none() {
            return Ok(0.0);
        }
        Ok(self.current_position().as_secs_f64())
    }

    fn length_seconds(&self) -> Result<f64> {
        Ok(self
            .track_duration
            .map(|duration| duration.as_secs_f64())
            .unwrap_or(0.0))
    }

    fn request_metadata_parse(&mut self, _timeout: Duration) -> f64 {
        self.length_seconds().unwrap_or(0.0)
    }

    fn is_playing(&self) -> bool {
        let finished = self
            .track_duration
            .is_some_and(|duration| self.current_position() >= duration);
        self.current.is_some() && !self.paused && !finished
    }
}
