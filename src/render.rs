use crate::app::RenderSink;
use crate::model::{PlaybackPosition, RenderEvent, TransportState};
use anyhow::Result;
use std::io::Write;

const TIMELINE_WIDTH: usize = 30;

/// Plain terminal output: one status line that redraws in place, plus a
/// line per state change. Visualizer frames and angles only reach the log.
pub struct ConsoleRenderer<W: Write> {
    out: W,
    progress_open: bool,
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            progress_open: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) -> Result<()> {
        if self.progress_open {
            writeln!(self.out)?;
            self.progress_open = false;
        }
        writeln!(self.out, "{text}")?;
        Ok(())
    }
}

impl<W: Write> RenderSink for ConsoleRenderer<W> {
    fn render(&mut self, event: &RenderEvent) -> Result<()> {
        match event {
            RenderEvent::Progress(position) => {
                write!(self.out, "\r{}", timeline_line(*position))?;
                self.out.flush()?;
                self.progress_open = true;
            }
            RenderEvent::TrackChanged {
                index,
                display_name,
            } => self.line(&format!("now playing #{}: {display_name}", index + 1))?,
            RenderEvent::Transport(state) => self.line(transport_label(*state))?,
            RenderEvent::Volume(level) => self.line(&format!("volume {level}%"))?,
            RenderEvent::Policy(policy) => self.line(&format!(
                "loop {} | shuffle {}",
                policy.loop_mode.label(),
                if policy.shuffle { "on" } else { "off" }
            ))?,
            RenderEvent::Error(message) => self.line(&format!("error: {message}"))?,
            RenderEvent::Visualizer(frame) => {
                tracing::trace!(bars = frame.bars.len(), "frame");
            }
            RenderEvent::Rotation(angle) => tracing::trace!(angle, "rotation"),
        }
        Ok(())
    }
}

fn transport_label(state: TransportState) -> &'static str {
    match state {
        TransportState::Stopped => "stopped",
        TransportState::Playing => "playing",
        TransportState::Paused => "paused",
    }
}

/// `mm:ss`, minutes uncapped. Negative or non-finite input reads as 0.
pub fn format_time(seconds: f64) -> String {
    let total_seconds = if seconds.is_finite() {
        seconds.max(0.0) as u64
    } else {
        0
    };
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{minutes:02}:{seconds:02}")
}

pub fn progress_bar(ratio: Option<f64>, width: usize) -> String {
    let clamped = ratio.unwrap_or(0.0).clamp(0.0, 1.0);
    let filled = (clamped * width as f64).round() as usize;
    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    bar.push_str(&"#".repeat(filled));
    bar.push_str(&"-".repeat(width.saturating_sub(filled)));
    bar.push(']');
    bar
}

pub fn timeline_line(position: PlaybackPosition) -> String {
    let ratio = (position.total > 0.0).then(|| position.elapsed / position.total);
    let total = if position.total > 0.0 {
        format_time(position.total)
    } else {
        String::from("--:--")
    };
    format!(
        "{} {} / {total}",
        progress_bar(ratio, TIMELINE_WIDTH),
        format_time(position.elapsed)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NavigationPolicy;

    #[test]
    fn time_is_minutes_and_seconds() {
        assert_eq!(format_time(0.0), "00:00");
        assert_eq!(format_time(59.9), "00:59");
        assert_eq!(format_time(61.0), "01:01");
        assert_eq!(format_time(3_725.0), "62:05");
        assert_eq!(format_time(-4.0), "00:00");
        assert_eq!(format_time(f64::NAN), "00:00");
    }

    #[test]
    fn progress_bar_clamps_ratio() {
        assert_eq!(progress_bar(Some(0.5), 4), "[##--]");
        assert_eq!(progress_bar(Some(3.0), 4), "[####]");
        assert_eq!(progress_bar(None, 3), "[---]");
    }

    #[test]
    fn unknown_total_shows_placeholder() {
        let line = timeline_line(PlaybackPosition {
            elapsed: 12.0,
            total: 0.0,
        });
        assert!(line.ends_with("00:12 / --:--"));
    }

    #[test]
    fn status_lines_break_the_progress_line() {
        let mut renderer = ConsoleRenderer::new(Vec::new());
        renderer
            .render(&RenderEvent::Progress(PlaybackPosition {
                elapsed: 30.0,
                total: 60.0,
            }))
            .expect("render");
        renderer
            .render(&RenderEvent::Policy(NavigationPolicy::default()))
            .expect("render");

        let text = String::from_utf8(renderer.into_inner()).expect("utf8");
        assert!(text.starts_with('\r'));
        assert!(text.contains("00:30 / 01:00\n"));
        assert!(text.ends_with("loop Off | shuffle off\n"));
    }
}
