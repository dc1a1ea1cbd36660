use std::ffi::OsStr;
use std::fs::File;
use std::path::{Path, PathBuf};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::{Hint, ProbeResult};
use symphonia::default::get_probe;
use walkdir::WalkDir;

pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "m4a", "ogg"];

pub fn is_supported(path: &Path) -> bool {
    let ext = path.extension().and_then(OsStr::to_str).unwrap_or_default();
    SUPPORTED_EXTENSIONS
        .iter()
        .any(|supported| ext.eq_ignore_ascii_case(supported))
}

/// Keeps candidates with a supported extension, in input order. Everything
/// else is dropped without complaint.
pub fn filter_supported<I, P>(candidates: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    candidates
        .into_iter()
        .map(Into::into)
        .filter(|path| is_supported(path))
        .collect()
}

pub fn scan_folder(root: &Path) -> Vec<PathBuf> {
    let mut tracks: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_supported(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    tracks.sort();
    tracks
}

fn probe(path: &Path) -> Option<ProbeResult> {
    let stripped = crate::config::strip_windows_verbatim_prefix(path);
    let file = File::open(&stripped).ok()?;
    let source = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    if let Some(extension) = stripped.extension().and_then(OsStr::to_str) {
        hint.with_extension(extension);
    }

    get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .ok()
}

/// Container-reported duration in seconds, if the header carries one.
pub fn probe_duration(path: &Path) -> Option<f64> {
    let probed = probe(path)?;
    let track = probed.format.default_track()?;
    let params = &track.codec_params;

    if let (Some(time_base), Some(frame_count)) = (params.time_base, params.n_frames) {
        let time = time_base.calc_time(frame_count);
        return Some(time.seconds as f64 + time.frac);
    }

    params
        .n_frames
        .zip(params.sample_rate)
        .filter(|(_, sample_rate)| *sample_rate > 0)
        .map(|(frame_count, sample_rate)| frame_count as f64 / f64::from(sample_rate))
}

pub fn has_embedded_cover(path: &Path) -> bool {
    let Some(mut probed) = probe(path) else {
        return false;
    };

    let in_container = probed.format.metadata().current().is_some_and(|revision| {
        revision
            .visuals()
            .iter()
            .any(|visual| !visual.data.is_empty())
    });
    if in_container {
        return true;
    }

    probed.metadata.get().is_some_and(|metadata| {
        metadata.current().is_some_and(|revision| {
            revision
                .visuals()
                .iter()
                .any(|visual| !visual.data.is_empty())
        })
    })
}
