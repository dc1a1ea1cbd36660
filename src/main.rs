use pulse::app::Player;
use pulse::audio::{MediaBackend, NullBackend, RodioBackend};
use pulse::config;
use pulse::library;
use pulse::model::{LoopMode, PlayerConfig};
use pulse::playlist::PlaylistView;
use pulse::render::ConsoleRenderer;
use pulse::scheduler::CancellationToken;
use std::io;
use std::path::PathBuf;

#[derive(Debug, Default)]
struct CliArgs {
    inputs: Vec<PathBuf>,
    shuffle: bool,
    loop_mode: Option<LoopMode>,
    volume: Option<u8>,
    filter: Option<String>,
    null_audio: bool,
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1).collect())?;

    let root = config::ensure_config_dir()?;
    let _log_guard = pulse::logging::init_logging(&root.join("logs"))?;

    let mut config = config::load_or_init(&config::config_path()?)?;
    if args.shuffle {
        config.shuffle = true;
    }
    if let Some(mode) = args.loop_mode {
        config.loop_mode = mode;
    }
    if let Some(volume) = args.volume {
        config.initial_volume = volume;
    }

    let view = PlaylistView::from_paths(collect_tracks(&args.inputs));
    if view.is_empty() {
        anyhow::bail!("no playable tracks found (supported: mp3, wav, flac, m4a, ogg)");
    }
    tracing::info!(tracks = view.total_len(), "playlist ready");

    if args.null_audio {
        return run_player(NullBackend::new(), view, config, args.filter.as_deref());
    }
    match RodioBackend::new() {
        Ok(backend) => run_player(backend, view, config, args.filter.as_deref()),
        Err(err) => {
            tracing::warn!(error = %err, "audio output unavailable, using silent backend");
            eprintln!("audio output unavailable ({err}), playing silently");
            run_player(NullBackend::new(), view, config, args.filter.as_deref())
        }
    }
}

fn run_player<B: MediaBackend>(
    backend: B,
    view: PlaylistView,
    config: PlayerConfig,
    filter: Option<&str>,
) -> anyhow::Result<()> {
    let mut player = Player::new(backend, view, config);
    if let Some(query) = filter {
        player.engine_mut().set_filter(query);
    }

    let len = player.engine().navigator().len();
    if len == 0 {
        anyhow::bail!("filter matched no tracks");
    }
    let started = (0..len).any(|index| player.engine_mut().select_and_play(index).is_ok());
    if !started {
        anyhow::bail!("none of the {len} tracks could be loaded");
    }

    let mut renderer = ConsoleRenderer::new(io::stdout());
    let token = CancellationToken::new();
    player.run(&mut renderer, &token, |engine| !engine.is_loaded())?;
    println!();
    Ok(())
}

fn collect_tracks(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut tracks = Vec::new();
    for input in inputs {
        if input.is_dir() {
            tracks.extend(library::scan_folder(input));
        } else {
            tracks.push(input.clone());
        }
    }
    tracks
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--shuffle" => out.shuffle = true,
            "--null-audio" => out.null_audio = true,
            "--loop" => {
                index += 1;
                out.loop_mode = Some(match args.get(index).map(String::as_str) {
                    Some("off") => LoopMode::Off,
                    Some("playlist") => LoopMode::LoopPlaylist,
                    Some("single") => LoopMode::LoopSingle,
                    _ => anyhow::bail!("--loop requires off, playlist or single"),
                });
            }
            "--volume" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--volume requires a value between 0 and 100");
                };
                let level: i32 = value
                    .trim()
                    .parse()
                    .map_err(|_| anyhow::anyhow!("--volume must be a number, got {value}"))?;
                out.volume = Some(level.clamp(0, 100) as u8);
            }
            "--filter" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--filter requires a query");
                };
                out.filter = Some(value.clone());
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other if other.starts_with("--") => anyhow::bail!("unknown argument {other}"),
            path => out.inputs.push(PathBuf::from(path)),
        }
        index += 1;
    }
    if out.inputs.is_empty() {
        anyhow::bail!("pass at least one audio file or folder (see --help)");
    }
    Ok(out)
}

fn print_help() {
    println!("pulse [options] <file|folder>...");
    println!("  --shuffle         Pick the next track at random");
    println!("  --loop MODE       off, playlist or single");
    println!("  --volume N        Initial volume, 0-100");
    println!("  --filter QUERY    Only play tracks whose name contains QUERY");
    println!("  --null-audio      Run without an audio device");
}
