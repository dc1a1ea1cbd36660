#![no_main]

use libfuzzer_sys::fuzz_target;
use pulse::audio::NullBackend;
use pulse::engine::PlaybackEngine;
use pulse::model::{NavigationPolicy, PlayerConfig};
use pulse::navigator::PlaylistNavigator;
use pulse::playlist::PlaylistView;

const QUERIES: [&str; 4] = ["", "1", "track_2", "zzz"];

fuzz_target!(|data: &[u8]| {
    let len = (data.len() % 32).max(1);
    let view = PlaylistView::from_paths((0..len).map(|idx| format!("track_{idx}.mp3")));
    let navigator = PlaylistNavigator::seeded(view, NavigationPolicy::default(), len as u64);
    let mut engine = PlaybackEngine::new(NullBackend::new(), navigator, &PlayerConfig::default());

    for byte in data {
        match byte % 12 {
            0 => engine.play(),
            1 => engine.pause(),
            2 => engine.stop(),
            3 => {
                let _ = engine.next();
            }
            4 => {
                let _ = engine.previous();
            }
            5 => {
                engine.auto_advance();
            }
            6 => engine.cycle_loop_mode(),
            7 => engine.toggle_shuffle(),
            8 => engine.set_filter(QUERIES[usize::from(byte / 12) % QUERIES.len()]),
            9 => engine.set_volume(i32::from(*byte) - 64),
            10 => {
                let _ = engine.select_and_play(usize::from(*byte) % (len + 2));
            }
            _ => engine.seek(f64::from(*byte) - 100.0),
        }

        if let Some(index) = engine.current_index() {
            assert!(index < engine.navigator().len());
        }
        assert!(engine.volume() <= 100);
        engine.take_events();
    }
});
