use log::{debug, info, trace, warn};
use mania_playfield::assets::{self, DirAssets};
use mania_playfield::config;
use mania_playfield::core::clock::InstantClock;
use mania_playfield::core::frame_loop::{CancelToken, FrameLoop, RenderSink};
use mania_playfield::game::layout::{StageLayout, StageSprites};
use mania_playfield::game::parsing::beatmap::{self, Beatmap};
use mania_playfield::game::parsing::skin_ini::{self, POSITION_SCALE_FACTOR};
use mania_playfield::game::playfield::{
    NoteHandle, NoteUpdate, PlayfieldMetrics, ScrollTimingEngine,
};
use mania_playfield::game::skin::SkinConfiguration;

const SKIN_DUMP_PATH: &str = "skin.json";
// Stock osu! note body height, in logical units.
const FALLBACK_NOTE_HEIGHT: f32 = 13.0;

/// Stands in for a sprite renderer: tracks live notes and logs their moves.
struct LoggingSink {
    cancel: CancelToken,
    live: usize,
    released: usize,
}

impl RenderSink for LoggingSink {
    fn apply(&mut self, update: &NoteUpdate) {
        trace!(
            "note {:?} col {} y={:.1} visible={}",
            update.handle, update.column, update.y, update.visible
        );
    }

    fn release(&mut self, handle: NoteHandle) {
        debug!("note {handle:?} released");
        self.released += 1;
    }

    fn frame_done(&mut self, engine: &ScrollTimingEngine) {
        self.live = engine.notes().iter().filter(|n| n.visible).count();
        if engine.is_finished() {
            self.cancel.cancel();
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install logger immediately, then set runtime max level from config after loading it.
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .try_init();
    // Startup default when config is missing or malformed.
    log::set_max_level(log::LevelFilter::Warn);

    let cfg = config::load(config::CONFIG_PATH);
    log::set_max_level(cfg.log_level.as_level_filter());

    let skin_assets = match DirAssets::open(&cfg.skin_dir) {
        Ok(found) => Some(found),
        Err(e) => {
            warn!("Skin directory '{}' unavailable ({e}); using built-in metrics.", cfg.skin_dir.display());
            None
        }
    };
    let descriptor = skin_assets
        .as_ref()
        .and_then(|a| assets::load_skin_descriptor(a))
        .unwrap_or_default();
    let tree = skin_ini::parse(&descriptor);
    if cfg.dump_skin {
        std::fs::write(SKIN_DUMP_PATH, serde_json::to_string_pretty(&tree)?)?;
        info!("Resolved skin written to '{SKIN_DUMP_PATH}'.");
    }

    let chart = match &cfg.beatmap {
        Some(path) => beatmap::parse_beatmap(&std::fs::read_to_string(path)?),
        None => Beatmap::default(),
    };
    let keys = chart.key_count.filter(|k| *k > 0).unwrap_or(cfg.key_count);
    let skin = SkinConfiguration::from_tree(&tree, keys)?;

    let textures = skin_assets
        .as_ref()
        .map(|a| assets::resolve_skin_textures(&skin, a))
        .unwrap_or_default();
    if !textures.missing.is_empty() {
        warn!("{} skin image reference(s) could not be resolved.", textures.missing.len());
    }

    let screen = cfg.screen_size();
    let sprites = StageSprites::from_texture_dims(&skin, screen[1], |name| textures.dims_of(name));
    let layout = StageLayout::compute(&skin, screen, cfg.scroll_direction, &sprites)?;
    info!(
        "{keys}K stage: x={:.1} width={:.1}, judgement line at y={:.1} ({}).",
        layout.judgement_line.rect.x,
        layout.judgement_line.rect.w,
        layout.judgement_line.rect.y,
        if layout.judgement_line.visible { "shown" } else { "hidden" }
    );

    let events = beatmap::notes_from_beatmap(&chart, keys)?;
    if events.is_empty() {
        info!("No notes to play.");
        return Ok(());
    }

    let note_height = if cfg.note_height > 0.0 {
        cfg.note_height
    } else if sprites.note_height > 0.0 {
        sprites.note_height
    } else {
        FALLBACK_NOTE_HEIGHT * POSITION_SCALE_FACTOR
    };
    let metrics = PlayfieldMetrics::from_skin(&skin, screen[1], note_height);
    let mut engine = ScrollTimingEngine::new(events, cfg.scroll_settings(), metrics);

    let frame_loop = FrameLoop::new(cfg.target_fps, CancelToken::new());
    let mut sink = LoggingSink {
        cancel: frame_loop.cancel_token(),
        live: 0,
        released: 0,
    };
    let mut clock = InstantClock::new(chart.audio_lead_in_ms, 1.0);
    clock.start();
    let frames = frame_loop.run(&mut engine, &clock, &mut sink);

    info!(
        "Playback finished after {frames} frames: {} notes released, {} still visible.",
        sink.released, sink.live
    );
    Ok(())
}
