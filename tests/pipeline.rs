use mania_playfield::assets::{self, MemoryAssets};
use mania_playfield::core::clock::{Clock, ManualClock};
use mania_playfield::core::frame_loop::{CancelToken, FrameLoop, RenderSink};
use mania_playfield::game::layout::{StageLayout, StageSprites};
use mania_playfield::game::parsing::beatmap::{notes_from_beatmap, parse_beatmap};
use mania_playfield::game::parsing::skin_ini::parse;
use mania_playfield::game::playfield::{
    NoteHandle, NoteUpdate, PlayfieldMetrics, ScrollTimingEngine,
};
use mania_playfield::game::scroll::{ScrollDirection, ScrollSettings};
use mania_playfield::game::skin::SkinConfiguration;
use std::collections::HashMap;

const SKIN: &str = "[General]\nName: Pipeline\n\n[Mania]\nKeys: 4\nColumnStart: 192\nColumnWidth: 40,40,40,40\nHitPosition: 420\n\n[Mania]\nKeys: 7\nColumnWidth: 25\n";

const CHART: &str = "[General]\nAudioFilename: song.ogg\n\n[Difficulty]\nCircleSize: 4\n\n[HitObjects]\n64,192,500,1,0,0:0:0:0:\n192,192,700,128,0,1200:0:0:0:0:\n320,192,900,1,0,0:0:0:0:\n448,192,1100,1,0,0:0:0:0:\n";

struct Recorder<'a> {
    clock: &'a ManualClock,
    cancel: CancelToken,
    history: HashMap<NoteHandle, Vec<f32>>,
    released: Vec<NoteHandle>,
}

impl RenderSink for Recorder<'_> {
    fn apply(&mut self, update: &NoteUpdate) {
        assert!(!self.released.contains(&update.handle));
        self.history.entry(update.handle).or_default().push(update.y);
    }

    fn release(&mut self, handle: NoteHandle) {
        self.released.push(handle);
    }

    fn frame_done(&mut self, engine: &ScrollTimingEngine) {
        self.clock.advance(1000.0 / 60.0);
        if engine.is_finished() || self.clock.now_ms() > 60_000.0 {
            self.cancel.cancel();
        }
    }
}

#[test]
fn descriptor_to_frames() {
    let mut skin_assets = MemoryAssets::new();
    skin_assets.insert("skin.ini", SKIN.as_bytes().to_vec());
    let descriptor = assets::load_skin_descriptor(&skin_assets).expect("descriptor");
    let tree = parse(&descriptor);
    assert!(tree.has_section("Mania4K") && tree.has_section("Mania7K"));

    let chart = parse_beatmap(CHART);
    let keys = chart.key_count.expect("key count");
    let skin = SkinConfiguration::from_tree(&tree, keys).expect("skin");
    assert!((skin.total_width() - 4.0 * 64.0).abs() < 1e-3);

    let textures = assets::resolve_skin_textures(&skin, &skin_assets);
    assert!(!textures.missing.is_empty(), "no images were supplied");

    let screen = [1024.0, 768.0];
    let sprites = StageSprites::from_texture_dims(&skin, screen[1], |name| textures.dims_of(name));
    let layout = StageLayout::compute(&skin, screen, ScrollDirection::Down, &sprites).expect("layout");
    let hit_px = skin.hit_position_px(screen[1]);
    assert!((layout.judgement_line.rect.y - hit_px).abs() < 1e-3);

    let events = notes_from_beatmap(&chart, keys).expect("events");
    assert_eq!(events.len(), 4);

    let metrics = PlayfieldMetrics::from_skin(&skin, screen[1], 20.0);
    let mut engine = ScrollTimingEngine::new(events, ScrollSettings::default(), metrics);

    let clock = ManualClock::new(0.0);
    let frame_loop = FrameLoop::new(0, CancelToken::new());
    let mut recorder = Recorder {
        clock: &clock,
        cancel: frame_loop.cancel_token(),
        history: HashMap::new(),
        released: Vec::new(),
    };
    let frames = frame_loop.run(&mut engine, &clock, &mut recorder);

    assert!(frames > 0);
    assert!(engine.is_finished(), "every note should leave the screen");
    assert_eq!(recorder.released.len(), 4);
    for (handle, ys) in &recorder.history {
        assert!(
            ys.windows(2).all(|w| w[1] >= w[0]),
            "note {handle:?} moved backwards: {ys:?}"
        );
    }
}
