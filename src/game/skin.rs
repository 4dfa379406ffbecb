use crate::error::PlayfieldError;
use crate::game::parsing::skin_ini::{
    self, DEFAULT_COLUMN_LINE_WIDTH, DEFAULT_COLUMN_SPACING, DEFAULT_COLUMN_START,
    DEFAULT_COLUMN_WIDTH, DEFAULT_COMBO_POSITION, DEFAULT_HIT_POSITION, DEFAULT_LIGHT_FPS,
    DEFAULT_LIGHT_POSITION, DEFAULT_SCORE_POSITION, POSITION_SCALE_FACTOR, RawConfigTree,
    SkinValue,
};
use log::debug;

/// Width of the logical playfield that `ColumnStart` is measured against.
pub const LOGICAL_PLAYFIELD_WIDTH: f32 = 384.0;

const ENABLED: &str = "1";
const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
const BLACK: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Asset names (lowercase) for everything the stage draws.
#[derive(Debug, Clone, PartialEq)]
pub struct SkinImages {
    pub keys: Vec<String>,
    pub keys_down: Vec<String>,
    pub notes: Vec<String>,
    pub hold_heads: Vec<String>,
    pub hold_bodies: Vec<String>,
    pub hold_tails: Vec<String>,
    pub stage_left: String,
    pub stage_right: String,
    pub stage_bottom: String,
    pub stage_hint: String,
    pub stage_light: String,
}

impl SkinImages {
    /// `(descriptor key, asset name)` for every image the skin references.
    pub fn referenced(&self) -> Vec<(String, &str)> {
        let mut out = Vec::new();
        let per_column: [(&str, &[String]); 6] = [
            ("KeyImage{}", &self.keys),
            ("KeyImage{}D", &self.keys_down),
            ("NoteImage{}", &self.notes),
            ("NoteImage{}H", &self.hold_heads),
            ("NoteImage{}L", &self.hold_bodies),
            ("NoteImage{}T", &self.hold_tails),
        ];
        for (pattern, names) in per_column {
            for (col, name) in names.iter().enumerate() {
                out.push((pattern.replace("{}", &col.to_string()), name.as_str()));
            }
        }
        out.push(("StageLeft".to_string(), self.stage_left.as_str()));
        out.push(("StageRight".to_string(), self.stage_right.as_str()));
        out.push(("StageBottom".to_string(), self.stage_bottom.as_str()));
        out.push(("StageHint".to_string(), self.stage_hint.as_str()));
        out.push(("StageLight".to_string(), self.stage_light.as_str()));
        out
    }
}

/// Resolved metrics for one key-count variant.
///
/// Positions and sizes are in the scaled unit (descriptor value times
/// [`POSITION_SCALE_FACTOR`]); line widths and `column_start` are kept as
/// written.
#[derive(Debug, Clone, PartialEq)]
pub struct SkinConfiguration {
    pub keys: usize,
    pub column_width: Vec<f32>,
    pub column_line_width: Vec<f32>,
    pub column_spacing: Vec<f32>,
    pub hit_position: f32,
    pub column_start: f32,
    pub light_position: f32,
    pub combo_position: f32,
    pub score_position: f32,
    pub light_frame_per_second: f32,
    pub judgement_line: bool,
    pub judgement_line_colour: [f32; 4],
    pub keys_under_notes: bool,
    pub column_colours: Vec<[f32; 4]>,
    pub column_light_colours: Vec<[f32; 4]>,
    pub images: SkinImages,
}

struct SectionReader<'a> {
    tree: &'a RawConfigTree,
    section: String,
}

impl SectionReader<'_> {
    fn get(&self, key: &str) -> Option<&SkinValue> {
        self.tree.get(&self.section, key)
    }

    fn number(&self, key: &str, fallback: f32) -> f32 {
        self.get(key).map_or(fallback, SkinValue::as_number)
    }

    fn flag(&self, key: &str, fallback: bool) -> bool {
        match self.get(key) {
            Some(SkinValue::Text(s)) => s == ENABLED,
            Some(other) => other.as_number() == 1.0,
            None => fallback,
        }
    }

    fn text(&self, key: &str) -> Option<String> {
        self.get(key)
            .and_then(SkinValue::as_text)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    fn columns(&self, key: &str, scale: f32, len: usize, fallback: f32) -> Vec<f32> {
        let values = self.get(key).map(|v| v.to_list(scale)).unwrap_or_default();
        fit_columns(values, len, fallback)
    }

    fn colour(&self, key: &str, fallback: [f32; 4]) -> [f32; 4] {
        self.get(key)
            .map(|v| v.to_list(1.0))
            .and_then(|channels| rgba_from_channels(&channels))
            .unwrap_or(fallback)
    }
}

/// Pads with the last value (or `fallback`) and truncates to `len`.
fn fit_columns(mut values: Vec<f32>, len: usize, fallback: f32) -> Vec<f32> {
    let pad = values.last().copied().unwrap_or(fallback);
    values.resize(len, pad);
    values
}

/// 0..255 RGB or RGBA channels to a normalized colour.
pub fn rgba_from_channels(channels: &[f32]) -> Option<[f32; 4]> {
    if channels.len() < 3 {
        return None;
    }
    let norm = |v: f32| (v / 255.0).clamp(0.0, 1.0);
    let alpha = channels.get(3).copied().map_or(1.0, norm);
    Some([norm(channels[0]), norm(channels[1]), norm(channels[2]), alpha])
}

/// Stock image suffix for a column: `s` for the centre of odd layouts,
/// then `1`/`2` alternating outward from the edges.
fn default_column_variant(col: usize, keys: usize) -> &'static str {
    if keys % 2 == 1 && col == keys / 2 {
        return "s";
    }
    let from_edge = col.min(keys - 1 - col);
    if from_edge % 2 == 0 { "1" } else { "2" }
}

impl SkinConfiguration {
    /// Builds the configuration for `Mania<keys>K`, defaulting any field the
    /// tree does not carry.
    pub fn from_tree(tree: &RawConfigTree, keys: usize) -> Result<Self, PlayfieldError> {
        if keys < 1 {
            return Err(PlayfieldError::InvalidKeyCount(keys as i64));
        }
        let reader = SectionReader {
            tree,
            section: skin_ini::mania_section(keys),
        };
        if !tree.has_section(&reader.section) {
            debug!("[{}] not present; using stock metrics", reader.section);
        }

        let default_hit = skin_ini::invert_hit_position(DEFAULT_HIT_POSITION);
        let column_images = |pattern: &str, stock: &str| -> Vec<String> {
            (0..keys)
                .map(|col| {
                    let key = pattern.replace("{}", &col.to_string());
                    reader.text(&key).unwrap_or_else(|| {
                        stock.replace("{}", default_column_variant(col, keys))
                    })
                })
                .collect()
        };
        let images = SkinImages {
            keys: column_images("KeyImage{}", "mania-key{}"),
            keys_down: column_images("KeyImage{}D", "mania-key{}d"),
            notes: column_images("NoteImage{}", "mania-note{}"),
            hold_heads: column_images("NoteImage{}H", "mania-note{}h"),
            hold_bodies: column_images("NoteImage{}L", "mania-note{}l"),
            hold_tails: column_images("NoteImage{}T", "mania-note{}h"),
            stage_left: reader.text("StageLeft").unwrap_or_else(|| "mania-stage-left".into()),
            stage_right: reader.text("StageRight").unwrap_or_else(|| "mania-stage-right".into()),
            stage_bottom: reader.text("StageBottom").unwrap_or_else(|| "mania-stage-bottom".into()),
            stage_hint: reader.text("StageHint").unwrap_or_else(|| "mania-stage-hint".into()),
            stage_light: reader.text("StageLight").unwrap_or_else(|| "mania-stage-light".into()),
        };

        let column_colours = (0..keys)
            .map(|col| reader.colour(&format!("Colour{}", col + 1), BLACK))
            .collect();
        let column_light_colours = (0..keys)
            .map(|col| reader.colour(&format!("ColourLight{}", col + 1), WHITE))
            .collect();

        Ok(Self {
            keys,
            column_width: reader.columns(
                "ColumnWidth",
                POSITION_SCALE_FACTOR,
                keys,
                DEFAULT_COLUMN_WIDTH * POSITION_SCALE_FACTOR,
            ),
            column_line_width: reader.columns(
                "ColumnLineWidth",
                1.0,
                keys + 1,
                DEFAULT_COLUMN_LINE_WIDTH,
            ),
            column_spacing: reader.columns(
                "ColumnSpacing",
                POSITION_SCALE_FACTOR,
                keys - 1,
                DEFAULT_COLUMN_SPACING * POSITION_SCALE_FACTOR,
            ),
            hit_position: reader.number("HitPosition", default_hit) * POSITION_SCALE_FACTOR,
            column_start: reader.number("ColumnStart", DEFAULT_COLUMN_START),
            light_position: reader.number("LightPosition", DEFAULT_LIGHT_POSITION)
                * POSITION_SCALE_FACTOR,
            combo_position: reader.number("ComboPosition", DEFAULT_COMBO_POSITION)
                * POSITION_SCALE_FACTOR,
            score_position: reader.number("ScorePosition", DEFAULT_SCORE_POSITION)
                * POSITION_SCALE_FACTOR,
            light_frame_per_second: reader.number("LightFramePerSecond", DEFAULT_LIGHT_FPS),
            judgement_line: reader.flag("JudgementLine", true),
            judgement_line_colour: reader.colour("ColourJudgementLine", WHITE),
            keys_under_notes: reader.flag("KeysUnderNotes", false),
            column_colours,
            column_light_colours,
            images,
        })
    }

    #[inline(always)]
    pub fn total_width(&self) -> f32 {
        self.column_width.iter().sum()
    }

    /// Screen y of the judgement line for a canvas of the given height.
    #[inline(always)]
    pub fn hit_position_px(&self, canvas_height: f32) -> f32 {
        canvas_height - self.hit_position
    }

    #[inline(always)]
    pub fn column_start_px(&self, canvas_width: f32) -> f32 {
        (self.column_start / LOGICAL_PLAYFIELD_WIDTH) / POSITION_SCALE_FACTOR * canvas_width
    }

    pub fn column_width_at(&self, column: usize) -> Result<f32, PlayfieldError> {
        self.column_width
            .get(column)
            .copied()
            .ok_or(PlayfieldError::ColumnOutOfRange {
                column: column as i64,
                keys: self.keys,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::parsing::skin_ini::parse;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() <= 1e-3
    }

    #[test]
    fn rejects_zero_keys() {
        let tree = parse("");
        assert!(matches!(
            SkinConfiguration::from_tree(&tree, 0),
            Err(PlayfieldError::InvalidKeyCount(0))
        ));
    }

    #[test]
    fn stock_four_key_metrics() {
        let cfg = SkinConfiguration::from_tree(&parse(""), 4).expect("4K config");
        assert_eq!(cfg.column_width.len(), 4);
        assert_eq!(cfg.column_spacing.len(), 3);
        assert_eq!(cfg.column_line_width.len(), 5);
        assert!(close(cfg.total_width(), 4.0 * 30.0 * 1.6));
        assert!(close(cfg.hit_position, 78.0 * 1.6), "got {}", cfg.hit_position);
        assert!(cfg.judgement_line);
        assert!(!cfg.keys_under_notes);
        assert_eq!(cfg.judgement_line_colour, WHITE);
        assert_eq!(cfg.images.keys, vec!["mania-key1", "mania-key2", "mania-key2", "mania-key1"]);
    }

    #[test]
    fn odd_layouts_use_the_centre_image() {
        let cfg = SkinConfiguration::from_tree(&parse(""), 7).expect("7K config");
        assert_eq!(cfg.images.notes[3], "mania-notes");
        assert_eq!(cfg.images.notes[0], "mania-note1");
        assert_eq!(cfg.images.notes[1], "mania-note2");
    }

    #[test]
    fn descriptor_values_override_and_scale() {
        let text = "[Mania]\nKeys: 4\nColumnWidth: 40,40,40,40\nColumnSpacing: 5\nColumnLineWidth: 1,1\nHitPosition: 300\nJudgementLine: 0\nColourJudgementLine: 255,0,0\nKeyImage0: Custom/Key\n";
        let cfg = SkinConfiguration::from_tree(&parse(text), 4).expect("config");
        assert!(cfg.column_width.iter().all(|w| close(*w, 64.0)));
        assert_eq!(cfg.column_spacing.len(), 3, "spacing pads to keys - 1");
        assert!(cfg.column_spacing.iter().all(|s| close(*s, 8.0)));
        assert_eq!(cfg.column_line_width, vec![1.0; 5], "line widths stay unscaled");
        assert!(close(cfg.hit_position, 180.0 * 1.6));
        assert!(!cfg.judgement_line);
        assert_eq!(cfg.judgement_line_colour, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(cfg.images.keys[0], "custom/key");
    }

    #[test]
    fn key_counts_without_defaults_fall_back_per_field() {
        let cfg = SkinConfiguration::from_tree(&parse(""), 12).expect("12K config");
        assert_eq!(cfg.column_width.len(), 12);
        assert!(close(cfg.column_width[11], 48.0));
        assert!(close(cfg.column_start, 136.0));
    }

    #[test]
    fn derived_pixel_helpers() {
        let cfg = SkinConfiguration::from_tree(&parse(""), 4).expect("config");
        assert!(close(cfg.hit_position_px(768.0), 768.0 - 124.8));
        assert!(close(cfg.column_start_px(1024.0), (136.0 / 384.0) / 1.6 * 1024.0));
        assert!(cfg.column_width_at(3).is_ok());
        assert!(matches!(
            cfg.column_width_at(4),
            Err(PlayfieldError::ColumnOutOfRange { column: 4, keys: 4 })
        ));
    }

    #[test]
    fn referenced_images_name_their_descriptor_keys() {
        let cfg = SkinConfiguration::from_tree(&parse(""), 4).expect("config");
        let refs = cfg.images.referenced();
        assert_eq!(refs.len(), 4 * 6 + 5);
        assert!(refs.iter().any(|(k, v)| k == "NoteImage2L" && *v == "mania-note2l"));
    }
}
