use log::{debug, trace};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Logical skin units are multiplied by this when first ingested.
pub const POSITION_SCALE_FACTOR: f32 = 1.6;

const HIT_POSITION_MIN: f32 = 240.0;
const HIT_POSITION_MAX: f32 = 480.0;
const MANIA_SECTION: &str = "Mania";
const KEYS_KEY: &str = "Keys";

/// Highest key count the built-in defaults carry a section for.
pub const MAX_DEFAULT_KEYS: usize = 10;

// osu!-style stock metrics, in descriptor units.
pub const DEFAULT_COLUMN_WIDTH: f32 = 30.0;
pub const DEFAULT_COLUMN_LINE_WIDTH: f32 = 2.0;
pub const DEFAULT_COLUMN_SPACING: f32 = 0.0;
pub const DEFAULT_COLUMN_START: f32 = 136.0;
pub const DEFAULT_HIT_POSITION: f32 = 402.0;
pub const DEFAULT_LIGHT_POSITION: f32 = 413.0;
pub const DEFAULT_COMBO_POSITION: f32 = 111.0;
pub const DEFAULT_SCORE_POSITION: f32 = 325.0;
pub const DEFAULT_LIGHT_FPS: f32 = 60.0;

// --- Values ---

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SkinValue {
    Number(f32),
    List(Vec<f32>),
    Text(String),
}

impl SkinValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Reads a scalar. Text is parsed leniently; lists yield their first item.
    pub fn as_number(&self) -> f32 {
        match self {
            Self::Number(n) => *n,
            Self::List(values) => values.first().copied().unwrap_or(0.0),
            Self::Text(s) => parse_number(s),
        }
    }

    /// Reads a comma separated sequence, scaling text on the way in.
    ///
    /// Values that were already coerced at parse time are returned as stored;
    /// only raw text goes through `scale`.
    pub fn to_list(&self, scale: f32) -> Vec<f32> {
        match self {
            Self::Number(n) => vec![*n],
            Self::List(values) => values.clone(),
            Self::Text(s) => parse_array_value(s, scale),
        }
    }
}

// --- Key coercion table ---

#[derive(Debug, Clone, Copy)]
enum KeyPattern {
    Exact(&'static str),
    Prefix(&'static str),
}

impl KeyPattern {
    #[inline(always)]
    fn matches(self, key: &str) -> bool {
        match self {
            Self::Exact(name) => key == name,
            Self::Prefix(prefix) => key.starts_with(prefix),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Coercion {
    ScaledList,
    RawList,
    HitPosition,
    Float,
    Text,
}

impl Coercion {
    fn apply(self, value: &str) -> SkinValue {
        match self {
            Self::ScaledList => SkinValue::List(parse_array_value(value, POSITION_SCALE_FACTOR)),
            Self::RawList => SkinValue::List(parse_array_value(value, 1.0)),
            Self::HitPosition => SkinValue::Number(invert_hit_position(parse_number(value))),
            Self::Float => SkinValue::Number(parse_number(value)),
            Self::Text => SkinValue::Text(value.to_string()),
        }
    }
}

const COERCIONS: [(KeyPattern, Coercion); 4] = [
    (KeyPattern::Exact("ColumnWidth"), Coercion::ScaledList),
    (KeyPattern::Prefix("Colour"), Coercion::RawList),
    (KeyPattern::Exact("HitPosition"), Coercion::HitPosition),
    (KeyPattern::Exact("ColumnStart"), Coercion::Float),
];

#[inline(always)]
fn coercion_for(key: &str) -> Coercion {
    COERCIONS
        .iter()
        .find(|(pattern, _)| pattern.matches(key))
        .map_or(Coercion::Text, |&(_, coercion)| coercion)
}

// --- Numeric helpers ---

/// Lenient float read: anything unparsable or non-finite becomes 0.
pub fn parse_number(raw: &str) -> f32 {
    let trimmed = raw.trim();
    match trimmed.parse::<f32>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            trace!("coercing malformed number '{trimmed}' to 0");
            0.0
        }
    }
}

/// Splits `"10,20,30"` into floats, each multiplied by `scale`.
pub fn parse_array_value(raw: &str, scale: f32) -> Vec<f32> {
    raw.split(',').map(|part| parse_number(part) * scale).collect()
}

/// Maps a descriptor HitPosition onto the distance from the bottom edge of
/// the 480-unit logical screen.
#[inline(always)]
pub fn invert_hit_position(value: f32) -> f32 {
    HIT_POSITION_MAX - value.clamp(HIT_POSITION_MIN, HIT_POSITION_MAX)
}

// --- Tree ---

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawConfigTree {
    sections: HashMap<String, HashMap<String, SkinValue>>,
}

impl RawConfigTree {
    pub fn get(&self, section: &str, key: &str) -> Option<&SkinValue> {
        self.sections.get(section).and_then(|s| s.get(key))
    }

    pub fn section(&self, section: &str) -> Option<&HashMap<String, SkinValue>> {
        self.sections.get(section)
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn insert(&mut self, section: &str, key: &str, value: SkinValue) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }
}

/// Section name for a key-count variant, e.g. `Mania4K`.
#[inline(always)]
pub fn mania_section(keys: impl std::fmt::Display) -> String {
    format!("{MANIA_SECTION}{keys}K")
}

static DEFAULT_TREE: LazyLock<RawConfigTree> = LazyLock::new(|| {
    let mut tree = RawConfigTree::default();
    apply_descriptor(&mut tree, &default_descriptor());
    tree
});

/// The built-in tree every parse starts from.
pub fn default_tree() -> &'static RawConfigTree {
    &DEFAULT_TREE
}

fn default_descriptor() -> String {
    let repeat = |value: f32, count: usize| vec![value.to_string(); count].join(",");
    let mut out = String::from("[General]\nName: Default\nAuthor: \nVersion: latest\n");
    for keys in 1..=MAX_DEFAULT_KEYS {
        out.push_str("[Mania]\n");
        out.push_str(&format!("Keys: {keys}\n"));
        out.push_str(&format!("ColumnStart: {DEFAULT_COLUMN_START}\n"));
        out.push_str(&format!("HitPosition: {DEFAULT_HIT_POSITION}\n"));
        out.push_str(&format!("ColumnWidth: {}\n", repeat(DEFAULT_COLUMN_WIDTH, keys)));
        out.push_str(&format!(
            "ColumnLineWidth: {}\n",
            repeat(DEFAULT_COLUMN_LINE_WIDTH, keys + 1)
        ));
        if keys > 1 {
            out.push_str(&format!(
                "ColumnSpacing: {}\n",
                repeat(DEFAULT_COLUMN_SPACING, keys - 1)
            ));
        }
        out.push_str(&format!("LightPosition: {DEFAULT_LIGHT_POSITION}\n"));
        out.push_str(&format!("ComboPosition: {DEFAULT_COMBO_POSITION}\n"));
        out.push_str(&format!("ScorePosition: {DEFAULT_SCORE_POSITION}\n"));
        out.push_str(&format!("LightFramePerSecond: {DEFAULT_LIGHT_FPS}\n"));
        out.push_str("JudgementLine: 1\n");
        out.push_str("KeysUnderNotes: 0\n");
        out.push_str("ColourJudgementLine: 255,255,255\n");
    }
    out
}

/// Parses descriptor text over the built-in defaults.
///
/// Never fails: malformed numbers become 0 and lines that are not
/// `Key: Value` pairs are skipped. Keys written by the text replace the
/// matching default key only; the rest of each default section survives.
pub fn parse(text: &str) -> RawConfigTree {
    let mut tree = default_tree().clone();
    apply_descriptor(&mut tree, text);
    tree
}

fn apply_descriptor(tree: &mut RawConfigTree, text: &str) {
    let mut section = String::new();
    let mut keys_resolved = false;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') && line.len() >= 2 {
            section = line[1..line.len() - 1].trim().to_string();
            keys_resolved = false;
            continue;
        }

        let Some((key_raw, value_raw)) = line.split_once(':') else {
            trace!("skipping descriptor line without ':' in [{section}]: {line}");
            continue;
        };
        let key = key_raw.trim();
        let value = value_raw.trim();

        if key == KEYS_KEY && section == MANIA_SECTION && !keys_resolved {
            let renamed = mania_section(value);
            debug!("descriptor section [{section}] resolved to [{renamed}]");
            section = renamed;
            keys_resolved = true;
        }

        let coerced = coercion_for(key).apply(&value.to_lowercase());
        tree.insert(&section, key, coerced);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(tree: &RawConfigTree, section: &str, key: &str) -> Vec<f32> {
        tree.get(section, key)
            .unwrap_or_else(|| panic!("missing {section}.{key}"))
            .to_list(1.0)
    }

    #[test]
    fn keys_line_renames_the_mania_block() {
        let tree = parse("[Mania]\nKeys: 4\nColumnWidth: 40\n");
        assert_eq!(numbers(&tree, "Mania4K", "ColumnWidth"), vec![64.0]);
        assert!(!tree.has_section("Mania"), "the bare Mania bucket must stay empty");
    }

    #[test]
    fn consecutive_mania_blocks_stay_independent() {
        let text = "[Mania]\nKeys: 4\nColumnStart: 100\n\n[Mania]\nKeys: 7\nColumnStart: 200\n";
        let tree = parse(text);
        assert_eq!(tree.get("Mania4K", "ColumnStart"), Some(&SkinValue::Number(100.0)));
        assert_eq!(tree.get("Mania7K", "ColumnStart"), Some(&SkinValue::Number(200.0)));
    }

    #[test]
    fn later_keys_lines_do_not_rename_again() {
        let tree = parse("[Mania]\nKeys: 4\nKeys: 7\nColumnStart: 50\n");
        assert_eq!(tree.get("Mania4K", "ColumnStart"), Some(&SkinValue::Number(50.0)));
        assert_eq!(tree.get("Mania4K", "Keys"), Some(&SkinValue::Text("7".to_string())));
        assert_eq!(
            tree.get("Mania7K", "ColumnStart"),
            Some(&SkinValue::Number(DEFAULT_COLUMN_START)),
            "Mania7K should keep its default"
        );
    }

    #[test]
    fn keys_outside_mania_is_inert() {
        let tree = parse("[General]\nKeys: 4\nName: Test\n");
        assert_eq!(tree.get("General", "Keys"), Some(&SkinValue::Text("4".to_string())));
        assert_eq!(tree.get("General", "Name"), Some(&SkinValue::Text("test".to_string())));
        assert_eq!(
            tree.get("Mania4K", "ColumnStart"),
            Some(&SkinValue::Number(DEFAULT_COLUMN_START))
        );
    }

    #[test]
    fn keys_before_resolution_land_in_plain_mania() {
        let tree = parse("[Mania]\nColumnStart: 10\nKeys: 4\nColumnStart: 20\n");
        assert_eq!(tree.get("Mania", "ColumnStart"), Some(&SkinValue::Number(10.0)));
        assert_eq!(tree.get("Mania4K", "ColumnStart"), Some(&SkinValue::Number(20.0)));
    }

    #[test]
    fn array_values_scale_only_when_asked() {
        assert_eq!(parse_array_value("10,20,30", POSITION_SCALE_FACTOR), vec![16.0, 32.0, 48.0]);
        assert_eq!(parse_array_value("10,20,30", 1.0), vec![10.0, 20.0, 30.0]);
        assert_eq!(parse_array_value("10,abc, 30", 1.0), vec![10.0, 0.0, 30.0]);
    }

    #[test]
    fn hit_position_is_clamped_then_inverted() {
        let tree = parse("[Mania]\nKeys: 4\nHitPosition: 300\n[Mania]\nKeys: 5\nHitPosition: 100\n[Mania]\nKeys: 6\nHitPosition: 600\n");
        assert_eq!(tree.get("Mania4K", "HitPosition"), Some(&SkinValue::Number(180.0)));
        assert_eq!(tree.get("Mania5K", "HitPosition"), Some(&SkinValue::Number(240.0)));
        assert_eq!(tree.get("Mania6K", "HitPosition"), Some(&SkinValue::Number(0.0)));
    }

    #[test]
    fn colours_are_unscaled_and_text_is_lowercased() {
        let tree = parse("[Mania]\nKeys: 4\nColour1: 10,20,30,255\nKeyImage0: Mania-KEY1\n");
        assert_eq!(numbers(&tree, "Mania4K", "Colour1"), vec![10.0, 20.0, 30.0, 255.0]);
        assert_eq!(
            tree.get("Mania4K", "KeyImage0"),
            Some(&SkinValue::Text("mania-key1".to_string()))
        );
    }

    #[test]
    fn comments_blank_and_malformed_lines_are_skipped() {
        let text = "// header\n\n[Mania]\n  // indented comment\nKeys: 4\nnot a pair\nColumnStart: nope\n";
        let tree = parse(text);
        assert_eq!(tree.get("Mania4K", "ColumnStart"), Some(&SkinValue::Number(0.0)));
        assert!(tree.section("Mania4K").is_some_and(|s| !s.contains_key("not a pair")));
    }

    #[test]
    fn untouched_sections_keep_their_defaults() {
        let tree = parse("[Mania]\nKeys: 4\nColumnStart: 12\n");
        for name in default_tree().section_names() {
            if name == "Mania4K" {
                continue;
            }
            assert_eq!(tree.section(name), default_tree().section(name), "section {name} changed");
        }
        let ours = tree.section("Mania4K").expect("Mania4K");
        let defaults = default_tree().section("Mania4K").expect("default Mania4K");
        for key in defaults.keys() {
            assert!(ours.contains_key(key), "default key {key} was dropped");
        }
    }

    #[test]
    fn parsing_is_idempotent() {
        let text = "[General]\nName: X\n[Mania]\nKeys: 7\nColumnWidth: 30,30,30,40,30,30,30\n";
        assert_eq!(parse(text), parse(text));
    }

    #[test]
    fn tree_dumps_as_plain_json() {
        let tree = parse("[Mania]\nKeys: 4\nColumnStart: 12\nNoteImage0: Note\n");
        let json: serde_json::Value = serde_json::to_value(&tree).expect("serialize");
        let mania = &json["sections"]["Mania4K"];
        assert_eq!(mania["ColumnStart"], serde_json::json!(12.0));
        assert_eq!(mania["NoteImage0"], serde_json::json!("note"));
        assert!(mania["ColumnWidth"].is_array());
    }

    #[test]
    fn default_tree_covers_every_stock_key_count() {
        for keys in 1..=MAX_DEFAULT_KEYS {
            let widths = default_tree()
                .get(&mania_section(keys), "ColumnWidth")
                .map(|v| v.to_list(1.0))
                .unwrap_or_default();
            assert_eq!(widths.len(), keys, "{keys}K default widths");
            assert!((widths[0] - DEFAULT_COLUMN_WIDTH * POSITION_SCALE_FACTOR).abs() < 1e-4);
        }
    }
}
