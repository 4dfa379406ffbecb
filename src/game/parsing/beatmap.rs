use crate::error::PlayfieldError;
use crate::game::note::NoteEvent;
use log::{debug, warn};

const HOLD_TYPE_BIT: u32 = 1 << 7;

/// One `[HitObjects]` record, before column assignment.
#[derive(Clone, Debug, PartialEq)]
pub struct HitObjectRecord {
    pub x: f32,
    pub time: f64,
    pub end_time: Option<f64>,
}

/// The parts of an osu! text beatmap the playfield consumes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Beatmap {
    pub audio_filename: Option<String>,
    pub audio_lead_in_ms: f64,
    pub background: Option<String>,
    pub video: Option<String>,
    /// Mania stores its key count in `CircleSize`.
    pub key_count: Option<usize>,
    pub hit_objects: Vec<HitObjectRecord>,
}

#[inline(always)]
fn unquote(raw: &str) -> String {
    raw.trim().trim_matches('"').to_string()
}

fn parse_event(line: &str, out: &mut Beatmap) {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let (Some(&kind), Some(&file)) = (fields.first(), fields.get(2)) else {
        return;
    };
    match kind {
        "0" | "Background" if out.background.is_none() => out.background = Some(unquote(file)),
        "1" | "Video" if out.video.is_none() => out.video = Some(unquote(file)),
        _ => {}
    }
}

fn parse_hit_object(line: &str) -> Option<HitObjectRecord> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < 4 {
        return None;
    }
    let x = fields[0].parse::<f32>().ok().filter(|v| v.is_finite())?;
    let time = fields[2].parse::<f64>().ok().filter(|v| v.is_finite())?;
    let kind = fields[3].parse::<u32>().ok()?;
    let end_time = if kind & HOLD_TYPE_BIT != 0 {
        let end = fields
            .get(5)
            .and_then(|extras| extras.split(':').next())
            .and_then(|end| end.trim().parse::<f64>().ok());
        if end.is_some_and(|e| !e.is_finite()) {
            return None;
        }
        if end.is_none() {
            debug!("hold at {time} ms has no end time; treating as tap");
        }
        end
    } else {
        None
    };
    Some(HitObjectRecord { x, time, end_time })
}

/// Reads the general metadata and hit objects, skipping anything malformed.
pub fn parse_beatmap(text: &str) -> Beatmap {
    let mut out = Beatmap::default();
    let mut section = String::new();
    let mut skipped = 0usize;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') && line.len() >= 2 {
            section = line[1..line.len() - 1].trim().to_string();
            continue;
        }

        match section.as_str() {
            "General" | "Difficulty" => {
                let Some((key, value)) = line.split_once(':') else {
                    continue;
                };
                let value = value.trim();
                match key.trim() {
                    "AudioFilename" => out.audio_filename = Some(value.to_string()),
                    "AudioLeadIn" => out.audio_lead_in_ms = value.parse().unwrap_or(0.0),
                    "CircleSize" => {
                        out.key_count = value.parse::<f32>().ok().map(|v| v.round().max(0.0) as usize);
                    }
                    _ => {}
                }
            }
            "Events" => parse_event(line, &mut out),
            "HitObjects" => match parse_hit_object(line) {
                Some(record) => out.hit_objects.push(record),
                None => skipped += 1,
            },
            _ => {}
        }
    }

    if skipped > 0 {
        warn!("skipped {skipped} malformed hit object line(s)");
    }
    out
}

/// Assigns columns for a `keys`-lane layout.
pub fn notes_from_beatmap(beatmap: &Beatmap, keys: usize) -> Result<Vec<NoteEvent>, PlayfieldError> {
    beatmap
        .hit_objects
        .iter()
        .map(|record| NoteEvent::from_raw(record.x, keys, record.time, record.end_time))
        .collect()
}
