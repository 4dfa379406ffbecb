use crate::game::note::{NoteEvent, NoteKind};
use crate::game::scroll::{ScrollDirection, ScrollSettings};
use crate::game::skin::SkinConfiguration;
use log::{debug, info};

const SUMMARY_INTERVAL_MS: f64 = 1000.0;

/// Render-side reference to a note. Stable for the note's whole life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteState {
    Pending,
    Visible,
    Disposed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderableNote {
    pub handle: NoteHandle,
    pub event: NoteEvent,
    /// Top edge in screen pixels.
    pub y: f32,
    pub visible: bool,
    pub alive: bool,
}

impl RenderableNote {
    pub const fn state(&self) -> NoteState {
        if !self.alive {
            NoteState::Disposed
        } else if self.visible {
            NoteState::Visible
        } else {
            NoteState::Pending
        }
    }

    #[inline(always)]
    pub const fn start_time(&self) -> f64 {
        self.event.start_time
    }

    #[inline(always)]
    pub const fn end_time(&self) -> Option<f64> {
        self.event.end_time
    }

    /// Hold body length in pixels at the given scroll rate; zero for taps.
    pub fn tail_length(&self, pixels_per_ms: f64) -> f32 {
        match self.event.kind {
            NoteKind::Hold => (self.event.duration() * pixels_per_ms) as f32,
            NoteKind::Tap => 0.0,
        }
    }
}

/// Static screen geometry the engine positions notes against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayfieldMetrics {
    pub screen_height: f32,
    /// Judgement line y for downscroll.
    pub hit_position_px: f32,
    pub note_height: f32,
}

impl PlayfieldMetrics {
    pub fn from_skin(skin: &SkinConfiguration, screen_height: f32, note_height: f32) -> Self {
        Self {
            screen_height,
            hit_position_px: skin.hit_position_px(screen_height),
            note_height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteUpdate {
    pub handle: NoteHandle,
    pub column: usize,
    pub y: f32,
    pub visible: bool,
}

/// Everything one tick decided, in the order notes were visited.
#[derive(Debug, Default)]
pub struct FrameReport {
    pub updates: Vec<NoteUpdate>,
    /// Notes that crossed the far edge this frame. The render layer may
    /// release whatever it holds for them.
    pub removed: Vec<NoteHandle>,
}

#[derive(Debug)]
pub struct ScrollTimingEngine {
    notes: Vec<RenderableNote>,
    scroll: ScrollSettings,
    metrics: PlayfieldMetrics,
    disposed: usize,
    last_summary_ms: Option<f64>,
}

impl ScrollTimingEngine {
    /// Takes ownership of the chart. Events are ordered by start time and
    /// handed handles in that order.
    pub fn new(mut events: Vec<NoteEvent>, scroll: ScrollSettings, metrics: PlayfieldMetrics) -> Self {
        events.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        let spawn_y = spawn_edge(scroll.direction, &metrics);
        let notes = events
            .into_iter()
            .enumerate()
            .map(|(i, event)| RenderableNote {
                handle: NoteHandle(i as u32),
                event,
                y: spawn_y,
                visible: false,
                alive: true,
            })
            .collect::<Vec<_>>();
        debug!(
            "scroll engine ready: {} notes, {} ms approach, {}",
            notes.len(),
            scroll.speed_ms,
            scroll.direction.as_str()
        );
        Self {
            notes,
            scroll,
            metrics,
            disposed: 0,
            last_summary_ms: None,
        }
    }

    /// Notes still owned by the engine, ordered by start time.
    pub fn notes(&self) -> &[RenderableNote] {
        &self.notes
    }

    pub fn note(&self, handle: NoteHandle) -> Option<&RenderableNote> {
        self.notes
            .binary_search_by_key(&handle, |n| n.handle)
            .ok()
            .map(|i| &self.notes[i])
    }

    pub const fn disposed_count(&self) -> usize {
        self.disposed
    }

    pub fn is_finished(&self) -> bool {
        self.notes.is_empty()
    }

    /// Screen pixels a note covers per millisecond of song time.
    #[inline(always)]
    pub fn pixels_per_ms(&self) -> f64 {
        f64::from(self.metrics.hit_position_px) / self.scroll.speed_ms
    }

    /// Time left before a note leaves the spawn edge. Negative once moving.
    #[inline(always)]
    pub fn time_to_hit(&self, event: &NoteEvent, now_ms: f64) -> f64 {
        event.start_time - now_ms - self.scroll.speed_ms
    }

    /// Top edge of a note for the given time-to-hit.
    pub fn position_for(&self, time_to_hit: f64) -> f32 {
        let m = &self.metrics;
        let progress = time_to_hit / self.scroll.speed_ms;
        let down = progress.mul_add(-f64::from(m.hit_position_px), -f64::from(m.note_height)) as f32;
        match self.scroll.direction {
            ScrollDirection::Down => down,
            ScrollDirection::Up => m.screen_height - (down + m.note_height),
        }
    }

    #[inline(always)]
    fn is_past_far_edge(&self, y: f32) -> bool {
        match self.scroll.direction {
            ScrollDirection::Down => y >= self.metrics.screen_height,
            ScrollDirection::Up => y + self.metrics.note_height <= 0.0,
        }
    }

    /// Advances every note to `now_ms`.
    ///
    /// Walks the list from the back so disposed notes can be removed in the
    /// same pass without disturbing the indices still to visit.
    pub fn tick(&mut self, now_ms: f64) -> FrameReport {
        let mut report = FrameReport::default();

        for i in (0..self.notes.len()).rev() {
            let time_to_hit = self.time_to_hit(&self.notes[i].event, now_ms);
            if time_to_hit >= 0.0 {
                continue;
            }
            let y = self.position_for(time_to_hit);
            let past_edge = self.is_past_far_edge(y);

            let note = &mut self.notes[i];
            note.y = y;
            if past_edge {
                note.visible = false;
                note.alive = false;
                let gone = self.notes.remove(i);
                self.disposed += 1;
                report.removed.push(gone.handle);
                continue;
            }
            note.visible = true;
            report.updates.push(NoteUpdate {
                handle: note.handle,
                column: note.event.column,
                y,
                visible: true,
            });
        }

        if self
            .last_summary_ms
            .is_none_or(|last| now_ms - last >= SUMMARY_INTERVAL_MS)
        {
            info!(
                "Time: {:.0} ms, Visible: {}, Pending: {}, Disposed: {}",
                now_ms,
                report.updates.len(),
                self.notes.len() - report.updates.len(),
                self.disposed
            );
            self.last_summary_ms = Some(now_ms);
        }

        report
    }
}

#[inline(always)]
fn spawn_edge(direction: ScrollDirection, metrics: &PlayfieldMetrics) -> f32 {
    match direction {
        ScrollDirection::Down => -metrics.note_height,
        ScrollDirection::Up => metrics.screen_height,
    }
}
