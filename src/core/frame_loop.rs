use crate::core::clock::Clock;
use crate::game::playfield::{NoteHandle, NoteUpdate, ScrollTimingEngine};
use log::{debug, info};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Shared stop flag for a running [`FrameLoop`]. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Receiver of the engine's per-frame decisions. Owns the actual sprites.
pub trait RenderSink {
    fn apply(&mut self, update: &NoteUpdate);

    /// The note left the playfield; drop whatever is held for it.
    fn release(&mut self, handle: NoteHandle);

    /// Called once after every tick, after all updates and releases.
    fn frame_done(&mut self, _engine: &ScrollTimingEngine) {}
}

/// Drives the engine once per display frame until its token is cancelled.
#[derive(Debug)]
pub struct FrameLoop {
    frame_interval: Duration,
    cancel: CancelToken,
}

impl FrameLoop {
    /// `target_fps == 0` runs frames back to back without sleeping.
    pub fn new(target_fps: u32, cancel: CancelToken) -> Self {
        let frame_interval = if target_fps == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(1.0 / f64::from(target_fps))
        };
        Self {
            frame_interval,
            cancel,
        }
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub const fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Runs `tick → sink → wait` until cancelled. Returns the frame count.
    pub fn run<C, S>(&self, engine: &mut ScrollTimingEngine, clock: &C, sink: &mut S) -> u64
    where
        C: Clock + ?Sized,
        S: RenderSink + ?Sized,
    {
        let mut frames = 0u64;
        info!(
            "Frame loop started ({:.2} ms per frame).",
            self.frame_interval.as_secs_f64() * 1000.0
        );

        while !self.cancel.is_cancelled() {
            let frame_start = Instant::now();
            let report = engine.tick(clock.now_ms());
            for update in &report.updates {
                sink.apply(update);
            }
            for handle in report.removed {
                sink.release(handle);
            }
            sink.frame_done(engine);
            frames += 1;

            if self.cancel.is_cancelled() {
                break;
            }
            let spent = frame_start.elapsed();
            if let Some(remaining) = self.frame_interval.checked_sub(spent)
                && !remaining.is_zero()
            {
                std::thread::sleep(remaining);
            }
        }

        debug!("Frame loop stopped after {frames} frames.");
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::game::note::NoteEvent;
    use crate::game::playfield::PlayfieldMetrics;
    use crate::game::scroll::ScrollSettings;
    use std::collections::HashMap;

    struct RecordingSink<'a> {
        clock: &'a ManualClock,
        cancel: CancelToken,
        live: HashMap<NoteHandle, f32>,
        released: Vec<NoteHandle>,
    }

    impl RenderSink for RecordingSink<'_> {
        fn apply(&mut self, update: &NoteUpdate) {
            assert!(
                !self.released.contains(&update.handle),
                "update for released note {:?}",
                update.handle
            );
            self.live.insert(update.handle, update.y);
        }

        fn release(&mut self, handle: NoteHandle) {
            self.live.remove(&handle);
            self.released.push(handle);
        }

        fn frame_done(&mut self, engine: &ScrollTimingEngine) {
            self.clock.advance(16.0);
            if engine.is_finished() {
                self.cancel.cancel();
            }
        }
    }

    #[test]
    fn loop_runs_until_every_note_is_released() {
        let clock = ManualClock::new(0.0);
        let frame_loop = FrameLoop::new(0, CancelToken::new());
        let mut engine = ScrollTimingEngine::new(
            vec![NoteEvent::tap(0, 200.0), NoteEvent::hold(1, 400.0, 900.0)],
            ScrollSettings::default(),
            PlayfieldMetrics {
                screen_height: 768.0,
                hit_position_px: 643.2,
                note_height: 20.0,
            },
        );
        let mut sink = RecordingSink {
            clock: &clock,
            cancel: frame_loop.cancel_token(),
            live: HashMap::new(),
            released: Vec::new(),
        };

        let frames = frame_loop.run(&mut engine, &clock, &mut sink);
        assert!(frames > 0);
        assert_eq!(sink.released.len(), 2);
        assert!(sink.live.is_empty());
        assert!(engine.is_finished());
    }

    #[test]
    fn cancelled_token_stops_before_the_first_frame() {
        let token = CancelToken::new();
        token.cancel();
        let frame_loop = FrameLoop::new(60, token);
        let clock = ManualClock::new(0.0);
        let mut engine = ScrollTimingEngine::new(
            vec![NoteEvent::tap(0, 0.0)],
            ScrollSettings::default(),
            PlayfieldMetrics {
                screen_height: 768.0,
                hit_position_px: 643.2,
                note_height: 20.0,
            },
        );
        struct NullSink;
        impl RenderSink for NullSink {
            fn apply(&mut self, _update: &NoteUpdate) {}
            fn release(&mut self, _handle: NoteHandle) {}
        }
        assert_eq!(frame_loop.run(&mut engine, &clock, &mut NullSink), 0);
        assert!((frame_loop.frame_interval().as_secs_f64() - 1.0 / 60.0).abs() < 1e-9);
    }
}
