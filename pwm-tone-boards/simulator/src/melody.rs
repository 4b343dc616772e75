//! 音符和旋律定义
//!
//! Sequencing is the application's job: the tone generator only ever plays
//! one tone at a time per output.

use pwm_tone_common::ToneRequest;

/// 音符时值
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteDuration {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
}

impl NoteDuration {
    /// Length in sixteenths of a whole note.
    const fn sixteenths(&self) -> u32 {
        match self {
            NoteDuration::Whole => 16,
            NoteDuration::Half => 8,
            NoteDuration::Quarter => 4,
            NoteDuration::Eighth => 2,
            NoteDuration::Sixteenth => 1,
        }
    }

    /// Milliseconds at `bpm` quarter notes per minute. `bpm` must be non-zero;
    /// board configs are checked on load.
    pub const fn to_ms(&self, bpm: u32) -> u32 {
        let beat_ms = 60_000 / bpm;
        beat_ms * self.sixteenths() / 4
    }
}

/// 音符. A frequency of zero is a rest.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Note {
    pub freq: f32,
    pub duration: NoteDuration,
}

impl Note {
    pub const fn new(freq: f32, duration: NoteDuration) -> Self {
        Self { freq, duration }
    }

    pub const fn rest(duration: NoteDuration) -> Self {
        Self::new(0.0, duration)
    }

    pub fn is_rest(&self) -> bool {
        self.freq <= 0.0
    }

    /// Request for this note at `volume`, shortened by `gap_ms` so
    /// consecutive notes stay distinct. `None` for a rest.
    pub fn request(&self, bpm: u32, volume: f32, gap_ms: u32) -> Option<ToneRequest> {
        if self.is_rest() {
            return None;
        }
        let length = self.duration.to_ms(bpm).saturating_sub(gap_ms);
        Some(ToneRequest::millis(self.freq, volume, length))
    }
}

pub const C5: f32 = 523.25;
pub const D5: f32 = 587.33;
pub const E5: f32 = 659.25;
pub const G4: f32 = 392.0;
pub const G5: f32 = 783.99;
pub const A4: f32 = 440.0;
pub const C4: f32 = 261.63;
pub const E4: f32 = 329.63;

/// Lead line for the differential pair.
pub const CHIME: &[Note] = &[
    Note::new(E5, NoteDuration::Eighth),
    Note::new(D5, NoteDuration::Eighth),
    Note::new(C5, NoteDuration::Quarter),
    Note::rest(NoteDuration::Eighth),
    Note::new(G5, NoteDuration::Eighth),
    Note::new(E5, NoteDuration::Quarter),
    Note::new(C5, NoteDuration::Half),
];

/// Bass line for the single-ended output, same total length as [`CHIME`].
pub const BASS: &[Note] = &[
    Note::new(C4, NoteDuration::Quarter),
    Note::new(G4, NoteDuration::Quarter),
    Note::new(E4, NoteDuration::Quarter),
    Note::new(A4, NoteDuration::Quarter),
    Note::new(C4, NoteDuration::Half),
];

/// Total length of `notes` in milliseconds.
pub fn length_ms(notes: &[Note], bpm: u32) -> u32 {
    notes.iter().map(|n| n.duration.to_ms(bpm)).sum()
}
