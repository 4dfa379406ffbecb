use crate::error::PlayfieldError;

/// Horizontal extent beatmaps place mania notes across.
pub const BEATMAP_LOGICAL_WIDTH: f32 = 512.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    Tap,
    Hold,
}

/// One chart event. Times are in song milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    pub column: usize,
    pub start_time: f64,
    pub end_time: Option<f64>,
    pub kind: NoteKind,
}

impl NoteEvent {
    pub const fn tap(column: usize, start_time: f64) -> Self {
        Self {
            column,
            start_time,
            end_time: None,
            kind: NoteKind::Tap,
        }
    }

    pub const fn hold(column: usize, start_time: f64, end_time: f64) -> Self {
        Self {
            column,
            start_time,
            end_time: Some(end_time),
            kind: NoteKind::Hold,
        }
    }

    /// Builds an event from a beatmap record, deriving the column from its
    /// raw x position.
    pub fn from_raw(
        raw_x: f32,
        keys: usize,
        start_time: f64,
        end_time: Option<f64>,
    ) -> Result<Self, PlayfieldError> {
        let column = column_for_x(raw_x, keys)?;
        Ok(match end_time {
            Some(end) => Self::hold(column, start_time, end),
            None => Self::tap(column, start_time),
        })
    }

    /// Hold duration in ms; zero for taps.
    #[inline(always)]
    pub fn duration(&self) -> f64 {
        self.end_time.map_or(0.0, |end| (end - self.start_time).max(0.0))
    }
}

/// `floor(x * keys / 512)`, rejecting anything outside `[0, keys)`.
pub fn column_for_x(raw_x: f32, keys: usize) -> Result<usize, PlayfieldError> {
    if keys < 1 {
        return Err(PlayfieldError::InvalidKeyCount(keys as i64));
    }
    let column = (raw_x * keys as f32 / BEATMAP_LOGICAL_WIDTH).floor() as i64;
    if column < 0 || column >= keys as i64 {
        return Err(PlayfieldError::ColumnOutOfRange { column, keys });
    }
    Ok(column as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_are_equal_bins_over_512() {
        assert_eq!(column_for_x(0.0, 4).ok(), Some(0));
        assert_eq!(column_for_x(511.0, 4).ok(), Some(3));
        assert_eq!(column_for_x(128.0, 4).ok(), Some(1));
        assert_eq!(column_for_x(127.9, 4).ok(), Some(0));
        assert_eq!(column_for_x(256.0, 7).ok(), Some(3));
    }

    #[test]
    fn out_of_range_positions_are_rejected() {
        assert!(matches!(
            column_for_x(512.0, 4),
            Err(PlayfieldError::ColumnOutOfRange { column: 4, keys: 4 })
        ));
        assert!(matches!(
            column_for_x(-1.0, 4),
            Err(PlayfieldError::ColumnOutOfRange { column: -1, .. })
        ));
        assert!(matches!(column_for_x(10.0, 0), Err(PlayfieldError::InvalidKeyCount(0))));
    }

    #[test]
    fn raw_records_pick_their_kind() {
        let tap = NoteEvent::from_raw(64.0, 4, 1000.0, None).expect("tap");
        assert_eq!(tap.kind, NoteKind::Tap);
        assert_eq!(tap.duration(), 0.0);

        let hold = NoteEvent::from_raw(448.0, 4, 1000.0, Some(1500.0)).expect("hold");
        assert_eq!(hold.column, 3);
        assert_eq!(hold.kind, NoteKind::Hold);
        assert_eq!(hold.duration(), 500.0);
    }
}
