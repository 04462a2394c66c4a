// ---------------------------------------------------------------------------
// Column names of the event metadata table
// ---------------------------------------------------------------------------

pub const BATCH_ID: &str = "batch_id";
pub const EVENT_ID: &str = "event_id";
pub const FIRST_PULSE_INDEX: &str = "first_pulse_index";
pub const LAST_PULSE_INDEX: &str = "last_pulse_index";
pub const AZIMUTH: &str = "azimuth";
pub const ZENITH: &str = "zenith";
pub const N_PULSES: &str = "n_pulses";
pub const BINS: &str = "bins";
pub const FOLD: &str = "fold";

/// Columns every input table must provide.
pub const REQUIRED_COLUMNS: [&str; 4] = [BATCH_ID, EVENT_ID, FIRST_PULSE_INDEX, LAST_PULSE_INDEX];

/// Fold label of a row that has not been assigned yet.
pub const UNASSIGNED_FOLD: i64 = -1;

// ---------------------------------------------------------------------------
// Direction – an (azimuth, zenith) pair in radians
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Direction {
    /// Rotation about the vertical axis, in `[0, 2π)`.
    pub azimuth: f64,
    /// Angle from the vertical axis, in `[0, π]`.
    pub zenith: f64,
}

impl Direction {
    pub fn new(azimuth: f64, zenith: f64) -> Self {
        Self { azimuth, zenith }
    }
}

// ---------------------------------------------------------------------------
// EventRecord – one row of the metadata table
// ---------------------------------------------------------------------------

/// A single detector event.
///
/// `n_pulses`, `bins` and `fold` are `None` / [`UNASSIGNED_FOLD`] until
/// fold assignment has run.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub batch_id: i64,
    pub event_id: i64,
    /// Start of the half-open pulse range.
    pub first_pulse_index: i64,
    /// End of the half-open pulse range.
    pub last_pulse_index: i64,
    /// Ground-truth direction, present in training metadata.
    pub direction: Option<Direction>,
    pub n_pulses: Option<i64>,
    pub bins: Option<i64>,
    pub fold: i64,
}

impl EventRecord {
    /// A fresh, unassigned record without a known direction.
    pub fn new(batch_id: i64, event_id: i64, first_pulse_index: i64, last_pulse_index: i64) -> Self {
        Self {
            batch_id,
            event_id,
            first_pulse_index,
            last_pulse_index,
            direction: None,
            n_pulses: None,
            bins: None,
            fold: UNASSIGNED_FOLD,
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    /// `last_pulse_index - first_pulse_index`, `None` if that overflows.
    pub fn pulse_count(&self) -> Option<i64> {
        self.last_pulse_index.checked_sub(self.first_pulse_index)
    }

    pub fn is_assigned(&self) -> bool {
        self.fold != UNASSIGNED_FOLD
    }
}

// ---------------------------------------------------------------------------
// EventTable – the complete metadata table
// ---------------------------------------------------------------------------

/// The event metadata table, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventTable {
    pub records: Vec<EventRecord>,
}

impl EventTable {
    pub fn new(records: Vec<EventRecord>) -> Self {
        Self { records }
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether every row carries a ground-truth direction.
    pub fn has_directions(&self) -> bool {
        !self.records.is_empty() && self.records.iter().all(|r| r.direction.is_some())
    }

    /// Whether the derived columns have been populated for every row.
    pub fn is_assigned(&self) -> bool {
        self.records
            .iter()
            .all(|r| r.is_assigned() && r.n_pulses.is_some() && r.bins.is_some())
    }
}
