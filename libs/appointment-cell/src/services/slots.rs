use chrono::{Duration, NaiveDate, NaiveTime, Timelike};
use tracing::debug;
use uuid::Uuid;

use std::sync::Arc;

use shared_database::supabase::SupabaseClient;

use crate::models::{AppointmentError, AvailableSlot, SchedulingRules};
use crate::services::conflict::{intervals_overlap, ConflictDetectionService};

/// Lazily walks the fixed-width windows of a working day. The iterator is
/// finite (stops once the next window would spill past day end) and `Clone`,
/// so one set of rules can be re-walked per doctor or per date.
#[derive(Debug, Clone)]
pub struct CandidateSlots {
    cursor: NaiveTime,
    day_end: NaiveTime,
    width: Duration,
}

impl CandidateSlots {
    pub fn new(rules: &SchedulingRules) -> Self {
        Self {
            cursor: rules.day_start,
            day_end: rules.day_end,
            width: Duration::minutes(rules.slot_minutes),
        }
    }
}

impl Iterator for CandidateSlots {
    type Item = (NaiveTime, NaiveTime);

    fn next(&mut self) -> Option<Self::Item> {
        let (end, wrapped) = self.cursor.overflowing_add_signed(self.width);
        if wrapped != 0 || end > self.day_end {
            return None;
        }

        let slot = (self.cursor, end);
        self.cursor = end;
        Some(slot)
    }
}

/// "9:00 - 10:00" style labels shown in the booking UI.
pub fn display_label(start: NaiveTime, end: NaiveTime) -> String {
    format!(
        "{}:{:02} - {}:{:02}",
        start.hour(),
        start.minute(),
        end.hour(),
        end.minute()
    )
}

pub struct SlotAvailabilityService {
    conflicts: ConflictDetectionService,
    rules: SchedulingRules,
}

impl SlotAvailabilityService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self {
            conflicts: ConflictDetectionService::new(supabase),
            rules: SchedulingRules::default(),
        }
    }

    /// The candidate windows of the day minus those overlapping any of the
    /// doctor's non-cancelled appointments on that date. One store fetch;
    /// the filtering is pure.
    pub async fn available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<AvailableSlot>, AppointmentError> {
        let booked = self
            .conflicts
            .active_appointments_on("doctor_id", doctor_id, date, auth_token)
            .await?;

        debug!(
            "Doctor {} has {} active appointments on {}",
            doctor_id,
            booked.len(),
            date
        );

        let slots = CandidateSlots::new(&self.rules)
            .filter(|(start, end)| {
                !booked
                    .iter()
                    .any(|apt| intervals_overlap(*start, *end, apt.start_time, apt.end_time))
            })
            .map(|(start, end)| AvailableSlot {
                start_time: start,
                end_time: end,
                display_time: display_label(start, end),
            })
            .collect();

        Ok(slots)
    }
}
