//! Attendance export rows.

use crate::identifier::NormalizedId;
use crate::ledger::VerificationRecord;
use crate::roster::RosterLookup;
use chrono::{Local, TimeZone};
use serde::Serialize;
use std::fmt::Display;

/// Placeholder for participants without a team.
pub const NO_TEAM: &str = "N/A";

/// Name shown when a verified participant has left the roster.
pub const UNKNOWN_NAME: &str = "Unknown";

/// One exported attendance row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRow {
    /// Participant name, or [`UNKNOWN_NAME`] if no longer on the roster
    pub name: String,
    /// Identifier in roster casing
    pub enrollment_number: String,
    /// Study program, empty when unknown
    pub program: String,
    /// Team name, or [`NO_TEAM`]
    pub team_name: String,
    /// First verification time, `M/D/YYYY, h:mm:ss AM` local
    pub verified_at: String,
}

/// Rows for `records`, in the given order, with local-time timestamps.
#[must_use]
pub fn export_rows(records: &[VerificationRecord], roster: &dyn RosterLookup) -> Vec<ExportRow> {
    export_rows_in(records, roster, &Local)
}

/// Rows for `records` with timestamps rendered in `tz`.
pub fn export_rows_in<Tz>(
    records: &[VerificationRecord],
    roster: &dyn RosterLookup,
    tz: &Tz,
) -> Vec<ExportRow>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    records
        .iter()
        .map(|record| {
            let entry = roster.lookup(&NormalizedId::new(&record.identifier));
            let verified_at = format_timestamp(record.verified_at_millis, tz);
            match entry {
                Some(entry) => ExportRow {
                    name: entry.name,
                    enrollment_number: record.identifier.clone(),
                    program: entry.program,
                    team_name: entry.team_name.unwrap_or_else(|| NO_TEAM.to_string()),
                    verified_at,
                },
                None => ExportRow {
                    name: UNKNOWN_NAME.to_string(),
                    enrollment_number: record.identifier.clone(),
                    program: String::new(),
                    team_name: NO_TEAM.to_string(),
                    verified_at,
                },
            }
        })
        .collect()
}

/// `M/D/YYYY, h:mm:ss AM` in `tz`. Out-of-range instants render as the raw
/// millisecond value.
pub fn format_timestamp<Tz>(millis: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match tz.timestamp_millis_opt(millis).single() {
        Some(dt) => dt.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string(),
        None => millis.to_string(),
    }
}
