//! Participant roster.
//!
//! The roster is an external collaborator of the check-in core: the ledger
//! only ever calls [`RosterLookup::lookup`]. [`Roster`] is the in-process
//! snapshot that answers lookups; a [`RosterSource`] is where the snapshot
//! is loaded from and persisted to.

pub mod fallback;
pub mod file;
pub mod redis;
pub mod source;

pub use fallback::FallbackRoster;
pub use file::FileRosterSource;
pub use self::redis::RedisRosterSource;
pub use source::RosterSource;

use crate::error::RosterError;
use crate::identifier::NormalizedId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Enrollment/membership number, stored casing
    pub enrollment_number: String,
    /// Study program
    #[serde(default)]
    pub program: String,
    /// Contact email
    #[serde(default)]
    pub gmail: String,
    /// Event the entry was imported for
    #[serde(default, alias = "hackathonName")]
    pub event_name: String,
    /// Semester, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semester: Option<String>,
    /// Team name for team registrations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    /// Other team members' names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_members: Option<Vec<String>>,
}

impl RosterEntry {
    /// Minimal entry, mostly for tests and fixtures.
    #[must_use]
    pub fn new(name: impl Into<String>, enrollment_number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enrollment_number: enrollment_number.into(),
            program: String::new(),
            gmail: String::new(),
            event_name: String::new(),
            semester: None,
            team_name: None,
            team_members: None,
        }
    }

    /// Set the program.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Set the team name.
    #[must_use]
    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.team_name = Some(team.into());
        self
    }

    /// Lookup key for this entry.
    #[must_use]
    pub fn key(&self) -> NormalizedId {
        NormalizedId::new(&self.enrollment_number)
    }
}

/// Synchronous roster lookup used by the ledger.
pub trait RosterLookup: Send + Sync {
    /// Entry for a normalized identifier, if any.
    fn lookup(&self, id: &NormalizedId) -> Option<RosterEntry>;
}

/// Clean up imported entries and validate them as a whole.
///
/// Trims every field, drops blank optional values, stamps `event_name`, and
/// rejects blank enrollment numbers and duplicate keys. Nothing is returned
/// unless every entry passes.
///
/// # Errors
///
/// [`RosterError::InvalidEntry`] or [`RosterError::DuplicateIdentifier`].
pub fn prepare_entries(
    entries: Vec<RosterEntry>,
    event_name: &str,
) -> Result<Vec<RosterEntry>, RosterError> {
    let mut seen = HashMap::with_capacity(entries.len());
    let mut prepared = Vec::with_capacity(entries.len());

    for (index, entry) in entries.into_iter().enumerate() {
        let entry = RosterEntry {
            name: entry.name.trim().to_string(),
            enrollment_number: entry.enrollment_number.trim().to_string(),
            program: entry.program.trim().to_string(),
            gmail: entry.gmail.trim().to_string(),
            event_name: event_name.to_string(),
            semester: trimmed(entry.semester),
            team_name: trimmed(entry.team_name),
            team_members: entry.team_members.map(|members| {
                members
                    .into_iter()
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty())
                    .collect()
            }),
        };

        if entry.enrollment_number.is_empty() {
            return Err(RosterError::InvalidEntry {
                index,
                reason: "enrollmentNumber is required".to_string(),
            });
        }
        if seen.insert(entry.key(), index).is_some() {
            return Err(RosterError::DuplicateIdentifier(entry.enrollment_number));
        }
        prepared.push(entry);
    }

    Ok(prepared)
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Default)]
struct Snapshot {
    entries: Vec<RosterEntry>,
    index: HashMap<NormalizedId, usize>,
}

impl Snapshot {
    fn build(entries: Vec<RosterEntry>) -> Result<Self, RosterError> {
        let mut index = HashMap::with_capacity(entries.len());
        for (pos, entry) in entries.iter().enumerate() {
            if index.insert(entry.key(), pos).is_some() {
                return Err(RosterError::DuplicateIdentifier(entry.enrollment_number.clone()));
            }
        }
        Ok(Self { entries, index })
    }
}

/// In-process roster snapshot.
///
/// Constructed empty at startup, filled from a [`RosterSource`], replaced
/// wholesale on import and emptied on reset. Replacement builds the new
/// snapshot before taking the write lock, so readers see either the old
/// roster or the new one.
#[derive(Debug, Default)]
pub struct Roster {
    inner: RwLock<Snapshot>,
}

impl Roster {
    /// Empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Roster holding `entries`.
    ///
    /// # Errors
    ///
    /// [`RosterError::DuplicateIdentifier`] if two entries share a key.
    pub fn from_entries(entries: Vec<RosterEntry>) -> Result<Self, RosterError> {
        Ok(Self {
            inner: RwLock::new(Snapshot::build(entries)?),
        })
    }

    /// Replace the whole roster. Returns the new size.
    ///
    /// # Errors
    ///
    /// [`RosterError::DuplicateIdentifier`]; the current roster is kept.
    pub fn install(&self, entries: Vec<RosterEntry>) -> Result<usize, RosterError> {
        let snapshot = Snapshot::build(entries)?;
        let len = snapshot.entries.len();
        *self.inner.write() = snapshot;
        Ok(len)
    }

    /// Clean up `entries` with [`prepare_entries`] and install them.
    ///
    /// # Errors
    ///
    /// Validation errors; the current roster is kept.
    pub fn replace(&self, entries: Vec<RosterEntry>, event_name: &str) -> Result<usize, RosterError> {
        self.install(prepare_entries(entries, event_name)?)
    }

    /// Remove every entry.
    pub fn clear(&self) {
        *self.inner.write() = Snapshot::default();
    }

    /// All entries in stored order.
    #[must_use]
    pub fn entries(&self) -> Vec<RosterEntry> {
        self.inner.read().entries.clone()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// True when empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RosterLookup for Roster {
    fn lookup(&self, id: &NormalizedId) -> Option<RosterEntry> {
        let snapshot = self.inner.read();
        snapshot
            .index
            .get(id)
            .and_then(|&pos| snapshot.entries.get(pos))
            .cloned()
    }
}
