//! Physical note inventory of the ATM.
use std::collections::BTreeMap;

use crate::atm::{Amount, Denomination, NoteCount};

/// Note counts per denomination, ordered by face value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Till {
    notes: BTreeMap<Denomination, NoteCount>,
}

impl Till {
    /// Creates a till with the given counts.
    #[cfg(test)]
    pub fn new(notes: BTreeMap<Denomination, NoteCount>) -> Self {
        Till { notes }
    }

    /// Number of notes available for `note`. Unknown denominations count as zero.
    pub fn available(&self, note: Denomination) -> NoteCount {
        self.notes.get(&note).copied().unwrap_or(0)
    }

    /// Overwrites the count for a denomination.
    #[cfg(test)]
    pub fn set(&mut self, note: Denomination, count: NoteCount) {
        self.notes.insert(note, count);
    }

    /// Read-only view of the counts.
    pub fn counts(&self) -> &BTreeMap<Denomination, NoteCount> {
        &self.notes
    }

    /// Resets every count to the baseline. Denominations missing from the baseline are
    /// dropped.
    pub fn replenish(&mut self, baseline: &BTreeMap<Denomination, NoteCount>) {
        self.notes.clone_from(baseline);
    }

    /// Removes a single note, failing if none is left.
    pub fn take(&mut self, note: Denomination) -> bool {
        match self.notes.get_mut(&note) {
            Some(count) if *count > 0 => {
                *count -= 1;
                true
            }
            _ => false,
        }
    }

    /// Largest denomination not exceeding `remaining` that still has notes.
    pub fn largest_fitting(&self, remaining: Amount) -> Option<Denomination> {
        if remaining == 0 {
            return None;
        }
        self.notes
            .range(1..=remaining)
            .rev()
            .find(|(_, count)| **count > 0)
            .map(|(note, _)| *note)
    }
}
