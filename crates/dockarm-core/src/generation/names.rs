//! Dock name generation

use crate::components::SequenceNumber;

/// Callsigns cycled through as docks are numbered
const CALLSIGNS: &[&str] = &[
    "Alpha", "Bravo", "Charlie", "Delta", "Echo", "Foxtrot", "Golf", "Hotel",
    "India", "Juliet", "Kilo", "Lima", "Mike", "November", "Oscar", "Papa",
    "Quebec", "Romeo", "Sierra", "Tango", "Uniform", "Victor", "Whiskey",
    "X-ray", "Yankee", "Zulu",
];

/// Human-readable dock name derived from its sequence number.
///
/// Names repeat across rounds since the sequence restarts at 1.
pub fn dock_name(sequence: SequenceNumber) -> String {
    let index = (sequence.max(1) - 1) as usize % CALLSIGNS.len();
    format!("Dock {}-{:02}", CALLSIGNS[index], sequence)
}
