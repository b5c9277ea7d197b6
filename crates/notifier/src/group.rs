//! Recording groups and the notify-once debounce policy.
//!
//! A phone may upload an SOS session as several files in quick succession,
//! and the storage trigger fires once per file. Only the invocation for the
//! newest file of the group is allowed to notify: last writer triggers.

use needu_common::types::ObjectMetadata;

/// All objects sharing one session prefix, newest first.
#[derive(Debug, Clone)]
pub struct RecordingGroup {
    members: Vec<ObjectMetadata>,
}

impl RecordingGroup {
    /// Order by creation time descending. Equal timestamps fall back to the
    /// greater object name so the winner is the same for every invocation.
    pub fn new(mut members: Vec<ObjectMetadata>) -> Self {
        members.sort_by(|a, b| {
            b.time_created
                .cmp(&a.time_created)
                .then_with(|| b.name.cmp(&a.name))
        });
        Self { members }
    }

    pub fn newest(&self) -> Option<&ObjectMetadata> {
        self.members.first()
    }

    /// Whether the invocation for `trigger` is the one that should notify.
    pub fn admits(&self, trigger: &str) -> bool {
        self.newest().is_some_and(|newest| newest.name == trigger)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn meta(name: &str, secs: i64) -> ObjectMetadata {
        ObjectMetadata {
            name: name.to_string(),
            time_created: Utc.timestamp_opt(1_704_067_200 + secs, 0).unwrap(),
        }
    }

    #[test]
    fn test_newest_wins() {
        let group = RecordingGroup::new(vec![meta("a", 10), meta("c", 30), meta("b", 20)]);
        assert_eq!(group.len(), 3);
        assert_eq!(group.newest().unwrap().name, "c");
        assert!(group.admits("c"));
        assert!(!group.admits("a"));
        assert!(!group.admits("b"));
    }

    #[test]
    fn test_unknown_trigger_not_admitted() {
        let group = RecordingGroup::new(vec![meta("a", 10)]);
        assert!(!group.admits("zzz"));
    }

    #[test]
    fn test_tie_breaks_on_name() {
        let group = RecordingGroup::new(vec![meta("part1", 5), meta("part2", 5)]);
        assert!(group.admits("part2"));

        let reversed = RecordingGroup::new(vec![meta("part2", 5), meta("part1", 5)]);
        assert!(reversed.admits("part2"));
    }

    #[test]
    fn test_empty_group_admits_nothing() {
        let group = RecordingGroup::new(vec![]);
        assert!(group.is_empty());
        assert!(group.newest().is_none());
        assert!(!group.admits("anything"));
    }
}
