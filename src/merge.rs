//! Applying enrichment proposals to tracks.
//!
//! Two paths with deliberately different semantics. The interactive path
//! stages the proposal so a caller can show which existing fields would be
//! overwritten and apply only a confirmed subset. The batch path replaces
//! the whole field map without staging.

use crate::field::FieldMap;
use crate::track::Track;

/// One proposed field with its collision status against the target track.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedField {
    pub key: String,
    pub label: String,
    /// True when the track already carries a field under this key.
    pub will_overwrite: bool,
}

/// A proposal held for confirmation before touching the track.
#[derive(Debug, Clone)]
pub struct StagedProposal {
    fields: FieldMap,
    staged: Vec<StagedField>,
}

impl StagedProposal {
    /// Stage `fields` against `track`, flagging key collisions.
    pub fn stage(track: &Track, fields: FieldMap) -> Self {
        let staged = fields
            .iter()
            .map(|field| StagedField {
                key: field.key.clone(),
                label: field.label.clone(),
                will_overwrite: track.fields.contains_key(&field.key),
            })
            .collect();
        Self { fields, staged }
    }

    pub fn staged_fields(&self) -> &[StagedField] {
        &self.staged
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Apply the confirmed subset to `track`.
    ///
    /// Each confirmed entry replaces any existing field under the same key
    /// wholesale, value, label and type alike. Unconfirmed entries are
    /// dropped, the proposal does not outlive this call. Returns how many
    /// fields were written.
    pub fn apply(self, track: &mut Track, confirmed_keys: &[&str]) -> usize {
        let mut written = 0;
        for field in self.fields {
            if confirmed_keys.contains(&field.key.as_str()) {
                track.fields.insert(field);
                written += 1;
            }
        }
        if written > 0 {
            log::debug!(
                "applied {written} enriched fields to {}",
                track.display_title()
            );
        }
        written
    }
}

/// Replace the track's entire field map with the proposal.
///
/// Pre-existing fields that the proposal does not mention are lost,
/// including hand-entered ones. Batch enrichment relies on this.
pub fn apply_wholesale(track: &mut Track, fields: FieldMap) {
    track.fields = fields;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Field, FieldValue};

    fn track_with_artist() -> Track {
        let mut track = Track::new("vid1", "Take On Me", "");
        track.fields.insert(Field::new("Artist", "ah-a", true));
        track
    }

    fn proposal_fields() -> FieldMap {
        [
            Field::new("Artist", "a-ha", false),
            Field::new("Release Year", "1985", false),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_stage_flags_only_colliding_keys() {
        let track = track_with_artist();
        let staged = StagedProposal::stage(&track, proposal_fields());

        let flags: Vec<(&str, bool)> = staged
            .staged_fields()
            .iter()
            .map(|f| (f.key.as_str(), f.will_overwrite))
            .collect();
        assert_eq!(flags, vec![("artist", true), ("releaseYear", false)]);
    }

    #[test]
    fn test_apply_partial_confirmation_replaces_wholesale_and_drops_rest() {
        let mut track = track_with_artist();
        let staged = StagedProposal::stage(&track, proposal_fields());

        let written = staged.apply(&mut track, &["artist"]);
        assert_eq!(written, 1);

        // The confirmed entry replaced value and flags; bonus became mandatory.
        let artist = track.fields.get("artist").unwrap();
        assert_eq!(artist.value, FieldValue::Text("a-ha".to_string()));
        assert!(artist.mandatory);

        // The unconfirmed entry left no trace.
        assert!(!track.fields.contains_key("releaseYear"));
    }

    #[test]
    fn test_apply_with_no_confirmations_changes_nothing() {
        let mut track = track_with_artist();
        let before = track.fields.clone();
        let staged = StagedProposal::stage(&track, proposal_fields());

        assert_eq!(staged.apply(&mut track, &[]), 0);
        assert_eq!(track.fields, before);
    }

    #[test]
    fn test_wholesale_replacement_discards_unmentioned_fields() {
        let mut track = track_with_artist();
        track
            .fields
            .insert(Field::new("Personal Note", "crowd favorite", true));

        apply_wholesale(&mut track, proposal_fields());

        assert_eq!(track.fields.len(), 2);
        assert!(!track.fields.contains_key("personalNote"));
        assert!(!track.fields.contains_key("title"));
    }
}
