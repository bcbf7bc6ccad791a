use std::collections::BTreeMap;

use super::transform::Transform;

/// Per-channel record of the transform currently reflected in the working samples.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProcessingLedger {
    entries: BTreeMap<u32, Option<Transform>>,
}

impl ProcessingLedger {
    pub fn new(channels: impl IntoIterator<Item = u32>) -> Self {
        Self {
            entries: channels.into_iter().map(|ch| (ch, None)).collect(),
        }
    }

    pub fn get(&self, channel: u32) -> Option<&Transform> {
        self.entries.get(&channel).and_then(Option::as_ref)
    }

    /// Overwrites whatever was recorded for `channel`.
    pub fn record(&mut self, channel: u32, transform: Transform) {
        self.entries.insert(channel, Some(transform));
    }

    pub fn clear(&mut self) {
        for entry in self.entries.values_mut() {
            *entry = None;
        }
    }

    pub fn is_pristine(&self) -> bool {
        self.entries.values().all(Option::is_none)
    }

    pub fn summary(&self, channel: u32) -> String {
        self.get(channel)
            .map(Transform::summary)
            .unwrap_or_else(|| "None".to_owned())
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, Option<&Transform>)> {
        self.entries.iter().map(|(ch, t)| (*ch, t.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_overwrites_and_clear_resets() {
        let mut ledger = ProcessingLedger::new(1..=3);
        assert!(ledger.is_pristine());
        assert_eq!(ledger.summary(2), "None");

        ledger.record(2, Transform::MovingAverage { window: 3 });
        ledger.record(2, Transform::RemoveOffset);
        assert_eq!(ledger.get(2), Some(&Transform::RemoveOffset));
        assert_eq!(ledger.get(1), None);
        assert_eq!(ledger.summary(2), "Offset removed");
        assert!(!ledger.is_pristine());

        ledger.clear();
        assert!(ledger.is_pristine());
        assert_eq!(ledger.iter().count(), 3);
    }
}
