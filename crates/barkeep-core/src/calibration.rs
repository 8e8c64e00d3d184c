use crate::config::{PumpDef, Snapshot};
use crate::types::Channel;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Seconds per unit for a single pump, if it carries a usable calibration.
///
/// An explicit `rate` wins; otherwise the inverse of `flow_rate`. Zero or
/// negative values count as "not calibrated".
pub fn pump_rate(pump: &PumpDef) -> Option<f64> {
    if let Some(rate) = pump.rate.filter(|r| r.is_finite() && *r > 0.0) {
        return Some(rate);
    }
    pump.flow_rate
        .filter(|f| f.is_finite() && *f > 0.0)
        .map(|f| 1.0 / f)
}

/// Channel → seconds-per-unit table derived from one snapshot.
#[derive(Debug, Clone)]
pub struct CalibrationTable {
    rates: HashMap<Channel, f64>,
    default_rate: f64,
}

impl CalibrationTable {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let mut rates = HashMap::new();
        for pump in &snapshot.pumps {
            if let Some(rate) = pump_rate(pump) {
                // first declaration of a channel wins, matching pump lookup order
                rates.entry(pump.channel).or_insert(rate);
            }
        }
        Self {
            rates,
            default_rate: snapshot.settings.default_rate,
        }
    }

    pub fn get(&self, channel: Channel) -> Option<f64> {
        self.rates.get(&channel).copied()
    }

    pub fn default_rate(&self) -> f64 {
        self.default_rate
    }

    /// Resolve a channel's rate, falling back to the default.
    ///
    /// The fallback is not an error, but the resulting volume is only as good
    /// as the default guess, so it is logged.
    pub fn rate(&self, channel: Channel) -> f64 {
        match self.get(channel) {
            Some(rate) => rate,
            None => {
                warn!(
                    channel = %channel,
                    default_rate = self.default_rate,
                    "channel has no calibration, using default rate"
                );
                self.default_rate
            }
        }
    }
}

/// Resolve one channel against a snapshot.
pub fn rate(channel: Channel, snapshot: &Snapshot) -> f64 {
    CalibrationTable::from_snapshot(snapshot).rate(channel)
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CalibrationEntry {
    pub pump_id: String,
    pub channel: Channel,
    pub label: String,
    /// Seconds per unit actually used when planning for this channel.
    pub rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_rate: Option<f64>,
    /// Whether this pump carries its own usable calibration.
    pub calibrated: bool,
}

/// Per-pump view of the calibration in effect, in declaration order.
pub fn report(snapshot: &Snapshot) -> Vec<CalibrationEntry> {
    let table = CalibrationTable::from_snapshot(snapshot);
    snapshot
        .pumps
        .iter()
        .map(|pump| CalibrationEntry {
            pump_id: pump.id.clone(),
            channel: pump.channel,
            label: pump.label.clone(),
            rate: table.get(pump.channel).unwrap_or(table.default_rate()),
            flow_rate: pump.flow_rate,
            calibrated: pump_rate(pump).is_some(),
        })
        .collect()
}

/// One entry per channel: the pump whose calibration supplies the channel's
/// rate, or the first pump on the channel when none is calibrated.
pub fn channel_report(snapshot: &Snapshot) -> BTreeMap<Channel, CalibrationEntry> {
    let mut channels: BTreeMap<Channel, CalibrationEntry> = BTreeMap::new();
    for entry in report(snapshot) {
        let replace = channels
            .get(&entry.channel)
            .map_or(true, |kept| !kept.calibrated && entry.calibrated);
        if replace {
            channels.insert(entry.channel, entry);
        }
    }
    channels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Snapshot {
        Snapshot::from_yaml(
            r#"
settings:
  default_rate: 0.5
pumps:
  - { id: rum, channel: 17, label: Rum, rate: 0.27, flow_rate: 10 }
  - { id: lime, channel: 27, label: Lime, flow_rate: 4 }
  - { id: soda, channel: 25, label: Soda }
  - { id: dead, channel: 23, label: Dead, flow_rate: 0 }
"#,
        )
        .unwrap()
    }

    #[test]
    fn explicit_rate_wins_over_flow_rate() {
        assert_eq!(rate(Channel(17), &snapshot()), 0.27);
    }

    #[test]
    fn flow_rate_is_inverted() {
        assert_eq!(rate(Channel(27), &snapshot()), 0.25);
    }

    #[test]
    fn uncalibrated_channel_uses_default() {
        let snap = snapshot();
        assert_eq!(rate(Channel(25), &snap), 0.5);
        assert_eq!(rate(Channel(23), &snap), 0.5);
        assert_eq!(rate(Channel(99), &snap), 0.5);
    }

    #[test]
    fn report_marks_calibration_source() {
        let entries = report(&snapshot());
        assert_eq!(entries.len(), 4);
        assert!(entries[0].calibrated);
        assert_eq!(entries[1].flow_rate, Some(4.0));
        assert!(!entries[2].calibrated);
        assert_eq!(entries[2].rate, 0.5);
    }

    #[test]
    fn shared_channel_reports_the_pump_that_supplies_the_rate() {
        let snap = Snapshot::from_yaml(
            r#"
settings:
  default_rate: 0.5
pumps:
  - { id: spare, channel: 17, label: Spare }
  - { id: rum, channel: 17, label: Rum, flow_rate: 4 }
  - { id: lime, channel: 27, label: Lime }
  - { id: lime_b, channel: 27, label: Lime B }
"#,
        )
        .unwrap();

        let entries = report(&snap);
        assert!(!entries[0].calibrated);
        assert_eq!(entries[0].rate, 0.25);
        assert!(entries[1].calibrated);

        let channels = channel_report(&snap);
        assert_eq!(channels.len(), 2);
        let ch17 = &channels[&Channel(17)];
        assert_eq!(ch17.pump_id, "rum");
        assert_eq!(ch17.flow_rate, Some(4.0));
        assert_eq!(ch17.rate, 0.25);
        assert!(ch17.calibrated);

        let ch27 = &channels[&Channel(27)];
        assert_eq!(ch27.pump_id, "lime");
        assert!(!ch27.calibrated);
        assert_eq!(ch27.rate, 0.5);
    }
}
