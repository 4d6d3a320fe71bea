//! Attack timeline encoding.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::TimelineEvent;

use super::{COLOR_HIGH, COLOR_LOW, COLOR_MEDIUM};

/// Fixed, ordered category lanes for the vertical axis.
pub const SOURCE_LANES: [&str; 5] = ["Windows", "Android", "Server", "IoT", "Cloud"];

const MIN_POINT_SIZE: f64 = 10.0;

/// One scatter point on the timeline.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePoint {
    /// Event label shown in tooltips.
    pub name: String,
    pub timestamp: DateTime<Utc>,
    /// Index into [`SOURCE_LANES`].
    pub lane: usize,
    pub severity: u8,
    pub symbol_size: f64,
    pub color: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

fn severity_color(severity: u8) -> &'static str {
    if severity >= 4 {
        COLOR_HIGH
    } else if severity >= 3 {
        COLOR_MEDIUM
    } else {
        COLOR_LOW
    }
}

/// Map events to scatter points: lane by source, size and color by severity.
///
/// An event whose source is not in [`SOURCE_LANES`] lands in lane 0, sharing
/// the first known source's lane. This is a known approximation kept for
/// parity with the backend's dashboards; a dedicated "unknown" lane would be
/// the cleaner encoding.
pub fn encode_timeline(events: &[TimelineEvent]) -> Vec<TimelinePoint> {
    events
        .iter()
        .map(|event| TimelinePoint {
            name: event.event.clone(),
            timestamp: event.timestamp,
            lane: SOURCE_LANES
                .iter()
                .position(|lane| lane.eq_ignore_ascii_case(&event.source))
                .unwrap_or(0),
            severity: event.severity,
            symbol_size: (f64::from(event.severity) * 8.0).max(MIN_POINT_SIZE),
            color: severity_color(event.severity),
            details: event.details.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(source: &str, severity: u8) -> TimelineEvent {
        TimelineEvent {
            timestamp: Utc.with_ymd_and_hms(2026, 8, 1, 9, 30, 0).unwrap(),
            device: "ws-042".into(),
            event: "lateral_movement".into(),
            severity,
            source: source.into(),
            details: None,
        }
    }

    #[test]
    fn severity_bands_pick_colors() {
        let points = encode_timeline(&[event("Server", 5), event("Server", 3), event("Server", 1)]);
        assert_eq!(points[0].color, COLOR_HIGH);
        assert_eq!(points[1].color, COLOR_MEDIUM);
        assert_eq!(points[2].color, COLOR_LOW);
    }

    #[test]
    fn point_size_scales_with_severity_with_a_floor() {
        let points = encode_timeline(&[event("Cloud", 5), event("Cloud", 1)]);
        assert_eq!(points[0].symbol_size, 40.0);
        // 1 * 8 = 8 is below the floor of 10.
        assert_eq!(points[1].symbol_size, 10.0);
    }

    #[test]
    fn sources_map_to_fixed_lanes() {
        let points = encode_timeline(&[
            event("Windows", 2),
            event("android", 2),
            event("IoT", 2),
            event("Cloud", 2),
        ]);
        assert_eq!(points[0].lane, 0);
        assert_eq!(points[1].lane, 1);
        assert_eq!(points[2].lane, 3);
        assert_eq!(points[3].lane, 4);
    }

    #[test]
    fn unknown_source_falls_back_to_lane_zero() {
        let points = encode_timeline(&[event("mainframe", 2)]);
        assert_eq!(points[0].lane, 0);
    }

    #[test]
    fn events_are_never_discarded() {
        let events: Vec<TimelineEvent> = (0..7).map(|i| event("nonsense", i % 6)).collect();
        assert_eq!(encode_timeline(&events).len(), events.len());
    }
}
