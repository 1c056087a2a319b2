//! Volume-domain mapping between zone-native ranges and the streaming
//! protocol's fixed 16-bit scale.
//!
//! Zones advertise an arbitrary stepped range (`min..=max`); the streaming
//! host speaks absolute values in `0..=65535`. Both directions round to the
//! nearest unit, so a native value survives a round trip within one step.
//! Mute is modeled as stream volume 0 without touching the stored native
//! value.

use crate::control::types::VolumeInfo;
use crate::protocol_constants::{STREAM_VOLUME_MAX, STREAM_VOLUME_SPAN};

/// Maps a native volume value onto the streaming scale.
///
/// Values outside the advertised range are clamped first. A degenerate
/// range (`max <= min`) maps to 0.
#[must_use]
pub fn native_to_stream(info: &VolumeInfo) -> u16 {
    let span = info.max - info.min;
    if span <= 0 {
        return 0;
    }
    let value = info.value.clamp(info.min, info.max);
    let scaled =
        f64::from(value - info.min) / f64::from(span) * f64::from(STREAM_VOLUME_MAX);
    scaled.round() as u16
}

/// The stream-side volume currently audible for an output: 0 while muted,
/// the mapped native value otherwise.
#[must_use]
pub fn stream_volume(info: &VolumeInfo) -> u16 {
    if info.is_muted {
        0
    } else {
        native_to_stream(info)
    }
}

/// Maps a streaming-scale value back into a zone's native range.
///
/// Uses the 65536 divisor so the midpoint 32768 lands exactly on the middle
/// of the native range. A degenerate range maps to `min`.
#[must_use]
pub fn stream_to_native(info: &VolumeInfo, stream: u16) -> i32 {
    let span = info.max - info.min;
    if span <= 0 {
        return info.min;
    }
    let fraction = f64::from(stream) / f64::from(STREAM_VOLUME_SPAN);
    info.min + (f64::from(span) * fraction).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain(min: i32, max: i32, value: i32, is_muted: bool) -> VolumeInfo {
        VolumeInfo {
            min,
            max,
            step: 1,
            value,
            is_muted,
        }
    }

    #[test]
    fn maps_midpoint_of_percent_domain() {
        let info = domain(0, 100, 50, false);
        assert_eq!(stream_to_native(&info, 32768), 50);
    }

    #[test]
    fn maps_forty_percent_to_stream() {
        let info = domain(0, 100, 40, false);
        assert_eq!(native_to_stream(&info), 26214);
    }

    #[test]
    fn round_trips_within_one_unit() {
        for value in -80..=-30 {
            let info = domain(-80, -30, value, false);
            let back = stream_to_native(&info, native_to_stream(&info));
            assert!(
                (back - value).abs() <= 1,
                "value {value} came back as {back}"
            );
        }
        for value in 0..=100 {
            let info = domain(0, 100, value, false);
            let back = stream_to_native(&info, native_to_stream(&info));
            assert!(
                (back - value).abs() <= 1,
                "value {value} came back as {back}"
            );
        }
    }

    #[test]
    fn extremes_map_exactly() {
        assert_eq!(native_to_stream(&domain(0, 100, 0, false)), 0);
        assert_eq!(native_to_stream(&domain(0, 100, 100, false)), 65535);
        assert_eq!(stream_to_native(&domain(0, 100, 0, false), 0), 0);
        assert_eq!(stream_to_native(&domain(0, 100, 0, false), 65535), 100);
    }

    #[test]
    fn muted_outputs_report_zero_without_losing_value() {
        let info = domain(0, 100, 40, true);
        assert_eq!(stream_volume(&info), 0);
        assert_eq!(native_to_stream(&info), 26214);
    }

    #[test]
    fn out_of_range_values_clamp() {
        assert_eq!(native_to_stream(&domain(0, 100, 140, false)), 65535);
        assert_eq!(native_to_stream(&domain(0, 100, -5, false)), 0);
    }

    #[test]
    fn degenerate_ranges_collapse() {
        let info = domain(50, 50, 50, false);
        assert_eq!(native_to_stream(&info), 0);
        assert_eq!(stream_to_native(&info, 40000), 50);

        let inverted = domain(100, 0, 30, false);
        assert_eq!(native_to_stream(&inverted), 0);
        assert_eq!(stream_to_native(&inverted, 40000), 100);
    }
}
