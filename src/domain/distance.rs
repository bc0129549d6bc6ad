//! RSSI to distance estimation
//!
//! Empirical log-distance path-loss approximation with a fixed reference
//! transmit power. Each call works on a single instantaneous reading.

/// Assumed signal strength at 1 meter, in dBm.
pub const TX_POWER: i16 = -59;

/// Returned for a zero reading, which the radio uses for "no measurement".
pub const UNKNOWN_DISTANCE: f64 = -1.0;

/// Estimate distance in meters from a signal strength in dBm.
///
/// A negative result is not a distance and must not be shown as one.
pub fn estimate(signal_strength: i16) -> f64 {
    if signal_strength == 0 {
        return UNKNOWN_DISTANCE;
    }

    let ratio = f64::from(signal_strength) / f64::from(TX_POWER);
    if ratio < 1.0 {
        ratio.powi(10)
    } else {
        0.89976 * ratio.powf(7.7095) + 0.111
    }
}
