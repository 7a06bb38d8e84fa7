/// Position beaconing: when to send, and what.
///
/// Two policies, picked once at startup:
/// - [`BeaconPolicy::Fixed`] beacons every [`SB_FAST_RATE`] seconds.
/// - [`BeaconPolicy::Smart`] implements SmartBeaconing: a corner beacon when
///   the heading changes by more than a speed-dependent threshold, otherwise
///   a rate interpolated between [`SB_SLOW_RATE`] and [`SB_FAST_RATE`] from
///   the estimated ground speed.
///
/// References: http://www.hamhud.net/hh2/smartbeacon.html and
/// aprsdroid's `SmartBeaconing.scala`.
use core::fmt::Write;

use heapless::String;
use libm::{fmaxf, roundf};

use crate::defaults::{
    BEACON_COMMENT, SB_FAST_RATE, SB_HI_SPEED, SB_LOW_SPEED, SB_SLOW_RATE, SB_TURN_MIN, SB_TURN_SLOPE,
    SB_TURN_TIME,
};
use crate::gps::{distance_between, heading_delta, nmea_decimal_int, GpsFix, Location};

/// Maximum length of a position report payload
pub const MAX_PAYLOAD_LEN: usize = 64;

/// Buffer type for a position report payload
pub type Payload = String<MAX_PAYLOAD_LEN>;

/// Beacon timing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BeaconPolicy {
    Fixed,
    #[default]
    Smart,
}

/// Bookkeeping about the last beacon that actually went out.
#[derive(Debug, Clone, Copy, Default)]
pub struct BeaconState {
    /// Clock seconds of the last send; `None` until the first beacon
    pub last_send: Option<u32>,
    /// Fix reported by the last position beacon (smart policy only)
    pub last_location: Option<Location>,
}

pub struct BeaconScheduler {
    policy: BeaconPolicy,
    state: BeaconState,
}

impl BeaconScheduler {
    pub const fn new(policy: BeaconPolicy) -> Self {
        Self {
            policy,
            state: BeaconState {
                last_send: None,
                last_location: None,
            },
        }
    }

    pub fn policy(&self) -> BeaconPolicy {
        self.policy
    }

    pub fn state(&self) -> &BeaconState {
        &self.state
    }

    /// Should a position beacon go out now? `now_secs` is the clock in
    /// seconds since boot. An invalid fix is never due.
    pub fn is_due(&self, fix: &GpsFix, now_secs: u32) -> bool {
        if !fix.valid {
            return false;
        }
        match self.policy {
            BeaconPolicy::Fixed => self.fixed_interval_due(now_secs),
            BeaconPolicy::Smart => self.smart_due(&fix.location, now_secs),
        }
    }

    /// Should the free-text beacon go out now? `interval` of 0 disables it.
    pub fn text_due(&self, interval: u16, now_secs: u32) -> bool {
        if interval == 0 {
            return false;
        }
        self.elapsed_exceeds(now_secs, u32::from(interval))
    }

    /// Record a position beacon that went out.
    pub fn record_position(&mut self, location: &Location, now_secs: u32) {
        if self.policy == BeaconPolicy::Smart {
            self.state.last_location = Some(*location);
        }
        self.state.last_send = Some(now_secs);
    }

    /// Record a free-text beacon that went out.
    pub fn record_text(&mut self, now_secs: u32) {
        self.state.last_send = Some(now_secs);
    }

    fn fixed_interval_due(&self, now_secs: u32) -> bool {
        self.elapsed_exceeds(now_secs, SB_FAST_RATE)
    }

    fn elapsed_exceeds(&self, now_secs: u32, rate: u32) -> bool {
        match self.state.last_send {
            None => true,
            Some(last) => now_secs.wrapping_sub(last) > rate,
        }
    }

    fn smart_due(&self, location: &Location, now_secs: u32) -> bool {
        let (last_send, last) = match (self.state.last_send, self.state.last_location.as_ref()) {
            (Some(t), Some(l)) => (t, l),
            _ => return true,
        };

        // Fix timestamps are seconds of day: a non-positive delta means the
        // two fixes straddle midnight, so wait for the next one.
        let secs_since_beacon = location.timestamp as i32 - last.timestamp as i32;
        if secs_since_beacon <= 0 {
            return false;
        }

        if turn_check(location, last, secs_since_beacon) {
            log::debug!("Beacon - corner, heading {} -> {}", last.heading, location.heading);
            return true;
        }

        let speed = estimated_speed_kmh(location, last, secs_since_beacon);
        let rate = beacon_rate(speed);
        now_secs.wrapping_sub(last_send) > rate
    }
}

/// Corner pegging. Never fires while stopped; fires after [`SB_TURN_TIME`]
/// when just pulling away from a stop, otherwise when the heading change
/// beats `SB_TURN_MIN + SB_TURN_SLOPE / speed`.
fn turn_check(location: &Location, last: &Location, secs_since_beacon: i32) -> bool {
    if location.heading == 0 || location.speed_kmh == 0.0 {
        return false;
    }

    if last.heading == 0 {
        return secs_since_beacon >= SB_TURN_TIME;
    }

    let change = heading_delta(location.heading, last.heading);
    let threshold = roundf(SB_TURN_MIN + SB_TURN_SLOPE / location.speed_kmh) as u32;
    secs_since_beacon >= SB_TURN_TIME && u32::from(change) > threshold
}

/// Ground speed since the last beacon: the larger of the distance-derived
/// speed and either fix's reported speed, so one noisy sample can't stall
/// the beacon.
///
/// A very short `secs` can inflate the distance-derived figure; that is
/// accepted as is.
fn estimated_speed_kmh(location: &Location, last: &Location, secs: i32) -> u32 {
    let travelled = distance_between(location, last) / secs as f32 * 3.6;
    let reported = fmaxf(location.speed_kmh, last.speed_kmh);
    roundf(fmaxf(travelled, reported)) as u32
}

/// Target interval in seconds for a given speed.
pub fn beacon_rate(speed_kmh: u32) -> u32 {
    if speed_kmh < SB_LOW_SPEED {
        SB_SLOW_RATE
    } else if speed_kmh > SB_HI_SPEED {
        SB_FAST_RATE
    } else {
        SB_FAST_RATE + (SB_SLOW_RATE - SB_FAST_RATE) * (SB_HI_SPEED - speed_kmh) / (SB_HI_SPEED - SB_LOW_SPEED)
    }
}

// ── Payload ────────────────────────────────────────────────────────────

/// Build an APRS position report (no timestamp, no messaging):
///
/// `!ddmm.mmN/dddmm.mmE>CSE/SPD/A=aaaaaa TinyTNC`
///
/// Coordinates are copied from the sentence tokens (at most 7 and 8
/// characters), the altitude suffix only appears for a positive altitude.
pub fn build_position_report(fix: &GpsFix, symbol: (char, char)) -> Payload {
    let mut out = Payload::new();
    let _ = out.push('!');
    push_truncated(&mut out, &fix.latitude, 7);
    let _ = out.push(fix.lat_hemisphere);
    let _ = out.push(symbol.0);
    push_truncated(&mut out, &fix.longitude, 8);
    let _ = out.push(fix.lon_hemisphere);
    let _ = out.push(symbol.1);
    let _ = write!(
        out,
        "{:03}/{:03}",
        nmea_decimal_int(&fix.course),
        nmea_decimal_int(&fix.speed)
    );

    if fix.altitude > 0 {
        let _ = write!(out, "/A={:06}", fix.altitude);
    }

    let _ = out.push_str(BEACON_COMMENT);
    out
}

fn push_truncated(out: &mut Payload, s: &str, max: usize) {
    for ch in s.chars().take(max) {
        let _ = out.push(ch);
    }
}
