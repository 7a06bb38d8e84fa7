/// Compiled-in defaults for the KISS channel parameters, the retry queue,
/// the station settings and the smart-beacon tuning.
///
/// Smart-beacon constants follow the HamHUD SmartBeaconing description
/// (http://www.hamhud.net/hh2/smartbeacon.html), tuned for a low-power
/// tracker: long slow rate, modest fast rate.

// ── KISS channel parameters ────────────────────────────────────────────

/// Keyup delay, 10 ms units (500 ms)
pub const TX_DELAY: u8 = 50;
/// p-persistence threshold, p = (P + 1) / 256
pub const PERSISTENCE: u8 = 63;
/// Post-transmit hold, 10 ms units
pub const TX_TAIL: u8 = 5;
/// Slot interval, 10 ms units (100 ms)
pub const SLOT_TIME: u8 = 10;
/// Upper bound on slot-wait retries before a direct-mode send is dropped
pub const MAX_BACKOFFS: u16 = 255;

/// Pending frames the retry queue can hold (RAM is tight on the tracker).
pub const KISS_QUEUE_LEN: usize = 2;

/// Idle gap after which a partially received frame is thrown away
pub const FRAME_IDLE_TIMEOUT_MS: u32 = 2000;

// ── Station settings ───────────────────────────────────────────────────

/// Tocall registered for the tracker
pub const DEST_CALL: &str = "APTI01";
pub const MY_CALL: &str = "NOCALL";
pub const PATH1_CALL: &str = "WIDE1";
pub const PATH1_SSID: u8 = 1;

/// Primary symbol table and symbol code (car)
pub const SYMBOL_TABLE: char = '/';
pub const SYMBOL_CODE: char = '>';

/// Comment appended to every position report
pub const BEACON_COMMENT: &str = " TinyTNC";

// ── Beacon timing ──────────────────────────────────────────────────────

/// Fixed-interval rate, and the smart-beacon rate at high speed (s)
pub const SB_FAST_RATE: u32 = 45;
/// Smart-beacon rate at low speed (s)
pub const SB_SLOW_RATE: u32 = 120;
/// Below this speed the slow rate applies (km/h)
pub const SB_LOW_SPEED: u32 = 5;
/// Above this speed the fast rate applies (km/h)
pub const SB_HI_SPEED: u32 = 70;
/// Minimum seconds between turn-triggered beacons
pub const SB_TURN_TIME: i32 = 15;
/// Minimum heading change for a turn beacon (degrees)
pub const SB_TURN_MIN: f32 = 10.0;
/// Turn threshold slope (degrees × km/h)
pub const SB_TURN_SLOPE: f32 = 240.0;
