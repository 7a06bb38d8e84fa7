/// Collaborator interfaces, the narrow seams between the link-layer core
/// and the board.
///
/// Serial, modem, timer and random source are all provided by the firmware.
/// The core only ever talks to them through these traits, so every algorithm
/// here runs unchanged on the host under test.

use crate::settings::Call;

/// Byte-oriented serial link to the KISS host.
pub trait HostSerial {
    /// Non-blocking read. `None` when no byte is pending.
    fn read_byte(&mut self) -> Option<u8>;

    fn write_byte(&mut self, byte: u8);
}

/// Radio modem: carrier sense, receive polling and the transmit primitives.
pub trait Modem {
    /// Data carrier detect: true while another station is on the air.
    fn carrier_busy(&self) -> bool;

    /// Drain the receive path. Must be called while waiting on a busy
    /// channel so the receive buffer does not overrun.
    fn poll(&mut self);

    /// Read and clear the modem error flag (overflow or similar).
    fn take_error(&mut self) -> bool;

    /// Transmit an already-encoded AX.25 frame as handed over by the host.
    fn send_raw(&mut self, frame: &[u8]);

    /// Transmit `payload` addressed via `path`: destination, source, then up
    /// to two digipeaters.
    fn send_via(&mut self, path: &[Call], payload: &[u8]);
}

/// Monotonic millisecond tick counter. Wraps at `u32::MAX`.
pub trait Clock {
    fn now_ms(&self) -> u32;

    /// Spin hook called from busy-wait loops (`cpu_relax`, watchdog kick).
    fn relax(&mut self) {}

    /// Seconds since boot, as used by the beacon bookkeeping.
    fn now_secs(&self) -> u32 {
        self.now_ms() / 1000
    }
}

/// Uniform byte source for the persistence draw. Need not be cryptographic.
pub trait RandomSource {
    fn next_byte(&mut self) -> u8;
}

/// Everything the blocking CSMA wait needs from the board.
pub trait Radio: Modem + Clock + RandomSource {}

impl<T: Modem + Clock + RandomSource> Radio for T {}
