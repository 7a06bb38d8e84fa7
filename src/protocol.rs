/// KISS protocol constants and the command set understood from the host.
///
/// Every KISS frame is `FEND <type> <data…> FEND`, where the type byte packs
/// the command in its low nibble and the TNC port in its high nibble.
/// Uses `heapless` types for no_std/no-alloc operation.
use heapless::Vec;

/// Frame end delimiter
pub const FEND: u8 = 0xC0;
/// Frame escape
pub const FESC: u8 = 0xDB;
/// Transposed frame end (follows FESC)
pub const TFEND: u8 = 0xDC;
/// Transposed frame escape (follows FESC)
pub const TFESC: u8 = 0xDD;

/// Command codes carried in the low nibble of the type byte.
pub mod cmd {
    pub const DATA: u8 = 0x00;
    pub const TX_DELAY: u8 = 0x01;
    pub const PERSISTENCE: u8 = 0x02;
    pub const SLOT_TIME: u8 = 0x03;
    pub const TX_TAIL: u8 = 0x04;
    pub const FULL_DUPLEX: u8 = 0x05;
    pub const SET_HARDWARE: u8 = 0x06;
    /// Leave KISS mode. Sent as a whole type byte, not a nibble.
    pub const RETURN: u8 = 0xFF;
}

/// Maximum size of a KISS frame held by the TNC (type byte + AX.25 frame).
pub const MAX_FRAME_LEN: usize = 330;

/// Buffer type for a decoded frame waiting for the channel.
pub type Frame = Vec<u8, MAX_FRAME_LEN>;

/// Library version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// A decoded, port-0 KISS command from the host.
#[derive(Debug, PartialEq, Eq)]
pub enum KissCommand<'a> {
    /// AX.25 frame to put on the air (type byte stripped)
    Data(&'a [u8]),
    /// Keyup delay, in 10 ms units
    TxDelay(u8),
    /// p-persistence threshold, 0–255
    Persistence(u8),
    /// Slot interval, in 10 ms units
    SlotTime(u8),
    /// Post-transmit hold, in 10 ms units
    TxTail(u8),
    /// 0 = half duplex, anything else = full duplex
    FullDuplex(u8),
    /// Host wants the TNC to leave KISS mode
    Return,
}

/// Split a KISS type byte into `(command, port)`.
#[inline]
pub const fn split_type(type_byte: u8) -> (u8, u8) {
    (type_byte & 0x0F, type_byte >> 4)
}

/// Build a KISS type byte for a data frame on `port`.
#[inline]
pub const fn data_type(port: u8) -> u8 {
    (port << 4) & 0xF0
}
