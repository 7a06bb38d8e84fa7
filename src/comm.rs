/// Host link: KISS frame assembly, command parsing and host-bound encoding.
///
/// The host talks KISS over serial. Bytes are fed one at a time into a
/// [`FrameAssembler`], completed frames are decoded by [`parse_command`],
/// and configuration commands are applied by [`handle_command`]. Packets
/// heard on the radio go back to the host through [`encode_frame`].

use crate::channel::{ChannelConfig, DuplexMode};
use crate::defaults::FRAME_IDLE_TIMEOUT_MS;
use crate::protocol::{cmd, data_type, split_type, KissCommand, FEND, FESC, MAX_FRAME_LEN, TFEND, TFESC};

// ── Frame assembly ─────────────────────────────────────────────────────

/// KISS decoder state machine.
/// Accumulates unescaped bytes until a FEND closes the frame, then yields it.
///
/// A partial frame is dropped when the host goes quiet for more than
/// [`FRAME_IDLE_TIMEOUT_MS`] or when it gets within two bytes of capacity,
/// which doubles as resynchronisation after line noise.
pub struct FrameAssembler<const N: usize = MAX_FRAME_LEN> {
    buf: [u8; N],
    pos: usize,
    escaped: bool,
    last_ms: u32,
}

impl<const N: usize> FrameAssembler<N> {
    pub const fn new() -> Self {
        Self {
            buf: [0; N],
            pos: 0,
            escaped: false,
            last_ms: 0,
        }
    }

    /// Bytes accumulated for the frame in progress.
    pub fn pending(&self) -> usize {
        self.pos
    }

    /// Feed a byte into the assembler. `now_ms` is the caller's monotonic
    /// tick. Returns the complete frame (type byte included, FENDs stripped)
    /// when a closing FEND arrives.
    pub fn feed(&mut self, byte: u8, now_ms: u32) -> Option<&[u8]> {
        if self.pos != 0 && now_ms.wrapping_sub(self.last_ms) > FRAME_IDLE_TIMEOUT_MS {
            log::info!("Serial - timeout, dropping {} bytes", self.pos);
            self.reset();
        }

        if self.pos + 2 >= N {
            log::info!("Serial - packet too long {} >= {}", self.pos, N.saturating_sub(2));
            self.reset();
        }

        let byte = match byte {
            FEND => {
                let complete = !self.escaped && self.pos > 0;
                let len = self.pos;
                self.reset();
                return if complete { Some(&self.buf[..len]) } else { None };
            }
            FESC => {
                self.escaped = true;
                return None;
            }
            TFEND if self.escaped => {
                self.escaped = false;
                FEND
            }
            TFESC if self.escaped => {
                self.escaped = false;
                FESC
            }
            other => {
                // Bad escape sequence: pass the byte through
                self.escaped = false;
                other
            }
        };

        if self.pos < N {
            self.buf[self.pos] = byte;
            self.pos += 1;
        }
        self.last_ms = now_ms;
        None
    }

    fn reset(&mut self) {
        self.pos = 0;
        self.escaped = false;
    }
}

impl<const N: usize> Default for FrameAssembler<N> {
    fn default() -> Self {
        Self::new()
    }
}

// ── Command parsing ────────────────────────────────────────────────────

/// Decode a completed KISS frame into a host command.
///
/// Returns `None` for frames addressed to another port, frames too short
/// to carry a value, and unknown commands.
pub fn parse_command(frame: &[u8]) -> Option<KissCommand<'_>> {
    if frame.len() == 1 && frame[0] == cmd::RETURN {
        return Some(KissCommand::Return);
    }

    let (command, port) = split_type(*frame.first()?);

    if port > 0 {
        log::debug!("Kiss - port {} not supported, dropping", port);
        return None;
    }

    if frame.len() < 2 {
        log::info!("Kiss - discarding packet - too short");
        return None;
    }

    let value = frame[1];
    match command {
        cmd::DATA => Some(KissCommand::Data(&frame[1..])),
        cmd::TX_DELAY => Some(KissCommand::TxDelay(value)),
        cmd::PERSISTENCE => Some(KissCommand::Persistence(value)),
        cmd::SLOT_TIME => Some(KissCommand::SlotTime(value)),
        cmd::TX_TAIL => Some(KissCommand::TxTail(value)),
        cmd::FULL_DUPLEX => Some(KissCommand::FullDuplex(value)),
        other => {
            log::debug!("Kiss - unsupported command {:#04x}", other);
            None
        }
    }
}

/// Apply a configuration command to the channel parameters.
///
/// Zero is ignored for the timing and persistence values since it would
/// wedge the channel; duplex accepts any value. Data and Return are not
/// configuration and leave `config` untouched.
pub fn handle_command(cmd: &KissCommand<'_>, config: &mut ChannelConfig) {
    match *cmd {
        KissCommand::TxDelay(v) => {
            log::info!("Kiss - setting txdelay {}", v);
            if v > 0 {
                config.txdelay = v;
            }
        }
        KissCommand::Persistence(v) => {
            log::info!("Kiss - setting persistence {}", v);
            if v > 0 {
                config.persistence = v;
            }
        }
        KissCommand::SlotTime(v) => {
            log::info!("Kiss - setting slot_time {}", v);
            if v > 0 {
                config.slot_time = v;
            }
        }
        KissCommand::TxTail(v) => {
            log::info!("Kiss - setting txtail {}", v);
            if v > 0 {
                config.txtail = v;
            }
        }
        KissCommand::FullDuplex(v) => {
            log::info!("Kiss - setting duplex {}", v);
            config.duplex = DuplexMode::from(v);
        }
        KissCommand::Data(_) | KissCommand::Return => {}
    }
}

// ── Host-bound encoding ────────────────────────────────────────────────

/// Frame `payload` for the host on `port`, handing each output byte to `put`.
///
/// FEND in the payload goes out as FESC TFEND, FESC as FESC TFESC.
pub fn encode_frame(port: u8, payload: &[u8], mut put: impl FnMut(u8)) {
    put(FEND);
    put(data_type(port));

    for &byte in payload {
        match byte {
            FEND => {
                put(FESC);
                put(TFEND);
            }
            FESC => {
                put(FESC);
                put(TFESC);
            }
            other => put(other),
        }
    }

    put(FEND);
}
