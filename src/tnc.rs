/// The TNC context, i.e. everything the cooperative main loop drives.
///
/// Owns the frame assembler, channel parameters, channel access gate,
/// beacon scheduler, settings and the board itself. The firmware calls the
/// `poll_*` methods from its loop; nothing here spawns or blocks except the
/// p-persistent wait in direct mode.
use crate::beacon::{build_position_report, BeaconPolicy, BeaconScheduler};
use crate::channel::{acquire, AccessMode, ChannelAccess, ChannelConfig, Grant, TxOutcome};
use crate::comm::{encode_frame, handle_command, parse_command, FrameAssembler};
use crate::defaults::KISS_QUEUE_LEN;
use crate::gps::GpsFix;
use crate::hal::{HostSerial, Radio};
use crate::protocol::KissCommand;
use crate::settings::Settings;

/// What happened to a completed host frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameEvent {
    /// Data frame handed to channel access
    Data(TxOutcome),
    /// Channel parameter updated
    Configured,
    /// Host asked to leave KISS mode
    Exit,
    /// Frame dropped (other port, too short, unknown command)
    Ignored,
}

/// Modes resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TncOptions {
    pub access: AccessMode,
    pub beacon: BeaconPolicy,
}

pub struct Tnc<B, const Q: usize = KISS_QUEUE_LEN> {
    board: B,
    assembler: FrameAssembler,
    config: ChannelConfig,
    access: ChannelAccess<Q>,
    beacon: BeaconScheduler,
    settings: Settings,
}

impl<B: Radio + HostSerial, const Q: usize> Tnc<B, Q> {
    pub fn new(board: B, settings: Settings, options: TncOptions) -> Self {
        log::info!(
            "TNC starting: {:?} access, {:?} beacon, txdelay {} persistence {} slot {}",
            options.access,
            options.beacon,
            settings.kiss.txdelay,
            settings.kiss.persistence,
            settings.kiss.slot_time,
        );
        Self {
            board,
            assembler: FrameAssembler::new(),
            config: settings.kiss,
            access: ChannelAccess::new(options.access),
            beacon: BeaconScheduler::new(options.beacon),
            settings,
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn beacon(&self) -> &BeaconScheduler {
        &self.beacon
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    /// Frames waiting in the retry queue.
    pub fn pending(&self) -> usize {
        self.access.pending()
    }

    // ── Host side ───────────────────────────────────────────────────

    /// Read at most one byte from the host serial and process it.
    pub fn poll_serial(&mut self) -> Option<FrameEvent> {
        let byte = self.board.read_byte()?;
        self.feed(byte)
    }

    /// Process one host byte. Returns an event when it completed a frame.
    pub fn feed(&mut self, byte: u8) -> Option<FrameEvent> {
        let now = self.board.now_ms();
        let frame = self.assembler.feed(byte, now)?;

        let event = match parse_command(frame) {
            None => FrameEvent::Ignored,
            Some(KissCommand::Return) => {
                log::info!("Kiss - exiting");
                FrameEvent::Exit
            }
            Some(KissCommand::Data(payload)) => {
                log::info!("Kiss - queuing message ({} bytes)", payload.len());
                FrameEvent::Data(self.access.submit(payload, &self.config, &mut self.board))
            }
            Some(cmd) => {
                handle_command(&cmd, &mut self.config);
                FrameEvent::Configured
            }
        };
        Some(event)
    }

    /// Send a packet heard on the radio up to the host.
    pub fn send_to_host(&mut self, port: u8, payload: &[u8]) {
        let board = &mut self.board;
        encode_frame(port, payload, |b| board.write_byte(b));
    }

    /// Service the retry queue. Returns frames transmitted.
    pub fn poll_queue(&mut self) -> usize {
        self.access.drain(&self.config, &mut self.board)
    }

    // ── Beacons ─────────────────────────────────────────────────────

    /// Send a position report if the beacon policy says it is time.
    /// Returns true when a beacon went out.
    pub fn poll_beacon(&mut self, fix: &GpsFix) -> bool {
        let now = self.board.now_secs();
        if !self.beacon.is_due(fix, now) {
            return false;
        }

        let payload = build_position_report(fix, self.settings.symbol());
        if !self.send_beacon(payload.as_bytes()) {
            return false;
        }
        self.beacon.record_position(&fix.location, self.board.now_secs());
        true
    }

    /// Send the configured free-text beacon if its interval has elapsed.
    pub fn poll_text_beacon(&mut self) -> bool {
        let now = self.board.now_secs();
        if self.settings.beacon_text.is_empty() || !self.beacon.text_due(self.settings.beacon_interval, now) {
            return false;
        }

        let text = self.settings.beacon_text.clone();
        if !self.send_beacon(text.as_bytes()) {
            return false;
        }
        self.beacon.record_text(self.board.now_secs());
        true
    }

    /// Key a beacon through the CSMA gate, addressed via the settings path.
    fn send_beacon(&mut self, payload: &[u8]) -> bool {
        match acquire(&self.config, &mut self.board) {
            Grant::Granted => {
                let path = self.settings.path();
                log::debug!("Beacon - sending {} bytes via {} calls", payload.len(), path.len());
                self.board.send_via(&path, payload);
                true
            }
            Grant::Aborted | Grant::GaveUp => {
                log::warn!("Beacon - channel not granted, skipping");
                false
            }
        }
    }
}
