/// Channel access: p-persistent CSMA in front of the modem.
///
/// Before keying up, the TNC waits for the channel to go quiet and then
/// transmits with probability `(persistence + 1) / 256`, otherwise it backs
/// off one slot and senses again. Contending stations spread their attempts
/// without any coordination.
///
/// Two modes:
/// - [`AccessMode::Direct`]: `submit` blocks the caller until the frame is
///   on the air, the modem reports an error, or the backoff budget is spent.
/// - [`AccessMode::Queued`]: `submit` parks the frame in a small
///   [`RetryQueue`] and returns; `drain` is called from the main loop.
use heapless::Vec;
use serde::Deserialize;

use crate::defaults;
use crate::hal::{Clock, Radio};
use crate::protocol::Frame;

/// Duplex mode as set by the host. Stored for the modem driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplexMode {
    Half,
    Full,
}

impl From<u8> for DuplexMode {
    fn from(value: u8) -> Self {
        if value == 0 {
            DuplexMode::Half
        } else {
            DuplexMode::Full
        }
    }
}

/// KISS channel parameters. Changed at runtime by host configuration frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Keyup delay, 10 ms units
    pub txdelay: u8,
    /// Post-transmit hold, 10 ms units
    pub txtail: u8,
    /// p-persistence threshold, 0–255
    pub persistence: u8,
    /// Slot interval, 10 ms units
    pub slot_time: u8,
    pub duplex: DuplexMode,
    /// Slot-wait retries before a blocking send gives up
    pub max_backoffs: u16,
}

impl ChannelConfig {
    pub const fn new() -> Self {
        Self {
            txdelay: defaults::TX_DELAY,
            txtail: defaults::TX_TAIL,
            persistence: defaults::PERSISTENCE,
            slot_time: defaults::SLOT_TIME,
            duplex: DuplexMode::Half,
            max_backoffs: defaults::MAX_BACKOFFS,
        }
    }

    /// One slot in milliseconds.
    pub const fn slot_ms(&self) -> u32 {
        self.slot_time as u32 * 10
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of handing a frame to the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    /// Frame went out on the air
    Sent,
    /// Frame is parked in the retry queue
    Queued,
    /// Retry queue full (or frame too large); frame discarded
    Dropped,
    /// Modem error while waiting for the carrier to clear; frame discarded
    Aborted,
    /// Backoff budget exhausted; frame discarded
    GaveUp,
}

/// Outcome of the blocking p-persistent wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    Granted,
    Aborted,
    GaveUp,
}

/// Wait for the channel using p-persistent CSMA. Blocks the caller.
///
/// While the carrier is up the modem is polled so received frames keep
/// flowing; a modem error during that wait aborts the attempt. With the
/// channel clear, a random byte below `persistence` grants access,
/// otherwise one slot is spun away on the clock and the loop restarts.
pub fn acquire<R: Radio>(config: &ChannelConfig, radio: &mut R) -> Grant {
    let mut backoffs: u16 = 0;

    loop {
        while radio.carrier_busy() {
            radio.poll();
            if radio.take_error() {
                log::warn!("CSMA - modem error while channel busy, dropping frame");
                return Grant::Aborted;
            }
            radio.relax();
        }

        let roll = radio.next_byte();
        if roll < config.persistence {
            return Grant::Granted;
        }

        if backoffs >= config.max_backoffs {
            log::warn!("CSMA - no access after {} backoffs, dropping frame", backoffs);
            return Grant::GaveUp;
        }
        backoffs += 1;

        log::debug!("CSMA - roll {} >= {}, waiting {}ms", roll, config.persistence, config.slot_ms());
        wait_slot(config, radio);
    }
}

fn wait_slot<C: Clock>(config: &ChannelConfig, clock: &mut C) {
    let start = clock.now_ms();
    while clock.now_ms().wrapping_sub(start) < config.slot_ms() {
        clock.relax();
    }
}

// ── Retry queue ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Idle,
    /// Lost the persistence draw; hold off until a slot has passed
    Delayed,
}

/// Bounded FIFO of frames waiting for the channel.
pub struct RetryQueue<const N: usize> {
    frames: Vec<Frame, N>,
    state: QueueState,
    delayed_at: u32,
}

impl<const N: usize> RetryQueue<N> {
    pub const fn new() -> Self {
        Self {
            frames: Vec::new(),
            state: QueueState::Idle,
            delayed_at: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn state(&self) -> QueueState {
        self.state
    }

    /// Append a frame. Returns `false` (and drops it) when the queue is full.
    pub fn push(&mut self, frame: &[u8]) -> bool {
        if self.frames.is_full() {
            return false;
        }
        match Frame::from_slice(frame) {
            Ok(f) => self.frames.push(f).is_ok(),
            Err(_) => false,
        }
    }

    /// Flush the queue if the channel allows it. Non-blocking.
    ///
    /// Returns the number of frames transmitted.
    pub fn drain<R: Radio>(&mut self, config: &ChannelConfig, radio: &mut R) -> usize {
        if self.frames.is_empty() || radio.carrier_busy() {
            return 0;
        }

        if self.state == QueueState::Delayed {
            if radio.now_ms().wrapping_sub(self.delayed_at) <= config.slot_ms() {
                return 0;
            }
            log::debug!("Queue released");
        }

        let roll = radio.next_byte();
        if roll > config.persistence {
            log::debug!("Queue delayed for {}ms (roll {})", config.slot_ms(), roll);
            self.state = QueueState::Delayed;
            self.delayed_at = radio.now_ms();
            return 0;
        }

        let sent = self.frames.len();
        log::debug!("Queue sending packets: {}", sent);
        for frame in &self.frames {
            radio.send_raw(frame);
        }
        self.frames.clear();
        self.state = QueueState::Idle;
        sent
    }
}

impl<const N: usize> Default for RetryQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

// ── Access strategy ────────────────────────────────────────────────────

/// Channel access strategy, chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    #[default]
    Direct,
    Queued,
}

/// The gate host data frames pass through on their way to the modem.
pub enum ChannelAccess<const N: usize = { defaults::KISS_QUEUE_LEN }> {
    Direct,
    Queued(RetryQueue<N>),
}

impl<const N: usize> ChannelAccess<N> {
    pub const fn new(mode: AccessMode) -> Self {
        match mode {
            AccessMode::Direct => ChannelAccess::Direct,
            AccessMode::Queued => ChannelAccess::Queued(RetryQueue::new()),
        }
    }

    pub fn mode(&self) -> AccessMode {
        match self {
            ChannelAccess::Direct => AccessMode::Direct,
            ChannelAccess::Queued(_) => AccessMode::Queued,
        }
    }

    /// Hand a host data frame to the channel.
    pub fn submit<R: Radio>(&mut self, frame: &[u8], config: &ChannelConfig, radio: &mut R) -> TxOutcome {
        match self {
            ChannelAccess::Direct => match acquire(config, radio) {
                Grant::Granted => {
                    radio.send_raw(frame);
                    TxOutcome::Sent
                }
                Grant::Aborted => TxOutcome::Aborted,
                Grant::GaveUp => TxOutcome::GaveUp,
            },
            ChannelAccess::Queued(queue) => {
                if queue.push(frame) {
                    log::debug!("Kiss - queued frame ({} pending)", queue.len());
                    TxOutcome::Queued
                } else {
                    log::warn!("Kiss - queue full, dropping {} byte frame", frame.len());
                    TxOutcome::Dropped
                }
            }
        }
    }

    /// Periodic queue service. No-op in direct mode.
    pub fn drain<R: Radio>(&mut self, config: &ChannelConfig, radio: &mut R) -> usize {
        match self {
            ChannelAccess::Direct => 0,
            ChannelAccess::Queued(queue) => queue.drain(config, radio),
        }
    }

    pub fn pending(&self) -> usize {
        match self {
            ChannelAccess::Direct => 0,
            ChannelAccess::Queued(queue) => queue.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::fake::{FakeBoard, Sent};

    fn config(persistence: u8) -> ChannelConfig {
        ChannelConfig {
            persistence,
            ..ChannelConfig::new()
        }
    }

    #[test]
    fn defaults_match_kiss_init() {
        let c = ChannelConfig::default();
        assert_eq!(c.txdelay, 50);
        assert_eq!(c.persistence, 63);
        assert_eq!(c.txtail, 5);
        assert_eq!(c.slot_time, 10);
        assert_eq!(c.duplex, DuplexMode::Half);
        assert_eq!(c.slot_ms(), 100);
    }

    #[test]
    fn duplex_from_byte() {
        assert_eq!(DuplexMode::from(0), DuplexMode::Half);
        assert_eq!(DuplexMode::from(1), DuplexMode::Full);
        assert_eq!(DuplexMode::from(0xFF), DuplexMode::Full);
    }

    // ── acquire / direct mode ───────────────────────────────────────

    #[test]
    fn full_persistence_transmits_on_first_clear_check() {
        let mut board = FakeBoard::with_random(&[254]);
        assert_eq!(acquire(&config(255), &mut board), Grant::Granted);
        assert_eq!(board.draws, 1);
        assert_eq!(board.now_ms, 0, "no slot wait");
    }

    #[test]
    fn zero_persistence_always_backs_off() {
        let mut board = FakeBoard::with_random(&[0]);
        let c = ChannelConfig {
            persistence: 0,
            max_backoffs: 3,
            ..ChannelConfig::new()
        };
        assert_eq!(acquire(&c, &mut board), Grant::GaveUp);
        // Three slot waits, four draws
        assert_eq!(board.draws, 4);
        assert_eq!(board.now_ms, 3 * c.slot_ms());
    }

    #[test]
    fn losing_roll_waits_one_slot_then_retries() {
        let mut board = FakeBoard::with_random(&[200, 10]);
        let c = config(63);
        assert_eq!(acquire(&c, &mut board), Grant::Granted);
        assert_eq!(board.draws, 2);
        assert_eq!(board.now_ms, c.slot_ms());
    }

    #[test]
    fn busy_carrier_polls_modem_until_clear() {
        let mut board = FakeBoard::with_random(&[0]);
        board.busy_polls = 5;
        assert_eq!(acquire(&config(63), &mut board), Grant::Granted);
        assert_eq!(board.polls, 5);
        assert_eq!(board.draws, 1, "no draw while the carrier is up");
    }

    #[test]
    fn modem_error_while_busy_aborts() {
        let mut board = FakeBoard::with_random(&[0]);
        board.busy_polls = 100;
        board.error_after_polls = Some(3);
        assert_eq!(acquire(&config(63), &mut board), Grant::Aborted);
        assert_eq!(board.polls, 3);
        assert!(!board.error, "error flag cleared");
        assert_eq!(board.draws, 0);
    }

    #[test]
    fn direct_submit_sends_raw() {
        let mut access: ChannelAccess = ChannelAccess::new(AccessMode::Direct);
        let mut board = FakeBoard::with_random(&[0]);
        let outcome = access.submit(&[0xAA, 0xBB], &config(63), &mut board);
        assert_eq!(outcome, TxOutcome::Sent);
        assert_eq!(board.sent, vec![Sent::Raw(vec![0xAA, 0xBB])]);
        assert_eq!(access.pending(), 0);
    }

    #[test]
    fn direct_submit_drops_on_modem_error() {
        let mut access: ChannelAccess = ChannelAccess::new(AccessMode::Direct);
        let mut board = FakeBoard::new();
        board.busy_polls = 10;
        board.error_after_polls = Some(1);
        assert_eq!(access.submit(&[1], &config(63), &mut board), TxOutcome::Aborted);
        assert!(board.sent.is_empty());
    }

    #[test]
    fn direct_drain_is_noop() {
        let mut access: ChannelAccess = ChannelAccess::new(AccessMode::Direct);
        let mut board = FakeBoard::new();
        assert_eq!(access.drain(&config(63), &mut board), 0);
        assert_eq!(board.draws, 0);
    }

    // ── queued mode ─────────────────────────────────────────────────

    #[test]
    fn queued_submit_does_not_transmit() {
        let mut access: ChannelAccess = ChannelAccess::new(AccessMode::Queued);
        let mut board = FakeBoard::new();
        assert_eq!(access.submit(&[1, 2], &config(63), &mut board), TxOutcome::Queued);
        assert_eq!(access.pending(), 1);
        assert!(board.sent.is_empty());
        assert_eq!(board.draws, 0);
    }

    #[test]
    fn queue_drops_beyond_capacity() {
        let mut access: ChannelAccess<2> = ChannelAccess::new(AccessMode::Queued);
        let mut board = FakeBoard::new();
        let c = config(63);
        assert_eq!(access.submit(&[1], &c, &mut board), TxOutcome::Queued);
        assert_eq!(access.submit(&[2], &c, &mut board), TxOutcome::Queued);
        assert_eq!(access.submit(&[3], &c, &mut board), TxOutcome::Dropped);
        assert_eq!(access.pending(), 2);
    }

    #[test]
    fn queue_rejects_oversized_frame() {
        let mut queue = RetryQueue::<2>::new();
        let big = [0u8; crate::protocol::MAX_FRAME_LEN + 1];
        assert!(!queue.push(&big));
        assert!(queue.is_empty());
    }

    #[test]
    fn drain_sends_all_in_order_and_resets() {
        let mut access: ChannelAccess<2> = ChannelAccess::new(AccessMode::Queued);
        let mut board = FakeBoard::with_random(&[10]);
        let c = config(63);
        access.submit(&[1], &c, &mut board);
        access.submit(&[2, 2], &c, &mut board);

        assert_eq!(access.drain(&c, &mut board), 2);
        assert_eq!(board.raw_frames(), vec![vec![1], vec![2, 2]]);
        assert_eq!(access.pending(), 0);
    }

    #[test]
    fn drain_waits_for_carrier() {
        let mut queue = RetryQueue::<2>::new();
        let mut board = FakeBoard::with_random(&[0]);
        queue.push(&[1]);
        board.busy_polls = 1;
        assert_eq!(queue.drain(&config(63), &mut board), 0);
        assert_eq!(board.draws, 0);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn drain_empty_queue_draws_nothing() {
        let mut queue = RetryQueue::<2>::new();
        let mut board = FakeBoard::new();
        assert_eq!(queue.drain(&config(63), &mut board), 0);
        assert_eq!(board.draws, 0);
    }

    #[test]
    fn losing_roll_delays_for_a_slot() {
        let mut queue = RetryQueue::<2>::new();
        let c = config(63);
        let mut board = FakeBoard::with_random(&[64, 0]);
        board.now_ms = 1_000;
        queue.push(&[1]);

        assert_eq!(queue.drain(&c, &mut board), 0);
        assert_eq!(queue.state(), QueueState::Delayed);

        // Still inside the slot: no draw at all
        board.now_ms = 1_000 + c.slot_ms();
        assert_eq!(queue.drain(&c, &mut board), 0);
        assert_eq!(board.draws, 1);

        // Slot elapsed: winning roll flushes
        board.now_ms += 1;
        assert_eq!(queue.drain(&c, &mut board), 1);
        assert_eq!(queue.state(), QueueState::Idle);
        assert!(queue.is_empty());
    }

    #[test]
    fn roll_equal_to_persistence_transmits() {
        let mut queue = RetryQueue::<2>::new();
        let mut board = FakeBoard::with_random(&[63]);
        queue.push(&[9]);
        assert_eq!(queue.drain(&config(63), &mut board), 1);
    }

    #[test]
    fn mode_round_trips() {
        let direct: ChannelAccess = ChannelAccess::new(AccessMode::Direct);
        let queued: ChannelAccess = ChannelAccess::new(AccessMode::Queued);
        assert_eq!(direct.mode(), AccessMode::Direct);
        assert_eq!(queued.mode(), AccessMode::Queued);
    }
}
