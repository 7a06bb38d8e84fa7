/// Station settings: addressing, symbol, beacon text and initial channel
/// parameters.
///
/// Settings arrive as a JSON document (from the configuration console or a
/// host tool) and are decoded with `serde_json_core` into fixed-capacity
/// `heapless` strings. Storage is the firmware's business.
use heapless::{String, Vec};
use serde::Deserialize;

use crate::channel::ChannelConfig;
use crate::defaults;

/// AX.25 callsign, up to six characters
pub type CallString = String<6>;

/// Free-text beacon, up to 80 characters
pub type BeaconText = String<80>;

/// Callsign + SSID.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct Call {
    pub call: CallString,
    pub ssid: u8,
}

impl Call {
    /// Build a call, truncating anything beyond six characters.
    pub fn new(call: &str, ssid: u8) -> Self {
        let mut c = CallString::new();
        for ch in call.chars().take(6) {
            let _ = c.push(ch);
        }
        Self { call: c, ssid }
    }

    pub fn is_set(&self) -> bool {
        !self.call.is_empty()
    }
}

/// Persistent station configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub dest_call: Call,
    pub my_call: Call,
    pub path1: Call,
    pub path2: Call,
    /// Symbol table + symbol code. Missing characters fall back to `/` `>`.
    pub symbol: String<2>,
    pub beacon_text: BeaconText,
    /// Fixed-text beacon interval in seconds, 0 = disabled
    pub beacon_interval: u16,
    /// KISS channel parameters applied at startup
    pub kiss: ChannelConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dest_call: Call::new(defaults::DEST_CALL, 0),
            my_call: Call::new(defaults::MY_CALL, 0),
            path1: Call::new(defaults::PATH1_CALL, defaults::PATH1_SSID),
            path2: Call::default(),
            symbol: String::new(),
            beacon_text: BeaconText::new(),
            beacon_interval: 0,
            kiss: ChannelConfig::new(),
        }
    }
}

impl Settings {
    /// Decode settings from JSON. Absent fields keep their defaults.
    /// Returns `None` on malformed input or strings that exceed capacity.
    pub fn from_json(data: &[u8]) -> Option<Self> {
        match serde_json_core::from_slice::<Settings>(data) {
            Ok((settings, _)) => Some(settings),
            Err(_) => {
                log::warn!("Settings - failed to parse {} bytes of JSON", data.len());
                None
            }
        }
    }

    /// Symbol table and code, defaulting to `/` and `>` when unset.
    pub fn symbol(&self) -> (char, char) {
        let mut chars = self.symbol.chars();
        let table = chars.next().unwrap_or(defaults::SYMBOL_TABLE);
        let code = chars.next().unwrap_or(defaults::SYMBOL_CODE);
        (table, code)
    }

    /// Addressing path: destination, source, then each digipeater that is set.
    pub fn path(&self) -> Vec<Call, 4> {
        let mut path = Vec::new();
        let _ = path.push(self.dest_call.clone());
        let _ = path.push(self.my_call.clone());
        for digi in [&self.path1, &self.path2] {
            if digi.is_set() {
                let _ = path.push(digi.clone());
            }
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::DuplexMode;

    #[test]
    fn defaults_address_tocall_and_wide1() {
        let s = Settings::default();
        let path = s.path();
        assert_eq!(path.len(), 3);
        assert_eq!(path[0], Call::new("APTI01", 0));
        assert_eq!(path[1], Call::new("NOCALL", 0));
        assert_eq!(path[2], Call::new("WIDE1", 1));
        assert_eq!(s.beacon_interval, 0);
        assert_eq!(s.kiss, ChannelConfig::new());
    }

    #[test]
    fn path_includes_both_digis_when_set() {
        let s = Settings {
            path2: Call::new("WIDE2", 2),
            ..Settings::default()
        };
        assert_eq!(s.path().len(), 4);
        assert_eq!(s.path()[3], Call::new("WIDE2", 2));
    }

    #[test]
    fn path_skips_unset_digis() {
        let s = Settings {
            path1: Call::default(),
            path2: Call::new("WIDE2", 1),
            ..Settings::default()
        };
        let path = s.path();
        assert_eq!(path.len(), 3);
        assert_eq!(path[2], Call::new("WIDE2", 1));
    }

    #[test]
    fn call_truncates_to_six_chars() {
        assert_eq!(Call::new("TOOLONGCALL", 3).call.as_str(), "TOOLON");
    }

    #[test]
    fn symbol_defaults_per_character() {
        let mut s = Settings::default();
        assert_eq!(s.symbol(), ('/', '>'));
        s.symbol = String::try_from("\\").unwrap();
        assert_eq!(s.symbol(), ('\\', '>'));
        s.symbol = String::try_from("/k").unwrap();
        assert_eq!(s.symbol(), ('/', 'k'));
    }

    #[test]
    fn parse_partial_json_keeps_defaults() {
        let json = br#"{"my_call":{"call":"BG5HHP","ssid":9},"beacon_interval":600}"#;
        let s = Settings::from_json(json).unwrap();
        assert_eq!(s.my_call, Call::new("BG5HHP", 9));
        assert_eq!(s.beacon_interval, 600);
        assert_eq!(s.dest_call, Call::new("APTI01", 0));
        assert_eq!(s.kiss.persistence, 63);
    }

    #[test]
    fn parse_full_json() {
        let json = br#"{
            "dest_call":{"call":"APZ001","ssid":0},
            "my_call":{"call":"N0CALL","ssid":7},
            "path1":{"call":"WIDE1","ssid":1},
            "path2":{"call":"WIDE2","ssid":2},
            "symbol":"/[",
            "beacon_text":">On the air",
            "beacon_interval":300,
            "kiss":{"txdelay":30,"persistence":128,"slot_time":5,"duplex":"full"}
        }"#;
        let s = Settings::from_json(json).unwrap();
        assert_eq!(s.path().len(), 4);
        assert_eq!(s.symbol(), ('/', '['));
        assert_eq!(s.beacon_text.as_str(), ">On the air");
        assert_eq!(s.kiss.txdelay, 30);
        assert_eq!(s.kiss.persistence, 128);
        assert_eq!(s.kiss.slot_time, 5);
        assert_eq!(s.kiss.txtail, 5, "unset field keeps default");
        assert_eq!(s.kiss.duplex, DuplexMode::Full);
    }

    #[test]
    fn parse_rejects_oversized_call() {
        let json = br#"{"my_call":{"call":"WAYTOOLONG","ssid":1}}"#;
        assert!(Settings::from_json(json).is_none());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Settings::from_json(b"not json").is_none());
        assert!(Settings::from_json(b"").is_none());
    }
}
