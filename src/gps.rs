/// GPS fix snapshot as handed over by the NMEA parser, plus the small bits
/// of geometry the beacon scheduler needs.
use heapless::String;
use libm::{atan2f, cosf, sinf, sqrtf};

/// Raw NMEA token strings copied out of the last RMC/GGA sentence
pub type TermString = String<12>;

/// A position fix reduced to what the beacon logic looks at.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Location {
    /// Decimal degrees, north positive
    pub latitude: f32,
    /// Decimal degrees, east positive
    pub longitude: f32,
    pub speed_kmh: f32,
    /// Course over ground, 0–359
    pub heading: u16,
    /// Seconds since UTC midnight (wraps daily)
    pub timestamp: u32,
}

/// Everything the GPS collaborator knows about the current fix.
///
/// The report fields are kept as the receiver sent them so the beacon
/// payload reproduces the sentence precision exactly.
#[derive(Debug, Clone, Default)]
pub struct GpsFix {
    pub valid: bool,
    pub location: Location,
    /// `ddmm.mm` latitude token
    pub latitude: TermString,
    /// 'N' or 'S'
    pub lat_hemisphere: char,
    /// `dddmm.mm` longitude token
    pub longitude: TermString,
    /// 'E' or 'W'
    pub lon_hemisphere: char,
    /// Course token, degrees
    pub course: TermString,
    /// Speed token, knots
    pub speed: TermString,
    /// Altitude in feet, 0 when unknown
    pub altitude: i32,
}

/// Great-circle distance between two fixes in meters (haversine).
pub fn distance_between(a: &Location, b: &Location) -> f32 {
    const EARTH_RADIUS_M: f32 = 6_371_000.0;
    const DEG_TO_RAD: f32 = core::f32::consts::PI / 180.0;

    let lat1 = a.latitude * DEG_TO_RAD;
    let lat2 = b.latitude * DEG_TO_RAD;
    let dlat = (b.latitude - a.latitude) * DEG_TO_RAD;
    let dlon = (b.longitude - a.longitude) * DEG_TO_RAD;

    let sin_dlat = sinf(dlat / 2.0);
    let sin_dlon = sinf(dlon / 2.0);
    let h = sin_dlat * sin_dlat + cosf(lat1) * cosf(lat2) * sin_dlon * sin_dlon;
    EARTH_RADIUS_M * 2.0 * atan2f(sqrtf(h), sqrtf(1.0 - h))
}

/// Absolute heading change between two courses, folded into 0–180°.
pub fn heading_delta(a: u16, b: u16) -> u16 {
    let d = (i32::from(a) - i32::from(b)).unsigned_abs() % 360;
    let d = d as u16;
    if d <= 180 {
        d
    } else {
        360 - d
    }
}

/// Integer part of an NMEA decimal token ("057.3" → 57). Stops at the
/// first non-digit; an empty or garbage token yields 0.
pub fn nmea_decimal_int(token: &str) -> u16 {
    let mut value: u16 = 0;
    for b in token.bytes() {
        if !b.is_ascii_digit() {
            break;
        }
        value = value.saturating_mul(10).saturating_add(u16::from(b - b'0'));
    }
    value
}
