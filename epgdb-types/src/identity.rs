//! Identity helpers reproducing the native EPG cache conventions.

/// Period of the synthetic event id clock: 65536 minutes, in seconds.
const EVENT_ID_PERIOD_SECS: i64 = 3_932_160;

/// Lower bound of the DVB-T namespace range that collapses to a single value.
const DVBT_NAMESPACE: i64 = 4_008_574_976;
/// Upper bound (exclusive) of the DVB-T namespace range.
const DVBT_NAMESPACE_END: i64 = 4_008_636_143;

const I32_MAX: i64 = 2_147_483_647;
const U32_RANGE: i64 = 4_294_967_296;

/// Reinterpret an unsigned 32-bit string hash as the signed value stored in
/// the `hash` columns.
pub fn normalize_hash(hash: u32) -> i32 {
    hash as i32
}

/// Normalize a raw DVB namespace for `T_Service.dvbnamespace`.
///
/// Namespaces strictly inside the DVB-T range collapse to `0xEEEE0000`,
/// then anything above `i32::MAX` is wrapped to its signed representation.
pub fn normalize_namespace(namespace: u32) -> i64 {
    let mut ns = i64::from(namespace);
    if ns > DVBT_NAMESPACE && ns < DVBT_NAMESPACE_END {
        ns = DVBT_NAMESPACE;
    }
    if ns > I32_MAX {
        ns -= U32_RANGE;
    }
    ns
}

/// Event id for sources without a broadcast event id (now/next tables,
/// listings): minutes since the start of the current 65536-minute period.
///
/// Always in `0..=65535`, including for negative begin times.
pub fn synthetic_event_id(begin_time: i64) -> i64 {
    begin_time.rem_euclid(EVENT_ID_PERIOD_SECS) / 60
}

/// Events are stored with a duration of at least one second.
pub fn clamp_duration(duration: i64) -> i64 {
    duration.max(1)
}

/// Split a description into the short and extended description texts.
///
/// An empty description falls back to the title. The text before the first
/// blank line (`"\n\n"`) becomes the short description and the text after it
/// the extended one; without a blank line both are the whole text.
pub fn split_description<'a>(title: &'a str, description: &'a str) -> (&'a str, &'a str) {
    let text = if description.is_empty() { title } else { description };
    text.split_once("\n\n").unwrap_or((text, text))
}
