//! Human-readable rendering of readings as they appear on the wire.

/// Rendered in place of any reading that could not be collected.
pub const UNKNOWN: &str = "Unknown";
pub const UNKNOWN_CPU: &str = "Unknown CPU";
pub const NETWORK_UNAVAILABLE: &str = "Network info unavailable";

const KIB: f64 = 1024.0;
const MIB: f64 = KIB * 1024.0;
const GIB: f64 = MIB * 1024.0;

/// `8123456789` -> `"7.57 GB"`
pub fn gigabytes(bytes: u64) -> String {
    format!("{:.2} GB", bytes as f64 / GIB)
}

/// `12.345` -> `"12.3%"`
pub fn percent(value: f64) -> String {
    format!("{value:.1}%")
}

/// Picks the largest unit that keeps the value above one.
pub fn bytes(bytes: u64) -> String {
    let b = bytes as f64;
    if b >= GIB {
        format!("{:.2} GB", b / GIB)
    } else if b >= MIB {
        format!("{:.2} MB", b / MIB)
    } else if b >= KIB {
        format!("{:.2} KB", b / KIB)
    } else {
        format!("{bytes} B")
    }
}

pub fn interface_status(count: usize) -> String {
    format!("{count} network interfaces active")
}

/// Formats a present value or falls back to [`UNKNOWN`].
pub fn or_unknown<T>(value: Option<T>, render: impl FnOnce(T) -> String) -> String {
    value.map(render).unwrap_or_else(|| UNKNOWN.to_string())
}
