//! Compile-time platform detection.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Unknown,
}

impl Platform {
    pub const fn current() -> Self {
        if cfg!(target_os = "linux") {
            Platform::Linux
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Unknown
        }
    }

    /// Value of the `platform` field in every response body.
    pub fn name(self) -> &'static str {
        match self {
            Platform::Linux => "Linux",
            Platform::MacOs => "macOS",
            Platform::Unknown => "Unknown",
        }
    }

    /// Has a native metrics source; others run on the portable backend only.
    pub fn is_supported(self) -> bool {
        matches!(self, Platform::Linux | Platform::MacOs)
    }

    /// `(metric, where it is read from)` for the native source.
    pub fn data_sources(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Platform::Linux => &[
                ("CPU model", "/proc/cpuinfo"),
                ("CPU usage", "/proc/stat"),
                ("Load average", "/proc/loadavg"),
                ("Memory", "/proc/meminfo"),
                ("Disk", "statvfs(/)"),
                ("Processes", "/proc/<pid>"),
                ("Network", "/proc/net/dev"),
                ("Top processes", "ps"),
            ],
            Platform::MacOs => &[
                ("CPU model", "sysctl machdep.cpu.brand_string"),
                ("CPU usage", "top -l 1"),
                ("Load average", "sysctl vm.loadavg"),
                ("Memory", "sysctl hw.memsize + vm_stat"),
                ("Disk", "statvfs(/)"),
                ("Processes", "ps -ax"),
                ("Network", "ifconfig -l"),
                ("Top processes", "ps"),
            ],
            Platform::Unknown => &[("All metrics", "sysinfo (portable backend)")],
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(Platform::Linux.name(), "Linux");
        assert_eq!(Platform::MacOs.to_string(), "macOS");
        assert_eq!(Platform::Unknown.name(), "Unknown");
    }

    #[test]
    fn test_support() {
        assert!(Platform::Linux.is_supported());
        assert!(Platform::MacOs.is_supported());
        assert!(!Platform::Unknown.is_supported());
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_current_on_linux() {
        assert_eq!(Platform::current(), Platform::Linux);
    }

    #[test]
    fn test_every_platform_lists_sources() {
        for platform in [Platform::Linux, Platform::MacOs, Platform::Unknown] {
            assert!(!platform.data_sources().is_empty());
        }
    }
}
