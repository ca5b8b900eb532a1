//! Point-in-time host statistics behind a per-platform chain of sources.
//!
//! Every metric is read from the first [`MetricSource`] in the chain that
//! can provide it. A source that fails is logged and skipped; a metric no
//! source can provide is left as `None` and rendered as a fallback value
//! on the wire.

pub mod darwin;
pub mod disk;
pub mod network;
pub mod portable;
pub mod processes;
pub mod procfs;

use std::net::IpAddr;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::debug;

use crate::platform::Platform;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("not supported by this source")]
    Unsupported,
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("`{program}` failed: {reason}")]
    Command { program: String, reason: String },
    #[error("could not parse {what}: {detail}")]
    Parse { what: &'static str, detail: String },
}

impl SourceError {
    pub(crate) fn parse(what: &'static str, detail: impl Into<String>) -> Self {
        SourceError::Parse {
            what,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

/// Total/used/free triple in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
}

impl Capacity {
    /// Used is derived as `total - free`, clamped at zero.
    pub fn from_total_free(total_bytes: u64, free_bytes: u64) -> Self {
        Self {
            total_bytes,
            used_bytes: total_bytes.saturating_sub(free_bytes),
            free_bytes,
        }
    }
}

pub type MemoryReading = Capacity;
pub type DiskReading = Capacity;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuReading {
    pub model: Option<String>,
    pub usage_percent: Option<f64>,
    pub cores: Option<usize>,
    pub load_average: Option<LoadAverage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessReading {
    pub pid: u32,
    pub user: String,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub rss_bytes: u64,
    /// Cumulative bytes read and written, when the source tracks I/O.
    pub disk_bytes: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct SystemSnapshot {
    pub taken_at: DateTime<Local>,
    pub platform: Platform,
    pub hostname: Option<String>,
    pub cpu: CpuReading,
    pub memory: Option<MemoryReading>,
    pub disk: Option<DiskReading>,
    pub process_count: Option<usize>,
    pub interface_count: Option<usize>,
    pub outbound_ip: Option<IpAddr>,
}

#[derive(Debug, Clone)]
pub struct TopProcesses {
    pub taken_at: DateTime<Local>,
    pub by_cpu: Vec<ProcessReading>,
    pub by_memory: Vec<ProcessReading>,
    pub by_disk: Vec<ProcessReading>,
}

/// One backend able to read some or all host metrics.
///
/// Every method defaults to [`SourceError::Unsupported`] so a backend only
/// implements what it can actually read.
pub trait MetricSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn hostname(&self) -> Result<String, SourceError> {
        Err(SourceError::Unsupported)
    }

    fn cpu_model(&self) -> Result<String, SourceError> {
        Err(SourceError::Unsupported)
    }

    /// Busy share of CPU time, 0..=100.
    fn cpu_usage(&self) -> Result<f64, SourceError> {
        Err(SourceError::Unsupported)
    }

    fn cpu_cores(&self) -> Result<usize, SourceError> {
        Err(SourceError::Unsupported)
    }

    fn load_average(&self) -> Result<LoadAverage, SourceError> {
        Err(SourceError::Unsupported)
    }

    fn memory(&self) -> Result<MemoryReading, SourceError> {
        Err(SourceError::Unsupported)
    }

    fn disk(&self) -> Result<DiskReading, SourceError> {
        Err(SourceError::Unsupported)
    }

    fn process_count(&self) -> Result<usize, SourceError> {
        Err(SourceError::Unsupported)
    }

    /// Network interfaces, loopback excluded.
    fn interface_count(&self) -> Result<usize, SourceError> {
        Err(SourceError::Unsupported)
    }

    fn primary_address(&self) -> Result<IpAddr, SourceError> {
        Err(SourceError::Unsupported)
    }

    fn processes(&self) -> Result<Vec<ProcessReading>, SourceError> {
        Err(SourceError::Unsupported)
    }

    /// Like [`MetricSource::processes`] but every entry carries `disk_bytes`.
    fn process_io(&self) -> Result<Vec<ProcessReading>, SourceError> {
        Err(SourceError::Unsupported)
    }
}

/// Finds the address outbound traffic leaves from.
pub type RouteProbe = fn() -> Result<IpAddr, SourceError>;

pub struct Collector {
    platform: Platform,
    sources: Vec<Box<dyn MetricSource>>,
    probe: RouteProbe,
}

impl Collector {
    /// Native source first, portable backend as the fallback.
    pub fn for_platform(platform: Platform) -> Self {
        let mut sources: Vec<Box<dyn MetricSource>> = Vec::new();
        match platform {
            Platform::Linux => sources.push(Box::new(procfs::ProcFs::new())),
            Platform::MacOs => sources.push(Box::new(darwin::Darwin)),
            Platform::Unknown => {}
        }
        sources.push(Box::new(portable::Portable));
        Self::with_sources(platform, sources)
    }

    pub fn with_sources(platform: Platform, sources: Vec<Box<dyn MetricSource>>) -> Self {
        Self {
            platform,
            sources,
            probe: network::outbound_ip,
        }
    }

    /// Replace the UDP route probe used by [`Collector::outbound_ip`].
    pub fn with_route_probe(mut self, probe: RouteProbe) -> Self {
        self.probe = probe;
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    fn first<T>(
        &self,
        metric: &'static str,
        read: impl Fn(&dyn MetricSource) -> Result<T, SourceError>,
    ) -> Option<T> {
        for source in &self.sources {
            match read(source.as_ref()) {
                Ok(value) => return Some(value),
                Err(SourceError::Unsupported) => {}
                Err(e) => debug!(source = source.name(), metric, error = %e, "metric source failed"),
            }
        }
        None
    }

    pub fn cpu(&self) -> CpuReading {
        CpuReading {
            model: self.first("cpu_model", |s| s.cpu_model()),
            usage_percent: self.first("cpu_usage", |s| s.cpu_usage()),
            cores: self.first("cpu_cores", |s| s.cpu_cores()),
            load_average: self.first("load_average", |s| s.load_average()),
        }
    }

    /// Routing-table address first, then whatever the sources report.
    pub fn outbound_ip(&self) -> Option<IpAddr> {
        match (self.probe)() {
            Ok(ip) => Some(ip),
            Err(e) => {
                debug!(metric = "outbound_ip", error = %e, "udp probe failed");
                self.first("primary_address", |s| s.primary_address())
            }
        }
    }

    pub fn snapshot(&self) -> SystemSnapshot {
        SystemSnapshot {
            taken_at: Local::now(),
            platform: self.platform,
            hostname: self.first("hostname", |s| s.hostname()),
            cpu: self.cpu(),
            memory: self.first("memory", |s| s.memory()),
            disk: self.first("disk", |s| s.disk()),
            process_count: self.first("process_count", |s| s.process_count()),
            interface_count: self.first("interface_count", |s| s.interface_count()),
            outbound_ip: self.outbound_ip(),
        }
    }

    /// Heaviest processes by CPU, resident memory and cumulative disk I/O.
    pub fn top_processes(&self, limit: usize) -> TopProcesses {
        let listing = self.first("processes", |s| s.processes()).unwrap_or_default();
        let by_cpu = processes::rank(&listing, limit, |p| p.cpu_percent);
        let by_memory = processes::rank(&listing, limit, |p| p.rss_bytes as f64);

        let io_listing = if listing.iter().any(|p| p.disk_bytes.is_some()) {
            listing
        } else {
            self.first("process_io", |s| s.process_io()).unwrap_or_default()
        };
        let active: Vec<ProcessReading> = io_listing
            .into_iter()
            .filter(|p| p.disk_bytes.unwrap_or(0) > 0)
            .collect();
        let by_disk = processes::rank(&active, limit, |p| p.disk_bytes.unwrap_or(0) as f64);

        TopProcesses {
            taken_at: Local::now(),
            by_cpu,
            by_memory,
            by_disk,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Source answering from fixed values; `None` means "fails".
    #[derive(Default)]
    pub(crate) struct FixedSource {
        pub name: &'static str,
        pub cpu_model: Option<String>,
        pub cpu_usage: Option<f64>,
        pub memory: Option<MemoryReading>,
        pub process_count: Option<usize>,
        pub primary_address: Option<IpAddr>,
        pub processes: Option<Vec<ProcessReading>>,
        pub process_io: Option<Vec<ProcessReading>>,
    }

    fn failed(what: &'static str) -> SourceError {
        SourceError::parse(what, "fixture has no value")
    }

    impl MetricSource for FixedSource {
        fn name(&self) -> &'static str {
            self.name
        }

        fn cpu_model(&self) -> Result<String, SourceError> {
            self.cpu_model.clone().ok_or_else(|| failed("cpu model"))
        }

        fn cpu_usage(&self) -> Result<f64, SourceError> {
            self.cpu_usage.ok_or_else(|| failed("cpu usage"))
        }

        fn memory(&self) -> Result<MemoryReading, SourceError> {
            self.memory.ok_or_else(|| failed("memory"))
        }

        fn process_count(&self) -> Result<usize, SourceError> {
            self.process_count.ok_or_else(|| failed("process count"))
        }

        fn primary_address(&self) -> Result<IpAddr, SourceError> {
            self.primary_address.ok_or_else(|| failed("primary address"))
        }

        fn processes(&self) -> Result<Vec<ProcessReading>, SourceError> {
            self.processes.clone().ok_or(SourceError::Unsupported)
        }

        fn process_io(&self) -> Result<Vec<ProcessReading>, SourceError> {
            self.process_io.clone().ok_or(SourceError::Unsupported)
        }
    }

    pub(crate) fn process(pid: u32, cpu: f64, rss: u64, disk: Option<u64>) -> ProcessReading {
        ProcessReading {
            pid,
            user: "root".into(),
            name: format!("proc{pid}"),
            cpu_percent: cpu,
            memory_percent: 0.0,
            rss_bytes: rss,
            disk_bytes: disk,
        }
    }

    #[test]
    fn test_capacity_used_is_saturating() {
        let c = Capacity::from_total_free(100, 30);
        assert_eq!(c.used_bytes, 70);
        let c = Capacity::from_total_free(10, 30);
        assert_eq!(c.used_bytes, 0);
    }

    #[test]
    fn test_first_source_wins() {
        let collector = Collector::with_sources(
            Platform::Linux,
            vec![
                Box::new(FixedSource {
                    name: "native",
                    cpu_model: Some("Native CPU".into()),
                    ..Default::default()
                }),
                Box::new(FixedSource {
                    name: "fallback",
                    cpu_model: Some("Fallback CPU".into()),
                    cpu_usage: Some(42.0),
                    ..Default::default()
                }),
            ],
        );
        let cpu = collector.cpu();
        assert_eq!(cpu.model.as_deref(), Some("Native CPU"));
        // native has no usage, so the fallback answers
        assert_eq!(cpu.usage_percent, Some(42.0));
        assert_eq!(cpu.cores, None);
    }

    #[test]
    fn test_all_sources_failing_leaves_metric_absent() {
        let collector = Collector::with_sources(
            Platform::Unknown,
            vec![Box::new(FixedSource {
                name: "empty",
                ..Default::default()
            })],
        );
        let snapshot = collector.snapshot();
        assert_eq!(snapshot.cpu.model, None);
        assert_eq!(snapshot.memory, None);
        assert_eq!(snapshot.process_count, None);
        assert_eq!(snapshot.platform, Platform::Unknown);
    }

    fn probe_fails() -> Result<IpAddr, SourceError> {
        Err(SourceError::Command {
            program: "udp route probe".into(),
            reason: "network is unreachable".into(),
        })
    }

    fn probe_answers() -> Result<IpAddr, SourceError> {
        Ok(IpAddr::from([192, 168, 1, 4]))
    }

    #[test]
    fn test_outbound_ip_prefers_route_probe() {
        let collector = Collector::with_sources(
            Platform::Linux,
            vec![Box::new(FixedSource {
                name: "native",
                primary_address: Some(IpAddr::from([10, 0, 0, 9])),
                ..Default::default()
            })],
        )
        .with_route_probe(probe_answers);
        assert_eq!(collector.outbound_ip(), Some(IpAddr::from([192, 168, 1, 4])));
    }

    #[test]
    fn test_outbound_ip_falls_back_to_source_address() {
        let collector = Collector::with_sources(
            Platform::Linux,
            vec![
                Box::new(FixedSource {
                    name: "native",
                    ..Default::default()
                }),
                Box::new(FixedSource {
                    name: "fallback",
                    primary_address: Some(IpAddr::from([10, 0, 0, 9])),
                    ..Default::default()
                }),
            ],
        )
        .with_route_probe(probe_fails);
        assert_eq!(collector.outbound_ip(), Some(IpAddr::from([10, 0, 0, 9])));
    }

    #[test]
    fn test_outbound_ip_absent_when_everything_fails() {
        let collector = Collector::with_sources(
            Platform::Linux,
            vec![Box::new(FixedSource {
                name: "native",
                ..Default::default()
            })],
        )
        .with_route_probe(probe_fails);
        assert_eq!(collector.outbound_ip(), None);
        assert_eq!(collector.snapshot().outbound_ip, None);
    }

    #[test]
    fn test_top_processes_uses_io_fallback_for_disk() {
        let collector = Collector::with_sources(
            Platform::Linux,
            vec![
                Box::new(FixedSource {
                    name: "ps",
                    processes: Some(vec![
                        process(1, 0.5, 100, None),
                        process(2, 9.0, 50, None),
                        process(3, 3.0, 900, None),
                    ]),
                    ..Default::default()
                }),
                Box::new(FixedSource {
                    name: "io",
                    process_io: Some(vec![
                        process(1, 0.0, 0, Some(10)),
                        process(2, 0.0, 0, Some(0)),
                        process(3, 0.0, 0, Some(500)),
                    ]),
                    ..Default::default()
                }),
            ],
        );
        let top = collector.top_processes(2);
        let pids = |v: &[ProcessReading]| v.iter().map(|p| p.pid).collect::<Vec<_>>();
        assert_eq!(pids(&top.by_cpu), vec![2, 3]);
        assert_eq!(pids(&top.by_memory), vec![3, 1]);
        // pid 2 had no disk activity
        assert_eq!(pids(&top.by_disk), vec![3, 1]);
    }

    #[test]
    fn test_top_processes_empty_when_unsupported() {
        let collector = Collector::with_sources(Platform::Unknown, Vec::new());
        let top = collector.top_processes(10);
        assert!(top.by_cpu.is_empty());
        assert!(top.by_memory.is_empty());
        assert!(top.by_disk.is_empty());
    }

    #[test]
    fn test_for_platform_chains_portable_last() {
        let collector = Collector::for_platform(Platform::Linux);
        assert_eq!(collector.source_names(), vec!["procfs", "sysinfo"]);
        let collector = Collector::for_platform(Platform::MacOs);
        assert_eq!(collector.source_names(), vec!["darwin", "sysinfo"]);
        let collector = Collector::for_platform(Platform::Unknown);
        assert_eq!(collector.source_names(), vec!["sysinfo"]);
    }
}
