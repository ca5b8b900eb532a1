//! Linux backend reading the proc filesystem.
//!
//! Parsing is kept in free functions over file contents so it can be
//! exercised without a live `/proc`.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use super::{
    disk, processes, Capacity, DiskReading, LoadAverage, MemoryReading, MetricSource,
    ProcessReading, SourceError,
};
use crate::util::subprocess::SubprocessBuilder;

pub struct ProcFs {
    root: PathBuf,
}

impl ProcFs {
    pub fn new() -> Self {
        Self::with_root("/")
    }

    /// Resolve `proc/...` paths below `root` instead of `/`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read(&self, relative: &str) -> Result<String, SourceError> {
        let path = self.root.join(relative);
        std::fs::read_to_string(&path).map_err(|source| SourceError::Io { path, source })
    }
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSource for ProcFs {
    fn name(&self) -> &'static str {
        "procfs"
    }

    fn hostname(&self) -> Result<String, SourceError> {
        let raw = self.read("proc/sys/kernel/hostname")?;
        let name = raw.trim();
        if name.is_empty() {
            return Err(SourceError::parse("hostname", "empty"));
        }
        Ok(name.to_string())
    }

    fn cpu_model(&self) -> Result<String, SourceError> {
        parse_cpu_model(&self.read("proc/cpuinfo")?)
            .ok_or_else(|| SourceError::parse("cpuinfo", "no `model name` line"))
    }

    fn cpu_usage(&self) -> Result<f64, SourceError> {
        parse_cpu_usage(&self.read("proc/stat")?)
    }

    fn cpu_cores(&self) -> Result<usize, SourceError> {
        match count_processors(&self.read("proc/cpuinfo")?) {
            0 => Err(SourceError::parse("cpuinfo", "no `processor` lines")),
            n => Ok(n),
        }
    }

    fn load_average(&self) -> Result<LoadAverage, SourceError> {
        parse_loadavg(&self.read("proc/loadavg")?)
    }

    fn memory(&self) -> Result<MemoryReading, SourceError> {
        parse_meminfo(&self.read("proc/meminfo")?)
    }

    fn disk(&self) -> Result<DiskReading, SourceError> {
        disk::usage(Path::new("/"))
    }

    fn process_count(&self) -> Result<usize, SourceError> {
        let path = self.root.join("proc");
        let entries = std::fs::read_dir(&path).map_err(|source| SourceError::Io {
            path: path.clone(),
            source,
        })?;
        let count = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_str().is_some_and(is_pid))
            .count();
        Ok(count)
    }

    fn interface_count(&self) -> Result<usize, SourceError> {
        Ok(count_interfaces(&self.read("proc/net/dev")?))
    }

    fn primary_address(&self) -> Result<IpAddr, SourceError> {
        let out = SubprocessBuilder::new("hostname").args(["-I"]).output()?;
        out.split_whitespace()
            .find_map(|token| token.parse::<IpAddr>().ok())
            .ok_or_else(|| SourceError::parse("hostname -I", "no address"))
    }

    fn processes(&self) -> Result<Vec<ProcessReading>, SourceError> {
        processes::ps_listing()
    }
}

/// Value of the first `model name` line.
pub fn parse_cpu_model(cpuinfo: &str) -> Option<String> {
    cpuinfo
        .lines()
        .filter(|line| line.starts_with("model name"))
        .find_map(|line| line.split_once(':'))
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn count_processors(cpuinfo: &str) -> usize {
    cpuinfo
        .lines()
        .filter(|line| {
            line.split_once(':')
                .is_some_and(|(key, _)| key.trim() == "processor")
        })
        .count()
}

/// Busy share since boot from the aggregate `cpu` line of `/proc/stat`.
///
/// Up to eight counters are summed (user nice system idle iowait irq
/// softirq steal); guest time is already part of user time.
pub fn parse_cpu_usage(stat: &str) -> Result<f64, SourceError> {
    let line = stat
        .lines()
        .find(|line| line.split_whitespace().next() == Some("cpu"))
        .ok_or_else(|| SourceError::parse("stat", "no aggregate cpu line"))?;

    let counters = line
        .split_whitespace()
        .skip(1)
        .take(8)
        .map(|field| field.parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| SourceError::parse("stat", e.to_string()))?;
    if counters.len() < 4 {
        return Err(SourceError::parse("stat", "fewer than four counters"));
    }

    let total: u64 = counters.iter().sum();
    if total == 0 {
        return Err(SourceError::parse("stat", "all counters are zero"));
    }
    let work = total - counters[3];
    Ok(work as f64 * 100.0 / total as f64)
}

pub fn parse_loadavg(loadavg: &str) -> Result<LoadAverage, SourceError> {
    let values = loadavg
        .split_whitespace()
        .take(3)
        .map(|field| field.parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| SourceError::parse("loadavg", e.to_string()))?;
    match values[..] {
        [one, five, fifteen] => Ok(LoadAverage { one, five, fifteen }),
        _ => Err(SourceError::parse("loadavg", "expected three values")),
    }
}

/// `used = MemTotal - MemFree - Buffers - Cached`, `free = MemAvailable`.
pub fn parse_meminfo(meminfo: &str) -> Result<MemoryReading, SourceError> {
    let mut total = None;
    let mut free = 0u64;
    let mut available = None;
    let mut buffers = 0u64;
    let mut cached = 0u64;

    for line in meminfo.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let Some(kib) = rest
            .split_whitespace()
            .next()
            .and_then(|v| v.parse::<u64>().ok())
        else {
            continue;
        };
        let bytes = kib.saturating_mul(1024);
        match key.trim() {
            "MemTotal" => total = Some(bytes),
            "MemFree" => free = bytes,
            "MemAvailable" => available = Some(bytes),
            "Buffers" => buffers = bytes,
            "Cached" => cached = bytes,
            _ => {}
        }
    }

    let total = total.ok_or_else(|| SourceError::parse("meminfo", "no MemTotal"))?;
    // kernels before 3.14 lack MemAvailable
    let available = available.unwrap_or(free);
    Ok(Capacity {
        total_bytes: total,
        used_bytes: total
            .saturating_sub(free)
            .saturating_sub(buffers)
            .saturating_sub(cached),
        free_bytes: available,
    })
}

/// Interfaces listed in `/proc/net/dev`, loopback excluded.
pub fn count_interfaces(net_dev: &str) -> usize {
    net_dev
        .lines()
        .skip(2)
        .filter_map(|line| line.split_once(':'))
        .map(|(name, _)| name.trim())
        .filter(|name| !name.is_empty() && *name != "lo")
        .count()
}

pub fn is_pid(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}
