//! macOS backend built on `sysctl`, `vm_stat`, `top`, `ps` and `ifconfig`.
//!
//! Output parsing lives in free functions and compiles everywhere so the
//! parsers stay tested on Linux builders too.

use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use super::{
    disk, processes, Capacity, DiskReading, LoadAverage, MemoryReading, MetricSource,
    ProcessReading, SourceError,
};
use crate::util::subprocess::SubprocessBuilder;

const DEFAULT_PAGE_SIZE: u64 = 4096;

pub struct Darwin;

fn sysctl(key: &str) -> Result<String, SourceError> {
    let out = SubprocessBuilder::new("sysctl").args(["-n", key]).output()?;
    Ok(out.trim().to_string())
}

fn sysctl_number<T: std::str::FromStr>(key: &'static str) -> Result<T, SourceError> {
    sysctl(key)?
        .parse::<T>()
        .map_err(|_| SourceError::parse(key, "not a number"))
}

impl MetricSource for Darwin {
    fn name(&self) -> &'static str {
        "darwin"
    }

    fn hostname(&self) -> Result<String, SourceError> {
        let name = sysctl("kern.hostname")?;
        if name.is_empty() {
            return Err(SourceError::parse("kern.hostname", "empty"));
        }
        Ok(name)
    }

    fn cpu_model(&self) -> Result<String, SourceError> {
        let brand = sysctl("machdep.cpu.brand_string")?;
        if brand.is_empty() {
            return Err(SourceError::parse("machdep.cpu.brand_string", "empty"));
        }
        Ok(brand)
    }

    fn cpu_usage(&self) -> Result<f64, SourceError> {
        let out = SubprocessBuilder::new("top")
            .args(["-l", "1", "-n", "0"])
            .output()?;
        parse_top_cpu_usage(&out)
    }

    fn cpu_cores(&self) -> Result<usize, SourceError> {
        sysctl_number("hw.ncpu")
    }

    fn load_average(&self) -> Result<LoadAverage, SourceError> {
        parse_vm_loadavg(&sysctl("vm.loadavg")?)
    }

    fn memory(&self) -> Result<MemoryReading, SourceError> {
        let total: u64 = sysctl_number("hw.memsize")?;
        let vm = SubprocessBuilder::new("vm_stat").output()?;
        let stats = parse_vm_stat(&vm)?;
        Ok(Capacity::from_total_free(total, stats.reclaimable_bytes()))
    }

    fn disk(&self) -> Result<DiskReading, SourceError> {
        disk::usage(Path::new("/"))
    }

    fn process_count(&self) -> Result<usize, SourceError> {
        let out = SubprocessBuilder::new("ps").args(["-ax"]).output()?;
        Ok(count_ps_rows(&out))
    }

    fn interface_count(&self) -> Result<usize, SourceError> {
        let out = SubprocessBuilder::new("ifconfig").args(["-l"]).output()?;
        Ok(count_ifconfig_list(&out))
    }

    fn primary_address(&self) -> Result<IpAddr, SourceError> {
        let out = SubprocessBuilder::new("ifconfig").output()?;
        first_inet_address(&out).ok_or_else(|| SourceError::parse("ifconfig", "no inet address"))
    }

    fn processes(&self) -> Result<Vec<ProcessReading>, SourceError> {
        processes::ps_listing()
    }
}

/// `CPU usage: 5.26% user, 10.52% sys, 84.21% idle` -> `15.79`
pub fn parse_top_cpu_usage(top: &str) -> Result<f64, SourceError> {
    let line = top
        .lines()
        .find(|line| line.trim_start().starts_with("CPU usage:"))
        .ok_or_else(|| SourceError::parse("top", "no `CPU usage` line"))?;

    let idle = line
        .split(',')
        .find(|part| part.contains("idle"))
        .and_then(|part| part.split('%').next())
        .and_then(|value| value.rsplit(' ').next())
        .and_then(|value| value.trim().parse::<f64>().ok())
        .ok_or_else(|| SourceError::parse("top", "no idle share"))?;

    Ok((100.0 - idle).clamp(0.0, 100.0))
}

/// `{ 1.23 1.45 1.67 }`
pub fn parse_vm_loadavg(raw: &str) -> Result<LoadAverage, SourceError> {
    let values = raw
        .trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .split_whitespace()
        .map(|field| field.replace(',', "."))
        .map(|field| field.parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| SourceError::parse("vm.loadavg", e.to_string()))?;
    match values[..] {
        [one, five, fifteen, ..] => Ok(LoadAverage { one, five, fifteen }),
        _ => Err(SourceError::parse("vm.loadavg", "expected three values")),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmStat {
    pub page_size: u64,
    pub free_pages: u64,
    pub inactive_pages: u64,
}

impl VmStat {
    /// Free plus inactive pages, which the kernel hands out on demand.
    pub fn reclaimable_bytes(&self) -> u64 {
        self.free_pages
            .saturating_add(self.inactive_pages)
            .saturating_mul(self.page_size)
    }
}

pub fn parse_vm_stat(vm_stat: &str) -> Result<VmStat, SourceError> {
    let mut page_size = DEFAULT_PAGE_SIZE;
    let mut free = None;
    let mut inactive = None;

    for line in vm_stat.lines() {
        if let Some(rest) = line.split("page size of").nth(1) {
            if let Some(size) = rest
                .split_whitespace()
                .next()
                .and_then(|s| s.parse::<u64>().ok())
            {
                page_size = size;
            }
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let pages = value.trim().trim_end_matches('.').parse::<u64>().ok();
        match key.trim().trim_matches('"') {
            "Pages free" => free = pages,
            "Pages inactive" => inactive = pages,
            _ => {}
        }
    }

    Ok(VmStat {
        page_size,
        free_pages: free.ok_or_else(|| SourceError::parse("vm_stat", "no `Pages free`"))?,
        inactive_pages: inactive.unwrap_or(0),
    })
}

/// Rows of `ps -ax` minus the header.
pub fn count_ps_rows(ps: &str) -> usize {
    ps.lines()
        .filter(|line| !line.trim().is_empty())
        .count()
        .saturating_sub(1)
}

/// `ifconfig -l` prints every interface name on one line.
pub fn count_ifconfig_list(list: &str) -> usize {
    list.split_whitespace()
        .filter(|name| !name.starts_with("lo"))
        .count()
}

pub fn first_inet_address(ifconfig: &str) -> Option<IpAddr> {
    ifconfig
        .lines()
        .map(str::trim_start)
        .filter_map(|line| line.strip_prefix("inet "))
        .filter_map(|rest| rest.split_whitespace().next())
        .filter_map(|addr| addr.parse::<Ipv4Addr>().ok())
        .find(|addr| !addr.is_loopback())
        .map(IpAddr::V4)
}
