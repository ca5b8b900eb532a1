//! Conversion of collected readings into the JSON wire documents.

use chrono::{DateTime, TimeZone};
use sysmon_shared::format::{self, NETWORK_UNAVAILABLE, UNKNOWN_CPU};
use sysmon_shared::metrics::{
    CpuReport, HardwareReport, MetricsReport, NetworkReport, SystemReport, UsageReport,
};
use sysmon_shared::processes::{ProcessEntry, TopProcessesReport};

use crate::collector::{Capacity, ProcessReading, SystemSnapshot, TopProcesses};
use crate::platform::Platform;

/// `Mon Oct 19 14:50:00 2026`
pub fn ctime<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%a %b %e %H:%M:%S %Y").to_string()
}

fn usage(capacity: Option<Capacity>) -> UsageReport {
    UsageReport {
        total: format::or_unknown(capacity.map(|c| c.total_bytes), format::gigabytes),
        used: format::or_unknown(capacity.map(|c| c.used_bytes), format::gigabytes),
        free: format::or_unknown(capacity.map(|c| c.free_bytes), format::gigabytes),
    }
}

pub fn metrics_report(snapshot: &SystemSnapshot) -> MetricsReport {
    let cpu = &snapshot.cpu;
    MetricsReport {
        timestamp: ctime(&snapshot.taken_at),
        platform: snapshot.platform.name().to_string(),
        hostname: format::or_unknown(snapshot.hostname.clone(), |h| h),
        hardware: HardwareReport {
            cpu: CpuReport {
                model: cpu.model.clone().unwrap_or_else(|| UNKNOWN_CPU.to_string()),
                usage: format::or_unknown(cpu.usage_percent, format::percent),
                cores: cpu.cores.unwrap_or(0),
                load_average: cpu.load_average.map(|l| [l.one, l.five, l.fifteen]),
            },
            memory: usage(snapshot.memory),
            disk: usage(snapshot.disk),
        },
        system: SystemReport {
            processes: snapshot
                .process_count
                .and_then(|n| i64::try_from(n).ok())
                .unwrap_or(-1),
            network: NetworkReport {
                ip: format::or_unknown(snapshot.outbound_ip, |ip| ip.to_string()),
                status: snapshot
                    .interface_count
                    .map(format::interface_status)
                    .unwrap_or_else(|| NETWORK_UNAVAILABLE.to_string()),
                interfaces: snapshot.interface_count,
            },
        },
    }
}

fn process_entry(reading: &ProcessReading) -> ProcessEntry {
    ProcessEntry {
        pid: reading.pid,
        name: reading.name.clone(),
        user: reading.user.clone(),
        cpu_usage: format::percent(reading.cpu_percent),
        memory_usage: format::percent(reading.memory_percent),
        disk_usage: format::or_unknown(reading.disk_bytes, format::bytes),
    }
}

pub fn top_processes_report(top: &TopProcesses, platform: Platform) -> TopProcessesReport {
    TopProcessesReport {
        timestamp: ctime(&top.taken_at),
        platform: platform.name().to_string(),
        top_cpu: top.by_cpu.iter().map(process_entry).collect(),
        top_memory: top.by_memory.iter().map(process_entry).collect(),
        top_disk: top.by_disk.iter().map(process_entry).collect(),
    }
}
