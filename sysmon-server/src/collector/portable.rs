//! Cross-platform fallback built on `sysinfo`.

use std::path::Path;

use sysinfo::{Disks, Networks, ProcessesToUpdate, System, Users};

use super::{
    Capacity, DiskReading, LoadAverage, MemoryReading, MetricSource, ProcessReading, SourceError,
};

pub struct Portable;

impl Portable {
    /// Two refreshes a sampling interval apart so per-process CPU is meaningful.
    fn sampled_processes(&self) -> Result<Vec<ProcessReading>, SourceError> {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_processes(ProcessesToUpdate::All, true);
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        sys.refresh_processes(ProcessesToUpdate::All, true);

        if sys.processes().is_empty() {
            return Err(SourceError::parse("process table", "empty"));
        }

        let users = Users::new_with_refreshed_list();
        let total_memory = sys.total_memory();
        let readings = sys
            .processes()
            .iter()
            .map(|(pid, process)| {
                let user = process
                    .user_id()
                    .and_then(|uid| users.get_user_by_id(uid))
                    .map(|user| user.name().to_string())
                    .unwrap_or_else(|| "-".to_string());
                let io = process.disk_usage();
                ProcessReading {
                    pid: pid.as_u32(),
                    user,
                    name: process.name().to_string_lossy().into_owned(),
                    cpu_percent: f64::from(process.cpu_usage()),
                    memory_percent: if total_memory == 0 {
                        0.0
                    } else {
                        process.memory() as f64 * 100.0 / total_memory as f64
                    },
                    rss_bytes: process.memory(),
                    disk_bytes: Some(
                        io.total_read_bytes
                            .saturating_add(io.total_written_bytes),
                    ),
                }
            })
            .collect();
        Ok(readings)
    }
}

impl MetricSource for Portable {
    fn name(&self) -> &'static str {
        "sysinfo"
    }

    fn hostname(&self) -> Result<String, SourceError> {
        System::host_name().ok_or(SourceError::Unsupported)
    }

    fn cpu_model(&self) -> Result<String, SourceError> {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        sys.cpus()
            .iter()
            .map(|cpu| cpu.brand().trim())
            .find(|brand| !brand.is_empty())
            .map(str::to_string)
            .ok_or_else(|| SourceError::parse("cpu brand", "empty"))
    }

    fn cpu_usage(&self) -> Result<f64, SourceError> {
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        sys.refresh_cpu_usage();
        if sys.cpus().is_empty() {
            return Err(SourceError::Unsupported);
        }
        Ok(f64::from(sys.global_cpu_usage()))
    }

    fn cpu_cores(&self) -> Result<usize, SourceError> {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        match sys.cpus().len() {
            0 => Err(SourceError::Unsupported),
            n => Ok(n),
        }
    }

    fn load_average(&self) -> Result<LoadAverage, SourceError> {
        if cfg!(windows) {
            return Err(SourceError::Unsupported);
        }
        let load = System::load_average();
        Ok(LoadAverage {
            one: load.one,
            five: load.five,
            fifteen: load.fifteen,
        })
    }

    fn memory(&self) -> Result<MemoryReading, SourceError> {
        let mut sys = System::new();
        sys.refresh_memory();
        let total = sys.total_memory();
        if total == 0 {
            return Err(SourceError::Unsupported);
        }
        Ok(Capacity {
            total_bytes: total,
            used_bytes: sys.used_memory(),
            free_bytes: sys.available_memory(),
        })
    }

    /// Root mount when listed, otherwise the first disk.
    fn disk(&self) -> Result<DiskReading, SourceError> {
        let disks = Disks::new_with_refreshed_list();
        let disk = disks
            .list()
            .iter()
            .find(|disk| disk.mount_point() == Path::new("/"))
            .or_else(|| disks.list().first())
            .ok_or(SourceError::Unsupported)?;
        Ok(Capacity::from_total_free(
            disk.total_space(),
            disk.available_space(),
        ))
    }

    fn process_count(&self) -> Result<usize, SourceError> {
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::All, true);
        match sys.processes().len() {
            0 => Err(SourceError::Unsupported),
            n => Ok(n),
        }
    }

    fn interface_count(&self) -> Result<usize, SourceError> {
        let networks = Networks::new_with_refreshed_list();
        Ok(networks
            .list()
            .iter()
            .filter(|(name, _)| !name.starts_with("lo"))
            .count())
    }

    fn processes(&self) -> Result<Vec<ProcessReading>, SourceError> {
        self.sampled_processes()
    }

    fn process_io(&self) -> Result<Vec<ProcessReading>, SourceError> {
        self.sampled_processes()
    }
}
