use serde::{Deserialize, Serialize};

/// Body of `GET /`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MetricsReport {
    pub timestamp: String,
    pub platform: String,
    pub hostname: String,
    pub hardware: HardwareReport,
    pub system: SystemReport,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HardwareReport {
    pub cpu: CpuReport,
    pub memory: UsageReport,
    pub disk: UsageReport,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CpuReport {
    pub model: String,
    pub usage: String,
    pub cores: usize,
    #[serde(default)]
    pub load_average: Option<[f64; 3]>,
}

/// Capacity triple shared by memory and disk.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UsageReport {
    pub total: String,
    pub used: String,
    pub free: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SystemReport {
    /// `-1` when the process table could not be read.
    pub processes: i64,
    pub network: NetworkReport,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NetworkReport {
    pub ip: String,
    pub status: String,
    #[serde(default)]
    pub interfaces: Option<usize>,
}
