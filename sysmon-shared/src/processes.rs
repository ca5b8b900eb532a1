use serde::{Deserialize, Serialize};

/// Body of `GET /processes/top`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TopProcessesReport {
    pub timestamp: String,
    pub platform: String,
    pub top_cpu: Vec<ProcessEntry>,
    pub top_memory: Vec<ProcessEntry>,
    pub top_disk: Vec<ProcessEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
    pub user: String,
    pub cpu_usage: String,
    pub memory_usage: String,
    pub disk_usage: String,
}
