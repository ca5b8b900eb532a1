//! Minimal client for a running endpoint, plus terminal rendering of the
//! JSON documents.

use anyhow::{anyhow, bail, Context, Result};
use std::time::Duration;
use sysmon_shared::metrics::MetricsReport;
use sysmon_shared::processes::{ProcessEntry, TopProcessesReport};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};
use tokio_util::sync::CancellationToken;

use crate::util::shutdown::SHUTDOWN;

/// Upper bound for connecting, sending and reading one response.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl FetchedResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Send `GET path` and read until the server closes the connection.
///
/// Gives up after [`FETCH_TIMEOUT`] or once Ctrl+C cancels [`SHUTDOWN`].
pub async fn fetch(host: &str, port: u16, path: &str) -> Result<FetchedResponse> {
    fetch_until(host, port, path, FETCH_TIMEOUT, &SHUTDOWN).await
}

pub async fn fetch_until(
    host: &str,
    port: u16,
    path: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<FetchedResponse> {
    tokio::select! {
        _ = cancel.cancelled() => bail!("request to {host}:{port} interrupted"),
        fetched = tokio::time::timeout(timeout, exchange(host, port, path)) => {
            fetched.map_err(|_| anyhow!("{host}:{port} did not answer within {timeout:?}"))?
        }
    }
}

async fn exchange(host: &str, port: u16, path: &str) -> Result<FetchedResponse> {
    let mut stream = TcpStream::connect((host, port))
        .await
        .with_context(|| format!("failed to connect to {host}:{port}; is the server running?"))?;

    let request = format!("GET {path} HTTP/1.1\r\nHost: {host}\r\nConnection: close\r\n\r\n");
    stream
        .write_all(request.as_bytes())
        .await
        .context("failed to send request")?;

    let mut raw = Vec::new();
    stream
        .read_to_end(&mut raw)
        .await
        .context("failed to read response")?;
    parse_response(&String::from_utf8_lossy(&raw))
}

pub fn parse_response(raw: &str) -> Result<FetchedResponse> {
    let (head, body) = raw
        .split_once("\r\n\r\n")
        .ok_or_else(|| anyhow!("response has no header terminator"))?;
    let mut lines = head.split("\r\n");
    let status_line = lines.next().unwrap_or_default();
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| anyhow!("malformed status line: {status_line:?}"))?;
    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();
    Ok(FetchedResponse {
        status,
        headers,
        body: body.to_string(),
    })
}

pub fn render_metrics(report: &MetricsReport) -> String {
    let cpu = &report.hardware.cpu;
    let mem = &report.hardware.memory;
    let disk = &report.hardware.disk;
    let mut lines = vec![
        format!("System information ({}, {})", report.hostname, report.platform),
        format!("  Taken at:  {}", report.timestamp),
        format!("  CPU:       {} ({} cores)", cpu.model, cpu.cores),
        format!("  CPU usage: {}", cpu.usage),
    ];
    if let Some([one, five, fifteen]) = cpu.load_average {
        lines.push(format!("  Load:      {one:.2} {five:.2} {fifteen:.2}"));
    }
    lines.extend([
        format!("  Memory:    {} used / {} total, {} free", mem.used, mem.total, mem.free),
        format!("  Disk:      {} used / {} total, {} free", disk.used, disk.total, disk.free),
        format!("  Processes: {}", report.system.processes),
        format!("  IP:        {}", report.system.network.ip),
        format!("  Network:   {}", report.system.network.status),
    ]);
    lines.join("\n") + "\n"
}

fn render_table(title: &str, entries: &[ProcessEntry]) -> String {
    if entries.is_empty() {
        return format!("{title}\n  (no data)\n");
    }
    let header = format!(
        "  {:>7}  {:<12} {:>7} {:>7} {:>10}  NAME",
        "PID", "USER", "CPU", "MEM", "DISK"
    );
    let rows = entries.iter().map(|entry| {
        format!(
            "  {:>7}  {:<12} {:>7} {:>7} {:>10}  {}",
            entry.pid, entry.user, entry.cpu_usage, entry.memory_usage, entry.disk_usage, entry.name
        )
    });
    let mut lines = vec![title.to_string(), header];
    lines.extend(rows);
    lines.join("\n") + "\n"
}

pub fn render_top_processes(report: &TopProcessesReport) -> String {
    [
        format!("Top processes on {} at {}\n", report.platform, report.timestamp),
        render_table("By CPU:", &report.top_cpu),
        render_table("By memory:", &report.top_memory),
        render_table("By disk I/O:", &report.top_disk),
    ]
    .concat()
}

/// Human rendering for known documents, pretty JSON otherwise.
pub fn render_body(path: &str, body: &str) -> String {
    match path {
        "/" | "/metrics" => {
            if let Ok(report) = serde_json::from_str::<MetricsReport>(body) {
                return render_metrics(&report);
            }
        }
        "/processes/top" => {
            if let Ok(report) = serde_json::from_str::<TopProcessesReport>(body) {
                return render_top_processes(&report);
            }
        }
        _ => {}
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| body.to_string()),
        Err(_) => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sysmon_shared::metrics::{
        CpuReport, HardwareReport, NetworkReport, SystemReport, UsageReport,
    };

    fn usage() -> UsageReport {
        UsageReport {
            total: "8.00 GB".into(),
            used: "2.00 GB".into(),
            free: "6.00 GB".into(),
        }
    }

    fn metrics() -> MetricsReport {
        MetricsReport {
            timestamp: "Mon Oct 19 14:50:00 2026".into(),
            platform: "Linux".into(),
            hostname: "box".into(),
            hardware: HardwareReport {
                cpu: CpuReport {
                    model: "Test CPU".into(),
                    usage: "12.5%".into(),
                    cores: 4,
                    load_average: Some([0.5, 0.25, 0.1]),
                },
                memory: usage(),
                disk: usage(),
            },
            system: SystemReport {
                processes: 99,
                network: NetworkReport {
                    ip: "10.0.0.2".into(),
                    status: "2 network interfaces active".into(),
                    interfaces: Some(2),
                },
            },
        }
    }

    #[test]
    fn test_parse_response() {
        let raw = "HTTP/1.1 404 Not Found\r\nContent-Type: application/json\r\nContent-Length: 2\r\n\r\n{}";
        let response = parse_response(raw).unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.body, "{}");
    }

    #[test]
    fn test_parse_response_rejects_garbage() {
        assert!(parse_response("nonsense").is_err());
        assert!(parse_response("HTTP/1.1 abc\r\n\r\n").is_err());
    }

    #[test]
    fn test_render_metrics() {
        let text = render_metrics(&metrics());
        assert!(text.contains("Test CPU (4 cores)"));
        assert!(text.contains("12.5%"));
        assert!(text.contains("  Load:      0.50 0.25 0.10\n"));
        assert!(text.contains("  Memory:    2.00 GB used / 8.00 GB total, 6.00 GB free\n"));
        assert!(text.contains("Processes: 99"));
        assert!(text.contains("2 network interfaces active"));
    }

    #[test]
    fn test_render_top_processes_empty_tables() {
        let report = TopProcessesReport {
            timestamp: "now".into(),
            platform: "Linux".into(),
            top_cpu: vec![ProcessEntry {
                pid: 42,
                name: "sysmon".into(),
                user: "root".into(),
                cpu_usage: "3.0%".into(),
                memory_usage: "0.1%".into(),
                disk_usage: "Unknown".into(),
            }],
            top_memory: Vec::new(),
            top_disk: Vec::new(),
        };
        let text = render_top_processes(&report);
        assert!(text.contains("sysmon"));
        assert!(text.contains("(no data)"));
    }

    #[tokio::test]
    async fn test_fetch_gives_up_on_silent_server() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let holder = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(stream);
        });

        let never = CancellationToken::new();
        let err = fetch_until("127.0.0.1", port, "/", Duration::from_millis(200), &never)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("did not answer"));
        holder.abort();
    }

    #[tokio::test]
    async fn test_fetch_stops_when_cancelled() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let holder = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(stream);
        });

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });
        let fetched = tokio::time::timeout(
            Duration::from_secs(5),
            fetch_until("127.0.0.1", port, "/", Duration::from_secs(60), &cancel),
        )
        .await
        .expect("fetch ignored cancellation");
        assert!(fetched.unwrap_err().to_string().contains("interrupted"));
        holder.abort();
    }

    #[test]
    fn test_render_top_processes_layout() {
        let report = TopProcessesReport {
            timestamp: "now".into(),
            platform: "Linux".into(),
            top_cpu: Vec::new(),
            top_memory: Vec::new(),
            top_disk: Vec::new(),
        };
        assert_eq!(
            render_top_processes(&report),
            "Top processes on Linux at now\n\
             By CPU:\n  (no data)\n\
             By memory:\n  (no data)\n\
             By disk I/O:\n  (no data)\n"
        );
    }

    #[test]
    fn test_render_body_falls_back_to_pretty_json() {
        let body = serde_json::to_string(&metrics()).unwrap();
        assert!(render_body("/", &body).starts_with("System information"));
        assert_eq!(render_body("/help", "{\"a\":1}"), "{\n  \"a\": 1\n}");
        assert_eq!(render_body("/help", "not json"), "not json");
    }
}
