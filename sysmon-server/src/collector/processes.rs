//! Process table listing through `ps` and ranking helpers.

use std::cmp::Ordering;
use std::path::Path;

use super::{ProcessReading, SourceError};
use crate::util::subprocess::SubprocessBuilder;

/// BSD-style options understood by both procps and macOS `ps`; the
/// trailing `=` suppresses headers. `rss` is in KiB.
const PS_ARGS: [&str; 2] = ["axo", "pid=,user=,pcpu=,pmem=,rss=,comm="];

pub fn ps_listing() -> Result<Vec<ProcessReading>, SourceError> {
    let out = SubprocessBuilder::new("ps")
        .args(PS_ARGS)
        .env("LC_ALL", "C")
        .output()?;
    parse_ps(&out)
}

/// Parses `pid user pcpu pmem rss comm` rows, skipping malformed ones.
pub fn parse_ps(out: &str) -> Result<Vec<ProcessReading>, SourceError> {
    let readings: Vec<ProcessReading> = out.lines().filter_map(parse_ps_row).collect();
    if readings.is_empty() {
        return Err(SourceError::parse("ps", "no process rows"));
    }
    Ok(readings)
}

fn parse_ps_row(line: &str) -> Option<ProcessReading> {
    let mut fields = line.split_whitespace();
    let pid = fields.next()?.parse::<u32>().ok()?;
    let user = fields.next()?.to_string();
    let cpu_percent = fields.next()?.parse::<f64>().ok()?;
    let memory_percent = fields.next()?.parse::<f64>().ok()?;
    let rss_kib = fields.next()?.parse::<u64>().ok()?;
    // macOS prints the full executable path, which may contain spaces
    let command = fields.collect::<Vec<_>>().join(" ");
    if command.is_empty() {
        return None;
    }
    // procps prints the short name, which may itself contain `/` (kernel threads)
    let name = if command.starts_with('/') {
        Path::new(&command)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or(command)
    } else {
        command
    };

    Some(ProcessReading {
        pid,
        user,
        name,
        cpu_percent,
        memory_percent,
        rss_bytes: rss_kib.saturating_mul(1024),
        disk_bytes: None,
    })
}

/// The `limit` entries with the largest key, ties broken by ascending pid.
pub fn rank(
    readings: &[ProcessReading],
    limit: usize,
    key: impl Fn(&ProcessReading) -> f64,
) -> Vec<ProcessReading> {
    let mut ranked = readings.to_vec();
    ranked.sort_by(|a, b| {
        key(b)
            .partial_cmp(&key(a))
            .unwrap_or(Ordering::Equal)
            .then(a.pid.cmp(&b.pid))
    });
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::tests::process;

    const PS: &str = "    1 root       0.0  0.1  11840 /sbin/init\n\
  812 postgres   12.5  3.4 550000 postgres\n\
 2231 alice      48.1 10.2 2048000 /Applications/Google Chrome.app/Contents/MacOS/Google Chrome\n\
 garbage line\n";

    #[test]
    fn test_parse_ps() {
        let rows = parse_ps(PS).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].pid, 1);
        assert_eq!(rows[0].name, "init");
        assert_eq!(rows[1].user, "postgres");
        assert_eq!(rows[1].cpu_percent, 12.5);
        assert_eq!(rows[1].rss_bytes, 550000 * 1024);
        assert_eq!(rows[2].name, "Google Chrome");
        assert_eq!(rows[2].memory_percent, 10.2);
        assert!(rows.iter().all(|p| p.disk_bytes.is_none()));
    }

    #[test]
    fn test_parse_ps_keeps_kernel_thread_names() {
        let rows = parse_ps(
            "   12 root 0.0 0.0 0 kworker/0:1-events\n   15 root 0.0 0.0 0 migration/0\n",
        )
        .unwrap();
        let names: Vec<&str> = rows.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["kworker/0:1-events", "migration/0"]);
    }

    #[test]
    fn test_parse_ps_empty_is_error() {
        assert!(parse_ps("").is_err());
        assert!(parse_ps("not a process row\n").is_err());
    }

    #[test]
    fn test_rank_descending_with_pid_tiebreak() {
        let list = vec![
            process(30, 5.0, 0, None),
            process(10, 5.0, 0, None),
            process(20, 9.0, 0, None),
            process(40, 1.0, 0, None),
        ];
        let ranked = rank(&list, 3, |p| p.cpu_percent);
        let pids: Vec<u32> = ranked.iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![20, 10, 30]);
    }

    #[test]
    fn test_rank_limit_larger_than_list() {
        let list = vec![process(1, 1.0, 0, None)];
        assert_eq!(rank(&list, 10, |p| p.cpu_percent).len(), 1);
        assert!(rank(&[], 10, |p| p.cpu_percent).is_empty());
    }
}
