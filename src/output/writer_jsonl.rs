use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::output::aggregator::{Discovery, DiscoveryReport};

/// Append one JSON object per discovered endpoint.
pub fn write_jsonl(path: &Path, items: &[Discovery]) -> anyhow::Result<()> {
    let mut f = OpenOptions::new().append(true).create(true).open(path)?;
    for it in items {
        let line = serde_json::to_string(it)?;
        f.write_all(line.as_bytes())?;
        f.write_all(b"\n")?;
    }
    Ok(())
}

pub fn read_jsonl(path: &Path) -> anyhow::Result<Vec<Discovery>> {
    let mut out = Vec::new();
    let data = std::fs::read_to_string(path)?;
    for line in data.lines() {
        if line.trim().is_empty() { continue; }
        let v: Discovery = serde_json::from_str(line)?;
        out.push(v);
    }
    Ok(out)
}

pub fn write_summary_txt(path: &Path, report: &DiscoveryReport) -> anyhow::Result<()> {
    let mut lines = Vec::new();
    lines.push(format!("target: {}", report.target));
    lines.push(format!(
        "probes: {} | discovered: {} | excluded: {} | failed: {} (timeouts: {}){}",
        report.stats.probes_total,
        report.endpoints.len(),
        report.stats.excluded,
        report.stats.failed,
        report.stats.timeouts,
        if report.cancelled { " | CANCELLED" } else { "" },
    ));
    for it in &report.endpoints {
        lines.push(format!("{:<6} {} {}", it.method, it.status, it.url));
    }
    std::fs::write(path, lines.join("\n"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuzz::candidates::Method;

    #[test]
    fn test_jsonl_appends_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let items = vec![
            Discovery { method: Method::Get, url: "https://x.test/a".into(), status: 200 },
            Discovery { method: Method::Delete, url: "https://x.test/b".into(), status: 500 },
        ];
        write_jsonl(&path, &items[..1]).unwrap();
        write_jsonl(&path, &items[1..]).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.lines().next().unwrap().contains("\"method\":\"GET\""));
        assert_eq!(read_jsonl(&path).unwrap(), items);
    }
}
