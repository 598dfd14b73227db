use crate::output::aggregator::Discovery;
use csv::Writer;
use std::fs::File;
use std::path::Path;

pub fn write_csv(path: &Path, items: &[Discovery]) -> anyhow::Result<()> {
    let f = File::create(path)?;
    let mut w = Writer::from_writer(f);
    w.write_record(["method", "status", "url"])?;
    for it in items {
        w.write_record(&[it.method.to_string(), it.status.to_string(), it.url.clone()])?;
    }
    w.flush()?;
    Ok(())
}
