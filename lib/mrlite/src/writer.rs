use crate::api::{AggregationTable, Occurrence, OccurrenceSink};
use crate::io::{ensure_dir, open_writer};
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// `key: (source: position), (source: position)`
    #[default]
    Text,
    /// One JSON object per key: `{"partition":0,"key":"..","occurrences":[..]}`
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Json => "jsonl",
        }
    }
}

#[derive(Serialize)]
struct KeyRow<'a> {
    partition: usize,
    key: &'a str,
    occurrences: &'a [Occurrence],
}

/// Writes one reducer's table, one line per key in key order.
pub fn render_table<W: Write + ?Sized>(out: &mut W, partition: usize, table: &AggregationTable, format: OutputFormat) -> Result<()> {
    for (key, occurrences) in table {
        match format {
            OutputFormat::Text => {
                write!(out, "{}: ", key)?;
                for (i, o) in occurrences.iter().enumerate() {
                    if i > 0 {
                        out.write_all(b", ")?;
                    }
                    write!(out, "({}: {})", o.source_id, o.position)?;
                }
                out.write_all(b"\n")?;
            }
            OutputFormat::Json => {
                serde_json::to_writer(&mut *out, &KeyRow { partition, key, occurrences })?;
                out.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}

// ========== Sinks ==========

/// Renders every table to one writer (stdout for the CLI).
pub struct WriterSink<W> {
    writer: W,
    format: OutputFormat,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self { Self { writer, format } }

    pub fn into_inner(self) -> W { self.writer }
}

impl WriterSink<std::io::Stdout> {
    pub fn stdout(format: OutputFormat) -> Self { Self::new(std::io::stdout(), format) }
}

impl<W: Write + Send> OccurrenceSink for WriterSink<W> {
    fn emit(&mut self, partition: usize, table: &AggregationTable) -> Result<()> {
        render_table(&mut self.writer, partition, table, self.format)?;
        self.writer.flush().context("flush output")
    }
}

/// One file per reducer: `<dir>/part-00000.<ext>`.
pub struct PartitionFileSink {
    dir: PathBuf,
    format: OutputFormat,
    written: Vec<PathBuf>,
}

impl PartitionFileSink {
    pub fn new(dir: impl Into<PathBuf>, format: OutputFormat) -> Result<Self> {
        let dir = dir.into();
        ensure_dir(&dir)?;
        Ok(Self { dir, format, written: Vec::new() })
    }

    pub fn part_path(&self, partition: usize) -> PathBuf {
        self.dir.join(format!("part-{:05}.{}", partition, self.format.extension()))
    }

    pub fn written(&self) -> &[PathBuf] { &self.written }
}

impl OccurrenceSink for PartitionFileSink {
    fn emit(&mut self, partition: usize, table: &AggregationTable) -> Result<()> {
        let path = self.part_path(partition);
        let mut out = open_writer(&path)?;
        render_table(&mut out, partition, table, self.format)?;
        out.flush().with_context(|| format!("flush {}", path.display()))?;
        self.written.push(path);
        Ok(())
    }
}

/// Keeps every emitted table in memory, in emission order.
#[derive(Default, Debug)]
pub struct CollectSink {
    tables: Vec<(usize, AggregationTable)>,
}

impl CollectSink {
    pub fn new() -> Self { Self::default() }

    pub fn tables(&self) -> &[(usize, AggregationTable)] { &self.tables }

    /// Partition whose table holds `key`.
    pub fn partition_of(&self, key: &str) -> Option<usize> {
        self.tables.iter().find(|(_, t)| t.contains_key(key)).map(|(p, _)| *p)
    }

    /// Union of all tables. Partitions hold disjoint key sets, so no list is merged.
    pub fn merged(&self) -> AggregationTable {
        let mut all = AggregationTable::new();
        for (_, table) in &self.tables {
            for (key, occ) in table {
                all.entry(key.clone()).or_default().extend(occ.iter().cloned());
            }
        }
        all
    }
}

impl OccurrenceSink for CollectSink {
    fn emit(&mut self, partition: usize, table: &AggregationTable) -> Result<()> {
        self.tables.push((partition, table.clone()));
        Ok(())
    }
}
