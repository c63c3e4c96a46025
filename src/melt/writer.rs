use crate::melt::types::{MeltConfig, ShapedRecord};
use anyhow::{anyhow, Context, Result};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// The five output tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Nodes,
    NodeTags,
    Ways,
    WayNodes,
    WayTags,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::Nodes,
        Table::NodeTags,
        Table::Ways,
        Table::WayNodes,
        Table::WayTags,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            Table::Nodes => "nodes.csv",
            Table::NodeTags => "nodes_tags.csv",
            Table::Ways => "ways.csv",
            Table::WayNodes => "ways_nodes.csv",
            Table::WayTags => "ways_tags.csv",
        }
    }

    /// Column names written as the table header
    pub fn header<'a>(&self, config: &'a MeltConfig) -> &'a [String] {
        match self {
            Table::Nodes => &config.node_fields,
            Table::Ways => &config.way_fields,
            Table::NodeTags | Table::WayTags => &config.tag_fields,
            Table::WayNodes => &config.way_node_fields,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Writes shaped records as delimited rows, one destination per table
pub struct TableWriter<W: Write> {
    nodes: csv::Writer<W>,
    node_tags: csv::Writer<W>,
    ways: csv::Writer<W>,
    way_nodes: csv::Writer<W>,
    way_tags: csv::Writer<W>,
}

impl TableWriter<BufWriter<File>> {
    /// Create (or truncate) the five table files inside `output_dir`
    pub fn create_in_dir<P: AsRef<Path>>(output_dir: P, config: &MeltConfig) -> Result<Self> {
        let output_dir = output_dir.as_ref();
        std::fs::create_dir_all(output_dir).context("Failed to create output directory")?;

        Self::from_writers(config, |table| {
            let path = output_dir.join(table.file_name());
            let file = File::create(&path)
                .with_context(|| format!("Failed to create file: {}", path.display()))?;
            Ok(BufWriter::new(file))
        })
    }
}

impl<W: Write> TableWriter<W> {
    /// Build a writer from one destination per table, writing BOM and headers
    pub fn from_writers<F>(config: &MeltConfig, mut open: F) -> Result<Self>
    where
        F: FnMut(Table) -> Result<W>,
    {
        let mut start = |table: Table| -> Result<csv::Writer<W>> {
            let mut destination = open(table)?;
            if config.write_bom {
                destination
                    .write_all(UTF8_BOM)
                    .with_context(|| format!("Failed to write {}", table))?;
            }

            // Attribute rows omit absent fields, so row width varies
            let mut writer = csv::WriterBuilder::new()
                .delimiter(config.delimiter)
                .flexible(true)
                .from_writer(destination);
            writer
                .write_record(table.header(config))
                .with_context(|| format!("Failed to write header of {}", table))?;
            Ok(writer)
        };

        Ok(TableWriter {
            nodes: start(Table::Nodes)?,
            node_tags: start(Table::NodeTags)?,
            ways: start(Table::Ways)?,
            way_nodes: start(Table::WayNodes)?,
            way_tags: start(Table::WayTags)?,
        })
    }

    fn writer(&mut self, table: Table) -> &mut csv::Writer<W> {
        match table {
            Table::Nodes => &mut self.nodes,
            Table::NodeTags => &mut self.node_tags,
            Table::Ways => &mut self.ways,
            Table::WayNodes => &mut self.way_nodes,
            Table::WayTags => &mut self.way_tags,
        }
    }

    fn write_row<I, T>(&mut self, table: Table, row: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer(table)
            .write_record(row)
            .with_context(|| format!("Failed to write row to {}", table))
    }

    /// Write every row of one record to its tables
    pub fn write_record(&mut self, record: &ShapedRecord) -> Result<()> {
        match record {
            ShapedRecord::Node(node) => {
                self.write_row(Table::Nodes, node.attributes.values())?;
                for tag in &node.tags {
                    self.write_row(Table::NodeTags, tag.fields())?;
                }
            }
            ShapedRecord::Way(way) => {
                self.write_row(Table::Ways, way.attributes.values())?;
                for node_ref in &way.node_refs {
                    self.write_row(Table::WayNodes, node_ref.fields())?;
                }
                for tag in &way.tags {
                    self.write_row(Table::WayTags, tag.fields())?;
                }
            }
        }
        Ok(())
    }

    /// Flush all writers
    pub fn flush(&mut self) -> Result<()> {
        for table in Table::ALL {
            self.writer(table)
                .flush()
                .with_context(|| format!("Failed to flush {}", table))?;
        }
        Ok(())
    }

    /// Flush and hand back the underlying destinations
    pub fn into_inner(self) -> Result<Vec<(Table, W)>> {
        [
            (Table::Nodes, self.nodes),
            (Table::NodeTags, self.node_tags),
            (Table::Ways, self.ways),
            (Table::WayNodes, self.way_nodes),
            (Table::WayTags, self.way_tags),
        ]
        .into_iter()
        .map(|(table, writer)| {
            writer
                .into_inner()
                .map(|inner| (table, inner))
                .map_err(|e| anyhow!("Failed to flush {}: {}", table, e.error()))
        })
        .collect()
    }
}
