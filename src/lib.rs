//! # osm-melt - OSM XML to relational tables
//!
//! Streams an OpenStreetMap XML document and flattens its `node` and `way`
//! elements into five delimited tables ready for bulk loading:
//! `nodes`, `nodes_tags`, `ways`, `ways_nodes` and `ways_tags`.
//!
//! ## Modules
//!
//! - **melt**: Stream elements, shape them into rows, write the tables
//! - **normalize**: Street-name and postal-code cleanup rules
//!
//! ## Quick Start
//!
//! ```rust
//! use osm_melt::melt::{ElementKind, ElementSource, MeltConfig, OsmMelter, ShapedRecord};
//! use osm_melt::normalize::StreetLedger;
//!
//! # fn main() -> anyhow::Result<()> {
//! let xml = r#"<osm>
//!   <node id="1" lat="-23.5" lon="-46.6">
//!     <tag k="addr:postcode" v="01310930"/>
//!   </node>
//! </osm>"#;
//!
//! let melter = OsmMelter::new(MeltConfig::default());
//! let mut ledger = StreetLedger::new();
//!
//! for element in ElementSource::new(xml.as_bytes(), &[ElementKind::Node, ElementKind::Way]) {
//!     let record = melter.shape(&element?, &mut ledger);
//!     if let ShapedRecord::Node(node) = record {
//!         assert_eq!(node.tags[0].value, "01310-930");
//!         assert_eq!(node.tags[0].tag_type, "addr");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use log::info;
use std::io::{BufRead, Write};

pub mod melt;
pub mod normalize;

// Re-export commonly used types for convenience
pub use melt::{ElementSource, MeltConfig, OsmMelter, ShapedRecord, Table, TableWriter};
pub use normalize::{Normalization, StreetLedger, StreetRules};

/// Totals of one melting run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeltReport {
    pub nodes: u64,
    pub ways: u64,
    pub node_tags: u64,
    pub way_tags: u64,
    pub way_nodes: u64,
    /// Street prefixes that could not be normalized
    pub ledger: StreetLedger,
}

impl MeltReport {
    fn record(&mut self, record: &ShapedRecord) {
        let tags = record.tags().len() as u64;
        match record {
            ShapedRecord::Node(_) => {
                self.nodes += 1;
                self.node_tags += tags;
            }
            ShapedRecord::Way(way) => {
                self.ways += 1;
                self.way_tags += tags;
                self.way_nodes += way.node_refs.len() as u64;
            }
        }
    }
}

/// Main entry point: melt an OSM XML stream into the five tables
///
/// Elements are processed one at a time in document order. A malformed
/// document aborts the run; rows already written are left in place.
pub fn melt_osm<R: BufRead, W: Write>(
    reader: R,
    writer: &mut TableWriter<W>,
    config: MeltConfig,
) -> Result<MeltReport> {
    let source = ElementSource::new(reader, &config.kinds);
    let melter = OsmMelter::new(config);
    let mut report = MeltReport::default();

    for element in source {
        let element = element.context("Failed to read OSM element")?;
        let record = melter.shape(&element, &mut report.ledger);
        writer.write_record(&record)?;
        report.record(&record);
    }
    writer.flush()?;

    info!(
        "melted {} nodes ({} tags) and {} ways ({} tags, {} node refs); {} unexpected street prefixes",
        report.nodes,
        report.node_tags,
        report.ways,
        report.way_tags,
        report.way_nodes,
        report.ledger.len()
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn melt_to_strings(xml: &str) -> (MeltReport, Vec<(Table, String)>) {
        let config = MeltConfig {
            write_bom: false,
            ..MeltConfig::default()
        };
        let mut writer = TableWriter::from_writers(&config, |_| Ok(Vec::<u8>::new())).unwrap();
        let report = melt_osm(xml.as_bytes(), &mut writer, config).unwrap();
        let tables = writer
            .into_inner()
            .unwrap()
            .into_iter()
            .map(|(table, buf)| (table, String::from_utf8(buf).unwrap()))
            .collect();
        (report, tables)
    }

    fn rows(tables: &[(Table, String)], table: Table) -> Vec<String> {
        tables
            .iter()
            .find(|(t, _)| *t == table)
            .unwrap()
            .1
            .lines()
            .skip(1)
            .map(|line| line.to_string())
            .collect()
    }

    #[test]
    fn test_single_node_document() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm>
  <node id="1" lat="-23.5" lon="-46.6">
    <tag k="addr:postcode" v="01310930"/>
  </node>
</osm>"#;

        let (report, tables) = melt_to_strings(xml);

        assert_eq!(rows(&tables, Table::Nodes), vec!["1;-23.5;-46.6"]);
        assert_eq!(rows(&tables, Table::NodeTags), vec!["1;postcode;01310-930;addr"]);
        assert!(rows(&tables, Table::Ways).is_empty());
        assert_eq!(report.nodes, 1);
        assert_eq!(report.node_tags, 1);
        assert!(report.ledger.is_empty());
    }

    #[test]
    fn test_full_document() {
        let xml = r#"<osm version="0.6">
  <node id="1" lat="-23.56" lon="-46.65" user="ana" uid="7" version="2" changeset="99" timestamp="2017-01-01T00:00:00Z">
    <tag k="addr:street" v="Av. Paulista"/>
    <tag k="addr:postcode" v="013109301"/>
  </node>
  <node id="2" lat="-23.57" lon="-46.66"/>
  <way id="10" user="ana" uid="7" version="1" changeset="99" timestamp="2017-01-01T00:00:00Z">
    <nd ref="1"/>
    <nd ref="2"/>
    <nd ref="1"/>
    <tag k="highway" v="residential"/>
    <tag k="address:street" v="Caminho do Sol"/>
  </way>
  <relation id="50">
    <member type="way" ref="10" role="outer"/>
    <tag k="type" v="multipolygon"/>
  </relation>
</osm>"#;

        let (report, tables) = melt_to_strings(xml);

        assert_eq!(
            rows(&tables, Table::Nodes),
            vec![
                "1;-23.56;-46.65;ana;7;2;99;2017-01-01T00:00:00Z",
                "2;-23.57;-46.66",
            ]
        );
        assert_eq!(rows(&tables, Table::NodeTags), vec!["1;street;Avenida Paulista;addr"]);
        assert_eq!(
            rows(&tables, Table::Ways),
            vec!["10;ana;7;1;99;2017-01-01T00:00:00Z"]
        );
        assert_eq!(
            rows(&tables, Table::WayNodes),
            vec!["10;1;0", "10;2;1", "10;1;2"]
        );
        assert_eq!(
            rows(&tables, Table::WayTags),
            vec!["10;highway;residential;regular", "10;street;Caminho do Sol;addr"]
        );

        assert_eq!(report.nodes, 2);
        assert_eq!(report.ways, 1);
        assert_eq!(report.node_tags, 1);
        assert_eq!(report.way_tags, 2);
        assert_eq!(report.way_nodes, 3);
        assert_eq!(report.ledger.count("Caminho"), 1);
    }

    #[test]
    fn test_malformed_document_aborts() {
        let config = MeltConfig::default();
        let mut writer = TableWriter::from_writers(&config, |_| Ok(Vec::<u8>::new())).unwrap();
        let xml = r#"<osm><node id="1"/><way id="2"><nd/></way></osm>"#;

        let result = melt_osm(xml.as_bytes(), &mut writer, config);

        assert!(result.is_err());
    }

    #[test]
    fn test_truncated_document_aborts_after_complete_elements() {
        let config = MeltConfig {
            write_bom: false,
            ..MeltConfig::default()
        };
        let mut writer = TableWriter::from_writers(&config, |_| Ok(Vec::<u8>::new())).unwrap();
        let xml = r#"<osm><node id="1"/><node id="2"></node>"#;

        let result = melt_osm(xml.as_bytes(), &mut writer, config);
        let tables: Vec<_> = writer
            .into_inner()
            .unwrap()
            .into_iter()
            .map(|(table, buf)| (table, String::from_utf8(buf).unwrap()))
            .collect();

        assert!(result.is_err());
        assert_eq!(rows(&tables, Table::Nodes), vec!["1", "2"]);
    }

    #[test]
    fn test_empty_input_aborts() {
        let config = MeltConfig::default();
        let mut writer = TableWriter::from_writers(&config, |_| Ok(Vec::<u8>::new())).unwrap();

        assert!(melt_osm("".as_bytes(), &mut writer, config).is_err());
    }
}
