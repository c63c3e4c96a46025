//! OSM melting - flatten OSM XML elements into relational tables
//!
//! This module streams `node` and `way` elements out of an OSM XML document,
//! shapes each one into attribute, tag and node-reference rows, and writes
//! those rows to one delimited table per row kind.
//!
//! ## Memory
//!
//! `ElementSource` keeps only the element currently being read, and each
//! shaped record is written out before the next element is pulled, so peak
//! memory does not grow with document size.

pub mod extractor;
pub mod source;
pub mod types;
pub mod writer;

pub use extractor::{extract_node_refs, project_attributes, split_key, OsmMelter};
pub use source::{ElementSource, SourceError};
pub use types::{
    AttributeRow, Child, Element, ElementKind, MeltConfig, NodeRecord, NodeRefRow, ShapedRecord,
    TagRow, WayRecord,
};
pub use writer::{Table, TableWriter};
