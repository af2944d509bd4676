//! Store and load a graph as text.
//!
//! Layout, one record per line after the header:
//!
//! ```text
//! vamana-graph 1.0
//! <n_edges>
//! <n_nodes>
//! <[0|-1|<0.5, 1>], [1|3|<2, 0.25>]>
//! <medoid, -1 when unset>
//! {(category, medoid), ...}
//! {(category, <ids>), ...}
//! {(id, <out-neighbors>), ...}
//! ```
//!
//! Category `-1` marks an uncategorized node. The distance function is not
//! stored; load into a graph constructed with the one the graph was built
//! with.

use super::graph::VamanaGraph;
use crate::serialization::{
    format_sequence, parse_entries, parse_header, parse_sequence, parse_value, split_top_level,
    strip_enclosed, write_header, RecordReader, SerializationError, SerializationResult,
};
use crate::types::{Category, IdType, VectorElement, NO_CATEGORY};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::Ordering;
use tracing::info;

fn format_category(category: Option<Category>) -> String {
    match category {
        Some(c) => c.to_string(),
        None => NO_CATEGORY.to_string(),
    }
}

fn parse_category(s: &str, field: &'static str) -> SerializationResult<Option<Category>> {
    let raw: i64 = parse_value(s, field)?;
    if raw == NO_CATEGORY {
        return Ok(None);
    }
    Category::try_from(raw)
        .map(Some)
        .map_err(|_| SerializationError::Parse {
            field,
            message: format!("category {raw} out of range"),
        })
}

fn inconsistent(message: impl Into<String>) -> SerializationError {
    SerializationError::Inconsistent(message.into())
}

/// Everything read from a file, validated before the graph is touched.
struct Decoded<T> {
    n_edges: usize,
    nodes: Vec<(Option<Category>, Vec<T>)>,
    medoid: Option<IdType>,
    filtered_medoids: HashMap<Category, IdType>,
    adjacency: Vec<(IdType, Vec<IdType>)>,
}

fn decode<T: VectorElement, R: BufRead>(reader: R) -> SerializationResult<Decoded<T>> {
    let mut records = RecordReader::new(reader);
    parse_header(&records.next_record("header")?)?;

    let n_edges: usize = parse_value(&records.next_record("edge count")?, "edge count")?;
    let n_nodes: usize = parse_value(&records.next_record("node count")?, "node count")?;

    let table = records.next_record("node table")?;
    let body = strip_enclosed(&table, '<', '>', "node table")?;
    let mut nodes = Vec::with_capacity(n_nodes);
    for (slot, record) in split_top_level(body, ',', "node table")?.into_iter().enumerate() {
        let fields = strip_enclosed(record, '[', ']', "node record")?;
        let parts = split_top_level(fields, '|', "node record")?;
        let [id, category, value] = parts[..] else {
            return Err(SerializationError::Parse {
                field: "node record",
                message: format!("expected [id|category|value], got '{record}'"),
            });
        };
        let id: IdType = parse_value(id, "node id")?;
        if id as usize != slot {
            return Err(inconsistent(format!("node at position {slot} has id {id}")));
        }
        nodes.push((parse_category(category, "node category")?, parse_sequence::<T>(value, "node value")?));
    }
    if nodes.len() != n_nodes {
        return Err(inconsistent(format!(
            "header announces {n_nodes} nodes, table holds {}",
            nodes.len()
        )));
    }
    if let Some((_, first)) = nodes.first() {
        let dim = first.len();
        if let Some(slot) = nodes.iter().position(|(_, v)| v.is_empty() || v.len() != dim) {
            return Err(inconsistent(format!("node {slot} does not have dimension {dim}")));
        }
    }
    let in_range = |id: IdType| (id as usize) < n_nodes;

    let medoid: i64 = parse_value(&records.next_record("medoid")?, "medoid")?;
    let medoid = match medoid {
        -1 => None,
        id if id >= 0 && (id as u64) < n_nodes as u64 => Some(id as IdType),
        id => return Err(inconsistent(format!("medoid {id} is not a node"))),
    };

    let mut filtered_medoids = HashMap::new();
    for (c, id) in parse_entries(&records.next_record("filtered medoids")?, "filtered medoids")? {
        let c: Category = parse_value(c, "filtered medoids")?;
        let id: IdType = parse_value(id, "filtered medoids")?;
        if !in_range(id) || nodes[id as usize].0 != Some(c) {
            return Err(inconsistent(format!("medoid {id} of category {c} is not in that category")));
        }
        filtered_medoids.insert(c, id);
    }

    let mut expected: BTreeMap<Category, HashSet<IdType>> = BTreeMap::new();
    for (id, (category, _)) in nodes.iter().enumerate() {
        if let Some(c) = category {
            expected.entry(*c).or_default().insert(id as IdType);
        }
    }
    let mut listed: BTreeMap<Category, HashSet<IdType>> = BTreeMap::new();
    for (c, ids) in parse_entries(&records.next_record("category index")?, "category index")? {
        let c: Category = parse_value(c, "category index")?;
        let ids: Vec<IdType> = parse_sequence(ids, "category index")?;
        listed.insert(c, ids.into_iter().collect());
    }
    if listed != expected {
        return Err(inconsistent("category index does not match the node table"));
    }

    let mut adjacency = Vec::new();
    let mut total = 0;
    for (from, to) in parse_entries(&records.next_record("adjacency")?, "adjacency")? {
        let from: IdType = parse_value(from, "adjacency")?;
        let to: Vec<IdType> = parse_sequence(to, "adjacency")?;
        if !in_range(from) {
            return Err(inconsistent(format!("adjacency lists unknown node {from}")));
        }
        let distinct: HashSet<IdType> = to.iter().copied().collect();
        if distinct.len() != to.len() || distinct.contains(&from) || !distinct.iter().all(|&j| in_range(j)) {
            return Err(inconsistent(format!("invalid out-neighbors for node {from}")));
        }
        total += to.len();
        adjacency.push((from, to));
    }
    if total != n_edges {
        return Err(inconsistent(format!(
            "header announces {n_edges} edges, adjacency holds {total}"
        )));
    }

    Ok(Decoded {
        n_edges,
        nodes,
        medoid,
        filtered_medoids,
        adjacency,
    })
}

impl<T: VectorElement> VamanaGraph<T> {
    /// Write the graph to `writer`.
    ///
    /// Holds the edge read lock while writing, so the output is a consistent
    /// snapshot.
    pub fn store<W: Write>(&self, writer: &mut W) -> SerializationResult<()> {
        let edges = self.edges.read();

        write_header(writer)?;
        writeln!(writer, "{}", edges.n_edges())?;
        writeln!(writer, "{}", self.n_nodes())?;

        let records = self.nodes.iter().map(|node| {
            format!(
                "[{}|{}|{}]",
                node.id(),
                format_category(node.category()),
                format_sequence(node.value())
            )
        });
        writeln!(writer, "{}", format_sequence(records))?;

        match self.cached_medoid() {
            Some(id) => writeln!(writer, "{id}")?,
            None => writeln!(writer, "-1")?,
        }

        let mut medoids: Vec<(Category, IdType)> =
            self.filtered_medoids.iter().map(|(&c, &id)| (c, id)).collect();
        medoids.sort_unstable();
        let medoids: Vec<String> = medoids.iter().map(|(c, id)| format!("({c}, {id})")).collect();
        writeln!(writer, "{{{}}}", medoids.join(", "))?;

        let index: Vec<String> = self
            .categories()
            .into_iter()
            .map(|c| {
                let mut ids: Vec<IdType> = self.categories[&c].iter().copied().collect();
                ids.sort_unstable();
                format!("({c}, {})", format_sequence(ids))
            })
            .collect();
        writeln!(writer, "{{{}}}", index.join(", "))?;

        let adjacency: Vec<String> = (0..self.n_nodes() as IdType)
            .map(|id| format!("({id}, {})", format_sequence(edges.neighbor_vec(id))))
            .collect();
        writeln!(writer, "{{{}}}", adjacency.join(", "))?;

        writer.flush()?;
        Ok(())
    }

    /// Replace the graph with the one read from `reader`.
    ///
    /// The input is fully parsed and checked first; on error the graph is
    /// left unchanged.
    pub fn load<R: BufRead>(&mut self, reader: R) -> SerializationResult<()> {
        let decoded = decode::<T, R>(reader)?;

        self.init();
        for (category, value) in decoded.nodes {
            self.create_node(value, category)?;
        }
        let edges = self.edges.get_mut();
        for (from, to) in decoded.adjacency {
            edges.add_batch(from, to);
        }
        if edges.n_edges() != decoded.n_edges {
            return Err(inconsistent("edge count changed while loading"));
        }
        if let Some(id) = decoded.medoid {
            self.medoid.store(id, Ordering::Release);
        }
        self.filtered_medoids = decoded.filtered_medoids;

        info!(
            n_nodes = self.n_nodes(),
            n_edges = decoded.n_edges,
            "graph loaded"
        );
        Ok(())
    }

    /// Write the graph to a file.
    pub fn store_to_file<P: AsRef<Path>>(&self, path: P) -> SerializationResult<()> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        self.store(&mut writer)?;
        info!(path = %path.as_ref().display(), "graph stored");
        Ok(())
    }

    /// Replace the graph with the one stored in a file.
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> SerializationResult<()> {
        let file = File::open(path.as_ref())?;
        self.load(BufReader::new(file))
    }
}
