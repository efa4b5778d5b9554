//! Sparse spatial adjacency in compressed-row form.

use crate::error::{Error, Result};

/// Undirected neighbourhood graph over spatial units.
///
/// Stored as CSR: the neighbours of unit `u` are
/// `neighbors[offsets[u]..offsets[u + 1]]`, sorted ascending, without
/// self-loops or duplicates. Immutable once built and shared read-only by
/// every permutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adjacency {
    offsets: Vec<usize>,
    neighbors: Vec<usize>,
}

impl Adjacency {
    /// Build from an edge list. Edges are symmetrised; self-loops and
    /// repeated edges are dropped.
    pub fn from_edges<I>(n_units: usize, edges: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut lists: Vec<Vec<usize>> = vec![Vec::new(); n_units];
        for (a, b) in edges {
            let largest = a.max(b);
            if largest >= n_units {
                return Err(Error::InvalidInput {
                    message: format!(
                        "adjacency edge ({}, {}) references a unit outside 0..{}",
                        a, b, n_units
                    ),
                });
            }
            if a == b {
                continue;
            }
            lists[a].push(b);
            lists[b].push(a);
        }
        Ok(Self::from_lists(lists))
    }

    /// Build from coordinate-format row and column index arrays, the usual
    /// on-disk layout of a sparse connectivity matrix.
    pub fn from_coo(n_units: usize, rows: &[usize], cols: &[usize]) -> Result<Self> {
        if rows.len() != cols.len() {
            return Err(Error::ShapeMismatch {
                what: "adjacency column indices",
                expected: rows.len(),
                actual: cols.len(),
            });
        }
        Self::from_edges(n_units, rows.iter().copied().zip(cols.iter().copied()))
    }

    fn from_lists(mut lists: Vec<Vec<usize>>) -> Self {
        let mut offsets = Vec::with_capacity(lists.len() + 1);
        let mut neighbors = Vec::new();
        offsets.push(0);
        for list in &mut lists {
            list.sort_unstable();
            list.dedup();
            neighbors.extend_from_slice(list);
            offsets.push(neighbors.len());
        }
        Self { offsets, neighbors }
    }

    /// Number of spatial units (vertices).
    pub fn n_units(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Number of undirected edges.
    pub fn n_edges(&self) -> usize {
        self.neighbors.len() / 2
    }

    /// Sorted neighbours of `unit`.
    pub fn neighbors(&self, unit: usize) -> &[usize] {
        &self.neighbors[self.offsets[unit]..self.offsets[unit + 1]]
    }

    /// Graph used for clustering: edges only between included units, and
    /// two units joined whenever a path of at most `max_step` edges through
    /// included units connects them.
    ///
    /// With `max_step == 1` this is the induced subgraph on `include`.
    pub fn restricted(&self, include: &[bool], max_step: usize) -> Result<Self> {
        if include.len() != self.n_units() {
            return Err(Error::ShapeMismatch {
                what: "adjacency units",
                expected: include.len(),
                actual: self.n_units(),
            });
        }
        if max_step == 0 {
            return Err(Error::InvalidConfig {
                message: "max_step must be >= 1".to_string(),
            });
        }

        let n = self.n_units();
        let mut lists: Vec<Vec<usize>> = vec![Vec::new(); n];
        // Visit stamps avoid clearing a seen-set per source unit.
        let mut stamp = vec![usize::MAX; n];
        let mut frontier = Vec::new();
        let mut next = Vec::new();

        for source in (0..n).filter(|&u| include[u]) {
            stamp[source] = source;
            frontier.clear();
            frontier.push(source);
            for _ in 0..max_step {
                next.clear();
                for &u in &frontier {
                    for &v in self.neighbors(u) {
                        if include[v] && stamp[v] != source {
                            stamp[v] = source;
                            lists[source].push(v);
                            next.push(v);
                        }
                    }
                }
                if next.is_empty() {
                    break;
                }
                std::mem::swap(&mut frontier, &mut next);
            }
        }

        Ok(Self::from_lists(lists))
    }
}
