//! Arena-backed package graph and its depth-first traversal.

use std::path::PathBuf;

use indexmap::{IndexMap, IndexSet};
use tracing::trace;

use super::scan::SourceFile;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Location};
use crate::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId(u32);

impl PackageId {
    /// The synthetic node standing for the entry file.
    pub const ENTRY: PackageId = PackageId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
pub struct PackageNode {
    /// Root-relative directory with `/` separators. The entry node uses the
    /// entry file's path instead.
    pub key: String,
    pub dir: PathBuf,
    /// Sorted by file name.
    pub files: Vec<SourceFile>,
    /// Local imports: package key → where the edge was first declared.
    pub imports: IndexMap<String, Location>,
    pub exports: IndexSet<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

#[derive(Debug)]
pub struct PackageGraph {
    nodes: Vec<PackageNode>,
    marks: Vec<Mark>,
    by_key: IndexMap<String, PackageId>,
}

impl PackageGraph {
    pub fn new(entry: PackageNode) -> Self {
        Self {
            nodes: vec![entry],
            marks: vec![Mark::Unvisited],
            by_key: IndexMap::new(),
        }
    }

    /// Add a package, or return the id it already has.
    pub fn insert(&mut self, node: PackageNode) -> PackageId {
        if let Some(&id) = self.by_key.get(&node.key) {
            return id;
        }
        let id = PackageId(self.nodes.len() as u32);
        self.by_key.insert(node.key.clone(), id);
        self.nodes.push(node);
        self.marks.push(Mark::Unvisited);
        id
    }

    pub fn get(&self, key: &str) -> Option<PackageId> {
        self.by_key.get(key).copied()
    }

    pub fn node(&self, id: PackageId) -> &PackageNode {
        &self.nodes[id.index()]
    }

    /// Number of packages, not counting the entry.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Depth-first traversal from the entry with an explicit stack.
    ///
    /// Packages are loaded through `load` on first sight. Returns packages in
    /// post-order (dependencies first), without the entry. Reaching a package
    /// that is still in progress is a cycle.
    pub fn traverse(
        &mut self,
        mut load: impl FnMut(&str) -> Result<PackageNode>,
    ) -> Result<Vec<PackageId>> {
        let mut order = Vec::new();
        let mut stack = vec![(PackageId::ENTRY, 0usize)];
        self.marks[PackageId::ENTRY.index()] = Mark::InProgress;

        while let Some(&(current, cursor)) = stack.last() {
            let next = self.nodes[current.index()]
                .imports
                .get_index(cursor)
                .map(|(key, _)| key.clone());
            let Some(key) = next else {
                stack.pop();
                self.marks[current.index()] = Mark::Done;
                if current != PackageId::ENTRY {
                    trace!(package = %self.nodes[current.index()].key, "package done");
                    order.push(current);
                }
                continue;
            };
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }

            let target = match self.get(&key) {
                Some(id) => id,
                None => {
                    let node = load(&key)?;
                    self.insert(node)
                }
            };
            match self.marks[target.index()] {
                Mark::Unvisited => {
                    self.marks[target.index()] = Mark::InProgress;
                    stack.push((target, 0));
                }
                Mark::InProgress => {
                    let start = stack
                        .iter()
                        .position(|&(id, _)| id == target)
                        .unwrap_or(0);
                    let cycle: Vec<PackageId> = stack[start..].iter().map(|&(id, _)| id).collect();
                    return Err(self.cycle_error(&cycle));
                }
                Mark::Done => {}
            }
        }
        Ok(order)
    }

    /// `a -(import declared at a/x.sprig)-> b -(...)-> a`, reported at the
    /// import closing the cycle.
    fn cycle_error(&self, cycle: &[PackageId]) -> Error {
        let mut chain = String::new();
        let mut closing = None;
        for (i, &from) in cycle.iter().enumerate() {
            let to = cycle[(i + 1) % cycle.len()];
            let from = self.node(from);
            let site = from.imports.get(&self.node(to).key);
            let file = site.map_or("?", |site| site.file.as_str());
            chain.push_str(&format!("{} -(import declared at {file})-> ", from.key));
            closing = site;
        }
        if let Some(&first) = cycle.first() {
            chain.push_str(&self.node(first).key);
        }

        let mut diagnostic =
            Diagnostic::unspanned(DiagnosticKind::PackageCycle).param("chain", chain);
        if let Some(site) = closing {
            diagnostic = diagnostic.at(site.clone());
        }
        diagnostic.into()
    }
}
