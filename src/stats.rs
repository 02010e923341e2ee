use std::fmt::Display;

use crate::{
    nodes::{CAPACITY, Node},
    tree::NodeVisitor,
};

/// Per-level node statistics of a [`KSet`](crate::KSet).
#[derive(Default, Debug, Clone)]
#[cfg_attr(feature = "stats", derive(serde::Serialize))]
pub struct NodeStats(Vec<LevelStats>);

#[derive(Debug, Clone)]
#[cfg_attr(feature = "stats", derive(serde::Serialize))]
pub struct LevelStats {
    level: usize,
    nodes: usize,
    expanded: usize,
    values: usize,
}

impl LevelStats {
    fn new_level(level: usize) -> Self {
        Self {
            level,
            nodes: 0,
            expanded: 0,
            values: 0,
        }
    }

    pub fn level(&self) -> usize {
        self.level
    }

    /// Nodes at this level, empty ones included.
    pub fn nodes(&self) -> usize {
        self.nodes
    }

    /// Nodes at this level that own a child block.
    pub fn expanded(&self) -> usize {
        self.expanded
    }

    pub fn values(&self) -> usize {
        self.values
    }

    fn load_factor(&self) -> f64 {
        if self.nodes == 0 {
            return 0.0;
        }
        self.values as f64 / (self.nodes * CAPACITY) as f64
    }
}

impl NodeStats {
    pub fn levels(&self) -> &[LevelStats] {
        &self.0
    }

    pub fn total_nodes(&self) -> usize {
        self.0.iter().map(|l| l.nodes).sum()
    }

    pub fn total_values(&self) -> usize {
        self.0.iter().map(|l| l.values).sum()
    }

    /// Bytes held by the nodes; each node is exactly one cache line.
    pub fn total_memory_bytes(&self) -> usize {
        self.total_nodes() * std::mem::size_of::<Node>()
    }

    /// Fraction of value slots in use over the whole tree.
    pub fn load_factor(&self) -> f64 {
        let nodes = self.total_nodes();
        if nodes == 0 {
            return 0.0;
        }
        self.total_values() as f64 / (nodes * CAPACITY) as f64
    }
}

impl Display for NodeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for l in self.0.iter() {
            writeln!(
                f,
                "Level: {} --- || nodes: {:8}, expanded: {:8}, values: {:8}, load: {:8.2} ||",
                l.level,
                l.nodes,
                l.expanded,
                l.values,
                l.load_factor(),
            )?;
        }

        let load_factor = self.load_factor();
        if load_factor < 0.5 {
            writeln!(f, "Load factor: {:.2} (too low)", load_factor)?;
        } else {
            writeln!(f, "Load factor: {:.2}", load_factor)?;
        }

        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct StatsVisitor {
    pub(crate) stats: NodeStats,
}

impl NodeVisitor for StatsVisitor {
    fn visit_node(&mut self, node: &Node, level: usize) {
        let levels = &mut self.stats.0;
        while levels.len() <= level {
            levels.push(LevelStats::new_level(levels.len()));
        }

        let l = &mut levels[level];
        l.nodes += 1;
        l.values += node.count();
        if node.is_expanded() {
            l.expanded += 1;
        }
    }
}
