//! # Triples & the Triple Graph
//!
//! `Triple` is the atomic unit of a basic graph pattern: `(subject,
//! predicate, object)` where each position is either a variable or a bound
//! term. `TripleGraph` is the planner's intermediate representation of a
//! query's basic graph pattern plus its text cliques — nodes are triples,
//! edges connect nodes sharing a variable, and the arena (`Vec<Node>` +
//! `adj: Vec<Vec<NodeId>>`) replaces the original's indirect node-pointer
//! map (spec.md §9) with dense, stable ids.

use crate::id::Id;
use std::collections::{HashMap, HashSet};

/// The reserved predicate marking a text-aware triple, e.g. `?context
/// <in-context> "word*"`.
pub const IN_CONTEXT_RELATION: &str = "<in-context>";

/// One position of a triple: a variable reference, an already-bound term,
/// or (only valid as the object of an `<in-context>` triple) a full-text
/// word pattern literal such as `"foo*"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Variable(String),
    Bound(Id),
    Word(String),
}

impl Term {
    pub fn as_variable(&self) -> Option<&str> {
        match self {
            Term::Variable(v) => Some(v.as_str()),
            Term::Bound(_) | Term::Word(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Triple {
    pub subject: Term,
    /// The predicate's relation name. Bound predicates are represented by
    /// name rather than by `Id` since the reserved `<in-context>` marker
    /// is a string constant, not a catalog relation.
    pub predicate: String,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: impl Into<String>, object: Term) -> Self {
        Triple {
            subject,
            predicate: predicate.into(),
            object,
        }
    }

    pub fn is_text_triple(&self) -> bool {
        self.predicate == IN_CONTEXT_RELATION
    }

    fn variables(&self) -> HashSet<String> {
        let mut vars = HashSet::new();
        if let Some(v) = self.subject.as_variable() {
            vars.insert(v.to_string());
        }
        if let Some(v) = self.object.as_variable() {
            vars.insert(v.to_string());
        }
        vars
    }
}

/// A node in the triple graph: either a regular triple, or (after
/// collapsing) a text clique standing in for several text triples that
/// share a context variable.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: usize,
    pub variables: HashSet<String>,
    /// Present only for text-clique nodes: the shared context variable.
    pub context_var: Option<String>,
    /// Present only for text-clique nodes: the conjunction of the
    /// collapsed triples' word parts (e.g. `"foo* bar*"`).
    pub word_part: Option<String>,
    /// The original triple(s) this node stands for (more than one only
    /// for collapsed text cliques).
    pub triples: Vec<Triple>,
}

impl Node {
    fn from_triple(id: usize, triple: Triple) -> Self {
        let variables = triple.variables();
        Node {
            id,
            variables,
            context_var: None,
            word_part: None,
            triples: vec![triple],
        }
    }

    pub fn is_text_node(&self) -> bool {
        self.context_var.is_some()
    }
}

/// A row-comparison filter to be pushed down or applied at a text
/// operator. Free variables determine when a partial plan is eligible to
/// have the filter attached (§4.5 step 3).
#[derive(Debug, Clone)]
pub struct Filter {
    pub id: usize,
    pub expr: FilterExpr,
}

impl Filter {
    pub fn free_variables(&self) -> HashSet<String> {
        match &self.expr {
            FilterExpr::CompareVarConst { var, .. } => {
                std::iter::once(var.clone()).collect()
            }
            FilterExpr::CompareVarVar { left, right, .. } => {
                [left.clone(), right.clone()].into_iter().collect()
            }
        }
    }

    /// The context variable this filter references, if any — used by
    /// `split_at_context_vars` to decide whether a filter must be
    /// deferred to the text operator that owns that variable.
    pub fn context_var(&self) -> Option<&str> {
        match &self.expr {
            FilterExpr::CompareVarConst { var, .. } => Some(var.as_str()),
            FilterExpr::CompareVarVar { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone)]
pub enum FilterExpr {
    CompareVarConst {
        var: String,
        cmp: Comparator,
        value: Id,
    },
    CompareVarVar {
        left: String,
        cmp: Comparator,
        right: String,
    },
}

pub type NodeId = usize;

/// Arena-indexed triple graph: dense node ids, adjacency by shared
/// variable. Removing a node clears its adjacency row (and removes it
/// from every neighbor's row) but never reassigns ids — stability that
/// the planner's bitset-keyed pruning relies on.
#[derive(Debug, Clone)]
pub struct TripleGraph {
    nodes: Vec<Node>,
    adj: Vec<Vec<NodeId>>,
}

impl TripleGraph {
    /// Build a graph from a flat triple list: dense ids 0..n, edges
    /// between any two nodes sharing a variable.
    pub fn from_triples(triples: Vec<Triple>) -> Self {
        let nodes: Vec<Node> = triples
            .into_iter()
            .enumerate()
            .map(|(id, t)| Node::from_triple(id, t))
            .collect();
        let mut adj = vec![Vec::new(); nodes.len()];
        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                if !nodes[i].variables.is_disjoint(&nodes[j].variables) {
                    adj[i].push(j);
                    adj[j].push(i);
                }
            }
        }
        for row in &mut adj {
            row.sort_unstable();
        }
        TripleGraph { nodes, adj }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn neighbors(&self, id: NodeId) -> &[NodeId] {
        &self.adj[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// True iff every node is a text-clique node — the planner's shortcut
    /// that skips DP entirely (§4.5 step 4).
    pub fn is_pure_text_query(&self) -> bool {
        !self.nodes.is_empty() && self.nodes.iter().all(Node::is_text_node)
    }

    /// Nodes reachable from `start` by following edges, without ever
    /// stepping into a node in `excluded`. Used both for connectivity
    /// checks during planning and for sub-query extraction.
    pub fn bfs_leave_out(&self, start: NodeId, excluded: &HashSet<NodeId>) -> HashSet<NodeId> {
        let mut visited = HashSet::new();
        if excluded.contains(&start) {
            return visited;
        }
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(start);
        visited.insert(start);
        while let Some(n) = queue.pop_front() {
            for &neighbor in &self.adj[n] {
                if !excluded.contains(&neighbor) && visited.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        visited
    }

    /// Whether nodes `a` and `b` are connected without leaving the
    /// combined node set `within` (used by the planner's `connected`
    /// check when merging two subtree plans: `within` is the union of
    /// both plans' covered nodes).
    pub fn connected_within(&self, a: NodeId, b: NodeId, within: &HashSet<NodeId>) -> bool {
        let excluded: HashSet<NodeId> = (0..self.nodes.len())
            .filter(|n| !within.contains(n))
            .collect();
        self.bfs_leave_out(a, &excluded).contains(&b)
    }

    /// Identify maximal sets of nodes sharing the same context variable
    /// and collapse each into a single text-clique node. Filters that
    /// reference a collapsed context variable are split off and returned
    /// separately so the planner applies them at the owning text operator
    /// instead of as a standalone Filter operation
    /// (`split_at_context_vars`).
    pub fn collapse_text_cliques(&mut self, filters: Vec<Filter>) -> Vec<Filter> {
        let mut cliques: HashMap<String, Vec<NodeId>> = HashMap::new();
        for node in &self.nodes {
            if node.is_text_node() {
                continue;
            }
            if let Some(triple) = node.triples.first() {
                if triple.is_text_triple() {
                    if let Some(cvar) = triple.subject.as_variable() {
                        cliques.entry(cvar.to_string()).or_default().push(node.id);
                    }
                }
            }
        }

        if cliques.is_empty() {
            return filters;
        }

        let mut collapsed_ids: HashSet<NodeId> = HashSet::new();
        let mut new_nodes: Vec<Node> = Vec::new();

        for (cvar, member_ids) in &cliques {
            let mut variables: HashSet<String> = std::iter::once(cvar.clone()).collect();
            let mut triples = Vec::new();
            let mut word_parts = Vec::new();
            for &id in member_ids {
                let node = &self.nodes[id];
                variables.extend(node.variables.iter().cloned());
                for t in &node.triples {
                    if let Term::Word(pattern) = &t.object {
                        word_parts.push(pattern.clone());
                    }
                    triples.push(t.clone());
                }
                collapsed_ids.insert(id);
            }
            let new_id = self.nodes.len() + new_nodes.len();
            new_nodes.push(Node {
                id: new_id,
                variables,
                context_var: Some(cvar.clone()),
                word_part: Some(word_parts.join(" ")),
                triples,
            });
        }

        let kept_old: Vec<NodeId> = (0..self.nodes.len())
            .filter(|id| !collapsed_ids.contains(id))
            .collect();

        let mut renumbered_nodes = Vec::new();
        let mut old_to_new: HashMap<NodeId, NodeId> = HashMap::new();
        for old_id in &kept_old {
            let new_id = renumbered_nodes.len();
            old_to_new.insert(*old_id, new_id);
            let mut node = self.nodes[*old_id].clone();
            node.id = new_id;
            renumbered_nodes.push(node);
        }
        for mut node in new_nodes {
            let new_id = renumbered_nodes.len();
            old_to_new.insert(node.id, new_id);
            node.id = new_id;
            renumbered_nodes.push(node);
        }

        let n = renumbered_nodes.len();
        let mut new_adj = vec![Vec::new(); n];
        for i in 0..n {
            for j in (i + 1)..n {
                if !renumbered_nodes[i]
                    .variables
                    .is_disjoint(&renumbered_nodes[j].variables)
                {
                    new_adj[i].push(j);
                    new_adj[j].push(i);
                }
            }
        }

        self.nodes = renumbered_nodes;
        self.adj = new_adj;

        let collapsed_context_vars: HashSet<String> = cliques.keys().cloned().collect();
        filters
            .into_iter()
            .filter(|f| {
                if let Some(cvar) = f.context_var() {
                    !collapsed_context_vars.contains(cvar)
                } else {
                    true
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Term {
        Term::Variable(name.to_string())
    }

    #[test]
    fn edges_connect_nodes_sharing_a_variable() {
        let triples = vec![
            Triple::new(var("s"), "p", var("o")),
            Triple::new(var("o"), "p2", var("o2")),
            Triple::new(var("unrelated"), "p3", var("also_unrelated")),
        ];
        let g = TripleGraph::from_triples(triples);
        assert_eq!(g.neighbors(0), &[1]);
        assert_eq!(g.neighbors(1), &[0]);
        assert!(g.neighbors(2).is_empty());
    }

    #[test]
    fn bfs_leave_out_respects_exclusion() {
        let triples = vec![
            Triple::new(var("a"), "p", var("b")),
            Triple::new(var("b"), "p", var("c")),
            Triple::new(var("c"), "p", var("d")),
        ];
        let g = TripleGraph::from_triples(triples);
        let reachable = g.bfs_leave_out(0, &HashSet::new());
        assert_eq!(reachable.len(), 3);

        let mut excluded = HashSet::new();
        excluded.insert(1);
        let reachable = g.bfs_leave_out(0, &excluded);
        assert_eq!(reachable, [0].into_iter().collect());
    }

    #[test]
    fn pure_text_query_detection() {
        let triples = vec![Triple::new(
            var("ctx"),
            IN_CONTEXT_RELATION,
            Term::Word("word*".to_string()),
        )];
        let mut g = TripleGraph::from_triples(triples);
        assert!(!g.is_pure_text_query());
        g.collapse_text_cliques(Vec::new());
        assert!(g.is_pure_text_query());
    }

    #[test]
    fn text_clique_collapses_shared_context_var() {
        let triples = vec![
            Triple::new(var("ctx"), IN_CONTEXT_RELATION, Term::Word("foo*".to_string())),
            Triple::new(var("ctx"), IN_CONTEXT_RELATION, Term::Word("bar*".to_string())),
            Triple::new(var("s"), "p", var("ctx")),
        ];
        let mut g = TripleGraph::from_triples(triples);
        g.collapse_text_cliques(Vec::new());
        // the two text triples collapse into one node; the unrelated
        // triple remains, for a total of 2 nodes.
        assert_eq!(g.len(), 2);
        let text_node = g.nodes().iter().find(|n| n.is_text_node()).unwrap();
        assert_eq!(text_node.word_part.as_deref(), Some("foo* bar*"));
    }
}
