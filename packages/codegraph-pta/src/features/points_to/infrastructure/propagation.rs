//! Inclusion-based propagation over the PAG
//!
//! Difference propagation with a dirty queue:
//! - each node keeps the pointees added since it was last visited
//! - edges added after a node was visited are caught up with the full set
//!   of their source, tracked by an edge cursor into the append-only arena
//! - Load / Write edges over a field reference become Copy edges to the
//!   concrete field node of every object the base points to
//!
//! Between propagation rounds, new pointees of locals that dispatch a
//! dynamic call are handed to the builder, which may instantiate new
//! functions and add edges.

use crate::errors::Result;
use crate::features::call_graph::CallSiteId;
use crate::features::ir::StmtId;
use crate::features::points_to::domain::{ContextId, NodeId, Pag, PagEdgeKind, PtsCollection};
use crate::features::points_to::infrastructure::pag_builder::PagBuilder;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, warn};

/// Statistics of one solver run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PropagationStats {
    /// Propagate / resolve rounds
    pub rounds: usize,
    /// Points-to set updates that added at least one pointee
    pub propagations: usize,
    /// Field reference edges lowered to Copy edges on concrete field nodes
    pub field_edges: usize,
    /// (call site, context, pointee) triples handed to the builder
    pub resolved_calls: usize,
    pub duration_propagate_ms: f64,
    pub duration_resolve_ms: f64,
}

pub struct Propagator {
    /// First edge not yet caught up
    edge_cursor: usize,
    /// (call site, context, pointee) already resolved
    resolved: FxHashSet<(CallSiteId, ContextId, NodeId)>,
    /// Call-site locals and their new pointees since the last resolve step
    updated: FxHashMap<NodeId, Vec<NodeId>>,
    /// Dynamic call sites that saw at least one pointee this round
    processed: FxHashSet<CallSiteId>,
    max_rounds: Option<usize>,
    stats: PropagationStats,
}

impl Propagator {
    pub fn new(max_rounds: Option<usize>) -> Self {
        Self {
            edge_cursor: 0,
            resolved: FxHashSet::default(),
            updated: FxHashMap::default(),
            processed: FxHashSet::default(),
            max_rounds,
            stats: PropagationStats::default(),
        }
    }

    pub fn stats(&self) -> &PropagationStats {
        &self.stats
    }

    /// Run to the fixpoint; the builder must already hold the entries
    pub fn solve(&mut self, builder: &mut PagBuilder<'_>) -> Result<()> {
        self.init_worklist(builder.pag_mut());

        loop {
            self.stats.rounds += 1;
            if self.max_rounds.is_some_and(|max| self.stats.rounds > max) {
                warn!(rounds = self.stats.rounds - 1, "round limit reached, result may be incomplete");
                self.stats.rounds -= 1;
                break;
            }

            let start = Instant::now();
            self.propagate(builder.pag_mut());
            self.stats.duration_propagate_ms += start.elapsed().as_secs_f64() * 1000.0;

            let start = Instant::now();
            let reached = self.on_the_fly(builder)?;
            self.stats.duration_resolve_ms += start.elapsed().as_secs_f64() * 1000.0;

            debug!(
                round = self.stats.rounds,
                reached,
                nodes = builder.pag().node_count(),
                edges = builder.pag().edge_count(),
                "round finished"
            );

            let pag = builder.pag();
            if !reached
                && !pag.has_dirty()
                && self.edge_cursor == pag.edge_count()
                && !builder.has_pending_work()
            {
                break;
            }
        }
        Ok(())
    }

    /// Seed the staged edges: allocation-like sources point to themselves,
    /// Address destinations point to their source
    pub fn init_worklist(&mut self, pag: &mut Pag) {
        for edge in pag.take_staged_edges() {
            let (kind, src, dst) = {
                let e = pag.edge(edge);
                (e.kind, e.src, e.dst)
            };
            if pag.node(src).is_allocation_like() {
                self.count(pag.add_pts(src, src));
            }
            if kind == PagEdgeKind::Address {
                self.count(pag.add_pts(dst, src));
            }
        }
    }

    /// Drain the dirty queue
    pub fn propagate(&mut self, pag: &mut Pag) {
        loop {
            self.catch_up(pag);
            let Some(node) = pag.pop_dirty() else {
                if self.edge_cursor == pag.edge_count() {
                    break;
                }
                continue;
            };
            let diff = pag.take_diff(node);
            if diff.is_empty() {
                continue;
            }

            self.expand_field_refs(pag, node, &diff);

            let targets: Vec<NodeId> = PagEdgeKind::ALL
                .iter()
                .filter(|k| k.is_propagating())
                .flat_map(|k| pag.successors(node, *k))
                .collect();
            for dst in targets {
                self.count(pag.add_pts_all(dst, &diff));
            }

            let (dyn_sites, unknown_sites) = pag.node(node).related_call_sites();
            if !dyn_sites.is_empty() || !unknown_sites.is_empty() {
                self.updated.entry(node).or_default().extend(diff);
            }
        }
    }

    /// Apply every edge added since the last call with the full source set
    fn catch_up(&mut self, pag: &mut Pag) {
        while self.edge_cursor < pag.edge_count() {
            let (kind, src, dst, stmt) = {
                let e = pag.edges()[self.edge_cursor].clone();
                (e.kind, e.src, e.dst, e.stmt)
            };
            self.edge_cursor += 1;

            match kind {
                PagEdgeKind::Address => {
                    if pag.node(src).is_allocation_like() {
                        self.count(pag.add_pts(src, src));
                    }
                    self.count(pag.add_pts(dst, src));
                }
                PagEdgeKind::Copy | PagEdgeKind::This | PagEdgeKind::InterProceduralCopy => {
                    if pag.node(src).is_allocation_like() {
                        self.count(pag.add_pts(src, src));
                    }
                    let pts = pag.pts(src).to_vec();
                    self.count(pag.add_pts_all(dst, &pts));
                }
                PagEdgeKind::Load => match pag.base_of_field_ref(src) {
                    Some(base) => {
                        for obj in pag.pts(base).to_vec() {
                            if let Some(field) = pag.get_or_clone_field_node(src, obj) {
                                self.add_field_edge(pag, field, dst, stmt);
                            }
                        }
                    }
                    // static fields and method values: a plain variable
                    None => self.add_field_edge(pag, src, dst, stmt),
                },
                PagEdgeKind::Write => match pag.base_of_field_ref(dst) {
                    Some(base) => {
                        for obj in pag.pts(base).to_vec() {
                            if let Some(field) = pag.get_or_clone_field_node(dst, obj) {
                                self.add_field_edge(pag, src, field, stmt);
                            }
                        }
                    }
                    None => self.add_field_edge(pag, src, dst, stmt),
                },
            }
        }
    }

    /// New pointees of a base local reach the Load / Write edges of its field refs
    fn expand_field_refs(&mut self, pag: &mut Pag, base: NodeId, diff: &[NodeId]) {
        for field_ref in pag.field_refs_by_base(base).to_vec() {
            let loads = pag.successors(field_ref, PagEdgeKind::Load);
            let writes = pag.predecessors(field_ref, PagEdgeKind::Write);
            if loads.is_empty() && writes.is_empty() {
                continue;
            }
            for obj in diff {
                let Some(field) = pag.get_or_clone_field_node(field_ref, *obj) else {
                    continue;
                };
                for dst in &loads {
                    self.add_field_edge(pag, field, *dst, None);
                }
                for src in &writes {
                    self.add_field_edge(pag, *src, field, None);
                }
            }
        }
    }

    fn add_field_edge(&mut self, pag: &mut Pag, src: NodeId, dst: NodeId, stmt: Option<StmtId>) {
        if pag.add_edge(src, dst, PagEdgeKind::Copy, stmt).is_some() {
            self.stats.field_edges += 1;
        }
    }

    /// Resolve dynamic calls for new pointees and instantiate what they reach
    ///
    /// Returns true if the builder instantiated at least one function.
    pub fn on_the_fly(&mut self, builder: &mut PagBuilder<'_>) -> Result<bool> {
        let mut pending: Vec<(NodeId, Vec<NodeId>)> = self.updated.drain().collect();
        for node in builder.pag_mut().take_rescan() {
            let pts = builder.pag().pts(node).to_vec();
            pending.push((node, pts));
        }
        pending.sort_unstable_by_key(|(node, _)| *node);

        for (node, pointees) in pending {
            let n = builder.pag().node(node);
            let cid = n.cid.unwrap_or(ContextId::DUMMY);
            let (dyn_sites, unknown_sites) = n.related_call_sites();
            let sites: Vec<CallSiteId> = dyn_sites.iter().chain(unknown_sites).copied().collect();

            for cs in sites {
                self.processed.insert(cs);
                for pointee in &pointees {
                    if !self.resolved.insert((cs, cid, *pointee)) {
                        continue;
                    }
                    self.stats.resolved_calls += 1;
                    builder.add_dynamic_call_edge(cs, *pointee, cid)?;
                }
            }
        }

        builder.handle_unprocessed_call_sites(&self.processed)?;
        self.processed.clear();
        let reached = builder.handle_reachable()?;
        self.init_worklist(builder.pag_mut());
        Ok(reached)
    }

    #[inline]
    fn count(&mut self, grew: bool) {
        if grew {
            self.stats.propagations += 1;
        }
    }
}
