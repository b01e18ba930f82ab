//! Pointer analysis entry point
//!
//! # Usage
//! ```text
//! use codegraph_pta::config::PtaConfig;
//! use codegraph_pta::features::call_graph::CallGraphBuilder;
//! use codegraph_pta::features::points_to::PointerAnalysis;
//!
//! let cg = CallGraphBuilder::new(&program).build(&[main]);
//! let mut pta = PointerAnalysis::new(&program, cg, PtaConfig::default())?;
//! pta.solve()?;
//! assert!(pta.no_alias(&p, &q));
//! ```

use crate::config::PtaConfig;
use crate::errors::Result;
use crate::features::call_graph::{CallGraph, FuncId};
use crate::features::ir::{MethodSignature, Program, Value};
use crate::features::points_to::domain::{NodeId, Pag, PagEdgeKind, PagStats, PagValue, PtsCollection};
use crate::features::points_to::infrastructure::{PagBuilder, PropagationStats, Propagator};
use crate::shared::constants::dump::STATS_FILE_NAME;
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{info, warn};

/// Statistics of one analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PtaStats {
    pub entries: usize,
    pub contexts: usize,
    pub funcs_handled: usize,
    pub funcs_unhandled: usize,
    pub call_graph_edges: usize,
    pub dynamic_call_edges: usize,
    pub solver: PropagationStats,
    pub pag: PagStats,
    pub duration_build_ms: f64,
    pub duration_solve_ms: f64,
    pub duration_ms: f64,
}

/// Context- and field-sensitive inclusion-based pointer analysis
pub struct PointerAnalysis<'p> {
    program: &'p Program,
    config: PtaConfig,
    builder: PagBuilder<'p>,
    propagator: Propagator,
    entries: Vec<FuncId>,
    solved: bool,
    stats: PtaStats,
}

impl<'p> PointerAnalysis<'p> {
    /// Validate `config` and prepare an analysis rooted at the call graph's entries
    pub fn new(program: &'p Program, cg: CallGraph, config: PtaConfig) -> Result<Self> {
        config.validate()?;
        let entries = cg.entries().to_vec();
        let builder = PagBuilder::new(program, cg, &config);
        Ok(Self {
            program,
            propagator: Propagator::new(config.max_rounds),
            config,
            builder,
            entries,
            solved: false,
            stats: PtaStats::default(),
        })
    }

    /// Run the analysis to its fixpoint; later calls return the cached statistics
    pub fn solve(&mut self) -> Result<&PtaStats> {
        if self.solved {
            return Ok(&self.stats);
        }
        let total_start = Instant::now();

        let build_start = Instant::now();
        self.builder.build_for_entries(&self.entries)?;
        self.stats.duration_build_ms = build_start.elapsed().as_secs_f64() * 1000.0;

        let solve_start = Instant::now();
        self.propagator.solve(&mut self.builder)?;
        self.stats.duration_solve_ms = solve_start.elapsed().as_secs_f64() * 1000.0;

        self.solved = true;
        self.postprocess();
        self.stats.duration_ms = total_start.elapsed().as_secs_f64() * 1000.0;

        info!(
            funcs = self.stats.funcs_handled,
            unhandled = self.stats.funcs_unhandled,
            nodes = self.stats.pag.nodes,
            edges = self.stats.pag.edges,
            rounds = self.stats.solver.rounds,
            duration_ms = self.stats.duration_ms,
            "Pointer analysis finished"
        );

        if self.config.debug_dump {
            self.dump_stats()?;
        }
        Ok(&self.stats)
    }

    fn postprocess(&mut self) {
        let cg = self.builder.call_graph();
        let unhandled = self.builder.unhandled_funcs();
        for func in &unhandled {
            warn!(%func, signature = %cg.node(*func).signature, "function never reached");
        }
        self.stats = PtaStats {
            entries: self.entries.len(),
            contexts: self.builder.contexts().len(),
            funcs_handled: self.builder.handled_funcs().len(),
            funcs_unhandled: unhandled.len(),
            call_graph_edges: cg.edge_count(),
            dynamic_call_edges: cg.dynamic_edge_count(),
            solver: self.propagator.stats().clone(),
            pag: self.builder.pag().stats(),
            duration_build_ms: self.stats.duration_build_ms,
            duration_solve_ms: self.stats.duration_solve_ms,
            duration_ms: 0.0,
        };
    }

    fn dump_stats(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config.output_dir)?;
        let path = self.config.output_dir.join(STATS_FILE_NAME);
        std::fs::write(&path, serde_json::to_string_pretty(&self.stats)?)?;
        info!(path = %path.display(), "Statistics written");
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════

    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn config(&self) -> &PtaConfig {
        &self.config
    }

    pub fn is_solved(&self) -> bool {
        self.solved
    }

    pub fn stats(&self) -> &PtaStats {
        &self.stats
    }

    pub fn pag(&self) -> &Pag {
        self.builder.pag()
    }

    pub fn builder(&self) -> &PagBuilder<'p> {
        &self.builder
    }

    pub fn call_graph(&self) -> &CallGraph {
        self.builder.call_graph()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════

    /// Nodes bound to `value` in every context, field clones included
    pub fn nodes_of_value(&self, value: &Value) -> Vec<NodeId> {
        let pag = self.builder.pag();
        let mut nodes = Vec::new();
        for node in pag.nodes_by_value(&PagValue::Ir(value.clone())) {
            nodes.push(*node);
            nodes.extend_from_slice(pag.clones_of(*node));
        }
        nodes.sort_unstable();
        nodes.dedup();
        nodes
    }

    /// Union of the points-to sets of every node bound to `value`, ascending
    pub fn points_to_of_value(&self, value: &Value) -> Vec<NodeId> {
        let pag = self.builder.pag();
        let mut pts: Vec<NodeId> = self
            .nodes_of_value(value)
            .into_iter()
            .flat_map(|n| pag.pts(n).to_vec())
            .collect();
        pts.sort_unstable();
        pts.dedup();
        pts
    }

    /// Whether `a` and `b` may point to a common object
    pub fn may_alias(&self, a: &Value, b: &Value) -> bool {
        let left = self.points_to_of_value(a);
        if left.is_empty() {
            return false;
        }
        let right: FxHashSet<NodeId> = self.points_to_of_value(b).into_iter().collect();
        left.iter().any(|n| right.contains(n))
    }

    pub fn no_alias(&self, a: &Value, b: &Value) -> bool {
        !self.may_alias(a, b)
    }

    /// IR values connected to `value` through Copy / This edges, in either direction
    pub fn related_values(&self, value: &Value) -> Vec<Value> {
        let pag = self.builder.pag();
        let mut visited: FxHashSet<NodeId> = FxHashSet::default();
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        for node in self.nodes_of_value(value) {
            if visited.insert(node) {
                queue.push_back(node);
            }
        }

        let mut seen: FxHashSet<&Value> = FxHashSet::default();
        let mut related = Vec::new();
        while let Some(node) = queue.pop_front() {
            if let Some(v) = pag.node(node).value.ir() {
                if v != value && seen.insert(v) {
                    related.push(v.clone());
                }
            }
            for kind in [PagEdgeKind::Copy, PagEdgeKind::This] {
                for next in pag.successors(node, kind).into_iter().chain(pag.predecessors(node, kind)) {
                    if visited.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }
        related
    }

    /// Signatures of functions with a body that no context reached
    pub fn unhandled_functions(&self) -> Vec<MethodSignature> {
        let cg = self.builder.call_graph();
        self.builder
            .unhandled_funcs()
            .into_iter()
            .map(|f| cg.node(f).signature.clone())
            .collect()
    }
}
