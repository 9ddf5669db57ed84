//! Bid-based clustering optimizer (Thebeau)
//!
//! Each level visits every item in ascending id order. The item collects bids
//! from all non-empty clusters plus a new-singleton option, picks the best
//! one (or, occasionally, a random other one), and tentatively moves there.
//! The move is kept when the coordination cost drops, or when the
//! randomised acceptance draw allows it; otherwise it is rolled back. Empty
//! clusters are pruned at the end of every level.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::cluster::bid::bids_for_item;
use crate::cluster::cost::{score, CoordinationReport};
use crate::cluster::materialize::materialize;
use crate::cluster::{Assignment, Clustering};
use crate::config::{BidParams, CostParams, InitialClustering, OptimizerConfig};
use crate::error::{Error, Result};
use crate::matrix::{ClusterId, ClusteredMatrix, WeightedAdjacency};
use crate::rng;

/// Statistics of one completed level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSummary {
    /// Zero-based level number
    pub level: u32,

    /// Total coordination cost after the level
    pub cost: f64,

    /// Moves kept because they lowered the cost
    pub accepted: usize,

    /// Moves kept by the randomised acceptance draw
    pub random_accepts: usize,

    /// Moves rolled back
    pub rejected: usize,

    /// Visits where a non-best bid was chosen
    pub random_bids: usize,

    /// Clusters remaining after pruning
    pub cluster_count: usize,
}

/// Output of a full optimization run
#[derive(Debug, Clone)]
pub struct OptimizationResult<M> {
    /// Copy of the input matrix carrying the final grouping
    pub matrix: M,

    /// Final item → cluster mapping
    pub clustering: Clustering,

    /// One entry per completed level
    pub history: Vec<LevelSummary>,

    /// Coordination cost of the final clustering
    pub report: CoordinationReport,
}

impl<M> OptimizationResult<M> {
    /// Cost after each level
    pub fn cost_trajectory(&self) -> Vec<f64> {
        self.history.iter().map(|level| level.cost).collect()
    }
}

/// A place an item can bid to move to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Candidate {
    Existing(ClusterId),
    NewSingleton,
}

/// Outcome of the acceptance phase for one tentative move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Improved,
    RandomAccept,
    Rejected,
}

/// Outcome of the selection phase for one item
struct Selection {
    target: ClusterId,
    deviated: bool,
}

/// Immutable state shared by every step of one run
struct Search<'a> {
    adj: &'a WeightedAdjacency,
    config: &'a OptimizerConfig,
    bid_params: BidParams,
    cost_params: CostParams,
    pool: Option<rayon::ThreadPool>,
}

impl<'a> Search<'a> {
    fn new(adj: &'a WeightedAdjacency, config: &'a OptimizerConfig) -> Result<Self> {
        let pool = if config.threads > 0 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(config.threads)
                    .thread_name(|i| format!("dsm-bid-{}", i))
                    .build()?,
            )
        } else {
            None
        };

        Ok(Self {
            adj,
            config,
            bid_params: config.bid_params(),
            cost_params: config.cost_params(),
            pool,
        })
    }

    fn cost(&self, assignment: &Assignment) -> f64 {
        score(self.adj, assignment, &self.cost_params).total_cost
    }

    fn bids(&self, assignment: &Assignment, item: usize, clusters: &[ClusterId]) -> Vec<f64> {
        let compute = || bids_for_item(self.adj, assignment, item, clusters, &self.bid_params);
        match &self.pool {
            Some(pool) => pool.install(compute),
            None => compute(),
        }
    }

    /// Selection phase: choose where `item` should try to go.
    fn select<R: Rng>(&self, assignment: &Assignment, item: usize, rng: &mut R) -> Selection {
        let alone = assignment.size(assignment.cluster_of(item)) == 1;
        let clusters = assignment.cluster_ids();
        let bids = self.bids(assignment, item, &clusters);

        let mut candidates: Vec<Candidate> =
            clusters.iter().map(|&c| Candidate::Existing(c)).collect();
        // Already alone: a new singleton would be the same as staying
        if !alone {
            candidates.push(Candidate::NewSingleton);
        }

        // Highest positive bid wins; strict comparison keeps the lowest id on
        // ties and NaN never compares greater
        let mut best: Option<usize> = None;
        let mut best_bid = 0.0;
        for (idx, &bid) in bids.iter().enumerate() {
            if bid > best_bid {
                best = Some(idx);
                best_bid = bid;
            }
        }
        // Nothing bids above 0: every candidate ties and one is drawn uniformly
        let best = match best {
            Some(idx) => idx,
            None if candidates.len() > 1 => rng::pick_index(rng, candidates.len()),
            None => 0,
        };

        let mut chosen = best;
        let mut deviated = false;
        if rng::draw_hits(rng, self.config.rand_bid) && candidates.len() > 1 {
            let k = rng::pick_index(rng, candidates.len() - 1);
            chosen = if k >= best { k + 1 } else { k };
            deviated = true;
        }

        let target = match candidates[chosen] {
            Candidate::Existing(c) => c,
            Candidate::NewSingleton => assignment.peek_new_id(),
        };
        Selection { target, deviated }
    }
}

/// Run the optimizer with a generator seeded from `config.rand_seed`.
///
/// The input matrix is never modified; the final grouping is written into a
/// copy once every level has completed.
pub fn run_optimization<M: ClusteredMatrix + Clone>(
    matrix: &M,
    config: &OptimizerConfig,
) -> Result<OptimizationResult<M>> {
    let mut rng = rng::seeded(config.rand_seed);
    optimize(matrix, config, &mut rng, None)
}

/// Run the optimizer drawing every random decision from `rng`.
pub fn run_optimization_with_rng<M: ClusteredMatrix + Clone, R: Rng>(
    matrix: &M,
    config: &OptimizerConfig,
    rng: &mut R,
) -> Result<OptimizationResult<M>> {
    optimize(matrix, config, rng, None)
}

pub(crate) fn optimize<M: ClusteredMatrix + Clone, R: Rng>(
    matrix: &M,
    config: &OptimizerConfig,
    rng: &mut R,
    cancel: Option<&AtomicBool>,
) -> Result<OptimizationResult<M>> {
    config.validate()?;

    let adj = WeightedAdjacency::from_view(matrix);
    let mut assignment = match config.initial {
        InitialClustering::ExistingGroups => Assignment::from_view(matrix, &adj),
        InitialClustering::Singletons => Assignment::singletons(matrix, &adj),
    };
    let search = Search::new(&adj, config)?;
    let n = adj.item_count();

    log::info!(
        "Optimizing {} items with {} connections over {} levels (seed {})",
        n,
        adj.edges().len(),
        config.num_levels,
        config.rand_seed
    );

    let mut history = Vec::with_capacity((config.num_levels as usize).min(4096));
    let mut current_cost = search.cost(&assignment);

    if n > 0 {
        for level in 0..config.num_levels {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                log::info!("Optimization cancelled after {} levels", level);
                return Err(Error::Cancelled {
                    completed_levels: level,
                });
            }

            let mut summary = LevelSummary {
                level,
                cost: current_cost,
                accepted: 0,
                random_accepts: 0,
                rejected: 0,
                random_bids: 0,
                cluster_count: 0,
            };

            for item in 0..n {
                let selection = search.select(&assignment, item, rng);
                if selection.deviated {
                    summary.random_bids += 1;
                }

                let source = assignment.cluster_of(item);
                if selection.target == source {
                    continue;
                }

                assignment.move_item(item, selection.target);
                let new_cost = search.cost(&assignment);

                let decision = if new_cost < current_cost {
                    summary.accepted += 1;
                    Decision::Improved
                } else if rng::draw_hits(rng, config.rand_accept) {
                    summary.random_accepts += 1;
                    Decision::RandomAccept
                } else {
                    summary.rejected += 1;
                    Decision::Rejected
                };

                if config.debug {
                    log::debug!(
                        "level {} item {}: {} -> {} cost {} -> {} {:?}",
                        level,
                        adj.item_id(item),
                        source,
                        selection.target,
                        current_cost,
                        new_cost,
                        decision
                    );
                }

                if decision == Decision::Rejected {
                    assignment.revert_move(item, source);
                } else {
                    current_cost = new_cost;
                }
            }

            assignment.prune_empty();
            summary.cost = current_cost;
            summary.cluster_count = assignment.cluster_ids().len();

            if config.debug {
                log::debug!(
                    "level {}: cost {} clusters {} accepted {} random {} rejected {}",
                    level,
                    summary.cost,
                    summary.cluster_count,
                    summary.accepted,
                    summary.random_accepts,
                    summary.rejected
                );
            }
            history.push(summary);
        }
    }

    let clustering = assignment.to_clustering(&adj);
    let report = score(&adj, &assignment, &search.cost_params);
    let output = materialize(matrix, &clustering);

    log::info!(
        "Optimization finished: {} clusters, cost {}",
        report.cluster_count(),
        report.total_cost
    );

    Ok(OptimizationResult {
        matrix: output,
        clustering,
        history,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::{MatrixBuilder, SymmetricMatrix};

    fn two_triangles() -> SymmetricMatrix {
        let mut b = MatrixBuilder::with_capacity("triangles", 6);
        b.connect("a1", "a2").connect("a2", "a3").connect("a1", "a3");
        b.connect("b1", "b2").connect("b2", "b3").connect("b1", "b3");
        b.build().unwrap()
    }

    /// Deterministic greedy settings: random branches are practically never taken
    fn greedy(levels: u32) -> OptimizerConfig {
        OptimizerConfig::new(3.0)
            .with_exponents(1.0, 1.0, 1.0)
            .with_randomness(1e300, 1e300)
            .with_levels(levels)
            .with_initial(InitialClustering::Singletons)
    }

    #[test]
    fn test_greedy_run_finds_both_triangles() {
        let m = two_triangles();
        let result = run_optimization(&m, &greedy(5)).unwrap();
        let c = &result.clustering;

        assert!(c.same_cluster(0, 1) && c.same_cluster(1, 2));
        assert!(c.same_cluster(3, 4) && c.same_cluster(4, 5));
        assert!(!c.same_cluster(0, 3));
        assert_eq!(c.cluster_count(), 2);
        // Two clusters of three with three internal connections each
        assert_eq!(result.report.total_cost, 18.0);
        assert_eq!(result.report.total_extra_cost, 0.0);
    }

    #[test]
    fn test_first_level_moves_and_costs() {
        let m = two_triangles();
        let result = run_optimization(&m, &greedy(2)).unwrap();

        let first = &result.history[0];
        assert_eq!(first.level, 0);
        assert_eq!(first.accepted, 4);
        assert_eq!(first.rejected, 0);
        assert_eq!(first.random_accepts, 0);
        assert_eq!(first.cost, 18.0);
        assert_eq!(first.cluster_count, 2);

        // Nothing left to improve
        let second = &result.history[1];
        assert_eq!(second.accepted + second.random_accepts + second.rejected, 0);
        assert_eq!(result.cost_trajectory(), vec![18.0, 18.0]);
    }

    #[test]
    fn test_history_cost_matches_report() {
        let m = two_triangles();
        let config = OptimizerConfig::new(2.0).with_levels(20).with_seed(5);
        let result = run_optimization(&m, &config).unwrap();
        assert_eq!(result.history.len(), 20);
        assert_eq!(result.history.last().unwrap().cost, result.report.total_cost);
    }

    #[test]
    fn test_select_prefers_lowest_id_on_tie() {
        let m = two_triangles();
        let adj = WeightedAdjacency::from_view(&m);
        let config = greedy(1);
        let search = Search::new(&adj, &config).unwrap();
        let assignment = Assignment::singletons(&m, &adj);
        let mut rng = rng::seeded(0);

        // a1 ties between a2's and a3's singletons
        let selection = search.select(&assignment, 0, &mut rng);
        assert_eq!(selection.target, assignment.cluster_of(1));
        assert!(!selection.deviated);
    }

    #[test]
    fn test_select_draws_uniformly_without_positive_bid() {
        let mut b = MatrixBuilder::with_capacity("m", 3);
        let g = b.group("all");
        b.assign("x", g).assign("y", g).assign("z", g).connect("y", "z");
        let m = b.build().unwrap();

        let adj = WeightedAdjacency::from_view(&m);
        let config = greedy(1).with_initial(InitialClustering::ExistingGroups);
        let search = Search::new(&adj, &config).unwrap();
        let assignment = Assignment::from_view(&m, &adj);
        let mut rng = rng::seeded(0);

        // x bids 0 on its own cluster and on a new singleton
        let mut stay = 0;
        let mut alone = 0;
        for _ in 0..1000 {
            let selection = search.select(&assignment, 0, &mut rng);
            assert!(!selection.deviated);
            if selection.target == g {
                stay += 1;
            } else {
                assert_eq!(selection.target, assignment.peek_new_id());
                alone += 1;
            }
        }
        assert!((400..=600).contains(&stay), "stayed {} times", stay);
        assert!((400..=600).contains(&alone), "left {} times", alone);
    }

    #[test]
    fn test_select_lone_isolated_item_draws_among_clusters() {
        let mut b = MatrixBuilder::with_capacity("m", 3);
        b.item("x");
        b.connect("y", "z");
        let m = b.build().unwrap();

        let adj = WeightedAdjacency::from_view(&m);
        let config = greedy(1).with_initial(InitialClustering::ExistingGroups);
        let search = Search::new(&adj, &config).unwrap();
        let assignment = Assignment::from_view(&m, &adj);
        let mut rng = rng::seeded(0);

        // Alone with nothing bidding: its own cluster competes with y's and z's
        let mut stay = 0;
        for _ in 0..900 {
            if search.select(&assignment, 0, &mut rng).target == assignment.cluster_of(0) {
                stay += 1;
            }
        }
        assert!((220..=380).contains(&stay), "stayed {} times", stay);
    }

    #[test]
    fn test_always_deviating_never_picks_best() {
        let m = two_triangles();
        let adj = WeightedAdjacency::from_view(&m);
        let config = greedy(1).with_randomness(1.0, 1e300);
        let search = Search::new(&adj, &config).unwrap();
        let assignment = Assignment::singletons(&m, &adj);
        let mut rng = rng::seeded(9);

        for _ in 0..50 {
            let selection = search.select(&assignment, 0, &mut rng);
            assert!(selection.deviated);
            assert_ne!(selection.target, assignment.cluster_of(1));
        }
    }

    #[test]
    fn test_dedicated_pool_gives_same_result() {
        let m = two_triangles();
        let config = OptimizerConfig::new(2.0).with_levels(30).with_seed(17);
        let ambient = run_optimization(&m, &config).unwrap();
        let pooled = run_optimization(&m, &config.clone().with_threads(2)).unwrap();
        assert_eq!(ambient.clustering, pooled.clustering);
        assert_eq!(ambient.history, pooled.history);
    }

    #[test]
    fn test_debug_mode_does_not_change_results() {
        let _ = env_logger::builder().is_test(true).try_init();
        let m = two_triangles();
        let config = OptimizerConfig::new(2.0).with_levels(15).with_seed(3);
        let quiet = run_optimization(&m, &config).unwrap();
        let noisy = run_optimization(&m, &config.clone().with_debug(true)).unwrap();
        assert_eq!(quiet.clustering, noisy.clustering);
        assert_eq!(quiet.history, noisy.history);
    }

    #[test]
    fn test_cancel_flag_stops_before_first_level() {
        let m = two_triangles();
        let flag = AtomicBool::new(true);
        let mut rng = rng::seeded(0);
        let result = optimize(&m, &greedy(10), &mut rng, Some(&flag));
        assert!(matches!(result, Err(Error::Cancelled { completed_levels: 0 })));
    }
}
