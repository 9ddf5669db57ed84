//! Bid-based clustering of symmetric dependency structure matrices (DSM)
//!
//! The engine partitions the items of a symmetric DSM into clusters that
//! minimise a coordination cost, following Thebeau's bid/accept heuristic.
//! Runs are pure functions of (matrix snapshot, parameters, seed): the input
//! matrix is only read, and the final grouping is written into a copy.
//!
//! ```rust
//! use dsm_cluster::{run_optimization, MatrixBuilder, OptimizerConfig};
//!
//! let mut builder = MatrixBuilder::with_capacity("example", 3);
//! builder.connect_weighted("A", "B", 2.0).connect("B", "C");
//! let matrix = builder.build().unwrap();
//!
//! let config = OptimizerConfig::new(2.0).with_levels(50).with_seed(7);
//! let result = run_optimization(&matrix, &config).unwrap();
//! assert_eq!(result.clustering.len(), 3);
//! assert_eq!(result.history.len(), 50);
//! ```

pub mod cluster;
pub mod config;
pub mod error;
pub mod matrix;
pub mod rng;
pub mod worker;

pub use cluster::bid::calculate_cluster_bids;
pub use cluster::cost::{get_coordination_score, score_clustering, CoordinationReport};
pub use cluster::materialize::materialize;
pub use cluster::optimizer::{
    run_optimization, run_optimization_with_rng, LevelSummary, OptimizationResult,
};
pub use cluster::Clustering;
pub use config::{BidParams, CostParams, InitialClustering, OptimizerConfig};
pub use error::{Error, Result};
pub use matrix::{
    ClusterId, ClusteredMatrix, Connection, Grouping, Item, ItemId, MatrixBuilder, MatrixView,
    SymmetricMatrix,
};
pub use worker::{spawn_optimization, OptimizationHandle};
