//! Configuration for optimization runs and standalone queries

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How the working clustering is seeded before the first level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InitialClustering {
    /// Start from the groups currently assigned in the matrix
    #[default]
    ExistingGroups,

    /// Start with every item in its own cluster
    Singletons,
}

/// Parameters of the bid calculator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BidParams {
    /// Cluster size at which bids are not penalised
    pub optimal_cluster_size: f64,

    /// Exponent applied to each connection strength
    pub powdep: f64,

    /// Exponent applied to the relative cluster size
    pub powbid: f64,

    /// Use connection weights (true) or occurrence counts (false)
    pub count_by_weight: bool,
}

impl BidParams {
    /// Check that every parameter is usable
    pub fn validate(&self) -> Result<()> {
        positive("optimal_cluster_size", self.optimal_cluster_size)?;
        positive("powdep", self.powdep)?;
        positive("powbid", self.powbid)
    }
}

/// Parameters of the coordination cost scorer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostParams {
    /// Accepted for symmetry with [`BidParams`]; validated but not part of the cost formula
    pub optimal_cluster_size: f64,

    /// Exponent applied to cluster size in intra-cluster cost
    pub powcc: f64,

    /// Use connection weights (true) or occurrence counts (false)
    pub count_by_weight: bool,
}

impl CostParams {
    /// Check that every parameter is usable
    pub fn validate(&self) -> Result<()> {
        positive("optimal_cluster_size", self.optimal_cluster_size)?;
        positive("powcc", self.powcc)
    }
}

/// Configuration of a full optimization run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Cluster size at which bids are not penalised
    pub optimal_cluster_size: f64,

    /// Exponent applied to each connection strength in bids
    pub powdep: f64,

    /// Exponent applied to the relative cluster size in bids
    pub powbid: f64,

    /// Exponent applied to cluster size in intra-cluster cost
    pub powcc: f64,

    /// Larger values make choosing a non-best bid less likely
    pub rand_bid: f64,

    /// Larger values make accepting a cost increase less likely
    pub rand_accept: f64,

    /// Use connection weights (true) or occurrence counts (false)
    pub count_by_weight: bool,

    /// Number of levels (full passes over the items)
    pub num_levels: u32,

    /// PRNG seed
    pub rand_seed: i64,

    /// Emit per-level and per-move diagnostics at debug level
    pub debug: bool,

    /// Starting point of the search
    pub initial: InitialClustering,

    /// Worker threads for bid evaluation (0 = ambient rayon pool)
    pub threads: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            optimal_cluster_size: 4.0,
            powdep: 4.0,
            powbid: 1.0,
            powcc: 1.0,
            rand_bid: 122.0,
            rand_accept: 122.0,
            count_by_weight: true,
            num_levels: 1000,
            rand_seed: 0,
            debug: false,
            initial: InitialClustering::ExistingGroups,
            threads: 0,
        }
    }
}

impl OptimizerConfig {
    /// Create a configuration with the given size target and defaults elsewhere
    pub fn new(optimal_cluster_size: f64) -> Self {
        Self {
            optimal_cluster_size,
            ..Self::default()
        }
    }

    /// Set the bid and cost exponents
    pub fn with_exponents(mut self, powdep: f64, powbid: f64, powcc: f64) -> Self {
        self.powdep = powdep;
        self.powbid = powbid;
        self.powcc = powcc;
        self
    }

    /// Set the randomisation constants
    pub fn with_randomness(mut self, rand_bid: f64, rand_accept: f64) -> Self {
        self.rand_bid = rand_bid;
        self.rand_accept = rand_accept;
        self
    }

    /// Count connections by weight or by occurrence
    pub fn with_count_by_weight(mut self, count_by_weight: bool) -> Self {
        self.count_by_weight = count_by_weight;
        self
    }

    /// Set the number of levels
    pub fn with_levels(mut self, num_levels: u32) -> Self {
        self.num_levels = num_levels;
        self
    }

    /// Set the PRNG seed
    pub fn with_seed(mut self, rand_seed: i64) -> Self {
        self.rand_seed = rand_seed;
        self
    }

    /// Enable debug diagnostics
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Choose the starting clustering
    pub fn with_initial(mut self, initial: InitialClustering) -> Self {
        self.initial = initial;
        self
    }

    /// Set the number of worker threads (0 = ambient pool)
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Threads a dedicated pool would use: the configured count, or all cores
    pub fn worker_threads(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            num_cpus::get()
        }
    }

    /// Bid parameters derived from this configuration
    pub fn bid_params(&self) -> BidParams {
        BidParams {
            optimal_cluster_size: self.optimal_cluster_size,
            powdep: self.powdep,
            powbid: self.powbid,
            count_by_weight: self.count_by_weight,
        }
    }

    /// Cost parameters derived from this configuration
    pub fn cost_params(&self) -> CostParams {
        CostParams {
            optimal_cluster_size: self.optimal_cluster_size,
            powcc: self.powcc,
            count_by_weight: self.count_by_weight,
        }
    }

    /// Check every parameter before a run starts
    pub fn validate(&self) -> Result<()> {
        self.bid_params().validate()?;
        self.cost_params().validate()?;
        positive("rand_bid", self.rand_bid)?;
        positive("rand_accept", self.rand_accept)
    }
}

fn positive(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(Error::configuration(name, format!("must be finite, got {}", value)));
    }
    if value <= 0.0 {
        return Err(Error::configuration(name, format!("must be positive, got {}", value)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = OptimizerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.initial, InitialClustering::ExistingGroups);
        assert!(config.worker_threads() >= 1);
    }

    #[test]
    fn test_builder_setters() {
        let config = OptimizerConfig::new(3.0)
            .with_exponents(2.0, 1.5, 1.2)
            .with_randomness(50.0, 60.0)
            .with_count_by_weight(false)
            .with_levels(7)
            .with_seed(-9)
            .with_debug(true)
            .with_initial(InitialClustering::Singletons)
            .with_threads(2);

        assert_eq!(config.optimal_cluster_size, 3.0);
        assert_eq!(config.bid_params().powdep, 2.0);
        assert_eq!(config.bid_params().powbid, 1.5);
        assert_eq!(config.cost_params().powcc, 1.2);
        assert!(!config.cost_params().count_by_weight);
        assert_eq!(config.num_levels, 7);
        assert_eq!(config.rand_seed, -9);
        assert_eq!(config.worker_threads(), 2);
    }

    #[test]
    fn test_invalid_parameters_are_configuration_errors() {
        let cases = [
            OptimizerConfig::new(-1.0),
            OptimizerConfig::new(0.0),
            OptimizerConfig::default().with_exponents(0.0, 1.0, 1.0),
            OptimizerConfig::default().with_exponents(1.0, -2.0, 1.0),
            OptimizerConfig::default().with_exponents(1.0, 1.0, f64::NAN),
            OptimizerConfig::default().with_randomness(0.0, 1.0),
            OptimizerConfig::default().with_randomness(1.0, f64::INFINITY),
        ];
        for config in cases {
            assert!(matches!(config.validate(), Err(Error::Configuration { .. })));
        }
    }

    #[test]
    fn test_zero_levels_is_valid() {
        assert!(OptimizerConfig::default().with_levels(0).validate().is_ok());
    }

    #[test]
    fn test_config_serializes() {
        let config = OptimizerConfig::default().with_initial(InitialClustering::Singletons);
        let json = serde_json::to_string(&config).unwrap();
        let back: OptimizerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
