use thiserror::Error;

/// Invalid simulation parameters. Always fatal: raised before the first event runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("number of nodes must be positive")]
    NoNodes,

    #[error("num_neighbours must be positive when there are {num_nodes} nodes")]
    NoNeighbours { num_nodes: usize },

    #[error("num_neighbours ({num_neighbours}) must be smaller than num_nodes ({num_nodes})")]
    TooManyNeighbours {
        num_nodes: usize,
        num_neighbours: usize,
    },

    #[error("no {num_neighbours}-regular graph on {num_nodes} nodes: num_nodes * num_neighbours is odd")]
    OddDegreeSum {
        num_nodes: usize,
        num_neighbours: usize,
    },

    #[error("random regular graph construction gave up after {attempts} attempts")]
    TopologyConstruction { attempts: usize },

    #[error("edge ({0}, {1}) references an unknown node or is a self-loop")]
    InvalidEdge(usize, usize),

    #[error("invalid distribution {what}: {reason}")]
    InvalidDistribution { what: &'static str, reason: String },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}
