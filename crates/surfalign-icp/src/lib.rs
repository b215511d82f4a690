#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

mod error;
mod input;
pub use error::IcpError;

/// Convergence checks on the sequence of estimated transforms.
pub mod checker;

/// Filters applied to the point clouds before iterating.
pub mod filters;

/// The iterative closest point loop.
pub mod icp;

/// Nearest neighbor correspondence search.
pub mod matcher;

/// Registration quality metrics.
pub mod metrics;

/// Transform estimation from weighted correspondences.
pub mod minimizer;

/// Rejection of outlier correspondences.
pub mod outlier;

/// Homogeneous point cloud container.
pub mod pointcloud;

/// Rigid registration of triangle meshes.
pub mod rigid;

/// Similarity registration of triangle meshes.
pub mod similarity;

pub use icp::{Icp, IcpOutcome};
pub use rigid::{rigid_icp, rigid_icp_from_paths, rigid_icp_meshes, RigidIcpParams, RigidResult};
pub use similarity::{
    similarity_icp, similarity_icp_meshes, similarity_icp_with_rng, SimilarityIcpParams,
    SimilarityResult,
};
