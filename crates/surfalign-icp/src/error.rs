use surfalign_3d::{io::MeshIoError, mesh::MeshError};

/// Error types for the registration pipeline.
#[derive(Debug, thiserror::Error)]
pub enum IcpError {
    /// The input data is not valid for registration.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Mesh validation or sampling failed.
    #[error(transparent)]
    Mesh(#[from] MeshError),

    /// A mesh file could not be read.
    #[error("Failed to read mesh file: {0}")]
    FileRead(#[from] MeshIoError),

    /// No correspondence survived the outlier filters.
    #[error("No correspondences left after outlier rejection")]
    NoCorrespondences,

    /// A linear solve produced a non finite result.
    #[error("Solver failure: {0}")]
    Solver(String),
}
