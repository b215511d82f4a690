#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// I/O utilities for reading triangle meshes.
pub mod io;

/// Linear algebra utilities.
pub mod linalg;

/// Triangle meshes and raw mesh matrices.
pub mod mesh;

/// Area-uniform sampling of triangle surfaces.
pub mod sampling;

/// Spatial queries on triangle meshes.
pub mod spatial;

/// 3D transforms algorithms.
pub mod transforms;
