#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use surfalign_3d as k3d;

#[doc(inline)]
pub use surfalign_icp as icp;
