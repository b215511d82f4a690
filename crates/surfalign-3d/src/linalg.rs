use glam::{DMat3, DVec3};

/// Singular value decomposition of a 3x3 matrix `M = U * diag(S) * V^T`.
#[derive(Debug, Clone, Copy)]
pub struct Svd3 {
    /// Left singular vectors as columns.
    pub u: DMat3,
    /// Singular values in non-increasing order.
    pub s: DVec3,
    /// Right singular vectors as columns.
    pub v: DMat3,
}

fn faer_to_dmat3(m: faer::MatRef<'_, f64>) -> DMat3 {
    DMat3::from_cols(
        DVec3::new(m.read(0, 0), m.read(1, 0), m.read(2, 0)),
        DVec3::new(m.read(0, 1), m.read(1, 1), m.read(2, 1)),
        DVec3::new(m.read(0, 2), m.read(1, 2), m.read(2, 2)),
    )
}

/// Compute the singular value decomposition of a 3x3 matrix.
pub fn svd3(m: &DMat3) -> Svd3 {
    let mat = faer::Mat::<f64>::from_fn(3, 3, |i, j| m.col(j)[i]);
    let svd = mat.svd();
    let s = svd.s_diagonal();
    Svd3 {
        u: faer_to_dmat3(svd.u()),
        s: DVec3::new(s.read(0), s.read(1), s.read(2)),
        v: faer_to_dmat3(svd.v()),
    }
}

/// Project a matrix to the closest rotation, keeping a right-handed frame.
///
/// Computes `M = U * S * V^T` and returns `R = U * V^T`. If `R` is a reflection
/// the column of `U` associated with the smallest singular value is negated and
/// the returned sign is `-1.0`, otherwise it is `1.0`.
///
/// The returned matrix always satisfies `det(R) = +1`.
///
/// # Arguments
///
/// * `m` - A 3x3 matrix, typically a noisy rotation or a cross covariance.
///
/// # Returns
///
/// The rotation matrix and the sign applied to the smallest singular direction.
pub fn orthonormalize_with_consistent_handedness(m: &DMat3) -> (DMat3, f64) {
    let Svd3 { u, s, v } = svd3(m);

    let r = u * v.transpose();
    if r.determinant() >= 0.0 {
        return (r, 1.0);
    }

    // faer sorts the singular values, but pick the smallest explicitly
    let smallest = if s.x <= s.y && s.x <= s.z {
        0
    } else if s.y <= s.z {
        1
    } else {
        2
    };

    let mut u_flipped = u;
    match smallest {
        0 => u_flipped.x_axis = -u.x_axis,
        1 => u_flipped.y_axis = -u.y_axis,
        _ => u_flipped.z_axis = -u.z_axis,
    }

    (u_flipped * v.transpose(), -1.0)
}

/// Skew symmetric matrix such that `skew(w) * v == w.cross(v)`.
pub fn skew(w: DVec3) -> DMat3 {
    DMat3::from_cols(
        DVec3::new(0.0, w.z, -w.y),
        DVec3::new(-w.z, 0.0, w.x),
        DVec3::new(w.y, -w.x, 0.0),
    )
}
