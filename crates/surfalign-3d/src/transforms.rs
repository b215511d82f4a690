use glam::{DMat3, DMat4, DVec3, DVec4};

/// Error types for the transforms module.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// The rotation axis has zero length.
    #[error("cannot compute rotation matrix from a zero vector")]
    ZeroAxis,
}

/// Compute the rotation matrix from an axis and angle.
///
/// # Arguments
///
/// * `axis` - The axis of rotation, normalized internally.
/// * `angle` - The angle of rotation in radians.
///
/// # Returns
///
/// The rotation matrix.
///
/// Example:
///
/// ```
/// use glam::DVec3;
/// use surfalign_3d::transforms::axis_angle_to_rotation_matrix;
///
/// let rotation = axis_angle_to_rotation_matrix(&DVec3::X, std::f64::consts::PI / 2.0).unwrap();
/// assert!((rotation * DVec3::Y).abs_diff_eq(DVec3::Z, 1e-12));
/// ```
pub fn axis_angle_to_rotation_matrix(axis: &DVec3, angle: f64) -> Result<DMat3, TransformError> {
    let magnitude = axis.length();
    if magnitude < 1e-10 {
        return Err(TransformError::ZeroAxis);
    }
    let DVec3 { x, y, z } = *axis / magnitude;

    let c = angle.cos();
    let s = angle.sin();
    let t = 1.0 - c;

    let m00 = c + x * x * t;
    let m11 = c + y * y * t;
    let m22 = c + z * z * t;

    let tmp1 = x * y * t;
    let tmp2 = z * s;
    let m10 = tmp1 + tmp2;
    let m01 = tmp1 - tmp2;

    let tmp3 = x * z * t;
    let tmp4 = y * s;
    let m20 = tmp3 - tmp4;
    let m02 = tmp3 + tmp4;

    let tmp5 = y * z * t;
    let tmp6 = x * s;
    let m12 = tmp5 - tmp6;
    let m21 = tmp5 + tmp6;

    Ok(DMat3::from_cols(
        DVec3::new(m00, m10, m20),
        DVec3::new(m01, m11, m21),
        DVec3::new(m02, m12, m22),
    ))
}

/// Angle in radians of a rotation matrix, in `[0, pi]`.
pub fn rotation_angle(rotation: &DMat3) -> f64 {
    let trace = rotation.x_axis.x + rotation.y_axis.y + rotation.z_axis.z;
    ((trace - 1.0) * 0.5).clamp(-1.0, 1.0).acos()
}

/// Angle in radians of the relative rotation `a^T * b`.
pub fn angular_distance(a: &DMat3, b: &DMat3) -> f64 {
    rotation_angle(&(a.transpose() * *b))
}

/// Assemble the homogeneous matrix of `p' = scale * R * p + t`.
pub fn similarity_transform(scale: f64, rotation: &DMat3, translation: &DVec3) -> DMat4 {
    let linear = *rotation * scale;
    DMat4::from_cols(
        linear.x_axis.extend(0.0),
        linear.y_axis.extend(0.0),
        linear.z_axis.extend(0.0),
        DVec4::new(translation.x, translation.y, translation.z, 1.0),
    )
}

/// The upper left 3x3 block of a homogeneous matrix.
#[inline]
pub fn linear_part(transform: &DMat4) -> DMat3 {
    DMat3::from_mat4(*transform)
}

/// The translation column of a homogeneous matrix.
#[inline]
pub fn translation_part(transform: &DMat4) -> DVec3 {
    transform.w_axis.truncate()
}
