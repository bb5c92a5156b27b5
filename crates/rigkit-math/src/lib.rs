pub use glam::*;

/// Up hint used whenever a forward/up pair turns out (nearly) parallel and
/// the cross product no longer yields a usable right axis.
pub const FALLBACK_UP: Vec3 = Vec3::Z;

const DEGENERATE_EPS: f32 = 1e-8;

/// Returns a unit vector perpendicular to `dir`.
///
/// Tries [`FALLBACK_UP`] first and falls back to the x-axis when `dir` is
/// itself parallel to the fallback, so the result is always well-defined for
/// finite non-zero input.
#[inline]
pub fn any_perpendicular(dir: Vec3) -> Vec3 {
    let p = dir.cross(FALLBACK_UP);
    if p.length_squared() > DEGENERATE_EPS {
        return p.normalize();
    }
    dir.cross(Vec3::X).normalize()
}

/// Builds a right-handed orthonormal basis with `forward` as its third
/// column. `up` only supplies the twist reference and does not need to be
/// orthogonal to `forward`; a parallel pair falls back to [`FALLBACK_UP`].
#[inline]
pub fn orthonormal_basis(forward: Vec3, up: Vec3) -> Mat3 {
    let f = forward.normalize();
    let mut r = f.cross(up);
    if r.length_squared() < DEGENERATE_EPS {
        r = f.cross(FALLBACK_UP);
        if r.length_squared() < DEGENERATE_EPS {
            r = f.cross(Vec3::X);
        }
    }
    let r = r.normalize();
    let u = r.cross(f);
    Mat3::from_cols(r, u, f)
}

/// Quaternion rotating the reference forward/up pair onto the desired
/// forward/up pair.
///
/// Both pairs are orthonormalized through [`orthonormal_basis`], so the
/// result is `basis(desired) * basis(reference)^-1` and maps the reference
/// forward axis exactly onto the desired forward direction.
#[inline]
pub fn look_rotation(forward: Vec3, up: Vec3, ref_forward: Vec3, ref_up: Vec3) -> Quat {
    let desired = orthonormal_basis(forward, up);
    let reference = orthonormal_basis(ref_forward, ref_up);
    Quat::from_mat3(&(desired * reference.transpose())).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-5, "{:?} != {:?}", a, b);
    }

    #[test]
    fn basis_is_orthonormal() {
        let m = orthonormal_basis(Vec3::new(1.0, 2.0, 0.5), Vec3::new(0.1, 1.0, 0.0));
        let (r, u, f) = (m.x_axis, m.y_axis, m.z_axis);
        assert!((r.length() - 1.0).abs() < 1e-5);
        assert!((u.length() - 1.0).abs() < 1e-5);
        assert!((f.length() - 1.0).abs() < 1e-5);
        assert!(r.dot(u).abs() < 1e-5);
        assert!(r.dot(f).abs() < 1e-5);
        assert!(u.dot(f).abs() < 1e-5);
    }

    #[test]
    fn look_rotation_maps_reference_onto_target() {
        let q = look_rotation(Vec3::Y, Vec3::Z, Vec3::X, Vec3::Y);
        assert_close(q * Vec3::X, Vec3::Y);

        let forward = Vec3::new(0.3, -1.0, 2.0).normalize();
        let q = look_rotation(forward, Vec3::Y, Vec3::X, Vec3::Y);
        assert_close(q * Vec3::X, forward);
    }

    #[test]
    fn parallel_forward_up_falls_back() {
        // Forward and up colinear: right axis is undefined without a fallback.
        let q = look_rotation(Vec3::Y, Vec3::Y, Vec3::X, Vec3::Y);
        assert!(q.is_finite());
        assert_close(q * Vec3::X, Vec3::Y);

        // Forward parallel to the fallback itself.
        let q = look_rotation(FALLBACK_UP, FALLBACK_UP, Vec3::X, Vec3::Y);
        assert!(q.is_finite());
        assert_close(q * Vec3::X, FALLBACK_UP);
    }

    #[test]
    fn any_perpendicular_is_perpendicular() {
        for dir in [Vec3::X, Vec3::Y, Vec3::Z, Vec3::new(0.2, -0.7, 0.4)] {
            let p = any_perpendicular(dir);
            assert!((p.length() - 1.0).abs() < 1e-5);
            assert!(p.dot(dir).abs() < 1e-5);
        }
    }
}
