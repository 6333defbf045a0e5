use nalgebra::{Point3, Vector3};

/// Places a fourth atom from internal coordinates relative to three reference atoms.
///
/// `bond` is the `c-d` distance, `angle_deg` the `b-c-d` angle and `torsion_deg` the
/// `a-b-c-d` dihedral. Returns `None` when the reference atoms are collinear or coincident.
pub fn place_atom(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    bond: f64,
    angle_deg: f64,
    torsion_deg: f64,
) -> Option<Point3<f64>> {
    let bc = (c - b).try_normalize(1e-8)?;
    let n = (b - a).cross(&bc).try_normalize(1e-8)?;
    let m = n.cross(&bc);

    let theta = angle_deg.to_radians();
    let phi = torsion_deg.to_radians();
    let local = Vector3::new(
        -bond * theta.cos(),
        bond * theta.sin() * phi.cos(),
        bond * theta.sin() * phi.sin(),
    );
    Some(c + bc * local.x + m * local.y + n * local.z)
}

/// Dihedral angle `a-b-c-d` in degrees, in `(-180, 180]`.
pub fn dihedral(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>, d: &Point3<f64>) -> f64 {
    let b1 = b - a;
    let b2 = c - b;
    let b3 = d - c;
    let n1 = b1.cross(&b2);
    let n2 = b2.cross(&b3);
    let b2_unit = b2.normalize();
    let y = b2_unit.dot(&n1.cross(&n2));
    let x = n1.dot(&n2);
    y.atan2(x).to_degrees()
}

/// Angle `a-b-c` in degrees.
pub fn angle(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    let u = a - b;
    let v = c - b;
    let denom = u.norm() * v.norm();
    if denom < 1e-12 {
        return 0.0;
    }
    (u.dot(&v) / denom).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Signed volume `v1 . (v2 x v3)` of three substituents taken around a center.
pub fn signed_volume(
    center: &Point3<f64>,
    s1: &Point3<f64>,
    s2: &Point3<f64>,
    s3: &Point3<f64>,
) -> f64 {
    let v1 = s1 - center;
    let v2 = s2 - center;
    let v3 = s3 - center;
    v1.dot(&v2.cross(&v3))
}

/// Third substituent of a trigonal planar center, opposite the bisector of its two known
/// neighbors.
pub fn sp2_third_position(
    center: &Point3<f64>,
    n1: &Point3<f64>,
    n2: &Point3<f64>,
    bond: f64,
) -> Option<Point3<f64>> {
    let u1 = (n1 - center).try_normalize(1e-8)?;
    let u2 = (n2 - center).try_normalize(1e-8)?;
    let bisector = (u1 + u2).try_normalize(1e-8)?;
    Some(center - bisector * bond)
}

pub fn calculate_rmsd(coords1: &[Point3<f64>], coords2: &[Point3<f64>]) -> Option<f64> {
    if coords1.len() != coords2.len() || coords1.is_empty() {
        return None;
    }
    let n = coords1.len() as f64;
    let squared_dist_sum: f64 = coords1
        .iter()
        .zip(coords2.iter())
        .map(|(p1, p2)| (p1 - p2).norm_squared())
        .sum();
    Some((squared_dist_sum / n).sqrt())
}
