//! Triangle-pair merging for quad-dominant export.
//!
//! Authoring tools usually hand us fully triangulated meshes, but modeling
//! packages work better with quads. This pass greedily merges adjacent
//! triangle pairs back into quads when the result is close enough to
//! rectangular, and leaves everything else as triangles. It regroups
//! indices only — no vertex is ever dropped, duplicated, or reordered
//! within the vertex buffer.

use glam::Vec3;

/// Merge adjacent triangle pairs into quads.
///
/// `indices` is a triangle list (length a multiple of 3) into `points`.
/// Returns a flat polygon index stream plus a per-polygon vertex count
/// stream (3 or 4). A pair merges only when the triangles share exactly
/// one edge, their face normals do not oppose, and the merged quad's worst
/// corner angle deviates from 90° by strictly less than `threshold_angle`
/// degrees. Quadratic in triangle count; this runs once per export, not on
/// a hot path.
pub fn quadify_triangles(
    points: &[Vec3],
    indices: &[u32],
    threshold_angle: f32,
) -> (Vec<u32>, Vec<u32>) {
    let num_triangles = indices.len() / 3;
    let normals: Vec<Vec3> = (0..num_triangles)
        .map(|ti| face_normal(points, &indices[ti * 3..ti * 3 + 3]))
        .collect();

    let mut merged = vec![false; num_triangles];
    let mut out_indices = Vec::with_capacity(indices.len());
    let mut out_counts = Vec::with_capacity(num_triangles);

    for t1 in 0..num_triangles {
        if merged[t1] {
            continue;
        }
        let n1 = normals[t1];

        // Best candidate so far: (partner, score, ordered quad loop).
        // First candidate wins ties, so the result is stable in index order.
        let mut best: Option<(usize, f32, [u32; 4])> = None;
        for t2 in t1 + 1..num_triangles {
            if merged[t2] {
                continue;
            }
            let Some(corners) = shared_quad(indices, t1, t2) else {
                continue;
            };
            // A negative dot means the pair folds back on itself.
            if normals[t2].dot(n1) < 0.0 {
                continue;
            }
            let quad = order_quad(points, corners, n1);
            let score = worst_corner_deviation(points, &quad);
            // Degenerate corners score NaN; such a quad is never an
            // improvement over emitting the triangles as-is.
            if !score.is_finite() {
                continue;
            }
            if best.map_or(true, |(_, s, _)| score < s) {
                best = Some((t2, score, quad));
            }
        }

        match best {
            Some((t2, score, quad)) if score < threshold_angle => {
                merged[t1] = true;
                merged[t2] = true;
                out_indices.extend_from_slice(&quad);
                out_counts.push(4);
            }
            _ => {
                out_indices.extend_from_slice(&indices[t1 * 3..t1 * 3 + 3]);
                out_counts.push(3);
            }
        }
    }
    (out_indices, out_counts)
}

/// Face normal of a triangle, from the cross product of its two edges at
/// vertex 0. Zero for degenerate triangles.
fn face_normal(points: &[Vec3], tri: &[u32]) -> Vec3 {
    let p0 = points[tri[0] as usize];
    let p1 = points[tri[1] as usize];
    let p2 = points[tri[2] as usize];
    (p1 - p0).cross(p2 - p0).normalize_or_zero()
}

/// The four distinct vertex indices of two triangles sharing exactly one
/// edge, or `None` if they share fewer (or more) than two vertices.
fn shared_quad(indices: &[u32], t1: usize, t2: usize) -> Option<[u32; 4]> {
    let mut v = [
        indices[t1 * 3],
        indices[t1 * 3 + 1],
        indices[t1 * 3 + 2],
        indices[t2 * 3],
        indices[t2 * 3 + 1],
        indices[t2 * 3 + 2],
    ];
    v.sort_unstable();

    let mut distinct = [0u32; 6];
    let mut n = 0;
    for &i in &v {
        if n == 0 || distinct[n - 1] != i {
            distinct[n] = i;
            n += 1;
        }
    }
    if n == 4 {
        Some([distinct[0], distinct[1], distinct[2], distinct[3]])
    } else {
        None
    }
}

/// Order four corners into a consistent loop: sort by signed angle about
/// `normal`, measured from corner 0's direction off the centroid. Ascending
/// angle keeps the loop wound the same way as the first triangle.
fn order_quad(points: &[Vec3], corners: [u32; 4], normal: Vec3) -> [u32; 4] {
    let pos = corners.map(|i| points[i as usize]);
    let centroid = (pos[0] + pos[1] + pos[2] + pos[3]) / 4.0;
    let reference = pos[0] - centroid;

    let mut keyed: [(f32, u32); 4] = [(0.0, 0); 4];
    for k in 0..4 {
        let dir = pos[k] - centroid;
        let angle = reference.cross(dir).dot(normal).atan2(reference.dot(dir));
        keyed[k] = (angle, corners[k]);
    }
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    keyed.map(|(_, i)| i)
}

/// Worst deviation of any interior corner angle from 90°, in degrees.
fn worst_corner_deviation(points: &[Vec3], quad: &[u32; 4]) -> f32 {
    let pos = quad.map(|i| points[i as usize]);
    let mut worst = 0.0f32;
    for i in 0..4 {
        let a = pos[(i + 3) % 4] - pos[i];
        let b = pos[(i + 1) % 4] - pos[i];
        let angle = a.angle_between(b).to_degrees();
        worst = worst.max((angle - 90.0).abs());
    }
    worst
}
