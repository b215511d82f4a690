use glam::DVec3;

use crate::mesh::TriMesh;

const LEAF_SIZE: usize = 4;

/// Closest point on a triangle to a query point.
///
/// Region classification after Ericson, "Real-Time Collision Detection" (2005), 5.1.5.
pub fn closest_point_on_triangle(p: DVec3, a: DVec3, b: DVec3, c: DVec3) -> DVec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = va + vb + vc;
    if denom.abs() < f64::MIN_POSITIVE {
        // collinear corners that slipped through the region tests
        return a;
    }
    let v = vb / denom;
    let w = vc / denom;
    a + ab * v + ac * w
}

/// Axis aligned bounding box.
#[derive(Debug, Clone, Copy)]
struct Aabb {
    min: DVec3,
    max: DVec3,
}

impl Aabb {
    fn empty() -> Self {
        Self {
            min: DVec3::splat(f64::INFINITY),
            max: DVec3::splat(f64::NEG_INFINITY),
        }
    }

    fn grow(&mut self, p: DVec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Squared distance from a point to the box, zero inside.
    fn squared_distance(&self, p: DVec3) -> f64 {
        let d = (self.min - p).max(DVec3::ZERO).max(p - self.max);
        d.length_squared()
    }
}

#[derive(Debug)]
enum NodeKind {
    Leaf { start: usize, end: usize },
    Inner { left: usize, right: usize },
}

#[derive(Debug)]
struct Node {
    bbox: Aabb,
    kind: NodeKind,
}

/// Result of a closest point query on a mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestPoint {
    /// The closest point on the surface.
    pub point: DVec3,
    /// The face the closest point lies on.
    pub face: usize,
    /// Squared distance between the query and the closest point.
    pub squared_distance: f64,
}

/// Bounding volume hierarchy over the faces of a triangle mesh.
///
/// Answers exact closest point queries against the mesh surface.
#[derive(Debug)]
pub struct TriangleTree {
    triangles: Vec<[DVec3; 3]>,
    order: Vec<usize>,
    nodes: Vec<Node>,
}

impl TriangleTree {
    /// Build the tree over all faces of `mesh`.
    pub fn new(mesh: &TriMesh) -> Self {
        let triangles = (0..mesh.num_faces())
            .map(|f| mesh.triangle(f))
            .collect::<Vec<_>>();
        let centroids = triangles
            .iter()
            .map(|[a, b, c]| (*a + *b + *c) / 3.0)
            .collect::<Vec<_>>();

        let mut tree = Self {
            order: (0..triangles.len()).collect(),
            triangles,
            nodes: Vec::new(),
        };
        if !tree.triangles.is_empty() {
            let num = tree.triangles.len();
            tree.build(&centroids, 0, num);
        }
        tree
    }

    /// Number of faces indexed by the tree.
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    /// Check if the tree indexes no faces.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    fn bounds(&self, start: usize, end: usize) -> Aabb {
        let mut bbox = Aabb::empty();
        for &t in &self.order[start..end] {
            for v in self.triangles[t] {
                bbox.grow(v);
            }
        }
        bbox
    }

    // returns the index of the created node
    fn build(&mut self, centroids: &[DVec3], start: usize, end: usize) -> usize {
        let bbox = self.bounds(start, end);
        let node_idx = self.nodes.len();
        self.nodes.push(Node {
            bbox,
            kind: NodeKind::Leaf { start, end },
        });

        if end - start <= LEAF_SIZE {
            return node_idx;
        }

        // split at the median centroid along the longest axis of the box
        let extent = bbox.max - bbox.min;
        let axis = if extent.x >= extent.y && extent.x >= extent.z {
            0
        } else if extent.y >= extent.z {
            1
        } else {
            2
        };
        let mid = start + (end - start) / 2;
        self.order[start..end].select_nth_unstable_by(mid - start, |&i, &j| {
            centroids[i][axis].total_cmp(&centroids[j][axis])
        });

        let left = self.build(centroids, start, mid);
        let right = self.build(centroids, mid, end);
        self.nodes[node_idx].kind = NodeKind::Inner { left, right };
        self.nodes[node_idx].bbox = self.nodes[left].bbox.union(&self.nodes[right].bbox);

        node_idx
    }

    /// Find the closest point on the indexed surface to `query`.
    ///
    /// Returns `None` if the tree is empty. Ties are resolved towards the face
    /// visited first, which is stable for a given mesh.
    pub fn closest_point(&self, query: DVec3) -> Option<ClosestPoint> {
        if self.nodes.is_empty() {
            return None;
        }

        let mut best: Option<ClosestPoint> = None;
        let mut best_dist = f64::INFINITY;
        let mut stack = vec![0usize];

        while let Some(node_idx) = stack.pop() {
            let node = &self.nodes[node_idx];
            if node.bbox.squared_distance(query) >= best_dist {
                continue;
            }

            match node.kind {
                NodeKind::Leaf { start, end } => {
                    for &face in &self.order[start..end] {
                        let [a, b, c] = self.triangles[face];
                        let point = closest_point_on_triangle(query, a, b, c);
                        let squared_distance = (point - query).length_squared();
                        if squared_distance < best_dist {
                            best_dist = squared_distance;
                            best = Some(ClosestPoint {
                                point,
                                face,
                                squared_distance,
                            });
                        }
                    }
                }
                NodeKind::Inner { left, right } => {
                    // push the farther child first so the nearer one is visited next
                    let dl = self.nodes[left].bbox.squared_distance(query);
                    let dr = self.nodes[right].bbox.squared_distance(query);
                    if dl <= dr {
                        stack.push(right);
                        stack.push(left);
                    } else {
                        stack.push(left);
                        stack.push(right);
                    }
                }
            }
        }

        best
    }
}
