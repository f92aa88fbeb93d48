use crate::aabb::Aabb;
use crate::point::Point3;
use crate::ray::Ray;
use crate::shape::{Hit, Primitive};
use crate::utils;
use crate::vector::Axis;

use serde::Deserialize;
use std::cmp;
use std::collections::VecDeque;

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    Median,
    Sah,
}

impl Copy for SplitMode {}
impl Clone for SplitMode {
    fn clone(&self) -> SplitMode {
        *self
    }
}

#[derive(Deserialize)]
pub struct KdConfig {
    #[serde(default = "default_max_leaf")]
    pub max_leaf: usize,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_split_mode")]
    pub split: SplitMode,
}

fn default_max_leaf() -> usize {
    4
}
fn default_max_depth() -> usize {
    20
}
fn default_split_mode() -> SplitMode {
    SplitMode::Median
}

impl Default for KdConfig {
    fn default() -> KdConfig {
        KdConfig {
            max_leaf: default_max_leaf(),
            max_depth: default_max_depth(),
            split: default_split_mode(),
        }
    }
}

// Spatial index over the world's primitive list. Nodes hold indices into
// that list; the tree never owns a primitive.
pub struct KdTree {
    root: Option<Box<KdNode>>,
}

struct KdNode {
    bounds: Aabb,
    kind: KdNodeKind,
}

enum KdNodeKind {
    Leaf(Vec<usize>),
    Split {
        axis: Axis,
        pos: f64,
        left: Box<KdNode>,
        right: Box<KdNode>,
    },
}

impl KdTree {
    pub fn empty() -> KdTree {
        KdTree { root: None }
    }

    pub fn build(primitives: &[Primitive], config: &KdConfig) -> KdTree {
        if primitives.is_empty() {
            return KdTree::empty();
        }
        let indices: Vec<usize> = (0..primitives.len()).collect();
        KdTree {
            root: Some(Box::new(build_node(primitives, indices, 0, config))),
        }
    }

    // Nearest accepted hit along the ray, or None. The worklist is kept
    // roughly sorted by estimated entry distance so near nodes are visited
    // first; ordering only improves pruning, the minimum-t rule decides
    // the result.
    pub fn intersect(&self, r: &Ray, primitives: &[Primitive]) -> Option<(usize, Hit)> {
        let root = match self.root.as_deref() {
            Some(n) => n,
            None => return None,
        };

        let mut best: Option<(usize, Hit)> = None;
        let mut best_t = std::f64::MAX;

        let mut to_visit: VecDeque<(&KdNode, f64)> = VecDeque::new();
        to_visit.push_back((root, 0.0));

        while !to_visit.is_empty() {
            if to_visit.len() > 8 {
                to_visit
                    .make_contiguous()
                    .sort_by(|a, b| compare_distance(a.1, b.1));
            }
            let (node, estimated) = match to_visit.pop_front() {
                Some(entry) => entry,
                None => break,
            };

            // Everything in this node is farther than a hit we already
            // have.
            if estimated > best_t {
                continue;
            }
            if !node.bounds.intersects(r) {
                continue;
            }

            match &node.kind {
                KdNodeKind::Leaf(indices) => {
                    for &i in indices {
                        // Never re-hit the surface this ray spawned from.
                        if r.spawned_by == Some(i) {
                            continue;
                        }
                        if let Some(hit) = primitives[i].intersect(r) {
                            if hit.t > utils::RAY_EPSILON && hit.t < best_t {
                                best_t = hit.t;
                                best = Some((i, hit));
                            }
                        }
                    }
                }
                KdNodeKind::Split { left, right, .. } => {
                    to_visit.push_back((&**left, estimate_distance(r, &left.bounds)));
                    to_visit.push_back((&**right, estimate_distance(r, &right.bounds)));
                }
            }
        }

        best
    }
}

// Reference scan with the same acceptance rules as the tree. Used to
// cross-check traversal and by callers that do not want to build an
// index.
pub fn linear_intersect(primitives: &[Primitive], r: &Ray) -> Option<(usize, Hit)> {
    let mut best: Option<(usize, Hit)> = None;
    let mut best_t = std::f64::MAX;
    for (i, primitive) in primitives.iter().enumerate() {
        if r.spawned_by == Some(i) {
            continue;
        }
        if let Some(hit) = primitive.intersect(r) {
            if hit.t > utils::RAY_EPSILON && hit.t < best_t {
                best_t = hit.t;
                best = Some((i, hit));
            }
        }
    }
    best
}

fn build_node(
    primitives: &[Primitive],
    indices: Vec<usize>,
    depth: usize,
    config: &KdConfig,
) -> KdNode {
    let mut bounds = *primitives[indices[0]].bounds();
    for &i in indices.iter().skip(1) {
        bounds = Aabb::union(&bounds, primitives[i].bounds());
    }

    if indices.len() <= config.max_leaf || depth >= config.max_depth {
        return KdNode {
            bounds: bounds,
            kind: KdNodeKind::Leaf(indices),
        };
    }

    let axis = Axis::from_depth(depth);
    let split_pos = match config.split {
        SplitMode::Median => median_split(primitives, &indices, axis),
        SplitMode::Sah => sah_split(primitives, &indices, axis),
    };

    let mut left = Vec::new();
    let mut right = Vec::new();
    for &i in &indices {
        if primitives[i].bounds().center_on(axis) < split_pos {
            left.push(i);
        } else {
            right.push(i);
        }
    }

    // The split failed to separate anything; collapse to a leaf.
    if left.is_empty() || right.is_empty() {
        return KdNode {
            bounds: bounds,
            kind: KdNodeKind::Leaf(indices),
        };
    }

    KdNode {
        bounds: bounds,
        kind: KdNodeKind::Split {
            axis: axis,
            pos: split_pos,
            left: Box::new(build_node(primitives, left, depth + 1, config)),
            right: Box::new(build_node(primitives, right, depth + 1, config)),
        },
    }
}

// Median of the primitive centroids on the chosen axis: a direct sort for
// small counts, a selection otherwise.
fn median_split(primitives: &[Primitive], indices: &[usize], axis: Axis) -> f64 {
    let mut centers: Vec<f64> = indices
        .iter()
        .map(|&i| primitives[i].bounds().center_on(axis))
        .collect();
    let mid = centers.len() / 2;
    if centers.len() <= 10 {
        centers.sort_by(|a, b| compare_distance(*a, *b));
        centers[mid]
    } else {
        *centers
            .select_nth_unstable_by(mid, |a, b| compare_distance(*a, *b))
            .1
    }
}

// Surface Area Heuristic sweep: sort centroids once, then walk candidate
// partitions with prefix/suffix bounds so each cost is O(1). The chosen
// split sits midway between the adjacent centroids.
fn sah_split(primitives: &[Primitive], indices: &[usize], axis: Axis) -> f64 {
    let mut order: Vec<usize> = indices.to_vec();
    order.sort_by(|&a, &b| {
        compare_distance(
            primitives[a].bounds().center_on(axis),
            primitives[b].bounds().center_on(axis),
        )
    });
    let n = order.len();

    let mut suffix = vec![*primitives[order[n - 1]].bounds(); n];
    for k in (0..n - 1).rev() {
        suffix[k] = Aabb::union(primitives[order[k]].bounds(), &suffix[k + 1]);
    }

    let mut best_cost = std::f64::MAX;
    let mut best_split = primitives[order[0]].bounds().center_on(axis);
    let mut prefix = *primitives[order[0]].bounds();
    for k in 1..n {
        let cost = prefix.surface_area() * k as f64 + suffix[k].surface_area() * (n - k) as f64;
        if cost < best_cost {
            best_cost = cost;
            let left_center = primitives[order[k - 1]].bounds().center_on(axis);
            let right_center = primitives[order[k]].bounds().center_on(axis);
            best_split = (left_center + right_center) / 2.0;
        }
        prefix = Aabb::union(&prefix, primitives[order[k]].bounds());
    }
    best_split
}

// Distance to the nearest point of the box, projected on the ray
// direction; zero when the origin is already inside.
fn estimate_distance(r: &Ray, bounds: &Aabb) -> f64 {
    if bounds.contains(r.origin) {
        return 0.0;
    }
    let closest = Point3::new(
        r.origin.x.max(bounds.min.x).min(bounds.max.x),
        r.origin.y.max(bounds.min.y).min(bounds.max.y),
        r.origin.z.max(bounds.min.z).min(bounds.max.z),
    );
    let to_closest = closest - r.origin;
    if to_closest.squared_length() == 0.0 {
        return 0.0;
    }
    to_closest.dot(r.dir).max(0.0)
}

fn compare_distance(a: f64, b: f64) -> cmp::Ordering {
    if a < b {
        cmp::Ordering::Less
    } else if a > b {
        cmp::Ordering::Greater
    } else {
        cmp::Ordering::Equal
    }
}
