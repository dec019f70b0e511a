//! Octree over hit objects for scoping projectile and missile queries
//!
//! The tree is rebuilt from scratch every tick from the current hit-object
//! list and thrown away at the end of it. Split points are centroids of the
//! contained objects rather than box midpoints, which keeps clustered
//! formations from producing deep, lopsided trees.
//!
//! An object whose sphere straddles a split plane is stored in every octant it
//! overlaps. Queries deduplicate, so a callback sees each object at most once
//! per call.

use std::ops::ControlFlow;

use glam::Vec3;

use crate::boxes_intersect;

/// Anything that can be placed in the octree
pub trait Bounded {
    fn position(&self) -> Vec3;
    fn radius(&self) -> f32;
}

#[derive(Debug)]
struct Node {
    /// Indices into the object slice
    items: Vec<usize>,
    /// Centroid of the contained objects, used as the split point
    center: Vec3,
    /// Empty for leaves, 8 entries otherwise (octant bit 0 = +x, 1 = +y, 2 = +z)
    children: Vec<Node>,
}

/// Spatial index over a borrowed slice of objects
#[derive(Debug)]
pub struct Octree<'a, T> {
    objects: &'a [T],
    root: Node,
    /// True bounding box of all objects (position ± radius)
    min: Vec3,
    max: Vec3,
}

impl<'a, T: Bounded> Octree<'a, T> {
    /// Build a tree over `objects`
    ///
    /// Recursion stops at `max_depth` or when a node holds at most
    /// `max_objects` objects.
    pub fn new(objects: &'a [T], max_depth: u32, max_objects: usize) -> Self {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for object in objects {
            let r = Vec3::splat(object.radius());
            min = min.min(object.position() - r);
            max = max.max(object.position() + r);
        }
        if objects.is_empty() {
            min = Vec3::ZERO;
            max = Vec3::ZERO;
        }

        let items: Vec<usize> = (0..objects.len()).collect();
        let root = build_node(objects, items, 0, max_depth, max_objects.max(1));
        Self {
            objects,
            root,
            min,
            max,
        }
    }

    pub fn bounds(&self) -> (Vec3, Vec3) {
        (self.min, self.max)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Number of leaf nodes (for tests and debug output)
    pub fn leaf_count(&self) -> usize {
        fn count(node: &Node) -> usize {
            if node.children.is_empty() {
                1
            } else {
                node.children.iter().map(count).sum()
            }
        }
        count(&self.root)
    }

    /// Call `callback` for every object stored in a leaf reachable from the
    /// query box
    ///
    /// Subtrees on the far side of a split plane are skipped. The callback
    /// receives the object's index in the slice the tree was built from and
    /// may return `ControlFlow::Break` to end the traversal early.
    pub fn execute_for_objects<F>(&self, box_min: Vec3, box_max: Vec3, mut callback: F) -> ControlFlow<()>
    where
        F: FnMut(usize, &T) -> ControlFlow<()>,
    {
        if self.objects.is_empty() || !boxes_intersect(self.min, self.max, box_min, box_max) {
            return ControlFlow::Continue(());
        }
        let mut visited = vec![false; self.objects.len()];
        self.visit(&self.root, box_min, box_max, &mut visited, &mut callback)
    }

    fn visit<F>(
        &self,
        node: &Node,
        box_min: Vec3,
        box_max: Vec3,
        visited: &mut [bool],
        callback: &mut F,
    ) -> ControlFlow<()>
    where
        F: FnMut(usize, &T) -> ControlFlow<()>,
    {
        if node.children.is_empty() {
            for &index in &node.items {
                if visited[index] {
                    continue;
                }
                visited[index] = true;
                callback(index, &self.objects[index])?;
            }
            return ControlFlow::Continue(());
        }

        for (octant, child) in node.children.iter().enumerate() {
            if child.items.is_empty() {
                continue;
            }
            if octant_overlaps(octant, node.center, box_min, box_max) {
                self.visit(child, box_min, box_max, visited, callback)?;
            }
        }
        ControlFlow::Continue(())
    }
}

fn centroid<T: Bounded>(objects: &[T], items: &[usize]) -> Vec3 {
    if items.is_empty() {
        return Vec3::ZERO;
    }
    let sum: Vec3 = items.iter().map(|&i| objects[i].position()).sum();
    sum / items.len() as f32
}

/// Whether the half-spaces of `octant` around `center` overlap the box
fn octant_overlaps(octant: usize, center: Vec3, min: Vec3, max: Vec3) -> bool {
    (0..3).all(|axis| {
        if octant & (1 << axis) != 0 {
            max[axis] >= center[axis]
        } else {
            min[axis] < center[axis]
        }
    })
}

fn build_node<T: Bounded>(
    objects: &[T],
    items: Vec<usize>,
    depth: u32,
    max_depth: u32,
    max_objects: usize,
) -> Node {
    let center = centroid(objects, &items);
    if depth >= max_depth || items.len() <= max_objects {
        return Node {
            items,
            center,
            children: Vec::new(),
        };
    }

    let mut buckets: [Vec<usize>; 8] = Default::default();
    for &index in &items {
        let object = &objects[index];
        let (min, max) = crate::sphere_bounds(object.position(), object.radius());
        for (octant, bucket) in buckets.iter_mut().enumerate() {
            if octant_overlaps(octant, center, min, max) {
                bucket.push(index);
            }
        }
    }

    let children = buckets
        .into_iter()
        .map(|bucket| build_node(objects, bucket, depth + 1, max_depth, max_objects))
        .collect();

    Node {
        items,
        center,
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    struct Ball {
        pos: Vec3,
        r: f32,
    }

    impl Bounded for Ball {
        fn position(&self) -> Vec3 {
            self.pos
        }
        fn radius(&self) -> f32 {
            self.r
        }
    }

    fn grid(n: i32, spacing: f32) -> Vec<Ball> {
        let mut balls = Vec::new();
        for x in 0..n {
            for y in 0..n {
                for z in 0..n {
                    balls.push(Ball {
                        pos: Vec3::new(x as f32, y as f32, z as f32) * spacing,
                        r: 1.0,
                    });
                }
            }
        }
        balls
    }

    fn visit_counts(tree: &Octree<'_, Ball>, n: usize, min: Vec3, max: Vec3) -> Vec<u32> {
        let mut counts = vec![0u32; n];
        let _ = tree.execute_for_objects(min, max, |index, _| {
            counts[index] += 1;
            ControlFlow::Continue(())
        });
        counts
    }

    #[test]
    fn test_root_bounds_include_radii() {
        let balls = vec![
            Ball { pos: Vec3::new(-5.0, 0.0, 0.0), r: 2.0 },
            Ball { pos: Vec3::new(5.0, 1.0, 0.0), r: 1.0 },
        ];
        let tree = Octree::new(&balls, 4, 1);
        let (min, max) = tree.bounds();
        assert_eq!(min, Vec3::new(-7.0, -2.0, -2.0));
        assert_eq!(max, Vec3::new(6.0, 2.0, 2.0));
    }

    #[test]
    fn test_full_query_visits_every_object_once() {
        let balls = grid(4, 10.0);
        let tree = Octree::new(&balls, 5, 2);
        assert!(tree.leaf_count() > 1);
        let (min, max) = tree.bounds();
        let counts = visit_counts(&tree, balls.len(), min, max);
        assert!(counts.iter().all(|&c| c == 1));
    }

    #[test]
    fn test_straddling_object_delivered_once() {
        // One big sphere at the centroid overlaps every octant
        let mut balls = grid(3, 10.0);
        balls.push(Ball { pos: Vec3::splat(10.0), r: 8.0 });
        let tree = Octree::new(&balls, 3, 1);
        let (min, max) = tree.bounds();
        let counts = visit_counts(&tree, balls.len(), min, max);
        assert_eq!(counts[balls.len() - 1], 1);
    }

    #[test]
    fn test_query_prunes_far_octants() {
        let balls = grid(4, 100.0);
        let tree = Octree::new(&balls, 5, 1);
        // Small box around the origin corner
        let counts = visit_counts(&tree, balls.len(), Vec3::splat(-2.0), Vec3::splat(2.0));
        assert_eq!(counts[0], 1);
        assert!(counts.iter().sum::<u32>() < balls.len() as u32);
    }

    #[test]
    fn test_query_outside_bounds_visits_nothing() {
        let balls = grid(2, 10.0);
        let tree = Octree::new(&balls, 3, 1);
        let counts = visit_counts(&tree, balls.len(), Vec3::splat(500.0), Vec3::splat(600.0));
        assert!(counts.iter().all(|&c| c == 0));
    }

    #[test]
    fn test_early_termination() {
        let balls = grid(3, 10.0);
        let tree = Octree::new(&balls, 4, 1);
        let (min, max) = tree.bounds();
        let mut visited = 0;
        let flow = tree.execute_for_objects(min, max, |_, _| {
            visited += 1;
            if visited == 3 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(flow, ControlFlow::Break(()));
        assert_eq!(visited, 3);
    }

    #[test]
    fn test_empty_tree() {
        let balls: Vec<Ball> = Vec::new();
        let tree = Octree::new(&balls, 4, 1);
        assert!(tree.is_empty());
        let flow = tree.execute_for_objects(Vec3::splat(-1.0), Vec3::splat(1.0), |_, _| {
            ControlFlow::Break(())
        });
        assert_eq!(flow, ControlFlow::Continue(()));
    }

    proptest! {
        #[test]
        fn prop_root_query_reaches_everything(
            points in proptest::collection::vec((-500.0f32..500.0, -500.0f32..500.0, -500.0f32..500.0, 0.5f32..30.0), 1..80),
            depth in 1u32..6,
            leaf in 1usize..6,
        ) {
            let balls: Vec<Ball> = points
                .into_iter()
                .map(|(x, y, z, r)| Ball { pos: Vec3::new(x, y, z), r })
                .collect();
            let tree = Octree::new(&balls, depth, leaf);
            let (min, max) = tree.bounds();
            let counts = visit_counts(&tree, balls.len(), min, max);
            prop_assert!(counts.iter().all(|&c| c == 1));
        }
    }
}
