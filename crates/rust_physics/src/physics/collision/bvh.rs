//! Bounding volume hierarchy over mesh triangles
//!
//! Binary tree of axis-aligned boxes built top-down by median split along the
//! widest axis. Nodes store triangle indices into the owning mesh; the tree
//! is built once in mesh-local space and never mutated afterwards.

use log::debug;

use crate::foundation::math::Vec3;

use super::aabb::AABB;
use super::geometry::Triangle;

/// Single node in the hierarchy
#[derive(Debug, Clone)]
pub struct BvhNode {
    /// Local-space bounds of every triangle below this node
    pub bounds: AABB,

    /// Triangle indices held by this node (leaves only)
    pub triangles: Vec<usize>,

    /// Exactly two children, None if this is a leaf
    pub children: Option<Box<[BvhNode; 2]>>,

    /// Depth in the tree (0 = root)
    pub depth: u32,
}

impl BvhNode {
    /// Check if this node is a leaf (has no children)
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// Triangle BVH
#[derive(Debug, Clone)]
pub struct Bvh {
    root: Option<BvhNode>,
    triangle_bounds: Vec<AABB>,
    leaf_threshold: usize,
    node_count: usize,
    leaf_count: usize,
}

impl Bvh {
    /// Build a hierarchy over `triangles`
    ///
    /// Nodes with at most `leaf_threshold` triangles become leaves. A threshold
    /// of zero is treated as one so that recursion always terminates.
    pub fn build(triangles: &[Triangle], leaf_threshold: usize) -> Self {
        let leaf_threshold = leaf_threshold.max(1);
        let triangle_bounds: Vec<AABB> = triangles
            .iter()
            .map(|t| {
                let mut aabb = AABB::new(t.v0, t.v0);
                aabb.grow(t.v1);
                aabb.grow(t.v2);
                aabb
            })
            .collect();

        let mut bvh = Self {
            root: None,
            triangle_bounds,
            leaf_threshold,
            node_count: 0,
            leaf_count: 0,
        };

        if !triangles.is_empty() {
            let centroids: Vec<_> = triangles.iter().map(Triangle::centroid).collect();
            let indices: Vec<usize> = (0..triangles.len()).collect();
            let root = bvh.build_node(indices, &centroids, 0);
            bvh.root = Some(root);
        }

        debug!(
            "Built BVH over {} triangles: {} nodes, {} leaves, depth {}",
            triangles.len(),
            bvh.node_count,
            bvh.leaf_count,
            bvh.depth()
        );

        bvh
    }

    fn build_node(&mut self, mut indices: Vec<usize>, centroids: &[Vec3], depth: u32) -> BvhNode {
        self.node_count += 1;

        let bounds = indices
            .iter()
            .map(|&i| self.triangle_bounds[i])
            .reduce(|a, b| a.merged(&b))
            .unwrap_or_else(AABB::empty);

        if indices.len() <= self.leaf_threshold {
            self.leaf_count += 1;
            return BvhNode {
                bounds,
                triangles: indices,
                children: None,
                depth,
            };
        }

        let axis = bounds.widest_axis();
        indices.sort_by(|&a, &b| centroids[a][axis].total_cmp(&centroids[b][axis]));

        let right = indices.split_off(indices.len() / 2);
        let left_node = self.build_node(indices, centroids, depth + 1);
        let right_node = self.build_node(right, centroids, depth + 1);

        BvhNode {
            bounds,
            triangles: Vec::new(),
            children: Some(Box::new([left_node, right_node])),
            depth,
        }
    }

    /// Indices of triangles whose bounds overlap `query`
    ///
    /// Subtrees whose bounds miss the query are pruned; inside a leaf each
    /// triangle's own bounds are checked too. Touching boxes count as overlap.
    pub fn query(&self, query: &AABB) -> Vec<usize> {
        let mut result = Vec::new();
        if let Some(root) = &self.root {
            self.query_node(root, query, &mut result);
        }
        result
    }

    fn query_node(&self, node: &BvhNode, query: &AABB, result: &mut Vec<usize>) {
        if !node.bounds.intersects(query) {
            return;
        }

        match &node.children {
            Some(children) => {
                for child in children.iter() {
                    self.query_node(child, query, result);
                }
            }
            None => result.extend(
                node.triangles
                    .iter()
                    .copied()
                    .filter(|&i| self.triangle_bounds[i].intersects(query)),
            ),
        }
    }

    /// Root node, None for an empty mesh
    pub fn root(&self) -> Option<&BvhNode> {
        self.root.as_ref()
    }

    /// Local-space bounds of the whole mesh
    pub fn bounds(&self) -> Option<AABB> {
        self.root.as_ref().map(|r| r.bounds)
    }

    /// Leaf size limit used when building
    pub fn leaf_threshold(&self) -> usize {
        self.leaf_threshold
    }

    /// Total number of nodes
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Number of leaf nodes
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Depth of the deepest leaf
    pub fn depth(&self) -> u32 {
        fn deepest(node: &BvhNode) -> u32 {
            match &node.children {
                Some(children) => deepest(&children[0]).max(deepest(&children[1])),
                None => node.depth,
            }
        }
        self.root.as_ref().map_or(0, deepest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Row of unit right triangles along +x, two units apart
    fn strip(count: usize) -> Vec<Triangle> {
        (0..count)
            .map(|i| {
                let x = i as f32 * 2.0;
                Triangle::new(
                    Vec3::new(x, 0.0, 0.0),
                    Vec3::new(x + 1.0, 0.0, 0.0),
                    Vec3::new(x, 1.0, 0.0),
                )
            })
            .collect()
    }

    fn brute_force(triangles: &[Triangle], query: &AABB) -> Vec<usize> {
        triangles
            .iter()
            .enumerate()
            .filter(|(_, t)| {
                AABB::from_points([t.v0, t.v1, t.v2]).is_some_and(|b| b.intersects(query))
            })
            .map(|(i, _)| i)
            .collect()
    }

    fn assert_node_contains_children(node: &BvhNode, triangles: &[Triangle]) {
        for &i in &node.triangles {
            let t = &triangles[i];
            assert!(node.bounds.contains_point(t.v0));
            assert!(node.bounds.contains_point(t.v1));
            assert!(node.bounds.contains_point(t.v2));
        }
        if let Some(children) = &node.children {
            for child in children.iter() {
                assert!(node.bounds.contains_point(child.bounds.min));
                assert!(node.bounds.contains_point(child.bounds.max));
                assert_node_contains_children(child, triangles);
            }
        }
    }

    #[test]
    fn test_leaf_threshold_respected() {
        let triangles = strip(9);
        let bvh = Bvh::build(&triangles, 2);

        fn check(node: &BvhNode, threshold: usize) {
            match &node.children {
                Some(children) => {
                    assert!(node.triangles.is_empty());
                    children.iter().for_each(|c| check(c, threshold));
                }
                None => assert!(node.triangles.len() <= threshold),
            }
        }
        check(bvh.root().unwrap(), 2);
        assert_eq!(bvh.node_count(), 2 * bvh.leaf_count() - 1);
    }

    #[test]
    fn test_bounds_contain_subtree() {
        let triangles = strip(13);
        let bvh = Bvh::build(&triangles, 2);
        assert_node_contains_children(bvh.root().unwrap(), &triangles);
    }

    #[test]
    fn test_query_matches_brute_force() {
        let triangles = strip(16);
        let bvh = Bvh::build(&triangles, 2);

        let queries = [
            AABB::new(Vec3::new(3.5, -1.0, -1.0), Vec3::new(9.2, 0.5, 1.0)),
            AABB::new(Vec3::new(-5.0, -5.0, -5.0), Vec3::new(100.0, 5.0, 5.0)),
            AABB::new(Vec3::new(1.2, 0.0, 0.0), Vec3::new(1.8, 1.0, 0.0)),
            AABB::new(Vec3::new(0.0, 2.0, 0.0), Vec3::new(10.0, 3.0, 0.0)),
        ];

        for query in &queries {
            let mut found = bvh.query(query);
            found.sort_unstable();
            assert_eq!(found, brute_force(&triangles, query));
        }
    }

    #[test]
    fn test_empty_and_zero_threshold() {
        let empty = Bvh::build(&[], 2);
        assert!(empty.root().is_none());
        assert!(empty.query(&AABB::new(Vec3::zeros(), Vec3::repeat(1.0))).is_empty());

        // Identical centroids still terminate
        let stacked = vec![strip(1)[0]; 5];
        let bvh = Bvh::build(&stacked, 0);
        assert_eq!(bvh.leaf_count(), 5);
        assert_eq!(bvh.query(&AABB::new(Vec3::zeros(), Vec3::repeat(1.0))).len(), 5);
    }
}
