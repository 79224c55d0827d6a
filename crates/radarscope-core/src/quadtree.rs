// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Spatial index over static map geometry.
//!
//! A loose quadtree: every segment lives in the deepest node whose quadrant
//! fully contains both of its endpoints. Segments straddling a quadrant
//! boundary stay on the parent. Children are only allocated when something
//! lands in their subtree, and the tree is never mutated after [`QuadTree::build`],
//! so rendering can traverse it without any locking.

use log::info;

use crate::geo::{GeoBounds, LineSegment};

/// Depth at which segments stop descending even if a quadrant would hold them.
pub const DEFAULT_MAX_DEPTH: usize = 12;

// Quadrant order used for children and traversal.
const NW: usize = 0;
const SW: usize = 1;
const NE: usize = 2;
const SE: usize = 3;

#[derive(Debug)]
struct Node {
    bounds: GeoBounds,
    children: [Option<Box<Node>>; 4],
    segments: Vec<LineSegment>,
}

impl Node {
    fn new(bounds: GeoBounds) -> Self {
        Self {
            bounds,
            children: [None, None, None, None],
            segments: Vec::new(),
        }
    }

    fn quadrant_bounds(&self, quadrant: usize) -> GeoBounds {
        let b = &self.bounds;
        let mid = b.center();
        match quadrant {
            NW => GeoBounds::new(mid.lat, b.lat_max, b.lon_min, mid.lon),
            SW => GeoBounds::new(b.lat_min, mid.lat, b.lon_min, mid.lon),
            NE => GeoBounds::new(mid.lat, b.lat_max, mid.lon, b.lon_max),
            _ => GeoBounds::new(b.lat_min, mid.lat, mid.lon, b.lon_max),
        }
    }

    fn insert(&mut self, segment: LineSegment, extent: &GeoBounds, depth: usize, max_depth: usize) {
        if depth < max_depth {
            for quadrant in [NW, SW, NE, SE] {
                let qb = self.quadrant_bounds(quadrant);
                if qb.contains(extent) {
                    let child = self.children[quadrant].get_or_insert_with(|| Box::new(Node::new(qb)));
                    child.insert(segment, extent, depth + 1, max_depth);
                    return;
                }
            }
        }
        self.segments.push(segment);
    }

    fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .flatten()
            .map(|c| c.node_count())
            .sum::<usize>()
    }

    fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .flatten()
            .map(|c| c.depth())
            .max()
            .unwrap_or(0)
    }
}

/// Immutable quadtree of map line segments.
#[derive(Debug, Default)]
pub struct QuadTree {
    root: Option<Node>,
    len: usize,
}

impl QuadTree {
    /// Build a tree from a fixed set of segments.
    #[must_use]
    pub fn build(segments: Vec<LineSegment>) -> Self {
        Self::build_with_depth(segments, DEFAULT_MAX_DEPTH)
    }

    #[must_use]
    pub fn build_with_depth(segments: Vec<LineSegment>, max_depth: usize) -> Self {
        let Some(first) = segments.first() else {
            return Self::default();
        };

        let mut bounds = first.bounds();
        for segment in &segments {
            bounds.extend(&segment.bounds());
        }

        let mut root = Node::new(bounds);
        let len = segments.len();
        for segment in segments {
            let extent = segment.bounds();
            root.insert(segment, &extent, 0, max_depth);
        }

        let tree = Self {
            root: Some(root),
            len,
        };
        info!(
            "Built map quadtree: {} segments, {} nodes, depth {}",
            tree.len,
            tree.node_count(),
            tree.depth()
        );
        tree
    }

    /// Number of segments stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.root.as_ref().map_or(0, Node::node_count)
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.root.as_ref().map_or(0, Node::depth)
    }

    /// Box covering every stored segment.
    #[must_use]
    pub fn bounds(&self) -> Option<GeoBounds> {
        self.root.as_ref().map(|r| r.bounds)
    }

    /// Lazily yield every segment held by a node whose box intersects `query`.
    ///
    /// A node is pruned, with its whole subtree, as soon as it is disjoint from
    /// the query on either axis. Within a node the NW, SW, NE and SE subtrees
    /// come first, then the node's own segments.
    #[must_use]
    pub fn query_visible(&self, query: GeoBounds) -> Visible<'_> {
        let mut stack = Vec::new();
        if let Some(root) = &self.root {
            if root.bounds.intersects(&query) {
                stack.push(Pending::Node(root));
            }
        }
        Visible {
            stack,
            current: (&[] as &[LineSegment]).iter(),
            query,
        }
    }
}

// Work left for the traversal: a subtree still to open, or the segments of
// a node whose children have all been queued ahead of them.
#[derive(Debug)]
enum Pending<'a> {
    Node(&'a Node),
    Segments(&'a [LineSegment]),
}

/// Depth-first iterator returned by [`QuadTree::query_visible`].
#[derive(Debug)]
pub struct Visible<'a> {
    stack: Vec<Pending<'a>>,
    current: std::slice::Iter<'a, LineSegment>,
    query: GeoBounds,
}

impl<'a> Iterator for Visible<'a> {
    type Item = &'a LineSegment;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(segment) = self.current.next() {
                return Some(segment);
            }
            match self.stack.pop()? {
                Pending::Segments(segments) => self.current = segments.iter(),
                Pending::Node(node) => {
                    self.stack.push(Pending::Segments(&node.segments));
                    // pushed in reverse so NW is visited first
                    for child in node.children.iter().rev().flatten() {
                        if child.bounds.intersects(&self.query) {
                            self.stack.push(Pending::Node(child));
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;

    fn seg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> LineSegment {
        LineSegment::new(GeoPoint::new(lat1, lon1), GeoPoint::new(lat2, lon2))
    }

    // short segments spread over a 10x10 degree grid
    fn grid() -> Vec<LineSegment> {
        let mut out = Vec::new();
        for i in 0..10 {
            for j in 0..10 {
                let lat = 30.0 + f64::from(i);
                let lon = -120.0 + f64::from(j);
                out.push(seg(lat, lon, lat + 0.3, lon + 0.4));
            }
        }
        // a long one spanning the whole area stays on the root
        out.push(seg(30.0, -120.0, 39.3, -110.6));
        out
    }

    fn sorted(mut v: Vec<LineSegment>) -> Vec<(i64, i64, i64, i64)> {
        let key = |s: &LineSegment| {
            (
                (s.start.lat * 1e6) as i64,
                (s.start.lon * 1e6) as i64,
                (s.end.lat * 1e6) as i64,
                (s.end.lon * 1e6) as i64,
            )
        };
        v.sort_by_key(key);
        v.iter().map(key).collect()
    }

    #[test]
    fn test_empty_tree_yields_nothing() {
        let tree = QuadTree::build(Vec::new());
        assert!(tree.is_empty());
        assert_eq!(tree.query_visible(GeoBounds::new(-90.0, 90.0, -180.0, 180.0)).count(), 0);
        assert!(tree.bounds().is_none());
    }

    #[test]
    fn test_full_query_returns_every_segment() {
        let segments = grid();
        let tree = QuadTree::build(segments.clone());
        assert_eq!(tree.len(), segments.len());

        let all: Vec<LineSegment> = tree
            .query_visible(tree.bounds().unwrap())
            .copied()
            .collect();
        assert_eq!(sorted(all), sorted(segments));
    }

    #[test]
    fn test_sub_query_never_omits_overlapping_segments() {
        let segments = grid();
        let tree = QuadTree::build(segments.clone());
        let query = GeoBounds::new(33.5, 35.5, -117.5, -115.5);

        let found: Vec<LineSegment> = tree.query_visible(query).copied().collect();
        for s in segments.iter().filter(|s| s.bounds().intersects(&query)) {
            assert!(found.contains(s), "missing {s:?}");
        }
        // pruning actually removes far-away geometry
        assert!(found.len() < segments.len());
        // the root-level spanning segment is always reported
        assert!(found.contains(&seg(30.0, -120.0, 39.3, -110.6)));
    }

    #[test]
    fn test_disjoint_query_prunes_everything() {
        let tree = QuadTree::build(grid());
        let far = GeoBounds::new(-50.0, -40.0, 10.0, 20.0);
        assert_eq!(tree.query_visible(far).count(), 0);
    }

    #[test]
    fn test_subtrees_come_before_own_segments() {
        let spanning = seg(0.0, 0.0, 10.0, 10.0);
        let north_west = seg(9.0, 0.0, 9.5, 0.5);
        let south_east = seg(0.5, 9.5, 1.0, 9.9);
        let tree = QuadTree::build(vec![spanning, south_east, north_west]);

        let order: Vec<LineSegment> = tree
            .query_visible(GeoBounds::new(-1.0, 11.0, -1.0, 11.0))
            .copied()
            .collect();
        assert_eq!(order, vec![north_west, south_east, spanning]);
    }

    #[test]
    fn test_children_only_exist_for_populated_quadrants() {
        // everything in the north-west corner
        let tree = QuadTree::build_with_depth(
            vec![seg(10.0, 0.0, 9.9, 0.1), seg(0.0, 0.0, 10.0, 10.0)],
            4,
        );
        let root = tree.root.as_ref().unwrap();
        assert!(root.children[NW].is_some());
        assert!(root.children[SW].is_none());
        assert!(root.children[NE].is_none());
        assert!(root.children[SE].is_none());
        assert!(tree.depth() <= 5);
    }
}
