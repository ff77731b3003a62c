use eframe::egui::{Vec2, vec2};

const QUADTREE_LEAF_CAPACITY: usize = 8;
const QUADTREE_MAX_DEPTH: usize = 12;

#[derive(Clone, Copy, Debug)]
pub(super) struct QuadBounds {
    pub(super) center: Vec2,
    pub(super) half_extent: f32,
}

impl QuadBounds {
    fn from_points(points: &[Vec2]) -> Option<Self> {
        let mut min = vec2(f32::INFINITY, f32::INFINITY);
        let mut max = vec2(f32::NEG_INFINITY, f32::NEG_INFINITY);

        for point in points {
            min = min.min(*point);
            max = max.max(*point);
        }

        if !min.x.is_finite() || !min.y.is_finite() || !max.x.is_finite() || !max.y.is_finite() {
            return None;
        }

        let span = (max - min).max(vec2(1.0, 1.0));
        Some(Self {
            center: (min + max) * 0.5,
            half_extent: (span.x.max(span.y) * 0.5) + 1.0,
        })
    }

    pub(super) fn contains(self, point: Vec2) -> bool {
        let offset = (point - self.center).abs();
        offset.x <= self.half_extent && offset.y <= self.half_extent
    }

    fn child(self, quadrant: usize) -> Self {
        let quarter = self.half_extent * 0.5;
        let offset = match quadrant {
            0 => vec2(-quarter, -quarter),
            1 => vec2(quarter, -quarter),
            2 => vec2(-quarter, quarter),
            _ => vec2(quarter, quarter),
        };

        Self {
            center: self.center + offset,
            half_extent: quarter,
        }
    }

    fn quadrant_for(self, point: Vec2) -> usize {
        let right = point.x >= self.center.x;
        let lower = point.y >= self.center.y;
        match (right, lower) {
            (false, false) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (true, true) => 3,
        }
    }

    pub(super) fn side_length(self) -> f32 {
        self.half_extent * 2.0
    }

    /// Squared gap between two cells, zero when they touch or overlap.
    pub(super) fn distance_sq_to(self, other: Self) -> f32 {
        let gap = (self.center - other.center).abs()
            - vec2(
                self.half_extent + other.half_extent,
                self.half_extent + other.half_extent,
            );
        gap.max(Vec2::ZERO).length_sq()
    }
}

/// Barnes–Hut cell carrying the aggregates both the charge and the collision pass need.
pub(super) struct QuadNode {
    pub(super) bounds: QuadBounds,
    /// Summed charge of every point below this cell.
    pub(super) charge: f32,
    /// Charge-weighted centroid; falls back to the plain centroid for zero total weight.
    pub(super) center: Vec2,
    /// Largest collision radius below this cell.
    pub(super) max_radius: f32,
    pub(super) indices: Vec<usize>,
    pub(super) children: [Option<Box<QuadNode>>; 4],
}

impl QuadNode {
    pub(super) fn build(positions: &[Vec2], charges: &[f32], radii: &[f32]) -> Option<Self> {
        let bounds = QuadBounds::from_points(positions)?;
        let indices = (0..positions.len()).collect::<Vec<_>>();
        Some(Self::build_node(bounds, indices, positions, charges, radii, 0))
    }

    fn build_node(
        bounds: QuadBounds,
        indices: Vec<usize>,
        positions: &[Vec2],
        charges: &[f32],
        radii: &[f32],
        depth: usize,
    ) -> Self {
        let mut charge = 0.0;
        let mut weight = 0.0;
        let mut weighted = Vec2::ZERO;
        let mut plain = Vec2::ZERO;
        let mut max_radius = 0.0_f32;
        for &index in &indices {
            let strength = charges.get(index).copied().unwrap_or(0.0);
            charge += strength;
            weight += strength.abs();
            weighted += positions[index] * strength.abs();
            plain += positions[index];
            max_radius = max_radius.max(radii.get(index).copied().unwrap_or(0.0));
        }

        let center = if weight > 0.0 {
            weighted / weight
        } else if indices.is_empty() {
            bounds.center
        } else {
            plain / indices.len() as f32
        };

        let mut node = Self {
            bounds,
            charge,
            center,
            max_radius,
            indices,
            children: std::array::from_fn(|_| None),
        };

        if depth >= QUADTREE_MAX_DEPTH || node.indices.len() <= QUADTREE_LEAF_CAPACITY {
            return node;
        }

        let mut buckets = std::array::from_fn::<_, 4, _>(|_| Vec::new());
        for &index in &node.indices {
            buckets[bounds.quadrant_for(positions[index])].push(index);
        }

        // Coincident points would otherwise recurse to the depth limit one cell at a time.
        if buckets.iter().filter(|bucket| !bucket.is_empty()).count() <= 1 {
            return node;
        }

        for (quadrant, bucket) in buckets.into_iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }

            node.children[quadrant] = Some(Box::new(Self::build_node(
                bounds.child(quadrant),
                bucket,
                positions,
                charges,
                radii,
                depth + 1,
            )));
        }
        node.indices.clear();
        node
    }

    pub(super) fn is_leaf(&self) -> bool {
        self.children.iter().all(|child| child.is_none())
    }

    pub(super) fn children(&self) -> impl Iterator<Item = &QuadNode> {
        self.children.iter().filter_map(|child| child.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_points(node: &QuadNode) -> usize {
        node.indices.len() + node.children().map(count_points).sum::<usize>()
    }

    #[test]
    fn aggregates_cover_every_point() {
        let positions = (0..40)
            .map(|index| vec2((index % 7) as f32 * 30.0, (index / 7) as f32 * 25.0))
            .collect::<Vec<_>>();
        let charges = vec![-2.0; positions.len()];
        let radii = (0..positions.len()).map(|index| index as f32).collect::<Vec<_>>();

        let tree = QuadNode::build(&positions, &charges, &radii).unwrap();
        assert!(!tree.is_leaf());
        assert_eq!(count_points(&tree), 40);
        assert_eq!(tree.charge, -80.0);
        assert_eq!(tree.max_radius, 39.0);
        for point in &positions {
            assert!(tree.bounds.contains(*point));
        }
    }

    #[test]
    fn coincident_points_stay_in_one_leaf() {
        let positions = vec![Vec2::ZERO; 20];
        let tree = QuadNode::build(&positions, &[1.0; 20], &[5.0; 20]).unwrap();
        assert!(tree.is_leaf());
        assert_eq!(tree.indices.len(), 20);
        assert_eq!(tree.center, Vec2::ZERO);
    }

    #[test]
    fn empty_input_has_no_tree() {
        assert!(QuadNode::build(&[], &[], &[]).is_none());
    }

    #[test]
    fn cell_gap_is_zero_when_touching() {
        let a = QuadBounds {
            center: Vec2::ZERO,
            half_extent: 1.0,
        };
        let b = QuadBounds {
            center: vec2(2.0, 0.0),
            half_extent: 1.0,
        };
        let c = QuadBounds {
            center: vec2(5.0, 4.0),
            half_extent: 1.0,
        };
        assert_eq!(a.distance_sq_to(b), 0.0);
        assert_eq!(a.distance_sq_to(c), 9.0 + 4.0);
    }
}
