use crate::geometry::{Rect, Vector2};

/// Smallest gap the packers will leave between neighbours.
///
/// Collisions are closed-interval, so two rectangles sharing an edge collide.
/// With a zero margin the slide step could never clear a neighbour.
pub const MIN_GAP: f64 = 1e-3;

fn effective_gap(margin: f64) -> f64 {
    if margin > MIN_GAP {
        margin
    } else {
        MIN_GAP
    }
}

/// `value + gap`, nudged up when `gap` is lost to rounding at large
/// magnitudes. The result is always strictly greater than `value`.
fn advance(value: f64, gap: f64) -> f64 {
    let next = value + gap;
    if next > value {
        next
    } else {
        value + value.abs() * f64::EPSILON
    }
}

/// A packing algorithm for a flat list of fixed-size rectangles.
///
/// Implementations return one rectangle per input, in input order, with the
/// size untouched and only the origin changed. Output lives in a local frame
/// starting at the origin; the caller re-bases it and adds outer padding.
pub trait PackStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn pack(&self, rects: &[Rect], margin: f64) -> Vec<Rect>;
}

/// Pack with the default strategy.
pub fn pack(rects: &[Rect], margin: f64) -> Vec<Rect> {
    GreedyPacker.pack(rects, margin)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slide {
    /// Push the candidate down (used when appending to the right).
    Down,
    /// Push the candidate right (used when appending below).
    Right,
}

/// Slide `candidate` along one axis until it clears every placed rectangle.
///
/// Every slide leaves the blocking rectangle strictly behind the candidate and
/// the candidate only ever moves forward, so each placed rectangle can block
/// at most once.
fn slide_clear(mut candidate: Rect, placed: &[Rect], gap: f64, slide: Slide) -> Rect {
    let mut slides = 0usize;
    while let Some(hit) = placed.iter().find(|r| candidate.collides(r)) {
        match slide {
            Slide::Down => candidate.origin.y = advance(hit.bottom(), gap),
            Slide::Right => candidate.origin.x = advance(hit.right(), gap),
        }
        slides += 1;
        if slides > placed.len() {
            debug_assert!(false, "slide did not settle after {} steps", slides);
            break;
        }
    }
    candidate
}

fn append_right(anchor: &Rect, rect: &Rect, placed: &[Rect], gap: f64) -> Rect {
    let candidate = rect.with_origin(Vector2::new(advance(anchor.right(), gap), anchor.top()));
    slide_clear(candidate, placed, gap, Slide::Down)
}

fn append_bottom(anchor: &Rect, rect: &Rect, placed: &[Rect], gap: f64) -> Rect {
    let candidate = rect.with_origin(Vector2::new(anchor.left(), advance(anchor.bottom(), gap)));
    slide_clear(candidate, placed, gap, Slide::Right)
}

/// Scored greedy placement.
///
/// Every new rectangle is tried to the right of and below each rectangle
/// already placed. The candidate that grows the running bounding box the
/// least wins; ties prefer the squarer box, then the earliest candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyPacker;

#[derive(Debug, Clone, Copy)]
struct Candidate {
    rect: Rect,
    space_score: f64,
    shape_score: f64,
}

impl Candidate {
    fn score(rect: Rect, width: f64, height: f64) -> Self {
        Self {
            rect,
            space_score: (rect.right() - width) + (rect.bottom() - height),
            shape_score: (rect.right().max(width) - rect.bottom().max(height)).abs(),
        }
    }

    fn beats(&self, other: &Candidate) -> bool {
        self.space_score < other.space_score
            || (self.space_score == other.space_score && self.shape_score < other.shape_score)
    }
}

impl PackStrategy for GreedyPacker {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn pack(&self, rects: &[Rect], margin: f64) -> Vec<Rect> {
        let Some((first, rest)) = rects.split_first() else {
            return Vec::new();
        };
        let gap = effective_gap(margin);

        let mut placed = Vec::with_capacity(rects.len());
        placed.push(first.with_origin(Vector2::ZERO));
        let mut width = first.width;
        let mut height = first.height;

        for rect in rest {
            let mut best: Option<Candidate> = None;

            for anchor in &placed {
                for candidate in [
                    append_right(anchor, rect, &placed, gap),
                    append_bottom(anchor, rect, &placed, gap),
                ] {
                    let scored = Candidate::score(candidate, width, height);
                    if best.map_or(true, |current| scored.beats(&current)) {
                        best = Some(scored);
                    }
                }
            }

            // `placed` is never empty here, so a candidate always exists.
            let winner = best.map_or(rect.with_origin(Vector2::ZERO), |c| c.rect);
            width = width.max(winner.right());
            height = height.max(winner.bottom());
            placed.push(winner);
        }

        placed
    }
}

/// Left-aligned column, one rectangle under the other.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerticalPacker;

impl PackStrategy for VerticalPacker {
    fn name(&self) -> &'static str {
        "vertical"
    }

    fn pack(&self, rects: &[Rect], margin: f64) -> Vec<Rect> {
        let gap = effective_gap(margin);
        let mut current_y = gap;

        rects
            .iter()
            .map(|rect| {
                let placed = rect.with_origin(Vector2::new(gap, current_y));
                current_y = advance(placed.bottom(), gap);
                placed
            })
            .collect()
    }
}

/// Keep appending next to the rectangle that last extended the bounding box:
/// to its right while the box is taller than wide, below it otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct RightBottomPacker;

impl PackStrategy for RightBottomPacker {
    fn name(&self) -> &'static str {
        "right-bottom"
    }

    fn pack(&self, rects: &[Rect], margin: f64) -> Vec<Rect> {
        let Some((first, rest)) = rects.split_first() else {
            return Vec::new();
        };
        let gap = effective_gap(margin);

        let mut placed = Vec::with_capacity(rects.len());
        placed.push(first.with_origin(Vector2::ZERO));
        let mut width = first.width;
        let mut height = first.height;
        let mut extreme = 0usize;

        for rect in rest {
            let anchor = placed[extreme];
            let grow_right = width < height;
            let next = if grow_right {
                append_right(&anchor, rect, &placed, gap)
            } else {
                append_bottom(&anchor, rect, &placed, gap)
            };

            if (grow_right && next.right() > width) || (!grow_right && next.bottom() > height) {
                extreme = placed.len();
            }
            width = width.max(next.right());
            height = height.max(next.bottom());
            placed.push(next);
        }

        placed
    }
}

/// Row-wrapping shelves aimed at a roughly square bounding box.
///
/// Linear time, so it is the choice for large collections of similar items
/// where the quadratic greedy search gets expensive.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShelfPacker;

impl ShelfPacker {
    fn row_width(rects: &[Rect], gap: f64) -> f64 {
        let area: f64 = rects
            .iter()
            .map(|r| (r.width + gap) * (r.height + gap))
            .sum();
        let widest = rects.iter().map(|r| r.width).fold(0.0f64, f64::max);
        area.sqrt().max(widest)
    }

    /// Fill rows in `order`; results stay at the input indices.
    fn shelve(rects: &[Rect], order: impl IntoIterator<Item = usize>, gap: f64) -> Vec<Rect> {
        let row_width = Self::row_width(rects, gap);

        let mut placed = rects.to_vec();
        let mut x = 0.0f64;
        let mut y = 0.0f64;
        let mut row_bottom = 0.0f64;
        let mut row_len = 0usize;

        for i in order {
            let rect = &rects[i];
            if row_len > 0 && x + rect.width > row_width {
                x = 0.0;
                y = advance(row_bottom, gap);
                row_len = 0;
            }
            let next = rect.with_origin(Vector2::new(x, y));
            x = advance(next.right(), gap);
            row_bottom = if row_len == 0 {
                next.bottom()
            } else {
                row_bottom.max(next.bottom())
            };
            row_len += 1;
            placed[i] = next;
        }

        placed
    }
}

impl PackStrategy for ShelfPacker {
    fn name(&self) -> &'static str {
        "shelf"
    }

    fn pack(&self, rects: &[Rect], margin: f64) -> Vec<Rect> {
        if rects.is_empty() {
            return Vec::new();
        }
        Self::shelve(rects, 0..rects.len(), effective_gap(margin))
    }
}

/// Shelves filled tallest first, so rectangles of similar height share rows.
///
/// In a large mixed folder the tall folders end up in bands above the files.
/// `O(n log n)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeightShelfPacker;

impl PackStrategy for HeightShelfPacker {
    fn name(&self) -> &'static str {
        "shelf-by-height"
    }

    fn pack(&self, rects: &[Rect], margin: f64) -> Vec<Rect> {
        if rects.is_empty() {
            return Vec::new();
        }
        let mut order: Vec<usize> = (0..rects.len()).collect();
        // Stable, so equal heights keep their input order.
        order.sort_by(|&a, &b| rects[b].height.total_cmp(&rects[a].height));
        ShelfPacker::shelve(rects, order, effective_gap(margin))
    }
}

/// Chooses a strategy for one folder's direct children.
#[derive(Debug, Clone, Copy)]
pub struct PackPolicy {
    /// Collections smaller than this always use the greedy packer.
    pub greedy_limit: usize,
}

impl Default for PackPolicy {
    fn default() -> Self {
        Self { greedy_limit: 100 }
    }
}

impl PackPolicy {
    pub fn new(greedy_limit: usize) -> Self {
        Self { greedy_limit }
    }

    /// `homogeneous` means all files or all folders.
    pub fn select(&self, len: usize, homogeneous: bool) -> &'static dyn PackStrategy {
        if len < self.greedy_limit {
            &GreedyPacker
        } else if homogeneous {
            &ShelfPacker
        } else {
            &HeightShelfPacker
        }
    }
}

/// Index pairs of output rectangles that collide. Empty for a valid packing.
pub fn colliding_pairs(rects: &[Rect]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for i in 0..rects.len() {
        for j in (i + 1)..rects.len() {
            if rects[i].collides(&rects[j]) {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes(dims: &[(f64, f64)]) -> Vec<Rect> {
        dims.iter()
            .map(|&(w, h)| Rect::from_xywh(0.0, 0.0, w, h))
            .collect()
    }

    const ALL: [&dyn PackStrategy; 5] = [
        &GreedyPacker,
        &VerticalPacker,
        &RightBottomPacker,
        &ShelfPacker,
        &HeightShelfPacker,
    ];

    fn assert_valid(input: &[Rect], output: &[Rect]) {
        assert_eq!(input.len(), output.len());
        for (a, b) in input.iter().zip(output) {
            assert!(a.same_size(b), "size changed: {:?} -> {:?}", a, b);
        }
        assert!(colliding_pairs(output).is_empty(), "overlaps: {:?}", colliding_pairs(output));
    }

    #[test]
    fn test_diagonal_pair_is_placed_side_by_side() {
        let rects = vec![
            Rect::from_xywh(0.0, 0.0, 10.0, 10.0),
            Rect::from_xywh(10.0, 10.0, 1.0, 1.0),
        ];
        let packed = pack(&rects, 2.0);

        assert_valid(&rects, &packed);
        assert_eq!(packed[0].origin, Vector2::ZERO);
        assert_eq!(packed[1].origin, Vector2::new(12.0, 0.0));
    }

    #[test]
    fn test_empty_and_single() {
        assert!(pack(&[], 5.0).is_empty());

        let one = vec![Rect::from_xywh(40.0, -3.0, 7.0, 9.0)];
        let packed = pack(&one, 5.0);
        assert_eq!(packed, vec![Rect::from_xywh(0.0, 0.0, 7.0, 9.0)]);
    }

    #[test]
    fn test_does_not_mutate_input() {
        let rects = sizes(&[(30.0, 10.0), (10.0, 30.0), (20.0, 20.0)]);
        let before = rects.clone();
        let _ = pack(&rects, 4.0);
        assert_eq!(rects, before);
    }

    #[test]
    fn test_greedy_stays_compact() {
        let rects = sizes(&[(100.0, 100.0); 4]);
        let packed = pack(&rects, 10.0);
        assert_valid(&rects, &packed);

        let bounds = Rect::bounding(&packed).unwrap();
        // Four equal squares settle into a 2x2 block.
        assert_eq!(bounds.width, 210.0);
        assert_eq!(bounds.height, 210.0);
    }

    #[test]
    fn test_zero_margin_terminates_without_overlap() {
        let rects = sizes(&[(5.0, 5.0), (5.0, 5.0), (3.0, 8.0), (8.0, 3.0)]);
        let packed = pack(&rects, 0.0);
        assert_valid(&rects, &packed);
    }

    #[test]
    fn test_greedy_is_deterministic() {
        let rects = sizes(&[(200.0, 100.0), (300.0, 100.0), (150.0, 100.0), (48.0, 500.0)]);
        assert_eq!(pack(&rects, 50.0), pack(&rects, 50.0));
    }

    #[test]
    fn test_all_strategies_are_valid() {
        let rects = sizes(&[
            (120.0, 100.0),
            (48.0, 500.0),
            (240.0, 100.0),
            (72.0, 100.0),
            (400.0, 650.0),
            (96.0, 100.0),
        ]);
        for strategy in ALL {
            let packed = strategy.pack(&rects, 50.0);
            assert_valid(&rects, &packed);
            assert!(strategy.pack(&[], 50.0).is_empty(), "{} on empty", strategy.name());
        }
    }

    #[test]
    fn test_vertical_stacks_from_margin() {
        let rects = sizes(&[(10.0, 20.0), (30.0, 5.0)]);
        let packed = VerticalPacker.pack(&rects, 2.0);
        assert_eq!(packed[0].origin, Vector2::new(2.0, 2.0));
        assert_eq!(packed[1].origin, Vector2::new(2.0, 24.0));
    }

    #[test]
    fn test_shelf_wraps_rows() {
        let rects = sizes(&[(10.0, 10.0); 9]);
        let packed = ShelfPacker.pack(&rects, 0.0);
        assert_valid(&rects, &packed);

        let rows: std::collections::BTreeSet<u64> =
            packed.iter().map(|r| r.top().to_bits()).collect();
        assert_eq!(rows.len(), 3, "nine squares wrap into three rows");
    }

    #[test]
    fn test_policy_selection() {
        let policy = PackPolicy::default();
        assert_eq!(policy.select(10, true).name(), "greedy");
        assert_eq!(policy.select(99, false).name(), "greedy");
        assert_eq!(policy.select(500, false).name(), "shelf-by-height");
        assert_eq!(policy.select(500, true).name(), "shelf");
        assert_eq!(PackPolicy::new(1000).select(500, true).name(), "greedy");
    }

    #[test]
    fn test_huge_coordinates_still_separate() {
        let rects = sizes(&[(1e14, 1e14), (1e14, 1e14), (3.0, 3.0)]);
        for strategy in ALL {
            let packed = strategy.pack(&rects, 0.0);
            assert_valid(&rects, &packed);
        }
    }

    #[test]
    fn test_advance_always_moves_forward() {
        assert_eq!(advance(10.0, 2.0), 12.0);
        for value in [1e14, 1e300, -1e14] {
            assert!(advance(value, MIN_GAP) > value);
        }
    }

    #[test]
    fn test_height_shelf_bands_tall_items_first() {
        let mut dims = Vec::new();
        for i in 0..60 {
            dims.push((24.0 * (1 + i % 7) as f64, 100.0));
            if i % 10 == 0 {
                dims.push((96.0, 500.0));
            }
        }
        let rects = sizes(&dims);
        let packed = HeightShelfPacker.pack(&rects, 50.0);
        assert_valid(&rects, &packed);

        let lowest_folder = packed
            .iter()
            .filter(|r| r.height == 500.0)
            .map(|r| r.top())
            .fold(f64::NEG_INFINITY, f64::max);
        let highest_file = packed
            .iter()
            .filter(|r| r.height == 100.0)
            .map(|r| r.top())
            .fold(f64::INFINITY, f64::min);
        assert!(lowest_folder <= highest_file);
    }

    #[test]
    fn test_large_mixed_collection_is_packed_quickly() {
        let mut dims = Vec::new();
        for i in 0..1500 {
            dims.push((24.0 * (5 + i % 11) as f64, 100.0));
            if i % 50 == 0 {
                dims.push((48.0 * (3 + i % 4) as f64, 500.0));
            }
        }
        let rects = sizes(&dims);
        let strategy = PackPolicy::default().select(rects.len(), false);

        let start = std::time::Instant::now();
        let packed = strategy.pack(&rects, 50.0);
        assert!(start.elapsed() < std::time::Duration::from_secs(2));
        assert_valid(&rects, &packed);
    }
}
