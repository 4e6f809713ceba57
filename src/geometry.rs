use glam::DVec2;

/// 2D vector in world space. `y` grows downwards.
pub type Vector2 = DVec2;

/// Axis-aligned rectangle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub origin: Vector2,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Negative sizes are clamped to zero.
    pub fn new(origin: Vector2, width: f64, height: f64) -> Self {
        Self {
            origin,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(Vector2::new(x, y), width, height)
    }

    /// Build the rectangle spanning two corners.
    pub fn from_corners(left_top: Vector2, right_bottom: Vector2) -> Self {
        Self::new(
            left_top,
            right_bottom.x - left_top.x,
            right_bottom.y - left_top.y,
        )
    }

    pub fn left(&self) -> f64 {
        self.origin.x
    }

    pub fn right(&self) -> f64 {
        self.origin.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.origin.y
    }

    pub fn bottom(&self) -> f64 {
        self.origin.y + self.height
    }

    pub fn center(&self) -> Vector2 {
        Vector2::new(
            self.origin.x + self.width * 0.5,
            self.origin.y + self.height * 0.5,
        )
    }

    /// Point containment, edges included.
    pub fn contains(&self, point: Vector2) -> bool {
        self.left() <= point.x
            && point.x <= self.right()
            && self.top() <= point.y
            && point.y <= self.bottom()
    }

    /// True if `other` lies entirely inside this rectangle, edges included.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.left() <= other.left()
            && other.right() <= self.right()
            && self.top() <= other.top()
            && other.bottom() <= self.bottom()
    }

    /// Closed-interval overlap test: rectangles that only touch still collide.
    pub fn collides(&self, other: &Rect) -> bool {
        self.right() >= other.left()
            && other.right() >= self.left()
            && self.bottom() >= other.top()
            && other.bottom() >= self.top()
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        let left_top = self.origin.min(other.origin);
        let right_bottom = Vector2::new(
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        );
        Rect::from_corners(left_top, right_bottom)
    }

    /// Bounding box of a sequence of rectangles, `None` when it is empty.
    pub fn bounding<'a, I>(rects: I) -> Option<Rect>
    where
        I: IntoIterator<Item = &'a Rect>,
    {
        let mut left = f64::INFINITY;
        let mut top = f64::INFINITY;
        let mut right = f64::NEG_INFINITY;
        let mut bottom = f64::NEG_INFINITY;
        let mut any = false;

        for rect in rects {
            any = true;
            left = left.min(rect.left());
            top = top.min(rect.top());
            right = right.max(rect.right());
            bottom = bottom.max(rect.bottom());
        }

        any.then(|| Rect::from_corners(Vector2::new(left, top), Vector2::new(right, bottom)))
    }

    /// Grow by `amount` on all four sides.
    pub fn inflate(&self, amount: f64) -> Rect {
        Rect::new(
            self.origin - Vector2::splat(amount),
            self.width + amount * 2.0,
            self.height + amount * 2.0,
        )
    }

    pub fn with_origin(&self, origin: Vector2) -> Rect {
        Rect { origin, ..*self }
    }

    /// Width and height are bit-for-bit equal.
    pub fn same_size(&self, other: &Rect) -> bool {
        self.width == other.width && self.height == other.height
    }
}
