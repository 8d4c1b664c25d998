use crate::math::Vec2;

/// Axis-aligned bounding box in continuous (world or screen) space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb2 {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Aabb2 { min, max }
    }

    /// Smallest box containing every point. `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Vec2>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut b = Aabb2::new(first, first);
        for p in iter {
            b.min.x = b.min.x.min(p.x);
            b.min.y = b.min.y.min(p.y);
            b.max.x = b.max.x.max(p.x);
            b.max.y = b.max.y.max(p.y);
        }
        Some(b)
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) / 2.0
    }
}

/// Integer pixel rectangle on the rendering surface.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScreenRect {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

impl ScreenRect {
    pub fn new(x: i64, y: i64, w: i64, h: i64) -> Self {
        ScreenRect { x, y, w, h }
    }

    pub fn right(&self) -> i64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i64 {
        self.y + self.h
    }
}

#[cfg(test)]
mod tests {
    use super::{Aabb2, ScreenRect};
    use crate::math::Vec2;

    #[test]
    fn from_points_takes_min_max_per_axis() {
        let b = Aabb2::from_points([
            Vec2::new(4.0, -1.0),
            Vec2::new(-2.0, 3.0),
            Vec2::new(1.0, 7.5),
        ])
        .unwrap();
        assert_eq!(b.min, Vec2::new(-2.0, -1.0));
        assert_eq!(b.max, Vec2::new(4.0, 7.5));
        assert_eq!(b.center(), Vec2::new(1.0, 3.25));
    }

    #[test]
    fn from_points_empty_is_none() {
        assert!(Aabb2::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn screen_rect_edges() {
        let r = ScreenRect::new(-3, 10, 20, 5);
        assert_eq!(r.right(), 17);
        assert_eq!(r.bottom(), 15);
    }
}
