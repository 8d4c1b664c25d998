use foundation::{Vec2, WorldCell};

/// Squared distance from `cell` to `center`, both in tile units
/// (`center.x` is the column axis).
pub fn distance_sq(cell: WorldCell, center: Vec2) -> f64 {
    (Vec2::new(cell.col as f64, cell.row as f64) - center).length_squared()
}

/// Sorts cells nearest-first around `center`. Ties keep their input order.
pub fn order_by_center_distance(cells: &mut [WorldCell], center: Vec2) {
    cells.sort_by(|a, b| distance_sq(*a, center).total_cmp(&distance_sq(*b, center)));
}
