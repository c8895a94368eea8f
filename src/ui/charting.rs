/// Axis bounds for a chart: x spans at least `min_x`, y spans at least
/// `min_y` and the highest point, rounded up to a multiple of ten.
pub fn compute_chart_bounds(points: &[(f64, f64)], min_x: f64, min_y: f64) -> (f64, f64) {
    let highest_y = points.iter().map(|&(_, y)| y).fold(min_y, f64::max);
    let last_x = points.iter().map(|&(x, _)| x).fold(min_x, f64::max);

    (last_x.max(1.0), ((highest_y / 10.0).ceil() * 10.0).max(10.0))
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.1}")
    }
}
