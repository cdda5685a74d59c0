//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks of a parameter curve against its grid
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - grid values: `o`
//! - interpolated curve: `-` line
//! - flagged grid values (large pulls): `X`

use crate::fit::ParameterCurve;

/// Grid values whose absolute pull exceeds this are drawn as `X`.
pub const PULL_ALERT: f64 = 3.0;

/// A grid value to overlay on the curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotPoint {
    pub mass: f64,
    pub value: f64,
    pub flagged: bool,
}

/// Render one parameter curve with its grid values overlaid.
pub fn render_parameter_plot(
    label: &str,
    curve: &ParameterCurve,
    points: &[PlotPoint],
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let curve_points: Vec<(f64, f64)> = curve.points().collect();
    let (m_min, m_max) = mass_range(&curve_points, points).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = y_range(&curve_points, points).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Draw curve first (so points can overlay).
    draw_curve(&mut grid, &curve_points, m_min, m_max, y_min, y_max);

    for p in points {
        let x = map_x(p.mass, m_min, m_max, width);
        let y = map_y(p.value, y_min, y_max, height);
        grid[y][x] = if p.flagged { 'X' } else { 'o' };
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {label} | a=[{m_min:.3}, {m_max:.3}] | value=[{y_min:.4}, {y_max:.4}]\n"
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn mass_range(curve: &[(f64, f64)], points: &[PlotPoint]) -> Option<(f64, f64)> {
    let masses = curve.iter().map(|&(m, _)| m).chain(points.iter().map(|p| p.mass));
    min_max(masses)
}

fn y_range(curve: &[(f64, f64)], points: &[PlotPoint]) -> Option<(f64, f64)> {
    let values = curve.iter().map(|&(_, y)| y).chain(points.iter().map(|p| p.value));
    min_max(values)
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if !(min.is_finite() && max.is_finite()) {
        return None;
    }
    // A constant series gets a unit band around its value.
    if max > min { Some((min, max)) } else { Some((min - 1.0, max + 1.0)) }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(m: f64, m_min: f64, m_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((m - m_min) / (m_max - m_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], m_min: f64, m_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(m, y) in curve {
        let x = map_x(m, m_min, m_max, width);
        let yy = map_y(y, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, x, yy, '-');
        } else {
            grid[yy][x] = '-';
        }
        prev = Some((x, yy));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_curve() -> ParameterCurve {
        ParameterCurve {
            masses: vec![1.0, 10.0],
            values: vec![100.0, 100.0],
        }
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let points = [
            PlotPoint { mass: 1.0, value: 100.0, flagged: false },
            PlotPoint { mass: 10.0, value: 110.0, flagged: false },
        ];
        let txt = render_parameter_plot("xmean", &flat_curve(), &points, 10, 5);
        let expected = concat!(
            "Plot: xmean | a=[1.000, 10.000] | value=[99.5000, 110.5000]\n",
            "         o\n",
            "          \n",
            "          \n",
            "          \n",
            "o---------\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn flagged_points_are_marked() {
        let points = [PlotPoint { mass: 10.0, value: 110.0, flagged: true }];
        let txt = render_parameter_plot("ysigma1", &flat_curve(), &points, 10, 5);
        let rows: Vec<&str> = txt.lines().collect();
        assert_eq!(rows[1], "         X");
        assert_eq!(rows[5], "----------");
    }

    #[test]
    fn constant_curve_is_centered() {
        let txt = render_parameter_plot("xwidth", &flat_curve(), &[], 10, 5);
        let expected = concat!(
            "Plot: xwidth | a=[1.000, 10.000] | value=[98.9000, 101.1000]\n",
            "          \n",
            "          \n",
            "----------\n",
            "          \n",
            "          \n",
        );
        assert_eq!(txt, expected);
    }
}
