//! ASCII/Unicode plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - average compensation per xp year: `-` line
//! - median compensation per xp year: `o`
//! - the scored profile: `X`

use crate::domain::{HistogramBucket, XpPoint};

/// Horizontal bar chart of a similarity histogram.
///
/// Bars are scaled so the fullest bucket spans `width` cells.
pub fn render_histogram(buckets: &[HistogramBucket], width: usize) -> String {
    let width = width.max(1);
    let max = buckets.iter().map(|b| b.count).max().unwrap_or(0);

    let mut out = String::new();
    for b in buckets {
        let len = if max == 0 {
            0
        } else {
            ((b.count as f64 / max as f64) * width as f64).round() as usize
        };
        out.push_str(
            format!("{:<9} |{:<width$}| {}\n", b.range, "#".repeat(len), b.count, width = width)
                .as_str(),
        );
    }
    out
}

/// Compensation by years of experience, with the scored profile overlaid.
pub fn render_xp_chart(
    average: &[XpPoint],
    median: &[XpPoint],
    target: Option<(f64, f64)>,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let avg: Vec<(f64, f64)> = average.iter().map(|p| (p.xp as f64, p.value)).collect();
    let med: Vec<(f64, f64)> = median.iter().map(|p| (p.xp as f64, p.value)).collect();

    let all = avg.iter().chain(med.iter()).copied().chain(target);
    let Some((x_min, x_max, y_min, y_max)) = bounds(all) else {
        return "Plot: no data\n".to_string();
    };
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Line first so points can overlay.
    draw_series(&mut grid, &avg, x_min, x_max, y_min, y_max);

    for &(x, y) in &med {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        grid[row][col] = 'o';
    }
    if let Some((x, y)) = target {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        grid[row][col] = 'X';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: xp=[{x_min:.0}, {x_max:.0}] years | compensation=[{y_min:.0}, {y_max:.0}]\n"
    ));
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }
    out
}

fn bounds(points: impl Iterator<Item = (f64, f64)>) -> Option<(f64, f64, f64, f64)> {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for (x, y) in points {
        if !(x.is_finite() && y.is_finite()) {
            continue;
        }
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    if !x_min.is_finite() {
        return None;
    }
    // A single column or row still needs a non-empty span.
    if x_max <= x_min {
        x_max = x_min + 1.0;
    }
    if y_max <= y_min {
        y_max = y_min + 1.0;
    }
    Some((x_min, x_max, y_min, y_max))
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_series(grid: &mut [Vec<char>], series: &[(f64, f64)], x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
    let height = grid.len();
    let width = grid.first().map(Vec::len).unwrap_or(0);
    if width == 0 {
        return;
    }

    let mut prev = None;
    for &(x, y) in series {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        if let Some((c0, r0)) = prev {
            draw_line(grid, c0, r0, col, row, '-');
        } else {
            grid[row][col] = '-';
        }
        prev = Some((col, row));
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
