//! Per-tile sky statistics on a coarse grid.

use ndarray::Array2;

use crate::consts::{
    BACKGROUND_CLIP_ITERATIONS, BACKGROUND_CLIP_SIGMA, BACKGROUND_CROWDING_LIMIT,
    BACKGROUND_MIN_GOOD_FRACTION,
};
use crate::stats::{mean_stddev, median_in_place};

/// Sky level and noise of one tile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileStats {
    pub level: f32,
    pub rms: f32,
}

/// Tile statistics plus the pixel centres of the tiles along each axis.
#[derive(Clone, Debug)]
pub struct TileGrid {
    pub level: Array2<f32>,
    pub rms: Array2<f32>,
    pub centers_y: Vec<f64>,
    pub centers_x: Vec<f64>,
}

/// Sigma-clipped mode estimate of a tile. `None` when fewer than half of
/// `area` pixels are finite.
pub fn tile_stats(values: &mut Vec<f32>, area: usize) -> Option<TileStats> {
    values.retain(|v| v.is_finite());
    if values.is_empty() || (values.len() as f64) < BACKGROUND_MIN_GOOD_FRACTION * area as f64 {
        return None;
    }

    let mut scratch = Vec::with_capacity(values.len());
    for _ in 0..BACKGROUND_CLIP_ITERATIONS {
        scratch.clear();
        scratch.extend_from_slice(values);
        let median = median_in_place(&mut scratch) as f64;
        let (_, sigma) = mean_stddev(values);
        if sigma <= 0.0 {
            break;
        }
        let limit = BACKGROUND_CLIP_SIGMA * sigma;
        let before = values.len();
        values.retain(|&v| (v as f64 - median).abs() <= limit);
        if values.len() == before || values.is_empty() {
            break;
        }
    }
    if values.is_empty() {
        return None;
    }

    scratch.clear();
    scratch.extend_from_slice(values);
    let median = median_in_place(&mut scratch) as f64;
    let (mean, sigma) = mean_stddev(values);
    let level = if sigma > 0.0 && ((mean - median) / sigma).abs() < BACKGROUND_CROWDING_LIMIT {
        2.5 * median - 1.5 * mean
    } else {
        median
    };
    Some(TileStats {
        level: level as f32,
        rms: sigma as f32,
    })
}

/// Measure every tile of `data`; the last row/column of tiles may be partial.
/// `None` when no tile has enough finite pixels.
pub fn measure_tiles(data: &Array2<f32>, box_size: usize) -> Option<TileGrid> {
    let (h, w) = data.dim();
    let ny = h.div_ceil(box_size);
    let nx = w.div_ceil(box_size);

    let mut stats = Array2::<Option<TileStats>>::from_elem((ny, nx), None);
    let mut values = Vec::with_capacity(box_size * box_size);
    for ty in 0..ny {
        for tx in 0..nx {
            let (y0, y1) = tile_span(ty, box_size, h);
            let (x0, x1) = tile_span(tx, box_size, w);
            values.clear();
            for row in y0..y1 {
                values.extend((x0..x1).map(|col| data[[row, col]]));
            }
            stats[[ty, tx]] = tile_stats(&mut values, (y1 - y0) * (x1 - x0));
        }
    }

    let filled = fill_invalid(&stats)?;
    Some(TileGrid {
        level: filled.mapv(|s| s.level),
        rms: filled.mapv(|s| s.rms),
        centers_y: (0..ny).map(|t| tile_center(t, box_size, h)).collect(),
        centers_x: (0..nx).map(|t| tile_center(t, box_size, w)).collect(),
    })
}

fn tile_span(t: usize, box_size: usize, n: usize) -> (usize, usize) {
    let start = t * box_size;
    (start, (start + box_size).min(n))
}

fn tile_center(t: usize, box_size: usize, n: usize) -> f64 {
    let (start, end) = tile_span(t, box_size, n);
    (start + end) as f64 * 0.5
}

/// Replace invalid tiles with their nearest valid neighbour on the grid.
fn fill_invalid(stats: &Array2<Option<TileStats>>) -> Option<Array2<TileStats>> {
    let valid: Vec<((usize, usize), TileStats)> = stats
        .indexed_iter()
        .filter_map(|(idx, s)| s.map(|s| (idx, s)))
        .collect();
    if valid.is_empty() {
        return None;
    }
    let nearest = |(r, c): (usize, usize)| {
        valid
            .iter()
            .min_by_key(|((vr, vc), _)| {
                let dr = r.abs_diff(*vr);
                let dc = c.abs_diff(*vc);
                dr * dr + dc * dc
            })
            .map(|(_, s)| *s)
    };
    let mut out = Array2::from_elem(stats.dim(), valid[0].1);
    for (idx, s) in stats.indexed_iter() {
        out[idx] = match s {
            Some(s) => *s,
            None => nearest(idx)?,
        };
    }
    Some(out)
}

/// Median filter of the tile grid with a window clipped at the grid edges.
pub fn filter_grid(grid: &Array2<f32>, size: usize) -> Array2<f32> {
    if size <= 1 {
        return grid.clone();
    }
    let (ny, nx) = grid.dim();
    let half = size / 2;
    let mut window = Vec::with_capacity(size * size);
    Array2::from_shape_fn((ny, nx), |(r, c)| {
        window.clear();
        for rr in r.saturating_sub(half)..(r + half + 1).min(ny) {
            for cc in c.saturating_sub(half)..(c + half + 1).min(nx) {
                window.push(grid[[rr, cc]]);
            }
        }
        median_in_place(&mut window)
    })
}
