//! Neighbourhood operators with mirror boundaries (`d c b | a b c d | c b a`).

use ndarray::Array2;

use crate::stats::median_in_place;

/// Reflect a possibly out-of-range index into `0..n` about the edge pixels.
#[inline]
pub(crate) fn mirror_index(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n as isize - 1);
    let mut r = i.rem_euclid(period);
    if r >= n as isize {
        r = period - r;
    }
    r as usize
}

/// Square median filter of odd `size`.
pub fn median_filter(data: &Array2<f32>, size: usize) -> Array2<f32> {
    let (h, w) = data.dim();
    let half = (size / 2) as isize;
    let mut window = Vec::with_capacity(size * size);
    let mut out = Array2::<f32>::zeros((h, w));

    for row in 0..h {
        for col in 0..w {
            window.clear();
            for dr in -half..=half {
                let r = mirror_index(row as isize + dr, h);
                for dc in -half..=half {
                    let c = mirror_index(col as isize + dc, w);
                    window.push(data[[r, c]]);
                }
            }
            out[[row, col]] = median_in_place(&mut window);
        }
    }
    out
}

/// Laplacian `4c - (n + s + e + w)`.
pub fn laplacian(data: &Array2<f32>) -> Array2<f32> {
    let (h, w) = data.dim();
    Array2::from_shape_fn((h, w), |(row, col)| {
        let r = row as isize;
        let c = col as isize;
        let up = data[[mirror_index(r - 1, h), col]];
        let down = data[[mirror_index(r + 1, h), col]];
        let left = data[[row, mirror_index(c - 1, w)]];
        let right = data[[row, mirror_index(c + 1, w)]];
        4.0 * data[[row, col]] - up - down - left - right
    })
}

/// Replicate every pixel into a 2x2 block.
pub fn upsample2(data: &Array2<f32>) -> Array2<f32> {
    let (h, w) = data.dim();
    Array2::from_shape_fn((2 * h, 2 * w), |(row, col)| data[[row / 2, col / 2]])
}

/// Mean of each 2x2 block.
pub fn downsample2(data: &Array2<f32>) -> Array2<f32> {
    let (h, w) = data.dim();
    Array2::from_shape_fn((h / 2, w / 2), |(row, col)| {
        let r = 2 * row;
        let c = 2 * col;
        0.25 * (data[[r, c]] + data[[r + 1, c]] + data[[r, c + 1]] + data[[r + 1, c + 1]])
    })
}

/// Binary dilation with a 3x3 square; out-of-bounds neighbours count as false.
pub fn dilate3(mask: &Array2<bool>) -> Array2<bool> {
    let (h, w) = mask.dim();
    Array2::from_shape_fn((h, w), |(row, col)| {
        let r0 = row.saturating_sub(1);
        let c0 = col.saturating_sub(1);
        let r1 = (row + 1).min(h - 1);
        let c1 = (col + 1).min(w - 1);
        (r0..=r1).any(|r| (c0..=c1).any(|c| mask[[r, c]]))
    })
}
