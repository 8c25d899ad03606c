//! Maximum-weight one-to-one assignment (Kuhn–Munkres).
//!
//! Weights are correspondence scores in `[0, 1]`, stored row-major. The
//! solver minimizes `1 - w` over a complete assignment of the shorter side,
//! which maximizes the total weight because every row must be assigned.

/// Result of an assignment: total weight and the chosen `(row, col)` pairs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Assignment {
    pub total: f32,
    pub pairs: Vec<(usize, usize)>,
}

impl Assignment {
    /// Number of assigned pairs carrying non-zero weight.
    pub fn matched(&self, weights: &[f32], cols: usize) -> usize {
        self.pairs
            .iter()
            .filter(|&&(r, c)| weights[r * cols + c] > 0.0)
            .count()
    }
}

/// Solves the rectangular assignment problem for a `rows x cols` matrix.
///
/// No row or column is used twice. Zero-weight pairs may be part of the
/// returned assignment; they contribute nothing to `total`.
pub fn max_weight_assignment(weights: &[f32], rows: usize, cols: usize) -> Assignment {
    debug_assert_eq!(weights.len(), rows * cols);
    if rows == 0 || cols == 0 {
        return Assignment::default();
    }

    let transposed = rows > cols;
    let (n, m) = if transposed { (cols, rows) } else { (rows, cols) };
    let cost = |i: usize, j: usize| -> f64 {
        let w = if transposed {
            weights[j * cols + i]
        } else {
            weights[i * cols + j]
        };
        1.0 - w as f64
    };

    // 1-based potentials; p[j] is the row matched to column j (0 = free).
    let mut u = vec![0.0f64; n + 1];
    let mut v = vec![0.0f64; m + 1];
    let mut p = vec![0usize; m + 1];
    let mut way = vec![0usize; m + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0usize;
        let mut minv = vec![f64::INFINITY; m + 1];
        let mut used = vec![false; m + 1];
        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0usize;
            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let cur = cost(i0 - 1, j - 1) - u[i0] - v[j];
                if cur < minv[j] {
                    minv[j] = cur;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }
            for j in 0..=m {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }
            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut pairs = Vec::with_capacity(n);
    let mut total = 0.0f32;
    for (j, &i) in p.iter().enumerate().skip(1) {
        if i == 0 {
            continue;
        }
        let (r, c) = if transposed {
            (j - 1, i - 1)
        } else {
            (i - 1, j - 1)
        };
        total += weights[r * cols + c];
        pairs.push((r, c));
    }
    pairs.sort_unstable();

    Assignment { total, pairs }
}
