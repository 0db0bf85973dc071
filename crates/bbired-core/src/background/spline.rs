/// Natural cubic spline through `(x_i, y_i)`; second derivatives vanish at
/// both ends. Outside the knot range the spline continues as the straight
/// line through the end knot with the end slope.
#[derive(Clone, Debug)]
pub struct NaturalSpline {
    x: Vec<f64>,
    /// `[a, b, c, d]` per segment: `a + b t + c t^2 + d t^3`, `t = x - x_i`.
    coeffs: Vec<[f64; 4]>,
    constant: f64,
    /// `(value, slope)` at the first and last knot.
    ends: [(f64, f64); 2],
}

impl NaturalSpline {
    /// `None` when the inputs differ in length, are empty, or `x` is not
    /// strictly increasing. A single knot gives a constant.
    pub fn new(x: &[f64], y: &[f64]) -> Option<Self> {
        if x.len() != y.len() || x.is_empty() || x.windows(2).any(|p| p[1] <= p[0]) {
            return None;
        }
        let n = x.len();
        if n == 1 {
            return Some(Self {
                x: x.to_vec(),
                coeffs: Vec::new(),
                constant: y[0],
                ends: [(y[0], 0.0); 2],
            });
        }

        let h: Vec<f64> = x.windows(2).map(|p| p[1] - p[0]).collect();
        let mut alpha = vec![0.0; n];
        for i in 1..n - 1 {
            alpha[i] = 3.0 / h[i] * (y[i + 1] - y[i]) - 3.0 / h[i - 1] * (y[i] - y[i - 1]);
        }

        // Thomas algorithm for the second-derivative system.
        let mut l = vec![1.0; n];
        let mut mu = vec![0.0; n];
        let mut z = vec![0.0; n];
        for i in 1..n - 1 {
            l[i] = 2.0 * (x[i + 1] - x[i - 1]) - h[i - 1] * mu[i - 1];
            mu[i] = h[i] / l[i];
            z[i] = (alpha[i] - h[i - 1] * z[i - 1]) / l[i];
        }

        let mut c = vec![0.0; n];
        let mut coeffs = vec![[0.0; 4]; n - 1];
        for j in (0..n - 1).rev() {
            c[j] = z[j] - mu[j] * c[j + 1];
            let b = (y[j + 1] - y[j]) / h[j] - h[j] * (c[j + 1] + 2.0 * c[j]) / 3.0;
            let d = (c[j + 1] - c[j]) / (3.0 * h[j]);
            coeffs[j] = [y[j], b, c[j], d];
        }

        let [_, b0, _, _] = coeffs[0];
        let [_, b, c, d] = coeffs[n - 2];
        let t = h[n - 2];
        let ends = [(y[0], b0), (y[n - 1], b + t * (2.0 * c + 3.0 * d * t))];

        Some(Self {
            x: x.to_vec(),
            coeffs,
            constant: y[0],
            ends,
        })
    }

    pub fn evaluate(&self, at: f64) -> f64 {
        if self.coeffs.is_empty() {
            return self.constant;
        }
        let (first, last) = (self.x[0], self.x[self.x.len() - 1]);
        if at < first {
            let (y, slope) = self.ends[0];
            return y + slope * (at - first);
        }
        if at > last {
            let (y, slope) = self.ends[1];
            return y + slope * (at - last);
        }
        let seg = (self.x.partition_point(|&k| k <= at).max(1) - 1).min(self.coeffs.len() - 1);
        let [a, b, c, d] = self.coeffs[seg];
        let t = at - self.x[seg];
        a + t * (b + t * (c + t * d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passes_through_knots() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [0.0, 1.0, 4.0, 9.0];
        let s = NaturalSpline::new(&x, &y).unwrap();
        for (xi, yi) in x.iter().zip(y.iter()) {
            assert!((s.evaluate(*xi) - yi).abs() < 1e-9);
        }
    }

    #[test]
    fn test_linear_data_extrapolates_linearly() {
        let s = NaturalSpline::new(&[0.0, 10.0, 20.0], &[1.0, 2.0, 3.0]).unwrap();
        assert!((s.evaluate(-10.0) - 0.0).abs() < 1e-9);
        assert!((s.evaluate(25.0) - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_curved_data_extrapolates_along_end_tangent() {
        // Natural spline through (0,0) (1,1) (2,0) has end slopes +-1.5.
        let s = NaturalSpline::new(&[0.0, 1.0, 2.0], &[0.0, 1.0, 0.0]).unwrap();
        assert!((s.evaluate(0.5) - 0.6875).abs() < 1e-9);
        assert!((s.evaluate(-1.0) + 1.5).abs() < 1e-9);
        assert!((s.evaluate(-2.0) + 3.0).abs() < 1e-9);
        assert!((s.evaluate(3.0) + 1.5).abs() < 1e-9);
        assert!((s.evaluate(4.0) + 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_knot_is_constant() {
        let s = NaturalSpline::new(&[5.0], &[42.0]).unwrap();
        assert_eq!(s.evaluate(-100.0), 42.0);
        assert_eq!(s.evaluate(100.0), 42.0);
    }

    #[test]
    fn test_rejects_unsorted() {
        assert!(NaturalSpline::new(&[1.0, 0.0], &[0.0, 0.0]).is_none());
    }
}
