//! Polynomial least-squares fits.

use super::Stat;
use crate::error::Result;
use crate::grammar::data::DataFrame;
use crate::grammar::groupby::GroupBy;
use crate::grammar::orient::Orient;
use crate::grammar::scales::ticks::linspace;
use crate::grammar::scales::ScaleMap;

/// Fit a polynomial of the value axis on the orientation axis per group and
/// evaluate it on an evenly spaced grid spanning the data.
///
/// Groups with no more distinct positions than the polynomial order produce
/// no rows.
#[derive(Debug, Clone, Copy)]
pub struct PolyFit {
    order: usize,
    gridsize: usize,
}

impl Default for PolyFit {
    fn default() -> Self {
        Self { order: 2, gridsize: 100 }
    }
}

impl PolyFit {
    /// Quadratic fit on 100 points.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ordinary least squares line.
    #[must_use]
    pub fn ols() -> Self {
        Self::default().order(1)
    }

    /// Polynomial order.
    #[must_use]
    pub fn order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }

    /// Number of evaluation points.
    #[must_use]
    pub fn gridsize(mut self, gridsize: usize) -> Self {
        self.gridsize = gridsize;
        self
    }

    fn eval(&self, data: &DataFrame, orient: Orient) -> Result<DataFrame> {
        let xs = data.numeric(orient.var()).unwrap_or_default();
        let ys = data.numeric(orient.other()).unwrap_or_default();
        let (xs, ys): (Vec<f64>, Vec<f64>) =
            xs.into_iter().zip(ys).filter(|(x, y)| x.is_finite() && y.is_finite()).unzip();

        let mut distinct = xs.clone();
        distinct.sort_by(f64::total_cmp);
        distinct.dedup();

        let (grid, fitted) = match fit(&xs, &ys, self.order) {
            Some(poly) if distinct.len() > self.order => {
                let lo = distinct[0];
                let hi = distinct[distinct.len() - 1];
                let grid = linspace(lo, hi, self.gridsize);
                let fitted: Vec<f64> = grid.iter().map(|&x| poly.eval(x)).collect();
                (grid, fitted)
            }
            _ => (Vec::new(), Vec::new()),
        };
        DataFrame::new().column(orient.var(), grid)?.column(orient.other(), fitted)
    }
}

impl Stat for PolyFit {
    fn compute(&self, data: &DataFrame, groupby: &GroupBy, orient: Orient, _: &ScaleMap) -> Result<DataFrame> {
        let data = data.drop_nulls(&["x", "y"]);
        groupby.apply(&data, |df| self.eval(df, orient))
    }
}

/// Polynomial in a centered and scaled variable.
struct Poly {
    coef: Vec<f64>,
    center: f64,
    scale: f64,
}

impl Poly {
    fn eval(&self, x: f64) -> f64 {
        let t = (x - self.center) / self.scale;
        self.coef.iter().rev().fold(0.0, |acc, c| acc * t + c)
    }
}

/// Least squares via the normal equations, solved with partial pivoting.
fn fit(xs: &[f64], ys: &[f64], order: usize) -> Option<Poly> {
    if xs.len() <= order {
        return None;
    }
    let n = xs.len() as f64;
    let center = xs.iter().sum::<f64>() / n;
    let spread = xs.iter().map(|x| (x - center).abs()).fold(0.0, f64::max);
    let scale = if spread > 0.0 { spread } else { 1.0 };

    let m = order + 1;
    let mut a = vec![vec![0.0; m + 1]; m];
    for (&x, &y) in xs.iter().zip(ys) {
        let t = (x - center) / scale;
        let powers: Vec<f64> = (0..2 * m).scan(1.0, |p, _| {
            let cur = *p;
            *p *= t;
            Some(cur)
        })
        .collect();
        for (i, row) in a.iter_mut().enumerate() {
            for j in 0..m {
                row[j] += powers[i + j];
            }
            row[m] += powers[i] * y;
        }
    }

    for col in 0..m {
        let pivot = (col..m).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        for row in 0..m {
            if row != col {
                let factor = a[row][col] / a[col][col];
                for k in col..=m {
                    a[row][k] -= factor * a[col][k];
                }
            }
        }
    }
    let coef = (0..m).map(|i| a[i][m] / a[i][i]).collect();
    Some(Poly { coef, center, scale })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn run(stat: PolyFit, x: Vec<f64>, y: Vec<f64>) -> DataFrame {
        let data = DataFrame::new().column("x", x).unwrap().column("y", y).unwrap();
        stat.compute(&data, &GroupBy::new(["color"]).unwrap(), Orient::X, &ScaleMap::new()).unwrap()
    }

    #[test]
    fn test_recovers_quadratic() {
        let x: Vec<f64> = (0..10).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v * v - 3.0 * v + 1.0).collect();
        let res = run(PolyFit::new().gridsize(5), x, y);
        let grid = res.numeric("x").unwrap();
        let fitted = res.numeric("y").unwrap();
        assert_eq!(grid, vec![0.0, 2.25, 4.5, 6.75, 9.0]);
        for (gx, gy) in grid.iter().zip(fitted) {
            assert_relative_eq!(gy, 2.0 * gx * gx - 3.0 * gx + 1.0, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_ols_line() {
        let res = run(PolyFit::ols().gridsize(3), vec![0.0, 1.0, 2.0, 3.0], vec![1.0, 3.0, 2.0, 4.0]);
        let fitted = res.numeric("y").unwrap();
        assert_relative_eq!(fitted[0], 1.3, epsilon = 1e-10);
        assert_relative_eq!(fitted[2], 3.7, epsilon = 1e-10);
    }

    #[test]
    fn test_too_few_positions_gives_empty() {
        let res = run(PolyFit::new(), vec![1.0, 1.0, 2.0, 2.0], vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(res.nrow(), 0);
    }

    #[test]
    fn test_orient_y_fits_x_on_y() {
        let data = DataFrame::new()
            .column("x", vec![0.0, 2.0, 4.0])
            .unwrap()
            .column("y", vec![0.0, 1.0, 2.0])
            .unwrap();
        let res = PolyFit::ols()
            .gridsize(2)
            .compute(&data, &GroupBy::new(["color"]).unwrap(), Orient::Y, &ScaleMap::new())
            .unwrap();
        assert_eq!(res.numeric("y").unwrap(), vec![0.0, 2.0]);
        let x = res.numeric("x").unwrap();
        assert_relative_eq!(x[1], 4.0, epsilon = 1e-10);
    }
}
