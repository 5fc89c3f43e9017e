use std::fmt;

use serde::{Deserialize, Serialize};

/// Diagonal jitter that keeps rank-deficient one-hot blocks solvable.
const OLS_JITTER: f64 = 1e-9;

const LASSO_MAX_ITER: usize = 1000;
const LASSO_TOLERANCE: f64 = 1e-7;

/// Which least-squares variant produced a [`LinearModel`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Solver {
    Ols,
    Ridge { alpha: f64 },
    Lasso { alpha: f64 },
}

impl fmt::Display for Solver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Solver::Ols => write!(f, "OLS"),
            Solver::Ridge { alpha } => write!(f, "Ridge(alpha={alpha})"),
            Solver::Lasso { alpha } => write!(f, "Lasso(alpha={alpha})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub solver: Solver,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    pub fn predict(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }

    /// Fits on `rows`/`targets`. The intercept is never penalized.
    pub fn fit(solver: Solver, rows: &[Vec<f64>], targets: &[f64]) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        if rows.is_empty() {
            return Self {
                solver,
                intercept: 0.0,
                coefficients: vec![0.0; width],
            };
        }

        let n = rows.len() as f64;
        let x_mean: Vec<f64> = (0..width)
            .map(|j| rows.iter().map(|r| r[j]).sum::<f64>() / n)
            .collect();
        let y_mean = targets.iter().sum::<f64>() / n;
        let centered: Vec<Vec<f64>> = rows
            .iter()
            .map(|r| r.iter().zip(&x_mean).map(|(x, m)| x - m).collect())
            .collect();
        let y_centered: Vec<f64> = targets.iter().map(|y| y - y_mean).collect();

        let coefficients = match solver {
            Solver::Ols => solve_normal_equations(&centered, &y_centered, 0.0),
            Solver::Ridge { alpha } => solve_normal_equations(&centered, &y_centered, alpha),
            Solver::Lasso { alpha } => coordinate_descent(&centered, &y_centered, alpha),
        };
        let intercept = y_mean
            - coefficients
                .iter()
                .zip(&x_mean)
                .map(|(c, m)| c * m)
                .sum::<f64>();

        Self {
            solver,
            intercept,
            coefficients,
        }
    }
}

/// Solves `(XᵀX + λI) β = Xᵀy` by Gaussian elimination with partial pivoting.
fn solve_normal_equations(x: &[Vec<f64>], y: &[f64], lambda: f64) -> Vec<f64> {
    let width = x.first().map_or(0, Vec::len);
    let mut a = vec![vec![0.0; width + 1]; width];
    for (row, target) in x.iter().zip(y) {
        for i in 0..width {
            for j in i..width {
                a[i][j] += row[i] * row[j];
            }
            a[i][width] += row[i] * target;
        }
    }
    let mean_diag = (0..width).map(|i| a[i][i]).sum::<f64>() / width.max(1) as f64;
    let jitter = OLS_JITTER * mean_diag.max(1.0);
    for i in 0..width {
        for j in 0..i {
            a[i][j] = a[j][i];
        }
        a[i][i] += lambda + jitter;
    }

    for col in 0..width {
        let pivot = (col..width)
            .max_by(|&p, &q| a[p][col].abs().total_cmp(&a[q][col].abs()))
            .unwrap_or(col);
        a.swap(col, pivot);
        let p = a[col][col];
        if p.abs() < 1e-15 {
            continue;
        }
        for r in (col + 1)..width {
            let factor = a[r][col] / p;
            if factor == 0.0 {
                continue;
            }
            for c in col..=width {
                a[r][c] -= factor * a[col][c];
            }
        }
    }

    let mut beta = vec![0.0; width];
    for i in (0..width).rev() {
        let p = a[i][i];
        if p.abs() < 1e-15 {
            continue;
        }
        let tail: f64 = ((i + 1)..width).map(|j| a[i][j] * beta[j]).sum();
        beta[i] = (a[i][width] - tail) / p;
    }
    beta
}

/// Cyclic coordinate descent for `(1/2n)‖y − Xβ‖² + α‖β‖₁`.
fn coordinate_descent(x: &[Vec<f64>], y: &[f64], alpha: f64) -> Vec<f64> {
    let width = x.first().map_or(0, Vec::len);
    let n = x.len() as f64;
    let col_sq: Vec<f64> = (0..width)
        .map(|j| x.iter().map(|r| r[j] * r[j]).sum::<f64>() / n)
        .collect();

    let mut beta = vec![0.0; width];
    let mut residual = y.to_vec();
    for _ in 0..LASSO_MAX_ITER {
        let mut max_delta: f64 = 0.0;
        for j in 0..width {
            if col_sq[j] == 0.0 {
                continue;
            }
            let rho = x
                .iter()
                .zip(&residual)
                .map(|(r, res)| r[j] * (res + r[j] * beta[j]))
                .sum::<f64>()
                / n;
            let updated = soft_threshold(rho, alpha) / col_sq[j];
            let delta = updated - beta[j];
            if delta != 0.0 {
                for (r, res) in x.iter().zip(residual.iter_mut()) {
                    *res -= r[j] * delta;
                }
                beta[j] = updated;
                max_delta = max_delta.max(delta.abs());
            }
        }
        if max_delta < LASSO_TOLERANCE {
            break;
        }
    }
    beta
}

fn soft_threshold(value: f64, alpha: f64) -> f64 {
    if value > alpha {
        value - alpha
    } else if value < -alpha {
        value + alpha
    } else {
        0.0
    }
}
