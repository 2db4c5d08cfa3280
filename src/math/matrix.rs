use rand::Rng;
use serde::{Serialize, Deserialize};
use std::ops::{Add, Sub, Mul};

use crate::context::ExecutionContext;
use crate::error::{Result, SkyError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix{
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<f64>>
}

impl Matrix{
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix{
            rows,
            cols,
            data: vec![vec![0.0; cols]; rows]
        }
    }

    /// Samples every entry from U(-bound, bound).
    ///
    /// The caller owns the generator so that a fixed seed reproduces the same
    /// parameters run after run.
    pub fn uniform<R: Rng + ?Sized>(rows: usize, cols: usize, bound: f64, rng: &mut R) -> Matrix {
        let mut res = Matrix::zeros(rows, cols);

        for i in 0..rows {
            for j in 0..cols {
                res.data[i][j] = (rng.gen::<f64>() * 2.0 - 1.0) * bound;
            }
        }

        res
    }

    pub fn transpose(&self) -> Matrix {
        let mut res = Matrix::zeros(self.cols, self.rows);

        for i in 0..res.rows {
            for j in 0..res.cols {
                res.data[i][j] = self.data[j][i];
            }
        }

        res
    }

    pub fn map<F>(&self, functor: F) -> Matrix
    where
        F: Fn(f64) -> f64,
    {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data
                .iter()
                .map(|row| row.iter().map(|&x| functor(x)).collect())
                .collect(),
        }
    }

    /// Builds a matrix from rows, rejecting ragged input.
    pub fn from_rows(data: Vec<Vec<f64>>) -> Result<Matrix> {
        let cols = data.first().map(|r| r.len()).unwrap_or(0);
        if let Some(bad) = data.iter().find(|r| r.len() != cols) {
            return Err(SkyError::shape("matrix row", vec![cols], vec![bad.len()]));
        }
        Ok(Matrix { rows: data.len(), cols, data })
    }

    /// Matrix product, row-parallel under `ExecutionContext::Accelerator`.
    pub fn matmul(&self, rhs: &Matrix, ctx: ExecutionContext) -> Result<Matrix> {
        if self.cols != rhs.rows {
            return Err(SkyError::shape(
                "matrix product",
                vec![self.rows, self.cols, self.cols, rhs.cols],
                vec![self.rows, self.cols, rhs.rows, rhs.cols],
            ));
        }

        let data = ctx.map_indexed(self.rows, |i| {
            let row = &self.data[i];
            (0..rhs.cols)
                .map(|j| {
                    let mut sum = 0.0;
                    for k in 0..self.cols {
                        sum += row[k] * rhs.data[k][j];
                    }
                    sum
                })
                .collect::<Vec<f64>>()
        });

        Ok(Matrix { rows: self.rows, cols: rhs.cols, data })
    }

    /// Adds `row` (a 1×cols matrix) to every row.
    pub fn add_row(&self, row: &Matrix) -> Matrix {
        assert_eq!(row.rows, 1);
        assert_eq!(row.cols, self.cols);
        let mut res = self.clone();
        for r in res.data.iter_mut() {
            for (x, b) in r.iter_mut().zip(row.data[0].iter()) {
                *x += b;
            }
        }
        res
    }

    /// Column sums as a 1×cols matrix.
    pub fn sum_rows(&self) -> Matrix {
        let mut res = Matrix::zeros(1, self.cols);
        for row in &self.data {
            for (acc, x) in res.data[0].iter_mut().zip(row.iter()) {
                *acc += x;
            }
        }
        res
    }

    /// Element-wise (Hadamard) product of two same-shape matrices.
    pub fn hadamard(&self, other: &Matrix) -> Matrix {
        assert_eq!(self.rows, other.rows);
        assert_eq!(self.cols, other.cols);
        let data = self.data.iter().zip(other.data.iter())
            .map(|(row_a, row_b)| {
                row_a.iter().zip(row_b.iter()).map(|(x, y)| x * y).collect()
            })
            .collect();
        Matrix { rows: self.rows, cols: self.cols, data }
    }

    pub fn same_shape(&self, other: &Matrix) -> bool {
        self.rows == other.rows && self.cols == other.cols
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix { rows: 0, cols: 0, data: vec![] }
    }
}

impl Add for Matrix {
    type Output = Matrix;

    fn add(self, rhs: Self) -> Self::Output {
        if self.rows != rhs.rows || self.cols != rhs.cols {
            panic!("Matrices are of incorrect sizes")
        }

        let mut res = Matrix::zeros(self.rows, self.cols);

        for i in 0..self.rows {
            for j in 0..self.cols {
                res.data[i][j] = self.data[i][j] + rhs.data[i][j];
            }
        }

        res
    }
}

impl Sub for Matrix {
    type Output = Matrix;

    fn sub(self, rhs: Self) -> Self::Output {
        if self.rows != rhs.rows || self.cols != rhs.cols {
            panic!("Matrices are of incorrect sizes")
        }

        let mut res = Matrix::zeros(self.rows, self.cols);

        for i in 0..self.rows {
            for j in 0..self.cols {
                res.data[i][j] = self.data[i][j] - rhs.data[i][j];
            }
        }

        res
    }
}

impl Mul for Matrix {
    type Output = Matrix;

    fn mul(self, rhs: Self) -> Self::Output {
        match self.matmul(&rhs, ExecutionContext::Cpu) {
            Ok(res) => res,
            Err(_) => panic!("Matrices are of incorrect sizes"),
        }
    }
}
