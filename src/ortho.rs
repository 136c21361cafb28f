//! Gram-Schmidt residual against a fixed set of orthonormal basis vectors.
//! Grounded on `OrthoContext.cpp`'s `Orthogonalize`: project onto every
//! basis row, subtract, then renormalize what's left.

use crate::linalg::{axpy, gemv_rows, nrm2, scal, Matrix, Vector};

pub struct OrthoContext {
    pv: Vector,
    bases: Matrix,
    dp: Vector,
    basis_dimension: usize,
    max_basis_count: usize,
    num_bases: usize,
}

impl OrthoContext {
    pub fn new(basis_dimension: usize, max_basis_count: usize) -> Self {
        OrthoContext {
            pv: Vector::zeros(basis_dimension),
            bases: Matrix::zeros(max_basis_count, basis_dimension),
            dp: Vector::zeros(max_basis_count),
            basis_dimension,
            max_basis_count,
            num_bases: 0,
        }
    }

    /// Orthogonalizes `p` (length `basis_dimension`, in/out) against the
    /// first `num_bases` rows of `orthonormal_bases` (row-major, `num_bases *
    /// basis_dimension` doubles), then unit-normalizes the residual.
    pub fn orthogonalize(&mut self, p: &mut [f64], num_bases: usize, orthonormal_bases: &[f64]) {
        assert!(num_bases <= self.max_basis_count, "num_bases exceeds this context's capacity");
        assert_eq!(p.len(), self.basis_dimension);
        assert_eq!(orthonormal_bases.len(), num_bases * self.basis_dimension);

        self.pv.as_mut_slice().copy_from_slice(p);
        for i in 0..num_bases {
            let row = &orthonormal_bases[i * self.basis_dimension..(i + 1) * self.basis_dimension];
            self.bases.row_mut(i).copy_from_slice(row);
        }
        self.num_bases = num_bases;

        // `dp <- bases * pv` via GEMV, sized to the logical `num_bases` row
        // prefix of `bases`'s fixed-capacity buffer; the rest is left untouched.
        gemv_rows(
            1.0,
            self.bases.as_slice(),
            num_bases,
            self.basis_dimension,
            self.pv.as_slice(),
            1,
            0.0,
            &mut self.dp.as_mut_slice()[..num_bases],
        );

        for i in 0..num_bases {
            let dp_i = self.dp.as_slice()[i];
            axpy(-dp_i, self.bases.row(i), self.pv.as_mut_slice());
        }

        let mag = nrm2(self.pv.as_slice());
        scal(1.0 / mag, self.pv.as_mut_slice());

        p.copy_from_slice(self.pv.as_slice());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn orthogonalize_against_single_axis_leaves_orthogonal_unit_residual() {
        let mut ctx = OrthoContext::new(2, 4);
        let bases = [1.0, 0.0];
        let mut p = [1.0, 1.0];
        ctx.orthogonalize(&mut p, 1, &bases);
        assert_relative_eq!(p[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(p[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn result_is_unit_norm_and_orthogonal_to_all_bases() {
        let mut ctx = OrthoContext::new(3, 4);
        let bases = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let mut p = [2.0, 3.0, 5.0];
        ctx.orthogonalize(&mut p, 2, &bases);
        assert_relative_eq!(nrm2(&p), 1.0, epsilon = 1e-12);
        assert_relative_eq!(p[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(p[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(p[2], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn context_can_be_reused_with_a_different_num_bases() {
        let mut ctx = OrthoContext::new(2, 4);
        let mut p1 = [1.0, 1.0];
        ctx.orthogonalize(&mut p1, 1, &[1.0, 0.0]);
        assert_relative_eq!(p1[0], 0.0, epsilon = 1e-12);

        let mut p2 = [3.0, 4.0];
        ctx.orthogonalize(&mut p2, 0, &[]);
        assert_relative_eq!(nrm2(&p2), 1.0, epsilon = 1e-12);
    }
}
