//! Bit-matrix transposition, used to turn the column-wise OPRF matrices into rows.
//!
//! Bits are numbered least significant bit first within each byte and matrices are
//! stored row-major.
use wide::{i8x16, i64x2};

/// Transpose a `rows x cols` bit matrix stored in `input` into `output`.
///
/// # Panics
/// - If `input.len() != output.len()`
/// - If `rows < 16` or `rows` is not divisible by 16
/// - If `input.len()` is not divisible by `rows`
/// - If the number of columns, computed as `input.len() * 8 / rows`, is less
///   than 16 or not divisible by 8
pub(crate) fn transpose_bitmatrix(input: &[u8], output: &mut [u8], rows: usize) {
    assert_eq!(input.len(), output.len());
    assert!(rows >= 16, "rows must be at least 16");
    assert_eq!(0, rows % 16, "rows must be divisible by 16");
    assert_eq!(
        0,
        input.len() % rows,
        "input.len() must be divisible by rows"
    );
    let cols = input.len() * 8 / rows;
    assert!(cols >= 16, "columns must be at least 16. Columns {cols}");
    assert_eq!(
        0,
        cols % 8,
        "Number of bitmatrix columns must be divisable by 8. columns: {cols}"
    );

    // Work on 16x8 sub-blocks (16 bytes, one per row). `move_mask` collects the msb of
    // every byte, which is one column of the sub-block and one output row segment. Shifting
    // all bytes left by one exposes the next column.
    let mut row: usize = 0;
    while row <= rows - 16 {
        let mut col = 0;
        while col < cols {
            let mut v = load_bytes(input, row, col, cols);
            for output_row_offset in (0..8).rev() {
                let msbs = v.move_mask().to_le_bytes();
                let idx = out(row, col + output_row_offset, rows);
                let out_bytes = &mut output[idx..idx + 2];
                out_bytes[0] = msbs[0];
                out_bytes[1] = msbs[1];

                // no shift for i8x16, bits crossing into the neighbouring byte are never read
                let v: &mut i64x2 = bytemuck::must_cast_mut(&mut v);
                *v = *v << 1;
            }
            col += 8;
        }
        row += 16;
    }
}

#[inline]
fn inp(x: usize, y: usize, cols: usize) -> usize {
    x * cols / 8 + y / 8
}

#[inline]
fn out(x: usize, y: usize, rows: usize) -> usize {
    y * rows / 8 + x / 8
}

#[inline]
// byte `col / 8` of rows `row..row + 16`
fn load_bytes(b: &[u8], row: usize, col: usize, cols: usize) -> i8x16 {
    let bytes = std::array::from_fn(|i| b[inp(row + i, col, cols)] as i8);
    i8x16::from(bytes)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn get_bit(m: &[u8], row: usize, col: usize, cols: usize) -> bool {
        let i = row * cols + col;
        m[i / 8] & (1 << (i % 8)) != 0
    }

    fn arbitrary_bitmat(max_row: usize, max_col: usize) -> BoxedStrategy<(Vec<u8>, usize, usize)> {
        (
            (16..max_row).prop_map(|row| row / 16 * 16),
            (16..max_col).prop_map(|col| col / 16 * 16),
        )
            .prop_flat_map(|(rows, cols)| {
                (vec![any::<u8>(); rows * cols / 8], Just(rows), Just(cols))
            })
            .boxed()
    }

    proptest! {
        #[test]
        fn test_double_transpose((v, rows, cols) in arbitrary_bitmat(16 * 30, 16 * 30)) {
            let mut transposed = vec![0; v.len()];
            let mut double_transposed = vec![0; v.len()];
            transpose_bitmatrix(&v, &mut transposed, rows);
            transpose_bitmatrix(&transposed, &mut double_transposed, cols);

            prop_assert_eq!(v, double_transposed);
        }

        #[test]
        fn test_transpose_moves_bits((v, rows, cols) in arbitrary_bitmat(16 * 8, 16 * 8)) {
            let mut transposed = vec![0; v.len()];
            transpose_bitmatrix(&v, &mut transposed, rows);
            for r in 0..rows {
                for c in 0..cols {
                    prop_assert_eq!(get_bit(&v, r, c, cols), get_bit(&transposed, c, r, rows));
                }
            }
        }
    }

    #[test]
    fn test_oprf_shape() {
        // 512 code columns of 16 rows each, as used by the OPRF
        let rows = 512;
        let mut v = vec![0_u8; rows * 16 / 8];
        v[0] = 0b11;
        let mut transposed = vec![0; v.len()];
        transpose_bitmatrix(&v, &mut transposed, rows);
        assert_eq!(1, transposed[0]);
        assert_eq!(1, transposed[rows / 8]);
        assert_eq!(2, transposed.iter().map(|b| b.count_ones()).sum::<u32>());
    }
}
