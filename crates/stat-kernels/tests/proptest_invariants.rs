use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;
use stat_kernels::clip::clip_outliers;
use stat_kernels::correlation::correlation_matrix;
use stat_kernels::distributions::chain_sort::chain_sort;
use stat_kernels::pvalue::p_value_matrix;

const TOL: f64 = 1e-9;

fn columns(p: usize, n: usize) -> impl Strategy<Value = Vec<Vec<f64>>> {
    prop::collection::vec(prop::collection::vec(-1_000.0f64..1_000.0, n), p)
}

fn matrix_case() -> impl Strategy<Value = Vec<Vec<f64>>> {
    (2usize..6, 2usize..40).prop_flat_map(|(p, n)| columns(p, n))
}

/// Columnas mezcladas con su marca de constante. Las constantes usan enteros
/// para que la media sea exacta; las demás tienen al menos dos valores
/// distintos.
fn mixed_case() -> impl Strategy<Value = (Vec<Vec<f64>>, Vec<bool>)> {
    (2usize..6, 2usize..40)
        .prop_flat_map(|(p, n)| {
            prop::collection::vec(
                (prop::bool::weighted(0.25), prop::collection::vec(-1_000.0f64..1_000.0, n), -1_000i32..1_000),
                p,
            )
        })
        .prop_map(|spec| -> (Vec<Vec<f64>>, Vec<bool>) {
            spec.into_iter()
                .map(|(constant, mut col, level)| {
                    if constant {
                        (vec![level as f64; col.len()], true)
                    } else {
                        col[1] = col[0] + 1.0;
                        (col, false)
                    }
                })
                .unzip()
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn correlation_is_symmetric_and_bounded((cols, constant) in mixed_case()) {
        let r = correlation_matrix(&cols, &()).unwrap();
        for i in 0..r.len() {
            if constant[i] {
                prop_assert_eq!(r[i][i], 0.0);
            } else {
                prop_assert!((r[i][i] - 1.0).abs() <= TOL);
            }
            for j in 0..r.len() {
                prop_assert_eq!(r[i][j], r[j][i]);
                prop_assert!(r[i][j] >= -1.0 && r[i][j] <= 1.0);
            }
        }
    }

    #[test]
    fn single_column_cannot_be_correlated(col in prop::collection::vec(-1_000.0f64..1_000.0, 2..40)) {
        prop_assert!(correlation_matrix(&[col.clone()], &()).is_err());
        prop_assert!(p_value_matrix(&[col], &()).is_err());
    }

    #[test]
    fn p_values_are_probabilities(cols in matrix_case()) {
        let m = p_value_matrix(&cols, &()).unwrap();
        for i in 0..m.len() {
            prop_assert_eq!(m[i][i], 1.0);
            for j in 0..m.len() {
                let v = m[i][j];
                prop_assert!(v.is_nan() || (v >= -TOL && v <= 1.0 + TOL));
                prop_assert!(v.to_bits() == m[j][i].to_bits());
            }
        }
    }

    #[test]
    fn clipping_keeps_length_and_order(x in prop::collection::vec(-1e6f64..1e6, 1..60)) {
        let out = clip_outliers(&x, 5.0);
        prop_assert_eq!(out.len(), x.len());
        for i in 0..x.len() {
            for j in 0..x.len() {
                if x[i] <= x[j] {
                    prop_assert!(out[i] <= out[j]);
                }
            }
        }
    }

    #[test]
    fn chain_sort_is_a_permutation(cols in matrix_case()) {
        let r = correlation_matrix(&cols, &()).unwrap();
        let mut order = chain_sort(&r);
        order.sort_unstable();
        prop_assert_eq!(order, (0..r.len()).collect::<Vec<_>>());
    }
}
