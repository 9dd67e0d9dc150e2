use approx::assert_relative_eq;
use stat_core::settings::{DistributionSettings, EncodingSettings};
use stat_core::{CellValue, DataType, Dataset, DistributionType};
use stat_kernels::{
    correlation_frame, data_types, p_value_frame, partial_correlation_frame, pca_loadings, to_numbers_only,
    variable_distributions,
};

fn three_numeric_columns() -> Dataset {
    let x: Vec<f64> = (0..100).map(|i| (i as f64 * 0.13).sin() * 4.0).collect();
    let y: Vec<f64> = (0..100).map(|i| x[i] * 0.7 + (i as f64 * 1.9).cos()).collect();
    let z: Vec<f64> = (0..100).map(|i| ((i * 31) % 17) as f64 - y[i] * 0.2).collect();
    let cells = |v: &[f64]| v.iter().map(|&n| CellValue::Number(n)).collect::<Vec<_>>();
    Dataset::from_columns(vec![("x".into(), cells(&x)), ("y".into(), cells(&y)), ("z".into(), cells(&z))]).unwrap()
}

#[test]
fn numeric_dataset_flows_through_correlations() {
    let d = three_numeric_columns();
    let numbers = to_numbers_only(&d, &EncodingSettings::default(), &()).unwrap();
    assert_eq!(numbers.columns(), d.columns());
    assert_eq!(numbers.shape(), (100, 3));
    for i in 0..100 {
        for j in 0..3 {
            assert_eq!(Some(numbers.get(i, j).unwrap()), d.cell(i, j).and_then(|c| c.as_f64()));
        }
    }

    let r = correlation_frame(&numbers, &()).unwrap();
    assert!(r.is_square_labeled());
    for i in 0..3 {
        assert_eq!(r.get(i, i), Some(1.0));
        for j in 0..3 {
            assert_eq!(r.get(i, j), r.get(j, i));
        }
    }

    let pc = partial_correlation_frame(&numbers, &()).unwrap();
    for i in 0..3 {
        assert_eq!(pc.get(i, i), Some(1.0));
        for j in 0..3 {
            let v = pc.get(i, j).unwrap();
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    let p = p_value_frame(&numbers, &()).unwrap();
    assert_eq!(p.get(1, 1), Some(1.0));
    assert_relative_eq!(p.get(0, 2).unwrap(), p.get(2, 0).unwrap());

    let pca = pca_loadings(&numbers, &()).unwrap();
    assert_eq!(pca.loadings.index(), numbers.columns());
    assert_eq!(pca.loadings.columns()[0], "Factor 1");
    assert!(pca.eigenvalues.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn boolean_property_over_thousand_rows() {
    let values: Vec<CellValue> = (0..1000)
        .map(|i| match i % 7 {
            0 | 3 => CellValue::Missing,
            1 | 4 | 5 => CellValue::Bool(true),
            _ => CellValue::Bool(false),
        })
        .collect();
    let nulls = values.iter().filter(|v| v.is_missing()).count();
    let d = Dataset::from_columns(vec![("answer".into(), values)]).unwrap();
    let types = data_types(&d, &()).unwrap();
    let out = variable_distributions(&d, &types, &DistributionSettings::default(), &()).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].data_type, DataType::Boolean);
    assert_eq!(out[0].distribution_type, DistributionType::Discrete);
    assert_eq!(out[0].points.len(), 2);
    let total: f64 = out[0].points.iter().map(|p| p.1).sum();
    assert_eq!(total as usize, 1000 - nulls);
}
