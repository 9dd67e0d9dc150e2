//! Orden en cadena por similitud: variables relacionadas quedan contiguas.
//!
//! Empieza por el par con la correlación más alta y luego agrega, una a una,
//! la variable libre más correlacionada con el último eslabón.

/// Devuelve una permutación de `0..n` para la matriz simétrica `c`.
pub fn chain_sort(c: &[Vec<f64>]) -> Vec<usize> {
    let n = c.len();
    if n < 3 {
        return (0..n).collect();
    }
    let score = |i: usize, j: usize| {
        let v = c[i][j];
        if v.is_nan() { f64::NEG_INFINITY } else { v }
    };

    let mut best = (0, 1, f64::NEG_INFINITY);
    for i in 0..n {
        for j in (i + 1)..n {
            let v = score(i, j);
            if v > best.2 {
                best = (i, j, v);
            }
        }
    }
    let mut chain = vec![best.0, best.1];
    let mut free: Vec<usize> = (0..n).filter(|k| *k != best.0 && *k != best.1).collect();

    while !free.is_empty() {
        let last = chain[chain.len() - 1];
        let mut pick = 0;
        for (pos, &k) in free.iter().enumerate() {
            if score(last, k) > score(last, free[pick]) {
                pick = pos;
            }
        }
        chain.push(free.remove(pick));
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn related_variables_are_adjacent() {
        // 0~2 fuerte, 2~3 medio, 1 aislado
        let c = vec![
            vec![1.0, 0.0, 0.9, 0.1],
            vec![0.0, 1.0, 0.0, 0.2],
            vec![0.9, 0.0, 1.0, 0.5],
            vec![0.1, 0.2, 0.5, 1.0],
        ];
        assert_eq!(chain_sort(&c), vec![0, 2, 3, 1]);
    }

    #[test]
    fn is_a_permutation_even_with_nan() {
        let c = vec![vec![f64::NAN; 5]; 5];
        let mut order = chain_sort(&c);
        order.sort();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }
}
