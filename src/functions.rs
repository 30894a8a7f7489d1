pub fn mean(xs: impl Iterator<Item = f64>) -> Option<f64> {
    let mut count = 0;
    let mut total = 0.0;
    for x in xs {
        count += 1;
        total += x;
    }
    if count == 0 {
        None
    } else {
        Some(total / count as f64)
    }
}

pub fn mse(actual: &[f64], predicted: &[f64]) -> f64 {
    debug_assert_eq!(actual.len(), predicted.len());
    mean(
        actual
            .iter()
            .zip(predicted.iter())
            .map(|(y, p)| (y - p).powi(2)),
    )
    .unwrap_or(f64::NAN)
}

/// Coefficient of determination of `predicted` against `actual`.
///
/// Constant `actual` values give `1.0` for an exact match and `0.0` otherwise.
pub fn r_squared(actual: &[f64], predicted: &[f64]) -> f64 {
    debug_assert_eq!(actual.len(), predicted.len());
    let Some(m) = mean(actual.iter().copied()) else {
        return f64::NAN;
    };
    let ss_res = actual
        .iter()
        .zip(predicted.iter())
        .map(|(y, p)| (y - p).powi(2))
        .sum::<f64>();
    let ss_tot = actual.iter().map(|y| (y - m).powi(2)).sum::<f64>();
    if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    }
}

/// Rounds to two decimal places for display, ties to even.
///
/// A tie is judged on the exact value of `x * 100`, not on the rounded product.
pub fn round2(x: f64) -> f64 {
    let y = x * 100.0;
    let error = x.mul_add(100.0, -y);
    let floor = y.floor();
    let rounded = if y - floor != 0.5 {
        y.round()
    } else if error > 0.0 {
        floor + 1.0
    } else if error < 0.0 || floor % 2.0 == 0.0 {
        floor
    } else {
        floor + 1.0
    };
    rounded / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_works() {
        assert_eq!(mean([1.0, 2.0, 6.0].into_iter()), Some(3.0));
        assert_eq!(mean(std::iter::empty()), None);
    }

    #[test]
    fn metrics_work() {
        let actual = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(mse(&actual, &[1.0, 2.0, 3.0, 6.0]), 1.0);
        assert_eq!(r_squared(&actual, &actual), 1.0);
        assert_eq!(r_squared(&actual, &[2.5; 4]), 0.0);
        assert!(r_squared(&actual, &[4.0, 3.0, 2.0, 1.0]) < 0.0);

        assert_eq!(r_squared(&[5.0; 3], &[5.0; 3]), 1.0);
        assert_eq!(r_squared(&[5.0; 3], &[4.0; 3]), 0.0);
    }

    #[test]
    fn round2_works() {
        assert_eq!(round2(3.14159), 3.14);
        assert_eq!(round2(-2.005001), -2.01);
        assert_eq!(round2(7.0), 7.0);
    }

    #[test]
    fn round2_ties_go_to_even() {
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(-0.125), -0.12);
        assert_eq!(round2(2.675), 2.67);
        assert_eq!(round2(0.145), 0.14);
    }
}
