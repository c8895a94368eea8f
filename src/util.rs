use crate::time_series::Sample;

/// Standard deviation of sampled wpm, shown as "consistency"
pub fn wpm_consistency(samples: &[Sample]) -> f64 {
    let wpms: Vec<f64> = samples.iter().map(|s| s.wpm as f64).collect();
    std_dev(&wpms).unwrap_or(0.0)
}

pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

pub fn std_dev(data: &[f64]) -> Option<f64> {
    let data_mean = mean(data)?;
    let variance = data
        .iter()
        .map(|value| {
            let diff = data_mean - *value;

            diff * diff
        })
        .sum::<f64>()
        / data.len() as f64;

    Some(variance.sqrt())
}
