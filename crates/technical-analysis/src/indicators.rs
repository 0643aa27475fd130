/// Simple Moving Average
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }

    let mut result = Vec::with_capacity(data.len() - period + 1);
    for i in period - 1..data.len() {
        let sum: f64 = data[i + 1 - period..=i].iter().sum();
        result.push(sum / period as f64);
    }
    result
}

/// Relative Strength Index using Wilder smoothing.
///
/// Average gain/loss are exponentially weighted with `alpha = 1 / period`,
/// seeded from the first price change rather than a warm-up window, so the
/// output has one value per price change (`data.len() - 1`). A value is NaN
/// while the average loss is zero (RS undefined).
pub fn rsi(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < 2 {
        return vec![];
    }

    let alpha = 1.0 / period as f64;
    let mut averages: Option<(f64, f64)> = None;
    let mut rsi_values = Vec::with_capacity(data.len() - 1);

    for pair in data.windows(2) {
        let change = pair[1] - pair[0];
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);

        let (avg_gain, avg_loss) = match averages {
            None => (gain, loss),
            Some((g, l)) => (g + alpha * (gain - g), l + alpha * (loss - l)),
        };
        averages = Some((avg_gain, avg_loss));

        let value = if avg_loss == 0.0 {
            f64::NAN
        } else {
            let rs = avg_gain / avg_loss;
            100.0 - (100.0 / (1.0 + rs))
        };
        rsi_values.push(value);
    }

    rsi_values
}
