//! Technical indicator engine.
//! Turns a validated price series into a derived indicator time series and
//! a single latest-snapshot summary for the decision engine.

use serde::{Deserialize, Serialize};

use super::{PipelineError, PipelineResult, PriceSeries};

const SMA_SHORT: usize = 20;
const SMA_LONG: usize = 50;
const RSI_PERIOD: usize = 14;
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
const BB_PERIOD: usize = 20;
const BB_WIDTH: f64 = 2.0;
const ATR_PERIOD: usize = 14;
const VOLATILITY_WINDOW: usize = 30;
const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// One fully-populated row of the derived indicator series.
/// Rows lacking a complete lookback window never make it here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub sma_20: f64,
    pub sma_50: f64,
    pub rsi_14: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub bb_upper: f64,
    pub bb_middle: f64,
    pub bb_lower: f64,
    pub atr_14: f64,
    pub obv: f64,
    pub log_return: f64,
    pub volatility_30: f64,
}

/// Indicator time series aligned to the input timestamps, left-truncated
/// to drop rows without a full lookback window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSeries {
    pub ticker: String,
    pub rows: Vec<IndicatorRow>,
}

impl IndicatorSeries {
    /// The row at the most recent timestamp. Construction guarantees at
    /// least one row, so this never fails.
    pub fn latest(&self) -> &IndicatorRow {
        self.rows
            .last()
            .expect("IndicatorSeries is never constructed empty")
    }

    /// Snapshot of the latest row for the decision engine.
    pub fn snapshot(&self) -> TechSnapshot {
        let row = self.latest();
        TechSnapshot {
            close: Some(row.close),
            sma_20: Some(row.sma_20),
            sma_50: Some(row.sma_50),
            rsi_14: Some(row.rsi_14),
            macd: Some(row.macd),
            macd_signal: Some(row.macd_signal),
            bb_upper: Some(row.bb_upper),
            bb_lower: Some(row.bb_lower),
            atr_14: Some(row.atr_14),
            obv: Some(row.obv),
            volatility_30: Some(row.volatility_30),
        }
    }
}

/// Fixed-shape snapshot of the latest indicator values.
///
/// Fields are optional so the rule engine can tolerate partial technical
/// data: an absent value is a non-triggering default, never an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechSnapshot {
    pub close: Option<f64>,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub rsi_14: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_lower: Option<f64>,
    pub atr_14: Option<f64>,
    pub obv: Option<f64>,
    pub volatility_30: Option<f64>,
}

/// Compute the full indicator series for a price history.
///
/// Deterministic and side-effect-free; the input series is never mutated.
/// Fails with `InsufficientData` when left-truncation leaves zero rows
/// (the 50-period SMA sets the effective minimum series length).
pub fn compute_indicators(series: &PriceSeries) -> PipelineResult<IndicatorSeries> {
    let bars = series.bars();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let n = closes.len();

    let sma_20 = rolling_sma(&closes, SMA_SHORT);
    let sma_50 = rolling_sma(&closes, SMA_LONG);
    let rsi_14 = wilder_rsi(&closes, RSI_PERIOD);
    let (macd, macd_signal) = macd_lines(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);

    // Bollinger uses population stddev over the same 20-close window
    let bb_std = rolling_stddev(&closes, BB_PERIOD, 0);
    let atr_14 = wilder_atr(bars, ATR_PERIOD);
    let obv = on_balance_volume(bars);
    let log_returns = log_returns(&closes);
    // Annualized sample stddev of trailing log returns
    let volatility_30 = rolling_volatility(&log_returns, VOLATILITY_WINDOW);

    // Left-truncate: a row survives only when every indicator has a value.
    // Definedness is monotone (each column stays Some once its window
    // fills), so filtering yields a contiguous suffix.
    let rows: Vec<IndicatorRow> = (0..n)
        .filter_map(|i| {
            let bar = &bars[i];
            let middle = sma_20[i]?;
            let std = bb_std[i]?;
            Some(IndicatorRow {
                timestamp: bar.timestamp,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
                sma_20: middle,
                sma_50: sma_50[i]?,
                rsi_14: rsi_14[i]?,
                macd: macd[i]?,
                macd_signal: macd_signal[i]?,
                bb_upper: middle + BB_WIDTH * std,
                bb_middle: middle,
                bb_lower: middle - BB_WIDTH * std,
                atr_14: atr_14[i]?,
                obv: obv[i],
                log_return: log_returns[i]?,
                volatility_30: volatility_30[i]?,
            })
        })
        .collect();

    if rows.is_empty() {
        return Err(PipelineError::InsufficientData {
            rows: n,
            required: SMA_LONG,
        });
    }

    tracing::debug!(
        ticker = series.ticker(),
        input_rows = n,
        output_rows = rows.len(),
        "Computed technical indicators"
    );

    Ok(IndicatorSeries {
        ticker: series.ticker().to_string(),
        rows,
    })
}

/// Trailing simple moving average, aligned to the input.
/// `None` until a full window is available.
pub fn rolling_sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let mut window_sum: f64 = values[..period].iter().sum();
    out[period - 1] = Some(window_sum / period as f64);
    for i in period..values.len() {
        window_sum += values[i] - values[i - period];
        out[i] = Some(window_sum / period as f64);
    }
    out
}

/// Trailing standard deviation over a fixed window.
/// `ddof` follows the pandas convention: 0 for population, 1 for sample.
pub fn rolling_stddev(values: &[f64], period: usize, ddof: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period <= ddof || values.len() < period {
        return out;
    }

    for i in (period - 1)..values.len() {
        let window = &values[i + 1 - period..=i];
        let mean = window.iter().sum::<f64>() / period as f64;
        let sum_sq: f64 = window.iter().map(|v| (v - mean).powi(2)).sum();
        out[i] = Some((sum_sq / (period - ddof) as f64).sqrt());
    }
    out
}

/// Wilder's RSI: initial averages are the simple mean of the first
/// `period` gains/losses, then smoothed as (avg*(n-1) + x)/n.
pub fn wilder_rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() < period + 1 {
        return out;
    }

    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    let (mut avg_gain, mut avg_loss) = changes
        .iter()
        .take(period)
        .fold((0.0, 0.0), |(g, l), &change| {
            if change > 0.0 {
                (g + change, l)
            } else {
                (g, l - change)
            }
        });
    avg_gain /= period as f64;
    avg_loss /= period as f64;

    out[period] = Some(rsi_from_averages(avg_gain, avg_loss));

    for (i, &change) in changes.iter().enumerate().skip(period) {
        let (gain, loss) = if change > 0.0 {
            (change, 0.0)
        } else {
            (0.0, -change)
        };
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
        // change index i corresponds to close index i + 1
        out[i + 1] = Some(rsi_from_averages(avg_gain, avg_loss));
    }
    out
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

/// Exponential moving average seeded with the SMA of the first `period`
/// values, multiplier 2/(n+1). Aligned to the input.
pub fn rolling_ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut ema = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(ema);
    for i in period..values.len() {
        ema = (values[i] - ema) * multiplier + ema;
        out[i] = Some(ema);
    }
    out
}

/// MACD line (fast EMA - slow EMA) and its signal line (EMA of the MACD
/// line), both aligned to the input closes.
pub fn macd_lines(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let ema_fast = rolling_ema(closes, fast);
    let ema_slow = rolling_ema(closes, slow);

    let macd: Vec<Option<f64>> = ema_fast
        .iter()
        .zip(ema_slow.iter())
        .map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        })
        .collect();

    // Signal line is an EMA over the dense run of defined MACD values
    let mut signal_line = vec![None; closes.len()];
    if let Some(offset) = macd.iter().position(|v| v.is_some()) {
        let dense: Vec<f64> = macd[offset..].iter().map(|v| v.unwrap_or(0.0)).collect();
        for (i, value) in rolling_ema(&dense, signal).into_iter().enumerate() {
            signal_line[offset + i] = value;
        }
    }

    (macd, signal_line)
}

/// Wilder's average true range, aligned to the bars.
pub fn wilder_atr(bars: &[super::PriceBar], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; bars.len()];
    if period == 0 || bars.len() < period + 1 {
        return out;
    }

    let true_ranges: Vec<f64> = (1..bars.len())
        .map(|i| {
            let prev_close = bars[i - 1].close;
            let hl = bars[i].high - bars[i].low;
            let hpc = (bars[i].high - prev_close).abs();
            let lpc = (bars[i].low - prev_close).abs();
            hl.max(hpc).max(lpc)
        })
        .collect();

    let mut atr = true_ranges.iter().take(period).sum::<f64>() / period as f64;
    out[period] = Some(atr);
    for (i, &tr) in true_ranges.iter().enumerate().skip(period) {
        atr = (atr * (period as f64 - 1.0) + tr) / period as f64;
        out[i + 1] = Some(atr);
    }
    out
}

/// On-balance volume, seeded at zero at the series start (pre-truncation):
/// volume added on a close rise, subtracted on a fall, unchanged on equal.
pub fn on_balance_volume(bars: &[super::PriceBar]) -> Vec<f64> {
    let mut out = Vec::with_capacity(bars.len());
    let mut obv = 0.0;
    out.push(obv);
    for i in 1..bars.len() {
        if bars[i].close > bars[i - 1].close {
            obv += bars[i].volume as f64;
        } else if bars[i].close < bars[i - 1].close {
            obv -= bars[i].volume as f64;
        }
        out.push(obv);
    }
    out
}

/// Log returns ln(close_t / close_{t-1}), aligned to the closes.
pub fn log_returns(closes: &[f64]) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    for i in 1..closes.len() {
        out[i] = Some((closes[i] / closes[i - 1]).ln());
    }
    out
}

/// Annualized trailing volatility: sample stddev of the last `window` log
/// returns, scaled by sqrt(252).
pub fn rolling_volatility(log_returns: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; log_returns.len()];
    if window < 2 {
        return out;
    }

    for i in 0..log_returns.len() {
        if i + 1 < window + 1 {
            continue; // log return at index 0 is undefined
        }
        let slice = &log_returns[i + 1 - window..=i];
        if slice.iter().any(|v| v.is_none()) {
            continue;
        }
        let values: Vec<f64> = slice.iter().map(|v| v.unwrap_or(0.0)).collect();
        let mean = values.iter().sum::<f64>() / window as f64;
        let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        let std = (sum_sq / (window - 1) as f64).sqrt();
        out[i] = Some(std * TRADING_DAYS_PER_YEAR.sqrt());
    }
    out
}
