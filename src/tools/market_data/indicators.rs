//! 技术指标：移动平均、RSI、区间统计
//!
//! 缺失值用 None 表示；窗口内有缺失或数据不足时该点为 None。

/// 简单移动平均
pub fn moving_average(closes: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; closes.len()];
    }
    (0..closes.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let slice = &closes[i + 1 - window..=i];
            let sum: Option<f64> = slice.iter().copied().sum();
            sum.map(|s| s / window as f64)
        })
        .collect()
}

/// RSI（简单均值版）：涨跌幅分别取窗口均值，RS = 平均涨幅 / 平均跌幅
///
/// 首个点与缺失点的涨跌记为 0；平均跌幅为 0 时，平均涨幅为正则 RSI = 100，否则无定义。
pub fn rsi(closes: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; closes.len()];
    }
    let mut gains = Vec::with_capacity(closes.len());
    let mut losses = Vec::with_capacity(closes.len());
    for i in 0..closes.len() {
        let delta = match (i.checked_sub(1).and_then(|p| closes[p]), closes[i]) {
            (Some(prev), Some(cur)) => cur - prev,
            _ => 0.0,
        };
        gains.push(delta.max(0.0));
        losses.push((-delta).max(0.0));
    }

    (0..closes.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let range = i + 1 - window..=i;
            let avg_gain = gains[range.clone()].iter().sum::<f64>() / window as f64;
            let avg_loss = losses[range].iter().sum::<f64>() / window as f64;
            if avg_loss == 0.0 {
                return (avg_gain > 0.0).then_some(100.0);
            }
            let rs = avg_gain / avg_loss;
            Some(100.0 - 100.0 / (1.0 + rs))
        })
        .collect()
}

/// 区间统计
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSummary {
    pub max: f64,
    pub min: f64,
    pub mean: f64,
    /// 首尾涨跌幅（%）；只有一个有效点时为 0
    pub pct_change: f64,
}

pub fn summarize(closes: &[Option<f64>]) -> Option<PriceSummary> {
    let valid: Vec<f64> = closes.iter().flatten().copied().collect();
    let first = *valid.first()?;
    let last = *valid.last()?;
    let max = valid.iter().copied().fold(f64::MIN, f64::max);
    let min = valid.iter().copied().fold(f64::MAX, f64::min);
    let mean = valid.iter().sum::<f64>() / valid.len() as f64;
    let pct_change = if valid.len() > 1 && first != 0.0 {
        (last - first) / first * 100.0
    } else {
        0.0
    };
    Some(PriceSummary {
        max,
        min,
        mean,
        pct_change,
    })
}
