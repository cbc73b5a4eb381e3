//! 区域统计与对比噪声比 (CNR).
//!
//! 所有统计量都只使用掩膜内的 **有限** 体素值 (NaN 与无穷被跳过),
//! 标准差为总体标准差 (除以 `n`).

use ndarray::{ArrayView3, Zip};

mod cnr;
mod region;
mod subject;

pub use cnr::{compute_cnr, CnrResult};
pub use region::{extract_roi_stats, RegionStats};
pub use subject::{extract_subject_cnr, SubjectCnr};

/// 取出 `mask > 0` 处 `data` 中的有限值. 两者形状必须一致.
fn masked_finite(data: ArrayView3<f32>, mask: ArrayView3<f32>) -> Vec<f64> {
    let mut ans = Vec::new();
    Zip::from(&data).and(&mask).for_each(|&v, &m| {
        if m > 0.0 && v.is_finite() {
            ans.push(v as f64);
        }
    });
    ans
}

/// 掩膜中值大于 0 的体素个数.
#[inline]
fn count_mask(mask: ArrayView3<f32>) -> usize {
    mask.iter().filter(|v| **v > 0.0).count()
}

/// 计算均值与总体标准差. `values` 不能为空.
fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// 中位数, 偶数个元素时取中间两者的均值. `values` 不能为空, 会被原地排序.
fn median(values: &mut [f64]) -> f64 {
    values.sort_unstable_by(f64::total_cmp);
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}
