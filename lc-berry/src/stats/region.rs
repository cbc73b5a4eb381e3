use log::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{count_mask, masked_finite, mean_std, median};
use crate::config::check_threshold;
use crate::roi::threshold_atlas;
use crate::{resample_nearest, NiftiHeaderAttr, PipelineConfig, RoiError, RoiResult, Volume};

/// 单个 ROI 内的描述统计量.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegionStats {
    /// 均值.
    pub mean: f64,
    /// 总体标准差.
    pub std: f64,
    /// 中位数.
    pub median: f64,
    /// 最小值.
    pub min: f64,
    /// 最大值.
    pub max: f64,
    /// 参与统计的有限体素个数.
    pub voxel_count: usize,
}

/// 提取 `mask` (概率图或二值掩膜) 覆盖区域内 `data` 的描述统计量.
///
/// 1. `mask` 形状与 `data` 不同时, 先以最近邻插值重采样到 `data` 的网格 (网格外为 0).
/// 2. 以 `threshold` (缺省时为 `config.lc_probability_threshold()`) 严格二值化.
/// 3. 只统计掩膜内的有限值.
///
/// 没有任何有限值时返回 `Err(RoiError::EmptyRegion)`.
pub fn extract_roi_stats(
    data: &Volume,
    mask: &Volume,
    threshold: Option<f32>,
    config: &PipelineConfig,
) -> RoiResult<RegionStats> {
    let threshold = threshold.unwrap_or_else(|| config.lc_probability_threshold());
    check_threshold(threshold)?;

    let binary = if mask.shape() == data.shape() {
        threshold_atlas(mask.data(), threshold)?
    } else {
        debug!(
            "resampling mask {:?} onto data grid {:?}",
            mask.shape(),
            data.shape()
        );
        let resampled = resample_nearest(mask, data.shape(), data.affine());
        threshold_atlas(resampled.view(), threshold)?
    };
    let mask_voxels = count_mask(binary.view());

    let mut values = masked_finite(data.data(), binary.view());
    if values.is_empty() {
        return Err(RoiError::EmptyRegion {
            threshold,
            mask_voxels,
        });
    }

    let (mean, std) = mean_std(&values);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let voxel_count = values.len();
    let median = median(&mut values);
    debug!("ROI stats: {voxel_count} of {mask_voxels} mask voxels finite, mean = {mean}");

    Ok(RegionStats {
        mean,
        std,
        median,
        min,
        max,
        voxel_count,
    })
}
