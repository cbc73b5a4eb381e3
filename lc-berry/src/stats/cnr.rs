use log::debug;
use ndarray::ArrayView3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{count_mask, masked_finite, mean_std};
use crate::{NiftiHeaderAttr, RoiError, RoiResult, Volume};

/// LC 相对于参考区域的对比噪声比.
///
/// `cnr = (mean_lc - mean_ref) / std_ref`,
/// `contrast_ratio = (mean_lc - mean_ref) / mean_ref`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CnrResult {
    /// LC 区域均值.
    pub mean_lc: f64,
    /// LC 区域总体标准差.
    pub std_lc: f64,
    /// 参考区域均值.
    pub mean_ref: f64,
    /// 参考区域总体标准差, 必不为 0.
    pub std_ref: f64,
    /// 对比噪声比.
    pub cnr: f64,
    /// 相对对比度. `mean_ref == 0` 时为 NaN.
    pub contrast_ratio: f64,
    /// LC 区域有限体素个数.
    pub lc_voxel_count: usize,
    /// 参考区域有限体素个数.
    pub ref_voxel_count: usize,
}

fn check_shape(data: &Volume, mask: &ArrayView3<f32>) -> RoiResult<()> {
    if mask.dim() != data.shape() {
        return Err(RoiError::ShapeMismatch {
            expected: data.shape(),
            actual: mask.dim(),
        });
    }
    Ok(())
}

/// 计算 `data` 上 LC 与参考区域之间的 CNR.
///
/// 两个掩膜都应已二值化 (值大于 0 即视为在区域内), 且与 `data` 同形状.
/// 失败情况依次检查:
///
/// 1. LC 区域没有有限值: `RoiError::EmptyLcRegion`;
/// 2. 参考区域没有有限值: `RoiError::EmptyReferenceRegion`;
/// 3. 参考区域标准差为 0: `RoiError::ZeroReferenceVariance`.
///
/// `mean_ref == 0` 不是错误, 此时 `contrast_ratio` 为 NaN.
pub fn compute_cnr(
    data: &Volume,
    lc_mask: ArrayView3<f32>,
    ref_mask: ArrayView3<f32>,
) -> RoiResult<CnrResult> {
    check_shape(data, &lc_mask)?;
    check_shape(data, &ref_mask)?;

    let lc = masked_finite(data.data(), lc_mask.view());
    if lc.is_empty() {
        return Err(RoiError::EmptyLcRegion {
            mask_voxels: count_mask(lc_mask),
        });
    }
    let reference = masked_finite(data.data(), ref_mask.view());
    if reference.is_empty() {
        return Err(RoiError::EmptyReferenceRegion {
            mask_voxels: count_mask(ref_mask),
        });
    }

    let (mean_lc, std_lc) = mean_std(&lc);
    let (mean_ref, std_ref) = mean_std(&reference);
    if std_ref == 0.0 {
        return Err(RoiError::ZeroReferenceVariance {
            voxels: reference.len(),
            mean: mean_ref,
        });
    }

    let diff = mean_lc - mean_ref;
    let contrast_ratio = if mean_ref == 0.0 {
        f64::NAN
    } else {
        diff / mean_ref
    };
    let ans = CnrResult {
        mean_lc,
        std_lc,
        mean_ref,
        std_ref,
        cnr: diff / std_ref,
        contrast_ratio,
        lc_voxel_count: lc.len(),
        ref_voxel_count: reference.len(),
    };
    debug!(
        "CNR = {:.4} ({} LC / {} reference voxels)",
        ans.cnr,
        lc.len(),
        reference.len()
    );
    Ok(ans)
}
