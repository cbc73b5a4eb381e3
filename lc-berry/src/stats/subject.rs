use log::{debug, info};
use ndarray::ArrayView3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{compute_cnr, CnrResult};
use crate::dataset::VolumeStore;
use crate::{PipelineConfig, RoiError, RoiResult};

/// 带受试者与对比度标签的 CNR 结果.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SubjectCnr {
    /// 受试者 ID, 如 `sub-01`.
    pub subject_id: String,
    /// 对比度名称, 如 `R1`.
    pub contrast: String,
    /// CNR 计算结果.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub cnr: CnrResult,
}

/// 计算受试者 `subject` 在各对比度 `contrasts` 下的 CNR, 按 `contrasts` 顺序返回.
///
/// 对比度文件位于 `config.contrast_path(subject, contrast)`. 缺失的对比度被跳过;
/// 存在但计算失败的对比度直接返回错误. 若没有任何对比度可用
/// (包括受试者目录不存在), 返回 `Err(RoiError::NoContrastFound)`.
///
/// `lc_mask` 与 `ref_mask` 必须已二值化并与 MNI 空间数据同形状.
pub fn extract_subject_cnr<S, C>(
    subject: &str,
    contrasts: &[C],
    lc_mask: ArrayView3<f32>,
    ref_mask: ArrayView3<f32>,
    config: &PipelineConfig,
    store: &S,
) -> RoiResult<Vec<SubjectCnr>>
where
    S: VolumeStore + ?Sized,
    C: AsRef<str>,
{
    let mut ans = Vec::with_capacity(contrasts.len());
    for contrast in contrasts.iter().map(AsRef::as_ref) {
        let path = config.contrast_path(subject, contrast);
        if !store.exists(&path) {
            debug!("{subject}: {contrast} not found at {}", path.display());
            continue;
        }
        let data = store.load(&path)?;
        let cnr = compute_cnr(&data, lc_mask, ref_mask)?;
        info!("{subject} {contrast}: CNR = {:.4}", cnr.cnr);
        ans.push(SubjectCnr {
            subject_id: subject.to_string(),
            contrast: contrast.to_string(),
            cnr,
        });
    }

    if ans.is_empty() {
        return Err(RoiError::NoContrastFound {
            subject: subject.to_string(),
            dir: config.subject_dir(subject),
        });
    }
    Ok(ans)
}
