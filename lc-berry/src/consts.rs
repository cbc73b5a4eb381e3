//! 通用常量.

use crate::Point3d;

/// LC 概率图谱的默认二值化阈值.
///
/// 严格大于该值的体素才被视为 LC. 恰好等于阈值的体素 **不** 包含在内.
pub const DEFAULT_LC_THRESHOLD: f32 = 0.5;

/// 生成参考区域时, 用于排除 LC 的保守阈值.
///
/// 图谱中 LC 概率大于 10% 的体素都不会进入参考区域.
pub const LC_EXCLUSION_CUTOFF: f32 = 0.1;

/// 脑桥被盖参考球的默认球心 (MNI 坐标, mm).
pub const DEFAULT_REFERENCE_CENTER_MNI: Point3d = [0.0, -30.0, -28.0];

/// 脑桥被盖参考球的默认半径 (mm).
pub const DEFAULT_REFERENCE_RADIUS_MM: f64 = 3.0;

/// LC 概率图谱默认文件名.
pub const LC_ATLAS_FILENAME: &str = "LC_prob_MNI.nii.gz";

/// 参考 ROI 缓存默认文件名.
pub const REFERENCE_ROI_FILENAME: &str = "pontine_reference_MNI.nii.gz";

/// 受试者目录的前缀.
pub const SUBJECT_PREFIX: &str = "sub-";

/// 配准到 MNI 空间后的输出文件后缀.
pub const MNI_SUFFIX: &str = "_MNI.nii.gz";

/// 流程默认处理的对比度.
pub const DEFAULT_CONTRASTS: [&str; 5] = ["T1w", "R1", "R2star", "QSM", "T2starw"];

/// 构造受试者 `subject` 在对比度 `contrast` 下的 MNI 空间输出文件名.
#[inline]
pub fn contrast_filename(subject: &str, contrast: &str) -> String {
    format!("{subject}_{contrast}{MNI_SUFFIX}")
}
