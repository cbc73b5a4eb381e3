//! 流程配置.
//!
//! [`PipelineConfig`] 是只读快照: 在进程入口处构建一次, 之后以引用的方式显式传递给每个操作.
//! 若要修改参数, 你应该通过 [`ConfigBuilder`] 创建新的实例.

use std::path::{Path, PathBuf};

use crate::consts::*;
use crate::{Point3d, RoiError, RoiResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// LC 定量流程配置.
///
/// [`Default`] 实现给出以下默认值:
///
/// | 字段 | 默认值 |
/// |---|---|
/// | `lc_probability_threshold` | [`DEFAULT_LC_THRESHOLD`] (0.5) |
/// | `reference_center_mni` | [`DEFAULT_REFERENCE_CENTER_MNI`] (0, -30, -28) |
/// | `reference_radius_mm` | [`DEFAULT_REFERENCE_RADIUS_MM`] (3.0) |
/// | `data_dir` | `data` |
/// | `output_dir` | `outputs/results` |
/// | `figures_dir` | `outputs/figures` |
/// | `atlas_dir` | `atlases` |
/// | `lc_atlas_filename` | [`LC_ATLAS_FILENAME`] |
/// | `reference_roi_filename` | [`REFERENCE_ROI_FILENAME`] |
///
/// 相对路径以进程工作目录为基准.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PipelineConfig {
    data_dir: PathBuf,
    output_dir: PathBuf,
    figures_dir: PathBuf,
    atlas_dir: PathBuf,
    lc_atlas_filename: String,
    reference_roi_filename: String,
    lc_probability_threshold: f32,
    reference_center_mni: Point3d,
    reference_radius_mm: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("outputs/results"),
            figures_dir: PathBuf::from("outputs/figures"),
            atlas_dir: PathBuf::from("atlases"),
            lc_atlas_filename: LC_ATLAS_FILENAME.to_string(),
            reference_roi_filename: REFERENCE_ROI_FILENAME.to_string(),
            lc_probability_threshold: DEFAULT_LC_THRESHOLD,
            reference_center_mni: DEFAULT_REFERENCE_CENTER_MNI,
            reference_radius_mm: DEFAULT_REFERENCE_RADIUS_MM,
        }
    }
}

impl PipelineConfig {
    /// 从默认配置出发构建新配置.
    #[inline]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder {
            inner: Self::default(),
        }
    }

    /// 以当前配置为蓝本构建新配置.
    #[inline]
    pub fn to_builder(&self) -> ConfigBuilder {
        ConfigBuilder {
            inner: self.clone(),
        }
    }

    /// 原始 (BIDS) 数据根目录.
    #[inline]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// 配准结果根目录, 其下每个受试者一个子目录.
    #[inline]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// 图像输出目录.
    #[inline]
    pub fn figures_dir(&self) -> &Path {
        &self.figures_dir
    }

    /// 图谱目录.
    #[inline]
    pub fn atlas_dir(&self) -> &Path {
        &self.atlas_dir
    }

    /// LC 概率阈值.
    #[inline]
    pub fn lc_probability_threshold(&self) -> f32 {
        self.lc_probability_threshold
    }

    /// 参考球球心 (MNI, mm).
    #[inline]
    pub fn reference_center_mni(&self) -> Point3d {
        self.reference_center_mni
    }

    /// 参考球半径 (mm).
    #[inline]
    pub fn reference_radius_mm(&self) -> f64 {
        self.reference_radius_mm
    }

    /// LC 图谱文件完整路径.
    #[inline]
    pub fn lc_atlas_path(&self) -> PathBuf {
        self.atlas_dir.join(&self.lc_atlas_filename)
    }

    /// 参考 ROI 缓存文件完整路径.
    #[inline]
    pub fn reference_roi_path(&self) -> PathBuf {
        self.atlas_dir.join(&self.reference_roi_filename)
    }

    /// 受试者 `subject` 的输出目录.
    #[inline]
    pub fn subject_dir(&self, subject: &str) -> PathBuf {
        self.output_dir.join(subject)
    }

    /// 受试者 `subject` 在对比度 `contrast` 下的 MNI 空间文件路径.
    ///
    /// 形如 `{output_dir}/{subject}/{subject}_{contrast}_MNI.nii.gz`.
    #[inline]
    pub fn contrast_path(&self, subject: &str, contrast: &str) -> PathBuf {
        self.subject_dir(subject)
            .join(contrast_filename(subject, contrast))
    }

    /// 检查数值字段是否合法.
    fn validate(&self) -> RoiResult<()> {
        check_threshold(self.lc_probability_threshold)?;
        check_radius(self.reference_radius_mm)?;
        if !self.reference_center_mni.iter().all(|c| c.is_finite()) {
            return Err(RoiError::InvalidCoordinate(self.reference_center_mni));
        }
        Ok(())
    }
}

/// 阈值必须位于 `[0, 1]`.
#[inline]
pub(crate) fn check_threshold(threshold: f32) -> RoiResult<()> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(RoiError::InvalidThreshold(threshold))
    }
}

/// 半径必须为有限正数.
#[inline]
pub(crate) fn check_radius(radius_mm: f64) -> RoiResult<()> {
    if radius_mm.is_finite() && radius_mm > 0.0 {
        Ok(())
    } else {
        Err(RoiError::InvalidRadius(radius_mm))
    }
}

/// [`PipelineConfig`] 构建器. 在 [`ConfigBuilder::build`] 时统一校验.
#[derive(Clone, Debug)]
pub struct ConfigBuilder {
    inner: PipelineConfig,
}

impl ConfigBuilder {
    /// 设置原始数据根目录.
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.inner.data_dir = dir.into();
        self
    }

    /// 设置配准结果根目录.
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.inner.output_dir = dir.into();
        self
    }

    /// 设置图像输出目录.
    pub fn figures_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.inner.figures_dir = dir.into();
        self
    }

    /// 设置图谱目录.
    pub fn atlas_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.inner.atlas_dir = dir.into();
        self
    }

    /// 设置 LC 图谱文件名.
    pub fn lc_atlas_filename(mut self, name: impl Into<String>) -> Self {
        self.inner.lc_atlas_filename = name.into();
        self
    }

    /// 设置参考 ROI 缓存文件名.
    pub fn reference_roi_filename(mut self, name: impl Into<String>) -> Self {
        self.inner.reference_roi_filename = name.into();
        self
    }

    /// 设置 LC 概率阈值.
    pub fn lc_probability_threshold(mut self, threshold: f32) -> Self {
        self.inner.lc_probability_threshold = threshold;
        self
    }

    /// 设置参考球球心 (MNI, mm).
    pub fn reference_center_mni(mut self, center: Point3d) -> Self {
        self.inner.reference_center_mni = center;
        self
    }

    /// 设置参考球半径 (mm).
    pub fn reference_radius_mm(mut self, radius: f64) -> Self {
        self.inner.reference_radius_mm = radius;
        self
    }

    /// 校验并生成配置.
    ///
    /// # 返回值
    ///
    /// - 阈值不在 `[0, 1]` 时返回 `Err(RoiError::InvalidThreshold)`;
    /// - 半径不是有限正数时返回 `Err(RoiError::InvalidRadius)`;
    /// - 球心含非有限分量时返回 `Err(RoiError::InvalidCoordinate)`.
    pub fn build(self) -> RoiResult<PipelineConfig> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let c = PipelineConfig::default();
        assert_eq!(c.lc_probability_threshold(), 0.5);
        assert_eq!(c.reference_center_mni(), [0.0, -30.0, -28.0]);
        assert_eq!(c.reference_radius_mm(), 3.0);
        assert_eq!(
            c.reference_roi_path(),
            PathBuf::from("atlases/pontine_reference_MNI.nii.gz")
        );
        assert_eq!(c.lc_atlas_path(), PathBuf::from("atlases/LC_prob_MNI.nii.gz"));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_contrast_path() {
        let c = PipelineConfig::builder()
            .output_dir("/tmp/out")
            .build()
            .unwrap();
        assert_eq!(
            c.contrast_path("sub-01", "QSM"),
            PathBuf::from("/tmp/out/sub-01/sub-01_QSM_MNI.nii.gz")
        );
    }

    #[test]
    fn test_builder_rejects_invalid_values() {
        let e = PipelineConfig::builder()
            .lc_probability_threshold(1.5)
            .build()
            .unwrap_err();
        assert!(matches!(e, RoiError::InvalidThreshold(_)));

        let e = PipelineConfig::builder()
            .lc_probability_threshold(f32::NAN)
            .build()
            .unwrap_err();
        assert!(matches!(e, RoiError::InvalidThreshold(_)));

        let e = PipelineConfig::builder()
            .reference_radius_mm(0.0)
            .build()
            .unwrap_err();
        assert!(matches!(e, RoiError::InvalidRadius(_)));

        let e = PipelineConfig::builder()
            .reference_center_mni([0.0, f64::INFINITY, 0.0])
            .build()
            .unwrap_err();
        assert!(matches!(e, RoiError::InvalidCoordinate(_)));
    }

    #[test]
    fn test_builder_boundaries_accepted() {
        for t in [0.0, 1.0] {
            let c = PipelineConfig::builder()
                .lc_probability_threshold(t)
                .build()
                .unwrap();
            assert_eq!(c.lc_probability_threshold(), t);
        }
        let base = PipelineConfig::default();
        let c = base.to_builder().reference_radius_mm(4.5).build().unwrap();
        assert_eq!(c.reference_radius_mm(), 4.5);
        assert_eq!(c.atlas_dir(), base.atlas_dir());
    }
}
