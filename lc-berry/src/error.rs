//! 运行时错误.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::Idx3d;

/// ROI 构建与信号提取的运行时错误 / 结果.
pub type RoiResult<T> = Result<T, RoiError>;

/// ROI 构建与信号提取的运行时错误.
#[derive(Error, Debug)]
pub enum RoiError {
    /// 仿射矩阵不可逆, 无法把物理坐标映射回体素空间.
    #[error("affine matrix is singular and cannot be inverted")]
    SingularAffine,

    /// 显式指定的参考 ROI 文件不存在.
    #[error("custom reference ROI not found: {}", .0.display())]
    OverrideNotFound(PathBuf),

    /// 阈值不在 `[0, 1]` 内.
    #[error("probability threshold {0} is outside [0, 1]")]
    InvalidThreshold(f32),

    /// 球半径不是有限正数.
    #[error("sphere radius {0} mm must be finite and positive")]
    InvalidRadius(f64),

    /// 坐标含 NaN 或无穷.
    #[error("coordinate {0:?} is not finite")]
    InvalidCoordinate([f64; 3]),

    /// 两个需要逐体素对应的数组形状不一致.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// 期望的形状.
        expected: Idx3d,
        /// 实际的形状.
        actual: Idx3d,
    },

    /// 体数据维度不足三维.
    #[error("expected a volume with at least 3 dimensions, got {0}")]
    NotAVolume(usize),

    /// 掩膜阈值化后没有任何有限值.
    #[error(
        "no valid voxels in ROI (threshold={threshold}, mask voxels={mask_voxels}, finite values=0)"
    )]
    EmptyRegion {
        /// 使用的阈值.
        threshold: f32,
        /// 阈值化后的掩膜体素个数.
        mask_voxels: usize,
    },

    /// LC 掩膜下没有任何有限值.
    #[error("no valid voxels in LC mask (mask voxels={mask_voxels}, finite values=0)")]
    EmptyLcRegion {
        /// LC 掩膜体素个数.
        mask_voxels: usize,
    },

    /// 参考掩膜下没有任何有限值.
    #[error("no valid voxels in reference mask (mask voxels={mask_voxels}, finite values=0)")]
    EmptyReferenceRegion {
        /// 参考掩膜体素个数.
        mask_voxels: usize,
    },

    /// 参考区域信号完全均匀, 无法作为 CNR 的分母.
    #[error(
        "reference region has zero variance (std=0, {voxels} voxels, mean={mean}); \
         this may indicate a masking problem or homogeneous signal"
    )]
    ZeroReferenceVariance {
        /// 参考区域有限值个数.
        voxels: usize,
        /// 参考区域均值.
        mean: f64,
    },

    /// 受试者没有任何可用的对比度文件.
    #[error("no contrast files found for {subject} in {}", .dir.display())]
    NoContrastFound {
        /// 受试者 ID.
        subject: String,
        /// 搜索目录.
        dir: PathBuf,
    },

    /// 底层 nifti 读写错误.
    #[error("nifti error: {0}")]
    Nifti(#[from] nifti::NiftiError),

    /// 底层 I/O 错误.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
