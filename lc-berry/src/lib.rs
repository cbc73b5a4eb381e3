#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 基于 MNI 空间的蓝斑 (locus coeruleus, LC) 概率图谱,
//! 构建 LC 和脑桥参考区域的 ROI, 并在多种 MRI 对比度上计算两者之间的
//! 对比噪声比 (contrast-to-noise ratio, CNR).
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 该 crate 不负责配准. 所有输入数据均应已被外部工具非线性配准到 MNI 空间,
//!   并按照 `{subject}_{contrast}_MNI.nii.gz` 的模式存放在受试者输出目录下.
//! 2. 体素索引按照 nifti 原生的 `(i, j, k)` 顺序组织, 不做轴重排.
//!   物理坐标满足 `physical = affine · [i, j, k, 1]ᵀ`.
//! 3. 所有失败情况 (空区域, 参考区域方差为 0, 奇异仿射矩阵等) 都以
//!   [`RoiError`] 返回, 不会静默地返回 0.
//!
//! # 功能
//!
//! ### 仿射变换与几何映射 ✅
//!
//! 物理坐标 (mm) 与体素索引互相转换, 各向异性体素间距, 毫米半径到体素半径的换算.
//!
//! 实现位于 `lc-berry/src/data/affine.rs`.
//!
//! ### 球形 ROI ✅
//!
//! 以 MNI 坐标为球心、毫米为半径, 在任意仿射下构建二值球形掩膜.
//! 包含判定使用各向异性的真实物理距离, 而非体素个数半径.
//!
//! 实现位于 `lc-berry/src/roi/sphere.rs`.
//!
//! ### 概率图谱二值化 ✅
//!
//! 严格大于阈值的体素为 1, 其余为 0. 默认阈值见 [`consts::DEFAULT_LC_THRESHOLD`].
//!
//! 实现位于 `lc-berry/src/roi/threshold.rs`.
//!
//! ### 参考 ROI 解析 ✅
//!
//! 显式路径 -> 缓存文件 -> 生成并缓存, 按优先级依次尝试.
//!
//! 实现位于 `lc-berry/src/roi/reference.rs`.
//!
//! ### 区域统计 & CNR ✅
//!
//! 实现位于 `lc-berry/src/stats/*`.

/// 三维体素索引 `(i, j, k)`, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 可能越界 (甚至为负) 的三维体素索引.
pub type Idx3dI = (isize, isize, isize);

/// 物理空间 (通常为 MNI 空间) 中的点, 单位为毫米.
pub type Point3d = [f64; 3];

/// nii 格式 3D 体数据基础结构.
mod data;

pub use data::{resample_nearest, Affine, NiftiHeaderAttr, Volume};

pub mod config;
pub mod consts;
pub mod dataset;
mod error;
pub mod prelude;
pub mod roi;
pub mod stats;

pub use config::{ConfigBuilder, PipelineConfig};
pub use error::{RoiError, RoiResult};
