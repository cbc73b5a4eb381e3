//! 最近邻重采样.

use log::debug;
use ndarray::Array3;
use num::ToPrimitive;

use super::{Affine, NiftiHeaderAttr, Volume};
use crate::Idx3d;

/// 把 `src` 按最近邻插值重采样到 `(shape, affine)` 描述的网格上.
///
/// 目标网格每个体素先映射到物理空间, 再映射回 `src` 的体素空间并四舍五入.
/// 落在 `src` 之外的体素取 `0.0`. 最近邻插值不会在边界处引入小数值,
/// 因此二值掩膜重采样后依旧是二值的.
pub fn resample_nearest(src: &Volume, shape: Idx3d, affine: &Affine) -> Array3<f32> {
    // 目标体素 -> 物理 -> 源体素.
    let m = src.affine().inverse() * affine.matrix();
    let (si, sj, sk) = src.shape();
    let data = src.data();

    let lookup = |v: f64, len: usize| v.round().to_usize().filter(|x| *x < len);

    let ans = Array3::from_shape_fn(shape, |(i, j, k)| {
        let (i, j, k) = (i as f64, j as f64, k as f64);
        let x = m[(0, 0)] * i + m[(0, 1)] * j + m[(0, 2)] * k + m[(0, 3)];
        let y = m[(1, 0)] * i + m[(1, 1)] * j + m[(1, 2)] * k + m[(1, 3)];
        let z = m[(2, 0)] * i + m[(2, 1)] * j + m[(2, 2)] * k + m[(2, 3)];
        match (lookup(x, si), lookup(y, sj), lookup(z, sk)) {
            (Some(x), Some(y), Some(z)) => data[(x, y, z)],
            _ => 0.0,
        }
    });
    debug!("resampled {:?} -> {:?} (nearest)", src.shape(), shape);
    ans
}
