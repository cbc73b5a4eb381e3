use std::ops::Range;

use log::{debug, warn};
use ndarray::{Array3, ArrayView3, Zip};

use crate::config::check_radius;
use crate::{Affine, Idx3d, Idx3dI, PipelineConfig, Point3d, RoiError, RoiResult};

/// 实现提取球形 ROI 所需要维护的相关数据结构.
///
/// 球心由物理坐标经仿射逆变换后取整得到, 距离按各轴真实体素间距计算,
/// 因此在各向异性网格上依旧是物理意义上的球.
pub struct SphereGenerator<'a> {
    shape: Idx3d,
    affine: &'a Affine,
    center: Idx3dI,
    dims: [f64; 3],
}

impl<'a> SphereGenerator<'a> {
    /// 在 `shape` 网格上, 以物理坐标 `center_mm` 为球心创建生成器.
    ///
    /// 球心可以位于网格之外.
    pub fn new(shape: Idx3d, affine: &'a Affine, center_mm: Point3d) -> RoiResult<Self> {
        let center = affine.to_voxel(center_mm)?;
        Ok(Self {
            shape,
            affine,
            center,
            dims: affine.voxel_dims(),
        })
    }

    /// 球心体素索引.
    #[inline]
    pub fn center(&self) -> Idx3dI {
        self.center
    }

    /// 计算 `self.center` 到 `point` 的欧氏距离的平方, 单位为 (mm)^2.
    #[inline]
    fn center_distance_to_squared(&self, (i, j, k): Idx3d) -> f64 {
        let (ci, cj, ck) = self.center;
        let [di, dj, dk] = self.dims;
        let d = |p: usize, c: isize, step: f64| (p as f64 - c as f64) * step;
        d(i, ci, di).powi(2) + d(j, cj, dj).powi(2) + d(k, ck, dk).powi(2)
    }

    /// 半径为 `radius` (mm) 的球的轴对齐包围盒, 已裁剪到网格内.
    /// 包围盒为空 (球完全在网格外) 时返回 `None`.
    fn bounding_box(&self, radius: f64) -> Option<[Range<usize>; 3]> {
        let bound = self.affine.axis_voxel_radius(radius);
        let (ci, cj, ck) = self.center;
        let (si, sj, sk) = self.shape;

        let clip = |c: isize, b: usize, len: usize| -> Option<Range<usize>> {
            // 超出 `len + |c|` 的部分对裁剪结果没有影响.
            let b = b
                .min(len.saturating_add(c.unsigned_abs()))
                .min(isize::MAX as usize) as isize;
            let lo = c.saturating_sub(b).max(0) as usize;
            let hi = c.saturating_add(b).saturating_add(1).clamp(0, len as isize) as usize;
            (lo < hi).then_some(lo..hi)
        };
        Some([
            clip(ci, bound[0], si)?,
            clip(cj, bound[1], sj)?,
            clip(ck, bound[2], sk)?,
        ])
    }

    /// 提取半径不大于 `radius` (单位: mm) 的球的所有体素索引. 结果按行优先存储.
    ///
    /// 包围盒只用于剪枝, 每个体素都要经过真实物理距离判定.
    pub fn extract_sphere(&self, radius: f64) -> Vec<Idx3d> {
        let Some([ri, rj, rk]) = self.bounding_box(radius) else {
            return vec![];
        };
        let r2 = radius.powi(2);
        let mut ans = Vec::with_capacity(ri.len() * rj.len() * rk.len());
        for i in ri {
            for j in rj.clone() {
                for k in rk.clone() {
                    if self.center_distance_to_squared((i, j, k)) <= r2 {
                        ans.push((i, j, k));
                    }
                }
            }
        }
        ans
    }

    /// 构建半径为 `radius` (mm) 的二值球形掩膜, 值为 `0.0` 或 `1.0`.
    ///
    /// 若给出 `exclude`, 则其中非零的体素在结果中被置零.
    pub fn build_mask(
        &self,
        radius: f64,
        exclude: Option<ArrayView3<f32>>,
    ) -> RoiResult<Array3<f32>> {
        check_radius(radius)?;
        if let Some(ex) = exclude.as_ref() {
            if ex.dim() != self.shape {
                return Err(RoiError::ShapeMismatch {
                    expected: self.shape,
                    actual: ex.dim(),
                });
            }
        }

        let mut mask = Array3::<f32>::zeros(self.shape);
        let sphere = self.extract_sphere(radius);
        if sphere.is_empty() {
            warn!(
                "sphere at voxel {:?} (r = {radius} mm) does not intersect grid {:?}",
                self.center, self.shape
            );
        }
        for pos in sphere {
            mask[pos] = 1.0;
        }

        if let Some(ex) = exclude {
            Zip::from(&mut mask).and(&ex).for_each(|m, &e| {
                if e != 0.0 {
                    *m = 0.0;
                }
            });
        }
        debug!(
            "sphere at voxel {:?}, r = {radius} mm: {} voxels",
            self.center,
            mask.iter().filter(|v| **v > 0.0).count()
        );
        Ok(mask)
    }
}

/// 在 `shape` 网格上构建以 `center_mm` 为球心, 半径 `radius_mm` 的二值球形掩膜.
///
/// 参见 [`SphereGenerator::build_mask`].
#[inline]
pub fn sphere_mask(
    shape: Idx3d,
    affine: &Affine,
    center_mm: Point3d,
    radius_mm: f64,
    exclude: Option<ArrayView3<f32>>,
) -> RoiResult<Array3<f32>> {
    SphereGenerator::new(shape, affine, center_mm)?.build_mask(radius_mm, exclude)
}

/// 按照 `config` 中的球心与半径构建脑桥被盖参考球.
#[inline]
pub fn pontine_reference_mask(
    shape: Idx3d,
    affine: &Affine,
    exclude: Option<ArrayView3<f32>>,
    config: &PipelineConfig,
) -> RoiResult<Array3<f32>> {
    sphere_mask(
        shape,
        affine,
        config.reference_center_mni(),
        config.reference_radius_mm(),
        exclude,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn count(mask: &Array3<f32>) -> usize {
        mask.iter().filter(|v| **v == 1.0).count()
    }

    fn rel_err(a: f64, b: f64) -> f64 {
        (a - b).abs() / b
    }

    /// 以网格中心为球心, 返回 (网格形状, 仿射, 球心物理坐标).
    fn centered_grid(spacing: [f64; 3], n: [usize; 3]) -> (Idx3d, Affine, Point3d) {
        let affine = Affine::from_spacing(spacing, [0.0; 3]).unwrap();
        let center = [
            (n[0] / 2) as f64 * spacing[0],
            (n[1] / 2) as f64 * spacing[1],
            (n[2] / 2) as f64 * spacing[2],
        ];
        ((n[0], n[1], n[2]), affine, center)
    }

    #[test]
    fn test_unit_grid_lattice_count() {
        // x^2 + y^2 + z^2 <= 9 的整点个数为 123.
        let (shape, affine, center) = centered_grid([1.0; 3], [11; 3]);
        let mask = sphere_mask(shape, &affine, center, 3.0, None).unwrap();
        assert_eq!(count(&mask), 123);
        assert!(mask.iter().all(|v| *v == 0.0 || *v == 1.0));
    }

    /// 各向同性网格上, 体素体积之和逼近 4/3 π r^3, 且体素越小误差越小.
    #[test]
    fn test_sphere_volume_converges() {
        let r = 3.0;
        let expected = 4.0 / 3.0 * PI * r * r * r;

        let mut errors = vec![];
        for (h, n) in [(1.0, 11), (0.5, 21), (0.25, 41)] {
            let (shape, affine, center) = centered_grid([h; 3], [n; 3]);
            let mask = sphere_mask(shape, &affine, center, r, None).unwrap();
            let vol = count(&mask) as f64 * h * h * h;
            errors.push(rel_err(vol, expected));
        }
        assert!(errors[0] < 0.10, "{errors:?}");
        assert!(errors[2] < 0.02, "{errors:?}");
        assert!(errors[2] < errors[0], "{errors:?}");
    }

    /// 包围盒内每个体素: 被选中当且仅当物理距离不超过半径.
    #[test]
    fn test_inclusion_is_exact() {
        let spacing = [0.5, 1.0, 2.0];
        let (shape, affine, center) = centered_grid(spacing, [30, 16, 9]);
        let r = 3.0;
        let g = SphereGenerator::new(shape, &affine, center).unwrap();
        let mask = g.build_mask(r, None).unwrap();
        let (ci, cj, ck) = g.center();

        for ((i, j, k), v) in mask.indexed_iter() {
            let dist = (((i as f64 - ci as f64) * spacing[0]).powi(2)
                + ((j as f64 - cj as f64) * spacing[1]).powi(2)
                + ((k as f64 - ck as f64) * spacing[2]).powi(2))
            .sqrt();
            if *v == 1.0 {
                assert!(dist <= r, "({i}, {j}, {k}) at {dist} mm included");
            } else {
                assert!(dist > r, "({i}, {j}, {k}) at {dist} mm excluded");
            }
        }
        // 0.5mm 轴上 6 个体素恰好是 3mm, 必须被包含.
        assert_eq!(mask[((ci + 6) as usize, cj as usize, ck as usize)], 1.0);
        assert_eq!(mask[((ci + 7) as usize, cj as usize, ck as usize)], 0.0);
        // 2mm 轴上 1 个体素在内, 2 个体素 (4mm) 在外.
        assert_eq!(mask[(ci as usize, cj as usize, (ck + 1) as usize)], 1.0);
        assert_eq!(mask[(ci as usize, cj as usize, (ck + 2) as usize)], 0.0);
    }

    #[test]
    fn test_clipped_at_grid_border() {
        let affine = Affine::from_spacing([1.0; 3], [0.0; 3]).unwrap();
        // 球心在角上, 只有 1/8 的球在网格内.
        let mask = sphere_mask((5, 5, 5), &affine, [0.0; 3], 2.0, None).unwrap();
        // x, y, z >= 0 且 x^2 + y^2 + z^2 <= 4 的整点个数.
        assert_eq!(count(&mask), 11);
        assert_eq!(mask[(0, 0, 0)], 1.0);
        assert_eq!(mask[(2, 0, 0)], 1.0);
        assert_eq!(mask[(2, 1, 0)], 0.0);
    }

    /// 覆盖整个网格的超大半径, 不论包围盒是否溢出, 都应选中全部体素.
    #[test]
    fn test_huge_radius_covers_grid() {
        let affine = Affine::from_spacing([1.0; 3], [0.0; 3]).unwrap();
        for r in [1e6, 1e19, 1e21, f64::MAX] {
            let mask = sphere_mask((5, 5, 5), &affine, [2.0; 3], r, None).unwrap();
            assert_eq!(count(&mask), 125, "radius {r}");
        }
        assert_eq!(affine.axis_voxel_radius(1e21), [usize::MAX; 3]);

        // 球心远在网格外, 半径足以覆盖整个网格.
        let mask = sphere_mask((5, 5, 5), &affine, [-1e3, 2.0, 2.0], 1e4, None).unwrap();
        assert_eq!(count(&mask), 125);
    }

    #[test]
    fn test_center_outside_grid() {
        let affine = Affine::from_spacing([1.0; 3], [0.0; 3]).unwrap();
        let mask = sphere_mask((5, 5, 5), &affine, [100.0, -50.0, 2.0], 3.0, None).unwrap();
        assert_eq!(count(&mask), 0);
        let mask = sphere_mask((5, 5, 5), &affine, [-3.0, 2.0, 2.0], 3.0, None).unwrap();
        // 仅 (0, 2, 2) 距离恰好为 3mm.
        assert_eq!(count(&mask), 1);
    }

    #[test]
    fn test_exclusion_mask() {
        let (shape, affine, center) = centered_grid([1.0; 3], [11; 3]);
        let mut exclude = Array3::<f32>::zeros(shape);
        exclude[(5, 5, 5)] = 1.0;
        exclude[(5, 5, 6)] = 0.2;
        exclude[(0, 0, 0)] = 1.0; // 球外, 不影响计数.
        let mask = sphere_mask(shape, &affine, center, 3.0, Some(exclude.view())).unwrap();
        assert_eq!(count(&mask), 121);
        assert_eq!(mask[(5, 5, 5)], 0.0);
        assert_eq!(mask[(5, 5, 6)], 0.0);
        assert_eq!(mask[(5, 5, 7)], 1.0);
    }

    #[test]
    fn test_invalid_inputs() {
        let (shape, affine, center) = centered_grid([1.0; 3], [11; 3]);
        let e = sphere_mask(shape, &affine, center, 0.0, None).unwrap_err();
        assert!(matches!(e, RoiError::InvalidRadius(_)));
        let e = sphere_mask(shape, &affine, center, f64::NAN, None).unwrap_err();
        assert!(matches!(e, RoiError::InvalidRadius(_)));

        let wrong = Array3::<f32>::zeros((11, 11, 10));
        let e = sphere_mask(shape, &affine, center, 3.0, Some(wrong.view())).unwrap_err();
        assert!(matches!(e, RoiError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_pontine_reference_mask_uses_config() {
        // MNI 风格 1mm 网格, (0, -30, -28) 落在体素 (10, 10, 10).
        let affine = Affine::from_spacing([1.0; 3], [-10.0, -40.0, -38.0]).unwrap();
        let config = PipelineConfig::default();
        let mask = pontine_reference_mask((21, 21, 21), &affine, None, &config).unwrap();
        assert_eq!(count(&mask), 123);
        assert_eq!(mask[(10, 10, 10)], 1.0);
        assert_eq!(mask[(10, 10, 13)], 1.0);
        assert_eq!(mask[(10, 10, 14)], 0.0);
    }
}
