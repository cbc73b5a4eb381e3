//! 体素索引与物理坐标之间的仿射映射.

use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};
use nifti::NiftiHeader;
use num::ToPrimitive;

use crate::{Idx3d, Idx3dI, Point3d, RoiError, RoiResult};

/// 4×4 可逆仿射矩阵, 满足 `physical = A · [i, j, k, 1]ᵀ`.
///
/// 构造时即求逆并缓存, 因此该结构一旦存在就保证可逆.
/// 该结构是只读的. 若要修改矩阵, 你应该创建新的实例.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Affine {
    forward: Matrix4<f64>,
    inverse: Matrix4<f64>,
}

impl Affine {
    /// 从 4×4 矩阵构建仿射.
    ///
    /// 当矩阵不可逆 (或含非有限值) 时返回 `Err(RoiError::SingularAffine)`.
    pub fn new(forward: Matrix4<f64>) -> RoiResult<Self> {
        if !forward.iter().all(|v| v.is_finite()) {
            return Err(RoiError::SingularAffine);
        }
        let inverse = forward.try_inverse().ok_or(RoiError::SingularAffine)?;
        if !inverse.iter().all(|v| v.is_finite()) {
            return Err(RoiError::SingularAffine);
        }
        Ok(Self { forward, inverse })
    }

    /// 从行优先的 4×4 数组构建仿射.
    #[inline]
    pub fn from_rows(rows: [[f64; 4]; 4]) -> RoiResult<Self> {
        Self::new(Matrix4::from_fn(|r, c| rows[r][c]))
    }

    /// 轴对齐的仿射: 对角线为体素间距, 平移为 `origin`.
    #[inline]
    pub fn from_spacing(spacing: [f64; 3], origin: Point3d) -> RoiResult<Self> {
        let [dx, dy, dz] = spacing;
        let [ox, oy, oz] = origin;
        Self::from_rows([
            [dx, 0.0, 0.0, ox],
            [0.0, dy, 0.0, oy],
            [0.0, 0.0, dz, oz],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// 从 nifti 元数据恢复仿射.
    ///
    /// 优先使用 sform (`sform_code > 0`), 其次使用 qform 四元数 (`qform_code > 0`),
    /// 都没有时退化为以 `pixdim` 为对角线的仿射.
    pub fn from_header(header: &NiftiHeader) -> RoiResult<Self> {
        if header.sform_code > 0 {
            let [x, y, z] = [&header.srow_x, &header.srow_y, &header.srow_z];
            let row = |r: &[f32; 4]| [r[0] as f64, r[1] as f64, r[2] as f64, r[3] as f64];
            Self::from_rows([row(x), row(y), row(z), [0.0, 0.0, 0.0, 1.0]])
        } else if header.qform_code > 0 {
            Self::new(qform_matrix(header))
        } else {
            let [_, dx, dy, dz, ..] = header.pixdim;
            Self::from_spacing([dx as f64, dy as f64, dz as f64], [0.0; 3])
        }
    }

    /// 正向矩阵 (体素 -> 物理).
    #[inline]
    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.forward
    }

    /// 逆矩阵 (物理 -> 体素).
    #[inline]
    pub fn inverse(&self) -> &Matrix4<f64> {
        &self.inverse
    }

    /// 行优先展开的 4×4 矩阵.
    pub fn to_rows(&self) -> [[f64; 4]; 4] {
        let mut ans = [[0.0; 4]; 4];
        for (r, row) in ans.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = self.forward[(r, c)];
            }
        }
        ans
    }

    /// 物理坐标 `p` 在体素空间中的连续坐标 (未取整).
    #[inline]
    pub fn to_voxel_f(&self, p: Point3d) -> Point3d {
        let v = self.inverse * Vector4::new(p[0], p[1], p[2], 1.0);
        [v.x, v.y, v.z]
    }

    /// 物理坐标 `p` 最近的体素索引. 每个分量独立四舍五入.
    ///
    /// 返回值可能越界, 甚至为负, 由调用者裁剪. 坐标含非有限值 (或超出
    /// `isize` 表示范围) 时返回 `Err(RoiError::InvalidCoordinate)`.
    pub fn to_voxel(&self, p: Point3d) -> RoiResult<Idx3dI> {
        let [i, j, k] = self.to_voxel_f(p);
        let round = |v: f64| v.round().to_isize();
        match (round(i), round(j), round(k)) {
            (Some(i), Some(j), Some(k)) => Ok((i, j, k)),
            _ => Err(RoiError::InvalidCoordinate(p)),
        }
    }

    /// 体素索引 `idx` 对应的物理坐标.
    #[inline]
    pub fn to_physical(&self, (i, j, k): Idx3d) -> Point3d {
        self.to_physical_f([i as f64, j as f64, k as f64])
    }

    /// 连续体素坐标对应的物理坐标.
    #[inline]
    pub fn to_physical_f(&self, [i, j, k]: Point3d) -> Point3d {
        let v = self.forward * Vector4::new(i, j, k, 1.0);
        [v.x, v.y, v.z]
    }

    /// 各轴体素间距 (mm), 即对角缩放项的绝对值.
    #[inline]
    pub fn voxel_dims(&self) -> [f64; 3] {
        [
            self.forward[(0, 0)].abs(),
            self.forward[(1, 1)].abs(),
            self.forward[(2, 2)].abs(),
        ]
    }

    /// 等效各向同性体素间距, 即三轴间距的几何平均.
    #[inline]
    pub fn iso_voxel_size(&self) -> f64 {
        self.voxel_dims().iter().product::<f64>().cbrt()
    }

    /// 按等效各向同性间距, 把物理半径 `radius_mm` 换算为体素半径 (向上取整).
    #[inline]
    pub fn iso_voxel_radius(&self, radius_mm: f64) -> usize {
        ceil_steps(radius_mm, self.iso_voxel_size())
    }

    /// 按各轴间距, 把物理半径 `radius_mm` 分别换算为每个轴上的体素半径 (向上取整).
    ///
    /// 以此为界的包围盒一定包含半径为 `radius_mm` 的整个球.
    #[inline]
    pub fn axis_voxel_radius(&self, radius_mm: f64) -> [usize; 3] {
        self.voxel_dims().map(|d| ceil_steps(radius_mm, d))
    }
}

/// `ceil(radius / step)`, 超出 `usize` 时饱和. 步长为 0 时返回 0.
#[inline]
fn ceil_steps(radius: f64, step: f64) -> usize {
    if step > 0.0 {
        (radius / step).ceil().to_usize().unwrap_or(usize::MAX)
    } else {
        0
    }
}

/// 由 nifti qform 字段 (`quatern_*`, `qoffset_*`, `pixdim`) 计算仿射.
fn qform_matrix(header: &NiftiHeader) -> Matrix4<f64> {
    let (b, c, d) = (
        header.quatern_b as f64,
        header.quatern_c as f64,
        header.quatern_d as f64,
    );
    let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();

    #[rustfmt::skip]
    let rot = Matrix3::new(
        a * a + b * b - c * c - d * d, 2.0 * (b * c - a * d),         2.0 * (b * d + a * c),
        2.0 * (b * c + a * d),         a * a + c * c - b * b - d * d, 2.0 * (c * d - a * b),
        2.0 * (b * d - a * c),         2.0 * (c * d + a * b),         a * a + d * d - b * b - c * c,
    );

    let [qfac, dx, dy, dz, ..] = header.pixdim;
    let qfac = if qfac < 0.0 { -1.0 } else { 1.0 };
    let scale = Matrix3::from_diagonal(&Vector3::new(dx as f64, dy as f64, dz as f64 * qfac));
    let linear = rot * scale;

    let mut m = Matrix4::identity();
    m.fixed_view_mut::<3, 3>(0, 0).copy_from(&linear);
    m[(0, 3)] = header.quatern_x as f64;
    m[(1, 3)] = header.quatern_y as f64;
    m[(2, 3)] = header.quatern_z as f64;
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-8
    }

    /// MNI 1mm 模板常见的仿射.
    fn mni_1mm() -> Affine {
        Affine::from_rows([
            [-1.0, 0.0, 0.0, 90.0],
            [0.0, 1.0, 0.0, -126.0],
            [0.0, 0.0, 1.0, -72.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_singular_affine() {
        let e = Affine::from_spacing([1.0, 0.0, 1.0], [0.0; 3]).unwrap_err();
        assert!(matches!(e, RoiError::SingularAffine));

        let e = Affine::from_rows([[0.0; 4]; 4]).unwrap_err();
        assert!(matches!(e, RoiError::SingularAffine));

        let e = Affine::from_spacing([1.0, f64::NAN, 1.0], [0.0; 3]).unwrap_err();
        assert!(matches!(e, RoiError::SingularAffine));
    }

    #[test]
    fn test_mni_origin() {
        let a = mni_1mm();
        assert_eq!(a.to_voxel([0.0, 0.0, 0.0]).unwrap(), (90, 126, 72));
        assert_eq!(a.to_voxel([0.0, -30.0, -28.0]).unwrap(), (90, 96, 44));
        let p = a.to_physical((90, 126, 72));
        assert!(p.iter().all(|v| f64_eq(*v, 0.0)));
    }

    #[test]
    fn test_rounding_each_axis_independently() {
        let a = Affine::from_spacing([2.0, 2.0, 2.0], [0.0; 3]).unwrap();
        // 0.4 -> 0, 2.6 -> 1, 5.2 -> 3 (体素坐标 0.2, 1.3, 2.6)
        assert_eq!(a.to_voxel([0.4, 2.6, 5.2]).unwrap(), (0, 1, 3));
        // 负方向也要正确取整.
        assert_eq!(a.to_voxel([-3.0, -0.2, -10.0]).unwrap(), (-2, 0, -5));
        assert!(a.to_voxel([f64::NAN, 0.0, 0.0]).is_err());
    }

    /// 任意 (可逆) 仿射下, 物理 -> 体素 -> 物理 的误差不超过一个体素对角线.
    #[test]
    fn test_round_trip_within_one_voxel() {
        let affines = [
            mni_1mm(),
            Affine::from_spacing([0.5, 0.7, 1.2], [-40.0, 12.0, 3.5]).unwrap(),
            Affine::from_rows([
                [0.0, -0.8, 0.1, 20.0],
                [1.1, 0.0, 0.0, -15.0],
                [0.05, 0.0, 0.6, 7.0],
                [0.0, 0.0, 0.0, 1.0],
            ])
            .unwrap(),
        ];
        let points = [
            [0.0, 0.0, 0.0],
            [0.0, -30.0, -28.0],
            [12.3, -4.56, 7.89],
            [-55.5, 41.25, -0.01],
        ];
        for a in affines.iter() {
            let m = a.matrix();
            let col = |c: usize| (m[(0, c)].powi(2) + m[(1, c)].powi(2) + m[(2, c)].powi(2)).sqrt();
            let tol = (col(0).powi(2) + col(1).powi(2) + col(2).powi(2)).sqrt();
            for p in points {
                let (i, j, k) = a.to_voxel(p).unwrap();
                let q = a.to_physical_f([i as f64, j as f64, k as f64]);
                let dist = ((p[0] - q[0]).powi(2) + (p[1] - q[1]).powi(2) + (p[2] - q[2]).powi(2))
                    .sqrt();
                assert!(dist <= tol, "{p:?} -> {q:?}: {dist} > {tol}");
            }
        }
    }

    #[test]
    fn test_voxel_radius() {
        let a = Affine::from_spacing([0.5, 1.0, 2.0], [0.0; 3]).unwrap();
        assert_eq!(a.voxel_dims(), [0.5, 1.0, 2.0]);
        // cbrt(0.5 * 1 * 2) == 1
        assert!(f64_eq(a.iso_voxel_size(), 1.0));
        assert_eq!(a.iso_voxel_radius(3.0), 3);
        assert_eq!(a.iso_voxel_radius(2.5), 3);
        assert_eq!(a.axis_voxel_radius(3.0), [6, 3, 2]);

        // 翻转轴的间距取绝对值.
        assert_eq!(mni_1mm().voxel_dims(), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_header_sform_preferred() {
        let mut h = NiftiHeader::default();
        h.sform_code = 1;
        h.srow_x = [2.0, 0.0, 0.0, 10.0];
        h.srow_y = [0.0, 3.0, 0.0, 20.0];
        h.srow_z = [0.0, 0.0, 4.0, 30.0];
        h.qform_code = 1;
        h.quatern_b = 1.0;
        let a = Affine::from_header(&h).unwrap();
        assert_eq!(a.voxel_dims(), [2.0, 3.0, 4.0]);
        assert_eq!(a.to_physical((1, 1, 1)), [12.0, 23.0, 34.0]);
    }

    #[test]
    fn test_header_qform() {
        let mut h = NiftiHeader::default();
        h.sform_code = 0;
        h.qform_code = 1;
        // 绕 z 轴旋转 180 度: (b, c, d) = (0, 0, 1).
        h.quatern_b = 0.0;
        h.quatern_c = 0.0;
        h.quatern_d = 1.0;
        h.quatern_x = 5.0;
        h.quatern_y = 6.0;
        h.quatern_z = 7.0;
        h.pixdim = [1.0, 1.0, 2.0, 3.0, 1.0, 1.0, 1.0, 1.0];
        let a = Affine::from_header(&h).unwrap();
        let p = a.to_physical((1, 1, 1));
        assert!(f64_eq(p[0], 4.0));
        assert!(f64_eq(p[1], 4.0));
        assert!(f64_eq(p[2], 10.0));

        // qfac < 0 翻转 k 轴.
        h.pixdim[0] = -1.0;
        let a = Affine::from_header(&h).unwrap();
        assert!(f64_eq(a.to_physical((0, 0, 1))[2], 4.0));
    }

    #[test]
    fn test_header_pixdim_fallback() {
        let mut h = NiftiHeader::default();
        h.sform_code = 0;
        h.qform_code = 0;
        h.pixdim = [1.0, 0.8, 0.8, 1.5, 1.0, 1.0, 1.0, 1.0];
        let a = Affine::from_header(&h).unwrap();
        let d = a.voxel_dims();
        assert!(f64_eq(d[0], 0.8f32 as f64));
        assert!(f64_eq(d[2], 1.5));
    }
}
