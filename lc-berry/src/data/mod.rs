use std::ops::Index;
use std::path::Path;

use log::{debug, warn};
use ndarray::{Array3, ArrayView3, Axis, Ix3};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::{Idx3d, RoiError, RoiResult};

mod affine;
mod resample;

pub use affine::Affine;
pub use resample::resample_nearest;

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// nii 格式 3D 体数据, 包括 header, 仿射和体素值. 体素值以 `f32` 保存,
/// 按照 nifti 原生的 `(i, j, k)` 顺序索引.
///
/// 数据图像 (如 R1, QSM) 和掩膜 (二值或概率) 都以该结构表示.
/// 载入后不可变; 所有操作都返回新数组.
#[derive(Debug, Clone)]
pub struct Volume {
    header: BoxedHeader,
    affine: Affine,
    data: Array3<f32>,
}

/// 3D nii 文件 header 的共用属性和部分通用操作.
pub trait NiftiHeaderAttr {
    /// 获取 header 部分.
    fn header(&self) -> &NiftiHeader;

    /// 获取数据形状大小 `(i, j, k)`.
    fn shape(&self) -> Idx3d;

    /// 获取数据体素个数.
    #[inline]
    fn size(&self) -> usize {
        let (i, j, k) = self.shape();
        i * j * k
    }

    /// 检查索引是否合法.
    #[inline]
    fn check(&self, (i0, j0, k0): &Idx3d) -> bool {
        let (i, j, k) = self.shape();
        *i0 < i && *j0 < j && *k0 < k
    }

    /// 获取单个体素分辨率 (header 中的 `pixdim`), 以毫米为单位,
    /// 依次对应 `i`, `j`, `k` 三个轴.
    #[inline]
    fn pix_dim(&self) -> [f64; 3] {
        let [_, i, j, k, ..] = self.header().pixdim;
        [i as f64, j as f64, k as f64]
    }

    /// 体素分辨率在三个维度上是否是各向同的?
    #[inline]
    fn is_isotropic(&self) -> bool {
        let [i, j, k] = self.pix_dim();
        i == j && i == k
    }

    /// 获取体素的实际体积值, 以立方毫米为单位.
    #[inline]
    fn voxel(&self) -> f64 {
        self.pix_dim().iter().product()
    }
}

impl NiftiHeaderAttr for Volume {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }

    #[inline]
    fn shape(&self) -> Idx3d {
        self.data.dim()
    }
}

impl Index<Idx3d> for Volume {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl Volume {
    /// 打开 nii (或 nii.gz) 文件格式的体数据. `path` 为文件的本地路径.
    ///
    /// 维度大于 3 的数据 (如 4D 时间序列) 只保留第一个 3D 体. 维度小于 3
    /// 时返回 `Err(RoiError::NotAVolume)`.
    pub fn open<P: AsRef<Path>>(path: P) -> RoiResult<Self> {
        let path = path.as_ref();
        let obj = ReaderOptions::new().read_file(path)?;
        let header = Box::new(obj.header().clone());

        let mut data = obj.into_volume().into_ndarray::<f32>()?;
        if data.ndim() < 3 {
            return Err(RoiError::NotAVolume(data.ndim()));
        }
        if data.ndim() > 3 {
            warn!(
                "{} has {} dimensions, keeping the first 3D volume",
                path.display(),
                data.ndim()
            );
        }
        while data.ndim() > 3 {
            let last = data.ndim() - 1;
            data = data.index_axis_move(Axis(last), 0);
        }
        // 维度已经确定为 3, 不会生成 `Err`.
        let data = data
            .into_dimensionality::<Ix3>()
            .map_err(|_| RoiError::NotAVolume(3))?
            .as_standard_layout()
            .into_owned();
        let affine = Affine::from_header(&header)?;

        debug!("loaded {} with shape {:?}", path.display(), data.dim());
        Ok(Self {
            header,
            affine,
            data,
        })
    }

    /// 根据裸数据和仿射直接创建体数据. header 由仿射 (作为 sform) 生成.
    pub fn from_parts(data: Array3<f32>, affine: Affine) -> Self {
        let mut header = Box::<NiftiHeader>::default();
        let rows = affine.to_rows();
        let row = |r: usize| rows[r].map(|v| v as f32);
        header.srow_x = row(0);
        header.srow_y = row(1);
        header.srow_z = row(2);
        header.sform_code = 2;
        header.qform_code = 0;
        let [di, dj, dk] = affine.voxel_dims();
        header.pixdim[1..4].copy_from_slice(&[di as f32, dj as f32, dk as f32]);
        Self {
            header,
            affine,
            data: data.as_standard_layout().into_owned(),
        }
    }

    /// 以 `self` 的 header 和仿射包装新的数据 `data`.
    ///
    /// `data` 形状必须与 `self` 一致, 否则返回 `Err(RoiError::ShapeMismatch)`.
    pub fn with_data(&self, data: Array3<f32>) -> RoiResult<Self> {
        if data.dim() != self.shape() {
            return Err(RoiError::ShapeMismatch {
                expected: self.shape(),
                actual: data.dim(),
            });
        }
        Ok(Self {
            header: self.header.clone(),
            affine: self.affine,
            data,
        })
    }

    /// 将体数据保存到 `path`. 以 `.gz` 结尾时自动压缩.
    ///
    /// 保存时以当前 header 为参考, 因此仿射与元信息会被保留.
    /// 体素值按原样写出, 不再做 `scl_slope` / `scl_inter` 缩放.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> RoiResult<()> {
        let path = path.as_ref();
        let mut header = self.header.clone();
        header.scl_slope = 1.0;
        header.scl_inter = 0.0;
        WriterOptions::new(path)
            .reference_header(&header)
            .write_nifti(&self.data)?;
        debug!("saved {} with shape {:?}", path.display(), self.shape());
        Ok(())
    }

    /// 获得仿射.
    #[inline]
    pub fn affine(&self) -> &Affine {
        &self.affine
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    /// 取出底层数据.
    #[inline]
    pub fn into_data(self) -> Array3<f32> {
        self.data
    }

    /// 获取值大于 0 的体素个数 (即二值掩膜的前景大小).
    #[inline]
    pub fn count_positive(&self) -> usize {
        self.data.iter().filter(|v| **v > 0.0).count()
    }
}
