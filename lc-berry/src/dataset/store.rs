use std::fs;
use std::path::Path;

use crate::{RoiResult, Volume};

/// 体数据的存取后端.
///
/// 参考 ROI 解析与受试者 CNR 汇总只通过该 trait 访问文件系统,
/// 因此可以在测试中替换为内存实现.
pub trait VolumeStore {
    /// `path` 处是否存在可加载的体数据.
    fn exists(&self, path: &Path) -> bool;

    /// 加载 `path` 处的体数据.
    fn load(&self, path: &Path) -> RoiResult<Volume>;

    /// 将 `volume` 持久化到 `path`, 必要时创建父目录.
    fn save(&self, path: &Path, volume: &Volume) -> RoiResult<()>;
}

impl<T: VolumeStore + ?Sized> VolumeStore for &T {
    #[inline]
    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    #[inline]
    fn load(&self, path: &Path) -> RoiResult<Volume> {
        (**self).load(path)
    }

    #[inline]
    fn save(&self, path: &Path, volume: &Volume) -> RoiResult<()> {
        (**self).save(path, volume)
    }
}

/// 基于本地文件系统和 nii / nii.gz 文件的 [`VolumeStore`].
#[derive(Copy, Clone, Debug, Default)]
pub struct NiftiStore;

impl VolumeStore for NiftiStore {
    #[inline]
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    #[inline]
    fn load(&self, path: &Path) -> RoiResult<Volume> {
        Volume::open(path)
    }

    fn save(&self, path: &Path, volume: &Volume) -> RoiResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        volume.save(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Affine;
    use ndarray::Array3;

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("mask.nii.gz");
        let affine = Affine::from_spacing([1.0; 3], [0.0; 3]).unwrap();
        let v = Volume::from_parts(Array3::from_elem((2, 3, 4), 1.0), affine);

        let store = NiftiStore;
        assert!(!store.exists(&path));
        store.save(&path, &v).unwrap();
        assert!(store.exists(&path));
        assert!(!store.exists(dir.path()));
        assert_eq!(store.load(&path).unwrap().data(), v.data());
    }
}
