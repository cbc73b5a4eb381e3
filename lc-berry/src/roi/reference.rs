//! 脑桥参考 ROI 的解析: 显式路径, 缓存文件, 生成并缓存.

use std::path::{Path, PathBuf};

use log::info;

use crate::consts::LC_EXCLUSION_CUTOFF;
use crate::dataset::{NiftiStore, VolumeStore};
use crate::roi::{pontine_reference_mask, threshold_atlas};
use crate::{NiftiHeaderAttr, PipelineConfig, RoiError, RoiResult, Volume};

/// 参考 ROI 的来源.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceSource {
    /// 调用方显式给出的文件.
    Override(PathBuf),
    /// 之前生成并缓存的文件.
    Cached(PathBuf),
    /// 本次新生成, 并已写入该路径.
    Generated(PathBuf),
}

impl ReferenceSource {
    /// 参考 ROI 所在的文件路径.
    #[inline]
    pub fn path(&self) -> &Path {
        match self {
            Self::Override(p) | Self::Cached(p) | Self::Generated(p) => p,
        }
    }
}

/// 解析时依次尝试的加载策略. 都未命中时生成新的参考 ROI.
enum Strategy<'p> {
    Override(&'p Path),
    Cached,
}

/// 参考 ROI 解析器.
///
/// 给出显式路径时只使用该路径, 文件缺失即失败, 不回退到缓存或生成.
/// 否则先尝试 `config.reference_roi_path()` 处的缓存, 缺失时由图谱生成并写入缓存.
/// 因此在同一配置下第二次解析不会重新生成.
pub struct ReferenceResolver<'a, S> {
    config: &'a PipelineConfig,
    store: S,
}

impl<'a, S: VolumeStore> ReferenceResolver<'a, S> {
    /// 以 `config` 和存取后端 `store` 创建解析器.
    pub fn new(config: &'a PipelineConfig, store: S) -> Self {
        Self { config, store }
    }

    fn strategies(custom: Option<&Path>) -> Vec<Strategy<'_>> {
        match custom {
            Some(p) => vec![Strategy::Override(p)],
            None => vec![Strategy::Cached],
        }
    }

    fn attempt(&self, strategy: Strategy) -> RoiResult<Option<(Volume, ReferenceSource)>> {
        match strategy {
            Strategy::Override(path) => {
                if !self.store.exists(path) {
                    return Err(RoiError::OverrideNotFound(path.to_path_buf()));
                }
                info!("using custom reference ROI: {}", path.display());
                let roi = self.store.load(path)?;
                Ok(Some((roi, ReferenceSource::Override(path.to_path_buf()))))
            }
            Strategy::Cached => {
                let path = self.config.reference_roi_path();
                if !self.store.exists(&path) {
                    return Ok(None);
                }
                info!("loading cached reference ROI: {}", path.display());
                let roi = self.store.load(&path)?;
                Ok(Some((roi, ReferenceSource::Cached(path))))
            }
        }
    }

    /// 解析参考 ROI, 并返回其来源.
    ///
    /// `atlas` 为 LC 概率图谱, 仅在需要生成时使用: 生成的掩膜与其共享网格和 header.
    pub fn resolve(
        &self,
        atlas: &Volume,
        custom: Option<&Path>,
    ) -> RoiResult<(Volume, ReferenceSource)> {
        for strategy in Self::strategies(custom) {
            if let Some(found) = self.attempt(strategy)? {
                return Ok(found);
            }
        }
        self.generate(atlas)
    }

    /// 由 `atlas` 生成参考 ROI 并写入缓存路径.
    ///
    /// 图谱中概率大于 [`LC_EXCLUSION_CUTOFF`] 的体素从参考球中排除.
    pub fn generate(&self, atlas: &Volume) -> RoiResult<(Volume, ReferenceSource)> {
        let exclude = threshold_atlas(atlas.data(), LC_EXCLUSION_CUTOFF)?;
        let mask = pontine_reference_mask(
            atlas.shape(),
            atlas.affine(),
            Some(exclude.view()),
            self.config,
        )?;
        let roi = atlas.with_data(mask)?;

        let path = self.config.reference_roi_path();
        self.store.save(&path, &roi)?;
        info!(
            "created reference ROI ({} voxels): {}",
            roi.count_positive(),
            path.display()
        );
        Ok((roi, ReferenceSource::Generated(path)))
    }
}

/// 载入或创建脑桥参考 ROI, 使用本地 nii 文件作为缓存.
///
/// 参见 [`ReferenceResolver::resolve`].
pub fn load_or_create_reference_roi(
    atlas: &Volume,
    config: &PipelineConfig,
    custom: Option<&Path>,
) -> RoiResult<Volume> {
    ReferenceResolver::new(config, NiftiStore)
        .resolve(atlas, custom)
        .map(|(roi, _)| roi)
}
