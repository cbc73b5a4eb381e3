//! 数据集目录操作.
//!
//! 配准结果按 `{output_dir}/{subject}/{subject}_{contrast}_MNI.nii.gz` 组织.

use std::fs;
use std::path::Path;

use crate::consts::SUBJECT_PREFIX;
use crate::{PipelineConfig, RoiResult};

mod store;

pub use store::{NiftiStore, VolumeStore};

#[cfg(test)]
pub(crate) use store::mem::MemStore;

/// 列出 `dir` 下所有以 `sub-` 开头的受试者目录名, 按字典序排列.
///
/// `dir` 不存在时返回空 `Vec`.
pub fn list_processed_subjects<P: AsRef<Path>>(dir: P) -> RoiResult<Vec<String>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Ok(vec![]);
    }
    let mut ans = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if name.starts_with(SUBJECT_PREFIX) {
                ans.push(name.to_string());
            }
        }
    }
    ans.sort_unstable();
    Ok(ans)
}

/// 创建配置中的输出目录和图像目录 (已存在时不做任何事).
pub fn ensure_output_dirs(config: &PipelineConfig) -> RoiResult<()> {
    fs::create_dir_all(config.output_dir())?;
    fs::create_dir_all(config.figures_dir())?;
    Ok(())
}
