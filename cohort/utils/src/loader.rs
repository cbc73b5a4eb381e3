//! 对 `lc_berry::PipelineConfig` 的更一层封装. 从环境变量或家目录构建配置.

use lc_berry::{PipelineConfig, RoiResult};
use std::env;
use std::path::{Path, PathBuf};

/// 获取 `$HOME/dataset/lc/{it...}`. 无法确定家目录时返回 `None`.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    ans.push("lc");
    ans.extend(it);
    Some(ans)
}

/// 读取目录.
///
/// 1. 若环境变量 `$key` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/lc/{sub}`;
/// 3. 无法确定家目录时, 返回相对路径 `{sub}`.
fn dir_from_env_or_home(key: &str, sub: &str) -> PathBuf {
    match env::var(key) {
        Ok(d) if !d.is_empty() => PathBuf::from(d),
        _ => home_dataset_dir_with([sub]).unwrap_or_else(|| PathBuf::from(sub)),
    }
}

/// 获取原始数据基本路径 (`$LC_DATA_DIR` 或 `$HOME/dataset/lc/data`).
#[inline]
pub fn data_dir_from_env_or_home() -> PathBuf {
    dir_from_env_or_home("LC_DATA_DIR", "data")
}

/// 获取配准结果基本路径 (`$LC_OUTPUT_DIR` 或 `$HOME/dataset/lc/results`).
#[inline]
pub fn output_dir_from_env_or_home() -> PathBuf {
    dir_from_env_or_home("LC_OUTPUT_DIR", "results")
}

/// 获取图谱基本路径 (`$LC_ATLAS_DIR` 或 `$HOME/dataset/lc/atlases`).
#[inline]
pub fn atlas_dir_from_env_or_home() -> PathBuf {
    dir_from_env_or_home("LC_ATLAS_DIR", "atlases")
}

/// 以环境变量或家目录下的路径构建配置, 其余参数取默认值.
/// 图像目录位于输出目录旁的 `figures`.
pub fn config_from_env_or_home() -> RoiResult<PipelineConfig> {
    let output_dir = output_dir_from_env_or_home();
    let figures_dir = output_dir
        .parent()
        .map_or_else(|| PathBuf::from("figures"), |p| p.join("figures"));
    PipelineConfig::builder()
        .data_dir(data_dir_from_env_or_home())
        .output_dir(output_dir)
        .figures_dir(figures_dir)
        .atlas_dir(atlas_dir_from_env_or_home())
        .build()
}
