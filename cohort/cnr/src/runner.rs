//! 程序运行函数.

use crate::result::CohortResult;
use lc_berry::prelude::*;
use log::{info, warn};
use std::thread;
use utils::loader;

/// 载入参考 ROI 并二值化到图谱网格上 (值大于 0 即在区域内).
fn reference_mask(atlas: &Volume, config: &PipelineConfig) -> RoiResult<Volume> {
    let reference = load_or_create_reference_roi(atlas, config, None)?;
    let reference = if reference.shape() == atlas.shape() {
        reference
    } else {
        warn!(
            "reference ROI grid {:?} differs from atlas grid {:?}, resampling",
            reference.shape(),
            atlas.shape()
        );
        atlas.with_data(resample_nearest(&reference, atlas.shape(), atlas.affine()))?
    };
    binarize(&reference, 0.0)
}

/// 实际运行.
pub fn run() -> RoiResult<CohortResult> {
    let config = loader::config_from_env_or_home()?;
    dataset::ensure_output_dirs(&config)?;

    let atlas = Volume::open(config.lc_atlas_path())?;
    let lc_mask = par_threshold_atlas(atlas.data(), config.lc_probability_threshold())?;
    info!(
        "LC mask: {} voxels above {}",
        lc_mask.iter().filter(|v| **v > 0.0).count(),
        config.lc_probability_threshold()
    );

    // 参考 ROI 必须在分发受试者之前解析, 缓存文件只会被写入一次.
    let ref_mask = reference_mask(&atlas, &config)?;
    info!("reference mask: {} voxels", ref_mask.count_positive());

    let subjects = list_processed_subjects(config.output_dir())?;
    if subjects.is_empty() {
        warn!("no processed subjects under {}", config.output_dir().display());
        return Ok(CohortResult::default());
    }
    let chunk = subjects.len().div_ceil(utils::cpus());
    info!(
        "Running CNR extraction on {} subjects ({chunk} per thread)...",
        subjects.len()
    );

    let (lc, rf, config) = (lc_mask.view(), ref_mask.data(), &config);
    let outcomes = thread::scope(|s| {
        let handles: Vec<_> = subjects
            .chunks(chunk)
            .map(|part| {
                s.spawn(move || {
                    part.iter()
                        .map(|sub| {
                            let r = extract_subject_cnr(
                                sub,
                                &DEFAULT_CONTRASTS,
                                lc,
                                rf,
                                config,
                                &NiftiStore,
                            );
                            (sub.clone(), r)
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|th| th.join().expect("Thread joining error"))
            .collect::<Vec<_>>()
    });

    Ok(CohortResult::from_outcomes(outcomes))
}
