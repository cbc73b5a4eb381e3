//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx3d, Idx3dI, Point3d};

pub use crate::{resample_nearest, Affine, NiftiHeaderAttr, Volume};

pub use crate::{ConfigBuilder, PipelineConfig};
pub use crate::{RoiError, RoiResult};

pub use crate::consts::{DEFAULT_CONTRASTS, DEFAULT_LC_THRESHOLD, LC_EXCLUSION_CUTOFF};

pub use crate::dataset::{self, list_processed_subjects, NiftiStore, VolumeStore};

pub use crate::roi::{
    binarize, load_or_create_reference_roi, pontine_reference_mask, sphere_mask,
    threshold_atlas, ReferenceResolver, ReferenceSource, SphereGenerator,
};

#[cfg(feature = "rayon")]
pub use crate::roi::par_threshold_atlas;

pub use crate::stats::{
    compute_cnr, extract_roi_stats, extract_subject_cnr, CnrResult, RegionStats, SubjectCnr,
};
