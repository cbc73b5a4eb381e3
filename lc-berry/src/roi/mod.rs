//! ROI 构建: 球形掩膜, 概率图谱二值化, 参考区域解析.

mod reference;
mod sphere;
mod threshold;

pub use reference::{load_or_create_reference_roi, ReferenceResolver, ReferenceSource};
pub use sphere::{pontine_reference_mask, sphere_mask, SphereGenerator};
pub use threshold::{binarize, threshold_atlas};

#[cfg(feature = "rayon")]
pub use threshold::par_threshold_atlas;
