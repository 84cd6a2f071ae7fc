// Version information for the Image Similarity Node

/// Full version string with feature description
pub const VERSION: &str = "v1.0.0-resnet50-gmp-2026-10-17";

/// Semantic version number
pub const VERSION_NUMBER: &str = "1.0.0";

/// Major version number
pub const VERSION_MAJOR: u32 = 1;

/// Minor version number
pub const VERSION_MINOR: u32 = 0;

/// Patch version number
pub const VERSION_PATCH: u32 = 0;

/// Build date
pub const BUILD_DATE: &str = "2026-10-17";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "find-similar",
    "resnet50-global-max-pool",
    "brute-force-knn",
    "npy-catalog",
    "hf-hub-artifacts",
    "jpeg-q100-results",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Image Similarity Node {} ({})", VERSION_NUMBER, BUILD_DATE)
}
