//! Curve fits: linear trends, wavefront curvature and coherence.
pub mod curvature;
pub mod linear;
pub mod lm;
pub mod visibility;

pub use curvature::{fit_curvature, CurvatureFit};
pub use linear::{fit_pattern_period, polyfit1, LinearFit, PatternPeriodFit};
pub use lm::{optimize, LmConfig, LmModel, LmResult};
pub use visibility::{
    fit_visibility, VisibilityFit, VisibilityFitParams, VisibilityModel, VisibilityParams,
};
