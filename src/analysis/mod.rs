//! Observables from harmonic images: intensities, dark field and phase.
pub mod engine;
pub mod unwrap;

pub use engine::{analyze, remove_pi_bias, AnalysisMode, ObservableSet};
pub use unwrap::{unwrap_phase, unwrap_phase_seeded};
