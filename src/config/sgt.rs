use super::load_json;
use crate::analyzer::TalbotParams;
use crate::error::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Deserialize)]
pub struct InputConfig {
    pub sample: PathBuf,
    #[serde(default)]
    pub reference: Option<PathBuf>,
    /// Dark frame subtracted from sample and reference.
    #[serde(default)]
    pub dark: Option<PathBuf>,
    /// Without a dark frame, the mean of this top-left corner of the sample
    /// is subtracted from sample and reference instead.
    #[serde(default = "default_dark_corner")]
    pub dark_corner: usize,
}

fn default_dark_corner() -> usize {
    100
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub json_out: Option<PathBuf>,
    /// Quick-look PNGs of the result maps.
    pub image_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SgtConfig {
    pub input: InputConfig,
    /// `[row_start, row_end, col_start, col_end]` on the full frame.
    #[serde(default)]
    pub crop: Option<[usize; 4]>,
    #[serde(default)]
    pub params: TalbotParams,
    #[serde(default)]
    pub output: OutputConfig,
}

pub fn load_config(path: &Path) -> Result<SgtConfig> {
    load_json(path)
}
