// Library exports for sheetplot

pub mod data;
pub mod parser;
pub mod palette;

// Pipeline phases
pub mod header;
pub mod sanitize;
pub mod series;
pub mod stats;
pub mod ir;
pub mod scale;
pub mod compiler;

// Incremental updates and render surfaces
pub mod reconcile;
pub mod session;
pub mod surface;
pub mod graph;

pub mod layout;
pub mod config;
pub mod logging;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[serde(rename = "png")]
    #[default]
    Png,
    #[serde(rename = "svg")]
    Svg,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderOptions {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default, rename = "type")]
    pub format: OutputFormat,
}

fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            format: OutputFormat::Png,
        }
    }
}
