mod chart;
mod load;
mod run;
#[cfg(test)]
mod tests;

pub use chart::{build_chart, image_name};
pub use load::{WidthResults, load_width_results};
pub use run::{RunOptions, run, run_pipeline};
