use std::path::PathBuf;

use anyhow::{Result, bail};
use tracing::info;

use crate::cli::InventoryArgs;
use crate::config::PipelineConfig;
use crate::model::{ResultFileEntry, ResultInventoryManifest, WidthVariant};
use crate::results::{
    CORE_EVAL_TYPE, filter_with_patterns, find_eval_results_files, identifier_from_path,
};
use crate::util::{now_utc_string, sha256_file, write_json_pretty};

pub fn run(args: InventoryArgs) -> Result<()> {
    let config = PipelineConfig::load_or_default(args.config.as_deref())?;
    let manifest = build_manifest(&config)?;

    if let Some(manifest_path) = args.manifest_path {
        write_json_pretty(&manifest_path, &manifest)?;
        info!(path = %manifest_path.display(), "wrote result inventory manifest");
    }
    info!(file_count = manifest.file_count, "inventory completed");

    Ok(())
}

pub fn build_manifest(config: &PipelineConfig) -> Result<ResultInventoryManifest> {
    let mut eval_types: Vec<&str> = config.eval_types.iter().map(String::as_str).collect();
    if !eval_types.contains(&CORE_EVAL_TYPE) {
        eval_types.push(CORE_EVAL_TYPE);
    }

    let mut files = Vec::new();
    for eval_type in eval_types {
        let folders: Vec<PathBuf> = config
            .results_folders
            .iter()
            .map(|root| root.join(eval_type))
            .collect();
        let candidates = find_eval_results_files(&folders)?;

        for (width, patterns) in [
            (WidthVariant::Large, &config.large_patterns),
            (WidthVariant::Small, &config.small_patterns),
        ] {
            let matched = filter_with_patterns(&candidates, patterns)?;
            info!(
                eval_type = %eval_type,
                width = width.as_str(),
                files = matched.len(),
                "matched result files"
            );

            for path in matched {
                files.push(ResultFileEntry {
                    eval_type: eval_type.to_string(),
                    width,
                    identifier: identifier_from_path(&path)?,
                    sha256: sha256_file(&path)?,
                    path: path.display().to_string(),
                });
            }
        }
    }

    if files.is_empty() {
        bail!(
            "no result files matched under {}",
            config
                .results_folders
                .iter()
                .map(|folder| folder.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    files.sort_by(|a, b| {
        a.eval_type
            .cmp(&b.eval_type)
            .then(a.width.as_str().cmp(b.width.as_str()))
            .then(a.identifier.cmp(&b.identifier))
    });

    Ok(ResultInventoryManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        results_folders: config
            .results_folders
            .iter()
            .map(|folder| folder.display().to_string())
            .collect(),
        file_count: files.len(),
        files,
    })
}
