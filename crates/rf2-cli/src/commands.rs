use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use rf2_build::{BuildContext, BuildOrchestrator, BuildQueue, Collaborators, DirectoryPublisher};
use rf2_config::{BuildConfiguration, load_build_configuration};
use rf2_ingest::{Rf2FileName, discover_inputs};
use tracing::{info, info_span};

use crate::cli::{BuildArgs, InspectArgs};
use crate::types::{BuildResult, InspectedFile};

pub fn run_build(args: &BuildArgs) -> Result<BuildResult> {
    let config = build_configuration(args)?;
    let span = info_span!(
        "release",
        product = %config.product,
        effective_time = %config.effective_time.as_str()
    );
    let _guard = span.enter();

    let input_dir = args
        .input_dir
        .clone()
        .unwrap_or_else(|| manifest_dir(&args.manifest));
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| input_dir.join("output"));
    let workspace = args
        .workspace
        .clone()
        .unwrap_or_else(|| output_dir.join("work"));

    let mut collaborators = Collaborators::local(&input_dir, &output_dir);
    if let Some(dir) = &args.publish_dir {
        collaborators = collaborators.with_publisher(Box::new(DirectoryPublisher::new(dir)));
    }
    let ctx = BuildContext::new(config, args.user.clone(), workspace)
        .allowing_validation_errors(args.allow_validation_errors)
        .with_table_workers(args.table_workers);
    info!(
        build_id = %ctx.build_id,
        input_dir = %input_dir.display(),
        output_dir = %output_dir.display(),
        "build submitted"
    );

    let mut queue = BuildQueue::new(BuildOrchestrator::new(collaborators), args.workers)?;
    let handle = queue.submit(ctx)?;
    let outcome = handle
        .wait()
        .map_err(|_| anyhow!("build worker stopped without reporting an outcome"))?;
    queue.shutdown();

    Ok(BuildResult {
        manifest: args.manifest.clone(),
        outcome,
    })
}

fn build_configuration(args: &BuildArgs) -> Result<BuildConfiguration> {
    let mut config = load_build_configuration(&args.manifest)
        .with_context(|| format!("load manifest {}", args.manifest.display()))?;
    if let Some(effective_time) = &args.effective_time {
        config = config.with_effective_time(effective_time)?;
    }
    if let Some(previous) = &args.previous_release {
        config.previous_release = Some(previous.clone());
        config.first_time_release = false;
    }
    Ok(config)
}

fn manifest_dir(manifest: &Path) -> PathBuf {
    manifest
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

pub fn run_inspect(args: &InspectArgs) -> Result<Vec<InspectedFile>> {
    let discovered = discover_inputs(&args.dir)
        .with_context(|| format!("inspect {}", args.dir.display()))?;
    let files = discovered
        .into_iter()
        .map(|file| {
            let kind = Rf2FileName::parse(&file.name)
                .ok()
                .and_then(|name| name.release_kind());
            InspectedFile {
                component: file.schema.as_ref().map(|schema| schema.component_type),
                id_type: file.schema.as_ref().map(|schema| schema.id_type()),
                columns: file.schema.as_ref().map_or(0, |schema| schema.columns.len()),
                kind,
                problem: file.problem,
                name: file.name,
            }
        })
        .collect();
    Ok(files)
}
