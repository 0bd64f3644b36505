//! Message protocol for running a slice job on behalf of a front end.
//!
//! A [`JobRequest::Start`] produces a stream of [`JobMessage::Progress`]
//! messages followed by exactly one terminal [`JobMessage::Done`] or
//! [`JobMessage::Error`].

use common::config::{SliceConfig, SliceMode};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::{ErrorKind, Result, SliceError},
    mesh::{Mesh, MeshData},
    slice::SliceSet,
    slicer::{SliceStatus, Slicer},
    task::TaskManager,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JobRequest {
    Start {
        #[serde(default)]
        config: JobConfig,
        models: Vec<MeshData>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum JobMessage {
    Progress(ProgressData),
    Done(DoneData),
    Error(ErrorData),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobConfig {
    pub layer_height: f32,
    pub mode: SliceMode,
    pub exposure_time: f32,
    pub bottom_layers: u32,
    pub bottom_exposure: f32,
    pub resin_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressData {
    /// Percent, `0..=100`.
    pub progress: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoneData {
    pub total_layers: u32,
    // Print time and resin estimates aren't computed, the fields are kept
    // so consumers of the protocol can rely on their names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resin_usage: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorData {
    pub kind: ErrorKind,
    pub message: String,
}

impl JobMessage {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }
}

impl From<&SliceError> for JobMessage {
    fn from(err: &SliceError) -> Self {
        Self::Error(ErrorData {
            kind: err.kind(),
            message: err.to_string(),
        })
    }
}

impl From<&SliceConfig> for JobConfig {
    fn from(config: &SliceConfig) -> Self {
        Self {
            layer_height: config.layer_height,
            mode: config.mode,
            exposure_time: config.exposure_time,
            bottom_layers: config.bottom_layers,
            bottom_exposure: config.bottom_exposure,
            resin_type: config.resin_type.clone(),
        }
    }
}

impl Default for JobConfig {
    fn default() -> Self {
        Self::from(&SliceConfig::default())
    }
}

/// Runs a job to completion, ticking the slicer one layer at a time and
/// reporting through `sink`. Every model is placed in the world and sliced
/// together.
pub fn run_job(slicer: &Slicer, request: JobRequest, mut sink: impl FnMut(JobMessage)) -> Result<SliceSet> {
    let result = start_job(slicer, request, &mut sink);
    if let Err(err) = &result {
        warn!("Slice job failed: {err}");
        sink(JobMessage::from(err));
    }

    result
}

fn start_job(slicer: &Slicer, request: JobRequest, sink: &mut impl FnMut(JobMessage)) -> Result<SliceSet> {
    let JobRequest::Start { config, models } = request;
    if models.is_empty() {
        return Err(SliceError::invalid_parameter("no models loaded to slice"));
    }

    let meshes = models
        .into_iter()
        .map(MeshData::into_mesh)
        .collect::<Result<Vec<_>>>()?;
    info!(
        "Starting slice job for {} models ({} resin)",
        meshes.len(),
        config.resin_type
    );

    let task = slicer.slice_model(&Mesh::merge(&meshes)?, config.layer_height, config.mode)?;
    let mut tasks = TaskManager::default();
    tasks.add(task);

    while !tasks.is_empty() {
        tasks.tick();

        let state = slicer.progress();
        if state.status == SliceStatus::Running {
            sink(JobMessage::Progress(ProgressData {
                progress: state.progress() * 100.0,
            }));
        }
    }

    let state = slicer.progress();
    if state.status != SliceStatus::Done {
        return Err(SliceError::Superseded);
    }

    sink(JobMessage::Done(DoneData {
        total_layers: state.total_layers,
        print_time: None,
        resin_usage: None,
    }));
    Ok(slicer.slices())
}
