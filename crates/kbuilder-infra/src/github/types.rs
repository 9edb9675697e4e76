//! GitHub REST API types.
//!
//! Wire shapes for the workflow-dispatch endpoint and the workflow-runs
//! listing. The input key names are fixed by the workflow file.

use serde::{Deserialize, Serialize};

use kbuilder_types::build::BuildConfiguration;

/// Body of `POST /repos/{owner}/{repo}/actions/workflows/{workflow}/dispatches`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowDispatchRequest {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub inputs: WorkflowInputs,
}

impl WorkflowDispatchRequest {
    pub fn new(git_ref: &str, config: &BuildConfiguration) -> Self {
        Self {
            git_ref: git_ref.to_string(),
            inputs: WorkflowInputs::from(config),
        }
    }
}

/// `inputs` object of a dispatch request.
///
/// Every key is always present; `notes` and `ksu` are empty strings when
/// unset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowInputs {
    pub compiler: String,
    pub krepo: String,
    pub kbranch: String,
    pub container: String,
    pub notes: String,
    pub ksu: String,
}

impl From<&BuildConfiguration> for WorkflowInputs {
    fn from(config: &BuildConfiguration) -> Self {
        Self {
            compiler: config.compiler.clone(),
            krepo: config.kernel_repository_url.clone(),
            kbranch: config.kernel_branch.clone(),
            container: config.container_image.clone(),
            notes: config.notes.clone(),
            ksu: config.kernel_su_mode.as_input().to_string(),
        }
    }
}

/// Error body GitHub returns with non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubErrorBody {
    pub message: String,
}

/// Response of `GET .../actions/workflows/{workflow}/runs`.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRunsResponse {
    #[serde(default)]
    pub workflow_runs: Vec<WorkflowRun>,
}

/// The subset of a workflow run we read.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    pub html_url: String,
}
