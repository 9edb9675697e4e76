use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// The set of kernel build parameters collected by the wizard.
///
/// Required fields must be non-empty before the configuration can be
/// dispatched. Optional fields always carry a value (empty notes, `KsuMode::None`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfiguration {
    /// Toolchain used for the build (e.g., "Geopelia-Clang-20").
    pub compiler: String,
    /// Git URL of the kernel source tree.
    pub kernel_repository_url: String,
    /// Branch of the kernel source tree to build.
    pub kernel_branch: String,
    /// Container image the build runs in (e.g., "fedora:40").
    pub container_image: String,
    /// Free-form notes attached to the build.
    #[serde(default)]
    pub notes: String,
    /// KernelSU patch set applied during the build.
    #[serde(default)]
    pub kernel_su_mode: KsuMode,
}

impl BuildConfiguration {
    /// Names of required fields that are still empty.
    pub fn missing_fields(&self) -> Vec<BuildField> {
        BuildField::REQUIRED
            .iter()
            .copied()
            .filter(|field| self.value_of(*field).trim().is_empty())
            .collect()
    }

    /// Current value of a field, rendered as text.
    pub fn value_of(&self, field: BuildField) -> &str {
        match field {
            BuildField::Compiler => &self.compiler,
            BuildField::KernelRepositoryUrl => &self.kernel_repository_url,
            BuildField::KernelBranch => &self.kernel_branch,
            BuildField::ContainerImage => &self.container_image,
            BuildField::Notes => &self.notes,
            BuildField::KsuMode => self.kernel_su_mode.as_input(),
        }
    }
}

/// Identifies one field of a [`BuildConfiguration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildField {
    Compiler,
    KernelRepositoryUrl,
    KernelBranch,
    ContainerImage,
    Notes,
    KsuMode,
}

impl BuildField {
    /// Fields that must be non-empty for dispatch.
    pub const REQUIRED: [BuildField; 4] = [
        BuildField::Compiler,
        BuildField::KernelRepositoryUrl,
        BuildField::KernelBranch,
        BuildField::ContainerImage,
    ];

    /// Human-readable label used in prompts and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            BuildField::Compiler => "Compiler",
            BuildField::KernelRepositoryUrl => "Kernel Repository",
            BuildField::KernelBranch => "Kernel Branch",
            BuildField::ContainerImage => "Container Image",
            BuildField::Notes => "Notes",
            BuildField::KsuMode => "KernelSU",
        }
    }
}

impl fmt::Display for BuildField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// KernelSU patching mode passed through to the workflow.
///
/// - None: no KernelSU patching
/// - Both: build once without and once with KernelSU
/// - Sus: KernelSU plus SuSFS patches
/// - Ksu: KernelSU patches only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KsuMode {
    #[default]
    None,
    Both,
    Sus,
    Ksu,
}

impl KsuMode {
    /// Value sent as the `ksu` workflow input. `None` maps to an empty string.
    pub fn as_input(&self) -> &'static str {
        match self {
            KsuMode::None => "",
            KsuMode::Both => "both",
            KsuMode::Sus => "sus",
            KsuMode::Ksu => "ksu",
        }
    }

    /// Short description shown next to each choice.
    pub fn description(&self) -> &'static str {
        match self {
            KsuMode::None => "No KernelSU patching",
            KsuMode::Both => "Build without and with KernelSU",
            KsuMode::Sus => "Apply KernelSU and SuSFS patches",
            KsuMode::Ksu => "Apply only KernelSU patches",
        }
    }
}

impl fmt::Display for KsuMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KsuMode::None => write!(f, "none"),
            other => write!(f, "{}", other.as_input()),
        }
    }
}

impl FromStr for KsuMode {
    type Err = String;

    /// Parses a user choice. `skip` (and `none`) select [`KsuMode::None`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "both" => Ok(KsuMode::Both),
            "sus" => Ok(KsuMode::Sus),
            "ksu" => Ok(KsuMode::Ksu),
            "skip" | "none" => Ok(KsuMode::None),
            other => Err(format!("invalid KernelSU mode: '{other}'")),
        }
    }
}
