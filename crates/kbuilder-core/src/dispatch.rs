//! DispatchClient trait definition.
//!
//! The port the wizard uses to trigger the CI workflow. Implementations live
//! in kbuilder-infra (e.g., `GithubDispatchClient`).

use kbuilder_types::build::BuildConfiguration;
use kbuilder_types::dispatch::TrackingRef;
use kbuilder_types::error::DispatchError;

/// Trait for CI workflow trigger backends.
///
/// Uses native async fn in traits (RPITIT) consistent with all async traits
/// in this project.
///
/// Implementations must not retry: one call is one trigger attempt, and a
/// duplicate build is worse than a failed one.
pub trait DispatchClient: Send + Sync {
    /// Trigger one workflow run for `config`.
    ///
    /// Returns a link the user can follow to watch the run.
    fn dispatch(
        &self,
        config: &BuildConfiguration,
    ) -> impl std::future::Future<Output = Result<TrackingRef, DispatchError>> + Send;
}
