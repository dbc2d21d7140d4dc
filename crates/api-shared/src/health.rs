use crate::dto::HealthRes;

/// Simple health service shared by the REST API and the CLI
///
/// This service provides a standardised way to check the health status of the PRS system.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    /// Static method to check health without creating an instance
    ///
    /// # Returns
    /// A `HealthRes` indicating the service is healthy and whether summaries are available.
    pub fn check_health(summaries_enabled: bool) -> HealthRes {
        HealthRes {
            ok: true,
            message: "PRS is alive".into(),
            summaries_enabled,
        }
    }
}
