//! Liveness endpoint.

/// Static body returned by the liveness check.
pub const HEALTH_MESSAGE: &str = "Marhaba backend is running";

/// Public liveness check.
///
/// Checks nothing downstream: it answers 200 whenever the process is serving.
/// Use this for load balancer health checks.
pub async fn health_check() -> &'static str {
    HEALTH_MESSAGE
}
