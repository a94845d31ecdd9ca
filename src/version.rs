//! Helpers for reporting the compiled version of the library, both to calling applications and
//! in the user agent sent along with every request to a node.

/// Reports the full version and the build settings as a semi-structured string.
pub fn full_version() -> String {
    format!(
        "build-profile={} build-timestamp={} features={} repo-version={}",
        env!("BUILD_PROFILE"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_FEATURES"),
        env!("REPO_VERSION"),
    )
}

/// Only the core version information from the build, used where space is limited.
pub fn minimal_version() -> String {
    format!("repo-version={}", env!("REPO_VERSION"))
}

/// The user agent presented by the JSON-RPC client.
pub fn user_agent() -> String {
    format!("chainconsent/{}", minimal_version())
}
