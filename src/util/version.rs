pub const APP_NAME: &str = "BidGuard";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_TAG: Option<&str> = option_env!("GIT_TAG");
pub const GIT_SHA: Option<&str> = option_env!("GIT_SHA");

/// Release tag when built from a tagged checkout, otherwise the crate version.
pub fn version_label() -> String {
    if let Some(tag) = GIT_TAG {
        tag.to_string()
    } else {
        format!("v{}", APP_VERSION)
    }
}

/// Version label plus the commit it was built from, when known.
pub fn build_label() -> String {
    match GIT_SHA {
        Some(sha) => format!("{} ({sha})", version_label()),
        None => version_label(),
    }
}

pub fn user_agent() -> String {
    format!("bidguard/{}", version_label().trim_start_matches(|ch: char| ch == 'v' || ch == 'V'))
}
