// Copyright (c) 2024 Mike Tsao

//! Build identification for logs and `--version` output.

/// The crate version, or a version-control identifier if the build set one
/// in `GIT_DESCRIBE` or `GIT_REV_PARSE`.
pub fn app_version() -> &'static str {
    option_env!("GIT_DESCRIBE")
        .or(option_env!("GIT_REV_PARSE"))
        .unwrap_or(env!("CARGO_PKG_VERSION"))
}
