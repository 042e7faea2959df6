//! pordisto is an authentication and access control service: it verifies
//! credentials against a relational store, issues and validates signed
//! bearer tokens, enforces role-based access on protected routes,
//! rate-limits authentication attempts per client, and emits correlated
//! metrics and traces for every security-relevant action.

pub mod api;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
