pub mod client;
pub mod link_header;
pub mod types;

pub use client::GitHubClient;
pub use link_header::LinkHeader;
pub use types::{RawReleasesResponse, ReleaseEntry};
