//! GitHub API service implementations.

mod code_scanning;
mod default_setup;
mod git_data;
mod graphql;
mod repo_security;

pub use code_scanning::*;
pub use default_setup::*;
pub use git_data::*;
pub use graphql::*;
pub use repo_security::*;
