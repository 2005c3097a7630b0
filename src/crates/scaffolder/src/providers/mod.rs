//! Provider API clients used by the actions

pub mod bitbucket_cloud;
pub mod gitlab;

pub use bitbucket_cloud::{
    bitbucket_authorization_header, BitbucketCloudClient, BitbucketCredentials, CreateRepositoryRequest,
    CreatedRepository, RepoVisibility,
};
pub use gitlab::{GitlabAuth, GitlabClient, GroupSchema};
