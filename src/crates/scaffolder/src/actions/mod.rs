//! Built-in template actions

pub mod bitbucket_cloud;
pub mod gitlab_group;

pub use bitbucket_cloud::{PublishBitbucketCloudAction, PublishBitbucketCloudInput};
pub use gitlab_group::{
    expand_group_path, GitlabGroupEnsureExistsAction, GitlabGroupEnsureExistsInput, PathItem, PathPart,
};
