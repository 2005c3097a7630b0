//! HTTP and app-config helpers shared by the scaffolder crates.
//!
//! The `client` feature provides [`HttpClient`], a `reqwest` wrapper that
//! resends idempotent requests on transient failures and never resends a
//! POST. Provider clients build requests through it:
//!
//! ```rust,ignore
//! let http = HttpClient::new(ClientConfig::new().with_user_agent("scaffolder"))?;
//! let groups = http.get("https://gitlab.com/api/v4/groups?search=platform").await?;
//! ```
//!
//! The `config` feature provides [`AppConfig`], which loads a YAML or JSON
//! app-config, substitutes `${VAR}` placeholders and answers dotted-path
//! lookups such as `scaffolder.defaultAuthor.name`.
//!
//! Both features are on by default.

pub mod error;

#[cfg(feature = "client")]
pub mod client;

#[cfg(feature = "config")]
pub mod config;

pub use error::{Result, UtilsError};

#[cfg(feature = "client")]
pub use client::{is_idempotent, AuthHelper, ClientConfig, HttpClient, RetryPolicy};

#[cfg(feature = "config")]
pub use config::{
    get_env, get_env_bool_or, get_env_or, load_config_file, AppConfig, ConfigFormat,
};
