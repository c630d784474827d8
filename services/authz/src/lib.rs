//! Role/permission resolution core
//!
//! Decides whether an actor holding exactly one role may run an operation
//! that declares the permission codes it requires.
//!
//! - [`catalog`]: the permission list and built-in role grants
//! - [`store`]: durable roles, permissions and links ([`store::RoleStore`])
//! - [`cache`]: TTL cache of resolved permission sets ([`cache::PermissionCache`])
//! - [`seeder`]: idempotent materialization of the catalog
//! - [`resolver`]: cache-aside resolution of a role's permission codes
//! - [`guard`]: the allow/deny decision
//! - [`service`]: the operations exposed to the surrounding application
//!
//! Every operation is a future; dropping it (for example through
//! `tokio::time::timeout`) cancels any pending store or cache call. Cache
//! calls are additionally bounded by `AUTHZ_CACHE_TIMEOUT_MS`.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use authz::{
//!     AuthzConfig, AuthzService, bootstrap,
//!     cache::MemoryPermissionCache,
//!     models::{Actor, OperationRequirement},
//!     store::MemoryRoleStore,
//! };
//!
//! # async fn run() -> authz::AuthzResult<()> {
//! let config = AuthzConfig::default();
//! let service = AuthzService::new(
//!     Arc::new(MemoryRoleStore::new()),
//!     Arc::new(MemoryPermissionCache::new()),
//!     &config,
//! );
//! bootstrap(&service, &config).await?;
//!
//! let actor = Actor::new(uuid::Uuid::new_v4(), "CONTRIBUTEUR");
//! let allowed = service
//!     .decide(&OperationRequirement::all_of(["tasks:read"]), Some(&actor))
//!     .await?;
//! assert!(allowed);
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod guard;
pub mod models;
pub mod resolver;
pub mod seeder;
pub mod service;
pub mod store;
pub mod validation;

pub use crate::bootstrap::bootstrap;
pub use crate::config::AuthzConfig;
pub use crate::error::{AuthzError, AuthzResult};
pub use crate::service::AuthzService;
