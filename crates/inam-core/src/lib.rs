//! Core of the `inam` Phabricator client: conduit gateway, name resolution, task
//! dependency trees and templated bulk task creation.

pub mod bulk;
pub mod conduit;
pub mod config;
pub mod entities;
pub mod error;
pub mod list;
pub mod recipients;
pub mod resolve;
pub mod template;
pub mod tree;
