//! Data contracts shared by the roomcraft engine and CLI: catalogs, the
//! design session model, the session event log and chat command parsing.

pub mod catalog;
pub mod chat;
pub mod design;
pub mod events;
pub mod summary;
