//! Vulnerability detection: API profile tables, message-surface
//! discovery, sender-guard gating, and source/sink pairing.

pub mod domain;
pub mod infrastructure;

pub use domain::{Danger, DangerClass, FileDangers, ListenerViolation, Rendezvous, StorageAccess};
pub use infrastructure::{
    find_listeners, ApiProfiles, Detector, ListenerKind, MessageListener, SinkCategory,
    SourceCategory,
};
