pub mod danger;

pub use danger::{
    Danger, DangerClass, FileDangers, ListenerViolation, Rendezvous, StorageAccess,
};
