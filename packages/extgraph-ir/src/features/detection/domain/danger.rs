//! Vulnerability records.

use serde::{Deserialize, Serialize};

use crate::features::data_flow::domain::flow::FlowStep;

/// Vulnerability class of one emitted pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DangerClass {
    /// Privileged API result exfiltrated to an unguarded listener.
    PrivilegedApiExfiltration,
    /// Attacker payload reaching a privileged API call.
    PrivilegedApiInfiltration,
    /// Attacker payload written to storage or injected into the DOM.
    SensitiveDataWrite,
    /// Extension storage read exfiltrated to an unguarded listener.
    SensitiveDataRead,
}

impl DangerClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DangerClass::PrivilegedApiExfiltration | DangerClass::PrivilegedApiInfiltration => {
                "4.1"
            }
            DangerClass::SensitiveDataWrite => "4.2",
            DangerClass::SensitiveDataRead => "4.3",
        }
    }

    /// Exfiltration pairs read data out; infiltration pairs push attacker
    /// data in.
    pub fn is_exfiltration(&self) -> bool {
        matches!(
            self,
            DangerClass::PrivilegedApiExfiltration | DangerClass::SensitiveDataRead
        )
    }
}

impl Serialize for DangerClass {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DangerClass {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        match text.as_str() {
            "4.1" => Ok(DangerClass::PrivilegedApiExfiltration),
            "4.2" => Ok(DangerClass::SensitiveDataWrite),
            "4.3" => Ok(DangerClass::SensitiveDataRead),
            other => Err(serde::de::Error::custom(format!(
                "unknown danger class {other}"
            ))),
        }
    }
}

/// The shared expression where a source flow's tail and a sink flow's
/// tail coincide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendezvous {
    #[serde(rename = "type")]
    pub node_type: String,
    pub location: String,
    pub filename: String,
    pub line_of_code: String,
}

/// One emitted source/sink pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Danger {
    pub from_flow: Vec<FlowStep>,
    pub to_flow: Vec<FlowStep>,
    pub rendezvous: Rendezvous,
    /// `k/N` within the file, ordered by sink then source position.
    pub data_flow_number: String,
    pub class: DangerClass,
    /// True when a depth or edge bound cut one of the flows short.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

/// An unguarded message listener with no sensitive API interaction,
/// reported only when opted in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerViolation {
    pub listener: String,
    pub location: String,
    pub filename: String,
    pub line_of_code: String,
}

/// One `chrome.storage.<area>.<op>` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageAccess {
    pub method: String,
    pub location: String,
    pub line_of_code: String,
}

/// Everything the detector reports for one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileDangers {
    pub exfiltration_dangers: Vec<Danger>,
    pub infiltration_dangers: Vec<Danger>,
    pub listener_violations: Vec<ListenerViolation>,
    /// Keyed by storage area (`local`, `sync`, `session`, `managed`).
    pub storage_accesses: std::collections::BTreeMap<String, Vec<StorageAccess>>,
}

impl FileDangers {
    pub fn danger_count(&self) -> usize {
        self.exfiltration_dangers.len() + self.infiltration_dangers.len()
    }
}
