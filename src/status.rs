/// manager status structs
///
use serde::{Deserialize, Serialize};

pub type JsonString = String;

pub const OK: &str = "ok";
pub const DOWN: &str = "down";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManagerState {
    #[default]
    Ready,
    Stopped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerStatus {
    pub name: String,
    pub status: String,
    pub state: ManagerState,
    pub uptime: String,
    pub process_count: usize,
}

impl ManagerStatus {
    pub fn new(
        name: String,
        status: String,
        state: ManagerState,
        uptime: String,
        process_count: usize,
    ) -> ManagerStatus {
        ManagerStatus {
            name,
            status,
            state,
            uptime,
            process_count,
        }
    }

    pub fn to_json(&self) -> JsonString {
        match serde_json::to_string(self) {
            Ok(js) => js,
            Err(e) => {
                format!(r#"{}"status":"json parse error: {:?}"{}"#, "{", e, "}")
            }
        }
    }
}
