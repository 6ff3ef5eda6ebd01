//! JSON envelope for `--format json`.
//!
//! Every machine-readable result goes out wrapped in the same envelope so
//! scripts can check `ok` before looking at `data`.

use crate::error::Result;
use chrono::Utc;
use serde::Serialize;

pub const CONTRACT_VERSION: &str = "v1";

#[derive(Debug, Serialize)]
pub struct MachineEnvelope<T>
where
    T: Serialize,
{
    pub version: String,
    pub command: String,
    pub ok: bool,
    pub data: T,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub meta: MachineMeta,
}

#[derive(Debug, Serialize)]
pub struct MachineMeta {
    pub generated_at: String,
}

impl<T: Serialize> MachineEnvelope<T> {
    pub fn new(command: &str, data: T, errors: Vec<String>) -> Self {
        Self {
            version: CONTRACT_VERSION.to_string(),
            command: command.to_string(),
            ok: errors.is_empty(),
            data,
            warnings: Vec::new(),
            errors,
            meta: MachineMeta {
                generated_at: Utc::now().to_rfc3339(),
            },
        }
    }
}

/// Print `data` as a pretty JSON envelope on stdout.
pub fn emit_json<T>(command: &str, data: T, errors: Vec<String>) -> Result<()>
where
    T: Serialize,
{
    let envelope = MachineEnvelope::new(command, data, errors);
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

/// One JSON object per line, for streamed progress events.
pub fn emit_json_line<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
