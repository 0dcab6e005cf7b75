mod config_cmd;
mod doc;
mod import;
mod watch;

pub use config_cmd::ConfigCommand;
pub use doc::{AddCommand, GetCommand, ListCommand, RemoveCommand, SetCommand};
pub use import::ImportCommand;
pub use watch::WatchCommand;

use docket_core::Document;

/// Parses a `--data` argument into a document. Only JSON objects are
/// accepted; arrays and scalars are not documents.
pub fn parse_document(data: &str) -> Result<Document, Box<dyn std::error::Error>> {
    let value: serde_json::Value = serde_json::from_str(data)?;
    match value {
        serde_json::Value::Object(document) => Ok(document),
        _ => Err("document payload must be a JSON object".into()),
    }
}
