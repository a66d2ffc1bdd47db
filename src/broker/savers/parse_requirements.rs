//! parse-requirements → tasks-import saver.
//!
//! Parses `finalLLMOutput` as either `{ tasks, metadata }` or a JSON string
//! containing the same shape, writes the whole collection for the tag, then
//! regenerates one derived file per imported task.

use super::SaverInput;
use crate::broker::error::BrokerError;
use crate::broker::store::derived_files;
use crate::broker::types::TaskCollection;

pub async fn save(input: SaverInput) -> Result<(), BrokerError> {
    let collection = parse_payload(&input.resolved.main_result)?;
    let tag = input.tag();
    let tasks = collection.tasks.clone();
    input
        .store
        .mutate_tag(&tag, move |slot| {
            *slot = collection;
            Ok(())
        })
        .await?;
    derived_files::regenerate(&input.store, &tag, &input.default_tag, &tasks).await
}

fn parse_payload(value: &serde_json::Value) -> Result<TaskCollection, BrokerError> {
    if let Some(text) = value.as_str() {
        return serde_json::from_str(text)
            .map_err(|e| BrokerError::PayloadShape(format!("malformed tasks JSON string: {e}")));
    }
    serde_json::from_value(value.clone())
        .map_err(|e| BrokerError::PayloadShape(format!("malformed tasks object: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_object_shape() {
        let value = serde_json::json!({"tasks": [], "metadata": {}});
        assert!(parse_payload(&value).is_ok());
    }

    #[test]
    fn accepts_string_shape() {
        let value = serde_json::json!("{\"tasks\": [], \"metadata\": {}}");
        assert!(parse_payload(&value).is_ok());
    }

    #[test]
    fn rejects_garbage() {
        let value = serde_json::json!(42);
        assert!(parse_payload(&value).is_err());
    }
}
