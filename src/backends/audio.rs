// SPDX-License-Identifier: MPL-2.0

//! Microphone discovery through PipeWire

use serde_json::Value;
use std::process::Command;
use tracing::{debug, warn};

/// An audio input node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Microphone {
    pub name: String,
    pub node_name: String,
    pub is_default: bool,
}

/// Run `pw-dump` and list its audio sources, default first
pub fn enumerate_microphones() -> Vec<Microphone> {
    let output = match Command::new("pw-dump").output() {
        Ok(output) if output.status.success() => output,
        Ok(output) => {
            warn!(status = %output.status, "pw-dump failed");
            return Vec::new();
        }
        Err(e) => {
            warn!(error = %e, "Failed to run pw-dump");
            return Vec::new();
        }
    };
    match serde_json::from_slice::<Vec<Value>>(&output.stdout) {
        Ok(nodes) => microphones_from_dump(&nodes),
        Err(e) => {
            warn!(error = %e, "Failed to parse pw-dump output");
            Vec::new()
        }
    }
}

/// Whether any audio source can be opened
pub fn microphone_available() -> bool {
    !enumerate_microphones().is_empty()
}

fn default_source(nodes: &[Value]) -> Option<String> {
    let metadata = nodes.iter().find(|node| {
        node["type"].as_str() == Some("PipeWire:Interface:Metadata")
            && node["props"]["metadata.name"].as_str() == Some("default")
    })?;
    metadata["metadata"]
        .as_array()?
        .iter()
        .find(|entry| {
            matches!(
                entry["key"].as_str(),
                Some("default.audio.source" | "default.configured.audio.source")
            )
        })
        .and_then(|entry| entry["value"]["name"].as_str())
        .map(str::to_string)
}

/// Extract audio sources from parsed `pw-dump` JSON
pub fn microphones_from_dump(nodes: &[Value]) -> Vec<Microphone> {
    let default = default_source(nodes);

    let mut microphones: Vec<Microphone> = nodes
        .iter()
        .map(|node| &node["info"]["props"])
        .filter(|props| props["media.class"].as_str() == Some("Audio/Source"))
        .map(|props| {
            let node_name = props["node.name"].as_str().unwrap_or_default().to_string();
            let name = ["node.nick", "node.description", "node.name"]
                .iter()
                .find_map(|key| props[*key].as_str())
                .unwrap_or("Unknown Audio Device")
                .to_string();
            let is_default = default.as_deref() == Some(node_name.as_str());
            debug!(%name, is_default, "Found microphone");
            Microphone {
                name,
                node_name,
                is_default,
            }
        })
        .collect();

    microphones.sort_by(|a, b| b.is_default.cmp(&a.is_default).then(a.name.cmp(&b.name)));
    microphones
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sources_are_listed_default_first() {
        let dump = json!([
            {
                "type": "PipeWire:Interface:Metadata",
                "props": { "metadata.name": "default" },
                "metadata": [
                    { "key": "default.audio.source", "value": { "name": "usb_mic" } }
                ]
            },
            { "info": { "props": { "media.class": "Audio/Source", "node.name": "builtin", "node.description": "Built-in" } } },
            { "info": { "props": { "media.class": "Audio/Sink", "node.name": "speakers" } } },
            { "info": { "props": { "media.class": "Audio/Source", "node.name": "usb_mic", "node.nick": "USB" } } }
        ]);
        let mics = microphones_from_dump(dump.as_array().unwrap());
        assert_eq!(mics.len(), 2);
        assert_eq!(mics[0].node_name, "usb_mic");
        assert!(mics[0].is_default);
        assert_eq!(mics[1].name, "Built-in");
    }

    #[test]
    fn empty_dump_has_no_microphone() {
        assert!(microphones_from_dump(&[]).is_empty());
    }
}
