use serde_json::{Value, json};

use crate::model::AtlasMetadata;

/// Array style: `{ frames: [ { filename, frame, rotated, trimmed, padding, sourceSize } ], metadata }`.
pub fn to_json(meta: &AtlasMetadata) -> Value {
    let frames: Vec<Value> = meta
        .frames
        .iter()
        .map(|fr| {
            json!({
                "filename": fr.filename,
                "frame": fr.frame,
                "rotated": fr.rotated,
                "trimmed": fr.trimmed,
                "padding": fr.padding,
                "sourceSize": fr.source_size,
            })
        })
        .collect();
    json!({ "frames": frames, "metadata": meta.metadata })
}

/// Hash style: frames keyed by file name.
/// Shape: `{ frames: { name: { frame, rotated, trimmed, padding, sourceSize } }, metadata }`.
/// Later sprites win when two sources share a file name.
pub fn to_json_hash(meta: &AtlasMetadata) -> Value {
    let mut frames = serde_json::Map::new();
    for fr in &meta.frames {
        frames.insert(
            fr.filename.clone(),
            json!({
                "frame": fr.frame,
                "rotated": fr.rotated,
                "trimmed": fr.trimmed,
                "padding": fr.padding,
                "sourceSize": fr.source_size,
            }),
        );
    }
    json!({ "frames": frames, "metadata": meta.metadata })
}
