//! Stream message classification and frame filtering.

use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// One tick's entity/component snapshot.
    Frame,
    /// Acknowledgement of a control message.
    Ack,
    Other,
}

/// A frame has an integer `tick` and an `entities` object. An ack has a
/// string `status` of `success` or `error`.
pub fn classify(message: &Value) -> MessageKind {
    let Some(obj) = message.as_object() else {
        return MessageKind::Other;
    };
    let has_tick = obj
        .get("tick")
        .is_some_and(|t| t.is_i64() || t.is_u64());
    if has_tick && obj.get("entities").is_some_and(Value::is_object) {
        return MessageKind::Frame;
    }
    match obj.get("status").and_then(Value::as_str) {
        Some("success" | "error") => MessageKind::Ack,
        _ => MessageKind::Other,
    }
}

/// Component filter for frames, optionally narrowed to one entity.
///
/// The entity narrows only alongside a component; on its own it is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameFilter {
    pub component: Option<String>,
    pub entity: Option<String>,
}

impl FrameFilter {
    /// Whether frames pass through unchanged.
    pub fn is_empty(&self) -> bool {
        self.component.is_none()
    }

    /// Apply the filter to a frame.
    ///
    /// Each kept entity is reduced to the filtered component. Returns `None`
    /// when no entity survives.
    pub fn apply(&self, frame: &Value) -> Option<Value> {
        let Some(component) = &self.component else {
            return Some(frame.clone());
        };
        let entities = frame.get("entities")?.as_object()?;
        let mut kept = Map::new();
        for (entity_id, components) in entities {
            if self.entity.as_deref().is_some_and(|e| e != entity_id) {
                continue;
            }
            let Some(value) = components.as_object().and_then(|c| c.get(component)) else {
                continue;
            };
            let mut only = Map::new();
            only.insert(component.clone(), value.clone());
            kept.insert(entity_id.clone(), Value::Object(only));
        }
        if kept.is_empty() {
            return None;
        }
        let mut filtered = frame.clone();
        filtered["entities"] = Value::Object(kept);
        Some(filtered)
    }
}
