//! Wire types for the simulation API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use simfleet_core::Player;

/// Which injection endpoint to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectKind {
    Component,
    System,
}

impl InjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InjectKind::Component => "component",
            InjectKind::System => "system",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackAction {
    Start,
    Pause,
    Stop,
}

impl PlaybackAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackAction::Start => "start",
            PlaybackAction::Pause => "pause",
            PlaybackAction::Stop => "stop",
        }
    }
}

/// Body returned by the injection endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub system_id: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl InjectResponse {
    pub fn is_error(&self) -> bool {
        self.status.as_deref() == Some("error")
    }
}

/// State of one player as reported by `GET /status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatus {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub tick: Option<Value>,
    #[serde(default)]
    pub system_count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    #[serde(default)]
    pub simulation: PlayerStatus,
    #[serde(default)]
    pub evaluation: PlayerStatus,
}

impl StatusReport {
    pub fn player(&self, player: Player) -> &PlayerStatus {
        match player {
            Player::Simulation => &self.simulation,
            Player::Evaluation => &self.evaluation,
        }
    }
}
