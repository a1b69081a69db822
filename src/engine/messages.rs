use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::domain::SessionId;
use crate::error::{EngineError, TransportError};
use crate::media::{MediaState, SessionEvent};

pub const MEDIA_STATE: i64 = 1;
pub const MEDIA_DURATION: i64 = 2;
pub const MEDIA_POSITION: i64 = 3;
pub const MEDIA_ERROR: i64 = 9;

/// Playback options forwarded verbatim with `startPlayingAudio`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_loops: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub play_audio_when_screen_is_locked: Option<bool>,
}

/// Device-affecting commands the controller issues to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    Create { source: String },
    StartPlaying { source: String, options: PlayOptions },
    PausePlaying,
    StopPlaying,
    SeekTo { ms: u64 },
    GetCurrentPosition,
    SetVolume { gain: f64 },
    SetRate { rate: f64 },
    Release,
    StartRecording { target: String },
    StopRecording,
    PauseRecording,
    ResumeRecording,
    GetCurrentAmplitude,
}

/// Command kind echoed back in replies, so an acknowledgement can be
/// interpreted without remembering the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineAction {
    Create,
    StartPlayingAudio,
    PausePlayingAudio,
    StopPlayingAudio,
    SeekToAudio,
    GetCurrentPositionAudio,
    SetVolume,
    SetRate,
    Release,
    StartRecordingAudio,
    StopRecordingAudio,
    PauseRecordingAudio,
    ResumeRecordingAudio,
    GetCurrentAmplitudeAudio,
}

impl EngineAction {
    pub fn name(self) -> &'static str {
        match self {
            EngineAction::Create => "create",
            EngineAction::StartPlayingAudio => "startPlayingAudio",
            EngineAction::PausePlayingAudio => "pausePlayingAudio",
            EngineAction::StopPlayingAudio => "stopPlayingAudio",
            EngineAction::SeekToAudio => "seekToAudio",
            EngineAction::GetCurrentPositionAudio => "getCurrentPositionAudio",
            EngineAction::SetVolume => "setVolume",
            EngineAction::SetRate => "setRate",
            EngineAction::Release => "release",
            EngineAction::StartRecordingAudio => "startRecordingAudio",
            EngineAction::StopRecordingAudio => "stopRecordingAudio",
            EngineAction::PauseRecordingAudio => "pauseRecordingAudio",
            EngineAction::ResumeRecordingAudio => "resumeRecordingAudio",
            EngineAction::GetCurrentAmplitudeAudio => "getCurrentAmplitudeAudio",
        }
    }
}

impl EngineCommand {
    pub fn action(&self) -> EngineAction {
        match self {
            EngineCommand::Create { .. } => EngineAction::Create,
            EngineCommand::StartPlaying { .. } => EngineAction::StartPlayingAudio,
            EngineCommand::PausePlaying => EngineAction::PausePlayingAudio,
            EngineCommand::StopPlaying => EngineAction::StopPlayingAudio,
            EngineCommand::SeekTo { .. } => EngineAction::SeekToAudio,
            EngineCommand::GetCurrentPosition => EngineAction::GetCurrentPositionAudio,
            EngineCommand::SetVolume { .. } => EngineAction::SetVolume,
            EngineCommand::SetRate { .. } => EngineAction::SetRate,
            EngineCommand::Release => EngineAction::Release,
            EngineCommand::StartRecording { .. } => EngineAction::StartRecordingAudio,
            EngineCommand::StopRecording => EngineAction::StopRecordingAudio,
            EngineCommand::PauseRecording => EngineAction::PauseRecordingAudio,
            EngineCommand::ResumeRecording => EngineAction::ResumeRecordingAudio,
            EngineCommand::GetCurrentAmplitude => EngineAction::GetCurrentAmplitudeAudio,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineRequest {
    pub req_id: u64,
    pub id: SessionId,
    pub cmd: EngineCommand,
}

/// Everything the engine sends back to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineMessage {
    /// Raw JSON from the engine's message channel.
    Channel(String),
    /// Acknowledgement of one request; `Some` carries a numeric result
    /// (position, amplitude).
    Reply {
        req_id: u64,
        id: SessionId,
        action: EngineAction,
        result: Result<Option<f64>, EngineError>,
    },
}

/// A decoded `status` message from the channel, not yet interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessage {
    pub id: SessionId,
    pub msg_type: i64,
    pub value: Value,
}

#[derive(Debug, Deserialize)]
struct RawChannelMessage {
    action: Option<String>,
    status: Option<RawStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStatus {
    id: Option<String>,
    msg_type: Option<i64>,
    #[serde(default)]
    value: Value,
}

/// Decodes one message-channel payload.
///
/// Anything that is not a well-formed `status` message is a contract
/// violation of the transport and is reported, never ignored.
pub fn parse_channel_message(raw: &str) -> Result<StatusMessage, TransportError> {
    let msg: RawChannelMessage = serde_json::from_str(raw)?;
    let action = msg.action.ok_or(TransportError::MissingAction)?;
    if action != "status" {
        return Err(TransportError::UnknownAction(action));
    }
    let status = msg.status.ok_or(TransportError::MissingField("status"))?;
    let raw_id = status.id.ok_or(TransportError::MissingField("id"))?;
    let id = raw_id
        .parse()
        .map_err(|_| TransportError::BadSessionId(raw_id.clone()))?;
    let msg_type = status.msg_type.ok_or(TransportError::MissingField("msgType"))?;
    Ok(StatusMessage {
        id,
        msg_type,
        value: status.value,
    })
}

/// A finite number, given as JSON number or numeric string.
fn number(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .filter(|v| v.is_finite())
}

/// An integral number; `2.9` is not a code.
fn integral(value: &Value) -> Option<i64> {
    if let Some(v) = value.as_i64() {
        return Some(v);
    }
    let v = number(value)?;
    if v.fract() != 0.0 || v.abs() > i64::MAX as f64 {
        return None;
    }
    Some(v as i64)
}

impl StatusMessage {
    /// Interprets the message as a session event; `None` for unknown kinds or
    /// values that do not fit the kind.
    pub fn event(&self) -> Option<SessionEvent> {
        match self.msg_type {
            MEDIA_STATE => {
                MediaState::from_code(integral(&self.value)?).map(SessionEvent::State)
            }
            MEDIA_DURATION => number(&self.value).map(SessionEvent::Duration),
            MEDIA_POSITION => number(&self.value).map(SessionEvent::Position),
            MEDIA_ERROR => {
                let code = match self.value.get("code") {
                    Some(v) => integral(v)?,
                    None => integral(&self.value)?,
                };
                let code = i32::try_from(code).ok()?;
                Some(SessionEvent::Error(EngineError::from_code(code)))
            }
            _ => None,
        }
    }
}

/// Encodes a status message the way the engine puts it on the channel.
pub fn status_message(id: SessionId, msg_type: i64, value: Value) -> String {
    json!({
        "action": "status",
        "status": { "id": id.to_string(), "msgType": msg_type, "value": value },
    })
    .to_string()
}

pub fn state_message(id: SessionId, state: MediaState) -> String {
    status_message(id, MEDIA_STATE, json!(state.code()))
}

pub fn error_message(id: SessionId, code: i32) -> String {
    status_message(id, MEDIA_ERROR, json!({ "code": code }))
}
