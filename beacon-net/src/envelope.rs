//! The batch envelope posted to the collector.
//!
//! One request body = envelope fields (protocol version, API key,
//! install id, sent-at, app metadata) followed by the claimed events in
//! ascending id order, each as a nested record.

use beacon_core::constants::PROTOCOL_VERSION;
use beacon_core::errors::NetworkError;
use beacon_core::events::{EventKind, EventRecord};
use beacon_core::models::AppInfo;

use crate::wire::{self, tags, FieldReader};

/// Identity attached to every request. Fixed for the client lifetime.
#[derive(Debug, Clone)]
pub struct EnvelopeContext {
    pub api_key: String,
    pub install_id: String,
    pub app: AppInfo,
}

/// One event as it travels on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct WireEvent {
    pub id: i64,
    pub kind: EventKind,
    pub timestamp_ms: i64,
    pub session_id: String,
    pub payload: Vec<u8>,
}

impl From<&EventRecord> for WireEvent {
    fn from(record: &EventRecord) -> Self {
        Self {
            id: record.id,
            kind: record.kind,
            timestamp_ms: record.timestamp_ms,
            session_id: record.session_id.clone(),
            payload: record.payload.clone(),
        }
    }
}

/// Complete request body for one batch upload.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportEnvelope {
    pub protocol_version: u64,
    pub api_key: String,
    pub install_id: String,
    /// Wall-clock send time, epoch milliseconds.
    pub sent_at_ms: i64,
    pub app: AppInfo,
    /// Same order as the claimed batch.
    pub events: Vec<WireEvent>,
}

impl ReportEnvelope {
    pub fn new(context: &EnvelopeContext, sent_at_ms: i64, events: Vec<WireEvent>) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            api_key: context.api_key.clone(),
            install_id: context.install_id.clone(),
            sent_at_ms,
            app: context.app.clone(),
            events,
        }
    }

    /// Serialize into one request body.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        wire::put_u64(&mut out, tags::PROTOCOL_VERSION, self.protocol_version);
        wire::put_str(&mut out, tags::API_KEY, &self.api_key);
        wire::put_str(&mut out, tags::INSTALL_ID, &self.install_id);
        wire::put_i64(&mut out, tags::SENT_AT, self.sent_at_ms);
        wire::put_bytes(&mut out, tags::APP_INFO, &encode_app(&self.app));
        for event in &self.events {
            wire::put_bytes(&mut out, tags::EVENT, &encode_event(event));
        }
        out
    }

    /// Parse a request body. Unknown tags are skipped so older readers
    /// keep working when new fields appear; structural damage and
    /// unknown event kind codes are [`NetworkError::MalformedFrame`].
    pub fn decode(buf: &[u8]) -> Result<Self, NetworkError> {
        let mut envelope = ReportEnvelope {
            protocol_version: 0,
            api_key: String::new(),
            install_id: String::new(),
            sent_at_ms: 0,
            app: AppInfo::default(),
            events: Vec::new(),
        };

        let mut reader = FieldReader::new(buf);
        while let Some((tag, value)) = reader.next_field()? {
            match tag {
                tags::PROTOCOL_VERSION => {
                    envelope.protocol_version = wire::read_u64(tag, value)?;
                }
                tags::API_KEY => envelope.api_key = wire::read_str(tag, value)?,
                tags::INSTALL_ID => envelope.install_id = wire::read_str(tag, value)?,
                tags::SENT_AT => envelope.sent_at_ms = wire::read_i64(tag, value)?,
                tags::APP_INFO => envelope.app = decode_app(value)?,
                tags::EVENT => envelope.events.push(decode_event(value)?),
                _ => {}
            }
        }
        Ok(envelope)
    }
}

fn encode_app(app: &AppInfo) -> Vec<u8> {
    let mut out = Vec::new();
    wire::put_str(&mut out, tags::app::APP_VERSION, &app.app_version);
    wire::put_str(&mut out, tags::app::OS_NAME, &app.os_name);
    wire::put_str(&mut out, tags::app::OS_VERSION, &app.os_version);
    wire::put_str(&mut out, tags::app::DEVICE_MODEL, &app.device_model);
    wire::put_str(&mut out, tags::app::LOCALE, &app.locale);
    out
}

fn decode_app(buf: &[u8]) -> Result<AppInfo, NetworkError> {
    let mut app = AppInfo::default();
    let mut reader = FieldReader::new(buf);
    while let Some((tag, value)) = reader.next_field()? {
        match tag {
            tags::app::APP_VERSION => app.app_version = wire::read_str(tag, value)?,
            tags::app::OS_NAME => app.os_name = wire::read_str(tag, value)?,
            tags::app::OS_VERSION => app.os_version = wire::read_str(tag, value)?,
            tags::app::DEVICE_MODEL => app.device_model = wire::read_str(tag, value)?,
            tags::app::LOCALE => app.locale = wire::read_str(tag, value)?,
            _ => {}
        }
    }
    Ok(app)
}

fn encode_event(event: &WireEvent) -> Vec<u8> {
    let mut out = Vec::new();
    wire::put_i64(&mut out, tags::event::ID, event.id);
    wire::put_u64(&mut out, tags::event::KIND, event.kind.code());
    wire::put_i64(&mut out, tags::event::TIMESTAMP, event.timestamp_ms);
    wire::put_str(&mut out, tags::event::SESSION_ID, &event.session_id);
    wire::put_bytes(&mut out, tags::event::PAYLOAD, &event.payload);
    out
}

fn decode_event(buf: &[u8]) -> Result<WireEvent, NetworkError> {
    let mut id = 0i64;
    let mut kind = None;
    let mut timestamp_ms = 0i64;
    let mut session_id = String::new();
    let mut payload = Vec::new();

    let mut reader = FieldReader::new(buf);
    while let Some((tag, value)) = reader.next_field()? {
        match tag {
            tags::event::ID => id = wire::read_i64(tag, value)?,
            tags::event::KIND => {
                let code = wire::read_u64(tag, value)?;
                kind = Some(EventKind::from_code(code).ok_or_else(|| {
                    wire::malformed(format!("unknown event kind code {code}"))
                })?);
            }
            tags::event::TIMESTAMP => timestamp_ms = wire::read_i64(tag, value)?,
            tags::event::SESSION_ID => session_id = wire::read_str(tag, value)?,
            tags::event::PAYLOAD => payload = value.to_vec(),
            _ => {}
        }
    }

    let kind = kind.ok_or_else(|| wire::malformed("event block has no kind field".into()))?;
    Ok(WireEvent {
        id,
        kind,
        timestamp_ms,
        session_id,
        payload,
    })
}
