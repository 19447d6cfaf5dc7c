use serde::Serialize;
use serde_json::Value;

/// Frames the client writes to `/ws/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum WsClientFrame {
    Message {
        message: String,
        session_id: Option<String>,
    },
    Cancel {
        cancel: bool,
        session_id: Option<String>,
    },
}

impl WsClientFrame {
    pub fn message(text: &str, session_id: Option<&str>) -> Self {
        WsClientFrame::Message {
            message: text.to_string(),
            session_id: session_id.map(str::to_string),
        }
    }

    pub fn cancel(session_id: Option<&str>) -> Self {
        WsClientFrame::Cancel {
            cancel: true,
            session_id: session_id.map(str::to_string),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Frames the server writes to `/ws/chat`.
#[derive(Debug, Clone, PartialEq)]
pub enum WsServerFrame {
    Cancelled,
    Partial { delta: String },
    Final { response: String },
    Plain { response: String, session_id: Option<String> },
    Unknown(String),
}

impl WsServerFrame {
    /// Classifies a raw text frame. A frame may carry several markers, so they
    /// are checked in order: `cancelled`, `partial`, `final`, then `response`.
    pub fn parse(raw: &str) -> Self {
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(_) => return WsServerFrame::Unknown(raw.to_string()),
        };

        if truthy(value.get("cancelled")) {
            return WsServerFrame::Cancelled;
        }
        if truthy(value.get("partial")) {
            return WsServerFrame::Partial {
                delta: text_field(value.get("delta")),
            };
        }
        if truthy(value.get("final")) {
            return WsServerFrame::Final {
                response: text_field(value.get("response")),
            };
        }
        if truthy(value.get("response")) {
            return WsServerFrame::Plain {
                response: text_field(value.get("response")),
                session_id: value
                    .get("session_id")
                    .and_then(Value::as_str)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string),
            };
        }

        WsServerFrame::Unknown(raw.to_string())
    }
}

/// JavaScript truthiness over a JSON value.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn text_field(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
