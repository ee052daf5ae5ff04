//! OCSF (Open Cybersecurity Schema Framework) authentication events.
//!
//! Login and logoff outcomes are emitted via `tracing::info!` on the `ocsf`
//! target as one JSON document per event. Emission never fails the request.

use serde_json::{Value, json};
use std::time::{SystemTime, UNIX_EPOCH};

// OCSF event class UIDs
pub const CLASS_AUTHENTICATION: u32 = 3001;

// Activity IDs
pub const ACTIVITY_LOGON: u32 = 1;
pub const ACTIVITY_LOGOFF: u32 = 2;

// Status IDs
pub const STATUS_SUCCESS: u32 = 1;
pub const STATUS_FAILURE: u32 = 2;

// Severity IDs
pub const SEVERITY_INFORMATIONAL: u32 = 1;
pub const SEVERITY_LOW: u32 = 2;
pub const SEVERITY_MEDIUM: u32 = 3;
pub const SEVERITY_HIGH: u32 = 4;

pub const AUTH_PROTOCOL_OAUTH2: u32 = 10;

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn activity_name(id: u32) -> &'static str {
    match id {
        ACTIVITY_LOGON => "Logon",
        ACTIVITY_LOGOFF => "Logoff",
        _ => "Other",
    }
}

fn severity_name(id: u32) -> &'static str {
    match id {
        SEVERITY_INFORMATIONAL => "Informational",
        SEVERITY_LOW => "Low",
        SEVERITY_MEDIUM => "Medium",
        SEVERITY_HIGH => "High",
        _ => "Unknown",
    }
}

fn status_name(id: u32) -> &'static str {
    match id {
        STATUS_SUCCESS => "Success",
        _ => "Failure",
    }
}

/// Build an OCSF Authentication (3001) event for an OAuth 2.0 login or logoff.
///
/// Failures are raised to medium severity.
pub fn build_authentication_event(
    activity_id: u32,
    status_id: u32,
    user: Option<&str>,
    email: Option<&str>,
    message: &str,
) -> Value {
    let severity_id = if status_id == STATUS_SUCCESS {
        SEVERITY_INFORMATIONAL
    } else {
        SEVERITY_MEDIUM
    };

    let mut event = json!({
        "class_uid": CLASS_AUTHENTICATION,
        "class_name": "Authentication",
        "activity_id": activity_id,
        "activity_name": activity_name(activity_id),
        "severity_id": severity_id,
        "severity": severity_name(severity_id),
        "status_id": status_id,
        "status": status_name(status_id),
        "time": now_millis(),
        "metadata": {
            "product": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
                "vendor_name": "Stratio"
            }
        },
        "auth_protocol_id": AUTH_PROTOCOL_OAUTH2,
        "auth_protocol": "OAuth 2.0",
        "service": {"name": crate::provider::PROVIDER_NAME},
        "message": message,
    });

    let user = user.filter(|u| !u.is_empty());
    let email = email.filter(|e| !e.is_empty());
    if user.is_some() || email.is_some() {
        let mut actor = json!({"type_id": 1, "type": "User"});
        if let Some(uid) = user {
            actor["uid"] = json!(uid);
        }
        if let Some(email) = email {
            actor["email_addr"] = json!(email);
        }
        event["actor"] = json!({ "user": actor });
    }

    event
}

/// Emit an OCSF Authentication event. Never panics.
pub fn authentication_event(
    activity_id: u32,
    status_id: u32,
    user: Option<&str>,
    email: Option<&str>,
    message: &str,
) {
    let event = build_authentication_event(activity_id, status_id, user, email, message);
    if let Ok(json) = serde_json::to_string(&event) {
        tracing::info!(target: "ocsf", "{}", json);
    }
}
