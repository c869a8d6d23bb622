//! Server-sent event wire formatting
//!
//! Each event goes out as one frame:
//!
//! ```text
//! id: <event id>
//! event: <topic>
//! data: <payload json>
//! retry: <ms>
//! ```
//!
//! followed by a blank line.

use axum::response::sse;

use crate::registry::Event;

/// Convert an event for axum's SSE response
pub fn to_sse_event(event: &Event) -> sse::Event {
    let mut sse_event = sse::Event::default();

    // axum rejects ids and names containing line breaks
    if is_field_safe(event.id().as_str()) {
        sse_event = sse_event.id(event.id().as_str());
    }
    if is_field_safe(event.topic()) {
        sse_event = sse_event.event(event.topic());
    }

    sse_event
        .data(event.payload_json())
        .retry(event.retry_hint())
}

fn is_field_safe(value: &str) -> bool {
    !value.contains(['\n', '\r', '\0'])
}
