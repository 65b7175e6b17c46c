//! Server-sent event framing for relayed replies.
//!
//! Each `OutgoingEvent` becomes one `data:` frame. Closing the response
//! drops the receiver, which is how the relay notices a disconnect.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};

use crate::application::EventStream;
use crate::domain::chat::OutgoingEvent;

pub fn to_sse_event(event: &OutgoingEvent) -> Event {
    Event::default().data(event.to_data())
}

pub fn sse_response(
    events: EventStream,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = events.map(|event| Ok::<_, Infallible>(to_sse_event(&event)));
    Sse::new(stream).keep_alive(KeepAlive::default())
}
