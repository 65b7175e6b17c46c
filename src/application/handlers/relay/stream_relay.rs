//! StreamRelay - Relays one upstream reply as a normalized event stream.
//!
//! The relay commits to a stream only once the upstream has produced its
//! first unit (or ended). Anything that goes wrong before that point is a
//! request-level `ChatError` and the client sees zero stream bytes. After
//! that point failures are reported in-band with a single error event.
//!
//! A spawned producer drains the upstream into a bounded channel. When the
//! client goes away the receiver is dropped, the producer notices the closed
//! channel and drops the upstream stream, which aborts the connection.

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, timeout, Instant};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, instrument, warn, Instrument};

use crate::application::ChatError;
use crate::config::RelayConfig;
use crate::domain::chat::{ChatPrompt, ConversationRef, OutgoingEvent, RelayPhase, StreamFailure};
use crate::domain::foundation::StateMachine;
use crate::ports::{SessionContext, UnitStream, UpstreamError};

/// Events of one relay, in upstream order, ending with `Done` or `Error`.
pub type EventStream = ReceiverStream<OutgoingEvent>;

/// Limits applied to every relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelaySettings {
    /// Longest gap allowed between upstream units.
    pub idle_timeout: Duration,
    /// Longest a single relay may run, measured from the upstream call.
    pub max_duration: Duration,
    /// Events buffered between producer and client.
    pub channel_capacity: usize,
}

impl From<&RelayConfig> for RelaySettings {
    fn from(config: &RelayConfig) -> Self {
        Self {
            idle_timeout: config.idle_timeout(),
            max_duration: config.max_stream_duration(),
            channel_capacity: config.channel_capacity,
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self::from(&RelayConfig::default())
    }
}

/// Command to relay a prompt into an existing conversation.
#[derive(Debug, Clone)]
pub struct RelayCommand {
    pub session: Arc<SessionContext>,
    pub conversation: ConversationRef,
    pub prompt: ChatPrompt,
}

/// Handler owning the lifecycle of one chat send.
#[derive(Debug, Clone)]
pub struct StreamRelay {
    settings: RelaySettings,
}

impl StreamRelay {
    pub fn new(settings: RelaySettings) -> Self {
        Self { settings }
    }

    #[instrument(
        name = "relay",
        skip_all,
        fields(
            org = cmd.conversation.org_id(),
            conversation = cmd.conversation.conversation_id(),
        )
    )]
    pub async fn handle(&self, cmd: RelayCommand) -> Result<EventStream, ChatError> {
        let provider = cmd.session.provider()?;
        let phase = advance(RelayPhase::Init, RelayPhase::UpstreamConnecting);

        let started = Instant::now();
        let deadline = started + self.settings.max_duration;
        let idle = self.settings.idle_timeout;

        let wait = wait_before_stream(idle, deadline);
        let opened = timeout(wait, provider.stream_reply(&cmd.conversation, &cmd.prompt)).await;
        let mut upstream = match opened {
            Ok(Ok(upstream)) => upstream,
            Ok(Err(e)) => return Err(fail_before_stream(phase, e)),
            Err(_) => return Err(fail_before_stream(phase, UpstreamError::timeout(wait.as_secs()))),
        };

        let wait = wait_before_stream(idle, deadline);
        let first = match timeout(wait, upstream.next()).await {
            Ok(Some(Ok(unit))) => Some(OutgoingEvent::from_unit(unit)),
            Ok(None) => None,
            Ok(Some(Err(e))) => return Err(fail_before_stream(phase, e)),
            Err(_) => return Err(fail_before_stream(phase, UpstreamError::timeout(wait.as_secs()))),
        };

        let phase = advance(phase, RelayPhase::Streaming);
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "first upstream unit received");

        let (tx, rx) = mpsc::channel(self.settings.channel_capacity.max(1));
        let producer = Producer {
            upstream,
            tx,
            idle,
            max_duration: self.settings.max_duration,
            deadline,
            phase,
            sent: 0,
        };
        tokio::spawn(producer.run(first).in_current_span());

        Ok(ReceiverStream::new(rx))
    }
}

fn advance(current: RelayPhase, next: RelayPhase) -> RelayPhase {
    match current.transition_to(next) {
        Ok(phase) => {
            debug!(from = %current, to = %phase, "relay phase");
            phase
        }
        Err(e) => {
            error!(error = %e, "unexpected relay phase transition");
            next
        }
    }
}

/// Idle timeout, cut short by whatever remains until `deadline`.
fn wait_before_stream(idle: Duration, deadline: Instant) -> Duration {
    idle.min(deadline.saturating_duration_since(Instant::now()))
}

fn fail_before_stream(phase: RelayPhase, err: UpstreamError) -> ChatError {
    advance(phase, RelayPhase::Failed);
    warn!(error = %err, "relay failed before streaming");
    err.into()
}

/// What the producer does next.
enum Step {
    Emit(OutgoingEvent),
    Finish,
    Fail(StreamFailure),
    Cancel,
}

/// How handing one event to the client went.
enum Delivery {
    Sent,
    Closed,
    Late,
}

struct Producer {
    upstream: UnitStream,
    tx: mpsc::Sender<OutgoingEvent>,
    idle: Duration,
    max_duration: Duration,
    deadline: Instant,
    phase: RelayPhase,
    sent: usize,
}

impl Producer {
    async fn run(mut self, first: Option<OutgoingEvent>) {
        let mut step = match first {
            Some(event) => Step::Emit(event),
            None => Step::Finish,
        };

        loop {
            match step {
                Step::Emit(event) => match self.deliver(event, self.deadline).await {
                    Delivery::Sent => {}
                    Delivery::Closed => return self.end(RelayPhase::Cancelled),
                    Delivery::Late => {
                        step = Step::Fail(self.out_of_time());
                        continue;
                    }
                },
                Step::Finish => match self.deliver(OutgoingEvent::Done, self.deadline).await {
                    Delivery::Sent => return self.end(RelayPhase::Completed),
                    Delivery::Closed => return self.end(RelayPhase::Cancelled),
                    Delivery::Late => {
                        step = Step::Fail(self.out_of_time());
                        continue;
                    }
                },
                Step::Fail(failure) => {
                    warn!(kind = failure.kind, message = %failure.message, "relay failed mid-stream");
                    // A client that cannot take the error within one idle period is abandoned.
                    let grace = Instant::now() + self.idle;
                    self.deliver(OutgoingEvent::Error(failure), grace).await;
                    return self.end(RelayPhase::Failed);
                }
                Step::Cancel => return self.end(RelayPhase::Cancelled),
            }

            step = self.next_step().await;
        }
    }

    /// Sends one event, giving up at `until` if the client is not reading.
    async fn deliver(&mut self, event: OutgoingEvent, until: Instant) -> Delivery {
        let counted = !event.is_terminal();
        tokio::select! {
            sent = self.tx.send(event) => match sent {
                Ok(()) => {
                    if counted {
                        self.sent += 1;
                    }
                    Delivery::Sent
                }
                Err(_) => Delivery::Closed,
            },
            _ = sleep_until(until) => Delivery::Late,
        }
    }

    fn out_of_time(&self) -> StreamFailure {
        StreamFailure::max_duration(self.max_duration.as_secs())
    }

    async fn next_step(&mut self) -> Step {
        tokio::select! {
            biased;
            _ = self.tx.closed() => Step::Cancel,
            _ = sleep_until(self.deadline) => Step::Fail(self.out_of_time()),
            next = timeout(self.idle, self.upstream.next()) => match next {
                Ok(Some(Ok(unit))) => Step::Emit(OutgoingEvent::from_unit(unit)),
                Ok(None) => Step::Finish,
                Ok(Some(Err(e))) => Step::Fail(StreamFailure::upstream(e.to_string())),
                Err(_) => Step::Fail(StreamFailure::idle_timeout(self.idle.as_secs())),
            },
        }
    }

    fn end(self, outcome: RelayPhase) {
        let phase = advance(self.phase, outcome);
        info!(phase = %phase, payloads = self.sent, "relay finished");
        // Dropping `self.upstream` here releases the upstream connection.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::upstream::{MockOperation, MockReply, MockStep, MockUpstream};
    use crate::application::handlers::testing::{expired_session_for, session_for};
    use crate::domain::chat::{UpstreamUnit, DONE_SENTINEL};
    use crate::domain::session::SessionError;
    use serde_json::json;

    fn relay() -> StreamRelay {
        StreamRelay::new(RelaySettings {
            idle_timeout: Duration::from_millis(200),
            max_duration: Duration::from_secs(5),
            channel_capacity: 4,
        })
    }

    fn command(session: Arc<SessionContext>) -> RelayCommand {
        RelayCommand {
            session,
            conversation: ConversationRef::new("org-1", "c1").unwrap(),
            prompt: ChatPrompt::new("hello", None).unwrap(),
        }
    }

    async fn collect(stream: EventStream) -> Vec<String> {
        stream.map(|event| event.to_data()).collect().await
    }

    #[tokio::test]
    async fn text_units_are_wrapped_and_terminated() {
        let upstream = MockUpstream::new().with_reply(MockReply::text(["Hi", " there"]));

        let events = collect(relay().handle(command(session_for(&upstream))).await.unwrap()).await;

        assert_eq!(
            events,
            vec![r#"{"text":"Hi"}"#, r#"{"text":" there"}"#, DONE_SENTINEL]
        );
    }

    #[tokio::test]
    async fn records_pass_through_in_order() {
        let upstream = MockUpstream::new().with_reply(MockReply::records(vec![
            json!({"completion": "a", "seq": 1}),
            json!({"completion": "b", "seq": 2}),
            json!({"completion": "c", "seq": 3}),
        ]));

        let events = collect(relay().handle(command(session_for(&upstream))).await.unwrap()).await;

        assert_eq!(events.len(), 4);
        for (i, data) in events[..3].iter().enumerate() {
            let value: serde_json::Value = serde_json::from_str(data).unwrap();
            assert_eq!(value["seq"], i as u64 + 1);
        }
        assert_eq!(events.iter().filter(|d| d.as_str() == DONE_SENTINEL).count(), 1);
        assert_eq!(events.last().map(String::as_str), Some(DONE_SENTINEL));
    }

    #[tokio::test]
    async fn empty_reply_is_just_the_sentinel() {
        let upstream = MockUpstream::new().with_reply(MockReply::steps(vec![]));
        let events = collect(relay().handle(command(session_for(&upstream))).await.unwrap()).await;
        assert_eq!(events, vec![DONE_SENTINEL]);
    }

    #[tokio::test]
    async fn refused_connection_is_a_request_error() {
        let upstream = MockUpstream::new().with_reply(MockReply::Error(UpstreamError::rejected(
            400,
            "prompt too long",
        )));

        let err = relay().handle(command(session_for(&upstream))).await.unwrap_err();

        assert_eq!(err, ChatError::Upstream(UpstreamError::rejected(400, "prompt too long")));
    }

    #[tokio::test]
    async fn failure_before_first_unit_is_a_request_error() {
        let upstream = MockUpstream::new().with_reply(MockReply::steps(vec![MockStep::Fail(
            UpstreamError::stream("overloaded"),
        )]));

        let err = relay().handle(command(session_for(&upstream))).await.unwrap_err();

        assert_eq!(err, ChatError::Upstream(UpstreamError::stream("overloaded")));
        assert_eq!(upstream.released_streams(), 1);
    }

    #[tokio::test]
    async fn silence_before_first_unit_is_a_timeout() {
        let upstream = MockUpstream::new().with_reply(MockReply::steps(vec![MockStep::Hang]));

        let err = relay().handle(command(session_for(&upstream))).await.unwrap_err();

        assert!(matches!(err, ChatError::Upstream(UpstreamError::Timeout { .. })));
    }

    #[tokio::test]
    async fn failure_after_first_unit_is_reported_in_band() {
        let upstream = MockUpstream::new().with_reply(MockReply::steps(vec![
            MockStep::Unit(UpstreamUnit::Text("partial".to_string())),
            MockStep::Fail(UpstreamError::network("connection reset")),
            MockStep::Unit(UpstreamUnit::Text("never sent".to_string())),
        ]));

        let events = collect(relay().handle(command(session_for(&upstream))).await.unwrap()).await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0], r#"{"text":"partial"}"#);
        let error: serde_json::Value = serde_json::from_str(&events[1]).unwrap();
        assert_eq!(error["error"]["type"], "stream_failure");
        assert!(error["error"]["message"]
            .as_str()
            .unwrap()
            .contains("connection reset"));
    }

    #[tokio::test]
    async fn idle_timeout_mid_stream_is_reported_in_band() {
        let upstream = MockUpstream::new().with_reply(MockReply::steps(vec![
            MockStep::Unit(UpstreamUnit::Text("Hi".to_string())),
            MockStep::Hang,
        ]));

        let events = collect(relay().handle(command(session_for(&upstream))).await.unwrap()).await;

        assert_eq!(events.len(), 2);
        assert!(events[1].contains("idle_timeout"));
        assert_eq!(upstream.released_streams(), 1);
    }

    #[tokio::test]
    async fn max_duration_stops_a_slow_stream() {
        let relay = StreamRelay::new(RelaySettings {
            idle_timeout: Duration::from_secs(5),
            max_duration: Duration::from_millis(150),
            channel_capacity: 4,
        });
        let mut steps = Vec::new();
        for _ in 0..20 {
            steps.push(MockStep::Unit(UpstreamUnit::Text(".".to_string())));
            steps.push(MockStep::Delay(Duration::from_millis(40)));
        }
        let upstream = MockUpstream::new().with_reply(MockReply::steps(steps));

        let events = collect(relay.handle(command(session_for(&upstream))).await.unwrap()).await;

        assert!(events.len() < 20);
        assert!(events.last().unwrap().contains("max_duration_exceeded"));
        assert!(!events.iter().any(|d| d == DONE_SENTINEL));
    }

    #[tokio::test]
    async fn max_duration_bounds_the_wait_for_a_first_unit() {
        let relay = StreamRelay::new(RelaySettings {
            idle_timeout: Duration::from_secs(5),
            max_duration: Duration::from_millis(100),
            channel_capacity: 4,
        });
        let upstream = MockUpstream::new().with_reply(MockReply::steps(vec![MockStep::Hang]));

        let outcome = timeout(
            Duration::from_secs(1),
            relay.handle(command(session_for(&upstream))),
        )
        .await
        .expect("first-unit wait outlived the maximum duration");

        assert!(matches!(
            outcome.err(),
            Some(ChatError::Upstream(UpstreamError::Timeout { .. }))
        ));
    }

    #[tokio::test]
    async fn max_duration_applies_while_the_client_is_not_reading() {
        let relay = StreamRelay::new(RelaySettings {
            idle_timeout: Duration::from_secs(5),
            max_duration: Duration::from_millis(150),
            channel_capacity: 1,
        });
        let mut steps: Vec<MockStep> = (0..10)
            .map(|_| MockStep::Unit(UpstreamUnit::Text(".".to_string())))
            .collect();
        steps.push(MockStep::Hang);
        let upstream = MockUpstream::new().with_reply(MockReply::steps(steps));

        let stream = relay.handle(command(session_for(&upstream))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        let events = timeout(Duration::from_secs(2), collect(stream))
            .await
            .expect("stream did not end");

        assert!(events.len() <= 3, "sent {} events past the deadline", events.len());
        assert!(events.last().unwrap().contains("max_duration_exceeded"));
        assert!(!events.iter().any(|d| d == DONE_SENTINEL));
        assert_eq!(upstream.released_streams(), 1);
    }

    #[tokio::test]
    async fn dropping_the_receiver_releases_the_upstream() {
        let upstream = MockUpstream::new().with_reply(MockReply::steps(vec![
            MockStep::Unit(UpstreamUnit::Text("Hi".to_string())),
            MockStep::Hang,
        ]));

        let mut stream = relay().handle(command(session_for(&upstream))).await.unwrap();
        assert_eq!(stream.next().await.unwrap().to_data(), r#"{"text":"Hi"}"#);
        drop(stream);

        let released = async {
            while upstream.released_streams() == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        timeout(Duration::from_secs(1), released)
            .await
            .expect("upstream stream was not released after client disconnect");
    }

    #[tokio::test]
    async fn expired_session_never_reaches_upstream() {
        let upstream = MockUpstream::new();
        let err = relay()
            .handle(command(expired_session_for(&upstream)))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Session(SessionError::Expired(_))));
        assert_eq!(upstream.calls_to(MockOperation::StreamReply), 0);
    }

    #[tokio::test]
    async fn concurrent_relays_keep_their_own_order() {
        let upstream = MockUpstream::new()
            .with_reply(MockReply::steps(vec![
                MockStep::Unit(UpstreamUnit::Text("a1".to_string())),
                MockStep::Delay(Duration::from_millis(10)),
                MockStep::Unit(UpstreamUnit::Text("a2".to_string())),
                MockStep::Delay(Duration::from_millis(10)),
                MockStep::Unit(UpstreamUnit::Text("a3".to_string())),
            ]))
            .with_reply(MockReply::steps(vec![
                MockStep::Unit(UpstreamUnit::Text("b1".to_string())),
                MockStep::Unit(UpstreamUnit::Text("b2".to_string())),
                MockStep::Delay(Duration::from_millis(15)),
                MockStep::Unit(UpstreamUnit::Text("b3".to_string())),
            ]));
        let session = session_for(&upstream);
        let relay = relay();

        let a = relay.handle(command(session.clone())).await.unwrap();
        let b = relay.handle(command(session)).await.unwrap();
        let (a, b) = tokio::join!(collect(a), collect(b));

        assert_eq!(
            a,
            vec![r#"{"text":"a1"}"#, r#"{"text":"a2"}"#, r#"{"text":"a3"}"#, DONE_SENTINEL]
        );
        assert_eq!(
            b,
            vec![r#"{"text":"b1"}"#, r#"{"text":"b2"}"#, r#"{"text":"b3"}"#, DONE_SENTINEL]
        );
    }
}
