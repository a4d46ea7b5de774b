//! Per-bulb session tying the dispatcher to a device and the bus.

use std::io;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use futures::channel::oneshot;
use log::{debug, error};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::runtime::{self, BoxFuture, Mutex};

use crate::batch::BatchPhase;
use crate::command::{DeviceCommand, DeviceReport};
use crate::config::BridgeConfig;
use crate::dispatch::{Dispatcher, Outcome};
use crate::echo::{BusEvent, to_event_payload};
use crate::errors::Error;
use crate::history::{MessageHistory, MessageType};
use crate::state::LightState;

type Result<T> = std::result::Result<T, Error>;

/// Delivers device commands to a physical bulb.
pub trait BulbClient: Send + Sync {
    fn apply<'a>(&'a self, command: &'a DeviceCommand) -> BoxFuture<'a, io::Result<()>>;
}

/// Publishes events on the bus.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: BusEvent);
}

/// One bulb as seen from the bus.
///
/// Commands for the bulb are serialized by the session. The dispatcher lock
/// covers the state mutation only. While holding it a command takes its turn
/// in the device queue, so device commands go out in processing order, and
/// the lock is released before the device call: new commands can be staged
/// and the state read while a device call is in flight.
pub struct BulbSession {
    id: Uuid,
    address: String,
    label: Option<String>,
    dispatcher: Mutex<Dispatcher>,
    device_queue: StdMutex<Option<oneshot::Receiver<Baton>>>,
    client: Arc<dyn BulbClient>,
    sink: Arc<dyn EventSink>,
    history: Mutex<MessageHistory>,
    command_timeout: Option<Duration>,
}

impl std::fmt::Debug for BulbSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulbSession")
            .field("id", &self.id)
            .field("address", &self.address)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl BulbSession {
    pub fn new(
        address: &str,
        label: Option<&str>,
        client: Arc<dyn BulbClient>,
        sink: Arc<dyn EventSink>,
        config: &BridgeConfig,
    ) -> Self {
        BulbSession {
            id: Uuid::new_v4(),
            address: address.to_string(),
            label: label.map(String::from),
            dispatcher: Mutex::new(Dispatcher::new()),
            device_queue: StdMutex::new(None),
            client,
            sink,
            history: Mutex::new(MessageHistory::with_max_entries(config.history_size)),
            command_timeout: config.command_timeout,
        }
    }

    /// Identifier of the bulb on the bus.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// A snapshot of the desired state.
    pub async fn state(&self) -> LightState {
        self.dispatcher.lock().await.state().clone()
    }

    pub async fn batch_phase(&self) -> BatchPhase {
        self.dispatcher.lock().await.batch().phase()
    }

    pub async fn history(&self) -> MessageHistory {
        self.history.lock().await.clone()
    }

    pub async fn clear_history(&self) {
        self.history.lock().await.clear();
    }

    /// Handle a command by name.
    ///
    /// Rejected commands change nothing. When the command is not staged in a
    /// batch, the resulting device command is applied and the state is echoed
    /// once the bulb accepted it.
    ///
    /// If the returned future is dropped after the state was updated, the
    /// device command and echo of this command are skipped. Later commands
    /// are not held up by it.
    pub async fn dispatch(&self, name: &str, payload: &Value) -> Result<()> {
        debug!("{} <- {} {}", self.address, name, payload);
        self.record(MessageType::Command, name, payload).await;
        self.run(|dispatcher| dispatcher.dispatch(name, payload))
            .await
    }

    /// Handle a method call on one of the bulb's channels.
    pub async fn handle(&self, channel: &str, method: &str, payload: &Value) -> Result<()> {
        debug!("{} <- {}.{} {}", self.address, channel, method, payload);
        self.record(MessageType::Command, &format!("{channel}.{method}"), payload)
            .await;
        self.run(|dispatcher| dispatcher.dispatch_channel(channel, method, payload))
            .await
    }

    /// Open a batch. Returns `false` if one was already open.
    pub async fn start_batch(&self) -> bool {
        self.record(MessageType::Command, "startBatch", &Value::Null)
            .await;
        self.dispatcher.lock().await.start_batch()
    }

    /// Close the open batch and apply its consolidated command.
    ///
    /// The batch is closed even when the device call fails, or when the
    /// returned future is dropped before the device call.
    pub async fn end_batch(&self) -> Result<()> {
        self.record(MessageType::Command, "endBatch", &Value::Null)
            .await;
        self.run(|dispatcher| Ok(dispatcher.end_batch())).await
    }

    /// Apply a state notification pushed by the bulb and echo it.
    pub async fn report_state(&self, report: &DeviceReport) {
        debug!("{} reported {:?}", self.address, report);
        let message = serde_json::to_value(report).unwrap_or(Value::Null);
        self.record(MessageType::Report, "state", &message).await;

        let event = self.dispatcher.lock().await.sync_from_device(report);
        if let Some(event) = event {
            self.sink.emit(event);
        }
    }

    /// Forward an ambient light reading in lux.
    pub async fn report_illuminance(&self, lux: f64) {
        debug!("{} reported {} lx", self.address, lux);
        self.record(MessageType::Report, "illuminance", &json!(lux))
            .await;
        self.sink.emit(BusEvent::illuminance(lux));
    }

    /// Returns diagnostics including state and history.
    pub async fn diagnostics(&self) -> Value {
        let dispatcher = self.dispatcher.lock().await;
        let mut diag = json!({
            "id": self.id.to_string(),
            "address": self.address,
            "label": self.label,
            "batching": dispatcher.batch().is_batching(),
            "state": serde_json::to_value(to_event_payload(dispatcher.state()))
                .unwrap_or(Value::Null),
        });
        drop(dispatcher);

        let history = self.history.lock().await;
        diag["history"] = serde_json::to_value(history.summary()).unwrap_or(Value::Null);
        diag
    }

    async fn run<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Dispatcher) -> Result<Outcome>,
    {
        let mut dispatcher = self.dispatcher.lock().await;
        let result = mutate(&mut *dispatcher);
        let turn = match &result {
            Ok(outcome) if !outcome.is_empty() => Some(self.take_turn()),
            _ => None,
        };
        drop(dispatcher);

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                self.history.lock().await.record_error(&err.to_string());
                return Err(err);
            }
        };
        let Some(mut turn) = turn else {
            return Ok(());
        };

        turn.wait().await;
        let result = self.apply(outcome).await;
        drop(turn);
        result
    }

    /// Queue up behind the previous device command. Called with the
    /// dispatcher locked so turns follow processing order.
    fn take_turn(&self) -> DeviceTurn {
        let (done, next) = oneshot::channel();
        let previous = self
            .device_queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(next);
        DeviceTurn {
            previous,
            done: Some(done),
        }
    }

    async fn apply(&self, outcome: Outcome) -> Result<()> {
        let Outcome { command, event } = outcome;

        if let Some(command) = &command {
            debug!("{} applying {:?}", self.address, command);
            let message = serde_json::to_value(command).unwrap_or(Value::Null);
            self.record(MessageType::Device, "apply", &message).await;

            let result = runtime::maybe_timeout(self.command_timeout, self.client.apply(command))
                .await
                .unwrap_or_else(|timed_out| Err(timed_out.into()));

            if let Err(err) = result {
                let err = Error::device(&self.address, err);
                error!("{}", err);
                self.history.lock().await.record_error(&err.to_string());
                return Err(err);
            }
        }

        if let Some(event) = event {
            self.sink.emit(event);
        }
        Ok(())
    }

    async fn record(&self, msg_type: MessageType, method: &str, message: &Value) {
        self.history.lock().await.record(msg_type, method, message);
    }
}

/// Handed down the device queue by a turn dropped before its predecessor
/// finished, so the successor keeps waiting on that predecessor.
struct Baton(oneshot::Receiver<Baton>);

/// A place in a session's device queue. Dropping it lets the next command
/// through once every earlier command is done.
struct DeviceTurn {
    previous: Option<oneshot::Receiver<Baton>>,
    done: Option<oneshot::Sender<Baton>>,
}

impl DeviceTurn {
    async fn wait(&mut self) {
        while let Some(previous) = self.previous.as_mut() {
            match previous.await {
                Ok(Baton(earlier)) => self.previous = Some(earlier),
                Err(oneshot::Canceled) => self.previous = None,
            }
        }
    }
}

impl Drop for DeviceTurn {
    fn drop(&mut self) {
        if let (Some(previous), Some(done)) = (self.previous.take(), self.done.take()) {
            let _ = done.send(Baton(previous));
        }
    }
}

#[cfg(all(test, feature = "runtime-tokio"))]
mod tests {
    use super::*;
    use crate::channel::Channel;
    use crate::echo::EventPayload;

    #[derive(Clone, Copy, PartialEq)]
    enum Behavior {
        Accept,
        Refuse,
        Hang,
        HangFirst,
    }

    struct RecordingClient {
        behavior: Behavior,
        applied: StdMutex<Vec<DeviceCommand>>,
    }

    impl RecordingClient {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(RecordingClient {
                behavior,
                applied: StdMutex::new(Vec::new()),
            })
        }

        fn applied(&self) -> Vec<DeviceCommand> {
            self.applied.lock().unwrap().clone()
        }
    }

    impl BulbClient for RecordingClient {
        fn apply<'a>(&'a self, command: &'a DeviceCommand) -> BoxFuture<'a, io::Result<()>> {
            let mut applied = self.applied.lock().unwrap();
            applied.push(command.clone());
            let first = applied.len() == 1;
            drop(applied);

            match self.behavior {
                Behavior::Accept => Box::pin(async { Ok(()) }),
                Behavior::Refuse => Box::pin(async {
                    Err(io::Error::new(io::ErrorKind::ConnectionRefused, "unreachable"))
                }),
                Behavior::Hang => Box::pin(futures::future::pending()),
                Behavior::HangFirst if first => Box::pin(futures::future::pending()),
                Behavior::HangFirst => Box::pin(async { Ok(()) }),
            }
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: StdMutex<Vec<BusEvent>>,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<BusEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl EventSink for RecordingSink {
        fn emit(&self, event: BusEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    fn session(
        behavior: Behavior,
        config: &BridgeConfig,
    ) -> (BulbSession, Arc<RecordingClient>, Arc<RecordingSink>) {
        let client = RecordingClient::new(behavior);
        let sink = Arc::new(RecordingSink::default());
        let session = BulbSession::new(
            "192.168.1.40:56700",
            Some("Desk"),
            client.clone(),
            sink.clone(),
            config,
        );
        (session, client, sink)
    }

    #[tokio::test]
    async fn test_direct_command_applies_and_echoes() {
        let (session, client, sink) = session(Behavior::Accept, &BridgeConfig::default());
        session
            .handle("brightness", "set", &json!([0.5]))
            .await
            .unwrap();

        let applied = client.applied();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].brightness(), 32768);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].channel, Channel::Brightness);
    }

    #[tokio::test]
    async fn test_set_batch_applies_once() {
        let (session, client, sink) = session(Behavior::Accept, &BridgeConfig::default());
        session
            .dispatch(
                "setBatch",
                &json!({"brightness": 0.75, "on-off": true, "transition": 2000}),
            )
            .await
            .unwrap();

        let applied = client.applied();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].brightness(), 49151);
        assert!(applied[0].power());
        assert_eq!(applied[0].transition_secs(), 2);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].channel, Channel::OnOff);
    }

    #[tokio::test]
    async fn test_batch_defers_device_call() {
        let (session, client, sink) = session(Behavior::Accept, &BridgeConfig::default());
        assert!(session.start_batch().await);
        session.dispatch("turnOn", &Value::Null).await.unwrap();
        session
            .dispatch(
                "setColor",
                &json!({"mode": "temperature", "temperature": 2700}),
            )
            .await
            .unwrap();
        assert!(client.applied().is_empty());
        assert!(sink.events().is_empty());

        session.end_batch().await.unwrap();
        let applied = client.applied();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].kelvin(), Some(2700));
        assert_eq!(sink.events().len(), 1);
    }

    #[tokio::test]
    async fn test_device_failure_skips_echo() {
        let (session, _client, sink) = session(Behavior::Refuse, &BridgeConfig::default());
        let err = session.dispatch("turnOn", &Value::Null).await.unwrap_err();

        assert!(err.is_device_error());
        assert!(sink.events().is_empty());
        assert!(session.state().await.on());
        assert!(session.history().await.last_error().is_some());
    }

    #[tokio::test]
    async fn test_failed_flush_leaves_idle() {
        let (session, client, _sink) = session(Behavior::Refuse, &BridgeConfig::default());
        session.start_batch().await;
        session
            .dispatch("setBrightness", &json!([0.2]))
            .await
            .unwrap();

        assert!(session.end_batch().await.is_err());
        assert_eq!(session.batch_phase().await, BatchPhase::Idle);
        assert_eq!(client.applied().len(), 1);

        // nothing left to flush
        session.end_batch().await.unwrap();
        assert_eq!(client.applied().len(), 1);
    }

    #[tokio::test]
    async fn test_device_timeout() {
        let config = BridgeConfig::default().with_command_timeout(Some(Duration::from_millis(20)));
        let (session, _client, sink) = session(Behavior::Hang, &config);

        match session.dispatch("turnOff", &Value::Null).await {
            Err(Error::DeviceCommunication { address, err }) => {
                assert_eq!(address, "192.168.1.40:56700");
                assert_eq!(err.kind(), io::ErrorKind::TimedOut);
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert!(sink.events().is_empty());

        // the device queue moved on
        let err = session.dispatch("turnOn", &Value::Null).await.unwrap_err();
        assert!(err.is_device_error());
    }

    async fn wait_for_applied(client: &RecordingClient, count: usize) {
        let waiting = async {
            while client.applied().len() < count {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(1), waiting)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_staging_while_device_call_in_flight() {
        let config = BridgeConfig::default().with_command_timeout(None);
        let (session, client, sink) = session(Behavior::Hang, &config);
        let session = Arc::new(session);

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.dispatch("turnOn", &Value::Null).await }
        });
        wait_for_applied(&client, 1).await;

        // queued behind the hanging call
        let second = tokio::spawn({
            let session = session.clone();
            async move { session.dispatch("turnOff", &Value::Null).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let quick = Duration::from_millis(200);
        let state = tokio::time::timeout(quick, session.state()).await.unwrap();
        assert!(!state.on());
        assert!(tokio::time::timeout(quick, session.start_batch()).await.unwrap());
        tokio::time::timeout(quick, session.dispatch("setBrightness", &json!([0.6])))
            .await
            .unwrap()
            .unwrap();
        let diag = tokio::time::timeout(quick, session.diagnostics()).await.unwrap();
        assert_eq!(diag["batching"], json!(true));

        assert_eq!(client.applied().len(), 1);
        assert!(sink.events().is_empty());
        first.abort();
        second.abort();
    }

    #[tokio::test]
    async fn test_dropped_command_keeps_device_order() {
        let config = BridgeConfig::default().with_command_timeout(None);
        let (session, client, sink) = session(Behavior::HangFirst, &config);
        let session = Arc::new(session);

        let stuck = tokio::spawn({
            let session = session.clone();
            async move { session.dispatch("turnOn", &Value::Null).await }
        });
        wait_for_applied(&client, 1).await;

        // given up on while waiting for its turn
        let abandoned = tokio::time::timeout(
            Duration::from_millis(20),
            session.dispatch("setBrightness", &json!([0.4])),
        )
        .await;
        assert!(abandoned.is_err());

        let last = tokio::spawn({
            let session = session.clone();
            async move { session.dispatch("turnOff", &Value::Null).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(client.applied().len(), 1);

        stuck.abort();
        last.await.unwrap().unwrap();

        let applied = client.applied();
        assert_eq!(applied.len(), 2);
        assert!(!applied[1].power());
        assert_eq!(applied[1].brightness(), 26214);
        assert_eq!(sink.events().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_command_touches_nothing() {
        let (session, client, sink) = session(Behavior::Accept, &BridgeConfig::default());
        let before = session.state().await;

        let err = session.dispatch("explode", &json!({})).await.unwrap_err();
        assert_eq!(err, Error::UnknownCommand("explode".into()));
        assert_eq!(session.state().await, before);
        assert!(client.applied().is_empty());
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_reports_are_echoed() {
        let (session, client, sink) = session(Behavior::Accept, &BridgeConfig::default());
        session
            .report_state(&DeviceReport {
                power: 65535,
                hue: 0,
                saturation: 0,
                brightness: 65535,
                kelvin: 3000,
            })
            .await;
        session.report_illuminance(120.0).await;

        assert!(client.applied().is_empty());
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].channel, Channel::OnOff);
        assert_eq!(events[0].light().unwrap().color_temperature, Some(3000));
        assert_eq!(events[1].payload, EventPayload::Illuminance(120.0));

        let summary = session.history().await.summary();
        assert_eq!(summary.report_count, 2);
    }

    #[tokio::test]
    async fn test_concurrent_commands_each_applied() {
        let (session, client, sink) = session(Behavior::Accept, &BridgeConfig::default());
        let session = Arc::new(session);

        let tasks: Vec<_> = (0..10u32)
            .map(|i| {
                let session = session.clone();
                tokio::spawn(async move {
                    session
                        .dispatch("setBrightness", &json!([f64::from(i) / 10.0]))
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(client.applied().len(), 10);
        assert_eq!(sink.events().len(), 10);
    }

    #[tokio::test]
    async fn test_diagnostics() {
        let config = BridgeConfig::default().with_history_size(1);
        let (session, _client, _sink) = session(Behavior::Accept, &config);
        session.dispatch("turnOn", &Value::Null).await.unwrap();

        let diag = session.diagnostics().await;
        assert_eq!(diag["address"], json!("192.168.1.40:56700"));
        assert_eq!(diag["label"], json!("Desk"));
        assert_eq!(diag["state"]["on"], json!(true));
        assert_eq!(diag["batching"], json!(false));
        assert_eq!(diag["history"]["total_entries"], json!(1));
    }
}
