//! `StreamerSession` - actor that owns the assignment engine and its collaborators.
//!
//! The session:
//! - Serializes every input (transport callbacks, operator actions, MIDI)
//!   through one mailbox, so engine events are handled one at a time and
//!   to completion
//! - Applies the engine's commands to the rendering surface, the transport
//!   and the slot-name store
//! - Tracks the connection lifecycle and joins the configured room once the
//!   connection is established
//!
//! # Teardown
//!
//! On operator disconnect, transport disconnect or cancellation the engine is
//! torn down first (every attached handle detached, all state cleared), then
//! the conference is left, then the transport is disconnected. A failed or
//! dropped connection is not retried; the operator connects again through
//! [`StreamerSessionHandle::connect`]. Transport callbacks that arrive outside
//! the state they belong to (a late `ConnectionEstablished` after a
//! disconnect) are ignored.

use crate::config::Config;
use crate::engine::AssignmentEngine;
use crate::errors::StreamerError;
use crate::messages::{Command, ConnectionState, EngineEvent, SessionMessage, SessionState};
use crate::midi::MidiMapper;
use crate::observability::{
    record_event, record_render_noop, set_participants_known, set_slots_bound,
};
use crate::persistence::{reconcile, SlotNameStore};
use crate::render::RenderSurface;
use crate::slots::SlotRegistry;
use crate::transport::{AudioOutputDevice, Conference};

use common::secret::SecretString;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Default channel buffer size for the session mailbox.
const SESSION_CHANNEL_BUFFER: usize = 256;

/// Handle to a `StreamerSession`.
#[derive(Clone)]
pub struct StreamerSessionHandle {
    sender: mpsc::Sender<SessionMessage>,
    cancel_token: CancellationToken,
}

impl StreamerSessionHandle {
    /// Feed one event to the assignment engine.
    pub async fn dispatch(&self, event: EngineEvent) -> Result<(), StreamerError> {
        self.send(SessionMessage::Event(event)).await
    }

    /// Transport callback: the connection is up.
    pub async fn connection_established(&self) -> Result<(), StreamerError> {
        self.send(SessionMessage::ConnectionEstablished).await
    }

    /// Transport callback: the connection attempt failed.
    pub async fn connection_failed(&self, reason: String) -> Result<(), StreamerError> {
        self.send(SessionMessage::ConnectionFailed { reason }).await
    }

    /// Transport callback: the connection dropped.
    pub async fn connection_disconnected(&self) -> Result<(), StreamerError> {
        self.send(SessionMessage::ConnectionDisconnected).await
    }

    /// Transport callback: the conference was joined.
    pub async fn conference_joined(&self) -> Result<(), StreamerError> {
        self.send(SessionMessage::ConferenceJoined).await
    }

    /// Open the transport connection again after a disconnect or a failure.
    /// Does nothing while a connection is in progress or established.
    ///
    /// # Errors
    ///
    /// Returns [`StreamerError::Transport`] if the transport refuses to start
    /// connecting.
    pub async fn connect(&self) -> Result<(), StreamerError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionMessage::Connect { respond_to: tx }).await?;

        rx.await.map_err(|_| StreamerError::SessionClosed)?
    }

    /// Join `room`.
    ///
    /// # Errors
    ///
    /// - [`StreamerError::NotConnected`] before the connection is established
    /// - [`StreamerError::Transport`] if the transport refuses the join
    pub async fn join_conference(
        &self,
        room: String,
        password: Option<SecretString>,
    ) -> Result<(), StreamerError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionMessage::JoinConference {
            room,
            password,
            respond_to: tx,
        })
        .await?;

        rx.await.map_err(|_| StreamerError::SessionClosed)?
    }

    /// Tear everything down, leave the conference and disconnect.
    pub async fn disconnect(&self) -> Result<(), StreamerError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionMessage::Disconnect { respond_to: tx })
            .await?;

        rx.await.map_err(|_| StreamerError::SessionClosed)?
    }

    /// Route slot audio to another output device.
    pub async fn choose_audio_output(&self, device_id: String) -> Result<(), StreamerError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionMessage::ChooseAudioOutput {
            device_id,
            respond_to: tx,
        })
        .await?;

        rx.await.map_err(|_| StreamerError::SessionClosed)?
    }

    /// List the audio outputs the transport knows about.
    pub async fn audio_output_devices(&self) -> Result<Vec<AudioOutputDevice>, StreamerError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionMessage::ListAudioOutputs { respond_to: tx })
            .await?;

        rx.await.map_err(|_| StreamerError::SessionClosed)
    }

    /// Get a snapshot for the operator surface.
    pub async fn get_state(&self) -> Result<SessionState, StreamerError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionMessage::GetState { respond_to: tx })
            .await?;

        rx.await.map_err(|_| StreamerError::SessionClosed)
    }

    /// Cancel the session. It tears down before stopping.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Check if the session is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    async fn send(&self, message: SessionMessage) -> Result<(), StreamerError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| StreamerError::SessionClosed)
    }
}

/// The `StreamerSession` implementation.
pub struct StreamerSession {
    /// Message receiver.
    receiver: mpsc::Receiver<SessionMessage>,
    /// Cancellation token.
    cancel_token: CancellationToken,
    /// Slot assignment state.
    engine: AssignmentEngine,
    conference: Box<dyn Conference>,
    surface: Box<dyn RenderSurface>,
    store: Box<dyn SlotNameStore>,
    connection: ConnectionState,
    /// Room the last successful join targeted.
    room: Option<String>,
    /// Room joined as soon as the connection is established.
    auto_join: Option<(String, Option<SecretString>)>,
    display_name: String,
    instance_id: String,
}

impl StreamerSession {
    /// Spawn a new session.
    ///
    /// The stored slot-name table is loaded here; a read failure is logged
    /// and the configured names are used instead.
    ///
    /// Returns a handle and the task join handle.
    pub fn spawn(
        config: &Config,
        conference: Box<dyn Conference>,
        surface: Box<dyn RenderSurface>,
        store: Box<dyn SlotNameStore>,
        cancel_token: CancellationToken,
    ) -> (StreamerSessionHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(SESSION_CHANNEL_BUFFER);

        let stored = store.load().unwrap_or_else(|e| {
            warn!(
                target: "streamer.session",
                error = %e,
                "Failed to load stored slot names, using configured names"
            );
            None
        });
        let names = reconcile(config.slot_names.clone(), stored);

        let engine = AssignmentEngine::new(
            SlotRegistry::new(&names, config.default_volume),
            MidiMapper::new(config.midi_bank_offset, config.midi_enabled),
        );

        let session = Self {
            receiver,
            cancel_token: cancel_token.clone(),
            engine,
            conference,
            surface,
            store,
            connection: ConnectionState::Disconnected,
            room: None,
            auto_join: config
                .room
                .clone()
                .map(|room| (room, config.room_password.clone())),
            display_name: config.display_name.clone(),
            instance_id: config.instance_id.clone(),
        };

        let task_handle = tokio::spawn(session.run());

        let handle = StreamerSessionHandle {
            sender,
            cancel_token,
        };

        (handle, task_handle)
    }

    /// Run the session message loop.
    #[instrument(skip_all, name = "streamer.session", fields(instance_id = %self.instance_id))]
    async fn run(mut self) {
        info!(
            target: "streamer.session",
            slots = self.engine.slots().len(),
            "StreamerSession started"
        );

        // Failure is logged and shows up as the Failed state
        let _ = self.connect();

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "streamer.session",
                        "StreamerSession received cancellation signal"
                    );
                    self.shutdown();
                    break;
                }

                msg = self.receiver.recv() => {
                    if let Some(message) = msg {
                        self.handle_message(message);
                    } else {
                        info!(
                            target: "streamer.session",
                            "StreamerSession channel closed, exiting"
                        );
                        self.shutdown();
                        break;
                    }
                }
            }
        }

        info!(target: "streamer.session", "StreamerSession stopped");
    }

    /// Handle a single message.
    fn handle_message(&mut self, message: SessionMessage) {
        match message {
            SessionMessage::Event(event) => self.dispatch_event(event),

            SessionMessage::ConnectionEstablished => {
                if self.connection != ConnectionState::Connecting {
                    debug!(
                        target: "streamer.session",
                        state = self.connection.as_str(),
                        "Ignoring connection established outside of a connect attempt"
                    );
                    return;
                }
                self.set_connection(ConnectionState::Connected);

                if let Some((room, password)) = self.auto_join.clone() {
                    if let Err(e) = self.join(room, password) {
                        warn!(target: "streamer.session", error = %e, "Automatic join failed");
                    }
                }
            }

            SessionMessage::ConnectionFailed { reason } => {
                warn!(target: "streamer.session", reason = %reason, "Connection failed");
                self.dispatch_event(EngineEvent::Teardown);
                self.room = None;
                self.set_connection(ConnectionState::Failed);
            }

            SessionMessage::ConnectionDisconnected => {
                info!(target: "streamer.session", "Connection dropped by transport");
                self.dispatch_event(EngineEvent::Teardown);
                self.room = None;
                self.set_connection(ConnectionState::Disconnected);
            }

            SessionMessage::ConferenceJoined => {
                if self.connection == ConnectionState::Connected && self.room.is_some() {
                    self.set_connection(ConnectionState::Joined);
                } else {
                    debug!(
                        target: "streamer.session",
                        state = self.connection.as_str(),
                        "Ignoring conference joined without a pending join"
                    );
                }
            }

            SessionMessage::Connect { respond_to } => {
                let result = match self.connection {
                    ConnectionState::Disconnected | ConnectionState::Failed => self.connect(),
                    other => {
                        debug!(
                            target: "streamer.session",
                            state = other.as_str(),
                            "Connect ignored, connection already in progress"
                        );
                        Ok(())
                    }
                };
                let _ = respond_to.send(result);
            }

            SessionMessage::JoinConference {
                room,
                password,
                respond_to,
            } => {
                let result = self.join(room, password);
                let _ = respond_to.send(result);
            }

            SessionMessage::Disconnect { respond_to } => {
                self.shutdown();
                let _ = respond_to.send(Ok(()));
            }

            SessionMessage::ChooseAudioOutput {
                device_id,
                respond_to,
            } => {
                let result = self.conference.set_audio_output_device(&device_id);
                match &result {
                    Ok(()) => info!(
                        target: "streamer.session",
                        device_id = %device_id,
                        "Audio output changed"
                    ),
                    Err(e) => warn!(
                        target: "streamer.session",
                        device_id = %device_id,
                        error = %e,
                        "Audio output change refused"
                    ),
                }
                let _ = respond_to.send(result);
            }

            SessionMessage::ListAudioOutputs { respond_to } => {
                let _ = respond_to.send(self.conference.audio_output_devices());
            }

            SessionMessage::GetState { respond_to } => {
                let _ = respond_to.send(self.snapshot());
            }
        }
    }

    fn connect(&mut self) -> Result<(), StreamerError> {
        self.set_connection(ConnectionState::Connecting);
        if let Err(e) = self.conference.connect() {
            warn!(target: "streamer.session", error = %e, "Connect attempt failed to start");
            self.set_connection(ConnectionState::Failed);
            return Err(e);
        }
        Ok(())
    }

    fn join(&mut self, room: String, password: Option<SecretString>) -> Result<(), StreamerError> {
        match self.connection {
            ConnectionState::Connected | ConnectionState::Joined => {}
            other => {
                return Err(StreamerError::NotConnected(format!(
                    "connection is {}",
                    other.as_str()
                )));
            }
        }

        if self.room.as_deref() == Some(room.as_str()) {
            debug!(target: "streamer.session", room = %room, "Already in room");
            return Ok(());
        }

        if self.room.is_some() {
            self.dispatch_event(EngineEvent::Teardown);
            self.conference.leave_conference();
            self.room = None;
            self.set_connection(ConnectionState::Connected);
        }

        self.conference
            .join_conference(&room, password.as_ref(), &self.display_name)?;

        info!(
            target: "streamer.session",
            room = %room,
            display_name = %self.display_name,
            "Joining conference"
        );
        self.room = Some(room);
        Ok(())
    }

    /// Teardown, leave, disconnect. Safe to call in any state.
    fn shutdown(&mut self) {
        self.dispatch_event(EngineEvent::Teardown);

        if self.room.take().is_some() {
            self.conference.leave_conference();
        }
        if self.connection != ConnectionState::Disconnected {
            self.conference.disconnect();
        }
        self.set_connection(ConnectionState::Disconnected);
    }

    fn dispatch_event(&mut self, event: EngineEvent) {
        let event_type = event.event_type();
        let start = Instant::now();

        let commands = self.engine.dispatch(event);
        self.apply(commands);

        record_event(event_type, start.elapsed());
        set_slots_bound(self.engine.slots().bound_participants().len());
        set_participants_known(self.engine.tracks().len());
    }

    fn apply(&mut self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::Attach { slot, kind, handle } => {
                    if !self.surface.attach(slot, kind, &handle) {
                        record_render_noop("attach");
                        debug!(target: "streamer.session", slot = %slot, kind = %kind, "No attach target");
                    }
                }
                Command::Detach { slot, kind, handle } => {
                    if !self.surface.detach(slot, kind, &handle) {
                        record_render_noop("detach");
                        debug!(target: "streamer.session", slot = %slot, kind = %kind, "No detach target");
                    }
                }
                Command::SetVolume { slot, level } => {
                    if !self.surface.set_volume(slot, level) {
                        record_render_noop("set_volume");
                        debug!(target: "streamer.session", slot = %slot, "No volume target");
                    }
                }
                Command::NotifySelection { participants } => {
                    self.conference.select_participants(&participants);
                }
                Command::PersistSlotNames { names } => {
                    if let Err(e) = self.store.save(&names) {
                        warn!(target: "streamer.session", error = %e, "Failed to persist slot names");
                    }
                }
            }
        }
    }

    fn set_connection(&mut self, state: ConnectionState) {
        if self.connection != state {
            info!(
                target: "streamer.session",
                from = self.connection.as_str(),
                to = state.as_str(),
                "Connection state changed"
            );
            self.connection = state;
        }
    }

    fn snapshot(&self) -> SessionState {
        SessionState {
            connection: self.connection,
            room: self.room.clone(),
            slots: self.engine.slot_states(),
            participants: self.engine.participant_states(),
        }
    }
}
