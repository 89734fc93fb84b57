use anyhow::{anyhow, bail, Result};
use base64::Engine;
use chrono::Utc;
use futures::stream::StreamExt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::config::ChatConfig;
use super::stats::{ChatStats, ConnectionState};
use super::turn::{Speaker, Turn, TurnLedger};
use crate::audio::{
    decode_wav, le_bytes_to_samples, AudioBackend, AudioFrame, PlaybackScheduler, PushBackend,
    UtteranceRecorder,
};
use crate::live::{LiveClient, LiveEventMessage};
use crate::services::{Scenario, ServiceSet};

/// A live chat session: one streaming connection, one turn ledger, one
/// playback timeline
///
/// The session owns the event dispatch task (inbound live events applied in
/// arrival order) and the recording task (captured frames fanned out to the
/// accumulation buffer and the live stream). Annotation calls run as
/// independent tasks and attach their results by turn id, guarded by the
/// session's liveness flag.
pub struct ChatSession {
    config: ChatConfig,
    scenario: Scenario,

    /// Live stream client; None when the connection failed at open
    live: Option<Arc<LiveClient>>,

    inner: Arc<SessionInner>,

    started_at: chrono::DateTime<chrono::Utc>,

    /// Handle for the inbound event dispatch task
    event_task: Mutex<Option<JoinHandle<()>>>,

    /// Active capture backend while recording
    record_backend: Mutex<Option<PushBackend>>,

    /// Producer side of the active recording pipeline
    record_tx: Mutex<Option<mpsc::Sender<AudioFrame>>>,

    /// Handle for the recording fan-out task
    record_task: Mutex<Option<JoinHandle<()>>>,
}

/// State shared with the session's spawned tasks
pub(crate) struct SessionInner {
    chat_id: String,
    language: String,
    /// Scenario description handed to the grammar checker as context
    scenario_context: String,
    capture: crate::audio::CaptureConfig,

    /// Cleared at teardown; every late callback checks this before
    /// touching state
    alive: AtomicBool,
    recording: AtomicBool,
    replaying: AtomicBool,
    frame_sequence: AtomicUsize,

    state: Mutex<ConnectionState>,
    status: Mutex<Option<String>>,
    ledger: Mutex<TurnLedger>,
    playback: Mutex<PlaybackScheduler>,

    /// Turn opened by the current recording; the stop path and the
    /// pronunciation result both resolve to this id
    active_utterance: Mutex<Option<Uuid>>,
    recording_started: Mutex<Option<Instant>>,

    services: ServiceSet,

    /// Output clock origin
    epoch: Instant,
}

impl SessionInner {
    fn new(config: &ChatConfig, scenario: &Scenario, services: ServiceSet) -> Self {
        Self {
            chat_id: config.chat_id.clone(),
            language: config.language.clone(),
            scenario_context: scenario.description.clone(),
            capture: config.capture_config(),
            alive: AtomicBool::new(true),
            recording: AtomicBool::new(false),
            replaying: AtomicBool::new(false),
            frame_sequence: AtomicUsize::new(0),
            state: Mutex::new(ConnectionState::Disconnected),
            status: Mutex::new(None),
            ledger: Mutex::new(TurnLedger::new()),
            playback: Mutex::new(PlaybackScheduler::new(config.playback_config())),
            active_utterance: Mutex::new(None),
            recording_started: Mutex::new(None),
            services,
            epoch: Instant::now(),
        }
    }

    /// Current output clock reading
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn set_state(&self, state: ConnectionState) {
        *self.state.lock().await = state;
    }

    async fn set_status(&self, message: impl Into<String>) {
        *self.status.lock().await = Some(message.into());
    }

    /// Apply one inbound live event
    ///
    /// Called only from the dispatch task, so events are applied strictly
    /// in arrival order.
    pub(crate) async fn handle_event(inner: &Arc<Self>, event: LiveEventMessage) {
        if !inner.is_alive() {
            return;
        }

        if let Some(audio) = &event.audio {
            match base64::engine::general_purpose::STANDARD.decode(audio) {
                Ok(bytes) => {
                    let samples = le_bytes_to_samples(&bytes);
                    if !samples.is_empty() {
                        let now = inner.now();
                        let mut playback = inner.playback.lock().await;
                        let fragment = playback.schedule(samples, now);
                        debug!(
                            "Scheduled tutor audio: start={:?} duration={:?}",
                            fragment.start, fragment.duration
                        );
                    }
                }
                Err(e) => warn!("Failed to decode audio fragment: {}", e),
            }
        }

        if let Some(fragment) = &event.tutor_transcript {
            let mut ledger = inner.ledger.lock().await;
            ledger.append_fragment(Speaker::Tutor, fragment);
        }

        if let Some(fragment) = &event.learner_transcript {
            // Learner transcripts only count while the microphone is live;
            // outside a recording they are echoes of already-submitted text.
            if inner.recording.load(Ordering::SeqCst) {
                let mut ledger = inner.ledger.lock().await;
                ledger.append_fragment(Speaker::Learner, fragment);
            } else {
                debug!("Ignoring learner transcript outside recording");
            }
        }

        if event.turn_complete {
            let completed = {
                let mut ledger = inner.ledger.lock().await;
                ledger.complete_open_turns()
            };

            for turn in completed {
                if turn.speaker == Speaker::Learner && !turn.text.trim().is_empty() {
                    Self::spawn_grammar_check(inner, turn.id, turn.text);
                }
            }
        }
    }

    /// Fire-and-forget grammar validation, attached by turn id
    pub(crate) fn spawn_grammar_check(inner: &Arc<Self>, turn_id: Uuid, text: String) {
        let inner = Arc::clone(inner);

        tokio::spawn(async move {
            let result = inner
                .services
                .grammar
                .check(&inner.language, &text, &inner.scenario_context)
                .await;

            match result {
                Ok(verdict) => {
                    // The session may have been torn down while the call
                    // was in flight; a dead session is never mutated.
                    if !inner.is_alive() {
                        return;
                    }

                    let mut ledger = inner.ledger.lock().await;
                    if !ledger.attach_grammar(turn_id, verdict) {
                        warn!(
                            "Grammar verdict for unknown turn {} in chat {}",
                            turn_id, inner.chat_id
                        );
                    }
                }
                Err(e) => debug!("Grammar check failed (ignored): {}", e),
            }
        });
    }

    /// Fire-and-forget pronunciation scoring, attached by turn id
    pub(crate) fn spawn_pronunciation(inner: &Arc<Self>, turn_id: Uuid, wav: Vec<u8>) {
        let inner = Arc::clone(inner);

        tokio::spawn(async move {
            let result = inner.services.pronunciation.score(&inner.language, &wav).await;

            match result {
                Ok(report) => {
                    if !inner.is_alive() {
                        return;
                    }

                    let mut ledger = inner.ledger.lock().await;
                    if !ledger.attach_pronunciation(turn_id, report) {
                        warn!(
                            "Pronunciation report for unknown turn {} in chat {}",
                            turn_id, inner.chat_id
                        );
                    }
                }
                Err(e) => debug!("Pronunciation scoring failed (ignored): {}", e),
            }
        });
    }
}

impl ChatSession {
    /// Open a chat session
    ///
    /// Connection failure does not refuse the chat: the session comes back
    /// in `Failed` state with a user-visible status and sends disabled.
    /// There is no automatic reconnect.
    pub async fn open(config: ChatConfig, scenario: Scenario, services: ServiceSet) -> Self {
        info!(
            "Opening chat session: {} ({}, \"{}\")",
            config.chat_id, config.language, scenario.title
        );

        let inner = Arc::new(SessionInner::new(&config, &scenario, services));

        // The scenario's opening line is the tutor's first turn
        if !scenario.opening_line.is_empty() {
            let mut ledger = inner.ledger.lock().await;
            ledger.push_completed(Speaker::Tutor, scenario.opening_line.clone());
        }

        let mut live = None;
        let mut event_task = None;

        match LiveClient::connect(&config.live_url, config.chat_id.clone()).await {
            Ok(client) => {
                let client = Arc::new(client);
                match Self::start_stream(&client, &inner, &config, &scenario).await {
                    Ok(task) => {
                        inner.set_state(ConnectionState::Connected).await;
                        live = Some(client);
                        event_task = Some(task);
                    }
                    Err(e) => {
                        error!("Failed to start live stream: {}", e);
                        inner.set_state(ConnectionState::Failed).await;
                        inner
                            .set_status("Could not start the conversation stream")
                            .await;
                    }
                }
            }
            Err(e) => {
                error!("Failed to connect live session: {}", e);
                inner.set_state(ConnectionState::Failed).await;
                inner
                    .set_status("Could not connect to the conversation service")
                    .await;
            }
        }

        Self {
            config,
            scenario,
            live,
            inner,
            started_at: Utc::now(),
            event_task: Mutex::new(event_task),
            record_backend: Mutex::new(None),
            record_tx: Mutex::new(None),
            record_task: Mutex::new(None),
        }
    }

    /// Send setup, subscribe, and spawn the event dispatch task
    async fn start_stream(
        client: &Arc<LiveClient>,
        inner: &Arc<SessionInner>,
        config: &ChatConfig,
        scenario: &Scenario,
    ) -> Result<JoinHandle<()>> {
        client
            .send_setup(&config.language, &scenario.system_prompt)
            .await?;

        let mut subscriber = client.subscribe_events().await?;

        let inner_task = Arc::clone(inner);
        let session_id = config.chat_id.clone();

        let task = tokio::spawn(async move {
            info!("Live event task started");

            while let Some(msg) = subscriber.next().await {
                if !inner_task.is_alive() {
                    break;
                }

                match serde_json::from_slice::<LiveEventMessage>(&msg.payload) {
                    Ok(event) => {
                        // Filter by session_id
                        if event.session_id != session_id {
                            continue;
                        }
                        SessionInner::handle_event(&inner_task, event).await;
                    }
                    Err(e) => {
                        warn!("Failed to parse live event: {}", e);
                    }
                }
            }

            info!("Live event task stopped");
        });

        Ok(task)
    }

    /// Submit one complete learner text turn
    pub async fn send_text(&self, text: &str) -> Result<Uuid> {
        if !self.inner.is_alive() {
            bail!("chat session is closed");
        }
        let live = self.require_connected().await?;

        let turn_id = {
            let mut ledger = self.inner.ledger.lock().await;
            ledger.push_completed(Speaker::Learner, text.to_string())
        };

        if let Err(e) = live.publish_text_turn(text).await {
            self.inner.set_status("Message could not be delivered").await;
            return Err(e);
        }

        // An explicit send is a finished turn; validate it right away
        SessionInner::spawn_grammar_check(&self.inner, turn_id, text.to_string());

        Ok(turn_id)
    }

    /// Start capturing the learner's utterance
    pub async fn start_recording(&self) -> Result<()> {
        if !self.inner.is_alive() {
            bail!("chat session is closed");
        }
        let live = self.require_connected().await?;

        if self.inner.recording.swap(true, Ordering::SeqCst) {
            warn!("Recording already started");
            return Ok(());
        }

        let mut backend = PushBackend::new(self.inner.capture.clone());
        let rx = match backend.start().await {
            Ok(rx) => rx,
            Err(e) => {
                self.inner.recording.store(false, Ordering::SeqCst);
                self.inner
                    .set_status("Microphone capture is unavailable")
                    .await;
                return Err(e);
            }
        };

        *self.record_tx.lock().await = backend.sender();
        *self.record_backend.lock().await = Some(backend);
        *self.inner.recording_started.lock().await = Some(Instant::now());

        // Transcript fragments arriving from here on belong to a new turn
        let turn_id = {
            let mut ledger = self.inner.ledger.lock().await;
            ledger.open_turn(Speaker::Learner)
        };
        *self.inner.active_utterance.lock().await = Some(turn_id);

        let task = Self::spawn_record_task(Arc::clone(&self.inner), live, rx);
        *self.record_task.lock().await = Some(task);

        info!("Recording started for chat {}", self.config.chat_id);

        Ok(())
    }

    /// Fan captured frames out to the accumulation buffer and the live
    /// stream; on pipeline close, finalize the utterance
    fn spawn_record_task(
        inner: Arc<SessionInner>,
        live: Arc<LiveClient>,
        mut rx: mpsc::Receiver<AudioFrame>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Recording task started");

            let mut recorder = UtteranceRecorder::new(inner.capture.clone());

            while let Some(frame) = rx.recv().await {
                recorder.push_frame(&frame);

                let seq = inner.frame_sequence.fetch_add(1, Ordering::SeqCst) as u32;

                if let Err(e) = live
                    .publish_audio_frame(
                        &frame.to_le_bytes(),
                        frame.sample_rate,
                        frame.channels,
                        seq,
                        false,
                    )
                    .await
                {
                    error!("Failed to publish audio frame: {}", e);
                }
            }

            info!("Recording task stopped");

            // Final frame marker
            let seq = inner.frame_sequence.load(Ordering::SeqCst) as u32;
            if let Err(e) = live
                .publish_audio_frame(&[], inner.capture.sample_rate, inner.capture.channels, seq, true)
                .await
            {
                error!("Failed to send final frame: {}", e);
            }

            match recorder.finish() {
                Ok(utterance) => {
                    if !inner.is_alive() {
                        return;
                    }
                    if utterance.sample_count == 0 {
                        debug!("Empty recording, nothing to attach");
                        return;
                    }

                    let turn_id = inner.active_utterance.lock().await.take();
                    let Some(turn_id) = turn_id else {
                        warn!("Recording finished but no utterance turn is open");
                        return;
                    };

                    {
                        let mut ledger = inner.ledger.lock().await;
                        if !ledger.attach_audio(turn_id, utterance.wav.clone()) {
                            warn!("Recorded audio for unknown turn {}", turn_id);
                            return;
                        }
                    }

                    SessionInner::spawn_pronunciation(&inner, turn_id, utterance.wav);
                }
                Err(e) => error!("Failed to encode recorded utterance: {}", e),
            }
        })
    }

    /// Push one captured frame into the active recording
    pub async fn push_frame(&self, samples: Vec<i16>) -> Result<()> {
        if !self.inner.recording.load(Ordering::SeqCst) {
            bail!("no active recording");
        }

        let timestamp_ms = {
            let started = self.inner.recording_started.lock().await;
            started
                .map(|t| t.elapsed().as_millis() as u64)
                .unwrap_or(0)
        };

        let frame = AudioFrame {
            samples,
            sample_rate: self.inner.capture.sample_rate,
            channels: self.inner.capture.channels,
            timestamp_ms,
        };

        let tx = { self.record_tx.lock().await.clone() };
        match tx {
            Some(tx) => tx
                .send(frame)
                .await
                .map_err(|_| anyhow!("recording pipeline closed")),
            None => bail!("no active recording"),
        }
    }

    /// Stop capturing and finalize the utterance
    ///
    /// Attaching the payload and firing pronunciation analysis happen in
    /// the recording task once it drains; this call waits for that.
    pub async fn stop_recording(&self) -> Result<()> {
        if !self.inner.recording.swap(false, Ordering::SeqCst) {
            warn!("Recording not active");
            return Ok(());
        }

        // Close both sender handles so the pipeline drains and ends
        *self.record_tx.lock().await = None;
        if let Some(mut backend) = self.record_backend.lock().await.take() {
            backend.stop().await?;
        }
        *self.inner.recording_started.lock().await = None;

        if let Some(task) = self.record_task.lock().await.take() {
            if let Err(e) = task.await {
                error!("Recording task panicked: {}", e);
            }
        }

        info!("Recording stopped for chat {}", self.config.chat_id);

        Ok(())
    }

    /// Replay a finalized turn: original recorded audio if present, else
    /// synthesized speech from its text
    ///
    /// Returns false when there is nothing to play (synthesis failed or
    /// produced no audio) — that is silent degradation, not an error.
    pub async fn replay(&self, turn_id: Uuid) -> Result<bool> {
        if !self.inner.is_alive() {
            bail!("chat session is closed");
        }

        // Only one replay at a time
        if self.inner.replaying.swap(true, Ordering::SeqCst) {
            bail!("another replay is already playing");
        }

        let result = self.replay_inner(turn_id).await;
        if !matches!(result, Ok(true)) {
            self.inner.replaying.store(false, Ordering::SeqCst);
        }
        result
    }

    async fn replay_inner(&self, turn_id: Uuid) -> Result<bool> {
        let turn: Turn = {
            let ledger = self.inner.ledger.lock().await;
            ledger
                .get(turn_id)
                .cloned()
                .ok_or_else(|| anyhow!("turn {} not found", turn_id))?
        };

        if turn.streaming {
            bail!("turn {} is still streaming", turn_id);
        }

        let (samples, sample_rate, channels) = match &turn.audio_wav {
            Some(wav) => {
                let decoded = decode_wav(wav)?;
                (decoded.samples, decoded.sample_rate, decoded.channels)
            }
            None => {
                match self
                    .inner
                    .services
                    .synthesizer
                    .synthesize(&self.config.language, &turn.text)
                    .await
                {
                    Ok(speech) => (speech.samples, speech.sample_rate, 1),
                    Err(e) => {
                        debug!("Speech synthesis failed (ignored): {}", e);
                        return Ok(false);
                    }
                }
            }
        };

        if samples.is_empty() {
            return Ok(false);
        }

        let now = self.inner.now();
        let fragment = {
            let mut playback = self.inner.playback.lock().await;
            playback.schedule_with_format(samples, sample_rate, channels, now)
        };

        info!(
            "Replaying turn {}: start={:?} duration={:?}",
            turn_id, fragment.start, fragment.duration
        );

        // Release the replay gate once the scheduled audio has played out
        let inner = Arc::clone(&self.inner);
        let wait = fragment.end().saturating_sub(now);
        tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            if inner.is_alive() {
                inner.replaying.store(false, Ordering::SeqCst);
            }
        });

        Ok(true)
    }

    /// Ordered transcript with whatever annotations have landed so far
    pub async fn transcript(&self) -> Vec<Turn> {
        let ledger = self.inner.ledger.lock().await;
        ledger.turns().to_vec()
    }

    /// Current session statistics
    pub async fn stats(&self) -> ChatStats {
        let duration = Utc::now().signed_duration_since(self.started_at);

        let (turn_count, annotated_turn_count) = {
            let ledger = self.inner.ledger.lock().await;
            (ledger.len(), ledger.annotated_count())
        };

        let playback_fragments = {
            let playback = self.inner.playback.lock().await;
            playback.scheduled_count()
        };

        ChatStats {
            state: *self.inner.state.lock().await,
            is_recording: self.inner.recording.load(Ordering::SeqCst),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            turn_count,
            annotated_turn_count,
            playback_fragments,
            status_message: self.inner.status.lock().await.clone(),
        }
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn chat_id(&self) -> &str {
        &self.config.chat_id
    }

    /// Tear the session down: stop recording, close the stream, release
    /// the playback timeline
    ///
    /// In-flight annotation calls are not cancelled; the cleared liveness
    /// flag makes their callbacks no-ops.
    pub async fn close(&self) {
        info!("Closing chat session: {}", self.config.chat_id);

        self.inner.alive.store(false, Ordering::SeqCst);

        if self.inner.recording.swap(false, Ordering::SeqCst) {
            *self.record_tx.lock().await = None;
            if let Some(mut backend) = self.record_backend.lock().await.take() {
                if let Err(e) = backend.stop().await {
                    error!("Failed to stop capture backend: {}", e);
                }
            }
            if let Some(task) = self.record_task.lock().await.take() {
                if let Err(e) = task.await {
                    error!("Recording task panicked: {}", e);
                }
            }
        }

        if let Some(task) = self.event_task.lock().await.take() {
            task.abort();
        }

        self.inner.set_state(ConnectionState::Disconnected).await;

        if let Some(live) = &self.live {
            if let Err(e) = live.close().await {
                error!("Failed to close live connection: {}", e);
            }
        }

        info!("Chat session closed: {}", self.config.chat_id);
    }

    /// Sends require an open stream; degraded sessions refuse them
    async fn require_connected(&self) -> Result<Arc<LiveClient>> {
        let state = *self.inner.state.lock().await;
        if state != ConnectionState::Connected {
            bail!("live session is not connected");
        }

        self.live
            .clone()
            .ok_or_else(|| anyhow!("live session is not connected"))
    }
}
