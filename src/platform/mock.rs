use super::{
    ConnectResult, LogOnCredentials, LogOnResult, PlatformClient, PlatformError, PlatformEvent,
    SteamId,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::mpsc;

/// Deterministic in-memory `PlatformClient`, driven entirely by events a test
/// pushes through [`MockPlatformClient::push_event`] (or its `sender()`
/// handle, for pushing from a concurrently-running task). Imperative
/// operations record their arguments instead of doing anything over the
/// network, so a test can assert on what the scheduler attempted to do.
pub struct MockPlatformClient {
    events_tx: mpsc::UnboundedSender<PlatformEvent>,
    events_rx: mpsc::UnboundedReceiver<PlatformEvent>,
    pub connected: bool,
    pub logged_on: bool,
    pub currently_playing: Vec<u32>,
    pub play_calls: VecDeque<Vec<u32>>,
    pub redeem_calls: VecDeque<String>,
    pub sent_chat: VecDeque<(SteamId, String)>,
    pub next_connect_result: ConnectResult,
    pub next_log_on_result: LogOnResult,
}

impl MockPlatformClient {
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            events_tx,
            events_rx,
            connected: false,
            logged_on: false,
            currently_playing: Vec::new(),
            play_calls: VecDeque::new(),
            redeem_calls: VecDeque::new(),
            sent_chat: VecDeque::new(),
            next_connect_result: ConnectResult::Ok,
            next_log_on_result: LogOnResult::Ok(1),
        }
    }

    /// A handle a test can clone and move into another task to push events
    /// concurrently with the bot under test awaiting `next_event`.
    pub fn sender(&self) -> mpsc::UnboundedSender<PlatformEvent> {
        self.events_tx.clone()
    }

    pub fn push_event(&self, event: PlatformEvent) {
        let _ = self.events_tx.send(event);
    }
}

impl Default for MockPlatformClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlatformClient for MockPlatformClient {
    async fn connect(&mut self) -> Result<(), PlatformError> {
        self.connected = true;
        self.push_event(PlatformEvent::Connected(self.next_connect_result));
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.connected = false;
        self.logged_on = false;
    }

    async fn log_on(&mut self, _credentials: LogOnCredentials) -> Result<(), PlatformError> {
        if !self.connected {
            return Err(PlatformError::NotConnected);
        }
        self.logged_on = self.next_log_on_result.is_ok();
        self.push_event(PlatformEvent::LoggedOn(self.next_log_on_result));
        Ok(())
    }

    async fn log_off(&mut self) {
        self.logged_on = false;
        self.push_event(PlatformEvent::LoggedOff);
    }

    async fn next_event(&mut self) -> Option<PlatformEvent> {
        self.events_rx.recv().await
    }

    async fn set_persona_name(&mut self, _name: &str) {}

    async fn join_chat(&mut self, _clan_id: SteamId) {}

    async fn send_chat_message(&mut self, recipient: SteamId, text: &str) {
        self.sent_chat.push_back((recipient, text.to_string()));
    }

    async fn accept_friend(&mut self, _steam_id: SteamId) {}

    async fn remove_friend(&mut self, _steam_id: SteamId) {}

    async fn play_game(&mut self, app_id: u32) {
        self.currently_playing = vec![app_id];
        self.play_calls.push_back(vec![app_id]);
    }

    async fn play_games(&mut self, app_ids: &[u32]) {
        self.currently_playing = app_ids.to_vec();
        self.play_calls.push_back(app_ids.to_vec());
    }

    async fn stop_playing(&mut self) {
        self.currently_playing.clear();
    }

    async fn redeem_key(&mut self, key: &str) {
        self.redeem_calls.push_back(key.to_string());
    }

    async fn ack_machine_auth(&mut self, _job_id: u64, _sha1: [u8; 20]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_then_log_on_emits_events_in_order() {
        let mut client = MockPlatformClient::new();
        client.connect().await.unwrap();
        client
            .log_on(LogOnCredentials {
                login: "alice".into(),
                password: "hunter2".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(matches!(
            client.next_event().await,
            Some(PlatformEvent::Connected(ConnectResult::Ok))
        ));
        assert!(matches!(
            client.next_event().await,
            Some(PlatformEvent::LoggedOn(LogOnResult::Ok(_)))
        ));
    }

    #[tokio::test]
    async fn log_on_before_connect_fails() {
        let mut client = MockPlatformClient::new();
        let result = client.log_on(LogOnCredentials::default()).await;
        assert!(matches!(result, Err(PlatformError::NotConnected)));
    }

    #[tokio::test]
    async fn play_games_records_app_ids() {
        let mut client = MockPlatformClient::new();
        client.play_games(&[440, 570]).await;
        assert_eq!(client.currently_playing, vec![440, 570]);
        assert_eq!(client.play_calls.pop_front(), Some(vec![440, 570]));
    }
}
