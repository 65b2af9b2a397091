//! The per-bot farming scheduler: round algorithm and badge-page parsing.
//!
//! `CardsFarmer` owns `games_to_farm` and drives the platform through
//! [`PlatformCommand`]s sent to the bot's pump loop rather than holding a
//! `PlatformClient` directly — the pump loop is the sole owner of the
//! connection and must stay free to keep draining callbacks while a farming
//! round is in flight, so play/stop requests go over a channel instead.

use crate::game::{sort_games, FarmingOrder, Game};
use crate::web::{BadgePage, WebClient};
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex, Notify};
use tracing::{debug, info, warn};

/// App ids that misreport `cards_remaining = 0` on the badge page but may
/// still have drops pending, confirmed only by checking the per-game page.
const UNTRUSTED_ZERO_REPORTERS: &[u32] = &[368_020, 418_240];

fn untrusted_allowlist() -> &'static HashSet<u32> {
    static SET: OnceLock<HashSet<u32>> = OnceLock::new();
    SET.get_or_init(|| UNTRUSTED_ZERO_REPORTERS.iter().copied().collect())
}

/// Requests `CardsFarmer` sends to the bot pump loop to drive the platform.
#[derive(Debug, Clone)]
pub enum PlatformCommand {
    PlayGame(u32),
    PlayGames(Vec<u32>),
    StopPlaying,
}

/// Events `CardsFarmer` raises back to the bot.
#[derive(Debug, Clone, Copy)]
pub enum FarmerSignal {
    FarmingFinished,
}

/// Tuning that doesn't vary per round but isn't a hardcoded constant either —
/// kept out of the per-bot XML config table because nothing in the
/// specification calls for tuning it per-account, only per-deployment.
#[derive(Debug, Clone, Copy)]
pub struct FarmingTiming {
    /// How long a `farm_solo`/`farm_multiple` iteration waits on the reset
    /// event before re-checking progress.
    pub farming_delay: Duration,
    /// Hard ceiling on a single solo play session, regardless of resets.
    pub max_farming_time: Duration,
}

impl Default for FarmingTiming {
    fn default() -> Self {
        Self {
            farming_delay: Duration::from_secs(20 * 60),
            max_farming_time: Duration::from_secs(3 * 60 * 60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FarmerConfig {
    pub card_drops_restricted: bool,
    pub blacklist: HashSet<u32>,
    pub max_games_played_concurrently: u8,
    pub hours_until_card_drops: f32,
    pub farming_order: FarmingOrder,
    pub timing: FarmingTiming,
}

struct FarmerState {
    now_farming: AtomicBool,
    keep_farming: AtomicBool,
    /// Set once a game is added mid-round that the complex algorithm needs
    /// to re-plan around; cleared by whichever round-loop method consumes it.
    replan: AtomicBool,
    paused: AtomicBool,
    sticky_pause: AtomicBool,
    reset_event: Notify,
    farming_semaphore: Mutex<()>,
    games_to_farm: Mutex<Vec<Game>>,
    /// The bot's own account id, known only once login succeeds (see
    /// `CardsFarmer::set_account_id`). `0` before then; nothing reads it
    /// until `start_farming` is called, which only happens post-login.
    account_id: AtomicU64,
}

impl FarmerState {
    fn new() -> Self {
        Self {
            now_farming: AtomicBool::new(false),
            keep_farming: AtomicBool::new(false),
            replan: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            sticky_pause: AtomicBool::new(false),
            reset_event: Notify::new(),
            farming_semaphore: Mutex::new(()),
            games_to_farm: Mutex::new(Vec::new()),
            account_id: AtomicU64::new(0),
        }
    }
}

/// The farming scheduler. Cheap to clone: every field is an `Arc` or a
/// channel handle, so a clone is handed to the spawned round-loop task while
/// the bot keeps its own handle to query state.
#[derive(Clone)]
pub struct CardsFarmer {
    web: Arc<dyn WebClient>,
    platform_tx: mpsc::UnboundedSender<PlatformCommand>,
    signal_tx: mpsc::UnboundedSender<FarmerSignal>,
    state: Arc<FarmerState>,
    config: Arc<FarmerConfig>,
}

impl CardsFarmer {
    pub fn new(
        web: Arc<dyn WebClient>,
        platform_tx: mpsc::UnboundedSender<PlatformCommand>,
        signal_tx: mpsc::UnboundedSender<FarmerSignal>,
        config: FarmerConfig,
    ) -> Self {
        Self {
            web,
            platform_tx,
            signal_tx,
            state: Arc::new(FarmerState::new()),
            config: Arc::new(config),
        }
    }

    /// Record the bot's own account id once login succeeds. Safe to call
    /// more than once (e.g. across reconnects); farming only ever reads the
    /// latest value.
    pub fn set_account_id(&self, steam_id: u64) {
        self.state.account_id.store(steam_id, Ordering::SeqCst);
    }

    fn account_id(&self) -> u64 {
        self.state.account_id.load(Ordering::SeqCst)
    }

    pub fn now_farming(&self) -> bool {
        self.state.now_farming.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused.load(Ordering::SeqCst)
    }

    /// Current snapshot of `games_to_farm`, for `!status`.
    pub async fn games_to_farm_snapshot(&self) -> Vec<Game> {
        self.state.games_to_farm.lock().await.clone()
    }

    /// Begin a farming round if one isn't already running. Returns quickly —
    /// the round itself runs on a spawned task; callers that need to know
    /// when it finishes should watch for `FarmerSignal::FarmingFinished`.
    ///
    /// Precondition the caller is responsible for: only invoke this while the
    /// bot is logged on. `CardsFarmer` has no visibility into login state by
    /// design — `Bot` is the sole caller and already gates on it.
    pub fn start_farming(&self) {
        if self.now_farming() || self.is_paused() {
            return;
        }

        let farmer = self.clone();
        tokio::spawn(async move { farmer.run_round().await });
    }

    async fn run_round(&self) {
        let _permit = self.state.farming_semaphore.lock().await;

        if self.now_farming() || self.is_paused() {
            return;
        }

        loop {
            if !self.is_anything_to_farm().await {
                break;
            }

            let estimated = self.games_to_farm_snapshot().await.len();
            info!(steam_id = self.account_id(), games = estimated, "starting farming round");

            self.state.now_farming.store(true, Ordering::SeqCst);
            self.state.keep_farming.store(true, Ordering::SeqCst);

            let completed = if self.config.card_drops_restricted {
                self.run_complex_round().await
            } else {
                self.run_simple_round().await
            };

            self.state.now_farming.store(false, Ordering::SeqCst);

            if !completed {
                // stop_farming preempted the round; don't loop back into
                // is_anything_to_farm, just exit without signalling completion.
                return;
            }
        }

        let _ = self.signal_tx.send(FarmerSignal::FarmingFinished);
    }

    async fn run_simple_round(&self) -> bool {
        loop {
            let next = {
                let games = self.state.games_to_farm.lock().await;
                games.first().cloned()
            };
            let Some(game) = next else { return true };

            if !self.farm_solo(&game).await {
                return false;
            }
        }
    }

    async fn run_complex_round(&self) -> bool {
        loop {
            let (solo, remaining) = {
                let games = self.state.games_to_farm.lock().await;
                if games.is_empty() {
                    return true;
                }
                let mut solo: Vec<Game> = games
                    .iter()
                    .filter(|g| g.has_bumped(self.config.hours_until_card_drops))
                    .cloned()
                    .collect();
                if games.len() == 1 {
                    solo = games.clone();
                }
                (solo, games.clone())
            };

            if !solo.is_empty() {
                for game in &solo {
                    if !self.farm_solo(game).await {
                        return false;
                    }
                }
            } else {
                let mut picked = remaining;
                picked.sort_by(|a, b| b.hours_played.total_cmp(&a.hours_played));
                picked.truncate(self.config.max_games_played_concurrently as usize);
                if !self.farm_multiple(&picked).await {
                    return false;
                }
            }
        }
    }

    /// Play one app id until it's drained or farming is interrupted. Returns
    /// `keep_farming` so the caller knows whether to continue the round.
    async fn farm_solo(&self, game: &Game) -> bool {
        let _ = self.platform_tx.send(PlatformCommand::PlayGame(game.app_id));

        let round_start = Instant::now();
        let mut hours_played = game.hours_played;

        loop {
            if !self.state.keep_farming.load(Ordering::SeqCst) {
                return false;
            }
            if self.state.replan.swap(false, Ordering::SeqCst) {
                break;
            }
            if round_start.elapsed() >= self.config.timing.max_farming_time {
                break;
            }

            let wait_start = Instant::now();
            let _ = tokio::time::timeout(
                self.config.timing.farming_delay,
                self.state.reset_event.notified(),
            )
            .await;
            hours_played += wait_start.elapsed().as_secs_f32() / 3600.0;

            if !self.state.keep_farming.load(Ordering::SeqCst) {
                return false;
            }
            if self.state.replan.swap(false, Ordering::SeqCst) {
                break;
            }

            match self.should_farm(game.app_id).await {
                Some(false) => {
                    self.remove_game(game.app_id).await;
                    break;
                }
                Some(true) | None => {
                    self.update_hours(game.app_id, hours_played).await;
                }
            }
        }

        let _ = self.platform_tx.send(PlatformCommand::StopPlaying);
        true
    }

    /// Play several app ids concurrently until the highest `hours_played` in
    /// the set reaches `hours_until_card_drops`.
    async fn farm_multiple(&self, games: &[Game]) -> bool {
        let app_ids: Vec<u32> = games.iter().map(|g| g.app_id).collect();
        let _ = self.platform_tx.send(PlatformCommand::PlayGames(app_ids));

        let round_start = Instant::now();
        let mut hours: Vec<(u32, f32)> = games.iter().map(|g| (g.app_id, g.hours_played)).collect();

        loop {
            if !self.state.keep_farming.load(Ordering::SeqCst) {
                return false;
            }
            if self.state.replan.swap(false, Ordering::SeqCst) {
                break;
            }
            let max_hours = hours.iter().map(|(_, h)| *h).fold(0.0_f32, f32::max);
            if max_hours >= self.config.hours_until_card_drops {
                break;
            }
            if round_start.elapsed() >= self.config.timing.max_farming_time {
                break;
            }

            let wait_start = Instant::now();
            let _ = tokio::time::timeout(
                self.config.timing.farming_delay,
                self.state.reset_event.notified(),
            )
            .await;
            let elapsed_hours = wait_start.elapsed().as_secs_f32() / 3600.0;
            for (app_id, h) in &mut hours {
                *h += elapsed_hours;
                self.update_hours(*app_id, *h).await;
            }

            if !self.state.keep_farming.load(Ordering::SeqCst) {
                return false;
            }
            if self.state.replan.swap(false, Ordering::SeqCst) {
                break;
            }
        }

        let _ = self.platform_tx.send(PlatformCommand::StopPlaying);
        true
    }

    /// Cooperatively end the current round. Polls up to 5x1s for
    /// `now_farming` to clear; on timeout forces it false and warns.
    ///
    /// Deliberately does not take `farming_semaphore`: that lock is held by
    /// `run_round` for the lifetime of an entire round, so waiting on it
    /// here would block the preemption signal until the round finished on
    /// its own, defeating the point of `stop_farming`.
    pub async fn stop_farming(&self) {
        self.state.keep_farming.store(false, Ordering::SeqCst);
        self.state.reset_event.notify_one();

        for _ in 0..5 {
            if !self.now_farming() {
                return;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        if self.now_farming() {
            warn!(steam_id = self.account_id(), "stop_farming timed out, forcing now_farming false");
            self.state.now_farming.store(false, Ordering::SeqCst);
        }
    }

    pub fn pause(&self, sticky: bool) {
        self.state.paused.store(true, Ordering::SeqCst);
        if sticky {
            self.state.sticky_pause.store(true, Ordering::SeqCst);
        }
    }

    pub fn resume(&self, user_action: bool) {
        if self.state.sticky_pause.load(Ordering::SeqCst) && !user_action {
            return;
        }
        self.state.sticky_pause.store(false, Ordering::SeqCst);
        self.state.paused.store(false, Ordering::SeqCst);
        if !self.now_farming() {
            self.start_farming();
        }
    }

    /// Called when the platform reports a newly licensed game. Inserts it
    /// into `games_to_farm` (unless blacklisted or already tracked) and, if
    /// a complex round is already in flight, forces it to restart so the
    /// new game is weighed against the bump threshold alongside the rest.
    pub async fn on_new_game_added(&self, app_id: u32) {
        if self.config.blacklist.contains(&app_id) {
            return;
        }

        {
            let mut games = self.state.games_to_farm.lock().await;
            if games.iter().any(|g| g.app_id == app_id) {
                return;
            }
            games.push(Game::new(app_id, format!("App {app_id}"), 0.0, 1));
            sort_games(&mut games, self.config.farming_order);
        }

        if !self.now_farming() {
            self.start_farming();
            return;
        }

        if self.config.card_drops_restricted {
            self.state.replan.store(true, Ordering::SeqCst);
            self.state.reset_event.notify_one();
        }
    }

    pub fn on_new_items_notification(&self) {
        if self.now_farming() {
            self.state.reset_event.notify_one();
        }
    }

    pub fn on_disconnected(&self) {
        let farmer = self.clone();
        tokio::spawn(async move { farmer.stop_farming().await });
    }

    async fn remove_game(&self, app_id: u32) {
        let mut games = self.state.games_to_farm.lock().await;
        games.retain(|g| g.app_id != app_id);
    }

    async fn update_hours(&self, app_id: u32, hours: f32) {
        let mut games = self.state.games_to_farm.lock().await;
        if let Some(g) = games.iter_mut().find(|g| g.app_id == app_id) {
            g.hours_played = hours;
        }
    }

    /// Re-fetch `app_id`'s per-game page and refresh `cards_remaining`.
    /// `None` on fetch failure — callers treat that as "continue farming".
    async fn should_farm(&self, app_id: u32) -> Option<bool> {
        let web = self.web.clone();
        let steam_id = self.account_id();
        let fetch = crate::retry::retry_web_fetch("card_page_should_farm", move || {
            let web = web.clone();
            async move { web.fetch_card_page(steam_id, app_id).await.map_err(anyhow::Error::from) }
        })
        .await;

        match fetch {
            Ok(page) => {
                let remaining = parse_cards_remaining(&page.document);
                let mut games = self.state.games_to_farm.lock().await;
                if let Some(g) = games.iter_mut().find(|g| g.app_id == app_id) {
                    g.cards_remaining = remaining;
                }
                Some(remaining > 0)
            }
            Err(err) => {
                debug!(app_id, error = %err, "card page fetch failed, continuing");
                None
            }
        }
    }

    /// Scan every badge page, populate `games_to_farm`, and sort it per the
    /// configured order. Returns whether anything is left to farm.
    async fn is_anything_to_farm(&self) -> bool {
        let web = self.web.clone();
        let steam_id = self.account_id();
        let fetch = crate::retry::retry_web_fetch("badge_page_1", move || {
            let web = web.clone();
            async move { web.fetch_badge_page(steam_id, 1).await.map_err(anyhow::Error::from) }
        })
        .await;

        let first = match fetch {
            Ok(page) => page,
            Err(err) => {
                warn!(steam_id = self.account_id(), error = %err, "badge page 1 fetch failed");
                return false;
            }
        };

        let mut games = self.check_page(&first).await;

        if let Some(last_page) = first.last_page.filter(|&p| p > 1) {
            let fetches: Vec<_> = (2..=last_page)
                .map(|page| {
                    let web = self.web.clone();
                    let steam_id = self.account_id();
                    async move { web.fetch_badge_page(steam_id, page).await }
                })
                .collect();
            let pages = futures_util::future::join_all(fetches).await;
            for page in pages.into_iter().flatten() {
                games.extend(self.check_page(&page).await);
            }
        }

        sort_games(&mut games, self.config.farming_order);

        let mut slot = self.state.games_to_farm.lock().await;
        *slot = games;
        !slot.is_empty()
    }

    /// Extract every qualifying game from one badge page. A single malformed
    /// row is skipped without aborting the rest of the page.
    async fn check_page(&self, page: &BadgePage) -> Vec<Game> {
        let mut games = Vec::new();

        let Ok(row_selector) = Selector::parse(".badge_title_stats_content") else {
            return games;
        };

        for row in page.document.select(&row_selector) {
            let Some(app_id) = extract_app_id(&row) else { continue };
            if self.config.blacklist.contains(&app_id) {
                continue;
            }

            let row_html = row.html();
            let mut cards_remaining = extract_cards_remaining(&row_html).unwrap_or(0);

            if cards_remaining == 0 {
                if !untrusted_allowlist().contains(&app_id) {
                    continue;
                }
                match self.web.fetch_card_page(self.account_id(), app_id).await {
                    Ok(card_page) => {
                        let cards_earned = extract_cards_earned(&card_page.document.html());
                        if cards_earned > 0 {
                            continue;
                        }
                        cards_remaining = extract_cards_remaining(&card_page.document.html()).unwrap_or(0);
                    }
                    Err(_) => continue,
                }
            }

            let hours_played = extract_hours_played(&row_html).unwrap_or(0.0);
            let name = extract_name(&row_html).unwrap_or_else(|| format!("App {app_id}"));

            games.push(Game::new(app_id, name, hours_played, cards_remaining));
        }

        games
    }
}

fn extract_app_id(row: &scraper::ElementRef<'_>) -> Option<u32> {
    static ID_SELECTOR: OnceLock<Selector> = OnceLock::new();
    let selector = ID_SELECTOR.get_or_init(|| Selector::parse("[id]").unwrap());

    row.select(selector).find_map(|el| {
        let id = el.value().attr("id")?;
        id.split('_').nth(4)?.parse::<u32>().ok()
    })
}

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]+").unwrap())
}

fn float_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9.,]+").unwrap())
}

fn extract_cards_remaining(row_html: &str) -> Option<u16> {
    let fragment = Html::parse_fragment(row_html);
    let selector = Selector::parse(".progress_info_bold").ok()?;
    let text = fragment.select(&selector).next()?.text().collect::<String>();
    number_regex().find(&text)?.as_str().parse().ok()
}

fn extract_cards_earned(row_html: &str) -> u16 {
    let fragment = Html::parse_fragment(row_html);
    let Ok(selector) = Selector::parse(".card_received_count") else {
        return 0;
    };
    fragment
        .select(&selector)
        .next()
        .and_then(|el| number_regex().find(&el.text().collect::<String>()).map(|m| m.as_str().to_string()))
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

fn extract_hours_played(row_html: &str) -> Option<f32> {
    let fragment = Html::parse_fragment(row_html);
    let selector = Selector::parse(".badge_title_stats_playtime").ok()?;
    let text = fragment.select(&selector).next()?.text().collect::<String>();
    let raw = float_regex().find(&text)?.as_str().replace(',', "");
    raw.parse().ok()
}

fn extract_name(row_html: &str) -> Option<String> {
    let text: String = Html::parse_fragment(row_html)
        .root_element()
        .text()
        .collect();

    if let Some(start) = text.find(" by playing ") {
        let after = &text[start + " by playing ".len()..];
        if let Some(end) = after.rfind('.') {
            return Some(after[..end].trim().to_string());
        }
    }

    let fallback = "You don't have any more drops remaining for ";
    if let Some(start) = text.find(fallback) {
        let after = &text[start + fallback.len()..];
        if let Some(end) = after.rfind('.') {
            return Some(after[..end].trim().to_string());
        }
    }

    None
}

fn parse_cards_remaining(document: &Html) -> u16 {
    extract_cards_remaining(&document.html()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::MockWebClient;

    fn test_config() -> FarmerConfig {
        FarmerConfig {
            card_drops_restricted: false,
            blacklist: HashSet::new(),
            max_games_played_concurrently: 32,
            hours_until_card_drops: 2.0,
            farming_order: FarmingOrder::CardsRemainingAscending,
            timing: FarmingTiming {
                farming_delay: Duration::from_millis(20),
                max_farming_time: Duration::from_secs(5),
            },
        }
    }

    fn badge_row(app_id: u32, cards_remaining: u16, hours: &str, name: &str) -> String {
        format!(
            r#"<div class="badge_title_stats_content">
                <div id="badge_drop_dialog_0_{app_id}"></div>
                <div class="progress_info_bold">{cards_remaining} card drops remaining</div>
                <div class="badge_title_stats_playtime">{hours} hrs on record</div>
                <div>You have {cards_remaining} card drops remaining by playing {name}.</div>
            </div>"#
        )
    }

    #[tokio::test]
    async fn check_page_parses_a_row() {
        let row = badge_row(440, 3, "1.2", "Team Fortress 2");
        let html = format!("<html><body>{row}</body></html>");
        let web: Arc<dyn WebClient> = Arc::new(MockWebClient::new());
        let (ptx, _prx) = mpsc::unbounded_channel();
        let (stx, _srx) = mpsc::unbounded_channel();
        let farmer = CardsFarmer::new(web, ptx, stx, test_config());

        let page = BadgePage {
            document: Html::parse_document(&html),
            last_page: None,
        };
        let games = farmer.check_page(&page).await;

        assert_eq!(games.len(), 1);
        assert_eq!(games[0].app_id, 440);
        assert_eq!(games[0].cards_remaining, 3);
        assert_eq!(games[0].name, "Team Fortress 2");
        assert!((games[0].hours_played - 1.2).abs() < 0.01);
    }

    #[tokio::test]
    async fn check_page_skips_blacklisted_app() {
        let row = badge_row(303_700, 2, "0.0", "Bundle Trash");
        let html = format!("<html><body>{row}</body></html>");
        let web: Arc<dyn WebClient> = Arc::new(MockWebClient::new());
        let (ptx, _prx) = mpsc::unbounded_channel();
        let (stx, _srx) = mpsc::unbounded_channel();
        let mut config = test_config();
        config.blacklist.insert(303_700);
        let farmer = CardsFarmer::new(web, ptx, stx, config);

        let page = BadgePage {
            document: Html::parse_document(&html),
            last_page: None,
        };
        let games = farmer.check_page(&page).await;
        assert!(games.is_empty());
    }

    #[tokio::test]
    async fn check_page_skips_zero_cards_unless_untrusted() {
        let row = badge_row(12345, 0, "5.0", "Some Game");
        let html = format!("<html><body>{row}</body></html>");
        let web: Arc<dyn WebClient> = Arc::new(MockWebClient::new());
        let (ptx, _prx) = mpsc::unbounded_channel();
        let (stx, _srx) = mpsc::unbounded_channel();
        let farmer = CardsFarmer::new(web, ptx, stx, test_config());

        let page = BadgePage {
            document: Html::parse_document(&html),
            last_page: None,
        };
        let games = farmer.check_page(&page).await;
        assert!(games.is_empty());
    }

    #[tokio::test]
    async fn simple_round_farms_one_game_to_completion() {
        let row = badge_row(440, 1, "0.0", "Team Fortress 2");
        let badge_html = format!("<html><body>{row}</body></html>");
        let card_html = r#"<html><body><div class="progress_info_bold">0 card drops remaining</div></body></html>"#;

        let web = MockWebClient::new()
            .with_badge_page(1, badge_html, None)
            .with_card_page(440, card_html);
        let web: Arc<dyn WebClient> = Arc::new(web);

        let (ptx, mut prx) = mpsc::unbounded_channel();
        let (stx, mut srx) = mpsc::unbounded_channel();
        let farmer = CardsFarmer::new(web, ptx, stx, test_config());

        farmer.start_farming();

        let signal = tokio::time::timeout(Duration::from_secs(2), srx.recv()).await;
        assert!(matches!(signal, Ok(Some(FarmerSignal::FarmingFinished))));
        assert!(!farmer.now_farming());

        let mut saw_play = false;
        let mut saw_stop = false;
        while let Ok(cmd) = prx.try_recv() {
            match cmd {
                PlatformCommand::PlayGame(440) => saw_play = true,
                PlatformCommand::StopPlaying => saw_stop = true,
                _ => {}
            }
        }
        assert!(saw_play);
        assert!(saw_stop);
    }

    #[tokio::test]
    async fn stop_farming_preempts_a_long_wait() {
        let row = badge_row(440, 5, "0.0", "Team Fortress 2");
        let badge_html = format!("<html><body>{row}</body></html>");
        let web = MockWebClient::new().with_badge_page(1, badge_html, None);
        let web: Arc<dyn WebClient> = Arc::new(web);

        let (ptx, _prx) = mpsc::unbounded_channel();
        let (stx, _srx) = mpsc::unbounded_channel();
        let mut config = test_config();
        config.timing.farming_delay = Duration::from_secs(30);
        let farmer = CardsFarmer::new(web, ptx, stx, config);

        farmer.start_farming();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(farmer.now_farming());

        farmer.stop_farming().await;
        assert!(!farmer.now_farming());
    }

    #[tokio::test]
    async fn set_account_id_is_readable_back() {
        let web: Arc<dyn WebClient> = Arc::new(MockWebClient::new());
        let (ptx, _prx) = mpsc::unbounded_channel();
        let (stx, _srx) = mpsc::unbounded_channel();
        let farmer = CardsFarmer::new(web, ptx, stx, test_config());

        assert_eq!(farmer.account_id(), 0);
        farmer.set_account_id(76_561_198_000_000_123);
        assert_eq!(farmer.account_id(), 76_561_198_000_000_123);
    }

    #[tokio::test]
    async fn on_new_game_added_starts_farming_when_idle() {
        // No badge page is registered, so the triggered round's scan fails
        // and `run_round` exits immediately without touching `games_to_farm`
        // again — this only exercises the "not farming, so start" branch.
        let web: Arc<dyn WebClient> = Arc::new(MockWebClient::new());
        let (ptx, _prx) = mpsc::unbounded_channel();
        let (stx, _srx) = mpsc::unbounded_channel();
        let farmer = CardsFarmer::new(web, ptx, stx, test_config());

        farmer.on_new_game_added(440).await;

        let games = farmer.games_to_farm_snapshot().await;
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].app_id, 440);
    }

    #[tokio::test]
    async fn on_new_game_added_ignores_blacklisted_app() {
        let web: Arc<dyn WebClient> = Arc::new(MockWebClient::new());
        let (ptx, _prx) = mpsc::unbounded_channel();
        let (stx, _srx) = mpsc::unbounded_channel();
        let mut config = test_config();
        config.blacklist.insert(303_700);
        let farmer = CardsFarmer::new(web, ptx, stx, config);

        farmer.on_new_game_added(303_700).await;
        assert!(farmer.games_to_farm_snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn on_new_game_added_mid_complex_round_forces_a_replan() {
        let row_a = badge_row(440, 5, "0.0", "Team Fortress 2");
        let row_b = badge_row(570, 5, "0.0", "Dota 2");
        let badge_html = format!("<html><body>{row_a}{row_b}</body></html>");
        let web = MockWebClient::new().with_badge_page(1, badge_html, None);
        let web: Arc<dyn WebClient> = Arc::new(web);

        let (ptx, mut prx) = mpsc::unbounded_channel();
        let (stx, _srx) = mpsc::unbounded_channel();
        let mut config = test_config();
        config.card_drops_restricted = true;
        config.max_games_played_concurrently = 2;
        config.timing.farming_delay = Duration::from_secs(30);
        let farmer = CardsFarmer::new(web, ptx, stx, config);

        farmer.start_farming();
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match prx.recv().await {
                    Some(PlatformCommand::PlayGames(_)) => break,
                    Some(_) => continue,
                    None => break,
                }
            }
        })
        .await
        .expect("farm_multiple should start playing the concurrent batch");
        assert!(farmer.now_farming());

        farmer.on_new_game_added(730).await;
        assert_eq!(farmer.games_to_farm_snapshot().await.len(), 3);

        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match prx.recv().await {
                    Some(PlatformCommand::StopPlaying) => break,
                    Some(_) => continue,
                    None => break,
                }
            }
        })
        .await
        .expect("replan should stop the in-flight batch to re-select");

        farmer.stop_farming().await;
    }
}
