use cardfarm_bots::bot::{Bot, StdinPrompter};
use cardfarm_bots::command;
use cardfarm_bots::config::BotConfig;
use cardfarm_bots::platform::{MockPlatformClient, NotificationKind, PlatformEvent, PurchaseResult};
use cardfarm_bots::registry::BotRegistry;
use cardfarm_bots::throttle::ConnectThrottle;
use cardfarm_bots::web::MockWebClient;
use std::sync::Arc;
use std::time::Duration;

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

fn throttle() -> Arc<ConnectThrottle> {
    ConnectThrottle::new(Duration::from_millis(1))
}

#[tokio::test]
async fn two_inserts_of_the_same_name_yield_one_registered_bot() {
    let registry = BotRegistry::new();
    let bot_a = Bot::new(
        "botA".to_string(),
        BotConfig::default(),
        Box::new(MockPlatformClient::new()),
        Arc::new(MockWebClient::new()),
        Arc::downgrade(&registry),
        Arc::new(StdinPrompter),
        throttle(),
    );
    let bot_b = Bot::new(
        "botA".to_string(),
        BotConfig::default(),
        Box::new(MockPlatformClient::new()),
        Arc::new(MockWebClient::new()),
        Arc::downgrade(&registry),
        Arc::new(StdinPrompter),
        throttle(),
    );

    assert!(registry.insert_if_absent("botA".to_string(), bot_a));
    assert!(!registry.insert_if_absent("botA".to_string(), bot_b));
    assert_eq!(registry.count(), 1);
}

#[tokio::test]
async fn logging_on_starts_a_round_and_disconnect_preempts_it() {
    let badge_html = format!("<html><body>{}</body></html>", badge_row(440, 3, "0.0", "Team Fortress 2"));
    let web = MockWebClient::new().with_badge_page(1, badge_html, None);

    let platform = MockPlatformClient::new();
    let events = platform.sender();
    let registry = BotRegistry::new();
    let bot = Bot::new(
        "botA".to_string(),
        BotConfig::default(),
        Box::new(platform),
        Arc::new(web),
        Arc::downgrade(&registry),
        Arc::new(StdinPrompter),
        ConnectThrottle::new(Duration::from_secs(3600)),
    );
    registry.insert_if_absent("botA".to_string(), bot.clone());

    bot.start().await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    events
        .send(PlatformEvent::LoggedOn(cardfarm_bots::platform::LogOnResult::Ok(1)))
        .unwrap();

    tokio::time::timeout(Duration::from_secs(2), async {
        while !bot.farmer().now_farming() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("round should start once logged on");

    // A mid-round disconnect must preempt farming, not wait for the round
    // (which would otherwise sit on a 20-minute `farming_delay` wait).
    events.send(PlatformEvent::Disconnected).unwrap();

    tokio::time::timeout(Duration::from_secs(2), async {
        while bot.farmer().now_farming() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("disconnect should preempt the in-flight round");
}

#[tokio::test]
async fn blacklisted_app_never_enters_games_to_farm() {
    let config = BotConfig::default();
    assert!(config.blacklist.contains(&303_700));

    let badge_html = format!(
        "<html><body>{}</body></html>",
        badge_row(303_700, 5, "10.0", "Some Blacklisted Game")
    );
    let web = MockWebClient::new().with_badge_page(1, badge_html, None);

    let platform = MockPlatformClient::new();
    let registry = BotRegistry::new();
    let bot = Bot::new(
        "botA".to_string(),
        config,
        Box::new(platform),
        Arc::new(web),
        Arc::downgrade(&registry),
        Arc::new(StdinPrompter),
        throttle(),
    );

    bot.farmer().start_farming();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(bot.farmer().games_to_farm_snapshot().await.is_empty());
}

#[tokio::test]
async fn redeem_with_reply_resolves_via_purchase_response() {
    let platform = MockPlatformClient::new();
    let events = platform.sender();
    let registry = BotRegistry::new();
    let bot = Bot::new(
        "botA".to_string(),
        BotConfig::default(),
        Box::new(platform),
        Arc::new(MockWebClient::new()),
        Arc::downgrade(&registry),
        Arc::new(StdinPrompter),
        throttle(),
    );
    registry.insert_if_absent("botA".to_string(), bot.clone());

    let redeem_task = tokio::spawn({
        let bot = bot.clone();
        async move { command::purchase_result_async(&bot, "ABCDE-FGHIJ-KLMNO").await }
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    events
        .send(PlatformEvent::PurchaseResponse(PurchaseResult {
            ok: true,
            items: vec!["Pack".to_string()],
        }))
        .unwrap();

    let result = tokio::time::timeout(Duration::from_secs(2), redeem_task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert!(result.ok);
    assert_eq!(result.summarize(), "Status: Ok | Items: Pack");
}

#[tokio::test]
async fn new_license_notification_starts_farming_on_an_idle_bot() {
    let platform = MockPlatformClient::new();
    let events = platform.sender();
    let registry = BotRegistry::new();
    let bot = Bot::new(
        "botA".to_string(),
        BotConfig::default(),
        Box::new(platform),
        Arc::new(MockWebClient::new()),
        Arc::downgrade(&registry),
        Arc::new(StdinPrompter),
        throttle(),
    );

    events
        .send(PlatformEvent::Notification(NotificationKind::NewLicense(440)))
        .unwrap();

    tokio::time::timeout(Duration::from_secs(2), async {
        while bot.farmer().games_to_farm_snapshot().await.is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("a newly licensed game should be tracked");

    let games = bot.farmer().games_to_farm_snapshot().await;
    assert_eq!(games.len(), 1);
    assert_eq!(games[0].app_id, 440);
}

#[tokio::test]
async fn stop_farming_preempts_a_long_running_round() {
    let badge_html = format!("<html><body>{}</body></html>", badge_row(440, 5, "0.0", "Team Fortress 2"));
    let web = MockWebClient::new().with_badge_page(1, badge_html, None);

    let registry = BotRegistry::new();
    let bot = Bot::new(
        "botA".to_string(),
        BotConfig::default(),
        Box::new(MockPlatformClient::new()),
        Arc::new(web),
        Arc::downgrade(&registry),
        Arc::new(StdinPrompter),
        throttle(),
    );

    bot.farmer().start_farming();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(bot.farmer().now_farming());

    bot.farmer().stop_farming().await;
    assert!(!bot.farmer().now_farming());
}
