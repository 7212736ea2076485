//! Integration test for a signed-in member.
//!
//! The member asks the chat assistant for glass nearby, follows the reply's
//! button into the marketplace, then scans a batch of plastic and lists it.

use std::{sync::Arc, time::Duration};

use testresult::TestResult;

use wastelink::{chat::greeting, fixtures, prelude::*};

fn chat_for(access: &Access, settings: &Settings) -> ChatSession {
    ChatSession::new(
        access.mode(),
        Arc::new(CannedResponder),
        settings.sentence_limit,
        settings.timings.response_delay(),
        settings.timings.typing_interval(),
    )
}

#[tokio::test(start_paused = true)]
async fn glass_question_leads_to_the_marketplace() -> TestResult {
    let settings = Settings::default();
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let mut auth = AuthSession::start(Arc::clone(&store))?;

    auth.login(User::new("Grace Wanjiku"))?;

    let chat = chat_for(auth.access(), &settings);

    chat.toggle_panel().await;

    let reply = chat.send("I'm looking for glass bottles near me").await?;

    assert_eq!(reply.author, Author::Bot);
    assert!(reply.text.ends_with("view it in the marketplace."), "full reply is kept");

    let navigation = match &reply.action {
        Some(action) => chat.activate(action).await,
        None => Navigation::Marketplace(MarketplaceQuery::default()),
    };

    let Navigation::Marketplace(query) = navigation;

    assert!(!chat.is_open().await, "following a button closes the panel");
    assert_eq!(query.to_string(), "search=glass&location=Kenya");

    let market = Marketplace::new(fixtures::catalog()?, &store)?;
    let found: Vec<_> = market
        .filter(&query)
        .into_iter()
        .map(|listing| listing.id.to_string())
        .collect();

    assert_eq!(found, ["6"]);

    let transcript = chat.transcript().await;

    assert_eq!(
        transcript.first().map(|message| message.text.as_str()),
        Some(greeting(AccessMode::Member))
    );

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn guests_are_limited_to_presets() -> TestResult {
    let settings = Settings::default();
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let auth = AuthSession::start(store)?;
    let chat = chat_for(auth.access(), &settings);

    let preset = chat.send("How does the AI scanner work?").await?;
    let other = chat.send("How do I price my waste materials?").await?;

    let again = chat.send("How does the AI scanner work?").await?;

    assert!(preset.text.contains("94% accuracy"), "preset question is answered");
    assert!(other.text.starts_with("Sorry, as a guest"), "other questions are refused");
    assert_eq!(again.text, preset.text, "same answer later in the conversation");
    assert!(matches!(chat.send("   ").await, Err(ChatError::Empty)));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn scanned_listing_appears_first_until_next_session() -> TestResult {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let mut auth = AuthSession::start(Arc::clone(&store))?;
    let scanner = Scanner::new(Duration::from_secs(2));

    let request = ScanRequest {
        image: Some("hdpe.jpg".to_string()),
        quantity: "250".to_string(),
        unit: Unit::Kg,
        description: None,
    };

    assert!(matches!(
        scanner.analyze(auth.access(), &request).await,
        Err(ScanError::GuestAccess)
    ));

    auth.login(User::new("Grace Wanjiku"))?;

    let result = scanner.analyze(auth.access(), &request).await?;
    let listing = scanner.publish_listing(auth.access(), &request, &result, &store)?;

    assert_eq!(listing.title, "HDPE, Polypropylene - Grade A");
    assert!(listing.id.as_str().starts_with("user-"), "generated id");

    let market = Marketplace::new(fixtures::catalog()?, &store)?;

    assert_eq!(market.listings().first().map(|first| &first.id), Some(&listing.id));

    AuthSession::start(Arc::clone(&store))?;

    let market = Marketplace::new(fixtures::catalog()?, &store)?;

    assert!(
        market.listings().iter().all(|entry| !entry.own_listing),
        "a new session clears the scanned listing"
    );

    Ok(())
}
