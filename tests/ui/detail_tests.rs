//! Detail page UI tests - extrinsic and event pages

use super::*;
use subex::app::Route;

// ==================== Extrinsic Detail Tests ====================

#[tokio::test(start_paused = true)]
async fn test_extrinsic_detail_shows_fields() {
    let (mut app, _source) = create_test_app(true);
    app.navigate_to(Route::Extrinsic("19000000-2".to_string()));
    settle(&mut app).await;
    let buffer = render_to_buffer(&app, 120, 40);

    assert!(buffer_contains(&buffer, "Extrinsic 19000000-2"));
    assert!(buffer_contains(&buffer, "Block: 19000000"));
    assert!(buffer_contains(&buffer, "Pallet: balances"));
    assert!(buffer_contains(&buffer, "Call: transfer_keep_alive"));
    assert!(buffer_contains(&buffer, "Signed: yes"));
    assert!(buffer_contains(&buffer, "Spec Version: 1002000"));
    assert!(buffer_contains(&buffer, "Call Arguments"));
    assert!(buffer_contains(&buffer, "\"dest\""));
}

#[tokio::test(start_paused = true)]
async fn test_extrinsic_detail_lists_events() {
    let (mut app, _source) = create_test_app(true);
    app.navigate_to(Route::Extrinsic("19000000-2".to_string()));
    settle(&mut app).await;
    let buffer = render_to_buffer(&app, 120, 40);

    assert!(buffer_contains(&buffer, "Events (2)"));
    assert!(buffer_contains(&buffer, "Balances.Transfer"));
    assert!(buffer_contains(&buffer, "System.ExtrinsicSuccess"));
    assert!(!buffer_contains(&buffer, "CandidateIncluded"));

    // Enter opens the selected event
    assert!(app.open_selected());
    assert_eq!(app.route, Route::Event("19000000-4".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_extrinsic_not_found() {
    let (mut app, _source) = create_test_app(true);
    app.navigate_to(Route::Extrinsic("1000-2".to_string()));
    settle(&mut app).await;
    let buffer = render_to_buffer(&app, 120, 40);

    assert!(buffer_contains(&buffer, "Extrinsic not found"));
    assert!(buffer_contains(&buffer, "No events"));
}

#[tokio::test(start_paused = true)]
async fn test_malformed_extrinsic_id() {
    let (mut app, _source) = create_test_app(true);
    app.navigate_to(Route::Extrinsic("garbage".to_string()));
    settle(&mut app).await;
    let buffer = render_to_buffer(&app, 120, 40);

    assert!(buffer_contains(&buffer, "Extrinsic not found"));
    assert!(buffer_contains(&buffer, "Failed to load events"));
}

#[tokio::test(start_paused = true)]
async fn test_extrinsic_detail_loading() {
    let (mut app, source) = create_test_app(true);
    source.set_latency("polkadot", std::time::Duration::from_secs(5));
    app.navigate_to(Route::Extrinsic("19000000-2".to_string()));
    app.poll();
    let buffer = render_to_buffer(&app, 120, 40);

    assert!(buffer_contains(&buffer, "Loading extrinsic…"));
    assert!(buffer_contains(&buffer, "Loading events…"));
}

// ==================== Event Detail Tests ====================

#[tokio::test(start_paused = true)]
async fn test_event_detail_shows_attributes() {
    let (mut app, _source) = create_test_app(true);
    app.navigate_to(Route::Event("19000000-3".to_string()));
    settle(&mut app).await;
    let buffer = render_to_buffer(&app, 120, 40);

    assert!(buffer_contains(&buffer, "Event 19000000-3"));
    assert!(buffer_contains(&buffer, "Pallet: Balances"));
    assert!(buffer_contains(&buffer, "Event: Transfer"));
    assert!(buffer_contains(&buffer, "Extrinsic: 19000000-2"));
    assert!(buffer_contains(&buffer, "Attributes"));
    assert!(buffer_contains(&buffer, "\"amount\""));

    // Enter follows the link to the emitting extrinsic
    assert!(app.open_selected());
    assert_eq!(app.route, Route::Extrinsic("19000000-2".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_event_without_extrinsic() {
    let (mut app, _source) = create_test_app(true);
    app.navigate_to(Route::Event("19000000-5".to_string()));
    settle(&mut app).await;
    let buffer = render_to_buffer(&app, 120, 40);

    assert!(buffer_contains(&buffer, "Extrinsic: —"));
    assert!(!app.open_selected());
}

#[tokio::test(start_paused = true)]
async fn test_event_not_found() {
    let (mut app, _source) = create_test_app(true);
    app.navigate_to(Route::Event("1-1".to_string()));
    settle(&mut app).await;
    let buffer = render_to_buffer(&app, 120, 40);

    assert!(buffer_contains(&buffer, "Event not found"));
}

#[tokio::test(start_paused = true)]
async fn test_back_returns_to_list() {
    let (mut app, _source) = create_test_app(true);
    settle(&mut app).await;
    assert!(app.open_selected());
    settle(&mut app).await;

    assert!(app.go_back());
    assert_eq!(app.route, Route::Extrinsics);
    assert!(!app.go_back());
}
