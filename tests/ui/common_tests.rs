//! Common UI tests - header, help line, missing configuration

use super::*;
use subex::app::Route;

// ==================== Header Tests ====================

#[tokio::test(start_paused = true)]
async fn test_header_shows_network_and_token() {
    let (mut app, _source) = create_test_app(true);
    settle(&mut app).await;
    let buffer = render_to_buffer(&app, 120, 30);

    assert!(buffer_contains(&buffer, "subex"));
    assert!(buffer_contains(&buffer, "Network: polkadot (DOT)"));
    assert!(buffer_contains(&buffer, "Extrinsics"));
    assert!(buffer_contains(&buffer, "Events"));
}

#[tokio::test(start_paused = true)]
async fn test_header_follows_network_change() {
    let (mut app, _source) = create_test_app(true);
    settle(&mut app).await;

    assert_eq!(app.cycle_network(), Some("kusama".to_string()));
    settle(&mut app).await;
    let buffer = render_to_buffer(&app, 120, 30);

    assert!(buffer_contains(&buffer, "Network: kusama (KSM)"));
    // Kusama has no extrinsics in the mock source
    assert!(buffer_contains(&buffer, "Extrinsics (0)"));
}

// ==================== No Network Tests ====================

#[tokio::test(start_paused = true)]
async fn test_no_network_shows_config_hint() {
    let (mut app, source) = create_test_app(false);
    settle(&mut app).await;
    let buffer = render_to_buffer(&app, 100, 30);

    assert!(buffer_contains(&buffer, "No Network Configured"));
    assert!(buffer_contains(&buffer, "config.toml"));
    assert!(buffer_contains(&buffer, "Network: none"));
    assert!(source.list_requests().is_empty());
}

// ==================== Help Line Tests ====================

#[tokio::test(start_paused = true)]
async fn test_help_line_matches_page() {
    let (mut app, _source) = create_test_app(true);
    settle(&mut app).await;

    let buffer = render_to_buffer(&app, 140, 30);
    assert!(buffer_contains(&buffer, "m more"));
    assert!(buffer_contains(&buffer, "Esc quit"));

    app.navigate_to(Route::Extrinsic("19000000-2".to_string()));
    settle(&mut app).await;
    let buffer = render_to_buffer(&app, 140, 30);
    assert!(buffer_contains(&buffer, "b back"));
    assert!(!buffer_contains(&buffer, "m more"));
}

#[tokio::test(start_paused = true)]
async fn test_help_line_while_editing() {
    let (mut app, _source) = create_test_app(true);
    settle(&mut app).await;

    assert!(app.edit_filter(subex::filters::FilterField::Pallet));
    let buffer = render_to_buffer(&app, 120, 30);
    assert!(buffer_contains(&buffer, "Enter apply"));
    assert!(buffer_contains(&buffer, "Esc cancel"));
}

// ==================== Layout Tests ====================

#[tokio::test(start_paused = true)]
async fn test_small_terminal_does_not_panic() {
    let (mut app, _source) = create_test_app(true);
    settle(&mut app).await;

    for (width, height) in [(20, 5), (40, 10), (60, 15)] {
        let _ = render_to_buffer(&app, width, height);
    }

    app.navigate_to(Route::Event("19000000-3".to_string()));
    settle(&mut app).await;
    for (width, height) in [(20, 5), (40, 10)] {
        let _ = render_to_buffer(&app, width, height);
    }
}
