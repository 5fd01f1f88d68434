//! List page UI tests - rows, filters, footer states, live updates

use super::*;
use std::time::Duration;
use subex::app::{Focus, Route};
use subex::filters::FilterField;
use subex::source::Extrinsic;

// ==================== Extrinsic List Tests ====================

#[tokio::test(start_paused = true)]
async fn test_extrinsic_list_shows_rows() {
    let (mut app, _source) = create_test_app(true);
    settle(&mut app).await;
    let buffer = render_to_buffer(&app, 120, 30);

    assert!(buffer_contains(&buffer, "Extrinsics (3)"));
    assert!(buffer_contains(&buffer, "19000000-2"));
    assert!(buffer_contains(&buffer, "balances.transfer_keep_alive"));
    assert!(buffer_contains(&buffer, "timestamp.set"));
    assert!(buffer_contains(&buffer, "18999999-1"));
    assert!(buffer_contains(&buffer, "2024-05-01 12:30:00"));
    assert!(buffer_contains(&buffer, "End of list"));
}

#[tokio::test(start_paused = true)]
async fn test_extrinsic_list_newest_first() {
    let (mut app, _source) = create_test_app(true);
    settle(&mut app).await;
    let content = buffer_to_string(&render_to_buffer(&app, 120, 30));

    let newest = content.find("19000000-2").unwrap();
    let middle = content.find("19000000-0").unwrap();
    let oldest = content.find("18999999-1").unwrap();
    assert!(newest < middle && middle < oldest);
}

#[tokio::test(start_paused = true)]
async fn test_loading_footer_before_first_page() {
    let (mut app, source) = create_test_app(true);
    source.set_latency("polkadot", Duration::from_secs(5));
    // Re-open so the first fetch sees the latency
    app.toggle_list();
    app.toggle_list();
    app.poll();
    let buffer = render_to_buffer(&app, 120, 30);

    assert!(buffer_contains(&buffer, "Loading…"));
    assert!(buffer_contains(&buffer, "Extrinsics (0)"));
}

#[tokio::test(start_paused = true)]
async fn test_failed_list_footer() {
    let (mut app, source) = create_test_app(true);
    source.set_failing_lists("polkadot", true);
    source.set_failing_subscriptions("polkadot", true);
    app.toggle_list();
    app.toggle_list();
    settle(&mut app).await;
    let buffer = render_to_buffer(&app, 120, 30);

    assert!(buffer_contains(&buffer, "Failed to load"));
    assert!(buffer_contains(&buffer, "live updates off"));
}

#[tokio::test(start_paused = true)]
async fn test_more_pages_footer() {
    let (mut app, source) = create_test_app(true);
    source.insert_extrinsics(
        "polkadot",
        (0..150).map(|i| Extrinsic {
            block_number: 100 + i,
            extrinsic_idx: 0,
            call_module: "system".into(),
            call_name: "remark".into(),
            ..Default::default()
        }),
    );
    app.toggle_list();
    app.toggle_list();
    settle(&mut app).await;

    let buffer = render_to_buffer(&app, 120, 30);
    assert!(buffer_contains(&buffer, "Extrinsics (100)"));
    assert!(buffer_contains(&buffer, "Press m for more"));

    assert!(app.fetch_more());
    settle(&mut app).await;
    let buffer = render_to_buffer(&app, 120, 30);
    assert!(buffer_contains(&buffer, "Extrinsics (153)"));
    assert!(buffer_contains(&buffer, "End of list"));
}

#[tokio::test(start_paused = true)]
async fn test_live_extrinsic_appears_at_top() {
    let (mut app, source) = create_test_app(true);
    settle(&mut app).await;

    source.push_extrinsic(
        "polkadot",
        Extrinsic {
            block_number: 19000001,
            extrinsic_idx: 0,
            call_module: "timestamp".into(),
            call_name: "set".into(),
            ..Default::default()
        },
    );
    app.poll();
    let content = buffer_to_string(&render_to_buffer(&app, 120, 30));

    assert!(content.contains("Extrinsics (4)"));
    assert!(content.find("19000001-0").unwrap() < content.find("19000000-2").unwrap());
}

// ==================== Filter Bar Tests ====================

#[tokio::test(start_paused = true)]
async fn test_filter_bar_shows_fields() {
    let (mut app, _source) = create_test_app(true);
    settle(&mut app).await;
    let buffer = render_to_buffer(&app, 120, 30);

    assert!(buffer_contains(&buffer, "Filters"));
    assert!(buffer_contains(&buffer, "Pallet: any"));
    assert!(buffer_contains(&buffer, "Call: any"));
    assert!(buffer_contains(&buffer, "Address: any"));
}

#[tokio::test(start_paused = true)]
async fn test_filtered_list() {
    let (mut app, _source) = create_test_app(true);
    settle(&mut app).await;

    assert!(app.set_filter(FilterField::Pallet, "balances"));
    settle(&mut app).await;
    let buffer = render_to_buffer(&app, 120, 30);

    assert!(buffer_contains(&buffer, "Pallet: balances"));
    assert!(buffer_contains(&buffer, "Extrinsics (1)"));
    assert!(!buffer_contains(&buffer, "timestamp.set"));
}

#[tokio::test(start_paused = true)]
async fn test_no_match_footer() {
    let (mut app, _source) = create_test_app(true);
    settle(&mut app).await;

    app.set_filter(FilterField::Pallet, "democracy");
    settle(&mut app).await;
    let buffer = render_to_buffer(&app, 120, 30);

    assert!(buffer_contains(&buffer, "No items match these filters"));
}

#[tokio::test(start_paused = true)]
async fn test_editing_filter_shows_input() {
    let (mut app, _source) = create_test_app(true);
    settle(&mut app).await;

    assert!(app.edit_filter(FilterField::Pallet));
    assert_eq!(app.focus, Focus::Filter(FilterField::Pallet));
    app.filter_input = app.filter_input.clone().with_value("staking".to_string());
    let buffer = render_to_buffer(&app, 120, 30);
    assert!(buffer_contains(&buffer, "Pallet: staking"));

    assert!(app.submit_filter());
    settle(&mut app).await;
    let buffer = render_to_buffer(&app, 120, 30);
    assert!(buffer_contains(&buffer, "Extrinsics (1)"));
    assert!(buffer_contains(&buffer, "staking.bond"));
}

#[tokio::test(start_paused = true)]
async fn test_filters_survive_detail_round_trip() {
    let (mut app, _source) = create_test_app(true);
    settle(&mut app).await;
    app.set_filter(FilterField::Pallet, "balances");
    settle(&mut app).await;

    assert!(app.open_selected());
    assert_eq!(app.route, Route::Extrinsic("19000000-2".to_string()));
    settle(&mut app).await;

    assert!(app.go_back());
    settle(&mut app).await;
    let buffer = render_to_buffer(&app, 120, 30);
    assert!(buffer_contains(&buffer, "Pallet: balances"));
    assert!(buffer_contains(&buffer, "Extrinsics (1)"));
}

// ==================== Event List Tests ====================

#[tokio::test(start_paused = true)]
async fn test_event_list_shows_rows() {
    let (mut app, _source) = create_test_app(true);
    app.toggle_list();
    settle(&mut app).await;
    let buffer = render_to_buffer(&app, 120, 30);

    assert!(buffer_contains(&buffer, "Events (3)"));
    assert!(buffer_contains(&buffer, "Balances.Transfer"));
    assert!(buffer_contains(&buffer, "ParaInclusion.CandidateIncluded"));
    assert!(buffer_contains(&buffer, "Pallet: any"));
    assert!(buffer_contains(&buffer, "Event: any"));
    assert!(!buffer_contains(&buffer, "Address:"));
}

#[tokio::test(start_paused = true)]
async fn test_selection_moves_highlight() {
    let (mut app, _source) = create_test_app(true);
    app.toggle_list();
    settle(&mut app).await;

    app.select_next();
    app.select_next();
    app.select_next();
    assert_eq!(app.selected_index, 2);
    assert_eq!(
        app.selected_route(),
        Some(Route::Event("19000000-3".to_string()))
    );
}
