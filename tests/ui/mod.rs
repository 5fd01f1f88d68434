//! UI rendering tests for subex
//!
//! These tests render the app into a test backend and search the buffer for
//! expected text. Run with: cargo test --test ui_tests

pub mod common_tests;
pub mod detail_tests;
pub mod list_tests;

use std::sync::Arc;
use std::time::Duration;

use subex::app::App;
use subex::config::{Config, NetworkConfig};
use subex::source::memory::MemorySource;
use subex::source::{Event, Extrinsic};
use subex::ui::draw;

use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};
use serde_json::json;

// ==================== Test Data Builders ====================

pub fn mock_config() -> Config {
    Config {
        default_network: Some("polkadot".to_string()),
        networks: vec![
            NetworkConfig {
                name: "polkadot".to_string(),
                api_url: "http://localhost:3000/polkadot".to_string(),
                spec_name: Some("polkadot".to_string()),
                ss58_format: 0,
                token_symbol: "DOT".to_string(),
                token_decimals: 10,
            },
            NetworkConfig {
                name: "kusama".to_string(),
                api_url: "http://localhost:3000/kusama".to_string(),
                spec_name: Some("kusama".to_string()),
                ss58_format: 2,
                token_symbol: "KSM".to_string(),
                token_decimals: 12,
            },
        ],
        ..Default::default()
    }
}

pub fn mock_config_no_networks() -> Config {
    Config::default()
}

pub fn mock_extrinsics() -> Vec<Extrinsic> {
    vec![
        Extrinsic {
            block_number: 19000000,
            extrinsic_idx: 0,
            hash: Some(
                "0xaaaa111122223333444455556666777788889999aaaabbbbccccddddeeeeffff".to_string(),
            ),
            call_module: "timestamp".to_string(),
            call_name: "set".to_string(),
            signed: 0,
            call_arguments: Some(json!({ "now": 1700000000000u64 })),
            block_datetime: Some("2024-05-01T12:30:00+00:00".to_string()),
            spec_version: Some(1002000),
            ..Default::default()
        },
        Extrinsic {
            block_number: 19000000,
            extrinsic_idx: 2,
            hash: Some(
                "0xbbbb111122223333444455556666777788889999aaaabbbbccccddddeeeeffff".to_string(),
            ),
            call_module: "balances".to_string(),
            call_name: "transfer_keep_alive".to_string(),
            signed: 1,
            multi_address_account_id: Some(
                "0xd43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d".to_string(),
            ),
            call_arguments: Some(json!({ "dest": "0x8eaf", "value": "2500000000" })),
            block_datetime: Some("2024-05-01T12:30:00+00:00".to_string()),
            spec_version: Some(1002000),
        },
        Extrinsic {
            block_number: 18999999,
            extrinsic_idx: 1,
            call_module: "staking".to_string(),
            call_name: "bond".to_string(),
            signed: 1,
            block_datetime: Some("2024-05-01T12:29:54+00:00".to_string()),
            ..Default::default()
        },
    ]
}

pub fn mock_events() -> Vec<Event> {
    vec![
        Event {
            block_number: 19000000,
            event_idx: 3,
            extrinsic_idx: Some(2),
            event_module: "Balances".to_string(),
            event_name: "Transfer".to_string(),
            attributes: Some(json!({ "from": "0xd435", "to": "0x8eaf", "amount": "2500000000" })),
            block_datetime: Some("2024-05-01T12:30:00+00:00".to_string()),
            spec_version: Some(1002000),
        },
        Event {
            block_number: 19000000,
            event_idx: 4,
            extrinsic_idx: Some(2),
            event_module: "System".to_string(),
            event_name: "ExtrinsicSuccess".to_string(),
            block_datetime: Some("2024-05-01T12:30:00+00:00".to_string()),
            ..Default::default()
        },
        Event {
            block_number: 19000000,
            event_idx: 5,
            extrinsic_idx: None,
            event_module: "ParaInclusion".to_string(),
            event_name: "CandidateIncluded".to_string(),
            ..Default::default()
        },
    ]
}

pub fn mock_source() -> MemorySource {
    let source = MemorySource::new();
    for network in ["polkadot", "kusama"] {
        source.add_network(network);
    }
    source.insert_extrinsics("polkadot", mock_extrinsics());
    source.insert_events("polkadot", mock_events());
    source
}

/// Build the app on `mock_source`. Must run inside a tokio runtime.
pub fn create_test_app(with_networks: bool) -> (App<MemorySource>, MemorySource) {
    let config = if with_networks {
        mock_config()
    } else {
        mock_config_no_networks()
    };
    let source = mock_source();
    let app = App::new(config, Arc::new(source.clone()));
    (app, source)
}

/// Let spawned work finish and apply it to the app
pub async fn settle(app: &mut App<MemorySource>) {
    for _ in 0..5 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        app.poll();
    }
}

// ==================== Helper Functions ====================

/// Render the app to a buffer and return it
pub fn render_to_buffer(app: &App<MemorySource>, width: u16, height: u16) -> Buffer {
    let backend = TestBackend::new(width, height);
    let mut terminal = Terminal::new(backend).unwrap();

    terminal
        .draw(|frame| {
            draw(frame, app);
        })
        .unwrap();

    terminal.backend().buffer().clone()
}

/// Check if buffer contains a specific string anywhere
pub fn buffer_contains(buffer: &Buffer, needle: &str) -> bool {
    let content = buffer_to_string(buffer);
    content.contains(needle)
}

/// Convert buffer to a single string for searching
pub fn buffer_to_string(buffer: &Buffer) -> String {
    let mut content = String::new();
    for y in 0..buffer.area.height {
        for x in 0..buffer.area.width {
            content.push(
                buffer
                    .cell((x, y))
                    .map(|c| c.symbol().chars().next().unwrap_or(' '))
                    .unwrap_or(' '),
            );
        }
        content.push('\n');
    }
    content
}

/// Get a specific line from the buffer
#[allow(dead_code)]
pub fn buffer_line(buffer: &Buffer, y: u16) -> String {
    let mut line = String::new();
    for x in 0..buffer.area.width {
        if let Some(cell) = buffer.cell((x, y)) {
            line.push_str(cell.symbol());
        }
    }
    line.trim_end().to_string()
}

/// Print buffer for debugging
#[allow(dead_code)]
pub fn print_buffer(buffer: &Buffer) {
    for y in 0..buffer.area.height {
        println!("{}", buffer_line(buffer, y));
    }
}
