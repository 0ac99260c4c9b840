//! Server list rendering.

use flowdown_core::{ConnectionStatus, McpServer};

use super::tables::{format_timestamp, print_separator, truncate_string};

/// One-glyph status marker used in listings.
pub const fn status_marker(status: ConnectionStatus) -> &'static str {
    match status {
        ConnectionStatus::Connected => "●",
        ConnectionStatus::Connecting => "◐",
        ConnectionStatus::Disconnected => "○",
    }
}

/// Print servers as a table, one row per server.
pub fn print_server_table(servers: &[McpServer]) {
    println!(
        "{:<4} {:<22} {:<6} {:<8} {:<15} {:<20} Endpoint",
        "ID", "Name", "Type", "Enabled", "Status", "Last Connected"
    );
    print_separator(110);

    for server in servers {
        let status = format!(
            "{} {}",
            status_marker(server.connection_status),
            server.connection_status
        );
        println!(
            "{:<4} {:<22} {:<6} {:<8} {:<15} {:<20} {}",
            server.id,
            truncate_string(&server.name, 21),
            server.server_type.as_str(),
            if server.enabled { "yes" } else { "no" },
            status,
            format_timestamp(server.last_connected_at.as_ref(), "never"),
            truncate_string(&server.endpoint(), 40),
        );
    }
}
