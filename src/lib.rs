// Practice Console - Core Library
// Exposes all modules for use in the CLI, API server, and tests

pub mod diff;
pub mod export;
pub mod invite;
pub mod metrics;
pub mod normalize;
pub mod report;
pub mod state;
pub mod store;
pub mod tenant;

#[cfg(feature = "server")]
pub mod upstream;

// Re-export commonly used types
pub use diff::{diff_series, top_differences, DiffRow};
pub use invite::{accept_invitation, check_invitation, issue_invitation, InviteStatus};
pub use metrics::{
    derive_metrics, summarize_profit_and_loss, DerivedMetrics, PnlSummary, EXPENSE_TITLES,
    INCOME_TITLES,
};
pub use normalize::{
    column_headings, extract_line_items, extract_line_items_at, extract_summary_value,
    find_section, parse_amount, pivot_columns, ColumnSeries, LineItem,
};
pub use report::{Report, ReportCell, ReportDocument, ReportRow, RowType};
pub use state::ConsoleState;
pub use store::{
    delete_client, delete_task, get_all_clients, get_client, get_client_by_tenant,
    get_custom_fields, get_tasks_for_client, get_user_by_email, insert_client, insert_task,
    insert_user, set_custom_field, setup_database, update_client, update_task_status,
    ClientBusiness, CustomField, Task, User,
};
pub use tenant::{
    delete_connection, get_connection, upsert_connection, TenantConnection, EXPIRY_SKEW_SECONDS,
};

#[cfg(feature = "server")]
pub use tenant::RefreshLocks;
#[cfg(feature = "server")]
pub use upstream::{TokenResponse, UpstreamClient, UpstreamConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
