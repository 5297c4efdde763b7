//! Filtering, sorting and pagination of the ticket list, the technician
//! chat inbox and the bitácora. Everything here is pure: callers load the
//! records and pass the "today"/offset pair explicitly.

pub mod audit;
pub mod chat;
pub mod paging;
pub mod range;
pub mod tickets;

use chrono::{FixedOffset, NaiveDate, Utc};

pub use audit::{distinct_keywords, distinct_users, entries_for_export, filter_audit, AuditFilter};
pub use chat::{build_inbox, summarize_chat, unread_count, ChatSummary, InboxEntry};
pub use paging::{clamp_page, page_slice, PageInfo};
pub use range::{resolve_quick_range, resolve_window, to_local, DateWindow, QuickRange};
pub use tickets::{
    build_ticket_view, compare_tickets, count_by_status, filter_tickets, rank_departments,
    sort_tickets, DepartmentCount, SearchField, StatusCounters, TicketFilter, TicketListView,
};

/// Local calendar context used to resolve relative date windows.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext {
    pub today: NaiveDate,
    pub offset: FixedOffset,
}

impl FilterContext {
    /// Today's date at the given offset.
    pub fn now(offset: FixedOffset) -> Self {
        FilterContext {
            today: Utc::now().with_timezone(&offset).date_naive(),
            offset,
        }
    }
}
