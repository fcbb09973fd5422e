pub mod footer;
pub mod header;
pub mod panels;
pub mod utils;

pub use footer::draw_footer;
pub use header::draw_header;
pub use panels::draw_state_panel;
pub use utils::{cache_badge, ensure_valid_selection, format_amount, format_date, truncate};
