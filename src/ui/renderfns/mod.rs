pub mod footer;
pub mod header;
pub mod utils;

pub use footer::{draw_footer, NoticeLevel};
pub use header::draw_header;
pub use utils::{format_price, status_color, stock_color, truncate};
