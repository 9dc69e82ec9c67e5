mod product_detail;
mod product_list;

pub use product_detail::ProductDetailView;
pub use product_list::{ListContext, ProductListView};
