//! Categories for grouping transactions.

mod db;
mod domain;
mod list;

pub use db::{
    create_categories, create_category_table, find_or_create_category, get_all_categories,
    get_categories_by_titles, map_category_row_with_offset,
};
pub use domain::{Category, CategoryId, CategoryTitle};
pub use list::list_categories_endpoint;

#[cfg(test)]
pub use db::{count_categories, create_category, get_category, get_category_by_title};
