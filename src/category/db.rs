//! Database operations for categories.

use rusqlite::{Connection, OptionalExtension, Row, params_from_iter};
use time::OffsetDateTime;

use crate::{
    Error,
    category::{Category, CategoryId, CategoryTitle},
};

/// Create a category and return it with its generated ID.
pub fn create_category(title: &CategoryTitle, connection: &Connection) -> Result<Category, Error> {
    let now = OffsetDateTime::now_utc();

    connection
        .prepare(
            "INSERT INTO category (title, created_at, updated_at) VALUES (?1, ?2, ?3)
             RETURNING id, title, created_at, updated_at;",
        )?
        .query_row((title.as_ref(), now, now), map_category_row)
        .map_err(|error| error.into())
}

/// Create a category for each title in `titles` and return them in the same order.
///
/// The insert statement is prepared once and reused for every title.
pub fn create_categories(
    titles: &[CategoryTitle],
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    let now = OffsetDateTime::now_utc();
    let mut stmt = connection.prepare(
        "INSERT INTO category (title, created_at, updated_at) VALUES (?1, ?2, ?3)
         RETURNING id, title, created_at, updated_at;",
    )?;

    let mut categories = Vec::with_capacity(titles.len());

    for title in titles {
        let category = stmt.query_row((title.as_ref(), now, now), map_category_row)?;
        categories.push(category);
    }

    Ok(categories)
}

/// Retrieve a single category by ID.
#[cfg(test)]
pub fn get_category(id: CategoryId, connection: &Connection) -> Result<Category, Error> {
    connection
        .prepare("SELECT id, title, created_at, updated_at FROM category WHERE id = :id;")?
        .query_row(&[(":id", &id)], map_category_row)
        .map_err(|error| error.into())
}

/// Retrieve the category whose title exactly matches `title`, if there is one.
pub fn get_category_by_title(
    title: &CategoryTitle,
    connection: &Connection,
) -> Result<Option<Category>, Error> {
    connection
        .prepare("SELECT id, title, created_at, updated_at FROM category WHERE title = ?1;")?
        .query_row((title.as_ref(),), map_category_row)
        .optional()
        .map_err(|error| error.into())
}

/// Retrieve all categories whose title is one of `titles` using a single query.
pub fn get_categories_by_titles(
    titles: &[CategoryTitle],
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    if titles.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; titles.len()].join(", ");
    let query = format!(
        "SELECT id, title, created_at, updated_at FROM category WHERE title IN ({placeholders});"
    );

    connection
        .prepare(&query)?
        .query_map(
            params_from_iter(titles.iter().map(|title| title.as_ref())),
            map_category_row,
        )?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Get the category titled `title`, creating it if it does not exist yet.
pub fn find_or_create_category(
    title: &CategoryTitle,
    connection: &Connection,
) -> Result<Category, Error> {
    match get_category_by_title(title, connection)? {
        Some(category) => Ok(category),
        None => {
            tracing::debug!("Creating new category \"{title}\"");
            create_category(title, connection)
        }
    }
}

/// Retrieve all categories ordered alphabetically by title.
pub fn get_all_categories(connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare("SELECT id, title, created_at, updated_at FROM category ORDER BY title ASC;")?
        .query_map([], map_category_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Get the total number of categories in the database.
#[cfg(test)]
pub fn count_categories(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM category;", [], |row| row.get(0))
        .map_err(|error| error.into())
}

/// Initialize the category table.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );",
    )?;

    Ok(())
}

/// Map a database row to a [Category].
pub fn map_category_row(row: &Row) -> Result<Category, rusqlite::Error> {
    map_category_row_with_offset(row, 0)
}

/// Map a database row to a [Category], reading columns starting from `offset`.
///
/// This is useful when the category columns follow another table's columns in
/// a joined query.
pub fn map_category_row_with_offset(row: &Row, offset: usize) -> Result<Category, rusqlite::Error> {
    let id = row.get(offset)?;
    let raw_title: String = row.get(offset + 1)?;
    let title = CategoryTitle::new_unchecked(&raw_title);
    let created_at = row.get(offset + 2)?;
    let updated_at = row.get(offset + 3)?;

    Ok(Category {
        id,
        title,
        created_at,
        updated_at,
    })
}

#[cfg(test)]
mod category_query_tests {
    use std::collections::HashSet;

    use rusqlite::Connection;

    use crate::{
        Error,
        category::{
            CategoryTitle, count_categories, create_categories, create_category,
            find_or_create_category, get_all_categories, get_categories_by_titles, get_category,
            get_category_by_title,
        },
    };

    use super::create_category_table;

    fn get_test_db_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        create_category_table(&connection).expect("Could not create category table");
        connection
    }

    #[test]
    fn create_category_succeeds() {
        let connection = get_test_db_connection();
        let title = CategoryTitle::new("Terrifically a category").unwrap();

        let category = create_category(&title, &connection);

        let got_category = category.expect("Could not create category");
        assert!(got_category.id > 0);
        assert_eq!(got_category.title, title);
    }

    #[test]
    fn create_category_rejects_duplicate_title() {
        let connection = get_test_db_connection();
        let title = CategoryTitle::new_unchecked("Food");
        create_category(&title, &connection).expect("Could not create category");

        let result = create_category(&title, &connection);

        assert!(matches!(result, Err(Error::SqlError(_))));
    }

    #[test]
    fn get_category_succeeds() {
        let connection = get_test_db_connection();
        let inserted = create_category(&CategoryTitle::new_unchecked("Foo"), &connection)
            .expect("Could not create test category");

        let selected = get_category(inserted.id, &connection);

        assert_eq!(Ok(inserted), selected);
    }

    #[test]
    fn get_category_with_invalid_id_returns_not_found() {
        let connection = get_test_db_connection();
        let inserted = create_category(&CategoryTitle::new_unchecked("Foo"), &connection)
            .expect("Could not create test category");

        let selected = get_category(inserted.id + 123, &connection);

        assert_eq!(selected, Err(Error::NotFound));
    }

    #[test]
    fn get_category_by_title_returns_none_when_missing() {
        let connection = get_test_db_connection();

        let selected = get_category_by_title(&CategoryTitle::new_unchecked("Foo"), &connection);

        assert_eq!(selected, Ok(None));
    }

    #[test]
    fn get_category_by_title_is_exact_match() {
        let connection = get_test_db_connection();
        create_category(&CategoryTitle::new_unchecked("Food"), &connection).unwrap();

        let selected = get_category_by_title(&CategoryTitle::new_unchecked("food"), &connection);

        assert_eq!(selected, Ok(None));
    }

    #[test]
    fn find_or_create_reuses_existing_category() {
        let connection = get_test_db_connection();
        let title = CategoryTitle::new_unchecked("Food");

        let first = find_or_create_category(&title, &connection).unwrap();
        let second = find_or_create_category(&title, &connection).unwrap();

        assert_eq!(first, second);
        assert_eq!(count_categories(&connection), Ok(1));
    }

    #[test]
    fn get_categories_by_titles_only_returns_matches() {
        let connection = get_test_db_connection();
        let food = create_category(&CategoryTitle::new_unchecked("Food"), &connection).unwrap();
        let job = create_category(&CategoryTitle::new_unchecked("Job"), &connection).unwrap();
        create_category(&CategoryTitle::new_unchecked("Rent"), &connection).unwrap();

        let selected = get_categories_by_titles(
            &[
                CategoryTitle::new_unchecked("Food"),
                CategoryTitle::new_unchecked("Job"),
                CategoryTitle::new_unchecked("Travel"),
            ],
            &connection,
        )
        .expect("Could not get categories");

        assert_eq!(
            HashSet::from([food, job]),
            HashSet::from_iter(selected),
        );
    }

    #[test]
    fn get_categories_by_titles_with_no_titles_is_empty() {
        let connection = get_test_db_connection();
        create_category(&CategoryTitle::new_unchecked("Food"), &connection).unwrap();

        let selected = get_categories_by_titles(&[], &connection);

        assert_eq!(selected, Ok(Vec::new()));
    }

    #[test]
    fn create_categories_preserves_order() {
        let connection = get_test_db_connection();
        let titles = [
            CategoryTitle::new_unchecked("Job"),
            CategoryTitle::new_unchecked("Food"),
        ];

        let created = create_categories(&titles, &connection).expect("Could not create categories");

        let created_titles: Vec<_> = created.into_iter().map(|category| category.title).collect();
        assert_eq!(created_titles, titles);
    }

    #[test]
    fn get_all_categories_is_sorted_by_title() {
        let connection = get_test_db_connection();
        create_category(&CategoryTitle::new_unchecked("Rent"), &connection).unwrap();
        create_category(&CategoryTitle::new_unchecked("Food"), &connection).unwrap();

        let categories = get_all_categories(&connection).expect("Could not get all categories");

        let titles: Vec<_> = categories
            .iter()
            .map(|category| category.title.as_ref())
            .collect();
        assert_eq!(titles, ["Food", "Rent"]);
    }
}
