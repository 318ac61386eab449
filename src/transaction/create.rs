//! Records a single transaction, checking the balance and resolving its category.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    balance::get_balance,
    category::{CategoryTitle, find_or_create_category},
    transaction::{
        Transaction, TransactionType,
        core::{insert_transaction, validate_value},
    },
};

/// The details needed to record a transaction.
///
/// The type and category are kept as raw strings so that they are validated
/// by [create_transaction] rather than rejected during deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    /// A text description of what the transaction was for.
    pub title: String,
    /// The amount of money earned or spent.
    pub value: f64,
    /// Either "income" or "outcome".
    #[serde(rename = "type")]
    pub transaction_type: String,
    /// The title of the category, created if it does not exist yet.
    pub category: String,
}

/// Validate and save a new transaction.
///
/// Outcomes may not be larger than the current balance. An outcome equal to
/// the balance is accepted and leaves a balance of zero. The category is looked
/// up by its exact title and created if there is no match.
///
/// **Note**: If you want the category and transaction to be saved together
/// (all or nothing), pass in a transaction for `connection`.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidTransactionType] if the type is not "income" or "outcome",
/// - [Error::EmptyTransactionTitle] if the title is blank,
/// - [Error::InvalidValue] if the value is negative or not finite,
/// - [Error::EmptyCategoryTitle] if the category title is blank,
/// - [Error::InsufficientBalance] if an outcome is larger than the balance,
/// - or [Error::SqlError] if there is some SQL error.
pub fn create_transaction(
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction_type: TransactionType = new_transaction.transaction_type.parse()?;

    if new_transaction.title.trim().is_empty() {
        return Err(Error::EmptyTransactionTitle);
    }

    let value = validate_value(new_transaction.value)?;
    let category_title = CategoryTitle::new(&new_transaction.category)?;

    if transaction_type == TransactionType::Outcome {
        let balance = get_balance(connection)?;

        if to_cents(value) > to_cents(balance.total) {
            tracing::debug!(
                "Rejected outcome of {value} with a balance of {}",
                balance.total
            );
            return Err(Error::InsufficientBalance {
                balance: balance.total,
                requested: value,
            });
        }
    }

    let category = find_or_create_category(&category_title, connection)?;

    insert_transaction(
        Transaction::build(&new_transaction.title, value, transaction_type, category),
        connection,
    )
}

/// Round an amount of money to whole cents.
///
/// Sums of decimal amounts pick up floating point error, e.g. `0.3 - 0.1` is
/// slightly less than `0.2`, so balances are compared at cent precision.
fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        balance::get_balance,
        category::{CategoryTitle, count_categories, get_category_by_title},
        db::initialize,
        transaction::{NewTransaction, TransactionType, count_transactions, create_transaction},
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn new_transaction(
        title: &str,
        value: f64,
        transaction_type: &str,
        category: &str,
    ) -> NewTransaction {
        NewTransaction {
            title: title.to_owned(),
            value,
            transaction_type: transaction_type.to_owned(),
            category: category.to_owned(),
        }
    }

    #[test]
    fn creates_income() {
        let conn = get_test_connection();

        let transaction =
            create_transaction(new_transaction("Salary", 5000.0, "income", "Job"), &conn)
                .expect("Could not create transaction");

        assert!(transaction.id > 0);
        assert_eq!(transaction.title, "Salary");
        assert_eq!(transaction.value, 5000.0);
        assert_eq!(transaction.transaction_type, TransactionType::Income);
        assert_eq!(transaction.category.title.as_ref(), "Job");
    }

    #[test]
    fn rejects_invalid_type() {
        let conn = get_test_connection();

        for transaction_type in ["transfer", "Income", ""] {
            let result = create_transaction(
                new_transaction("Salary", 5000.0, transaction_type, "Job"),
                &conn,
            );

            assert_eq!(
                result,
                Err(Error::InvalidTransactionType(transaction_type.to_owned()))
            );
        }

        assert_eq!(count_transactions(&conn), Ok(0));
        assert_eq!(count_categories(&conn), Ok(0));
    }

    #[test]
    fn rejects_outcome_larger_than_balance() {
        let conn = get_test_connection();
        create_transaction(new_transaction("Salary", 100.0, "income", "Job"), &conn).unwrap();

        let result = create_transaction(new_transaction("TV", 100.01, "outcome", "Home"), &conn);

        assert_eq!(
            result,
            Err(Error::InsufficientBalance {
                balance: 100.0,
                requested: 100.01,
            })
        );
        assert_eq!(count_transactions(&conn), Ok(1));
        assert_eq!(
            get_category_by_title(&CategoryTitle::new_unchecked("Home"), &conn),
            Ok(None),
            "a rejected outcome should not create its category"
        );
    }

    #[test]
    fn accepts_outcome_equal_to_balance() {
        let conn = get_test_connection();
        create_transaction(new_transaction("Salary", 100.0, "income", "Job"), &conn).unwrap();

        let result = create_transaction(new_transaction("TV", 100.0, "outcome", "Home"), &conn);

        assert!(result.is_ok(), "want outcome accepted, got {result:?}");
        assert_eq!(get_balance(&conn).unwrap().total, 0.0);
    }

    #[test]
    fn accepts_decimal_outcome_equal_to_balance() {
        let conn = get_test_connection();
        create_transaction(new_transaction("Refund", 0.3, "income", "Shop"), &conn).unwrap();
        create_transaction(new_transaction("Gum", 0.1, "outcome", "Food"), &conn).unwrap();

        let result = create_transaction(new_transaction("Mints", 0.2, "outcome", "Food"), &conn);

        assert!(result.is_ok(), "want outcome accepted, got {result:?}");
        assert_eq!(count_transactions(&conn), Ok(3));
    }

    #[test]
    fn rejects_decimal_outcome_one_cent_over_balance() {
        let conn = get_test_connection();
        create_transaction(new_transaction("Refund", 0.3, "income", "Shop"), &conn).unwrap();
        create_transaction(new_transaction("Gum", 0.1, "outcome", "Food"), &conn).unwrap();

        let result = create_transaction(new_transaction("Mints", 0.21, "outcome", "Food"), &conn);

        assert!(
            matches!(result, Err(Error::InsufficientBalance { .. })),
            "want insufficient balance, got {result:?}"
        );
    }

    #[test]
    fn rejects_outcome_with_empty_database() {
        let conn = get_test_connection();

        let result = create_transaction(new_transaction("Lunch", 1.0, "outcome", "Food"), &conn);

        assert_eq!(
            result,
            Err(Error::InsufficientBalance {
                balance: 0.0,
                requested: 1.0,
            })
        );
    }

    #[test]
    fn creates_category_once() {
        let conn = get_test_connection();

        let first =
            create_transaction(new_transaction("Salary", 5000.0, "income", "Job"), &conn).unwrap();
        let second =
            create_transaction(new_transaction("Bonus", 500.0, "income", "Job"), &conn).unwrap();

        assert_eq!(first.category, second.category);
        assert_eq!(count_categories(&conn), Ok(1));
    }

    #[test]
    fn rejects_blank_titles() {
        let conn = get_test_connection();

        let blank_title = create_transaction(new_transaction("  ", 10.0, "income", "Job"), &conn);
        let blank_category =
            create_transaction(new_transaction("Salary", 10.0, "income", " "), &conn);

        assert_eq!(blank_title, Err(Error::EmptyTransactionTitle));
        assert_eq!(blank_category, Err(Error::EmptyCategoryTitle));
    }

    #[test]
    fn rejects_negative_value() {
        let conn = get_test_connection();

        let result = create_transaction(new_transaction("Refund", -5.0, "income", "Job"), &conn);

        assert_eq!(result, Err(Error::InvalidValue(-5.0)));
    }

    #[test]
    fn balance_tracks_sequence_of_transactions() {
        let conn = get_test_connection();
        create_transaction(new_transaction("Salary", 5000.0, "income", "Job"), &conn).unwrap();
        create_transaction(new_transaction("Lunch", 50.0, "outcome", "Food"), &conn).unwrap();
        create_transaction(new_transaction("Bonus", 300.0, "income", "Job"), &conn).unwrap();
        create_transaction(new_transaction("Rent", 1200.0, "outcome", "Home"), &conn).unwrap();

        let balance = get_balance(&conn).unwrap();

        assert_eq!(balance.income, 5300.0);
        assert_eq!(balance.outcome, 1250.0);
        assert_eq!(balance.total, 4050.0);
    }
}
