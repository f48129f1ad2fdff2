//! The transaction history: models, queries, the transactions page and the
//! endpoints for manual and natural-language entry.

mod core;
mod page;
mod quick_add;

pub use self::core::{
    NewTransaction, Transaction, TransactionId, TransactionKind, count_transactions,
    create_transaction, create_transaction_table, get_transactions,
};
pub use page::{TransactionsPageState, create_transaction_endpoint, get_transactions_page};
pub use quick_add::{QuickAddState, get_financial_advice, quick_add_transaction_endpoint};
