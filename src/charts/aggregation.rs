//! Transaction data aggregation for the charts page.

use std::collections::HashMap;

use time::Date;

use crate::transaction::{Transaction, TransactionKind};

/// The total spent in one category.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct CategoryTotal {
    /// The category name.
    pub name: String,
    /// The sum of expense amounts in the category.
    pub total: f64,
}

/// The income and expense totals for one month.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct MonthlyTotal {
    /// The month, as a date with the day set to 1.
    pub month: Date,
    /// The sum of income amounts in the month.
    pub income: f64,
    /// The sum of expense amounts in the month.
    pub expense: f64,
}

/// Sum expenses by category, largest first.
pub(super) fn category_totals(transactions: &[Transaction]) -> Vec<CategoryTotal> {
    let mut totals: HashMap<&str, f64> = HashMap::new();

    for transaction in transactions {
        if transaction.kind != TransactionKind::Expense {
            continue;
        }

        *totals.entry(transaction.category.as_str()).or_insert(0.0) += transaction.amount;
    }

    let mut category_totals: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(name, total)| CategoryTotal {
            name: name.to_string(),
            total,
        })
        .collect();

    // Largest first; ties broken by name so the order is stable.
    category_totals.sort_by(|a, b| {
        b.total
            .partial_cmp(&a.total)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });

    category_totals
}

/// Sum income and expenses per month, in chronological order.
pub(super) fn monthly_totals(transactions: &[Transaction]) -> Vec<MonthlyTotal> {
    let mut totals: HashMap<Date, (f64, f64)> = HashMap::new();

    for transaction in transactions {
        let month = transaction.date.replace_day(1).unwrap();
        let entry = totals.entry(month).or_insert((0.0, 0.0));

        match transaction.kind {
            TransactionKind::Income => entry.0 += transaction.amount,
            TransactionKind::Expense => entry.1 += transaction.amount,
        }
    }

    let mut monthly_totals: Vec<MonthlyTotal> = totals
        .into_iter()
        .map(|(month, (income, expense))| MonthlyTotal {
            month,
            income,
            expense,
        })
        .collect();

    monthly_totals.sort_by_key(|monthly_total| monthly_total.month);

    monthly_totals
}

/// Formats month dates as three-letter abbreviations, e.g. "Oct".
pub(super) fn format_month_label(month: Date) -> String {
    use time::Month;

    match month.month() {
        Month::January => "Jan",
        Month::February => "Feb",
        Month::March => "Mar",
        Month::April => "Apr",
        Month::May => "May",
        Month::June => "Jun",
        Month::July => "Jul",
        Month::August => "Aug",
        Month::September => "Sep",
        Month::October => "Oct",
        Month::November => "Nov",
        Month::December => "Dec",
    }
    .to_string()
}

#[cfg(test)]
mod aggregation_tests {
    use time::macros::date;

    use crate::transaction::{Transaction, TransactionKind};

    use super::{category_totals, format_month_label, monthly_totals};

    fn transaction(
        amount: f64,
        category: &str,
        date: time::Date,
        kind: TransactionKind,
    ) -> Transaction {
        Transaction {
            id: 0,
            description: "test".to_string(),
            amount,
            category: category.to_string(),
            date,
            kind,
            ai_generated: false,
        }
    }

    #[test]
    fn category_totals_sums_expenses_only() {
        let transactions = vec![
            transaction(100.0, "Alimentação", date!(2023 - 10 - 01), TransactionKind::Expense),
            transaction(50.0, "Alimentação", date!(2023 - 10 - 02), TransactionKind::Expense),
            transaction(30.0, "Lazer", date!(2023 - 10 - 03), TransactionKind::Expense),
            transaction(4500.0, "Salário", date!(2023 - 10 - 05), TransactionKind::Income),
        ];

        let totals = category_totals(&transactions);

        assert_eq!(totals.len(), 2, "income categories should be excluded");
        assert_eq!(totals[0].name, "Alimentação");
        assert_eq!(totals[0].total, 150.0);
        assert_eq!(totals[1].name, "Lazer");
    }

    #[test]
    fn category_totals_of_empty_history_is_empty() {
        assert!(category_totals(&[]).is_empty());
    }

    #[test]
    fn monthly_totals_buckets_by_month_in_order() {
        let transactions = vec![
            transaction(120.0, "Lazer", date!(2023 - 11 - 20), TransactionKind::Expense),
            transaction(4500.0, "Salário", date!(2023 - 10 - 05), TransactionKind::Income),
            transaction(850.5, "Alimentação", date!(2023 - 10 - 15), TransactionKind::Expense),
        ];

        let totals = monthly_totals(&transactions);

        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].month, date!(2023 - 10 - 01));
        assert_eq!(totals[0].income, 4500.0);
        assert_eq!(totals[0].expense, 850.5);
        assert_eq!(totals[1].month, date!(2023 - 11 - 01));
        assert_eq!(totals[1].income, 0.0);
        assert_eq!(totals[1].expense, 120.0);
    }

    #[test]
    fn month_labels_are_three_letters() {
        assert_eq!(format_month_label(date!(2023 - 10 - 01)), "Oct");
        assert_eq!(format_month_label(date!(2024 - 01 - 01)), "Jan");
    }
}
