//! The fixed demo data that every collection is seeded with on first use.
//!
//! Users are not seeded; the user table starts empty and accounts are
//! created through the registration page.

use rusqlite::Connection;
use time::macros::date;

use crate::{
    Error,
    challenge::{NewChallenge, create_challenge},
    goal::{GoalIcon, NewGoal, create_goal},
    split_group::{NewSplitGroup, create_split_group},
    transaction::{NewTransaction, TransactionKind, create_transaction},
};

fn demo_transactions() -> Vec<NewTransaction> {
    vec![
        NewTransaction {
            description: "Salário Mensal".to_string(),
            amount: 4500.00,
            category: "Salário".to_string(),
            date: date!(2023 - 10 - 05),
            kind: TransactionKind::Income,
            ai_generated: false,
        },
        NewTransaction {
            description: "Supermercado Mensal".to_string(),
            amount: 850.50,
            category: "Alimentação".to_string(),
            date: date!(2023 - 10 - 15),
            kind: TransactionKind::Expense,
            ai_generated: false,
        },
        NewTransaction {
            description: "Uber para Aeroporto".to_string(),
            amount: 45.90,
            category: "Transporte".to_string(),
            date: date!(2023 - 10 - 18),
            kind: TransactionKind::Expense,
            ai_generated: false,
        },
        NewTransaction {
            description: "Freelance Design".to_string(),
            amount: 800.00,
            category: "Freelance".to_string(),
            date: date!(2023 - 10 - 19),
            kind: TransactionKind::Income,
            ai_generated: false,
        },
        NewTransaction {
            description: "Cinema com amigos".to_string(),
            amount: 120.00,
            category: "Lazer".to_string(),
            date: date!(2023 - 10 - 20),
            kind: TransactionKind::Expense,
            ai_generated: false,
        },
    ]
}

fn demo_goals() -> Vec<NewGoal> {
    vec![
        NewGoal {
            title: "iPhone 15".to_string(),
            target_amount: 5000.0,
            current_amount: 3250.0,
            deadline: Some(date!(2024 - 12 - 25)),
            icon: GoalIcon::Phone,
            color: "bg-indigo-500".to_string(),
        },
        NewGoal {
            title: "Viagem Europa".to_string(),
            target_amount: 15000.0,
            current_amount: 2100.0,
            deadline: Some(date!(2025 - 07 - 10)),
            icon: GoalIcon::Plane,
            color: "bg-sky-500".to_string(),
        },
        NewGoal {
            title: "Reserva de Emergência".to_string(),
            target_amount: 10000.0,
            current_amount: 8500.0,
            deadline: None,
            icon: GoalIcon::Shield,
            color: "bg-emerald-500".to_string(),
        },
    ]
}

fn demo_challenges() -> Vec<NewChallenge> {
    vec![
        NewChallenge {
            title: "Delivery Detox".to_string(),
            description: "Gaste R$100 a menos em delivery esta semana".to_string(),
            progress: 80,
            target: "R$ 100 economizados".to_string(),
            is_completed: false,
            reward: "+50 pts".to_string(),
        },
        NewChallenge {
            title: "Mestre da Poupança".to_string(),
            description: "Economize 5% a mais que a semana passada".to_string(),
            progress: 100,
            target: "5%".to_string(),
            is_completed: true,
            reward: "+100 pts".to_string(),
        },
        NewChallenge {
            title: "Sem Café na Rua".to_string(),
            description: "Evite pequenas compras de café por 3 dias".to_string(),
            progress: 100,
            target: "3 dias".to_string(),
            is_completed: true,
            reward: "+30 pts".to_string(),
        },
    ]
}

fn demo_split_groups() -> Vec<NewSplitGroup> {
    vec![
        NewSplitGroup {
            name: "Viagem Florianópolis".to_string(),
            total_owed_to_you: 450.00,
            total_you_owe: 0.0,
            members: vec!["Alice".to_string(), "Bob".to_string(), "Você".to_string()],
        },
        NewSplitGroup {
            name: "Churrasco Domingo".to_string(),
            total_owed_to_you: 0.0,
            total_you_owe: 120.50,
            members: vec![
                "Carlos".to_string(),
                "Diana".to_string(),
                "Edu".to_string(),
                "Você".to_string(),
            ],
        },
        NewSplitGroup {
            name: "Apartamento 302".to_string(),
            total_owed_to_you: 1200.00,
            total_you_owe: 50.00,
            members: vec!["Felipe".to_string(), "Você".to_string()],
        },
    ]
}

fn table_is_empty(table: &str, connection: &Connection) -> Result<bool, Error> {
    // `table` is always one of our own table names, never user input.
    let count: i64 = connection.query_row(
        &format!("SELECT COUNT(*) FROM \"{table}\""),
        [],
        |row| row.get(0),
    )?;

    Ok(count == 0)
}

/// Seed each empty collection with the fixed demo data.
///
/// Collections that already contain rows are left untouched, so calling
/// this on every start-up only seeds the very first one.
///
/// # Errors
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn apply_demo_seed(connection: &Connection) -> Result<(), Error> {
    if table_is_empty("transaction", connection)? {
        for new_transaction in demo_transactions() {
            create_transaction(new_transaction, connection)?;
        }
        tracing::info!("Seeded demo transactions");
    }

    if table_is_empty("goal", connection)? {
        for new_goal in demo_goals() {
            create_goal(new_goal, connection)?;
        }
        tracing::info!("Seeded demo goals");
    }

    if table_is_empty("challenge", connection)? {
        for new_challenge in demo_challenges() {
            create_challenge(new_challenge, connection)?;
        }
        tracing::info!("Seeded demo challenges");
    }

    if table_is_empty("split_group", connection)? {
        for new_split_group in demo_split_groups() {
            create_split_group(new_split_group, connection)?;
        }
        tracing::info!("Seeded demo split groups");
    }

    Ok(())
}
