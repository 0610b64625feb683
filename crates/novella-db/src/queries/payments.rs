use anyhow::Result;
use rusqlite::{Connection, Row};

use super::OptionalExt;
use super::users::query_user;
use crate::models::{TransactionRow, UserRow};
use crate::Database;

const TRANSACTION_COLUMNS: &str = "id, user_id, amount, type, status, item_id, item_type, created_at";

pub struct NewTransaction {
    pub id: String,
    pub user_id: String,
    pub amount: i64,
    pub transaction_type: String,
    pub item_id: Option<String>,
    pub item_type: Option<String>,
}

/// What a recorded payment does to the payer's account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentEffect {
    /// Add the payment amount to the wallet.
    CreditWallet,
    /// Push premium-until this many days past the later of now and the
    /// current expiry.
    ExtendPremium { days: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseOutcome {
    Purchased { wallet_coins: i64 },
    AlreadyOwned,
    InsufficientFunds { wallet_coins: i64 },
}

impl Database {
    pub fn has_purchase(&self, user_id: &str, chapter_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: bool = conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM purchases WHERE user_id = ?1 AND chapter_id = ?2)",
                (user_id, chapter_id),
                |row| row.get(0),
            )?;
            Ok(found)
        })
    }

    /// Buys a chapter with wallet coins. The balance check, the debit, the
    /// purchase record and the `CHAPTER_PURCHASE` transaction happen in one
    /// SQLite transaction.
    pub fn purchase_chapter(
        &self,
        transaction_id: &str,
        user_id: &str,
        chapter_id: &str,
        cost: i64,
    ) -> Result<PurchaseOutcome> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;

            let owned: bool = tx.query_row(
                "SELECT EXISTS (SELECT 1 FROM purchases WHERE user_id = ?1 AND chapter_id = ?2)",
                (user_id, chapter_id),
                |row| row.get(0),
            )?;
            if owned {
                return Ok(PurchaseOutcome::AlreadyOwned);
            }

            let balance: i64 = tx
                .query_row("SELECT wallet_coins FROM users WHERE id = ?1", [user_id], |row| {
                    row.get(0)
                })
                .optional()?
                .ok_or_else(|| anyhow::anyhow!("User not found: {}", user_id))?;
            if balance < cost {
                return Ok(PurchaseOutcome::InsufficientFunds { wallet_coins: balance });
            }

            tx.execute(
                "UPDATE users SET wallet_coins = wallet_coins - ?2 WHERE id = ?1",
                rusqlite::params![user_id, cost],
            )?;
            tx.execute(
                "INSERT INTO purchases (user_id, chapter_id, amount) VALUES (?1, ?2, ?3)",
                rusqlite::params![user_id, chapter_id, cost],
            )?;
            insert_transaction(
                &tx,
                &NewTransaction {
                    id: transaction_id.to_string(),
                    user_id: user_id.to_string(),
                    amount: cost,
                    transaction_type: "CHAPTER_PURCHASE".to_string(),
                    item_id: Some(chapter_id.to_string()),
                    item_type: Some("CHAPTER".to_string()),
                },
            )?;

            tx.commit()?;
            Ok(PurchaseOutcome::Purchased {
                wallet_coins: balance - cost,
            })
        })
    }

    /// Records a completed payment, applies its effect, and returns the stored
    /// transaction with the payer's updated account.
    pub fn record_payment(
        &self,
        payment: &NewTransaction,
        effect: Option<PaymentEffect>,
    ) -> Result<(TransactionRow, UserRow)> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            insert_transaction(&tx, payment)?;

            match effect {
                Some(PaymentEffect::CreditWallet) => {
                    tx.execute(
                        "UPDATE users SET wallet_coins = wallet_coins + ?2 WHERE id = ?1",
                        rusqlite::params![payment.user_id, payment.amount],
                    )?;
                }
                Some(PaymentEffect::ExtendPremium { days }) => {
                    tx.execute(
                        "UPDATE users
                         SET premium_until = datetime(
                             MAX(COALESCE(premium_until, datetime('now')), datetime('now')),
                             ?2
                         )
                         WHERE id = ?1",
                        rusqlite::params![payment.user_id, format!("+{} days", days)],
                    )?;
                }
                None => {}
            }

            let stored = query_transaction(&tx, &payment.id)?
                .ok_or_else(|| anyhow::anyhow!("Transaction vanished after insert: {}", payment.id))?;
            let user = query_user(&tx, "id", &payment.user_id)?
                .ok_or_else(|| anyhow::anyhow!("User not found: {}", payment.user_id))?;

            tx.commit()?;
            Ok((stored, user))
        })
    }

    /// A user's transactions, newest first.
    pub fn list_transactions(&self, user_id: &str) -> Result<Vec<TransactionRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {TRANSACTION_COLUMNS} FROM transactions
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_transaction)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn insert_transaction(conn: &Connection, t: &NewTransaction) -> Result<()> {
    conn.execute(
        "INSERT INTO transactions (id, user_id, amount, type, status, item_id, item_type)
         VALUES (?1, ?2, ?3, ?4, 'COMPLETED', ?5, ?6)",
        rusqlite::params![t.id, t.user_id, t.amount, t.transaction_type, t.item_id, t.item_type],
    )?;
    Ok(())
}

fn query_transaction(conn: &Connection, id: &str) -> Result<Option<TransactionRow>> {
    let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([id], map_transaction).optional()?;
    Ok(row)
}

fn map_transaction(row: &Row<'_>) -> rusqlite::Result<TransactionRow> {
    Ok(TransactionRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        amount: row.get(2)?,
        transaction_type: row.get(3)?,
        status: row.get(4)?,
        item_id: row.get(5)?,
        item_type: row.get(6)?,
        created_at: row.get(7)?,
    })
}
