//! Transactions on the dedicated connection
//!
//! BEGIN, the callback, and COMMIT/ROLLBACK all run on the same unpooled
//! session while the service's transaction lock is held, so two callers can
//! never interleave their statements.
//!
//! A caller whose future is dropped between BEGIN and COMMIT leaves the
//! session inside a transaction. The session remembers that, and the next
//! caller rolls the abandoned work back before issuing its own BEGIN.

use futures::future::BoxFuture;
use serde_json::Value;

use super::error::DbError;
use super::executor::{Executor, Row};
use super::service::DatabaseService;

/// The dedicated connection plus whether a transaction is still open on it.
pub(super) struct Session {
    executor: Box<dyn Executor>,
    open: bool,
}

impl Session {
    pub(super) fn new(executor: Box<dyn Executor>) -> Self {
        Self {
            executor,
            open: false,
        }
    }

    async fn discard_abandoned(&mut self) -> Result<(), DbError> {
        if self.open {
            tracing::warn!("previous transaction was abandoned; rolling it back");
            self.executor.execute("ROLLBACK", &[]).await?;
            self.open = false;
        }
        Ok(())
    }
}

/// Handle passed to a transaction callback, bound to the dedicated connection.
pub struct Transaction<'a> {
    executor: &'a dyn Executor,
}

impl Transaction<'_> {
    pub async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DbError> {
        self.executor.execute(sql, params).await
    }

    pub async fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, DbError> {
        Ok(self.query(sql, params).await?.into_iter().next())
    }
}

impl DatabaseService {
    /// Run `callback` inside BEGIN ... COMMIT on the unpooled connection.
    ///
    /// If the callback (or BEGIN/COMMIT) fails, ROLLBACK is issued and the
    /// original error is returned unchanged. A failed ROLLBACK is logged and
    /// does not replace it.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let id = db
    ///     .run_in_transaction(|tx| {
    ///         Box::pin(async move {
    ///             let row = tx.query_one("INSERT INTO t (v) VALUES ($1) RETURNING id", &[v]).await?;
    ///             Ok(row)
    ///         })
    ///     })
    ///     .await?;
    /// ```
    pub async fn run_in_transaction<T, F>(&self, callback: F) -> Result<T, DbError>
    where
        T: Send,
        F: for<'t> FnOnce(&'t Transaction<'t>) -> BoxFuture<'t, Result<T, DbError>> + Send,
    {
        let unpooled = self.unpooled.as_ref().ok_or_else(|| {
            DbError::Configuration("unpooled connection not available".into())
        })?;

        let mut session = unpooled.lock().await;
        session.discard_abandoned().await?;

        // Stays set if this future is dropped before COMMIT/ROLLBACK returns.
        session.open = true;
        let tx = Transaction {
            executor: &*session.executor,
        };

        let outcome = match tx.query("BEGIN", &[]).await {
            Ok(_) => match callback(&tx).await {
                Ok(value) => tx.query("COMMIT", &[]).await.map(|_| value),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        match outcome {
            Ok(value) => {
                session.open = false;
                tracing::debug!("transaction committed");
                Ok(value)
            }
            Err(e) => {
                match tx.query("ROLLBACK", &[]).await {
                    Ok(_) => session.open = false,
                    Err(rollback) => tracing::warn!(error = %rollback, "rollback failed"),
                }
                tracing::debug!(error = %e, "transaction rolled back");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{rows, ScriptedExecutor};
    use futures::FutureExt;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn terminals(exec: &ScriptedExecutor) -> Vec<String> {
        exec.statements()
            .into_iter()
            .filter(|s| s == "COMMIT" || s == "ROLLBACK")
            .collect()
    }

    fn service_with(unpooled: Arc<ScriptedExecutor>) -> DatabaseService {
        DatabaseService::new(ScriptedExecutor::failing("pooled connection must not be used"))
            .with_unpooled(unpooled)
    }

    #[tokio::test]
    async fn requires_unpooled_connection() {
        let db = DatabaseService::new(ScriptedExecutor::new(|_, _| Ok(Vec::new())));

        let err = db
            .run_in_transaction(|_tx| Box::pin(async { Ok(()) }))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            DbError::Configuration("unpooled connection not available".into())
        );
    }

    #[tokio::test]
    async fn commits_and_returns_callback_value() {
        let exec = ScriptedExecutor::new(|sql, _| {
            if sql.starts_with("INSERT") {
                Ok(rows(json!([{ "id": 42 }])))
            } else {
                Ok(Vec::new())
            }
        });
        let db = service_with(exec.clone());

        let id = db
            .run_in_transaction(|tx| {
                Box::pin(async move {
                    let row = tx
                        .query_one("INSERT INTO users (name) VALUES ($1) RETURNING id", &[json!("a")])
                        .await?;
                    Ok(row.and_then(|r| r.get("id").and_then(Value::as_i64)))
                })
            })
            .await
            .unwrap();

        assert_eq!(id, Some(42));
        assert_eq!(
            exec.statements(),
            vec![
                "BEGIN",
                "INSERT INTO users (name) VALUES ($1) RETURNING id",
                "COMMIT"
            ]
        );
    }

    #[tokio::test]
    async fn callback_error_rolls_back_and_is_returned_unchanged() {
        let exec = ScriptedExecutor::new(|_, _| Ok(Vec::new()));
        let db = service_with(exec.clone());

        let err = db
            .run_in_transaction(|tx| {
                Box::pin(async move {
                    tx.query("INSERT INTO users (name) VALUES ('partial')", &[]).await?;
                    Err::<(), _>(DbError::NotFound {
                        resource: "user",
                        id: "7".into(),
                    })
                })
            })
            .await
            .unwrap_err();

        assert_eq!(
            err,
            DbError::NotFound {
                resource: "user",
                id: "7".into()
            }
        );
        assert_eq!(terminals(&exec), vec!["ROLLBACK"]);
    }

    #[tokio::test]
    async fn failed_statement_inside_callback_rolls_back() {
        let exec = ScriptedExecutor::new(|sql, _| {
            if sql.starts_with("UPDATE") {
                Err(DbError::query("violates check constraint"))
            } else {
                Ok(Vec::new())
            }
        });
        let db = service_with(exec.clone());

        let err = db
            .run_in_transaction(|tx| {
                Box::pin(async move {
                    tx.query("INSERT INTO a VALUES (1)", &[]).await?;
                    tx.query("UPDATE a SET v = -1", &[]).await?;
                    Ok(())
                })
            })
            .await
            .unwrap_err();

        assert_eq!(err, DbError::query("violates check constraint"));
        assert_eq!(
            exec.statements(),
            vec!["BEGIN", "INSERT INTO a VALUES (1)", "UPDATE a SET v = -1", "ROLLBACK"]
        );
    }

    #[tokio::test]
    async fn commit_failure_rolls_back() {
        let exec = ScriptedExecutor::new(|sql, _| {
            if sql == "COMMIT" {
                Err(DbError::query("could not serialize access"))
            } else {
                Ok(Vec::new())
            }
        });
        let db = service_with(exec.clone());

        let err = db
            .run_in_transaction(|_tx| Box::pin(async { Ok(1) }))
            .await
            .unwrap_err();

        assert_eq!(err, DbError::query("could not serialize access"));
        assert_eq!(exec.statements().last().map(String::as_str), Some("ROLLBACK"));
    }

    #[tokio::test]
    async fn rollback_failure_keeps_original_error() {
        let exec = ScriptedExecutor::new(|sql, _| {
            if sql == "ROLLBACK" {
                Err(DbError::query("connection reset"))
            } else {
                Ok(Vec::new())
            }
        });
        let db = service_with(exec);

        let err = db
            .run_in_transaction(|_tx| {
                Box::pin(async { Err::<(), _>(DbError::query("boom")) })
            })
            .await
            .unwrap_err();

        assert_eq!(err, DbError::query("boom"));
    }

    #[tokio::test]
    async fn concurrent_transactions_do_not_interleave() {
        let exec = ScriptedExecutor::new(|_, _| Ok(Vec::new()));
        let db = Arc::new(service_with(exec.clone()));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let db = db.clone();
                tokio::spawn(async move {
                    db.run_in_transaction(move |tx| {
                        Box::pin(async move {
                            tx.query(&format!("INSERT {}", i), &[]).await?;
                            tokio::task::yield_now().await;
                            tx.query(&format!("INSERT {}", i), &[]).await?;
                            Ok(())
                        })
                    })
                    .await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // Every BEGIN is followed by its own two statements and a COMMIT.
        let statements = exec.statements();
        assert_eq!(statements.len(), 16);
        for chunk in statements.chunks(4) {
            assert_eq!(chunk[0], "BEGIN");
            assert_eq!(chunk[1], chunk[2]);
            assert_eq!(chunk[3], "COMMIT");
        }
    }

    #[tokio::test]
    async fn dropped_transaction_is_rolled_back_before_next_begin() {
        let exec = ScriptedExecutor::new(|_, _| Ok(Vec::new()));
        let db = service_with(exec.clone());

        // Poll once: BEGIN and the INSERT run, then the callback parks and the
        // future is dropped without reaching COMMIT.
        let abandoned = db
            .run_in_transaction(|tx| {
                Box::pin(async move {
                    tx.query("INSERT INTO users (name) VALUES ('abandoned')", &[]).await?;
                    futures::future::pending::<()>().await;
                    Ok(())
                })
            })
            .now_or_never();
        assert!(abandoned.is_none());

        db.run_in_transaction(|tx| {
            Box::pin(async move {
                tx.query("SELECT 1", &[]).await?;
                Ok(())
            })
        })
        .await
        .unwrap();

        assert_eq!(
            exec.statements(),
            vec![
                "BEGIN",
                "INSERT INTO users (name) VALUES ('abandoned')",
                "ROLLBACK",
                "BEGIN",
                "SELECT 1",
                "COMMIT"
            ]
        );
    }

    #[tokio::test]
    async fn completed_transactions_skip_the_extra_rollback() {
        let exec = ScriptedExecutor::new(|_, _| Ok(Vec::new()));
        let db = service_with(exec.clone());

        for _ in 0..2 {
            db.run_in_transaction(|_tx| Box::pin(async { Ok(()) }))
                .await
                .unwrap();
        }

        assert_eq!(exec.statements(), vec!["BEGIN", "COMMIT", "BEGIN", "COMMIT"]);
    }

    #[tokio::test]
    async fn failed_rollback_is_retried_by_the_next_caller() {
        let exec = ScriptedExecutor::new(|sql, _| {
            if sql == "ROLLBACK" {
                Err(DbError::query("connection reset"))
            } else {
                Ok(Vec::new())
            }
        });
        let db = service_with(exec.clone());

        db.run_in_transaction(|_tx| Box::pin(async { Err::<(), _>(DbError::query("boom")) }))
            .await
            .unwrap_err();
        let err = db
            .run_in_transaction(|_tx| Box::pin(async { Ok(()) }))
            .await
            .unwrap_err();

        // the session is still dirty, so no new BEGIN is sent
        assert_eq!(err, DbError::query("connection reset"));
        assert_eq!(exec.statements(), vec!["BEGIN", "ROLLBACK", "ROLLBACK"]);
    }

    // Integration tests require a real database
    // Run with: DATABASE_URL=postgres://... cargo test -p tablegate-server -- --ignored

    #[tokio::test]
    #[ignore = "requires database"]
    async fn abandoned_work_is_never_committed() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.expect("pool creation failed");
        let dedicated = crate::db::DedicatedConnection::connect(&url)
            .await
            .expect("connect failed");
        let db = DatabaseService::new(pool).with_unpooled(dedicated);

        db.run_in_transaction(|tx| {
            Box::pin(async move {
                tx.query("CREATE TEMP TABLE tablegate_abandoned (v int4)", &[])
                    .await?;
                Ok(())
            })
        })
        .await
        .unwrap();

        let timed_out = tokio::time::timeout(
            Duration::from_secs(2),
            db.run_in_transaction(|tx| {
                Box::pin(async move {
                    tx.query("INSERT INTO tablegate_abandoned VALUES (1)", &[]).await?;
                    futures::future::pending::<()>().await;
                    Ok(())
                })
            }),
        )
        .await;
        assert!(timed_out.is_err());

        let count = db
            .run_in_transaction(|tx| {
                Box::pin(async move {
                    tx.query_one("SELECT COUNT(*)::int4 AS n FROM tablegate_abandoned", &[])
                        .await
                })
            })
            .await
            .unwrap();

        assert_eq!(count.and_then(|row| row.get("n").and_then(Value::as_i64)), Some(0));
    }
}
