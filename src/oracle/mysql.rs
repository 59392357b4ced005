//! The concrete reference-engine connection: a MySQL-compatible session
//! reached over `mysql_async`.
//!
//! The adaptor itself (`super::OracleAdaptor`) never speaks a wire protocol
//! directly — it holds a narrow [`super::OracleConnection`] trait object, the
//! same way the teacher crate's `Connection` hides Oracle's TNS framing
//! behind a `query`-shaped API. This module is the one place that actually
//! talks to the reference engine.

use std::str::FromStr;

use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Opts, OptsBuilder, Value};
use rust_decimal::Decimal;

use crate::config::OracleConfig;
use crate::error::TestUserError;

use super::{OracleCell, OracleConnection, OracleOutcome, OracleResult};

fn connect_error(err: mysql_async::Error) -> TestUserError {
    TestUserError::Oracle {
        message: format!("oracle connection error: {err}"),
    }
}

/// Builds [`MysqlOracleConnection`]s against one configured reference
/// engine endpoint. Kept separate from `OracleAdaptor` so the adaptor stays
/// testable against a mock [`OracleConnection`] without a live server.
#[derive(Debug, Clone)]
pub struct MysqlOracleConnector {
    opts: Opts,
}

impl MysqlOracleConnector {
    pub fn new(config: &OracleConfig) -> Self {
        let opts = OptsBuilder::default()
            .ip_or_hostname(config.host.clone())
            .tcp_port(config.port)
            .user(Some(config.user.clone()))
            .pass(Some(config.password.clone()));
        Self { opts: opts.into() }
    }

    pub async fn connect(&self) -> Result<Box<dyn OracleConnection>, TestUserError> {
        let conn = Conn::new(self.opts.clone()).await.map_err(connect_error)?;
        Ok(Box::new(MysqlOracleConnection { conn }))
    }
}

/// One live session against the reference engine.
pub struct MysqlOracleConnection {
    conn: Conn,
}

#[async_trait]
impl OracleConnection for MysqlOracleConnection {
    async fn execute(&mut self, sql: &str) -> Result<OracleOutcome, TestUserError> {
        match self.conn.query_iter(sql).await {
            Ok(mut query_result) => {
                let columns: Vec<String> = query_result
                    .columns()
                    .map(|cols| cols.iter().map(|c| c.name_str().to_string()).collect())
                    .unwrap_or_default();

                let rows: Vec<mysql_async::Row> = query_result
                    .collect()
                    .await
                    .map_err(connect_error)?;
                let rows: Vec<Vec<OracleCell>> = rows.iter().map(row_to_cells).collect();

                Ok(OracleOutcome::Success(OracleResult { columns, rows }))
            }
            Err(mysql_async::Error::Server(server_err)) => {
                Ok(OracleOutcome::SqlError(server_err.message))
            }
            Err(other) => Err(connect_error(other)),
        }
    }

    async fn use_database(&mut self, name: &str) -> Result<(), TestUserError> {
        self.conn
            .query_drop(format!("USE `{name}`"))
            .await
            .map_err(connect_error)
    }

    async fn recreate_database(&mut self, name: &str) -> Result<(), TestUserError> {
        self.conn
            .query_drop(format!("DROP DATABASE IF EXISTS `{name}`"))
            .await
            .map_err(connect_error)?;
        self.conn
            .query_drop(format!("CREATE DATABASE `{name}`"))
            .await
            .map_err(connect_error)
    }
}

/// Render one `mysql_async::Row` into the adaptor's typed cells.
///
/// Decimals and floats arrive over the text protocol as `Value::Bytes`
/// (their ASCII representation); they are parsed straight into
/// [`rust_decimal::Decimal`] rather than through `f64`, so the round-half-up
/// rendering rule in [`super::cell`] never compounds a binary-float
/// rounding error on top of its own.
fn row_to_cells(row: &mysql_async::Row) -> Vec<OracleCell> {
    (0..row.len())
        .map(|i| value_to_cell(row.as_ref(i).cloned().unwrap_or(Value::NULL)))
        .collect()
}

fn value_to_cell(value: Value) -> OracleCell {
    match value {
        Value::NULL => OracleCell::Null,
        Value::Int(i) => OracleCell::Integer(i),
        Value::UInt(u) => OracleCell::Integer(u as i64),
        Value::Float(f) => decimal_or_text(&f.to_string()),
        Value::Double(d) => decimal_or_text(&d.to_string()),
        Value::Date(year, month, day, h, min, s, micros) if h == 0 && min == 0 && s == 0 && micros == 0 => {
            OracleCell::Date {
                year: year as i32,
                month: month as u32,
                day: day as u32,
            }
        }
        Value::Date(year, month, day, h, min, s, micros) => OracleCell::Text(format!(
            "{year:04}-{month:02}-{day:02} {h:02}:{min:02}:{s:02}.{micros:06}"
        )),
        Value::Time(neg, days, h, min, s, micros) => {
            let sign = if neg { "-" } else { "" };
            OracleCell::Text(format!(
                "{sign}{}:{min:02}:{s:02}.{micros:06}",
                u64::from(days) * 24 + u64::from(h)
            ))
        }
        Value::Bytes(bytes) => decimal_or_text(&String::from_utf8_lossy(&bytes)),
    }
}

fn decimal_or_text(text: &str) -> OracleCell {
    match Decimal::from_str(text.trim()) {
        Ok(decimal) => OracleCell::Decimal(decimal),
        Err(_) => OracleCell::Text(text.to_string()),
    }
}
