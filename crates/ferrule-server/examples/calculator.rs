//! # Calculator Server
//!
//! A small JSON-RPC service exposing arithmetic and a running memory register.
//!
//! ## Usage
//! ```bash
//! # Start server on default port (8000)
//! cargo run --example calculator
//!
//! # Persistent, newline-delimited connections instead of one request per connection
//! cargo run --example calculator -- --line-delimited
//! ```
//!
//! ## Try it
//! ```bash
//! echo '{"method":"add","params":{"a":1,"b":2}}' | nc -q1 127.0.0.1 8000
//! echo '{"method":"subtract","params":{"a":5}}' | nc -q1 127.0.0.1 8000
//! ```

use std::net::SocketAddr;

use anyhow::Result;
use clap::Parser;
use ferrule_server::prelude::*;
use thiserror::Error;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1:8000")]
    bind: SocketAddr,

    /// Keep connections open and read one request per line
    #[arg(long, default_value = "false")]
    line_delimited: bool,

    /// Do not answer requests that carry no `id`
    #[arg(long, default_value = "false")]
    strict: bool,
}

#[derive(Debug, Error, RpcError)]
#[error("division by zero")]
#[rpc_error(code = 100)]
struct DivisionByZero;

#[derive(Debug, Error, RpcError)]
#[error("result does not fit in a 64-bit integer")]
#[rpc_error(code = 102, message = "integer overflow")]
struct IntegerOverflow;

#[derive(Debug, Error, RpcError)]
#[error("memory would overflow")]
#[rpc_error(code = 101, message = "memory overflow")]
struct MemoryOverflow;

#[derive(Default)]
struct Calculator {
    memory: i64,
}

#[rpc_service(errors(DivisionByZero, MemoryOverflow, IntegerOverflow))]
impl Calculator {
    #[rpc_method]
    pub fn add(&self, a: i64, b: i64) -> Result<i64, IntegerOverflow> {
        a.checked_add(b).ok_or(IntegerOverflow)
    }

    #[rpc_method]
    pub fn subtract(&self, a: i64, #[param(default = 1)] b: i64) -> Result<i64, IntegerOverflow> {
        a.checked_sub(b).ok_or(IntegerOverflow)
    }

    #[rpc_method]
    pub fn divide(&self, a: f64, b: f64) -> Result<f64, DivisionByZero> {
        if b == 0.0 { Err(DivisionByZero) } else { Ok(a / b) }
    }

    #[rpc_method(name = "memory.add")]
    pub async fn memory_add(&mut self, value: i64) -> Result<i64, MemoryOverflow> {
        self.memory = self.memory.checked_add(value).ok_or(MemoryOverflow)?;
        Ok(self.memory)
    }

    #[rpc_method(name = "memory.recall")]
    pub fn memory_recall(&self) -> i64 {
        self.memory
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mode = if args.line_delimited {
        ConnectionMode::LineDelimited
    } else {
        ConnectionMode::OneShot
    };

    info!("Starting calculator server on {} ({:?})", args.bind, mode);

    let server = RpcServer::builder()
        .bind_address(args.bind)
        .connection_mode(mode)
        .strict_notifications(args.strict)
        .service(Calculator::default())
        .build()?;

    server.run().await?;
    Ok(())
}
