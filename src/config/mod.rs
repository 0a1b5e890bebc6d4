//! Runtime configuration from command-line flags and the environment.

use clap::{ArgAction, Parser};

/// Settings for the `todos-service` binary.
///
/// Every flag can also be supplied through the environment variable named next
/// to it; flags win over the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "todos-service", version, about = "HTTP todos service")]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "TODOS_ADDR", default_value = "127.0.0.1:3000")]
    pub addr: String,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, env = "TODOS_LOG", default_value = "info")]
    pub log_level: String,

    /// Include failure text in 500 response bodies.
    #[arg(
        long,
        env = "TODOS_EXPOSE_ERRORS",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub expose_errors: bool,
}
