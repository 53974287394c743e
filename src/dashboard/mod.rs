//! Dashboard HTTP API module.
//!
//! JSON endpoints over the query, aggregation and rollup layers. Started by
//! the `serve` subcommand.

mod server;

pub use server::{
    ACCESS_HEADER, ApiError, Caller, CountResponse, DashboardServer, ROLE_HEADER, USER_HEADER,
    build_router, start_server,
};
