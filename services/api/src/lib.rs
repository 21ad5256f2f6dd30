mod check;
mod cli;
mod infra;
mod routes;
mod server;

use print_station::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
