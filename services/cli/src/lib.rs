mod cli;
mod demo;
mod infra;

use license_renewal::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
