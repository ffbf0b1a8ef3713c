//! scollector exporter entry point.

use scollector_exporter::cli::{self, Cli};
use scollector_exporter::core::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    cli::execute(cli).await
}
