#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gametrack_lib::run().await
}
