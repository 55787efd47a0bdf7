#[async_trait::async_trait]
pub trait Driver: Send + Sync {
    /// Serves until the app's stop notify fires. Returning early brings the app down.
    async fn run(&self) -> anyhow::Result<()>;

    fn name(&self) -> &'static str;
}
