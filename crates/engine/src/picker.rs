use async_trait::async_trait;

/// Lets the user choose a directory for `directory` controls.
///
/// Injected into the wizard at construction; `Ok(None)` means the user cancelled.
#[async_trait]
pub trait DirectoryPicker: Send + Sync {
    async fn pick(&self) -> anyhow::Result<Option<String>>;
}
