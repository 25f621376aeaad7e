use anyhow::Result;

/// Write-only destination for copied amounts.
pub trait ClipboardSink {
    fn write_text(&self, text: &str) -> Result<()>;
}
