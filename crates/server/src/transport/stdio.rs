use anyhow::{Context, Result};
use jellyseerr_mcp::McpServer;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

/// Serve newline-delimited JSON-RPC on stdin/stdout until EOF or shutdown.
pub async fn serve(server: Arc<McpServer>, shutdown: CancellationToken) -> Result<()> {
    let reader = BufReader::new(tokio::io::stdin());
    let writer = tokio::io::stdout();
    serve_lines(&server, reader, writer, &shutdown).await
}

/// One frame per line in, one frame per response out.
pub async fn serve_lines<R, W>(
    server: &McpServer,
    reader: R,
    mut writer: W,
    shutdown: &CancellationToken,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    loop {
        let line = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line.context("Failed to read from stdin")?,
        };
        let Some(line) = line else {
            tracing::info!("stdin closed");
            break;
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(response) = server.handle_text(line).await {
            let mut frame = serde_json::to_vec(&response).context("Failed to encode response")?;
            frame.push(b'\n');
            writer
                .write_all(&frame)
                .await
                .context("Failed to write to stdout")?;
            writer.flush().await.context("Failed to flush stdout")?;
        }
    }

    Ok(())
}
