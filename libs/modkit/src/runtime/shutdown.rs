use anyhow::Result;

/// Wait for a termination request from the OS and name the signal that arrived.
pub async fn wait_for_shutdown() -> Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv()  => "SIGINT",
            _ = tokio::signal::ctrl_c() => "ctrl_c",
        };
        Ok(name)
    }

    #[cfg(windows)]
    {
        use tokio::signal::windows::{ctrl_break, ctrl_c, ctrl_close, ctrl_shutdown};

        let mut c = ctrl_c()?;
        let mut br = ctrl_break()?;
        let mut cl = ctrl_close()?;
        let mut sh = ctrl_shutdown()?;
        let name = tokio::select! {
            _ = c.recv()  => "ctrl_c",
            _ = br.recv() => "ctrl_break",
            _ = cl.recv() => "ctrl_close",
            _ = sh.recv() => "ctrl_shutdown",
        };
        Ok(name)
    }
}
