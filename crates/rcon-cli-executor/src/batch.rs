//! Batch execution

use crate::dispatcher::Dispatcher;
use rcon_cli_bridge::Dialer;
use rcon_cli_core::{RconError, Result, Session, logger};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// Printed between the responses of two consecutive commands
pub const SEPARATOR: &str = "--------";

/// Execute `commands` in order, writing responses to `out`.
///
/// An empty list or an empty command aborts the batch. Remote failures abort
/// it too unless the session skips errors, in which case they are printed in
/// place of the response. Log failures are printed and never abort.
pub async fn execute_all<D, W, S>(
    dispatcher: &Dispatcher<D>,
    out: &mut W,
    session: &Session,
    commands: &[S],
) -> Result<()>
where
    D: Dialer,
    W: AsyncWrite + Unpin,
    S: AsRef<str>,
{
    if commands.is_empty() {
        return Err(RconError::NoCommands);
    }

    let result = run(dispatcher, out, session, commands).await;

    // Runs on both paths so an aborted web batch does not leave a handle behind
    let finished = dispatcher.finish_batch().await;
    result?;
    finished
}

async fn run<D, W, S>(
    dispatcher: &Dispatcher<D>,
    out: &mut W,
    session: &Session,
    commands: &[S],
) -> Result<()>
where
    D: Dialer,
    W: AsyncWrite + Unpin,
    S: AsRef<str>,
{
    for (i, command) in commands.iter().enumerate() {
        let command = command.as_ref();
        if command.is_empty() {
            return Err(RconError::CommandEmpty);
        }

        debug!("Executing command {}/{}", i + 1, commands.len());
        let response = match dispatcher.execute(session, command).await {
            Ok(response) => {
                let response = response.trim_end().to_string();
                if !response.is_empty() {
                    writeln(out, &response).await?;
                }
                response
            }
            // Connection and credential failures are never skipped
            Err(e @ RconError::Dial(_)) => return Err(RconError::execute(e)),
            Err(e @ (RconError::EmptyAddress | RconError::EmptyPassword)) => return Err(e),
            Err(e) => {
                let e = RconError::execute(e);
                if !session.skip_errors {
                    return Err(e);
                }
                warn!("Skipping failed command: {}", e);
                writeln(out, &e.to_string()).await?;
                String::new()
            }
        };

        let logged = logger::write(session.log.as_deref(), &session.address, command, &response);
        if let Err(e) = logged.await {
            warn!("Request log failed: {}", e);
            writeln(out, &format!("log: {}", e)).await?;
        }

        if i + 1 != commands.len() {
            writeln(out, SEPARATOR).await?;
        }
    }

    Ok(())
}

async fn writeln<W: AsyncWrite + Unpin>(out: &mut W, line: &str) -> Result<()> {
    out.write_all(line.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await?;
    Ok(())
}
