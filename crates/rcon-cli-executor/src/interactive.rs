//! Interactive read loop
//!
//! Collects whatever connection details the session is missing, connects,
//! then runs each input line as a one-command batch until `:q` or end of
//! input. Closing the connection is left to the owner of the dispatcher.

use crate::batch::execute_all;
use crate::dispatcher::Dispatcher;
use rcon_cli_bridge::Dialer;
use rcon_cli_core::{Protocol, Result, Session};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

/// Input line that ends the loop
pub const QUIT_COMMAND: &str = ":q";

const PROMPT: &str = "> ";
const ADDRESS_PROMPT: &str = "Enter remote host and port [ip:port]: ";
const PASSWORD_PROMPT: &str = "Enter password: ";
const PROTOCOL_PROMPT: &str = "Enter protocol type (empty for rcon): ";

/// Run the interactive loop on `input`/`out`.
///
/// An unrecognised protocol answer prints the allowed protocols and returns
/// without dialing. Connection failures and batch failures end the loop with
/// that error.
pub async fn run_interactive<D, R, W>(
    dispatcher: &Dispatcher<D>,
    input: &mut R,
    out: &mut W,
    session: &mut Session,
) -> Result<()>
where
    D: Dialer,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if session.address.is_empty() {
        write(out, ADDRESS_PROMPT).await?;
        session.address = read_line(input).await?.unwrap_or_default();
    }

    if session.password.is_empty() {
        write(out, PASSWORD_PROMPT).await?;
        session.password = read_line(input).await?.unwrap_or_default();
    }

    if session.protocol.is_none() {
        write(out, PROTOCOL_PROMPT).await?;
        let answer = read_line(input).await?.unwrap_or_default();
        if !answer.is_empty() {
            match answer.parse::<Protocol>() {
                Ok(protocol) => session.protocol = Some(protocol),
                Err(_) => {
                    warn!("Unsupported protocol answer {:?}", answer);
                    write(out, &unsupported_protocol(&answer)).await?;
                    return Ok(());
                }
            }
        }
    }

    dispatcher.connect(session).await?;
    info!("Interactive session on {} ({})", session.address, session.protocol());

    write(
        out,
        &format!(
            "Waiting commands for {} (or type {} to exit)\n{}",
            session.address, QUIT_COMMAND, PROMPT
        ),
    )
    .await?;

    while let Some(command) = read_line(input).await? {
        if !command.is_empty() {
            if command == QUIT_COMMAND {
                debug!("Quit requested");
                break;
            }
            execute_all(dispatcher, out, session, &[command]).await?;
        }
        write(out, PROMPT).await?;
    }

    Ok(())
}

fn unsupported_protocol(answer: &str) -> String {
    let [first, second, third] = Protocol::ALL.map(Protocol::as_str);
    format!(
        "Unsupported protocol type ({:?}). Allowed {:?}, {:?} and {:?} protocols\n",
        answer, first, second, third
    )
}

/// One line without its terminator; `None` at end of input
async fn read_line<R: AsyncBufRead + Unpin>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

async fn write<W: AsyncWrite + Unpin>(out: &mut W, text: &str) -> Result<()> {
    out.write_all(text.as_bytes()).await?;
    out.flush().await?;
    Ok(())
}
