//! postline: send one message described by a JSON job file.
//!
//! ```text
//! POSTLINE_PASSWORD=secret postline job.json
//! ```

mod job;

use std::path::PathBuf;

use anyhow::{Context, Result};
use postline_smtp::{Credentials, Message, Session, SmtpStream};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use job::{Job, PASSWORD_VAR};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "postline=info,postline_smtp=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path: PathBuf = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: postline <job.json>")?;

    let job = Job::load(&path).await?;
    let config = job.config()?;
    let message = job.message()?;
    let credentials = job.credentials(std::env::var(PASSWORD_VAR).ok())?;

    info!(host = %job.host, "Starting submission");
    let mut session = Session::connect(config)
        .await
        .with_context(|| format!("Failed to connect to {}", job.host))?;

    let result = submit(&mut session, &job, credentials.as_ref(), &message).await;
    if result.is_err() {
        if let Err(e) = session.close().await {
            warn!("Failed to close connection: {}", e);
        }
    }
    result
}

async fn submit(
    session: &mut Session<SmtpStream>,
    job: &Job,
    credentials: Option<&Credentials>,
    message: &Message,
) -> Result<()> {
    session.handshake().await.context("Handshake failed")?;

    if job.noop {
        session.noop().await.context("NOOP failed")?;
    }

    if let Some(credentials) = credentials {
        session
            .authenticate(credentials)
            .await
            .context("Authentication failed")?;
    }

    let reply = session.send(message).await.context("Sending failed")?;
    info!("Message accepted: {}", reply.first_line());

    session.quit().await.context("QUIT failed")?;
    Ok(())
}
