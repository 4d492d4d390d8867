//! SMTP client session.

use tracing::{debug, info, instrument, warn};

use super::config::{Config, Security};
use super::engine::Engine;
use super::stream::{self, SmtpStream, Upgrade};
use super::transaction::{MailState, MailStep};
use super::transport::LineTransport;
use crate::auth::{Credentials, cram_md5_response, plain_response, select_mechanism};
use crate::command::Command;
use crate::compose::{Message, compose, stuff_line};
use crate::error::{Error, Result};
use crate::types::{Address, AuthMechanism, Capabilities, Reply};
use postline_mime::{Multipart, body_lines};

/// A client session with one SMTP server.
///
/// Commands are strictly sequential: each verb writes one command and reads
/// its complete reply before returning. A verb that fails leaves the session
/// in the state its last successful exchange produced.
///
/// Once [`quit`](Self::quit) or [`close`](Self::close) has run, or writing
/// message content has failed, every verb returns [`Error::InvalidState`].
pub struct Session<S> {
    engine: Option<Engine<S>>,
    config: Config,
    greeting: Reply,
    capabilities: Capabilities,
    mail_state: MailState,
    handshaked: bool,
    secure: bool,
    tls_active: bool,
    authenticated: bool,
}

impl Session<SmtpStream> {
    /// Connects to the configured server and reads its greeting.
    ///
    /// With [`Security::Implicit`] the TLS handshake runs before the greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, the TLS handshake, or the greeting
    /// fails. The greeting must be 220.
    #[instrument(skip(config), fields(host = %config.host, port = config.port))]
    pub async fn connect(config: Config) -> Result<Self> {
        let stream = match config.security {
            Security::Implicit => {
                let server_name = stream::server_name(config.server_name())?;
                let connector = stream::create_tls_connector(config.tls_config.clone());
                stream::connect_tls(
                    &config.host,
                    config.port,
                    connector,
                    server_name,
                    config.connect_timeout,
                )
                .await?
            }
            Security::None | Security::StartTls => {
                stream::connect_plain(&config.host, config.port, config.connect_timeout).await?
            }
        };
        debug!(tls = stream.is_tls(), "connected");

        Self::from_stream(stream, config).await
    }
}

impl<S: Upgrade> Session<S> {
    /// Starts a session over an established stream and reads the greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if the greeting cannot be read or is not 220.
    pub async fn from_stream(stream: S, config: Config) -> Result<Self> {
        let tls_active = stream.is_tls();
        let transport = LineTransport::new(stream).with_io_timeout(config.io_timeout);
        let mut engine = Engine::new(transport);
        let greeting = engine.read_greeting().await?;

        Ok(Self {
            engine: Some(engine),
            secure: config.security == Security::StartTls,
            config,
            greeting,
            capabilities: Capabilities::new(),
            mail_state: MailState::Idle,
            handshaked: false,
            tls_active,
            authenticated: false,
        })
    }

    /// Returns the server greeting.
    pub const fn greeting(&self) -> &Reply {
        &self.greeting
    }

    /// Returns the capabilities from the latest EHLO.
    pub const fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Returns the session configuration.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the mail transaction state.
    pub const fn mail_state(&self) -> MailState {
        self.mail_state
    }

    /// Returns true once EHLO succeeded.
    pub const fn is_handshaked(&self) -> bool {
        self.handshaked
    }

    /// Returns true if the handshake upgrades the session with STARTTLS.
    pub const fn is_secure(&self) -> bool {
        self.secure
    }

    /// Returns true if the stream is TLS-encrypted.
    pub const fn is_tls_active(&self) -> bool {
        self.tls_active
    }

    /// Returns true once authentication succeeded.
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Returns true once the transport has been released.
    pub const fn is_closed(&self) -> bool {
        self.engine.is_none()
    }

    /// Returns the underlying stream, unless the session is closed.
    pub fn get_ref(&self) -> Option<&S> {
        self.engine.as_ref().map(|engine| engine.transport().get_ref())
    }

    /// Sends EHLO, loads the capability registry and, for a STARTTLS
    /// configuration, upgrades the connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the handshake already ran, or the
    /// error of the failing EHLO or STARTTLS exchange.
    pub async fn handshake(&mut self) -> Result<Reply> {
        if self.handshaked {
            return Err(Error::state("handshake already completed"));
        }

        let reply = self.ehlo().await?;
        self.handshaked = true;
        info!(
            server = reply.first_line(),
            capabilities = self.capabilities.len(),
            "handshake complete"
        );

        if self.secure && !self.tls_active {
            self.starttls().await?;
            if self.config.refresh_after_starttls {
                return self.refresh_capabilities().await;
            }
        }
        Ok(reply)
    }

    /// Re-issues EHLO and replaces the capability registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] before the handshake or during a mail
    /// transaction.
    pub async fn refresh_capabilities(&mut self) -> Result<Reply> {
        self.require_handshake()?;
        self.require_idle()?;
        self.ehlo().await
    }

    async fn ehlo(&mut self) -> Result<Reply> {
        let command = Command::Ehlo {
            domain: self.config.domain.clone(),
        };
        let reply = self.execute(&command).await?;
        self.capabilities.load(&reply.message_text());
        Ok(reply)
    }

    /// Upgrades the connection to TLS with STARTTLS.
    ///
    /// The certificate is verified against [`Config::server_name`]. The
    /// capability registry is left as it was; call
    /// [`refresh_capabilities`](Self::refresh_capabilities) to re-read it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] before the handshake, when TLS is
    /// already active, or during a mail transaction. If the server refuses,
    /// the session stays usable in plaintext. If the server sends anything
    /// after its 220, or the TLS handshake fails, the transport is dropped and
    /// the session is closed.
    pub async fn starttls(&mut self) -> Result<Reply> {
        self.require_open()?;
        self.require_handshake()?;
        self.require_idle()?;
        if self.tls_active {
            return Err(Error::state("TLS already active"));
        }

        let server_name = stream::server_name(self.config.server_name())?;
        let reply = self.execute(&Command::StartTls).await?;

        let engine = self.take_engine()?;
        if engine.transport().has_pending_input() {
            warn!("server sent data after accepting STARTTLS");
            return Err(Error::state("unexpected data after STARTTLS reply"));
        }
        let plain = engine.into_transport().into_inner()?;

        let connector = stream::create_tls_connector(self.config.tls_config.clone());
        let tls = plain.upgrade(connector, server_name).await?;

        self.engine = Some(Engine::new(
            LineTransport::new(tls).with_io_timeout(self.config.io_timeout),
        ));
        self.tls_active = true;
        info!(server_name = self.config.server_name(), "TLS active");
        Ok(reply)
    }

    /// Authenticates with the mechanism chosen by the configured policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] before the handshake, after a previous
    /// success, or during a mail transaction. Returns [`Error::Auth`] if no
    /// mechanism can be used or the challenge cannot be answered, and
    /// [`Error::AuthRejected`] if the server answers any step with an
    /// unexpected code.
    pub async fn authenticate(&mut self, credentials: &Credentials) -> Result<Reply> {
        self.require_open()?;
        self.require_handshake()?;
        self.require_idle()?;
        if self.authenticated {
            return Err(Error::state("already authenticated"));
        }

        let mechanism = select_mechanism(
            self.config.auth_policy,
            self.tls_active,
            &self.capabilities,
        )?;
        debug!(%mechanism, "authenticating");

        let reply = match mechanism {
            AuthMechanism::Plain => {
                let command = Command::Auth {
                    mechanism,
                    initial_response: Some(plain_response(credentials)),
                };
                self.auth_step(&command).await?
            }
            AuthMechanism::CramMd5 => {
                let command = Command::Auth {
                    mechanism,
                    initial_response: None,
                };
                let challenge = self.auth_step(&command).await?;
                let answer = match cram_md5_response(credentials, challenge.first_line()) {
                    Ok(answer) => answer,
                    Err(e) => {
                        self.cancel_auth().await?;
                        return Err(e);
                    }
                };
                self.auth_step(&Command::AuthResponse(answer)).await?
            }
        };

        self.authenticated = true;
        info!(%mechanism, "authenticated");
        Ok(reply)
    }

    async fn auth_step(&mut self, command: &Command) -> Result<Reply> {
        self.execute(command).await.map_err(|e| match e {
            Error::UnexpectedReply { got, message, .. } => Error::AuthRejected { code: got, message },
            other => other,
        })
    }

    /// Aborts a SASL exchange with `*` and consumes the server's answer.
    async fn cancel_auth(&mut self) -> Result<()> {
        let engine = self.engine()?;
        engine
            .transport_mut()
            .write_line("*")
            .await?;
        let reply = engine.read_any().await?;
        debug!(code = %reply.code, "authentication cancelled");
        Ok(())
    }

    /// Sends MAIL FROM.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] before the handshake or while a
    /// transaction is open.
    pub async fn mail_from(&mut self, from: &Address) -> Result<Reply> {
        self.require_handshake()?;
        let command = Command::MailFrom { from: from.clone() };
        self.transaction_step(MailStep::Mail, &command).await
    }

    /// Sends RCPT TO. May be repeated for several recipients.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless MAIL FROM was accepted.
    pub async fn rcpt_to(&mut self, to: &Address) -> Result<Reply> {
        let command = Command::RcptTo { to: to.clone() };
        self.transaction_step(MailStep::Rcpt, &command).await
    }

    /// Sends DATA. On success only body lines and the terminator may follow.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless a recipient was accepted.
    pub async fn data(&mut self) -> Result<Reply> {
        self.transaction_step(MailStep::Data, &Command::Data).await
    }

    /// Sends prepared message content after [`data`](Self::data), followed by
    /// the terminator.
    ///
    /// Lines starting with `.` are doubled; line breaks become CRLF.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless DATA was accepted, or the error
    /// of the final reply, which must be 250. If writing the content fails the
    /// session is closed, since the server cannot tell where the message ended.
    pub async fn send_data(&mut self, content: &[u8]) -> Result<Reply> {
        self.require_in_data()?;
        self.finish_data(body_lines(content).map(stuff_line)).await
    }

    /// Sends a complete message: MAIL FROM, RCPT TO, DATA, the multipart
    /// content and the terminator.
    ///
    /// Attachments are read before any command is sent, so a missing file
    /// leaves the server untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Attachment`] if an attachment cannot be read, or the
    /// error of the first exchange that fails; later steps are not attempted.
    /// A write failure while sending the content closes the session, as with
    /// [`send_data`](Self::send_data).
    #[instrument(skip_all, fields(from = %message.from, to = %message.to))]
    pub async fn send(&mut self, message: &Message) -> Result<Reply> {
        self.require_open()?;
        self.require_handshake()?;
        self.require_idle()?;

        let mut parts = Vec::with_capacity(message.attachments.len());
        for attachment in &message.attachments {
            parts.push(attachment.resolve(&self.config.content_types).await?);
        }

        self.mail_from(&message.from).await?;
        self.rcpt_to(&message.to).await?;
        self.data().await?;

        let multipart = Multipart::new(self.config.boundary.clone());
        let lines = compose(message, &parts, &multipart, self.config.dot_escaping);
        let reply = self.finish_data(lines).await?;
        info!(attachments = parts.len(), "message accepted");
        Ok(reply)
    }

    async fn finish_data<I, L>(&mut self, lines: I) -> Result<Reply>
    where
        I: IntoIterator<Item = L>,
        L: AsRef<[u8]>,
    {
        let next = self.mail_state.next(MailStep::EndOfData)?;
        let written = self.write_data(lines).await;
        self.mail_state = next;
        if let Err(e) = written {
            // The server cannot tell where the message ended.
            warn!(error = %e, "message data incomplete, closing session");
            self.engine = None;
            return Err(e);
        }

        self.engine()?
            .read_expected(Command::EndOfData.expected_code())
            .await
    }

    async fn write_data<I, L>(&mut self, lines: I) -> Result<()>
    where
        I: IntoIterator<Item = L>,
        L: AsRef<[u8]>,
    {
        let engine = self.engine()?;
        for line in lines {
            engine.transport_mut().write_body_line(line.as_ref()).await?;
        }
        engine.write_command(&Command::EndOfData).await
    }

    /// Sends RSET, abandoning any open transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] while message data is being sent.
    pub async fn reset(&mut self) -> Result<Reply> {
        self.transaction_step(MailStep::Reset, &Command::Rset).await
    }

    /// Sends NOOP.
    ///
    /// # Errors
    ///
    /// Returns the error of the exchange.
    pub async fn noop(&mut self) -> Result<Reply> {
        self.transaction_step(MailStep::Other, &Command::Noop).await
    }

    /// Sends VRFY.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedReply`] for any code but 250, including 252.
    pub async fn verify(&mut self, argument: &str) -> Result<Reply> {
        let command = Command::Vrfy {
            argument: argument.to_string(),
        };
        self.transaction_step(MailStep::Other, &command).await
    }

    /// Sends EXPN.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedReply`] for any code but 250.
    pub async fn expand(&mut self, argument: &str) -> Result<Reply> {
        let command = Command::Expn {
            argument: argument.to_string(),
        };
        self.transaction_step(MailStep::Other, &command).await
    }

    /// Sends HELP, optionally on a topic.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedReply`] for any code but 250.
    pub async fn help(&mut self, topic: Option<&str>) -> Result<Reply> {
        let command = Command::Help {
            topic: topic.map(str::to_string),
        };
        self.transaction_step(MailStep::Other, &command).await
    }

    /// Sends QUIT and, once the server answers 221, closes the transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] while message data is being sent, or the
    /// error of the exchange. The transport stays open on error; call
    /// [`close`](Self::close).
    pub async fn quit(&mut self) -> Result<Reply> {
        let reply = self.transaction_step(MailStep::Other, &Command::Quit).await?;
        self.close().await?;
        Ok(reply)
    }

    /// Closes the transport without QUIT. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if shutting down the stream fails. The session is
    /// closed either way.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(engine) = self.engine.take() {
            let mut transport = engine.into_transport();
            transport.shutdown().await?;
            debug!("transport closed");
        }
        Ok(())
    }

    async fn transaction_step(&mut self, step: MailStep, command: &Command) -> Result<Reply> {
        let next = self.mail_state.next(step)?;
        let reply = self.execute(command).await?;
        self.mail_state = next;
        Ok(reply)
    }

    async fn execute(&mut self, command: &Command) -> Result<Reply> {
        self.engine()?.send(command).await
    }

    fn engine(&mut self) -> Result<&mut Engine<S>> {
        self.engine
            .as_mut()
            .ok_or_else(|| Error::state("session is closed"))
    }

    fn take_engine(&mut self) -> Result<Engine<S>> {
        self.engine
            .take()
            .ok_or_else(|| Error::state("session is closed"))
    }

    fn require_open(&self) -> Result<()> {
        if self.engine.is_some() {
            Ok(())
        } else {
            Err(Error::state("session is closed"))
        }
    }

    fn require_handshake(&self) -> Result<()> {
        if self.handshaked {
            Ok(())
        } else {
            Err(Error::state("EHLO has not been sent"))
        }
    }

    fn require_idle(&self) -> Result<()> {
        if self.mail_state.is_idle() {
            Ok(())
        } else {
            Err(Error::state(format!(
                "mail transaction in progress ({:?})",
                self.mail_state
            )))
        }
    }

    fn require_in_data(&self) -> Result<()> {
        if self.mail_state == MailState::InData {
            Ok(())
        } else {
            Err(Error::state("DATA has not been accepted"))
        }
    }
}

impl<S> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.config.host)
            .field("mail_state", &self.mail_state)
            .field("handshaked", &self.handshaked)
            .field("tls_active", &self.tls_active)
            .field("authenticated", &self.authenticated)
            .field("closed", &self.engine.is_none())
            .finish_non_exhaustive()
    }
}
