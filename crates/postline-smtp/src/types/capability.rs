//! Server capabilities advertised in the EHLO reply.

use std::collections::HashMap;
use std::fmt;

/// Capability registry built from an EHLO reply.
///
/// Each reply line contributes one entry: its first token is the verb (case
/// preserved), the remaining tokens are its parameters. Lines containing `=`
/// (legacy `AUTH=LOGIN` style announcements) are skipped.
///
/// ```
/// use postline_smtp::Capabilities;
///
/// let caps = Capabilities::parse("mx.example.com greets you\nAUTH PLAIN CRAM-MD5\nSTARTTLS");
/// assert_eq!(caps.capabilities_of("AUTH"), ["PLAIN", "CRAM-MD5"]);
/// assert!(caps.supports_starttls());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    verbs: HashMap<String, Vec<String>>,
}

impl Capabilities {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses reply text into a new registry.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut caps = Self::new();
        caps.load(text);
        caps
    }

    /// Replaces the registry content with the capabilities found in `text`.
    pub fn load(&mut self, text: &str) {
        self.verbs.clear();

        for line in text.lines() {
            if line.contains('=') {
                continue;
            }

            let mut tokens = line.split_whitespace();
            let Some(verb) = tokens.next() else {
                continue;
            };
            self.verbs
                .insert(verb.to_string(), tokens.map(str::to_string).collect());
        }
    }

    /// Returns the parameters announced for a verb, or an empty slice.
    ///
    /// The verb is matched exactly first, then ignoring ASCII case.
    #[must_use]
    pub fn capabilities_of(&self, verb: &str) -> &[String] {
        self.verbs
            .get(verb)
            .or_else(|| {
                self.verbs
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(verb))
                    .map(|(_, v)| v)
            })
            .map_or(&[], Vec::as_slice)
    }

    /// Checks whether a verb was announced (ignoring ASCII case).
    #[must_use]
    pub fn supports(&self, verb: &str) -> bool {
        self.verbs.keys().any(|k| k.eq_ignore_ascii_case(verb))
    }

    /// Checks if STARTTLS is announced.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.supports("STARTTLS")
    }

    /// Returns the known authentication mechanisms announced under `AUTH`.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Vec<AuthMechanism> {
        self.capabilities_of("AUTH")
            .iter()
            .filter_map(|m| AuthMechanism::parse(m))
            .collect()
    }

    /// Iterates over the announced verbs.
    pub fn verbs(&self) -> impl Iterator<Item = &str> {
        self.verbs.keys().map(String::as_str)
    }

    /// Returns the number of announced verbs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.verbs.len()
    }

    /// Returns true if nothing has been loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.verbs.is_empty()
    }
}

/// SASL mechanisms this client can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// PLAIN - credentials in the initial response (RFC 4616)
    Plain,
    /// CRAM-MD5 - challenge-response (RFC 2195)
    CramMd5,
}

impl AuthMechanism {
    /// Parses a mechanism name, ignoring case.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("PLAIN") {
            Some(Self::Plain)
        } else if s.eq_ignore_ascii_case("CRAM-MD5") {
            Some(Self::CramMd5)
        } else {
            None
        }
    }

    /// Returns the mechanism name as sent on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::CramMd5 => "CRAM-MD5",
        }
    }
}

impl fmt::Display for AuthMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
