use serde::Serialize;

use super::{DecodeError, EncodeError};

const HEADER_LEN: usize = 8;

/// Attribute-value pair as carried in authorization bodies: `name=value`
/// (mandatory) or `name*value` (optional).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvPair {
    pub name: String,
    pub value: String,
    pub optional: bool,
}

impl AvPair {
    pub fn mandatory(name: &str, value: &str) -> Self {
        Self {
            name: name.to_owned(),
            value: value.to_owned(),
            optional: false,
        }
    }

    pub fn optional(name: &str, value: &str) -> Self {
        Self {
            name: name.to_owned(),
            value: value.to_owned(),
            optional: true,
        }
    }

    /// Split on the first `=` or `*`.
    pub fn parse(raw: &str) -> Result<Self, DecodeError> {
        let idx = raw
            .find(['=', '*'])
            .ok_or_else(|| DecodeError::MissingSeparator(raw.to_owned()))?;
        if idx == 0 {
            return Err(DecodeError::MissingSeparator(raw.to_owned()));
        }
        let (name, rest) = raw.split_at(idx);
        Ok(Self {
            name: name.to_owned(),
            value: rest[1..].to_owned(),
            optional: rest.starts_with('*'),
        })
    }
}

impl std::fmt::Display for AvPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sep = if self.optional { '*' } else { '=' };
        write!(f, "{}{sep}{}", self.name, self.value)
    }
}

/// A decoded authorization request.
///
/// `service`, `cmd` and `cmd-arg` pairs are lifted into dedicated fields;
/// every other pair stays in `attributes` in wire order. An empty `cmd`
/// value means the request carries no command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub authen_method: u8,
    pub priv_lvl: u8,
    pub authen_type: u8,
    pub authen_service: u8,
    pub user: String,
    pub port: String,
    pub rem_addr: String,
    pub service: String,
    pub command: Option<String>,
    pub args: Vec<String>,
    pub attributes: Vec<AvPair>,
}

impl AuthorizationRequest {
    pub fn new(user: &str, service: &str) -> Self {
        Self {
            user: user.to_owned(),
            service: service.to_owned(),
            ..Default::default()
        }
    }

    pub fn with_command<S: AsRef<str>>(mut self, command: &str, args: &[S]) -> Self {
        self.command = Some(command.to_owned()).filter(|c| !c.is_empty());
        self.args = args.iter().map(|a| a.as_ref().to_owned()).collect();
        self
    }

    pub fn with_attribute(mut self, pair: AvPair) -> Self {
        self.attributes.push(pair);
        self
    }

    /// Command name, if this is a command-authorization request.
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    pub fn decode(body: &[u8]) -> Result<Self, DecodeError> {
        let &[
            authen_method,
            priv_lvl,
            authen_type,
            authen_service,
            user_len,
            port_len,
            rem_addr_len,
            arg_cnt,
        ] = body
            .first_chunk::<HEADER_LEN>()
            .ok_or(DecodeError::TruncatedHeader(body.len()))?;

        let mut reader = Reader {
            buf: &body[HEADER_LEN..],
        };
        let arg_lens = reader.take(usize::from(arg_cnt), "argument lengths")?.to_vec();
        let user = reader.string(user_len, "user")?;
        let port = reader.string(port_len, "port")?;
        let rem_addr = reader.string(rem_addr_len, "rem_addr")?;

        let mut request = Self {
            authen_method,
            priv_lvl,
            authen_type,
            authen_service,
            user,
            port,
            rem_addr,
            ..Default::default()
        };

        let mut seen_service = false;
        let mut seen_cmd = false;
        for len in arg_lens {
            let pair = AvPair::parse(&reader.string(len, "argument")?)?;
            match pair.name.as_str() {
                "service" if seen_service => return Err(DecodeError::Duplicate("service")),
                "service" => {
                    seen_service = true;
                    request.service = pair.value;
                }
                "cmd" if seen_cmd => return Err(DecodeError::Duplicate("cmd")),
                "cmd" => {
                    seen_cmd = true;
                    request.command = Some(pair.value).filter(|c| !c.is_empty());
                }
                "cmd-arg" => request.args.push(pair.value),
                _ => request.attributes.push(pair),
            }
        }

        if !reader.buf.is_empty() {
            return Err(DecodeError::TrailingBytes(reader.buf.len()));
        }
        Ok(request)
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut pairs = Vec::with_capacity(2 + self.args.len() + self.attributes.len());
        if !self.service.is_empty() {
            pairs.push(AvPair::mandatory("service", &self.service));
        }
        if let Some(command) = &self.command {
            pairs.push(AvPair::mandatory("cmd", command));
        }
        pairs.extend(self.args.iter().map(|a| AvPair::mandatory("cmd-arg", a)));
        pairs.extend(self.attributes.iter().cloned());
        let pairs: Vec<String> = pairs.iter().map(AvPair::to_string).collect();

        let arg_cnt =
            u8::try_from(pairs.len()).map_err(|_| EncodeError::TooManyArguments(pairs.len()))?;
        let mut out = vec![
            self.authen_method,
            self.priv_lvl,
            self.authen_type,
            self.authen_service,
            short_len("user", &self.user)?,
            short_len("port", &self.port)?,
            short_len("rem_addr", &self.rem_addr)?,
            arg_cnt,
        ];
        for pair in &pairs {
            out.push(short_len("argument", pair)?);
        }
        out.extend_from_slice(self.user.as_bytes());
        out.extend_from_slice(self.port.as_bytes());
        out.extend_from_slice(self.rem_addr.as_bytes());
        for pair in &pairs {
            out.extend_from_slice(pair.as_bytes());
        }
        Ok(out)
    }
}

pub(super) fn short_len(field: &'static str, value: &str) -> Result<u8, EncodeError> {
    u8::try_from(value.len()).map_err(|_| EncodeError::FieldTooLong {
        field,
        len: value.len(),
    })
}

struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], DecodeError> {
        if self.buf.len() < len {
            return Err(DecodeError::TruncatedBody {
                field,
                wanted: len,
                available: self.buf.len(),
            });
        }
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    fn string(&mut self, len: u8, field: &'static str) -> Result<String, DecodeError> {
        let bytes = self.take(usize::from(len), field)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8(field))
    }
}
