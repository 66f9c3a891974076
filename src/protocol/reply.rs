use super::EncodeError;
use super::request::{AvPair, short_len};
use crate::authorization::verdict::Verdict;

/// Authorization reply status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AuthorStatus {
    PassAdd = 0x01,
    PassRepl = 0x02,
    Fail = 0x10,
    Error = 0x11,
    Follow = 0x21,
}

/// Reply handed to the transport layer for framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorReply {
    pub status: AuthorStatus,
    pub args: Vec<AvPair>,
    pub server_msg: String,
    pub data: String,
}

impl AuthorReply {
    pub fn new(status: AuthorStatus) -> Self {
        Self {
            status,
            args: Vec::new(),
            server_msg: String::new(),
            data: String::new(),
        }
    }

    /// Body layout: status, arg_cnt, server_msg_len (u16), data_len (u16),
    /// argument lengths, server_msg, data, arguments.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let args: Vec<String> = self.args.iter().map(AvPair::to_string).collect();
        let arg_cnt =
            u8::try_from(args.len()).map_err(|_| EncodeError::TooManyArguments(args.len()))?;
        let msg_len = long_len("server_msg", &self.server_msg)?;
        let data_len = long_len("data", &self.data)?;

        let mut out = Vec::with_capacity(6 + args.len() + self.server_msg.len() + self.data.len());
        out.push(self.status as u8);
        out.push(arg_cnt);
        out.extend_from_slice(&msg_len.to_be_bytes());
        out.extend_from_slice(&data_len.to_be_bytes());
        for arg in &args {
            out.push(short_len("argument", arg)?);
        }
        out.extend_from_slice(self.server_msg.as_bytes());
        out.extend_from_slice(self.data.as_bytes());
        for arg in &args {
            out.extend_from_slice(arg.as_bytes());
        }
        Ok(out)
    }
}

impl From<&Verdict> for AuthorReply {
    fn from(verdict: &Verdict) -> Self {
        let status = match verdict {
            Verdict::Permit { .. } => AuthorStatus::PassAdd,
            Verdict::Deny { .. } => AuthorStatus::Fail,
            Verdict::Error { .. } => AuthorStatus::Error,
        };
        Self {
            status,
            args: verdict.attributes().to_vec(),
            server_msg: verdict.server_msg().unwrap_or_default().to_owned(),
            data: String::new(),
        }
    }
}

fn long_len(field: &'static str, value: &str) -> Result<u16, EncodeError> {
    u16::try_from(value.len()).map_err(|_| EncodeError::FieldTooLong {
        field,
        len: value.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorization::verdict::{DenyReason, MSG_NOT_AUTHORIZED};

    #[test]
    fn permit_becomes_pass_add_with_attributes() {
        let verdict = Verdict::Permit {
            attributes: vec![AvPair::mandatory("priv-lvl", "15")],
        };
        let reply = AuthorReply::from(&verdict);
        assert_eq!(reply.status, AuthorStatus::PassAdd);
        assert_eq!(reply.args, [AvPair::mandatory("priv-lvl", "15")]);
        assert!(reply.server_msg.is_empty());
    }

    #[test]
    fn unclaimed_deny_carries_message() {
        let verdict = Verdict::Deny {
            reason: DenyReason::Unclaimed,
        };
        let reply = AuthorReply::from(&verdict);
        assert_eq!(reply.status, AuthorStatus::Fail);
        assert_eq!(reply.server_msg, MSG_NOT_AUTHORIZED);
    }

    #[test]
    fn rule_deny_is_silent() {
        let verdict = Verdict::Deny {
            reason: DenyReason::NoMatchingRule,
        };
        let reply = AuthorReply::from(&verdict);
        assert_eq!(reply.status, AuthorStatus::Fail);
        assert!(reply.server_msg.is_empty());
    }

    #[test]
    fn error_status() {
        let reply = AuthorReply::from(&Verdict::error("boom"));
        assert_eq!(reply.status, AuthorStatus::Error);
        assert_eq!(reply.server_msg, "boom");
    }

    #[test]
    fn encode_layout() {
        let mut reply = AuthorReply::new(AuthorStatus::PassAdd);
        reply.args.push(AvPair::mandatory("priv-lvl", "15"));
        reply.server_msg = "ok".to_owned();

        let bytes = reply.encode().unwrap();
        let mut expected = vec![0x01, 1, 0, 2, 0, 0, 11];
        expected.extend_from_slice(b"ok");
        expected.extend_from_slice(b"priv-lvl=15");
        assert_eq!(bytes, expected);
    }

    #[test]
    fn encode_rejects_oversized_message() {
        let mut reply = AuthorReply::new(AuthorStatus::Fail);
        reply.server_msg = "x".repeat(70_000);
        assert!(matches!(
            reply.encode(),
            Err(EncodeError::FieldTooLong { field: "server_msg", .. })
        ));
    }
}
