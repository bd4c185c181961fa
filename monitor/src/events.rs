//! Decoding of Anchor events from transaction log lines
//!
//! Anchor's `emit!` writes `Program data: <base64>` where the payload is the
//! event's 8-byte discriminator followed by its borsh encoding.

use anchor_lang::prelude::*;
use anchor_lang::Event;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Log prefix of `sol_log_data` output
pub const PROGRAM_DATA_PREFIX: &str = "Program data: ";

/// Emitted by the oracle program when a claim is asserted.
#[event]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionMade {
    pub assertion_id: [u8; 32],
    pub domain_id: [u8; 32],
    pub claim: Vec<u8>,
    pub asserter: Pubkey,
    pub callback_recipient: Pubkey,
    pub escalation_manager: Pubkey,
    pub caller: Pubkey,
    pub expiration_time: i64,
    pub currency: Pubkey,
    pub bond: u64,
    pub identifier: [u8; 32],
}

/// Decode one log line as event `T`. Returns `None` for lines that are not
/// `Program data:` records or carry another event's discriminator; a record
/// with the right discriminator but a malformed body is an error.
pub fn decode_event<T: Event>(line: &str) -> crate::Result<Option<T>> {
    let Some(encoded) = line.strip_prefix(PROGRAM_DATA_PREFIX) else {
        return Ok(None);
    };
    let Ok(bytes) = STANDARD.decode(encoded.trim()) else {
        return Ok(None);
    };
    let Some(body) = bytes.strip_prefix(T::DISCRIMINATOR) else {
        return Ok(None);
    };
    T::deserialize(&mut &body[..])
        .map(Some)
        .map_err(|e| crate::MonitorError::decode(format!("event body: {e}")))
}

/// Render an event as the log line `emit!` would produce.
pub fn encode_event<T: Event>(event: &T) -> String {
    format!("{}{}", PROGRAM_DATA_PREFIX, STANDARD.encode(event.data()))
}

/// Tracks which program is executing while walking a transaction's log
/// messages, so `Program data:` lines can be attributed to their emitter.
#[derive(Debug, Default)]
pub struct InvocationStack {
    frames: Vec<String>,
}

impl InvocationStack {
    /// Feed one log line; returns the program currently executing after it.
    pub fn observe(&mut self, line: &str) -> Option<&str> {
        if let Some(rest) = line.strip_prefix("Program ") {
            let mut words = rest.split_whitespace();
            match (words.next(), words.next()) {
                (Some(program), Some("invoke")) => self.frames.push(program.to_string()),
                (Some(_), Some("success")) | (Some(_), Some("failed:")) => {
                    self.frames.pop();
                }
                _ => {}
            }
        }
        self.current()
    }

    pub fn current(&self) -> Option<&str> {
        self.frames.last().map(String::as_str)
    }
}

/// Events of type `T` emitted directly by `program` in one transaction's logs.
pub fn events_from_logs<T: Event>(logs: &[String], program: &Pubkey) -> crate::Result<Vec<T>> {
    let program = program.to_string();
    let mut stack = InvocationStack::default();
    let mut events = Vec::new();
    for line in logs {
        let emitter = stack.observe(line).map(str::to_string);
        if emitter.as_deref() != Some(program.as_str()) {
            continue;
        }
        if let Some(event) = decode_event::<T>(line)? {
            events.push(event);
        }
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sha256_hasher::hash;
    use anchor_lang::Discriminator;

    fn sample_event(n: u8) -> AssertionMade {
        AssertionMade {
            assertion_id: [n; 32],
            domain_id: [0; 32],
            claim: format!("proposalHash:{:02x},explanation:,rules:r", n).into_bytes(),
            asserter: Pubkey::new_from_array([1; 32]),
            callback_recipient: Pubkey::new_from_array([2; 32]),
            escalation_manager: Pubkey::default(),
            caller: Pubkey::new_from_array([2; 32]),
            expiration_time: 1_700_007_200,
            currency: Pubkey::new_from_array([3; 32]),
            bond: 1_000_000,
            identifier: [4; 32],
        }
    }

    #[test]
    fn test_discriminator_matches_anchor_convention() {
        let expected = &hash(b"event:AssertionMade").to_bytes()[..8];
        assert_eq!(AssertionMade::DISCRIMINATOR, expected);
    }

    #[test]
    fn test_decode_emitted_line() {
        let event = sample_event(7);
        let line = encode_event(&event);
        assert!(line.starts_with(PROGRAM_DATA_PREFIX));
        assert_eq!(decode_event::<AssertionMade>(&line).unwrap(), Some(event));
    }

    #[test]
    fn test_decode_ignores_other_lines() {
        assert_eq!(decode_event::<AssertionMade>("Program log: hello").unwrap(), None);
        assert_eq!(decode_event::<AssertionMade>("Program data: !!!").unwrap(), None);
        let other = format!("{}{}", PROGRAM_DATA_PREFIX, STANDARD.encode([9u8; 16]));
        assert_eq!(decode_event::<AssertionMade>(&other).unwrap(), None);
    }

    #[test]
    fn test_truncated_body_is_an_error() {
        let mut data = sample_event(1).data();
        data.truncate(20);
        let line = format!("{}{}", PROGRAM_DATA_PREFIX, STANDARD.encode(data));
        assert!(decode_event::<AssertionMade>(&line).is_err());
    }

    #[test]
    fn test_events_attributed_to_emitting_program() {
        let oracle = Pubkey::new_from_array([8; 32]);
        let governor = Pubkey::new_from_array([9; 32]);
        let ours = sample_event(1);
        let spoofed = sample_event(2);
        let logs = vec![
            format!("Program {} invoke [1]", governor),
            "Program log: Instruction: ProposeTransactions".to_string(),
            encode_event(&spoofed),
            format!("Program {} invoke [2]", oracle),
            encode_event(&ours),
            format!("Program {} consumed 5000 of 200000 compute units", oracle),
            format!("Program {} success", oracle),
            format!("Program {} success", governor),
        ];
        let events = events_from_logs::<AssertionMade>(&logs, &oracle).unwrap();
        assert_eq!(events, vec![ours]);
    }
}
