//! Server-sent event framing over raw body chunks.

use crate::{Error, Result};

pub const MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// Splits arbitrary byte chunks into `\n`-terminated lines.
///
/// Lines are split on raw bytes, so a multi-byte character cut across two chunks is
/// reassembled before decoding.
#[derive(Debug, Default)]
pub struct LineBuffer {
	pending: Vec<u8>,
}
impl LineBuffer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a chunk and returns every line it completes, without the line terminator.
	pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>> {
		let mut lines = Vec::new();
		let mut rest = chunk;

		while let Some(pos) = rest.iter().position(|byte| *byte == b'\n') {
			self.pending.extend_from_slice(&rest[..pos]);
			self.check_len()?;
			lines.push(take_line(&mut self.pending));

			rest = &rest[pos + 1..];
		}

		self.pending.extend_from_slice(rest);
		self.check_len()?;

		Ok(lines)
	}

	/// Returns the unterminated tail left when the body ends, if any.
	pub fn finish(&mut self) -> Option<String> {
		if self.pending.is_empty() {
			return None;
		}

		Some(take_line(&mut self.pending))
	}

	fn check_len(&self) -> Result<()> {
		if self.pending.len() > MAX_LINE_BYTES {
			return Err(Error::LineTooLong { limit: MAX_LINE_BYTES });
		}

		Ok(())
	}
}

/// Collects `data:` lines until a blank line closes the event.
#[derive(Debug, Default)]
pub struct EventFramer {
	data_lines: Vec<String>,
}
impl EventFramer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Feeds one line. Returns the event payload when the line closes a non-empty event.
	pub fn push_line(&mut self, line: &str) -> Option<String> {
		if line.is_empty() {
			return self.take();
		}

		if let Some(data) = line.strip_prefix("data:") {
			self.data_lines.push(data.trim().to_string());
		}

		None
	}

	/// Flushes the buffered event at end of stream.
	pub fn finish(&mut self) -> Option<String> {
		self.take()
	}

	fn take(&mut self) -> Option<String> {
		if self.data_lines.is_empty() {
			return None;
		}

		let payload = self.data_lines.join("\n").trim().to_string();

		self.data_lines.clear();

		(!payload.is_empty()).then_some(payload)
	}
}

fn take_line(pending: &mut Vec<u8>) -> String {
	let mut line = String::from_utf8_lossy(pending).into_owned();

	pending.clear();

	if line.ends_with('\r') {
		line.pop();
	}

	line
}

#[cfg(test)]
mod tests {
	use super::*;

	fn frame_all(chunks: &[&[u8]]) -> Vec<String> {
		let mut lines = LineBuffer::new();
		let mut framer = EventFramer::new();
		let mut events = Vec::new();

		for chunk in chunks {
			for line in lines.push(chunk).expect("Line must fit.") {
				events.extend(framer.push_line(&line));
			}
		}
		if let Some(line) = lines.finish() {
			events.extend(framer.push_line(&line));
		}

		events.extend(framer.finish());

		events
	}

	#[test]
	fn frames_events_across_chunk_boundaries() {
		let body = "event: x\r\ndata: {\"a\":1}\r\n\r\n: comment\ndata: first\ndata:  second \n\n";
		let bytes = body.as_bytes();

		for split in 0..bytes.len() {
			let events = frame_all(&[&bytes[..split], &bytes[split..]]);

			assert_eq!(events, vec!["{\"a\":1}".to_string(), "first\nsecond".to_string()]);
		}
	}

	#[test]
	fn reassembles_split_utf8() {
		let body = "data: café ☕\n\n".as_bytes();
		let cut = body.iter().position(|byte| *byte == 0xe2).expect("Multi-byte char.") + 1;
		let events = frame_all(&[&body[..cut], &body[cut..]]);

		assert_eq!(events, vec!["café ☕".to_string()]);
	}

	#[test]
	fn flushes_unterminated_event() {
		assert_eq!(frame_all(&[b"data: [DONE]"]), vec!["[DONE]".to_string()]);
	}

	#[test]
	fn blank_events_are_dropped() {
		assert!(frame_all(&[b"data:   \n\n\n"]).is_empty());
	}

	#[test]
	fn rejects_oversized_lines() {
		let mut lines = LineBuffer::new();
		let chunk = vec![b'x'; MAX_LINE_BYTES + 1];

		assert!(matches!(lines.push(&chunk), Err(Error::LineTooLong { .. })));
	}
}
