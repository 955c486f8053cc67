use std::{
	fs,
	io::{self, Write},
	path::{Path, PathBuf},
	sync::Arc,
};

use clap::Parser;
use color_eyre::eyre;
use time::UtcOffset;

use purse_service::{
	ChatRequest, ChatStreamChunk, HistoryMessage, MemoryLedger, PurseService, RequestContext,
};
use purse_storage::db::Db;

/// Asks the finance assistant one question about a ledger export.
#[derive(Debug, Parser)]
#[command(
	version = purse_cli::VERSION,
	rename_all = "kebab",
	styles = purse_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// JSON export with `accounts`, `categories`, `tags`, `transactions`, and `transaction_tags`.
	#[arg(long, short = 'l', value_name = "FILE")]
	pub ledger: Option<PathBuf>,
	#[arg(long, default_value_t = 1)]
	pub user_id: i64,
	/// `chat` or `summary`.
	#[arg(long, default_value = "chat")]
	pub mode: String,
	#[arg(long, short = 'm', default_value = "")]
	pub message: String,
	/// JSON array of `{ "role": …, "content": … }` entries, oldest first.
	#[arg(long, value_name = "FILE")]
	pub history: Option<PathBuf>,
	/// Client clock offset from UTC in minutes.
	#[arg(long, default_value_t = 0, allow_hyphen_values = true)]
	pub utc_offset_minutes: i32,
	/// Print one JSON response instead of streamed chunks.
	#[arg(long)]
	pub no_stream: bool,
	/// Drop the user's cached embeddings for the configured model and exit.
	#[arg(long)]
	pub purge: bool,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = purse_config::load(&args.config)?;

	purse_cli::init_tracing(&config.service.log_level);

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let ledger = match args.ledger.as_deref() {
		Some(path) => read_json::<MemoryLedger>(path)?,
		None => MemoryLedger::default(),
	};
	let service = PurseService::new(config, Arc::new(db), Arc::new(ledger));

	if args.purge {
		let deleted = service.embedding_cache().purge(args.user_id).await?;

		tracing::info!(user_id = args.user_id, deleted, "Purged cached embeddings.");

		return Ok(());
	}

	let offset = utc_offset(args.utc_offset_minutes)?;
	let ctx = RequestContext::new(args.user_id, offset);
	let history = match args.history.as_deref() {
		Some(path) => read_json::<Vec<HistoryMessage>>(path)?,
		None => Vec::new(),
	};
	let req = ChatRequest { mode: args.mode, message: args.message, history };

	if args.no_stream {
		let response = service.chat(&ctx, &req).await?;

		println!("{}", serde_json::to_string_pretty(&response)?);

		return Ok(());
	}

	let mut stdout = io::stdout();
	let mut write_err = None;
	let mut sink = |chunk: ChatStreamChunk| {
		if write_err.is_some() {
			return;
		}
		if let Err(err) = write_chunk(&mut stdout, &chunk) {
			write_err = Some(err);
		}
	};

	service.chat_stream(&ctx, &req, &mut sink).await?;

	if let Some(err) = write_err {
		return Err(err.into());
	}

	Ok(())
}

/// Writes one chunk as a server-sent event.
pub fn write_chunk<W>(out: &mut W, chunk: &ChatStreamChunk) -> io::Result<()>
where
	W: Write,
{
	let payload = serde_json::to_string(chunk)?;

	write!(out, "data: {payload}\n\n")?;

	out.flush()
}

fn utc_offset(minutes: i32) -> color_eyre::Result<UtcOffset> {
	UtcOffset::from_whole_seconds(minutes.saturating_mul(60))
		.map_err(|err| eyre::eyre!("Invalid UTC offset of {minutes} minutes: {err}."))
}

fn read_json<T>(path: &Path) -> color_eyre::Result<T>
where
	T: serde::de::DeserializeOwned,
{
	let raw = fs::read_to_string(path)
		.map_err(|err| eyre::eyre!("Failed to read {}: {err}.", path.display()))?;

	serde_json::from_str(&raw)
		.map_err(|err| eyre::eyre!("Failed to parse {}: {err}.", path.display()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn args_accept_negative_offsets() {
		let args = Args::try_parse_from([
			"purse-chat",
			"--config",
			"purse.toml",
			"--mode",
			"summary",
			"--utc-offset-minutes",
			"-300",
			"--no-stream",
		])
		.expect("Failed to parse args.");

		assert_eq!(args.utc_offset_minutes, -300);
		assert_eq!(args.user_id, 1);
		assert!(args.no_stream);
		assert_eq!(utc_offset(-300).expect("Offset must be valid.").whole_hours(), -5);
	}

	#[test]
	fn out_of_range_offsets_are_rejected() {
		assert!(utc_offset(26 * 60).is_err());
	}

	#[test]
	fn chunks_are_framed_as_events() {
		let mut out = Vec::new();

		write_chunk(&mut out, &ChatStreamChunk::ReplyDelta { delta: "Hi".to_string() })
			.expect("Failed to write chunk.");

		assert_eq!(
			String::from_utf8(out).expect("Output must be UTF-8."),
			"data: {\"type\":\"reply_delta\",\"delta\":\"Hi\"}\n\n"
		);
	}
}
