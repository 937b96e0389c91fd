//! NDJSON serve loop.
//!
//! One command per input line, one response per output line. Each command
//! is enqueued on its session before the next line is read, so per-session
//! order follows input order while different sessions run concurrently.
//! Responses are written as they complete and carry the request id. EOF and
//! Ctrl-C both stop reading, wait for commands already queued, then close
//! every session.

use std::future::Future;

use abr_core::Router;
use abr_protocol::{Response, ValidationError};
use tokio::io::{self, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info};

use super::prepare;
use crate::error::Result;

/// Serves stdin/stdout until EOF or Ctrl-C, then closes every session.
pub async fn execute(router: Router, default_session: String) -> Result<()> {
	info!(target = "abr.serve", provider = %router.default_spec().kind, session = %default_session, "serving on stdio");

	let interrupted = async {
		// Without a signal handler the loop runs until EOF.
		if tokio::signal::ctrl_c().await.is_err() {
			std::future::pending::<()>().await;
		}
	};
	serve(router, &default_session, io::stdin(), io::stdout(), interrupted).await
}

pub async fn serve<R, W, S>(router: Router, default_session: &str, input: R, output: W, stop: S) -> Result<()>
where
	R: AsyncRead + Unpin,
	W: AsyncWrite + Unpin + Send + 'static,
	S: Future<Output = ()>,
{
	let (tx, mut rx) = mpsc::unbounded_channel::<Response>();
	let writer = tokio::spawn(async move {
		let mut output = output;
		while let Some(response) = rx.recv().await {
			write_response(&mut output, &response).await?;
		}
		Ok::<(), std::io::Error>(())
	});

	let mut reader = BufReader::new(input);
	let mut buf = Vec::new();
	let mut in_flight = JoinSet::new();
	tokio::pin!(stop);

	loop {
		buf.clear();
		let read = tokio::select! {
			read = reader.read_until(b'\n', &mut buf) => read?,
			() = &mut stop => {
				info!(target = "abr.serve", pending = in_flight.len(), "interrupted, closing sessions");
				break;
			}
		};
		if read == 0 {
			break;
		}
		while in_flight.try_join_next().is_some() {}

		let line = match std::str::from_utf8(&buf) {
			Ok(line) => line.trim(),
			Err(err) => {
				let _ = tx.send(Response::rejected(&ValidationError::malformed(format!("input is not UTF-8: {err}"))));
				continue;
			}
		};
		if line.is_empty() {
			continue;
		}

		match prepare(line, default_session) {
			Ok(command) => {
				debug!(target = "abr.serve", id = %command.id, session = %command.session, action = %command.kind(), "queued");
				let pending = router.queue(command);
				let tx = tx.clone();
				in_flight.spawn(async move {
					let _ = tx.send(pending.await);
				});
			}
			Err(err) => {
				debug!(target = "abr.serve", id = ?err.id, error = %err, "rejected");
				let _ = tx.send(Response::rejected(&err));
			}
		}
	}

	debug!(target = "abr.serve", pending = in_flight.len(), "draining");
	while in_flight.join_next().await.is_some() {}
	router.shutdown().await;

	drop(tx);
	writer.await??;
	Ok(())
}

async fn write_response<W: AsyncWrite + Unpin>(output: &mut W, response: &Response) -> std::io::Result<()> {
	let mut line = serde_json::to_string(response).map_err(std::io::Error::other)?;
	line.push('\n');
	output.write_all(line.as_bytes()).await?;
	output.flush().await
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeSet;
	use std::sync::Arc;
	use std::time::Duration;

	use abr_core::testing::FakeFactory;
	use abr_core::{LaunchSpec, ProviderCall};
	use abr_protocol::ErrorCode;
	use tokio::io::AsyncReadExt;

	use super::*;

	async fn run(factory: &FakeFactory, default_session: &str, input: &str) -> Vec<Response> {
		let router = Router::new(Arc::new(factory.clone()), LaunchSpec::desktop());
		let (output, mut collected) = tokio::io::duplex(64 * 1024);

		serve(router, default_session, input.as_bytes(), output, std::future::pending()).await.unwrap();

		let mut text = String::new();
		collected.read_to_string(&mut text).await.unwrap();
		text.lines().map(|line| serde_json::from_str(line).unwrap()).collect()
	}

	#[tokio::test]
	async fn every_line_gets_one_response() {
		let factory = FakeFactory::new();
		let input = concat!(
			r#"{"id":"1","action":"navigate","url":"https://example.com"}"#,
			"\n\n   \n",
			"{broken\n",
			r#"{"id":"3","action":"navigate"}"#,
			"\n",
		);

		let responses = run(&factory, "default", input).await;
		assert_eq!(responses.len(), 3);

		let by_id = |id: &str| responses.iter().find(|response| response.id == id).unwrap();
		assert!(by_id("1").success);
		assert_eq!(by_id("3").error_code(), Some(ErrorCode::MissingField));
		assert_eq!(by_id("").error_code(), Some(ErrorCode::MalformedInput));
	}

	#[tokio::test]
	async fn same_session_keeps_input_order() {
		let factory = FakeFactory::new();
		factory.delay_calls(Duration::from_millis(5));
		let input: String = (0..6)
			.map(|n| format!("{{\"id\":\"{n}\",\"action\":\"navigate\",\"url\":\"https://example.com/{n}\"}}\n"))
			.collect();

		let responses = run(&factory, "default", &input).await;
		assert_eq!(responses.len(), 6);
		assert!(responses.iter().all(|response| response.success));

		let urls: Vec<String> = factory
			.calls("default")
			.into_iter()
			.filter_map(|call| match call {
				ProviderCall::Navigate { url, .. } => Some(url),
				_ => None,
			})
			.collect();
		let expected: Vec<String> = (0..6).map(|n| format!("https://example.com/{n}")).collect();
		assert_eq!(urls, expected);
		assert_eq!(factory.peak_in_flight("default"), 1);
	}

	#[tokio::test]
	async fn sessions_run_side_by_side() {
		let factory = FakeFactory::new();
		factory.delay_calls(Duration::from_millis(20));
		let input = concat!(
			r#"{"id":"a","action":"reload","session":"one"}"#,
			"\n",
			r#"{"id":"b","action":"reload","session":"two"}"#,
			"\n",
		);

		let responses = run(&factory, "default", input).await;
		let ids: BTreeSet<&str> = responses.iter().map(|response| response.id.as_str()).collect();
		assert_eq!(ids, BTreeSet::from(["a", "b"]));
		assert_eq!(factory.launches(), 2);
		assert_eq!(factory.peak_total_in_flight(), 2);
	}

	#[tokio::test]
	async fn missing_session_uses_configured_default() {
		let factory = FakeFactory::new();
		run(&factory, "work", "{\"id\":\"1\",\"action\":\"back\"}\n").await;

		assert_eq!(factory.calls("work"), vec![ProviderCall::Back]);
		assert!(factory.calls("default").is_empty());
	}

	#[tokio::test]
	async fn end_of_input_closes_sessions() {
		let factory = FakeFactory::new();
		let input = concat!(
			r#"{"id":"1","action":"back","session":"one"}"#,
			"\n",
			r#"{"id":"2","action":"back","session":"two"}"#,
			"\n",
		);

		run(&factory, "default", input).await;
		assert_eq!(factory.shutdowns("one"), 1);
		assert_eq!(factory.shutdowns("two"), 1);
	}

	#[tokio::test]
	async fn interrupt_still_answers_in_flight_commands() {
		let factory = FakeFactory::new();
		factory.delay_calls(Duration::from_millis(30));
		let router = Router::new(Arc::new(factory.clone()), LaunchSpec::desktop());
		let (mut input, reader) = tokio::io::duplex(4096);
		let (output, mut collected) = tokio::io::duplex(4096);
		let (interrupt, interrupted) = tokio::sync::oneshot::channel::<()>();

		let server = tokio::spawn(serve(router, "default", reader, output, async {
			let _ = interrupted.await;
		}));
		input.write_all(b"{\"id\":\"slow\",\"action\":\"reload\"}\n").await.unwrap();
		while factory.launches() == 0 {
			tokio::task::yield_now().await;
		}
		interrupt.send(()).unwrap();
		server.await.unwrap().unwrap();

		let mut text = String::new();
		collected.read_to_string(&mut text).await.unwrap();
		let response: Response = serde_json::from_str(text.trim()).unwrap();
		assert_eq!(response.id, "slow");
		assert!(response.success);
		assert_eq!(factory.shutdowns("default"), 1);
		drop(input);
	}

	#[tokio::test]
	async fn invalid_utf8_is_malformed() {
		let factory = FakeFactory::new();
		let router = Router::new(Arc::new(factory.clone()), LaunchSpec::desktop());
		let (output, mut collected) = tokio::io::duplex(4096);

		serve(router, "default", &b"\xff\xfe\n"[..], output, std::future::pending()).await.unwrap();

		let mut text = String::new();
		collected.read_to_string(&mut text).await.unwrap();
		let response: Response = serde_json::from_str(text.trim()).unwrap();
		assert_eq!(response.error_code(), Some(ErrorCode::MalformedInput));
	}
}
